//! Layout engine – uses Taffy to compute block, flex, grid and table layout
//! from a styled tree, then converts the result into positioned boxes in
//! document coordinates.

use std::collections::HashMap;
use taffy::prelude::*;

use crate::dom::Tag;
use crate::error::Result;
use crate::fetch::ImageStore;
use crate::fonts::{wrap_text, FontManager};
use crate::page::PageGeometry;
use crate::style::{self, ComputedStyle, StyledNode, PX};

// ---------------------------------------------------------------------------
// Intermediate layout tree (pre-pagination)
// ---------------------------------------------------------------------------

/// A positioned box in document coordinates (before page splitting).
#[derive(Debug, Clone)]
pub struct PositionedBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub style: ComputedStyle,
    pub content: BoxContent,
    /// List bullet or number for `display: list-item` boxes.
    pub marker: Option<String>,
    pub children: Vec<PositionedBox>,
    pub page_break_before: bool,
    pub page_break_after: bool,
    pub page_break_inside_avoid: bool,
}

#[derive(Debug, Clone)]
pub enum BoxContent {
    None,
    /// Wrapped lines of an anonymous inline run.
    Text { lines: Vec<String> },
    Image { src: String },
}

impl PositionedBox {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

// ---------------------------------------------------------------------------
// Build Taffy tree from styled nodes
// ---------------------------------------------------------------------------

struct LayoutBuilder<'a> {
    taffy: TaffyTree<()>,
    fonts: &'a FontManager,
    images: &'a ImageStore,
    node_styles: HashMap<NodeId, ComputedStyle>,
    node_content: HashMap<NodeId, BoxContent>,
    node_markers: HashMap<NodeId, String>,
}

/// True for text and for inline elements holding only inline content. Such
/// nodes are merged into runs of wrapped text.
fn is_inline_content(node: &StyledNode) -> bool {
    match node {
        StyledNode::Text { .. } => true,
        StyledNode::Element {
            tag,
            style,
            children,
            ..
        } => {
            style.display == style::Display::Inline
                && *tag != Tag::Img
                && children.iter().all(is_inline_content)
        }
    }
}

fn collect_inline_text(node: &StyledNode, out: &mut String) {
    match node {
        StyledNode::Text { text, .. } => {
            out.extend(text.chars().map(|c| if c == '\n' { ' ' } else { c }));
        }
        StyledNode::Element { tag: Tag::Br, .. } => out.push('\n'),
        StyledNode::Element { children, .. } => {
            for child in children {
                collect_inline_text(child, out);
            }
        }
    }
}

/// Collapse whitespace within each forced line.
fn normalise_inline(raw: &str) -> String {
    raw.split('\n')
        .map(|seg| seg.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .to_string()
}

fn collect_text_styles<'n>(node: &'n StyledNode, out: &mut Vec<&'n ComputedStyle>) {
    match node {
        StyledNode::Text { style, .. } => out.push(style),
        StyledNode::Element { children, .. } => {
            for child in children {
                collect_text_styles(child, out);
            }
        }
    }
}

fn same_look(a: &ComputedStyle, b: &ComputedStyle) -> bool {
    a.font_size == b.font_size
        && a.font_weight == b.font_weight
        && a.font_style == b.font_style
        && a.font_family == b.font_family
        && a.color == b.color
        && a.text_decoration == b.text_decoration
}

/// A run is drawn in one style: the style its text shares, or the
/// enclosing block's text style when the run mixes styles.
fn run_style(run: &[&StyledNode], block: &ComputedStyle) -> ComputedStyle {
    let mut styles = Vec::new();
    for node in run {
        collect_text_styles(node, &mut styles);
    }
    match styles.split_first() {
        Some((first, rest)) if rest.iter().all(|s| same_look(first, s)) => (*first).clone(),
        _ => block.text_run(),
    }
}

impl<'a> LayoutBuilder<'a> {
    fn new(fonts: &'a FontManager, images: &'a ImageStore) -> Self {
        Self {
            taffy: TaffyTree::new(),
            fonts,
            images,
            node_styles: HashMap::new(),
            node_content: HashMap::new(),
            node_markers: HashMap::new(),
        }
    }

    fn build_node(&mut self, styled: &StyledNode, parent_width: f32) -> Result<NodeId> {
        match styled {
            StyledNode::Text { text, style } => {
                self.build_text_node(&normalise_inline(text), style, parent_width, true)
            }
            StyledNode::Element {
                tag,
                style,
                children,
                attrs,
            } => self.build_element_node(tag, style, children, attrs, parent_width),
        }
    }

    /// A leaf holding pre-wrapped text. With `fill` the leaf spans the whole
    /// wrap width so alignment can be applied inside it.
    fn build_text_node(
        &mut self,
        text: &str,
        style: &ComputedStyle,
        wrap_width: f32,
        fill: bool,
    ) -> Result<NodeId> {
        let bold = style.is_bold();
        let italic = style.is_italic();
        let family = &style.font_family;
        let font_size = style.font_size;
        let line_height = self.fonts.line_height(font_size, style.line_height);

        let lines = wrap_text(text, font_size, bold, italic, family, wrap_width, self.fonts);
        let text_width = lines
            .iter()
            .map(|l| {
                self.fonts
                    .measure_text_width(l, font_size, bold, italic, family)
            })
            .fold(0.0f32, f32::max);
        let text_height = lines.len() as f32 * line_height;

        let width = if fill {
            wrap_width.max(text_width)
        } else {
            text_width
        };
        let taffy_style = Style {
            size: Size {
                width: Dimension::Length(width),
                height: Dimension::Length(text_height),
            },
            flex_shrink: 0.0,
            ..Default::default()
        };

        let node = self.taffy.new_leaf(taffy_style)?;
        self.node_styles.insert(node, style.clone());
        self.node_content.insert(node, BoxContent::Text { lines });
        Ok(node)
    }

    /// Turn a pending inline run into one text leaf.
    fn flush_run(
        &mut self,
        run: &mut Vec<&StyledNode>,
        block_style: &ComputedStyle,
        wrap_width: f32,
        fill: bool,
        out: &mut Vec<NodeId>,
    ) -> Result<()> {
        if run.is_empty() {
            return Ok(());
        }
        let mut raw = String::new();
        for node in run.iter() {
            collect_inline_text(node, &mut raw);
        }
        let text = normalise_inline(&raw);
        if !text.is_empty() {
            let style = run_style(run, block_style);
            out.push(self.build_text_node(&text, &style, wrap_width, fill)?);
        }
        run.clear();
        Ok(())
    }

    fn build_element_node(
        &mut self,
        tag: &Tag,
        style: &ComputedStyle,
        children: &[StyledNode],
        attrs: &HashMap<String, String>,
        parent_width: f32,
    ) -> Result<NodeId> {
        if *tag == Tag::Img {
            let src = attrs.get("src").map(String::as_str).unwrap_or("");
            return self.build_image_node(src, style, parent_width);
        }

        // Width available for children
        let my_width = match style.width {
            style::Dimension::Length(w) => w,
            style::Dimension::Percent(p) => parent_width * p / 100.0,
            style::Dimension::Auto => parent_width,
        };
        let inner_width = (my_width
            - style.padding_left
            - style.padding_right
            - style.border_left
            - style.border_right)
            .max(1.0);

        // Estimate per-child width for rows and grids so that text is
        // word-wrapped to the right column width at build time.
        let is_row = match style.display {
            style::Display::Flex => style.flex_direction == style::FlexDirection::Row,
            style::Display::TableRow | style::Display::Inline => true,
            _ => false,
        };
        let columns = if is_row {
            children
                .iter()
                .map(|c| match c {
                    StyledNode::Element { attrs, .. } => column_span(attrs),
                    StyledNode::Text { .. } => 0,
                })
                .sum::<usize>()
                .max(1)
        } else if style.display == style::Display::Grid {
            style.grid_template_columns.len().max(1)
        } else {
            1
        };
        let gap_total = style.gap * columns.saturating_sub(1) as f32;
        let child_width = ((inner_width - gap_total) / columns as f32).max(1.0);

        let mut child_nodes = Vec::new();
        let mut run: Vec<&StyledNode> = Vec::new();
        let mut list_counter = 0u32;

        for child in children {
            if is_inline_content(child) {
                run.push(child);
                continue;
            }
            self.flush_run(&mut run, style, child_width, !is_row, &mut child_nodes)?;

            let span = match child {
                StyledNode::Element { attrs, .. } if is_row => column_span(attrs),
                _ => 1,
            };
            let spanned_width = child_width * span as f32 + style.gap * (span - 1) as f32;
            let child_id = self.build_node(child, spanned_width)?;
            if let StyledNode::Element { style: cs, .. } = child {
                if cs.display == style::Display::ListItem {
                    list_counter += 1;
                    if !cs.list_style_none {
                        let marker = if *tag == Tag::Ol {
                            format!("{list_counter}.")
                        } else {
                            "\u{2022}".to_string()
                        };
                        self.node_markers.insert(child_id, marker);
                    }
                }
            }
            child_nodes.push(child_id);
        }
        self.flush_run(&mut run, style, child_width, !is_row, &mut child_nodes)?;

        let mut taffy_style = self.computed_to_taffy(style);
        if style.display == style::Display::TableCell && style.width == style::Dimension::Auto {
            // A cell grows and starts out as `span` single cells, so its
            // edges line up with the columns it covers.
            let span = column_span(attrs) as f32;
            let edges =
                style.padding_left + style.padding_right + style.border_left + style.border_right;
            taffy_style.flex_grow = span;
            taffy_style.flex_basis = Dimension::Length(span * edges);
        }
        let node = self.taffy.new_with_children(taffy_style, &child_nodes)?;
        self.node_styles.insert(node, style.clone());
        Ok(node)
    }

    /// Images take their intrinsic size (1 px = 0.75 pt) unless CSS says
    /// otherwise. Images that failed to load still occupy any declared size.
    fn build_image_node(
        &mut self,
        src: &str,
        style: &ComputedStyle,
        parent_width: f32,
    ) -> Result<NodeId> {
        let intrinsic = self
            .images
            .get(src)
            .map(|img| (img.px_width as f32 * PX, img.px_height as f32 * PX));
        let (width, height) = resolve_image_size(style, intrinsic, parent_width);

        let mut taffy_style = self.computed_to_taffy(style);
        taffy_style.size = Size {
            width: Dimension::Length(width),
            height: Dimension::Length(height),
        };
        let none = LengthPercentage::Length(0.0);
        taffy_style.padding = Rect {
            top: none,
            right: none,
            bottom: none,
            left: none,
        };
        taffy_style.border = taffy_style.padding;
        taffy_style.flex_shrink = 0.0;

        let node = self.taffy.new_leaf(taffy_style)?;
        self.node_styles.insert(node, style.clone());
        if intrinsic.is_some() {
            self.node_content.insert(
                node,
                BoxContent::Image {
                    src: src.to_string(),
                },
            );
        }
        Ok(node)
    }

    fn computed_to_taffy(&self, s: &ComputedStyle) -> Style {
        let mut ts = Style::default();

        // Display / layout mode
        match s.display {
            style::Display::Flex => {
                ts.display = taffy::Display::Flex;
                ts.flex_direction = match s.flex_direction {
                    style::FlexDirection::Row => taffy::FlexDirection::Row,
                    style::FlexDirection::Column => taffy::FlexDirection::Column,
                };
                ts.flex_wrap = match s.flex_wrap {
                    style::FlexWrap::NoWrap => taffy::FlexWrap::NoWrap,
                    style::FlexWrap::Wrap => taffy::FlexWrap::Wrap,
                };
                ts.justify_content = Some(match s.justify_content {
                    style::JustifyContent::Start => taffy::JustifyContent::Start,
                    style::JustifyContent::End => taffy::JustifyContent::End,
                    style::JustifyContent::Center => taffy::JustifyContent::Center,
                    style::JustifyContent::SpaceBetween => taffy::JustifyContent::SpaceBetween,
                    style::JustifyContent::SpaceAround => taffy::JustifyContent::SpaceAround,
                    style::JustifyContent::SpaceEvenly => taffy::JustifyContent::SpaceEvenly,
                });
                ts.align_items = Some(match s.align_items {
                    style::AlignItems::Start => taffy::AlignItems::Start,
                    style::AlignItems::End => taffy::AlignItems::End,
                    style::AlignItems::Center => taffy::AlignItems::Center,
                    style::AlignItems::Stretch => taffy::AlignItems::Stretch,
                });
            }
            style::Display::Grid => {
                ts.display = taffy::Display::Grid;
                ts.grid_template_columns = if s.grid_template_columns.is_empty() {
                    vec![TrackSizingFunction::from_flex(1.0)]
                } else {
                    s.grid_template_columns
                        .iter()
                        .map(|track| match *track {
                            style::GridTrack::Length(v) => TrackSizingFunction::from_length(v),
                            style::GridTrack::Fr(f) => TrackSizingFunction::from_flex(f),
                            style::GridTrack::Auto => TrackSizingFunction::from_flex(1.0),
                        })
                        .collect()
                };
            }
            style::Display::TableRow => {
                ts.display = taffy::Display::Flex;
                ts.flex_direction = taffy::FlexDirection::Row;
                ts.align_items = Some(taffy::AlignItems::Stretch);
            }
            style::Display::Inline => {
                ts.display = taffy::Display::Flex;
                ts.flex_direction = taffy::FlexDirection::Row;
                ts.flex_wrap = taffy::FlexWrap::Wrap;
            }
            style::Display::None => {
                ts.display = taffy::Display::None;
            }
            // Everything else stacks vertically
            _ => {
                ts.display = taffy::Display::Flex;
                ts.flex_direction = taffy::FlexDirection::Column;
            }
        }

        // Sizing
        ts.size = Size {
            width: dim_to_taffy(s.width),
            height: dim_to_taffy(s.height),
        };
        if s.display == style::Display::TableRow {
            ts.size.width = Dimension::Percent(1.0);
        }
        ts.min_size = Size {
            width: if s.flex_grow > 0.0 || s.display == style::Display::TableCell {
                Dimension::Length(0.0)
            } else {
                dim_to_taffy(s.min_width)
            },
            height: Dimension::Auto,
        };
        ts.max_size = Size {
            width: dim_to_taffy(s.max_width),
            height: Dimension::Auto,
        };

        // Flex item properties. Cells share the row by column span unless
        // sized; the span itself is applied where the attributes are known.
        if s.display == style::Display::TableCell && s.width == style::Dimension::Auto {
            ts.flex_grow = 1.0;
            ts.flex_shrink = 1.0;
            ts.flex_basis = Dimension::Length(0.0);
        } else {
            ts.flex_grow = s.flex_grow;
            ts.flex_shrink = s.flex_shrink;
        }

        ts.margin = Rect {
            top: LengthPercentageAuto::Length(s.margin_top),
            right: LengthPercentageAuto::Length(s.margin_right),
            bottom: LengthPercentageAuto::Length(s.margin_bottom),
            left: LengthPercentageAuto::Length(s.margin_left),
        };
        ts.padding = Rect {
            top: LengthPercentage::Length(s.padding_top),
            right: LengthPercentage::Length(s.padding_right),
            bottom: LengthPercentage::Length(s.padding_bottom),
            left: LengthPercentage::Length(s.padding_left),
        };
        ts.border = Rect {
            top: LengthPercentage::Length(s.border_top),
            right: LengthPercentage::Length(s.border_right),
            bottom: LengthPercentage::Length(s.border_bottom),
            left: LengthPercentage::Length(s.border_left),
        };
        ts.gap = Size {
            width: LengthPercentage::Length(s.gap),
            height: LengthPercentage::Length(s.gap),
        };

        ts
    }

    /// Extract positioned boxes after layout computation.
    fn extract(&self, node: NodeId, offset_x: f32, offset_y: f32) -> Result<PositionedBox> {
        let layout = self.taffy.layout(node)?;
        let style = self.node_styles.get(&node).cloned().unwrap_or_default();
        let content = self
            .node_content
            .get(&node)
            .cloned()
            .unwrap_or(BoxContent::None);

        let x = offset_x + layout.location.x;
        let y = offset_y + layout.location.y;
        let (width, height) = (layout.size.width, layout.size.height);

        let children = self
            .taffy
            .children(node)?
            .into_iter()
            .map(|child| self.extract(child, x, y))
            .collect::<Result<Vec<_>>>()?;

        Ok(PositionedBox {
            x,
            y,
            width,
            height,
            page_break_before: style.page_break_before,
            page_break_after: style.page_break_after,
            page_break_inside_avoid: style.page_break_inside_avoid,
            style,
            content,
            marker: self.node_markers.get(&node).cloned(),
            children,
        })
    }
}

/// Columns covered by a cell: its `colspan`, clamped to 1..=1000.
fn column_span(attrs: &HashMap<String, String>) -> usize {
    attrs
        .get("colspan")
        .and_then(|v| v.trim().parse::<usize>().ok())
        .map_or(1, |n| n.clamp(1, 1000))
}

fn dim_to_taffy(d: style::Dimension) -> Dimension {
    match d {
        style::Dimension::Auto => Dimension::Auto,
        style::Dimension::Length(v) => Dimension::Length(v),
        style::Dimension::Percent(v) => Dimension::Percent(v / 100.0),
    }
}

/// Resolve an image's box size from CSS and its intrinsic size, keeping the
/// aspect ratio when only one side is given. Unsized images never exceed the
/// available width.
fn resolve_image_size(
    style: &ComputedStyle,
    intrinsic: Option<(f32, f32)>,
    parent_width: f32,
) -> (f32, f32) {
    let known_w = match style.width {
        style::Dimension::Length(v) => Some(v),
        style::Dimension::Percent(p) => Some(parent_width * p / 100.0),
        style::Dimension::Auto => None,
    };
    let known_h = match style.height {
        style::Dimension::Length(v) => Some(v),
        _ => None,
    };

    match (known_w, known_h, intrinsic) {
        (Some(w), Some(h), _) => (w, h),
        (Some(w), None, Some((iw, ih))) if iw > 0.0 => (w, w * ih / iw),
        (None, Some(h), Some((iw, ih))) if ih > 0.0 => (h * iw / ih, h),
        (None, None, Some((iw, ih))) if iw > parent_width && iw > 0.0 => {
            (parent_width, ih * parent_width / iw)
        }
        (None, None, Some(size)) => size,
        (w, h, _) => (w.unwrap_or(0.0), h.unwrap_or(0.0)),
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute layout for a styled tree, returning the top-level positioned
/// boxes in document coordinates. `x` is page-absolute; `y` starts at 0 at
/// the top of the content area.
pub fn compute_layout(
    styled_nodes: &[StyledNode],
    geometry: &PageGeometry,
    fonts: &FontManager,
    images: &ImageStore,
) -> Result<Vec<PositionedBox>> {
    let content_width = geometry.content_width();
    let mut builder = LayoutBuilder::new(fonts, images);

    let root_style = ComputedStyle::default();
    let mut child_ids = Vec::new();
    let mut run = Vec::new();
    for node in styled_nodes {
        if is_inline_content(node) {
            run.push(node);
            continue;
        }
        builder.flush_run(&mut run, &root_style, content_width, true, &mut child_ids)?;
        child_ids.push(builder.build_node(node, content_width)?);
    }
    builder.flush_run(&mut run, &root_style, content_width, true, &mut child_ids)?;

    let root = builder.taffy.new_with_children(
        Style {
            display: taffy::Display::Flex,
            flex_direction: taffy::FlexDirection::Column,
            size: Size {
                width: Dimension::Length(content_width),
                height: Dimension::Auto,
            },
            ..Default::default()
        },
        &child_ids,
    )?;

    builder.taffy.compute_layout(
        root,
        Size {
            width: AvailableSpace::Definite(content_width),
            height: AvailableSpace::MaxContent,
        },
    )?;

    let root_box = builder.extract(root, geometry.margin_left, 0.0)?;
    Ok(root_box.children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;
    use crate::fetch::LoadedImage;
    use crate::style::{build_styled_tree, Cascade};

    fn layout_with(html: &str, images: &ImageStore) -> Vec<PositionedBox> {
        let dom = parse_html(html);
        let cascade = Cascade::new(&[]);
        let styled = build_styled_tree(&dom, &cascade);
        let fonts = FontManager::default();
        compute_layout(&styled, &PageGeometry::a4(40.0), &fonts, images).unwrap()
    }

    fn layout(html: &str) -> Vec<PositionedBox> {
        layout_with(html, &ImageStore::default())
    }

    fn text_lines(pbox: &PositionedBox) -> Vec<String> {
        let mut out = Vec::new();
        if let BoxContent::Text { lines } = &pbox.content {
            out.extend(lines.iter().cloned());
        }
        for child in &pbox.children {
            out.extend(text_lines(child));
        }
        out
    }

    #[test]
    fn layout_simple_paragraph() {
        let boxes = layout("<p>Hello world</p>");
        assert_eq!(boxes.len(), 1);
        let first = &boxes[0];
        assert!(first.width > 0.0, "Box should have width");
        assert!(first.height > 0.0, "Box should have height");
        assert_eq!(first.x, 40.0);
        assert_eq!(text_lines(first), vec!["Hello world"]);
    }

    #[test]
    fn inline_runs_are_merged() {
        let boxes = layout("<p>Some <strong>bold</strong>\n and <em>more</em><br>next</p>");
        assert_eq!(boxes[0].children.len(), 1);
        assert_eq!(text_lines(&boxes[0]), vec!["Some bold and more", "next"]);
    }

    #[test]
    fn block_children_split_runs() {
        let boxes = layout("<div>before<p>inside</p>after</div>");
        let div = &boxes[0];
        assert_eq!(div.children.len(), 3);
        assert!(div.children[0].y < div.children[1].y);
        assert!(div.children[1].y < div.children[2].y);
    }

    #[test]
    fn table_cells_share_the_row() {
        let boxes = layout("<table><tr><td>A</td><td>B</td></tr></table>");
        let table = &boxes[0];
        let row = &table.children[0];
        assert_eq!(row.children.len(), 2);
        let (a, b) = (&row.children[0], &row.children[1]);
        assert_eq!(a.y, b.y);
        assert!(b.x > a.x);
        assert!((a.width - b.width).abs() < 0.5);
    }

    #[test]
    fn spanned_cells_cover_their_columns() {
        let boxes = layout(
            r#"<table>
            <tr><td>a</td><td>b</td><td>c</td><td>d</td></tr>
            <tr><td colspan="2">wide</td><td>c</td><td>d</td></tr>
            <tr><td colspan="oops">bad</td><td>b</td><td>c</td><td>d</td></tr>
            </table>"#,
        );
        let table = &boxes[0];
        let (top, spanned, bad) = (&table.children[0], &table.children[1], &table.children[2]);
        assert_eq!(spanned.children.len(), 3);

        let wide = &spanned.children[0];
        let covered = top.children[0].width + top.children[1].width;
        assert!((wide.width - covered).abs() < 0.5, "{} vs {covered}", wide.width);
        for (above, below) in top.children[2..].iter().zip(&spanned.children[1..]) {
            assert!((above.x - below.x).abs() < 0.5);
            assert!((above.width - below.width).abs() < 0.5);
        }
        assert!((bad.children[0].width - top.children[0].width).abs() < 0.5);
    }

    #[test]
    fn long_text_wraps_to_content_width() {
        let words = "word ".repeat(200);
        let boxes = layout(&format!("<p>{words}</p>"));
        let lines = text_lines(&boxes[0]);
        assert!(lines.len() > 5);
        assert!(boxes[0].width <= PageGeometry::a4(40.0).content_width() + 0.01);
    }

    #[test]
    fn list_items_get_markers() {
        let boxes = layout("<ol><li>one</li><li>two</li></ol><ul><li>x</li></ul>");
        let markers: Vec<_> = boxes
            .iter()
            .flat_map(|l| l.children.iter().map(|li| li.marker.clone()))
            .collect();
        assert_eq!(
            markers,
            vec![Some("1.".into()), Some("2.".into()), Some("\u{2022}".into())]
        );
    }

    #[test]
    fn image_uses_intrinsic_size() {
        let mut images = ImageStore::default();
        images.insert(
            "logo.png",
            LoadedImage {
                bytes: Vec::new(),
                px_width: 200,
                px_height: 100,
            },
        );
        let boxes = layout_with(r#"<div><img src="logo.png"></div>"#, &images);
        let img = &boxes[0].children[0];
        assert_eq!((img.width, img.height), (150.0, 75.0));
        assert!(matches!(img.content, BoxContent::Image { .. }));
    }

    #[test]
    fn image_keeps_aspect_ratio() {
        let mut style = ComputedStyle::default();
        style.width = style::Dimension::Length(60.0);
        assert_eq!(
            resolve_image_size(&style, Some((120.0, 30.0)), 500.0),
            (60.0, 15.0)
        );
        let style = ComputedStyle::default();
        assert_eq!(
            resolve_image_size(&style, Some((1000.0, 500.0)), 500.0),
            (500.0, 250.0)
        );
        assert_eq!(resolve_image_size(&style, None, 500.0), (0.0, 0.0));
    }

    #[test]
    fn missing_image_has_no_content() {
        let boxes = layout(r#"<div><img src="missing.png"></div>"#);
        assert!(matches!(boxes[0].children[0].content, BoxContent::None));
    }
}
