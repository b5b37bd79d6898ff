//! Page model – page size, margins and margin boxes from `@page` rules.
//!
//! Margin boxes (`@bottom-center` and friends) hold running decorations such
//! as page numbers. Their `content` may reference `counter(page)` and
//! `counter(pages)`, which are only known after pagination, so boxes are
//! resolved per page by [`PageStyle::decorate`].

use log::debug;

use crate::css::{split_components, unquote, Declaration, PageRule};
use crate::fonts::FontManager;
use crate::layout_config::{LayoutBox, LayoutConfig, TextContent, TextLine};
use crate::style::{apply_css_property, parse_box_shorthand, parse_length, ComputedStyle, TextAlign, ROOT_FONT_SIZE};

/// Page size and margins, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_top: f32,
    pub margin_right: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
}

impl PageGeometry {
    /// A4 portrait with equal margins.
    pub fn a4(margin: f32) -> Self {
        let (width, height) = named_size("a4").unwrap_or((595.28, 841.89));
        Self {
            width,
            height,
            margin_top: margin,
            margin_right: margin,
            margin_bottom: margin,
            margin_left: margin,
        }
    }

    pub fn content_width(&self) -> f32 {
        (self.width - self.margin_left - self.margin_right).max(1.0)
    }

    pub fn content_height(&self) -> f32 {
        (self.height - self.margin_top - self.margin_bottom).max(1.0)
    }
}

fn named_size(name: &str) -> Option<(f32, f32)> {
    let mm = |w: f32, h: f32| (w * 72.0 / 25.4, h * 72.0 / 25.4);
    match name {
        "a3" => Some(mm(297.0, 420.0)),
        "a4" => Some(mm(210.0, 297.0)),
        "a5" => Some(mm(148.0, 210.0)),
        "b5" => Some(mm(176.0, 250.0)),
        "letter" => Some((612.0, 792.0)),
        "legal" => Some((612.0, 1008.0)),
        _ => None,
    }
}

/// Where a margin box sits on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MarginPosition {
    TopLeft,
    TopCenter,
    TopRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl MarginPosition {
    fn from_at_keyword(name: &str) -> Option<Self> {
        match name {
            "top-left" => Some(Self::TopLeft),
            "top-center" => Some(Self::TopCenter),
            "top-right" => Some(Self::TopRight),
            "bottom-left" => Some(Self::BottomLeft),
            "bottom-center" => Some(Self::BottomCenter),
            "bottom-right" => Some(Self::BottomRight),
            _ => None,
        }
    }

    fn column(self) -> usize {
        match self {
            Self::TopLeft | Self::BottomLeft => 0,
            Self::TopCenter | Self::BottomCenter => 1,
            Self::TopRight | Self::BottomRight => 2,
        }
    }

    fn is_top(self) -> bool {
        matches!(self, Self::TopLeft | Self::TopCenter | Self::TopRight)
    }

    fn default_align(self) -> TextAlign {
        match self.column() {
            0 => TextAlign::Left,
            1 => TextAlign::Center,
            _ => TextAlign::Right,
        }
    }
}

/// One piece of generated content.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentItem {
    Text(String),
    PageCounter,
    PagesCounter,
}

/// Parse a `content` value. `none`/`normal` yield nothing.
pub fn parse_content(value: &str) -> Vec<ContentItem> {
    split_components(value)
        .into_iter()
        .filter_map(|part| {
            let compact: String = part.chars().filter(|c| !c.is_whitespace()).collect();
            match compact.to_ascii_lowercase().as_str() {
                "counter(page)" => Some(ContentItem::PageCounter),
                "counter(pages)" => Some(ContentItem::PagesCounter),
                _ if part.starts_with('"') || part.starts_with('\'') => {
                    Some(ContentItem::Text(unquote(part)))
                }
                _ => None,
            }
        })
        .collect()
}

/// A resolved margin box.
#[derive(Debug, Clone)]
pub struct MarginBox {
    pub position: MarginPosition,
    pub content: Vec<ContentItem>,
    pub style: ComputedStyle,
}

impl MarginBox {
    /// Text of the box on page `page` (1-based) of `pages`.
    pub fn text_for(&self, page: usize, pages: usize) -> String {
        self.content
            .iter()
            .map(|item| match item {
                ContentItem::Text(t) => t.clone(),
                ContentItem::PageCounter => page.to_string(),
                ContentItem::PagesCounter => pages.to_string(),
            })
            .collect()
    }
}

/// Everything `@page` rules say about the page.
#[derive(Debug, Clone)]
pub struct PageStyle {
    pub geometry: PageGeometry,
    pub margin_boxes: Vec<MarginBox>,
}

impl PageStyle {
    /// Merge `@page` rules in order, later declarations winning. Rules with a
    /// page selector (`:first`, `:left`, ...) are not applied.
    pub fn from_rules<'r>(rules: impl IntoIterator<Item = &'r PageRule>, fallback: PageGeometry) -> Self {
        let mut geometry = fallback;
        let mut boxes: Vec<(MarginPosition, Vec<Declaration>)> = Vec::new();

        for rule in rules {
            if !rule.selector.trim().is_empty() {
                debug!("Ignoring @page {} rule", rule.selector.trim());
                continue;
            }
            for decl in &rule.declarations {
                apply_page_property(&mut geometry, &decl.property, &decl.value);
            }
            for (name, decls) in &rule.margin_boxes {
                let Some(position) = MarginPosition::from_at_keyword(name) else {
                    debug!("Ignoring @{name} margin box");
                    continue;
                };
                match boxes.iter_mut().find(|(p, _)| *p == position) {
                    Some((_, existing)) => existing.extend(decls.iter().cloned()),
                    None => boxes.push((position, decls.clone())),
                }
            }
        }

        boxes.sort_by_key(|(p, _)| *p);
        let margin_boxes = boxes
            .into_iter()
            .filter_map(|(position, decls)| resolve_margin_box(position, &decls))
            .collect();
        Self {
            geometry,
            margin_boxes,
        }
    }

    /// Lay out margin boxes on every page of `config`.
    pub fn decorate(&self, config: &mut LayoutConfig, fonts: &FontManager) {
        let total = config.pages.len();
        for (i, page) in config.pages.iter_mut().enumerate() {
            page.margin_boxes = self
                .margin_boxes
                .iter()
                .map(|mb| self.layout_margin_box(mb, i + 1, total, fonts))
                .collect();
        }
    }

    fn layout_margin_box(
        &self,
        mb: &MarginBox,
        page: usize,
        pages: usize,
        fonts: &FontManager,
    ) -> LayoutBox {
        let g = &self.geometry;
        let third = g.content_width() / 3.0;
        let x = g.margin_left + third * mb.position.column() as f32;
        let (area_top, area_height) = if mb.position.is_top() {
            (0.0, g.margin_top)
        } else {
            (g.height - g.margin_bottom, g.margin_bottom)
        };

        let s = &mb.style;
        let line_height = fonts.line_height(s.font_size, s.line_height);
        let y = area_top + ((area_height - line_height) / 2.0).max(0.0);

        let text = mb.text_for(page, pages);
        let width = fonts.measure_text_width(&text, s.font_size, s.is_bold(), s.is_italic(), &s.font_family);
        let x_offset = match s.text_align {
            TextAlign::Left => 0.0,
            TextAlign::Center => (third - width) / 2.0,
            TextAlign::Right => third - width,
        };

        let mut lb = LayoutBox::new(x, y, third, line_height);
        lb.text = Some(TextContent {
            lines: vec![TextLine {
                text,
                x_offset,
                y_offset: 0.0,
                width,
            }],
            font_family: s.font_family.clone(),
            font_size: s.font_size,
            bold: s.is_bold(),
            italic: s.is_italic(),
            color: s.color.to_array(),
            line_height,
            baseline: fonts.baseline_offset(
                s.font_size,
                s.line_height,
                s.is_bold(),
                s.is_italic(),
                &s.font_family,
            ),
            text_align: align_name(s.text_align).to_string(),
            underline: false,
            list_marker: None,
        });
        lb
    }
}

pub(crate) fn align_name(align: TextAlign) -> &'static str {
    match align {
        TextAlign::Left => "left",
        TextAlign::Center => "center",
        TextAlign::Right => "right",
    }
}

fn resolve_margin_box(position: MarginPosition, decls: &[Declaration]) -> Option<MarginBox> {
    let mut style = ComputedStyle::default();
    style.text_align = position.default_align();
    let mut content = Vec::new();
    for decl in decls {
        if decl.property == "content" {
            content = parse_content(&decl.value);
        } else {
            apply_css_property(&mut style, &decl.property, &decl.value, ROOT_FONT_SIZE);
        }
    }
    if content.is_empty() {
        return None;
    }
    Some(MarginBox {
        position,
        content,
        style,
    })
}

fn apply_page_property(g: &mut PageGeometry, prop: &str, value: &str) {
    let lower = value.trim().to_ascii_lowercase();
    let em = ROOT_FONT_SIZE;
    match prop {
        "size" => apply_size(g, &lower),
        "margin" => {
            if let Some([t, r, b, l]) = parse_box_shorthand(&lower, em) {
                g.margin_top = t;
                g.margin_right = r;
                g.margin_bottom = b;
                g.margin_left = l;
            }
        }
        "margin-top" => set_margin(&mut g.margin_top, &lower),
        "margin-right" => set_margin(&mut g.margin_right, &lower),
        "margin-bottom" => set_margin(&mut g.margin_bottom, &lower),
        "margin-left" => set_margin(&mut g.margin_left, &lower),
        _ => {}
    }
}

fn set_margin(target: &mut f32, value: &str) {
    if let Some(pt) = parse_length(value, ROOT_FONT_SIZE) {
        *target = pt;
    }
}

/// `size: auto | <name> [portrait|landscape] | <length>{1,2}`
fn apply_size(g: &mut PageGeometry, value: &str) {
    let mut dims: Option<(f32, f32)> = None;
    let mut lengths = Vec::new();
    let mut orientation = None;
    for part in value.split_whitespace() {
        match part {
            "landscape" | "portrait" => orientation = Some(part),
            "auto" => {}
            _ => {
                if let Some(size) = named_size(part) {
                    dims = Some(size);
                } else if let Some(pt) = parse_length(part, ROOT_FONT_SIZE) {
                    lengths.push(pt);
                }
            }
        }
    }
    match lengths.as_slice() {
        [side] => dims = Some((*side, *side)),
        [w, h] => dims = Some((*w, *h)),
        _ => {}
    }
    let (mut w, mut h) = dims.unwrap_or((g.width, g.height));
    match orientation {
        Some("landscape") if h > w => std::mem::swap(&mut w, &mut h),
        Some("portrait") if w > h => std::mem::swap(&mut w, &mut h),
        _ => {}
    }
    g.width = w;
    g.height = h;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::parse_stylesheet;
    use crate::layout_config::PageLayout;

    const FOOTER_CSS: &str = r#"
        @page {
            size: A4;
            margin: 0.5in 0.5in 0.75in 0.5in;
            @bottom-center {
                content: "Page " counter(page) " of " counter(pages);
                font-size: 10px;
                color: #666;
            }
            @bottom-left { content: "Brand"; font-weight: 600; }
            @bottom-right { content: "CONFIDENTIAL"; font-style: italic; }
        }
    "#;

    fn page_style(css: &str) -> PageStyle {
        let sheet = parse_stylesheet(css);
        PageStyle::from_rules(&sheet.page_rules, PageGeometry::a4(40.0))
    }

    #[test]
    fn geometry_from_page_rule() {
        let style = page_style(FOOTER_CSS);
        let g = style.geometry;
        assert!((g.width - 595.28).abs() < 0.01);
        assert!((g.height - 841.89).abs() < 0.01);
        assert_eq!(g.margin_top, 36.0);
        assert_eq!(g.margin_right, 36.0);
        assert_eq!(g.margin_bottom, 54.0);
        assert_eq!(g.margin_left, 36.0);
    }

    #[test]
    fn sizes_and_orientation() {
        let g = page_style("@page { size: letter landscape }").geometry;
        assert_eq!((g.width, g.height), (792.0, 612.0));
        let g = page_style("@page { size: 4in 6in }").geometry;
        assert_eq!((g.width, g.height), (288.0, 432.0));
        let g = page_style("@page { size: landscape }").geometry;
        assert!(g.width > g.height);
    }

    #[test]
    fn later_rules_override() {
        let style = page_style(
            "@page { margin: 10pt; @bottom-center { content: 'a' } }\n\
             @page { margin-top: 20pt; @bottom-center { content: 'b' } }\n\
             @page :first { margin: 99pt }",
        );
        assert_eq!(style.geometry.margin_top, 20.0);
        assert_eq!(style.geometry.margin_left, 10.0);
        assert_eq!(style.margin_boxes.len(), 1);
        assert_eq!(style.margin_boxes[0].text_for(1, 1), "b");
    }

    #[test]
    fn content_counters() {
        assert_eq!(
            parse_content(r#""Page " counter(page) " of " counter( pages )"#),
            vec![
                ContentItem::Text("Page ".into()),
                ContentItem::PageCounter,
                ContentItem::Text(" of ".into()),
                ContentItem::PagesCounter,
            ]
        );
        assert!(parse_content("none").is_empty());
    }

    #[test]
    fn margin_box_styles() {
        let style = page_style(FOOTER_CSS);
        let [left, center, right] = [0, 1, 2].map(|i| &style.margin_boxes[i]);
        assert_eq!(left.position, MarginPosition::BottomLeft);
        assert!(left.style.is_bold());
        assert_eq!(center.style.font_size, 7.5);
        assert!((center.style.color.r - 0.4).abs() < 0.01);
        assert_eq!(center.style.text_align, TextAlign::Center);
        assert!(right.style.is_italic());
        assert_eq!(right.style.text_align, TextAlign::Right);
    }

    #[test]
    fn decorate_resolves_counters_per_page() {
        let style = page_style(FOOTER_CSS);
        let mut config = LayoutConfig::new(595.28, 841.89);
        config.pages = vec![PageLayout::new(0), PageLayout::new(1)];
        style.decorate(&mut config, &FontManager::default());

        assert_eq!(config.page_text(0), vec!["Brand", "Page 1 of 2", "CONFIDENTIAL"]);
        assert_eq!(config.page_text(1), vec!["Brand", "Page 2 of 2", "CONFIDENTIAL"]);

        let footer = &config.pages[1].margin_boxes[1];
        let g = style.geometry;
        assert!(footer.y >= g.height - g.margin_bottom);
        assert!(footer.y + footer.height <= g.height);
        assert!((footer.x - (g.margin_left + g.content_width() / 3.0)).abs() < 0.01);
    }
}
