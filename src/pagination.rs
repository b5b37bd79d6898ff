//! Pagination – splits positioned boxes into pages.
//!
//! Handles:
//! - Page boundaries from the page geometry
//! - `page-break-before` / `page-break-after`
//! - `page-break-inside: avoid` for anything that fits on one page
//! - Table row splitting with repeated header rows
//! - Line splitting for paragraphs taller than a page

use log::trace;

use crate::fonts::FontManager;
use crate::layout::{BoxContent, PositionedBox};
use crate::layout_config::*;
use crate::page::{align_name, PageGeometry};
use crate::style::{self, TextAlign};

/// Boxes may overshoot the page by this much and still count as fitting.
const EPSILON: f32 = 0.01;

struct Paginator<'a> {
    geometry: &'a PageGeometry,
    fonts: &'a FontManager,
    pages: Vec<PageLayout>,
    current: PageLayout,
    /// Document-space y at which the current page's content area begins.
    /// `PositionedBox.y` values are document absolutes, so
    /// `pbox.y - page_start` gives the y within the content area.
    page_start: f32,
    break_pending: bool,
}

impl<'a> Paginator<'a> {
    fn new(geometry: &'a PageGeometry, fonts: &'a FontManager) -> Self {
        Self {
            geometry,
            fonts,
            pages: Vec::new(),
            current: PageLayout::new(0),
            page_start: 0.0,
            break_pending: false,
        }
    }

    fn content_height(&self) -> f32 {
        self.geometry.content_height()
    }

    fn page_bottom(&self) -> f32 {
        self.page_start + self.content_height()
    }

    fn fits(&self, pbox: &PositionedBox) -> bool {
        pbox.bottom() <= self.page_bottom() + EPSILON
    }

    fn fits_on_fresh_page(&self, pbox: &PositionedBox) -> bool {
        pbox.height <= self.content_height() + EPSILON
    }

    /// Offset from document y to page-absolute y on the current page.
    fn dy(&self) -> f32 {
        self.geometry.margin_top - self.page_start
    }

    fn new_page(&mut self, doc_y: f32) {
        let next = PageLayout::new(self.pages.len() + 1);
        self.pages.push(std::mem::replace(&mut self.current, next));
        self.page_start = doc_y;
        trace!("Page {} starts at document y={doc_y:.1}", self.pages.len() + 1);
    }

    /// Start a new page at `doc_y` unless the current one is still empty.
    fn break_before(&mut self, doc_y: f32) {
        if self.current.boxes.is_empty() {
            self.page_start = self.page_start.max(doc_y);
        } else {
            self.new_page(doc_y);
        }
    }

    fn push(&mut self, pbox: &PositionedBox) {
        let lb = build_layout_box(pbox, self.dy(), self.fonts);
        self.current.boxes.push(lb);
    }

    fn place(&mut self, pbox: &PositionedBox) {
        if pbox.page_break_before || std::mem::take(&mut self.break_pending) {
            self.break_before(pbox.y);
        }

        if self.fits(pbox) {
            self.push(pbox);
        } else if pbox.page_break_inside_avoid && self.fits_on_fresh_page(pbox) {
            self.break_before(pbox.y);
            self.push(pbox);
        } else if is_table(pbox) {
            self.split_table(pbox);
        } else if !pbox.children.is_empty() {
            // Box decoration is dropped once a container is split.
            for child in &pbox.children {
                self.place(child);
            }
        } else if let BoxContent::Text { lines } = &pbox.content {
            if self.fits_on_fresh_page(pbox) {
                self.break_before(pbox.y);
                self.push(pbox);
            } else {
                self.split_text(pbox, lines);
            }
        } else {
            // Atomic: move to a fresh page, clipped if taller than a page.
            self.break_before(pbox.y);
            self.push(pbox);
        }

        if pbox.page_break_after {
            self.break_pending = true;
        }
    }

    /// Place a table row by row, repeating the header group at the top of
    /// every continuation page.
    fn split_table(&mut self, table: &PositionedBox) {
        let mut header: Vec<&PositionedBox> = Vec::new();
        let mut rows: Vec<&PositionedBox> = Vec::new();
        for child in &table.children {
            match child.style.display {
                style::Display::TableHeaderGroup => header.extend(child.children.iter()),
                d if d.is_row_group() => rows.extend(child.children.iter()),
                _ => rows.push(child),
            }
        }
        let header_height = match (header.first(), header.last()) {
            (Some(first), Some(last)) => last.bottom() - first.y,
            _ => 0.0,
        };
        // Don't repeat a header that leaves no room for rows.
        let repeat_header = header_height > 0.0 && header_height < self.content_height() / 2.0;

        for row in &header {
            self.place_row(row);
        }
        for row in rows {
            if !self.fits(row) && !self.current.boxes.is_empty() {
                if repeat_header {
                    self.new_page(row.y - header_height);
                    for h in &header {
                        let shift = row.y - header_height - header[0].y;
                        let dy = self.dy() + shift;
                        self.current.boxes.push(build_layout_box(h, dy, self.fonts));
                    }
                } else {
                    self.new_page(row.y);
                }
            }
            self.push(row);
        }
    }

    fn place_row(&mut self, row: &PositionedBox) {
        if !self.fits(row) && !self.current.boxes.is_empty() {
            self.new_page(row.y);
        }
        self.push(row);
    }

    /// Break a tall paragraph between lines.
    fn split_text(&mut self, pbox: &PositionedBox, lines: &[String]) {
        let line_height = self
            .fonts
            .line_height(pbox.style.font_size, pbox.style.line_height);
        let mut start = 0;
        while start < lines.len() {
            let top = pbox.y + start as f32 * line_height;
            let room = ((self.page_bottom() - top + EPSILON) / line_height).floor() as usize;
            if room == 0 {
                if self.current.boxes.is_empty() {
                    // Line taller than the page; place one anyway.
                    self.push_lines(pbox, &lines[start..start + 1], top);
                    start += 1;
                } else {
                    self.new_page(top);
                }
                continue;
            }
            let end = (start + room).min(lines.len());
            self.push_lines(pbox, &lines[start..end], top);
            start = end;
            if start < lines.len() {
                self.new_page(pbox.y + start as f32 * line_height);
            }
        }
    }

    fn push_lines(&mut self, pbox: &PositionedBox, lines: &[String], top: f32) {
        let mut part = pbox.clone();
        part.y = top;
        part.height = lines.len() as f32
            * self
                .fonts
                .line_height(pbox.style.font_size, pbox.style.line_height);
        part.content = BoxContent::Text {
            lines: lines.to_vec(),
        };
        self.push(&part);
    }

    fn finish(mut self) -> Vec<PageLayout> {
        if !self.current.boxes.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

fn is_table(pbox: &PositionedBox) -> bool {
    pbox.style.display == style::Display::Table && !pbox.children.is_empty()
}

/// Split positioned boxes into pages. There is always at least one page.
pub fn paginate(
    boxes: &[PositionedBox],
    geometry: &PageGeometry,
    fonts: &FontManager,
) -> LayoutConfig {
    let mut paginator = Paginator::new(geometry, fonts);
    for pbox in boxes {
        paginator.place(pbox);
    }
    LayoutConfig {
        pages: paginator.finish(),
        ..LayoutConfig::new(geometry.width, geometry.height)
    }
}

/// Recursively build a LayoutBox tree where every box carries page-absolute
/// coordinates. `x` is already page-absolute; `y` is shifted by `dy`.
fn build_layout_box(pbox: &PositionedBox, dy: f32, fonts: &FontManager) -> LayoutBox {
    let s = &pbox.style;
    let mut lb = LayoutBox::new(pbox.x, pbox.y + dy, pbox.width, pbox.height);

    if !s.background_color.is_transparent() {
        lb.background_color = Some(s.background_color.to_array());
    }

    if s.has_border() && !s.border_color.is_transparent() {
        lb.border = Some(BorderStyle {
            widths: [s.border_top, s.border_right, s.border_bottom, s.border_left],
            color: s.border_color.to_array(),
        });
    }

    let text_content = |lines: Vec<TextLine>, list_marker: Option<String>| TextContent {
        lines,
        font_family: s.font_family.clone(),
        font_size: s.font_size,
        bold: s.is_bold(),
        italic: s.is_italic(),
        color: s.color.to_array(),
        line_height: fonts.line_height(s.font_size, s.line_height),
        baseline: fonts.baseline_offset(
            s.font_size,
            s.line_height,
            s.is_bold(),
            s.is_italic(),
            &s.font_family,
        ),
        text_align: align_name(s.text_align).to_string(),
        underline: s.text_decoration == style::TextDecoration::Underline,
        list_marker,
    };

    match &pbox.content {
        BoxContent::Text { lines } => {
            let line_height = fonts.line_height(s.font_size, s.line_height);
            let text_lines = lines
                .iter()
                .enumerate()
                .map(|(i, line)| {
                    let width = fonts.measure_text_width(
                        line,
                        s.font_size,
                        s.is_bold(),
                        s.is_italic(),
                        &s.font_family,
                    );
                    let x_offset = match s.text_align {
                        TextAlign::Left => 0.0,
                        TextAlign::Center => ((pbox.width - width) / 2.0).max(0.0),
                        TextAlign::Right => (pbox.width - width).max(0.0),
                    };
                    TextLine {
                        text: line.clone(),
                        x_offset,
                        y_offset: i as f32 * line_height,
                        width,
                    }
                })
                .collect();
            lb.text = Some(text_content(text_lines, None));
        }
        BoxContent::Image { src } => {
            lb.image = Some(ImageContent {
                src: src.clone(),
                width: pbox.width,
                height: pbox.height,
            });
        }
        BoxContent::None => {
            // The marker hangs left of the list item, on its first line.
            if let Some(marker) = &pbox.marker {
                let width = fonts.measure_text_width(
                    marker,
                    s.font_size,
                    s.is_bold(),
                    s.is_italic(),
                    &s.font_family,
                );
                let line = TextLine {
                    text: marker.clone(),
                    x_offset: -(width + s.font_size * 0.5),
                    y_offset: s.border_top + s.padding_top,
                    width,
                };
                let mut content = text_content(vec![line], Some(marker.clone()));
                content.underline = false;
                lb.text = Some(content);
            }
        }
    }

    lb.children = pbox
        .children
        .iter()
        .map(|child| build_layout_box(child, dy, fonts))
        .collect();
    lb
}
