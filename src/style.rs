//! Style resolver – runs the cascade over parsed stylesheets and inline
//! `style` attributes, producing a flat [`ComputedStyle`] per element for the
//! layout engine.
//!
//! All lengths in a computed style are PDF points. CSS pixels convert at
//! 96 px per inch, so `1px == 0.75pt`.

use std::collections::HashMap;

use crate::css::{parse_declarations, split_components, Declaration, Selector, Specificity, Stylesheet};
use crate::dom::{DomNode, ElementNode, Tag};

/// Points per CSS pixel.
pub const PX: f32 = 0.75;

/// Font size of the root element (16px).
pub const ROOT_FONT_SIZE: f32 = 12.0;

/// Fully resolved style for a single element.
#[derive(Debug, Clone)]
pub struct ComputedStyle {
    // Display / layout
    pub display: Display,
    pub flex_direction: FlexDirection,
    pub flex_wrap: FlexWrap,
    pub flex_grow: f32,
    pub flex_shrink: f32,
    pub justify_content: JustifyContent,
    pub align_items: AlignItems,
    pub gap: f32,

    // Grid
    pub grid_template_columns: Vec<GridTrack>,

    // Sizing
    pub width: Dimension,
    pub height: Dimension,
    pub min_width: Dimension,
    pub max_width: Dimension,

    // Spacing (pt)
    pub margin_top: f32,
    pub margin_right: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub padding_top: f32,
    pub padding_right: f32,
    pub padding_bottom: f32,
    pub padding_left: f32,

    // Border (pt per side, one colour)
    pub border_top: f32,
    pub border_right: f32,
    pub border_bottom: f32,
    pub border_left: f32,
    pub border_color: Color,

    // Typography
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_family: String,
    pub color: Color,
    pub text_align: TextAlign,
    /// Multiple of the font size.
    pub line_height: f32,
    pub text_decoration: TextDecoration,
    pub font_style: FontStyle,
    pub list_style_none: bool,

    // Background
    pub background_color: Color,

    // Page break
    pub page_break_before: bool,
    pub page_break_after: bool,
    pub page_break_inside_avoid: bool,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Block,
            flex_direction: FlexDirection::Row,
            flex_wrap: FlexWrap::NoWrap,
            flex_grow: 0.0,
            flex_shrink: 1.0,
            justify_content: JustifyContent::Start,
            align_items: AlignItems::Stretch,
            gap: 0.0,
            grid_template_columns: Vec::new(),
            width: Dimension::Auto,
            height: Dimension::Auto,
            min_width: Dimension::Auto,
            max_width: Dimension::Auto,
            margin_top: 0.0,
            margin_right: 0.0,
            margin_bottom: 0.0,
            margin_left: 0.0,
            padding_top: 0.0,
            padding_right: 0.0,
            padding_bottom: 0.0,
            padding_left: 0.0,
            border_top: 0.0,
            border_right: 0.0,
            border_bottom: 0.0,
            border_left: 0.0,
            border_color: Color::BLACK,
            font_size: ROOT_FONT_SIZE,
            font_weight: FontWeight::Normal,
            font_family: "Helvetica".to_string(),
            color: Color::BLACK,
            text_align: TextAlign::Left,
            line_height: 1.2,
            text_decoration: TextDecoration::None,
            font_style: FontStyle::Normal,
            list_style_none: false,
            background_color: Color::TRANSPARENT,
            page_break_before: false,
            page_break_after: false,
            page_break_inside_avoid: false,
        }
    }
}

impl ComputedStyle {
    pub fn is_bold(&self) -> bool {
        self.font_weight == FontWeight::Bold
    }

    pub fn is_italic(&self) -> bool {
        self.font_style == FontStyle::Italic
    }

    pub fn has_border(&self) -> bool {
        self.border_top > 0.0
            || self.border_right > 0.0
            || self.border_bottom > 0.0
            || self.border_left > 0.0
    }

    fn set_border_width(&mut self, width: f32) {
        self.border_top = width;
        self.border_right = width;
        self.border_bottom = width;
        self.border_left = width;
    }

    /// Style for an anonymous run of text inside this element: text
    /// properties only, no box decoration.
    pub fn text_run(&self) -> ComputedStyle {
        ComputedStyle {
            display: Display::Inline,
            font_size: self.font_size,
            font_weight: self.font_weight,
            font_family: self.font_family.clone(),
            color: self.color,
            text_align: self.text_align,
            line_height: self.line_height,
            text_decoration: self.text_decoration,
            font_style: self.font_style,
            list_style_none: self.list_style_none,
            ..ComputedStyle::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Supporting enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    Flex,
    Grid,
    Inline,
    InlineBlock,
    ListItem,
    Table,
    TableRowGroup,
    TableHeaderGroup,
    TableFooterGroup,
    TableRow,
    TableCell,
    None,
}

impl Display {
    pub fn is_inline(self) -> bool {
        matches!(self, Display::Inline | Display::InlineBlock)
    }

    pub fn is_row_group(self) -> bool {
        matches!(
            self,
            Display::TableRowGroup | Display::TableHeaderGroup | Display::TableFooterGroup
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexDirection {
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexWrap {
    NoWrap,
    Wrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JustifyContent {
    Start,
    End,
    Center,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignItems {
    Start,
    End,
    Center,
    Stretch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDecoration {
    None,
    Underline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Auto,
    /// Points.
    Length(f32),
    Percent(f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridTrack {
    Length(f32),
    Fr(f32),
    Auto,
}

/// RGBA colour (0.0 – 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

const NAMED_COLORS: &[(&str, (u8, u8, u8))] = &[
    ("black", (0, 0, 0)),
    ("white", (255, 255, 255)),
    ("red", (255, 0, 0)),
    ("green", (0, 128, 0)),
    ("blue", (0, 0, 255)),
    ("yellow", (255, 255, 0)),
    ("orange", (255, 165, 0)),
    ("purple", (128, 0, 128)),
    ("navy", (0, 0, 128)),
    ("teal", (0, 128, 128)),
    ("maroon", (128, 0, 0)),
    ("olive", (128, 128, 0)),
    ("silver", (192, 192, 192)),
    ("gray", (128, 128, 128)),
    ("grey", (128, 128, 128)),
    ("darkgray", (169, 169, 169)),
    ("darkgrey", (169, 169, 169)),
    ("lightgray", (211, 211, 211)),
    ("lightgrey", (211, 211, 211)),
    ("gainsboro", (220, 220, 220)),
    ("whitesmoke", (245, 245, 245)),
];

impl Color {
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: 1.0,
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.a < 0.001
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            6 | 8 => {
                let mut c = Self::rgb8(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?);
                if hex.len() == 8 {
                    c.a = channel(&hex[6..8])? as f32 / 255.0;
                }
                Some(c)
            }
            3 | 4 => {
                let expand = |i: usize| channel(&hex[i..i + 1].repeat(2));
                let mut c = Self::rgb8(expand(0)?, expand(1)?, expand(2)?);
                if hex.len() == 4 {
                    c.a = expand(3)? as f32 / 255.0;
                }
                Some(c)
            }
            _ => None,
        }
    }

    /// Parse a CSS colour value: hex, `rgb()`/`rgba()`, named, `transparent`.
    pub fn parse(value: &str) -> Option<Self> {
        let v = value.trim().to_ascii_lowercase();
        if v.starts_with('#') {
            return Self::from_hex(&v);
        }
        if v == "transparent" {
            return Some(Self::TRANSPARENT);
        }
        if let Some(args) = v
            .strip_prefix("rgba(")
            .or_else(|| v.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let parts: Vec<&str> = args
                .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
                .filter(|p| !p.is_empty())
                .collect();
            if parts.len() < 3 {
                return None;
            }
            let channel = |p: &str| -> Option<f32> {
                match p.strip_suffix('%') {
                    Some(pct) => pct.parse::<f32>().ok().map(|n| n / 100.0),
                    None => p.parse::<f32>().ok().map(|n| n / 255.0),
                }
            };
            let alpha = match parts.get(3) {
                Some(p) => match p.strip_suffix('%') {
                    Some(pct) => pct.parse::<f32>().ok()? / 100.0,
                    None => p.parse::<f32>().ok()?,
                },
                None => 1.0,
            };
            return Some(Self {
                r: channel(parts[0])?.clamp(0.0, 1.0),
                g: channel(parts[1])?.clamp(0.0, 1.0),
                b: channel(parts[2])?.clamp(0.0, 1.0),
                a: alpha.clamp(0.0, 1.0),
            });
        }
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == v)
            .map(|&(_, (r, g, b))| Self::rgb8(r, g, b))
    }
}

// ---------------------------------------------------------------------------
// Value parsing
// ---------------------------------------------------------------------------

/// Parse a CSS length into points. `em` is the font size `em` units refer
/// to. Percentages and unitless non-zero numbers are not lengths.
pub fn parse_length(value: &str, em: f32) -> Option<f32> {
    let v = value.trim().to_ascii_lowercase();
    if v == "0" {
        return Some(0.0);
    }
    const UNITS: &[(&str, f32)] = &[
        ("rem", 0.0),
        ("px", PX),
        ("pt", 1.0),
        ("pc", 12.0),
        ("in", 72.0),
        ("cm", 72.0 / 2.54),
        ("mm", 72.0 / 25.4),
        ("em", 0.0),
    ];
    for &(unit, factor) in UNITS {
        if let Some(num) = v.strip_suffix(unit) {
            let n: f32 = num.trim().parse().ok()?;
            return Some(match unit {
                "rem" => n * ROOT_FONT_SIZE,
                "em" => n * em,
                _ => n * factor,
            });
        }
    }
    None
}

fn parse_dimension(value: &str, em: f32) -> Option<Dimension> {
    let v = value.trim();
    if v.eq_ignore_ascii_case("auto") || v.eq_ignore_ascii_case("none") {
        return Some(Dimension::Auto);
    }
    if let Some(pct) = v.strip_suffix('%') {
        return pct.trim().parse::<f32>().ok().map(Dimension::Percent);
    }
    parse_length(v, em).map(Dimension::Length)
}

/// Map a `font-family` list onto one of the standard PDF families.
fn resolve_font_family(value: &str) -> Option<&'static str> {
    value.split(',').find_map(|family| {
        let f = family.trim().trim_matches(|c| c == '"' || c == '\'').to_ascii_lowercase();
        if f.contains("courier") || f.contains("mono") {
            Some("Courier")
        } else if f.contains("times") || f.contains("georgia") || f == "serif" {
            Some("Times")
        } else if f.contains("helvetica") || f.contains("arial") || f.contains("sans") {
            Some("Helvetica")
        } else {
            None
        }
    })
}

fn parse_font_weight(value: &str) -> Option<FontWeight> {
    match value.trim().to_ascii_lowercase().as_str() {
        "bold" | "bolder" => Some(FontWeight::Bold),
        "normal" | "lighter" => Some(FontWeight::Normal),
        n => n.parse::<u32>().ok().map(|w| {
            if w >= 600 {
                FontWeight::Bold
            } else {
                FontWeight::Normal
            }
        }),
    }
}

fn is_break(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "always" | "page" | "left" | "right" | "recto" | "verso"
    )
}

fn is_avoid(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "avoid" | "avoid-page"
    )
}

// ---------------------------------------------------------------------------
// Cascade
// ---------------------------------------------------------------------------

struct CascadeEntry<'a> {
    selector: &'a Selector,
    specificity: Specificity,
    declarations: &'a [Declaration],
    order: usize,
}

/// Every style rule of a set of stylesheets, in cascade order.
pub struct Cascade<'a> {
    entries: Vec<CascadeEntry<'a>>,
}

impl<'a> Cascade<'a> {
    /// Later sheets win over earlier ones at equal specificity.
    pub fn new(sheets: &'a [Stylesheet]) -> Self {
        let mut entries = Vec::new();
        let rules = sheets.iter().flat_map(|s| s.rules.iter());
        for (order, rule) in rules.enumerate() {
            for selector in &rule.selectors {
                entries.push(CascadeEntry {
                    selector,
                    specificity: selector.specificity(),
                    declarations: &rule.declarations,
                    order,
                });
            }
        }
        Self { entries }
    }

    /// Matching declarations in ascending precedence, with the inline style
    /// placed after normal author declarations and before important ones.
    fn declarations_for(
        &self,
        element: &ElementNode,
        ancestors: &[&ElementNode],
    ) -> Vec<Declaration> {
        let mut matched: Vec<(bool, Specificity, usize, usize, &Declaration)> = Vec::new();
        for entry in &self.entries {
            if !entry.selector.matches(element, ancestors) {
                continue;
            }
            for (i, decl) in entry.declarations.iter().enumerate() {
                matched.push((decl.important, entry.specificity, entry.order, i, decl));
            }
        }
        matched.sort_by(|a, b| (a.0, a.1, a.2, a.3).cmp(&(b.0, b.1, b.2, b.3)));

        let inline = element.inline_style().map(parse_declarations).unwrap_or_default();
        let (inline_important, inline_normal): (Vec<_>, Vec<_>) =
            inline.into_iter().partition(|d| d.important);

        let mut out: Vec<Declaration> = matched
            .iter()
            .filter(|m| !m.0)
            .map(|m| m.4.clone())
            .collect();
        out.extend(inline_normal);
        out.extend(matched.iter().filter(|m| m.0).map(|m| m.4.clone()));
        out.extend(inline_important);
        out
    }
}

/// Resolve the style for an element: inherited text properties, then tag
/// defaults, then the cascade.
pub fn resolve_style(
    element: &ElementNode,
    ancestors: &[&ElementNode],
    parent: Option<&ComputedStyle>,
    cascade: &Cascade<'_>,
) -> ComputedStyle {
    let mut style = ComputedStyle::default();

    if let Some(p) = parent {
        style.font_size = p.font_size;
        style.font_weight = p.font_weight;
        style.font_family = p.font_family.clone();
        style.color = p.color;
        style.text_align = p.text_align;
        style.line_height = p.line_height;
        style.font_style = p.font_style;
        style.text_decoration = p.text_decoration;
        style.list_style_none = p.list_style_none;
    }
    let parent_font_size = style.font_size;

    apply_tag_defaults(&mut style, element);

    let declarations = cascade.declarations_for(element, ancestors);
    // Font size first so `em` lengths in the same rule see the final size.
    for decl in declarations.iter().filter(|d| is_font_size_property(&d.property)) {
        apply_css_property(&mut style, &decl.property, &decl.value, parent_font_size);
    }
    for decl in declarations.iter().filter(|d| !is_font_size_property(&d.property)) {
        apply_css_property(&mut style, &decl.property, &decl.value, parent_font_size);
    }

    style
}

fn is_font_size_property(prop: &str) -> bool {
    prop == "font-size" || prop == "font"
}

/// User-agent defaults based on tag semantics.
fn apply_tag_defaults(s: &mut ComputedStyle, element: &ElementNode) {
    let tag = &element.tag;
    let heading = |s: &mut ComputedStyle, size: f32, margin: f32| {
        s.font_size = size;
        s.font_weight = FontWeight::Bold;
        s.margin_top = margin;
        s.margin_bottom = margin * 0.75;
    };
    match tag {
        Tag::H1 => heading(s, 24.0, 12.0),
        Tag::H2 => heading(s, 18.0, 10.5),
        Tag::H3 => heading(s, 15.0, 9.0),
        Tag::H4 => heading(s, 12.0, 9.0),
        Tag::H5 => heading(s, 10.0, 7.5),
        Tag::H6 => heading(s, 8.0, 7.5),
        Tag::P => {
            s.margin_bottom = 7.5;
        }
        Tag::Ul | Tag::Ol => {
            s.margin_bottom = 7.5;
            s.padding_left = 18.0;
        }
        Tag::Li => {
            s.display = Display::ListItem;
            s.margin_bottom = 3.0;
        }
        Tag::Table => {
            s.display = Display::Table;
            s.margin_bottom = 7.5;
        }
        Tag::Thead => s.display = Display::TableHeaderGroup,
        Tag::Tbody => s.display = Display::TableRowGroup,
        Tag::Tfoot => s.display = Display::TableFooterGroup,
        Tag::Tr => s.display = Display::TableRow,
        Tag::Td | Tag::Th => {
            s.display = Display::TableCell;
            s.padding_top = 3.0;
            s.padding_right = 6.0;
            s.padding_bottom = 3.0;
            s.padding_left = 6.0;
            if *tag == Tag::Th {
                s.font_weight = FontWeight::Bold;
            }
        }
        Tag::Strong | Tag::B => {
            s.display = Display::Inline;
            s.font_weight = FontWeight::Bold;
        }
        Tag::Em | Tag::I => {
            s.display = Display::Inline;
            s.font_style = FontStyle::Italic;
        }
        Tag::U => {
            s.display = Display::Inline;
            s.text_decoration = TextDecoration::Underline;
        }
        Tag::A => {
            s.display = Display::Inline;
            if element.attr("href").is_some() {
                s.text_decoration = TextDecoration::Underline;
                s.color = Color::rgb8(0, 0, 238);
            }
        }
        Tag::Hr => {
            s.margin_top = 6.0;
            s.margin_bottom = 6.0;
            s.border_top = PX;
            s.border_color = Color::rgb8(128, 128, 128);
        }
        Tag::Img => s.display = Display::InlineBlock,
        Tag::Unknown(name) if name == "code" || name == "kbd" || name == "samp" => {
            s.display = Display::Inline;
            s.font_family = "Courier".to_string();
        }
        t if t.is_inline() => s.display = Display::Inline,
        t if t.is_metadata() => s.display = Display::None,
        _ => {}
    }
}

pub fn apply_css_property(s: &mut ComputedStyle, prop: &str, val: &str, parent_font_size: f32) {
    let val = val.trim();
    let lower = val.to_ascii_lowercase();
    let em = s.font_size;
    match prop {
        "display" => {
            s.display = match lower.as_str() {
                "flex" | "inline-flex" => Display::Flex,
                "grid" | "inline-grid" => Display::Grid,
                "block" => Display::Block,
                "inline" => Display::Inline,
                "inline-block" => Display::InlineBlock,
                "list-item" => Display::ListItem,
                "table" | "inline-table" => Display::Table,
                "table-row-group" => Display::TableRowGroup,
                "table-header-group" => Display::TableHeaderGroup,
                "table-footer-group" => Display::TableFooterGroup,
                "table-row" => Display::TableRow,
                "table-cell" => Display::TableCell,
                "none" => Display::None,
                _ => s.display,
            }
        }
        "flex-direction" => {
            s.flex_direction = match lower.as_str() {
                "row" | "row-reverse" => FlexDirection::Row,
                "column" | "column-reverse" => FlexDirection::Column,
                _ => s.flex_direction,
            }
        }
        "flex-wrap" => {
            s.flex_wrap = match lower.as_str() {
                "wrap" | "wrap-reverse" => FlexWrap::Wrap,
                "nowrap" => FlexWrap::NoWrap,
                _ => s.flex_wrap,
            }
        }
        "flex-grow" => {
            if let Ok(v) = lower.parse() {
                s.flex_grow = v;
            }
        }
        "flex-shrink" => {
            if let Ok(v) = lower.parse() {
                s.flex_shrink = v;
            }
        }
        "flex" => match lower.as_str() {
            "none" => {
                s.flex_grow = 0.0;
                s.flex_shrink = 0.0;
            }
            "auto" => {
                s.flex_grow = 1.0;
                s.flex_shrink = 1.0;
            }
            _ => {
                let mut nums = lower.split_whitespace().filter_map(|p| p.parse::<f32>().ok());
                if let Some(grow) = nums.next() {
                    s.flex_grow = grow;
                    s.flex_shrink = nums.next().unwrap_or(1.0);
                }
            }
        },
        "justify-content" => {
            s.justify_content = match lower.as_str() {
                "flex-start" | "start" | "left" => JustifyContent::Start,
                "flex-end" | "end" | "right" => JustifyContent::End,
                "center" => JustifyContent::Center,
                "space-between" => JustifyContent::SpaceBetween,
                "space-around" => JustifyContent::SpaceAround,
                "space-evenly" => JustifyContent::SpaceEvenly,
                _ => s.justify_content,
            }
        }
        "align-items" => {
            s.align_items = match lower.as_str() {
                "flex-start" | "start" => AlignItems::Start,
                "flex-end" | "end" => AlignItems::End,
                "center" => AlignItems::Center,
                "stretch" => AlignItems::Stretch,
                _ => s.align_items,
            }
        }
        "gap" | "grid-gap" => {
            if let Some(pt) = lower.split_whitespace().next().and_then(|v| parse_length(v, em)) {
                s.gap = pt;
            }
        }
        "grid-template-columns" => s.grid_template_columns = parse_grid_tracks(&lower, em),
        "font-size" => {
            if let Some(size) = parse_font_size(&lower, parent_font_size) {
                s.font_size = size;
            }
        }
        "font" => apply_font_shorthand(s, val, parent_font_size),
        "font-weight" => {
            if let Some(w) = parse_font_weight(&lower) {
                s.font_weight = w;
            }
        }
        "font-style" => {
            s.font_style = match lower.as_str() {
                "italic" | "oblique" => FontStyle::Italic,
                _ => FontStyle::Normal,
            }
        }
        "font-family" => {
            if let Some(family) = resolve_font_family(val) {
                s.font_family = family.to_string();
            }
        }
        "color" => {
            if let Some(c) = Color::parse(val) {
                s.color = c;
            }
        }
        "background-color" => {
            if let Some(c) = Color::parse(val) {
                s.background_color = c;
            }
        }
        "background" => {
            if lower == "none" {
                s.background_color = Color::TRANSPARENT;
            } else if let Some(c) = split_components(val).into_iter().find_map(Color::parse) {
                s.background_color = c;
            }
        }
        "text-align" => {
            s.text_align = match lower.as_str() {
                "center" => TextAlign::Center,
                "right" | "end" => TextAlign::Right,
                _ => TextAlign::Left,
            }
        }
        "text-decoration" | "text-decoration-line" => {
            s.text_decoration = if lower.contains("underline") {
                TextDecoration::Underline
            } else {
                TextDecoration::None
            }
        }
        "line-height" => {
            if lower == "normal" {
                s.line_height = 1.2;
            } else if let Ok(v) = lower.parse::<f32>() {
                s.line_height = v;
            } else if let Some(pct) = lower.strip_suffix('%').and_then(|p| p.parse::<f32>().ok()) {
                s.line_height = pct / 100.0;
            } else if let Some(pt) = parse_length(&lower, em) {
                if s.font_size > 0.0 {
                    s.line_height = pt / s.font_size;
                }
            }
        }
        "list-style" | "list-style-type" => {
            s.list_style_none = lower.split_whitespace().any(|p| p == "none");
        }
        "width" => {
            if let Some(d) = parse_dimension(&lower, em) {
                s.width = d;
            }
        }
        "height" => {
            if let Some(d) = parse_dimension(&lower, em) {
                s.height = d;
            }
        }
        "min-width" => {
            if let Some(d) = parse_dimension(&lower, em) {
                s.min_width = d;
            }
        }
        "max-width" => {
            if let Some(d) = parse_dimension(&lower, em) {
                s.max_width = d;
            }
        }
        "margin" => {
            if let Some([t, r, b, l]) = parse_box_shorthand(&lower, em) {
                s.margin_top = t;
                s.margin_right = r;
                s.margin_bottom = b;
                s.margin_left = l;
            }
        }
        "margin-top" => set_length(&mut s.margin_top, &lower, em),
        "margin-right" => set_length(&mut s.margin_right, &lower, em),
        "margin-bottom" => set_length(&mut s.margin_bottom, &lower, em),
        "margin-left" => set_length(&mut s.margin_left, &lower, em),
        "padding" => {
            if let Some([t, r, b, l]) = parse_box_shorthand(&lower, em) {
                s.padding_top = t;
                s.padding_right = r;
                s.padding_bottom = b;
                s.padding_left = l;
            }
        }
        "padding-top" => set_length(&mut s.padding_top, &lower, em),
        "padding-right" => set_length(&mut s.padding_right, &lower, em),
        "padding-bottom" => set_length(&mut s.padding_bottom, &lower, em),
        "padding-left" => set_length(&mut s.padding_left, &lower, em),
        "border" => {
            if let Some((width, color)) = parse_border_shorthand(val, em) {
                s.set_border_width(width);
                if let Some(c) = color {
                    s.border_color = c;
                }
            }
        }
        "border-top" | "border-right" | "border-bottom" | "border-left" => {
            if let Some((width, color)) = parse_border_shorthand(val, em) {
                match prop {
                    "border-top" => s.border_top = width,
                    "border-right" => s.border_right = width,
                    "border-bottom" => s.border_bottom = width,
                    _ => s.border_left = width,
                }
                if let Some(c) = color {
                    s.border_color = c;
                }
            }
        }
        "border-width" => {
            if let Some([t, r, b, l]) = parse_box_shorthand(&lower, em) {
                s.border_top = t;
                s.border_right = r;
                s.border_bottom = b;
                s.border_left = l;
            }
        }
        "border-top-width" => set_length(&mut s.border_top, &lower, em),
        "border-right-width" => set_length(&mut s.border_right, &lower, em),
        "border-bottom-width" => set_length(&mut s.border_bottom, &lower, em),
        "border-left-width" => set_length(&mut s.border_left, &lower, em),
        "border-style" => {
            if lower == "none" || lower == "hidden" {
                s.set_border_width(0.0);
            }
        }
        "border-color" => {
            if let Some(c) = split_components(val).into_iter().find_map(Color::parse) {
                s.border_color = c;
            }
        }
        "page-break-before" | "break-before" => s.page_break_before = is_break(&lower),
        "page-break-after" | "break-after" => s.page_break_after = is_break(&lower),
        "page-break-inside" | "break-inside" => s.page_break_inside_avoid = is_avoid(&lower),
        _ => {}
    }
}

fn set_length(target: &mut f32, value: &str, em: f32) {
    if value == "auto" {
        *target = 0.0;
    } else if let Some(pt) = parse_length(value, em) {
        *target = pt;
    }
}

fn parse_font_size(value: &str, parent_font_size: f32) -> Option<f32> {
    let keyword = match value {
        "xx-small" => Some(9.0),
        "x-small" => Some(10.0),
        "small" => Some(13.0),
        "medium" => Some(16.0),
        "large" => Some(18.0),
        "x-large" => Some(24.0),
        "xx-large" => Some(32.0),
        _ => None,
    };
    if let Some(px) = keyword {
        return Some(px * PX);
    }
    match value {
        "smaller" => return Some(parent_font_size / 1.2),
        "larger" => return Some(parent_font_size * 1.2),
        _ => {}
    }
    if let Some(pct) = value.strip_suffix('%') {
        return pct.trim().parse::<f32>().ok().map(|p| parent_font_size * p / 100.0);
    }
    parse_length(value, parent_font_size)
}

/// `font: [style] [weight] size[/line-height] family`
fn apply_font_shorthand(s: &mut ComputedStyle, value: &str, parent_font_size: f32) {
    let parts = split_components(value);
    let Some(size_idx) = parts.iter().position(|p| {
        let size = p.split('/').next().unwrap_or("").to_ascii_lowercase();
        parse_font_size(&size, parent_font_size).is_some()
    }) else {
        return;
    };
    for p in &parts[..size_idx] {
        let lower = p.to_ascii_lowercase();
        match lower.as_str() {
            "italic" | "oblique" => s.font_style = FontStyle::Italic,
            _ => {
                if let Some(w) = parse_font_weight(&lower) {
                    s.font_weight = w;
                }
            }
        }
    }
    let size_token = parts[size_idx].to_ascii_lowercase();
    let mut size_parts = size_token.splitn(2, '/');
    if let Some(size) = size_parts.next().and_then(|v| parse_font_size(v, parent_font_size)) {
        s.font_size = size;
    }
    if let Some(lh) = size_parts.next() {
        apply_css_property(s, "line-height", lh, parent_font_size);
    }
    let family = parts[size_idx + 1..].join(" ");
    if let Some(f) = resolve_font_family(&family) {
        s.font_family = f.to_string();
    }
}

/// One to four lengths, expanded to `[top, right, bottom, left]`.
pub(crate) fn parse_box_shorthand(value: &str, em: f32) -> Option<[f32; 4]> {
    let parts: Vec<f32> = value
        .split_whitespace()
        .map(|p| if p == "auto" { Some(0.0) } else { parse_length(p, em) })
        .collect::<Option<Vec<_>>>()?;
    match parts.as_slice() {
        [a] => Some([*a, *a, *a, *a]),
        [v, h] => Some([*v, *h, *v, *h]),
        [t, h, b] => Some([*t, *h, *b, *h]),
        [t, r, b, l] => Some([*t, *r, *b, *l]),
        _ => None,
    }
}

/// `width style color` in any order. A border without a visible style has
/// no width.
fn parse_border_shorthand(value: &str, em: f32) -> Option<(f32, Option<Color>)> {
    const STYLES: &[&str] = &[
        "solid", "dashed", "dotted", "double", "groove", "ridge", "inset", "outset",
    ];
    if value.trim().eq_ignore_ascii_case("none") || value.trim() == "0" {
        return Some((0.0, None));
    }
    let mut width = None;
    let mut color = None;
    let mut visible = false;
    for part in split_components(value) {
        let lower = part.to_ascii_lowercase();
        if STYLES.contains(&lower.as_str()) {
            visible = true;
        } else if lower == "none" || lower == "hidden" {
            visible = false;
        } else if let Some(w) = parse_length(&lower, em) {
            width = Some(w);
        } else if let Some(w) = match lower.as_str() {
            "thin" => Some(PX),
            "medium" => Some(3.0 * PX),
            "thick" => Some(5.0 * PX),
            _ => None,
        } {
            width = Some(w);
        } else if let Some(c) = Color::parse(part) {
            color = Some(c);
        }
    }
    let width = if visible { width.unwrap_or(3.0 * PX) } else { 0.0 };
    Some((width, color))
}

fn parse_grid_tracks(value: &str, em: f32) -> Vec<GridTrack> {
    let parse_track = |t: &str| -> GridTrack {
        if let Some(fr) = t.strip_suffix("fr").and_then(|n| n.parse::<f32>().ok()) {
            GridTrack::Fr(fr)
        } else if let Some(pt) = parse_length(t, em) {
            GridTrack::Length(pt)
        } else {
            GridTrack::Auto
        }
    };
    if let Some(inner) = value.strip_prefix("repeat(").and_then(|r| r.strip_suffix(')')) {
        if let Some((count, track)) = inner.split_once(',') {
            if let Ok(n) = count.trim().parse::<usize>() {
                return vec![parse_track(track.trim()); n];
            }
        }
        return Vec::new();
    }
    split_components(value).into_iter().map(parse_track).collect()
}

// ---------------------------------------------------------------------------
// Styled DOM tree
// ---------------------------------------------------------------------------

/// A DOM node annotated with its computed style.
#[derive(Debug, Clone)]
pub enum StyledNode {
    Element {
        tag: Tag,
        style: ComputedStyle,
        children: Vec<StyledNode>,
        /// Original attributes (for images src, etc.)
        attrs: HashMap<String, String>,
    },
    Text {
        text: String,
        style: ComputedStyle,
    },
}

impl StyledNode {
    pub fn style(&self) -> &ComputedStyle {
        match self {
            StyledNode::Element { style, .. } | StyledNode::Text { style, .. } => style,
        }
    }
}

/// Build a styled tree from a DOM tree, resolving styles top-down. Elements
/// with `display: none` are dropped along with their subtree.
pub fn build_styled_tree(nodes: &[DomNode], cascade: &Cascade<'_>) -> Vec<StyledNode> {
    let mut ancestors = Vec::new();
    build_level(nodes, cascade, None, &mut ancestors)
}

fn build_level<'n>(
    nodes: &'n [DomNode],
    cascade: &Cascade<'_>,
    parent_style: Option<&ComputedStyle>,
    ancestors: &mut Vec<&'n ElementNode>,
) -> Vec<StyledNode> {
    let mut result = Vec::new();
    for node in nodes {
        match node {
            DomNode::Element(e) => {
                let style = resolve_style(e, ancestors, parent_style, cascade);
                if style.display == Display::None {
                    continue;
                }
                ancestors.push(e);
                let children = build_level(&e.children, cascade, Some(&style), ancestors);
                ancestors.pop();
                result.push(StyledNode::Element {
                    tag: e.tag.clone(),
                    style,
                    children,
                    attrs: e.attributes.clone(),
                });
            }
            DomNode::Text(text) => {
                if !text.is_empty() {
                    let style = parent_style
                        .map(ComputedStyle::text_run)
                        .unwrap_or_else(|| ComputedStyle::default().text_run());
                    result.push(StyledNode::Text {
                        text: text.clone(),
                        style,
                    });
                }
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::parse_stylesheet;
    use crate::dom::parse_html;

    fn styled(html: &str, css: &str) -> Vec<StyledNode> {
        let sheets = vec![parse_stylesheet(css)];
        let cascade = Cascade::new(&sheets);
        build_styled_tree(&parse_html(html), &cascade)
    }

    fn first_style(nodes: &[StyledNode]) -> &ComputedStyle {
        nodes[0].style()
    }

    fn child(node: &StyledNode, idx: usize) -> &StyledNode {
        match node {
            StyledNode::Element { children, .. } => &children[idx],
            StyledNode::Text { .. } => panic!("text has no children"),
        }
    }

    #[test]
    fn inline_style_font_size() {
        let nodes = styled(r#"<p style="font-size: 24px; color: #ff0000">x</p>"#, "");
        let s = first_style(&nodes);
        assert_eq!(s.font_size, 18.0);
        assert!((s.color.r - 1.0).abs() < 0.01);
    }

    #[test]
    fn color_from_hex() {
        let c = Color::from_hex("#ff8800").unwrap();
        assert!((c.r - 1.0).abs() < 0.01);
        assert!((c.g - 0.533).abs() < 0.01);
        let grey = Color::parse("#666").unwrap();
        assert!((grey.r - 0.4).abs() < 0.01);
    }

    #[test]
    fn rgb_and_named_colors() {
        let c = Color::parse("rgba(255, 0, 0, 0.5)").unwrap();
        assert_eq!((c.r, c.g, c.a), (1.0, 0.0, 0.5));
        assert_eq!(Color::parse("white"), Some(Color::WHITE));
        assert!(Color::parse("nonsense").is_none());
    }

    #[test]
    fn lengths_convert_to_points() {
        assert_eq!(parse_length("10px", 12.0), Some(7.5));
        assert_eq!(parse_length("0.5in", 12.0), Some(36.0));
        assert_eq!(parse_length("2em", 10.0), Some(20.0));
        assert_eq!(parse_length("1rem", 10.0), Some(ROOT_FONT_SIZE));
        assert_eq!(parse_length("50%", 12.0), None);
    }

    #[test]
    fn specificity_beats_source_order() {
        let nodes = styled(
            r#"<p class="note" id="n">x</p>"#,
            "#n { color: red } .note { color: blue } p { color: green }",
        );
        assert_eq!(first_style(&nodes).color, Color::parse("red").unwrap());
    }

    #[test]
    fn important_beats_inline() {
        let nodes = styled(
            r#"<p style="color: blue">x</p>"#,
            "p { color: red !important }",
        );
        assert_eq!(first_style(&nodes).color, Color::parse("red").unwrap());
    }

    #[test]
    fn later_sheet_wins_at_equal_specificity() {
        let sheets = vec![
            parse_stylesheet("table { page-break-inside: auto }"),
            parse_stylesheet("table { page-break-inside: avoid }"),
        ];
        let cascade = Cascade::new(&sheets);
        let nodes = build_styled_tree(&parse_html("<table><tr><td>1</td></tr></table>"), &cascade);
        assert!(first_style(&nodes).page_break_inside_avoid);
    }

    #[test]
    fn tag_defaults_survive_inheritance() {
        let nodes = styled(r#"<div style="font-size: 10px"><h1>T</h1></div>"#, "");
        let h1 = child(&nodes[0], 0).style();
        assert_eq!(h1.font_size, 24.0);
        assert!(h1.is_bold());
    }

    #[test]
    fn em_font_size_uses_parent() {
        let nodes = styled(
            r#"<div style="font-size: 20px"><p style="font-size: 1.5em; padding: 1em">x</p></div>"#,
            "",
        );
        let p = child(&nodes[0], 0).style();
        assert_eq!(p.font_size, 22.5);
        assert_eq!(p.padding_top, 22.5);
    }

    #[test]
    fn display_none_drops_subtree() {
        let nodes = styled(
            "<head><title>t</title></head><div class=\"hide\">x</div><p>y</p>",
            ".hide { display: none }",
        );
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn thead_is_header_group() {
        let nodes = styled("<table><thead><tr><th>A</th></tr></thead></table>", "");
        let thead = child(&nodes[0], 0);
        assert_eq!(thead.style().display, Display::TableHeaderGroup);
    }

    #[test]
    fn semibold_renders_bold() {
        let nodes = styled(r#"<span style="font-weight: 600">x</span>"#, "");
        assert!(first_style(&nodes).is_bold());
        let nodes = styled(r#"<span style="font-weight: 500">x</span>"#, "");
        assert!(!first_style(&nodes).is_bold());
    }

    #[test]
    fn border_shorthand_needs_style() {
        let nodes = styled(
            r#"<div style="border: 2px solid #ddd"></div><div style="border: 2px #ddd"></div>"#,
            "",
        );
        assert_eq!(nodes[0].style().border_top, 1.5);
        assert!(!nodes[1].style().has_border());
    }

    #[test]
    fn font_family_maps_to_standard_fonts() {
        assert_eq!(resolve_font_family("'Inter', Arial, sans-serif"), Some("Helvetica"));
        assert_eq!(resolve_font_family("Georgia, serif"), Some("Times"));
        assert_eq!(resolve_font_family("\"Fira Mono\", monospace"), Some("Courier"));
        assert_eq!(resolve_font_family("Inter"), None);
    }

    #[test]
    fn text_runs_drop_box_decoration() {
        let nodes = styled(
            r#"<td style="border: 1px solid black; padding: 4px; color: blue">x</td>"#,
            "",
        );
        let text = child(&nodes[0], 0).style();
        assert!(!text.has_border());
        assert_eq!(text.padding_left, 0.0);
        assert_eq!(text.color, Color::parse("blue").unwrap());
    }

    #[test]
    fn unstyled_tables_have_no_rules_or_shading() {
        fn visit(node: &StyledNode, seen: &mut usize) {
            if let StyledNode::Element { style, children, .. } = node {
                assert!(!style.has_border(), "{:?} has a border", style.display);
                assert!(style.background_color.is_transparent());
                *seen += 1;
                for c in children {
                    visit(c, seen);
                }
            }
        }
        let nodes = styled("<table><tr><th>A</th><td>1</td></tr></table>", "");
        let mut seen = 0;
        visit(&nodes[0], &mut seen);
        assert_eq!(seen, 4);

        let th = child(child(&nodes[0], 0), 0).style();
        assert_eq!(th.display, Display::TableCell);
        assert!(th.is_bold());
    }
}
