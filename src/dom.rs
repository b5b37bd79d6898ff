//! HTML parser – converts an HTML string into a simple DOM tree.
//!
//! The parser is tolerant rather than conforming: it understands void
//! elements, raw-text elements (`style`, `script`, `title`), comments and
//! doctypes, the optional end tags of `p`, `li`, `dt`/`dd`, table parts and
//! `option`, and recovers from stray or mismatched closing tags. Nesting is
//! capped at [`MAX_NESTING`]; deeper elements become siblings of the
//! innermost allowed element. Anything it does not recognise is kept as [`Tag::Unknown`] so stylesheets can still
//! match it by name.

use std::collections::HashMap;

// ---------------------------------------------------------------------------
// DOM types
// ---------------------------------------------------------------------------

/// The tag name of an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Div,
    P,
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    Ul,
    Ol,
    Li,
    Table,
    Thead,
    Tbody,
    Tfoot,
    Tr,
    Td,
    Th,
    Span,
    Strong,
    B,
    Em,
    I,
    U,
    A,
    Br,
    Hr,
    Img,
    Body,
    Html,
    Head,
    Style,
    Script,
    Title,
    Meta,
    Link,
    /// Any other element, keyed by its lowercase name.
    Unknown(String),
}

/// Unknown elements that still flow inline with surrounding text.
const INLINE_UNKNOWN: &[&str] = &[
    "small", "code", "sub", "sup", "label", "abbr", "mark", "s", "strike", "del", "ins", "kbd",
    "q", "cite", "time", "var", "samp",
];

/// Unknown elements that never have children.
const VOID_UNKNOWN: &[&str] = &[
    "input", "col", "area", "base", "embed", "source", "track", "wbr", "param",
];

impl Tag {
    pub fn from_str(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "div" => Tag::Div,
            "p" => Tag::P,
            "h1" => Tag::H1,
            "h2" => Tag::H2,
            "h3" => Tag::H3,
            "h4" => Tag::H4,
            "h5" => Tag::H5,
            "h6" => Tag::H6,
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "table" => Tag::Table,
            "thead" => Tag::Thead,
            "tbody" => Tag::Tbody,
            "tfoot" => Tag::Tfoot,
            "tr" => Tag::Tr,
            "td" => Tag::Td,
            "th" => Tag::Th,
            "span" => Tag::Span,
            "strong" => Tag::Strong,
            "b" => Tag::B,
            "em" => Tag::Em,
            "i" => Tag::I,
            "u" => Tag::U,
            "a" => Tag::A,
            "br" => Tag::Br,
            "hr" => Tag::Hr,
            "img" => Tag::Img,
            "body" => Tag::Body,
            "html" => Tag::Html,
            "head" => Tag::Head,
            "style" => Tag::Style,
            "script" => Tag::Script,
            "title" => Tag::Title,
            "meta" => Tag::Meta,
            "link" => Tag::Link,
            other => Tag::Unknown(other.to_string()),
        }
    }

    /// Lowercase element name, as matched by CSS type selectors.
    pub fn name(&self) -> &str {
        match self {
            Tag::Div => "div",
            Tag::P => "p",
            Tag::H1 => "h1",
            Tag::H2 => "h2",
            Tag::H3 => "h3",
            Tag::H4 => "h4",
            Tag::H5 => "h5",
            Tag::H6 => "h6",
            Tag::Ul => "ul",
            Tag::Ol => "ol",
            Tag::Li => "li",
            Tag::Table => "table",
            Tag::Thead => "thead",
            Tag::Tbody => "tbody",
            Tag::Tfoot => "tfoot",
            Tag::Tr => "tr",
            Tag::Td => "td",
            Tag::Th => "th",
            Tag::Span => "span",
            Tag::Strong => "strong",
            Tag::B => "b",
            Tag::Em => "em",
            Tag::I => "i",
            Tag::U => "u",
            Tag::A => "a",
            Tag::Br => "br",
            Tag::Hr => "hr",
            Tag::Img => "img",
            Tag::Body => "body",
            Tag::Html => "html",
            Tag::Head => "head",
            Tag::Style => "style",
            Tag::Script => "script",
            Tag::Title => "title",
            Tag::Meta => "meta",
            Tag::Link => "link",
            Tag::Unknown(name) => name,
        }
    }

    pub fn is_inline(&self) -> bool {
        match self {
            Tag::Span | Tag::Strong | Tag::B | Tag::Em | Tag::I | Tag::U | Tag::A | Tag::Br => true,
            Tag::Unknown(name) => INLINE_UNKNOWN.contains(&name.as_str()),
            _ => false,
        }
    }

    /// Elements that never have content or a closing tag.
    pub fn is_void(&self) -> bool {
        match self {
            Tag::Img | Tag::Br | Tag::Hr | Tag::Meta | Tag::Link => true,
            Tag::Unknown(name) => VOID_UNKNOWN.contains(&name.as_str()),
            _ => false,
        }
    }

    /// Elements whose content is raw text up to the matching end tag.
    pub fn is_raw_text(&self) -> bool {
        matches!(self, Tag::Style | Tag::Script | Tag::Title)
    }

    /// Elements that never produce boxes.
    pub fn is_metadata(&self) -> bool {
        matches!(
            self,
            Tag::Head | Tag::Style | Tag::Script | Tag::Title | Tag::Meta | Tag::Link
        )
    }
}

/// A node in our DOM tree.
#[derive(Debug, Clone)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

/// An element node carrying tag, attributes, and children.
#[derive(Debug, Clone)]
pub struct ElementNode {
    pub tag: Tag,
    pub attributes: HashMap<String, String>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attributes
            .get("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().contains(&class)
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn inline_style(&self) -> Option<&str> {
        self.attr("style")
    }

    pub fn src(&self) -> Option<&str> {
        self.attr("src")
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                DomNode::Text(t) => out.push_str(t),
                DomNode::Element(e) => out.push_str(&e.text_content()),
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Parser – simple recursive descent over HTML
// ---------------------------------------------------------------------------

/// Maximum depth of open elements.
pub const MAX_NESTING: usize = 128;

/// Start tags that close an open `<p>`.
const CLOSES_P: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "details", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "ul",
];

/// Elements an implied `</p>` does not reach past.
const P_SCOPE: &[&str] = &["table", "td", "th", "caption", "button", "html"];

/// For a start tag, the open elements it implicitly closes and the elements
/// that stop the search. `None` when the tag closes nothing.
fn implied_end(start: &str) -> Option<(&'static [&'static str], &'static [&'static str])> {
    match start {
        "li" => Some((&["li"], &["ul", "ol", "table", "td", "th"])),
        "dt" | "dd" => Some((&["dt", "dd"], &["dl", "table", "td", "th"])),
        "td" | "th" => Some((&["td", "th"], &["tr", "table"])),
        "tr" => Some((&["tr"], &["thead", "tbody", "tfoot", "table"])),
        "thead" | "tbody" | "tfoot" => {
            Some((&["thead", "tbody", "tfoot", "tr"], &["table"]))
        }
        "option" | "optgroup" => Some((&["option"], &["select", "optgroup"])),
        s if CLOSES_P.contains(&s) => Some((&["p"], P_SCOPE)),
        _ => None,
    }
}

/// Parse an HTML string into a list of DOM nodes.
pub fn parse_html(html: &str) -> Vec<DomNode> {
    let mut parser = Parser::new(html);
    parser.parse_nodes()
}

fn ends_inline(nodes: &[DomNode]) -> bool {
    match nodes.last() {
        Some(DomNode::Text(_)) => true,
        Some(DomNode::Element(e)) => e.tag.is_inline() && e.tag != Tag::Br,
        None => false,
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    /// Names of the currently open elements, outermost first.
    open: Vec<String>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            open: Vec::new(),
        }
    }

    fn parse_nodes(&mut self) -> Vec<DomNode> {
        let mut nodes = Vec::new();
        loop {
            let skipped = self.skip_whitespace_preserve();
            if self.eof() {
                break;
            }
            // Whitespace between two inline siblings still separates words.
            if skipped && self.next_is_tag_start() && ends_inline(&nodes) {
                if Tag::from_str(&self.peek_opening_name()).is_inline() {
                    nodes.push(DomNode::Text(" ".to_string()));
                }
            }
            if self.next_is_tag_start() && self.start_closes_open() {
                // Ends this element or an ancestor; the start tag is parsed
                // by the level it belongs to.
                break;
            }
            if self.starts_with("</") {
                let name = self.peek_closing_name();
                if self.open.iter().any(|open| *open == name) {
                    // Closes this element or an ancestor.
                    break;
                }
                // Stray end tag.
                self.skip_past('>');
                continue;
            }
            if let Some(node) = self.parse_node() {
                nodes.push(node);
            }
        }
        nodes
    }

    /// Whether the start tag at the cursor implicitly closes an open element.
    fn start_closes_open(&self) -> bool {
        let Some((targets, scope)) = implied_end(&self.peek_opening_name()) else {
            return false;
        };
        for open in self.open.iter().rev() {
            if targets.contains(&open.as_str()) {
                return true;
            }
            if scope.contains(&open.as_str()) {
                return false;
            }
        }
        false
    }

    fn parse_node(&mut self) -> Option<DomNode> {
        if self.starts_with("<!--") {
            self.skip_comment();
            return None;
        }
        if self.starts_with("<!") || self.starts_with("<?") {
            // Skip doctype / processing instructions
            self.skip_past('>');
            return None;
        }
        if self.starts_with("<") && self.next_is_tag_start() {
            Some(self.parse_element())
        } else {
            Some(self.parse_text())
        }
    }

    /// `<` followed by a letter.
    fn next_is_tag_start(&self) -> bool {
        let mut chars = self.input[self.pos..].chars();
        chars.next() == Some('<') && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
    }

    fn parse_text(&mut self) -> DomNode {
        let start = self.pos;
        // A lone '<' that does not open a tag is text.
        if self.starts_with("<") {
            self.advance(1);
        }
        while !self.eof() && !self.starts_with("<") {
            self.advance(1);
        }
        let text = &self.input[start..self.pos];
        DomNode::Text(decode_entities(text))
    }

    fn parse_element(&mut self) -> DomNode {
        // Consume '<'
        self.advance(1);
        let tag_name = self.parse_tag_name().to_ascii_lowercase();
        let tag = Tag::from_str(&tag_name);
        let mut elem = ElementNode::new(tag.clone());

        // Parse attributes
        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            let (key, value) = self.parse_attribute();
            if key.is_empty() {
                // Junk character inside the tag.
                self.advance(1);
                continue;
            }
            elem.attributes.entry(key).or_insert(value);
        }

        if self.starts_with("/>") {
            self.advance(2);
            return DomNode::Element(elem);
        }
        if self.starts_with(">") {
            self.advance(1);
        }
        if tag.is_void() {
            return DomNode::Element(elem);
        }

        if tag.is_raw_text() {
            let raw = self.parse_raw_text(&tag_name);
            if !raw.is_empty() {
                let text = if tag == Tag::Title {
                    decode_entities(&raw)
                } else {
                    raw
                };
                elem.children.push(DomNode::Text(text));
            }
            return DomNode::Element(elem);
        }

        if self.open.len() >= MAX_NESTING {
            // Content continues as siblings.
            return DomNode::Element(elem);
        }

        // Parse children
        self.open.push(tag_name.clone());
        elem.children = self.parse_nodes();
        self.open.pop();

        // Consume our own closing tag; leave an ancestor's in place.
        if self.starts_with("</") && self.peek_closing_name() == tag_name {
            self.skip_past('>');
        }

        DomNode::Element(elem)
    }

    /// Read everything up to `</name` (case-insensitive) and consume the end tag.
    fn parse_raw_text(&mut self, name: &str) -> String {
        let closing = format!("</{name}");
        let rest = &self.input[self.pos..];
        let lower = rest.to_ascii_lowercase();
        match lower.find(&closing) {
            Some(idx) => {
                let text = rest[..idx].to_string();
                self.pos += idx;
                self.skip_past('>');
                text
            }
            None => {
                self.pos = self.input.len();
                rest.to_string()
            }
        }
    }

    fn peek_opening_name(&self) -> String {
        self.input[self.pos + 1..]
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
            .collect::<String>()
            .to_ascii_lowercase()
    }

    fn peek_closing_name(&self) -> String {
        self.input[self.pos + 2..]
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
            .collect::<String>()
            .to_ascii_lowercase()
    }

    fn parse_tag_name(&mut self) -> String {
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ':' {
                self.advance(1);
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn parse_attribute(&mut self) -> (String, String) {
        let key = self.parse_tag_name().to_ascii_lowercase();
        self.skip_whitespace();
        if !self.starts_with("=") {
            return (key, String::new());
        }
        self.advance(1); // skip '='
        self.skip_whitespace();
        let value = self.parse_attr_value();
        (key, value)
    }

    fn parse_attr_value(&mut self) -> String {
        for quote in ["\"", "'"] {
            if self.starts_with(quote) {
                self.advance(1);
                let start = self.pos;
                while !self.eof() && !self.starts_with(quote) {
                    self.advance(1);
                }
                let val = self.input[start..self.pos].to_string();
                if !self.eof() {
                    self.advance(1);
                }
                return decode_entities(&val);
            }
        }
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_whitespace() || c == '>' {
                break;
            }
            if c == '/' && self.input[self.pos..].starts_with("/>") {
                break;
            }
            self.advance(1);
        }
        decode_entities(&self.input[start..self.pos])
    }

    fn skip_whitespace(&mut self) {
        while !self.eof() && self.current_char().is_whitespace() {
            self.advance(1);
        }
    }

    /// Skip runs of pure whitespace between elements. Returns true when
    /// something was skipped.
    fn skip_whitespace_preserve(&mut self) -> bool {
        let saved = self.pos;
        while !self.eof() && self.current_char().is_whitespace() {
            self.advance(1);
        }
        // If we reached a tag or EOF, keep the skip. Otherwise revert.
        if !self.eof() && !self.starts_with("<") {
            self.pos = saved;
        }
        self.pos > saved
    }

    fn skip_comment(&mut self) {
        self.advance(4); // skip <!--
        while !self.eof() && !self.starts_with("-->") {
            self.advance(1);
        }
        if !self.eof() {
            self.advance(3);
        }
    }

    fn skip_past(&mut self, c: char) {
        match self.input[self.pos..].find(c) {
            Some(idx) => self.pos += idx + c.len_utf8(),
            None => self.pos = self.input.len(),
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_char(&self) -> char {
        self.input[self.pos..].chars().next().unwrap_or('\0')
    }

    fn advance(&mut self, n: usize) {
        // Advance by `n` characters (not bytes).
        for _ in 0..n {
            if let Some(c) = self.input[self.pos..].chars().next() {
                self.pos += c.len_utf8();
            }
        }
    }
}

/// Decode character references (`&amp;`, `&#169;`, `&#xA9;`, ...).
/// Unknown references are left untouched.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after.find(';').filter(|&end| end <= 10).and_then(|end| {
            let name = &after[..end];
            decode_reference(name).map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &after[end + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{00A0}',
        "copy" => '\u{00A9}',
        "reg" => '\u{00AE}',
        "trade" => '\u{2122}',
        "mdash" => '\u{2014}',
        "ndash" => '\u{2013}',
        "hellip" => '\u{2026}',
        "bull" => '\u{2022}',
        "middot" => '\u{00B7}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201C}',
        "rdquo" => '\u{201D}',
        "euro" => '\u{20AC}',
        "pound" => '\u{00A3}',
        "times" => '\u{00D7}',
        "deg" => '\u{00B0}',
        _ => return None,
    };
    Some(c)
}

// ---------------------------------------------------------------------------
// Convenience helpers
// ---------------------------------------------------------------------------

/// A stylesheet referenced by the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleSource {
    /// Text of a `<style>` element.
    Embedded(String),
    /// `href` of a `<link rel="stylesheet">`, unresolved.
    Linked(String),
}

/// Collect `<style>` and `<link rel="stylesheet">` elements in document order.
pub fn style_sources(nodes: &[DomNode]) -> Vec<StyleSource> {
    let mut out = Vec::new();
    collect_style_sources(nodes, &mut out);
    out
}

fn collect_style_sources(nodes: &[DomNode], out: &mut Vec<StyleSource>) {
    for node in nodes {
        let DomNode::Element(e) = node else { continue };
        match e.tag {
            Tag::Style => {
                let media = e.attr("media").unwrap_or("all");
                if media_applies_to_print(media) {
                    out.push(StyleSource::Embedded(e.text_content()));
                }
            }
            Tag::Link => {
                let is_sheet = e
                    .attr("rel")
                    .map(|rel| {
                        rel.split_whitespace()
                            .any(|r| r.eq_ignore_ascii_case("stylesheet"))
                    })
                    .unwrap_or(false);
                let media = e.attr("media").unwrap_or("all");
                if let (true, Some(href)) = (is_sheet, e.attr("href")) {
                    if media_applies_to_print(media) {
                        out.push(StyleSource::Linked(href.trim().to_string()));
                    }
                }
            }
            _ => collect_style_sources(&e.children, out),
        }
    }
}

/// True when a media query list includes print output.
pub fn media_applies_to_print(media: &str) -> bool {
    media.split(',').any(|m| {
        let m = m.trim().to_ascii_lowercase();
        m.is_empty() || m.starts_with("all") || m.starts_with("print") || m.starts_with("only print")
    })
}

/// Text of the first `<title>` element, trimmed.
pub fn document_title(nodes: &[DomNode]) -> Option<String> {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Title {
                let title = e.text_content().split_whitespace().collect::<Vec<_>>().join(" ");
                return (!title.is_empty()).then_some(title);
            }
            if let Some(t) = document_title(&e.children) {
                return Some(t);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_element(nodes: &[DomNode]) -> &ElementNode {
        match &nodes[0] {
            DomNode::Element(e) => e,
            DomNode::Text(t) => panic!("Expected element, got text {t:?}"),
        }
    }

    #[test]
    fn parse_simple_div() {
        let html = r#"<div class="section intro"><p>Hello</p></div>"#;
        let nodes = parse_html(html);
        assert_eq!(nodes.len(), 1);
        let e = first_element(&nodes);
        assert_eq!(e.tag, Tag::Div);
        assert_eq!(e.classes(), vec!["section", "intro"]);
        assert!(e.has_class("section"));
        assert_eq!(e.children.len(), 1);
    }

    #[test]
    fn parse_self_closing_img() {
        let html = r#"<img src="logo.png" />"#;
        let nodes = parse_html(html);
        assert_eq!(nodes.len(), 1);
        let e = first_element(&nodes);
        assert_eq!(e.tag, Tag::Img);
        assert_eq!(e.src(), Some("logo.png"));
    }

    #[test]
    fn void_elements_without_slash_have_no_children() {
        let html = r#"<head><meta charset="UTF-8"><link rel="stylesheet" href="a.css"></head><p>x</p>"#;
        let nodes = parse_html(html);
        assert_eq!(nodes.len(), 2);
        let head = first_element(&nodes);
        assert_eq!(head.children.len(), 2);
    }

    #[test]
    fn parse_nested_spans() {
        let html = r#"<p>Hello <span class="bold">world</span>!</p>"#;
        let nodes = parse_html(html);
        assert_eq!(nodes.len(), 1);
        let e = first_element(&nodes);
        assert_eq!(e.tag, Tag::P);
        assert_eq!(e.children.len(), 3); // "Hello ", <span>, "!"
    }

    #[test]
    fn parse_table_with_row_groups() {
        let html = "<table><thead><tr><th>A</th></tr></thead><tr><td>1</td></tr></table>";
        let nodes = parse_html(html);
        let table = first_element(&nodes);
        assert_eq!(table.tag, Tag::Table);
        assert_eq!(table.children.len(), 2);
        match &table.children[0] {
            DomNode::Element(thead) => assert_eq!(thead.tag, Tag::Thead),
            _ => panic!("Expected thead"),
        }
    }

    #[test]
    fn style_content_is_raw_text() {
        let html = "<style>td > p { color: red } a<b</style><p>after</p>";
        let nodes = parse_html(html);
        assert_eq!(nodes.len(), 2);
        let style = first_element(&nodes);
        assert_eq!(style.text_content(), "td > p { color: red } a<b");
    }

    #[test]
    fn stray_closing_tag_is_ignored() {
        let nodes = parse_html("<p>one</p></div><p>two</p>");
        let elements = nodes
            .iter()
            .filter(|n| matches!(n, DomNode::Element(_)))
            .count();
        assert_eq!(elements, 2);
    }

    #[test]
    fn mismatched_close_is_left_for_ancestor() {
        let nodes = parse_html("<div><span>x</div><p>y</p>");
        assert_eq!(nodes.len(), 2);
        let div = first_element(&nodes);
        assert_eq!(div.children.len(), 1);
    }

    fn tags(nodes: &[DomNode]) -> Vec<Tag> {
        nodes
            .iter()
            .filter_map(|n| match n {
                DomNode::Element(e) => Some(e.tag.clone()),
                DomNode::Text(_) => None,
            })
            .collect()
    }

    #[test]
    fn paragraphs_close_before_blocks() {
        let nodes = parse_html("<p>a<p>b<div>c</div><p>d<ul><li>e</li></ul>");
        assert_eq!(tags(&nodes), vec![Tag::P, Tag::P, Tag::Div, Tag::P, Tag::Ul]);
        let second = match &nodes[1] {
            DomNode::Element(e) => e,
            DomNode::Text(t) => panic!("Expected <p>, got text {t:?}"),
        };
        assert_eq!(second.text_content(), "b");
    }

    #[test]
    fn paragraph_inside_cell_stays_in_cell() {
        let nodes = parse_html("<p>x<table><tr><td><p>a<p>b</td></tr></table>");
        assert_eq!(tags(&nodes), vec![Tag::P, Tag::Table]);
        let table = &first_element(&nodes[1..]);
        let tr = first_element(&table.children);
        let td = first_element(&tr.children);
        assert_eq!(tags(&td.children), vec![Tag::P, Tag::P]);
    }

    #[test]
    fn list_items_close_each_other() {
        let nodes = parse_html("<ul><li>one<li>two<ul><li>inner</ul><li>three</ul>");
        let ul = first_element(&nodes);
        assert_eq!(tags(&ul.children), vec![Tag::Li, Tag::Li, Tag::Li]);
        let two = match &ul.children[1] {
            DomNode::Element(e) => e,
            DomNode::Text(t) => panic!("Expected <li>, got text {t:?}"),
        };
        assert_eq!(tags(&two.children), vec![Tag::Ul]);
    }

    #[test]
    fn table_cells_and_rows_close_each_other() {
        let nodes = parse_html(
            "<table><thead><tr><th>H1<th>H2<tbody><tr><td>A<td>B<tr><td>C<td>D</table><p>after</p>",
        );
        assert_eq!(tags(&nodes), vec![Tag::Table, Tag::P]);
        let table = first_element(&nodes);
        assert_eq!(tags(&table.children), vec![Tag::Thead, Tag::Tbody]);
        let tbody = match &table.children[1] {
            DomNode::Element(e) => e,
            DomNode::Text(t) => panic!("Expected <tbody>, got text {t:?}"),
        };
        assert_eq!(tags(&tbody.children), vec![Tag::Tr, Tag::Tr]);
        for row in &tbody.children {
            let DomNode::Element(row) = row else { unreachable!() };
            assert_eq!(tags(&row.children), vec![Tag::Td, Tag::Td]);
        }
    }

    #[test]
    fn definition_terms_close_each_other() {
        let nodes = parse_html("<dl><dt>Term<dd>One<dt>Next<dd>Two</dl>");
        let dl = first_element(&nodes);
        assert_eq!(dl.children.len(), 4);
    }

    #[test]
    fn options_close_each_other() {
        let nodes = parse_html("<select><option>a<option>b<optgroup><option>c</select><p>x</p>");
        assert_eq!(tags(&nodes), vec![Tag::Unknown("select".into()), Tag::P]);
        let select = first_element(&nodes);
        let option = Tag::Unknown("option".into());
        assert_eq!(
            tags(&select.children),
            vec![option.clone(), option.clone(), Tag::Unknown("optgroup".into())]
        );
        let DomNode::Element(group) = &select.children[2] else { unreachable!() };
        assert_eq!(tags(&group.children), vec![option]);
    }

    #[test]
    fn nesting_is_capped() {
        let depth = 50_000;
        let html = format!("{}deep{}", "<div>".repeat(depth), "</div>".repeat(depth));
        let nodes = parse_html(&html);
        let mut level = 0;
        let mut current = &nodes;
        while let Some(DomNode::Element(e)) = current.first() {
            level += 1;
            current = &e.children;
        }
        assert!(level <= MAX_NESTING + 1, "depth {level}");
    }

    #[test]
    fn text_may_start_with_multibyte_chars() {
        let nodes = parse_html("<p>é</p><p> ’x’</p>");
        assert_eq!(first_element(&nodes).text_content(), "é");
        assert_eq!(first_element(&nodes[1..]).text_content(), " ’x’");
    }

    #[test]
    fn entities_are_decoded_once() {
        assert_eq!(decode_entities("a &amp;lt; b"), "a &lt; b");
        assert_eq!(decode_entities("&#169; &#xA9; &copy;"), "\u{A9} \u{A9} \u{A9}");
        assert_eq!(decode_entities("AT&T & co"), "AT&T & co");
    }

    #[test]
    fn collects_style_sources_in_order() {
        let html = r#"<html><head>
            <link href="https://fonts.example/css" rel="stylesheet">
            <style>p { color: red }</style>
            <style media="screen">p { color: blue }</style>
            <title>Statement of Work</title>
        </head><body></body></html>"#;
        let nodes = parse_html(html);
        let sources = style_sources(&nodes);
        assert_eq!(
            sources,
            vec![
                StyleSource::Linked("https://fonts.example/css".into()),
                StyleSource::Embedded("p { color: red }".into()),
            ]
        );
        assert_eq!(document_title(&nodes).as_deref(), Some("Statement of Work"));
    }
}
