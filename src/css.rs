//! Stylesheet parser – turns CSS text into rule sets, `@page` rules and
//! `@import` references.
//!
//! Parsing is forgiving in the way browsers are: anything that cannot be
//! understood (an unknown at-rule, a selector with pseudo-classes, a broken
//! declaration) is dropped and parsing resumes at the next rule. Nothing in
//! here can fail.

use crate::dom::{media_applies_to_print, ElementNode};

// ---------------------------------------------------------------------------
// Stylesheet types
// ---------------------------------------------------------------------------

/// A parsed stylesheet.
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    pub rules: Vec<StyleRule>,
    pub page_rules: Vec<PageRule>,
    /// `@import` targets, unresolved, in source order.
    pub imports: Vec<String>,
}

/// `selector, selector { declarations }`
#[derive(Debug, Clone)]
pub struct StyleRule {
    pub selectors: Vec<Selector>,
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

/// An `@page` rule with its nested margin-box rules.
#[derive(Debug, Clone, Default)]
pub struct PageRule {
    /// Page selector text (`:first`, `:left`, ...); empty for a bare `@page`.
    pub selector: String,
    pub declarations: Vec<Declaration>,
    /// `(at-keyword, declarations)`, e.g. `("bottom-center", [...])`.
    pub margin_boxes: Vec<(String, Vec<Declaration>)>,
}

/// A complex selector: compounds joined by combinators, left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    /// The first compound has no combinator; each following one carries the
    /// combinator that links it to its left neighbour.
    parts: Vec<(Combinator, Compound)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

/// `tag.class#id`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compound {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
}

/// `(ids, classes, types)`
pub type Specificity = (u32, u32, u32);

// ---------------------------------------------------------------------------
// Selector matching
// ---------------------------------------------------------------------------

impl Selector {
    /// Parse one selector (no commas). Returns `None` for anything this engine
    /// cannot match: pseudo-classes, attribute selectors, sibling combinators.
    pub fn parse(text: &str) -> Option<Self> {
        let spaced = text.replace('>', " > ");
        let mut parts = Vec::new();
        let mut pending = Combinator::Descendant;
        for token in spaced.split_whitespace() {
            if token == ">" {
                if parts.is_empty() {
                    return None;
                }
                pending = Combinator::Child;
                continue;
            }
            let compound = Compound::parse(token)?;
            parts.push((pending, compound));
            pending = Combinator::Descendant;
        }
        if parts.is_empty() || pending == Combinator::Child {
            return None;
        }
        Some(Self { parts })
    }

    pub fn specificity(&self) -> Specificity {
        self.parts.iter().fold((0, 0, 0), |(a, b, c), (_, comp)| {
            (
                a + comp.id.is_some() as u32,
                b + comp.classes.len() as u32,
                c + comp.tag.is_some() as u32,
            )
        })
    }

    /// Does this selector match `element`, whose ancestors are listed
    /// outermost first?
    pub fn matches(&self, element: &ElementNode, ancestors: &[&ElementNode]) -> bool {
        let Some(((_, last), rest)) = self.parts.split_last() else {
            return false;
        };
        if !last.matches(element) {
            return false;
        }
        let combinator = self.parts[self.parts.len() - 1].0;
        Self::match_ancestors(rest, combinator, ancestors)
    }

    /// `parts` still to match, `link` joins the last of them to the element
    /// already matched; `ancestors` are that element's ancestors.
    fn match_ancestors(
        parts: &[(Combinator, Compound)],
        link: Combinator,
        ancestors: &[&ElementNode],
    ) -> bool {
        let Some(((next_link, compound), rest)) = parts.split_last() else {
            return true;
        };
        match link {
            Combinator::Child => match ancestors.split_last() {
                Some((parent, above)) => {
                    compound.matches(parent) && Self::match_ancestors(rest, *next_link, above)
                }
                None => false,
            },
            Combinator::Descendant => (0..ancestors.len()).rev().any(|i| {
                compound.matches(ancestors[i])
                    && Self::match_ancestors(rest, *next_link, &ancestors[..i])
            }),
        }
    }
}

impl Compound {
    fn parse(token: &str) -> Option<Self> {
        let mut compound = Compound::default();
        let mut chars = token.char_indices().peekable();
        let ident_end = |s: &str, from: usize| {
            s[from..]
                .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
                .map(|i| from + i)
                .unwrap_or(s.len())
        };
        while let Some(&(i, c)) = chars.peek() {
            let (kind, start) = match c {
                '*' if i == 0 => {
                    chars.next();
                    continue;
                }
                '.' | '#' => (c, i + 1),
                c if i == 0 && (c.is_alphabetic() || c == '-' || c == '_') => ('t', i),
                _ => return None,
            };
            let end = ident_end(token, start);
            if end == start {
                return None;
            }
            let ident = &token[start..end];
            match kind {
                '.' => compound.classes.push(ident.to_string()),
                '#' => compound.id = Some(ident.to_string()),
                _ => compound.tag = Some(ident.to_ascii_lowercase()),
            }
            while chars.peek().map(|&(j, _)| j < end).unwrap_or(false) {
                chars.next();
            }
        }
        Some(compound)
    }

    fn matches(&self, element: &ElementNode) -> bool {
        if let Some(tag) = &self.tag {
            if element.tag.name() != tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.id() != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|c| element.has_class(c))
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Nested `@media` blocks deeper than this are dropped.
const MAX_MEDIA_NESTING: usize = 16;

/// Parse a stylesheet. Never fails; unusable input is skipped.
pub fn parse_stylesheet(css: &str) -> Stylesheet {
    let cleaned = strip_comments(css);
    let mut sheet = Stylesheet::default();
    parse_rule_list(&cleaned, &mut sheet, 0);
    sheet
}

/// Parse the body of a `style="..."` attribute.
pub fn parse_declarations(block: &str) -> Vec<Declaration> {
    split_top_level(block, ';')
        .into_iter()
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim().to_ascii_lowercase();
            let mut value = value.trim();
            let mut important = false;
            if let Some(idx) = value.to_ascii_lowercase().rfind("!important") {
                important = true;
                value = value[..idx].trim_end();
            }
            if prop.is_empty() || value.is_empty() {
                return None;
            }
            Some(Declaration {
                property: prop,
                value: value.to_string(),
                important,
            })
        })
        .collect()
}

fn parse_rule_list(css: &str, sheet: &mut Stylesheet, depth: usize) {
    let mut pos = 0;
    while pos < css.len() {
        let rest = &css[pos..];
        let trimmed = rest.trim_start();
        if trimmed.is_empty() {
            break;
        }
        pos += rest.len() - trimmed.len();

        if let Some(at) = trimmed.strip_prefix('@') {
            let name_len = at
                .find(|c: char| !(c.is_alphanumeric() || c == '-'))
                .unwrap_or(at.len());
            let name = at[..name_len].to_ascii_lowercase();
            let after_name = pos + 1 + name_len;
            // Prelude runs to the first top-level `;` or `{`.
            let Some((prelude_end, terminator)) = find_prelude_end(&css[after_name..]) else {
                break;
            };
            let prelude = css[after_name..after_name + prelude_end].trim();
            let block_start = after_name + prelude_end + 1;
            if terminator == ';' {
                if name == "import" {
                    if let Some(target) = import_target(prelude) {
                        sheet.imports.push(target);
                    }
                }
                pos = block_start;
                continue;
            }
            let block_end = matching_brace(css, block_start);
            let body = &css[block_start..block_end];
            match name.as_str() {
                "page" => sheet.page_rules.push(parse_page_rule(prelude, body)),
                "media" => {
                    if depth < MAX_MEDIA_NESTING && media_applies_to_print(prelude) {
                        parse_rule_list(body, sheet, depth + 1);
                    }
                }
                // @font-face, @keyframes, @supports, ...
                _ => {}
            }
            pos = (block_end + 1).min(css.len());
            continue;
        }

        let Some(open) = find_prelude_end(trimmed).filter(|&(_, t)| t == '{').map(|(i, _)| i)
        else {
            break;
        };
        let prelude = &trimmed[..open];
        let block_start = pos + open + 1;
        let block_end = matching_brace(css, block_start);
        let selectors: Vec<Selector> = split_top_level(prelude, ',')
            .into_iter()
            .filter_map(|s| Selector::parse(s.trim()))
            .collect();
        if !selectors.is_empty() {
            sheet.rules.push(StyleRule {
                selectors,
                declarations: parse_declarations(&css[block_start..block_end]),
            });
        }
        pos = (block_end + 1).min(css.len());
    }
}

fn parse_page_rule(prelude: &str, body: &str) -> PageRule {
    let mut rule = PageRule {
        selector: prelude.to_string(),
        ..PageRule::default()
    };
    let mut decls = String::new();
    let mut pos = 0;
    while pos < body.len() {
        let rest = &body[pos..];
        match rest.find('@') {
            Some(at) if !inside_quotes(rest, at) => {
                decls.push_str(&rest[..at]);
                let name_start = pos + at + 1;
                let name_len = body[name_start..]
                    .find(|c: char| !(c.is_alphanumeric() || c == '-'))
                    .unwrap_or(body.len() - name_start);
                let name = body[name_start..name_start + name_len].to_ascii_lowercase();
                let Some(open) = body[name_start..].find('{') else {
                    break;
                };
                let block_start = name_start + open + 1;
                let block_end = matching_brace(body, block_start);
                rule.margin_boxes
                    .push((name, parse_declarations(&body[block_start..block_end])));
                pos = (block_end + 1).min(body.len());
                // A margin box may be followed directly by declarations.
                decls.push(';');
            }
            _ => {
                decls.push_str(rest);
                break;
            }
        }
    }
    rule.declarations = parse_declarations(&decls);
    rule
}

fn import_target(prelude: &str) -> Option<String> {
    let p = prelude.trim();
    let (target, media) = if let Some(inner) = p.strip_prefix("url(") {
        let end = inner.find(')')?;
        (unquote(&inner[..end]), inner[end + 1..].trim())
    } else {
        let q = p.chars().next()?;
        if q != '"' && q != '\'' {
            return None;
        }
        let end = p[1..].find(q)? + 1;
        (p[1..end].to_string(), p[end + 1..].trim())
    };
    if !media.is_empty() && !media_applies_to_print(media) {
        return None;
    }
    Some(target)
}

/// Strip one level of matching quotes.
pub fn unquote(s: &str) -> String {
    let s = s.trim();
    for q in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(q) && s.ends_with(q) {
            return s[1..s.len() - 1].to_string();
        }
    }
    s.to_string()
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Index and character of the first `;` or `{` outside quotes and parens.
fn find_prelude_end(s: &str) -> Option<(usize, char)> {
    let mut quote: Option<char> = None;
    let mut depth = 0i32;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth -= 1,
            (None, ';' | '{') if depth <= 0 => return Some((i, c)),
            _ => {}
        }
    }
    None
}

/// Index of the `}` closing the block whose body starts at `start`, or the
/// end of input for an unterminated block.
fn matching_brace(s: &str, start: usize) -> usize {
    let mut depth = 1;
    let mut quote: Option<char> = None;
    for (i, c) in s[start..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '{') => depth += 1,
            (None, '}') => {
                depth -= 1;
                if depth == 0 {
                    return start + i;
                }
            }
            _ => {}
        }
    }
    s.len()
}

/// Split on `sep` where it is not inside quotes or parentheses.
fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth -= 1,
            (None, c) if c == sep && depth <= 0 => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn inside_quotes(s: &str, idx: usize) -> bool {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        if i >= idx {
            break;
        }
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (None, '"' | '\'') => quote = Some(c),
            _ => {}
        }
    }
    quote.is_some()
}

// ---------------------------------------------------------------------------
// Value helpers shared by the style resolver and the page model
// ---------------------------------------------------------------------------

/// Split a property value into space-separated components, keeping quoted
/// strings and function calls whole.
pub fn split_components(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut depth = 0i32;
    let mut start: Option<usize> = None;
    for (i, c) in value.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => {
                quote = Some(c);
                start.get_or_insert(i);
            }
            (None, '(') => {
                depth += 1;
                start.get_or_insert(i);
            }
            (None, ')') => depth -= 1,
            (None, c) if c.is_whitespace() && depth <= 0 => {
                if let Some(s) = start.take() {
                    parts.push(&value[s..i]);
                }
            }
            _ => {
                start.get_or_insert(i);
            }
        }
    }
    if let Some(s) = start {
        parts.push(&value[s..]);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{parse_html, DomNode};

    fn element(html: &str) -> ElementNode {
        match parse_html(html).remove(0) {
            DomNode::Element(e) => e,
            DomNode::Text(_) => panic!("Expected element"),
        }
    }

    #[test]
    fn parses_rules_and_selector_lists() {
        let sheet = parse_stylesheet(
            "/* print */ .scope, .roles-table, .section { page-break-inside: avoid; }\n\
             table { page-break-inside: avoid }",
        );
        assert_eq!(sheet.rules.len(), 2);
        assert_eq!(sheet.rules[0].selectors.len(), 3);
        assert_eq!(
            sheet.rules[0].declarations,
            vec![Declaration {
                property: "page-break-inside".into(),
                value: "avoid".into(),
                important: false,
            }]
        );
    }

    #[test]
    fn parses_page_rule_with_margin_boxes() {
        let sheet = parse_stylesheet(
            r#"@page {
                size: A4;
                margin: 0.5in 0.5in 0.75in 0.5in;
                @bottom-center { content: "Page " counter(page) " of " counter(pages); font-size: 10px; }
                @bottom-right { content: "CONFIDENTIAL"; font-style: italic; }
            }"#,
        );
        assert!(sheet.rules.is_empty());
        assert_eq!(sheet.page_rules.len(), 1);
        let page = &sheet.page_rules[0];
        assert_eq!(page.declarations.len(), 2);
        assert_eq!(page.declarations[0].property, "size");
        assert_eq!(page.margin_boxes.len(), 2);
        assert_eq!(page.margin_boxes[0].0, "bottom-center");
        assert_eq!(
            page.margin_boxes[0].1[0].value,
            r#""Page " counter(page) " of " counter(pages)"#
        );
    }

    #[test]
    fn imports_and_media_blocks() {
        let sheet = parse_stylesheet(
            "@import url('https://fonts.example/css?family=A;B');\n\
             @import \"print.css\" print;\n\
             @import \"screen.css\" screen;\n\
             @media screen { p { color: red } }\n\
             @media print { p { color: blue } }\n\
             @font-face { font-family: X; src: url(x.woff) }",
        );
        assert_eq!(
            sheet.imports,
            vec!["https://fonts.example/css?family=A;B".to_string(), "print.css".to_string()]
        );
        assert_eq!(sheet.rules.len(), 1);
        assert_eq!(sheet.rules[0].declarations[0].value, "blue");
    }

    #[test]
    fn deeply_nested_media_is_dropped() {
        let depth = 50_000;
        let mut css = "@media print {".repeat(depth);
        css.push_str("p { color: red }");
        css.push_str(&"}".repeat(depth));
        css.push_str("@media print { @media print { h1 { color: blue } } }");
        let sheet = parse_stylesheet(&css);
        assert_eq!(sheet.rules.len(), 1);
        assert_eq!(sheet.rules[0].declarations[0].value, "blue");
    }

    #[test]
    fn important_flag_is_split_off() {
        let decls = parse_declarations("color: #666 !important; font-weight:600");
        assert!(decls[0].important);
        assert_eq!(decls[0].value, "#666");
        assert!(!decls[1].important);
    }

    #[test]
    fn unsupported_selectors_are_dropped() {
        assert!(Selector::parse("a:hover").is_none());
        assert!(Selector::parse("input[type=text]").is_none());
        assert!(Selector::parse("h1 + p").is_none());
        let sheet = parse_stylesheet("a:hover, p { color: red }");
        assert_eq!(sheet.rules[0].selectors.len(), 1);
    }

    #[test]
    fn specificity_counts() {
        let sel = Selector::parse("div#main .roles-table th").unwrap();
        assert_eq!(sel.specificity(), (1, 1, 2));
    }

    #[test]
    fn descendant_and_child_matching() {
        let table = element(r#"<table class="roles-table"><tr><th>A</th></tr></table>"#);
        let DomNode::Element(tr) = &table.children[0] else { panic!() };
        let DomNode::Element(th) = &tr.children[0] else { panic!() };
        let ancestors = [&table, tr];

        assert!(Selector::parse(".roles-table th").unwrap().matches(th, &ancestors));
        assert!(Selector::parse("table > tr > th").unwrap().matches(th, &ancestors));
        assert!(!Selector::parse("table > th").unwrap().matches(th, &ancestors));
        assert!(Selector::parse("*").unwrap().matches(th, &ancestors));
        assert!(!Selector::parse(".scope th").unwrap().matches(th, &ancestors));
    }

    #[test]
    fn components_keep_strings_and_functions() {
        let parts = split_components(r#""Page " counter(page) " of " counter(pages)"#);
        assert_eq!(parts, vec![r#""Page ""#, "counter(page)", r#"" of ""#, "counter(pages)"]);
        assert_eq!(split_components("1px solid rgb(0, 0, 0)"), vec!["1px", "solid", "rgb(0, 0, 0)"]);
    }
}
