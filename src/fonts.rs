//! Text measurement for the standard PDF fonts.
//!
//! Pages are set in the base-14 faces (Helvetica, Times, Courier), so no font
//! files are loaded. Advance widths come from the Adobe AFM tables for
//! printable ASCII; everything else measures as an average glyph.

use std::collections::HashMap;

/// Advance widths (1/1000 em) for ASCII 32..=126, Helvetica.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A..M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N..Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a..m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n..z
    334, 260, 334, 584, // {..~
];

/// Advance widths (1/1000 em) for ASCII 32..=126, Helvetica-Bold.
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    333, 333, 584, 584, 584, 611, 975, // :..@
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // A..M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N..Z
    333, 278, 333, 584, 556, 333, // [..`
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // a..m
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // n..z
    389, 280, 389, 584, // {..~
];

/// Times is narrower than Helvetica; its widths are approximated by scaling.
const TIMES_SCALE: f32 = 0.92;

/// Courier is monospaced.
const COURIER_ADVANCE: f32 = 600.0;

/// Advance for characters outside the tables.
const FALLBACK_ADVANCE: f32 = 556.0;

/// Vertical metrics and widths of one face.
#[derive(Debug, Clone)]
pub struct FontData {
    widths: Option<&'static [u16; 95]>,
    width_scale: f32,
    pub units_per_em: f32,
    pub ascender: f32,
    pub descender: f32,
}

impl FontData {
    fn advance(&self, ch: char) -> f32 {
        let code = ch as u32;
        match self.widths {
            None => COURIER_ADVANCE,
            Some(table) if (32..=126).contains(&code) => {
                table[(code - 32) as usize] as f32 * self.width_scale
            }
            Some(table) if ch == '\u{00A0}' => table[0] as f32 * self.width_scale,
            Some(_) => FALLBACK_ADVANCE * self.width_scale,
        }
    }
}

/// Metrics for every standard face, keyed by family and variant.
pub struct FontManager {
    fonts: HashMap<FontKey, FontData>,
    default: FontData,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct FontKey {
    pub family: String,
    pub bold: bool,
    pub italic: bool,
}

impl FontKey {
    pub fn new(family: &str, bold: bool, italic: bool) -> Self {
        Self {
            family: family.to_string(),
            bold,
            italic,
        }
    }
}

impl FontManager {
    pub fn new() -> Self {
        let face = |widths: Option<&'static [u16; 95]>, width_scale: f32, ascender: f32, descender: f32| {
            FontData {
                widths,
                width_scale,
                units_per_em: 1000.0,
                ascender,
                descender,
            }
        };
        let mut fonts = HashMap::new();
        for italic in [false, true] {
            fonts.insert(
                FontKey::new("Helvetica", false, italic),
                face(Some(&HELVETICA), 1.0, 718.0, -207.0),
            );
            fonts.insert(
                FontKey::new("Helvetica", true, italic),
                face(Some(&HELVETICA_BOLD), 1.0, 718.0, -207.0),
            );
            fonts.insert(
                FontKey::new("Times", false, italic),
                face(Some(&HELVETICA), TIMES_SCALE, 683.0, -217.0),
            );
            fonts.insert(
                FontKey::new("Times", true, italic),
                face(Some(&HELVETICA_BOLD), TIMES_SCALE, 683.0, -217.0),
            );
            for bold in [false, true] {
                fonts.insert(
                    FontKey::new("Courier", bold, italic),
                    face(None, 1.0, 629.0, -157.0),
                );
            }
        }
        Self {
            fonts,
            default: face(Some(&HELVETICA), 1.0, 718.0, -207.0),
        }
    }

    /// Font data for a key, falling back to regular Helvetica.
    pub fn get(&self, key: &FontKey) -> &FontData {
        self.fonts.get(key).unwrap_or(&self.default)
    }

    /// Width of a string at a given font size, in points.
    pub fn measure_text_width(
        &self,
        text: &str,
        font_size: f32,
        bold: bool,
        italic: bool,
        family: &str,
    ) -> f32 {
        let data = self.get(&FontKey::new(family, bold, italic));
        let units: f32 = text.chars().map(|c| data.advance(c)).sum();
        units * font_size / data.units_per_em
    }

    /// Height of one line box, in points.
    pub fn line_height(&self, font_size: f32, line_height_factor: f32) -> f32 {
        font_size * line_height_factor
    }

    /// Distance from the top of a line box to the baseline, in points. Any
    /// extra leading is split evenly above and below the glyphs.
    pub fn baseline_offset(
        &self,
        font_size: f32,
        line_height_factor: f32,
        bold: bool,
        italic: bool,
        family: &str,
    ) -> f32 {
        let data = self.get(&FontKey::new(family, bold, italic));
        let scale = font_size / data.units_per_em;
        let content = (data.ascender - data.descender) * scale;
        let half_leading = (self.line_height(font_size, line_height_factor) - content) / 2.0;
        half_leading + data.ascender * scale
    }
}

impl Default for FontManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Word-wrap text to fit within `max_width` points. Returns a vec of lines.
/// Words wider than a whole line are broken between characters.
pub fn wrap_text(
    text: &str,
    font_size: f32,
    bold: bool,
    italic: bool,
    family: &str,
    max_width: f32,
    fonts: &FontManager,
) -> Vec<String> {
    if max_width <= 0.0 || text.is_empty() {
        return vec![text.to_string()];
    }
    let measure = |s: &str| fonts.measure_text_width(s, font_size, bold, italic, family);

    let mut lines: Vec<String> = Vec::new();
    // Split on forced breaks first
    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current_line = String::new();
        for word in words {
            let candidate = if current_line.is_empty() {
                word.to_string()
            } else {
                format!("{current_line} {word}")
            };
            if measure(&candidate) <= max_width {
                current_line = candidate;
                continue;
            }
            if !current_line.is_empty() {
                lines.push(std::mem::take(&mut current_line));
            }
            if measure(word) <= max_width {
                current_line = word.to_string();
                continue;
            }
            for ch in word.chars() {
                let mut next = current_line.clone();
                next.push(ch);
                if measure(&next) > max_width && !current_line.is_empty() {
                    lines.push(std::mem::take(&mut current_line));
                    current_line.push(ch);
                } else {
                    current_line = next;
                }
            }
        }
        if !current_line.is_empty() {
            lines.push(current_line);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helvetica_text_width() {
        let mgr = FontManager::default();
        // H e l l o = 722 + 556 + 222 + 222 + 556 = 2278
        let w = mgr.measure_text_width("Hello", 10.0, false, false, "Helvetica");
        assert!((w - 22.78).abs() < 0.01);
    }

    #[test]
    fn bold_is_wider_and_courier_is_fixed() {
        let mgr = FontManager::default();
        let regular = mgr.measure_text_width("Statement", 12.0, false, false, "Helvetica");
        let bold = mgr.measure_text_width("Statement", 12.0, true, false, "Helvetica");
        assert!(bold > regular);
        let mono = mgr.measure_text_width("iiii", 10.0, false, false, "Courier");
        assert!((mono - 24.0).abs() < 0.01);
    }

    #[test]
    fn unknown_family_falls_back() {
        let mgr = FontManager::default();
        let a = mgr.measure_text_width("abc", 12.0, false, false, "Nope");
        let b = mgr.measure_text_width("abc", 12.0, false, false, "Helvetica");
        assert_eq!(a, b);
    }

    #[test]
    fn word_wrap_basic() {
        let mgr = FontManager::default();
        let lines = wrap_text("Hello world foo bar", 12.0, false, false, "Helvetica", 60.0, &mgr);
        assert!(lines.len() >= 2, "Expected wrapping, got {:?}", lines);
        for line in &lines {
            assert!(mgr.measure_text_width(line, 12.0, false, false, "Helvetica") <= 60.0);
        }
    }

    #[test]
    fn long_words_are_broken() {
        let mgr = FontManager::default();
        let lines = wrap_text(
            "https://demo.qandu.me/a/very/long/path/segment",
            12.0,
            false,
            false,
            "Helvetica",
            50.0,
            &mgr,
        );
        assert!(lines.len() > 2);
        assert_eq!(lines.concat(), "https://demo.qandu.me/a/very/long/path/segment");
    }

    #[test]
    fn forced_breaks_are_kept() {
        let mgr = FontManager::default();
        let lines = wrap_text("one\ntwo", 12.0, false, false, "Helvetica", 500.0, &mgr);
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn baseline_sits_inside_line_box() {
        let mgr = FontManager::default();
        let offset = mgr.baseline_offset(10.0, 1.2, false, false, "Helvetica");
        assert!(offset > 7.0 && offset < 12.0, "baseline at {offset}");
    }
}
