//! Text measurement for the PDF base-14 fonts.
//!
//! The builtin engine only draws with the standard Helvetica, Times and
//! Courier faces, which every PDF viewer provides, so measurement uses their
//! published advance widths instead of parsing font files.

/// Generic family a style resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Typeface {
    #[default]
    Sans,
    Serif,
    Mono,
}

impl Typeface {
    /// Map a CSS `font-family` list to the first family we can draw.
    pub fn from_css(value: &str) -> Option<Self> {
        for family in value.split(',') {
            let family = family.trim().trim_matches(|c| c == '"' || c == '\'');
            let lower = family.to_ascii_lowercase();
            let face = match lower.as_str() {
                "monospace" | "courier" | "courier new" | "consolas" | "menlo" | "monaco" => {
                    Typeface::Mono
                }
                "serif" | "times" | "times new roman" | "georgia" | "garamond" | "palatino" => {
                    Typeface::Serif
                }
                "sans-serif" | "helvetica" | "arial" | "verdana" | "system-ui" => Typeface::Sans,
                _ => continue,
            };
            return Some(face);
        }
        None
    }
}

/// A concrete face: family plus weight and slant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FontSpec {
    pub typeface: Typeface,
    pub bold: bool,
    pub italic: bool,
}

/// Helvetica advance widths for ASCII 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
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

/// Width used for characters outside the table.
const DEFAULT_WIDTH: u16 = 556;

/// Measures strings and line heights.
#[derive(Debug, Clone, Default)]
pub struct FontMetrics;

impl FontMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Advance width of one character in 1/1000 em.
    fn char_units(&self, c: char, font: FontSpec) -> f32 {
        if font.typeface == Typeface::Mono {
            return 600.0;
        }
        let base = match c as u32 {
            code @ 32..=126 => HELVETICA_WIDTHS[(code - 32) as usize],
            0xA0 => 278,
            _ => DEFAULT_WIDTH,
        } as f32;
        // Times runs narrower than Helvetica; bold faces run wider.
        let family = match font.typeface {
            Typeface::Serif => 0.9,
            _ => 1.0,
        };
        let weight = if font.bold { 1.06 } else { 1.0 };
        base * family * weight
    }

    /// Width of `text` in points at `font_size`.
    pub fn text_width(&self, text: &str, font: FontSpec, font_size: f32) -> f32 {
        let units: f32 = text.chars().map(|c| self.char_units(c, font)).sum();
        units * font_size / 1000.0
    }

    /// Line box height for a font size and CSS line-height factor.
    pub fn line_height(&self, font_size: f32, factor: f32) -> f32 {
        font_size * factor
    }

    /// Distance from the top of the em box to the baseline.
    pub fn ascent(&self, font_size: f32) -> f32 {
        font_size * 0.78
    }
}

/// Break a monospace line into chunks that fit `max_width`.
pub fn wrap_fixed(
    line: &str,
    font_size: f32,
    max_width: f32,
    metrics: &FontMetrics,
) -> Vec<String> {
    let mono = FontSpec {
        typeface: Typeface::Mono,
        ..FontSpec::default()
    };
    let char_w = metrics.text_width("M", mono, font_size).max(0.1);
    let per_line = ((max_width / char_w).floor() as usize).max(1);
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(per_line)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helvetica_widths() {
        let m = FontMetrics::new();
        // H=722 e=556 l=222 l=222 o=556 → 2278 units
        let w = m.text_width("Hello", FontSpec::default(), 10.0);
        assert!((w - 22.78).abs() < 0.01, "{w}");
    }

    #[test]
    fn bold_is_wider_and_mono_is_fixed() {
        let m = FontMetrics::new();
        let regular = m.text_width("ebook", FontSpec::default(), 12.0);
        let bold = m.text_width(
            "ebook",
            FontSpec {
                bold: true,
                ..FontSpec::default()
            },
            12.0,
        );
        assert!(bold > regular);
        let mono = FontSpec {
            typeface: Typeface::Mono,
            ..FontSpec::default()
        };
        assert_eq!(m.text_width("iiii", mono, 10.0), m.text_width("MMMM", mono, 10.0));
    }

    #[test]
    fn css_family_lists() {
        assert_eq!(Typeface::from_css("Georgia, serif"), Some(Typeface::Serif));
        assert_eq!(Typeface::from_css("\"Fira Code\", monospace"), Some(Typeface::Mono));
        assert_eq!(Typeface::from_css("Comic Neue"), None);
    }

    #[test]
    fn fixed_wrap_splits_long_lines() {
        let m = FontMetrics::new();
        // 6pt per char at 10pt → 10 chars in 60pt
        let chunks = wrap_fixed(&"x".repeat(25), 10.0, 60.0, &m);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 10);
        assert_eq!(wrap_fixed("", 10.0, 60.0, &m), vec![String::new()]);
    }
}
