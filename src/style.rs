//! Style resolver – maps tag defaults, `<style>` stylesheet rules and inline
//! `style` attributes to a flat [`ComputedStyle`] consumed by the layout.
//!
//! Supported selectors are deliberately simple: `*`, `tag`, `.class` and
//! `tag.class`, optionally comma-separated. Rules with any other selector
//! are ignored. Sizes are in points; CSS `px` converts at 0.75 pt.

use crate::dom::{ElementNode, Tag};
use crate::fonts::{FontSpec, Typeface};

const PT_PER_PX: f32 = 0.75;

/// Fully resolved style for a single element.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    // Inherited
    pub font_size: f32,
    pub typeface: Typeface,
    pub bold: bool,
    pub italic: bool,
    pub color: Color,
    pub text_align: TextAlign,
    pub line_height: f32,
    pub underline: bool,
    pub strike: bool,

    // Not inherited
    pub display_none: bool,
    pub background_color: Color,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_left: f32,
    pub padding: f32,
    pub border_width: f32,
    pub border_color: Color,
    pub page_break_before: bool,
    pub page_break_after: bool,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            font_size: 11.0,
            typeface: Typeface::Sans,
            bold: false,
            italic: false,
            color: Color::BLACK,
            text_align: TextAlign::Left,
            line_height: 1.4,
            underline: false,
            strike: false,
            display_none: false,
            background_color: Color::TRANSPARENT,
            margin_top: 0.0,
            margin_bottom: 0.0,
            margin_left: 0.0,
            padding: 0.0,
            border_width: 0.0,
            border_color: Color::GRAY,
            page_break_before: false,
            page_break_after: false,
        }
    }
}

impl ComputedStyle {
    pub fn font(&self) -> FontSpec {
        FontSpec {
            typeface: self.typeface,
            bold: self.bold,
            italic: self.italic,
        }
    }

    /// Copy of the inherited properties only.
    fn inherit(&self) -> Self {
        Self {
            font_size: self.font_size,
            typeface: self.typeface,
            bold: self.bold,
            italic: self.italic,
            color: self.color,
            text_align: self.text_align,
            line_height: self.line_height,
            underline: self.underline,
            strike: self.strike,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// RGBA colour (0.0 – 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const GRAY: Self = Self::rgb(0.6, 0.6, 0.6);
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn is_transparent(&self) -> bool {
        self.a < 0.001
    }

    pub fn to_rgb(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);
        match hex.len() {
            6 => Some(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => Some(Self::rgb(
                channel(&hex[0..1].repeat(2))?,
                channel(&hex[1..2].repeat(2))?,
                channel(&hex[2..3].repeat(2))?,
            )),
            _ => None,
        }
    }

    /// `#hex`, `rgb(r, g, b)`, or a handful of named colours.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.starts_with('#') {
            return Self::from_hex(value);
        }
        if let Some(args) = value
            .strip_prefix("rgb(")
            .or_else(|| value.strip_prefix("rgba("))
            .and_then(|v| v.strip_suffix(')'))
        {
            let parts: Vec<f32> = args
                .split(',')
                .take(3)
                .filter_map(|p| p.trim().parse::<f32>().ok())
                .collect();
            if let [r, g, b] = parts[..] {
                return Some(Self::rgb(r / 255.0, g / 255.0, b / 255.0));
            }
            return None;
        }
        let named = match value.to_ascii_lowercase().as_str() {
            "black" => Self::BLACK,
            "white" => Self::WHITE,
            "gray" | "grey" => Self::rgb(0.5, 0.5, 0.5),
            "silver" => Self::rgb(0.75, 0.75, 0.75),
            "red" => Self::rgb(1.0, 0.0, 0.0),
            "green" => Self::rgb(0.0, 0.5, 0.0),
            "blue" => Self::rgb(0.0, 0.0, 1.0),
            "navy" => Self::rgb(0.0, 0.0, 0.5),
            "maroon" => Self::rgb(0.5, 0.0, 0.0),
            "transparent" => Self::TRANSPARENT,
            _ => return None,
        };
        Some(named)
    }
}

// ---------------------------------------------------------------------------
// Stylesheet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
struct Selector {
    tag: Option<String>,
    class: Option<String>,
}

impl Selector {
    fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() || s.contains(|c: char| c.is_whitespace() || ">+~:[#".contains(c)) {
            return None;
        }
        if s == "*" {
            return Some(Self {
                tag: None,
                class: None,
            });
        }
        let (tag, class) = match s.split_once('.') {
            Some((tag, class)) if !class.contains('.') => (tag, Some(class)),
            Some(_) => return None,
            None => (s, None),
        };
        Some(Self {
            tag: (!tag.is_empty()).then(|| tag.to_ascii_lowercase()),
            class: class.map(str::to_string),
        })
    }

    fn matches(&self, element: &ElementNode) -> bool {
        let tag_ok = self.tag.as_deref().map_or(true, |t| t == element.tag.name());
        let class_ok = self
            .class
            .as_deref()
            .map_or(true, |c| element.classes().contains(&c));
        tag_ok && class_ok
    }

    fn specificity(&self) -> u8 {
        u8::from(self.tag.is_some()) + 10 * u8::from(self.class.is_some())
    }
}

#[derive(Debug, Clone)]
struct Rule {
    selector: Selector,
    declarations: Vec<(String, String)>,
}

/// Parsed `<style>` content.
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    rules: Vec<Rule>,
}

impl Stylesheet {
    pub fn parse(css: &str) -> Self {
        let css = strip_comments(css);
        let mut rules = Vec::new();
        let mut rest = css.as_str();

        while let Some(open) = rest.find('{') {
            let prelude = rest[..open].trim();
            let Some(close) = matching_brace(rest, open) else {
                break;
            };
            let body = &rest[open + 1..close];
            rest = &rest[close + 1..];

            if prelude.starts_with('@') {
                // @page, @media, @font-face: not supported.
                log::debug!("ignoring at-rule '{prelude}'");
                continue;
            }
            let declarations = parse_declarations(body);
            for sel in prelude.split(',') {
                match Selector::parse(sel) {
                    Some(selector) => rules.push(Rule {
                        selector,
                        declarations: declarations.clone(),
                    }),
                    None => log::debug!("ignoring unsupported selector '{}'", sel.trim()),
                }
            }
        }

        // Stable sort keeps source order within equal specificity.
        rules.sort_by_key(|r| r.selector.specificity());
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn apply(&self, element: &ElementNode, style: &mut ComputedStyle) {
        for rule in self.rules.iter().filter(|r| r.selector.matches(element)) {
            for (prop, val) in &rule.declarations {
                apply_css_property(style, prop, val);
            }
        }
    }
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => rest = "",
        }
    }
    out.push_str(rest);
    out
}

fn matching_brace(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_declarations(body: &str) -> Vec<(String, String)> {
    body.split(';')
        .filter_map(|decl| {
            let (prop, val) = decl.split_once(':')?;
            let prop = prop.trim().to_ascii_lowercase();
            let val = val.trim().trim_end_matches("!important").trim();
            (!prop.is_empty() && !val.is_empty()).then(|| (prop, val.to_string()))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Style resolution
// ---------------------------------------------------------------------------

/// Resolve an element's style: inherit from the parent, apply tag defaults,
/// then stylesheet rules, then the inline `style` attribute.
pub fn resolve_style(
    element: &ElementNode,
    parent: &ComputedStyle,
    sheet: &Stylesheet,
) -> ComputedStyle {
    let mut style = parent.inherit();
    apply_tag_defaults(&element.tag, &mut style);
    sheet.apply(element, &mut style);
    if let Some(inline) = element.inline_style() {
        for (prop, val) in parse_declarations(inline) {
            apply_css_property(&mut style, &prop, &val);
        }
    }
    style
}

/// Style of the `<body>` element itself.
pub fn root_style(sheet: &Stylesheet) -> ComputedStyle {
    let body = ElementNode::new(Tag::Body);
    resolve_style(&body, &ComputedStyle::default(), sheet)
}

fn apply_tag_defaults(tag: &Tag, s: &mut ComputedStyle) {
    match tag {
        Tag::Heading(level) => {
            let (size, top, bottom) = match level {
                1 => (22.0, 14.0, 10.0),
                2 => (17.0, 14.0, 8.0),
                3 => (14.0, 12.0, 6.0),
                4 => (12.0, 10.0, 4.0),
                5 => (11.0, 8.0, 4.0),
                _ => (10.0, 8.0, 4.0),
            };
            s.font_size = size;
            s.bold = true;
            s.margin_top = top;
            s.margin_bottom = bottom;
        }
        Tag::P => s.margin_bottom = 8.0,
        Tag::Ul | Tag::Ol => {
            s.margin_bottom = 8.0;
            s.margin_left = 18.0;
        }
        Tag::Li => s.margin_bottom = 2.0,
        Tag::Pre => {
            s.typeface = Typeface::Mono;
            s.font_size = 9.0;
            s.line_height = 1.3;
            s.background_color = Color::rgb(0.96, 0.96, 0.96);
            s.padding = 6.0;
            s.margin_bottom = 8.0;
        }
        Tag::Code => s.typeface = Typeface::Mono,
        Tag::Blockquote => {
            s.margin_left = 16.0;
            s.margin_bottom = 8.0;
            s.italic = true;
            s.color = Color::rgb(0.33, 0.33, 0.33);
            s.border_width = 2.0;
        }
        Tag::Table => s.margin_bottom = 8.0,
        Tag::Td | Tag::Th => {
            s.padding = 4.0;
            s.border_width = 0.5;
            if *tag == Tag::Th {
                s.bold = true;
                s.background_color = Color::rgb(0.93, 0.93, 0.93);
            }
        }
        Tag::Hr => {
            s.margin_top = 8.0;
            s.margin_bottom = 8.0;
            s.border_width = 0.75;
        }
        Tag::A => {
            s.color = Color::rgb(0.1, 0.05, 0.67);
            s.underline = true;
        }
        Tag::Em => s.italic = true,
        Tag::Strong => s.bold = true,
        Tag::Del => s.strike = true,
        Tag::Sup => s.font_size *= 0.7,
        Tag::Head | Tag::Title | Tag::Style | Tag::Meta => s.display_none = true,
        Tag::Unknown(name) => match name.as_str() {
            "b" => s.bold = true,
            "i" | "cite" | "var" => s.italic = true,
            "u" | "ins" => s.underline = true,
            "s" | "strike" => s.strike = true,
            "dl" => s.margin_bottom = 8.0,
            "dt" => s.bold = true,
            "dd" => {
                s.margin_left = 18.0;
                s.margin_bottom = 4.0;
            }
            "small" | "sub" => s.font_size *= 0.8,
            "script" => s.display_none = true,
            _ => {}
        },
        _ => {}
    }
}

fn apply_css_property(s: &mut ComputedStyle, prop: &str, val: &str) {
    match prop {
        "display" => s.display_none = val == "none",
        "font-size" => {
            if let Some(pt) = parse_size(val, s.font_size) {
                s.font_size = pt;
            }
        }
        "font-family" => {
            if let Some(face) = Typeface::from_css(val) {
                s.typeface = face;
            }
        }
        "font-weight" => {
            s.bold = matches!(val, "bold" | "bolder" | "600" | "700" | "800" | "900");
        }
        "font-style" => s.italic = matches!(val, "italic" | "oblique"),
        "color" => {
            if let Some(c) = Color::parse(val) {
                s.color = c;
            }
        }
        "background-color" | "background" => {
            if let Some(c) = Color::parse(val) {
                s.background_color = c;
            }
        }
        "text-align" => {
            s.text_align = match val {
                "center" => TextAlign::Center,
                "right" => TextAlign::Right,
                _ => TextAlign::Left,
            }
        }
        "text-decoration" | "text-decoration-line" => {
            s.underline = val.contains("underline");
            s.strike = val.contains("line-through");
        }
        "line-height" => {
            if let Ok(factor) = val.parse::<f32>() {
                s.line_height = factor;
            } else if let Some(pt) = parse_size(val, s.font_size) {
                s.line_height = pt / s.font_size;
            }
        }
        "margin" => {
            let parts: Vec<f32> = val
                .split_whitespace()
                .filter_map(|p| parse_size(p, s.font_size))
                .collect();
            let (top, bottom, left) = match parts[..] {
                [all] => (all, all, all),
                [v, h] => (v, v, h),
                [t, h, b] => (t, b, h),
                [t, _, b, l] => (t, b, l),
                _ => return,
            };
            s.margin_top = top;
            s.margin_bottom = bottom;
            s.margin_left = left;
        }
        "margin-top" => set_size(&mut s.margin_top, val, s.font_size),
        "margin-bottom" => set_size(&mut s.margin_bottom, val, s.font_size),
        "margin-left" => set_size(&mut s.margin_left, val, s.font_size),
        "padding" => {
            // Uniform padding only; the first value wins.
            if let Some(pt) = val
                .split_whitespace()
                .next()
                .and_then(|p| parse_size(p, s.font_size))
            {
                s.padding = pt;
            }
        }
        "border-width" => set_size(&mut s.border_width, val, s.font_size),
        "border-color" => {
            if let Some(c) = Color::parse(val) {
                s.border_color = c;
            }
        }
        "border" | "border-left" => {
            for part in val.split_whitespace() {
                if part == "none" {
                    s.border_width = 0.0;
                } else if let Some(pt) = parse_size(part, s.font_size) {
                    s.border_width = pt;
                } else if let Some(c) = Color::parse(part) {
                    s.border_color = c;
                }
            }
        }
        "page-break-before" | "break-before" => {
            s.page_break_before = val == "always" || val == "page";
        }
        "page-break-after" | "break-after" => {
            s.page_break_after = val == "always" || val == "page";
        }
        _ => {}
    }
}

fn set_size(target: &mut f32, val: &str, font_size: f32) {
    if let Some(pt) = parse_size(val, font_size) {
        *target = pt;
    }
}

/// Parse a CSS size to points, relative units against `font_size`.
pub fn parse_size(val: &str, font_size: f32) -> Option<f32> {
    let val = val.trim();
    if val == "0" {
        return Some(0.0);
    }
    let split = val.find(|c: char| c.is_ascii_alphabetic() || c == '%')?;
    let (number, unit) = val.split_at(split);
    let n: f32 = number.trim().parse().ok()?;
    let pt = match unit {
        "px" => n * PT_PER_PX,
        "pt" => n,
        "em" | "rem" => n * font_size,
        "%" => n / 100.0 * font_size,
        "mm" => n * 72.0 / 25.4,
        "cm" => n * 72.0 / 2.54,
        "in" => n * 72.0,
        _ => return None,
    };
    Some(pt)
}
