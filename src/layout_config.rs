//! Layout config – the intermediate representation between layout and PDF
//! rendering. It encodes exactly what goes on each page, in points, with the
//! origin at the top-left corner of the page.

use std::collections::BTreeMap;

use crate::fonts::FontSpec;

/// A complete document layout ready for rendering.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Document title embedded in the PDF metadata.
    pub title: String,
    pub page_width_pt: f32,
    pub page_height_pt: f32,
    pub pages: Vec<PageLayout>,
    /// Encoded image bytes keyed by the `src` they were loaded from.
    pub images: BTreeMap<String, ImageResource>,
}

#[derive(Debug, Clone)]
pub struct ImageResource {
    pub bytes: Vec<u8>,
    pub px_width: u32,
    pub px_height: u32,
}

/// One page of content.
#[derive(Debug, Clone)]
pub struct PageLayout {
    pub page_index: usize,
    pub boxes: Vec<LayoutBox>,
}

/// A positioned rectangle with optional content.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub background_color: Option<[f32; 3]>,
    pub border: Option<BorderStyle>,
    pub text: Option<TextLine>,
    pub image: Option<ImageContent>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderStyle {
    pub width: f32,
    pub color: [f32; 3],
}

/// One laid-out line of text; runs share a baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    /// Baseline offset from the top of the box.
    pub baseline: f32,
    pub runs: Vec<TextRun>,
}

/// A span of text drawn in a single face.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// X offset within the box.
    pub x_offset: f32,
    pub width: f32,
    pub font: FontSpec,
    pub font_size: f32,
    pub color: [f32; 3],
    pub underline: bool,
    pub strike: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageContent {
    pub src: String,
}

impl LayoutBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            background_color: None,
            border: None,
            text: None,
            image: None,
        }
    }

    pub fn with_background(mut self, color: [f32; 3]) -> Self {
        self.background_color = Some(color);
        self
    }

    pub fn with_border(mut self, width: f32, color: [f32; 3]) -> Self {
        self.border = Some(BorderStyle { width, color });
        self
    }
}

impl LayoutConfig {
    /// All text on page `index`, one line per text box, in drawing order.
    pub fn page_text(&self, index: usize) -> Vec<String> {
        self.pages
            .get(index)
            .map(|page| {
                page.boxes
                    .iter()
                    .filter_map(|b| b.text.as_ref())
                    .map(|line| {
                        line.runs
                            .iter()
                            .map(|r| r.text.as_str())
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Text of the whole document, pages in order.
    pub fn all_text(&self) -> Vec<String> {
        (0..self.pages.len()).flat_map(|i| self.page_text(i)).collect()
    }
}
