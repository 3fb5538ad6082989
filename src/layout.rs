//! Flow layout – walks the DOM top to bottom and produces a flat list of
//! unbreakable boxes (text lines, table rows, images, rules) in document
//! coordinates. Pagination only has to decide where each page starts.
//!
//! Vertical margins between blocks collapse to the larger of the two. A box
//! that starts a new page loses the margin above it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};

use crate::dom::{find_all, DomNode, ElementNode, Tag};
use crate::error::RenderError;
use crate::fonts::{wrap_fixed, FontMetrics, FontSpec, Typeface};
use crate::layout_config::{ImageContent, ImageResource, LayoutBox, TextLine, TextRun};
use crate::style::{resolve_style, ComputedStyle, Stylesheet, TextAlign};

/// CSS pixels to points, used for intrinsic image sizes.
const PT_PER_PX: f32 = 0.75;
/// Gap between a list marker and the item text.
const MARKER_GAP: f32 = 5.0;
/// Narrowest column the layout will wrap into.
const MIN_WIDTH: f32 = 24.0;

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// An unbreakable slice of the document.
#[derive(Debug, Clone)]
pub struct PositionedBox {
    /// Document-space y of the top edge.
    pub y: f32,
    pub height: f32,
    /// Boxes with page-absolute x and y relative to this box's top.
    pub items: Vec<LayoutBox>,
    pub page_break_before: bool,
    /// Must share a page with the following box (heading lines).
    pub keep_with_next: bool,
}

/// Horizontal placement of the content column and the usable page height.
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    pub x: f32,
    pub width: f32,
    pub max_height: f32,
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// Loads `<img>` sources once and remembers their pixel size.
pub struct ImageStore {
    base_dir: PathBuf,
    loaded: BTreeMap<String, ImageResource>,
}

impl ImageStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            loaded: BTreeMap::new(),
        }
    }

    pub fn load(&mut self, src: &str) -> Result<&ImageResource, RenderError> {
        if !self.loaded.contains_key(src) {
            let fail = |detail: String| RenderError::Image {
                src: truncate(src, 80),
                detail,
            };
            let bytes = read_image_bytes(src, &self.base_dir).map_err(fail)?;
            let img = ::image::load_from_memory(&bytes).map_err(|e| fail(e.to_string()))?;
            if img.width() == 0 || img.height() == 0 {
                return Err(fail("image has no pixels".to_string()));
            }
            self.loaded.insert(
                src.to_string(),
                ImageResource {
                    px_width: img.width(),
                    px_height: img.height(),
                    bytes,
                },
            );
        }
        self.loaded
            .get(src)
            .ok_or_else(|| RenderError::Image {
                src: truncate(src, 80),
                detail: "image cache miss".to_string(),
            })
    }

    pub fn into_resources(self) -> BTreeMap<String, ImageResource> {
        self.loaded
    }
}

fn read_image_bytes(src: &str, base_dir: &Path) -> Result<Vec<u8>, String> {
    if src.starts_with("data:") {
        return parse_data_uri(src);
    }
    if src.starts_with("http://") || src.starts_with("https://") {
        return Err("remote images are not supported by the builtin engine".to_string());
    }
    let decoded = percent_decode(src.strip_prefix("file://").unwrap_or(src));
    let path = Path::new(&decoded);
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    };
    fs::read(&path).map_err(|e| format!("{}: {e}", path.display()))
}

/// Parse a `data:<mime>;base64,<data>` URI and return the raw decoded bytes.
fn parse_data_uri(src: &str) -> Result<Vec<u8>, String> {
    let rest = &src["data:".len()..];
    let (header, data) = rest
        .split_once(',')
        .ok_or_else(|| "invalid data URI: missing `,` separator".to_string())?;
    if !header.contains(";base64") {
        return Err("only base64-encoded data URIs are supported".to_string());
    }
    BASE64_STD
        .decode(data.trim())
        .map_err(|e| format!("base64 decode error: {e}"))
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            if let Ok(v) = u8::from_str_radix(&s[i + 1..i + 3], 16) {
                out.push(v);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((i, _)) => format!("{}…", &s[..i]),
        None => s.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Inline content
// ---------------------------------------------------------------------------

/// Text attributes shared by a run of words.
#[derive(Debug, Clone, PartialEq)]
struct RunStyle {
    font: FontSpec,
    size: f32,
    color: [f32; 3],
    underline: bool,
    strike: bool,
    line_height: f32,
}

impl RunStyle {
    fn of(style: &ComputedStyle) -> Self {
        Self {
            font: style.font(),
            size: style.font_size,
            color: style.color.to_rgb(),
            underline: style.underline,
            strike: style.strike,
            line_height: style.line_height,
        }
    }

    fn same_face(&self, run: &TextRun) -> bool {
        self.font == run.font
            && self.size == run.font_size
            && self.color == run.color
            && self.underline == run.underline
            && self.strike == run.strike
    }
}

#[derive(Debug, Clone)]
enum Inline {
    Word {
        text: String,
        style: RunStyle,
        space_before: bool,
    },
    Break,
    Image(String),
}

/// A wrapped line before it is placed.
struct Line {
    runs: Vec<TextRun>,
    height: f32,
    baseline: f32,
}

/// A list bullet or number waiting for the first line of its item.
struct Marker {
    text: String,
    style: RunStyle,
    x: f32,
    width: f32,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

struct FlowBuilder<'a> {
    sheet: &'a Stylesheet,
    fonts: &'a FontMetrics,
    images: &'a mut ImageStore,
    max_height: f32,
    boxes: Vec<PositionedBox>,
    cursor: f32,
    pending_margin: f32,
    pending_break: bool,
    keep_with_next: bool,
    marker: Option<Marker>,
    /// Left rules drawn beside every box inside a blockquote.
    quote_bars: Vec<(f32, f32, [f32; 3])>,
}

impl<'a> FlowBuilder<'a> {
    fn add_margin(&mut self, margin: f32) {
        self.pending_margin = self.pending_margin.max(margin);
    }

    fn emit(&mut self, height: f32, mut items: Vec<LayoutBox>) {
        let y = self.cursor + self.pending_margin;
        for &(x, width, color) in &self.quote_bars {
            items.push(LayoutBox::new(x, 0.0, width, height).with_background(color));
        }
        self.boxes.push(PositionedBox {
            y,
            height,
            items,
            page_break_before: std::mem::take(&mut self.pending_break),
            keep_with_next: self.keep_with_next,
        });
        self.cursor = y + height;
        self.pending_margin = 0.0;
    }

    /// Lay out a mixed sequence of inline and block nodes.
    fn layout_flow(
        &mut self,
        nodes: &[DomNode],
        style: &ComputedStyle,
        x: f32,
        width: f32,
    ) -> Result<(), RenderError> {
        let mut inline: Vec<&DomNode> = Vec::new();
        for node in nodes {
            if node.is_inline() {
                inline.push(node);
                continue;
            }
            self.flush_inline(&inline, style, x, width)?;
            inline.clear();
            if let DomNode::Element(e) = node {
                self.layout_block(e, style, x, width)?;
            }
        }
        self.flush_inline(&inline, style, x, width)
    }

    fn layout_block(
        &mut self,
        element: &ElementNode,
        parent: &ComputedStyle,
        x: f32,
        width: f32,
    ) -> Result<(), RenderError> {
        let style = resolve_style(element, parent, self.sheet);
        if style.display_none {
            return Ok(());
        }
        if style.page_break_before {
            self.pending_break = true;
        }
        self.add_margin(style.margin_top);

        let x = x + style.margin_left;
        let width = (width - style.margin_left).max(MIN_WIDTH);

        match &element.tag {
            Tag::Hr => self.emit_rule(&style, x, width),
            Tag::Img => {
                if let Some(src) = element.src() {
                    self.emit_image(src, x, width)?;
                }
            }
            Tag::Pre => self.layout_pre(element, &style, x, width),
            Tag::Table => self.layout_table(element, &style, x, width),
            Tag::Ul | Tag::Ol => self.layout_list(element, &style, x, width)?,
            Tag::Blockquote => {
                let bar_width = style.border_width.max(0.5);
                let bar_x = x - style.margin_left * 0.75;
                self.quote_bars
                    .push((bar_x, bar_width, style.border_color.to_rgb()));
                let result = self.layout_flow(&element.children, &style, x, width);
                self.quote_bars.pop();
                result?;
            }
            Tag::Heading(_) => {
                self.keep_with_next = true;
                let result = self.layout_flow(&element.children, &style, x, width);
                self.keep_with_next = false;
                result?;
            }
            _ => self.layout_flow(&element.children, &style, x, width)?,
        }

        self.add_margin(style.margin_bottom);
        if style.page_break_after {
            self.pending_break = true;
        }
        Ok(())
    }

    fn flush_inline(
        &mut self,
        nodes: &[&DomNode],
        style: &ComputedStyle,
        x: f32,
        width: f32,
    ) -> Result<(), RenderError> {
        if nodes.is_empty() {
            return Ok(());
        }
        let mut items = Vec::new();
        let mut space = false;
        for node in nodes {
            self.collect_inline(node, style, &mut items, &mut space);
        }

        // Images break the paragraph and sit on their own.
        let mut segment = Vec::new();
        for item in items {
            match item {
                Inline::Image(src) => {
                    self.emit_text(&segment, style, x, width);
                    segment.clear();
                    self.emit_image(&src, x, width)?;
                }
                other => segment.push(other),
            }
        }
        self.emit_text(&segment, style, x, width);
        Ok(())
    }

    fn collect_inline(
        &self,
        node: &DomNode,
        style: &ComputedStyle,
        out: &mut Vec<Inline>,
        space: &mut bool,
    ) {
        match node {
            DomNode::Text(text) => {
                if text.starts_with(char::is_whitespace) {
                    *space = true;
                }
                let run = RunStyle::of(style);
                for (i, word) in text.split_whitespace().enumerate() {
                    if i > 0 {
                        *space = true;
                    }
                    out.push(Inline::Word {
                        text: word.to_string(),
                        style: run.clone(),
                        space_before: std::mem::take(space),
                    });
                }
                if text.ends_with(char::is_whitespace) {
                    *space = true;
                }
            }
            DomNode::Element(e) => {
                let child_style = resolve_style(e, style, self.sheet);
                if child_style.display_none {
                    return;
                }
                match e.tag {
                    Tag::Br => {
                        out.push(Inline::Break);
                        *space = false;
                    }
                    Tag::Img => {
                        if let Some(src) = e.src() {
                            out.push(Inline::Image(src.to_string()));
                        }
                    }
                    Tag::Input => {
                        let mark = if e.attr("checked").is_some() { "[x]" } else { "[ ]" };
                        out.push(Inline::Word {
                            text: mark.to_string(),
                            style: RunStyle::of(&child_style),
                            space_before: std::mem::take(space),
                        });
                    }
                    _ => {
                        for child in &e.children {
                            self.collect_inline(child, &child_style, out, space);
                        }
                    }
                }
            }
        }
    }

    /// Greedy line breaking of `items` into `width`.
    fn break_lines(
        &self,
        items: &[Inline],
        width: f32,
        align: TextAlign,
        container: &ComputedStyle,
    ) -> Vec<Line> {
        let empty_height = self
            .fonts
            .line_height(container.font_size, container.line_height);
        let mut lines = Vec::new();
        let mut runs: Vec<TextRun> = Vec::new();
        let mut line_w = 0.0f32;
        let mut line_h = 0.0f32;
        let mut max_size = 0.0f32;

        let mut finish =
            |runs: &mut Vec<TextRun>, line_w: &mut f32, line_h: &mut f32, max_size: &mut f32| {
                let height = if runs.is_empty() { empty_height } else { *line_h };
                let size = if runs.is_empty() {
                    container.font_size
                } else {
                    *max_size
                };
                let shift = match align {
                    TextAlign::Left => 0.0,
                    TextAlign::Center => ((width - *line_w) / 2.0).max(0.0),
                    TextAlign::Right => (width - *line_w).max(0.0),
                };
                for run in runs.iter_mut() {
                    run.x_offset += shift;
                }
                lines.push(Line {
                    runs: std::mem::take(runs),
                    height,
                    baseline: (height - size) / 2.0 + self.fonts.ascent(size),
                });
                *line_w = 0.0;
                *line_h = 0.0;
                *max_size = 0.0;
            };

        for item in items {
            let (text, style, space_before) = match item {
                Inline::Word {
                    text,
                    style,
                    space_before,
                } => (text, style, *space_before),
                Inline::Break => {
                    finish(&mut runs, &mut line_w, &mut line_h, &mut max_size);
                    continue;
                }
                Inline::Image(_) => continue,
            };

            for piece in self.split_to_width(text, style, width) {
                let word_w = self.fonts.text_width(&piece, style.font, style.size);
                let mut gap = if space_before && !runs.is_empty() {
                    self.fonts.text_width(" ", style.font, style.size)
                } else {
                    0.0
                };
                if !runs.is_empty() && line_w + gap + word_w > width {
                    finish(&mut runs, &mut line_w, &mut line_h, &mut max_size);
                    gap = 0.0;
                }

                match runs.last_mut() {
                    Some(last) if style.same_face(last) => {
                        if gap > 0.0 {
                            last.text.push(' ');
                        }
                        last.text.push_str(&piece);
                        last.width += gap + word_w;
                    }
                    _ => runs.push(TextRun {
                        text: piece,
                        x_offset: line_w + gap,
                        width: word_w,
                        font: style.font,
                        font_size: style.size,
                        color: style.color,
                        underline: style.underline,
                        strike: style.strike,
                    }),
                }
                line_w += gap + word_w;
                line_h = line_h.max(self.fonts.line_height(style.size, style.line_height));
                max_size = max_size.max(style.size);
            }
        }
        if !runs.is_empty() {
            finish(&mut runs, &mut line_w, &mut line_h, &mut max_size);
        }
        lines
    }

    /// Split a word that cannot fit on any line into pieces that do.
    fn split_to_width(&self, word: &str, style: &RunStyle, width: f32) -> Vec<String> {
        if self.fonts.text_width(word, style.font, style.size) <= width {
            return vec![word.to_string()];
        }
        let mut pieces = Vec::new();
        let mut current = String::new();
        for c in word.chars() {
            current.push(c);
            if current.chars().count() > 1
                && self.fonts.text_width(&current, style.font, style.size) > width
            {
                current.pop();
                pieces.push(std::mem::take(&mut current));
                current.push(c);
            }
        }
        if !current.is_empty() {
            pieces.push(current);
        }
        pieces
    }

    fn emit_text(&mut self, items: &[Inline], style: &ComputedStyle, x: f32, width: f32) {
        if !items.iter().any(|i| matches!(i, Inline::Word { .. })) {
            return;
        }
        for line in self.break_lines(items, width, style.text_align, style) {
            let mut boxes = Vec::new();
            if let Some(marker) = self.marker.take() {
                let mut marker_box = LayoutBox::new(marker.x, 0.0, marker.width, line.height);
                marker_box.text = Some(TextLine {
                    baseline: line.baseline,
                    runs: vec![TextRun {
                        text: marker.text,
                        x_offset: 0.0,
                        width: marker.width,
                        font: marker.style.font,
                        font_size: marker.style.size,
                        color: marker.style.color,
                        underline: false,
                        strike: false,
                    }],
                });
                boxes.push(marker_box);
            }
            let mut text_box = LayoutBox::new(x, 0.0, width, line.height);
            text_box.text = Some(TextLine {
                baseline: line.baseline,
                runs: line.runs,
            });
            boxes.push(text_box);
            self.emit(line.height, boxes);
        }
    }

    fn emit_image(&mut self, src: &str, x: f32, width: f32) -> Result<(), RenderError> {
        let res = self.images.load(src)?;
        let mut w = res.px_width as f32 * PT_PER_PX;
        let mut h = res.px_height as f32 * PT_PER_PX;
        if w > width {
            h *= width / w;
            w = width;
        }
        if h > self.max_height {
            w *= self.max_height / h;
            h = self.max_height;
        }
        let mut image_box = LayoutBox::new(x, 0.0, w, h);
        image_box.image = Some(ImageContent {
            src: src.to_string(),
        });
        self.emit(h, vec![image_box]);
        Ok(())
    }

    fn emit_rule(&mut self, style: &ComputedStyle, x: f32, width: f32) {
        let thickness = style.border_width.max(0.5);
        let rule = LayoutBox::new(x, 0.0, width, thickness).with_background(style.border_color.to_rgb());
        self.emit(thickness, vec![rule]);
    }

    fn layout_list(
        &mut self,
        list: &ElementNode,
        style: &ComputedStyle,
        x: f32,
        width: f32,
    ) -> Result<(), RenderError> {
        let ordered = list.tag == Tag::Ol;
        let mut number: u32 = list.attr("start").and_then(|s| s.parse().ok()).unwrap_or(1);

        for child in &list.children {
            let item = match child {
                DomNode::Element(e) if e.tag == Tag::Li => e,
                DomNode::Element(other) => {
                    self.layout_block(other, style, x, width)?;
                    continue;
                }
                DomNode::Text(_) => continue,
            };
            let item_style = resolve_style(item, style, self.sheet);
            if item_style.display_none {
                continue;
            }
            let text = if ordered {
                format!("{number}.")
            } else {
                "\u{2022}".to_string()
            };
            number += 1;
            let run = RunStyle::of(&item_style);
            let marker_w = self.fonts.text_width(&text, run.font, run.size);
            self.marker = Some(Marker {
                text,
                x: x - MARKER_GAP - marker_w,
                width: marker_w,
                style: run,
            });

            self.add_margin(item_style.margin_top);
            self.layout_flow(&item.children, &item_style, x, width)?;
            self.marker = None;
            self.add_margin(item_style.margin_bottom);
        }
        Ok(())
    }

    fn layout_pre(&mut self, pre: &ElementNode, style: &ComputedStyle, x: f32, width: f32) {
        let text = pre.text_content();
        let text = text.strip_suffix('\n').unwrap_or(&text);
        let pad = style.padding;
        let inner = (width - 2.0 * pad).max(MIN_WIDTH);
        let line_h = self.fonts.line_height(style.font_size, style.line_height);
        let font = FontSpec {
            typeface: Typeface::Mono,
            ..style.font()
        };

        let lines: Vec<String> = text
            .split('\n')
            .flat_map(|l| wrap_fixed(&l.replace('\t', "    "), style.font_size, inner, self.fonts))
            .collect();
        let last = lines.len().saturating_sub(1);

        for (i, line) in lines.into_iter().enumerate() {
            let top = if i == 0 { pad } else { 0.0 };
            let bottom = if i == last { pad } else { 0.0 };
            let height = top + line_h + bottom;

            let mut items = Vec::new();
            if !style.background_color.is_transparent() {
                items.push(
                    LayoutBox::new(x, 0.0, width, height)
                        .with_background(style.background_color.to_rgb()),
                );
            }
            if !line.is_empty() {
                let width_pt = self.fonts.text_width(&line, font, style.font_size);
                let mut text_box = LayoutBox::new(x + pad, 0.0, inner, height);
                text_box.text = Some(TextLine {
                    baseline: top + (line_h - style.font_size) / 2.0 + self.fonts.ascent(style.font_size),
                    runs: vec![TextRun {
                        text: line,
                        x_offset: 0.0,
                        width: width_pt,
                        font,
                        font_size: style.font_size,
                        color: style.color.to_rgb(),
                        underline: false,
                        strike: false,
                    }],
                });
                items.push(text_box);
            }
            self.emit(height, items);
        }
    }

    fn layout_table(&mut self, table: &ElementNode, style: &ComputedStyle, x: f32, width: f32) {
        let mut rows = Vec::new();
        find_all(&table.children, &Tag::Tr, &mut rows);
        let is_cell = |n: &&DomNode| matches!(n, DomNode::Element(c) if matches!(c.tag, Tag::Td | Tag::Th));
        let columns = rows
            .iter()
            .map(|r| r.children.iter().filter(is_cell).count())
            .max()
            .unwrap_or(0);
        if columns == 0 {
            return;
        }
        let col_w = width / columns as f32;

        for row in rows {
            let row_style = resolve_style(row, style, self.sheet);
            let mut cells = Vec::new();
            for cell in row.children.iter().filter(is_cell) {
                let DomNode::Element(cell) = cell else { continue };
                let cell_style = resolve_style(cell, &row_style, self.sheet);
                let inner = (col_w - 2.0 * cell_style.padding).max(MIN_WIDTH.min(col_w));
                let mut items = Vec::new();
                let mut space = false;
                for child in &cell.children {
                    self.collect_inline(child, &cell_style, &mut items, &mut space);
                }
                let lines = self.break_lines(&items, inner, cell_style.text_align, &cell_style);
                let content_h: f32 = lines.iter().map(|l| l.height).sum::<f32>().max(
                    self.fonts
                        .line_height(cell_style.font_size, cell_style.line_height),
                );
                cells.push((cell_style, lines, content_h));
            }
            let row_h = cells
                .iter()
                .map(|(s, _, h)| h + 2.0 * s.padding)
                .fold(0.0f32, f32::max);

            let mut items = Vec::new();
            for (i, (cell_style, lines, _)) in cells.into_iter().enumerate() {
                let cell_x = x + i as f32 * col_w;
                let mut cell_box = LayoutBox::new(cell_x, 0.0, col_w, row_h);
                if !cell_style.background_color.is_transparent() {
                    cell_box = cell_box.with_background(cell_style.background_color.to_rgb());
                }
                if cell_style.border_width > 0.0 {
                    cell_box =
                        cell_box.with_border(cell_style.border_width, cell_style.border_color.to_rgb());
                }
                items.push(cell_box);

                let mut y = cell_style.padding;
                for line in lines {
                    let inner = col_w - 2.0 * cell_style.padding;
                    let mut text_box =
                        LayoutBox::new(cell_x + cell_style.padding, y, inner, line.height);
                    y += line.height;
                    text_box.text = Some(TextLine {
                        baseline: line.baseline,
                        runs: line.runs,
                    });
                    items.push(text_box);
                }
            }
            self.emit(row_h, items);
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Lay out `body` (the children of `<body>`) into a single content column.
pub fn compute_layout(
    body: &[DomNode],
    root: &ComputedStyle,
    sheet: &Stylesheet,
    fonts: &FontMetrics,
    images: &mut ImageStore,
    frame: Frame,
) -> Result<Vec<PositionedBox>, RenderError> {
    let mut builder = FlowBuilder {
        sheet,
        fonts,
        images,
        max_height: frame.max_height,
        boxes: Vec::new(),
        cursor: 0.0,
        pending_margin: 0.0,
        pending_break: false,
        keep_with_next: false,
        marker: None,
        quote_bars: Vec::new(),
    };
    builder.layout_flow(body, root, frame.x, frame.width)?;
    Ok(builder.boxes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{body_children, parse_html};

    const FRAME: Frame = Frame {
        x: 28.0,
        width: 400.0,
        max_height: 700.0,
    };

    fn layout(html: &str, css: &str) -> Vec<PositionedBox> {
        let sheet = Stylesheet::parse(css);
        let root = crate::style::root_style(&sheet);
        let dom = parse_html(html);
        let mut images = ImageStore::new(".");
        compute_layout(
            &body_children(&dom),
            &root,
            &sheet,
            &FontMetrics::new(),
            &mut images,
            FRAME,
        )
        .unwrap()
    }

    fn texts(boxes: &[PositionedBox]) -> Vec<String> {
        boxes
            .iter()
            .flat_map(|b| b.items.iter())
            .filter_map(|i| i.text.as_ref())
            .map(|t| t.runs.iter().map(|r| r.text.as_str()).collect::<Vec<_>>().join("|"))
            .collect()
    }

    #[test]
    fn paragraph_wraps_into_lines() {
        let words = "lorem ipsum dolor sit amet ".repeat(20);
        let boxes = layout(&format!("<p>{words}</p>"), "");
        assert!(boxes.len() > 3, "expected several lines, got {}", boxes.len());
        for pair in boxes.windows(2) {
            assert!(pair[1].y >= pair[0].y + pair[0].height - 0.01);
        }
        for b in &boxes {
            for item in &b.items {
                let run = &item.text.as_ref().unwrap().runs[0];
                assert!(run.x_offset + run.width <= FRAME.width + 0.01);
            }
        }
    }

    #[test]
    fn styled_runs_are_split_and_merged() {
        let boxes = layout("<p>plain words <strong>bold part</strong> tail</p>", "");
        assert_eq!(texts(&boxes), vec!["plain words|bold part|tail"]);
        let runs = &boxes[0].items[0].text.as_ref().unwrap().runs;
        assert!(runs[1].font.bold);
        assert!(runs[1].x_offset > runs[0].x_offset + runs[0].width);
    }

    #[test]
    fn margins_collapse() {
        let boxes = layout("<p>a</p><p>b</p>", "p { margin-top: 10pt; margin-bottom: 20pt }");
        let gap = boxes[1].y - (boxes[0].y + boxes[0].height);
        assert!((gap - 20.0).abs() < 0.01, "gap {gap}");
    }

    #[test]
    fn list_items_get_markers() {
        let boxes = layout("<ol start=\"3\"><li>three</li><li>four</li></ol><ul><li>dot</li></ul>", "");
        let all = texts(&boxes);
        assert_eq!(all, vec!["3.", "three", "4.", "four", "\u{2022}", "dot"]);
        let marker = &boxes[0].items[0];
        assert!(marker.x < boxes[0].items[1].x);
    }

    #[test]
    fn heading_lines_keep_with_next() {
        let boxes = layout("<h2>Title</h2><p>body</p>", "");
        assert!(boxes[0].keep_with_next);
        assert!(!boxes[1].keep_with_next);
    }

    #[test]
    fn page_break_flag_reaches_first_line() {
        let boxes = layout("<p>a</p><h2>b</h2>", "h2 { page-break-before: always }");
        assert!(!boxes[0].page_break_before);
        assert!(boxes[1].page_break_before);
    }

    #[test]
    fn table_rows_are_single_boxes() {
        let html = "<table><tr><th>Name</th><th>Qty</th></tr><tr><td>Apple</td><td>3</td></tr></table>";
        let boxes = layout(html, "");
        assert_eq!(boxes.len(), 2);
        // two cell frames + two text lines per row
        assert_eq!(boxes[0].items.len(), 4);
        assert!(boxes[0].items[0].background_color.is_some());
        assert!(boxes[1].items[0].border.is_some());
    }

    #[test]
    fn pre_keeps_lines() {
        let boxes = layout("<pre><code>fn main() {\n    run();\n}\n</code></pre>", "");
        assert_eq!(texts(&boxes), vec!["fn main() {", "    run();", "}"]);
        let run = &boxes[0].items[1].text.as_ref().unwrap().runs[0];
        assert_eq!(run.font.typeface, Typeface::Mono);
    }

    #[test]
    fn hidden_elements_are_skipped() {
        let boxes = layout("<p>shown</p><p class=\"x\">hidden</p>", ".x { display: none }");
        assert_eq!(texts(&boxes), vec!["shown"]);
    }

    #[test]
    fn long_words_are_split() {
        let boxes = layout(&format!("<p>{}</p>", "x".repeat(200)), "");
        assert!(boxes.len() > 1);
    }

    #[test]
    fn data_uri_image_is_scaled_to_column() {
        // 1x1 PNG
        let png = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";
        let boxes = layout(&format!(r#"<p><img src="data:image/png;base64,{png}"></p>"#), "");
        assert_eq!(boxes.len(), 1);
        let img = &boxes[0].items[0];
        assert!(img.image.is_some());
        assert!((img.width - 0.75).abs() < 0.01);
    }

    #[test]
    fn missing_image_is_an_error() {
        let sheet = Stylesheet::default();
        let dom = parse_html(r#"<p><img src="no/such/file.png"></p>"#);
        let mut images = ImageStore::new(".");
        let err = compute_layout(
            &dom,
            &ComputedStyle::default(),
            &sheet,
            &FontMetrics::new(),
            &mut images,
            FRAME,
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::Image { .. }));
    }

    #[test]
    fn percent_decoding() {
        assert_eq!(percent_decode("a%20b%C3%A7"), "a bç");
        assert_eq!(percent_decode("100%"), "100%");
    }
}
