//! PDF renderer – takes a [`LayoutConfig`] and produces PDF bytes using
//! `printpdf` (v0.8 ops-based API).

use std::collections::HashMap;

use printpdf::*;

use crate::error::RenderError;
use crate::fonts::{FontSpec, Typeface};
use crate::layout_config::{LayoutBox, LayoutConfig};

/// Points to millimetres.
const MM_PER_PT: f32 = 0.352778;

/// A registered XObject together with the pixel size of its source image.
struct RegisteredImage {
    xobj_id: XObjectId,
    px_width: u32,
    px_height: u32,
}

/// Render a LayoutConfig into PDF bytes.
pub fn render_pdf(config: &LayoutConfig) -> Result<Vec<u8>, RenderError> {
    let page_w = Mm(config.page_width_pt * MM_PER_PT);
    let page_h = Mm(config.page_height_pt * MM_PER_PT);

    let mut doc = PdfDocument::new(&config.title);

    let mut images: HashMap<&str, RegisteredImage> = HashMap::new();
    let mut img_warnings: Vec<PdfWarnMsg> = Vec::new();
    for (src, resource) in &config.images {
        let raw = RawImage::decode_from_bytes(&resource.bytes, &mut img_warnings).map_err(|e| {
            RenderError::Image {
                src: src.chars().take(80).collect(),
                detail: e.to_string(),
            }
        })?;
        images.insert(
            src.as_str(),
            RegisteredImage {
                xobj_id: doc.add_image(&raw),
                px_width: resource.px_width,
                px_height: resource.px_height,
            },
        );
    }
    for warning in &img_warnings {
        log::debug!("image: {warning:?}");
    }

    let mut pages = Vec::new();
    for page_layout in &config.pages {
        let mut ops = Vec::new();
        for lbox in &page_layout.boxes {
            render_box(&mut ops, lbox, config.page_height_pt, &images);
        }
        pages.push(PdfPage::new(page_w, page_h, ops));
    }
    if pages.is_empty() {
        pages.push(PdfPage::new(page_w, page_h, Vec::new()));
    }

    doc.with_pages(pages);
    let bytes = doc.save(&PdfSaveOptions::default(), &mut Vec::new());
    log::debug!(
        "rendered {} page(s), {} image(s), {} bytes",
        config.pages.len().max(1),
        images.len(),
        bytes.len()
    );
    Ok(bytes)
}

fn builtin_font(spec: FontSpec) -> BuiltinFont {
    match (spec.typeface, spec.bold, spec.italic) {
        (Typeface::Sans, false, false) => BuiltinFont::Helvetica,
        (Typeface::Sans, true, false) => BuiltinFont::HelveticaBold,
        (Typeface::Sans, false, true) => BuiltinFont::HelveticaOblique,
        (Typeface::Sans, true, true) => BuiltinFont::HelveticaBoldOblique,
        (Typeface::Serif, false, false) => BuiltinFont::TimesRoman,
        (Typeface::Serif, true, false) => BuiltinFont::TimesBold,
        (Typeface::Serif, false, true) => BuiltinFont::TimesItalic,
        (Typeface::Serif, true, true) => BuiltinFont::TimesBoldItalic,
        (Typeface::Mono, false, false) => BuiltinFont::Courier,
        (Typeface::Mono, true, false) => BuiltinFont::CourierBold,
        (Typeface::Mono, false, true) => BuiltinFont::CourierOblique,
        (Typeface::Mono, true, true) => BuiltinFont::CourierBoldOblique,
    }
}

/// Convert a UTF-8 string to raw Windows-1252 bytes then wrap in a String so
/// printpdf writes the bytes unchanged into the PDF stream (builtin fonts use
/// WinAnsiEncoding, so each glyph is one byte 0x00–0xFF).
fn to_winlatin(s: &str) -> String {
    let bytes: Vec<u8> = s
        .chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80, // euro
            '\u{201A}' => 0x82, // single low-9 quote
            '\u{201E}' => 0x84, // double low-9 quote
            '\u{2026}' => 0x85, // ellipsis
            '\u{2018}' => 0x91, // left single quote
            '\u{2019}' => 0x92, // right single quote
            '\u{201C}' => 0x93, // left double quote
            '\u{201D}' => 0x94, // right double quote
            '\u{2022}' => 0x95, // bullet
            '\u{2013}' => 0x96, // en-dash
            '\u{2014}' => 0x97, // em-dash
            '\u{2122}' => 0x99, // trademark
            '\u{00A0}' => 0x20, // non-breaking space -> space
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect();
    // SAFETY: intentionally non-UTF-8 for the 0x80-0xFF range; printpdf
    // passes these bytes straight to the PDF stream, decoded by WinAnsiEncoding.
    #[allow(unsafe_code)]
    unsafe {
        String::from_utf8_unchecked(bytes)
    }
}

fn rgb(c: [f32; 3]) -> Color {
    Color::Rgb(Rgb {
        r: c[0],
        g: c[1],
        b: c[2],
        icc_profile: None,
    })
}

fn point(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    }
}

/// Corners of a rectangle in PDF space, counter-clockwise from bottom-left.
fn corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Vec<LinePoint> {
    vec![point(x1, y1), point(x2, y1), point(x2, y2), point(x1, y2)]
}

fn stroke_line(ops: &mut Vec<Op>, from: (f32, f32), to: (f32, f32), width: f32, color: [f32; 3]) {
    ops.push(Op::SetOutlineColor { col: rgb(color) });
    ops.push(Op::SetOutlineThickness { pt: Pt(width) });
    ops.push(Op::DrawLine {
        line: Line {
            points: vec![point(from.0, from.1), point(to.0, to.1)],
            is_closed: false,
        },
    });
}

/// Render one LayoutBox into PDF ops.
fn render_box(
    ops: &mut Vec<Op>,
    lbox: &LayoutBox,
    page_height: f32,
    images: &HashMap<&str, RegisteredImage>,
) {
    // PDF origin is bottom-left, layout origin is top-left.
    let top = page_height - lbox.y;
    let bottom = top - lbox.height;
    let (left, right) = (lbox.x, lbox.x + lbox.width);

    if let Some(bg) = lbox.background_color {
        ops.push(Op::SetFillColor { col: rgb(bg) });
        ops.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![PolygonRing {
                    points: corners(left, bottom, right, top),
                }],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            },
        });
    }

    if let Some(border) = lbox.border {
        ops.push(Op::SetOutlineColor {
            col: rgb(border.color),
        });
        ops.push(Op::SetOutlineThickness {
            pt: Pt(border.width),
        });
        ops.push(Op::DrawLine {
            line: Line {
                points: corners(left, bottom, right, top),
                is_closed: true,
            },
        });
    }

    if let Some(line) = &lbox.text {
        let baseline = top - line.baseline;
        for run in &line.runs {
            if run.text.is_empty() {
                continue;
            }
            let font = builtin_font(run.font);
            let x = lbox.x + run.x_offset;

            ops.push(Op::StartTextSection);
            ops.push(Op::SetTextCursor {
                pos: Point {
                    x: Pt(x),
                    y: Pt(baseline),
                },
            });
            ops.push(Op::SetFontSizeBuiltinFont {
                size: Pt(run.font_size),
                font,
            });
            ops.push(Op::SetLineHeight {
                lh: Pt(run.font_size),
            });
            ops.push(Op::SetFillColor { col: rgb(run.color) });
            ops.push(Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(to_winlatin(&run.text))],
                font,
            });
            ops.push(Op::EndTextSection);

            let thickness = (run.font_size * 0.05).max(0.5);
            if run.underline {
                let y = baseline - run.font_size * 0.12;
                stroke_line(ops, (x, y), (x + run.width, y), thickness, run.color);
            }
            if run.strike {
                let y = baseline + run.font_size * 0.3;
                stroke_line(ops, (x, y), (x + run.width, y), thickness, run.color);
            }
        }
    }

    if let Some(img) = &lbox.image {
        match images.get(img.src.as_str()) {
            Some(res) => {
                // At dpi=72 printpdf renders 1 px = 1 pt.
                let scale_x = lbox.width / res.px_width.max(1) as f32;
                let scale_y = lbox.height / res.px_height.max(1) as f32;
                ops.push(Op::UseXobject {
                    id: res.xobj_id.clone(),
                    transform: XObjectTransform {
                        translate_x: Some(Pt(left)),
                        translate_y: Some(Pt(bottom)),
                        dpi: Some(72.0),
                        scale_x: Some(scale_x),
                        scale_y: Some(scale_y),
                        rotate: None,
                    },
                });
            }
            None => log::warn!("image {:?} was laid out but never loaded", img.src),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout_config::{ImageResource, PageLayout, TextLine, TextRun};

    fn config(pages: Vec<PageLayout>) -> LayoutConfig {
        LayoutConfig {
            title: "Test".to_string(),
            page_width_pt: 595.0,
            page_height_pt: 842.0,
            pages,
            images: Default::default(),
        }
    }

    #[test]
    fn render_empty_page() {
        let bytes = render_pdf(&config(Vec::new())).unwrap();
        assert!(bytes.len() > 100, "PDF should have content");
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn render_text_and_shapes() {
        let mut text = LayoutBox::new(40.0, 40.0, 300.0, 15.0)
            .with_background([0.9, 0.9, 0.9])
            .with_border(0.5, [0.0, 0.0, 0.0]);
        text.text = Some(TextLine {
            baseline: 11.0,
            runs: vec![TextRun {
                text: "Olá – “mundo”".to_string(),
                x_offset: 0.0,
                width: 80.0,
                font: FontSpec {
                    typeface: Typeface::Serif,
                    bold: true,
                    italic: false,
                },
                font_size: 11.0,
                color: [0.0, 0.0, 0.0],
                underline: true,
                strike: true,
            }],
        });
        let page = PageLayout {
            page_index: 0,
            boxes: vec![text],
        };
        let bytes = render_pdf(&config(vec![page.clone(), page])).unwrap();
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn undecodable_image_is_an_error() {
        let mut cfg = config(Vec::new());
        cfg.images.insert(
            "broken.png".to_string(),
            ImageResource {
                bytes: vec![1, 2, 3],
                px_width: 1,
                px_height: 1,
            },
        );
        assert!(matches!(render_pdf(&cfg), Err(RenderError::Image { .. })));
    }

    #[test]
    fn font_mapping() {
        assert_eq!(
            builtin_font(FontSpec {
                typeface: Typeface::Mono,
                bold: true,
                italic: true
            }),
            BuiltinFont::CourierBoldOblique
        );
        assert_eq!(builtin_font(FontSpec::default()), BuiltinFont::Helvetica);
    }

    #[test]
    fn winlatin_maps_typographic_chars() {
        assert_eq!(to_winlatin("a\u{2013}b").as_bytes(), &[b'a', 0x96, b'b']);
        assert_eq!(to_winlatin("漢").as_bytes(), b"?");
    }
}
