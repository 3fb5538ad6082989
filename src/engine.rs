//! HTML → PDF engines.
//!
//! The pipeline talks to a [`PdfEngine`] trait object, so the renderer can be
//! swapped (builtin layout, external wkhtmltopdf, or a test double) without
//! touching the rest of the pipeline.

use std::path::{Path, PathBuf};

use crate::config::{EngineKind, PageOptions};
use crate::dom::{body_children, find_all, parse_html, DomNode, Tag};
use crate::error::RenderError;
use crate::fonts::FontMetrics;
use crate::layout::{compute_layout, Frame, ImageStore};
use crate::layout_config::LayoutConfig;
use crate::pagination::{paginate, PageGeometry};
use crate::render::render_pdf;
use crate::style::{root_style, Stylesheet};
use crate::wkhtmltopdf::WkHtmlToPdf;

/// Smallest content area, in points, the builtin engine will lay out into.
const MIN_CONTENT_PT: f32 = 72.0;

/// Converts a complete HTML document into PDF bytes.
pub trait PdfEngine: Send + Sync {
    /// Short name used in logs and in [`crate::GeneratedEbook`].
    fn name(&self) -> &str;

    fn render(&self, html: &str, page: &PageOptions) -> Result<Vec<u8>, RenderError>;
}

/// Build the engine selected by `kind`. Relative image paths are resolved
/// against `base_dir`.
pub fn engine_for(kind: &EngineKind, base_dir: &Path) -> Box<dyn PdfEngine> {
    match kind {
        EngineKind::Builtin => Box::new(BuiltinEngine::new(base_dir)),
        EngineKind::Wkhtmltopdf { program: Some(program) } => {
            Box::new(WkHtmlToPdf::new(program.clone()))
        }
        EngineKind::Wkhtmltopdf { program: None } => Box::new(WkHtmlToPdf::from_env()),
    }
}

/// In-process renderer: parse → style → flow layout → paginate → printpdf.
///
/// Supports the subset of HTML and CSS that Markdown produces (headings,
/// paragraphs, lists, tables, code blocks, quotes, rules and images) and
/// draws with the PDF base-14 fonts.
#[derive(Debug, Clone)]
pub struct BuiltinEngine {
    base_dir: PathBuf,
    fonts: FontMetrics,
}

impl BuiltinEngine {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            fonts: FontMetrics::new(),
        }
    }

    /// Lay out `html` into pages without producing PDF bytes.
    pub fn layout(&self, html: &str, page: &PageOptions) -> Result<LayoutConfig, RenderError> {
        if !page.encoding.eq_ignore_ascii_case("utf-8") && !page.encoding.eq_ignore_ascii_case("utf8")
        {
            log::warn!(
                "builtin engine always reads UTF-8; ignoring encoding '{}'",
                page.encoding
            );
        }

        let (page_w, page_h) = page.page_size.dimensions_pt();
        let margins = &page.margins;
        let (top, right, bottom, left) = (
            margins.top.to_pt(),
            margins.right.to_pt(),
            margins.bottom.to_pt(),
            margins.left.to_pt(),
        );
        let frame = Frame {
            x: left,
            width: page_w - left - right,
            max_height: page_h - top - bottom,
        };
        if frame.width < MIN_CONTENT_PT || frame.max_height < MIN_CONTENT_PT {
            return Err(RenderError::PageOption(format!(
                "margins {} leave no room on a {} page",
                margins.top,
                page.page_size.as_str()
            )));
        }

        let dom = parse_html(html);
        let sheet = Stylesheet::parse(&collect_text(&dom, &Tag::Style).join("\n"));
        let title = collect_text(&dom, &Tag::Title)
            .into_iter()
            .next()
            .unwrap_or_default();

        let mut images = ImageStore::new(&self.base_dir);
        let boxes = compute_layout(
            &body_children(&dom),
            &root_style(&sheet),
            &sheet,
            &self.fonts,
            &mut images,
            frame,
        )?;

        let geometry = PageGeometry {
            width: page_w,
            height: page_h,
            margin_top: top,
            margin_bottom: bottom,
        };
        let mut config = paginate(&boxes, &geometry, title.trim());
        config.images = images.into_resources();
        log::debug!(
            "laid out {} box(es) on {} page(s)",
            boxes.len(),
            config.pages.len()
        );
        Ok(config)
    }
}

impl PdfEngine for BuiltinEngine {
    fn name(&self) -> &str {
        "builtin"
    }

    fn render(&self, html: &str, page: &PageOptions) -> Result<Vec<u8>, RenderError> {
        render_pdf(&self.layout(html, page)?)
    }
}

/// Text of every `tag` element in document order.
fn collect_text(dom: &[DomNode], tag: &Tag) -> Vec<String> {
    let mut found = Vec::new();
    find_all(dom, tag, &mut found);
    found.iter().map(|e| e.text_content()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Length, Margins, PageSize};

    const DOC: &str = "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>My Book</title>\
        <style>h1 { font-size: 30pt }</style></head>\
        <body><h1>My Book</h1><p>Hello</p></body></html>";

    #[test]
    fn builtin_layout_reads_title_and_styles() {
        let engine = BuiltinEngine::new(".");
        let config = engine.layout(DOC, &PageOptions::default()).unwrap();
        assert_eq!(config.title, "My Book");
        assert_eq!(config.all_text(), vec!["My Book", "Hello"]);
        let heading = config.pages[0].boxes[0].text.as_ref().unwrap();
        assert_eq!(heading.runs[0].font_size, 30.0);
        // content starts at the top margin (10mm)
        assert!((config.pages[0].boxes[0].y - 28.346).abs() < 0.01);
    }

    #[test]
    fn page_size_is_honoured() {
        let engine = BuiltinEngine::new(".");
        let page = PageOptions {
            page_size: PageSize::Letter,
            ..PageOptions::default()
        };
        let config = engine.layout(DOC, &page).unwrap();
        assert_eq!(config.page_width_pt, 612.0);
        assert_eq!(config.page_height_pt, 792.0);
    }

    #[test]
    fn oversized_margins_are_rejected() {
        let engine = BuiltinEngine::new(".");
        let page = PageOptions {
            margins: Margins::uniform(Length::mm(120.0)),
            ..PageOptions::default()
        };
        assert!(matches!(
            engine.layout(DOC, &page),
            Err(RenderError::PageOption(_))
        ));
    }

    #[test]
    fn builtin_render_produces_pdf() {
        let bytes = BuiltinEngine::new(".")
            .render(DOC, &PageOptions::default())
            .unwrap();
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn engine_selection() {
        let builtin = engine_for(&EngineKind::Builtin, Path::new("."));
        assert_eq!(builtin.name(), "builtin");
        let external = engine_for(
            &EngineKind::Wkhtmltopdf {
                program: Some(PathBuf::from("/opt/wk/bin/wkhtmltopdf")),
            },
            Path::new("."),
        );
        assert_eq!(external.name(), "wkhtmltopdf");
    }
}
