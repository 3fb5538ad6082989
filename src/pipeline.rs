//! Pipeline – ties together template fill, Markdown conversion and PDF
//! rendering into a single call.
//!
//! ```text
//! EbookContent ──template──▶ Markdown ──markup──▶ HTML ──engine──▶ PDF file
//! ```

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use tempfile::Builder;

use crate::config::RenderConfiguration;
use crate::content::EbookContent;
use crate::engine::{engine_for, PdfEngine};
use crate::error::{EbookError, RenderError, Result};
use crate::markup::{escape_html, ConvertedMarkup, MarkupConverter};
use crate::template::TemplateRenderer;

/// Output path used when the caller does not pick one.
pub const DEFAULT_OUTPUT: &str = "ebook.pdf";

/// What a successful [`EbookPipeline::generate`] wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedEbook {
    pub path: PathBuf,
    /// Size of the written PDF.
    pub bytes: usize,
    pub chapters: usize,
    /// Name of the engine that rendered it.
    pub engine: String,
}

/// Content → Markdown → HTML → PDF.
///
/// A pipeline owns its templates and its engine; nothing is shared between
/// instances and nothing changes after construction.
pub struct EbookPipeline {
    config: RenderConfiguration,
    templates: TemplateRenderer,
    converter: MarkupConverter,
    engine: Box<dyn PdfEngine>,
}

impl EbookPipeline {
    /// Load templates from `config.template_dir` and build the configured
    /// engine. Relative image paths resolve against the working directory.
    pub fn new(config: RenderConfiguration) -> Result<Self> {
        let engine = engine_for(&config.engine, Path::new("."));
        Self::with_engine(config, engine)
    }

    /// Like [`EbookPipeline::new`] but with a caller-supplied engine.
    pub fn with_engine(config: RenderConfiguration, engine: Box<dyn PdfEngine>) -> Result<Self> {
        let templates = TemplateRenderer::from_dir(&config.template_dir)?;
        Ok(Self::from_parts(config, templates, engine))
    }

    /// Assemble a pipeline from already-built parts.
    pub fn from_parts(
        config: RenderConfiguration,
        templates: TemplateRenderer,
        engine: Box<dyn PdfEngine>,
    ) -> Self {
        Self {
            config,
            templates,
            converter: MarkupConverter::default(),
            engine,
        }
    }

    pub fn config(&self) -> &RenderConfiguration {
        &self.config
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Stage 1: fill the configured template.
    pub fn render_markup(&self, content: &EbookContent) -> Result<String> {
        log::debug!(
            "filling template '{}' with {} chapter(s)",
            self.config.template_name,
            content.chapters.len()
        );
        self.templates.render(&self.config.template_name, content)
    }

    /// Stage 2: Markdown to an HTML fragment plus its table of contents.
    pub fn markup_to_html(&self, markup: &str) -> Result<ConvertedMarkup> {
        self.converter.convert(markup)
    }

    /// Wrap an HTML fragment into a complete document with the stylesheet
    /// inlined.
    pub fn wrap_document(&self, title: &str, body: &str) -> Result<String> {
        let css = self.read_stylesheet()?;
        let mut doc = String::with_capacity(body.len() + css.len() + 256);
        doc.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        doc.push_str(&format!(
            "<meta charset=\"{}\">\n<title>{}</title>\n",
            escape_html(&self.config.page.encoding),
            escape_html(title)
        ));
        if !css.is_empty() {
            doc.push_str(&format!("<style>\n{css}\n</style>\n"));
        }
        doc.push_str(&format!("</head>\n<body>\n{body}\n</body>\n</html>\n"));
        Ok(doc)
    }

    /// Stages 1 and 2 plus the document wrapper.
    pub fn build_html(&self, content: &EbookContent) -> Result<String> {
        let markup = self.render_markup(content)?;
        let converted = self.markup_to_html(&markup)?;
        self.wrap_document(&content.title, &converted.html)
    }

    /// Stage 3: render `body` with the engine and write the PDF to `output`.
    /// Returns the number of bytes written.
    pub fn html_to_pdf(&self, title: &str, body: &str, output: &Path) -> Result<usize> {
        let document = self.wrap_document(title, body)?;
        self.render_document(&document, output)
    }

    fn render_document(&self, document: &str, output: &Path) -> Result<usize> {
        log::debug!("rendering with {} engine", self.engine.name());
        let pdf = self.engine.render(document, &self.config.page)?;
        if pdf.is_empty() {
            return Err(RenderError::EmptyOutput {
                engine: self.engine.name().to_string(),
            }
            .into());
        }
        write_atomically(output, &pdf)?;
        Ok(pdf.len())
    }

    /// Run every stage and write the PDF to `output`, replacing any existing
    /// file. On failure nothing is written.
    pub fn generate(&self, content: &EbookContent, output: &Path) -> Result<GeneratedEbook> {
        let document = self.build_html(content)?;
        let bytes = self.render_document(&document, output)?;
        log::info!(
            "ebook '{}' written to {} ({} bytes, {} chapter(s))",
            content.title,
            output.display(),
            bytes,
            content.chapters.len()
        );
        Ok(GeneratedEbook {
            path: output.to_path_buf(),
            bytes,
            chapters: content.chapters.len(),
            engine: self.engine.name().to_string(),
        })
    }

    fn read_stylesheet(&self) -> Result<String> {
        match &self.config.stylesheet {
            None => Ok(String::new()),
            Some(path) => fs::read_to_string(path).map_err(|source| {
                RenderError::Stylesheet {
                    path: path.clone(),
                    source,
                }
                .into()
            }),
        }
    }
}

/// Write through a temporary file in the target directory so a failed write
/// never leaves a truncated PDF behind.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let io_err = |source| EbookError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(io_err)?;
    let mut builder = Builder::new();
    builder.prefix(".ebook-").suffix(".pdf.tmp");
    // Same mode as `fs::write`: 0o666 masked by the process umask.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let mut tmp = builder.tempfile_in(dir).map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageOptions;
    use crate::content::Chapter;
    use crate::error::ErrorKind;

    struct FixedEngine(&'static [u8]);

    impl PdfEngine for FixedEngine {
        fn name(&self) -> &str {
            "fixed"
        }

        fn render(&self, _html: &str, _page: &PageOptions) -> std::result::Result<Vec<u8>, RenderError> {
            Ok(self.0.to_vec())
        }
    }

    fn pipeline(template: &str, engine: FixedEngine) -> EbookPipeline {
        let config = RenderConfiguration {
            stylesheet: None,
            ..RenderConfiguration::default()
        };
        let templates = TemplateRenderer::from_raw(&config.template_name, template).unwrap();
        EbookPipeline::from_parts(config, templates, Box::new(engine))
    }

    #[test]
    fn document_wrapper() {
        let p = pipeline("# {{ title }}", FixedEngine(b"%PDF"));
        let html = p.build_html(&EbookContent::new("A & B", "me")).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<meta charset=\"utf-8\">"));
        assert!(html.contains("<title>A &amp; B</title>"));
        assert!(!html.contains("<style>"));
        assert!(html.contains("<h1 id=\"a-b\">A &amp; B</h1>"));
    }

    #[test]
    fn generate_reports_what_was_written() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out.pdf");
        let p = pipeline("# {{ title }}", FixedEngine(b"%PDF-1.7 fixed"));
        let content = EbookContent::new("T", "A").with_chapter(Chapter::new("One", "text"));
        let report = p.generate(&content, &out).unwrap();
        assert_eq!(
            report,
            GeneratedEbook {
                path: out.clone(),
                bytes: 14,
                chapters: 1,
                engine: "fixed".to_string(),
            }
        );
        assert_eq!(fs::read(&out).unwrap(), b"%PDF-1.7 fixed");
    }

    #[cfg(unix)]
    #[test]
    fn output_mode_matches_plain_write() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.pdf");
        let reference = dir.path().join("reference.pdf");
        fs::write(&reference, b"%PDF").unwrap();
        let p = pipeline("# {{ title }}", FixedEngine(b"%PDF-1.7 fixed"));
        p.generate(&EbookContent::new("T", "A"), &out).unwrap();

        let mode = |path: &Path| fs::metadata(path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&out), mode(&reference));
    }

    #[test]
    fn empty_engine_output_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.pdf");
        let p = pipeline("# {{ title }}", FixedEngine(b""));
        let err = p.generate(&EbookContent::new("T", "A"), &out).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Render);
        assert!(!out.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_stylesheet_is_a_render_error() {
        let config = RenderConfiguration {
            stylesheet: Some(PathBuf::from("/nonexistent/styles.css")),
            ..RenderConfiguration::default()
        };
        let templates = TemplateRenderer::from_raw(&config.template_name, "x").unwrap();
        let p = EbookPipeline::from_parts(config, templates, Box::new(FixedEngine(b"%PDF")));
        let err = p.build_html(&EbookContent::new("T", "A")).unwrap_err();
        assert!(matches!(
            err,
            EbookError::Render(RenderError::Stylesheet { .. })
        ));
    }
}
