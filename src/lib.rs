//! # ebook-forge – Template-driven Markdown ebook → PDF pipeline
//!
//! Structured content (title, author, chapters) goes through three stages:
//!
//! 1. **Template fill** – bind the content into a Jinja2-style template and
//!    produce Markdown ([`template`])
//! 2. **Markup** – Markdown → HTML with tables, footnotes and a generated
//!    table of contents ([`markup`])
//! 3. **Render** – HTML → PDF through a [`PdfEngine`] ([`engine`])
//!
//! The builtin engine is itself a small pipeline: parse ([`dom`]), style
//! ([`style`]), flow layout ([`layout`]), paginate ([`pagination`]) and emit
//! PDF bytes via printpdf ([`render`]). The [`wkhtmltopdf`] engine shells out
//! to the external binary instead.
//!
//! ```no_run
//! use std::path::Path;
//! use ebook_forge::{Chapter, EbookContent, EbookPipeline, RenderConfiguration};
//!
//! let content = EbookContent::new("Rust Notes", "Ana")
//!     .with_chapter(Chapter::new("Ownership", "Every value has an *owner*."));
//! let pipeline = EbookPipeline::new(RenderConfiguration::default())?;
//! pipeline.generate(&content, Path::new("ebook.pdf"))?;
//! # Ok::<(), ebook_forge::EbookError>(())
//! ```

pub mod config;
pub mod content;
pub mod dom;
pub mod engine;
pub mod error;
pub mod fonts;
pub mod layout;
pub mod layout_config;
pub mod markup;
pub mod pagination;
pub mod pipeline;
pub mod render;
pub mod style;
pub mod template;
pub mod wkhtmltopdf;

// Re-exports for convenience
pub use config::{EngineKind, Length, Margins, PageOptions, PageSize, RenderConfiguration};
pub use content::{Chapter, EbookContent};
pub use engine::{engine_for, BuiltinEngine, PdfEngine};
pub use error::{EbookError, ErrorKind, RenderError, Result};
pub use markup::{ConvertedMarkup, MarkupConverter, TocEntry};
pub use pipeline::{EbookPipeline, GeneratedEbook, DEFAULT_OUTPUT};
pub use template::TemplateRenderer;
pub use wkhtmltopdf::WkHtmlToPdf;
