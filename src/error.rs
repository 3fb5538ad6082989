//! Error types for the ebook pipeline.
//!
//! Each pipeline stage has its own variant so callers can tell a broken
//! template from a broken renderer without string matching. Engine failures
//! carry a [`RenderError`] with the details of what the engine reported.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Stage-level classification of an [`EbookError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Template,
    Conversion,
    Render,
    Config,
    Io,
}

/// All errors returned by the pipeline.
#[derive(Debug, Error)]
pub enum EbookError {
    /// The template is missing, does not parse, or references an undefined field.
    #[error("template '{name}' failed: {detail}")]
    Template { name: String, detail: String },

    /// The filled Markdown could not be converted to HTML.
    #[error("markup conversion failed: {0}")]
    Conversion(String),

    /// The HTML could not be rendered to PDF.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Content or configuration could not be loaded.
    #[error("invalid configuration '{path}': {detail}")]
    Config { path: PathBuf, detail: String },

    /// The output file could not be written.
    #[error("failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EbookError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EbookError::Template { .. } => ErrorKind::Template,
            EbookError::Conversion(_) => ErrorKind::Conversion,
            EbookError::Render(_) => ErrorKind::Render,
            EbookError::Config { .. } => ErrorKind::Config,
            EbookError::Io { .. } => ErrorKind::Io,
        }
    }

    pub(crate) fn template(name: &str, err: &tera::Error) -> Self {
        // tera nests the useful message (missing variable, parse position)
        // in the source chain.
        let mut detail = err.to_string();
        let mut source = std::error::Error::source(err);
        while let Some(inner) = source {
            detail.push_str(": ");
            detail.push_str(&inner.to_string());
            source = inner.source();
        }
        EbookError::Template {
            name: name.to_string(),
            detail,
        }
    }
}

/// Failures of the HTML → PDF stage.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The external engine binary could not be started.
    #[error("rendering engine '{program}' is not available: {source}\nInstall wkhtmltopdf or set WKHTMLTOPDF_BINARY.")]
    EngineUnavailable {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external engine ran but reported failure.
    #[error("rendering engine '{program}' exited with {status}: {stderr}")]
    EngineFailed {
        program: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    /// The engine reported success but produced no bytes.
    #[error("rendering engine '{engine}' produced an empty document")]
    EmptyOutput { engine: String },

    /// The stylesheet could not be read.
    #[error("cannot read stylesheet '{path}': {source}")]
    Stylesheet {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An `<img>` could not be loaded or decoded.
    #[error("cannot load image '{src}': {detail}")]
    Image { src: String, detail: String },

    /// Page options the engine cannot honour.
    #[error("unsupported page option: {0}")]
    PageOption(String),

    /// Engine I/O failure while talking to the renderer.
    #[error("rendering engine I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EbookError>;
