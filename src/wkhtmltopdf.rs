//! External renderer: pipes the HTML document through a `wkhtmltopdf`
//! process and reads the PDF back from its stdout.

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use crate::config::PageOptions;
use crate::engine::PdfEngine;
use crate::error::RenderError;

/// Environment variable consulted when no program path is configured.
pub const BINARY_ENV: &str = "WKHTMLTOPDF_BINARY";
const DEFAULT_PROGRAM: &str = "wkhtmltopdf";

#[derive(Debug, Clone)]
pub struct WkHtmlToPdf {
    program: PathBuf,
}

impl WkHtmlToPdf {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Use `$WKHTMLTOPDF_BINARY` if set, otherwise `wkhtmltopdf` from `PATH`.
    pub fn from_env() -> Self {
        let program = std::env::var_os(BINARY_ENV)
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| OsString::from(DEFAULT_PROGRAM));
        Self::new(program)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Command-line arguments for `page`; input and output are both `-`.
    pub fn arguments(&self, page: &PageOptions) -> Vec<String> {
        let m = &page.margins;
        vec![
            "--quiet".to_string(),
            "--encoding".to_string(),
            page.encoding.clone(),
            "--page-size".to_string(),
            page.page_size.as_str().to_string(),
            "--margin-top".to_string(),
            m.top.to_string(),
            "--margin-right".to_string(),
            m.right.to_string(),
            "--margin-bottom".to_string(),
            m.bottom.to_string(),
            "--margin-left".to_string(),
            m.left.to_string(),
            "--enable-local-file-access".to_string(),
            "-".to_string(),
            "-".to_string(),
        ]
    }
}

impl PdfEngine for WkHtmlToPdf {
    fn name(&self) -> &str {
        DEFAULT_PROGRAM
    }

    fn render(&self, html: &str, page: &PageOptions) -> Result<Vec<u8>, RenderError> {
        log::debug!("running {} {:?}", self.program.display(), self.arguments(page));
        let mut child = Command::new(&self.program)
            .args(self.arguments(page))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RenderError::EngineUnavailable {
                program: self.program.clone(),
                source,
            })?;

        // Feed stdin from a separate thread so a large document cannot
        // deadlock against a full stdout pipe.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "engine stdin unavailable"))?;
        let input = html.as_bytes().to_vec();
        let writer = thread::spawn(move || stdin.write_all(&input));

        let output = child.wait_with_output()?;
        let written = writer
            .join()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "stdin writer panicked"))?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(RenderError::EngineFailed {
                program: self.program.clone(),
                status: output.status,
                stderr,
            });
        }
        written?;
        if !stderr.is_empty() {
            log::warn!("{}: {stderr}", self.program.display());
        }
        if output.stdout.is_empty() {
            return Err(RenderError::EmptyOutput {
                engine: self.program.display().to_string(),
            });
        }
        Ok(output.stdout)
    }
}
