//! Render configuration: where templates live, which stylesheet to inline,
//! and the page options handed to the PDF engine.
//!
//! Everything deserialises from JSON with the documented defaults filled in,
//! so a config file only needs the keys it wants to change.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EbookError, Result};

/// Points per unit, for converting margins to PDF space.
const PT_PER_MM: f32 = 72.0 / 25.4;
const PT_PER_IN: f32 = 72.0;
const PT_PER_PX: f32 = 0.75;

/// Paper formats understood by both engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSize {
    A3,
    #[default]
    A4,
    A5,
    Letter,
    Legal,
}

impl PageSize {
    /// Portrait `(width, height)` in points.
    pub fn dimensions_pt(self) -> (f32, f32) {
        match self {
            PageSize::A3 => (841.89, 1190.55),
            PageSize::A4 => (595.28, 841.89),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PageSize::A3 => "A3",
            PageSize::A4 => "A4",
            PageSize::A5 => "A5",
            PageSize::Letter => "Letter",
            PageSize::Legal => "Legal",
        }
    }
}

impl FromStr for PageSize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a3" => Ok(PageSize::A3),
            "a4" => Ok(PageSize::A4),
            "a5" => Ok(PageSize::A5),
            "letter" => Ok(PageSize::Letter),
            "legal" => Ok(PageSize::Legal),
            other => Err(format!(
                "unknown page size '{other}' (expected A3, A4, A5, Letter or Legal)"
            )),
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnit {
    Mm,
    Cm,
    In,
    Pt,
    Px,
}

impl LengthUnit {
    fn suffix(self) -> &'static str {
        match self {
            LengthUnit::Mm => "mm",
            LengthUnit::Cm => "cm",
            LengthUnit::In => "in",
            LengthUnit::Pt => "pt",
            LengthUnit::Px => "px",
        }
    }
}

/// A physical length written the way wkhtmltopdf expects it (`10mm`, `0.5in`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Length {
    pub value: f32,
    pub unit: LengthUnit,
}

impl Length {
    pub const fn mm(value: f32) -> Self {
        Self {
            value,
            unit: LengthUnit::Mm,
        }
    }

    pub fn to_pt(self) -> f32 {
        match self.unit {
            LengthUnit::Mm => self.value * PT_PER_MM,
            LengthUnit::Cm => self.value * 10.0 * PT_PER_MM,
            LengthUnit::In => self.value * PT_PER_IN,
            LengthUnit::Pt => self.value,
            LengthUnit::Px => self.value * PT_PER_PX,
        }
    }
}

impl FromStr for Length {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(s.len());
        let (number, unit) = s.split_at(split);
        let value: f32 = number
            .parse()
            .map_err(|_| format!("invalid length '{s}'"))?;
        let unit = match unit.trim().to_ascii_lowercase().as_str() {
            "mm" => LengthUnit::Mm,
            "cm" => LengthUnit::Cm,
            "in" => LengthUnit::In,
            "pt" => LengthUnit::Pt,
            "px" => LengthUnit::Px,
            "" => return Err(format!("length '{s}' needs a unit (mm, cm, in, pt, px)")),
            other => return Err(format!("unknown length unit '{other}' in '{s}'")),
        };
        Ok(Self { value, unit })
    }
}

impl TryFrom<String> for Length {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Length> for String {
    fn from(length: Length) -> Self {
        length.to_string()
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Margins {
    pub top: Length,
    pub right: Length,
    pub bottom: Length,
    pub left: Length,
}

impl Margins {
    pub fn uniform(length: Length) -> Self {
        Self {
            top: length,
            right: length,
            bottom: length,
            left: length,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(Length::mm(10.0))
    }
}

/// Options forwarded to the PDF engine. The key set is fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageOptions {
    pub encoding: String,
    pub page_size: PageSize,
    pub margins: Margins,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            encoding: "utf-8".to_string(),
            page_size: PageSize::A4,
            margins: Margins::default(),
        }
    }
}

/// Which HTML → PDF engine the pipeline constructs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EngineKind {
    /// In-process flow-layout renderer.
    #[default]
    Builtin,
    /// External wkhtmltopdf binary. Falls back to `WKHTMLTOPDF_BINARY`, then `PATH`.
    Wkhtmltopdf {
        #[serde(default)]
        program: Option<PathBuf>,
    },
}

/// Everything the pipeline needs besides the content itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfiguration {
    /// Directory searched for templates (recursively).
    pub template_dir: PathBuf,
    /// Template rendered by [`crate::EbookPipeline::render_markup`].
    pub template_name: String,
    /// Stylesheet inlined into the HTML head. `None` renders unstyled.
    pub stylesheet: Option<PathBuf>,
    pub page: PageOptions,
    pub engine: EngineKind,
}

impl Default for RenderConfiguration {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("templates"),
            template_name: "ebook_template.md".to_string(),
            stylesheet: Some(PathBuf::from("styles.css")),
            page: PageOptions::default(),
            engine: EngineKind::Builtin,
        }
    }
}

impl RenderConfiguration {
    pub fn from_json_str(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| EbookError::Config {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        Self::from_json_str(&json).map_err(|e| EbookError::Config {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }
}
