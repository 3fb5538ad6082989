//! Structured ebook content bound into the template.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EbookError, Result};

/// The whole book: metadata plus chapters in reading order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EbookContent {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

/// One chapter. `content` is Markdown; `images` are paths referenced by the
/// template and resolved by the PDF engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub images: Vec<PathBuf>,
}

impl EbookContent {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            chapters: Vec::new(),
        }
    }

    /// Builder-style chapter append.
    pub fn with_chapter(mut self, chapter: Chapter) -> Self {
        self.chapters.push(chapter);
        self
    }

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

impl Chapter {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.images.push(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn images_default_to_empty() {
        let json = r#"{
            "title": "Book",
            "author": "Someone",
            "chapters": [
                {"title": "One", "content": "Text"},
                {"title": "Two", "content": "More", "images": ["a.png", "b.jpg"]}
            ]
        }"#;
        let content = EbookContent::from_json_str(json).unwrap();
        assert_eq!(content.chapters.len(), 2);
        assert!(content.chapters[0].images.is_empty());
        assert_eq!(
            content.chapters[1].images,
            vec![PathBuf::from("a.png"), PathBuf::from("b.jpg")]
        );
    }

    #[test]
    fn chapters_default_to_empty() {
        let content = EbookContent::from_json_str(r#"{"title": "T", "author": "A"}"#).unwrap();
        assert!(content.chapters.is_empty());
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = EbookContent::from_json_file(Path::new("/nonexistent/content.json")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }
}
