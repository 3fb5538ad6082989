//! Template fill: binds [`EbookContent`] into a Jinja2-style template and
//! returns the resulting Markdown.
//!
//! Each [`TemplateRenderer`] owns its own `tera::Tera` instance; there is no
//! process-wide template environment, so pipelines with different template
//! directories can coexist.

use std::path::Path;

use tera::{Context, Tera};

use crate::content::EbookContent;
use crate::error::{EbookError, Result};

/// File extensions loaded from a template directory. Anything else (images,
/// stylesheets) sitting next to the templates is ignored.
const TEMPLATE_GLOB: &str = "**/*.{md,markdown,txt,html,htm,tera,j2}";

pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Load every template under `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let glob = format!("{}/{}", dir.display(), TEMPLATE_GLOB);
        let tera = Tera::new(&glob).map_err(|e| EbookError::template(&glob, &e))?;
        log::debug!(
            "loaded {} template(s) from '{}'",
            tera.get_template_names().count(),
            dir.display()
        );
        Ok(Self { tera })
    }

    /// Build a renderer around a single in-memory template.
    pub fn from_raw(name: &str, source: &str) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(name, source)
            .map_err(|e| EbookError::template(name, &e))?;
        Ok(Self { tera })
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Render template `name` with `title`, `author` and `chapters` bound.
    pub fn render(&self, name: &str, content: &EbookContent) -> Result<String> {
        if !self.has_template(name) {
            return Err(EbookError::Template {
                name: name.to_string(),
                detail: "template not found".to_string(),
            });
        }
        let context =
            Context::from_serialize(content).map_err(|e| EbookError::template(name, &e))?;
        self.tera
            .render(name, &context)
            .map_err(|e| EbookError::template(name, &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Chapter;
    use crate::error::ErrorKind;

    fn sample() -> EbookContent {
        EbookContent::new("My Book", "Jane Doe")
            .with_chapter(Chapter::new("First", "Alpha"))
            .with_chapter(Chapter::new("Second", "Beta").with_image("img/b.png"))
    }

    #[test]
    fn renders_bindings_in_order() {
        let renderer = TemplateRenderer::from_raw(
            "book.md",
            "# {{ title }}\n{{ author }}\n{% for c in chapters %}## {{ c.title }}\n{{ c.content }}\n{% for i in c.images %}![]({{ i }})\n{% endfor %}{% endfor %}",
        )
        .unwrap();
        let md = renderer.render("book.md", &sample()).unwrap();
        assert!(md.starts_with("# My Book\nJane Doe\n"));
        let first = md.find("## First").unwrap();
        let second = md.find("## Second").unwrap();
        assert!(first < second);
        assert!(md.contains("![](img/b.png)"));
    }

    #[test]
    fn markdown_is_not_html_escaped() {
        let renderer = TemplateRenderer::from_raw("t.md", "{{ chapters.0.content }}").unwrap();
        let content = EbookContent::new("T", "A").with_chapter(Chapter::new("C", "a < b & **c**"));
        assert_eq!(renderer.render("t.md", &content).unwrap(), "a < b & **c**");
    }

    #[test]
    fn missing_template_is_template_error() {
        let renderer = TemplateRenderer::from_raw("t.md", "x").unwrap();
        let err = renderer.render("nope.md", &sample()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Template);
    }

    #[test]
    fn undefined_field_is_template_error() {
        let renderer = TemplateRenderer::from_raw("t.md", "{{ subtitle }}").unwrap();
        let err = renderer.render("t.md", &sample()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Template);
    }

    #[test]
    fn syntax_error_is_template_error() {
        let err = TemplateRenderer::from_raw("t.md", "{% for x in %}").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Template);
    }
}
