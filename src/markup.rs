//! Markdown → HTML conversion with heading anchors and a generated table of
//! contents.
//!
//! Extensions enabled by default: tables, footnotes, strikethrough, task
//! lists, definition lists and `{#id .class}` heading attributes. Every heading receives a
//! unique `id`; a paragraph that is exactly `[TOC]` is replaced with a nested
//! list of links to those headings.

use std::collections::HashSet;

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};

use crate::error::{EbookError, Result};

/// Paragraph text replaced by the generated table of contents.
pub const TOC_MARKER: &str = "[TOC]";

/// One heading in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub level: u8,
    pub title: String,
    pub anchor: String,
}

/// Result of converting one Markdown document.
#[derive(Debug, Clone)]
pub struct ConvertedMarkup {
    pub html: String,
    pub toc: Vec<TocEntry>,
}

impl ConvertedMarkup {
    /// The table of contents as a nested `<ul>` inside `<div class="toc">`.
    pub fn toc_html(&self) -> String {
        render_toc(&self.toc)
    }
}

pub struct MarkupConverter {
    options: Options,
}

impl Default for MarkupConverter {
    fn default() -> Self {
        Self {
            options: Options::ENABLE_TABLES
                | Options::ENABLE_FOOTNOTES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_DEFINITION_LIST
                | Options::ENABLE_HEADING_ATTRIBUTES,
        }
    }
}

impl MarkupConverter {
    pub fn with_options(options: Options) -> Self {
        Self { options }
    }

    pub fn convert(&self, markdown: &str) -> Result<ConvertedMarkup> {
        if let Some(offset) = markdown.find('\0') {
            return Err(EbookError::Conversion(format!(
                "NUL character at byte offset {offset}"
            )));
        }

        let mut events: Vec<Event<'_>> = Parser::new_ext(markdown, self.options).collect();
        let toc = assign_heading_ids(&mut events);
        let toc_html = render_toc(&toc);
        let events = replace_toc_marker(events, &toc_html);

        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, events.into_iter());
        log::debug!("converted {} bytes of markup, {} heading(s)", markdown.len(), toc.len());
        Ok(ConvertedMarkup { html: out, toc })
    }
}

/// Give every heading an `id` (explicit ids are kept) and return the headings.
fn assign_heading_ids(events: &mut [Event<'_>]) -> Vec<TocEntry> {
    // Explicit ids are reserved up front so no generated slug can take them.
    let mut used: HashSet<String> = events
        .iter()
        .filter_map(|e| match e {
            Event::Start(Tag::Heading { id: Some(id), .. }) => Some(id.to_string()),
            _ => None,
        })
        .collect();
    let mut claimed: HashSet<String> = HashSet::new();
    let mut toc = Vec::new();

    let mut i = 0;
    while i < events.len() {
        let (level, explicit) = match &events[i] {
            Event::Start(Tag::Heading { level, id, .. }) => {
                (*level as u8, id.as_ref().map(|s| s.to_string()))
            }
            _ => {
                i += 1;
                continue;
            }
        };

        let mut title = String::new();
        let mut j = i + 1;
        while j < events.len() {
            match &events[j] {
                Event::End(TagEnd::Heading(_)) => break,
                Event::Text(t) | Event::Code(t) => title.push_str(t),
                Event::SoftBreak | Event::HardBreak => title.push(' '),
                _ => {}
            }
            j += 1;
        }
        let title = title.trim().to_string();

        let anchor = match explicit {
            Some(id) if claimed.insert(id.clone()) => id,
            // A repeated explicit id is suffixed like a repeated slug.
            Some(id) => unique_slug(&id, &mut used),
            None => unique_slug(&slugify(&title), &mut used),
        };
        if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
            *id = Some(CowStr::from(anchor.clone()));
        }

        toc.push(TocEntry {
            level,
            title,
            anchor,
        });
        i = j;
    }
    toc
}

/// Swap each `<p>[TOC]</p>` for the rendered table of contents.
fn replace_toc_marker<'a>(events: Vec<Event<'a>>, toc_html: &str) -> Vec<Event<'a>> {
    let mut out = Vec::with_capacity(events.len());
    let mut i = 0;
    while i < events.len() {
        if matches!(events[i], Event::Start(Tag::Paragraph)) {
            // The parser may split "[TOC]" into several text events.
            let mut text = String::new();
            let mut j = i + 1;
            let mut only_text = true;
            while j < events.len() {
                match &events[j] {
                    Event::End(TagEnd::Paragraph) => break,
                    Event::Text(t) => text.push_str(t),
                    _ => only_text = false,
                }
                j += 1;
            }
            if only_text && j < events.len() && text.trim() == TOC_MARKER {
                out.push(Event::Html(CowStr::from(toc_html.to_string())));
                i = j + 1;
                continue;
            }
        }
        out.push(events[i].clone());
        i += 1;
    }
    out
}

fn render_toc(toc: &[TocEntry]) -> String {
    let mut out = String::from("<div class=\"toc\">\n");
    // Levels of the currently open <ul> elements; the last <li> is left open
    // until we know whether the next entry nests inside it.
    let mut open: Vec<u8> = Vec::new();
    for entry in toc {
        match open.last() {
            None => {
                out.push_str("<ul>\n");
                open.push(entry.level);
            }
            Some(&top) if entry.level > top => {
                out.push_str("\n<ul>\n");
                open.push(entry.level);
            }
            Some(_) => {
                out.push_str("</li>\n");
                while open.len() > 1 && open.last().is_some_and(|&top| entry.level < top) {
                    open.pop();
                    out.push_str("</ul>\n</li>\n");
                }
            }
        }
        out.push_str(&format!(
            "<li><a href=\"#{}\">{}</a>",
            escape_html(&entry.anchor),
            escape_html(&entry.title)
        ));
    }
    if !open.is_empty() {
        out.push_str("</li>\n");
        for _ in 1..open.len() {
            out.push_str("</ul>\n</li>\n");
        }
        out.push_str("</ul>\n");
    }
    out.push_str("</div>\n");
    out
}

/// Anchor slug: accents folded to ASCII, punctuation dropped, whitespace and
/// hyphen runs collapsed into a single `-`.
pub fn slugify(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        match fold_accent(c) {
            Some(ascii) => folded.push(ascii),
            None if c.is_ascii_alphanumeric() || c == '_' => folded.push(c),
            None if c.is_whitespace() || c == '-' => folded.push('-'),
            None => {}
        }
    }
    folded
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn fold_accent(c: char) -> Option<char> {
    let ascii = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        _ => return None,
    };
    Some(ascii)
}

fn unique_slug(base: &str, used: &mut HashSet<String>) -> String {
    let base = if base.is_empty() { "section" } else { base };
    let mut candidate = base.to_string();
    let mut n = 1;
    while used.contains(&candidate) {
        candidate = format!("{base}_{n}");
        n += 1;
    }
    used.insert(candidate.clone());
    candidate
}

pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn convert(md: &str) -> ConvertedMarkup {
        MarkupConverter::default().convert(md).unwrap()
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("Chapter One"), "chapter-one");
        assert_eq!(slugify("Capítulo 1 - Conceitos Básicos"), "capitulo-1-conceitos-basicos");
        assert_eq!(slugify("Introdução"), "introducao");
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn headings_get_ids_and_toc_entries() {
        let out = convert("# Intro\n\ntext\n\n## Details\n");
        assert!(out.html.contains(r#"<h1 id="intro">Intro</h1>"#), "{}", out.html);
        assert!(out.html.contains(r#"<h2 id="details">Details</h2>"#), "{}", out.html);
        assert_eq!(
            out.toc,
            vec![
                TocEntry { level: 1, title: "Intro".into(), anchor: "intro".into() },
                TocEntry { level: 2, title: "Details".into(), anchor: "details".into() },
            ]
        );
        assert!(out.toc_html().contains(r##"<a href="#details">Details</a>"##));
    }

    #[test]
    fn duplicate_headings_get_suffixes() {
        let out = convert("## Notes\n\n## Notes\n\n## Notes\n");
        let anchors: Vec<_> = out.toc.iter().map(|e| e.anchor.as_str()).collect();
        assert_eq!(anchors, vec!["notes", "notes_1", "notes_2"]);
    }

    #[test]
    fn explicit_heading_id_wins() {
        let out = convert("# Title {#custom}\n");
        assert_eq!(out.toc[0].anchor, "custom");
        assert!(out.html.contains(r#"id="custom""#));
    }

    #[test]
    fn explicit_ids_are_reserved_before_slugs() {
        let out = convert("## Intro\n\n## Other {#intro}\n\n## Dup {#x}\n\n## Again {#x}\n");
        let anchors: Vec<_> = out.toc.iter().map(|e| e.anchor.as_str()).collect();
        assert_eq!(anchors, vec!["intro_1", "intro", "x", "x_1"]);
        assert!(out.html.contains(r#"<h2 id="intro_1">Intro</h2>"#), "{}", out.html);
        assert!(out.html.contains(r#"<h2 id="x_1">Again</h2>"#), "{}", out.html);
    }

    #[test]
    fn definition_lists_enabled() {
        let out = convert("Term\n: Meaning\n");
        assert!(out.html.contains("<dl>"), "{}", out.html);
        assert!(out.html.contains("<dt>Term</dt>"), "{}", out.html);
    }

    #[test]
    fn toc_marker_is_replaced() {
        let out = convert("# Book\n\n[TOC]\n\n## One\n\n## Two\n");
        assert!(!out.html.contains("[TOC]"), "{}", out.html);
        let toc_pos = out.html.find(r#"<div class="toc">"#).unwrap();
        let one_pos = out.html.find(r#"<h2 id="one">"#).unwrap();
        assert!(toc_pos < one_pos);
    }

    #[test]
    fn toc_nesting_is_balanced() {
        let toc = vec![
            TocEntry { level: 1, title: "A".into(), anchor: "a".into() },
            TocEntry { level: 2, title: "B".into(), anchor: "b".into() },
            TocEntry { level: 3, title: "C".into(), anchor: "c".into() },
            TocEntry { level: 1, title: "D".into(), anchor: "d".into() },
        ];
        let html = render_toc(&toc);
        assert_eq!(html.matches("<ul>").count(), html.matches("</ul>").count());
        assert_eq!(html.matches("<li>").count(), html.matches("</li>").count());
        assert_eq!(html.matches("<ul>").count(), 3);
    }

    #[test]
    fn extra_extensions_enabled() {
        let out = convert("| a | b |\n|---|---|\n| 1 | 2 |\n\nNote[^1].\n\n[^1]: Footnote.\n\n~~gone~~\n");
        assert!(out.html.contains("<table>"));
        assert!(out.html.contains("footnote-definition"));
        assert!(out.html.contains("<del>gone</del>"));
    }

    #[test]
    fn custom_options_disable_tables() {
        let plain = MarkupConverter::with_options(Options::empty())
            .convert("| a |\n|---|\n| 1 |\n")
            .unwrap();
        assert!(!plain.html.contains("<table>"));
    }

    #[test]
    fn nul_byte_is_conversion_error() {
        let err = MarkupConverter::default().convert("a\0b").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Conversion);
    }
}
