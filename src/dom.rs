//! HTML parser – converts an HTML string into a simple DOM tree.
//!
//! Covers the subset the markup stage emits:
//! - Document: html, head, title, style, meta, body
//! - Blocks: div, nav, p, h1-h6, ul, ol, li, table parts, pre, blockquote, hr
//! - Inline: a, em, strong, del, code, sup, span, br, img, input
//!
//! Unknown tags are kept; block/inline treatment is decided by name.

use std::collections::HashMap;

// ---------------------------------------------------------------------------
// DOM types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Html,
    Head,
    Title,
    Style,
    Meta,
    Body,
    Div,
    Nav,
    P,
    /// `h1`..`h6`; the level is 1-based.
    Heading(u8),
    Ul,
    Ol,
    Li,
    Table,
    Thead,
    Tbody,
    Tr,
    Td,
    Th,
    Pre,
    Blockquote,
    Hr,
    Br,
    Img,
    A,
    Em,
    Strong,
    Del,
    Code,
    Sup,
    Span,
    Input,
    Unknown(String),
}

/// Unknown tags rendered inline rather than as blocks.
const INLINE_UNKNOWN: &[&str] = &[
    "b", "i", "u", "s", "small", "abbr", "cite", "kbd", "mark", "q", "sub", "time", "var",
    "strike", "ins", "label",
];

/// Unknown tags that never have children.
const VOID_UNKNOWN: &[&str] = &["link", "col", "source", "wbr", "area", "base"];

impl Tag {
    pub fn from_name(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "html" => Tag::Html,
            "head" => Tag::Head,
            "title" => Tag::Title,
            "style" => Tag::Style,
            "meta" => Tag::Meta,
            "body" => Tag::Body,
            "div" => Tag::Div,
            "nav" => Tag::Nav,
            "p" => Tag::P,
            "h1" => Tag::Heading(1),
            "h2" => Tag::Heading(2),
            "h3" => Tag::Heading(3),
            "h4" => Tag::Heading(4),
            "h5" => Tag::Heading(5),
            "h6" => Tag::Heading(6),
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "table" => Tag::Table,
            "thead" => Tag::Thead,
            "tbody" => Tag::Tbody,
            "tr" => Tag::Tr,
            "td" => Tag::Td,
            "th" => Tag::Th,
            "pre" => Tag::Pre,
            "blockquote" => Tag::Blockquote,
            "hr" => Tag::Hr,
            "br" => Tag::Br,
            "img" => Tag::Img,
            "a" => Tag::A,
            "em" => Tag::Em,
            "strong" => Tag::Strong,
            "del" => Tag::Del,
            "code" => Tag::Code,
            "sup" => Tag::Sup,
            "span" => Tag::Span,
            "input" => Tag::Input,
            other => Tag::Unknown(other.to_string()),
        }
    }

    /// Lower-case element name, as used by stylesheet selectors.
    pub fn name(&self) -> &str {
        match self {
            Tag::Html => "html",
            Tag::Head => "head",
            Tag::Title => "title",
            Tag::Style => "style",
            Tag::Meta => "meta",
            Tag::Body => "body",
            Tag::Div => "div",
            Tag::Nav => "nav",
            Tag::P => "p",
            Tag::Heading(1) => "h1",
            Tag::Heading(2) => "h2",
            Tag::Heading(3) => "h3",
            Tag::Heading(4) => "h4",
            Tag::Heading(5) => "h5",
            Tag::Heading(_) => "h6",
            Tag::Ul => "ul",
            Tag::Ol => "ol",
            Tag::Li => "li",
            Tag::Table => "table",
            Tag::Thead => "thead",
            Tag::Tbody => "tbody",
            Tag::Tr => "tr",
            Tag::Td => "td",
            Tag::Th => "th",
            Tag::Pre => "pre",
            Tag::Blockquote => "blockquote",
            Tag::Hr => "hr",
            Tag::Br => "br",
            Tag::Img => "img",
            Tag::A => "a",
            Tag::Em => "em",
            Tag::Strong => "strong",
            Tag::Del => "del",
            Tag::Code => "code",
            Tag::Sup => "sup",
            Tag::Span => "span",
            Tag::Input => "input",
            Tag::Unknown(name) => name,
        }
    }

    pub fn is_inline(&self) -> bool {
        match self {
            Tag::A
            | Tag::Em
            | Tag::Strong
            | Tag::Del
            | Tag::Code
            | Tag::Sup
            | Tag::Span
            | Tag::Br
            | Tag::Img
            | Tag::Input => true,
            Tag::Unknown(name) => INLINE_UNKNOWN.contains(&name.as_str()),
            _ => false,
        }
    }

    fn is_void(&self) -> bool {
        match self {
            Tag::Img | Tag::Hr | Tag::Br | Tag::Meta | Tag::Input => true,
            Tag::Unknown(name) => VOID_UNKNOWN.contains(&name.as_str()),
            _ => false,
        }
    }

    /// Elements whose content is raw text up to the matching close tag.
    fn is_raw_text(&self) -> bool {
        match self {
            Tag::Style | Tag::Title => true,
            Tag::Unknown(name) => name == "script",
            _ => false,
        }
    }
}

/// A node in our DOM tree.
#[derive(Debug, Clone)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

impl DomNode {
    pub fn is_inline(&self) -> bool {
        match self {
            DomNode::Text(_) => true,
            DomNode::Element(e) => e.tag.is_inline(),
        }
    }
}

/// An element node carrying tag, attributes, and children.
#[derive(Debug, Clone)]
pub struct ElementNode {
    pub tag: Tag,
    pub attributes: HashMap<String, String>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attr("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn inline_style(&self) -> Option<&str> {
        self.attr("style")
    }

    pub fn src(&self) -> Option<&str> {
        self.attr("src")
    }

    /// Concatenated text of all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[DomNode], out: &mut String) {
    for node in nodes {
        match node {
            DomNode::Text(t) => out.push_str(t),
            DomNode::Element(e) => collect_text(&e.children, out),
        }
    }
}

// ---------------------------------------------------------------------------
// Parser – recursive descent over HTML
// ---------------------------------------------------------------------------

/// Parse an HTML string into a list of DOM nodes.
///
/// Close tags are matched by name against the open-element stack: a close
/// tag for an ancestor implicitly closes the current element, and a close
/// tag that matches nothing open is dropped.
pub fn parse_html(html: &str) -> Vec<DomNode> {
    // With nothing open, every close tag is stray, so this consumes the
    // whole input.
    Parser::new(html).parse_nodes()
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    open: Vec<Tag>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            open: Vec::new(),
        }
    }

    fn parse_nodes(&mut self) -> Vec<DomNode> {
        let mut nodes = Vec::new();
        while !self.eof() {
            if self.starts_with("</") {
                let name = Tag::from_name(&self.peek_closing_name());
                if self.open.contains(&name) {
                    break;
                }
                // Stray close tag.
                self.skip_closing_tag();
                continue;
            }
            if let Some(node) = self.parse_node() {
                nodes.push(node);
            }
        }
        nodes
    }

    fn parse_node(&mut self) -> Option<DomNode> {
        if self.starts_with("<!--") {
            self.skip_comment();
            return None;
        }
        if self.starts_with("<!") || self.starts_with("<?") {
            // Skip doctype / processing instructions
            self.skip_past(">");
            return None;
        }
        let next_is_name = self.input[self.pos..]
            .chars()
            .nth(1)
            .is_some_and(|c| c.is_ascii_alphabetic());
        if self.starts_with("<") && next_is_name {
            Some(self.parse_element())
        } else {
            Some(self.parse_text())
        }
    }

    fn parse_text(&mut self) -> DomNode {
        let start = self.pos;
        // A '<' that does not open a tag is literal text.
        self.advance_char();
        while !self.eof() && !self.starts_with("<") {
            self.advance_char();
        }
        DomNode::Text(decode_entities(&self.input[start..self.pos]))
    }

    fn parse_element(&mut self) -> DomNode {
        self.advance_char(); // '<'
        let tag = Tag::from_name(&self.parse_name());
        let mut elem = ElementNode::new(tag.clone());

        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            let before = self.pos;
            let (key, value) = self.parse_attribute();
            if self.pos == before {
                // Junk inside the tag; step over it.
                self.advance_char();
                continue;
            }
            elem.attributes.insert(key.to_ascii_lowercase(), value);
        }

        if self.starts_with("/>") {
            self.pos += 2;
            return DomNode::Element(elem);
        }
        if self.starts_with(">") {
            self.pos += 1;
        }
        if tag.is_void() {
            return DomNode::Element(elem);
        }

        if tag.is_raw_text() {
            let close = format!("</{}", tag.name());
            let rest = &self.input[self.pos..];
            let end = find_ascii_case_insensitive(rest, &close).unwrap_or(rest.len());
            let raw = &rest[..end];
            let text = if tag == Tag::Title {
                decode_entities(raw)
            } else {
                raw.to_string()
            };
            elem.children.push(DomNode::Text(text));
            self.pos += end;
        } else {
            self.open.push(tag.clone());
            elem.children = self.parse_nodes();
            self.open.pop();
        }

        if self.starts_with("</") && Tag::from_name(&self.peek_closing_name()) == tag {
            self.skip_closing_tag();
        }

        DomNode::Element(elem)
    }

    fn parse_name(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.current_char() {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ':' {
                self.advance_char();
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn parse_attribute(&mut self) -> (String, String) {
        let key = self.parse_name();
        self.skip_whitespace();
        if !self.starts_with("=") {
            return (key, String::new());
        }
        self.pos += 1;
        self.skip_whitespace();
        (key, self.parse_attr_value())
    }

    fn parse_attr_value(&mut self) -> String {
        for quote in ["\"", "'"] {
            if self.starts_with(quote) {
                self.pos += 1;
                let start = self.pos;
                while !self.eof() && !self.starts_with(quote) {
                    self.advance_char();
                }
                let val = decode_entities(&self.input[start..self.pos]);
                if !self.eof() {
                    self.pos += 1;
                }
                return val;
            }
        }
        let start = self.pos;
        while let Some(c) = self.current_char() {
            if c.is_whitespace() || c == '>' {
                break;
            }
            self.advance_char();
        }
        decode_entities(&self.input[start..self.pos])
    }

    fn peek_closing_name(&self) -> String {
        self.input[self.pos + 2..]
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
            .collect()
    }

    fn skip_closing_tag(&mut self) {
        self.skip_past(">");
    }

    fn skip_comment(&mut self) {
        self.pos += 4; // <!--
        self.skip_past("-->");
    }

    fn skip_past(&mut self, needle: &str) {
        match self.input[self.pos..].find(needle) {
            Some(i) => self.pos += i + needle.len(),
            None => self.pos = self.input.len(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.current_char().is_some_and(char::is_whitespace) {
            self.advance_char();
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance_char(&mut self) {
        if let Some(c) = self.current_char() {
            self.pos += c.len_utf8();
        }
    }
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

/// Decode named and numeric character references. Unknown references are
/// left untouched.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_reference(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{00A0}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "hellip" => '\u{2026}',
        "copy" => '\u{00A9}',
        "reg" => '\u{00AE}',
        "laquo" => '\u{00AB}',
        "raquo" => '\u{00BB}',
        _ => return None,
    };
    Some(c)
}

// ---------------------------------------------------------------------------
// Convenience helpers
// ---------------------------------------------------------------------------

/// Find the `<body>` element and return its children, or return all nodes
/// except `<head>` if no `<body>` is present.
pub fn body_children(nodes: &[DomNode]) -> Vec<DomNode> {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Body {
                return e.children.clone();
            }
            if e.tag == Tag::Html {
                return body_children(&e.children);
            }
        }
    }
    nodes
        .iter()
        .filter(|n| !matches!(n, DomNode::Element(e) if e.tag == Tag::Head))
        .cloned()
        .collect()
}

/// Depth-first search for every element with `tag`.
pub fn find_all<'a>(nodes: &'a [DomNode], tag: &Tag, out: &mut Vec<&'a ElementNode>) {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if &e.tag == tag {
                out.push(e);
            }
            find_all(&e.children, tag, out);
        }
    }
}
