//! Minimal XML element tree with a hand-written parser and pretty printer.
//!
//! Covers exactly the subset the s-rep format uses: a declaration line,
//! elements with attributes, character data, and comments. No namespaces,
//! CDATA, or DTDs.

use crate::util::{Error, Result};

/// A single XML element: tag, attributes, character data, child elements.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    /// Create an empty element.
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into(), ..Default::default() }
    }

    /// Create an element carrying only character data.
    pub fn with_text(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self { tag: tag.into(), text: text.into(), ..Default::default() }
    }

    /// Look up an attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing any existing value of the same name.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// First child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// All children with the given tag.
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Append a child element.
    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Parse a document into its root element.
    ///
    /// Leading/trailing declarations, comments, and whitespace are skipped.
    pub fn parse(input: &str) -> Result<Element> {
        let mut parser = Parser::new(input);
        parser.skip_misc()?;
        let root = parser.parse_element()?;
        parser.skip_misc()?;
        if !parser.at_end() {
            return Err(parser.error("trailing content after root element"));
        }
        Ok(root)
    }

    /// Serialize as a pretty-printed document: declaration line first,
    /// two-space indentation per nesting level.
    pub fn pretty(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" ?>\n");
        self.write_into(&mut out, 0);
        out
    }

    fn write_into(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        out.push_str(&indent);
        out.push('<');
        out.push_str(&self.tag);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape(value, true));
            out.push('"');
        }
        if self.text.is_empty() && self.children.is_empty() {
            out.push_str("/>\n");
        } else if self.children.is_empty() {
            out.push('>');
            out.push_str(&escape(&self.text, false));
            out.push_str("</");
            out.push_str(&self.tag);
            out.push_str(">\n");
        } else {
            out.push_str(">\n");
            if !self.text.is_empty() {
                out.push_str(&indent);
                out.push_str("  ");
                out.push_str(&escape(&self.text, false));
                out.push('\n');
            }
            for child in &self.children {
                child.write_into(out, depth + 1);
            }
            out.push_str(&indent);
            out.push_str("</");
            out.push_str(&self.tag);
            out.push_str(">\n");
        }
    }
}

fn escape(s: &str, in_attribute: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(i) = rest.find('&') {
        out.push_str(&rest[..i]);
        rest = &rest[i..];
        let (replacement, len) = if rest.starts_with("&lt;") {
            ('<', 4)
        } else if rest.starts_with("&gt;") {
            ('>', 4)
        } else if rest.starts_with("&amp;") {
            ('&', 5)
        } else if rest.starts_with("&quot;") {
            ('"', 6)
        } else if rest.starts_with("&apos;") {
            ('\'', 6)
        } else {
            // Unknown entity, keep the ampersand literal
            ('&', 1)
        };
        out.push(replacement);
        rest = &rest[len..];
    }
    out.push_str(rest);
    out
}

/// Byte-cursor parser over the input document.
struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn error(&self, msg: &str) -> Error {
        Error::parse(format!("{} at byte {}", msg, self.pos))
    }

    fn expect(&mut self, b: u8) -> Result<()> {
        if self.peek() == Some(b) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", b as char)))
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    /// Skip whitespace, `<?...?>` declarations, and `<!--...-->` comments.
    fn skip_misc(&mut self) -> Result<()> {
        loop {
            self.skip_whitespace();
            if self.starts_with("<?") {
                self.skip_past("?>")?;
            } else if self.starts_with("<!--") {
                self.skip_past("-->")?;
            } else {
                return Ok(());
            }
        }
    }

    fn skip_past(&mut self, end: &str) -> Result<()> {
        match self.input[self.pos..].find(end) {
            Some(i) => {
                self.pos += i + end.len();
                Ok(())
            }
            None => Err(self.error(&format!("unterminated section, expected '{end}'"))),
        }
    }

    fn parse_name(&mut self) -> Result<String> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b':') {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.error("expected a name"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_attr_value(&mut self) -> Result<String> {
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(self.error("expected quoted attribute value")),
        };
        self.pos += 1;
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == quote {
                let value = unescape(&self.input[start..self.pos]);
                self.pos += 1;
                return Ok(value);
            }
            self.pos += 1;
        }
        Err(self.error("unterminated attribute value"))
    }

    fn parse_element(&mut self) -> Result<Element> {
        self.expect(b'<')?;
        let tag = self.parse_name()?;
        let mut element = Element::new(tag);

        // Attributes up to '>' or '/>'
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'/') => {
                    self.pos += 1;
                    self.expect(b'>')?;
                    return Ok(element);
                }
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {
                    let name = self.parse_name()?;
                    self.skip_whitespace();
                    self.expect(b'=')?;
                    self.skip_whitespace();
                    let value = self.parse_attr_value()?;
                    element.attributes.push((name, value));
                }
                None => return Err(self.error("unterminated start tag")),
            }
        }

        // Content: text, children, comments, then the close tag
        let mut text = String::new();
        loop {
            if self.starts_with("<!--") {
                self.skip_past("-->")?;
            } else if self.starts_with("</") {
                self.pos += 2;
                let close = self.parse_name()?;
                if close != element.tag {
                    return Err(self.error(&format!(
                        "mismatched close tag: expected </{}>, got </{close}>",
                        element.tag
                    )));
                }
                self.skip_whitespace();
                self.expect(b'>')?;
                element.text = unescape(text.trim());
                return Ok(element);
            } else if self.peek() == Some(b'<') {
                element.children.push(self.parse_element()?);
            } else if self.at_end() {
                return Err(self.error(&format!("unterminated element <{}>", element.tag)));
            } else {
                let start = self.pos;
                while self.peek().is_some_and(|b| b != b'<') {
                    self.pos += 1;
                }
                text.push_str(&self.input[start..self.pos]);
            }
        }
    }
}
