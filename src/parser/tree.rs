//! Minimal XML element tree.
//!
//! The telemetry documents are small and the parsers need find-anywhere
//! lookups across deeply nested grouping elements, so the event stream from
//! `quick_xml` is materialized into an owned tree first.

use quick_xml::Reader;
use quick_xml::events::Event;

use super::ParseError;

/// One XML element: tag name, trimmed text content and child elements.
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub name: String,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    /// First direct child with the given tag name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Trimmed text of a direct child, if present and non-empty.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.text.as_str())
            .filter(|t| !t.is_empty())
    }

    /// Text of a direct child, or the empty string.
    pub fn text_of(&self, name: &str) -> &str {
        self.child_text(name).unwrap_or("")
    }

    /// Integer value of a direct child; missing or non-numeric yields 0.
    pub fn int_of(&self, name: &str) -> u64 {
        self.child_text(name)
            .and_then(|t| t.parse().ok())
            .unwrap_or(0)
    }

    /// Float value of a direct child; missing or non-numeric yields 0.
    pub fn float_of(&self, name: &str) -> f64 {
        self.child_text(name)
            .and_then(|t| t.parse().ok())
            .unwrap_or(0.0)
    }

    /// Duration of a direct child in seconds. Accepts "HH:MM:SS", "MM:SS"
    /// and bare seconds; anything else yields 0.
    pub fn seconds_of(&self, name: &str) -> u64 {
        self.child_text(name).map(parse_duration).unwrap_or(0)
    }

    /// Depth-first search for any descendant (or self) with the given name.
    pub fn find(&self, name: &str) -> Option<&Element> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// All descendants (or self) with the given name, in document order.
    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut out = Vec::new();
        self.collect_named(name, &mut out);
        out
    }

    fn collect_named<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        if self.name == name {
            out.push(self);
        }
        for child in &self.children {
            child.collect_named(name, out);
        }
    }

    /// True when an element with the given name exists anywhere in the tree.
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }
}

/// Parse a document into its root element.
pub fn parse_document(xml: &str) -> Result<Element, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader
            .read_event()
            .map_err(|e| ParseError::Malformed(e.to_string()))?
        {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                stack.push(Element {
                    name,
                    ..Element::default()
                });
            }
            Event::Empty(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                let element = Element {
                    name,
                    ..Element::default()
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::Text(text) => {
                let value = text
                    .unescape()
                    .map_err(|e| ParseError::Malformed(e.to_string()))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(value.trim());
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(String::from_utf8_lossy(&data).trim());
                }
            }
            Event::End(_) => {
                let finished = stack
                    .pop()
                    .ok_or_else(|| ParseError::Malformed("unbalanced end tag".to_string()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(finished),
                    None => root = Some(finished),
                }
            }
            Event::Eof => break,
            // declarations, comments, processing instructions
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(ParseError::Malformed("unclosed element".to_string()));
    }
    root.ok_or(ParseError::Empty)
}

fn parse_duration(value: &str) -> u64 {
    let parts: Vec<&str> = value.split(':').collect();
    let nums: Option<Vec<u64>> = parts.iter().map(|p| p.trim().parse().ok()).collect();
    match nums.as_deref() {
        Some([h, m, s]) => h * 3600 + m * 60 + s,
        Some([m, s]) => m * 60 + s,
        Some([s]) => *s,
        _ => 0,
    }
}
