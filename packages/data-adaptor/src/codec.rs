//! XML encoding and decoding of node trees.

use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::{Deserialize, Serialize};

use crate::node::check_name;
use crate::{DataAdaptor, Error, XmlNode};

/// A `<!DOCTYPE name SYSTEM "uri">` declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocType {
    /// Name of the root element the DTD describes.
    pub name: String,
    /// System identifier (the DTD URI).
    pub system_id: Option<String>,
}

impl DocType {
    fn render(&self) -> String {
        match &self.system_id {
            Some(uri) => format!("{} SYSTEM \"{}\"", self.name, uri),
            None => self.name.clone(),
        }
    }

    /// Parse the body of a DOCTYPE declaration.
    ///
    /// Internal subsets are ignored; only the name and system identifier matter.
    fn parse(body: &str) -> Option<Self> {
        let body = body.trim();
        let body = body.split('[').next().unwrap_or(body).trim();
        let mut parts = body.splitn(2, char::is_whitespace);
        let name = parts.next().filter(|name| !name.is_empty())?.to_string();
        let rest = parts.next().unwrap_or("").trim();

        let quoted: Vec<&str> = rest
            .split(['"', '\''])
            .skip(1)
            .step_by(2)
            .collect();
        let system_id = if rest.starts_with("SYSTEM") {
            quoted.first().map(|s| s.to_string())
        } else if rest.starts_with("PUBLIC") {
            quoted.get(1).map(|s| s.to_string())
        } else {
            None
        };

        Some(DocType { name, system_id })
    }
}

/// Formatting options for written documents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Spaces per nesting level; `0` writes everything on one line.
    pub indent: usize,
    /// Whether to emit the `<?xml ...?>` declaration.
    pub declaration: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            indent: 4,
            declaration: true,
        }
    }
}

/// Decoded document parts: optional DOCTYPE and the top-level elements.
pub(crate) struct Decoded {
    pub doc_type: Option<DocType>,
    pub elements: Vec<XmlNode>,
}

/// Parse XML text into a node tree.
///
/// Text content, comments and processing instructions are skipped: adaptors
/// only carry attributes and child elements. With `validating` set, the
/// document must declare a DOCTYPE whose name matches the root element.
pub(crate) fn decode(source: &str, location: &str, validating: bool) -> Result<Decoded, Error> {
    let malformed = |message: String| Error::Parse {
        location: location.to_string(),
        message,
    };

    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(true);

    let mut doc_type = None;
    let mut stack: Vec<XmlNode> = vec![XmlNode::default()];

    loop {
        let event = reader.read_event().map_err(|e| {
            malformed(format!("{} at byte {}", e, reader.buffer_position()))
        })?;

        match event {
            Event::Start(start) => {
                stack.push(node_from_start(&start).map_err(malformed)?);
            }
            Event::Empty(start) => {
                let node = node_from_start(&start).map_err(malformed)?;
                if let Some(parent) = stack.last_mut() {
                    parent.push_child(node);
                }
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .filter(|_| !stack.is_empty())
                    .ok_or_else(|| malformed("unexpected closing tag".to_string()))?;
                if let Some(parent) = stack.last_mut() {
                    parent.push_child(node);
                }
            }
            Event::DocType(text) => {
                let body = std::str::from_utf8(&text)
                    .map_err(|e| malformed(format!("DOCTYPE is not UTF-8: {}", e)))?;
                doc_type = DocType::parse(body);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() != 1 {
        let open = stack.last().map(|node| node.name().to_string()).unwrap_or_default();
        return Err(malformed(format!("unclosed element <{}>", open)));
    }
    let document = stack.pop().unwrap_or_default();
    let elements = document.children().to_vec();

    match elements.len() {
        0 => return Err(malformed("document has no root element".to_string())),
        1 => {}
        n => return Err(malformed(format!("document has {} root elements", n))),
    }

    if validating {
        let root = elements[0].name();
        match &doc_type {
            None => return Err(malformed("validation requested but no DOCTYPE".to_string())),
            Some(declared) if declared.name != root => {
                return Err(malformed(format!(
                    "root element <{}> does not match DOCTYPE '{}'",
                    root, declared.name
                )))
            }
            Some(_) => {}
        }
    }

    Ok(Decoded { doc_type, elements })
}

fn node_from_start(start: &BytesStart<'_>) -> Result<XmlNode, String> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| format!("element name is not UTF-8: {}", e))?
        .to_string();
    let mut node = XmlNode::new(name);

    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| e.to_string())?;
        let key = std::str::from_utf8(attribute.key.as_ref())
            .map_err(|e| format!("attribute name is not UTF-8: {}", e))?
            .to_string();
        let value = attribute.unescape_value().map_err(|e| e.to_string())?;
        node.set_string(&key, value.into_owned());
    }

    Ok(node)
}

/// Write a document to `sink`.
pub(crate) fn encode<W: Write>(
    sink: W,
    doc_type: Option<&DocType>,
    elements: &[XmlNode],
    options: &WriteOptions,
) -> Result<(), Error> {
    if elements.len() != 1 {
        return Err(Error::Write {
            message: format!(
                "a document needs exactly one root element, found {}",
                elements.len()
            ),
        });
    }
    for element in elements {
        element.validate_names()?;
    }
    if let Some(doc_type) = doc_type {
        check_name(&doc_type.name)?;
    }

    let mut writer = if options.indent > 0 {
        Writer::new_with_indent(sink, b' ', options.indent)
    } else {
        Writer::new(sink)
    };

    if options.declaration {
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(Error::write)?;
    }
    if let Some(doc_type) = doc_type {
        writer
            .write_event(Event::DocType(BytesText::from_escaped(doc_type.render())))
            .map_err(Error::write)?;
    }
    for element in elements {
        encode_node(&mut writer, element)?;
    }

    writer.get_mut().write_all(b"\n").map_err(Error::write)?;
    writer.get_mut().flush().map_err(Error::write)
}

fn encode_node<W: Write>(writer: &mut Writer<W>, node: &XmlNode) -> Result<(), Error> {
    let mut start = BytesStart::new(node.name());
    for (name, value) in node.attributes() {
        start.push_attribute((name, value));
    }

    if node.children().is_empty() {
        return writer.write_event(Event::Empty(start)).map_err(Error::write);
    }

    writer.write_event(Event::Start(start)).map_err(Error::write)?;
    for child in node.children() {
        encode_node(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(node.name())))
        .map_err(Error::write)
}
