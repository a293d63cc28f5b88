//! XML documents as data adaptors.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::codec::{self, DocType, WriteOptions};
use crate::node::check_name;
use crate::source::{self, Location, ResourceLoader};
use crate::{DataAdaptor, DataListener, Error, XmlNode};

/// A whole XML document.
///
/// The document itself is the top-level adaptor: its single child is the
/// root element. Listeners writing into a fresh document therefore create
/// the root element via [`DataAdaptor::write_node`]. Creating a child
/// replaces any existing root, and attributes set on the document land on
/// the root element.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XmlDocument {
    doc_type: Option<DocType>,
    document: XmlNode,
}

impl XmlDocument {
    /// An empty document with no root element.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty document declaring `<!DOCTYPE tag SYSTEM "dtd_uri">`.
    pub fn with_doc_type(tag: &str, dtd_uri: Option<&str>) -> Result<Self, Error> {
        check_name(tag).map_err(|_| Error::Creation {
            message: format!("invalid DOCTYPE name {:?}", tag),
        })?;
        Ok(Self {
            doc_type: Some(DocType {
                name: tag.to_string(),
                system_id: dtd_uri.map(str::to_string),
            }),
            document: XmlNode::default(),
        })
    }

    /// A document whose root element is written by `listener`.
    ///
    /// When `dtd_uri` is given, a DOCTYPE naming the listener's label is
    /// declared as well.
    pub fn for_listener(listener: &dyn DataListener, dtd_uri: Option<&str>) -> Result<Self, Error> {
        let mut document = match dtd_uri {
            Some(uri) => Self::with_doc_type(listener.data_label(), Some(uri))?,
            None => Self::new(),
        };
        document.write_node(listener);
        Ok(document)
    }

    /// Parse a document from XML text.
    pub fn parse_str(text: &str, validating: bool) -> Result<Self, Error> {
        Self::decode(text, "<string>", validating)
    }

    /// Parse a document from a reader.
    pub fn from_reader<R: Read>(mut reader: R, validating: bool) -> Result<Self, Error> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| Error::from_read("<reader>", e))?;
        Self::decode(&text, "<reader>", validating)
    }

    /// Read and parse a local file.
    pub fn from_path(path: impl AsRef<Path>, validating: bool) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = source::read_file(path)?;
        Self::decode(&text, &path.display().to_string(), validating)
    }

    /// Read and parse a document from a path or URL.
    ///
    /// Remote URLs are fetched with a default blocking HTTP client.
    pub fn from_url(location: &str, validating: bool) -> Result<Self, Error> {
        Self::load(location, None, validating)
    }

    /// Like [`from_url`](Self::from_url), with an explicit remote loader.
    pub fn load(
        location: &str,
        loader: Option<&dyn ResourceLoader>,
        validating: bool,
    ) -> Result<Self, Error> {
        let resolved = Location::parse(location)?;
        tracing::debug!(location = %resolved.display(), validating, "loading XML document");
        let text = source::load(&resolved, loader)?;
        Self::decode(&text, &resolved.display(), validating)
    }

    fn decode(text: &str, location: &str, validating: bool) -> Result<Self, Error> {
        let decoded = codec::decode(text, location, validating)?;
        let mut document = XmlNode::default();
        for element in decoded.elements {
            document.push_child(element);
        }
        Ok(Self {
            doc_type: decoded.doc_type,
            document,
        })
    }

    /// The declared DOCTYPE, if any.
    pub fn doc_type(&self) -> Option<&DocType> {
        self.doc_type.as_ref()
    }

    /// The root element, if one has been written.
    pub fn root_element(&self) -> Option<&XmlNode> {
        self.document.children().first()
    }

    /// Mutable access to the root element.
    pub fn root_element_mut(&mut self) -> Option<&mut XmlNode> {
        let tag = self.root_element()?.name().to_string();
        self.document.child_mut(&tag)
    }

    /// Serialize with default options.
    pub fn write_to<W: Write>(&self, sink: W) -> Result<(), Error> {
        self.write_with(sink, &WriteOptions::default())
    }

    /// Serialize with explicit formatting options.
    pub fn write_with<W: Write>(&self, sink: W, options: &WriteOptions) -> Result<(), Error> {
        codec::encode(
            sink,
            self.doc_type.as_ref(),
            self.document.children(),
            options,
        )
    }

    /// Serialize to a string with default options.
    pub fn to_xml_string(&self) -> Result<String, Error> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        String::from_utf8(out).map_err(Error::write)
    }

    /// Write to a local file, replacing it.
    pub fn write_to_path(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        self.write_to_path_with(path, &WriteOptions::default())
    }

    /// Write to a local file with explicit formatting options.
    pub fn write_to_path_with(&self, path: impl AsRef<Path>, options: &WriteOptions) -> Result<(), Error> {
        let path = path.as_ref();
        let location = path.display().to_string();
        let file = File::create(path).map_err(|e| Error::from_io(location.clone(), e))?;
        self.write_with(BufWriter::new(file), options)?;
        tracing::debug!(location = %location, "wrote XML document");
        Ok(())
    }

    /// Write to a path or `file:` URL. Remote destinations are not writable.
    pub fn write_to_url(&self, location: &str) -> Result<(), Error> {
        match Location::parse(location)? {
            Location::File(path) => self.write_to_path(path),
            Location::Remote(url) => Err(Error::UnsupportedScheme {
                scheme: url.scheme().to_string(),
                location: location.to_string(),
            }),
        }
    }
}

impl DataAdaptor for XmlDocument {
    fn name(&self) -> &str {
        self.document.name()
    }

    fn attribute_names(&self) -> Vec<&str> {
        self.root_element()
            .map(|root| root.attribute_names())
            .unwrap_or_default()
    }

    fn string_value(&self, attribute: &str) -> Option<&str> {
        self.root_element()?.string_value(attribute)
    }

    fn set_string(&mut self, attribute: &str, value: String) {
        match self.root_element_mut() {
            Some(root) => root.set_string(attribute, value),
            None => tracing::warn!(attribute, "document has no root element, attribute dropped"),
        }
    }

    fn child_adaptors(&self, label: Option<&str>) -> Vec<&dyn DataAdaptor> {
        self.document.child_adaptors(label)
    }

    fn create_child(&mut self, tag: &str) -> &mut dyn DataAdaptor {
        self.document = XmlNode::default();
        self.document.create_child(tag)
    }

    fn node_count(&self) -> usize {
        self.document.node_count()
    }
}
