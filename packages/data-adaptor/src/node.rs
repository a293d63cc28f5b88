//! The in-memory node tree behind XML documents.

use crate::{DataAdaptor, Error};

/// An element: tag name, string attributes, and ordered children.
///
/// Attributes keep their insertion order so written documents are stable,
/// but lookups are by name only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XmlNode {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl XmlNode {
    /// Create an empty node with the given tag.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Attributes as `(name, value)` pairs in insertion order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Direct children in document order.
    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    /// Direct children tagged `label`, in document order.
    pub fn children_named<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |child| child.name == label)
    }

    /// Mutable access to the first child tagged `label`.
    pub fn child_mut(&mut self, label: &str) -> Option<&mut XmlNode> {
        self.children.iter_mut().find(|child| child.name == label)
    }

    /// Append an already-built node.
    pub fn push_child(&mut self, child: XmlNode) -> &mut XmlNode {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Check this node and its subtree for names that cannot be written as XML.
    pub(crate) fn validate_names(&self) -> Result<(), Error> {
        check_name(&self.name)?;
        for (attribute, _) in &self.attributes {
            check_name(attribute)?;
        }
        self.children.iter().try_for_each(XmlNode::validate_names)
    }
}

impl DataAdaptor for XmlNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn attribute_names(&self) -> Vec<&str> {
        self.attributes.iter().map(|(name, _)| name.as_str()).collect()
    }

    fn string_value(&self, attribute: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == attribute)
            .map(|(_, value)| value.as_str())
    }

    fn set_string(&mut self, attribute: &str, value: String) {
        match self.attributes.iter_mut().find(|(name, _)| name == attribute) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((attribute.to_string(), value)),
        }
    }

    fn child_adaptors(&self, label: Option<&str>) -> Vec<&dyn DataAdaptor> {
        self.children
            .iter()
            .filter(|child| label.map_or(true, |label| child.name == label))
            .map(|child| child as &dyn DataAdaptor)
            .collect()
    }

    fn create_child(&mut self, tag: &str) -> &mut dyn DataAdaptor {
        self.push_child(XmlNode::new(tag))
    }

    fn node_count(&self) -> usize {
        self.children.len()
    }
}

/// Check that `name` is usable as an element or attribute name.
pub fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' || first == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'))
}

pub(crate) fn check_name(name: &str) -> Result<(), Error> {
    if is_xml_name(name) {
        Ok(())
    } else {
        Err(Error::InvalidName {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DataAdaptorExt;

    #[test]
    fn set_string_replaces_existing_value() {
        let mut node = XmlNode::new("beam");
        node.set_string("energy", "1.0".to_string());
        node.set_string("energy", "2.0".to_string());

        assert_eq!(node.attribute_names(), vec!["energy"]);
        assert_eq!(node.string_value("energy"), Some("2.0"));
    }

    #[test]
    fn children_keep_insertion_order_and_filter_by_tag() {
        let mut root = XmlNode::new("lattice");
        root.create_child("magnet").set_value("id", "m1");
        root.create_child("bpm").set_value("id", "b1");
        root.create_child("magnet").set_value("id", "m2");

        let all: Vec<_> = root.child_adaptors(None).iter().map(|c| c.name()).collect();
        assert_eq!(all, vec!["magnet", "bpm", "magnet"]);

        let magnets: Vec<_> = root
            .child_adaptors(Some("magnet"))
            .iter()
            .filter_map(|c| c.string_value("id"))
            .collect();
        assert_eq!(magnets, vec!["m1", "m2"]);
        assert_eq!(root.node_count(), 3);
    }

    #[test]
    fn child_adaptor_returns_first_match_or_none() {
        let mut root = XmlNode::new("lattice");
        root.create_child("magnet").set_value("id", "first");
        root.create_child("magnet").set_value("id", "second");

        let first = root.child_adaptor("magnet").unwrap();
        assert_eq!(first.string_value("id"), Some("first"));
        assert!(root.child_adaptor("cavity").is_none());
    }

    #[test]
    fn xml_names() {
        assert!(is_xml_name("record"));
        assert!(is_xml_name("_x.y-z"));
        assert!(is_xml_name("ns:tag"));
        assert!(!is_xml_name(""));
        assert!(!is_xml_name("1abc"));
        assert!(!is_xml_name("has space"));
    }

    #[test]
    fn validate_names_reaches_nested_attributes() {
        let mut root = XmlNode::new("root");
        root.create_child("child").set_value("bad name", "x");
        assert!(matches!(
            root.validate_names(),
            Err(Error::InvalidName { .. })
        ));
    }
}
