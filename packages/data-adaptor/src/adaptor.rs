//! Core traits: DataAdaptor, DataListener, and typed attribute access.

use std::fmt::Display;

use crate::Error;

/// A node in a hierarchical attribute tree.
///
/// Every attribute is stored as a string. Typed reads and writes live in
/// [`DataAdaptorExt`], which is implemented for every adaptor (including
/// `dyn DataAdaptor`).
///
/// # Object Safety
///
/// This trait is object-safe: listeners receive `&mut dyn DataAdaptor`.
pub trait DataAdaptor {
    /// Tag name of this node.
    fn name(&self) -> &str;

    /// Names of all attributes on this node.
    fn attribute_names(&self) -> Vec<&str>;

    /// Raw string value of an attribute, or `None` if absent.
    fn string_value(&self, attribute: &str) -> Option<&str>;

    /// Store a raw string value, replacing any previous value.
    fn set_string(&mut self, attribute: &str, value: String);

    /// Child nodes in document order, optionally only those tagged `label`.
    fn child_adaptors(&self, label: Option<&str>) -> Vec<&dyn DataAdaptor>;

    /// Append a new empty child tagged `tag` and return it.
    fn create_child(&mut self, tag: &str) -> &mut dyn DataAdaptor;

    /// Check whether the attribute is present.
    fn has_attribute(&self, attribute: &str) -> bool {
        self.string_value(attribute).is_some()
    }

    /// First child tagged `label`, if any.
    fn child_adaptor(&self, label: &str) -> Option<&dyn DataAdaptor> {
        self.child_adaptors(Some(label)).into_iter().next()
    }

    /// Number of child nodes.
    fn node_count(&self) -> usize {
        self.child_adaptors(None).len()
    }

    /// Append a child tagged with the listener's label and let it populate it.
    fn write_node(&mut self, listener: &dyn DataListener) {
        let child = self.create_child(listener.data_label());
        listener.write(child);
    }
}

/// Something that can write itself into a data adaptor.
pub trait DataListener {
    /// Tag used for the node this listener writes.
    fn data_label(&self) -> &str;

    /// Populate `adaptor` (already tagged with [`data_label`](Self::data_label)).
    fn write(&self, adaptor: &mut dyn DataAdaptor);
}

/// Typed attribute access on top of the raw string store.
///
/// This trait is automatically implemented for all `DataAdaptor`s.
///
/// | Accessor | Empty string | Malformed |
/// |---|---|---|
/// | `double_value` | `NaN` | `Error::ValueParse` |
/// | `long_value` / `int_value` | `0` | `Error::ValueParse` |
/// | `boolean_value` | `false` | `false` |
pub trait DataAdaptorExt: DataAdaptor {
    /// Read an attribute as `f64`.
    fn double_value(&self, attribute: &str) -> Result<f64, Error> {
        let text = required(self, attribute)?.trim();
        if text.is_empty() {
            return Ok(f64::NAN);
        }
        text.parse()
            .map_err(|_| value_parse_error(self, attribute, "double", text))
    }

    /// Read an attribute as `i64`.
    fn long_value(&self, attribute: &str) -> Result<i64, Error> {
        let text = required(self, attribute)?.trim();
        if text.is_empty() {
            return Ok(0);
        }
        text.parse()
            .map_err(|_| value_parse_error(self, attribute, "long", text))
    }

    /// Read an attribute as `i32`.
    fn int_value(&self, attribute: &str) -> Result<i32, Error> {
        let text = required(self, attribute)?.trim();
        if text.is_empty() {
            return Ok(0);
        }
        text.parse()
            .map_err(|_| value_parse_error(self, attribute, "int", text))
    }

    /// Read an attribute as `bool`: true only for a case-insensitive "true".
    fn boolean_value(&self, attribute: &str) -> bool {
        self.string_value(attribute)
            .map(|text| text.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Store any displayable value in its display form.
    fn set_value<V: Display + ?Sized>(&mut self, attribute: &str, value: &V) {
        self.set_string(attribute, value.to_string());
    }

    /// Write one child node per listener, in order.
    fn write_nodes<'a, I>(&mut self, listeners: I)
    where
        I: IntoIterator<Item = &'a dyn DataListener>,
    {
        for listener in listeners {
            self.write_node(listener);
        }
    }
}

impl<A: DataAdaptor + ?Sized> DataAdaptorExt for A {}

fn required<'a, A: DataAdaptor + ?Sized>(adaptor: &'a A, attribute: &str) -> Result<&'a str, Error> {
    adaptor
        .string_value(attribute)
        .ok_or_else(|| Error::MissingAttribute {
            node: adaptor.name().to_string(),
            attribute: attribute.to_string(),
        })
}

fn value_parse_error<A: DataAdaptor + ?Sized>(
    adaptor: &A,
    attribute: &str,
    target: &'static str,
    text: &str,
) -> Error {
    Error::ValueParse {
        node: adaptor.name().to_string(),
        attribute: attribute.to_string(),
        target,
        text: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::XmlNode;

    fn node_with(attribute: &str, value: &str) -> XmlNode {
        let mut node = XmlNode::new("magnet");
        node.set_string(attribute, value.to_string());
        node
    }

    #[test]
    fn empty_double_is_nan() {
        let node = node_with("length", "");
        assert!(node.double_value("length").unwrap().is_nan());
    }

    #[test]
    fn empty_integers_are_zero() {
        let node = node_with("count", "");
        assert_eq!(node.long_value("count").unwrap(), 0);
        assert_eq!(node.int_value("count").unwrap(), 0);
    }

    #[test]
    fn non_numeric_text_is_a_parse_error() {
        let node = node_with("length", "long");
        for result in [
            node.double_value("length").map(|_| ()),
            node.long_value("length").map(|_| ()),
            node.int_value("length").map(|_| ()),
        ] {
            match result {
                Err(Error::ValueParse {
                    attribute, text, ..
                }) => {
                    assert_eq!(attribute, "length");
                    assert_eq!(text, "long");
                }
                other => panic!("expected ValueParse, got {:?}", other),
            }
        }
    }

    #[test]
    fn int_overflow_is_a_parse_error() {
        let node = node_with("count", "4294967296");
        assert!(node.int_value("count").is_err());
        assert_eq!(node.long_value("count").unwrap(), 4_294_967_296);
    }

    #[test]
    fn missing_attribute_is_reported() {
        let node = XmlNode::new("magnet");
        assert!(matches!(
            node.double_value("length"),
            Err(Error::MissingAttribute { .. })
        ));
    }

    #[test]
    fn boolean_is_best_effort() {
        assert!(node_with("on", "TRUE").boolean_value("on"));
        assert!(node_with("on", "true").boolean_value("on"));
        assert!(!node_with("on", "yes").boolean_value("on"));
        assert!(!node_with("on", "").boolean_value("on"));
        assert!(!XmlNode::new("x").boolean_value("on"));
    }

    #[test]
    fn set_value_uses_display_form() {
        let mut node = XmlNode::new("magnet");
        node.set_value("length", &2.5);
        node.set_value("count", &7i64);
        node.set_value("on", &true);
        node.set_value("label", "QH01");

        assert_eq!(node.string_value("length"), Some("2.5"));
        assert_eq!(node.string_value("count"), Some("7"));
        assert_eq!(node.string_value("on"), Some("true"));
        assert_eq!(node.string_value("label"), Some("QH01"));
        assert_eq!(node.double_value("length").unwrap(), 2.5);
    }

    struct Magnet {
        id: &'static str,
    }

    impl DataListener for Magnet {
        fn data_label(&self) -> &str {
            "magnet"
        }

        fn write(&self, adaptor: &mut dyn DataAdaptor) {
            adaptor.set_value("id", self.id);
        }
    }

    #[test]
    fn write_nodes_appends_in_order() {
        let magnets = [Magnet { id: "a" }, Magnet { id: "b" }];
        let mut node = XmlNode::new("lattice");
        node.write_nodes(magnets.iter().map(|m| m as &dyn DataListener));

        let ids: Vec<_> = node
            .child_adaptors(Some("magnet"))
            .into_iter()
            .map(|child| child.string_value("id").unwrap_or_default().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn typed_access_works_through_trait_objects() {
        let mut node = XmlNode::new("root");
        let adaptor: &mut dyn DataAdaptor = &mut node;
        adaptor.set_value("x", &3);
        assert_eq!(adaptor.int_value("x").unwrap(), 3);
    }
}
