//! Record schemas: typed attributes, key and secondary indexes.

use std::collections::BTreeMap;
use std::fmt;

use xal_data_adaptor::DataAdaptor;

use crate::{AttributeType, Error, SchemaError, TypeRegistry, Value};

/// Attribute values of one record, by attribute name.
pub type Attributes = BTreeMap<String, Value>;

/// The primary key of a record: the key attribute values in declared order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Key(pub Vec<Value>);

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [single] => write!(f, "{}", single),
            parts => {
                f.write_str("(")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", part)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl From<Value> for Key {
    fn from(value: Value) -> Self {
        Key(vec![value])
    }
}

macro_rules! single_key_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Key {
                fn from(value: $t) -> Self {
                    Key(vec![Value::from(value)])
                }
            }
        )*
    };
}

single_key_from!(&str, String, i32, i64, f64, bool);

impl From<Vec<Value>> for Key {
    fn from(values: Vec<Value>) -> Self {
        Key(values)
    }
}

/// A declared attribute.
#[derive(Clone, Debug)]
pub struct AttributeSpec {
    pub name: String,
    pub attribute_type: AttributeType,
    /// Used when reading a node that lacks the attribute.
    pub default: Option<Value>,
}

/// Describes the records of one table.
#[derive(Clone, Debug)]
pub struct RecordSchema {
    name: String,
    attributes: Vec<AttributeSpec>,
    key: Vec<String>,
    indexes: Vec<String>,
}

impl RecordSchema {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            registry: TypeRegistry::with_builtins(),
            attributes: Vec::new(),
            key: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Table name; also the tag a store writes itself under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[AttributeSpec] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|spec| spec.name == name)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|spec| spec.name.as_str())
    }

    /// Key attribute names in key order.
    pub fn key_attributes(&self) -> &[String] {
        &self.key
    }

    pub fn is_key(&self, attribute: &str) -> bool {
        self.key.iter().any(|key| key == attribute)
    }

    /// Attributes with a secondary (non-unique) index.
    pub fn indexed_attributes(&self) -> &[String] {
        &self.indexes
    }

    pub fn is_indexed(&self, attribute: &str) -> bool {
        self.indexes.iter().any(|index| index == attribute)
    }

    /// The key of `attributes`, or `MissingKey` if any key attribute is unset.
    pub fn key_of(&self, attributes: &Attributes) -> Result<Key, Error> {
        self.key
            .iter()
            .map(|name| {
                attributes.get(name).cloned().ok_or_else(|| Error::MissingKey {
                    table: self.name.clone(),
                    attribute: name.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Key)
    }

    /// Check that `value` fits the declared type of `attribute`.
    pub fn check(&self, attribute: &str, value: &Value) -> Result<(), Error> {
        let spec = self.attribute(attribute).ok_or_else(|| Error::UnknownAttribute {
            table: self.name.clone(),
            attribute: attribute.to_string(),
        })?;
        if spec.attribute_type.accepts(value) {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                attribute: attribute.to_string(),
                expected: spec.attribute_type.kind(),
                actual: value.kind(),
            })
        }
    }

    /// Read typed values from a node.
    ///
    /// Each declared attribute is parsed with its type; absent attributes
    /// take their default, or are left unset when there is none. Attributes
    /// the schema does not declare are ignored.
    pub fn parse_record(&self, adaptor: &dyn DataAdaptor) -> Result<Attributes, Error> {
        let mut values = Attributes::new();
        for spec in &self.attributes {
            let value = match adaptor.string_value(&spec.name) {
                Some(text) => spec.attribute_type.parse(text).map_err(|message| Error::Parse {
                    attribute: spec.name.clone(),
                    type_tag: spec.attribute_type.tag().to_string(),
                    text: text.to_string(),
                    message,
                })?,
                None => match &spec.default {
                    Some(default) => default.clone(),
                    None => continue,
                },
            };
            values.insert(spec.name.clone(), value);
        }
        Ok(values)
    }

    /// Write `values` onto a node in declaration order, formatted by type.
    pub fn write_record(&self, values: &Attributes, adaptor: &mut dyn DataAdaptor) {
        for spec in &self.attributes {
            if let Some(value) = values.get(&spec.name) {
                adaptor.set_string(&spec.name, spec.attribute_type.format(value));
            }
        }
    }
}

/// Builds a [`RecordSchema`], resolving type tags against a registry.
pub struct SchemaBuilder {
    name: String,
    registry: TypeRegistry,
    attributes: Vec<(String, String, Option<String>)>,
    key: Vec<String>,
    indexes: Vec<String>,
}

impl SchemaBuilder {
    /// Resolve type tags against `registry` instead of the built-ins.
    pub fn with_registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, type_tag: impl Into<String>) -> Self {
        self.attributes.push((name.into(), type_tag.into(), None));
        self
    }

    /// Declare an attribute with a default, given in its text form.
    pub fn attribute_with_default(
        mut self,
        name: impl Into<String>,
        type_tag: impl Into<String>,
        default: impl Into<String>,
    ) -> Self {
        self.attributes
            .push((name.into(), type_tag.into(), Some(default.into())));
        self
    }

    /// Add an attribute to the primary key. Call repeatedly for a composite key.
    pub fn key(mut self, name: impl Into<String>) -> Self {
        self.key.push(name.into());
        self
    }

    /// Maintain a secondary index on an attribute.
    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.indexes.push(name.into());
        self
    }

    pub fn build(self) -> Result<RecordSchema, SchemaError> {
        let mut attributes: Vec<AttributeSpec> = Vec::with_capacity(self.attributes.len());
        for (name, tag, default_text) in self.attributes {
            if attributes.iter().any(|spec| spec.name == name) {
                return Err(SchemaError::DuplicateAttribute { attribute: name });
            }
            let attribute_type = self
                .registry
                .get(&tag)
                .cloned()
                .ok_or_else(|| SchemaError::UnknownType {
                    attribute: name.clone(),
                    type_tag: tag.clone(),
                })?;
            let default = default_text
                .map(|text| {
                    attribute_type
                        .parse(&text)
                        .map_err(|message| SchemaError::InvalidDefault {
                            attribute: name.clone(),
                            text: text.clone(),
                            message,
                        })
                })
                .transpose()?;
            attributes.push(AttributeSpec {
                name,
                attribute_type,
                default,
            });
        }

        if self.key.is_empty() {
            return Err(SchemaError::NoKey { table: self.name });
        }
        let declared = |name: &String| attributes.iter().any(|spec| &spec.name == name);
        if let Some(missing) = self.key.iter().find(|name| !declared(name)) {
            return Err(SchemaError::UnknownKey {
                attribute: missing.clone(),
            });
        }
        if let Some(missing) = self.indexes.iter().find(|name| !declared(name)) {
            return Err(SchemaError::UnknownIndex {
                attribute: missing.clone(),
            });
        }

        Ok(RecordSchema {
            name: self.name,
            attributes,
            key: self.key,
            indexes: self.indexes,
        })
    }
}
