//! Attribute types: a tag bound to a parse/format pair.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::{Value, ValueKind};

type ParseFn = dyn Fn(&str) -> Result<Value, String> + Send + Sync;
type FormatFn = dyn Fn(&Value) -> String + Send + Sync;

/// How an attribute's text is turned into a [`Value`] and back.
#[derive(Clone)]
pub struct AttributeType {
    tag: String,
    kind: ValueKind,
    parse: Arc<ParseFn>,
    format: Arc<FormatFn>,
}

impl AttributeType {
    /// A custom type. `parse` must yield values of `kind`.
    pub fn new<P, F>(tag: impl Into<String>, kind: ValueKind, parse: P, format: F) -> Self
    where
        P: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        Self {
            tag: tag.into(),
            kind,
            parse: Arc::new(parse),
            format: Arc::new(format),
        }
    }

    /// A type whose text form is the value's `Display` output.
    pub fn displayed<P>(tag: impl Into<String>, kind: ValueKind, parse: P) -> Self
    where
        P: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self::new(tag, kind, parse, |value: &Value| value.to_string())
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn parse(&self, text: &str) -> Result<Value, String> {
        let value = (self.parse)(text)?;
        if value.kind() != self.kind {
            return Err(format!(
                "type '{}' produced a {} value, expected {}",
                self.tag,
                value.kind(),
                self.kind
            ));
        }
        Ok(value)
    }

    pub fn format(&self, value: &Value) -> String {
        (self.format)(value)
    }

    pub fn accepts(&self, value: &Value) -> bool {
        value.kind() == self.kind
    }
}

impl fmt::Debug for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeType")
            .field("tag", &self.tag)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Type tags available to schemas.
///
/// Tags are resolved once, when a schema is built.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<String, AttributeType>,
}

impl TypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in types: `string`, `int`/`integer`, `long`, `double`, `boolean`/`bool`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(AttributeType::displayed("string", ValueKind::String, |text| {
            Ok(Value::String(text.to_string()))
        }));
        for tag in ["int", "integer"] {
            registry.register(AttributeType::displayed(tag, ValueKind::Int, |text| {
                text.trim().parse().map(Value::Int).map_err(|e| format!("{}", e))
            }));
        }
        registry.register(AttributeType::displayed("long", ValueKind::Long, |text| {
            text.trim().parse().map(Value::Long).map_err(|e| format!("{}", e))
        }));
        registry.register(AttributeType::displayed("double", ValueKind::Double, |text| {
            text.trim().parse().map(Value::Double).map_err(|e| format!("{}", e))
        }));
        for tag in ["boolean", "bool"] {
            registry.register(AttributeType::displayed(tag, ValueKind::Boolean, |text| {
                Ok(Value::Boolean(text.trim().eq_ignore_ascii_case("true")))
            }));
        }
        registry
    }

    /// Add or replace a type under its tag.
    pub fn register(&mut self, attribute_type: AttributeType) -> &mut Self {
        self.types.insert(attribute_type.tag.clone(), attribute_type);
        self
    }

    pub fn get(&self, tag: &str) -> Option<&AttributeType> {
        self.types.get(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_parse_their_kinds() {
        let registry = TypeRegistry::with_builtins();
        let parse = |tag: &str, text: &str| registry.get(tag).unwrap().parse(text);

        assert_eq!(parse("int", " 42 ").unwrap(), Value::Int(42));
        assert_eq!(parse("integer", "-1").unwrap(), Value::Int(-1));
        assert_eq!(parse("long", "9000000000").unwrap(), Value::Long(9_000_000_000));
        assert_eq!(parse("double", "1e-3").unwrap(), Value::Double(0.001));
        assert_eq!(parse("string", " x ").unwrap(), Value::from(" x "));
        assert_eq!(parse("bool", "TRUE").unwrap(), Value::Boolean(true));
        assert_eq!(parse("boolean", "nope").unwrap(), Value::Boolean(false));
    }

    #[test]
    fn numeric_builtins_reject_bad_text() {
        let registry = TypeRegistry::with_builtins();
        assert!(registry.get("int").unwrap().parse("").is_err());
        assert!(registry.get("int").unwrap().parse("3000000000").is_err());
        assert!(registry.get("double").unwrap().parse("abc").is_err());
    }

    #[test]
    fn custom_enumeration_type() {
        let mut registry = TypeRegistry::with_builtins();
        registry.register(AttributeType::displayed("plane", ValueKind::String, |text| {
            match text {
                "horizontal" | "vertical" => Ok(Value::from(text)),
                other => Err(format!("unknown plane {:?}", other)),
            }
        }));

        let plane = registry.get("plane").unwrap();
        assert_eq!(plane.parse("vertical").unwrap(), Value::from("vertical"));
        assert!(plane.parse("diagonal").is_err());
    }

    #[test]
    fn parse_output_must_match_declared_kind() {
        let liar = AttributeType::displayed("liar", ValueKind::Int, |_| Ok(Value::from("x")));
        assert!(liar.parse("1").is_err());
    }

    #[test]
    fn custom_format() {
        let hex = AttributeType::new(
            "hex",
            ValueKind::Long,
            |text| i64::from_str_radix(text.trim_start_matches("0x"), 16).map(Value::Long).map_err(|e| e.to_string()),
            |value| match value {
                Value::Long(n) => format!("0x{:x}", n),
                other => other.to_string(),
            },
        );
        assert_eq!(hex.parse("0xff").unwrap(), Value::Long(255));
        assert_eq!(hex.format(&Value::Long(255)), "0xff");
    }
}
