//! Entity schemas: the declared attribute shape of an entity type.
//!
//! A schema maps attribute names to the [`ValueKind`] they must hold. Once a
//! schema is registered with a [`Factory`](crate::Factory) it is shared by
//! every entity of that type and never changes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::AttributeError;
use crate::value::{Value, ValueKind};

/// Mapping from attribute name to expected value kind.
///
/// # Examples
///
/// ```
/// use weft::{EntitySchema, ValueKind};
///
/// let schema = EntitySchema::new()
///     .attribute("name", ValueKind::String)
///     .attribute("units", ValueKind::Int);
///
/// assert_eq!(schema.kind_of("units"), Some(ValueKind::Int));
/// assert!(schema.contains("name"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntitySchema {
    attributes: BTreeMap<String, ValueKind>,
}

impl EntitySchema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an attribute, consuming and returning the schema for
    /// chaining. Redeclaring a name overwrites the previous kind.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.attributes.insert(name.into(), kind);
        self
    }

    /// Returns the declared kind for `name`, if declared.
    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<ValueKind> {
        self.attributes.get(name).copied()
    }

    /// Returns true if `name` is a declared attribute.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Number of declared attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns true if no attributes are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Iterates declared attributes in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ValueKind)> {
        self.attributes.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    /// Validates that `value` may be stored under `name` for an entity of
    /// type `entity_type`.
    ///
    /// This is the exact-type rule: the value's kind must equal the declared
    /// kind, with no coercion between kinds.
    ///
    /// # Errors
    ///
    /// - [`AttributeError::UnknownAttribute`] if `name` is not declared
    /// - [`AttributeError::TypeMismatch`] if the kinds differ
    pub fn expect(
        &self,
        entity_type: &str,
        name: &str,
        value: &Value,
    ) -> Result<(), AttributeError> {
        let Some(expected) = self.kind_of(name) else {
            return Err(AttributeError::UnknownAttribute {
                entity_type: entity_type.to_string(),
                attribute: name.to_string(),
            });
        };

        let actual = value.kind();
        if actual != expected {
            return Err(AttributeError::TypeMismatch {
                attribute: name.to_string(),
                expected,
                actual,
            });
        }

        Ok(())
    }
}

impl<N: Into<String>> FromIterator<(N, ValueKind)> for EntitySchema {
    fn from_iter<I: IntoIterator<Item = (N, ValueKind)>>(iter: I) -> Self {
        Self {
            attributes: iter
                .into_iter()
                .map(|(name, kind)| (name.into(), kind))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject_schema() -> EntitySchema {
        EntitySchema::new()
            .attribute("name", ValueKind::String)
            .attribute("number", ValueKind::String)
            .attribute("units", ValueKind::Int)
    }

    #[test]
    fn test_schema_declares_attributes() {
        let schema = subject_schema();
        assert_eq!(schema.len(), 3);
        assert!(!schema.is_empty());
        assert!(schema.contains("name"));
        assert!(!schema.contains("teacher"));
        assert_eq!(schema.kind_of("units"), Some(ValueKind::Int));
        assert_eq!(schema.kind_of("teacher"), None);
    }

    #[test]
    fn test_schema_redeclare_overwrites() {
        let schema = EntitySchema::new()
            .attribute("x", ValueKind::Int)
            .attribute("x", ValueKind::Float);
        assert_eq!(schema.len(), 1);
        assert_eq!(schema.kind_of("x"), Some(ValueKind::Float));
    }

    #[test]
    fn test_schema_iter_is_name_ordered() {
        let schema = subject_schema();
        let names: Vec<&str> = schema.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["name", "number", "units"]);
    }

    #[test]
    fn test_expect_accepts_exact_kind() {
        let schema = subject_schema();
        assert!(schema
            .expect("subject", "units", &Value::Int(12))
            .is_ok());
    }

    #[test]
    fn test_expect_rejects_undeclared() {
        let schema = subject_schema();
        let err = schema
            .expect("subject", "teacher", &Value::Int(1))
            .unwrap_err();
        assert_eq!(
            err,
            AttributeError::UnknownAttribute {
                entity_type: "subject".to_string(),
                attribute: "teacher".to_string(),
            }
        );
    }

    #[test]
    fn test_expect_rejects_kind_mismatch() {
        let schema = subject_schema();
        let err = schema
            .expect("subject", "units", &Value::Float(12.0))
            .unwrap_err();
        assert_eq!(
            err,
            AttributeError::TypeMismatch {
                attribute: "units".to_string(),
                expected: ValueKind::Int,
                actual: ValueKind::Float,
            }
        );
    }

    #[test]
    fn test_schema_from_iterator() {
        let schema: EntitySchema =
            [("name", ValueKind::String), ("units", ValueKind::Int)]
                .into_iter()
                .collect();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.kind_of("name"), Some(ValueKind::String));
    }

    #[test]
    fn test_schema_serialization() {
        let schema = subject_schema();
        let json = serde_json::to_string(&schema).unwrap();
        let deserialized: EntitySchema = serde_json::from_str(&json).unwrap();
        assert_eq!(schema, deserialized);
    }
}
