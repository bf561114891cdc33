//! Error types for weft.
//!
//! All errors are strongly typed using thiserror and reported synchronously
//! at the call that violates a contract. Nothing is retried or recovered
//! internally — recovery is left to the caller.

use thiserror::Error;

use crate::value::ValueKind;

/// Errors raised by keyed attribute access on an entity.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttributeError {
    /// The attribute is not declared in the entity's schema.
    #[error("Entity type \"{entity_type}\" has no attribute \"{attribute}\"")]
    UnknownAttribute {
        /// Type identifier of the entity.
        entity_type: String,
        /// The undeclared attribute name.
        attribute: String,
    },

    /// The value's runtime kind differs from the declared kind.
    #[error("Attribute \"{attribute}\" expects {expected}, received {actual}")]
    TypeMismatch {
        /// The attribute name.
        attribute: String,
        /// Kind declared in the schema.
        expected: ValueKind,
        /// Kind of the rejected value.
        actual: ValueKind,
    },

    /// The attribute has never been set (or is not declared at all).
    #[error("Attribute \"{attribute}\" has not been set")]
    KeyNotFound {
        /// The attribute name.
        attribute: String,
    },
}

/// Errors raised by constraint linkage and evaluation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// `check()` was called before the constraint was linked.
    #[error("Constraint \"{constraint_type}\" is not linked to an entity")]
    NotLinked {
        /// Type identifier of the constraint.
        constraint_type: String,
    },

    /// The linked entity has been dropped and the back-reference cannot be
    /// upgraded.
    #[error("Constraint \"{constraint_type}\" is linked to an entity that no longer exists")]
    EntityReleased {
        /// Type identifier of the constraint.
        constraint_type: String,
    },

    /// The constraint's registered companion entity type does not match.
    #[error(
        "Constraint type \"{constraint_type}\" can only be linked to entity type \
         \"{required}\", tried entity type \"{actual}\""
    )]
    IncompatibleLink {
        /// Type identifier of the constraint.
        constraint_type: String,
        /// Companion entity type from the registry.
        required: String,
        /// Type identifier of the rejected entity.
        actual: String,
    },

    /// An unlinked constraint cannot join a graph.
    #[error("Constraint \"{constraint_type}\" must be linked before it can join a graph")]
    UnlinkedConstraint {
        /// Type identifier of the constraint.
        constraint_type: String,
    },
}

/// Errors raised by the factory registries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The entity type identifier was never registered.
    #[error("Entity type \"{identifier}\" is not registered")]
    UnregisteredEntityType {
        /// The unknown identifier.
        identifier: String,
    },

    /// The constraint type identifier was never registered.
    #[error("Constraint type \"{identifier}\" is not registered")]
    UnregisteredConstraintType {
        /// The unknown identifier.
        identifier: String,
    },
}

/// Top-level error type for weft.
///
/// This enum encompasses all possible errors that can occur when using the
/// modeling layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ModelError {
    #[error("Attribute error: {0}")]
    Attribute(#[from] AttributeError),

    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl ModelError {
    /// Returns true if this is an attribute error.
    #[must_use]
    pub const fn is_attribute(&self) -> bool {
        matches!(self, Self::Attribute(_))
    }

    /// Returns true if this is a link error.
    #[must_use]
    pub const fn is_link(&self) -> bool {
        matches!(self, Self::Link(_))
    }

    /// Returns true if this is a registry error.
    #[must_use]
    pub const fn is_registry(&self) -> bool {
        matches!(self, Self::Registry(_))
    }
}

/// Result type alias for weft operations.
pub type ModelResult<T> = Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_attribute_message() {
        let err = AttributeError::UnknownAttribute {
            entity_type: "subject".to_string(),
            attribute: "teacher".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("subject"));
        assert!(msg.contains("teacher"));
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = AttributeError::TypeMismatch {
            attribute: "units".to_string(),
            expected: ValueKind::Int,
            actual: ValueKind::String,
        };
        let msg = format!("{err}");
        assert!(msg.contains("units"));
        assert!(msg.contains("expects int"));
        assert!(msg.contains("received string"));
    }

    #[test]
    fn test_incompatible_link_message() {
        let err = LinkError::IncompatibleLink {
            constraint_type: "name is Algorithms".to_string(),
            required: "subject".to_string(),
            actual: "person".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("name is Algorithms"));
        assert!(msg.contains("\"subject\""));
        assert!(msg.contains("\"person\""));
    }

    #[test]
    fn test_model_error_from_attribute() {
        let err: ModelError = AttributeError::KeyNotFound {
            attribute: "name".to_string(),
        }
        .into();
        assert!(err.is_attribute());
        assert!(!err.is_link());
        assert!(!err.is_registry());
    }

    #[test]
    fn test_model_error_from_link() {
        let err: ModelError = LinkError::NotLinked {
            constraint_type: "c".to_string(),
        }
        .into();
        assert!(err.is_link());
        let msg = format!("{err}");
        assert!(msg.contains("not linked"));
    }

    #[test]
    fn test_model_error_from_registry() {
        let err: ModelError = RegistryError::UnregisteredEntityType {
            identifier: "ghost".to_string(),
        }
        .into();
        assert!(err.is_registry());
        assert!(format!("{err}").contains("ghost"));
    }
}
