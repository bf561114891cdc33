//! The factory: registry and constructor for entity and constraint types.
//!
//! A factory is explicitly constructed, never global. Its two registries map
//! entity type identifiers to their schemas and constraint type identifiers
//! to the single entity type they may be linked to. Registration is
//! first-write-wins: re-registering an identifier silently keeps the
//! original definition.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use tracing::debug;

use crate::constraint::Constraint;
use crate::entity::Entity;
use crate::error::{LinkError, ModelResult, RegistryError};
use crate::schema::EntitySchema;
use crate::value::Value;

/// A source of attribute values for seeding a freshly created entity.
///
/// Implemented for maps, pair lists, and [`Entity`] itself, so an entity can
/// be created as a validated copy of another object's attributes.
pub trait AttributeSource {
    /// The attribute name/value pairs to copy, in copy order.
    fn source_attributes(&self) -> Vec<(String, Value)>;
}

impl AttributeSource for BTreeMap<String, Value> {
    fn source_attributes(&self) -> Vec<(String, Value)> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl AttributeSource for HashMap<String, Value> {
    fn source_attributes(&self) -> Vec<(String, Value)> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl AttributeSource for Vec<(String, Value)> {
    fn source_attributes(&self) -> Vec<(String, Value)> {
        self.clone()
    }
}

impl AttributeSource for [(&str, Value)] {
    fn source_attributes(&self) -> Vec<(String, Value)> {
        self.iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }
}

impl AttributeSource for Entity {
    fn source_attributes(&self) -> Vec<(String, Value)> {
        self.attributes().into_iter().collect()
    }
}

/// Registry and constructor for entity and constraint types.
///
/// # Examples
///
/// ```
/// use weft::{EntitySchema, Factory, ValueKind};
///
/// let mut factory = Factory::new();
/// factory.register_entity(
///     "subject",
///     EntitySchema::new()
///         .attribute("name", ValueKind::String)
///         .attribute("units", ValueKind::Int),
/// );
/// factory.register_constraint("name is Algorithms", "subject").unwrap();
///
/// let subject = factory.create_entity("subject").unwrap();
/// let constraint = factory
///     .create_constraint(
///         "name is Algorithms",
///         |e| e.value("name").and_then(|v| v.as_string().map(str::to_owned))
///             == Some("Algorithms".to_string()),
///         |satisfied| println!("{satisfied}"),
///     )
///     .unwrap();
///
/// subject.set("name", "Algorithms").unwrap();
/// factory.link(&constraint, &subject).unwrap();
/// assert!(constraint.satisfied());
/// ```
#[derive(Debug, Default)]
pub struct Factory {
    entity_types: HashMap<String, Rc<EntitySchema>>,
    constraint_types: HashMap<String, String>,
}

impl Factory {
    /// Creates a factory with empty registries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entity type identifier with its schema.
    ///
    /// First registration wins: if `identifier` is already registered the
    /// call is a silent no-op and the existing schema is kept.
    pub fn register_entity(&mut self, identifier: impl Into<String>, schema: EntitySchema) {
        let identifier = identifier.into();
        match self.entity_types.entry(identifier) {
            Entry::Occupied(_) => {}
            Entry::Vacant(slot) => {
                debug!(entity_type = %slot.key(), "registered entity type");
                slot.insert(Rc::new(schema));
            }
        }
    }

    /// Registers a constraint type identifier together with the single
    /// entity type it may be linked to. Same first-registration-wins rule as
    /// [`register_entity`](Factory::register_entity).
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnregisteredEntityType`] if `entity_type` has not
    /// been registered yet.
    pub fn register_constraint(
        &mut self,
        identifier: impl Into<String>,
        entity_type: impl Into<String>,
    ) -> ModelResult<()> {
        let entity_type = entity_type.into();
        if !self.entity_types.contains_key(&entity_type) {
            return Err(RegistryError::UnregisteredEntityType {
                identifier: entity_type,
            }
            .into());
        }

        let identifier = identifier.into();
        match self.constraint_types.entry(identifier) {
            Entry::Occupied(_) => {}
            Entry::Vacant(slot) => {
                debug!(
                    constraint_type = %slot.key(),
                    entity_type = %entity_type,
                    "registered constraint type"
                );
                slot.insert(entity_type);
            }
        }
        Ok(())
    }

    /// Creates an entity of a registered type, with the registered schema,
    /// empty attributes, and no constraints.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnregisteredEntityType`] if `identifier` is unknown.
    pub fn create_entity(&self, identifier: &str) -> ModelResult<Entity> {
        let schema = self.entity_types.get(identifier).ok_or_else(|| {
            RegistryError::UnregisteredEntityType {
                identifier: identifier.to_string(),
            }
        })?;

        debug!(entity_type = identifier, "created entity");
        Ok(Entity::new(identifier, Rc::clone(schema)))
    }

    /// Creates an entity and seeds it with every attribute from `source`,
    /// re-validating each value against the schema on the way in.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnregisteredEntityType`] if `identifier` is unknown,
    /// or any error of [`Entity::set`] for a copied value.
    pub fn create_entity_from<S>(&self, identifier: &str, source: &S) -> ModelResult<Entity>
    where
        S: AttributeSource + ?Sized,
    {
        let entity = self.create_entity(identifier)?;
        for (key, value) in source.source_attributes() {
            entity.set(&key, value)?;
        }
        Ok(entity)
    }

    /// Creates an unlinked, unsatisfied constraint of a registered type.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnregisteredConstraintType`] if `identifier` is
    /// unknown.
    pub fn create_constraint<P, F>(
        &self,
        identifier: &str,
        predicate: P,
        on_change: F,
    ) -> ModelResult<Constraint>
    where
        P: Fn(&Entity) -> bool + 'static,
        F: FnMut(bool) + 'static,
    {
        if !self.constraint_types.contains_key(identifier) {
            return Err(RegistryError::UnregisteredConstraintType {
                identifier: identifier.to_string(),
            }
            .into());
        }

        debug!(constraint_type = identifier, "created constraint");
        Ok(Constraint::new(identifier, predicate, on_change))
    }

    /// Binds `constraint` to `entity` and evaluates it.
    ///
    /// On success the constraint is linked (first-write-wins), appended to
    /// the entity's constraint list (which immediately evaluates it), and
    /// then explicitly checked once more. A failed link performs no
    /// mutation on either object.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::UnregisteredConstraintType`] if the constraint's
    ///   identifier is not in this factory's registry
    /// - [`LinkError::IncompatibleLink`] if the registered companion entity
    ///   type differs from `entity`'s type identifier
    pub fn link(&self, constraint: &Constraint, entity: &Entity) -> ModelResult<()> {
        let required = self
            .constraint_types
            .get(constraint.type_name())
            .ok_or_else(|| RegistryError::UnregisteredConstraintType {
                identifier: constraint.type_name().to_string(),
            })?;

        if required != entity.type_name() {
            return Err(LinkError::IncompatibleLink {
                constraint_type: constraint.type_name().to_string(),
                required: required.clone(),
                actual: entity.type_name().to_string(),
            }
            .into());
        }

        constraint.link_to(entity);
        entity.add_constraint(constraint)?;
        constraint.check()?;

        debug!(
            constraint_type = %constraint.type_name(),
            entity_type = %entity.type_name(),
            entity_id = %entity.id(),
            "linked constraint to entity"
        );
        Ok(())
    }

    /// Returns true if `identifier` names a registered entity type.
    #[must_use]
    pub fn is_entity_registered(&self, identifier: &str) -> bool {
        self.entity_types.contains_key(identifier)
    }

    /// Returns true if `identifier` names a registered constraint type.
    #[must_use]
    pub fn is_constraint_registered(&self, identifier: &str) -> bool {
        self.constraint_types.contains_key(identifier)
    }

    /// Returns the registered schema for an entity type.
    #[must_use]
    pub fn entity_schema(&self, identifier: &str) -> Option<&EntitySchema> {
        self.entity_types.get(identifier).map(Rc::as_ref)
    }

    /// Returns the companion entity type a constraint type links to.
    #[must_use]
    pub fn constraint_target(&self, identifier: &str) -> Option<&str> {
        self.constraint_types.get(identifier).map(String::as_str)
    }

    /// Number of registered entity types.
    #[must_use]
    pub fn entity_type_count(&self) -> usize {
        self.entity_types.len()
    }

    /// Number of registered constraint types.
    #[must_use]
    pub fn constraint_type_count(&self) -> usize {
        self.constraint_types.len()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::value::ValueKind;

    fn subject_factory() -> Factory {
        let mut factory = Factory::new();
        factory.register_entity(
            "subject",
            EntitySchema::new()
                .attribute("name", ValueKind::String)
                .attribute("number", ValueKind::String)
                .attribute("units", ValueKind::Int),
        );
        factory
    }

    #[test]
    fn test_register_entity_first_write_wins() {
        let mut factory = subject_factory();
        assert_eq!(factory.entity_schema("subject").unwrap().len(), 3);

        // Re-registration keeps the original schema.
        factory.register_entity("subject", EntitySchema::new());
        assert_eq!(factory.entity_schema("subject").unwrap().len(), 3);
        assert_eq!(factory.entity_type_count(), 1);
    }

    #[test]
    fn test_register_constraint_requires_entity_type() {
        let mut factory = subject_factory();
        let err = factory
            .register_constraint("has name", "ghost")
            .unwrap_err();
        assert!(err.is_registry());
        assert!(format!("{err}").contains("ghost"));

        factory.register_constraint("has name", "subject").unwrap();
        assert_eq!(factory.constraint_target("has name"), Some("subject"));
    }

    #[test]
    fn test_register_constraint_first_write_wins() {
        let mut factory = subject_factory();
        factory.register_entity("person", EntitySchema::new());
        factory.register_constraint("c", "subject").unwrap();
        factory.register_constraint("c", "person").unwrap();
        assert_eq!(factory.constraint_target("c"), Some("subject"));
        assert_eq!(factory.constraint_type_count(), 1);
    }

    #[test]
    fn test_create_entity_unregistered() {
        let factory = subject_factory();
        let err = factory.create_entity("ghost").unwrap_err();
        assert!(err.is_registry());
    }

    #[test]
    fn test_create_entity_shares_schema() {
        let factory = subject_factory();
        let a = factory.create_entity("subject").unwrap();
        let b = factory.create_entity("subject").unwrap();
        assert_ne!(a, b);
        assert_eq!(a.schema(), b.schema());
        assert_eq!(a.attribute_count(), 0);
    }

    #[test]
    fn test_create_entity_from_map() {
        let factory = subject_factory();
        let source: BTreeMap<String, Value> = [
            ("name".to_string(), Value::String("Algorithms".into())),
            ("units".to_string(), Value::Int(12)),
        ]
        .into_iter()
        .collect();

        let entity = factory.create_entity_from("subject", &source).unwrap();
        assert_eq!(entity.get("name").unwrap(), Value::String("Algorithms".into()));
        assert_eq!(entity.get("units").unwrap(), Value::Int(12));
    }

    #[test]
    fn test_create_entity_from_entity() {
        let factory = subject_factory();
        let original = factory.create_entity("subject").unwrap();
        original.set("number", "6.006").unwrap();

        let copy = factory.create_entity_from("subject", &original).unwrap();
        assert_ne!(copy, original);
        assert_eq!(copy.get("number").unwrap(), Value::String("6.006".into()));
    }

    #[test]
    fn test_create_entity_from_revalidates() {
        let factory = subject_factory();
        let source = vec![("units".to_string(), Value::String("twelve".into()))];
        let err = factory.create_entity_from("subject", &source).unwrap_err();
        assert!(err.is_attribute());
    }

    #[test]
    fn test_create_constraint_unregistered() {
        let factory = subject_factory();
        let err = factory
            .create_constraint("ghost", |_| true, |_| {})
            .unwrap_err();
        assert!(err.is_registry());
    }

    #[test]
    fn test_link_flow_checks_once() {
        let mut factory = subject_factory();
        factory
            .register_constraint("name is Algorithms", "subject")
            .unwrap();

        let subject = factory.create_entity("subject").unwrap();
        subject.set("name", "Algorithms").unwrap();

        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&calls);
        let constraint = factory
            .create_constraint(
                "name is Algorithms",
                |e| {
                    e.value("name").as_ref().and_then(|v| v.as_string())
                        == Some("Algorithms")
                },
                move |satisfied| sink.borrow_mut().push(satisfied),
            )
            .unwrap();

        factory.link(&constraint, &subject).unwrap();

        // add_constraint checks once (fires), the explicit re-check is
        // silent: the state did not change again.
        assert!(constraint.satisfied());
        assert_eq!(*calls.borrow(), vec![true]);
        assert_eq!(subject.constraint_count(), 1);
        assert_eq!(constraint.linked_entity().unwrap(), subject);
    }

    #[test]
    fn test_link_incompatible_type() {
        let mut factory = subject_factory();
        factory.register_entity("person", EntitySchema::new());
        factory
            .register_constraint("name is Algorithms", "subject")
            .unwrap();

        let person = factory.create_entity("person").unwrap();
        let constraint = factory
            .create_constraint("name is Algorithms", |_| true, |_| {})
            .unwrap();

        let err = factory.link(&constraint, &person).unwrap_err();
        assert!(err.is_link());

        // A failed link leaves both objects untouched.
        assert!(!constraint.is_linked());
        assert!(!constraint.satisfied());
        assert_eq!(person.constraint_count(), 0);
    }

    #[test]
    fn test_link_foreign_constraint_is_unregistered() {
        let factory = subject_factory();
        let subject = factory.create_entity("subject").unwrap();

        let mut other = Factory::new();
        other.register_entity("subject", EntitySchema::new());
        other.register_constraint("foreign", "subject").unwrap();
        let constraint = other
            .create_constraint("foreign", |_| true, |_| {})
            .unwrap();

        let err = factory.link(&constraint, &subject).unwrap_err();
        assert!(err.is_registry());
    }

    #[test]
    fn test_link_already_linked_keeps_first_entity() {
        let mut factory = subject_factory();
        factory.register_constraint("c", "subject").unwrap();

        let first = factory.create_entity("subject").unwrap();
        let second = factory.create_entity("subject").unwrap();
        let constraint = factory.create_constraint("c", |_| true, |_| {}).unwrap();

        factory.link(&constraint, &first).unwrap();
        factory.link(&constraint, &second).unwrap();

        // First link wins; the second entity still records the constraint.
        assert_eq!(constraint.linked_entity().unwrap(), first);
        assert_eq!(first.constraint_count(), 1);
        assert_eq!(second.constraint_count(), 1);
    }
}
