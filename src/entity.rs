//! Entities and identity management.
//!
//! An entity is a typed, schema-constrained attribute holder. Entities are
//! cheap-to-clone shared handles: clones refer to the same underlying state,
//! and equality and hashing are by [`EntityId`], the stable identity that
//! graph membership is keyed on.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constraint::Constraint;
use crate::error::{AttributeError, ModelResult};
use crate::schema::EntitySchema;
use crate::value::Value;

/// Globally unique, stable entity identifier.
///
/// Once created, an `EntityId` never changes. Membership sets and equality
/// checks key on it rather than on object identity.
///
/// # Examples
///
/// ```
/// use weft::EntityId;
///
/// let id = EntityId::new();
/// assert!(!id.is_nil());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Creates a new random entity ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an entity ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns true if this is a nil (all zeros) UUID.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Creates a nil entity ID (for testing or sentinel values).
    #[must_use]
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
struct EntityInner {
    id: EntityId,
    type_name: String,
    schema: Rc<EntitySchema>,
    attributes: RefCell<BTreeMap<String, Value>>,
    constraints: RefCell<Vec<Constraint>>,
    created_at: DateTime<Utc>,
    updated_at: Cell<DateTime<Utc>>,
    version: Cell<u64>,
}

/// A typed, schema-constrained attribute holder.
///
/// Created through a [`Factory`](crate::Factory) with empty attributes and
/// no constraints. Attribute writes are validated against the schema with
/// the exact-type rule; constraints are appended through
/// [`add_constraint`](Entity::add_constraint) and evaluated on the spot.
///
/// `Entity` is a shared handle — cloning it does not copy the state.
///
/// # Examples
///
/// ```
/// use weft::{EntitySchema, Factory, Value, ValueKind};
///
/// let mut factory = Factory::new();
/// factory.register_entity(
///     "subject",
///     EntitySchema::new().attribute("name", ValueKind::String),
/// );
///
/// let subject = factory.create_entity("subject").unwrap();
/// subject.set("name", "Algorithms").unwrap();
/// assert_eq!(subject.get("name").unwrap(), Value::String("Algorithms".into()));
/// ```
#[derive(Debug, Clone)]
pub struct Entity {
    inner: Rc<EntityInner>,
}

impl Entity {
    pub(crate) fn new(type_name: impl Into<String>, schema: Rc<EntitySchema>) -> Self {
        let now = Utc::now();
        Self {
            inner: Rc::new(EntityInner {
                id: EntityId::new(),
                type_name: type_name.into(),
                schema,
                attributes: RefCell::new(BTreeMap::new()),
                constraints: RefCell::new(Vec::new()),
                created_at: now,
                updated_at: Cell::new(now),
                version: Cell::new(1),
            }),
        }
    }

    /// Returns this entity's stable identifier.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.inner.id
    }

    /// Returns the entity type identifier, e.g. `"subject"`.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.inner.type_name
    }

    /// Returns the schema this entity was created with.
    #[must_use]
    pub fn schema(&self) -> &EntitySchema {
        &self.inner.schema
    }

    /// Returns the stored value for `key`.
    ///
    /// # Errors
    ///
    /// [`AttributeError::KeyNotFound`] if the attribute was never set. An
    /// attribute outside the schema can never have been set, so it reports
    /// the same error.
    pub fn get(&self, key: &str) -> ModelResult<Value> {
        self.inner
            .attributes
            .borrow()
            .get(key)
            .cloned()
            .ok_or_else(|| {
                AttributeError::KeyNotFound {
                    attribute: key.to_string(),
                }
                .into()
            })
    }

    /// Non-failing accessor: the stored value for `key`, if set.
    ///
    /// Intended for predicate bodies, where an unset attribute usually just
    /// means "not satisfied".
    #[must_use]
    pub fn value(&self, key: &str) -> Option<Value> {
        self.inner.attributes.borrow().get(key).cloned()
    }

    /// Returns true if `key` currently holds a value.
    #[must_use]
    pub fn is_set(&self, key: &str) -> bool {
        self.inner.attributes.borrow().contains_key(key)
    }

    /// Stores `value` under `key`, silently overwriting any previous value.
    ///
    /// A successful write bumps [`version`](Entity::version) and refreshes
    /// [`updated_at`](Entity::updated_at). A failed write leaves every
    /// attribute untouched.
    ///
    /// # Errors
    ///
    /// - [`AttributeError::UnknownAttribute`] if `key` is not in the schema
    /// - [`AttributeError::TypeMismatch`] if the value's kind differs from
    ///   the declared kind
    pub fn set(&self, key: &str, value: impl Into<Value>) -> ModelResult<()> {
        let value = value.into();
        self.inner.schema.expect(&self.inner.type_name, key, &value)?;
        self.inner
            .attributes
            .borrow_mut()
            .insert(key.to_string(), value);
        self.touch();
        Ok(())
    }

    /// Appends `constraint` to this entity's constraint list and immediately
    /// invokes [`Constraint::check`] on it, forcing a synchronous evaluation
    /// and a possible state-change callback.
    ///
    /// # Errors
    ///
    /// Propagates the linkage errors of [`Constraint::check`]; the
    /// constraint remains appended either way.
    pub fn add_constraint(&self, constraint: &Constraint) -> ModelResult<()> {
        self.inner.constraints.borrow_mut().push(constraint.clone());
        constraint.check()?;
        Ok(())
    }

    /// Removes `constraint` from this entity's constraint list if present;
    /// no-op otherwise. The constraint's own link is untouched.
    pub fn remove_constraint(&self, constraint: &Constraint) {
        self.inner
            .constraints
            .borrow_mut()
            .retain(|c| c.id() != constraint.id());
    }

    /// Snapshot of the constraint handles currently attached to this entity,
    /// in attachment order.
    #[must_use]
    pub fn constraints(&self) -> Vec<Constraint> {
        self.inner.constraints.borrow().clone()
    }

    /// Number of attached constraints.
    #[must_use]
    pub fn constraint_count(&self) -> usize {
        self.inner.constraints.borrow().len()
    }

    /// Snapshot of the currently set attributes, in name order.
    #[must_use]
    pub fn attributes(&self) -> BTreeMap<String, Value> {
        self.inner.attributes.borrow().clone()
    }

    /// Number of attributes currently set.
    #[must_use]
    pub fn attribute_count(&self) -> usize {
        self.inner.attributes.borrow().len()
    }

    /// When this entity was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    /// When this entity was last mutated.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.inner.updated_at.get()
    }

    /// Mutation counter; starts at 1 and increments on every successful
    /// attribute write.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Creates an ownership-free reference to this entity.
    #[must_use]
    pub fn downgrade(&self) -> WeakEntity {
        WeakEntity {
            inner: Rc::downgrade(&self.inner),
        }
    }

    fn touch(&self) {
        self.inner.updated_at.set(Utc::now());
        self.inner.version.set(self.inner.version.get() + 1);
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Entity {}

impl std::hash::Hash for Entity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

/// Ownership-free reference to an [`Entity`].
///
/// Constraints hold their linked entity through this type so the link never
/// keeps an entity alive on its own. [`upgrade`](WeakEntity::upgrade)
/// returns `None` once every strong handle has been dropped.
#[derive(Debug, Clone)]
pub struct WeakEntity {
    inner: Weak<EntityInner>,
}

impl WeakEntity {
    /// Attempts to recover a strong handle.
    #[must_use]
    pub fn upgrade(&self) -> Option<Entity> {
        self.inner.upgrade().map(|inner| Entity { inner })
    }
}
