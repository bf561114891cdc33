//! Constraints: edge-triggered boolean observers bound to one entity.
//!
//! A constraint pairs a satisfaction predicate with a state-change callback.
//! The callback fires if and only if the satisfaction state actually flips —
//! re-evaluating an unchanged predicate is silent, so repeated `check()`
//! calls after every entity mutation do not produce notification storms.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::trace;
use uuid::Uuid;

use crate::entity::{Entity, EntityId, WeakEntity};
use crate::error::{LinkError, ModelResult};

/// Unique identifier for a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintId(Uuid);

impl ConstraintId {
    /// Creates a new random constraint ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConstraintId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Satisfaction predicate: inspects the linked entity's state.
pub type Predicate = Box<dyn Fn(&Entity) -> bool>;

/// State-change callback, invoked with the new satisfaction state.
pub type ChangeCallback = Box<dyn FnMut(bool)>;

struct EntityLink {
    id: EntityId,
    entity: WeakEntity,
}

struct ConstraintInner {
    id: ConstraintId,
    type_name: String,
    predicate: Predicate,
    on_change: RefCell<ChangeCallback>,
    satisfied: Cell<bool>,
    linked: RefCell<Option<EntityLink>>,
}

/// An edge-triggered boolean observer over one entity.
///
/// Created unlinked and unsatisfied through a
/// [`Factory`](crate::Factory); becomes checkable only after
/// [`link_to`](Constraint::link_to). The link is a first-write-wins,
/// ownership-free back-reference — it is set at most once and never keeps
/// the entity alive.
///
/// Like [`Entity`], `Constraint` is a shared handle with identity semantics:
/// clones observe the same state and equality is by [`ConstraintId`].
#[derive(Clone)]
pub struct Constraint {
    inner: Rc<ConstraintInner>,
}

impl Constraint {
    pub(crate) fn new<P, F>(type_name: impl Into<String>, predicate: P, on_change: F) -> Self
    where
        P: Fn(&Entity) -> bool + 'static,
        F: FnMut(bool) + 'static,
    {
        Self {
            inner: Rc::new(ConstraintInner {
                id: ConstraintId::new(),
                type_name: type_name.into(),
                predicate: Box::new(predicate),
                on_change: RefCell::new(Box::new(on_change)),
                satisfied: Cell::new(false),
                linked: RefCell::new(None),
            }),
        }
    }

    /// Returns this constraint's stable identifier.
    #[must_use]
    pub fn id(&self) -> ConstraintId {
        self.inner.id
    }

    /// Returns the constraint type identifier, e.g. `"name is Algorithms"`.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.inner.type_name
    }

    /// Current satisfaction state. Constraints start unsatisfied.
    #[must_use]
    pub fn satisfied(&self) -> bool {
        self.inner.satisfied.get()
    }

    /// Force-sets the state to satisfied, firing the callback if it was
    /// previously broken.
    pub fn satisfy(&self) {
        self.set_satisfied(true);
    }

    /// Force-sets the state to broken, firing the callback if it was
    /// previously satisfied.
    pub fn fail(&self) {
        self.set_satisfied(false);
    }

    /// Evaluates the predicate against the linked entity and applies the
    /// edge-triggered state update. Returns the new satisfaction state.
    ///
    /// # Errors
    ///
    /// - [`LinkError::NotLinked`] if the constraint was never linked
    /// - [`LinkError::EntityReleased`] if the linked entity has been dropped
    pub fn check(&self) -> ModelResult<bool> {
        let entity = {
            let linked = self.inner.linked.borrow();
            let Some(link) = linked.as_ref() else {
                return Err(LinkError::NotLinked {
                    constraint_type: self.inner.type_name.clone(),
                }
                .into());
            };
            link.entity.upgrade().ok_or_else(|| LinkError::EntityReleased {
                constraint_type: self.inner.type_name.clone(),
            })?
        };

        let satisfied = (self.inner.predicate)(&entity);
        self.set_satisfied(satisfied);
        Ok(satisfied)
    }

    /// Links this constraint to `entity`, first-write-wins.
    ///
    /// Required before [`check`](Constraint::check). If a link is already
    /// set, the call is a no-op — it neither re-links nor errors.
    pub fn link_to(&self, entity: &Entity) {
        let mut linked = self.inner.linked.borrow_mut();
        if linked.is_none() {
            *linked = Some(EntityLink {
                id: entity.id(),
                entity: entity.downgrade(),
            });
        }
    }

    /// Returns true once a link has been set, even if the entity has since
    /// been dropped.
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.inner.linked.borrow().is_some()
    }

    /// Returns a strong handle to the linked entity, if linked and still
    /// alive.
    #[must_use]
    pub fn linked_entity(&self) -> Option<Entity> {
        self.inner
            .linked
            .borrow()
            .as_ref()
            .and_then(|link| link.entity.upgrade())
    }

    /// Returns the linked entity's id; stable even after the entity is
    /// dropped.
    #[must_use]
    pub fn linked_entity_id(&self) -> Option<EntityId> {
        self.inner.linked.borrow().as_ref().map(|link| link.id)
    }

    // The edge trigger: the callback runs only on an actual flip. The state
    // is updated before the callback so the callback observes the new value.
    fn set_satisfied(&self, value: bool) {
        if self.inner.satisfied.get() == value {
            return;
        }
        self.inner.satisfied.set(value);
        trace!(
            constraint_type = %self.inner.type_name,
            satisfied = value,
            "constraint state changed"
        );
        let mut on_change = self.inner.on_change.borrow_mut();
        (*on_change)(value);
    }
}

impl PartialEq for Constraint {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Constraint {}

impl std::hash::Hash for Constraint {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("id", &self.inner.id)
            .field("type_name", &self.inner.type_name)
            .field("satisfied", &self.inner.satisfied.get())
            .field("linked_entity", &self.linked_entity_id())
            .finish_non_exhaustive()
    }
}
