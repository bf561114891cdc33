//! Graphs: named, invariant-preserving containers of linked entities and
//! constraints.
//!
//! A graph keeps two id-keyed membership maps and maintains one invariant
//! across every mutation: each contained constraint is linked, and its
//! linked entity is contained too. Entities and their constraints therefore
//! join and leave the graph together.

use std::collections::HashMap;

use tracing::debug;

use crate::constraint::{Constraint, ConstraintId};
use crate::entity::{Entity, EntityId};
use crate::error::{LinkError, ModelResult};
use crate::factory::Factory;
use crate::schema::EntitySchema;

/// A named collection of entities and their linked constraints.
///
/// Membership is keyed by the stable [`EntityId`] / [`ConstraintId`]
/// identities, so distinct handles to the same object agree on membership.
/// A graph may own a [`Factory`], in which case the registration and
/// creation calls can be made through the graph itself.
///
/// # Examples
///
/// ```
/// use weft::{EntitySchema, Factory, Graph, ValueKind};
///
/// let mut factory = Factory::new();
/// factory.register_entity(
///     "subject",
///     EntitySchema::new().attribute("name", ValueKind::String),
/// );
///
/// let mut graph = Graph::with_factory("spring-schedule", factory);
/// let subject = graph.create_entity("subject").unwrap().unwrap();
/// assert!(graph.contains_entity(&subject));
/// ```
#[derive(Debug)]
pub struct Graph {
    name: String,
    entities: HashMap<EntityId, Entity>,
    constraints: HashMap<ConstraintId, Constraint>,
    factory: Option<Factory>,
}

impl Graph {
    /// Creates an empty graph with no factory.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entities: HashMap::new(),
            constraints: HashMap::new(),
            factory: None,
        }
    }

    /// Creates an empty graph that owns `factory`.
    #[must_use]
    pub fn with_factory(name: impl Into<String>, factory: Factory) -> Self {
        Self {
            factory: Some(factory),
            ..Self::new(name)
        }
    }

    /// The graph's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The owned factory, if any.
    #[must_use]
    pub fn factory(&self) -> Option<&Factory> {
        self.factory.as_ref()
    }

    /// Mutable access to the owned factory, if any.
    pub fn factory_mut(&mut self) -> Option<&mut Factory> {
        self.factory.as_mut()
    }

    /// Inserts `entity` into the graph, then inserts every linked
    /// constraint it carries together with that constraint's linked entity.
    ///
    /// Constraints in the entity's list that are unlinked (or whose entity
    /// has been released) are skipped — they cannot satisfy the membership
    /// invariant.
    pub fn add_entity(&mut self, entity: &Entity) {
        debug!(graph = %self.name, entity_id = %entity.id(), "adding entity");
        self.entities.insert(entity.id(), entity.clone());

        for constraint in entity.constraints() {
            if let Some(linked) = constraint.linked_entity() {
                self.constraints.insert(constraint.id(), constraint.clone());
                self.entities.entry(linked.id()).or_insert(linked);
            }
        }
    }

    /// Inserts `constraint` into the graph together with its linked entity.
    ///
    /// # Errors
    ///
    /// [`LinkError::UnlinkedConstraint`] if the constraint has no live
    /// linked entity; the graph is unchanged.
    pub fn add_constraint(&mut self, constraint: &Constraint) -> ModelResult<()> {
        let Some(entity) = constraint.linked_entity() else {
            return Err(LinkError::UnlinkedConstraint {
                constraint_type: constraint.type_name().to_string(),
            }
            .into());
        };

        debug!(graph = %self.name, constraint_id = %constraint.id(), "adding constraint");
        self.constraints.insert(constraint.id(), constraint.clone());
        self.entities.entry(entity.id()).or_insert(entity);
        Ok(())
    }

    /// Removes `entity` from the graph, then removes each of that entity's
    /// constraints from the constraint set. The constraints stay linked and
    /// stay on the entity; only the membership changes.
    pub fn remove_entity(&mut self, entity: &Entity) {
        debug!(graph = %self.name, entity_id = %entity.id(), "removing entity");
        self.entities.remove(&entity.id());
        for constraint in entity.constraints() {
            self.constraints.remove(&constraint.id());
        }
    }

    /// Removes `constraint` from the constraint set only; its linked entity
    /// stays in the graph. No-op if absent.
    pub fn remove_constraint(&mut self, constraint: &Constraint) {
        self.constraints.remove(&constraint.id());
    }

    /// Membership test for an entity.
    #[must_use]
    pub fn contains_entity(&self, entity: &Entity) -> bool {
        self.entities.contains_key(&entity.id())
    }

    /// Membership test for a constraint.
    #[must_use]
    pub fn contains_constraint(&self, constraint: &Constraint) -> bool {
        self.constraints.contains_key(&constraint.id())
    }

    /// Number of contained entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of contained constraints.
    #[must_use]
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Returns true if the graph contains nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.constraints.is_empty()
    }

    /// Iterates the contained entities in arbitrary order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Iterates the contained constraints in arbitrary order.
    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.values()
    }

    /// Delegates to the owned factory's
    /// [`register_entity`](Factory::register_entity); silent no-op without
    /// a factory.
    pub fn register_entity(&mut self, identifier: impl Into<String>, schema: EntitySchema) {
        if let Some(factory) = self.factory.as_mut() {
            factory.register_entity(identifier, schema);
        }
    }

    /// Delegates to the owned factory's
    /// [`register_constraint`](Factory::register_constraint); silent no-op
    /// without a factory.
    ///
    /// # Errors
    ///
    /// The factory's registration errors.
    pub fn register_constraint(
        &mut self,
        identifier: impl Into<String>,
        entity_type: impl Into<String>,
    ) -> ModelResult<()> {
        match self.factory.as_mut() {
            Some(factory) => factory.register_constraint(identifier, entity_type),
            None => Ok(()),
        }
    }

    /// Creates an entity through the owned factory and inserts it into the
    /// graph. Returns `Ok(None)` without a factory.
    ///
    /// # Errors
    ///
    /// The factory's creation errors.
    pub fn create_entity(&mut self, identifier: &str) -> ModelResult<Option<Entity>> {
        let entity = match self.factory.as_ref() {
            Some(factory) => factory.create_entity(identifier)?,
            None => return Ok(None),
        };
        self.add_entity(&entity);
        Ok(Some(entity))
    }

    /// Creates an unlinked constraint through the owned factory. Returns
    /// `Ok(None)` without a factory.
    ///
    /// The constraint is not inserted into the graph: an unlinked
    /// constraint cannot satisfy the membership invariant. Link it and add
    /// it, or use
    /// [`create_constraint_for`](Graph::create_constraint_for).
    ///
    /// # Errors
    ///
    /// The factory's creation errors.
    pub fn create_constraint<P, F>(
        &mut self,
        identifier: &str,
        predicate: P,
        on_change: F,
    ) -> ModelResult<Option<Constraint>>
    where
        P: Fn(&Entity) -> bool + 'static,
        F: FnMut(bool) + 'static,
    {
        match self.factory.as_ref() {
            Some(factory) => Ok(Some(factory.create_constraint(identifier, predicate, on_change)?)),
            None => Ok(None),
        }
    }

    /// Creates a constraint through the owned factory, links it to `target`
    /// via the factory, and inserts both into the graph. Returns `Ok(None)`
    /// without a factory.
    ///
    /// # Errors
    ///
    /// The factory's creation and linking errors; a failed link leaves the
    /// graph unchanged.
    pub fn create_constraint_for<P, F>(
        &mut self,
        identifier: &str,
        predicate: P,
        on_change: F,
        target: &Entity,
    ) -> ModelResult<Option<Constraint>>
    where
        P: Fn(&Entity) -> bool + 'static,
        F: FnMut(bool) + 'static,
    {
        let constraint = match self.factory.as_ref() {
            Some(factory) => {
                let constraint = factory.create_constraint(identifier, predicate, on_change)?;
                factory.link(&constraint, target)?;
                constraint
            }
            None => return Ok(None),
        };

        self.add_constraint(&constraint)?;
        Ok(Some(constraint))
    }
}
