//! # Weft - Typed entities, constraints, and graphs
//!
//! Weft is a small in-memory modeling layer. Entities are typed objects
//! with a fixed, schema-checked set of named attributes. Constraints are
//! boolean predicates over one entity's state that invoke a callback
//! exactly when their satisfaction flips. Graphs collect entities and their
//! linked constraints into named sets whose membership stays consistent.
//!
//! ## Core Concepts
//!
//! - **Entity**: typed, schema-constrained attribute holder
//! - **Constraint**: edge-triggered boolean observer bound to one entity
//! - **Factory**: registry + constructor for entity/constraint types
//! - **Graph**: named, invariant-preserving container of linked
//!   entities/constraints
//!
//! ## Usage
//!
//! ```rust
//! use weft::{EntitySchema, Factory, ValueKind};
//!
//! let mut factory = Factory::new();
//!
//! factory.register_entity(
//!     "subject",
//!     EntitySchema::new()
//!         .attribute("name", ValueKind::String)
//!         .attribute("number", ValueKind::String)
//!         .attribute("units", ValueKind::Int),
//! );
//! factory.register_constraint("name is Algorithms", "subject")?;
//!
//! let subject = factory.create_entity("subject")?;
//! subject.set("number", "6.006")?;
//! subject.set("name", "Algorithms")?;
//!
//! let constraint = factory.create_constraint(
//!     "name is Algorithms",
//!     |entity| {
//!         entity.value("name").as_ref().and_then(|v| v.as_string())
//!             == Some("Algorithms")
//!     },
//!     |satisfied| println!("{satisfied}"),
//! )?;
//!
//! factory.link(&constraint, &subject)?;
//! assert!(constraint.satisfied());
//! # Ok::<(), weft::ModelError>(())
//! ```
//!
//! All state is single-threaded: handles are `Rc`-based and deliberately
//! not `Send`. Callbacks run synchronously on the caller's stack.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod constraint;
pub mod entity;
pub mod error;
pub mod factory;
pub mod graph;
pub mod schema;
pub mod value;

// Re-export primary types at crate root for convenience
pub use constraint::{ChangeCallback, Constraint, ConstraintId, Predicate};
pub use entity::{Entity, EntityId, WeakEntity};
pub use error::{AttributeError, LinkError, ModelError, ModelResult, RegistryError};
pub use factory::{AttributeSource, Factory};
pub use graph::Graph;
pub use schema::EntitySchema;
pub use value::{Value, ValueKind};
