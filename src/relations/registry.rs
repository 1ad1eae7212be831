//! Relation registry: process-wide name→reflection table and relation
//! graph cache.
//!
//! The table is populated once per module at initialization and read-only
//! thereafter; repeated registration of the same name is idempotent (last
//! write wins, no error, no lock). Forward-declared targets are resolved
//! here lazily at compile/fetch time rather than at declaration time.

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::entity::{Entity, EntityReflection};
use crate::error::{OdmError, OdmResult};

use super::graph;
use super::info::RelationInfo;
use super::reflect::reflect_fields;

/// Name→reflection table plus the per-type relation graph cache.
#[derive(Debug, Default)]
pub struct RelationRegistry {
    reflections: DashMap<String, EntityReflection>,
    graphs: DashMap<String, Arc<Vec<RelationInfo>>>,
}

impl RelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type under its declared name.
    ///
    /// Reflection is validated eagerly so configuration errors (a
    /// back-reference without its `original_field`) surface at registration
    /// rather than at point of use.
    pub fn register<T: Entity>(&self) -> OdmResult<()> {
        self.register_reflection(EntityReflection::of::<T>())
    }

    /// Register a pre-built reflection. Idempotent: re-registering a name
    /// overwrites the previous entry.
    pub fn register_reflection(&self, reflection: EntityReflection) -> OdmResult<()> {
        reflect_fields(&reflection)?;
        tracing::debug!(entity = %reflection.type_name, "registering entity type");
        self.reflections
            .insert(reflection.type_name.clone(), reflection);
        // Cached graphs may embed the replaced type anywhere; rebuild on
        // next use.
        self.graphs.clear();
        Ok(())
    }

    /// Resolve a registered name to its reflection. Failing here means a
    /// relation target was omitted from initialization — unrecoverable.
    pub fn resolve(&self, name: &str) -> OdmResult<EntityReflection> {
        self.reflections
            .get(name)
            .map(|entry| entry.clone())
            .ok_or_else(|| OdmError::NameNotFound(name.to_string()))
    }

    /// Whether a name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.reflections.contains_key(name)
    }

    /// The relation graph of a registered type, expanded under the type's
    /// configured depth budgets. Built on first use, cached until
    /// re-registration.
    pub fn relation_graph(&self, name: &str) -> OdmResult<Arc<Vec<RelationInfo>>> {
        if let Some(cached) = self.graphs.get(name) {
            return Ok(cached.clone());
        }
        let reflection = self.resolve(name)?;
        let built = Arc::new(graph::build(&reflection, self)?);
        self.graphs.insert(name.to_string(), built.clone());
        Ok(built)
    }

    /// Drop every registration and cached graph.
    pub fn clear(&self) {
        self.reflections.clear();
        self.graphs.clear();
    }
}

/// Global registry instance for the process.
static GLOBAL_REGISTRY: Lazy<RelationRegistry> = Lazy::new(RelationRegistry::new);

/// Get the process-wide relation registry.
pub fn global_registry() -> &'static RelationRegistry {
    &GLOBAL_REGISTRY
}

/// Register an entity type in the global registry.
pub fn register_entity<T: Entity>() -> OdmResult<()> {
    global_registry().register::<T>()
}
