//! Query façade: chooses eager vs. lazy resolution for a query and wires
//! the compiler, the executor, and entity parsing together.

use std::marker::PhantomData;

use serde_json::Value;

use crate::document::{Document, EntityId, ID_FIELD};
use crate::entity::{from_document, Entity};
use crate::error::OdmResult;
use crate::executor::{PersistenceExecutor, Session};
use crate::pipeline::compile_entity;
use crate::relations::global_registry;

/// How relation fields of a query's results are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPlan {
    /// Compile the relation graph into the query: one round trip, every
    /// fetchable relation field comes back materialized.
    Eager { engine_major_version: u32 },
    /// Plain filtered find; relation fields stay unresolved handles,
    /// resolvable later through the lazy runtime.
    Lazy,
}

impl Default for FetchPlan {
    fn default() -> Self {
        Self::Lazy
    }
}

/// A filtered query over one entity type.
#[derive(Debug, Clone)]
pub struct EntityQuery<T: Entity> {
    filter: Document,
    plan: FetchPlan,
    session: Option<Session>,
    _marker: PhantomData<T>,
}

impl<T: Entity> Default for EntityQuery<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> EntityQuery<T> {
    pub fn new() -> Self {
        Self {
            filter: Document::new(),
            plan: FetchPlan::default(),
            session: None,
            _marker: PhantomData,
        }
    }

    /// Replace the filter document wholesale.
    pub fn filter(mut self, filter: Document) -> Self {
        self.filter = filter;
        self
    }

    /// Add one equality condition to the filter.
    pub fn filter_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.insert(field.into(), value.into());
        self
    }

    /// Resolve relations eagerly, compiled for the given engine version.
    pub fn eager(mut self, engine_major_version: u32) -> Self {
        self.plan = FetchPlan::Eager {
            engine_major_version,
        };
        self
    }

    /// Leave relation fields as unresolved handles.
    pub fn lazy(mut self) -> Self {
        self.plan = FetchPlan::Lazy;
        self
    }

    /// Attach an opaque session handle, passed through to the executor.
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Execute and parse every matching entity.
    pub async fn all<E>(&self, executor: &E) -> OdmResult<Vec<T>>
    where
        E: PersistenceExecutor + ?Sized,
    {
        let session = self.session.as_ref();
        let docs = match self.plan {
            FetchPlan::Eager {
                engine_major_version,
            } => {
                let stages =
                    compile_entity(T::entity_name(), global_registry(), engine_major_version)?;
                executor
                    .aggregate(T::collection_name(), &self.filter, &stages, session)
                    .await?
            }
            FetchPlan::Lazy => {
                executor
                    .find(T::collection_name(), &self.filter, session)
                    .await?
            }
        };
        docs.into_iter().map(from_document).collect()
    }

    /// Execute and parse the first matching entity, if any.
    pub async fn one<E>(&self, executor: &E) -> OdmResult<Option<T>>
    where
        E: PersistenceExecutor + ?Sized,
    {
        Ok(self.all(executor).await?.into_iter().next())
    }
}

/// Single-result fetch by identity, under the same eager/lazy decision as
/// filtered queries.
pub async fn get_by_id<T, E>(
    executor: &E,
    id: &EntityId,
    plan: FetchPlan,
    session: Option<&Session>,
) -> OdmResult<Option<T>>
where
    T: Entity,
    E: PersistenceExecutor + ?Sized,
{
    match plan {
        FetchPlan::Lazy => executor
            .find_by_id(T::collection_name(), id, session)
            .await?
            .map(from_document)
            .transpose(),
        FetchPlan::Eager {
            engine_major_version,
        } => {
            let stages =
                compile_entity(T::entity_name(), global_registry(), engine_major_version)?;
            let mut filter = Document::new();
            filter.insert(ID_FIELD.to_string(), id.value().clone());
            executor
                .aggregate(T::collection_name(), &filter, &stages, session)
                .await?
                .into_iter()
                .next()
                .map(from_document)
                .transpose()
        }
    }
}
