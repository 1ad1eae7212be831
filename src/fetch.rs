//! Lazy reference runtime: fetch-one, fetch-many and fetch-list.
//!
//! Resolution that finds no target leaves the reference unresolved; callers
//! cannot distinguish "missing target" from "not yet fetched". Transport
//! faults propagate unchanged, and no lock is held across a suspension
//! point.

use std::collections::{HashMap, HashSet};

use futures::future::join_all;

use crate::document::{doc_id, Document, EntityId, ID_FIELD};
use crate::entity::{from_document, Entity};
use crate::error::{OdmError, OdmResult};
use crate::executor::PersistenceExecutor;
use crate::pipeline::{self, PipelineStage};
use crate::reference::Reference;
use crate::relations::global_registry;

impl<T: Entity> Reference<T> {
    /// Resolve this reference with one identity lookup.
    ///
    /// Returns the unchanged reference when the target no longer exists —
    /// a normal outcome, not an error. With `expand_nested`, the lookup
    /// runs the target type's compiled eager pipeline so the fetched
    /// entity's own relations come back materialized.
    pub async fn fetch<E>(&self, executor: &E, expand_nested: bool) -> OdmResult<Reference<T>>
    where
        E: PersistenceExecutor + ?Sized,
    {
        let handle = match self {
            Self::Resolved(_) => return Ok(self.clone()),
            Self::Unresolved(handle) => handle,
        };

        let found = if expand_nested {
            let stages = nested_stages::<T>()?;
            let filter = id_filter(&handle.id);
            executor
                .aggregate(&handle.collection, &filter, &stages, None)
                .await?
                .into_iter()
                .next()
        } else {
            executor.find_by_id(&handle.collection, &handle.id, None).await?
        };

        match found {
            Some(doc) => Ok(Self::Resolved(Box::new(from_document(doc)?))),
            None => Ok(self.clone()),
        }
    }
}

/// Resolve many references concurrently, one independent identity lookup
/// per reference; no cross-collection batching. Output order matches input
/// order regardless of completion order. The first transport fault
/// propagates.
pub async fn fetch_many<T, E>(refs: &[Reference<T>], executor: &E) -> OdmResult<Vec<Reference<T>>>
where
    T: Entity,
    E: PersistenceExecutor + ?Sized,
{
    let lookups = refs.iter().map(|reference| reference.fetch(executor, false));
    join_all(lookups).await.into_iter().collect()
}

/// Resolve a mixed list of references in one batched round trip.
///
/// Already-resolved elements pass through untouched. All unresolved
/// handles must target one entity type (mixed batches fail fast with a
/// configuration error). Identities are deduplicated — a duplicated id
/// triggers exactly one lookup — and the output is reconstructed in the
/// original input order, with unmatched handles left unresolved.
pub async fn fetch_list<T, E>(
    items: Vec<Reference<T>>,
    executor: &E,
    expand_nested: bool,
) -> OdmResult<Vec<Reference<T>>>
where
    T: Entity,
    E: PersistenceExecutor + ?Sized,
{
    let mut collection: Option<String> = None;
    let mut ids: Vec<EntityId> = Vec::new();
    let mut seen: HashSet<EntityId> = HashSet::new();

    for item in &items {
        let Some(handle) = item.handle() else {
            continue;
        };
        match &collection {
            None => collection = Some(handle.collection.clone()),
            Some(existing) if *existing != handle.collection => {
                return Err(OdmError::Configuration(format!(
                    "fetch_list batch mixes target collections '{}' and '{}'",
                    existing, handle.collection
                )));
            }
            Some(_) => {}
        }
        if seen.insert(handle.id.clone()) {
            ids.push(handle.id.clone());
        }
    }

    let Some(collection) = collection else {
        // Nothing unresolved; no round trip.
        return Ok(items);
    };

    tracing::trace!(
        collection = %collection,
        distinct = ids.len(),
        total = items.len(),
        "batched reference resolution"
    );

    let docs = if expand_nested {
        let stages = nested_stages::<T>()?;
        let filter = id_set_filter(&ids);
        executor.aggregate(&collection, &filter, &stages, None).await?
    } else {
        executor.find_by_id_set(&collection, &ids, None).await?
    };

    let mut by_id: HashMap<EntityId, T> = HashMap::with_capacity(docs.len());
    for doc in docs {
        let Some(id) = doc_id(&doc) else {
            continue;
        };
        by_id.insert(id, from_document(doc)?);
    }

    Ok(items
        .into_iter()
        .map(|item| match item.handle() {
            Some(handle) => match by_id.get(&handle.id) {
                Some(entity) => Reference::to(entity.clone()),
                None => item,
            },
            None => item,
        })
        .collect())
}

/// Compiled eager pipeline for `T`'s registered relation graph.
fn nested_stages<T: Entity>() -> OdmResult<Vec<PipelineStage>> {
    pipeline::compile_entity(
        T::entity_name(),
        global_registry(),
        pipeline::DEFAULT_ENGINE_MAJOR_VERSION,
    )
}

fn id_filter(id: &EntityId) -> Document {
    let mut filter = Document::new();
    filter.insert(ID_FIELD.to_string(), id.value().clone());
    filter
}

fn id_set_filter(ids: &[EntityId]) -> Document {
    let mut membership = Document::new();
    membership.insert(
        "$in".to_string(),
        serde_json::Value::Array(ids.iter().map(|id| id.value().clone()).collect()),
    );
    let mut filter = Document::new();
    filter.insert(
        ID_FIELD.to_string(),
        serde_json::Value::Object(membership),
    );
    filter
}
