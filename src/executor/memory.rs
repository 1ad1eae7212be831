//! In-memory persistence executor.
//!
//! Collections are ordered vectors of documents behind a concurrent map.
//! The executor interprets the five logical stage kinds directly, giving
//! the crate a self-contained execution target for tests and embedded use.
//! Test hooks: per-call simulated latency, transport fault injection, and
//! call/batch counters.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::document::{doc_id, Document, EntityId, ID_FIELD};
use crate::entity::{to_document, Entity};
use crate::error::{OdmError, OdmResult};
use crate::pipeline::PipelineStage;

use super::{PersistenceExecutor, Session};

/// In-memory document store implementing [`PersistenceExecutor`].
#[derive(Debug, Default)]
pub struct MemoryExecutor {
    collections: DashMap<String, Vec<Document>>,
    delays: Mutex<VecDeque<Duration>>,
    fail_message: Mutex<Option<String>>,
    find_by_id_calls: AtomicUsize,
    batch_sizes: Mutex<Vec<usize>>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace (by identity) a raw document.
    pub fn insert(&self, collection: &str, doc: Document) {
        let id = doc_id(&doc);
        let mut docs = self.collections.entry(collection.to_string()).or_default();
        if let Some(id) = id {
            if let Some(pos) = docs.iter().position(|d| doc_id(d) == Some(id.clone())) {
                docs[pos] = doc;
                return;
            }
        }
        docs.push(doc);
    }

    /// Insert or replace an entity in its own collection.
    pub fn insert_entity<T: Entity>(&self, entity: &T) -> OdmResult<()> {
        self.insert(T::collection_name(), to_document(entity)?);
        Ok(())
    }

    /// Remove a document by identity; returns whether one existed.
    pub fn remove(&self, collection: &str, id: &EntityId) -> bool {
        let Some(mut docs) = self.collections.get_mut(collection) else {
            return false;
        };
        let before = docs.len();
        docs.retain(|d| doc_id(d).as_ref() != Some(id));
        docs.len() != before
    }

    /// Schedule simulated latencies consumed one per identity lookup, in
    /// call order. Lets tests shuffle response arrival.
    pub fn set_delays(&self, delays: Vec<Duration>) {
        *self.delays.lock().unwrap() = delays.into();
    }

    /// Make the next persistence call fail with a transport fault.
    pub fn fail_next_with(&self, message: &str) {
        *self.fail_message.lock().unwrap() = Some(message.to_string());
    }

    /// Number of single-identity lookups issued.
    pub fn find_by_id_calls(&self) -> usize {
        self.find_by_id_calls.load(Ordering::SeqCst)
    }

    /// Sizes of the id sets handed to `find_by_id_set`, in call order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    fn check_fault(&self) -> OdmResult<()> {
        if let Some(message) = self.fail_message.lock().unwrap().take() {
            return Err(OdmError::Transport(message));
        }
        Ok(())
    }

    async fn simulate_latency(&self) {
        let delay = self.delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn collection_docs(&self, collection: &str) -> Vec<Document> {
        self.collections
            .get(collection)
            .map(|docs| docs.clone())
            .unwrap_or_default()
    }

    fn apply_stages(&self, mut docs: Vec<Document>, stages: &[PipelineStage]) -> Vec<Document> {
        for stage in stages {
            docs = docs
                .into_iter()
                .map(|doc| self.apply_stage(doc, stage))
                .collect();
        }
        docs
    }

    fn apply_stage(&self, mut doc: Document, stage: &PipelineStage) -> Document {
        match stage {
            PipelineStage::JoinEquality {
                from,
                local_field,
                foreign_field,
                as_field,
            } => {
                let matches = self.join_matches(&doc, from, local_field, foreign_field);
                doc.insert(as_field.clone(), Value::Array(matches.into_iter().map(Value::Object).collect()));
            }
            PipelineStage::JoinWithPipeline {
                from,
                local_field,
                foreign_field,
                as_field,
                pipeline,
            } => {
                let matches = self.join_matches(&doc, from, local_field, foreign_field);
                let matches = self.apply_stages(matches, pipeline);
                doc.insert(as_field.clone(), Value::Array(matches.into_iter().map(Value::Object).collect()));
            }
            PipelineStage::FlattenPreserveEmpty { field } => {
                let flattened = match doc.get(field) {
                    Some(Value::Array(items)) => items.first().cloned().unwrap_or(Value::Null),
                    Some(other) => other.clone(),
                    None => Value::Null,
                };
                doc.insert(field.clone(), flattened);
            }
            PipelineStage::CoalesceOrKeepOriginal {
                field,
                joined_field,
            } => {
                match doc.get(joined_field) {
                    Some(joined) if !joined.is_null() => {
                        let joined = joined.clone();
                        doc.insert(field.clone(), joined);
                    }
                    // No match: the original stored handle stays in place.
                    _ => {}
                }
            }
            PipelineStage::RemoveField { field } => {
                doc.remove(field);
            }
        }
        doc
    }

    fn join_matches(
        &self,
        doc: &Document,
        from: &str,
        local_field: &str,
        foreign_field: &str,
    ) -> Vec<Document> {
        let local_values = path_values(doc, local_field);
        if local_values.is_empty() {
            return Vec::new();
        }
        self.collection_docs(from)
            .into_iter()
            .filter(|candidate| {
                path_values(candidate, foreign_field)
                    .iter()
                    .any(|v| local_values.contains(v))
            })
            .collect()
    }
}

/// Resolve a dotted path against a document, fanning out over arrays.
/// `$id` addresses the identity component of a stored handle.
fn path_values(doc: &Document, path: &str) -> Vec<Value> {
    let mut current = vec![Value::Object(doc.clone())];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => {
                    if let Some(v) = map.get(segment) {
                        next.push(v.clone());
                    }
                }
                Value::Array(items) => {
                    for item in items {
                        if let Some(v) = item.as_object().and_then(|m| m.get(segment)) {
                            next.push(v.clone());
                        }
                    }
                }
                _ => {}
            }
        }
        current = next;
    }
    current.into_iter().filter(|v| !v.is_null()).collect()
}

/// Equality filter matching, with `{"$in": [...]}` membership support.
fn matches_filter(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, expected)| {
        let actual = doc.get(key);
        if let Some(set) = expected.as_object().and_then(|m| m.get("$in")) {
            let Some(candidates) = set.as_array() else {
                return false;
            };
            return actual.is_some_and(|v| candidates.contains(v));
        }
        actual == Some(expected)
    })
}

#[async_trait]
impl PersistenceExecutor for MemoryExecutor {
    async fn find_by_id(
        &self,
        collection: &str,
        id: &EntityId,
        _session: Option<&Session>,
    ) -> OdmResult<Option<Document>> {
        self.check_fault()?;
        self.find_by_id_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        Ok(self
            .collection_docs(collection)
            .into_iter()
            .find(|doc| doc.get(ID_FIELD) == Some(id.value())))
    }

    async fn find_by_id_set(
        &self,
        collection: &str,
        ids: &[EntityId],
        _session: Option<&Session>,
    ) -> OdmResult<Vec<Document>> {
        self.check_fault()?;
        self.batch_sizes.lock().unwrap().push(ids.len());
        self.simulate_latency().await;
        Ok(self
            .collection_docs(collection)
            .into_iter()
            .filter(|doc| {
                doc.get(ID_FIELD)
                    .is_some_and(|v| ids.iter().any(|id| id.value() == v))
            })
            .collect())
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Document,
        _session: Option<&Session>,
    ) -> OdmResult<Vec<Document>> {
        self.check_fault()?;
        self.simulate_latency().await;
        Ok(self
            .collection_docs(collection)
            .into_iter()
            .filter(|doc| matches_filter(doc, filter))
            .collect())
    }

    async fn aggregate(
        &self,
        collection: &str,
        filter: &Document,
        stages: &[PipelineStage],
        session: Option<&Session>,
    ) -> OdmResult<Vec<Document>> {
        let matched = self.find(collection, filter, session).await?;
        Ok(self.apply_stages(matched, stages))
    }
}
