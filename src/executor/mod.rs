//! Persistence executor seam.
//!
//! Everything that crosses the wire goes through [`PersistenceExecutor`]:
//! identity fetches, batched find-by-id-set, filtered finds, and compiled
//! aggregate execution. Each call is a suspension point; transport faults
//! are returned unchanged with no retry at this layer.

pub mod memory;

use async_trait::async_trait;

use crate::document::{Document, EntityId};
use crate::error::OdmResult;
use crate::pipeline::PipelineStage;

pub use memory::MemoryExecutor;

/// Opaque session handle, passed through to the persistence layer
/// untouched. Transaction semantics are not this crate's concern.
#[derive(Debug, Clone, Default)]
pub struct Session {
    _opaque: (),
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }
}

/// The persistence collaborator the resolution engine runs against.
#[async_trait]
pub trait PersistenceExecutor: Send + Sync {
    /// Fetch one document by identity. `None` is a normal outcome.
    async fn find_by_id(
        &self,
        collection: &str,
        id: &EntityId,
        session: Option<&Session>,
    ) -> OdmResult<Option<Document>>;

    /// Fetch every document whose identity is in `ids`, in one round trip.
    async fn find_by_id_set(
        &self,
        collection: &str,
        ids: &[EntityId],
        session: Option<&Session>,
    ) -> OdmResult<Vec<Document>>;

    /// Fetch documents matching a filter.
    async fn find(
        &self,
        collection: &str,
        filter: &Document,
        session: Option<&Session>,
    ) -> OdmResult<Vec<Document>>;

    /// Execute a compiled stage sequence over the filtered collection.
    /// Wire-level stage shapes are this layer's concern.
    async fn aggregate(
        &self,
        collection: &str,
        filter: &Document,
        stages: &[PipelineStage],
        session: Option<&Session>,
    ) -> OdmResult<Vec<Document>>;
}
