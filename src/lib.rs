//! # doclink: relationship and link resolution for document databases
//!
//! Application code declares typed entities whose fields reference other
//! entities stored in a document database; this crate resolves those
//! references either eagerly (the relation graph compiled into the original
//! query as a single pipeline) or lazily (fetched, deduplicated and batched
//! on demand).
//!
//! The pieces, leaves first: the schema reflector classifies declared
//! reference fields; the relation registry resolves forward-declared target
//! types; the graph builder expands nested relations under a depth budget;
//! the pipeline compiler turns a graph into ordered logical stages; the
//! lazy runtime fetches what eager compilation did not; and the query
//! façade picks between the two per query.

pub mod document;
pub mod entity;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod pipeline;
pub mod query;
pub mod reference;
pub mod relations;

pub use document::{doc_id, Document, EntityId, ID_FIELD};
pub use entity::{
    from_document, to_document, DepthBudget, DepthSettings, Entity, EntityReflection, FieldShape,
    FieldSpec,
};
pub use error::{OdmError, OdmResult};
pub use executor::{MemoryExecutor, PersistenceExecutor, Session};
pub use fetch::{fetch_list, fetch_many};
pub use pipeline::{compile, compile_entity, PipelineStage, DEFAULT_ENGINE_MAJOR_VERSION};
pub use query::{get_by_id, EntityQuery, FetchPlan};
pub use reference::{BackReference, Handle, Reference};
pub use relations::{global_registry, register_entity, RelationInfo, RelationKind, RelationRegistry};
