//! Relation discovery and expansion: schema reflection, the process-wide
//! relation registry, and the depth-bounded relation graph builder.

pub mod graph;
pub mod info;
pub mod kind;
pub mod reflect;
pub mod registry;

pub use graph::{build, build_with, MAX_NESTING_CEILING};
pub use info::RelationInfo;
pub use kind::RelationKind;
pub use reflect::reflect_fields;
pub use registry::{global_registry, register_entity, RelationRegistry};
