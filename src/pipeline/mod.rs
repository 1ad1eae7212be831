//! Eager resolution pipeline: logical stage kinds and the compiler that
//! turns a relation graph into an ordered stage sequence.

pub mod compiler;
pub mod stage;

pub use compiler::{compile, compile_entity};
pub use stage::PipelineStage;

/// Engine major version assumed when a caller does not supply one (the
/// lazy runtime's nested expansion path).
pub const DEFAULT_ENGINE_MAJOR_VERSION: u32 = 7;
