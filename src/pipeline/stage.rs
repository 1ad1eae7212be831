//! Logical query-plan stage kinds.
//!
//! The compiler produces only these five kinds; exact wire serialization
//! (`$lookup`, `$unwind`, ...) is the persistence layer's concern. Field
//! paths use dotted notation, with `$id` addressing the identity component
//! of a stored handle (so `window.$id` is the id inside the handle stored
//! at `window`).

use serde::{Deserialize, Serialize};

/// One logical stage of a compiled eager-resolution pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineStage {
    /// Outer join by equality: collect every document of `from` whose value
    /// at `foreign_field` matches the local value at `local_field` into an
    /// array at `as_field`. Either side may be a set of values (a stored
    /// list of handles); a match is any non-empty intersection.
    JoinEquality {
        from: String,
        local_field: String,
        foreign_field: String,
        as_field: String,
    },

    /// Outer join in pipeline-with-let form: bind the local value at
    /// `local_field` into a variable, correlate against `foreign_field`
    /// inside a sub-pipeline, then run `pipeline` over the matches before
    /// they land at `as_field`. Logically identical to [`Self::JoinEquality`]
    /// plus nested resolution of the matches.
    JoinWithPipeline {
        from: String,
        local_field: String,
        foreign_field: String,
        as_field: String,
        pipeline: Vec<PipelineStage>,
    },

    /// Flatten a join's single-element output array, preserving a null
    /// placeholder when the join matched nothing.
    FlattenPreserveEmpty { field: String },

    /// Substitute the joined document into `field`, keeping the original
    /// unresolved handle when `joined_field` holds no match.
    CoalesceOrKeepOriginal { field: String, joined_field: String },

    /// Remove the temporary join field.
    RemoveField { field: String },
}

impl PipelineStage {
    /// The field this stage writes (or removes).
    pub fn output_field(&self) -> &str {
        match self {
            Self::JoinEquality { as_field, .. } | Self::JoinWithPipeline { as_field, .. } => {
                as_field
            }
            Self::FlattenPreserveEmpty { field }
            | Self::CoalesceOrKeepOriginal { field, .. }
            | Self::RemoveField { field } => field,
        }
    }
}
