//! Relation kind classification.

use serde::{Deserialize, Serialize};

/// Defines the kind of relation a reference-shaped field declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    /// `Reference<T>` — one target, required.
    Direct,
    /// `Option<Reference<T>>`
    OptionalDirect,
    /// `Vec<Reference<T>>` — an ordered sequence of targets.
    List,
    /// `Option<Vec<Reference<T>>>`
    OptionalList,
    /// `BackReference<T>` — computed inverse of one forward reference.
    BackDirect,
    /// `Option<BackReference<T>>`
    OptionalBackDirect,
    /// `Vec<BackReference<T>>`
    BackList,
    /// `Option<Vec<BackReference<T>>>`
    OptionalBackList,
}

impl RelationKind {
    /// Returns true if this kind materializes to an ordered sequence.
    pub fn is_list(self) -> bool {
        matches!(
            self,
            Self::List | Self::OptionalList | Self::BackList | Self::OptionalBackList
        )
    }

    /// Returns true for computed inverse kinds (never stored).
    pub fn is_back(self) -> bool {
        matches!(
            self,
            Self::BackDirect | Self::OptionalBackDirect | Self::BackList | Self::OptionalBackList
        )
    }

    /// Returns true if the declared type admits absence.
    pub fn is_optional(self) -> bool {
        matches!(
            self,
            Self::OptionalDirect
                | Self::OptionalList
                | Self::OptionalBackDirect
                | Self::OptionalBackList
        )
    }
}
