//! Classified relation metadata.

use serde::{Deserialize, Serialize};

use super::kind::RelationKind;

/// Metadata describing one classified relation field, possibly carrying an
/// expanded subtree of nested relations.
///
/// Computed once per entity type and cached in the registry; immutable
/// until re-registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationInfo {
    /// Field name on the declaring entity.
    pub field_name: String,

    /// The field the join correlates against: the field's own name for
    /// forward kinds (where the handle is stored), the forward field on the
    /// *target* entity for back kinds.
    pub lookup_field_name: String,

    /// Registered name of the target entity type.
    pub target: String,

    /// Classified relation kind.
    pub kind: RelationKind,

    /// Nested relations of the target, in the target's declaration order.
    /// Empty once the depth budget reaches zero.
    pub nested: Vec<RelationInfo>,

    /// False exactly when the effective depth budget is ≤ 0; unfetchable
    /// fields are excluded from eager pipelines and left as raw handles.
    pub fetchable: bool,
}

impl RelationInfo {
    /// Look up a nested relation by field name.
    pub fn nested_field(&self, name: &str) -> Option<&RelationInfo> {
        self.nested.iter().find(|n| n.field_name == name)
    }

    /// Nested relations that participate in eager pipelines.
    pub fn fetchable_nested(&self) -> impl Iterator<Item = &RelationInfo> {
        self.nested.iter().filter(|n| n.fetchable)
    }
}
