//! Schema reflector: classifies an entity's declared fields into
//! `RelationInfo`.
//!
//! Classification is purely shape-driven; target types are carried by
//! registered name and resolved later via the registry, never at
//! declaration time.

use crate::entity::{EntityReflection, FieldSpec};
use crate::error::{OdmError, OdmResult};

use super::info::RelationInfo;
use super::kind::RelationKind;

/// Classify every declared reference-shaped field of an entity, in
/// declaration order.
///
/// A back-reference field missing its `original_field` metadata is a fatal
/// configuration error, surfaced here so registration fails immediately.
pub fn reflect_fields(reflection: &EntityReflection) -> OdmResult<Vec<RelationInfo>> {
    reflection
        .fields
        .iter()
        .map(|spec| classify(&reflection.type_name, spec))
        .collect()
}

fn classify(type_name: &str, spec: &FieldSpec) -> OdmResult<RelationInfo> {
    let shape = &spec.shape;
    let kind = match (shape.back, shape.list, shape.optional) {
        (false, false, false) => RelationKind::Direct,
        (false, false, true) => RelationKind::OptionalDirect,
        (false, true, false) => RelationKind::List,
        (false, true, true) => RelationKind::OptionalList,
        (true, false, false) => RelationKind::BackDirect,
        (true, false, true) => RelationKind::OptionalBackDirect,
        (true, true, false) => RelationKind::BackList,
        (true, true, true) => RelationKind::OptionalBackList,
    };

    let lookup_field_name = if kind.is_back() {
        shape.original_field.clone().ok_or_else(|| {
            OdmError::Configuration(format!(
                "back-reference field '{}' on '{}' requires original_field naming the forward field on '{}'",
                spec.name, type_name, shape.target
            ))
        })?
    } else {
        spec.name.clone()
    };

    Ok(RelationInfo {
        field_name: spec.name.clone(),
        lookup_field_name,
        target: shape.target.clone(),
        kind,
        nested: Vec::new(),
        fetchable: true,
    })
}
