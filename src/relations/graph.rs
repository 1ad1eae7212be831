//! Relation graph builder: recursive expansion of nested relations under a
//! depth budget.
//!
//! Termination relies solely on the decrementing budget, not a visited-set;
//! self- and mutually-referential schemas are expected and supported this
//! way. Unbounded budgets are permitted but capped by a hard nesting
//! ceiling that turns runaway expansion of a cyclic schema into a
//! configuration error instead of non-termination.

use std::collections::HashMap;

use crate::entity::{DepthBudget, EntityReflection};
use crate::error::{OdmError, OdmResult};

use super::info::RelationInfo;
use super::reflect::reflect_fields;
use super::registry::RelationRegistry;

/// Hard safety-net ceiling on nesting levels when a budget is unbounded.
pub const MAX_NESTING_CEILING: u32 = 32;

/// Expand an entity's relation graph using the depth budgets configured on
/// the type.
pub fn build(
    reflection: &EntityReflection,
    registry: &RelationRegistry,
) -> OdmResult<Vec<RelationInfo>> {
    build_with(
        reflection,
        &reflection.depths.per_field,
        reflection.depths.default,
        registry,
    )
}

/// Expand an entity's relation graph with explicit budgets.
///
/// Each relation field's effective depth comes from `per_field`, falling
/// back to `default`; `None` means unbounded. Nested levels inherit the
/// decremented budget as their default for every field — the target type's
/// own configured depths are not consulted.
pub fn build_with(
    reflection: &EntityReflection,
    per_field: &HashMap<String, DepthBudget>,
    default: DepthBudget,
    registry: &RelationRegistry,
) -> OdmResult<Vec<RelationInfo>> {
    expand(reflection, per_field, default, registry, 0)
}

fn expand(
    reflection: &EntityReflection,
    per_field: &HashMap<String, DepthBudget>,
    default: DepthBudget,
    registry: &RelationRegistry,
    level: u32,
) -> OdmResult<Vec<RelationInfo>> {
    let mut infos = reflect_fields(reflection)?;

    for info in &mut infos {
        let budget = per_field
            .get(&info.field_name)
            .copied()
            .unwrap_or(default);

        match budget {
            Some(0) => {
                // Budget exhausted: keep the entry as a raw-handle field,
                // without resolving or expanding the target.
                info.fetchable = false;
            }
            remaining => {
                if remaining.is_none() && level >= MAX_NESTING_CEILING {
                    tracing::warn!(
                        entity = %reflection.type_name,
                        field = %info.field_name,
                        "unbounded depth budget hit the nesting ceiling; cyclic schema?"
                    );
                    return Err(OdmError::Configuration(format!(
                        "unbounded relation expansion exceeded {} levels at '{}.{}' (cyclic schema with an unbounded depth budget)",
                        MAX_NESTING_CEILING, reflection.type_name, info.field_name
                    )));
                }

                let target = registry.resolve(&info.target)?;
                // The decremented budget propagates as the default for every
                // nested field; per-field overrides apply at the top only.
                info.nested = expand(
                    &target,
                    &HashMap::new(),
                    remaining.map(|d| d - 1),
                    registry,
                    level + 1,
                )?;
            }
        }
    }

    Ok(infos)
}
