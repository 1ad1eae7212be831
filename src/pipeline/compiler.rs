//! Pipeline compiler: relation graph → ordered stage sequence.
//!
//! Invoked once per eager query. For each fetchable top-level relation one
//! join group is emitted, in field-declaration order, so compilation is
//! deterministic and reproducible for identical input.

use crate::document::ID_FIELD;
use crate::error::OdmResult;
use crate::relations::info::RelationInfo;
use crate::relations::registry::RelationRegistry;

use super::stage::PipelineStage;

/// Engine major version that first supports the plain equality-join form
/// for handle sub-path correlation; older engines always take the
/// pipeline-with-let form.
const MIN_EQUALITY_JOIN_VERSION: u32 = 5;

/// Prefix of the temporary field a direct join lands in before the
/// flatten/coalesce/cleanup stages fold it into place.
const JOINED_FIELD_PREFIX: &str = "_joined_";

/// Compile the cached relation graph of a registered entity type.
pub fn compile_entity(
    entity_name: &str,
    registry: &RelationRegistry,
    engine_major_version: u32,
) -> OdmResult<Vec<PipelineStage>> {
    let graph = registry.relation_graph(entity_name)?;
    compile(&graph, registry, engine_major_version)
}

/// Compile a relation graph into an ordered stage sequence.
///
/// The choice between the equality-join and pipeline-with-let forms is a
/// pure function of the nested-relation presence and the single integer
/// version parameter; both forms produce identical logical results.
pub fn compile(
    graph: &[RelationInfo],
    registry: &RelationRegistry,
    engine_major_version: u32,
) -> OdmResult<Vec<PipelineStage>> {
    let mut stages = Vec::new();
    for info in graph.iter().filter(|i| i.fetchable) {
        compile_group(info, registry, engine_major_version, &mut stages)?;
    }
    tracing::debug!(
        groups = graph.iter().filter(|i| i.fetchable).count(),
        stages = stages.len(),
        "compiled eager resolution pipeline"
    );
    Ok(stages)
}

/// Emit the join group for one relation field.
fn compile_group(
    info: &RelationInfo,
    registry: &RelationRegistry,
    engine_major_version: u32,
    out: &mut Vec<PipelineStage>,
) -> OdmResult<()> {
    let target = registry.resolve(&info.target)?;

    // Forward: local handle id == target identity.
    // Back: local identity == target's stored handle id.
    let (local_field, foreign_field) = if info.kind.is_back() {
        (
            ID_FIELD.to_string(),
            format!("{}.$id", info.lookup_field_name),
        )
    } else {
        (
            format!("{}.$id", info.lookup_field_name),
            ID_FIELD.to_string(),
        )
    };

    // List joins land in the field directly; direct joins go through a
    // temporary field folded in by the flatten/coalesce/cleanup stages.
    let direct = !info.kind.is_list();
    let as_field = if direct {
        format!("{}{}", JOINED_FIELD_PREFIX, info.field_name)
    } else {
        info.field_name.clone()
    };

    let has_nested = info.fetchable_nested().next().is_some();
    let join = if has_nested || engine_major_version < MIN_EQUALITY_JOIN_VERSION {
        let mut sub = Vec::new();
        for nested in info.fetchable_nested() {
            compile_group(nested, registry, engine_major_version, &mut sub)?;
        }
        PipelineStage::JoinWithPipeline {
            from: target.collection,
            local_field,
            foreign_field,
            as_field: as_field.clone(),
            pipeline: sub,
        }
    } else {
        PipelineStage::JoinEquality {
            from: target.collection,
            local_field,
            foreign_field,
            as_field: as_field.clone(),
        }
    };
    out.push(join);

    if direct {
        out.push(PipelineStage::FlattenPreserveEmpty {
            field: as_field.clone(),
        });
        out.push(PipelineStage::CoalesceOrKeepOriginal {
            field: info.field_name.clone(),
            joined_field: as_field.clone(),
        });
        out.push(PipelineStage::RemoveField { field: as_field });
    }

    Ok(())
}
