//! Entity trait and the field declaration surface.
//!
//! Rust has no runtime field reflection, so entity types declare their
//! reference-shaped fields statically via [`Entity::relation_fields`]; the
//! schema reflector classifies those declarations into `RelationInfo`.
//! Target types are named by registered name rather than by Rust type so a
//! field may reference a type registered later (forward declaration).

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::document::{Document, EntityId};
use crate::error::{OdmError, OdmResult};

/// A nested-relation expansion budget. `None` means unbounded.
pub type DepthBudget = Option<u32>;

/// A persisted entity type with one identity field and zero or more typed
/// fields, some of which may be reference-shaped.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The name this type registers under; relation targets refer to it.
    fn entity_name() -> &'static str;

    /// The collection the entity's documents live in.
    fn collection_name() -> &'static str;

    /// The entity's identity value.
    fn id(&self) -> EntityId;

    /// Declared reference-shaped fields, in declaration order.
    fn relation_fields() -> Vec<FieldSpec> {
        Vec::new()
    }

    /// Per-field and default nested-relation depth budgets.
    fn depth_settings() -> DepthSettings {
        DepthSettings::default()
    }
}

/// One declared reference-shaped field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Field name on the declaring entity.
    pub name: String,
    /// The declared shape of the field.
    pub shape: FieldShape,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, shape: FieldShape) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }
}

/// The declared shape of a reference field: forward or back, single or
/// list, optional or required.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldShape {
    /// Registered name of the target entity type (may be forward-declared).
    pub target: String,
    /// True for sequence-of-references fields.
    pub list: bool,
    /// True when the declared type admits absence.
    pub optional: bool,
    /// True for computed back-references.
    pub back: bool,
    /// For back shapes: the forward field on the *target* entity. Required;
    /// a back shape without it is a fatal configuration error.
    pub original_field: Option<String>,
}

impl FieldShape {
    fn forward(target: impl Into<String>, list: bool, optional: bool) -> Self {
        Self {
            target: target.into(),
            list,
            optional,
            back: false,
            original_field: None,
        }
    }

    fn backward(
        target: impl Into<String>,
        list: bool,
        optional: bool,
        original_field: Option<&str>,
    ) -> Self {
        Self {
            target: target.into(),
            list,
            optional,
            back: true,
            original_field: original_field.map(str::to_string),
        }
    }

    /// `Reference<T>`
    pub fn direct(target: impl Into<String>) -> Self {
        Self::forward(target, false, false)
    }

    /// `Option<Reference<T>>`
    pub fn optional_direct(target: impl Into<String>) -> Self {
        Self::forward(target, false, true)
    }

    /// `Vec<Reference<T>>`
    pub fn list(target: impl Into<String>) -> Self {
        Self::forward(target, true, false)
    }

    /// `Option<Vec<Reference<T>>>`
    pub fn optional_list(target: impl Into<String>) -> Self {
        Self::forward(target, true, true)
    }

    /// `BackReference<T>` with the forward field on the target entity.
    pub fn back_direct(target: impl Into<String>, original_field: Option<&str>) -> Self {
        Self::backward(target, false, false, original_field)
    }

    /// `Option<BackReference<T>>`
    pub fn optional_back_direct(target: impl Into<String>, original_field: Option<&str>) -> Self {
        Self::backward(target, false, true, original_field)
    }

    /// `Vec<BackReference<T>>`
    pub fn back_list(target: impl Into<String>, original_field: Option<&str>) -> Self {
        Self::backward(target, true, false, original_field)
    }

    /// `Option<Vec<BackReference<T>>>`
    pub fn optional_back_list(target: impl Into<String>, original_field: Option<&str>) -> Self {
        Self::backward(target, true, true, original_field)
    }
}

/// Depth budgets controlling nested-relation expansion for one entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthSettings {
    /// Budget applied to relation fields without a per-field entry.
    pub default: DepthBudget,
    /// Per-field budget overrides.
    pub per_field: HashMap<String, DepthBudget>,
}

impl Default for DepthSettings {
    fn default() -> Self {
        Self {
            default: Some(1),
            per_field: HashMap::new(),
        }
    }
}

impl DepthSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default budget. `None` means unbounded.
    pub fn with_default(mut self, budget: DepthBudget) -> Self {
        self.default = budget;
        self
    }

    /// Set the budget for one field. `None` means unbounded.
    pub fn with_field(mut self, field: impl Into<String>, budget: DepthBudget) -> Self {
        self.per_field.insert(field.into(), budget);
        self
    }

    /// Effective budget for a field.
    pub fn effective(&self, field: &str) -> DepthBudget {
        self.per_field.get(field).copied().unwrap_or(self.default)
    }
}

/// The untyped runtime descriptor of an entity type stored in the relation
/// registry. Built once per type at registration.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityReflection {
    /// Registered type name.
    pub type_name: String,
    /// Collection the type's documents live in.
    pub collection: String,
    /// Declared reference-shaped fields in declaration order.
    pub fields: Vec<FieldSpec>,
    /// Depth budgets configured on the type.
    pub depths: DepthSettings,
}

impl EntityReflection {
    /// Build the reflection of a typed entity.
    pub fn of<T: Entity>() -> Self {
        Self {
            type_name: T::entity_name().to_string(),
            collection: T::collection_name().to_string(),
            fields: T::relation_fields(),
            depths: T::depth_settings(),
        }
    }

    /// Look up a declared field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Serialize an entity into its document form.
pub fn to_document<T: Entity>(entity: &T) -> OdmResult<Document> {
    match serde_json::to_value(entity)? {
        Value::Object(map) => Ok(map),
        other => Err(OdmError::Configuration(format!(
            "entity '{}' did not serialize to a document (got {})",
            T::entity_name(),
            other
        ))),
    }
}

/// Parse a document into an entity instance.
pub fn from_document<T: Entity>(doc: Document) -> OdmResult<T> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}
