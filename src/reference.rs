//! Reference value types.
//!
//! A `Reference<T>` field holds either an unresolved [`Handle`] (the stored
//! form) or a materialized target entity. A lookup that finds no target
//! leaves the reference unresolved: "not found" and "not yet resolved" are
//! observably identical.
//!
//! A `BackReference<T>` is the computed inverse of a forward reference on
//! the target entity. It is never stored and materializes only when fetched.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::document::EntityId;
use crate::entity::Entity;

/// Key naming the target collection in the stored handle form.
pub const REF_KEY: &str = "$ref";
/// Key naming the target identity in the stored handle form.
pub const REF_ID_KEY: &str = "$id";

/// The unresolved form of a reference: target collection plus identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handle {
    /// Target collection name.
    #[serde(rename = "$ref")]
    pub collection: String,
    /// Target identity value.
    #[serde(rename = "$id")]
    pub id: EntityId,
}

impl Handle {
    pub fn new(collection: impl Into<String>, id: impl Into<EntityId>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

/// A field value referencing another entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Reference<T> {
    /// Handle only; the target has not been fetched (or no longer exists).
    Unresolved(Handle),
    /// Materialized target entity.
    Resolved(Box<T>),
}

impl<T: Entity> Reference<T> {
    /// Reference an existing entity instance.
    pub fn to(entity: T) -> Self {
        Self::Resolved(Box::new(entity))
    }

    /// Reference a target by identity, in T's collection.
    pub fn with_id(id: impl Into<EntityId>) -> Self {
        Self::Unresolved(Handle::new(T::collection_name(), id))
    }

    /// True once the target entity has been materialized.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// The materialized target, if any.
    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Resolved(entity) => Some(entity),
            Self::Unresolved(_) => None,
        }
    }

    /// Take the materialized target, if any.
    pub fn take(self) -> Option<T> {
        match self {
            Self::Resolved(entity) => Some(*entity),
            Self::Unresolved(_) => None,
        }
    }

    /// The unresolved handle, if the reference is unresolved.
    pub fn handle(&self) -> Option<&Handle> {
        match self {
            Self::Unresolved(handle) => Some(handle),
            Self::Resolved(_) => None,
        }
    }

    /// Target identity, resolved or not.
    pub fn id(&self) -> EntityId {
        match self {
            Self::Unresolved(handle) => handle.id.clone(),
            Self::Resolved(entity) => entity.id(),
        }
    }

    /// The stored form of this reference.
    pub fn to_handle(&self) -> Handle {
        match self {
            Self::Unresolved(handle) => handle.clone(),
            Self::Resolved(entity) => Handle::new(T::collection_name(), entity.id()),
        }
    }
}

// References always serialize to their stored handle form; a resolved
// target is collapsed back to its handle on write.
impl<T: Entity> Serialize for Reference<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_handle().serialize(serializer)
    }
}

// Deserialization accepts either the stored handle form or a full target
// document, so both lazy finds and eager aggregate output parse directly.
impl<'de, T: Entity> Deserialize<'de> for Reference<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if let Some(map) = value.as_object() {
            if let (Some(collection), Some(id)) = (map.get(REF_KEY), map.get(REF_ID_KEY)) {
                let collection = collection
                    .as_str()
                    .ok_or_else(|| D::Error::custom("handle $ref must be a string"))?;
                return Ok(Self::Unresolved(Handle::new(collection, EntityId::new(id.clone()))));
            }
        }
        let entity: T = serde_json::from_value(value).map_err(D::Error::custom)?;
        Ok(Self::Resolved(Box::new(entity)))
    }
}

/// A computed inverse reference. Carries nothing when pending; the target
/// collection is known statically from `T`.
#[derive(Debug, Clone, PartialEq)]
pub enum BackReference<T> {
    /// Not fetched; never stored.
    Pending,
    /// Materialized by an eager join or an explicit fetch.
    Resolved(Box<T>),
}

impl<T: Entity> BackReference<T> {
    /// Target collection name.
    pub fn collection(&self) -> &'static str {
        T::collection_name()
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Resolved(entity) => Some(entity),
            Self::Pending => None,
        }
    }
}

impl<T> Default for BackReference<T> {
    fn default() -> Self {
        Self::Pending
    }
}

impl<T: Entity> Serialize for BackReference<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Back references are computed; the stored form is always empty.
        serializer.serialize_none()
    }
}

impl<'de, T: Entity> Deserialize<'de> for BackReference<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(Self::Pending);
        }
        let entity: T = serde_json::from_value(value).map_err(D::Error::custom)?;
        Ok(Self::Resolved(Box::new(entity)))
    }
}
