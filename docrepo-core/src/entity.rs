//! The entity contract: the minimal shape every stored record must satisfy.
//!
//! An entity carries a time-ordered identity ([`ObjectId`]) and two audit
//! timestamps. The creation timestamp is read-derived: when it was never
//! explicitly assigned, it is computed from the creation instant embedded in
//! the identity rather than stored redundantly.

use bson::{Bson, DateTime, de::deserialize_from_bson, oid::ObjectId, ser::serialize_to_bson};
use serde::{Deserialize, Serialize};

use crate::error::RepositoryResult;

/// Canonical name of the identity field in stored documents.
pub const ID_FIELD: &str = "_id";
/// Canonical name of the creation timestamp field in stored documents.
pub const CREATED_AT_FIELD: &str = "created_at";
/// Canonical name of the modification timestamp field in stored documents.
pub const MODIFIED_AT_FIELD: &str = "modified_at";

/// Core trait that all entities stored in a repository must implement.
///
/// Every entity has a unique, time-ordered identity and audit timestamps.
/// The identity is immutable after first persistence except via [`Entity::set_id`],
/// the explicit re-identification operation used when cloning or duplicating
/// a record under a fresh identity.
///
/// # Example
///
/// ```ignore
/// use docrepo_core::entity::Entity;
/// use bson::{DateTime, oid::ObjectId};
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct User {
///     #[serde(rename = "_id")]
///     pub id: ObjectId,
///     pub created_at: Option<DateTime>,
///     pub modified_at: DateTime,
///     pub email: String,
/// }
///
/// impl Entity for User {
///     fn id(&self) -> ObjectId { self.id }
///     fn set_id(&mut self, id: ObjectId) { self.id = id; }
///     fn created_at(&self) -> Option<DateTime> { self.created_at }
///     fn modified_at(&self) -> DateTime { self.modified_at }
/// }
/// ```
pub trait Entity: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Returns this entity's unique identity.
    fn id(&self) -> ObjectId;

    /// Re-identifies this entity under a new identity value.
    ///
    /// This is the only sanctioned identity mutation; it is intended for
    /// duplicating a record, not for rewriting a persisted one in place.
    fn set_id(&mut self, id: ObjectId);

    /// Returns the explicitly assigned creation timestamp, if any.
    ///
    /// Most entities never assign this; see [`Entity::effective_created_at`]
    /// for the derived value.
    fn created_at(&self) -> Option<DateTime>;

    /// Returns the modification timestamp.
    ///
    /// Advanced by every mutating repository operation through the update
    /// combinator; insert leaves it at whatever the constructor established.
    fn modified_at(&self) -> DateTime;

    /// Returns the name of the collection this entity belongs to.
    ///
    /// Defaults to the entity type's short name. Override for an explicit,
    /// store-facing name (e.g. "users").
    fn collection_name() -> &'static str {
        short_type_name::<Self>()
    }

    /// Returns the creation timestamp, deriving it from the identity's
    /// embedded creation instant when it was never explicitly assigned.
    fn effective_created_at(&self) -> DateTime {
        self.created_at()
            .unwrap_or_else(|| self.id().timestamp())
    }
}

/// Extension trait providing document conversion utilities for entities.
///
/// Automatically implemented for all types that implement [`Entity`].
pub trait EntityExt: Entity {
    /// Converts this entity to a BSON value for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn to_bson(&self) -> RepositoryResult<Bson>;

    /// Creates an entity from a BSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails or the structure is invalid.
    fn from_bson(bson: Bson) -> RepositoryResult<Self>;
}

impl<E: Entity> EntityExt for E {
    fn to_bson(&self) -> RepositoryResult<Bson> {
        Ok(serialize_to_bson(self)?)
    }

    fn from_bson(bson: Bson) -> RepositoryResult<Self> {
        Ok(deserialize_from_bson(bson)?)
    }
}

/// Returns the unqualified name of a type.
///
/// Used as the default collection name for entities that do not override
/// [`Entity::collection_name`].
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let name = std::any::type_name::<T>();

    name.rsplit("::").next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Note {
        #[serde(rename = "_id")]
        id: ObjectId,
        created_at: Option<DateTime>,
        modified_at: DateTime,
        body: String,
    }

    impl Entity for Note {
        fn id(&self) -> ObjectId {
            self.id
        }

        fn set_id(&mut self, id: ObjectId) {
            self.id = id;
        }

        fn created_at(&self) -> Option<DateTime> {
            self.created_at
        }

        fn modified_at(&self) -> DateTime {
            self.modified_at
        }
    }

    fn note() -> Note {
        Note {
            id: ObjectId::new(),
            created_at: None,
            modified_at: DateTime::now(),
            body: "hello".to_string(),
        }
    }

    #[test]
    fn created_at_derives_from_identity_when_unset() {
        let note = note();

        assert_eq!(note.effective_created_at(), note.id.timestamp());
    }

    #[test]
    fn explicit_created_at_wins_over_derivation() {
        let mut note = note();
        let explicit = DateTime::from_millis(0);
        note.created_at = Some(explicit);

        assert_eq!(note.effective_created_at(), explicit);
    }

    #[test]
    fn default_collection_name_is_short_type_name() {
        assert_eq!(Note::collection_name(), "Note");
    }

    #[test]
    fn re_identification_replaces_the_identity() {
        let mut note = note();
        let fresh = ObjectId::new();
        note.set_id(fresh);

        assert_eq!(note.id(), fresh);
    }

    #[test]
    fn bson_round_trip_preserves_fields() {
        let note = note();
        let restored = Note::from_bson(note.to_bson().unwrap()).unwrap();

        assert_eq!(restored.id, note.id);
        assert_eq!(restored.modified_at, note.modified_at);
        assert_eq!(restored.body, note.body);
    }
}
