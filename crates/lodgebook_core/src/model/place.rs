//! Place entity: a rentable listing inside a city.
//!
//! # Invariants
//! - `city_id` and `user_id` are required back-references.
//! - `amenity_ids` is kept sorted and deduplicated so the record form
//!   is identical no matter which backend reloaded it.

use crate::model::entity::{self, EntityId, ValidationError};
use crate::model::kind::EntityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: EntityId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
    pub city_id: EntityId,
    pub user_id: EntityId,
    pub description: Option<String>,
    pub address: Option<String>,
    pub number_rooms: i64,
    pub number_bathrooms: i64,
    pub max_guest: i64,
    pub price_by_night: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Linked amenity ids, the many-to-many association as seen from
    /// this side. The relational backend mirrors it to link rows.
    pub amenity_ids: Vec<EntityId>,
}

impl Place {
    /// Creates a place with a fresh id owned by `user_id` in `city_id`.
    ///
    /// Counts and price start at zero; optional attributes start unset.
    pub fn new(name: impl Into<String>, city_id: EntityId, user_id: EntityId) -> Self {
        let now = entity::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            name: name.into(),
            city_id,
            user_id,
            description: None,
            address: None,
            number_rooms: 0,
            number_bathrooms: 0,
            max_guest: 0,
            price_by_night: 0,
            latitude: None,
            longitude: None,
            amenity_ids: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField {
                kind: EntityKind::Place,
                field: "name",
            });
        }
        if self.city_id.is_nil() {
            return Err(ValidationError::MissingField {
                kind: EntityKind::Place,
                field: "city_id",
            });
        }
        if self.user_id.is_nil() {
            return Err(ValidationError::MissingField {
                kind: EntityKind::Place,
                field: "user_id",
            });
        }
        Ok(())
    }

    /// Replaces the amenity link set, normalized to sorted unique ids.
    pub fn set_amenities(&mut self, mut ids: Vec<EntityId>) {
        ids.sort_unstable();
        ids.dedup();
        self.amenity_ids = ids;
    }

    /// Adds one amenity link. Returns `false` when already linked.
    pub fn add_amenity(&mut self, amenity_id: EntityId) -> bool {
        if self.amenity_ids.contains(&amenity_id) {
            return false;
        }
        self.amenity_ids.push(amenity_id);
        self.amenity_ids.sort_unstable();
        true
    }

    /// Removes one amenity link. Returns `false` when it was absent.
    pub fn remove_amenity(&mut self, amenity_id: EntityId) -> bool {
        let before = self.amenity_ids.len();
        self.amenity_ids.retain(|id| *id != amenity_id);
        self.amenity_ids.len() != before
    }

    /// Whether this place carries every amenity in `required`.
    pub fn has_all_amenities(&self, required: &[EntityId]) -> bool {
        required.iter().all(|id| self.amenity_ids.contains(id))
    }

    pub(crate) fn apply_field(&mut self, field: &str, value: &Value) -> Result<(), ValidationError> {
        let kind = EntityKind::Place;
        match field {
            "name" => self.name = entity::expect_string(kind, field, value)?,
            "city_id" => self.city_id = entity::expect_id(kind, field, value)?,
            "user_id" => self.user_id = entity::expect_id(kind, field, value)?,
            "description" => self.description = entity::expect_opt_string(kind, field, value)?,
            "address" => self.address = entity::expect_opt_string(kind, field, value)?,
            "number_rooms" => self.number_rooms = entity::expect_int(kind, field, value)?,
            "number_bathrooms" => self.number_bathrooms = entity::expect_int(kind, field, value)?,
            "max_guest" => self.max_guest = entity::expect_int(kind, field, value)?,
            "price_by_night" => self.price_by_night = entity::expect_int(kind, field, value)?,
            "latitude" => self.latitude = entity::expect_opt_float(kind, field, value)?,
            "longitude" => self.longitude = entity::expect_opt_float(kind, field, value)?,
            "amenity_ids" => {
                let ids = entity::expect_id_list(kind, field, value)?;
                self.set_amenities(ids);
            }
            _ => return Err(entity::unknown_field(kind, field)),
        }
        Ok(())
    }
}
