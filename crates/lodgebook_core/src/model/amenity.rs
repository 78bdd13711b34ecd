//! Amenity entity: linkable to places many-to-many.

use crate::model::entity::{self, EntityId, ValidationError};
use crate::model::kind::EntityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amenity {
    pub id: EntityId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
}

impl Amenity {
    pub fn new(name: impl Into<String>) -> Self {
        let now = entity::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            name: name.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField {
                kind: EntityKind::Amenity,
                field: "name",
            });
        }
        Ok(())
    }

    pub(crate) fn apply_field(&mut self, field: &str, value: &Value) -> Result<(), ValidationError> {
        match field {
            "name" => self.name = entity::expect_string(EntityKind::Amenity, field, value)?,
            _ => return Err(entity::unknown_field(EntityKind::Amenity, field)),
        }
        Ok(())
    }
}
