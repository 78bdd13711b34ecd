//! City entity: belongs to a state, owns places.

use crate::model::entity::{self, EntityId, ValidationError};
use crate::model::kind::EntityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub id: EntityId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
    /// Required back-reference to the owning state.
    pub state_id: EntityId,
}

impl City {
    /// Creates a city with a fresh id inside the given state.
    pub fn new(name: impl Into<String>, state_id: EntityId) -> Self {
        let now = entity::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            name: name.into(),
            state_id,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField {
                kind: EntityKind::City,
                field: "name",
            });
        }
        if self.state_id.is_nil() {
            return Err(ValidationError::MissingField {
                kind: EntityKind::City,
                field: "state_id",
            });
        }
        Ok(())
    }

    pub(crate) fn apply_field(&mut self, field: &str, value: &Value) -> Result<(), ValidationError> {
        match field {
            "name" => self.name = entity::expect_string(EntityKind::City, field, value)?,
            "state_id" => self.state_id = entity::expect_id(EntityKind::City, field, value)?,
            _ => return Err(entity::unknown_field(EntityKind::City, field)),
        }
        Ok(())
    }
}
