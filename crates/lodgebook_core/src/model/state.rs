//! State entity: top of the geography hierarchy.

use crate::model::entity::{self, EntityId, ValidationError};
use crate::model::kind::EntityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A state owning zero or more cities.
///
/// Cities hold the `state_id` back-reference; the state itself stores
/// no child list, child views are computed by the relationship
/// resolver against the active backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub id: EntityId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
}

impl State {
    /// Creates a state with a fresh id and current timestamps.
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
                kind: EntityKind::State,
                field: "name",
            });
        }
        Ok(())
    }

    pub(crate) fn apply_field(&mut self, field: &str, value: &Value) -> Result<(), ValidationError> {
        match field {
            "name" => self.name = entity::expect_string(EntityKind::State, field, value)?,
            _ => return Err(entity::unknown_field(EntityKind::State, field)),
        }
        Ok(())
    }
}
