//! User entity: account that owns places.

use crate::model::entity::{self, EntityId, ValidationError};
use crate::model::kind::EntityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl User {
    /// Creates a user with a fresh id and current timestamps.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        let now = entity::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            email: email.into(),
            password: password.into(),
            first_name: None,
            last_name: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.email.trim().is_empty() {
            return Err(ValidationError::MissingField {
                kind: EntityKind::User,
                field: "email",
            });
        }
        if self.password.is_empty() {
            return Err(ValidationError::MissingField {
                kind: EntityKind::User,
                field: "password",
            });
        }
        Ok(())
    }

    pub(crate) fn apply_field(&mut self, field: &str, value: &Value) -> Result<(), ValidationError> {
        match field {
            "email" => self.email = entity::expect_string(EntityKind::User, field, value)?,
            "password" => self.password = entity::expect_string(EntityKind::User, field, value)?,
            "first_name" => {
                self.first_name = entity::expect_opt_string(EntityKind::User, field, value)?;
            }
            "last_name" => {
                self.last_name = entity::expect_opt_string(EntityKind::User, field, value)?;
            }
            _ => return Err(entity::unknown_field(EntityKind::User, field)),
        }
        Ok(())
    }
}
