//! Shared entity identity, records and patch semantics.
//!
//! # Responsibility
//! - Define the `Entity` sum type persisted by every backend.
//! - Convert entities to/from flat attribute records.
//! - Enforce the reserved-key and strict-schema update rules.
//!
//! # Invariants
//! - Record serialization carries a `kind` discriminator field.
//! - `id` and `created_at` survive any patch unchanged.
//! - `touch` moves `updated_at` strictly forward, never backward.

use crate::model::amenity::Amenity;
use crate::model::city::City;
use crate::model::kind::EntityKind;
use crate::model::place::Place;
use crate::model::state::State;
use crate::model::user::User;
use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier shared by every entity kind.
///
/// One global namespace: a generated id never collides across kinds.
pub type EntityId = Uuid;

/// Attribute keys that updates may mention but never change.
const RESERVED_KEYS: [&str; 4] = ["id", "created_at", "updated_at", "kind"];

/// Validation failure raised before any backend call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingField {
        kind: EntityKind,
        field: &'static str,
    },
    UnknownField {
        kind: EntityKind,
        field: String,
    },
    InvalidValue {
        kind: EntityKind,
        field: String,
        expected: &'static str,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { kind, field } => {
                write!(f, "{kind} requires attribute `{field}`")
            }
            Self::UnknownField { kind, field } => {
                write!(f, "{kind} has no attribute `{field}`")
            }
            Self::InvalidValue {
                kind,
                field,
                expected,
            } => write!(f, "{kind} attribute `{field}` expects {expected}"),
        }
    }
}

impl Error for ValidationError {}

/// One persisted catalog object.
///
/// Internally tagged so the flat record form is the attribute map plus
/// a `kind` discriminator, matching the on-disk document values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Entity {
    State(State),
    City(City),
    Place(Place),
    User(User),
    Amenity(Amenity),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::State(_) => EntityKind::State,
            Self::City(_) => EntityKind::City,
            Self::Place(_) => EntityKind::Place,
            Self::User(_) => EntityKind::User,
            Self::Amenity(_) => EntityKind::Amenity,
        }
    }

    pub fn id(&self) -> EntityId {
        match self {
            Self::State(state) => state.id,
            Self::City(city) => city.id,
            Self::Place(place) => place.id,
            Self::User(user) => user.id,
            Self::Amenity(amenity) => amenity.id,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::State(state) => state.created_at,
            Self::City(city) => city.created_at,
            Self::Place(place) => place.created_at,
            Self::User(user) => user.created_at,
            Self::Amenity(amenity) => amenity.created_at,
        }
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        match self {
            Self::State(state) => state.updated_at,
            Self::City(city) => city.updated_at,
            Self::Place(place) => place.updated_at,
            Self::User(user) => user.updated_at,
            Self::Amenity(amenity) => amenity.updated_at,
        }
    }

    /// Document key of this entity: `<Kind>.<id>`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.kind(), self.id())
    }

    /// Refreshes `updated_at`, strictly greater than its previous value.
    pub fn touch(&mut self) {
        let next = next_timestamp(self.updated_at());
        match self {
            Self::State(state) => state.updated_at = next,
            Self::City(city) => city.updated_at = next,
            Self::Place(place) => place.updated_at = next,
            Self::User(user) => user.updated_at = next,
            Self::Amenity(amenity) => amenity.updated_at = next,
        }
    }

    /// Checks the required-attribute rules for this kind.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::State(state) => state.validate(),
            Self::City(city) => city.validate(),
            Self::Place(place) => place.validate(),
            Self::User(user) => user.validate(),
            Self::Amenity(amenity) => amenity.validate(),
        }
    }

    /// Applies an update payload.
    ///
    /// Reserved keys (`id`, `created_at`, `updated_at`, `kind`) are
    /// skipped without error; unknown keys and wrong-typed values are
    /// rejected and the entity is left unchanged on failure only for
    /// the offending key onward, so callers must discard the entity on
    /// error instead of persisting it.
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) -> Result<(), ValidationError> {
        for (field, value) in patch {
            if RESERVED_KEYS.contains(&field.as_str()) {
                continue;
            }
            match self {
                Self::State(state) => state.apply_field(field, value)?,
                Self::City(city) => city.apply_field(field, value)?,
                Self::Place(place) => place.apply_field(field, value)?,
                Self::User(user) => user.apply_field(field, value)?,
                Self::Amenity(amenity) => amenity.apply_field(field, value)?,
            }
        }
        self.validate()
    }

    /// Flat attribute record: declared attributes plus `id`,
    /// `created_at`, `updated_at` (RFC 3339 strings) plus `kind`.
    pub fn to_record(&self) -> serde_json::Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(serde::ser::Error::custom(format!(
                "entity serialized to non-object value {other}"
            ))),
        }
    }

    /// Rehydrates an entity from its flat record form.
    pub fn from_record(record: Value) -> serde_json::Result<Entity> {
        serde_json::from_value(record)
    }
}

/// Current time truncated to whole microseconds.
///
/// Sub-microsecond precision does not survive the RFC 3339 columns of
/// the relational backend, so it is dropped up front to keep records
/// byte-identical across save/reload on every backend.
pub(crate) fn now() -> DateTime<Utc> {
    let now = Utc::now();
    now.with_nanosecond(now.nanosecond() / 1_000 * 1_000)
        .unwrap_or(now)
}

fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let candidate = now();
    if candidate > previous {
        candidate
    } else {
        previous + Duration::microseconds(1)
    }
}

pub(crate) fn expect_string(
    kind: EntityKind,
    field: &str,
    value: &Value,
) -> Result<String, ValidationError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| ValidationError::InvalidValue {
            kind,
            field: field.to_string(),
            expected: "a string",
        })
}

pub(crate) fn expect_opt_string(
    kind: EntityKind,
    field: &str,
    value: &Value,
) -> Result<Option<String>, ValidationError> {
    if value.is_null() {
        return Ok(None);
    }
    expect_string(kind, field, value).map(Some)
}

pub(crate) fn expect_int(
    kind: EntityKind,
    field: &str,
    value: &Value,
) -> Result<i64, ValidationError> {
    value.as_i64().ok_or_else(|| ValidationError::InvalidValue {
        kind,
        field: field.to_string(),
        expected: "an integer",
    })
}

pub(crate) fn expect_opt_float(
    kind: EntityKind,
    field: &str,
    value: &Value,
) -> Result<Option<f64>, ValidationError> {
    if value.is_null() {
        return Ok(None);
    }
    value
        .as_f64()
        .map(Some)
        .ok_or_else(|| ValidationError::InvalidValue {
            kind,
            field: field.to_string(),
            expected: "a number",
        })
}

pub(crate) fn expect_id(
    kind: EntityKind,
    field: &str,
    value: &Value,
) -> Result<EntityId, ValidationError> {
    let text = expect_string(kind, field, value)?;
    Uuid::parse_str(&text).map_err(|_| ValidationError::InvalidValue {
        kind,
        field: field.to_string(),
        expected: "a uuid string",
    })
}

pub(crate) fn expect_id_list(
    kind: EntityKind,
    field: &str,
    value: &Value,
) -> Result<Vec<EntityId>, ValidationError> {
    let items = value
        .as_array()
        .ok_or_else(|| ValidationError::InvalidValue {
            kind,
            field: field.to_string(),
            expected: "a list of uuid strings",
        })?;
    items
        .iter()
        .map(|item| expect_id(kind, field, item))
        .collect()
}

pub(crate) fn unknown_field(kind: EntityKind, field: &str) -> ValidationError {
    ValidationError::UnknownField {
        kind,
        field: field.to_string(),
    }
}
