//! Storage backends and the polymorphic object-access contract.
//!
//! # Responsibility
//! - Define the `ObjectStore` contract both backends implement.
//! - Map backend faults onto one distinguishable error set.
//!
//! # Invariants
//! - Staged entities are visible to `get`/`all` before `save`.
//! - No persistence failure is swallowed; every fault surfaces as a
//!   `StoreError` variant the caller can map to a status.

use crate::config::StorageConfig;
use crate::db::DbError;
use crate::model::{Entity, EntityId, EntityKind, ValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod cache;
pub mod file;
pub mod sqlite;

pub use cache::ObjectCache;
pub use file::FileStore;
pub use sqlite::SqliteStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Error surface of the storage engine.
#[derive(Debug)]
pub enum StoreError {
    /// Required attribute missing or payload key invalid; nothing was
    /// staged or written.
    Validation(ValidationError),
    /// Requested (kind, id) is not present.
    NotFound { kind: EntityKind, id: EntityId },
    /// Foreign-key or uniqueness rule would be broken; durable state
    /// is unchanged.
    Constraint(String),
    /// File backend read/write fault; the document is left as last
    /// successfully written.
    Io {
        context: &'static str,
        source: std::io::Error,
    },
    /// Persisted document or record cannot be decoded.
    Malformed(String),
    /// Relational backend transport fault.
    Db(DbError),
    /// Operation issued after `close` released the connection.
    Closed,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} {id} not found"),
            Self::Constraint(message) => write!(f, "constraint violation: {message}"),
            Self::Io { context, source } => write!(f, "{context}: {source}"),
            Self::Malformed(message) => write!(f, "malformed stored data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Closed => f.write_str("storage backend is closed"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(code, message)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Constraint(message.unwrap_or_else(|| code.to_string()))
            }
            other => Self::Db(DbError::Sqlite(other)),
        }
    }
}

/// The uniform object-access contract over both backend variants.
pub trait ObjectStore {
    /// Every entity of `kind`, in identity-map insertion order.
    /// Never fails; empty when nothing of that kind exists.
    fn all(&self, kind: EntityKind) -> Vec<Entity>;

    /// One entity by (kind, id), staged or durable.
    fn get(&self, kind: EntityKind, id: EntityId) -> Option<Entity>;

    /// Validates and registers an entity in the identity map without
    /// persisting it. Re-staging an id overwrites the live object.
    fn stage(&mut self, entity: Entity) -> StoreResult<()>;

    /// Flushes staged state to durable storage as one logical batch.
    fn save(&mut self) -> StoreResult<()>;

    /// Removes an entity from the identity map. Durability of the
    /// removal is backend-specific; see each implementation.
    fn delete(&mut self, kind: EntityKind, id: EntityId) -> StoreResult<()>;

    /// Discards the identity map and rebuilds it from the durable
    /// source. A missing or empty source yields an empty map.
    fn reload(&mut self) -> StoreResult<()>;

    /// Releases backend resources. Idempotent.
    fn close(&mut self) -> StoreResult<()>;
}

/// The closed set of backend variants, selected once at process start.
#[derive(Debug)]
pub enum Storage {
    File(FileStore),
    Db(SqliteStore),
}

impl Storage {
    /// Builds the configured backend. Consumes configuration exactly
    /// once; callers pass the instance around by reference afterwards.
    pub fn open(config: &StorageConfig) -> StoreResult<Self> {
        match config {
            StorageConfig::File { path } => Ok(Self::File(FileStore::open(path)?)),
            StorageConfig::Db { path } => {
                if path.to_str() == Some(":memory:") {
                    Ok(Self::Db(SqliteStore::open_in_memory()?))
                } else {
                    Ok(Self::Db(SqliteStore::open(path)?))
                }
            }
        }
    }
}

impl ObjectStore for Storage {
    fn all(&self, kind: EntityKind) -> Vec<Entity> {
        match self {
            Self::File(store) => store.all(kind),
            Self::Db(store) => store.all(kind),
        }
    }

    fn get(&self, kind: EntityKind, id: EntityId) -> Option<Entity> {
        match self {
            Self::File(store) => store.get(kind, id),
            Self::Db(store) => store.get(kind, id),
        }
    }

    fn stage(&mut self, entity: Entity) -> StoreResult<()> {
        match self {
            Self::File(store) => store.stage(entity),
            Self::Db(store) => store.stage(entity),
        }
    }

    fn save(&mut self) -> StoreResult<()> {
        match self {
            Self::File(store) => store.save(),
            Self::Db(store) => store.save(),
        }
    }

    fn delete(&mut self, kind: EntityKind, id: EntityId) -> StoreResult<()> {
        match self {
            Self::File(store) => store.delete(kind, id),
            Self::Db(store) => store.delete(kind, id),
        }
    }

    fn reload(&mut self) -> StoreResult<()> {
        match self {
            Self::File(store) => store.reload(),
            Self::Db(store) => store.reload(),
        }
    }

    fn close(&mut self) -> StoreResult<()> {
        match self {
            Self::File(store) => store.close(),
            Self::Db(store) => store.close(),
        }
    }
}

/// Deletion policy shared by both backends: a parent with dependent
/// rows cannot be removed. Returns a human-readable description of the
/// blocking dependents, or `None` when deletion may proceed.
pub(crate) fn blocking_dependents(
    cache: &ObjectCache,
    kind: EntityKind,
    id: EntityId,
) -> Option<String> {
    let count = match kind {
        EntityKind::State => cache
            .enumerate(EntityKind::City)
            .iter()
            .filter(|entity| matches!(entity, Entity::City(city) if city.state_id == id))
            .count(),
        EntityKind::City => cache
            .enumerate(EntityKind::Place)
            .iter()
            .filter(|entity| matches!(entity, Entity::Place(place) if place.city_id == id))
            .count(),
        EntityKind::User => cache
            .enumerate(EntityKind::Place)
            .iter()
            .filter(|entity| matches!(entity, Entity::Place(place) if place.user_id == id))
            .count(),
        EntityKind::Place | EntityKind::Amenity => 0,
    };
    if count == 0 {
        None
    } else {
        Some(format!("{kind} {id} still has {count} dependent objects"))
    }
}

/// Drops a deleted amenity from every place's link set so derived
/// views stay consistent without waiting for a reload.
pub(crate) fn strip_amenity_links(cache: &mut ObjectCache, amenity_id: EntityId) {
    cache.for_each_mut(EntityKind::Place, |entity| {
        if let Entity::Place(place) = entity {
            place.remove_amenity(amenity_id);
        }
    });
}
