//! File-backed object store.
//!
//! # Responsibility
//! - Persist the whole identity map as one JSON document keyed
//!   `<Kind>.<id>`.
//! - Replace the document atomically on every save.
//!
//! # Invariants
//! - A crash mid-save never leaves a half-written document: writes go
//!   to a sibling temp file first, then rename over the target.
//! - Deletion is lazy-durable: gone from the map at once, gone from
//!   the document only at the next `save`.

use crate::model::{Entity, EntityId, EntityKind};
use crate::store::{
    blocking_dependents, strip_amenity_links, ObjectCache, ObjectStore, StoreError, StoreResult,
};
use log::{info, warn};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    cache: ObjectCache,
}

impl FileStore {
    /// Opens the store and loads the document into the identity map.
    ///
    /// A missing document is not an error; it yields an empty map.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let mut store = Self {
            path: path.into(),
            cache: ObjectCache::new(),
        };
        store.reload()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ObjectStore for FileStore {
    fn all(&self, kind: EntityKind) -> Vec<Entity> {
        self.cache.enumerate(kind).into_iter().cloned().collect()
    }

    fn get(&self, kind: EntityKind, id: EntityId) -> Option<Entity> {
        self.cache.lookup(kind, id).cloned()
    }

    fn stage(&mut self, entity: Entity) -> StoreResult<()> {
        entity.validate()?;
        self.cache.register(entity);
        Ok(())
    }

    fn save(&mut self) -> StoreResult<()> {
        let mut document = Map::new();
        for kind in EntityKind::ALL {
            for entity in self.cache.enumerate(kind) {
                let record = entity
                    .to_record()
                    .map_err(|err| StoreError::Malformed(err.to_string()))?;
                document.insert(entity.key(), Value::Object(record));
            }
        }

        let bytes = serde_json::to_vec_pretty(&Value::Object(document))
            .map_err(|err| StoreError::Malformed(err.to_string()))?;
        atomic_replace(&self.path, &bytes)?;

        info!(
            "event=store_save module=store backend=file status=ok objects={} path={}",
            self.cache.total(),
            self.path.display()
        );
        Ok(())
    }

    fn delete(&mut self, kind: EntityKind, id: EntityId) -> StoreResult<()> {
        if self.cache.lookup(kind, id).is_none() {
            return Err(StoreError::NotFound { kind, id });
        }
        if let Some(reason) = blocking_dependents(&self.cache, kind, id) {
            return Err(StoreError::Constraint(reason));
        }
        if kind == EntityKind::Amenity {
            strip_amenity_links(&mut self.cache, id);
        }
        self.cache.unregister(kind, id);
        info!("event=store_delete module=store backend=file status=ok kind={kind} id={id}");
        Ok(())
    }

    fn reload(&mut self) -> StoreResult<()> {
        self.cache.clear();

        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "event=store_reload module=store backend=file status=ok objects=0 path={}",
                    self.path.display()
                );
                return Ok(());
            }
            Err(err) => {
                return Err(StoreError::Io {
                    context: "failed to read store document",
                    source: err,
                })
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }

        let document: Value = serde_json::from_slice(&bytes)
            .map_err(|err| StoreError::Malformed(format!("store document: {err}")))?;
        let Value::Object(entries) = document else {
            return Err(StoreError::Malformed(
                "store document root is not an object".to_string(),
            ));
        };

        for (key, record) in entries {
            let entity = Entity::from_record(record)
                .map_err(|err| StoreError::Malformed(format!("record `{key}`: {err}")))?;
            if entity.key() != key {
                warn!(
                    "event=store_reload module=store backend=file status=warn reason=key_mismatch key={key} actual={}",
                    entity.key()
                );
            }
            self.cache.register(entity);
        }

        info!(
            "event=store_reload module=store backend=file status=ok objects={} path={}",
            self.cache.total(),
            self.path.display()
        );
        Ok(())
    }

    fn close(&mut self) -> StoreResult<()> {
        // No retained handle; the document is reopened per save/reload.
        Ok(())
    }
}

/// Writes `bytes` to `target` through a sibling temp file + rename so
/// a crash cannot leave a truncated document behind.
fn atomic_replace(target: &Path, bytes: &[u8]) -> StoreResult<()> {
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| StoreError::Io {
                context: "failed to create store directory",
                source: err,
            })?;
        }
    }

    let temp_path = target.with_extension("tmp");
    fs::write(&temp_path, bytes).map_err(|err| StoreError::Io {
        context: "failed to write store temp file",
        source: err,
    })?;
    fs::rename(&temp_path, target).map_err(|err| StoreError::Io {
        context: "failed to replace store document",
        source: err,
    })?;
    Ok(())
}
