//! Catalog use-case service.
//!
//! # Responsibility
//! - Provide stable CRUD entry points over any storage backend.
//! - Own the create/update/destroy flows, including the reserved-key
//!   update rule and the amenity link operations.
//!
//! # Invariants
//! - Validation runs before any backend call; nothing partial is ever
//!   visible through `fetch`/`list` after a rejected operation.
//! - Every successful mutation refreshes the entity's `updated_at`.

use crate::model::{Entity, EntityId, EntityKind, Place};
use crate::relations;
use crate::search::{search_places, PlacesQuery};
use crate::store::{ObjectStore, StoreError, StoreResult};
use serde_json::{Map, Value};

/// Use-case wrapper over the active storage backend.
pub struct CatalogService<S: ObjectStore> {
    store: S,
}

impl<S: ObjectStore> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Stages and persists a freshly constructed entity.
    pub fn create(&mut self, entity: Entity) -> StoreResult<EntityId> {
        let id = entity.id();
        self.store.stage(entity)?;
        self.store.save()?;
        Ok(id)
    }

    /// Fetches one entity, mapping absence to `NotFound`.
    pub fn fetch(&self, kind: EntityKind, id: EntityId) -> StoreResult<Entity> {
        self.store
            .get(kind, id)
            .ok_or(StoreError::NotFound { kind, id })
    }

    pub fn list(&self, kind: EntityKind) -> Vec<Entity> {
        self.store.all(kind)
    }

    /// Applies an update payload and persists the result.
    ///
    /// Reserved keys in the payload are ignored without error; unknown
    /// keys reject the whole update before anything is staged.
    pub fn update(
        &mut self,
        kind: EntityKind,
        id: EntityId,
        patch: &Map<String, Value>,
    ) -> StoreResult<Entity> {
        let mut entity = self.fetch(kind, id)?;
        entity.apply_patch(patch)?;
        entity.touch();
        self.store.stage(entity.clone())?;
        self.store.save()?;
        Ok(entity)
    }

    /// Deletes one entity and flushes, so the removal is durable on
    /// the file backend too.
    pub fn destroy(&mut self, kind: EntityKind, id: EntityId) -> StoreResult<()> {
        self.store.delete(kind, id)?;
        self.store.save()
    }

    /// Links an amenity to a place. Linking twice is a no-op.
    pub fn link_amenity(&mut self, place_id: EntityId, amenity_id: EntityId) -> StoreResult<()> {
        if self.store.get(EntityKind::Amenity, amenity_id).is_none() {
            return Err(StoreError::NotFound {
                kind: EntityKind::Amenity,
                id: amenity_id,
            });
        }
        let mut place = self.fetch_place(place_id)?;
        if !place.add_amenity(amenity_id) {
            return Ok(());
        }
        self.persist_place(place)
    }

    /// Unlinks an amenity from a place; absent links are `NotFound`.
    pub fn unlink_amenity(&mut self, place_id: EntityId, amenity_id: EntityId) -> StoreResult<()> {
        let mut place = self.fetch_place(place_id)?;
        if !place.remove_amenity(amenity_id) {
            return Err(StoreError::NotFound {
                kind: EntityKind::Amenity,
                id: amenity_id,
            });
        }
        self.persist_place(place)
    }

    pub fn cities_of_state(&self, state_id: EntityId) -> Vec<crate::model::City> {
        relations::state_cities(&self.store, state_id)
    }

    pub fn places_of_city(&self, city_id: EntityId) -> Vec<Place> {
        relations::city_places(&self.store, city_id)
    }

    pub fn places_of_user(&self, user_id: EntityId) -> Vec<Place> {
        relations::user_places(&self.store, user_id)
    }

    pub fn amenities_of_place(&self, place_id: EntityId) -> Vec<crate::model::Amenity> {
        relations::place_amenities(&self.store, place_id)
    }

    pub fn search(&self, query: &PlacesQuery) -> Vec<Place> {
        search_places(&self.store, query)
    }

    fn fetch_place(&self, place_id: EntityId) -> StoreResult<Place> {
        match self.fetch(EntityKind::Place, place_id)? {
            Entity::Place(place) => Ok(place),
            _ => Err(StoreError::NotFound {
                kind: EntityKind::Place,
                id: place_id,
            }),
        }
    }

    fn persist_place(&mut self, place: Place) -> StoreResult<()> {
        let mut entity = Entity::Place(place);
        entity.touch();
        self.store.stage(entity)?;
        self.store.save()
    }
}
