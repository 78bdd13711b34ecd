//! Scoped place search.
//!
//! # Responsibility
//! - Expand state/city filters into a deduplicated place set.
//! - Narrow by amenity superset when amenity ids are given.
//!
//! # Invariants
//! - An empty filter payload returns every place.
//! - Result order is first-seen order: state expansion first, then
//!   explicit cities, then amenity narrowing.

use crate::model::{Entity, EntityId, EntityKind, Place};
use crate::relations;
use crate::store::ObjectStore;
use log::debug;
use std::collections::HashSet;

/// Optional id filters for [`search_places`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacesQuery {
    /// State ids whose member cities' places are included.
    pub states: Vec<EntityId>,
    /// City ids whose places are included.
    pub cities: Vec<EntityId>,
    /// Amenity ids every returned place must carry, all of them.
    pub amenities: Vec<EntityId>,
}

impl PlacesQuery {
    pub fn is_empty(&self) -> bool {
        self.states.is_empty() && self.cities.is_empty() && self.amenities.is_empty()
    }
}

/// Searches places by optional state, city and amenity id sets.
pub fn search_places<S: ObjectStore + ?Sized>(store: &S, query: &PlacesQuery) -> Vec<Place> {
    let mut seen: HashSet<EntityId> = HashSet::new();
    let mut results: Vec<Place> = Vec::new();

    if query.states.is_empty() && query.cities.is_empty() {
        for entity in store.all(EntityKind::Place) {
            if let Entity::Place(place) = entity {
                if seen.insert(place.id) {
                    results.push(place);
                }
            }
        }
    } else {
        for state_id in &query.states {
            for city in relations::state_cities(store, *state_id) {
                for place in relations::city_places(store, city.id) {
                    if seen.insert(place.id) {
                        results.push(place);
                    }
                }
            }
        }
        for city_id in &query.cities {
            for place in relations::city_places(store, *city_id) {
                if seen.insert(place.id) {
                    results.push(place);
                }
            }
        }
    }

    if !query.amenities.is_empty() {
        results.retain(|place| place.has_all_amenities(&query.amenities));
    }

    debug!(
        "event=places_search module=search status=ok states={} cities={} amenities={} hits={}",
        query.states.len(),
        query.cities.len(),
        query.amenities.len(),
        results.len()
    );
    results
}
