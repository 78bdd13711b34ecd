//! Relational object store over SQLite.
//!
//! # Responsibility
//! - Map each entity kind to a table row set keyed by id, plus the
//!   `place_amenity` association table.
//! - Keep the identity map and a dirty set; flush all pending writes
//!   in one transaction per `save`.
//!
//! # Invariants
//! - A constraint failure rolls the whole save transaction back and
//!   leaves durable state unchanged; the identity map then disagrees
//!   with the database until `reload` reconciles it.
//! - `delete` is immediately durable and cascades only to the
//!   association table.

use crate::db::{self, DbError};
use crate::model::{Amenity, City, Entity, EntityId, EntityKind, Place, State, User};
use crate::store::{
    blocking_dependents, strip_amenity_links, ObjectCache, ObjectStore, StoreError, StoreResult,
};
use chrono::{DateTime, SecondsFormat, Utc};
use log::info;
use rusqlite::{params, Connection, Row, Transaction};
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

/// Parents flush before children so foreign keys hold mid-transaction.
const FLUSH_ORDER: [EntityKind; 5] = [
    EntityKind::State,
    EntityKind::User,
    EntityKind::City,
    EntityKind::Amenity,
    EntityKind::Place,
];

#[derive(Debug)]
pub struct SqliteStore {
    conn: Option<Connection>,
    cache: ObjectCache,
    dirty: Vec<(EntityKind, EntityId)>,
}

impl SqliteStore {
    /// Opens a database file and loads the identity map from it.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::from_connection(db::open_db(path)?)
    }

    /// In-memory variant used by tests and ephemeral runs.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(db::open_db_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        let mut store = Self {
            conn: Some(conn),
            cache: ObjectCache::new(),
            dirty: Vec::new(),
        };
        store.reload()?;
        Ok(store)
    }

    fn mark_dirty(&mut self, kind: EntityKind, id: EntityId) {
        if !self.dirty.contains(&(kind, id)) {
            self.dirty.push((kind, id));
        }
    }
}

impl ObjectStore for SqliteStore {
    fn all(&self, kind: EntityKind) -> Vec<Entity> {
        self.cache.enumerate(kind).into_iter().cloned().collect()
    }

    fn get(&self, kind: EntityKind, id: EntityId) -> Option<Entity> {
        self.cache.lookup(kind, id).cloned()
    }

    fn stage(&mut self, entity: Entity) -> StoreResult<()> {
        entity.validate()?;
        let kind = entity.kind();
        let id = entity.id();
        self.cache.register(entity);
        self.mark_dirty(kind, id);
        Ok(())
    }

    fn save(&mut self) -> StoreResult<()> {
        let conn = self.conn.as_mut().ok_or(StoreError::Closed)?;
        if self.dirty.is_empty() {
            return Ok(());
        }

        let tx = conn.transaction()?;
        let mut flushed = 0usize;
        for kind in FLUSH_ORDER {
            for (dirty_kind, id) in &self.dirty {
                if *dirty_kind != kind {
                    continue;
                }
                // A dirty id can be missing when the entity was staged
                // and then deleted before this save ran.
                let Some(entity) = self.cache.lookup(kind, *id) else {
                    continue;
                };
                upsert_entity(&tx, entity)?;
                if let Entity::Place(place) = entity {
                    replace_place_links(&tx, place)?;
                }
                flushed += 1;
            }
        }
        tx.commit()?;

        self.dirty.clear();
        info!("event=store_save module=store backend=db status=ok flushed={flushed}");
        Ok(())
    }

    fn delete(&mut self, kind: EntityKind, id: EntityId) -> StoreResult<()> {
        if self.cache.lookup(kind, id).is_none() {
            return Err(StoreError::NotFound { kind, id });
        }
        if let Some(reason) = blocking_dependents(&self.cache, kind, id) {
            return Err(StoreError::Constraint(reason));
        }

        let conn = self.conn.as_ref().ok_or(StoreError::Closed)?;
        // Association rows go with the entity via ON DELETE CASCADE.
        conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1;", table_name(kind)),
            [id.to_string()],
        )?;

        if kind == EntityKind::Amenity {
            strip_amenity_links(&mut self.cache, id);
        }
        self.dirty
            .retain(|(dirty_kind, dirty_id)| !(*dirty_kind == kind && *dirty_id == id));
        self.cache.unregister(kind, id);
        info!("event=store_delete module=store backend=db status=ok kind={kind} id={id}");
        Ok(())
    }

    fn reload(&mut self) -> StoreResult<()> {
        let conn = self.conn.as_ref().ok_or(StoreError::Closed)?;

        let mut cache = ObjectCache::new();
        load_states(conn, &mut cache)?;
        load_users(conn, &mut cache)?;
        load_cities(conn, &mut cache)?;
        load_amenities(conn, &mut cache)?;
        load_places(conn, &mut cache)?;

        self.cache = cache;
        self.dirty.clear();
        info!(
            "event=store_reload module=store backend=db status=ok objects={}",
            self.cache.total()
        );
        Ok(())
    }

    fn close(&mut self) -> StoreResult<()> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .map_err(|(_, err)| StoreError::Db(DbError::Sqlite(err)))?;
        }
        Ok(())
    }
}

fn table_name(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::State => "states",
        EntityKind::City => "cities",
        EntityKind::Place => "places",
        EntityKind::User => "users",
        EntityKind::Amenity => "amenities",
    }
}

fn ts_to_sql(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(value: &str, column: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| StoreError::Malformed(format!("invalid timestamp `{value}` in {column}")))
}

fn parse_id(value: &str, column: &str) -> StoreResult<EntityId> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::Malformed(format!("invalid uuid `{value}` in {column}")))
}

fn upsert_entity(tx: &Transaction<'_>, entity: &Entity) -> StoreResult<()> {
    match entity {
        Entity::State(state) => {
            tx.execute(
                "INSERT INTO states (id, created_at, updated_at, name)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    updated_at = excluded.updated_at,
                    name = excluded.name;",
                params![
                    state.id.to_string(),
                    ts_to_sql(state.created_at),
                    ts_to_sql(state.updated_at),
                    state.name.as_str(),
                ],
            )?;
        }
        Entity::User(user) => {
            tx.execute(
                "INSERT INTO users (id, created_at, updated_at, email, password, first_name, last_name)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    updated_at = excluded.updated_at,
                    email = excluded.email,
                    password = excluded.password,
                    first_name = excluded.first_name,
                    last_name = excluded.last_name;",
                params![
                    user.id.to_string(),
                    ts_to_sql(user.created_at),
                    ts_to_sql(user.updated_at),
                    user.email.as_str(),
                    user.password.as_str(),
                    user.first_name.as_deref(),
                    user.last_name.as_deref(),
                ],
            )?;
        }
        Entity::City(city) => {
            tx.execute(
                "INSERT INTO cities (id, created_at, updated_at, name, state_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    updated_at = excluded.updated_at,
                    name = excluded.name,
                    state_id = excluded.state_id;",
                params![
                    city.id.to_string(),
                    ts_to_sql(city.created_at),
                    ts_to_sql(city.updated_at),
                    city.name.as_str(),
                    city.state_id.to_string(),
                ],
            )?;
        }
        Entity::Amenity(amenity) => {
            tx.execute(
                "INSERT INTO amenities (id, created_at, updated_at, name)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    updated_at = excluded.updated_at,
                    name = excluded.name;",
                params![
                    amenity.id.to_string(),
                    ts_to_sql(amenity.created_at),
                    ts_to_sql(amenity.updated_at),
                    amenity.name.as_str(),
                ],
            )?;
        }
        Entity::Place(place) => {
            tx.execute(
                "INSERT INTO places (
                    id, created_at, updated_at, name, city_id, user_id,
                    description, address, number_rooms, number_bathrooms,
                    max_guest, price_by_night, latitude, longitude)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                 ON CONFLICT(id) DO UPDATE SET
                    updated_at = excluded.updated_at,
                    name = excluded.name,
                    city_id = excluded.city_id,
                    user_id = excluded.user_id,
                    description = excluded.description,
                    address = excluded.address,
                    number_rooms = excluded.number_rooms,
                    number_bathrooms = excluded.number_bathrooms,
                    max_guest = excluded.max_guest,
                    price_by_night = excluded.price_by_night,
                    latitude = excluded.latitude,
                    longitude = excluded.longitude;",
                params![
                    place.id.to_string(),
                    ts_to_sql(place.created_at),
                    ts_to_sql(place.updated_at),
                    place.name.as_str(),
                    place.city_id.to_string(),
                    place.user_id.to_string(),
                    place.description.as_deref(),
                    place.address.as_deref(),
                    place.number_rooms,
                    place.number_bathrooms,
                    place.max_guest,
                    place.price_by_night,
                    place.latitude,
                    place.longitude,
                ],
            )?;
        }
    }
    Ok(())
}

/// Replaces the whole amenity link set of one place inside the save
/// transaction.
fn replace_place_links(tx: &Transaction<'_>, place: &Place) -> StoreResult<()> {
    tx.execute(
        "DELETE FROM place_amenity WHERE place_id = ?1;",
        [place.id.to_string()],
    )?;
    for amenity_id in &place.amenity_ids {
        tx.execute(
            "INSERT INTO place_amenity (place_id, amenity_id) VALUES (?1, ?2);",
            params![place.id.to_string(), amenity_id.to_string()],
        )?;
    }
    Ok(())
}

fn base_columns(row: &Row<'_>, table: &str) -> StoreResult<(EntityId, DateTime<Utc>, DateTime<Utc>)> {
    let id_text: String = row.get("id")?;
    let created_text: String = row.get("created_at")?;
    let updated_text: String = row.get("updated_at")?;
    Ok((
        parse_id(&id_text, table)?,
        parse_ts(&created_text, table)?,
        parse_ts(&updated_text, table)?,
    ))
}

fn load_states(conn: &Connection, cache: &mut ObjectCache) -> StoreResult<()> {
    let mut stmt = conn.prepare(
        "SELECT id, created_at, updated_at, name
         FROM states ORDER BY created_at, id;",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let (id, created_at, updated_at) = base_columns(row, "states")?;
        cache.register(Entity::State(State {
            id,
            created_at,
            updated_at,
            name: row.get("name")?,
        }));
    }
    Ok(())
}

fn load_users(conn: &Connection, cache: &mut ObjectCache) -> StoreResult<()> {
    let mut stmt = conn.prepare(
        "SELECT id, created_at, updated_at, email, password, first_name, last_name
         FROM users ORDER BY created_at, id;",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let (id, created_at, updated_at) = base_columns(row, "users")?;
        cache.register(Entity::User(User {
            id,
            created_at,
            updated_at,
            email: row.get("email")?,
            password: row.get("password")?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
        }));
    }
    Ok(())
}

fn load_cities(conn: &Connection, cache: &mut ObjectCache) -> StoreResult<()> {
    let mut stmt = conn.prepare(
        "SELECT id, created_at, updated_at, name, state_id
         FROM cities ORDER BY created_at, id;",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let (id, created_at, updated_at) = base_columns(row, "cities")?;
        let state_text: String = row.get("state_id")?;
        cache.register(Entity::City(City {
            id,
            created_at,
            updated_at,
            name: row.get("name")?,
            state_id: parse_id(&state_text, "cities.state_id")?,
        }));
    }
    Ok(())
}

fn load_amenities(conn: &Connection, cache: &mut ObjectCache) -> StoreResult<()> {
    let mut stmt = conn.prepare(
        "SELECT id, created_at, updated_at, name
         FROM amenities ORDER BY created_at, id;",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let (id, created_at, updated_at) = base_columns(row, "amenities")?;
        cache.register(Entity::Amenity(Amenity {
            id,
            created_at,
            updated_at,
            name: row.get("name")?,
        }));
    }
    Ok(())
}

fn load_places(conn: &Connection, cache: &mut ObjectCache) -> StoreResult<()> {
    let mut links: HashMap<EntityId, Vec<EntityId>> = HashMap::new();
    {
        let mut stmt = conn.prepare(
            "SELECT place_id, amenity_id FROM place_amenity
             ORDER BY place_id, amenity_id;",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let place_text: String = row.get("place_id")?;
            let amenity_text: String = row.get("amenity_id")?;
            links
                .entry(parse_id(&place_text, "place_amenity.place_id")?)
                .or_default()
                .push(parse_id(&amenity_text, "place_amenity.amenity_id")?);
        }
    }

    let mut stmt = conn.prepare(
        "SELECT id, created_at, updated_at, name, city_id, user_id,
                description, address, number_rooms, number_bathrooms,
                max_guest, price_by_night, latitude, longitude
         FROM places ORDER BY created_at, id;",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let (id, created_at, updated_at) = base_columns(row, "places")?;
        let city_text: String = row.get("city_id")?;
        let user_text: String = row.get("user_id")?;
        let mut place = Place {
            id,
            created_at,
            updated_at,
            name: row.get("name")?,
            city_id: parse_id(&city_text, "places.city_id")?,
            user_id: parse_id(&user_text, "places.user_id")?,
            description: row.get("description")?,
            address: row.get("address")?,
            number_rooms: row.get("number_rooms")?,
            number_bathrooms: row.get("number_bathrooms")?,
            max_guest: row.get("max_guest")?,
            price_by_night: row.get("price_by_night")?,
            latitude: row.get("latitude")?,
            longitude: row.get("longitude")?,
            amenity_ids: Vec::new(),
        };
        place.set_amenities(links.remove(&id).unwrap_or_default());
        cache.register(Entity::Place(place));
    }
    Ok(())
}
