use lodgebook_core::{
    Amenity, City, Entity, EntityKind, ObjectStore, Place, SqliteStore, State, StoreError, User,
};
use uuid::Uuid;

struct Seeded {
    state: State,
    city: City,
    user: User,
    place: Place,
    amenity: Amenity,
}

fn seed(store: &mut SqliteStore) -> Seeded {
    let state = State::new("Aragon");
    let city = City::new("Zaragoza", state.id);
    let user = User::new("ada@example.com", "secret");
    let amenity = Amenity::new("wifi");
    let mut place = Place::new("Stone Loft", city.id, user.id);
    place.description = Some("river view".to_string());
    place.number_rooms = 2;
    place.max_guest = 4;
    place.price_by_night = 80;
    place.latitude = Some(41.6488);
    place.longitude = Some(-0.8891);
    place.add_amenity(amenity.id);

    store.stage(Entity::State(state.clone())).unwrap();
    store.stage(Entity::City(city.clone())).unwrap();
    store.stage(Entity::User(user.clone())).unwrap();
    store.stage(Entity::Amenity(amenity.clone())).unwrap();
    store.stage(Entity::Place(place.clone())).unwrap();

    Seeded {
        state,
        city,
        user,
        place,
        amenity,
    }
}

#[test]
fn staged_entities_are_visible_before_commit() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let seeded = seed(&mut store);

    assert_eq!(
        store.get(EntityKind::City, seeded.city.id).unwrap(),
        Entity::City(seeded.city)
    );
    assert_eq!(store.all(EntityKind::Place).len(), 1);
}

fn snapshot(store: &SqliteStore) -> std::collections::BTreeMap<String, serde_json::Value> {
    EntityKind::ALL
        .iter()
        .flat_map(|kind| store.all(*kind))
        .map(|entity| {
            (
                entity.key(),
                serde_json::Value::Object(entity.to_record().unwrap()),
            )
        })
        .collect()
}

#[test]
fn save_reload_round_trips_every_record() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let seeded = seed(&mut store);
    store.save().unwrap();

    let pre = snapshot(&store);
    store.reload().unwrap();
    let post = snapshot(&store);
    assert_eq!(pre.len(), 5);
    assert_eq!(pre, post);

    let Entity::Place(place) = store.get(EntityKind::Place, seeded.place.id).unwrap() else {
        panic!("place missing after reload");
    };
    assert_eq!(place.amenity_ids, vec![seeded.amenity.id]);
    assert_eq!(place, seeded.place);
}

#[test]
fn unsaved_staging_does_not_survive_reload() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let seeded = seed(&mut store);

    store.reload().unwrap();
    assert!(store.get(EntityKind::State, seeded.state.id).is_none());
    for kind in EntityKind::ALL {
        assert!(store.all(kind).is_empty());
    }
}

#[test]
fn updates_flush_as_upserts() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let seeded = seed(&mut store);
    store.save().unwrap();

    let mut entity = store.get(EntityKind::State, seeded.state.id).unwrap();
    let patch = serde_json::json!({"name": "Navarre"});
    entity.apply_patch(patch.as_object().unwrap()).unwrap();
    entity.touch();
    store.stage(entity.clone()).unwrap();
    store.save().unwrap();
    store.reload().unwrap();

    let reloaded = store.get(EntityKind::State, seeded.state.id).unwrap();
    assert_eq!(reloaded, entity);
    assert_eq!(reloaded.created_at(), seeded.state.created_at);
    assert!(reloaded.updated_at() > seeded.state.updated_at);
}

#[test]
fn constraint_failure_rolls_back_the_whole_batch() {
    let mut store = SqliteStore::open_in_memory().unwrap();

    let state = State::new("Aragon");
    let orphan = City::new("Nowhere", Uuid::new_v4());
    store.stage(Entity::State(state.clone())).unwrap();
    store.stage(Entity::City(orphan)).unwrap();

    let err = store.save().unwrap_err();
    assert!(matches!(err, StoreError::Constraint(_)));

    // Durable state is untouched; the map reconciles via reload.
    store.reload().unwrap();
    assert!(store.all(EntityKind::State).is_empty());
    assert!(store.all(EntityKind::City).is_empty());
    assert!(store.get(EntityKind::State, state.id).is_none());
}

#[test]
fn delete_is_immediately_durable() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let seeded = seed(&mut store);
    store.save().unwrap();

    store.delete(EntityKind::Place, seeded.place.id).unwrap();
    assert!(store.get(EntityKind::Place, seeded.place.id).is_none());

    // No save in between: the row is already gone.
    store.reload().unwrap();
    assert!(store.get(EntityKind::Place, seeded.place.id).is_none());
}

#[test]
fn deleting_a_staged_only_entity_never_hits_a_row() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let state = State::new("Aragon");
    store.stage(Entity::State(state.clone())).unwrap();

    store.delete(EntityKind::State, state.id).unwrap();
    store.save().unwrap();
    store.reload().unwrap();
    assert!(store.all(EntityKind::State).is_empty());
}

#[test]
fn amenity_deletion_cascades_to_association_rows() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let seeded = seed(&mut store);
    store.save().unwrap();

    store.delete(EntityKind::Amenity, seeded.amenity.id).unwrap();

    let Entity::Place(place) = store.get(EntityKind::Place, seeded.place.id).unwrap() else {
        panic!("place disappeared");
    };
    assert!(place.amenity_ids.is_empty());

    store.reload().unwrap();
    let Entity::Place(place) = store.get(EntityKind::Place, seeded.place.id).unwrap() else {
        panic!("place missing after reload");
    };
    assert!(place.amenity_ids.is_empty());
}

#[test]
fn association_rows_follow_the_place_link_set() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let seeded = seed(&mut store);
    let second = Amenity::new("parking");
    store.stage(Entity::Amenity(second.clone())).unwrap();

    let Entity::Place(mut place) = store.get(EntityKind::Place, seeded.place.id).unwrap() else {
        panic!("place missing");
    };
    place.add_amenity(second.id);
    store.stage(Entity::Place(place)).unwrap();
    store.save().unwrap();
    store.reload().unwrap();

    let Entity::Place(mut place) = store.get(EntityKind::Place, seeded.place.id).unwrap() else {
        panic!("place missing after reload");
    };
    let mut expected = vec![seeded.amenity.id, second.id];
    expected.sort_unstable();
    assert_eq!(place.amenity_ids, expected);

    place.remove_amenity(seeded.amenity.id);
    store.stage(Entity::Place(place)).unwrap();
    store.save().unwrap();
    store.reload().unwrap();

    let Entity::Place(place) = store.get(EntityKind::Place, seeded.place.id).unwrap() else {
        panic!("place missing after second reload");
    };
    assert_eq!(place.amenity_ids, vec![second.id]);
}

#[test]
fn parents_with_dependents_refuse_deletion() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let seeded = seed(&mut store);
    store.save().unwrap();

    for (kind, id) in [
        (EntityKind::State, seeded.state.id),
        (EntityKind::City, seeded.city.id),
        (EntityKind::User, seeded.user.id),
    ] {
        let err = store.delete(kind, id).unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        assert!(store.get(kind, id).is_some());
    }
}

#[test]
fn identity_map_keeps_one_object_per_id() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let state = State::new("Aragon");
    let mut renamed = state.clone();
    renamed.name = "Navarre".to_string();

    store.stage(Entity::State(state.clone())).unwrap();
    store.stage(Entity::State(renamed.clone())).unwrap();
    store.save().unwrap();

    assert_eq!(store.all(EntityKind::State).len(), 1);
    assert_eq!(
        store.get(EntityKind::State, state.id).unwrap(),
        Entity::State(renamed)
    );
}

#[test]
fn operations_after_close_surface_closed() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    seed(&mut store);

    store.close().unwrap();
    store.close().unwrap();

    assert!(matches!(store.save(), Err(StoreError::Closed)));
    assert!(matches!(store.reload(), Err(StoreError::Closed)));
}
