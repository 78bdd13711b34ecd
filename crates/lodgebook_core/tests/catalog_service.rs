use lodgebook_core::{
    Amenity, CatalogService, City, Entity, EntityKind, Place, PlacesQuery, SqliteStore, State,
    StoreError, User,
};
use serde_json::json;
use uuid::Uuid;

fn service() -> CatalogService<SqliteStore> {
    CatalogService::new(SqliteStore::open_in_memory().unwrap())
}

fn patch(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    value.as_object().unwrap().clone()
}

struct Seeded {
    city_id: Uuid,
    user_id: Uuid,
    place_id: Uuid,
    amenity_id: Uuid,
}

fn seed(service: &mut CatalogService<SqliteStore>) -> Seeded {
    let state = State::new("Aragon");
    let state_id = service.create(Entity::State(state)).unwrap();
    let city = City::new("Zaragoza", state_id);
    let city_id = service.create(Entity::City(city)).unwrap();
    let user_id = service
        .create(Entity::User(User::new("ada@example.com", "secret")))
        .unwrap();
    let amenity_id = service.create(Entity::Amenity(Amenity::new("wifi"))).unwrap();
    let place_id = service
        .create(Entity::Place(Place::new("Stone Loft", city_id, user_id)))
        .unwrap();
    Seeded {
        city_id,
        user_id,
        place_id,
        amenity_id,
    }
}

#[test]
fn create_then_fetch_round_trips() {
    let mut service = service();
    let seeded = seed(&mut service);

    let entity = service.fetch(EntityKind::Place, seeded.place_id).unwrap();
    assert_eq!(entity.id(), seeded.place_id);
    assert_eq!(service.list(EntityKind::Place).len(), 1);
}

#[test]
fn fetch_unknown_id_is_not_found() {
    let service = service();
    let err = service.fetch(EntityKind::User, Uuid::new_v4()).unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[test]
fn create_rejects_invalid_entities_before_persisting() {
    let mut service = service();
    let err = service
        .create(Entity::Place(Place::new("", Uuid::new_v4(), Uuid::new_v4())))
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert!(service.list(EntityKind::Place).is_empty());
}

#[test]
fn update_applies_patch_and_refreshes_updated_at() {
    let mut service = service();
    let seeded = seed(&mut service);
    let before = service.fetch(EntityKind::Place, seeded.place_id).unwrap();

    let updated = service
        .update(
            EntityKind::Place,
            seeded.place_id,
            &patch(json!({
                "id": Uuid::new_v4().to_string(),
                "created_at": "1999-01-01T00:00:00Z",
                "name": "River Loft",
                "price_by_night": 95
            })),
        )
        .unwrap();

    assert_eq!(updated.id(), seeded.place_id);
    assert_eq!(updated.created_at(), before.created_at());
    assert!(updated.updated_at() > before.updated_at());
    match &updated {
        Entity::Place(place) => {
            assert_eq!(place.name, "River Loft");
            assert_eq!(place.price_by_night, 95);
        }
        other => panic!("unexpected entity {other:?}"),
    }
}

#[test]
fn update_with_unknown_key_changes_nothing() {
    let mut service = service();
    let seeded = seed(&mut service);
    let before = service.fetch(EntityKind::Place, seeded.place_id).unwrap();

    let err = service
        .update(
            EntityKind::Place,
            seeded.place_id,
            &patch(json!({"stars": 5})),
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert_eq!(
        service.fetch(EntityKind::Place, seeded.place_id).unwrap(),
        before
    );
}

#[test]
fn destroy_makes_the_entity_unfetchable() {
    let mut service = service();
    let seeded = seed(&mut service);

    service.destroy(EntityKind::Place, seeded.place_id).unwrap();
    let err = service.fetch(EntityKind::Place, seeded.place_id).unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[test]
fn amenity_links_drive_place_views_and_search() {
    let mut service = service();
    let seeded = seed(&mut service);

    service
        .link_amenity(seeded.place_id, seeded.amenity_id)
        .unwrap();
    // Linking twice stays a no-op.
    service
        .link_amenity(seeded.place_id, seeded.amenity_id)
        .unwrap();

    let amenities = service.amenities_of_place(seeded.place_id);
    assert_eq!(amenities.len(), 1);
    assert_eq!(amenities[0].id, seeded.amenity_id);

    let hits = service.search(&PlacesQuery {
        amenities: vec![seeded.amenity_id],
        ..PlacesQuery::default()
    });
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, seeded.place_id);

    service
        .unlink_amenity(seeded.place_id, seeded.amenity_id)
        .unwrap();
    assert!(service.amenities_of_place(seeded.place_id).is_empty());

    let err = service
        .unlink_amenity(seeded.place_id, seeded.amenity_id)
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[test]
fn link_amenity_requires_an_existing_amenity() {
    let mut service = service();
    let seeded = seed(&mut service);

    let err = service
        .link_amenity(seeded.place_id, Uuid::new_v4())
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::NotFound {
            kind: EntityKind::Amenity,
            ..
        }
    ));
}

#[test]
fn relationship_passthroughs_match_the_resolver() {
    let mut service = service();
    let seeded = seed(&mut service);

    assert_eq!(service.places_of_city(seeded.city_id).len(), 1);
    assert_eq!(service.places_of_user(seeded.user_id).len(), 1);
}
