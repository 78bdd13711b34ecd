use chrono::DateTime;
use lodgebook_core::{Amenity, City, Entity, EntityKind, Place, State, User, ValidationError};
use serde_json::json;
use uuid::Uuid;

fn patch(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    value.as_object().expect("patch must be an object").clone()
}

#[test]
fn new_entities_get_identity_and_timestamps() {
    let state = State::new("Aragon");
    assert!(!state.id.is_nil());
    assert_eq!(state.created_at, state.updated_at);

    let user = User::new("ada@example.com", "secret");
    assert!(user.first_name.is_none());
    assert_ne!(state.id, user.id);
}

#[test]
fn record_carries_kind_and_rfc3339_timestamps() {
    let entity = Entity::State(State::new("Aragon"));
    let record = entity.to_record().unwrap();

    assert_eq!(record["kind"], json!("State"));
    assert_eq!(record["id"], json!(entity.id().to_string()));
    assert_eq!(record["name"], json!("Aragon"));

    let created = record["created_at"].as_str().unwrap();
    assert!(DateTime::parse_from_rfc3339(created).is_ok());
}

#[test]
fn record_round_trip_restores_the_entity() {
    let state = State::new("Aragon");
    let mut place = Place::new("Loft", Uuid::new_v4(), Uuid::new_v4());
    place.description = Some("quiet".to_string());
    place.latitude = Some(41.65);
    place.add_amenity(Uuid::new_v4());

    for entity in [Entity::State(state), Entity::Place(place)] {
        let record = entity.to_record().unwrap();
        let restored = Entity::from_record(serde_json::Value::Object(record)).unwrap();
        assert_eq!(restored, entity);
    }
}

#[test]
fn serialization_is_stable_without_mutation() {
    let entity = Entity::Amenity(Amenity::new("wifi"));
    let first = serde_json::to_string(&entity.to_record().unwrap()).unwrap();
    let second = serde_json::to_string(&entity.to_record().unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn touch_moves_updated_at_strictly_forward() {
    let mut entity = Entity::City(City::new("Zaragoza", Uuid::new_v4()));
    let id = entity.id();
    let created = entity.created_at();
    let before = entity.updated_at();

    entity.touch();
    assert!(entity.updated_at() > before);
    assert_eq!(entity.created_at(), created);
    assert_eq!(entity.id(), id);

    let again = entity.updated_at();
    entity.touch();
    assert!(entity.updated_at() > again);
}

#[test]
fn patch_ignores_reserved_keys_silently() {
    let mut entity = Entity::State(State::new("Aragon"));
    let id = entity.id();
    let created = entity.created_at();

    entity
        .apply_patch(&patch(json!({
            "id": Uuid::new_v4().to_string(),
            "created_at": "1999-01-01T00:00:00Z",
            "updated_at": "1999-01-01T00:00:00Z",
            "kind": "City",
            "name": "Navarre"
        })))
        .unwrap();

    assert_eq!(entity.id(), id);
    assert_eq!(entity.created_at(), created);
    match &entity {
        Entity::State(state) => assert_eq!(state.name, "Navarre"),
        other => panic!("unexpected entity {other:?}"),
    }
}

#[test]
fn patch_rejects_unknown_keys() {
    let mut entity = Entity::User(User::new("ada@example.com", "secret"));
    let err = entity
        .apply_patch(&patch(json!({"nickname": "ada"})))
        .unwrap_err();
    assert!(matches!(
        err,
        ValidationError::UnknownField { kind: EntityKind::User, ref field } if field == "nickname"
    ));
}

#[test]
fn patch_rejects_wrong_typed_values() {
    let mut entity = Entity::Place(Place::new("Loft", Uuid::new_v4(), Uuid::new_v4()));
    let err = entity
        .apply_patch(&patch(json!({"number_rooms": "three"})))
        .unwrap_err();
    assert!(matches!(err, ValidationError::InvalidValue { .. }));

    let err = entity
        .apply_patch(&patch(json!({"amenity_ids": ["not-a-uuid"]})))
        .unwrap_err();
    assert!(matches!(err, ValidationError::InvalidValue { .. }));
}

#[test]
fn validation_requires_the_documented_fields() {
    assert!(matches!(
        Entity::State(State::new("  ")).validate(),
        Err(ValidationError::MissingField { kind: EntityKind::State, field: "name" })
    ));
    assert!(matches!(
        Entity::City(City::new("Zaragoza", Uuid::nil())).validate(),
        Err(ValidationError::MissingField { kind: EntityKind::City, field: "state_id" })
    ));
    assert!(matches!(
        Entity::User(User::new("", "secret")).validate(),
        Err(ValidationError::MissingField { kind: EntityKind::User, field: "email" })
    ));
    assert!(matches!(
        Entity::Place(Place::new("Loft", Uuid::nil(), Uuid::new_v4())).validate(),
        Err(ValidationError::MissingField { kind: EntityKind::Place, field: "city_id" })
    ));
    assert!(Entity::Amenity(Amenity::new("wifi")).validate().is_ok());
}

#[test]
fn amenity_links_stay_sorted_and_unique() {
    let mut place = Place::new("Loft", Uuid::new_v4(), Uuid::new_v4());
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();

    assert!(place.add_amenity(first));
    assert!(place.add_amenity(second));
    assert!(!place.add_amenity(first));
    assert_eq!(place.amenity_ids.len(), 2);
    let mut expected = vec![first, second];
    expected.sort_unstable();
    assert_eq!(place.amenity_ids, expected);

    place.set_amenities(vec![second, second, first]);
    assert_eq!(place.amenity_ids, expected);

    assert!(place.remove_amenity(first));
    assert!(!place.remove_amenity(first));
    assert_eq!(place.amenity_ids, vec![second]);
}
