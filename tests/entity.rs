use raccoon_ecs::{Entity, EntityGenerator, IncrementalEntityGenerator, OptionalEntity};

#[test]
fn entity_keeps_its_id() {
    let entity = Entity::new(1);
    assert_eq!(entity.id(), 1);
    assert_eq!(entity.version(), 0);
}

#[test]
fn optional_entity_from_id_or_entity_is_valid() {
    let from_id = OptionalEntity::new(1);
    assert!(from_id.is_valid());
    assert_eq!(from_id.id(), 1);

    let from_entity = OptionalEntity::from(Entity::new(1));
    assert!(from_entity.is_valid());
    assert_eq!(from_entity.entity(), Some(Entity::new(1)));

    let converted: OptionalEntity = Entity::new(1).into();
    assert_eq!(converted, from_id);
}

#[test]
fn default_optional_entity_is_invalid() {
    let entity = OptionalEntity::default();
    assert!(!entity.is_valid());
    assert_eq!(entity, OptionalEntity::invalid());
    assert_eq!(entity.entity(), None);
}

#[test]
fn entities_compare_by_id() {
    let first = Entity::new(1);
    let second = Entity::new(2);
    assert_ne!(first, second);
    assert!(first < second);
    assert!(!(second < first));
}

#[test]
fn entity_and_optional_entity_compare() {
    assert_eq!(Entity::new(1), OptionalEntity::new(1));
    assert_eq!(OptionalEntity::new(1), Entity::new(1));
    assert_ne!(Entity::new(1), OptionalEntity::new(2));
    assert_ne!(Entity::new(1), OptionalEntity::invalid());
}

#[test]
fn generator_can_start_at_offset() {
    let generator = IncrementalEntityGenerator::starting_at(100);
    assert_eq!(generator.generate_next().id(), 100);
    assert_eq!(generator.generate_next().id(), 101);
}
