use std::sync::Arc;

use raccoon_ecs::{
    CombinedEntityManagerView, Component, ComponentFactory, Entity, EntityGenerator, EntityManager,
    IncrementalEntityGenerator,
};

#[derive(Default)]
struct EmptyComponent;

#[derive(Default)]
struct TransformComponent {
    x: i32,
}

#[derive(Default)]
struct MovementComponent {
    dx: i32,
}

impl Component<String> for EmptyComponent { fn type_key() -> String { "Empty".to_owned() } }
impl Component<String> for TransformComponent { fn type_key() -> String { "Transform".to_owned() } }
impl Component<String> for MovementComponent { fn type_key() -> String { "Movement".to_owned() } }

/// Two stores sharing one factory and one id generator.
fn prepare() -> (EntityManager<String>, EntityManager<String>) {
    let mut factory = ComponentFactory::new();
    factory.register_component::<EmptyComponent>().unwrap();
    factory.register_component::<TransformComponent>().unwrap();
    factory.register_component::<MovementComponent>().unwrap();
    let factory = Arc::new(factory);
    let generator: Arc<dyn EntityGenerator> = Arc::new(IncrementalEntityGenerator::new());
    (
        EntityManager::with_generator(Arc::clone(&factory), Arc::clone(&generator)),
        EntityManager::with_generator(factory, generator),
    )
}

/// Each store gets one moving entity and one tagged entity.
fn populate(first: &mut EntityManager<String>, second: &mut EntityManager<String>) -> [Entity; 4] {
    let add = |manager: &mut EntityManager<String>, x: i32, moving: bool| {
        let entity = manager.add_entity();
        manager.add_component::<TransformComponent>(entity).unwrap().x = x;
        if moving {
            manager.add_component::<MovementComponent>(entity).unwrap().dx = 1;
        } else {
            manager.add_component::<EmptyComponent>(entity);
        }
        entity
    };
    [add(first, 1, true), add(first, 2, false), add(second, 10, true), add(second, 20, false)]
}

#[test]
fn component_sets_are_iterated_across_stores() {
    let (mut first, mut second) = prepare();
    populate(&mut first, &mut second);
    let mut view = CombinedEntityManagerView::new(vec![(&mut first, ()), (&mut second, ())]);
    assert_eq!(view.len(), 2);

    let mut count = 0;
    view.for_each_component_set::<(MovementComponent,), _>(|_| count += 1);
    assert_eq!(count, 2);

    let mut count = 0;
    view.for_each_component_set::<(TransformComponent,), _>(|_| count += 1);
    assert_eq!(count, 4);

    view.for_each_component_set::<(TransformComponent, MovementComponent), _>(
        |(transform, movement): (&mut TransformComponent, &mut MovementComponent)| transform.x += movement.dx,
    );
    drop(view);
    let mut xs = Vec::new();
    first.get_components::<(TransformComponent,)>(&mut xs);
    let mut values: Vec<i32> = xs.iter().map(|(t,)| t.x).collect();
    values.sort_unstable();
    assert_eq!(values, vec![2, 2]);
}

#[test]
fn component_sets_are_iterated_with_entities() {
    let (mut first, mut second) = prepare();
    let [moving_first, _, moving_second, _] = populate(&mut first, &mut second);
    let mut view = CombinedEntityManagerView::new(vec![(&mut first, ()), (&mut second, ())]);

    let mut seen = Vec::new();
    view.for_each_component_set_with_entity::<(MovementComponent,), _>(|entity, _| seen.push(entity));
    seen.sort();
    assert_eq!(seen, vec![moving_first, moving_second]);
}

#[test]
fn component_sets_are_collected_across_stores() {
    let (mut first, mut second) = prepare();
    let [_, tagged_first, _, tagged_second] = populate(&mut first, &mut second);
    let view = CombinedEntityManagerView::new(vec![(&mut first, ()), (&mut second, ())]);

    let mut sets = Vec::new();
    view.get_components::<(TransformComponent,)>(&mut sets);
    assert_eq!(sets.len(), 4);

    let mut with_entities = Vec::new();
    view.get_components_with_entities::<(EmptyComponent, TransformComponent)>(&mut with_entities);
    let mut entities: Vec<Entity> = with_entities.iter().map(|(entity, _)| *entity).collect();
    entities.sort();
    assert_eq!(entities, vec![tagged_first, tagged_second]);
}

#[test]
fn extra_data_follows_the_store() {
    let (mut first, mut second) = prepare();
    let [moving_first, _, moving_second, _] = populate(&mut first, &mut second);
    let mut view = CombinedEntityManagerView::new(vec![(&mut first, 100), (&mut second, 200)]);

    let mut total = 0;
    view.for_each_component_set_with_extra_data::<(MovementComponent,), _>(
        |offset: &i32, (movement,): (&mut MovementComponent,)| total += offset + movement.dx,
    );
    assert_eq!(total, 302);

    let mut seen = Vec::new();
    view.for_each_component_set_with_entity_and_extra_data::<(MovementComponent,), _>(
        |offset: &i32, entity, _| seen.push((*offset, entity)),
    );
    seen.sort();
    assert_eq!(seen, vec![(100, moving_first), (200, moving_second)]);
}

#[test]
fn extra_data_is_attached_to_collected_sets() {
    let (mut first, mut second) = prepare();
    let [moving_first, _, moving_second, _] = populate(&mut first, &mut second);
    let view = CombinedEntityManagerView::new(vec![(&mut first, "near"), (&mut second, "far")]);

    let mut sets = Vec::new();
    view.get_components_with_extra_data::<(MovementComponent,)>(&mut sets);
    let mut layers: Vec<&str> = sets.iter().map(|(layer, _)| *layer).collect();
    layers.sort_unstable();
    assert_eq!(layers, vec!["far", "near"]);

    let mut sets = Vec::new();
    view.get_components_with_entities_and_extra_data::<(MovementComponent,)>(&mut sets);
    let mut tagged: Vec<(&str, Entity)> = sets.iter().map(|(layer, entity, _)| (*layer, *entity)).collect();
    tagged.sort();
    assert_eq!(tagged, vec![("far", moving_second), ("near", moving_first)]);
}

#[test]
fn all_components_of_an_entity_are_collected() {
    let (mut first, mut second) = prepare();
    let [_, tagged_first, _, tagged_second] = populate(&mut first, &mut second);
    let view = CombinedEntityManagerView::new(vec![(&mut first, ()), (&mut second, ())]);

    for entity in [tagged_first, tagged_second] {
        let mut components = Vec::new();
        view.get_all_entity_components(entity, &mut components);
        assert_eq!(components.len(), 2);
        assert!(view.has_entity(entity));
    }
}

#[test]
fn scheduled_actions_run_in_every_store() {
    let (mut first, mut second) = prepare();
    let [_, tagged_first, _, tagged_second] = populate(&mut first, &mut second);
    first.schedule_remove_component::<EmptyComponent>(tagged_first);
    second.schedule_remove_component::<TransformComponent>(tagged_second);

    let mut view = CombinedEntityManagerView::new(vec![(&mut first, ()), (&mut second, ())]);
    view.execute_scheduled_actions();

    for entity in [tagged_first, tagged_second] {
        let mut components = Vec::new();
        view.get_all_entity_components(entity, &mut components);
        assert_eq!(components.len(), 1);
    }
}
