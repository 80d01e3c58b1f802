use std::fmt;
use std::sync::Arc;
use std::thread;

use raccoon_ecs::{Component, ComponentFactory, Entity, EntityManager};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum ComponentType {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

trait Valued {
    fn value(&self) -> i32;
    fn set_value(&mut self, value: i32);
}

macro_rules! value_components {
    ($($name:ident => $key:ident),+ $(,)?) => {
        $(
            #[derive(Default, Clone)]
            struct $name {
                value: i32,
            }

            impl Component<ComponentType> for $name {
                fn type_key() -> ComponentType { ComponentType::$key }
            }

            impl Valued for $name {
                fn value(&self) -> i32 { self.value }
                fn set_value(&mut self, value: i32) { self.value = value; }
            }
        )+
    };
}

value_components!(
    ComponentA => A,
    ComponentB => B,
    ComponentC => C,
    ComponentD => D,
    ComponentE => E,
    ComponentF => F,
    ComponentG => G,
    ComponentH => H,
);

fn new_manager() -> EntityManager<ComponentType> {
    let mut factory = ComponentFactory::new();
    factory.register_cloneable_component::<ComponentA>().unwrap();
    factory.register_cloneable_component::<ComponentB>().unwrap();
    factory.register_cloneable_component::<ComponentC>().unwrap();
    factory.register_cloneable_component::<ComponentD>().unwrap();
    factory.register_cloneable_component::<ComponentE>().unwrap();
    factory.register_cloneable_component::<ComponentF>().unwrap();
    factory.register_cloneable_component::<ComponentG>().unwrap();
    factory.register_cloneable_component::<ComponentH>().unwrap();
    EntityManager::new(Arc::new(factory))
}

fn add_value<T>(manager: &mut EntityManager<ComponentType>, entity: Entity, value: i32)
where
    T: Component<ComponentType> + Default + Valued,
{
    if let Some(component) = manager.add_component::<T>(entity) {
        component.set_value(value);
    }
}

//   1 2 3
// A x
// B   x
// C x x
// D     x
// E x   x
// F   x x
// G x x x
// H
fn set_up_permutations(manager: &mut EntityManager<ComponentType>) -> (Entity, Entity, Entity) {
    let first = manager.add_entity();
    add_value::<ComponentA>(manager, first, 1);
    add_value::<ComponentC>(manager, first, 3);
    add_value::<ComponentE>(manager, first, 5);
    add_value::<ComponentG>(manager, first, 7);

    let second = manager.add_entity();
    add_value::<ComponentB>(manager, second, 20);
    add_value::<ComponentC>(manager, second, 30);
    add_value::<ComponentF>(manager, second, 60);
    add_value::<ComponentG>(manager, second, 70);

    let third = manager.add_entity();
    add_value::<ComponentD>(manager, third, 400);
    add_value::<ComponentE>(manager, third, 500);
    add_value::<ComponentF>(manager, third, 600);
    add_value::<ComponentG>(manager, third, 700);

    manager.init_index::<ComponentA>();
    manager.init_index::<ComponentB>();
    manager.init_index::<ComponentC>();
    manager.init_index::<ComponentD>();
    manager.init_index::<ComponentE>();
    manager.init_index::<ComponentF>();
    manager.init_index::<ComponentG>();
    manager.init_index::<ComponentH>();

    (first, second, third)
}

/// Asserts that exactly `expected` entities hold a `T`, with the given values.
fn check_component_entities<T>(manager: &mut EntityManager<ComponentType>, expected: &[(Entity, i32)])
where
    T: Component<ComponentType> + Valued,
{
    let mut seen = Vec::new();
    manager.for_each_component_set_with_entity::<(T,), _>(|entity, (component,): (&mut T,)| {
        seen.push((entity, component.value()));
    });
    seen.sort();
    let mut expected = expected.to_vec();
    expected.sort();
    assert_eq!(seen, expected, "entities holding {}", T::type_key());
}

fn collect_a_values(manager: &EntityManager<ComponentType>) -> Vec<i32> {
    let mut sets = Vec::new();
    manager.get_components::<(ComponentA,)>(&mut sets);
    let mut values: Vec<i32> = sets.iter().map(|(a,)| a.value).collect();
    values.sort_unstable();
    values
}

fn two_indexed_a_entities() -> (EntityManager<ComponentType>, Entity, Entity) {
    let mut manager = new_manager();
    let first = manager.add_entity();
    add_value::<ComponentA>(&mut manager, first, 100);
    let second = manager.add_entity();
    add_value::<ComponentA>(&mut manager, second, 200);
    manager.init_index::<ComponentA>();
    (manager, first, second)
}

#[test]
fn removing_indexed_entity_before_last_indexed_entity() {
    let (mut manager, first, _) = two_indexed_a_entities();
    manager.remove_entity(first);
    assert_eq!(collect_a_values(&manager), vec![200]);
}

#[test]
fn removing_indexed_entity_before_last_entity_outside_index() {
    let mut manager = new_manager();
    let first = manager.add_entity();
    add_value::<ComponentA>(&mut manager, first, 100);
    let second = manager.add_entity();
    add_value::<ComponentB>(&mut manager, second, 200);
    manager.init_index::<ComponentA>();

    manager.remove_entity(first);
    assert!(collect_a_values(&manager).is_empty());
    check_component_entities::<ComponentB>(&mut manager, &[(second, 200)]);
}

#[test]
fn removing_entity_outside_index_before_last_indexed_entity() {
    let mut manager = new_manager();
    let first = manager.add_entity();
    add_value::<ComponentB>(&mut manager, first, 100);
    let second = manager.add_entity();
    add_value::<ComponentA>(&mut manager, second, 200);
    manager.init_index::<ComponentA>();

    manager.remove_entity(first);
    assert_eq!(collect_a_values(&manager), vec![200]);
}

#[test]
fn removing_indexed_entity_with_reversed_dense_order() {
    let mut manager = new_manager();
    let entities: Vec<Entity> = (0..4).map(|_| manager.add_entity()).collect();
    for (entity, value) in entities.iter().rev().zip([400, 300, 200, 100]) {
        add_value::<ComponentA>(&mut manager, *entity, value);
    }
    manager.init_index::<ComponentA>();

    manager.remove_entity(entities[1]);
    assert_eq!(collect_a_values(&manager), vec![100, 300, 400]);
}

#[test]
fn copy_after_removal_keeps_index_consistent() {
    let (mut manager, first, second) = two_indexed_a_entities();
    manager.remove_entity(first);

    let mut copy = new_manager();
    copy.override_by(&manager).unwrap();
    assert_eq!(collect_a_values(&copy), vec![200]);
    assert_eq!(collect_a_values(&manager), vec![200]);
    check_component_entities::<ComponentA>(&mut copy, &[(second, 200)]);
}

#[test]
fn indexed_manager_can_move_to_another_thread() {
    let mut manager = new_manager();
    let entity = manager.add_entity();
    add_value::<ComponentA>(&mut manager, entity, 100);
    manager.init_index::<ComponentA>();

    let values = thread::spawn(move || collect_a_values(&manager)).join().unwrap();
    assert_eq!(values, vec![100]);
}

#[test]
fn indexed_manager_can_be_read_from_another_thread() {
    let (manager, _, _) = two_indexed_a_entities();
    thread::scope(|scope| {
        scope.spawn(|| assert_eq!(collect_a_values(&manager), vec![100, 200]));
        scope.spawn(|| assert_eq!(collect_a_values(&manager), vec![100, 200]));
    });
}

#[test]
fn managers_built_on_different_threads_init_indexes() {
    let workers: Vec<_> = (0..2)
        .map(|_| {
            thread::spawn(|| {
                for _ in 0..1000 {
                    let mut manager = new_manager();
                    manager.init_index::<ComponentA>();
                    assert!(manager.has_index::<ComponentA>());
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
}

#[test]
fn removed_entity_outside_index_does_not_appear() {
    let mut manager = new_manager();
    let without = manager.add_entity();
    let with = manager.add_entity();
    add_value::<ComponentB>(&mut manager, with, 500);
    manager.init_index::<ComponentB>();

    manager.remove_entity(without);
    check_component_entities::<ComponentB>(&mut manager, &[(with, 500)]);
}

#[test]
fn removing_first_entity_keeps_indexes_intact() {
    let mut manager = new_manager();
    let (first, second, third) = set_up_permutations(&mut manager);
    manager.remove_entity(first);

    check_component_entities::<ComponentA>(&mut manager, &[]);
    check_component_entities::<ComponentB>(&mut manager, &[(second, 20)]);
    check_component_entities::<ComponentC>(&mut manager, &[(second, 30)]);
    check_component_entities::<ComponentD>(&mut manager, &[(third, 400)]);
    check_component_entities::<ComponentE>(&mut manager, &[(third, 500)]);
    check_component_entities::<ComponentF>(&mut manager, &[(second, 60), (third, 600)]);
    check_component_entities::<ComponentG>(&mut manager, &[(second, 70), (third, 700)]);
    check_component_entities::<ComponentH>(&mut manager, &[]);
}

#[test]
fn removing_middle_entity_keeps_indexes_intact() {
    let mut manager = new_manager();
    let (first, second, third) = set_up_permutations(&mut manager);
    manager.remove_entity(second);

    check_component_entities::<ComponentA>(&mut manager, &[(first, 1)]);
    check_component_entities::<ComponentB>(&mut manager, &[]);
    check_component_entities::<ComponentC>(&mut manager, &[(first, 3)]);
    check_component_entities::<ComponentD>(&mut manager, &[(third, 400)]);
    check_component_entities::<ComponentE>(&mut manager, &[(first, 5), (third, 500)]);
    check_component_entities::<ComponentF>(&mut manager, &[(third, 600)]);
    check_component_entities::<ComponentG>(&mut manager, &[(first, 7), (third, 700)]);
    check_component_entities::<ComponentH>(&mut manager, &[]);
}

#[test]
fn removing_last_entity_keeps_indexes_intact() {
    let mut manager = new_manager();
    let (first, second, third) = set_up_permutations(&mut manager);
    manager.remove_entity(third);

    check_component_entities::<ComponentA>(&mut manager, &[(first, 1)]);
    check_component_entities::<ComponentB>(&mut manager, &[(second, 20)]);
    check_component_entities::<ComponentC>(&mut manager, &[(first, 3), (second, 30)]);
    check_component_entities::<ComponentD>(&mut manager, &[]);
    check_component_entities::<ComponentE>(&mut manager, &[(first, 5)]);
    check_component_entities::<ComponentF>(&mut manager, &[(second, 60)]);
    check_component_entities::<ComponentG>(&mut manager, &[(first, 7), (second, 70)]);
    check_component_entities::<ComponentH>(&mut manager, &[]);
}

fn transfer_and_check(pick: fn((Entity, Entity, Entity)) -> Entity) {
    let mut source = new_manager();
    let entities = set_up_permutations(&mut source);
    let moved = pick(entities);

    let mut destination = new_manager();
    destination.init_index::<ComponentG>();
    let transferred = source.transfer_entity_to(&mut destination, moved).unwrap();

    let (first, second, third) = entities;
    let remaining: Vec<(Entity, i32)> =
        [(first, 7), (second, 70), (third, 700)].into_iter().filter(|(entity, _)| *entity != moved).collect();
    check_component_entities::<ComponentG>(&mut source, &remaining);

    let moved_value = [(first, 7), (second, 70), (third, 700)]
        .into_iter()
        .find(|(entity, _)| *entity == moved)
        .map(|(_, value)| value)
        .unwrap();
    check_component_entities::<ComponentG>(&mut destination, &[(transferred, moved_value)]);
    assert!(destination.has_index::<ComponentG>());
}

#[test]
fn transferring_first_entity_keeps_indexes_intact() {
    transfer_and_check(|(first, _, _)| first);
}

#[test]
fn transferring_middle_entity_keeps_indexes_intact() {
    transfer_and_check(|(_, second, _)| second);
}

#[test]
fn transferring_last_entity_keeps_indexes_intact() {
    transfer_and_check(|(_, _, third)| third);
}

#[test]
fn transfer_into_populated_manager_keeps_indexes_intact() {
    let mut source = new_manager();
    let (kept_first, moved, kept_third) = set_up_permutations(&mut source);
    let mut destination = new_manager();
    let (first, second, third) = set_up_permutations(&mut destination);

    let transferred = source.transfer_entity_to(&mut destination, moved).unwrap();
    assert!(![first, second, third].contains(&transferred));
    assert_eq!(destination.entity_count(), 4);

    check_component_entities::<ComponentB>(&mut destination, &[(second, 20), (transferred, 20)]);
    check_component_entities::<ComponentC>(&mut destination, &[(first, 3), (second, 30), (transferred, 30)]);
    check_component_entities::<ComponentG>(
        &mut destination,
        &[(first, 7), (second, 70), (third, 700), (transferred, 70)],
    );
    check_component_entities::<ComponentG>(&mut source, &[(kept_first, 7), (kept_third, 700)]);
}

#[test]
fn index_can_be_initialized_by_key() {
    let mut manager = new_manager();
    assert!(!manager.has_index::<ComponentH>());
    manager.init_index_by_key(&ComponentType::H).unwrap();
    assert!(manager.has_index::<ComponentH>());
}
