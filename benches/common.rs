#![allow(dead_code)]

use std::sync::Arc;

use raccoon_ecs::{Component, ComponentFactory, EntityManager};

pub const ENTITIES_SMALL: usize = 100_000;
pub const ENTITIES_MED: usize = 1_000_000;

#[derive(Clone, Copy, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Default)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

#[derive(Clone, Copy, Default)]
pub struct Mass {
    pub value: f32,
}

impl Component<&'static str> for Position { fn type_key() -> &'static str { "Position" } }
impl Component<&'static str> for Velocity { fn type_key() -> &'static str { "Velocity" } }
impl Component<&'static str> for Mass { fn type_key() -> &'static str { "Mass" } }

pub fn factory() -> Arc<ComponentFactory<&'static str>> {
    let mut factory = ComponentFactory::new();
    factory.register_cloneable_component::<Position>().unwrap();
    factory.register_cloneable_component::<Velocity>().unwrap();
    factory.register_cloneable_component::<Mass>().unwrap();
    Arc::new(factory)
}

/// A store of `entity_count` entities, each with a position, velocity and mass.
pub fn populated_store(entity_count: usize) -> EntityManager<&'static str> {
    let mut manager = EntityManager::new(factory());
    for _ in 0..entity_count {
        let entity = manager.add_entity();
        manager.add_component_value(entity, Position { x: 0.0, y: 0.0 });
        manager.add_component_value(entity, Velocity { dx: 1.0, dy: 0.5 });
        manager.add_component_value(entity, Mass { value: 1.0 });
    }
    manager
}
