//! # Raccoon ECS
//!
//! Entity-Component-System storage with a dependency-driven concurrent
//! system scheduler.
//!
//! ## Design Goals
//! - Sparse-set component pools keyed by runtime component type keys
//! - Cached multi-component queries with optional driving indexes
//! - Systems ordered by declared dependencies, run on a task pool
//! - Safe, explicit data access
//!
//! ## Quick Start
//! ```
//! use std::sync::Arc;
//! use raccoon_ecs::{Component, ComponentFactory, EntityManager};
//!
//! #[derive(Default)]
//! struct Health(u32);
//!
//! impl Component<&'static str> for Health {
//!     fn type_key() -> &'static str { "Health" }
//! }
//!
//! let mut factory = ComponentFactory::new();
//! factory.register_component::<Health>().unwrap();
//!
//! let mut world = EntityManager::new(Arc::new(factory));
//! let entity = world.add_entity();
//! world.add_component::<Health>(entity).unwrap().0 = 10;
//!
//! let mut total = 0;
//! world.for_each_component_set::<(Health,), _>(|(health,): (&mut Health,)| total += health.0);
//! assert_eq!(total, 10);
//! ```

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![allow(clippy::module_inception)]
#![deny(dead_code)]

pub mod engine;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

// Entities and components

pub use engine::entity::{
    Entity,
    OptionalEntity,
    EntityGenerator,
    IncrementalEntityGenerator,
    SeededEntityGenerator,
};

pub use engine::component::{
    Component,
    ComponentDesc,
    ComponentFactory,
    TypedComponent,
};

pub use engine::storage::{
    ComponentPool,
    ErasedPool,
    PoolIndex,
};

pub use engine::commands::{
    ScheduledAction,
    ScheduledActions,
};

pub use engine::query::{
    ComponentSet,
    PoolMap,
};

// Stores

pub use engine::manager::{
    EntityManager,
    SharedEntityManager,
};
pub use engine::holder::ComponentSetHolder;
pub use engine::view::CombinedEntityManagerView;

pub use engine::delegates::{
    MulticastDelegate,
    SinglecastDelegate,
};

// Concurrency and scheduling

pub use engine::async_stack::AsyncStack;
pub use engine::thread_pool::{
    Finalizer,
    TaskResult,
    ThreadPool,
    ThreadPoolHandle,
};
pub use engine::dependency::{
    DependencyGraph,
    SystemDependencyTracer,
    SystemState,
};
pub use engine::systems::{
    FnSystem,
    System,
    SystemDependencies,
};
pub use engine::scheduler::AsyncSystemsManager;
pub use engine::config::EngineConfig;

pub use engine::error::{
    ComponentError,
    ConfigError,
    EcsError,
    EcsResult,
    ScheduleError,
    ThreadPoolError,
    TypeMismatchError,
};

pub use engine::types::{
    ComponentKey,
    EntityVersion,
    RawEntityId,
    SystemIndex,
    TaskGroup,
    DEFAULT_TASK_GROUP,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used ECS types.
///
/// Import with:
/// ```rust
/// use raccoon_ecs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AsyncSystemsManager,
        Component,
        ComponentFactory,
        ComponentKey,
        ComponentSetHolder,
        Entity,
        EntityManager,
        FnSystem,
        SharedEntityManager,
        System,
        SystemDependencies,
        ThreadPool,
    };
}
