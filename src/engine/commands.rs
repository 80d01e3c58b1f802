//! # Scheduled Actions
//!
//! This module defines deferred structural changes to an entity store.
//!
//! ## Purpose
//! Iterating a store while adding or removing components would invalidate
//! the dense slots being walked. Callers instead record
//! [`ScheduledAction`] values while iterating and apply them later with
//! `execute_scheduled_actions`.
//!
//! ## Design
//! - Actions are plain data describing *what* should change.
//! - A scheduled addition owns its payload from the moment it is queued,
//!   so callers can fill it in before the flush.
//! - The owning store applies the queue in order and empties it.
//!
//! ## Invariants
//! - Actions are applied in the order they were recorded.
//! - Actions targeting entities that no longer exist at flush time are skipped.

use std::any::Any;
use std::fmt;

use crate::engine::component::Component;
use crate::engine::entity::Entity;
use crate::engine::types::ComponentKey;


/// A deferred change to one entity.
pub enum ScheduledAction<K> {
    /// Attaches a component to an existing entity.
    ///
    /// ## Behavior
    /// - The payload is inserted into the pool registered for `type_key`.
    /// - If the entity already owns a component of that type, the existing
    ///   one is kept and the payload dropped.
    AddComponent {
        /// Target entity.
        entity: Entity,
        /// Key of the payload's component type.
        type_key: K,
        /// Payload to insert.
        component: Box<dyn Any + Send + Sync>,
    },

    /// Destroys one component of an existing entity.
    RemoveComponent {
        /// Target entity.
        entity: Entity,
        /// Key of the component type to remove.
        type_key: K,
    },
}

impl<K: fmt::Debug> fmt::Debug for ScheduledAction<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddComponent { entity, type_key, .. } => f
                .debug_struct("AddComponent")
                .field("entity", entity)
                .field("type_key", type_key)
                .finish_non_exhaustive(),
            Self::RemoveComponent { entity, type_key } => f
                .debug_struct("RemoveComponent")
                .field("entity", entity)
                .field("type_key", type_key)
                .finish(),
        }
    }
}

/// Ordered queue of [`ScheduledAction`]s.
#[derive(Debug)]
pub struct ScheduledActions<K> {
    queue: Vec<ScheduledAction<K>>,
}

impl<K> Default for ScheduledActions<K> {
    fn default() -> Self {
        Self { queue: Vec::new() }
    }
}

impl<K: ComponentKey> ScheduledActions<K> {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a default-constructed `T` for `entity` and returns it so the
    /// caller can fill it in before the flush.
    pub fn schedule_add_component<T>(&mut self, entity: Entity) -> &mut T
    where
        T: Component<K> + Default,
    {
        self.schedule_add_component_value(entity, T::default())
    }

    /// Queues a prepared `value` for `entity`.
    pub fn schedule_add_component_value<T>(&mut self, entity: Entity, value: T) -> &mut T
    where
        T: Component<K>,
    {
        self.queue.push(ScheduledAction::AddComponent {
            entity,
            type_key: T::type_key(),
            component: Box::new(value),
        });
        match self.queue.last_mut() {
            Some(ScheduledAction::AddComponent { component, .. }) => match component.downcast_mut::<T>() {
                Some(value) => value,
                None => unreachable!("freshly queued payload has the queued type"),
            },
            _ => unreachable!("an addition was just queued"),
        }
    }

    /// Queues removal of `entity`'s `T`.
    pub fn schedule_remove_component<T: Component<K>>(&mut self, entity: Entity) {
        self.schedule_remove_component_by_key(entity, T::type_key());
    }

    /// Queues removal of `entity`'s component registered under `type_key`.
    pub fn schedule_remove_component_by_key(&mut self, entity: Entity, type_key: K) {
        self.queue.push(ScheduledAction::RemoveComponent { entity, type_key });
    }

    /// Number of queued actions.
    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    /// Returns `true` if no action is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Removes every queued action in recording order.
    pub fn drain(&mut self) -> std::vec::Drain<'_, ScheduledAction<K>> {
        self.queue.drain(..)
    }

    /// Drops every queued action without applying it.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
