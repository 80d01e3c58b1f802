//! Iteration across several entity stores at once.
//!
//! A [`CombinedEntityManagerView`] borrows a list of stores, each tagged
//! with caller data `D` (a layer index, a world offset, ...). Every query
//! runs store by store in list order and behaves as if the stores were
//! one, with the `_extra_data` variants also passing the tag of the store
//! the current entity lives in.

use crate::engine::component::TypedComponent;
use crate::engine::entity::Entity;
use crate::engine::manager::EntityManager;
use crate::engine::query::ComponentSet;
use crate::engine::types::ComponentKey;

/// Exclusive view over several [`EntityManager`]s with per-store data.
pub struct CombinedEntityManagerView<'a, K: ComponentKey, D> {
    managers: Vec<(&'a mut EntityManager<K>, D)>,
}

impl<'a, K: ComponentKey, D> CombinedEntityManagerView<'a, K, D> {
    /// Combines `managers`, each paired with the data passed to `_extra_data` callbacks.
    pub fn new(managers: Vec<(&'a mut EntityManager<K>, D)>) -> Self {
        Self { managers }
    }

    /// Number of stores in the view.
    pub fn len(&self) -> usize {
        self.managers.len()
    }

    /// Returns `true` if the view combines no stores.
    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    /// Iterates the matching component sets of every store in order.
    pub fn for_each_component_set<'s, Q, F>(&'s mut self, mut f: F)
    where
        Q: ComponentSet<K>,
        F: FnMut(Q::ItemsMut<'s>),
    {
        for (manager, _) in self.managers.iter_mut() {
            manager.for_each_component_set::<Q, _>(&mut f);
        }
    }

    /// As [`CombinedEntityManagerView::for_each_component_set`], also passing the entity.
    pub fn for_each_component_set_with_entity<'s, Q, F>(&'s mut self, mut f: F)
    where
        Q: ComponentSet<K>,
        F: FnMut(Entity, Q::ItemsMut<'s>),
    {
        for (manager, _) in self.managers.iter_mut() {
            manager.for_each_component_set_with_entity::<Q, _>(&mut f);
        }
    }

    /// Iterates every store, passing the store's data along.
    pub fn for_each_component_set_with_extra_data<'s, Q, F>(&'s mut self, mut f: F)
    where
        Q: ComponentSet<K>,
        F: FnMut(&D, Q::ItemsMut<'s>),
    {
        for (manager, data) in self.managers.iter_mut() {
            let data = &*data;
            manager.for_each_component_set::<Q, _>(|items| f(data, items));
        }
    }

    /// Iterates every store, passing the store's data and the entity along.
    pub fn for_each_component_set_with_entity_and_extra_data<'s, Q, F>(&'s mut self, mut f: F)
    where
        Q: ComponentSet<K>,
        F: FnMut(&D, Entity, Q::ItemsMut<'s>),
    {
        for (manager, data) in self.managers.iter_mut() {
            let data = &*data;
            manager.for_each_component_set_with_entity::<Q, _>(|entity, items| f(data, entity, items));
        }
    }

    /// Appends matching component sets of every store to `out`.
    pub fn get_components<'s, Q: ComponentSet<K>>(&'s self, out: &mut Vec<Q::Items<'s>>) {
        for (manager, _) in &self.managers {
            manager.get_components::<Q>(out);
        }
    }

    /// Appends matching component sets of every store, paired with their entities.
    pub fn get_components_with_entities<'s, Q: ComponentSet<K>>(&'s self, out: &mut Vec<(Entity, Q::Items<'s>)>) {
        for (manager, _) in &self.managers {
            manager.get_components_with_entities::<Q>(out);
        }
    }

    /// Appends matching component sets of every store, paired with a clone of the store's data.
    pub fn get_components_with_extra_data<'s, Q>(&'s self, out: &mut Vec<(D, Q::Items<'s>)>)
    where
        Q: ComponentSet<K>,
        D: Clone,
    {
        for (manager, data) in &self.managers {
            manager.get_components_with_data::<Q, D>(data.clone(), out);
        }
    }

    /// Appends `(data, entity, components)` for every match in every store.
    pub fn get_components_with_entities_and_extra_data<'s, Q>(&'s self, out: &mut Vec<(D, Entity, Q::Items<'s>)>)
    where
        Q: ComponentSet<K>,
        D: Clone,
    {
        for (manager, data) in &self.managers {
            manager.get_components_with_entities_and_data::<Q, D>(data.clone(), out);
        }
    }

    /// Appends every component `entity` has in any store of the view.
    pub fn get_all_entity_components<'s>(&'s self, entity: Entity, out: &mut Vec<TypedComponent<'s, K>>) {
        for (manager, _) in &self.managers {
            if manager.has_entity(entity) {
                manager.get_all_entity_components(entity, out);
            }
        }
    }

    /// Returns `true` if any store of the view has `entity`.
    pub fn has_entity(&self, entity: Entity) -> bool {
        self.managers.iter().any(|(manager, _)| manager.has_entity(entity))
    }

    /// Flushes the deferred actions of every store.
    pub fn execute_scheduled_actions(&mut self) {
        for (manager, _) in self.managers.iter_mut() {
            manager.execute_scheduled_actions();
        }
    }
}
