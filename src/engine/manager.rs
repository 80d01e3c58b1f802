//! # Entity Manager
//!
//! This module defines [`EntityManager`], the store holding one world's
//! entities and their components.
//!
//! ## Purpose
//! `EntityManager` is the entry point for everything that touches entity
//! data:
//! - entity lifecycle (`add_entity`, `remove_entity`),
//! - component attachment and lookup,
//! - multi-component iteration (`for_each_component_set*`) and the
//!   appending getters (`get_components*`),
//! - deferred structural changes (`schedule_*`, `execute_scheduled_actions`),
//! - moving entities between stores and deep-copying whole stores.
//!
//! ## Storage
//! One [`ComponentPool`] per component type key, created lazily through the
//! shared [`ComponentFactory`] the first time a component of that type is
//! added. Pools are held type-erased and downcast on typed access.
//!
//! ## Query caching
//! The entity list matching a set of type keys is cached per key list and
//! stamped with the store's structure version. Any structural change
//! (component added or removed, entity removed, store replaced) bumps the
//! version, and stale entries are rebuilt on next use. The cache sits
//! behind a mutex so that shared-borrow getters can fill it.
//!
//! ## Concurrency
//! A store is `Send + Sync`. Concurrent readers take `&EntityManager`
//! (e.g. through a [`SharedEntityManager`] read lock); writers need
//! exclusive access.
//!
//! ## Invariants
//! - Every component belongs to a live entity.
//! - Iteration visits each matching entity exactly once and never sees a
//!   partially applied structural change.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::engine::commands::{ScheduledAction, ScheduledActions};
use crate::engine::component::{Component, ComponentFactory, TypedComponent};
use crate::engine::entity::{Entity, EntityGenerator, IncrementalEntityGenerator};
use crate::engine::error::{ComponentError, TypeMismatchError};
use crate::engine::query::{typed_pool, typed_pool_mut, ComponentSet, PoolMap};
use crate::engine::storage::{ComponentPool, ErasedPool};
use crate::engine::types::ComponentKey;


/// A store shared between systems running on different threads.
pub type SharedEntityManager<K> = Arc<RwLock<EntityManager<K>>>;

struct CachedMatch {
    version: u64,
    entities: Arc<[Entity]>,
}

/// Entities, components and pending structural changes of one world.
///
/// ## Example
/// ```
/// use std::sync::Arc;
/// use raccoon_ecs::{Component, ComponentFactory, EntityManager};
///
/// #[derive(Default, Clone)]
/// struct Position(f32);
/// #[derive(Default, Clone)]
/// struct Velocity(f32);
///
/// impl Component<&'static str> for Position { fn type_key() -> &'static str { "Position" } }
/// impl Component<&'static str> for Velocity { fn type_key() -> &'static str { "Velocity" } }
///
/// let mut factory = ComponentFactory::new();
/// factory.register_cloneable_component::<Position>().unwrap();
/// factory.register_cloneable_component::<Velocity>().unwrap();
///
/// let mut world = EntityManager::new(Arc::new(factory));
/// let e = world.add_entity();
/// world.add_component::<Position>(e);
/// world.add_component::<Velocity>(e).unwrap().0 = 2.0;
///
/// world.for_each_component_set::<(Position, Velocity), _>(|(p, v)| p.0 += v.0);
/// assert_eq!(world.get_component::<Position>(e).map(|p| p.0), Some(2.0));
/// ```
pub struct EntityManager<K: ComponentKey> {
    factory: Arc<ComponentFactory<K>>,
    generator: Arc<dyn EntityGenerator>,
    entities: HashSet<Entity>,
    pools: PoolMap<K>,
    actions: ScheduledActions<K>,
    caches: Mutex<HashMap<Vec<K>, CachedMatch>>,
    structure_version: u64,
}

impl<K: ComponentKey> fmt::Debug for EntityManager<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityManager")
            .field("entities", &self.entities.len())
            .field("pools", &self.pools.keys().collect::<Vec<_>>())
            .field("scheduled_actions", &self.actions.len())
            .finish_non_exhaustive()
    }
}

impl<K: ComponentKey> EntityManager<K> {
    /// Creates an empty store with its own incremental entity generator.
    pub fn new(factory: Arc<ComponentFactory<K>>) -> Self {
        Self::with_generator(factory, Arc::new(IncrementalEntityGenerator::new()))
    }

    /// Creates an empty store drawing ids from `generator`.
    ///
    /// Stores that exchange entities should share one generator so their
    /// ids never collide.
    pub fn with_generator(factory: Arc<ComponentFactory<K>>, generator: Arc<dyn EntityGenerator>) -> Self {
        Self {
            factory,
            generator,
            entities: HashSet::new(),
            pools: PoolMap::new(),
            actions: ScheduledActions::default(),
            caches: Mutex::new(HashMap::new()),
            structure_version: 0,
        }
    }

    /// The component registry this store builds pools from.
    pub fn factory(&self) -> &Arc<ComponentFactory<K>> {
        &self.factory
    }

    /// The generator this store draws entity ids from.
    pub fn generator(&self) -> &Arc<dyn EntityGenerator> {
        &self.generator
    }

    // ── Entities ────────────────────────────────────────────────────────────

    /// Creates a new live entity without components.
    ///
    /// Ids that are already live here, e.g. adopted through
    /// [`EntityManager::add_existing_entity_unsafe`], are skipped.
    pub fn add_entity(&mut self) -> Entity {
        let entity = self.fresh_entity();
        self.entities.insert(entity);
        entity
    }

    /// Destroys `entity` and all of its components.
    ///
    /// Removing an entity that is not live is a no-op.
    pub fn remove_entity(&mut self, entity: Entity) {
        if !self.entities.remove(&entity) {
            return;
        }
        for pool in self.pools.values_mut() {
            pool.remove_entity(entity);
        }
        self.touch();
    }

    /// Draws a fresh id without making it live in this store.
    ///
    /// Pair with [`EntityManager::add_existing_entity_unsafe`], possibly on
    /// another store sharing the generator.
    pub fn generate_new_entity_unsafe(&self) -> Entity {
        self.generator.generate_next()
    }

    /// Makes an externally generated `entity` live in this store.
    ///
    /// The caller guarantees the id does not collide with an entity of any
    /// store it will later be exchanged with.
    pub fn add_existing_entity_unsafe(&mut self, entity: Entity) {
        self.entities.insert(entity);
    }

    /// Returns `true` if `entity` is live.
    #[inline]
    pub fn has_entity(&self, entity: Entity) -> bool {
        self.entities.contains(&entity)
    }

    /// Returns `true` if any entity is live.
    #[inline]
    pub fn has_any_entities(&self) -> bool {
        !self.entities.is_empty()
    }

    /// Number of live entities.
    #[inline]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Iterates the live entities in unspecified order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter().copied()
    }

    /// Appends every live entity to `out`.
    pub fn get_entities(&self, out: &mut Vec<Entity>) {
        out.extend(self.entities.iter().copied());
    }

    // ── Components ──────────────────────────────────────────────────────────

    /// Attaches a default-constructed `T` to `entity` and returns it.
    ///
    /// If `entity` already has a `T`, the existing component is returned.
    /// Returns `None` if `entity` is not live.
    pub fn add_component<T>(&mut self, entity: Entity) -> Option<&mut T>
    where
        T: Component<K> + Default,
    {
        if !self.entities.contains(&entity) {
            return None;
        }
        let pool = self.pool_mut::<T>();
        let added = !pool.contains(entity);
        pool.add(entity);
        if added {
            self.touch();
        }
        self.pool_mut::<T>().get_mut(entity)
    }

    /// Attaches `value` to `entity` and returns the stored component.
    ///
    /// If `entity` already has a `T`, `value` is dropped and the existing
    /// component is returned. Returns `None` if `entity` is not live.
    pub fn add_component_value<T>(&mut self, entity: Entity, value: T) -> Option<&mut T>
    where
        T: Component<K> + Default,
    {
        if !self.entities.contains(&entity) {
            return None;
        }
        if self.pool_mut::<T>().insert(entity, value).1 {
            self.touch();
        }
        self.pool_mut::<T>().get_mut(entity)
    }

    /// Destroys `entity`'s `T`. Returns `false` if it had none.
    pub fn remove_component<T: Component<K>>(&mut self, entity: Entity) -> bool {
        self.remove_component_by_key(entity, &T::type_key())
    }

    /// Destroys `entity`'s component registered under `key`.
    pub fn remove_component_by_key(&mut self, entity: Entity, key: &K) -> bool {
        let removed = self.pools.get_mut(key).is_some_and(|pool| pool.remove_entity(entity));
        if removed {
            self.touch();
        }
        removed
    }

    /// Returns `true` if `entity` has a `T`.
    pub fn does_entity_have_component<T: Component<K>>(&self, entity: Entity) -> bool {
        self.does_entity_have_component_key(entity, &T::type_key())
    }

    /// Returns `true` if `entity` has a component registered under `key`.
    pub fn does_entity_have_component_key(&self, entity: Entity, key: &K) -> bool {
        self.pools.get(key).is_some_and(|pool| pool.contains(entity))
    }

    /// Shared access to `entity`'s `T`.
    pub fn get_component<T: Component<K>>(&self, entity: Entity) -> Option<&T> {
        typed_pool::<K, T>(&self.pools)?.get(entity)
    }

    /// Exclusive access to `entity`'s `T`.
    pub fn get_component_mut<T: Component<K>>(&mut self, entity: Entity) -> Option<&mut T> {
        typed_pool_mut::<K, T>(&mut self.pools)?.get_mut(entity)
    }

    /// Components of `entity` named by `Q`, `None` per missing type.
    ///
    /// ```ignore
    /// let (transform, movement) = world.get_entity_components::<(Transform, Movement)>(e);
    /// ```
    pub fn get_entity_components<Q: ComponentSet<K>>(&self, entity: Entity) -> Q::Refs<'_> {
        Q::fetch_optional(&self.pools, entity)
    }

    /// Exclusive components of `entity` named by `Q`, `None` per missing type.
    pub fn get_entity_components_mut<Q: ComponentSet<K>>(&mut self, entity: Entity) -> Q::OptionalMut<'_> {
        Q::fetch_optional_mut(&mut self.pools, entity)
    }

    /// Appends every component of `entity` with its type key to `out`.
    pub fn get_all_entity_components<'s>(&'s self, entity: Entity, out: &mut Vec<TypedComponent<'s, K>>) {
        for (key, pool) in &self.pools {
            if let Some(component) = pool.get_dyn(entity) {
                out.push(TypedComponent { type_key: key.clone(), component });
            }
        }
    }

    /// Number of entities that have a `T`.
    pub fn get_matching_entities_count<T: Component<K>>(&self) -> usize {
        self.pools.get(&T::type_key()).map_or(0, |pool| pool.len())
    }

    /// Appends every entity having all components named by `keys` to `out`.
    ///
    /// An empty key list matches nothing.
    pub fn get_entities_having_components(&self, keys: &[K], out: &mut Vec<Entity>) {
        out.extend(self.cached_matches(keys).iter().copied());
    }

    // ── Indexes ─────────────────────────────────────────────────────────────

    /// Maintains a membership index for `T` from now on.
    ///
    /// Queries involving `T` are then driven by the index. Initializing
    /// an index twice is a no-op.
    pub fn init_index<T: Component<K> + Default>(&mut self) {
        self.pool_mut::<T>().init_index();
        self.touch();
    }

    /// Maintains a membership index for the type registered under `key`.
    ///
    /// ## Errors
    /// [`ComponentError::Unregistered`] if `key` has no pool and the factory
    /// does not know it.
    pub fn init_index_by_key(&mut self, key: &K) -> Result<(), ComponentError> {
        self.erased_pool_mut(key)?.init_index();
        self.touch();
        Ok(())
    }

    /// Returns `true` if `T` is indexed.
    pub fn has_index<T: Component<K>>(&self) -> bool {
        self.pools.get(&T::type_key()).is_some_and(|pool| pool.has_index())
    }

    // ── Iteration ───────────────────────────────────────────────────────────

    /// Calls `f` with exclusive access to the components of every entity
    /// having all types named by `Q`.
    pub fn for_each_component_set<'s, Q, F>(&'s mut self, mut f: F)
    where
        Q: ComponentSet<K>,
        F: FnMut(Q::ItemsMut<'s>),
    {
        let matches = self.cached_matches(&Q::type_keys());
        let Some(parts) = Q::raw_parts(&mut self.pools) else {
            return;
        };
        for &entity in matches.iter() {
            // SAFETY: `matches` holds distinct entities and the pools stay
            // exclusively borrowed through `self` for `'s`.
            if let Some(items) = unsafe { Q::fetch_mut(&parts, entity) } {
                f(items);
            }
        }
    }

    /// As [`EntityManager::for_each_component_set`], also passing the entity.
    pub fn for_each_component_set_with_entity<'s, Q, F>(&'s mut self, mut f: F)
    where
        Q: ComponentSet<K>,
        F: FnMut(Entity, Q::ItemsMut<'s>),
    {
        let matches = self.cached_matches(&Q::type_keys());
        let Some(parts) = Q::raw_parts(&mut self.pools) else {
            return;
        };
        for &entity in matches.iter() {
            // SAFETY: see `for_each_component_set`.
            if let Some(items) = unsafe { Q::fetch_mut(&parts, entity) } {
                f(entity, items);
            }
        }
    }

    /// As [`EntityManager::for_each_component_set`], also passing `data`.
    pub fn for_each_component_set_with_data<'s, Q, D, F>(&'s mut self, data: &D, mut f: F)
    where
        Q: ComponentSet<K>,
        D: ?Sized,
        F: FnMut(&D, Q::ItemsMut<'s>),
    {
        self.for_each_component_set::<Q, _>(|items| f(data, items));
    }

    /// As [`EntityManager::for_each_component_set`], also passing `data` and the entity.
    pub fn for_each_component_set_with_entity_and_data<'s, Q, D, F>(&'s mut self, data: &D, mut f: F)
    where
        Q: ComponentSet<K>,
        D: ?Sized,
        F: FnMut(&D, Entity, Q::ItemsMut<'s>),
    {
        self.for_each_component_set_with_entity::<Q, _>(|entity, items| f(data, entity, items));
    }

    /// Iterates like [`EntityManager::for_each_component_set_with_entity`]
    /// while letting `f` queue structural changes.
    ///
    /// The queued actions are not applied until
    /// [`EntityManager::execute_scheduled_actions`].
    pub fn for_each_component_set_with_actions<'s, Q, F>(&'s mut self, mut f: F)
    where
        Q: ComponentSet<K>,
        F: FnMut(&mut ScheduledActions<K>, Entity, Q::ItemsMut<'s>),
    {
        let matches = self.cached_matches(&Q::type_keys());
        let actions = &mut self.actions;
        let Some(parts) = Q::raw_parts(&mut self.pools) else {
            return;
        };
        for &entity in matches.iter() {
            // SAFETY: see `for_each_component_set`; `actions` is a disjoint field.
            if let Some(items) = unsafe { Q::fetch_mut(&parts, entity) } {
                f(&mut *actions, entity, items);
            }
        }
    }

    /// Calls `f` on the worker threads of the global rayon pool with shared
    /// access to every matching component set.
    #[cfg(feature = "parallel")]
    pub fn par_for_each_component_set<'s, Q, F>(&'s self, f: F)
    where
        Q: ComponentSet<K>,
        F: Fn(Q::Items<'s>) + Send + Sync,
    {
        use rayon::prelude::*;

        let matches = self.cached_matches(&Q::type_keys());
        let Some(pools) = Q::pools(&self.pools) else {
            return;
        };
        matches.par_iter().for_each(|&entity| {
            if let Some(items) = Q::fetch(pools, entity) {
                f(items);
            }
        });
    }

    // ── Appending getters ───────────────────────────────────────────────────

    /// Appends the component sets of every entity matching `Q` to `out`.
    ///
    /// Existing contents of `out` are kept, so several stores can be
    /// gathered into one vector.
    pub fn get_components<'s, Q: ComponentSet<K>>(&'s self, out: &mut Vec<Q::Items<'s>>) {
        let matches = self.cached_matches(&Q::type_keys());
        let Some(pools) = Q::pools(&self.pools) else {
            return;
        };
        out.reserve(matches.len());
        out.extend(matches.iter().filter_map(|&entity| Q::fetch(pools, entity)));
    }

    /// As [`EntityManager::get_components`], pairing each set with its entity.
    pub fn get_components_with_entities<'s, Q: ComponentSet<K>>(&'s self, out: &mut Vec<(Entity, Q::Items<'s>)>) {
        let matches = self.cached_matches(&Q::type_keys());
        let Some(pools) = Q::pools(&self.pools) else {
            return;
        };
        out.reserve(matches.len());
        out.extend(matches.iter().filter_map(|&entity| Q::fetch(pools, entity).map(|items| (entity, items))));
    }

    /// As [`EntityManager::get_components`], tagging each set with `data`.
    pub fn get_components_with_data<'s, Q, D>(&'s self, data: D, out: &mut Vec<(D, Q::Items<'s>)>)
    where
        Q: ComponentSet<K>,
        D: Clone,
    {
        let matches = self.cached_matches(&Q::type_keys());
        let Some(pools) = Q::pools(&self.pools) else {
            return;
        };
        out.reserve(matches.len());
        out.extend(matches.iter().filter_map(|&entity| Q::fetch(pools, entity).map(|items| (data.clone(), items))));
    }

    /// As [`EntityManager::get_components`], tagging each set with `data` and its entity.
    pub fn get_components_with_entities_and_data<'s, Q, D>(&'s self, data: D, out: &mut Vec<(D, Entity, Q::Items<'s>)>)
    where
        Q: ComponentSet<K>,
        D: Clone,
    {
        let matches = self.cached_matches(&Q::type_keys());
        let Some(pools) = Q::pools(&self.pools) else {
            return;
        };
        out.reserve(matches.len());
        out.extend(
            matches
                .iter()
                .filter_map(|&entity| Q::fetch(pools, entity).map(|items| (data.clone(), entity, items))),
        );
    }

    /// Appends exclusive component sets of every entity matching `Q` to `out`.
    pub fn get_components_mut<'s, Q: ComponentSet<K>>(&'s mut self, out: &mut Vec<Q::ItemsMut<'s>>) {
        self.for_each_component_set::<Q, _>(|items| out.push(items));
    }

    // ── Scheduled actions ───────────────────────────────────────────────────

    /// Queues a default `T` for `entity` and returns it for filling in.
    pub fn schedule_add_component<T>(&mut self, entity: Entity) -> &mut T
    where
        T: Component<K> + Default,
    {
        self.actions.schedule_add_component::<T>(entity)
    }

    /// Queues `value` for `entity`.
    pub fn schedule_add_component_value<T: Component<K>>(&mut self, entity: Entity, value: T) -> &mut T {
        self.actions.schedule_add_component_value(entity, value)
    }

    /// Queues removal of `entity`'s `T`.
    pub fn schedule_remove_component<T: Component<K>>(&mut self, entity: Entity) {
        self.actions.schedule_remove_component::<T>(entity);
    }

    /// The pending action queue.
    pub fn scheduled_actions_mut(&mut self) -> &mut ScheduledActions<K> {
        &mut self.actions
    }

    /// Applies every queued action in recording order and empties the queue.
    ///
    /// Actions targeting entities that are no longer live are skipped. A
    /// scheduled addition for a type the entity already has keeps the
    /// existing component.
    pub fn execute_scheduled_actions(&mut self) {
        let mut actions = std::mem::take(&mut self.actions);
        for action in actions.drain() {
            self.apply(action);
        }
        self.actions = actions;
    }

    fn apply(&mut self, action: ScheduledAction<K>) {
        match action {
            ScheduledAction::AddComponent { entity, type_key, component } => {
                if !self.entities.contains(&entity) {
                    tracing::trace!(%entity, key = %type_key, "skipping scheduled addition for removed entity");
                    return;
                }
                let inserted = match self.erased_pool_mut(&type_key) {
                    Ok(pool) => pool.insert_boxed(entity, component).map_err(|e| e.with_key(&type_key)),
                    Err(err) => Err(err),
                };
                match inserted {
                    Ok(true) => self.touch(),
                    Ok(false) => {}
                    Err(err) => tracing::warn!(%entity, error = %err, "dropping scheduled component"),
                }
            }
            ScheduledAction::RemoveComponent { entity, type_key } => {
                if self.entities.contains(&entity) {
                    self.remove_component_by_key(entity, &type_key);
                }
            }
        }
    }

    // ── Whole-store operations ──────────────────────────────────────────────

    /// Moves `entity` and all of its components into `other` and returns
    /// the entity under which they live there.
    ///
    /// Components are moved, not copied. The entity stops being live here.
    /// If `other` already has a live entity with the same id, the
    /// components are moved under a fresh id drawn from `other`'s
    /// generator; otherwise the id is kept. Transferring an entity that is
    /// not live is a no-op returning `entity`.
    ///
    /// ## Errors
    /// [`ComponentError::TypeMismatch`] if `other` stores, or would build a
    /// pool for, one of the entity's component keys with a different
    /// payload type. Both stores are left untouched in that case.
    pub fn transfer_entity_to(
        &mut self,
        other: &mut EntityManager<K>,
        entity: Entity,
    ) -> Result<Entity, ComponentError> {
        if !self.entities.contains(&entity) {
            return Ok(entity);
        }

        for (key, pool) in &self.pools {
            if !pool.contains(entity) {
                continue;
            }
            let expected = match other.pools.get(key) {
                Some(destination) => Some((destination.element_type_id(), destination.element_type_name())),
                None => other.factory.descriptor(key).map(|desc| (desc.type_id, desc.type_name)),
            };
            if let Some((type_id, type_name)) = expected {
                if type_id != pool.element_type_id() {
                    return Err(TypeMismatchError { expected: pool.element_type_name(), actual: type_name }.with_key(key));
                }
            }
        }

        let target = if other.entities.contains(&entity) { other.fresh_entity() } else { entity };

        for (key, pool) in self.pools.iter_mut() {
            if !pool.contains(entity) {
                continue;
            }
            let destination = match other.pools.entry(key.clone()) {
                Entry::Occupied(slot) => slot.into_mut(),
                Entry::Vacant(slot) => {
                    let fresh = other.factory.create_pool(key).unwrap_or_else(|_| pool.empty_clone());
                    slot.insert(fresh)
                }
            };
            pool.relocate_dyn(entity, destination.as_mut(), target).map_err(|e| e.with_key(key))?;
        }

        self.entities.remove(&entity);
        other.entities.insert(target);
        self.touch();
        other.touch();
        tracing::trace!(%entity, %target, "transferred entity between stores");
        Ok(target)
    }

    /// Replaces this store's content with a deep copy of `other`.
    ///
    /// Every component is copied through its registered clone function
    /// exactly once. Previous entities and components of this store are
    /// destroyed. Index settings follow `other`, and this store adopts
    /// `other`'s generator so new ids never collide with copied ones.
    ///
    /// ## Errors
    /// [`ComponentError::NotCloneable`] if `other` holds components of a
    /// type registered without clone support. This store is left untouched
    /// in that case.
    pub fn override_by(&mut self, other: &EntityManager<K>) -> Result<(), ComponentError> {
        let mut pools = PoolMap::with_capacity(other.pools.len());
        for (key, pool) in &other.pools {
            let copy = if pool.is_empty() {
                pool.empty_clone()
            } else {
                pool.clone_pool().ok_or_else(|| ComponentError::NotCloneable { key: key.to_string() })?
            };
            pools.insert(key.clone(), copy);
        }

        self.pools = pools;
        self.entities = other.entities.clone();
        self.generator = Arc::clone(&other.generator);
        self.actions.clear();
        self.touch();
        tracing::debug!(entities = self.entities.len(), "store overridden by deep copy");
        Ok(())
    }

    /// Moves the whole content out, leaving this store empty.
    ///
    /// Components are not copied, so references into the returned store's
    /// pools stay valid for the same components.
    pub fn take(&mut self) -> Self {
        let empty = Self::with_generator(Arc::clone(&self.factory), Arc::clone(&self.generator));
        std::mem::replace(self, empty)
    }

    /// Destroys every entity and component. Index settings are kept.
    pub fn clear(&mut self) {
        self.entities.clear();
        for pool in self.pools.values_mut() {
            pool.clear();
        }
        self.actions.clear();
        self.touch();
    }

    /// Drops every cached query result.
    pub fn clear_caches(&self) {
        self.caches.lock().clear();
    }

    // ── Internals ───────────────────────────────────────────────────────────

    /// Next generator id that is not live in this store.
    fn fresh_entity(&self) -> Entity {
        loop {
            let entity = self.generator.generate_next();
            if !self.entities.contains(&entity) {
                return entity;
            }
            tracing::trace!(%entity, "skipping generated id that is already live");
        }
    }

    fn touch(&mut self) {
        self.structure_version = self.structure_version.wrapping_add(1);
    }

    /// Entities having every key in `keys`, cached per key list.
    fn cached_matches(&self, keys: &[K]) -> Arc<[Entity]> {
        let mut caches = self.caches.lock();
        if let Some(cached) = caches.get(keys) {
            if cached.version == self.structure_version {
                return Arc::clone(&cached.entities);
            }
        }
        let entities: Arc<[Entity]> = self.collect_matches(keys).into();
        caches.insert(keys.to_vec(), CachedMatch { version: self.structure_version, entities: Arc::clone(&entities) });
        entities
    }

    fn collect_matches(&self, keys: &[K]) -> Vec<Entity> {
        let mut pools: Vec<&dyn ErasedPool> = Vec::with_capacity(keys.len());
        for key in keys {
            match self.pools.get(key) {
                Some(pool) => pools.push(&**pool),
                None => return Vec::new(),
            }
        }

        let driver = pools
            .iter()
            .find_map(|pool| pool.index_entities())
            .or_else(|| pools.iter().min_by_key(|pool| pool.len()).map(|pool| pool.entities()))
            .unwrap_or(&[]);

        driver
            .iter()
            .copied()
            .filter(|&entity| pools.iter().all(|pool| pool.contains(entity)))
            .collect()
    }

    /// Typed pool for `T`, created on first use.
    fn pool_mut<T>(&mut self) -> &mut ComponentPool<T>
    where
        T: Component<K> + Default,
    {
        let key = T::type_key();
        let factory = &self.factory;
        let pool = self.pools.entry(key.clone()).or_insert_with(|| match factory.create_pool(&key) {
            Ok(pool) => pool,
            Err(err) => {
                debug_assert!(false, "{err}");
                tracing::warn!(error = %err, "creating pool for unregistered component type");
                Box::new(ComponentPool::<T>::new(T::default, None))
            }
        });
        match pool.as_any_mut().downcast_mut::<ComponentPool<T>>() {
            Some(pool) => pool,
            None => panic!("component type `{key}` is registered for a different payload type"),
        }
    }

    /// Type-erased pool for `key`, created through the factory on first use.
    fn erased_pool_mut(&mut self, key: &K) -> Result<&mut Box<dyn ErasedPool>, ComponentError> {
        match self.pools.entry(key.clone()) {
            Entry::Occupied(slot) => Ok(slot.into_mut()),
            Entry::Vacant(slot) => Ok(slot.insert(self.factory.create_pool(key)?)),
        }
    }
}
