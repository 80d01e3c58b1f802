//! Component bag for a single implicit entity.
//!
//! [`ComponentSetHolder`] keeps at most one component per type for an
//! owner that is not part of any [`EntityManager`](crate::engine::manager::EntityManager),
//! such as world-wide settings or a prefab template. It uses the same
//! [`ComponentPool`] storage as a store, keyed by a fixed owner entity,
//! so deep copies and moves follow the same rules.

use std::fmt;
use std::sync::Arc;

use crate::engine::component::{Component, ComponentFactory, TypedComponent};
use crate::engine::entity::Entity;
use crate::engine::error::ComponentError;
use crate::engine::query::{typed_pool, typed_pool_mut, ComponentSet, PoolMap};
use crate::engine::storage::ComponentPool;
use crate::engine::types::ComponentKey;

const OWNER: Entity = Entity::new(0);

/// At most one component per type, without entities.
pub struct ComponentSetHolder<K: ComponentKey> {
    factory: Arc<ComponentFactory<K>>,
    pools: PoolMap<K>,
}

impl<K: ComponentKey> fmt::Debug for ComponentSetHolder<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let held: Vec<_> = self.pools.iter().filter(|(_, pool)| !pool.is_empty()).map(|(key, _)| key).collect();
        f.debug_struct("ComponentSetHolder").field("components", &held).finish()
    }
}

impl<K: ComponentKey> ComponentSetHolder<K> {
    /// Creates an empty holder building pools from `factory`.
    pub fn new(factory: Arc<ComponentFactory<K>>) -> Self {
        Self { factory, pools: PoolMap::new() }
    }

    /// Stores a fresh default `T`, destroying any previous one, and returns it.
    pub fn add_component<T: Component<K> + Default>(&mut self) -> &mut T {
        let pool = self.pool_mut::<T>();
        pool.remove(OWNER);
        pool.add(OWNER)
    }

    /// Stores `value`, destroying any previous `T`, and returns it.
    pub fn add_component_value<T: Component<K> + Default>(&mut self, value: T) -> &mut T {
        let pool = self.pool_mut::<T>();
        pool.remove(OWNER);
        pool.insert(OWNER, value).0
    }

    /// Returns the held `T`, default-constructing it if absent.
    pub fn get_or_add_component<T: Component<K> + Default>(&mut self) -> &mut T {
        self.pool_mut::<T>().add(OWNER)
    }

    /// The held `T`, if any.
    pub fn get_component<T: Component<K>>(&self) -> Option<&T> {
        typed_pool::<K, T>(&self.pools)?.get(OWNER)
    }

    /// Exclusive access to the held `T`, if any.
    pub fn get_component_mut<T: Component<K>>(&mut self) -> Option<&mut T> {
        typed_pool_mut::<K, T>(&mut self.pools)?.get_mut(OWNER)
    }

    /// Components named by `Q`, `None` per missing type.
    pub fn get_components<Q: ComponentSet<K>>(&self) -> Q::Refs<'_> {
        Q::fetch_optional(&self.pools, OWNER)
    }

    /// Exclusive components named by `Q`, `None` per missing type.
    pub fn get_components_mut<Q: ComponentSet<K>>(&mut self) -> Q::OptionalMut<'_> {
        Q::fetch_optional_mut(&mut self.pools, OWNER)
    }

    /// Returns `true` if a `T` is held.
    pub fn has_component<T: Component<K>>(&self) -> bool {
        self.pools.get(&T::type_key()).is_some_and(|pool| pool.contains(OWNER))
    }

    /// Destroys the component held under `key`. Returns `false` if there was none.
    pub fn remove_component(&mut self, key: &K) -> bool {
        self.pools.get_mut(key).is_some_and(|pool| pool.remove_entity(OWNER))
    }

    /// Returns `true` if any component is held.
    pub fn has_any_components(&self) -> bool {
        self.pools.values().any(|pool| pool.contains(OWNER))
    }

    /// Every held component with its type key, in unspecified order.
    pub fn get_all_components(&self) -> Vec<TypedComponent<'_, K>> {
        self.pools
            .iter()
            .filter_map(|(key, pool)| pool.get_dyn(OWNER).map(|component| TypedComponent { type_key: key.clone(), component }))
            .collect()
    }

    /// Replaces the content with a deep copy of `other`.
    ///
    /// ## Errors
    /// [`ComponentError::NotCloneable`] if `other` holds a component
    /// registered without clone support; `self` is unchanged then.
    pub fn override_by(&mut self, other: &ComponentSetHolder<K>) -> Result<(), ComponentError> {
        let mut pools = PoolMap::with_capacity(other.pools.len());
        for (key, pool) in &other.pools {
            if pool.is_empty() {
                continue;
            }
            let copy = pool.clone_pool().ok_or_else(|| ComponentError::NotCloneable { key: key.to_string() })?;
            pools.insert(key.clone(), copy);
        }
        self.pools = pools;
        Ok(())
    }

    /// Moves every component out into a new holder, leaving this one empty.
    pub fn take(&mut self) -> Self {
        Self { factory: Arc::clone(&self.factory), pools: std::mem::take(&mut self.pools) }
    }

    /// Destroys every held component.
    pub fn clear(&mut self) {
        self.pools.clear();
    }

    fn pool_mut<T: Component<K> + Default>(&mut self) -> &mut ComponentPool<T> {
        let key = T::type_key();
        let factory = &self.factory;
        let pool = self.pools.entry(key.clone()).or_insert_with(|| {
            factory.create_pool(&key).unwrap_or_else(|err| {
                debug_assert!(false, "{err}");
                Box::new(ComponentPool::<T>::new(T::default, None))
            })
        });
        match pool.as_any_mut().downcast_mut::<ComponentPool<T>>() {
            Some(pool) => pool,
            None => panic!("component type `{key}` is registered for a different payload type"),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Clone, Debug, PartialEq)]
    struct Gravity(i32);

    impl Component<u8> for Gravity {
        fn type_key() -> u8 { 7 }
    }

    #[test]
    fn add_component_replaces_while_get_or_add_keeps() {
        let mut factory = ComponentFactory::new();
        factory.register_cloneable_component::<Gravity>().unwrap();
        let mut holder = ComponentSetHolder::new(Arc::new(factory));

        holder.add_component::<Gravity>().0 = 9;
        assert_eq!(holder.get_or_add_component::<Gravity>().0, 9);
        assert_eq!(holder.add_component::<Gravity>().0, 0);
    }

    #[test]
    fn take_moves_components_out() {
        let mut factory = ComponentFactory::new();
        factory.register_cloneable_component::<Gravity>().unwrap();
        let mut holder = ComponentSetHolder::new(Arc::new(factory));
        holder.add_component::<Gravity>().0 = 3;

        let taken = holder.take();
        assert!(!holder.has_any_components());
        assert_eq!(taken.get_component::<Gravity>(), Some(&Gravity(3)));
    }
}
