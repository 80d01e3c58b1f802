//! Typed multi-component queries.
//!
//! A query names a tuple of component types, e.g. `(Transform, Movement)`,
//! and visits every entity owning *all* of them. This module provides the
//! [`ComponentSet`] trait that turns such a tuple into pool lookups; the
//! iteration and caching policy lives in
//! [`EntityManager`](crate::engine::manager::EntityManager).
//!
//! ## Access modes
//! * Shared: `Items<'a>` is a tuple of `&'a T`.
//! * Exclusive: `ItemsMut<'a>` is a tuple of `&'a mut T`, produced from raw
//!   pool parts so that several entities can be borrowed at once.
//! * Optional: `Refs<'a>` / `OptionalMut<'a>` hold `Option<&T>` per type
//!   for single-entity lookups where absent components are normal.
//!
//! ## Invariants
//! * A tuple must not name the same component type twice. Exclusive access
//!   to such a tuple yields nothing; debug builds assert on it.
//!
//! Implemented for tuples of one to eight component types.

use std::collections::HashMap;

use crate::engine::component::Component;
use crate::engine::entity::Entity;
use crate::engine::storage::{ComponentPool, ErasedPool, PoolRawParts};
use crate::engine::types::ComponentKey;

/// Pools of a store, keyed by component type key.
pub type PoolMap<K> = HashMap<K, Box<dyn ErasedPool>>;

/// Typed view of the pool registered for `T`, if one exists.
#[inline]
pub fn typed_pool<K: ComponentKey, T: Component<K>>(pools: &PoolMap<K>) -> Option<&ComponentPool<T>> {
    pools.get(&T::type_key())?.as_any().downcast_ref::<ComponentPool<T>>()
}

/// Exclusive typed view of the pool registered for `T`, if one exists.
#[inline]
pub fn typed_pool_mut<K: ComponentKey, T: Component<K>>(pools: &mut PoolMap<K>) -> Option<&mut ComponentPool<T>> {
    pools.get_mut(&T::type_key())?.as_any_mut().downcast_mut::<ComponentPool<T>>()
}

/// A tuple of component types that can be queried together.
pub trait ComponentSet<K: ComponentKey>: 'static {
    /// `Option<&T>` per type.
    type Refs<'a>
    where
        Self: 'a;

    /// `Option<&mut T>` per type.
    type OptionalMut<'a>
    where
        Self: 'a;

    /// `&T` per type.
    type Items<'a>
    where
        Self: 'a;

    /// `&mut T` per type.
    type ItemsMut<'a>
    where
        Self: 'a;

    /// `&ComponentPool<T>` per type.
    type Pools<'a>: Copy + Send + Sync
    where
        Self: 'a;

    /// Raw pool parts per type.
    type RawParts;

    /// Keys of the queried types, in tuple order.
    fn type_keys() -> Vec<K>;

    /// Typed pools, or `None` if any queried type has no pool.
    fn pools(pools: &PoolMap<K>) -> Option<Self::Pools<'_>>;

    /// Components of `entity`, or `None` if it lacks any of them.
    fn fetch(pools: Self::Pools<'_>, entity: Entity) -> Option<Self::Items<'_>>;

    /// Components of `entity`, `None` per missing type.
    fn fetch_optional(pools: &PoolMap<K>, entity: Entity) -> Self::Refs<'_>;

    /// Exclusive components of `entity`, `None` per missing type.
    fn fetch_optional_mut(pools: &mut PoolMap<K>, entity: Entity) -> Self::OptionalMut<'_>;

    /// Raw parts of every queried pool, or `None` if any is missing or a
    /// type is repeated.
    fn raw_parts(pools: &mut PoolMap<K>) -> Option<Self::RawParts>;

    /// Exclusive components of `entity` through raw parts.
    ///
    /// # Safety
    /// Same contract as [`PoolRawParts::get_mut`] for every queried pool:
    /// the pools must stay alive and untouched for `'a` and each entity may
    /// be fetched at most once while its references are alive.
    unsafe fn fetch_mut<'a>(parts: &Self::RawParts, entity: Entity) -> Option<Self::ItemsMut<'a>>;
}

fn keys_are_distinct<K: ComponentKey>(keys: &[K]) -> bool {
    keys.iter().enumerate().all(|(i, key)| !keys[..i].contains(key))
}

macro_rules! impl_component_set {
    ($(($t:ident, $var:ident, $key:ident)),+) => {
        impl<K: ComponentKey, $($t: Component<K>),+> ComponentSet<K> for ($($t,)+) {
            type Refs<'a> = ($(Option<&'a $t>,)+);
            type OptionalMut<'a> = ($(Option<&'a mut $t>,)+);
            type Items<'a> = ($(&'a $t,)+);
            type ItemsMut<'a> = ($(&'a mut $t,)+);
            type Pools<'a> = ($(&'a ComponentPool<$t>,)+);
            type RawParts = ($(PoolRawParts<$t>,)+);

            fn type_keys() -> Vec<K> {
                vec![$($t::type_key()),+]
            }

            fn pools(pools: &PoolMap<K>) -> Option<Self::Pools<'_>> {
                Some(($(typed_pool::<K, $t>(pools)?,)+))
            }

            fn fetch(pools: Self::Pools<'_>, entity: Entity) -> Option<Self::Items<'_>> {
                let ($($var,)+) = pools;
                Some(($($var.get(entity)?,)+))
            }

            fn fetch_optional(pools: &PoolMap<K>, entity: Entity) -> Self::Refs<'_> {
                ($(typed_pool::<K, $t>(pools).and_then(|pool| pool.get(entity)),)+)
            }

            fn fetch_optional_mut(pools: &mut PoolMap<K>, entity: Entity) -> Self::OptionalMut<'_> {
                $(let $key = $t::type_key();)+
                debug_assert!(keys_are_distinct(&[$($key.clone()),+]), "component set repeats a type");
                $(let mut $var: Option<&mut $t> = None;)+
                for (key, pool) in pools.iter_mut() {
                    $(
                        if *key == $key {
                            $var = pool.as_any_mut().downcast_mut::<ComponentPool<$t>>().and_then(|p| p.get_mut(entity));
                            continue;
                        }
                    )+
                }
                ($($var,)+)
            }

            fn raw_parts(pools: &mut PoolMap<K>) -> Option<Self::RawParts> {
                $(let $key = $t::type_key();)+
                if !keys_are_distinct(&[$($key.clone()),+]) {
                    debug_assert!(false, "component set repeats a type");
                    return None;
                }
                $(let mut $var: Option<PoolRawParts<$t>> = None;)+
                for (key, pool) in pools.iter_mut() {
                    $(
                        if *key == $key {
                            $var = pool.as_any_mut().downcast_mut::<ComponentPool<$t>>().map(ComponentPool::raw_parts);
                            continue;
                        }
                    )+
                }
                Some(($($var?,)+))
            }

            unsafe fn fetch_mut<'a>(parts: &Self::RawParts, entity: Entity) -> Option<Self::ItemsMut<'a>> {
                let ($($var,)+) = parts;
                // SAFETY: forwarded to the caller; pools are distinct by construction.
                Some(($(unsafe { $var.get_mut(entity)? },)+))
            }
        }
    };
}

impl_component_set!((A, a, key_a));
impl_component_set!((A, a, key_a), (B, b, key_b));
impl_component_set!((A, a, key_a), (B, b, key_b), (C, c, key_c));
impl_component_set!((A, a, key_a), (B, b, key_b), (C, c, key_c), (D, d, key_d));
impl_component_set!((A, a, key_a), (B, b, key_b), (C, c, key_c), (D, d, key_d), (E, e, key_e));
impl_component_set!((A, a, key_a), (B, b, key_b), (C, c, key_c), (D, d, key_d), (E, e, key_e), (F, f, key_f));
impl_component_set!(
    (A, a, key_a), (B, b, key_b), (C, c, key_c), (D, d, key_d),
    (E, e, key_e), (F, f, key_f), (G, g, key_g)
);
impl_component_set!(
    (A, a, key_a), (B, b, key_b), (C, c, key_c), (D, d, key_d),
    (E, e, key_e), (F, f, key_f), (G, g, key_g), (H, h, key_h)
);


#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug, PartialEq)]
    struct A(i32);
    #[derive(Default, Debug, PartialEq)]
    struct B(i32);

    impl Component<char> for A { fn type_key() -> char { 'a' } }
    impl Component<char> for B { fn type_key() -> char { 'b' } }

    fn pools() -> PoolMap<char> {
        let mut a = ComponentPool::<A>::new(A::default, None);
        a.add(Entity::new(1)).0 = 1;
        a.add(Entity::new(2)).0 = 2;
        let mut b = ComponentPool::<B>::new(B::default, None);
        b.add(Entity::new(2)).0 = 20;

        let mut pools = PoolMap::new();
        pools.insert('a', Box::new(a) as Box<dyn ErasedPool>);
        pools.insert('b', Box::new(b) as Box<dyn ErasedPool>);
        pools
    }

    #[test]
    fn fetch_requires_every_component() {
        let pools = pools();
        let typed = <(A, B) as ComponentSet<char>>::pools(&pools).unwrap();
        assert!(<(A, B) as ComponentSet<char>>::fetch(typed, Entity::new(1)).is_none());
        assert_eq!(<(A, B) as ComponentSet<char>>::fetch(typed, Entity::new(2)), Some((&A(2), &B(20))));
    }

    #[test]
    fn optional_fetch_reports_missing_components_individually() {
        let mut pools = pools();
        assert_eq!(<(A, B) as ComponentSet<char>>::fetch_optional(&pools, Entity::new(1)), (Some(&A(1)), None));
        if let (Some(a), Some(b)) = <(A, B) as ComponentSet<char>>::fetch_optional_mut(&mut pools, Entity::new(2)) {
            a.0 += b.0;
        }
        assert_eq!(typed_pool::<char, A>(&pools).and_then(|p| p.get(Entity::new(2))), Some(&A(22)));
    }

    #[test]
    fn raw_parts_hand_out_disjoint_references() {
        let mut pools = pools();
        let parts = <(A,) as ComponentSet<char>>::raw_parts(&mut pools).unwrap();
        // SAFETY: distinct entities, pools untouched while the references live.
        let (first,) = unsafe { <(A,) as ComponentSet<char>>::fetch_mut(&parts, Entity::new(1)) }.unwrap();
        let (second,) = unsafe { <(A,) as ComponentSet<char>>::fetch_mut(&parts, Entity::new(2)) }.unwrap();
        std::mem::swap(&mut first.0, &mut second.0);
        assert_eq!(typed_pool::<char, A>(&pools).and_then(|p| p.get(Entity::new(1))), Some(&A(2)));
    }

    #[test]
    fn missing_pool_yields_no_pools() {
        let mut pools = pools();
        pools.remove(&'b');
        assert!(<(A, B) as ComponentSet<char>>::pools(&pools).is_none());
        assert!(<(A, B) as ComponentSet<char>>::raw_parts(&mut pools).is_none());
    }
}
