//! # Component Registry
//!
//! This module maps caller-chosen component type keys to the function
//! pointers needed to build storage for them.
//!
//! ## Purpose
//! Stores never see payload types directly when they need to create a pool
//! for a key (deferred additions, transfers into a store that has not seen
//! the type yet, deep copies). The [`ComponentFactory`] records, per key,
//! how to build an empty [`ComponentPool`] and which constructor and clone
//! function that pool should capture.
//!
//! ## Design
//! - A component implements [`Component<K>`], naming its key through
//!   [`Component::type_key`].
//! - [`ComponentFactory::register_component`] captures `T::default`.
//!   [`ComponentFactory::register_cloneable_component`] additionally captures
//!   `T::clone`, which is the only path through which the engine ever copies
//!   a payload.
//! - The factory is built once and then shared read-only between stores
//!   through an `Arc`.
//!
//! ## Invariants
//! - A key maps to exactly one payload type and a payload type to exactly one key.
//! - Every registered key has a pool constructor.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::mem::{align_of, size_of};

use crate::engine::error::ComponentError;
use crate::engine::storage::{ComponentPool, ErasedPool};
use crate::engine::types::ComponentKey;


/// A payload type that can be attached to entities.
///
/// ## Example
/// ```
/// use raccoon_ecs::Component;
///
/// #[derive(Default)]
/// struct Health(i32);
///
/// impl Component<&'static str> for Health {
///     fn type_key() -> &'static str { "Health" }
/// }
/// ```
pub trait Component<K: ComponentKey>: Any + Send + Sync {
    /// Runtime key identifying this payload type.
    fn type_key() -> K;
}

/// Constructs an empty pool for a registered payload type.
type PoolFactoryFn = fn() -> Box<dyn ErasedPool>;

/// Constructs a default payload behind a type-erased box.
type DefaultFactoryFn = fn() -> Box<dyn Any + Send + Sync>;

fn new_pool<T: Default + Send + Sync + 'static>() -> Box<dyn ErasedPool> {
    Box::new(ComponentPool::<T>::new(T::default, None))
}

fn new_cloneable_pool<T: Default + Clone + Send + Sync + 'static>() -> Box<dyn ErasedPool> {
    Box::new(ComponentPool::<T>::new(T::default, Some(T::clone)))
}

fn new_default<T: Default + Send + Sync + 'static>() -> Box<dyn Any + Send + Sync> {
    Box::new(T::default())
}

/// Metadata recorded for one registered component type.
///
/// ## Fields
/// * `key`: runtime key of the type.
/// * `type_id` / `type_name`: Rust identity of the payload.
/// * `size` / `align`: layout of one payload slot.
/// * `cloneable`: whether pools of this type support deep copies.
#[derive(Clone)]
pub struct ComponentDesc<K> {
    /// Runtime key of the type.
    pub key: K,
    /// Rust type identity of the payload.
    pub type_id: TypeId,
    /// Payload type name, for diagnostics.
    pub type_name: &'static str,
    /// Size of one payload in bytes.
    pub size: usize,
    /// Alignment of one payload in bytes.
    pub align: usize,
    /// Whether deep copies are supported.
    pub cloneable: bool,
    make_pool: PoolFactoryFn,
    make_default: DefaultFactoryFn,
}

impl<K: fmt::Display> fmt::Display for ComponentDesc<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}; size={}, align={}{})",
            self.key,
            self.type_name,
            self.size,
            self.align,
            if self.cloneable { ", cloneable" } else { "" }
        )
    }
}

impl<K> fmt::Debug for ComponentDesc<K>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDesc")
            .field("key", &self.key)
            .field("type_name", &self.type_name)
            .field("size", &self.size)
            .field("align", &self.align)
            .field("cloneable", &self.cloneable)
            .finish()
    }
}

/// Registry mapping component type keys to pool constructors.
///
/// ## Purpose
/// Shared by every store that uses the same set of component types.
///
/// ## Example
/// ```
/// use std::sync::Arc;
/// use raccoon_ecs::{Component, ComponentFactory, EntityManager};
///
/// #[derive(Default, Clone)]
/// struct Position(f32, f32);
///
/// impl Component<&'static str> for Position {
///     fn type_key() -> &'static str { "Position" }
/// }
///
/// let mut factory = ComponentFactory::new();
/// factory.register_cloneable_component::<Position>().unwrap();
/// let manager = EntityManager::new(Arc::new(factory));
/// assert!(!manager.has_any_entities());
/// ```
pub struct ComponentFactory<K: ComponentKey> {
    by_key: HashMap<K, ComponentDesc<K>>,
    by_type: HashMap<TypeId, K>,
}

impl<K: ComponentKey> Default for ComponentFactory<K> {
    fn default() -> Self {
        Self { by_key: HashMap::new(), by_type: HashMap::new() }
    }
}

impl<K: ComponentKey> fmt::Debug for ComponentFactory<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.by_key.values()).finish()
    }
}

impl<K: ComponentKey> ComponentFactory<K> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` without clone support.
    ///
    /// Stores holding `T` can still move and transfer it, but
    /// `override_by` on such a store fails.
    ///
    /// ## Errors
    /// [`ComponentError::AlreadyRegistered`] if `T`'s key or `T` itself is
    /// already registered.
    pub fn register_component<T>(&mut self) -> Result<(), ComponentError>
    where
        T: Component<K> + Default,
    {
        self.insert_desc::<T>(new_pool::<T>, false)
    }

    /// Registers `T` and captures its clone function for deep copies.
    ///
    /// ## Errors
    /// [`ComponentError::AlreadyRegistered`] if `T`'s key or `T` itself is
    /// already registered.
    pub fn register_cloneable_component<T>(&mut self) -> Result<(), ComponentError>
    where
        T: Component<K> + Default + Clone,
    {
        self.insert_desc::<T>(new_cloneable_pool::<T>, true)
    }

    fn insert_desc<T>(&mut self, make_pool: PoolFactoryFn, cloneable: bool) -> Result<(), ComponentError>
    where
        T: Component<K> + Default,
    {
        let key = T::type_key();
        let type_id = TypeId::of::<T>();
        if self.by_key.contains_key(&key) || self.by_type.contains_key(&type_id) {
            return Err(ComponentError::AlreadyRegistered { key: key.to_string() });
        }

        let desc = ComponentDesc {
            key: key.clone(),
            type_id,
            type_name: type_name::<T>(),
            size: size_of::<T>(),
            align: align_of::<T>(),
            cloneable,
            make_pool,
            make_default: new_default::<T>,
        };
        tracing::debug!(component = %desc, "registered component type");
        self.by_type.insert(type_id, key.clone());
        self.by_key.insert(key, desc);
        Ok(())
    }

    /// Returns `true` if `key` is registered.
    #[inline]
    pub fn is_registered(&self, key: &K) -> bool {
        self.by_key.contains_key(key)
    }

    /// Returns `true` if the payload type `T` is registered under its key.
    pub fn is_type_registered<T: Component<K>>(&self) -> bool {
        self.by_key
            .get(&T::type_key())
            .is_some_and(|desc| desc.type_id == TypeId::of::<T>())
    }

    /// Metadata for `key`.
    #[inline]
    pub fn descriptor(&self, key: &K) -> Option<&ComponentDesc<K>> {
        self.by_key.get(key)
    }

    /// Key registered for payload type `T`.
    pub fn key_of<T: 'static>(&self) -> Option<&K> {
        self.by_type.get(&TypeId::of::<T>())
    }

    /// Registered keys, in unspecified order.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.by_key.keys()
    }

    /// Number of registered component types.
    #[inline]
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Returns `true` if nothing is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Builds an empty pool for `key`.
    ///
    /// ## Errors
    /// [`ComponentError::Unregistered`] if `key` is unknown.
    pub fn create_pool(&self, key: &K) -> Result<Box<dyn ErasedPool>, ComponentError> {
        self.by_key
            .get(key)
            .map(|desc| (desc.make_pool)())
            .ok_or_else(|| ComponentError::Unregistered { key: key.to_string() })
    }

    /// Builds a default payload for `key` behind a type-erased box.
    ///
    /// ## Errors
    /// [`ComponentError::Unregistered`] if `key` is unknown.
    pub fn create_default(&self, key: &K) -> Result<Box<dyn Any + Send + Sync>, ComponentError> {
        self.by_key
            .get(key)
            .map(|desc| (desc.make_default)())
            .ok_or_else(|| ComponentError::Unregistered { key: key.to_string() })
    }
}


/// A component of some entity together with its type key.
///
/// Returned by `get_all_entity_components`-style queries that cannot know
/// payload types statically.
pub struct TypedComponent<'a, K> {
    /// Key of the component's type.
    pub type_key: K,
    /// The component itself.
    pub component: &'a dyn Any,
}

impl<'a, K> TypedComponent<'a, K> {
    /// Typed access to the component, if it is a `T`.
    pub fn downcast<T: 'static>(&self) -> Option<&'a T> {
        self.component.downcast_ref::<T>()
    }
}

impl<K: fmt::Debug> fmt::Debug for TypedComponent<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedComponent").field("type_key", &self.type_key).finish_non_exhaustive()
    }
}
