//! Sparse-set component storage.
//!
//! This module implements the per-type component pool used by
//! [`EntityManager`](crate::engine::manager::EntityManager) and
//! [`ComponentSetHolder`](crate::engine::holder::ComponentSetHolder).
//!
//! ## Layout
//! A [`ComponentPool<T>`] keeps three parallel structures:
//! * a dense `Vec<T>` holding payloads contiguously,
//! * a dense `Vec<Entity>` naming the owner of each slot,
//! * a sparse `HashMap<Entity, usize>` resolving an owner to its slot.
//!
//! An optional [`PoolIndex`] mirrors pool membership with its own
//! sparse/dense pair. Once enabled it is maintained on every insert and
//! removal, and queries prefer it as their driver.
//!
//! ## Invariants
//! * Slot `i` of the dense arrays belongs to exactly one entity, and the
//!   sparse entry of that entity resolves to `i`.
//! * Removal swaps the last slot into the vacated one and repairs the
//!   sparse entry of the moved owner. The index is repaired separately,
//!   since its dense order diverges from the pool's after the first removal.
//! * Payloads are created through the constructor captured at registration
//!   and only ever cloned through the registered clone function.
//!
//! ## Type erasure
//! Stores hold pools as `Box<dyn ErasedPool>`. [`ErasedPool`] exposes the
//! operations that do not need the payload type (membership, removal,
//! relocation between pools, deep copy) and allows downcasting back to the
//! typed pool through [`ErasedPool::as_any`].

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;

use crate::engine::entity::Entity;
use crate::engine::error::TypeMismatchError;


/// Secondary membership structure of a pool.
///
/// Same sparse/dense shape as the pool itself, kept in lock-step with every
/// insertion and removal once enabled.
#[derive(Debug, Default, Clone)]
pub struct PoolIndex {
    sparse: HashMap<Entity, usize>,
    dense: Vec<Entity>,
}

impl PoolIndex {
    fn from_entities(entities: &[Entity]) -> Self {
        let mut index = Self::default();
        for &entity in entities {
            index.insert(entity);
        }
        index
    }

    fn insert(&mut self, entity: Entity) {
        if self.sparse.contains_key(&entity) {
            return;
        }
        self.sparse.insert(entity, self.dense.len());
        self.dense.push(entity);
    }

    fn remove(&mut self, entity: Entity) -> bool {
        let Some(position) = self.sparse.remove(&entity) else {
            return false;
        };
        self.dense.swap_remove(position);
        if let Some(&moved) = self.dense.get(position) {
            self.sparse.insert(moved, position);
        }
        true
    }

    /// Indexed entities in index order.
    #[inline]
    pub fn entities(&self) -> &[Entity] {
        &self.dense
    }

    /// Returns `true` if `entity` is indexed.
    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.sparse.contains_key(&entity)
    }

    #[cfg(debug_assertions)]
    fn is_consistent(&self) -> bool {
        self.sparse.len() == self.dense.len()
            && self.dense.iter().enumerate().all(|(i, e)| self.sparse.get(e) == Some(&i))
    }
}


/// Dense storage for every component of one payload type.
///
/// ## Construction
/// Pools are created through a
/// [`ComponentFactory`](crate::engine::component::ComponentFactory), which
/// captures the default constructor and, for cloneable components, the
/// clone function of `T`.
///
/// ## Example
/// ```
/// use raccoon_ecs::{ComponentPool, Entity};
///
/// let mut pool = ComponentPool::<i32>::new(Default::default, None);
/// *pool.add(Entity::new(1)) = 10;
/// *pool.add(Entity::new(2)) = 20;
/// pool.remove(Entity::new(1));
/// assert_eq!(pool.get(Entity::new(2)), Some(&20));
/// assert_eq!(pool.len(), 1);
/// ```
pub struct ComponentPool<T> {
    /// Payloads, contiguous.
    dense: Vec<T>,

    /// Owner of each dense slot.
    owners: Vec<Entity>,

    /// Owner to dense slot.
    sparse: HashMap<Entity, usize>,

    /// Optional membership index.
    index: Option<PoolIndex>,

    /// Constructor captured at registration.
    create_fn: fn() -> T,

    /// Clone function captured at registration, if the payload supports it.
    clone_fn: Option<fn(&T) -> T>,
}

impl<T: Send + Sync + 'static> ComponentPool<T> {
    /// Creates an empty pool with the given constructor and optional clone function.
    pub fn new(create_fn: fn() -> T, clone_fn: Option<fn(&T) -> T>) -> Self {
        Self {
            dense: Vec::new(),
            owners: Vec::new(),
            sparse: HashMap::new(),
            index: None,
            create_fn,
            clone_fn,
        }
    }

    /// Creates an empty pool sharing this pool's captured functions and index setting.
    pub fn empty_like(&self) -> Self {
        let mut pool = Self::new(self.create_fn, self.clone_fn);
        if self.index.is_some() {
            pool.index = Some(PoolIndex::default());
        }
        pool
    }

    /// Number of stored components.
    #[inline]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Returns `true` if the pool holds no components.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Returns `true` if `entity` owns a component in this pool.
    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.sparse.contains_key(&entity)
    }

    /// Returns `true` if components of this type can be deep-copied.
    #[inline]
    pub fn is_cloneable(&self) -> bool {
        self.clone_fn.is_some()
    }

    /// Dense slot of `entity`'s component.
    #[inline]
    pub fn slot_of(&self, entity: Entity) -> Option<usize> {
        self.sparse.get(&entity).copied()
    }

    /// Constructs a default component for `entity` and returns it.
    ///
    /// If `entity` already owns a component here, the existing instance is
    /// returned untouched and nothing is constructed.
    pub fn add(&mut self, entity: Entity) -> &mut T {
        let slot = match self.sparse.get(&entity) {
            Some(&slot) => slot,
            None => self.push_new(entity, (self.create_fn)()),
        };
        &mut self.dense[slot]
    }

    /// Inserts a prepared component for `entity`.
    ///
    /// ## Returns
    /// The stored component and whether `value` was inserted. When
    /// `entity` already owns a component, `value` is dropped and the
    /// existing instance is returned.
    pub fn insert(&mut self, entity: Entity, value: T) -> (&mut T, bool) {
        match self.sparse.get(&entity) {
            Some(&slot) => (&mut self.dense[slot], false),
            None => {
                let slot = self.push_new(entity, value);
                (&mut self.dense[slot], true)
            }
        }
    }

    fn push_new(&mut self, entity: Entity, value: T) -> usize {
        let slot = self.dense.len();
        self.dense.push(value);
        self.owners.push(entity);
        self.sparse.insert(entity, slot);
        if let Some(index) = self.index.as_mut() {
            index.insert(entity);
        }
        slot
    }

    /// Removes and returns `entity`'s component.
    ///
    /// The last occupied slot is swapped into the vacated one and the sparse
    /// entries of both the pool and its index are repaired independently.
    /// Returns `None` if `entity` owns nothing here.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let slot = self.sparse.remove(&entity)?;
        let value = self.dense.swap_remove(slot);
        self.owners.swap_remove(slot);
        if let Some(&moved) = self.owners.get(slot) {
            self.sparse.insert(moved, slot);
        }
        if let Some(index) = self.index.as_mut() {
            index.remove(entity);
        }
        debug_assert!(self.is_consistent());
        Some(value)
    }

    /// Shared access to `entity`'s component.
    #[inline]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.sparse.get(&entity).map(|&slot| &self.dense[slot])
    }

    /// Exclusive access to `entity`'s component.
    #[inline]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        match self.sparse.get(&entity) {
            Some(&slot) => Some(&mut self.dense[slot]),
            None => None,
        }
    }

    /// Owners in dense order.
    #[inline]
    pub fn entities(&self) -> &[Entity] {
        &self.owners
    }

    /// Payloads in dense order.
    #[inline]
    pub fn values(&self) -> &[T] {
        &self.dense
    }

    /// Iterates `(owner, component)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> + '_ {
        self.owners.iter().copied().zip(self.dense.iter())
    }

    /// Iterates `(owner, component)` pairs in dense order with exclusive access.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> + '_ {
        self.owners.iter().copied().zip(self.dense.iter_mut())
    }

    /// Enables the membership index, seeding it with the current owners.
    ///
    /// Enabling an already-enabled index is a no-op.
    pub fn init_index(&mut self) {
        if self.index.is_none() {
            self.index = Some(PoolIndex::from_entities(&self.owners));
        }
    }

    /// Returns the membership index, if enabled.
    #[inline]
    pub fn index(&self) -> Option<&PoolIndex> {
        self.index.as_ref()
    }

    /// Destroys every component, keeping the index setting.
    pub fn clear(&mut self) {
        self.dense.clear();
        self.owners.clear();
        self.sparse.clear();
        if let Some(index) = self.index.as_mut() {
            *index = PoolIndex::default();
        }
    }

    /// Moves `entity`'s component into `destination` under `target`
    /// without copying it.
    ///
    /// Returns `false` if `entity` owns nothing here. If `destination`
    /// already holds a component for `target`, the moved value is dropped.
    pub fn relocate_to(&mut self, entity: Entity, destination: &mut ComponentPool<T>, target: Entity) -> bool {
        match self.remove(entity) {
            Some(value) => {
                destination.insert(target, value);
                true
            }
            None => false,
        }
    }

    /// Deep-copies the pool, invoking the registered clone function exactly
    /// once per component. Returns `None` for non-cloneable payloads.
    pub fn try_clone(&self) -> Option<Self> {
        let clone_fn = self.clone_fn?;
        Some(Self {
            dense: self.dense.iter().map(clone_fn).collect(),
            owners: self.owners.clone(),
            sparse: self.sparse.clone(),
            index: self.index.clone(),
            create_fn: self.create_fn,
            clone_fn: self.clone_fn,
        })
    }

    /// Raw handles for handing out disjoint exclusive references.
    ///
    /// See [`PoolRawParts::get_mut`] for the rules callers must follow.
    pub fn raw_parts(&mut self) -> PoolRawParts<T> {
        let base = self.dense.as_mut_ptr();
        PoolRawParts { pool: self as *const Self, base }
    }

    #[cfg(debug_assertions)]
    fn is_consistent(&self) -> bool {
        self.dense.len() == self.owners.len()
            && self.sparse.len() == self.owners.len()
            && self.index.as_ref().map_or(true, PoolIndex::is_consistent)
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    fn is_consistent(&self) -> bool {
        true
    }
}


/// Raw pointers into a [`ComponentPool`], used by multi-component queries
/// to hand out exclusive references to several entities at once.
pub struct PoolRawParts<T> {
    pool: *const ComponentPool<T>,
    base: *mut T,
}

impl<T> PoolRawParts<T> {
    /// Exclusive reference to `entity`'s component.
    ///
    /// # Safety
    /// * The pool these parts came from must outlive `'a` and must not be
    ///   structurally modified (insert, remove, clear) or otherwise accessed
    ///   while any returned reference is alive.
    /// * Each entity may be requested at most once while earlier references
    ///   obtained for it are alive.
    #[inline]
    pub unsafe fn get_mut<'a>(&self, entity: Entity) -> Option<&'a mut T> {
        // SAFETY: caller guarantees the pool is alive and not being mutated.
        let slot = unsafe { (*self.pool).sparse.get(&entity).copied()? };
        // SAFETY: slot < len by the pool invariant; caller guarantees uniqueness.
        Some(unsafe { &mut *self.base.add(slot) })
    }
}


/// Payload-agnostic view of a [`ComponentPool`].
pub trait ErasedPool: Any + Send + Sync {
    /// Returns an immutable type-erased reference for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns a mutable type-erased reference for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Returns the `TypeId` of the payload type.
    fn element_type_id(&self) -> TypeId;

    /// Returns the human-readable name of the payload type.
    fn element_type_name(&self) -> &'static str;

    /// Number of stored components.
    fn len(&self) -> usize;

    /// Returns `true` if the pool holds no components.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `entity` owns a component in this pool.
    fn contains(&self, entity: Entity) -> bool;

    /// Owners in dense order.
    fn entities(&self) -> &[Entity];

    /// Constructs a default component for `entity` unless one exists.
    fn add_default(&mut self, entity: Entity);

    /// Destroys `entity`'s component. Returns `false` if there was none.
    fn remove_entity(&mut self, entity: Entity) -> bool;

    /// Inserts a boxed payload for `entity`.
    ///
    /// # Errors
    /// Returns [`TypeMismatchError`] if `value` does not hold this pool's
    /// payload type. An existing component for `entity` is kept and the
    /// value dropped.
    fn insert_boxed(&mut self, entity: Entity, value: Box<dyn Any + Send + Sync>) -> Result<bool, TypeMismatchError>;

    /// Shared type-erased access to `entity`'s component.
    fn get_dyn(&self, entity: Entity) -> Option<&dyn Any>;

    /// Exclusive type-erased access to `entity`'s component.
    fn get_dyn_mut(&mut self, entity: Entity) -> Option<&mut dyn Any>;

    /// Enables the membership index.
    fn init_index(&mut self);

    /// Returns `true` if the membership index is enabled.
    fn has_index(&self) -> bool;

    /// Indexed entities, if the index is enabled.
    fn index_entities(&self) -> Option<&[Entity]>;

    /// Moves `entity`'s component into `destination` under `target`.
    /// `destination` must store the same payload type. No payload is copied.
    ///
    /// # Errors
    /// Returns [`TypeMismatchError`] if `destination` stores another type;
    /// in that case neither pool is modified.
    fn relocate_dyn(
        &mut self,
        entity: Entity,
        destination: &mut dyn ErasedPool,
        target: Entity,
    ) -> Result<bool, TypeMismatchError>;

    /// Returns `true` if [`ErasedPool::clone_pool`] can succeed.
    fn is_cloneable(&self) -> bool;

    /// Deep copy, or `None` if the payload was registered without clone support.
    fn clone_pool(&self) -> Option<Box<dyn ErasedPool>>;

    /// Empty pool of the same payload type and index setting.
    fn empty_clone(&self) -> Box<dyn ErasedPool>;

    /// Destroys every component.
    fn clear(&mut self);
}

impl<T: Send + Sync + 'static> ErasedPool for ComponentPool<T> {
    fn as_any(&self) -> &dyn Any { self }

    fn as_any_mut(&mut self) -> &mut dyn Any { self }

    fn element_type_id(&self) -> TypeId { TypeId::of::<T>() }

    fn element_type_name(&self) -> &'static str { type_name::<T>() }

    fn len(&self) -> usize { ComponentPool::len(self) }

    fn contains(&self, entity: Entity) -> bool { ComponentPool::contains(self, entity) }

    fn entities(&self) -> &[Entity] { ComponentPool::entities(self) }

    fn add_default(&mut self, entity: Entity) {
        self.add(entity);
    }

    fn remove_entity(&mut self, entity: Entity) -> bool {
        self.remove(entity).is_some()
    }

    fn insert_boxed(&mut self, entity: Entity, value: Box<dyn Any + Send + Sync>) -> Result<bool, TypeMismatchError> {
        let value = value.downcast::<T>().map_err(|_| TypeMismatchError {
            expected: type_name::<T>(),
            actual: "a different payload type",
        })?;
        Ok(self.insert(entity, *value).1)
    }

    fn get_dyn(&self, entity: Entity) -> Option<&dyn Any> {
        self.get(entity).map(|value| value as &dyn Any)
    }

    fn get_dyn_mut(&mut self, entity: Entity) -> Option<&mut dyn Any> {
        self.get_mut(entity).map(|value| value as &mut dyn Any)
    }

    fn init_index(&mut self) { ComponentPool::init_index(self) }

    fn has_index(&self) -> bool { self.index.is_some() }

    fn index_entities(&self) -> Option<&[Entity]> {
        self.index.as_ref().map(PoolIndex::entities)
    }

    fn relocate_dyn(
        &mut self,
        entity: Entity,
        destination: &mut dyn ErasedPool,
        target: Entity,
    ) -> Result<bool, TypeMismatchError> {
        let actual = destination.element_type_name();
        let destination = destination
            .as_any_mut()
            .downcast_mut::<ComponentPool<T>>()
            .ok_or(TypeMismatchError { expected: type_name::<T>(), actual })?;
        Ok(self.relocate_to(entity, destination, target))
    }

    fn is_cloneable(&self) -> bool { ComponentPool::is_cloneable(self) }

    fn clone_pool(&self) -> Option<Box<dyn ErasedPool>> {
        self.try_clone().map(|pool| Box::new(pool) as Box<dyn ErasedPool>)
    }

    fn empty_clone(&self) -> Box<dyn ErasedPool> {
        Box::new(self.empty_like())
    }

    fn clear(&mut self) { ComponentPool::clear(self) }
}
