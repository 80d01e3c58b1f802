//! # Entities
//!
//! [`Entity`] is a plain `Copy` identifier; stores key their pools by it.
//! [`OptionalEntity`] adds an invalid state for fields that may name no
//! entity.
//!
//! Ids come from an [`EntityGenerator`]. Every store owns one, and stores
//! that exchange entities usually share a single generator through
//! `Arc<dyn EntityGenerator>` so ids stay unique across them.

use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::engine::types::{EntityVersion, RawEntityId};

/// Opaque handle naming a bundle of components.
///
/// Equality and ordering use the raw id first and the version second.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Entity {
    id: RawEntityId,
    version: EntityVersion,
}

impl Entity {
    /// Entity `id` at version zero.
    #[inline] pub const fn new(id: RawEntityId) -> Self { Self { id, version: 0 } }
    /// Entity `id` at an explicit reuse version.
    #[inline] pub const fn with_version(id: RawEntityId, version: EntityVersion) -> Self { Self { id, version } }
    /// Raw identifier.
    #[inline] pub const fn id(self) -> RawEntityId { self.id }
    /// Reuse version.
    #[inline] pub const fn version(self) -> EntityVersion { self.version }
}

impl PartialOrd for Entity {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> { Some(self.cmp(other)) }
}

impl Ord for Entity {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        (self.id, self.version).cmp(&(other.id, other.version))
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version == 0 {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{}:{}", self.id, self.version)
        }
    }
}

/// An [`Entity`] or nothing.
///
/// The invalid value compares unequal to every real entity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct OptionalEntity(Option<Entity>);

impl OptionalEntity {
    /// Valid value wrapping `Entity::new(id)`.
    #[inline] pub const fn new(id: RawEntityId) -> Self { Self(Some(Entity::new(id))) }
    /// The value naming no entity; same as `Default`.
    #[inline] pub const fn invalid() -> Self { Self(None) }
    /// Returns `true` if an entity is wrapped.
    #[inline] pub const fn is_valid(self) -> bool { self.0.is_some() }
    /// The wrapped entity, if any.
    #[inline] pub const fn entity(self) -> Option<Entity> { self.0 }

    /// Raw id of the wrapped entity.
    ///
    /// # Panics
    /// Panics in debug builds when called on an invalid value; release builds return `0`.
    #[inline]
    pub fn id(self) -> RawEntityId {
        debug_assert!(self.is_valid(), "id() called on an invalid OptionalEntity");
        self.0.map_or(0, Entity::id)
    }
}

impl From<Entity> for OptionalEntity {
    fn from(entity: Entity) -> Self { Self(Some(entity)) }
}

impl From<Option<Entity>> for OptionalEntity {
    fn from(entity: Option<Entity>) -> Self { Self(entity) }
}

impl PartialEq<Entity> for OptionalEntity {
    fn eq(&self, other: &Entity) -> bool { self.0 == Some(*other) }
}

impl PartialEq<OptionalEntity> for Entity {
    fn eq(&self, other: &OptionalEntity) -> bool { other == self }
}

/// Source of fresh entity identifiers.
///
/// Generators are shared between stores, so they hand out ids through
/// `&self` and must be thread-safe.
pub trait EntityGenerator: Send + Sync {
    /// Hands out an id this generator has not returned before.
    fn generate_next(&self) -> Entity;
}

/// Monotonic counter starting at zero.
#[derive(Debug, Default)]
pub struct IncrementalEntityGenerator {
    next: AtomicU64,
}

impl IncrementalEntityGenerator {
    /// Counter starting at zero.
    pub fn new() -> Self { Self::default() }

    /// Starts counting at `first`.
    pub fn starting_at(first: RawEntityId) -> Self { Self { next: AtomicU64::new(first) } }
}

impl EntityGenerator for IncrementalEntityGenerator {
    fn generate_next(&self) -> Entity {
        Entity::new(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Deterministic pseudo-random id stream.
///
/// Uses xorshift64* over a shared atomic state. The state walk visits every
/// non-zero `u64` before repeating and the output multiply is a bijection,
/// so ids never collide within one generator.
#[derive(Debug)]
pub struct SeededEntityGenerator {
    state: AtomicU64,
}

const XORSHIFT_FALLBACK_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

impl SeededEntityGenerator {
    /// Stream seeded with `seed`. A zero seed is replaced by a fixed constant.
    pub fn new(seed: u64) -> Self {
        // zero is a fixed point of xorshift
        let seed = if seed == 0 { XORSHIFT_FALLBACK_SEED } else { seed };
        Self { state: AtomicU64::new(seed) }
    }
}

impl Default for SeededEntityGenerator {
    fn default() -> Self { Self::new(XORSHIFT_FALLBACK_SEED) }
}

#[inline]
fn xorshift_step(mut x: u64) -> u64 {
    x ^= x >> 12;
    x ^= x << 25;
    x ^= x >> 27;
    x
}

impl EntityGenerator for SeededEntityGenerator {
    fn generate_next(&self) -> Entity {
        let mut current = self.state.load(Ordering::Relaxed);
        loop {
            let next = xorshift_step(current);
            match self.state.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return Entity::new(next.wrapping_mul(0x2545_F491_4F6C_DD1D)),
                Err(observed) => current = observed,
            }
        }
    }
}
