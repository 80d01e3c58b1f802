//! Core type aliases and trait bounds shared across the engine.
//!
//! This module centralizes the small vocabulary types used by storage,
//! scheduling and the thread pool so that their widths and bounds are
//! defined in exactly one place.
//!
//! ## Contents
//! * Entity identifier parts ([`RawEntityId`], [`EntityVersion`]).
//! * The [`ComponentKey`] bound every component type key must satisfy.
//! * Scheduling identifiers ([`SystemIndex`], [`TaskGroup`]).

use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Raw numeric identifier of an entity.
pub type RawEntityId = u64;

/// Reuse tag attached to an entity identifier.
///
/// Stores that never recycle ids leave this at `0`.
pub type EntityVersion = u32;

/// Dense index of a node in a [`DependencyGraph`](crate::engine::dependency::DependencyGraph).
pub type SystemIndex = usize;

/// Barrier scope used by the [`ThreadPool`](crate::engine::thread_pool::ThreadPool).
pub type TaskGroup = usize;

/// Group used when a caller does not name one.
pub const DEFAULT_TASK_GROUP: TaskGroup = 0;

/// Bound satisfied by every component type key.
///
/// A key identifies a component payload type at runtime. Strings, string
/// newtypes, integers and plain enums all qualify as long as they can be
/// compared, hashed and printed.
///
/// ## Example
/// ```
/// use std::fmt;
/// use raccoon_ecs::ComponentKey;
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
/// enum Kind { Transform, Movement }
///
/// impl fmt::Display for Kind {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         fmt::Debug::fmt(self, f)
///     }
/// }
///
/// fn assert_key<K: ComponentKey>() {}
/// assert_key::<Kind>();
/// assert_key::<String>();
/// assert_key::<u32>();
/// ```
pub trait ComponentKey: Eq + Hash + Clone + Debug + Display + Send + Sync + 'static {}

impl<T> ComponentKey for T where T: Eq + Hash + Clone + Debug + Display + Send + Sync + 'static {}
