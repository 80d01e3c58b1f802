//! Error types for component registration, thread pools and scheduling.
//!
//! Only recoverable failures live here. Missing entities, missing
//! components and empty queues are ordinary results (`Option`, `bool`,
//! empty collections), and contract violations such as running a system
//! twice are assertions, not errors.
//!
//! ## Layout
//! Each concern owns one focused enum:
//! * [`ComponentError`]: registry lookups and type-erased pool access.
//! * [`ThreadPoolError`]: worker thread creation.
//! * [`ScheduleError`]: system registration and dependency resolution.
//! * [`ConfigError`]: engine configuration parsing.
//!
//! All of them convert into the aggregate [`EcsError`] through `From`, so
//! orchestration code can bubble failures with `?` into [`EcsResult`].
//!
//! ## Display vs. Debug
//! * `Display` is short and operator-facing.
//! * `Debug` (derived) keeps the full structure for diagnostics.

use std::fmt::Display;
use std::io;

use thiserror::Error;

/// Returned by a type-erased pool when it is handed a value or a peer pool
/// holding a different payload type.
///
/// Pools do not know their own type key, so the store attaches it with
/// [`TypeMismatchError::with_key`] before surfacing the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("pool type mismatch: expected {expected}, got {actual}")]
pub struct TypeMismatchError {
    /// Payload type the pool stores.
    pub expected: &'static str,
    /// Payload type that was offered.
    pub actual: &'static str,
}

impl TypeMismatchError {
    /// Attaches the component type key of the pool that rejected the value.
    pub fn with_key(self, key: impl Display) -> ComponentError {
        ComponentError::TypeMismatch { key: key.to_string(), expected: self.expected, actual: self.actual }
    }
}

/// Failures raised by the component registry and type-erased pools.
///
/// Keys are carried pre-rendered as strings so the error stays independent
/// of the caller's key type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
    /// No component type was registered under the key.
    #[error("component type `{key}` is not registered")]
    Unregistered {
        /// Rendered component type key.
        key: String,
    },

    /// A second registration used a key that is already taken.
    #[error("component type `{key}` is already registered")]
    AlreadyRegistered {
        /// Rendered component type key.
        key: String,
    },

    /// A pool or boxed value did not hold the expected payload type.
    #[error("component type `{key}` mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Rendered component type key.
        key: String,
        /// Name of the payload type the operation expected.
        expected: &'static str,
        /// Name of the payload type that was found.
        actual: &'static str,
    },

    /// The component type was registered without a clone function.
    #[error("component type `{key}` was registered without clone support")]
    NotCloneable {
        /// Rendered component type key.
        key: String,
    },
}

/// Failures raised while constructing a [`ThreadPool`](crate::engine::thread_pool::ThreadPool).
#[derive(Debug, Error)]
pub enum ThreadPoolError {
    /// The operating system refused to start a worker thread.
    #[error("failed to spawn worker thread {index}")]
    Spawn {
        /// Zero-based index of the worker that failed to start.
        index: usize,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

/// Failures raised while registering or initializing systems.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Two systems were registered with the same identifier.
    #[error("system `{id}` is already registered")]
    DuplicateSystem {
        /// Offending system identifier.
        id: String,
    },

    /// A system declared a predecessor that was never registered.
    #[error("system `{system}` goes after unknown system `{dependency}`")]
    UnknownDependency {
        /// System declaring the dependency.
        system: String,
        /// Identifier that could not be resolved.
        dependency: String,
    },

    /// The declared dependencies form a cycle.
    #[error("systems form a dependency cycle: {}", systems.join(" -> "))]
    DependencyCycle {
        /// Systems that could not be ordered.
        systems: Vec<String>,
    },

    /// `update` was called before `init`.
    #[error("systems manager is not initialized")]
    NotInitialized,

    /// The worker pool could not be created.
    #[error(transparent)]
    Pool(#[from] ThreadPoolError),
}

/// Failures raised while loading an [`EngineConfig`](crate::engine::config::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML source could not be parsed.
    #[error("invalid engine configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field held a value outside its valid range.
    #[error("invalid value for `{field}`: {reason}")]
    Invalid {
        /// Field name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Aggregate error for engine-level operations.
#[derive(Debug, Error)]
pub enum EcsError {
    /// Component registry or pool failure.
    #[error(transparent)]
    Component(#[from] ComponentError),

    /// Thread pool failure.
    #[error(transparent)]
    ThreadPool(#[from] ThreadPoolError),

    /// Scheduling failure.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result alias for engine-level operations.
pub type EcsResult<T> = Result<T, EcsError>;
