//! System abstractions.
//!
//! A **system** is a unit of per-tick logic. Systems own whatever handles
//! they need (typically one or more
//! [`SharedEntityManager`](crate::engine::manager::SharedEntityManager)s)
//! and are driven by
//! [`AsyncSystemsManager`](crate::engine::scheduler::AsyncSystemsManager),
//! which runs each system once per tick on a pool worker.
//!
//! ## Ordering
//! Systems are registered under a string identifier together with
//! [`SystemDependencies`] naming the systems they must run after. The
//! scheduler resolves those names into a
//! [`DependencyGraph`](crate::engine::dependency::DependencyGraph) at init.
//!
//! Systems without an ordering relation may run concurrently. Guarding
//! shared stores against overlapping writes is the systems' job, usually
//! through the store's `RwLock`.
//!
//! ## Function-backed Systems
//! [`FnSystem`] wraps a closure, so simple systems need no dedicated type.

/// A unit of executable logic run once per tick.
///
/// Systems must be `Send` so they can be executed on worker threads. The
/// scheduler never runs the same system on two threads at once.
pub trait System: Send {
    /// Runs the system for one tick.
    fn update(&mut self);
}

/// A [`System`] backed by a closure.
///
/// ## Example
/// ```
/// use raccoon_ecs::{FnSystem, System};
///
/// let mut ticks = 0;
/// let mut system = FnSystem::new(move || ticks += 1);
/// system.update();
/// ```
pub struct FnSystem<F>
where
    F: FnMut() + Send + 'static,
{
    f: F,
}

impl<F> FnSystem<F>
where
    F: FnMut() + Send + 'static,
{
    /// Wraps `f`, called once per tick.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> System for FnSystem<F>
where
    F: FnMut() + Send + 'static,
{
    fn update(&mut self) {
        (self.f)()
    }
}

/// Identifiers of the systems a system must run after.
///
/// ```
/// use raccoon_ecs::SystemDependencies;
///
/// let deps = SystemDependencies::new().goes_after("Physics").goes_after("Input");
/// assert_eq!(deps.predecessors(), ["Physics", "Input"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemDependencies {
    goes_after: Vec<String>,
}

impl SystemDependencies {
    /// No ordering constraints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a predecessor by identifier.
    pub fn goes_after(mut self, system_id: impl Into<String>) -> Self {
        let system_id = system_id.into();
        if !self.goes_after.contains(&system_id) {
            self.goes_after.push(system_id);
        }
        self
    }

    /// Declared predecessors, in declaration order.
    pub fn predecessors(&self) -> &[String] {
        &self.goes_after
    }
}
