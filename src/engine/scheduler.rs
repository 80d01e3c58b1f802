//! System scheduling and execution.
//!
//! [`AsyncSystemsManager`] owns the registered systems, the dependency
//! graph built from their declared predecessors and the worker pool that
//! runs them.
//!
//! ## Tick
//! One call to [`AsyncSystemsManager::update`]:
//! 1. builds a [`SystemDependencyTracer`] over the graph,
//! 2. marks every ready system as running and submits it to the pool,
//! 3. in each system's finalizer marks it finished and submits whatever
//!    became ready,
//! 4. blocks in `finalize_tasks` on the scheduler group until the last
//!    finalizer has run.
//!
//! Finalizers run on the thread calling `update`, so tracer updates are
//! never contended by workers.
//!
//! ## Memory safety of shared stores
//! The scheduler only guarantees ordering. Systems that touch the same
//! store without an ordering edge must synchronize through the store's lock.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::engine::config::EngineConfig;
use crate::engine::dependency::{DependencyGraph, SystemDependencyTracer};
use crate::engine::error::ScheduleError;
use crate::engine::systems::{System, SystemDependencies};
use crate::engine::thread_pool::{ThreadPool, ThreadPoolHandle};
use crate::engine::types::{SystemIndex, TaskGroup};


struct RegisteredSystem {
    id: Arc<str>,
    system: Arc<Mutex<Box<dyn System>>>,
    dependencies: SystemDependencies,
}

/// State shared by the tasks and finalizers of one tick.
struct Tick {
    pool: ThreadPoolHandle,
    group: TaskGroup,
    tracer: Mutex<SystemDependencyTracer>,
    systems: Vec<(Arc<str>, Arc<Mutex<Box<dyn System>>>)>,
}

impl Tick {
    fn dispatch_ready(self: &Arc<Self>) {
        let ready = {
            let mut tracer = self.tracer.lock();
            let ready = tracer.get_next_systems_to_run();
            for &index in &ready {
                tracer.run_system(index);
            }
            ready
        };

        for index in ready {
            let task_tick = Arc::clone(self);
            let finalizer_tick = Arc::clone(self);
            self.pool.execute_task(
                move || task_tick.run_system(index),
                Some(Box::new(move |_| {
                    finalizer_tick.tracer.lock().finish_system(index);
                    finalizer_tick.dispatch_ready();
                })),
                self.group,
            );
        }
    }

    fn run_system(&self, index: SystemIndex) {
        let (id, system) = &self.systems[index];
        let _span = tracing::trace_span!("system", id = %id).entered();
        system.lock().update();
    }
}

/// Registry and driver of the systems of one simulation.
///
/// ## Example
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use raccoon_ecs::{AsyncSystemsManager, FnSystem, SystemDependencies};
///
/// let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
/// let mut manager = AsyncSystemsManager::new();
///
/// let log = Arc::clone(&order);
/// manager.register_system("Render", FnSystem::new(move || log.lock().push("Render")),
///     SystemDependencies::new().goes_after("Physics")).unwrap();
/// let log = Arc::clone(&order);
/// manager.register_system("Physics", FnSystem::new(move || log.lock().push("Physics")),
///     SystemDependencies::new()).unwrap();
///
/// manager.init(2).unwrap();
/// manager.update().unwrap();
/// assert_eq!(*order.lock(), ["Physics", "Render"]);
/// ```
pub struct AsyncSystemsManager {
    systems: Vec<RegisteredSystem>,
    graph: Option<Arc<DependencyGraph>>,
    pool: Option<ThreadPool>,
    group: TaskGroup,
}

impl Default for AsyncSystemsManager {
    fn default() -> Self {
        Self { systems: Vec::new(), graph: None, pool: None, group: EngineConfig::default().scheduler_group }
    }
}

impl fmt::Debug for AsyncSystemsManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncSystemsManager")
            .field("systems", &self.system_ids().collect::<Vec<_>>())
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

impl AsyncSystemsManager {
    /// Manager without systems; call `init` after registering them.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `system` under `id`, to run after every system named in
    /// `dependencies`.
    ///
    /// Predecessors may be registered later; names are resolved by
    /// [`AsyncSystemsManager::init`]. Registering after `init` requires
    /// calling `init` again.
    ///
    /// ## Errors
    /// [`ScheduleError::DuplicateSystem`] if `id` is taken.
    pub fn register_system(
        &mut self,
        id: impl Into<String>,
        system: impl System + 'static,
        dependencies: SystemDependencies,
    ) -> Result<(), ScheduleError> {
        let id: String = id.into();
        if self.systems.iter().any(|registered| *registered.id == *id) {
            return Err(ScheduleError::DuplicateSystem { id });
        }
        tracing::debug!(system = %id, goes_after = ?dependencies.predecessors(), "registered system");
        self.systems.push(RegisteredSystem {
            id: Arc::from(id),
            system: Arc::new(Mutex::new(Box::new(system))),
            dependencies,
        });
        self.graph = None;
        Ok(())
    }

    /// Resolves dependencies and starts `threads` workers.
    pub fn init(&mut self, threads: usize) -> Result<(), ScheduleError> {
        let config = EngineConfig { worker_threads: threads, ..EngineConfig::default() };
        self.init_with_config(&config)
    }

    /// Resolves dependencies and starts the worker pool described by `config`.
    ///
    /// ## Errors
    /// * [`ScheduleError::UnknownDependency`] if a system goes after an
    ///   unregistered identifier.
    /// * [`ScheduleError::DependencyCycle`] if the declared order is cyclic.
    /// * [`ScheduleError::Pool`] if the workers cannot be started.
    pub fn init_with_config(&mut self, config: &EngineConfig) -> Result<(), ScheduleError> {
        let graph = self.build_graph()?;
        self.pool = Some(ThreadPool::with_config(config)?);
        self.group = config.scheduler_group;
        self.graph = Some(Arc::new(graph));
        tracing::debug!(systems = self.systems.len(), workers = config.worker_threads, "systems manager initialized");
        Ok(())
    }

    fn build_graph(&self) -> Result<DependencyGraph, ScheduleError> {
        let indices: HashMap<&str, SystemIndex> =
            self.systems.iter().enumerate().map(|(index, registered)| (&*registered.id, index)).collect();

        let mut graph = DependencyGraph::new();
        graph.init_nodes(self.systems.len());
        for (index, registered) in self.systems.iter().enumerate() {
            for predecessor in registered.dependencies.predecessors() {
                let Some(&dependency) = indices.get(predecessor.as_str()) else {
                    return Err(ScheduleError::UnknownDependency {
                        system: registered.id.to_string(),
                        dependency: predecessor.clone(),
                    });
                };
                graph.add_dependency(dependency, index);
            }
        }
        graph.finalize();

        if let Err(blocked) = graph.topological_order() {
            return Err(ScheduleError::DependencyCycle {
                systems: blocked.into_iter().map(|index| self.systems[index].id.to_string()).collect(),
            });
        }
        Ok(graph)
    }

    /// Runs every system once, respecting the declared order.
    ///
    /// ## Errors
    /// [`ScheduleError::NotInitialized`] if `init` has not been called since
    /// the last registration.
    pub fn update(&mut self) -> Result<(), ScheduleError> {
        let (Some(graph), Some(pool)) = (self.graph.as_ref(), self.pool.as_ref()) else {
            return Err(ScheduleError::NotInitialized);
        };
        let _span = tracing::debug_span!("systems_update", systems = self.systems.len()).entered();

        let tick = Arc::new(Tick {
            pool: pool.handle(),
            group: self.group,
            tracer: Mutex::new(SystemDependencyTracer::new(Arc::clone(graph))),
            systems: self
                .systems
                .iter()
                .map(|registered| (Arc::clone(&registered.id), Arc::clone(&registered.system)))
                .collect(),
        });
        tick.dispatch_ready();
        pool.finalize_tasks(self.group);

        let tracer = tick.tracer.lock();
        if !tracer.is_finished() {
            tracing::error!(running = tracer.running_count(), "tick ended before every system finished");
        }
        Ok(())
    }

    /// Identifiers of the registered systems, in registration order.
    pub fn system_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.systems.iter().map(|registered| &*registered.id)
    }

    /// Returns `true` if `update` may be called.
    pub fn is_initialized(&self) -> bool {
        self.graph.is_some() && self.pool.is_some()
    }

    /// Handle to the worker pool, for systems that submit their own tasks.
    pub fn thread_pool(&self) -> Option<ThreadPoolHandle> {
        self.pool.as_ref().map(ThreadPool::handle)
    }
}
