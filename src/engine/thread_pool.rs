//! # Thread Pool
//!
//! Persistent worker threads executing tasks tagged with a [`TaskGroup`].
//!
//! ## Model
//! Each group owns a task stack, a result stack and a pending counter.
//! - `execute_task` bumps the group's pending counter *before* queueing,
//!   so a concurrent `finalize_tasks` can never miss the task.
//! - Workers pop tasks from any group. A task without a finalizer
//!   completes as soon as it returns. A task with a finalizer pushes its
//!   result and stays pending until the finalizer has run.
//! - `finalize_tasks(g)` blocks the calling thread until group `g` has no
//!   pending work. While blocked it runs finalizers of `g` inline and
//!   executes queued tasks of `g` itself, so it may be called from inside
//!   a task or a finalizer.
//!
//! ## Nesting
//! A thread waiting on group `g` only helps with group `g`. If every
//! thread able to run a task of `g` is itself blocked on another group
//! whose work is queued behind it, the wait cannot finish. Size the pool
//! for the deepest nesting of distinct groups you use.
//!
//! ## Shutdown
//! Dropping the pool stops the workers after their current task and joins
//! them. Tasks still queued are dropped without running.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use crate::engine::async_stack::AsyncStack;
use crate::engine::config::EngineConfig;
use crate::engine::error::ThreadPoolError;
use crate::engine::types::TaskGroup;

/// Opaque value produced by a task and handed to its finalizer.
pub type TaskResult = Box<dyn Any + Send>;

/// Completion callback receiving a task's result.
pub type Finalizer = Box<dyn FnOnce(TaskResult) + Send>;

struct Task {
    run: Box<dyn FnOnce() -> TaskResult + Send>,
    finalizer: Option<Finalizer>,
}

struct Finished {
    result: TaskResult,
    finalizer: Finalizer,
}

#[derive(Default)]
struct GroupState {
    tasks: AsyncStack<Task>,
    results: AsyncStack<Finished>,
    pending: AtomicUsize,
}

struct Shared {
    groups: Mutex<HashMap<TaskGroup, Arc<GroupState>>>,
    queued: AtomicUsize,
    shutdown: AtomicBool,
    signal: Mutex<()>,
    work_available: Condvar,
    progress: Condvar,
}

impl Shared {
    fn group(&self, group: TaskGroup) -> Arc<GroupState> {
        Arc::clone(self.groups.lock().entry(group).or_default())
    }

    fn pop_task(&self, state: &GroupState) -> Option<Task> {
        let task = state.tasks.pop_front()?;
        self.queued.fetch_sub(1, Ordering::AcqRel);
        Some(task)
    }

    fn pop_any_task(&self) -> Option<(TaskGroup, Arc<GroupState>, Task)> {
        if self.queued.load(Ordering::Acquire) == 0 {
            return None;
        }
        let groups = self.groups.lock();
        groups
            .iter()
            .find_map(|(&group, state)| self.pop_task(state).map(|task| (group, Arc::clone(state), task)))
    }

    fn run(&self, group: TaskGroup, state: &GroupState, task: Task) {
        let Task { run, finalizer } = task;
        match panic::catch_unwind(AssertUnwindSafe(run)) {
            Ok(result) => match finalizer {
                Some(finalizer) => {
                    state.results.push_front(Finished { result, finalizer });
                    self.notify_progress();
                }
                None => self.complete(state),
            },
            Err(_) => {
                tracing::error!(group, "task panicked; its finalizer will not run");
                self.complete(state);
            }
        }
    }

    fn complete(&self, state: &GroupState) {
        let previous = state.pending.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "task group completed more work than it was given");
        self.notify_progress();
    }

    fn notify_progress(&self) {
        let _guard = self.signal.lock();
        self.progress.notify_all();
    }

    fn worker_loop(self: Arc<Self>) {
        loop {
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }
            if let Some((group, state, task)) = self.pop_any_task() {
                tracing::trace!(group, "worker picked task");
                self.run(group, &state, task);
                continue;
            }
            let mut guard = self.signal.lock();
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }
            if self.queued.load(Ordering::Acquire) == 0 {
                self.work_available.wait(&mut guard);
            }
        }
    }
}

/// Cloneable handle for submitting and awaiting tasks.
///
/// Tasks that need to submit more work capture a handle.
#[derive(Clone)]
pub struct ThreadPoolHandle {
    shared: Arc<Shared>,
}

impl fmt::Debug for ThreadPoolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPoolHandle")
            .field("queued", &self.shared.queued.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl ThreadPoolHandle {
    /// Queues `task` in `group`.
    ///
    /// The task's return value is boxed and passed to `finalizer`, which
    /// runs on whichever thread calls [`ThreadPoolHandle::finalize_tasks`]
    /// for `group`. Without a finalizer the result is dropped.
    pub fn execute_task<F, R>(&self, task: F, finalizer: Option<Finalizer>, group: TaskGroup)
    where
        F: FnOnce() -> R + Send + 'static,
        R: Any + Send,
    {
        let state = self.shared.group(group);
        state.pending.fetch_add(1, Ordering::AcqRel);
        self.shared.queued.fetch_add(1, Ordering::AcqRel);
        state.tasks.push_front(Task {
            run: Box::new(move || Box::new(task()) as TaskResult),
            finalizer,
        });

        let _guard = self.shared.signal.lock();
        self.shared.work_available.notify_one();
        self.shared.progress.notify_all();
    }

    /// Blocks until every task of `group` and its finalizer have completed,
    /// including work submitted to `group` while waiting.
    ///
    /// The calling thread runs the group's finalizers and helps executing
    /// its queued tasks. See the module docs for the nesting constraint.
    pub fn finalize_tasks(&self, group: TaskGroup) {
        let shared = &*self.shared;
        let state = shared.group(group);
        loop {
            if let Some(Finished { result, finalizer }) = state.results.pop_front() {
                finalizer(result);
                shared.complete(&state);
                continue;
            }
            if state.pending.load(Ordering::Acquire) == 0 {
                return;
            }
            if let Some(task) = shared.pop_task(&state) {
                shared.run(group, &state, task);
                continue;
            }

            let mut guard = shared.signal.lock();
            if state.results.is_empty() && state.tasks.is_empty() && state.pending.load(Ordering::Acquire) != 0 {
                shared.progress.wait(&mut guard);
            }
        }
    }

    /// Number of tasks queued but not yet picked up, over all groups.
    pub fn queued_tasks(&self) -> usize {
        self.shared.queued.load(Ordering::Acquire)
    }
}

/// Owner of the worker threads. Dereferences to its [`ThreadPoolHandle`].
///
/// ## Example
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use raccoon_ecs::{ThreadPool, DEFAULT_TASK_GROUP};
///
/// let pool = ThreadPool::new(2).unwrap();
/// let done = Arc::new(AtomicUsize::new(0));
/// for _ in 0..4 {
///     let done = Arc::clone(&done);
///     pool.execute_task(move || { done.fetch_add(1, Ordering::SeqCst); }, None, DEFAULT_TASK_GROUP);
/// }
/// pool.finalize_tasks(DEFAULT_TASK_GROUP);
/// assert_eq!(done.load(Ordering::SeqCst), 4);
/// ```
pub struct ThreadPool {
    handle: ThreadPoolHandle,
    workers: Vec<JoinHandle<()>>,
    thread_name_prefix: String,
}

impl Default for ThreadPool {
    /// A pool without workers. Tasks run on threads calling `finalize_tasks`
    /// until [`ThreadPool::spawn_threads`] adds workers.
    fn default() -> Self {
        let shared = Shared {
            groups: Mutex::new(HashMap::new()),
            queued: AtomicUsize::new(0),
            shutdown: AtomicBool::new(false),
            signal: Mutex::new(()),
            work_available: Condvar::new(),
            progress: Condvar::new(),
        };
        Self {
            handle: ThreadPoolHandle { shared: Arc::new(shared) },
            workers: Vec::new(),
            thread_name_prefix: EngineConfig::default().thread_name_prefix,
        }
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool").field("workers", &self.workers.len()).finish_non_exhaustive()
    }
}

impl Deref for ThreadPool {
    type Target = ThreadPoolHandle;

    fn deref(&self) -> &ThreadPoolHandle {
        &self.handle
    }
}

impl ThreadPool {
    /// Creates a pool with `threads` workers.
    ///
    /// ## Errors
    /// [`ThreadPoolError::Spawn`] if the OS refuses to start a worker.
    pub fn new(threads: usize) -> Result<Self, ThreadPoolError> {
        let mut pool = Self::default();
        pool.spawn_threads(threads)?;
        Ok(pool)
    }

    /// Creates a pool sized and named by `config`.
    pub fn with_config(config: &EngineConfig) -> Result<Self, ThreadPoolError> {
        let mut pool = Self::default();
        pool.thread_name_prefix = config.thread_name_prefix.clone();
        pool.spawn_threads(config.worker_threads)?;
        Ok(pool)
    }

    /// Starts `count` additional workers.
    pub fn spawn_threads(&mut self, count: usize) -> Result<(), ThreadPoolError> {
        for _ in 0..count {
            let index = self.workers.len();
            let shared = Arc::clone(&self.handle.shared);
            let worker = thread::Builder::new()
                .name(format!("{}-{index}", self.thread_name_prefix))
                .spawn(move || shared.worker_loop())
                .map_err(|source| ThreadPoolError::Spawn { index, source })?;
            self.workers.push(worker);
        }
        tracing::debug!(workers = self.workers.len(), "thread pool workers spawned");
        Ok(())
    }

    /// Number of worker threads.
    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }

    /// A cloneable handle to this pool.
    pub fn handle(&self) -> ThreadPoolHandle {
        self.handle.clone()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        let shared = &self.handle.shared;
        shared.shutdown.store(true, Ordering::Release);
        {
            let _guard = shared.signal.lock();
            shared.work_available.notify_all();
            shared.progress.notify_all();
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("thread pool worker panicked");
            }
        }

        // Queued tasks may hold handles to this pool; dropping them breaks the cycle.
        let groups: Vec<_> = shared.groups.lock().drain().map(|(_, state)| state).collect();
        let dropped: usize = groups.iter().map(|state| state.tasks.drain().len() + state.results.drain().len()).sum();
        if dropped > 0 {
            tracing::warn!(dropped, "thread pool dropped with unfinished tasks");
        }
        tracing::debug!("thread pool shut down");
    }
}
