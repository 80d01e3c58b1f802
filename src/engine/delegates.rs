//! Callback holders for notifying game code from systems.
//!
//! * [`SinglecastDelegate`] stores at most one callback; assigning replaces it.
//! * [`MulticastDelegate`] stores any number of callbacks and calls them in
//!   binding order.
//!
//! Callbacks are `Send` so delegates can live inside systems that run on
//! pool workers.

use std::fmt;

type Callback<A> = Box<dyn FnMut(A) + Send>;

/// A replaceable single callback.
pub struct SinglecastDelegate<A> {
    callback: Option<Callback<A>>,
}

impl<A> Default for SinglecastDelegate<A> {
    fn default() -> Self {
        Self { callback: None }
    }
}

impl<A> fmt::Debug for SinglecastDelegate<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinglecastDelegate").field("assigned", &self.is_assigned()).finish()
    }
}

impl<A> SinglecastDelegate<A> {
    /// Delegate without a callback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the callback, dropping the previous one.
    pub fn assign(&mut self, callback: impl FnMut(A) + Send + 'static) {
        self.callback = Some(Box::new(callback));
    }

    /// Drops the callback.
    pub fn clear(&mut self) {
        self.callback = None;
    }

    /// Returns `true` if a callback is set.
    pub fn is_assigned(&self) -> bool {
        self.callback.is_some()
    }

    /// Calls the callback with `args` if one is assigned.
    pub fn call_safe(&mut self, args: A) {
        if let Some(callback) = self.callback.as_mut() {
            callback(args);
        }
    }
}

/// An ordered list of callbacks receiving the same arguments.
pub struct MulticastDelegate<A> {
    callbacks: Vec<Callback<A>>,
}

impl<A> Default for MulticastDelegate<A> {
    fn default() -> Self {
        Self { callbacks: Vec::new() }
    }
}

impl<A> fmt::Debug for MulticastDelegate<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MulticastDelegate").field("bound", &self.callbacks.len()).finish()
    }
}

impl<A: Clone> MulticastDelegate<A> {
    /// Delegate without callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a callback.
    pub fn bind(&mut self, callback: impl FnMut(A) + Send + 'static) {
        self.callbacks.push(Box::new(callback));
    }

    /// Unbinds every callback.
    pub fn clear(&mut self) {
        self.callbacks.clear();
    }

    /// Number of bound callbacks.
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Returns `true` if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Calls every bound callback in binding order.
    pub fn broadcast(&mut self, args: A) {
        for callback in self.callbacks.iter_mut() {
            callback(args.clone());
        }
    }
}
