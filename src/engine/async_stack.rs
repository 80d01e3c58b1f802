//! Thread-safe LIFO used for the thread pool's task and result queues.

use std::fmt;

use parking_lot::Mutex;

/// A stack that any number of threads may push to and pop from.
///
/// `pop_front` never blocks on emptiness; it returns `None` right away.
/// Items pushed by one thread come back out in reverse order relative to
/// that thread's own pushes.
///
/// ## Example
/// ```
/// use raccoon_ecs::AsyncStack;
///
/// let stack = AsyncStack::new();
/// stack.push_front(10);
/// stack.push_front(20);
/// assert_eq!(stack.pop_front(), Some(20));
/// assert_eq!(stack.pop_front(), Some(10));
/// assert_eq!(stack.pop_front(), None);
/// ```
pub struct AsyncStack<T> {
    items: Mutex<Vec<T>>,
}

impl<T> Default for AsyncStack<T> {
    fn default() -> Self {
        Self { items: Mutex::new(Vec::new()) }
    }
}

impl<T> fmt::Debug for AsyncStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncStack").field("len", &self.len()).finish()
    }
}

impl<T> AsyncStack<T> {
    /// Empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `item` on top.
    pub fn push_front(&self, item: T) {
        self.items.lock().push(item);
    }

    /// Pops the top item, or `None` if the stack is empty.
    pub fn pop_front(&self) -> Option<T> {
        self.items.lock().pop()
    }

    /// Number of items at the time of the call.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Removes every item, returning them top first.
    pub fn drain(&self) -> Vec<T> {
        let mut items = std::mem::take(&mut *self.items.lock());
        items.reverse();
        items
    }
}
