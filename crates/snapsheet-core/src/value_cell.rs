//! Observable value cells.
//!
//! A [`ValueCell`] is a single-writer, many-reader scalar holder: one owner
//! writes it, any number of consumers read the latest value or subscribe to
//! change notifications. Subscribers react instead of polling, so a
//! per-frame consumer always observes a write within the frame that made it.
//!
//! This is a pure value model - it does NOT buffer, debounce, or schedule.
//! Notification runs synchronously on the writer's call stack.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;

static NEXT_WATCH_ID: AtomicU64 = AtomicU64::new(1);

type WatchMap<T> = FxHashMap<u64, Box<dyn Fn(T)>>;

struct CellInner<T: Copy + PartialEq + 'static> {
    value: Cell<T>,
    watchers: RefCell<WatchMap<T>>,
}

impl<T: Copy + PartialEq + 'static> CellInner<T> {
    fn notify(&self, value: T) {
        // The map stays borrowed while each callback runs; watchers must not
        // write this cell or alter its watcher set from inside a notification.
        let watchers = self.watchers.borrow();
        for watcher in watchers.values() {
            watcher(value);
        }
    }
}

/// Writable handle of an observable scalar. Cloning shares the same cell.
pub struct ValueCell<T: Copy + PartialEq + 'static> {
    inner: Rc<CellInner<T>>,
}

impl<T: Copy + PartialEq + 'static> ValueCell<T> {
    pub fn new(initial: T) -> Self {
        Self {
            inner: Rc::new(CellInner {
                value: Cell::new(initial),
                watchers: RefCell::new(WatchMap::default()),
            }),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.inner.value.get()
    }

    /// Write a new value, notifying watchers if it differs from the current
    /// one. Writing an equal value is a no-op so idle frames stay silent.
    pub fn set(&self, value: T) {
        if self.inner.value.get() == value {
            return;
        }
        self.inner.value.set(value);
        self.inner.notify(value);
    }

    /// Read-only view of this cell for external consumers.
    pub fn reader(&self) -> ValueReader<T> {
        ValueReader {
            inner: Rc::clone(&self.inner),
        }
    }

    /// Register a watcher invoked synchronously on every changed write.
    ///
    /// The watcher stays registered for the lifetime of the returned handle;
    /// dropping the handle unsubscribes.
    pub fn subscribe(&self, watcher: impl Fn(T) + 'static) -> WatchHandle<T> {
        subscribe_inner(&self.inner, watcher)
    }
}

impl<T: Copy + PartialEq + 'static> Clone for ValueCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Read-only handle of a [`ValueCell`]. Cloning shares the same cell.
pub struct ValueReader<T: Copy + PartialEq + 'static> {
    inner: Rc<CellInner<T>>,
}

impl<T: Copy + PartialEq + 'static> ValueReader<T> {
    /// Current value.
    pub fn get(&self) -> T {
        self.inner.value.get()
    }

    /// Register a watcher invoked synchronously on every changed write.
    pub fn subscribe(&self, watcher: impl Fn(T) + 'static) -> WatchHandle<T> {
        subscribe_inner(&self.inner, watcher)
    }
}

impl<T: Copy + PartialEq + 'static> Clone for ValueReader<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

fn subscribe_inner<T: Copy + PartialEq + 'static>(
    inner: &Rc<CellInner<T>>,
    watcher: impl Fn(T) + 'static,
) -> WatchHandle<T> {
    let id = NEXT_WATCH_ID.fetch_add(1, Ordering::Relaxed);
    inner.watchers.borrow_mut().insert(id, Box::new(watcher));
    WatchHandle {
        inner: Rc::downgrade(inner),
        id,
    }
}

/// Subscription handle; dropping it removes the watcher.
pub struct WatchHandle<T: Copy + PartialEq + 'static> {
    inner: Weak<CellInner<T>>,
    id: u64,
}

impl<T: Copy + PartialEq + 'static> Drop for WatchHandle<T> {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.watchers.borrow_mut().remove(&self.id);
        }
    }
}
