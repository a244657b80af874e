//! Discrete sheet notifications.
//!
//! Continuous values (height, progress) flow through cells; the events here
//! fire once per occurrence and reach listeners through the runtime's effect
//! queue, never inline from the frame path.

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// A discrete notification emitted by the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SheetEvent {
    /// The settled snap bucket changed. Fired at most once per settle;
    /// hosts typically answer with a haptic tick.
    BucketChanged { index: usize },
    /// The sheet came to rest at a different height than its previous rest.
    /// Sibling layout (e.g. a floating action cluster) re-anchors on this.
    HeightSettled { height: f32 },
}

struct EventHubInner {
    listeners: RefCell<FxHashMap<u64, Box<dyn Fn(&SheetEvent)>>>,
}

/// Listener registry shared between the controller and queued effects.
#[derive(Clone)]
pub(crate) struct EventHub {
    inner: Rc<EventHubInner>,
}

impl EventHub {
    pub(crate) fn new() -> Self {
        Self {
            inner: Rc::new(EventHubInner {
                listeners: RefCell::new(FxHashMap::default()),
            }),
        }
    }

    pub(crate) fn subscribe(
        &self,
        listener: impl Fn(&SheetEvent) + 'static,
    ) -> EventSubscription {
        let id = NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .borrow_mut()
            .insert(id, Box::new(listener));
        EventSubscription {
            hub: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Invoke every listener. Runs on the effect tier; the listener map borrow
    /// is held across the calls, so listeners must not subscribe reentrantly.
    pub(crate) fn emit(&self, event: &SheetEvent) {
        let listeners = self.inner.listeners.borrow();
        for listener in listeners.values() {
            listener(event);
        }
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }
}

/// Keeps an event listener registered. Dropping unsubscribes.
pub struct EventSubscription {
    hub: Weak<EventHubInner>,
    id: u64,
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.listeners.borrow_mut().remove(&self.id);
        }
    }
}
