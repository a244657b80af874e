//! Frame and effect scheduling for one sheet instance.
//!
//! The runtime separates two execution tiers. Frame callbacks run the
//! high-priority numeric path (gesture mapping, spring stepping, progress
//! derivation) and are drained by the host once per display frame. Effects
//! are application-logic callbacks (haptics, layout listeners); they are
//! queued here and drained between frames, never invoked from inside the
//! frame path. Cross-thread producers reach the runtime through the `Send`
//! post channel, which wakes the host via its [`RuntimeScheduler`].

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};

use crate::frame_clock::FrameClock;
use crate::platform::RuntimeScheduler;

pub type FrameCallbackId = u64;

type EffectTask = Box<dyn FnOnce() + Send + 'static>;

struct DispatcherInner {
    scheduler: Arc<dyn RuntimeScheduler>,
    tx: mpsc::Sender<EffectTask>,
    pending: AtomicUsize,
}

impl DispatcherInner {
    fn post(&self, task: EffectTask) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(task).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            log::warn!("effect posted after runtime shutdown; task dropped");
            return;
        }
        self.scheduler.schedule_frame();
    }

    fn has_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }
}

struct PendingGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> Drop for PendingGuard<'a> {
    fn drop(&mut self) {
        let previous = self.counter.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "effect dispatcher pending count underflowed");
    }
}

/// Cross-thread entry point into the runtime's effect queue.
///
/// Clone freely; posting from any thread enqueues the task and asks the host
/// scheduler for a wakeup so the owning thread drains it.
#[derive(Clone)]
pub struct EffectDispatcher {
    inner: Arc<DispatcherInner>,
}

impl EffectDispatcher {
    pub fn post(&self, task: impl FnOnce() + Send + 'static) {
        self.inner.post(Box::new(task));
    }

    pub fn has_pending(&self) -> bool {
        self.inner.has_pending()
    }
}

struct FrameCallbackEntry {
    id: FrameCallbackId,
    callback: Option<Box<dyn FnOnce(u64) + 'static>>,
}

struct RuntimeInner {
    scheduler: Arc<dyn RuntimeScheduler>,
    needs_frame: Cell<bool>,
    frame_callbacks: RefCell<VecDeque<FrameCallbackEntry>>,
    next_frame_callback_id: Cell<FrameCallbackId>,
    /// Local effect queue; closures here may capture `Rc` state because they
    /// never leave the owning thread.
    effects: RefCell<VecDeque<Box<dyn FnOnce() + 'static>>>,
    dispatcher: Arc<DispatcherInner>,
    posted_rx: RefCell<mpsc::Receiver<EffectTask>>,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        let (tx, rx) = mpsc::channel();
        let dispatcher = Arc::new(DispatcherInner {
            scheduler: scheduler.clone(),
            tx,
            pending: AtomicUsize::new(0),
        });
        Self {
            scheduler,
            needs_frame: Cell::new(false),
            frame_callbacks: RefCell::new(VecDeque::new()),
            next_frame_callback_id: Cell::new(1),
            effects: RefCell::new(VecDeque::new()),
            dispatcher,
            posted_rx: RefCell::new(rx),
        }
    }

    fn schedule(&self) {
        self.needs_frame.set(true);
        self.scheduler.schedule_frame();
    }

    fn register_frame_callback(&self, callback: Box<dyn FnOnce(u64) + 'static>) -> FrameCallbackId {
        let id = self.next_frame_callback_id.get();
        self.next_frame_callback_id.set(id + 1);
        self.frame_callbacks
            .borrow_mut()
            .push_back(FrameCallbackEntry {
                id,
                callback: Some(callback),
            });
        self.schedule();
        id
    }

    fn cancel_frame_callback(&self, id: FrameCallbackId) {
        let mut callbacks = self.frame_callbacks.borrow_mut();
        if let Some(index) = callbacks.iter().position(|entry| entry.id == id) {
            callbacks.remove(index);
        }
        let callbacks_empty = callbacks.is_empty();
        drop(callbacks);
        if callbacks_empty && !self.has_pending_effects() {
            self.needs_frame.set(false);
        }
    }

    fn drain_frame_callbacks(&self, frame_time_nanos: u64) {
        // Callbacks registered while draining (an animation re-arming itself)
        // run on the NEXT frame, so the pending list is detached first.
        let mut callbacks = self.frame_callbacks.borrow_mut();
        let mut pending: Vec<Box<dyn FnOnce(u64) + 'static>> = Vec::with_capacity(callbacks.len());
        while let Some(mut entry) = callbacks.pop_front() {
            if let Some(callback) = entry.callback.take() {
                pending.push(callback);
            }
        }
        drop(callbacks);
        for callback in pending {
            callback(frame_time_nanos);
        }
        if !self.has_frame_callbacks() && !self.has_pending_effects() {
            self.needs_frame.set(false);
        }
    }

    fn enqueue_effect(&self, task: Box<dyn FnOnce() + 'static>) {
        self.effects.borrow_mut().push_back(task);
        self.schedule();
    }

    fn drain_effects(&self) {
        loop {
            let mut executed = false;

            // Collect before running so the receiver borrow is released;
            // posted tasks may re-enter the runtime.
            let posted: Vec<EffectTask> = self.posted_rx.borrow_mut().try_iter().collect();
            for task in posted {
                executed = true;
                let _guard = PendingGuard {
                    counter: &self.dispatcher.pending,
                };
                task();
            }

            loop {
                let task = self.effects.borrow_mut().pop_front();
                match task {
                    Some(task) => {
                        executed = true;
                        task();
                    }
                    None => break,
                }
            }

            if !executed {
                break;
            }
        }
        if !self.has_frame_callbacks() {
            self.needs_frame.set(false);
        }
    }

    fn has_frame_callbacks(&self) -> bool {
        !self.frame_callbacks.borrow().is_empty()
    }

    fn has_pending_effects(&self) -> bool {
        let local_pending = self
            .effects
            .try_borrow()
            .map(|effects| !effects.is_empty())
            .unwrap_or(true);
        local_pending || self.dispatcher.has_pending()
    }
}

/// Owner of the scheduling state for one sheet instance.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            inner: Rc::downgrade(&self.inner),
            dispatcher: EffectDispatcher {
                inner: self.inner.dispatcher.clone(),
            },
        }
    }

    /// Whether the host should drive another frame (callbacks or effects
    /// outstanding).
    pub fn needs_frame(&self) -> bool {
        self.inner.needs_frame.get() || self.inner.dispatcher.has_pending()
    }

    pub fn frame_clock(&self) -> FrameClock {
        FrameClock::new(self.handle())
    }
}

/// Weak, cloneable reference to a [`Runtime`]. All engine components hold
/// handles; operations on a dropped runtime are no-ops.
#[derive(Clone)]
pub struct RuntimeHandle {
    inner: Weak<RuntimeInner>,
    dispatcher: EffectDispatcher,
}

impl RuntimeHandle {
    pub fn schedule(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.schedule();
        }
    }

    pub fn register_frame_callback(
        &self,
        callback: impl FnOnce(u64) + 'static,
    ) -> Option<FrameCallbackId> {
        self.inner
            .upgrade()
            .map(|inner| inner.register_frame_callback(Box::new(callback)))
    }

    pub fn cancel_frame_callback(&self, id: FrameCallbackId) {
        if let Some(inner) = self.inner.upgrade() {
            inner.cancel_frame_callback(id);
        }
    }

    /// Run all frame callbacks registered before this call, in registration
    /// order, passing the frame timestamp. The host calls this once per
    /// display frame.
    pub fn drain_frame_callbacks(&self, frame_time_nanos: u64) {
        if let Some(inner) = self.inner.upgrade() {
            inner.drain_frame_callbacks(frame_time_nanos);
        }
    }

    /// Queue an application-tier callback on the owning thread.
    ///
    /// The closure may capture `Rc`/`RefCell` state. It executes when the
    /// host drains effects, never inside the frame path that queued it.
    pub fn enqueue_effect(&self, task: impl FnOnce() + 'static) {
        if let Some(inner) = self.inner.upgrade() {
            inner.enqueue_effect(Box::new(task));
        }
    }

    /// Queue work from any thread. See [`EffectDispatcher::post`].
    pub fn post(&self, task: impl FnOnce() + Send + 'static) {
        self.dispatcher.post(task);
    }

    /// Run queued effects (posted and local) until the queues are empty.
    pub fn drain_effects(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.drain_effects();
        }
    }

    pub fn has_frame_callbacks(&self) -> bool {
        self.inner
            .upgrade()
            .map(|inner| inner.has_frame_callbacks())
            .unwrap_or(false)
    }

    pub fn has_pending_effects(&self) -> bool {
        self.inner
            .upgrade()
            .map(|inner| inner.has_pending_effects())
            .unwrap_or_else(|| self.dispatcher.has_pending())
    }

    pub fn frame_clock(&self) -> FrameClock {
        FrameClock::new(self.clone())
    }

    pub fn dispatcher(&self) -> EffectDispatcher {
        self.dispatcher.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::DefaultScheduler;
    use std::cell::RefCell;

    fn runtime() -> Runtime {
        Runtime::new(Arc::new(DefaultScheduler))
    }

    #[test]
    fn frame_callbacks_run_once_in_order() {
        let runtime = runtime();
        let handle = runtime.handle();
        let order = Rc::new(RefCell::new(Vec::new()));

        let first = Rc::clone(&order);
        handle.register_frame_callback(move |t| first.borrow_mut().push((1, t)));
        let second = Rc::clone(&order);
        handle.register_frame_callback(move |t| second.borrow_mut().push((2, t)));

        handle.drain_frame_callbacks(100);
        handle.drain_frame_callbacks(200);

        assert_eq!(order.borrow().as_slice(), &[(1, 100), (2, 100)]);
    }

    #[test]
    fn callbacks_registered_during_drain_run_next_frame() {
        let runtime = runtime();
        let handle = runtime.handle();
        let times = Rc::new(RefCell::new(Vec::new()));

        let rearm_handle = handle.clone();
        let rearm_times = Rc::clone(&times);
        handle.register_frame_callback(move |t| {
            rearm_times.borrow_mut().push(t);
            let inner_times = Rc::clone(&rearm_times);
            rearm_handle.register_frame_callback(move |t| inner_times.borrow_mut().push(t));
        });

        handle.drain_frame_callbacks(1);
        handle.drain_frame_callbacks(2);

        assert_eq!(times.borrow().as_slice(), &[1, 2]);
    }

    #[test]
    fn cancelled_callback_does_not_run() {
        let runtime = runtime();
        let handle = runtime.handle();
        let ran = Rc::new(Cell::new(false));

        let flag = Rc::clone(&ran);
        let id = handle
            .register_frame_callback(move |_| flag.set(true))
            .expect("runtime alive");
        handle.cancel_frame_callback(id);
        handle.drain_frame_callbacks(0);

        assert!(!ran.get());
    }

    #[test]
    fn effects_run_on_drain_not_enqueue() {
        let runtime = runtime();
        let handle = runtime.handle();
        let ran = Rc::new(Cell::new(false));

        let flag = Rc::clone(&ran);
        handle.enqueue_effect(move || flag.set(true));
        assert!(!ran.get());
        assert!(handle.has_pending_effects());

        handle.drain_effects();
        assert!(ran.get());
        assert!(!handle.has_pending_effects());
    }

    #[test]
    fn effects_enqueued_by_effects_run_in_same_drain() {
        let runtime = runtime();
        let handle = runtime.handle();
        let order = Rc::new(RefCell::new(Vec::new()));

        let outer_handle = handle.clone();
        let outer_order = Rc::clone(&order);
        handle.enqueue_effect(move || {
            outer_order.borrow_mut().push(1);
            let inner_order = Rc::clone(&outer_order);
            outer_handle.enqueue_effect(move || inner_order.borrow_mut().push(2));
        });

        handle.drain_effects();
        assert_eq!(order.borrow().as_slice(), &[1, 2]);
    }

    #[test]
    fn cross_thread_post_is_drained_on_owner() {
        let runtime = runtime();
        let handle = runtime.handle();
        let dispatcher = handle.dispatcher();
        let (tx, rx) = mpsc::channel();

        let worker = std::thread::spawn(move || {
            dispatcher.post(move || {
                let _ = tx.send(42);
            });
        });
        worker.join().expect("worker finished");

        assert!(handle.has_pending_effects());
        handle.drain_effects();
        assert_eq!(rx.try_recv(), Ok(42));
    }

    #[test]
    fn needs_frame_clears_when_idle() {
        let runtime = runtime();
        let handle = runtime.handle();

        handle.register_frame_callback(|_| {});
        assert!(runtime.needs_frame());

        handle.drain_frame_callbacks(0);
        assert!(!runtime.needs_frame());
    }
}
