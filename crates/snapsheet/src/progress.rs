//! Normalized progress derivation for visual consumers.
//!
//! Each registered track maps the sheet height onto `[0, 1]` across its own
//! span. Track cells update synchronously with the height write, so a
//! consumer reading during the same frame always sees matching values.

use indexmap::IndexMap;
use snapsheet_core::{ValueCell, ValueReader};
use std::cell::RefCell;

/// A named `(lower, upper)` height span with a derived progress cell.
///
/// `progress()` is `clamp((height - lower) / (upper - lower), 0, 1)`;
/// a zero-width span always reads 0. `complement()` is `1 - progress`, the
/// counter-factor a consumer nested in an already-scaled parent divides by.
#[derive(Clone)]
pub struct ProgressTrack {
    lower: f32,
    upper: f32,
    cell: ValueCell<f32>,
}

impl ProgressTrack {
    fn new(lower: f32, upper: f32, initial_height: f32) -> Self {
        let track = Self {
            lower,
            upper,
            cell: ValueCell::new(0.0),
        };
        track.cell.set(track.compute(initial_height));
        track
    }

    pub fn lower(&self) -> f32 {
        self.lower
    }

    pub fn upper(&self) -> f32 {
        self.upper
    }

    pub fn progress(&self) -> f32 {
        self.cell.get()
    }

    pub fn complement(&self) -> f32 {
        1.0 - self.cell.get()
    }

    pub fn reader(&self) -> ValueReader<f32> {
        self.cell.reader()
    }

    fn compute(&self, height: f32) -> f32 {
        let span = self.upper - self.lower;
        if span <= f32::EPSILON {
            return 0.0;
        }
        ((height - self.lower) / span).clamp(0.0, 1.0)
    }

    fn update(&self, height: f32) {
        self.cell.set(self.compute(height));
    }
}

/// Ordered registry of progress tracks for one sheet.
///
/// Registration order is preserved: tracks registered later may read tracks
/// registered earlier from their subscriptions and observe current values.
pub struct ProgressBroadcaster {
    tracks: RefCell<IndexMap<String, ProgressTrack>>,
}

impl ProgressBroadcaster {
    pub fn new() -> Self {
        Self {
            tracks: RefCell::new(IndexMap::new()),
        }
    }

    /// Registers a track over `[lower, upper]` and seeds it from
    /// `current_height`. A reversed span is swapped, a duplicate name replaces
    /// the earlier track; both log a warning.
    pub fn register(&self, name: &str, lower: f32, upper: f32, current_height: f32) -> ProgressTrack {
        let (lower, upper) = if upper < lower {
            log::warn!("progress track '{name}' span reversed ({lower}..{upper}), swapping");
            (upper, lower)
        } else {
            (lower, upper)
        };

        let track = ProgressTrack::new(lower, upper, current_height);
        let previous = self
            .tracks
            .borrow_mut()
            .insert(name.to_owned(), track.clone());
        if previous.is_some() {
            log::warn!("progress track '{name}' registered twice, replacing");
        }
        track
    }

    pub fn track(&self, name: &str) -> Option<ProgressTrack> {
        self.tracks.borrow().get(name).cloned()
    }

    /// Recompute every track for the new height, in registration order.
    ///
    /// Track watchers run inside this call; they must not re-register tracks.
    pub fn update(&self, height: f32) {
        let tracks = self.tracks.borrow();
        for track in tracks.values() {
            track.update(height);
        }
    }
}

impl Default for ProgressBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn progress_is_normalized_over_the_span() {
        let broadcaster = ProgressBroadcaster::new();
        let track = broadcaster.register("backdrop", 140.0, 320.0, 140.0);

        broadcaster.update(230.0);
        assert_eq!(track.progress(), 0.5);
        assert_eq!(track.complement(), 0.5);
    }

    #[test]
    fn progress_pins_outside_the_span() {
        let broadcaster = ProgressBroadcaster::new();
        let track = broadcaster.register("backdrop", 140.0, 320.0, 140.0);

        broadcaster.update(100.0);
        assert_eq!(track.progress(), 0.0);
        broadcaster.update(400.0);
        assert_eq!(track.progress(), 1.0);
    }

    #[test]
    fn zero_width_span_reads_zero() {
        let broadcaster = ProgressBroadcaster::new();
        let track = broadcaster.register("degenerate", 200.0, 200.0, 200.0);

        broadcaster.update(200.0);
        assert_eq!(track.progress(), 0.0);
        broadcaster.update(500.0);
        assert_eq!(track.progress(), 0.0);
        assert!(!track.progress().is_nan());
    }

    #[test]
    fn reversed_span_is_swapped() {
        let broadcaster = ProgressBroadcaster::new();
        let track = broadcaster.register("upside-down", 320.0, 140.0, 140.0);

        assert_eq!(track.lower(), 140.0);
        assert_eq!(track.upper(), 320.0);
        broadcaster.update(230.0);
        assert_eq!(track.progress(), 0.5);
    }

    #[test]
    fn track_is_seeded_at_registration() {
        let broadcaster = ProgressBroadcaster::new();
        let track = broadcaster.register("late", 100.0, 300.0, 200.0);
        assert_eq!(track.progress(), 0.5);
    }

    #[test]
    fn subscribers_observe_updates_in_registration_order() {
        let broadcaster = ProgressBroadcaster::new();
        let first = broadcaster.register("first", 0.0, 100.0, 0.0);
        let second = broadcaster.register("second", 0.0, 200.0, 0.0);

        let order = Rc::new(RefCell::new(Vec::new()));
        let first_order = Rc::clone(&order);
        let _first_watch = first
            .reader()
            .subscribe(move |value| first_order.borrow_mut().push(("first", value)));
        let second_order = Rc::clone(&order);
        let _second_watch = second
            .reader()
            .subscribe(move |value| second_order.borrow_mut().push(("second", value)));

        broadcaster.update(50.0);
        assert_eq!(
            order.borrow().as_slice(),
            &[("first", 0.5), ("second", 0.25)]
        );
    }

    #[test]
    fn unchanged_progress_does_not_notify() {
        let broadcaster = ProgressBroadcaster::new();
        let track = broadcaster.register("pinned", 140.0, 320.0, 400.0);

        let notifications = Rc::new(RefCell::new(0u32));
        let count = Rc::clone(&notifications);
        let _watch = track.reader().subscribe(move |_| *count.borrow_mut() += 1);

        // Already pinned at 1.0; moving within the pinned region is silent.
        broadcaster.update(350.0);
        broadcaster.update(380.0);
        assert_eq!(*notifications.borrow(), 0);

        broadcaster.update(230.0);
        assert_eq!(*notifications.borrow(), 1);
    }
}
