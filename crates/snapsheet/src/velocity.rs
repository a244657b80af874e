//! Release-velocity estimation for drag gestures.
//!
//! Impulse-strategy 1D tracker over absolute height samples. Used by
//! `drag_end_tracked` when the host's input layer does not report a release
//! velocity of its own.

/// Ring buffer size for velocity tracking samples.
const HISTORY_SIZE: usize = 20;

/// Only use samples within the last 100ms for velocity calculation.
const HORIZON_MS: i64 = 100;

/// If no movement for this duration, assume the pointer has stopped.
pub const ASSUME_STOPPED_MS: i64 = 40;

#[derive(Clone, Copy, Default)]
struct HeightSample {
    time_ms: i64,
    height: f32,
}

/// Impulse-based velocity tracker over sheet-height samples.
///
/// Velocity is derived from the kinetic energy imparted across the sample
/// window, which is robust to jittery input. Positive velocity means the
/// sheet is expanding.
#[derive(Clone)]
pub struct DragVelocityTracker {
    /// Ring buffer of samples.
    samples: [Option<HeightSample>; HISTORY_SIZE],
    /// Current write index in ring buffer.
    index: usize,
}

impl Default for DragVelocityTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DragVelocityTracker {
    pub fn new() -> Self {
        Self {
            samples: [None; HISTORY_SIZE],
            index: 0,
        }
    }

    /// Records the sheet height at the given time (milliseconds).
    pub fn add_sample(&mut self, time_ms: i64, height: f32) {
        self.index = (self.index + 1) % HISTORY_SIZE;
        self.samples[self.index] = Some(HeightSample { time_ms, height });
    }

    /// Calculates the release velocity in units/second.
    ///
    /// Returns 0.0 without at least two usable samples, or when the gesture
    /// paused longer than [`ASSUME_STOPPED_MS`] before release.
    pub fn calculate_velocity(&self) -> f32 {
        let mut heights = [0.0f32; HISTORY_SIZE];
        let mut times = [0.0f32; HISTORY_SIZE];
        let mut sample_count = 0;

        let newest_sample = match self.samples[self.index] {
            Some(sample) => sample,
            None => return 0.0,
        };

        let mut current_index = self.index;
        let mut previous_time_ms = newest_sample.time_ms;

        while let Some(sample) = self.samples[current_index] {
            let age = (newest_sample.time_ms - sample.time_ms) as f32;
            let gap = (previous_time_ms - sample.time_ms).abs() as f32;
            previous_time_ms = sample.time_ms;

            if age > HORIZON_MS as f32 || gap > ASSUME_STOPPED_MS as f32 {
                break;
            }

            heights[sample_count] = sample.height;
            times[sample_count] = -age;

            current_index = if current_index == 0 {
                HISTORY_SIZE - 1
            } else {
                current_index - 1
            };

            sample_count += 1;
            if sample_count >= HISTORY_SIZE {
                break;
            }
        }

        if sample_count < 2 {
            return 0.0;
        }

        let velocity_per_ms = calculate_impulse_velocity(&heights, &times, sample_count);

        velocity_per_ms * 1000.0
    }

    /// Calculates the release velocity in units/second, capped to `max_velocity`.
    pub fn calculate_velocity_with_max(&self, max_velocity: f32) -> f32 {
        if !max_velocity.is_finite() || max_velocity <= 0.0 {
            return 0.0;
        }

        let velocity = self.calculate_velocity();
        if velocity == 0.0 || velocity.is_nan() {
            return 0.0;
        }

        velocity.clamp(-max_velocity, max_velocity)
    }

    /// Clears all tracked data.
    pub fn reset(&mut self) {
        self.samples = [None; HISTORY_SIZE];
        self.index = 0;
    }
}

/// Impulse strategy: accumulate the work done between adjacent samples and
/// convert the resulting kinetic energy back into a signed velocity.
fn calculate_impulse_velocity(
    heights: &[f32; HISTORY_SIZE],
    times: &[f32; HISTORY_SIZE],
    sample_count: usize,
) -> f32 {
    if sample_count < 2 {
        return 0.0;
    }

    let mut work = 0.0f32;
    let start = sample_count - 1;
    let mut next_time = times[start];

    for i in (1..=start).rev() {
        let current_time = next_time;
        next_time = times[i - 1];
        if current_time == next_time {
            continue;
        }

        let height_delta = heights[i] - heights[i - 1];
        let v_curr = height_delta / (current_time - next_time);
        let v_prev = kinetic_energy_to_velocity(work);
        work += (v_curr - v_prev) * v_curr.abs();
        if i == start {
            work *= 0.5;
        }
    }

    kinetic_energy_to_velocity(work)
}

/// Converts kinetic energy to velocity using E = 0.5 * m * v^2 (with m = 1).
#[inline]
fn kinetic_energy_to_velocity(kinetic_energy: f32) -> f32 {
    kinetic_energy.signum() * (2.0 * kinetic_energy.abs()).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tracker_returns_zero() {
        let tracker = DragVelocityTracker::new();
        assert_eq!(tracker.calculate_velocity(), 0.0);
    }

    #[test]
    fn single_sample_returns_zero() {
        let mut tracker = DragVelocityTracker::new();
        tracker.add_sample(0, 100.0);
        assert_eq!(tracker.calculate_velocity(), 0.0);
    }

    #[test]
    fn constant_expansion_velocity() {
        let mut tracker = DragVelocityTracker::new();
        // Expanding 10 units per 10ms = 1000 units/s
        tracker.add_sample(0, 100.0);
        tracker.add_sample(10, 110.0);
        tracker.add_sample(20, 120.0);
        tracker.add_sample(30, 130.0);

        let velocity = tracker.calculate_velocity();
        assert!(
            (velocity - 1000.0).abs() < 100.0,
            "Expected ~1000, got {}",
            velocity
        );
    }

    #[test]
    fn collapsing_gesture_is_negative() {
        let mut tracker = DragVelocityTracker::new();
        tracker.add_sample(0, 300.0);
        tracker.add_sample(10, 200.0);
        tracker.add_sample(20, 100.0);

        let velocity = tracker.calculate_velocity();
        assert!(velocity < 0.0, "Expected negative velocity, got {}", velocity);
    }

    #[test]
    fn reset_discards_history() {
        let mut tracker = DragVelocityTracker::new();
        tracker.add_sample(0, 0.0);
        tracker.add_sample(10, 100.0);

        tracker.reset();

        assert_eq!(tracker.calculate_velocity(), 0.0);
    }

    #[test]
    fn velocity_is_capped() {
        let mut tracker = DragVelocityTracker::new();
        tracker.add_sample(0, 0.0);
        tracker.add_sample(1, 10_000.0);

        let velocity = tracker.calculate_velocity_with_max(8_000.0);
        assert_eq!(velocity, 8_000.0);

        tracker.reset();
        tracker.add_sample(0, 10_000.0);
        tracker.add_sample(1, 0.0);

        let velocity = tracker.calculate_velocity_with_max(8_000.0);
        assert_eq!(velocity, -8_000.0);
    }

    #[test]
    fn samples_past_horizon_are_ignored() {
        let mut tracker = DragVelocityTracker::new();
        // Stale sample from gesture start, then uniform 10 units/ms.
        tracker.add_sample(0, 0.0);
        tracker.add_sample(150, 100.0);
        tracker.add_sample(160, 200.0);
        tracker.add_sample(170, 300.0);

        let velocity = tracker.calculate_velocity();
        assert!(
            (velocity - 10_000.0).abs() < 500.0,
            "stale sample should not dilute the estimate, got {velocity}"
        );
    }

    #[test]
    fn pause_before_release_reads_as_stopped() {
        let mut tracker = DragVelocityTracker::new();
        tracker.add_sample(0, 0.0);
        tracker.add_sample(ASSUME_STOPPED_MS + 1, 100.0);

        assert_eq!(tracker.calculate_velocity(), 0.0);
    }
}
