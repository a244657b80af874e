//! Snap-point resolution.
//!
//! Pure functions over ascending snap tables; the controller calls these on
//! the frame path, so no allocation and no side effects.

/// Picks the settle target for a release at `height` with the given release
/// `velocity` (units/sec, positive = expanding).
///
/// A fling faster than `velocity_threshold` (strictly) goes to the next snap
/// point in the fling direction, or the extreme when none remains. Slower
/// releases go to the nearest point by absolute distance; exact ties resolve
/// to the lower point.
pub fn resolve_snap(
    height: f32,
    velocity: f32,
    snap_points: &[f32],
    velocity_threshold: f32,
) -> f32 {
    debug_assert!(!snap_points.is_empty(), "snap table must not be empty");
    debug_assert!(
        snap_points.windows(2).all(|pair| pair[0] < pair[1]),
        "snap table must be strictly ascending"
    );
    let Some((&first, &last)) = snap_points.first().zip(snap_points.last()) else {
        return height;
    };

    if velocity > velocity_threshold {
        return snap_points
            .iter()
            .copied()
            .find(|&point| point > height)
            .unwrap_or(last);
    }
    if velocity < -velocity_threshold {
        return snap_points
            .iter()
            .rev()
            .copied()
            .find(|&point| point < height)
            .unwrap_or(first);
    }

    nearest_snap(height, snap_points)
}

/// Nearest snap point by absolute distance; ties resolve to the lower point.
pub fn nearest_snap(height: f32, snap_points: &[f32]) -> f32 {
    let mut best = snap_points.first().copied().unwrap_or(height);
    let mut best_distance = (height - best).abs();
    for &point in snap_points.iter().skip(1) {
        let distance = (height - point).abs();
        if distance < best_distance {
            best = point;
            best_distance = distance;
        }
    }
    best
}

/// Index of the nearest snap point; ties resolve to the lower index.
pub fn bucket_index(height: f32, snap_points: &[f32]) -> usize {
    let mut best = 0;
    let mut best_distance = f32::INFINITY;
    for (index, &point) in snap_points.iter().enumerate() {
        let distance = (height - point).abs();
        if distance < best_distance {
            best = index;
            best_distance = distance;
        }
    }
    best
}
