//! Interpolation primitives for visual consumers of sheet progress.

/// Trait for types that can be linearly interpolated.
pub trait Lerp {
    fn lerp(&self, target: &Self, fraction: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(&self, target: &Self, fraction: f32) -> Self {
        self + (target - self) * fraction
    }
}

impl Lerp for f64 {
    fn lerp(&self, target: &Self, fraction: f32) -> Self {
        self + (target - self) * fraction as f64
    }
}

/// Piecewise-linear breakpoint mapping with edge clamping.
///
/// `stops` pairs `(input, output)` with strictly ascending inputs. Values
/// before the first input map to the first output, values past the last input
/// to the last output. Visual consumers use this to turn a normalized progress
/// into opacity, scale, or offset ramps.
pub fn interpolate(value: f32, stops: &[(f32, f32)]) -> f32 {
    debug_assert!(!stops.is_empty(), "interpolate requires at least one stop");
    debug_assert!(
        stops.windows(2).all(|pair| pair[0].0 < pair[1].0),
        "interpolate stops must have strictly ascending inputs"
    );

    let Some(&(first_in, first_out)) = stops.first() else {
        return 0.0;
    };
    if value <= first_in {
        return first_out;
    }
    let &(last_in, last_out) = stops.last().unwrap_or(&(first_in, first_out));
    if value >= last_in {
        return last_out;
    }

    for pair in stops.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if value <= x1 {
            let span = x1 - x0;
            if span <= f32::EPSILON {
                return y1;
            }
            let fraction = (value - x0) / span;
            return y0.lerp(&y1, fraction);
        }
    }

    last_out
}
