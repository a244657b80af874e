//! Spring physics for sheet settling.
//!
//! Positions are simulated in value space (pixels) so a release velocity
//! carries straight into the spring as its initial velocity.

/// Spring animation configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringSpec {
    /// Damping ratio. 1.0 = critically damped, < 1.0 = under-damped (bouncy), > 1.0 = over-damped.
    pub damping_ratio: f32,
    /// Stiffness constant. Higher values = faster animation.
    pub stiffness: f32,
    /// Oscillating mass. Higher values = more inertia.
    pub mass: f32,
    /// Velocity threshold (units/sec) under which the spring can rest.
    pub velocity_threshold: f32,
    /// Position threshold (units) under which the spring can rest.
    pub position_threshold: f32,
}

impl SpringSpec {
    /// Create a spring with default material design values.
    pub fn default_spring() -> Self {
        Self {
            damping_ratio: 1.0,
            stiffness: 1500.0,
            mass: 1.0,
            velocity_threshold: 1.0,
            position_threshold: 0.1,
        }
    }

    /// Create a bouncy spring.
    pub fn bouncy() -> Self {
        Self {
            damping_ratio: 0.5,
            ..Self::default_spring()
        }
    }

    /// Create a stiff spring (fast, no bounce).
    pub fn stiff() -> Self {
        Self {
            stiffness: 3000.0,
            ..Self::default_spring()
        }
    }

    /// Damping coefficient for this spec, `2 * ratio * sqrt(stiffness * mass)`.
    pub fn damping(&self) -> f32 {
        2.0 * self.damping_ratio * (self.stiffness * self.mass).sqrt()
    }
}

impl Default for SpringSpec {
    fn default() -> Self {
        Self::default_spring()
    }
}

/// Fixed integration substep. Must keep `damping * substep` well under 1 for
/// the stiffest preset or the integrator flips velocity sign.
const SUBSTEP_SECONDS: f32 = 0.004;

/// Frame gaps longer than this advance the simulation by this much only, so a
/// backgrounded host does not spin thousands of substeps on resume.
const MAX_FRAME_DELTA_SECONDS: f32 = 0.25;

/// Damped harmonic oscillator simulated with semi-implicit Euler integration.
#[derive(Debug, Clone, Copy)]
pub struct SpringSimulation {
    spec: SpringSpec,
    position: f32,
    velocity: f32,
    target: f32,
}

impl SpringSimulation {
    pub fn new(spec: SpringSpec, position: f32, velocity: f32, target: f32) -> Self {
        Self {
            spec,
            position,
            velocity,
            target,
        }
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn spec(&self) -> SpringSpec {
        self.spec
    }

    /// Redirect the spring mid-flight. Position and velocity carry over.
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Advance the simulation by `dt_seconds`. Returns `true` while the spring
    /// is still moving, `false` once it has reached rest.
    pub fn advance(&mut self, dt_seconds: f32) -> bool {
        let dt = dt_seconds.min(MAX_FRAME_DELTA_SECONDS);
        if dt <= 0.0 {
            return !self.is_at_rest();
        }

        let stiffness = self.spec.stiffness;
        let damping = self.spec.damping();
        let mass = self.spec.mass;

        let mut prev_time = 0.0f32;
        while prev_time < dt {
            let step = SUBSTEP_SECONDS.min(dt - prev_time);

            let displacement = self.position - self.target;
            let force = -stiffness * displacement - damping * self.velocity;

            self.velocity += force / mass * step;
            self.position += self.velocity * step;

            prev_time += step;
        }

        !self.is_at_rest()
    }

    /// Whether velocity and displacement are both under the rest thresholds.
    pub fn is_at_rest(&self) -> bool {
        self.velocity.abs() < self.spec.velocity_threshold
            && (self.position - self.target).abs() < self.spec.position_threshold
    }

    /// Snap exactly onto the target and zero the velocity.
    pub fn finish(&mut self) {
        self.position = self.target;
        self.velocity = 0.0;
    }
}

#[cfg(test)]
#[path = "tests/animation_tests.rs"]
mod tests;
