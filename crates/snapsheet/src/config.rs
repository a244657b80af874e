//! Per-mode sheet configuration.
//!
//! Every mode fixes its snap table, spring, and velocity threshold at
//! construction. Nothing here is runtime-mutable; the controller swaps whole
//! configs when the mode changes.

use smallvec::SmallVec;
use snapsheet_animation::SpringSpec;

/// Release speed (units/sec) above which a fling overrides nearest-point
/// snapping. Comparison is strict; exactly this speed takes the slow path.
pub const DEFAULT_VELOCITY_THRESHOLD: f32 = 800.0;

/// Cap on release velocity fed into the settle spring.
pub const MAX_RELEASE_VELOCITY: f32 = 8_000.0;

/// Snap points rarely exceed a handful per mode; keep them inline.
pub type SnapPoints = SmallVec<[f32; 6]>;

/// Top-level surface the sheet is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SheetMode {
    Explore,
    Services,
    Pay,
    Worlds,
    Assistant,
}

impl SheetMode {
    pub const ALL: [SheetMode; 5] = [
        SheetMode::Explore,
        SheetMode::Services,
        SheetMode::Pay,
        SheetMode::Worlds,
        SheetMode::Assistant,
    ];
}

/// Snap table and settle tuning for one mode.
///
/// The snap table is normalized on construction: non-finite entries are
/// dropped, the rest sorted ascending and deduplicated. The first entry is the
/// mode's minimum height, the last its maximum.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetConfig {
    snap_points: SnapPoints,
    spring: SpringSpec,
    velocity_threshold: f32,
}

impl SheetConfig {
    pub fn new(snap_points: impl IntoIterator<Item = f32>) -> Self {
        let raw: SnapPoints = snap_points.into_iter().collect();
        let normalized = normalize_snap_points(&raw);
        if normalized != raw {
            log::warn!("snap table {raw:?} normalized to {normalized:?}");
        }
        Self {
            snap_points: normalized,
            spring: SpringSpec::default_spring(),
            velocity_threshold: DEFAULT_VELOCITY_THRESHOLD,
        }
    }

    pub fn with_spring(mut self, spring: SpringSpec) -> Self {
        self.spring = spring;
        self
    }

    pub fn with_velocity_threshold(mut self, velocity_threshold: f32) -> Self {
        self.velocity_threshold = velocity_threshold.abs();
        self
    }

    pub fn snap_points(&self) -> &[f32] {
        &self.snap_points
    }

    pub fn min_height(&self) -> f32 {
        self.snap_points[0]
    }

    pub fn max_height(&self) -> f32 {
        self.snap_points[self.snap_points.len() - 1]
    }

    pub fn spring(&self) -> SpringSpec {
        self.spring
    }

    pub fn velocity_threshold(&self) -> f32 {
        self.velocity_threshold
    }

    /// Clamp a candidate height into this mode's extent.
    pub fn clamp(&self, height: f32) -> f32 {
        height.clamp(self.min_height(), self.max_height())
    }
}

/// Two snap points closer than this collapse into one.
const SNAP_DEDUP_EPSILON: f32 = 0.001;

fn normalize_snap_points(raw: &SnapPoints) -> SnapPoints {
    let mut points: SnapPoints = raw.iter().copied().filter(|p| p.is_finite()).collect();
    points.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    points.dedup_by(|a, b| (*a - *b).abs() <= SNAP_DEDUP_EPSILON);
    if points.is_empty() {
        log::warn!("empty snap table, substituting a single zero-height point");
        points.push(0.0);
    }
    points
}

/// The full mode-to-config table for one sheet instance.
#[derive(Debug, Clone)]
pub struct ModeConfigs {
    explore: SheetConfig,
    services: SheetConfig,
    pay: SheetConfig,
    worlds: SheetConfig,
    assistant: SheetConfig,
}

impl ModeConfigs {
    /// Every mode shares the same config.
    pub fn uniform(config: SheetConfig) -> Self {
        Self {
            explore: config.clone(),
            services: config.clone(),
            pay: config.clone(),
            worlds: config.clone(),
            assistant: config,
        }
    }

    /// Production snap tables (heights in density-independent pixels).
    pub fn standard() -> Self {
        Self {
            explore: SheetConfig::new([120.0, 140.0, 320.0, 420.0]),
            services: SheetConfig::new([140.0, 420.0]),
            pay: SheetConfig::new([180.0, 420.0]),
            worlds: SheetConfig::new([120.0, 320.0, 420.0]),
            assistant: SheetConfig::new([96.0, 560.0]),
        }
    }

    pub fn with_mode(mut self, mode: SheetMode, config: SheetConfig) -> Self {
        *self.slot_mut(mode) = config;
        self
    }

    pub fn config(&self, mode: SheetMode) -> &SheetConfig {
        match mode {
            SheetMode::Explore => &self.explore,
            SheetMode::Services => &self.services,
            SheetMode::Pay => &self.pay,
            SheetMode::Worlds => &self.worlds,
            SheetMode::Assistant => &self.assistant,
        }
    }

    fn slot_mut(&mut self, mode: SheetMode) -> &mut SheetConfig {
        match mode {
            SheetMode::Explore => &mut self.explore,
            SheetMode::Services => &mut self.services,
            SheetMode::Pay => &mut self.pay,
            SheetMode::Worlds => &mut self.worlds,
            SheetMode::Assistant => &mut self.assistant,
        }
    }
}
