//! Proximity check-in state machine.
//!
//! A selected target moves through the states below as the origin changes
//! and the user presses and releases the check-in control:
//!
//! ```text
//! Idle -> AwaitingLocation -> OutOfRange <-> InRange -> Holding -> Collected
//! ```
//!
//! Distances are great-circle (haversine) approximations on a spherical
//! Earth; see [`crate::coordinate`] for the accuracy trade-off. The engine is
//! driven entirely by its callers: every operation returns the
//! [`ProximityEvent`]s it produced and the hold timer advances only when the
//! caller samples it with [`ProximityEngine::tick`].

mod engine;
mod hold;

use std::time::Duration;

pub use engine::ProximityEngine;
pub use hold::HoldTimer;

use crate::coordinate::Coordinate;
use crate::place::StableId;

/// Default check-in radius in metres.
pub const DEFAULT_THRESHOLD_M: f64 = 15.0;

/// Default hold-to-confirm duration.
pub const DEFAULT_HOLD_DURATION: Duration = Duration::from_millis(3000);

/// Where the engine takes its origin from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum OriginMode {
    /// Use the live location stream.
    #[default]
    LiveTracking,
    /// Use a manually positioned map centre and disable live tracking.
    MapCenter,
}

/// Tunables for [`ProximityEngine`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use lumigram_core::ProximityConfig;
///
/// let config = ProximityConfig::default()
///     .with_threshold_m(20.0)
///     .with_hold_duration(Duration::from_secs(2));
/// assert_eq!(config.threshold_m(), 20.0);
/// assert_eq!(config.hysteresis_m(), 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityConfig {
    threshold_m: f64,
    hold_duration: Duration,
    hysteresis_m: f64,
    origin_mode: OriginMode,
}

impl ProximityConfig {
    /// Create a configuration with the default 15 m radius and 3 s hold.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            threshold_m: DEFAULT_THRESHOLD_M,
            hold_duration: DEFAULT_HOLD_DURATION,
            hysteresis_m: 0.0,
            origin_mode: OriginMode::LiveTracking,
        }
    }

    /// Override the check-in radius. Non-finite or negative values are
    /// ignored.
    #[must_use]
    pub fn with_threshold_m(mut self, threshold_m: f64) -> Self {
        if threshold_m.is_finite() && threshold_m >= 0.0 {
            self.threshold_m = threshold_m;
        }
        self
    }

    /// Override the hold-to-confirm duration.
    #[must_use]
    pub const fn with_hold_duration(mut self, hold_duration: Duration) -> Self {
        self.hold_duration = hold_duration;
        self
    }

    /// Extra distance a target must recede beyond the radius before an
    /// in-range target drops out of range. Zero disables hysteresis.
    #[must_use]
    pub fn with_hysteresis_m(mut self, hysteresis_m: f64) -> Self {
        if hysteresis_m.is_finite() && hysteresis_m >= 0.0 {
            self.hysteresis_m = hysteresis_m;
        }
        self
    }

    /// Choose the initial origin source.
    #[must_use]
    pub const fn with_origin_mode(mut self, origin_mode: OriginMode) -> Self {
        self.origin_mode = origin_mode;
        self
    }

    /// Check-in radius in metres.
    #[must_use]
    pub const fn threshold_m(&self) -> f64 {
        self.threshold_m
    }

    /// Hold-to-confirm duration.
    #[must_use]
    pub const fn hold_duration(&self) -> Duration {
        self.hold_duration
    }

    /// Exit hysteresis in metres.
    #[must_use]
    pub const fn hysteresis_m(&self) -> f64 {
        self.hysteresis_m
    }

    /// Initial origin source.
    #[must_use]
    pub const fn origin_mode(&self) -> OriginMode {
        self.origin_mode
    }
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Check-in state of the current target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CheckInState {
    /// No target selected.
    Idle,
    /// Target selected but the origin is unknown.
    AwaitingLocation,
    /// Distance known and beyond the radius.
    OutOfRange,
    /// Within the radius and not yet collected.
    InRange,
    /// The user is pressing the check-in control.
    Holding,
    /// The target has been collected.
    Collected,
}

/// Something that happened as a result of an engine operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ProximityEvent {
    /// The check-in state changed.
    StateChanged {
        /// Previous state.
        from: CheckInState,
        /// New state.
        to: CheckInState,
    },
    /// Hold progress as a fraction in `[0, 1]`.
    HoldProgress(f64),
    /// The target was added to the collected set.
    Collected(StableId),
    /// The caller should start live tracking for this target.
    TrackingRequested(StableId),
    /// The caller should stop any live tracking it started.
    TrackingReleased,
}

/// Host feedback fired when a check-in completes.
pub trait Haptics: Send + Sync {
    /// Signal a successful check-in.
    fn success(&self);
}

/// Read-only view of the engine for building user-facing state.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximitySnapshot {
    /// Current state.
    pub state: CheckInState,
    /// Selected target, if any.
    pub target: Option<StableId>,
    /// Origin in use for the active origin mode.
    pub origin: Option<Coordinate>,
    /// Distance from origin to target in metres.
    pub distance_m: Option<f64>,
    /// Hold progress in `[0, 1]`.
    pub hold_progress: f64,
    /// Most recent error from the active origin source.
    pub origin_error: Option<String>,
    /// Active origin source.
    pub origin_mode: OriginMode,
    /// Check-in radius in metres.
    pub threshold_m: f64,
    /// Hold-to-confirm duration.
    pub hold_duration: Duration,
}

impl ProximitySnapshot {
    /// Whether pressing the check-in control would start a hold.
    #[must_use]
    pub fn can_check_in(&self) -> bool {
        self.state == CheckInState::InRange && self.origin_error.is_none()
    }
}
