//! User-facing status lines and check-in prompts.

use std::fmt;
use std::time::Duration;

use lumigram_core::{
    CheckInState, OriginMode, ProximitySnapshot, distance_progress, format_distance,
};

/// Progress line shown while finding places.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StatusMessage {
    /// Waiting for the location provider chain.
    RequestingLocation,
    /// The places query is running.
    Searching,
    /// The query finished.
    Found {
        /// Number of places reported.
        count: usize,
        /// Radius searched, in metres.
        radius_m: f64,
    },
    /// A viewport query finished.
    Loaded {
        /// Number of places in view.
        count: usize,
    },
    /// The map is zoomed out too far to load places.
    ZoomedOut,
    /// Something failed; the text is shown as is.
    Failed(String),
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestingLocation => f.write_str("Requesting your location…"),
            Self::Searching => f.write_str("Searching for nearby places of worship…"),
            Self::Found { count, radius_m } => {
                write!(f, "Found {count} places within {:.1} km.", radius_m / 1000.0)
            }
            Self::Loaded { count } => write!(f, "Loaded {count} places in view."),
            Self::ZoomedOut => f.write_str("Zoom in to load places."),
            Self::Failed(message) => f.write_str(message),
        }
    }
}

/// Visual treatment of the check-in control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tone {
    /// Check-in is not possible yet.
    Locked,
    /// Holding the control will collect the place.
    Ready,
    /// The place is already collected.
    Stamped,
}

/// Title, subtitle and tone of the check-in control.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CheckInPrompt {
    /// Main label.
    pub(crate) title: String,
    /// Secondary label.
    pub(crate) subtitle: String,
    /// Visual treatment.
    pub(crate) tone: Tone,
    /// Distance meter fill, shown while out of range.
    pub(crate) meter: Option<f64>,
    /// Hold progress in `[0, 1]`.
    pub(crate) progress: f64,
}

fn hold_label(hold: Duration) -> String {
    if hold.subsec_millis() == 0 {
        format!("Hold {}s to stamp", hold.as_secs())
    } else {
        format!("Hold {:.1}s to stamp", hold.as_secs_f64())
    }
}

impl CheckInPrompt {
    fn locked(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            tone: Tone::Locked,
            meter: None,
            progress: 0.0,
        }
    }

    /// Derive the prompt for the current engine state.
    pub(crate) fn from_snapshot(snapshot: &ProximitySnapshot) -> Self {
        let map_center = snapshot.origin_mode == OriginMode::MapCenter;
        if snapshot.target.is_none() {
            return Self::locked("Select a place", "Tap a marker on the map");
        }
        if snapshot.state == CheckInState::Collected {
            return Self {
                tone: Tone::Stamped,
                progress: snapshot.hold_progress,
                ..Self::locked("Already stamped", "You have collected this place.")
            };
        }
        if let Some(error) = &snapshot.origin_error {
            let title = if map_center { "Map center not ready" } else { "Enable GPS" };
            return Self::locked(title, error.clone());
        }
        let Some(distance) = snapshot.distance_m else {
            return if map_center {
                Self::locked("Pick a map center", "Pan the map to set the center.")
            } else {
                Self::locked("Locating…", "Waiting for GPS signal.")
            };
        };
        match snapshot.state {
            CheckInState::InRange | CheckInState::Holding => Self {
                title: hold_label(snapshot.hold_duration),
                subtitle: format!("Within {} m", snapshot.threshold_m),
                tone: Tone::Ready,
                meter: None,
                progress: snapshot.hold_progress,
            },
            _ => Self {
                meter: Some(distance_progress(distance, snapshot.threshold_m)),
                ..Self::locked(
                    "Move closer",
                    format!("Distance: {}", format_distance(distance)),
                )
            },
        }
    }
}

impl fmt::Display for CheckInPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.subtitle)?;
        if let Some(meter) = self.meter {
            write!(f, " [{:.0}%]", meter * 100.0)?;
        }
        Ok(())
    }
}
