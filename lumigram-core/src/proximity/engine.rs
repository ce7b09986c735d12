use std::fmt;
use std::time::Instant;

use log::{debug, info, warn};

use super::{
    CheckInState, Haptics, HoldTimer, OriginMode, ProximityConfig, ProximityEvent,
    ProximitySnapshot,
};
use crate::collected::{CollectedSet, CollectedStore};
use crate::coordinate::{Coordinate, haversine_distance};
use crate::place::{PlaceOfWorship, StableId};

#[derive(Debug, Clone)]
struct Target {
    id: StableId,
    coordinate: Coordinate,
}

/// Gates collecting a place behind proximity and a sustained hold.
///
/// The engine owns the [`CollectedSet`], loading it from the injected
/// [`CollectedStore`] on construction and saving it after every mutation.
/// Save failures are logged and otherwise ignored.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, Instant};
/// use lumigram_core::{
///     CheckInState, Coordinate, MemoryCollectedStore, PlaceOfWorship, ProximityConfig,
///     ProximityEngine, StableId, Tags,
/// };
///
/// # fn main() -> Result<(), lumigram_core::CoordinateError> {
/// let chapel = Coordinate::new(46.05, 14.5)?;
/// let place = PlaceOfWorship::from_tags(StableId::new("node/1"), chapel, Tags::new());
/// let mut engine = ProximityEngine::new(ProximityConfig::default(), MemoryCollectedStore::default());
///
/// engine.select_target(&place);
/// engine.update_origin(chapel);
/// assert_eq!(engine.state(), CheckInState::InRange);
///
/// let start = Instant::now();
/// engine.press_start(start);
/// engine.tick(start + Duration::from_secs(3));
/// assert_eq!(engine.state(), CheckInState::Collected);
/// # Ok(())
/// # }
/// ```
pub struct ProximityEngine<S> {
    config: ProximityConfig,
    store: S,
    collected: CollectedSet,
    target: Option<Target>,
    live_origin: Option<Coordinate>,
    map_center: Option<Coordinate>,
    origin_mode: OriginMode,
    origin_error: Option<String>,
    state: CheckInState,
    hold: Option<HoldTimer>,
    progress: f64,
    tracking: bool,
    haptics: Option<Box<dyn Haptics>>,
}

impl<S> fmt::Debug for ProximityEngine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProximityEngine")
            .field("state", &self.state)
            .field("target", &self.target)
            .field("origin_mode", &self.origin_mode)
            .field("collected", &self.collected.len())
            .finish_non_exhaustive()
    }
}

impl<S: CollectedStore> ProximityEngine<S> {
    /// Create an engine, loading previously collected ids from `store`.
    pub fn new(config: ProximityConfig, store: S) -> Self {
        let collected = store.load();
        debug!("loaded {} collected places", collected.len());
        Self {
            origin_mode: config.origin_mode(),
            config,
            store,
            collected,
            target: None,
            live_origin: None,
            map_center: None,
            origin_error: None,
            state: CheckInState::Idle,
            hold: None,
            progress: 0.0,
            tracking: false,
            haptics: None,
        }
    }

    /// Attach host feedback fired on successful check-in.
    #[must_use]
    pub fn with_haptics(mut self, haptics: Box<dyn Haptics>) -> Self {
        self.haptics = Some(haptics);
        self
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> CheckInState {
        self.state
    }

    /// Collected ids.
    #[must_use]
    pub const fn collected(&self) -> &CollectedSet {
        &self.collected
    }

    /// Whether `id` has been collected.
    #[must_use]
    pub fn is_collected(&self, id: &StableId) -> bool {
        self.collected.contains(id)
    }

    /// Origin in use for the active origin mode.
    #[must_use]
    pub const fn origin(&self) -> Option<Coordinate> {
        match self.origin_mode {
            OriginMode::LiveTracking => self.live_origin,
            OriginMode::MapCenter => self.map_center,
        }
    }

    /// Distance from the origin to the target in metres.
    #[must_use]
    pub fn distance_m(&self) -> Option<f64> {
        let target = self.target.as_ref()?;
        let origin = self.origin()?;
        Some(haversine_distance(origin, target.coordinate))
    }

    /// Read-only view for building user-facing state.
    #[must_use]
    pub fn snapshot(&self) -> ProximitySnapshot {
        ProximitySnapshot {
            state: self.state,
            target: self.target.as_ref().map(|t| t.id.clone()),
            origin: self.origin(),
            distance_m: self.distance_m(),
            hold_progress: self.progress,
            origin_error: self.origin_error.clone(),
            origin_mode: self.origin_mode,
            threshold_m: self.config.threshold_m(),
            hold_duration: self.config.hold_duration(),
        }
    }

    /// Select `place` as the check-in target.
    ///
    /// Any hold in progress is cancelled and live tracking for a previous
    /// target is released. Re-selecting the current target is a no-op.
    pub fn select_target(&mut self, place: &PlaceOfWorship) -> Vec<ProximityEvent> {
        let mut events = Vec::new();
        if self
            .target
            .as_ref()
            .is_some_and(|current| current.id == place.stable_id)
        {
            return events;
        }
        self.hold = None;
        self.reset_progress(&mut events);
        self.release_tracking(&mut events);
        self.target = Some(Target {
            id: place.stable_id.clone(),
            coordinate: place.coordinate,
        });
        let next = self.settle(false);
        self.transition(next, &mut events);
        self.sync_tracking(&mut events);
        events
    }

    /// Drop the current target, tearing down its hold and live tracking.
    pub fn deselect(&mut self) -> Vec<ProximityEvent> {
        let mut events = Vec::new();
        if self.target.is_none() {
            return events;
        }
        self.hold = None;
        self.target = None;
        self.reset_progress(&mut events);
        self.transition(CheckInState::Idle, &mut events);
        self.sync_tracking(&mut events);
        events
    }

    /// Deselect the target unless `ids` still contains it.
    pub fn retain_results<'a, I>(&mut self, ids: I) -> Vec<ProximityEvent>
    where
        I: IntoIterator<Item = &'a StableId>,
    {
        let Some(target) = self.target.as_ref() else {
            return Vec::new();
        };
        if ids.into_iter().any(|id| *id == target.id) {
            return Vec::new();
        }
        debug!("target {} left the result set", target.id);
        self.deselect()
    }

    /// Feed a live location fix.
    pub fn update_origin(&mut self, origin: Coordinate) -> Vec<ProximityEvent> {
        let mut events = Vec::new();
        self.live_origin = Some(origin);
        if self.origin_mode == OriginMode::LiveTracking {
            self.origin_error = None;
            self.reevaluate(&mut events);
        }
        events
    }

    /// Record a failure of the active origin source.
    ///
    /// The origin becomes unknown, which cancels any hold in progress.
    pub fn report_location_error(&mut self, message: impl Into<String>) -> Vec<ProximityEvent> {
        let mut events = Vec::new();
        match self.origin_mode {
            OriginMode::LiveTracking => self.live_origin = None,
            OriginMode::MapCenter => self.map_center = None,
        }
        self.origin_error = Some(message.into());
        self.reevaluate(&mut events);
        events
    }

    /// Update the manually positioned map centre.
    pub fn set_map_center(&mut self, center: Coordinate) -> Vec<ProximityEvent> {
        let mut events = Vec::new();
        self.map_center = Some(center);
        if self.origin_mode == OriginMode::MapCenter {
            self.origin_error = None;
            self.reevaluate(&mut events);
        }
        events
    }

    /// Switch between live tracking and the map centre as origin.
    ///
    /// Switching to the map centre releases live tracking.
    pub fn set_origin_mode(&mut self, mode: OriginMode) -> Vec<ProximityEvent> {
        let mut events = Vec::new();
        if self.origin_mode == mode {
            return events;
        }
        self.origin_mode = mode;
        self.origin_error = None;
        self.reevaluate(&mut events);
        self.sync_tracking(&mut events);
        events
    }

    /// Begin the hold gesture at `now`.
    ///
    /// Ignored unless the target is in range and the origin is healthy.
    pub fn press_start(&mut self, now: Instant) -> Vec<ProximityEvent> {
        let mut events = Vec::new();
        if self.state != CheckInState::InRange || self.origin_error.is_some() {
            debug!("hold ignored in state {:?}", self.state);
            return events;
        }
        self.hold = Some(HoldTimer::start(now, self.config.hold_duration()));
        self.set_progress(0.0, &mut events);
        self.transition(CheckInState::Holding, &mut events);
        events
    }

    /// Sample the hold timer at `now`, completing the check-in once the full
    /// duration has elapsed.
    pub fn tick(&mut self, now: Instant) -> Vec<ProximityEvent> {
        let mut events = Vec::new();
        let Some(hold) = self.hold else {
            return events;
        };
        if hold.is_complete(now) {
            self.complete(&mut events);
        } else {
            self.set_progress(hold.progress(now), &mut events);
        }
        events
    }

    /// End the hold gesture at `now`.
    ///
    /// Releasing before the duration elapses cancels the hold and resets
    /// progress; releasing afterwards completes the check-in.
    pub fn release(&mut self, now: Instant) -> Vec<ProximityEvent> {
        let mut events = Vec::new();
        let Some(hold) = self.hold else {
            return events;
        };
        if hold.is_complete(now) {
            self.complete(&mut events);
            return events;
        }
        self.cancel_hold(&mut events);
        let next = self.settle(true);
        self.transition(next, &mut events);
        events
    }

    /// Remove every collected id and persist the empty set.
    ///
    /// A collected target returns to its proximity state.
    pub fn clear_collected(&mut self) -> Vec<ProximityEvent> {
        let mut events = Vec::new();
        self.collected.clear();
        self.persist();
        info!("cleared collected places");
        if self.state == CheckInState::Collected {
            self.reset_progress(&mut events);
            let next = self.settle(false);
            self.transition(next, &mut events);
        }
        self.sync_tracking(&mut events);
        events
    }

    fn complete(&mut self, events: &mut Vec<ProximityEvent>) {
        let Some(target) = self.target.clone() else {
            return;
        };
        self.hold = None;
        if self.collected.insert(target.id.clone()) {
            self.persist();
        }
        if let Some(haptics) = &self.haptics {
            haptics.success();
        }
        info!("collected {}", target.id);
        self.set_progress(1.0, events);
        self.transition(CheckInState::Collected, events);
        events.push(ProximityEvent::Collected(target.id));
        self.sync_tracking(events);
    }

    fn persist(&self) {
        if let Err(err) = self.store.save(&self.collected) {
            warn!("failed to persist collected places: {err}");
        }
    }

    fn reevaluate(&mut self, events: &mut Vec<ProximityEvent>) {
        match self.state {
            CheckInState::Idle | CheckInState::Collected => {}
            CheckInState::Holding => {
                let next = self.settle(true);
                if next != CheckInState::InRange {
                    self.cancel_hold(events);
                    self.transition(next, events);
                }
            }
            CheckInState::AwaitingLocation | CheckInState::OutOfRange | CheckInState::InRange => {
                let next = self.settle(self.state == CheckInState::InRange);
                self.transition(next, events);
            }
        }
    }

    /// State implied by the target, the collected set and the distance.
    ///
    /// `in_range_now` applies exit hysteresis for a target already in range.
    fn settle(&self, in_range_now: bool) -> CheckInState {
        let Some(target) = self.target.as_ref() else {
            return CheckInState::Idle;
        };
        if self.collected.contains(&target.id) {
            return CheckInState::Collected;
        }
        self.distance_m()
            .map_or(CheckInState::AwaitingLocation, |distance| {
                self.range_state(distance, in_range_now)
            })
    }

    #[expect(clippy::float_arithmetic, reason = "threshold plus hysteresis")]
    fn range_state(&self, distance: f64, in_range_now: bool) -> CheckInState {
        let limit = if in_range_now {
            self.config.threshold_m() + self.config.hysteresis_m()
        } else {
            self.config.threshold_m()
        };
        if distance <= limit {
            CheckInState::InRange
        } else {
            CheckInState::OutOfRange
        }
    }

    fn transition(&mut self, to: CheckInState, events: &mut Vec<ProximityEvent>) {
        if self.state != to {
            debug!("check-in state {:?} -> {to:?}", self.state);
            events.push(ProximityEvent::StateChanged {
                from: self.state,
                to,
            });
            self.state = to;
        }
    }

    fn cancel_hold(&mut self, events: &mut Vec<ProximityEvent>) {
        self.hold = None;
        self.set_progress(0.0, events);
    }

    fn reset_progress(&mut self, events: &mut Vec<ProximityEvent>) {
        if self.progress > 0.0 {
            self.set_progress(0.0, events);
        }
    }

    fn set_progress(&mut self, progress: f64, events: &mut Vec<ProximityEvent>) {
        self.progress = progress;
        events.push(ProximityEvent::HoldProgress(progress));
    }

    fn wants_tracking(&self) -> bool {
        self.origin_mode == OriginMode::LiveTracking
            && self
                .target
                .as_ref()
                .is_some_and(|target| !self.collected.contains(&target.id))
    }

    fn sync_tracking(&mut self, events: &mut Vec<ProximityEvent>) {
        let wanted = self.wants_tracking();
        if wanted == self.tracking {
            return;
        }
        if wanted {
            if let Some(target) = &self.target {
                events.push(ProximityEvent::TrackingRequested(target.id.clone()));
                self.tracking = true;
            }
        } else {
            self.release_tracking(events);
        }
    }

    fn release_tracking(&mut self, events: &mut Vec<ProximityEvent>) {
        if self.tracking {
            self.tracking = false;
            events.push(ProximityEvent::TrackingReleased);
        }
    }
}
