//! Session state tying location, places queries and check-in together.
//!
//! The [`Explorer`] owns one location resolver, one debounced places cache
//! and one proximity engine. It reacts to engine events by opening and
//! closing live tracking, and keeps the latest status line for display.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use lumigram_core::{
    BoundingBox, CheckInState, CollectedStore, Coordinate, OriginMode, PlaceOfWorship,
    ProximityEngine, ProximityEvent, SpatialQuery, StableId,
};
use lumigram_data::{
    CacheConfig, CacheEntry, DebounceConfig, QueryDebouncer, QueryExecutor, QueryIntent,
    SpatialQueryCache, Trigger,
};
use lumigram_location::{LiveTracking, LocationResolver};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::CliError;
use crate::status::{CheckInPrompt, StatusMessage};

pub(crate) struct Explorer<S> {
    resolver: LocationResolver,
    places: QueryDebouncer<dyn QueryExecutor>,
    engine: ProximityEngine<S>,
    results: Vec<PlaceOfWorship>,
    status: Option<StatusMessage>,
    tracking: Option<LiveTracking>,
}

impl<S: CollectedStore> Explorer<S> {
    pub(crate) fn new(
        resolver: LocationResolver,
        executor: Arc<dyn QueryExecutor>,
        engine: ProximityEngine<S>,
    ) -> Self {
        let cache = Arc::new(SpatialQueryCache::new(CacheConfig::default()));
        Self {
            resolver,
            places: QueryDebouncer::new(cache, executor, DebounceConfig::default()),
            engine,
            results: Vec::new(),
            status: None,
            tracking: None,
        }
    }

    pub(crate) const fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub(crate) fn results(&self) -> &[PlaceOfWorship] {
        &self.results
    }

    pub(crate) const fn engine(&self) -> &ProximityEngine<S> {
        &self.engine
    }

    pub(crate) fn is_tracking(&self) -> bool {
        self.tracking.as_ref().is_some_and(LiveTracking::is_active)
    }

    pub(crate) fn prompt(&self) -> CheckInPrompt {
        CheckInPrompt::from_snapshot(&self.engine.snapshot())
    }

    /// Resolve a one-shot origin through the provider chain.
    pub(crate) async fn locate(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Coordinate, CliError> {
        self.status = Some(StatusMessage::RequestingLocation);
        match self.resolver.resolve_once(cancel).await {
            Ok(origin) => {
                let events = self.engine.update_origin(origin);
                self.apply(events);
                Ok(origin)
            }
            Err(err) => {
                if !err.is_cancelled() {
                    self.status = Some(StatusMessage::Failed(err.to_string()));
                    let events = self.engine.report_location_error(err.to_string());
                    self.apply(events);
                }
                Err(err.into())
            }
        }
    }

    /// Load the places within `radius_m` of `origin`.
    pub(crate) async fn search_nearby(
        &mut self,
        origin: Coordinate,
        radius_m: f64,
    ) -> Result<&[PlaceOfWorship], CliError> {
        self.status = Some(StatusMessage::Searching);
        let query = SpatialQuery::Radius {
            center: origin,
            radius_m,
        };
        let intent = QueryIntent::new(query, Trigger::Immediate);
        let status = match self.run_query(intent).await? {
            Some(found) => {
                let reported = found.reported_count;
                let searched_m = found.radius_m.unwrap_or(radius_m);
                let accepted = self.accept(found);
                StatusMessage::Found {
                    count: reported.unwrap_or(accepted),
                    radius_m: searched_m,
                }
            }
            None => StatusMessage::Found { count: 0, radius_m },
        };
        self.status = Some(status);
        Ok(&self.results)
    }

    /// Load the places inside `bbox`, as a map would after `trigger`.
    pub(crate) async fn search_viewport(
        &mut self,
        bbox: BoundingBox,
        zoom: Option<f64>,
        trigger: Trigger,
    ) -> Result<&[PlaceOfWorship], CliError> {
        self.status = Some(StatusMessage::Searching);
        let mut intent = QueryIntent::new(SpatialQuery::Viewport(bbox), trigger);
        if let Some(level) = zoom {
            intent = intent.with_zoom(level);
        }
        let entry = self.run_query(intent).await?;
        self.status = Some(match entry {
            Some(found) => StatusMessage::Loaded {
                count: self.accept(found),
            },
            None => StatusMessage::ZoomedOut,
        });
        Ok(&self.results)
    }

    async fn run_query(&mut self, intent: QueryIntent) -> Result<Option<CacheEntry>, CliError> {
        match self.places.request(intent).await {
            Ok(entry) => Ok(entry),
            Err(err) => {
                if !err.is_cancelled() {
                    self.status = Some(StatusMessage::Failed(err.user_message()));
                }
                Err(err.into())
            }
        }
    }

    fn accept(&mut self, found: CacheEntry) -> usize {
        debug!("{} places for {}", found.items.len(), found.key);
        self.results = found.items;
        let events = self
            .engine
            .retain_results(self.results.iter().map(|place| &place.stable_id));
        self.apply(events);
        self.results.len()
    }

    /// Make the result with `id` the check-in target.
    pub(crate) fn select(&mut self, id: &StableId) -> Result<(), CliError> {
        let place = self
            .results
            .iter()
            .find(|place| place.stable_id == *id)
            .cloned()
            .ok_or_else(|| CliError::UnknownPlace { id: id.to_string() })?;
        let events = self.engine.select_target(&place);
        self.apply(events);
        Ok(())
    }

    /// Wait for the next live fix and feed it to the engine.
    ///
    /// Returns `false` once tracking has stopped.
    pub(crate) async fn next_fix(&mut self) -> bool {
        let Some(tracking) = self.tracking.as_mut() else {
            return false;
        };
        let events = match tracking.next().await {
            Some(Ok(fix)) => self.engine.update_origin(fix),
            Some(Err(err)) => self.engine.report_location_error(err.to_string()),
            None => {
                self.tracking = None;
                return false;
            }
        };
        self.apply(events);
        true
    }

    /// Use the map centre instead of live tracking as the check-in origin.
    pub(crate) fn use_map_center(&mut self) {
        let events = self.engine.set_origin_mode(OriginMode::MapCenter);
        self.apply(events);
    }

    /// Move the map centre to `center`.
    pub(crate) fn pan_to(&mut self, center: Coordinate) {
        let events = self.engine.set_map_center(center);
        self.apply(events);
    }

    /// Press and hold the check-in control, sampling every `tick`.
    ///
    /// Returns `true` when the hold completed and the target was collected.
    pub(crate) async fn hold(&mut self, tick: Duration) -> bool {
        let events = self.engine.press_start(Instant::now().into_std());
        self.apply(events);
        while self.engine.state() == CheckInState::Holding {
            tokio::time::sleep(tick).await;
            let events = self.engine.tick(Instant::now().into_std());
            self.apply(events);
        }
        let events = self.engine.release(Instant::now().into_std());
        self.apply(events);
        self.engine.state() == CheckInState::Collected
    }

    /// Drop the target and stop any live tracking.
    pub(crate) fn finish(&mut self) {
        let events = self.engine.deselect();
        self.apply(events);
        if let Some(mut tracking) = self.tracking.take() {
            tracking.stop();
        }
    }

    fn apply(&mut self, events: Vec<ProximityEvent>) {
        let mut queue = VecDeque::from(events);
        while let Some(event) = queue.pop_front() {
            match event {
                ProximityEvent::TrackingRequested(id) => match self.resolver.subscribe() {
                    Ok(tracking) => {
                        debug!("tracking {id} via {}", tracking.provider());
                        self.tracking = Some(tracking);
                    }
                    Err(err) => {
                        warn!("cannot track location for {id}: {err}");
                        queue.extend(self.engine.report_location_error(err.to_string()));
                    }
                },
                ProximityEvent::TrackingReleased => {
                    if let Some(mut tracking) = self.tracking.take() {
                        tracking.stop();
                    }
                }
                ProximityEvent::Collected(id) => debug!("collected {id}"),
                ProximityEvent::StateChanged { .. } | ProximityEvent::HoldProgress(_) => {}
            }
        }
    }
}
