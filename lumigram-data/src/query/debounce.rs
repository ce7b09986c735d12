//! Debouncing of rapid viewport changes in front of the cache.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::debug;
use lumigram_core::{SpatialQuery, SpatialQueryKey};
use tokio_util::sync::CancellationToken;

use super::cache::{CacheEntry, SpatialQueryCache};
use super::executor::QueryExecutor;
use crate::error::QueryError;

/// Default settle delay after the map finishes moving.
pub const DEFAULT_MOVE_END_DELAY: Duration = Duration::from_millis(350);

/// Default settle delay after the map finishes zooming.
pub const DEFAULT_ZOOM_END_DELAY: Duration = Duration::from_millis(150);

/// Default minimum zoom at which viewport queries fetch.
pub const DEFAULT_MIN_FETCH_ZOOM: f64 = 11.0;

/// What caused a query request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The map finished panning.
    MoveEnd,
    /// The map finished zooming.
    ZoomEnd,
    /// An explicit request that should not wait.
    Immediate,
}

/// Tunables for [`QueryDebouncer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebounceConfig {
    /// Delay applied to [`Trigger::MoveEnd`].
    pub move_end: Duration,
    /// Delay applied to [`Trigger::ZoomEnd`].
    pub zoom_end: Duration,
    /// Viewport requests below this zoom do not fetch.
    pub min_fetch_zoom: f64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            move_end: DEFAULT_MOVE_END_DELAY,
            zoom_end: DEFAULT_ZOOM_END_DELAY,
            min_fetch_zoom: DEFAULT_MIN_FETCH_ZOOM,
        }
    }
}

impl DebounceConfig {
    const fn delay(&self, trigger: Trigger) -> Duration {
        match trigger {
            Trigger::MoveEnd => self.move_end,
            Trigger::ZoomEnd => self.zoom_end,
            Trigger::Immediate => Duration::ZERO,
        }
    }
}

/// A request to run `query` once the map settles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryIntent {
    /// Query to run.
    pub query: SpatialQuery,
    /// Event that caused the request.
    pub trigger: Trigger,
    /// Current map zoom, when the query comes from a map view.
    pub zoom: Option<f64>,
}

impl QueryIntent {
    /// Intent for `query` without a zoom constraint.
    #[must_use]
    pub const fn new(query: SpatialQuery, trigger: Trigger) -> Self {
        Self {
            query,
            trigger,
            zoom: None,
        }
    }

    /// Attach the current map zoom.
    #[must_use]
    pub const fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = Some(zoom);
        self
    }
}

struct PendingIntent {
    generation: u64,
    key: SpatialQueryKey,
    token: CancellationToken,
}

#[derive(Default)]
struct Pending {
    current: Option<PendingIntent>,
    next_generation: u64,
}

/// Coalesces bursts of query requests so only the settled one fetches.
///
/// Each request replaces the pending intent and cancels the previous one.
/// After its delay a request proceeds only if it is still the current
/// intent.
pub struct QueryDebouncer<E: ?Sized> {
    cache: Arc<SpatialQueryCache>,
    executor: Arc<E>,
    config: DebounceConfig,
    pending: Mutex<Pending>,
}

impl<E: ?Sized> std::fmt::Debug for QueryDebouncer<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryDebouncer")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<E> QueryDebouncer<E>
where
    E: QueryExecutor + ?Sized,
{
    /// Create a debouncer in front of `cache`, fetching through `executor`.
    #[must_use]
    pub fn new(cache: Arc<SpatialQueryCache>, executor: Arc<E>, config: DebounceConfig) -> Self {
        Self {
            cache,
            executor,
            config,
            pending: Mutex::new(Pending::default()),
        }
    }

    /// The cache behind this debouncer.
    #[must_use]
    pub const fn cache(&self) -> &Arc<SpatialQueryCache> {
        &self.cache
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Key of the pending intent, if any.
    #[must_use]
    pub fn pending_key(&self) -> Option<SpatialQueryKey> {
        self.lock().current.as_ref().map(|intent| intent.key.clone())
    }

    /// Cancel the pending intent and any fetch it started.
    pub fn cancel(&self) {
        if let Some(intent) = self.lock().current.take() {
            intent.token.cancel();
        }
        self.cache.cancel_in_flight();
    }

    /// Run `intent` once it has settled.
    ///
    /// Returns `Ok(None)` when the zoom is below the minimum fetch zoom.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Cancelled`] when a later request replaced this
    /// one, plus any error from [`SpatialQueryCache::query`].
    pub async fn request(&self, intent: QueryIntent) -> Result<Option<CacheEntry>, QueryError> {
        let key = intent.query.key();
        let (generation, token) = self.replace_pending(key.clone());

        let delay = self.config.delay(intent.trigger);
        if !delay.is_zero() {
            tokio::select! {
                biased;
                () = token.cancelled() => return Err(QueryError::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
        }
        if !self.is_current(generation) {
            return Err(QueryError::Cancelled);
        }

        let outcome = if intent
            .zoom
            .is_some_and(|zoom| zoom < self.config.min_fetch_zoom)
        {
            debug!("zoom below minimum; skipping fetch for {key}");
            Ok(None)
        } else {
            tokio::select! {
                biased;
                () = token.cancelled() => Err(QueryError::Cancelled),
                result = self.cache.query(&intent.query, self.executor.as_ref()) => result.map(Some),
            }
        };
        self.clear_if_current(generation);
        outcome
    }

    fn replace_pending(&self, key: SpatialQueryKey) -> (u64, CancellationToken) {
        let mut pending = self.lock();
        if let Some(previous) = pending.current.take() {
            debug!("request for {key} replaces pending {}", previous.key);
            previous.token.cancel();
        }
        pending.next_generation = pending.next_generation.wrapping_add(1);
        let generation = pending.next_generation;
        let token = CancellationToken::new();
        pending.current = Some(PendingIntent {
            generation,
            key,
            token: token.clone(),
        });
        (generation, token)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock()
            .current
            .as_ref()
            .is_some_and(|intent| intent.generation == generation)
    }

    fn clear_if_current(&self, generation: u64) {
        let mut pending = self.lock();
        if pending
            .current
            .as_ref()
            .is_some_and(|intent| intent.generation == generation)
        {
            pending.current = None;
        }
    }
}
