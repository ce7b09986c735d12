//! Keyed result cache with supersession and an absolute fetch deadline.

use std::collections::{HashMap, VecDeque};
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use lumigram_core::{PlaceOfWorship, SpatialQuery, SpatialQueryKey};
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use super::executor::{CategoryCount, FetchedPlaces, QueryExecutor};
use crate::error::QueryError;

/// Default absolute deadline for one fetch.
pub const DEFAULT_DEADLINE: Duration = Duration::from_millis(8000);

/// Default number of entries kept before the least recently used is evicted.
pub const DEFAULT_CAPACITY: usize = 256;

/// Results cached for one [`SpatialQueryKey`].
///
/// Callers always receive an owned copy.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Normalized key.
    pub key: SpatialQueryKey,
    /// Places in de-duplicated arrival order.
    pub items: Vec<PlaceOfWorship>,
    /// Upstream category summary, if any.
    pub categories: Vec<CategoryCount>,
    /// Result count reported by the upstream, if any.
    pub reported_count: Option<usize>,
    /// Radius the upstream searched in metres, if reported.
    pub radius_m: Option<f64>,
    /// When the fetch completed.
    pub fetched_at: DateTime<Utc>,
}

/// Tunables for [`SpatialQueryCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Absolute deadline for each fetch.
    pub deadline: Duration,
    /// Entry bound; `None` keeps entries for the life of the process.
    pub capacity: Option<NonZeroUsize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            deadline: DEFAULT_DEADLINE,
            capacity: NonZeroUsize::new(DEFAULT_CAPACITY),
        }
    }
}

impl CacheConfig {
    /// Set the fetch deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Set the entry bound. Zero disables eviction.
    #[must_use]
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = NonZeroUsize::new(capacity);
        self
    }
}

type SharedOutcome = Option<Result<CacheEntry, QueryError>>;

struct InFlight {
    generation: u64,
    key: SpatialQueryKey,
    token: CancellationToken,
    done: watch::Sender<SharedOutcome>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<SpatialQueryKey, CacheEntry>,
    recency: VecDeque<SpatialQueryKey>,
    in_flight: Option<InFlight>,
    next_generation: u64,
}

impl CacheState {
    fn touch(&mut self, key: &SpatialQueryKey) {
        if let Some(position) = self.recency.iter().position(|k| k == key) {
            self.recency.remove(position);
        }
        self.recency.push_back(key.clone());
    }

    fn store(&mut self, entry: CacheEntry, capacity: Option<NonZeroUsize>) {
        let key = entry.key.clone();
        self.entries.insert(key.clone(), entry);
        self.touch(&key);
        let Some(capacity) = capacity else {
            return;
        };
        while self.entries.len() > capacity.get() {
            let Some(oldest) = self.recency.pop_front() else {
                break;
            };
            debug!("evicting cached query {oldest}");
            self.entries.remove(&oldest);
        }
    }
}

/// Caches spatial query results by normalized key.
///
/// - A hit returns a copy without touching the network.
/// - Concurrent callers asking for the same key share one fetch.
/// - Starting a fetch for a different key cancels the fetch in flight; a
///   superseded result is never written to the cache or returned.
/// - Each fetch is bounded by [`CacheConfig::deadline`], surfacing
///   [`QueryError::Timeout`].
///
/// With a capacity set, the least recently used entry is evicted once the
/// bound is exceeded.
#[derive(Default)]
pub struct SpatialQueryCache {
    config: CacheConfig,
    state: Mutex<CacheState>,
}

impl std::fmt::Debug for SpatialQueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SpatialQueryCache")
            .field("config", &self.config)
            .field("entries", &state.entries.len())
            .field("in_flight", &state.in_flight.as_ref().map(|f| &f.key))
            .finish()
    }
}

enum Role {
    Leader {
        generation: u64,
        token: CancellationToken,
    },
    Follower(watch::Receiver<SharedOutcome>),
}

/// Clears the in-flight slot if the leading future is dropped early.
struct FlightGuard<'a> {
    cache: &'a SpatialQueryCache,
    generation: u64,
    armed: bool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.cache.lock();
        if state
            .in_flight
            .as_ref()
            .is_some_and(|flight| flight.generation == self.generation)
        {
            debug!("abandoned fetch {}", self.generation);
            state.in_flight = None;
        }
    }
}

impl SpatialQueryCache {
    /// Create a cache with `config`.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached entry for `key`, without fetching.
    #[must_use]
    pub fn cached(&self, key: &SpatialQueryKey) -> Option<CacheEntry> {
        let mut state = self.lock();
        let entry = state.entries.get(key).cloned()?;
        state.touch(key);
        Some(entry)
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Key of the fetch currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> Option<SpatialQueryKey> {
        self.lock().in_flight.as_ref().map(|flight| flight.key.clone())
    }

    /// Cancel the fetch in flight, if any.
    pub fn cancel_in_flight(&self) {
        if let Some(flight) = self.lock().in_flight.take() {
            debug!("cancelling fetch for {}", flight.key);
            flight.token.cancel();
        }
    }

    /// Return the entry for `query`, fetching through `executor` on a miss.
    ///
    /// # Errors
    ///
    /// - [`QueryError::Cancelled`] when a fetch for another key superseded
    ///   this one.
    /// - [`QueryError::Timeout`] when the deadline elapsed.
    /// - [`QueryError::Fetch`] when the executor failed.
    pub async fn query<E>(&self, query: &SpatialQuery, executor: &E) -> Result<CacheEntry, QueryError>
    where
        E: QueryExecutor + ?Sized,
    {
        let key = query.key();
        let role = {
            let mut state = self.lock();
            if let Some(entry) = state.entries.get(&key).cloned() {
                state.touch(&key);
                debug!("cache hit for {key}");
                return Ok(entry);
            }
            self.claim(&mut state, &key)
        };

        match role {
            Role::Follower(receiver) => Self::follow(receiver).await,
            Role::Leader { generation, token } => {
                let mut guard = FlightGuard {
                    cache: self,
                    generation,
                    armed: true,
                };
                let outcome = self.fetch(query, executor, &token).await;
                guard.armed = false;
                self.finish(generation, key, outcome)
            }
        }
    }

    fn claim(&self, state: &mut CacheState, key: &SpatialQueryKey) -> Role {
        if let Some(flight) = state.in_flight.as_ref() {
            if flight.key == *key {
                debug!("joining fetch in flight for {key}");
                return Role::Follower(flight.done.subscribe());
            }
            debug!("fetch for {key} supersedes {}", flight.key);
            flight.token.cancel();
        }
        state.next_generation = state.next_generation.wrapping_add(1);
        let generation = state.next_generation;
        let token = CancellationToken::new();
        let (done, _) = watch::channel(None);
        state.in_flight = Some(InFlight {
            generation,
            key: key.clone(),
            token: token.clone(),
            done,
        });
        Role::Leader { generation, token }
    }

    async fn follow(mut receiver: watch::Receiver<SharedOutcome>) -> Result<CacheEntry, QueryError> {
        match receiver.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone().unwrap_or(Err(QueryError::Cancelled)),
            Err(_) => Err(QueryError::Cancelled),
        }
    }

    async fn fetch<E>(
        &self,
        query: &SpatialQuery,
        executor: &E,
        token: &CancellationToken,
    ) -> Result<FetchedPlaces, QueryError>
    where
        E: QueryExecutor + ?Sized,
    {
        let deadline = self.config.deadline;
        tokio::select! {
            biased;
            () = token.cancelled() => Err(QueryError::Cancelled),
            outcome = timeout(deadline, executor.execute(query)) => match outcome {
                Ok(Ok(places)) => Ok(places),
                Ok(Err(error)) => Err(QueryError::Fetch(error)),
                Err(_) => Err(QueryError::Timeout { deadline }),
            },
        }
    }

    fn finish(
        &self,
        generation: u64,
        key: SpatialQueryKey,
        outcome: Result<FetchedPlaces, QueryError>,
    ) -> Result<CacheEntry, QueryError> {
        let mut state = self.lock();
        let current = state
            .in_flight
            .as_ref()
            .is_some_and(|flight| flight.generation == generation);
        if !current {
            debug!("discarding superseded result for {key}");
            return Err(QueryError::Cancelled);
        }
        let Some(flight) = state.in_flight.take() else {
            return Err(QueryError::Cancelled);
        };
        let result = outcome.map(|places| CacheEntry {
            key,
            items: places.items,
            categories: places.categories,
            reported_count: places.reported_count,
            radius_m: places.radius_m,
            fetched_at: Utc::now(),
        });
        match &result {
            Ok(entry) => state.store(entry.clone(), self.config.capacity),
            Err(error) => warn!("fetch for {} failed: {error}", flight.key),
        }
        flight.done.send_replace(Some(result.clone()));
        result
    }
}
