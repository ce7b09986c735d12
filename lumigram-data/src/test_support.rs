//! Test utilities for query executors.
//!
//! This module provides [`StubExecutor`], a deterministic [`QueryExecutor`]
//! that answers from memory after an optional delay and records every query
//! it receives.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use lumigram_core::{PlaceOfWorship, SpatialQuery, SpatialQueryKey};

use crate::error::FetchError;
use crate::query::{FetchedPlaces, QueryExecutor};

#[derive(Debug, Default)]
struct Recorded {
    started: Vec<SpatialQueryKey>,
    completed: Vec<SpatialQueryKey>,
}

/// Stub [`QueryExecutor`] for testing.
///
/// Clones share their recorded calls.
///
/// # Example
///
/// ```
/// use lumigram_core::{BoundingBox, SpatialQuery};
/// use lumigram_data::query::{CacheConfig, SpatialQueryCache};
/// use lumigram_data::test_support::StubExecutor;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let executor = StubExecutor::with_places(Vec::new());
/// let cache = SpatialQueryCache::new(CacheConfig::default());
/// let query = SpatialQuery::Viewport(BoundingBox::new(46.0, 14.0, 46.1, 14.1)?);
/// cache.query(&query, &executor).await?;
/// cache.query(&query, &executor).await?;
/// assert_eq!(executor.calls(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct StubExecutor {
    response: Result<FetchedPlaces, FetchError>,
    delay: Duration,
    key_delays: HashMap<SpatialQueryKey, Duration>,
    recorded: Arc<Mutex<Recorded>>,
}

impl StubExecutor {
    /// Executor answering every query with `places`.
    #[must_use]
    pub fn with_places(places: Vec<PlaceOfWorship>) -> Self {
        Self::with_fetched(FetchedPlaces::from(places))
    }

    /// Executor answering every query with `fetched`, including any
    /// upstream-reported count and radius.
    #[must_use]
    pub fn with_fetched(fetched: FetchedPlaces) -> Self {
        Self {
            response: Ok(fetched),
            delay: Duration::ZERO,
            key_delays: HashMap::new(),
            recorded: Arc::default(),
        }
    }

    /// Executor failing every query with `error`.
    #[must_use]
    pub fn with_error(error: FetchError) -> Self {
        Self {
            response: Err(error),
            ..Self::with_places(Vec::new())
        }
    }

    /// Delay every answer.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Delay answers for one key, overriding the default delay.
    #[must_use]
    pub fn with_key_delay(mut self, key: SpatialQueryKey, delay: Duration) -> Self {
        self.key_delays.insert(key, delay);
        self
    }

    /// Number of fetches started.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.lock().started.len()
    }

    /// Keys of the fetches started, in order.
    #[must_use]
    pub fn started_keys(&self) -> Vec<SpatialQueryKey> {
        self.lock().started.clone()
    }

    /// Keys of the fetches that ran to completion, in order.
    #[must_use]
    pub fn completed_keys(&self) -> Vec<SpatialQueryKey> {
        self.lock().completed.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl QueryExecutor for StubExecutor {
    async fn execute(&self, query: &SpatialQuery) -> Result<FetchedPlaces, FetchError> {
        let key = query.key();
        self.lock().started.push(key.clone());
        let delay = self.key_delays.get(&key).copied().unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.lock().completed.push(key);
        self.response.clone()
    }
}
