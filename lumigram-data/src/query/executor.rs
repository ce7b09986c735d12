//! The network retrieval port used by the cache on a miss.

use std::collections::HashSet;

use async_trait::async_trait;
use lumigram_core::{PlaceOfWorship, SpatialQuery};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Count of results sharing one upstream category tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    /// Tag key, for example `amenity`.
    pub key: String,
    /// Tag value, for example `place_of_worship`.
    pub value: String,
    /// Display label.
    pub label: String,
    /// Number of results carrying the tag.
    pub count: usize,
}

/// Places returned by one fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedPlaces {
    /// Results in de-duplicated arrival order.
    pub items: Vec<PlaceOfWorship>,
    /// Category summary reported by the upstream, when it provides one.
    pub categories: Vec<CategoryCount>,
    /// Result count reported by the upstream, which may differ from
    /// `items.len()` when it drops or merges elements.
    pub reported_count: Option<usize>,
    /// Radius the upstream actually searched, in metres.
    pub radius_m: Option<f64>,
}

impl From<Vec<PlaceOfWorship>> for FetchedPlaces {
    fn from(items: Vec<PlaceOfWorship>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }
}

/// Performs the network retrieval for a cache miss.
///
/// Implementations own endpoint failover: they return an error only once
/// every configured endpoint has failed.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Fetch the places matching `query`.
    async fn execute(&self, query: &SpatialQuery) -> Result<FetchedPlaces, FetchError>;
}

/// Drop places whose stable id was already seen, keeping the first.
pub fn dedup_by_stable_id<I>(places: I) -> Vec<PlaceOfWorship>
where
    I: IntoIterator<Item = PlaceOfWorship>,
{
    let mut seen = HashSet::new();
    places
        .into_iter()
        .filter(|place| seen.insert(place.stable_id.clone()))
        .collect()
}
