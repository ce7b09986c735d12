use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use lumigram_core::test_support::place_at;
use lumigram_core::{BoundingBox, SpatialQuery};
use rstest::{fixture, rstest};
use tokio::time::{Instant, sleep};

use super::*;
use crate::error::{FetchError, QueryError};
use crate::test_support::StubExecutor;

fn viewport(south: f64, west: f64) -> SpatialQuery {
    let bbox = BoundingBox::new(south, west, south + 0.02, west + 0.02).expect("valid bbox");
    SpatialQuery::Viewport(bbox)
}

#[fixture]
fn executor() -> StubExecutor {
    StubExecutor::with_places(vec![
        place_at("way/1", 46.01, 14.51),
        place_at("node/2", 46.02, 14.52),
    ])
}

#[fixture]
fn cache() -> SpatialQueryCache {
    SpatialQueryCache::new(CacheConfig::default())
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn repeated_key_is_served_from_cache(executor: StubExecutor, cache: SpatialQueryCache) {
    let query = viewport(46.0, 14.5);
    let miss = cache.query(&query, &executor).await.expect("miss fetches");
    let hit = cache.query(&query, &executor).await.expect("hit");
    assert_eq!(miss, hit);
    assert_eq!(executor.calls(), 1);
    assert_eq!(cache.cached(&query.key()), Some(miss));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn near_identical_viewports_share_one_fetch(
    executor: StubExecutor,
    cache: SpatialQueryCache,
) {
    cache
        .query(&viewport(46.000_01, 14.500_01), &executor)
        .await
        .expect("first fetch");
    cache
        .query(&viewport(46.000_03, 14.499_99), &executor)
        .await
        .expect("second is a hit");
    assert_eq!(executor.calls(), 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn concurrent_callers_join_the_fetch_in_flight(cache: SpatialQueryCache) {
    let executor = executor().with_delay(Duration::from_secs(2));
    let query = viewport(46.0, 14.5);
    let (first, second) = tokio::join!(cache.query(&query, &executor), async {
        sleep(Duration::from_millis(500)).await;
        cache.query(&query, &executor).await
    });
    assert_eq!(first.expect("leader"), second.expect("follower"));
    assert_eq!(executor.calls(), 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn superseded_fetch_is_discarded(cache: SpatialQueryCache) {
    let first = viewport(46.0, 14.5);
    let second = viewport(46.1, 14.6);
    let executor = executor()
        .with_key_delay(first.key(), Duration::from_secs(5))
        .with_key_delay(second.key(), Duration::from_secs(1));

    let (old, new) = tokio::join!(cache.query(&first, &executor), async {
        sleep(Duration::from_secs(1)).await;
        cache.query(&second, &executor).await
    });
    assert_eq!(old, Err(QueryError::Cancelled));
    assert!(new.is_ok());

    sleep(Duration::from_secs(10)).await;
    assert!(cache.cached(&first.key()).is_none());
    assert_eq!(executor.completed_keys(), vec![second.key()]);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn slow_fetch_hits_the_deadline() {
    let cache = SpatialQueryCache::new(CacheConfig::default().with_deadline(Duration::from_secs(8)));
    let executor = executor().with_delay(Duration::from_secs(20));
    let query = viewport(46.0, 14.5);

    let started = Instant::now();
    let outcome = cache.query(&query, &executor).await;
    assert_eq!(
        outcome,
        Err(QueryError::Timeout {
            deadline: Duration::from_secs(8)
        })
    );
    assert_eq!(started.elapsed(), Duration::from_secs(8));
    assert!(cache.is_empty());
    assert!(cache.in_flight().is_none());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn failures_are_not_cached(cache: SpatialQueryCache) {
    let failing = StubExecutor::with_error(FetchError::Status {
        url: String::from("https://overpass.example/api/interpreter"),
        status: 504,
    });
    let query = viewport(46.0, 14.5);
    let outcome = cache.query(&query, &failing).await;
    assert!(matches!(outcome, Err(QueryError::Fetch(FetchError::Status { status: 504, .. }))));
    assert!(cache.is_empty());

    cache.query(&query, &executor()).await.expect("retry succeeds");
    assert_eq!(cache.len(), 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn least_recently_used_entry_is_evicted(executor: StubExecutor) {
    let cache = SpatialQueryCache::new(CacheConfig::default().with_capacity(2));
    let a = viewport(46.0, 14.0);
    let b = viewport(46.1, 14.0);
    let c = viewport(46.2, 14.0);
    cache.query(&a, &executor).await.expect("a");
    cache.query(&b, &executor).await.expect("b");
    cache.query(&a, &executor).await.expect("a again");
    cache.query(&c, &executor).await.expect("c");

    assert!(cache.cached(&a.key()).is_some());
    assert!(cache.cached(&b.key()).is_none());
    assert!(cache.cached(&c.key()).is_some());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn burst_of_moves_fetches_only_the_final_key(executor: StubExecutor) {
    let debouncer = QueryDebouncer::new(
        Arc::new(SpatialQueryCache::default()),
        Arc::new(executor.clone()),
        DebounceConfig::default(),
    );
    let queries: Vec<_> = (0..5_u32)
        .map(|step| viewport(46.0 + f64::from(step) * 0.01, 14.5))
        .collect();
    let requests = queries.iter().zip(0_u64..).map(|(query, step)| {
        let debouncer = &debouncer;
        async move {
            sleep(Duration::from_millis(100 * step)).await;
            debouncer
                .request(QueryIntent::new(*query, Trigger::MoveEnd))
                .await
        }
    });
    let outcomes = join_all(requests).await;

    let (last, earlier) = outcomes.split_last().expect("five outcomes");
    assert!(earlier.iter().all(|o| *o == Err(QueryError::Cancelled)));
    assert!(matches!(last, Ok(Some(_))));
    let final_key = queries.last().map(SpatialQuery::key).expect("final query");
    assert_eq!(executor.started_keys(), vec![final_key]);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn zoom_end_settles_faster_than_move_end(executor: StubExecutor) {
    let debouncer = QueryDebouncer::new(
        Arc::new(SpatialQueryCache::default()),
        Arc::new(executor),
        DebounceConfig::default(),
    );
    let started = Instant::now();
    debouncer
        .request(QueryIntent::new(viewport(46.0, 14.5), Trigger::ZoomEnd))
        .await
        .expect("zoom request");
    assert_eq!(started.elapsed(), DEFAULT_ZOOM_END_DELAY);

    let started = Instant::now();
    debouncer
        .request(QueryIntent::new(viewport(46.3, 14.5), Trigger::MoveEnd))
        .await
        .expect("move request");
    assert_eq!(started.elapsed(), DEFAULT_MOVE_END_DELAY);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn low_zoom_does_not_fetch(executor: StubExecutor) {
    let debouncer = QueryDebouncer::new(
        Arc::new(SpatialQueryCache::default()),
        Arc::new(executor.clone()),
        DebounceConfig::default(),
    );
    let intent = QueryIntent::new(viewport(46.0, 14.5), Trigger::Immediate).with_zoom(10.0);
    assert_eq!(debouncer.request(intent).await, Ok(None));
    assert_eq!(executor.calls(), 0);
}

mod properties {
    use proptest::prelude::*;

    use super::*;

    fn paused_runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .expect("runtime")
    }

    proptest! {
        #[test]
        fn viewports_sharing_a_key_fetch_once(
            south_steps in 4000_i32..4800,
            west_steps in 1300_i32..1600,
            jitter_a in -0.000_04_f64..0.000_04,
            jitter_b in -0.000_04_f64..0.000_04,
        ) {
            let south = f64::from(south_steps) / 100.0;
            let west = f64::from(west_steps) / 100.0;
            let first = viewport(south + jitter_a, west - jitter_b);
            let second = viewport(south + jitter_b, west + jitter_a);
            prop_assert_eq!(first.key(), second.key());

            let executor = StubExecutor::with_places(Vec::new());
            let cache = SpatialQueryCache::new(CacheConfig::default());
            paused_runtime().block_on(async {
                cache.query(&first, &executor).await.expect("first fetch");
                cache.query(&second, &executor).await.expect("second is a hit");
            });
            prop_assert_eq!(executor.calls(), 1);
        }
    }
}
