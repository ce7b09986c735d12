//! Behavioural tests for `SpatialQueryCache` and `QueryDebouncer`.
//!
//! Time is paused, so multi-second delays run instantly.

use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use lumigram_core::test_support::place_at;
use lumigram_core::{BoundingBox, SpatialQuery};
use lumigram_data::test_support::StubExecutor;
use lumigram_data::{
    CacheConfig, CacheEntry, DebounceConfig, QueryDebouncer, QueryError, QueryIntent,
    SpatialQueryCache, Trigger,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tokio::runtime::Runtime;
use tokio::time::{Instant, sleep};

struct CacheWorld {
    runtime: Runtime,
    executor: StubExecutor,
    cache: Arc<SpatialQueryCache>,
    outcomes: Vec<Result<CacheEntry, QueryError>>,
    elapsed: Duration,
    last_viewport: Option<SpatialQuery>,
}

#[fixture]
fn world() -> RefCell<CacheWorld> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("test runtime");
    RefCell::new(CacheWorld {
        runtime,
        executor: StubExecutor::with_places(Vec::new()),
        cache: Arc::new(SpatialQueryCache::new(CacheConfig::default())),
        outcomes: Vec::new(),
        elapsed: Duration::ZERO,
        last_viewport: None,
    })
}

fn viewport(south: f64, west: f64) -> SpatialQuery {
    let bbox = BoundingBox::new(south, west, south + 0.02, west + 0.02).expect("valid bbox");
    SpatialQuery::Viewport(bbox)
}

fn places(count: usize) -> Vec<lumigram_core::PlaceOfWorship> {
    (0..count)
        .map(|i| {
            let offset = f64::from(u32::try_from(i).expect("small count")) * 0.001;
            place_at(&format!("node/{i}"), 46.0 + offset, 14.5 + offset)
        })
        .collect()
}

#[given("an executor returning {count} places")]
fn executor_returning(#[from(world)] world: &RefCell<CacheWorld>, count: usize) {
    world.borrow_mut().executor = StubExecutor::with_places(places(count));
}

#[given("an executor returning {count} places after {delay} seconds")]
fn slow_executor(#[from(world)] world: &RefCell<CacheWorld>, count: usize, delay: u64) {
    world.borrow_mut().executor =
        StubExecutor::with_places(places(count)).with_delay(Duration::from_secs(delay));
}

#[when("the viewport at {south}, {west} is queried twice")]
fn query_twice(#[from(world)] world: &RefCell<CacheWorld>, south: f64, west: f64) {
    let mut world = world.borrow_mut();
    let query = viewport(south, west);
    let outcomes = world.runtime.block_on(async {
        let first = world.cache.query(&query, &world.executor).await;
        let second = world.cache.query(&query, &world.executor).await;
        vec![first, second]
    });
    world.outcomes = outcomes;
}

#[when("the viewport at {south}, {west} is queried")]
fn query_once(#[from(world)] world: &RefCell<CacheWorld>, south: f64, west: f64) {
    let mut world = world.borrow_mut();
    let query = viewport(south, west);
    let (outcome, elapsed) = world.runtime.block_on(async {
        let started = Instant::now();
        let outcome = world.cache.query(&query, &world.executor).await;
        (outcome, started.elapsed())
    });
    world.outcomes = vec![outcome];
    world.elapsed = elapsed;
}

#[when(
    "the viewport at {south}, {west} is queried and the viewport at {later_south}, {later_west} one second later"
)]
fn query_superseded(
    #[from(world)] world: &RefCell<CacheWorld>,
    south: f64,
    west: f64,
    later_south: f64,
    later_west: f64,
) {
    let mut world = world.borrow_mut();
    let first = viewport(south, west);
    let second = viewport(later_south, later_west);
    let (old, new) = world.runtime.block_on(async {
        tokio::join!(world.cache.query(&first, &world.executor), async {
            sleep(Duration::from_secs(1)).await;
            world.cache.query(&second, &world.executor).await
        })
    });
    world.outcomes = vec![old, new];
}

#[when("{moves} map moves end {gap} milliseconds apart")]
fn burst_of_moves(#[from(world)] world: &RefCell<CacheWorld>, moves: u32, gap: u64) {
    let mut world = world.borrow_mut();
    let debouncer = QueryDebouncer::new(
        Arc::clone(&world.cache),
        Arc::new(world.executor.clone()),
        DebounceConfig::default(),
    );
    let queries: Vec<_> = (0..moves)
        .map(|step| viewport(46.0 + f64::from(step) * 0.05, 14.5))
        .collect();
    let outcomes = world.runtime.block_on(async {
        let requests = queries.iter().zip(0_u64..).map(|(query, step)| {
            let debouncer = &debouncer;
            async move {
                sleep(Duration::from_millis(gap * step)).await;
                debouncer
                    .request(QueryIntent::new(*query, Trigger::MoveEnd))
                    .await
            }
        });
        join_all(requests).await
    });
    world.outcomes = outcomes
        .into_iter()
        .filter_map(|outcome| outcome.transpose())
        .collect();
    world.last_viewport = queries.last().copied();
}

#[then("the executor was called {count} time")]
fn executor_calls(#[from(world)] world: &RefCell<CacheWorld>, count: usize) {
    assert_eq!(world.borrow().executor.calls(), count);
}

#[then("the last query returned {count} places")]
fn last_returned(#[from(world)] world: &RefCell<CacheWorld>, count: usize) {
    let world = world.borrow();
    let entry = world
        .outcomes
        .last()
        .expect("a query ran")
        .as_ref()
        .expect("query succeeded");
    assert_eq!(entry.items.len(), count);
}

#[then("the first query was cancelled")]
fn first_cancelled(#[from(world)] world: &RefCell<CacheWorld>) {
    let world = world.borrow();
    assert_eq!(world.outcomes.first(), Some(&Err(QueryError::Cancelled)));
}

#[then("only the viewport at {south}, {west} is cached")]
fn only_cached(#[from(world)] world: &RefCell<CacheWorld>, south: f64, west: f64) {
    let world = world.borrow();
    assert_eq!(world.cache.len(), 1);
    assert!(world.cache.cached(&viewport(south, west).key()).is_some());
}

#[then("the query timed out after {seconds} seconds")]
fn timed_out(#[from(world)] world: &RefCell<CacheWorld>, seconds: u64) {
    let world = world.borrow();
    let deadline = Duration::from_secs(seconds);
    assert_eq!(world.outcomes, vec![Err(QueryError::Timeout { deadline })]);
    assert_eq!(world.elapsed, deadline);
}

#[then("nothing is cached")]
fn nothing_cached(#[from(world)] world: &RefCell<CacheWorld>) {
    assert!(world.borrow().cache.is_empty());
}

#[then("the fetched viewport is the last one")]
fn fetched_last(#[from(world)] world: &RefCell<CacheWorld>) {
    let world = world.borrow();
    let last = world.last_viewport.expect("moves ran");
    assert_eq!(world.executor.started_keys(), vec![last.key()]);
    assert!(world.outcomes.iter().any(Result::is_ok));
}

#[scenario(path = "tests/features/spatial_cache.feature", index = 0)]
fn repeated_viewport(world: RefCell<CacheWorld>) {
    let _ = world;
}

#[scenario(path = "tests/features/spatial_cache.feature", index = 1)]
fn supersession(world: RefCell<CacheWorld>) {
    let _ = world;
}

#[scenario(path = "tests/features/spatial_cache.feature", index = 2)]
fn deadline(world: RefCell<CacheWorld>) {
    let _ = world;
}

#[scenario(path = "tests/features/spatial_cache.feature", index = 3)]
fn debounced_burst(world: RefCell<CacheWorld>) {
    let _ = world;
}
