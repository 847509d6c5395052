//! Behavioural tests for the on-disk pull request cache.

mod support {
    #[path = "../support/mod.rs"]
    mod common;

    pub use common::{cache_path, create_temp_dir, unquote};
    #[path = "../support/runtime.rs"]
    pub mod runtime;
}

use std::rc::Rc;

use pullman::persistence::{PullRequestStore, SqlitePullRequestStore};
use pullman::telemetry::TelemetryEvent;
use pullman::test_support::{RecordingSink, StubPullRequestGateway, pull_request};
use pullman::{PullRequest, PullRequestIndex};
use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::{ScenarioState, given, scenario, then, when};
use tempfile::TempDir;

use support::runtime::{SharedRuntime, ensure_runtime};
use support::{cache_path, create_temp_dir, unquote};

const REPOSITORY: &str = "pytorch/pytorch";

#[derive(ScenarioState, Default)]
struct CacheState {
    runtime: Slot<SharedRuntime>,
    temp_dir: Slot<Rc<TempDir>>,
    pull_requests: Slot<Vec<PullRequest>>,
    failing: Slot<Vec<u64>>,
    gateway: Slot<Rc<StubPullRequestGateway>>,
    population: Slot<TelemetryEvent>,
}

#[fixture]
fn cache_state() -> CacheState {
    CacheState::default()
}

#[given("a temporary cache file")]
fn temporary_cache(cache_state: &CacheState) {
    cache_state.temp_dir.set(Rc::new(create_temp_dir()));
}

#[given("an open pull request {id:u64} titled {title}")]
fn open_pull_request(cache_state: &CacheState, id: u64, title: String) {
    let mut pull_requests = cache_state.pull_requests.take().unwrap_or_default();
    pull_requests.push(pull_request(id, &unquote(&title), &format!("{id}0000aaa")));
    cache_state.pull_requests.set(pull_requests);
}

#[given("pull request {id:u64} cannot be loaded")]
fn unloadable_pull_request(cache_state: &CacheState, id: u64) {
    let mut failing = cache_state.failing.take().unwrap_or_default();
    failing.push(id);
    cache_state.failing.set(failing);
}

#[when("the index is populated in a new session")]
fn populate(cache_state: &CacheState) {
    run_session(cache_state, false);
}

#[when("the cache is rewritten in a new session")]
fn rewrite(cache_state: &CacheState) {
    run_session(cache_state, true);
}

fn gateway(cache_state: &CacheState) -> Rc<StubPullRequestGateway> {
    if let Some(existing) = cache_state.gateway.get() {
        return existing;
    }
    let built = cache_state
        .failing
        .get()
        .unwrap_or_default()
        .into_iter()
        .fold(
            StubPullRequestGateway::new(cache_state.pull_requests.get().unwrap_or_default()),
            StubPullRequestGateway::failing_for,
        );
    let shared = Rc::new(built);
    cache_state.gateway.set(Rc::clone(&shared));
    shared
}

fn open_store(cache_state: &CacheState, telemetry: &RecordingSink) -> SqlitePullRequestStore {
    let temp_dir = cache_state
        .temp_dir
        .get()
        .unwrap_or_else(|| panic!("temporary cache not initialised"));
    SqlitePullRequestStore::open(&cache_path(&temp_dir), REPOSITORY, telemetry)
        .unwrap_or_else(|error| panic!("cache should open: {error}"))
}

fn run_session(cache_state: &CacheState, rewrite_cache: bool) {
    let runtime = ensure_runtime(&cache_state.runtime)
        .unwrap_or_else(|error| panic!("failed to create runtime: {error}"));
    let gateway = gateway(cache_state);
    let telemetry = RecordingSink::default();
    let store = open_store(cache_state, &telemetry);

    runtime
        .block_on(async {
            let mut index = PullRequestIndex::new(gateway.as_ref(), &store, &telemetry, "alice");
            if rewrite_cache {
                index.refresh();
            }
            index.all().await
        })
        .unwrap_or_else(|error| panic!("population should succeed: {error}"));

    let population = telemetry
        .take()
        .into_iter()
        .rfind(|event| matches!(event, TelemetryEvent::IndexPopulated { .. }))
        .unwrap_or_else(|| panic!("population was not recorded"));
    cache_state.population.set(population);
}

#[then("GitHub served {count:usize} pull request records in total")]
fn assert_fetch_count(cache_state: &CacheState, count: usize) {
    let gateway = cache_state
        .gateway
        .get()
        .unwrap_or_else(|| panic!("no session has run"));
    assert_eq!(gateway.metadata_calls(), count, "unexpected GitHub fetches");
}

#[then("the last population took {cached:u64} from the cache and fetched {fetched:u64}")]
fn assert_population_sources(cache_state: &CacheState, cached: u64, fetched: u64) {
    match cache_state.population.get() {
        Some(TelemetryEvent::IndexPopulated {
            cached: actual_cached,
            fetched: actual_fetched,
            ..
        }) => {
            assert_eq!((actual_cached, actual_fetched), (cached, fetched));
        }
        other => panic!("expected a population event, got {other:?}"),
    }
}

#[then("the last population reported {failed:u64} failure")]
fn assert_population_failures(cache_state: &CacheState, failed: u64) {
    match cache_state.population.get() {
        Some(TelemetryEvent::IndexPopulated {
            failed: actual_failed,
            ..
        }) => assert_eq!(actual_failed, failed),
        other => panic!("expected a population event, got {other:?}"),
    }
}

#[then("pull request {id:u64} is cached")]
fn assert_cached(cache_state: &CacheState, id: u64) {
    assert!(cached(cache_state, id), "pull request {id} should be cached");
}

#[then("pull request {id:u64} is not cached")]
fn assert_not_cached(cache_state: &CacheState, id: u64) {
    assert!(!cached(cache_state, id), "pull request {id} should not be cached");
}

fn cached(cache_state: &CacheState, id: u64) -> bool {
    let telemetry = RecordingSink::default();
    open_store(cache_state, &telemetry)
        .get(id)
        .unwrap_or_else(|error| panic!("cache read should succeed: {error}"))
        .is_some()
}

#[scenario(path = "tests/features/pull_request_cache.feature", index = 0)]
fn second_session_uses_cache(cache_state: CacheState) {
    let _ = cache_state;
}

#[scenario(path = "tests/features/pull_request_cache.feature", index = 1)]
fn rewrite_refetches(cache_state: CacheState) {
    let _ = cache_state;
}

#[scenario(path = "tests/features/pull_request_cache.feature", index = 2)]
fn failed_load_is_not_cached(cache_state: CacheState) {
    let _ = cache_state;
}
