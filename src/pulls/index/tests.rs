//! Tests for the read-through pull request index.

#![expect(
    clippy::panic_in_result_fn,
    reason = "Test assertions are expected to panic on failure"
)]

use rstest::{fixture, rstest};

use super::PullRequestIndex;
use crate::error::PullmanError;
use crate::persistence::{MockPullRequestStore, PersistenceError, PullRequestStore};
use crate::pulls::PullRequest;
use crate::telemetry::{NoopTelemetrySink, TelemetryEvent};
use crate::test_support::{MemoryStore, RecordingSink, StubPullRequestGateway, pull_request};

type TestResult = Result<(), Box<dyn std::error::Error>>;

const SHA_101: &str = "1010101010101010101010101010101010101010";
const SHA_102: &str = "1020000000000000000000000000000000000000";

#[fixture]
fn gateway() -> StubPullRequestGateway {
    StubPullRequestGateway::new([
        pull_request(101, "Fix A", SHA_101),
        pull_request(102, "FIX B", SHA_102),
    ])
}

#[rstest]
#[tokio::test]
async fn cold_population_fetches_each_pull_request_once(
    gateway: StubPullRequestGateway,
) -> TestResult {
    let store = MemoryStore::default();
    let telemetry = RecordingSink::default();
    let mut index = PullRequestIndex::new(&gateway, &store, &telemetry, "alice");

    let first = index.all().await?;
    let second = index.all().await?;

    assert_eq!(first, second);
    assert_eq!(gateway.metadata_calls(), 2);
    assert_eq!(gateway.list_calls(), 1);
    assert_eq!(store.ids(), vec![101, 102]);
    assert_eq!(
        telemetry.take(),
        vec![TelemetryEvent::IndexPopulated {
            cached: 0,
            fetched: 2,
            failed: 0,
        }]
    );
    Ok(())
}

#[rstest]
#[tokio::test]
async fn warm_cache_serves_a_new_session_without_fetches(
    gateway: StubPullRequestGateway,
) -> TestResult {
    let store = MemoryStore::default();
    let telemetry = NoopTelemetrySink;
    PullRequestIndex::new(&gateway, &store, &telemetry, "alice")
        .all()
        .await?;

    let mut second_session = PullRequestIndex::new(&gateway, &store, &telemetry, "alice");
    let population = second_session.all().await?;

    assert_eq!(population.pull_requests.len(), 2);
    assert_eq!(gateway.metadata_calls(), 2);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn population_is_ordered_by_id(gateway: StubPullRequestGateway) -> TestResult {
    let store = MemoryStore::default();
    let telemetry = NoopTelemetrySink;
    let mut index = PullRequestIndex::new(&gateway, &store, &telemetry, "alice");

    let ids: Vec<u64> = index
        .all()
        .await?
        .pull_requests
        .iter()
        .map(|found| found.id)
        .collect();

    assert_eq!(ids, vec![101, 102]);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn cached_ids_never_cross_contaminate(gateway: StubPullRequestGateway) -> TestResult {
    let store = MemoryStore::default();
    let telemetry = NoopTelemetrySink;
    let mut index = PullRequestIndex::new(&gateway, &store, &telemetry, "alice");
    index.all().await?;

    for id in store.ids() {
        let found = index.by_id(id).await?.ok_or("cached id should resolve")?;
        assert_eq!(found.id, id);
    }
    Ok(())
}

#[rstest]
#[tokio::test]
async fn invalidate_all_forces_exactly_one_fetch(gateway: StubPullRequestGateway) -> TestResult {
    let store = MemoryStore::default();
    let telemetry = NoopTelemetrySink;
    let mut index = PullRequestIndex::new(&gateway, &store, &telemetry, "alice");
    index.all().await?;

    index.refresh();
    let found = index.by_id(101).await?;

    assert_eq!(found.map(|pull_request| pull_request.id), Some(101));
    assert_eq!(gateway.metadata_calls(), 3);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn by_id_uses_cache_without_listing(gateway: StubPullRequestGateway) -> TestResult {
    let store = MemoryStore::default();
    store.put(&pull_request(101, "Fix A", SHA_101))?;
    let telemetry = NoopTelemetrySink;
    let mut index = PullRequestIndex::new(&gateway, &store, &telemetry, "alice");

    let found = index.by_id(101).await?;

    assert!(found.is_some());
    assert_eq!(gateway.list_calls(), 0);
    assert_eq!(gateway.metadata_calls(), 0);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn by_id_ignores_pull_requests_that_are_not_open(
    gateway: StubPullRequestGateway,
) -> TestResult {
    let store = MemoryStore::default();
    let telemetry = NoopTelemetrySink;
    let mut index = PullRequestIndex::new(&gateway, &store, &telemetry, "alice");

    assert_eq!(index.by_id(999).await?, None);
    assert_eq!(gateway.metadata_calls(), 0);
    Ok(())
}

#[rstest]
#[case::full_hash(SHA_102, Some(102))]
#[case::prefix("1020000", Some(102))]
#[case::short_prefix("102", None)]
#[case::unknown("ffffffffffffffffffffffffffffffffffffffff", None)]
#[tokio::test]
async fn by_commit_checks_membership(
    gateway: StubPullRequestGateway,
    #[case] hash: &str,
    #[case] expected: Option<u64>,
) -> TestResult {
    let store = MemoryStore::default();
    let telemetry = NoopTelemetrySink;
    let mut index = PullRequestIndex::new(&gateway, &store, &telemetry, "alice");

    let found = index.by_commit(hash).await?;

    assert_eq!(found.map(|pull_request| pull_request.id), expected);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn by_commit_matches_any_commit_of_a_rewritten_stack() -> TestResult {
    let mut rewritten = pull_request(
        136,
        "Fix scheduler",
        "aaaa000000000000000000000000000000000000",
    );
    rewritten
        .commit_hashes
        .push("bbbb000000000000000000000000000000000000".to_owned());
    let gateway = StubPullRequestGateway::new([rewritten]);
    let store = MemoryStore::default();
    let telemetry = NoopTelemetrySink;
    let mut index = PullRequestIndex::new(&gateway, &store, &telemetry, "alice");

    let found = index
        .by_commit("bbbb000000000000000000000000000000000000")
        .await?;

    assert_eq!(found.map(|pull_request| pull_request.id), Some(136));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn search_is_case_insensitive_and_hydrates_only_matches() -> TestResult {
    let gateway = StubPullRequestGateway::new([
        pull_request(101, "Fix A", SHA_101),
        pull_request(102, "FIX B", SHA_102),
        pull_request(103, "Add docs", "1030000000000000000000000000000000000000"),
    ]);
    let store = MemoryStore::default();
    let telemetry = NoopTelemetrySink;
    let mut index = PullRequestIndex::new(&gateway, &store, &telemetry, "alice");

    let found: Vec<u64> = index
        .search("fix")
        .await?
        .iter()
        .map(|pull_request| pull_request.id)
        .collect();

    assert_eq!(found, vec![101, 102]);
    assert_eq!(gateway.metadata_calls(), 2);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn failed_fetch_degrades_without_touching_other_entries() -> TestResult {
    let gateway = StubPullRequestGateway::new([
        pull_request(101, "Fix A", SHA_101),
        pull_request(102, "FIX B", SHA_102),
    ])
    .failing_for(102);
    let store = MemoryStore::default();
    let telemetry = RecordingSink::default();
    let mut index = PullRequestIndex::new(&gateway, &store, &telemetry, "alice");

    let population = index.all().await?;

    assert!(population.is_degraded());
    assert_eq!(population.failed, vec![102]);
    assert_eq!(store.ids(), vec![101]);
    assert_eq!(index.failed(), vec![102]);
    assert_eq!(
        population.into_complete(),
        Err(PullmanError::Degraded { failed: vec![102] })
    );
    assert_eq!(
        telemetry.take(),
        vec![TelemetryEvent::IndexPopulated {
            cached: 0,
            fetched: 1,
            failed: 1,
        }]
    );
    Ok(())
}

#[rstest]
#[tokio::test]
async fn broken_store_degrades_to_remote_fetches(gateway: StubPullRequestGateway) -> TestResult {
    let store = MemoryStore::broken();
    let telemetry = NoopTelemetrySink;
    let mut index = PullRequestIndex::new(&gateway, &store, &telemetry, "alice");

    let population = index.all().await?;

    assert_eq!(population.pull_requests.len(), 2);
    assert!(!population.is_degraded());
    Ok(())
}

#[rstest]
#[tokio::test]
async fn authentication_failures_abort_population() -> TestResult {
    let gateway = StubPullRequestGateway::new([pull_request(101, "Fix A", SHA_101)])
        .failing_listing(PullmanError::Authentication {
            message: "Bad credentials".to_owned(),
        });
    let store = MemoryStore::default();
    let telemetry = NoopTelemetrySink;
    let mut index = PullRequestIndex::new(&gateway, &store, &telemetry, "alice");

    let result = index.all().await;

    assert!(matches!(result, Err(PullmanError::Authentication { .. })));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn refetch_supersedes_the_cached_snapshot() -> TestResult {
    let mut gateway = StubPullRequestGateway::new([pull_request(101, "Fix A", SHA_101)]);
    let store = MemoryStore::default();
    let telemetry = NoopTelemetrySink;
    PullRequestIndex::new(&gateway, &store, &telemetry, "alice")
        .all()
        .await?;

    let updated: PullRequest = pull_request(101, "Fix A (v2)", SHA_102);
    gateway.upsert(updated.clone());
    let mut index = PullRequestIndex::new(&gateway, &store, &telemetry, "alice");
    index.refresh();
    let population = index.all().await?;

    assert_eq!(population.pull_requests, vec![updated]);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn broken_cache_degrades_to_remote_fetches(gateway: StubPullRequestGateway) -> TestResult {
    let mut store = MockPullRequestStore::new();
    store.expect_get().times(2).returning(|_| {
        Err(PersistenceError::QueryFailed {
            message: "disk I/O error".to_owned(),
        })
    });
    store.expect_put().times(2).returning(|_| {
        Err(PersistenceError::WriteFailed {
            message: "database is locked".to_owned(),
        })
    });
    let telemetry = NoopTelemetrySink;
    let mut index = PullRequestIndex::new(&gateway, &store, &telemetry, "alice");

    let population = index.all().await?;

    let ids: Vec<u64> = population.pull_requests.iter().map(|pr| pr.id).collect();
    assert_eq!(ids, vec![101, 102]);
    assert!(!population.is_degraded());
    assert_eq!(gateway.metadata_calls(), 2);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn fresh_lookup_replaces_a_stale_cached_record() -> TestResult {
    let mut gateway = StubPullRequestGateway::new([PullRequest {
        ci_run_ids: vec![10],
        ..pull_request(101, "Fix A", SHA_101)
    }]);
    let store = MemoryStore::default();
    let telemetry = NoopTelemetrySink;
    PullRequestIndex::new(&gateway, &store, &telemetry, "alice")
        .all()
        .await?;

    let pushed = PullRequest {
        ci_run_ids: vec![10, 20],
        ..pull_request(101, "Fix A", SHA_102)
    };
    gateway.upsert(pushed.clone());
    let mut index = PullRequestIndex::new(&gateway, &store, &telemetry, "alice");

    let cached = index.by_id(101).await?;
    let fresh = index.by_id_fresh(101).await?;

    assert_eq!(cached.map(|found| found.ci_run_ids), Some(vec![10]));
    assert_eq!(fresh, Some(pushed.clone()));
    assert_eq!(index.by_id(101).await?, Some(pushed));
    assert_eq!(gateway.metadata_calls(), 2);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn fresh_lookup_reuses_a_record_fetched_this_session(
    gateway: StubPullRequestGateway,
) -> TestResult {
    let store = MemoryStore::default();
    let telemetry = NoopTelemetrySink;
    let mut index = PullRequestIndex::new(&gateway, &store, &telemetry, "alice");

    let first = index.by_id(101).await?;
    let fresh = index.by_id_fresh(101).await?;

    assert_eq!(first, fresh);
    assert_eq!(gateway.metadata_calls(), 1);
    Ok(())
}
