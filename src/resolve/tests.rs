//! Tests for token resolution.

#![expect(
    clippy::panic_in_result_fn,
    reason = "Test assertions are expected to panic on failure"
)]

use rstest::{fixture, rstest};

use super::Resolver;
use crate::error::{MatchSummary, PullmanError};
use crate::local::{CommitSha, EmbeddedReference, MockLocalRepository};
use crate::pulls::PullRequestIndex;
use crate::telemetry::NoopTelemetrySink;
use crate::test_support::{MemoryStore, StubLocalRepository, StubPullRequestGateway, pull_request};

type TestResult = Result<(), Box<dyn std::error::Error>>;

const SHA_101: &str = "1010101010101010101010101010101010101010";
const SHA_102: &str = "1020000000000000000000000000000000000000";
const SHA_136: &str = "1360000000000000000000000000000000000000";
const LOCAL_HEAD: &str = "ffff000000000000000000000000000000000000";

#[fixture]
fn gateway() -> StubPullRequestGateway {
    StubPullRequestGateway::new([
        pull_request(101, "Add tests A", SHA_101),
        pull_request(102, "Add tests B", SHA_102),
        pull_request(136, "[inductor] Fix scheduler", SHA_136),
    ])
}

async fn resolve_with(
    gateway: &StubPullRequestGateway,
    local: &StubLocalRepository,
    token: &str,
) -> Result<u64, PullmanError> {
    let store = MemoryStore::default();
    let telemetry = NoopTelemetrySink;
    let mut index = PullRequestIndex::new(gateway, &store, &telemetry, "alice");
    let mut resolver = Resolver::new(&mut index, local);
    resolver.resolve(token).await.map(|found| found.id)
}

#[rstest]
#[tokio::test]
async fn empty_token_resolves_from_head_trailer(gateway: StubPullRequestGateway) -> TestResult {
    let local = StubLocalRepository::default()
        .with_head(LOCAL_HEAD)
        .with_reference(LOCAL_HEAD, EmbeddedReference::PullRequest(136));

    assert_eq!(resolve_with(&gateway, &local, "").await?, 136);
    assert_eq!(gateway.metadata_calls(), 1);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn empty_token_resolves_from_head_hash(gateway: StubPullRequestGateway) -> TestResult {
    let local = StubLocalRepository::default().with_head(SHA_102);

    assert_eq!(resolve_with(&gateway, &local, "").await?, 102);
    Ok(())
}

#[rstest]
#[case::bare("136")]
#[case::hash("#136")]
#[tokio::test]
async fn numeric_tokens_resolve_by_id(
    gateway: StubPullRequestGateway,
    #[case] token: &str,
) -> TestResult {
    let local = StubLocalRepository::default();

    assert_eq!(resolve_with(&gateway, &local, token).await?, 136);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn revisions_resolve_through_git(gateway: StubPullRequestGateway) -> TestResult {
    let local = StubLocalRepository::default().with_revision("HEAD~1", SHA_101);

    assert_eq!(resolve_with(&gateway, &local, "HEAD~1").await?, 101);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn rewritten_local_commit_falls_back_to_its_trailer(
    gateway: StubPullRequestGateway,
) -> TestResult {
    let local = StubLocalRepository::default()
        .with_revision("my-branch", LOCAL_HEAD)
        .with_reference(LOCAL_HEAD, EmbeddedReference::PullRequest(102));

    assert_eq!(resolve_with(&gateway, &local, "my-branch").await?, 102);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn amended_commit_resolves_through_its_source_commit(
    gateway: StubPullRequestGateway,
) -> TestResult {
    let local = StubLocalRepository::default()
        .with_head(LOCAL_HEAD)
        .with_reference(LOCAL_HEAD, EmbeddedReference::Commit(CommitSha::from(SHA_136)));

    assert_eq!(resolve_with(&gateway, &local, "").await?, 136);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn unknown_short_sha_is_matched_against_the_index(
    gateway: StubPullRequestGateway,
) -> TestResult {
    let local = StubLocalRepository::default();

    assert_eq!(resolve_with(&gateway, &local, "1360000").await?, 136);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn single_search_match_resolves(gateway: StubPullRequestGateway) -> TestResult {
    let local = StubLocalRepository::default();

    assert_eq!(resolve_with(&gateway, &local, "scheduler").await?, 136);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn multiple_search_matches_are_ambiguous(gateway: StubPullRequestGateway) {
    let local = StubLocalRepository::default();

    let result = resolve_with(&gateway, &local, "Add tests").await;

    assert_eq!(
        result,
        Err(PullmanError::Ambiguous {
            token: "Add tests".to_owned(),
            matches: vec![
                MatchSummary {
                    id: 101,
                    title: "Add tests A".to_owned(),
                },
                MatchSummary {
                    id: 102,
                    title: "Add tests B".to_owned(),
                },
            ],
        })
    );
}

#[rstest]
#[tokio::test]
async fn unmatched_token_is_not_found(gateway: StubPullRequestGateway) {
    let local = StubLocalRepository::default();

    let result = resolve_with(&gateway, &local, "nonexistent-zzz").await;

    assert_eq!(
        result,
        Err(PullmanError::NotFound {
            token: "nonexistent-zzz".to_owned(),
            strategies: vec![
                "commit 'nonexistent-zzz'".to_owned(),
                "title search for 'nonexistent-zzz'".to_owned(),
            ],
        })
    );
}

#[rstest]
#[tokio::test]
async fn numeric_miss_falls_through_to_search() -> TestResult {
    let gateway = StubPullRequestGateway::new([pull_request(7, "Bump to 2024 toolchain", SHA_101)]);
    let local = StubLocalRepository::default();

    assert_eq!(resolve_with(&gateway, &local, "2024").await?, 7);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn forced_search_skips_revision_lookup(gateway: StubPullRequestGateway) -> TestResult {
    let local = StubLocalRepository::default().with_revision("inductor", SHA_101);

    assert_eq!(resolve_with(&gateway, &local, "inductor").await?, 101);
    assert_eq!(resolve_with(&gateway, &local, ":/inductor").await?, 136);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn misses_with_failed_loads_report_degraded() {
    let gateway = StubPullRequestGateway::new([
        pull_request(101, "Add tests A", SHA_101),
        pull_request(102, "Add tests B", SHA_102),
    ])
    .failing_for(102);
    let local = StubLocalRepository::default();

    let result = resolve_with(&gateway, &local, "1020000").await;

    assert_eq!(result, Err(PullmanError::Degraded { failed: vec![102] }));
}

#[rstest]
#[tokio::test]
async fn search_match_that_fails_to_load_still_counts_as_ambiguous() {
    let gateway = StubPullRequestGateway::new([
        pull_request(101, "Add tests A", SHA_101),
        pull_request(102, "Add tests B", SHA_102),
    ])
    .failing_for(102);
    let local = StubLocalRepository::default();

    let result = resolve_with(&gateway, &local, "Add tests").await;

    assert!(
        matches!(&result, Err(PullmanError::Ambiguous { matches, .. }) if matches.len() == 2),
        "expected an ambiguous result, got {result:?}"
    );
    assert_eq!(gateway.metadata_calls(), 0);
}

#[rstest]
#[tokio::test]
async fn single_search_match_that_fails_to_load_is_degraded() {
    let gateway = StubPullRequestGateway::new([
        pull_request(101, "Add tests A", SHA_101),
        pull_request(102, "Add tests B", SHA_102),
    ])
    .failing_for(102);
    let local = StubLocalRepository::default();

    let result = resolve_with(&gateway, &local, "tests B").await;

    assert_eq!(result, Err(PullmanError::Degraded { failed: vec![102] }));
}

#[rstest]
#[tokio::test]
async fn resolution_is_deterministic(gateway: StubPullRequestGateway) -> TestResult {
    let local = StubLocalRepository::default();

    let first = resolve_with(&gateway, &local, "Fix").await?;
    let second = resolve_with(&gateway, &local, "Fix").await?;

    assert_eq!(first, second);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn head_errors_surface_as_local_repository_errors(gateway: StubPullRequestGateway) {
    let mut local = MockLocalRepository::new();
    local
        .expect_current_head_commit()
        .returning(|| Err(crate::local::LocalRepositoryError::NotARepository));
    let store = MemoryStore::default();
    let telemetry = NoopTelemetrySink;
    let mut index = PullRequestIndex::new(&gateway, &store, &telemetry, "alice");

    let result = Resolver::new(&mut index, &local).resolve("").await;

    assert!(matches!(result, Err(PullmanError::LocalRepository { .. })));
}
