//! Unit tests for configuration loading and precedence.

#![expect(
    clippy::panic_in_result_fn,
    reason = "Test assertions are expected to panic on failure"
)]

use std::collections::HashMap;

use camino::Utf8PathBuf;
use git2::Repository;
use ortho_config::{MergeComposer, OrthoConfig};
use rstest::rstest;
use serde_json::json;
use tempfile::TempDir;

use super::{PullmanConfig, resolve_cache_path};
use crate::error::PullmanError;
use crate::local::Git2Repository;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[rstest]
fn later_layers_override_earlier_ones() -> TestResult {
    let mut composer = MergeComposer::new();
    composer.push_defaults(json!({"user": "default-user", "hud_url": "https://hud.example"}));
    composer.push_file(json!({"user": "file-user", "remote": "fork"}), None);
    composer.push_environment(json!({"user": "env-user"}));
    composer.push_cli(json!({"user": "cli-user"}));

    let config = PullmanConfig::merge_from_layers(composer.layers())?;

    assert_eq!(config.user.as_deref(), Some("cli-user"));
    assert_eq!(config.remote(), "fork");
    assert_eq!(config.hud_url(), "https://hud.example");
    Ok(())
}

#[rstest]
fn defaults_apply_when_unset() {
    let config = PullmanConfig::default();

    assert_eq!(config.remote(), "upstream");
    assert_eq!(config.github_url(), "https://github.com");
    assert_eq!(config.hud_url(), "https://hud.pytorch.org");
    assert_eq!(config.workflows(), vec!["pull", "trunk", "inductor"]);
}

#[rstest]
fn workflows_are_split_on_commas() {
    let config = PullmanConfig {
        workflows: Some(" pull, ,trunk ".to_owned()),
        ..PullmanConfig::default()
    };

    assert_eq!(config.workflows(), vec!["pull", "trunk"]);
}

#[rstest]
#[case::configured_token(Some("cli"), &[("GITHUB_TOKEN", "gh")], Some("cli"))]
#[case::pull_manager_first(
    None,
    &[("GIT_TOKEN", "git"), ("PULL_MANAGER_GIT_TOKEN", "pm"), ("GITHUB_TOKEN", "gh")],
    Some("pm")
)]
#[case::github_last(None, &[("GITHUB_TOKEN", "gh")], Some("gh"))]
#[case::blank_skipped(Some("  "), &[("GIT_TOKEN", "git")], Some("git"))]
#[case::missing(None, &[], None)]
fn token_sources_are_consulted_in_order(
    #[case] configured: Option<&str>,
    #[case] environment: &[(&str, &str)],
    #[case] expected: Option<&str>,
) {
    let config = PullmanConfig {
        token: configured.map(str::to_owned),
        ..PullmanConfig::default()
    };
    let variables: HashMap<&str, &str> = environment.iter().copied().collect();

    let result = config.resolve_token_with(|name| variables.get(name).map(|v| (*v).to_owned()));

    match expected {
        Some(token) => assert_eq!(result, Ok(token.to_owned())),
        None => assert_eq!(result, Err(PullmanError::MissingToken)),
    }
}

#[rstest]
#[case::configured(Some("cli"), true)]
#[case::blank(Some("   "), false)]
#[case::missing(None, false)]
fn missing_token_means_anonymous_access(#[case] configured: Option<&str>, #[case] present: bool) {
    let config = PullmanConfig {
        token: configured.map(str::to_owned),
        ..PullmanConfig::default()
    };

    let token = config.access_token_with(|_name| None);

    assert_eq!(token.is_some(), present);
}

#[rstest]
fn documented_short_flags_parse() -> TestResult {
    let _guard = env_lock::lock_env([
        ("PULLMAN_REWRITE_CACHE", None::<&str>),
        ("PULLMAN_REVERSE", None),
        ("PULLMAN_REPO", None),
        ("PULLMAN_REMOTE", None),
        ("PULLMAN_WORKFLOWS", None),
    ]);

    let config = PullmanConfig::load_from_iter([
        "pullman", "-w", "-r", "-R", "vision", "-m", "fork", "-f", "pull",
    ])?;

    assert!(config.rewrite_cache);
    assert!(config.reverse);
    assert_eq!(config.repo.as_deref(), Some("vision"));
    assert_eq!(config.remote(), "fork");
    assert_eq!(config.workflows(), vec!["pull"]);
    Ok(())
}

#[rstest]
fn token_is_read_from_the_process_environment() {
    let _guard = env_lock::lock_env([
        ("PULL_MANAGER_GIT_TOKEN", None::<&str>),
        ("GIT_TOKEN", Some("from-env")),
        ("GITHUB_TOKEN", None),
    ]);

    assert_eq!(
        PullmanConfig::default().resolve_token(),
        Ok("from-env".to_owned())
    );
}

#[rstest]
#[case::configured(Some("/tmp/c.sqlite"), Some("/xdg"), Some("/home/a"), Some("/tmp/c.sqlite"))]
#[case::xdg(None, Some("/xdg"), Some("/home/a"), Some("/xdg/pullman/pullman.sqlite"))]
#[case::home(None, None, Some("/home/a"), Some("/home/a/.cache/pullman/pullman.sqlite"))]
#[case::blank_xdg(None, Some(""), Some("/home/a"), Some("/home/a/.cache/pullman/pullman.sqlite"))]
#[case::nothing(None, None, None, None)]
fn cache_path_resolution(
    #[case] configured: Option<&str>,
    #[case] xdg: Option<&str>,
    #[case] home: Option<&str>,
    #[case] expected: Option<&str>,
) {
    assert_eq!(
        resolve_cache_path(configured, xdg, home),
        expected.map(Utf8PathBuf::from)
    );
}

#[rstest]
fn repository_and_user_are_inferred_from_remotes() -> TestResult {
    let temp_dir = TempDir::new()?;
    let repo = Repository::init(temp_dir.path())?;
    repo.remote("upstream", "https://github.com/pytorch/pytorch.git")?;
    repo.remote("origin", "git@github.com:alice/pytorch.git")?;
    let local = Git2Repository::from_repository(repo);
    let config = PullmanConfig::default();

    let locator = config.repository_locator(Some(&local))?;

    assert_eq!(locator.slug(), "pytorch/pytorch");
    assert_eq!(config.resolve_user(Some(&local))?, "alice");
    Ok(())
}

#[rstest]
fn explicit_repository_needs_no_checkout() -> TestResult {
    let config = PullmanConfig {
        owner: Some("pytorch".to_owned()),
        repo: Some("vision".to_owned()),
        user: Some("bob".to_owned()),
        ..PullmanConfig::default()
    };

    assert_eq!(config.repository_locator(None)?.slug(), "pytorch/vision");
    assert_eq!(config.resolve_user(None)?, "bob");
    Ok(())
}

#[rstest]
fn missing_remote_is_a_configuration_error() -> TestResult {
    let temp_dir = TempDir::new()?;
    let local = Git2Repository::from_repository(Repository::init(temp_dir.path())?);

    let result = PullmanConfig::default().repository_locator(Some(&local));

    assert!(matches!(result, Err(PullmanError::Configuration { .. })));
    Ok(())
}
