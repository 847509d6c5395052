//! Application configuration loaded from CLI, environment, and files.
//!
//! Values are merged with ortho-config's layered approach.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – built-in application defaults
//! 2. **Configuration file** – `.pullman.toml` in the current directory,
//!    home directory, or XDG config directory
//! 3. **Environment variables** – `PULLMAN_TOKEN`, `PULLMAN_USER`, ...
//! 4. **Command-line arguments** – `--token`, `--user`, ...
//!
//! # Configuration File
//!
//! ```toml
//! owner = "pytorch"
//! repo = "pytorch"
//! user = "alice"
//! remote = "upstream"
//! hud_url = "https://hud.pytorch.org"
//! workflows = "pull,trunk,inductor"
//! ```

use std::env;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::PullmanError;
use crate::github::{DEFAULT_WORKFLOWS, PersonalAccessToken, RepositoryLocator};
use crate::local::{GitHubRemote, Git2Repository};

/// Remote whose URL names the repository pull requests target.
pub const DEFAULT_REMOTE: &str = "upstream";
/// Remote whose owner is taken as the current user.
pub const USER_REMOTE: &str = "origin";
/// Default code-hosting base URL.
pub const DEFAULT_GITHUB_URL: &str = "https://github.com";
/// Default CI dashboard base URL.
pub const DEFAULT_HUD_URL: &str = "https://hud.pytorch.org";
/// Environment variables consulted for a token, in order, after `token`.
pub const TOKEN_ENV_VARS: [&str; 3] = ["PULL_MANAGER_GIT_TOKEN", "GIT_TOKEN", "GITHUB_TOKEN"];

const CACHE_DIR_NAME: &str = "pullman";
const CACHE_FILE_NAME: &str = "pullman.sqlite";

/// Application configuration supporting CLI, environment, and file sources.
///
/// # Example
///
/// ```no_run
/// use pullman::PullmanConfig;
/// use ortho_config::OrthoConfig;
///
/// let config = PullmanConfig::load().expect("failed to load configuration");
/// let token = config.resolve_token().expect("token required");
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "PULLMAN",
    discovery(
        dotfile_name = ".pullman.toml",
        config_file_name = "pullman.toml",
        app_name = "pullman"
    )
)]
pub struct PullmanConfig {
    /// Personal access token for GitHub API authentication.
    ///
    /// Falls back to `PULL_MANAGER_GIT_TOKEN`, `GIT_TOKEN`, then
    /// `GITHUB_TOKEN`.
    #[ortho_config(cli_short = 'T')]
    pub token: Option<String>,

    /// Repository owner; inferred from the tracking remote when unset.
    #[ortho_config(cli_short = 'n')]
    pub owner: Option<String>,

    /// Repository name; inferred from the tracking remote when unset.
    #[ortho_config(cli_short = 'R')]
    pub repo: Option<String>,

    /// GitHub login whose pull requests are listed; defaults to the owner of
    /// the `origin` remote.
    #[ortho_config(cli_short = 'u')]
    pub user: Option<String>,

    /// Remote tracking the upstream repository (default `upstream`).
    #[ortho_config(cli_short = 'm')]
    pub remote: Option<String>,

    /// Code-hosting base URL (default `https://github.com`).
    #[ortho_config(cli_short = 'g')]
    pub github_url: Option<String>,

    /// CI dashboard base URL (default `https://hud.pytorch.org`).
    #[ortho_config(cli_short = 'H')]
    pub hud_url: Option<String>,

    /// Comma-separated CI workflow names whose runs are tracked.
    #[ortho_config(cli_short = 'f')]
    pub workflows: Option<String>,

    /// Pull request cache file. Defaults to
    /// `$XDG_CACHE_HOME/pullman/pullman.sqlite`.
    #[ortho_config(cli_short = 'c')]
    pub cache_path: Option<String>,

    /// Neither read nor write the cache.
    #[ortho_config(cli_short = 'i')]
    pub ignore_cache: bool,

    /// Discard the cache and repopulate it from GitHub.
    #[ortho_config(cli_short = 'w')]
    pub rewrite_cache: bool,

    /// Debug logging and JSONL telemetry on stderr.
    #[ortho_config(cli_short = 'v')]
    pub verbose: bool,

    /// `list`: sort by title instead of number.
    #[ortho_config(cli_short = 's')]
    pub sort_by_title: bool,

    /// `list`: reverse the order.
    #[ortho_config(cli_short = 'r')]
    pub reverse: bool,

    /// `errors`: keep every environment variant of a failing test.
    #[ortho_config(cli_short = 'a')]
    pub all_env_combos: bool,

    /// `errors`: text inserted before the test commands.
    #[ortho_config(cli_short = 'b')]
    pub before: Option<String>,

    /// `errors`: script path (default `unit-test-failures.sh`).
    #[ortho_config(cli_short = 'o')]
    pub output: Option<String>,

    /// `errors`: print commands instead of writing a script.
    #[ortho_config(cli_short = 'O')]
    pub output_to_terminal: bool,

    /// `errors`: Python interpreter or bin directory added to `PATH`.
    #[ortho_config(cli_short = 'p')]
    pub python: Option<String>,

    /// `errors`: sort commands alphabetically.
    #[ortho_config(cli_short = 'S')]
    pub sort_errors: bool,

    /// `errors`: poll unfinished runs every N seconds; 0 disables.
    #[ortho_config(cli_short = 't')]
    pub wait_seconds: Option<u64>,
}

/// Long and short flags that consume the following argument as their value.
pub const VALUE_FLAGS: [&str; 27] = [
    "--token",
    "-T",
    "--owner",
    "-n",
    "--repo",
    "-R",
    "--user",
    "-u",
    "--remote",
    "-m",
    "--github-url",
    "-g",
    "--hud-url",
    "-H",
    "--workflows",
    "-f",
    "--cache-path",
    "-c",
    "--before",
    "-b",
    "--output",
    "-o",
    "--python",
    "-p",
    "--wait-seconds",
    "-t",
    "--config-path",
];

impl PullmanConfig {
    /// Resolves the token from configuration or the environment.
    ///
    /// # Errors
    ///
    /// Returns [`PullmanError::MissingToken`] when no source provides one.
    pub fn resolve_token(&self) -> Result<String, PullmanError> {
        self.resolve_token_with(|name| env::var(name).ok())
    }

    /// Resolves the token using `lookup` for environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`PullmanError::MissingToken`] when no source provides one.
    pub fn resolve_token_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<String, PullmanError> {
        self.token
            .clone()
            .into_iter()
            .chain(TOKEN_ENV_VARS.iter().filter_map(|name| lookup(name)))
            .find(|token| !token.trim().is_empty())
            .ok_or(PullmanError::MissingToken)
    }

    /// Resolves the token for GitHub requests; `None` means anonymous access.
    #[must_use]
    pub fn access_token(&self) -> Option<PersonalAccessToken> {
        self.access_token_with(|name| env::var(name).ok())
    }

    /// Resolves the optional token using `lookup` for environment variables.
    ///
    /// A missing token is logged as a warning: anonymous requests share a
    /// much lower GitHub rate limit.
    #[must_use]
    pub fn access_token_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Option<PersonalAccessToken> {
        let token = self
            .resolve_token_with(lookup)
            .ok()
            .and_then(|token| PersonalAccessToken::new(token).ok());
        if token.is_none() {
            warn!("no GitHub token configured; GitHub will rate-limit anonymous requests");
        }
        token
    }

    /// Returns the tracking remote name.
    #[must_use]
    pub fn remote(&self) -> &str {
        self.remote.as_deref().unwrap_or(DEFAULT_REMOTE)
    }

    /// Returns the code-hosting base URL.
    #[must_use]
    pub fn github_url(&self) -> &str {
        self.github_url.as_deref().unwrap_or(DEFAULT_GITHUB_URL)
    }

    /// Returns the CI dashboard base URL.
    #[must_use]
    pub fn hud_url(&self) -> &str {
        self.hud_url.as_deref().unwrap_or(DEFAULT_HUD_URL)
    }

    /// Returns the tracked workflow names.
    #[must_use]
    pub fn workflows(&self) -> Vec<String> {
        self.workflows.as_deref().map_or_else(
            || DEFAULT_WORKFLOWS.iter().map(|name| (*name).to_owned()).collect(),
            |list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_owned)
                    .collect()
            },
        )
    }

    /// Returns the configured cache file, or the per-user default.
    ///
    /// # Errors
    ///
    /// Returns [`PullmanError::Configuration`] when no cache location can be
    /// determined.
    pub fn cache_path(&self) -> Result<Utf8PathBuf, PullmanError> {
        resolve_cache_path(
            self.cache_path.as_deref(),
            env::var("XDG_CACHE_HOME").ok().as_deref(),
            env::var("HOME").ok().as_deref(),
        )
        .ok_or_else(|| PullmanError::Configuration {
            message: "no cache location: set --cache-path, XDG_CACHE_HOME or HOME".to_owned(),
        })
    }

    /// Builds the repository locator from configuration, falling back to the
    /// tracking remote of `local`.
    ///
    /// # Errors
    ///
    /// Returns [`PullmanError::Configuration`] when neither source names a
    /// repository.
    pub fn repository_locator(
        &self,
        local: Option<&Git2Repository>,
    ) -> Result<RepositoryLocator, PullmanError> {
        if let (Some(owner), Some(repo)) = (&self.owner, &self.repo) {
            return RepositoryLocator::new(self.github_url(), owner, repo);
        }
        let remote = self.inferred_remote(local, self.remote())?;
        RepositoryLocator::new(self.github_url(), &remote.owner, &remote.repository)
    }

    /// Returns the GitHub login whose pull requests are listed.
    ///
    /// # Errors
    ///
    /// Returns [`PullmanError::Configuration`] when `user` is unset and the
    /// `origin` remote cannot be read.
    pub fn resolve_user(&self, local: Option<&Git2Repository>) -> Result<String, PullmanError> {
        if let Some(user) = self.user.as_deref().filter(|user| !user.trim().is_empty()) {
            return Ok(user.to_owned());
        }
        Ok(self.inferred_remote(local, USER_REMOTE)?.owner)
    }

    fn inferred_remote(
        &self,
        local: Option<&Git2Repository>,
        name: &str,
    ) -> Result<GitHubRemote, PullmanError> {
        let repository = local.ok_or_else(|| PullmanError::Configuration {
            message: format!(
                "not inside a git checkout; set --owner, --repo and --user \
                 (remote '{name}' unavailable)"
            ),
        })?;
        repository
            .github_remote(name)
            .map_err(|error| PullmanError::Configuration {
                message: error.to_string(),
            })
    }
}

/// Resolves the cache file location.
///
/// `configured` wins; otherwise `<xdg_cache_home>/pullman/pullman.sqlite`,
/// then `<home>/.cache/pullman/pullman.sqlite`. Blank values are ignored.
#[must_use]
pub fn resolve_cache_path(
    configured: Option<&str>,
    xdg_cache_home: Option<&str>,
    home: Option<&str>,
) -> Option<Utf8PathBuf> {
    let non_blank = |value: &&str| !value.trim().is_empty();
    if let Some(path) = configured.filter(non_blank) {
        return Some(Utf8PathBuf::from(path));
    }
    xdg_cache_home
        .filter(non_blank)
        .map(Utf8PathBuf::from)
        .or_else(|| home.filter(non_blank).map(|dir| Utf8PathBuf::from(dir).join(".cache")))
        .map(|base| base.join(CACHE_DIR_NAME).join(CACHE_FILE_NAME))
}

#[cfg(test)]
mod tests;
