//! Repository identity wrappers and API path construction.

use url::Url;

use crate::error::PullmanError;

/// Repository owner wrapper to avoid stringly typed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryOwner(String);

impl RepositoryOwner {
    /// Validates that the owner is non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`PullmanError::Configuration`] when `value` is blank.
    pub fn new(value: &str) -> Result<Self, PullmanError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(PullmanError::Configuration {
                message: "repository owner must not be empty".to_owned(),
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the owner value.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Repository name wrapper to prevent parameter mix-ups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryName(String);

impl RepositoryName {
    /// Validates that the name is non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`PullmanError::Configuration`] when `value` is blank.
    pub fn new(value: &str) -> Result<Self, PullmanError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(PullmanError::Configuration {
                message: "repository name must not be empty".to_owned(),
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the repository name.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Personal access token wrapper enforcing presence.
#[derive(Clone, PartialEq, Eq)]
pub struct PersonalAccessToken(String);

impl PersonalAccessToken {
    /// Validates that the token is non-empty and trims whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`PullmanError::MissingToken`] when the supplied string is
    /// blank.
    pub fn new(token: impl AsRef<str>) -> Result<Self, PullmanError> {
        let trimmed = token.as_ref().trim();
        if trimmed.is_empty() {
            return Err(PullmanError::MissingToken);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the token value.
    #[must_use]
    pub const fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Debug for PersonalAccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PersonalAccessToken(***)")
    }
}

impl AsRef<str> for PersonalAccessToken {
    fn as_ref(&self) -> &str {
        self.value()
    }
}

/// Derives the GitHub API base URL from a web host URL.
///
/// `github.com` maps to `api.github.com`; any other host is treated as a
/// GitHub Enterprise install serving the API under `/api/v3`.
fn derive_api_base(web_base: &Url) -> Result<Url, PullmanError> {
    let host = web_base
        .host_str()
        .ok_or_else(|| invalid_url("URL must include a host"))?;

    if host.eq_ignore_ascii_case("github.com") {
        return Url::parse("https://api.github.com").map_err(invalid_url);
    }

    let authority = if host.contains(':') {
        format!("[{host}]")
    } else {
        host.to_owned()
    };
    let mut api_url = Url::parse(&format!("{}://{authority}", web_base.scheme()))
        .map_err(invalid_url)?;
    api_url
        .set_port(web_base.port())
        .map_err(|()| invalid_url("invalid port"))?;
    api_url.set_path("api/v3");
    Ok(api_url)
}

fn invalid_url(detail: impl std::fmt::Display) -> PullmanError {
    PullmanError::Configuration {
        message: format!("invalid GitHub URL: {detail}"),
    }
}

/// A GitHub repository together with its web and API base URLs.
///
/// # Example
///
/// ```
/// use pullman::github::RepositoryLocator;
///
/// let locator = RepositoryLocator::new("https://github.com", "pytorch", "pytorch")
///     .expect("should build repository locator");
/// assert_eq!(locator.slug(), "pytorch/pytorch");
/// assert_eq!(locator.api_base().as_str(), "https://api.github.com/");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryLocator {
    web_base: Url,
    api_base: Url,
    owner: RepositoryOwner,
    repository: RepositoryName,
}

impl RepositoryLocator {
    /// Builds a locator from the web host URL and the repository coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`PullmanError::Configuration`] when the URL cannot be parsed
    /// or either coordinate is blank.
    pub fn new(github_url: &str, owner: &str, repository: &str) -> Result<Self, PullmanError> {
        let web_base = Url::parse(github_url.trim()).map_err(invalid_url)?;
        let api_base = derive_api_base(&web_base)?;
        Ok(Self {
            web_base,
            api_base,
            owner: RepositoryOwner::new(owner)?,
            repository: RepositoryName::new(repository)?,
        })
    }

    /// Web base URL, e.g. `https://github.com/`.
    #[must_use]
    pub const fn web_base(&self) -> &Url {
        &self.web_base
    }

    /// API base URL derived from the web host.
    #[must_use]
    pub const fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Repository owner.
    #[must_use]
    pub const fn owner(&self) -> &RepositoryOwner {
        &self.owner
    }

    /// Repository name.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryName {
        &self.repository
    }

    /// Returns `owner/repo`.
    #[must_use]
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner.as_str(), self.repository.as_str())
    }

    fn repo_path(&self) -> String {
        format!(
            "/repos/{}/{}",
            self.owner.as_str(),
            self.repository.as_str()
        )
    }

    /// Issue search query for `author`'s open pull requests here.
    pub(crate) fn open_pulls_query(&self, author: &str) -> String {
        format!("repo:{} is:pr is:open author:{author}", self.slug())
    }

    pub(crate) fn pull_request_path(&self, number: u64) -> String {
        format!("{}/pulls/{number}", self.repo_path())
    }

    pub(crate) fn branch_ref_path(&self, branch: &str) -> String {
        format!("{}/git/ref/heads/{branch}", self.repo_path())
    }

    pub(crate) fn workflow_runs_path(&self) -> String {
        format!("{}/actions/runs", self.repo_path())
    }

    pub(crate) fn run_jobs_path(&self, run_id: u64) -> String {
        format!("{}/actions/runs/{run_id}/jobs", self.repo_path())
    }

    pub(crate) fn job_logs_path(&self, job_id: u64) -> String {
        format!("{}/actions/jobs/{job_id}/logs", self.repo_path())
    }
}
