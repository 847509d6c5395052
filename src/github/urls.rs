//! Web URL construction for resolved pull requests.

use crate::pulls::PullRequest;

use super::locator::RepositoryLocator;

/// Which page of a pull request to link to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    /// `<host>/<org>/<repo>/pull/<id>`.
    PullRequest,
    /// `<host>/<org>/<repo>/commit/<tracking commit>`.
    Commit,
    /// `<hud-host>/pr/<id>`.
    HudDashboard,
    /// `<host>/<org>/<repo>/tree/<ref without remote>`.
    RefTree,
}

/// Builds browser URLs for pull requests in one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlBuilder {
    repository_base: String,
    hud_base: String,
}

impl UrlBuilder {
    /// Creates a builder for `locator`'s repository and the given HUD host.
    #[must_use]
    pub fn new(locator: &RepositoryLocator, hud_url: &str) -> Self {
        let host = locator.web_base().as_str().trim_end_matches('/');
        Self {
            repository_base: format!("{host}/{}", locator.slug()),
            hud_base: hud_url.trim().trim_end_matches('/').to_owned(),
        }
    }

    /// Returns the URL of `kind` for `pull_request`.
    ///
    /// Only [`UrlKind::Commit`] can be absent: a record with no known
    /// commits has nothing to link to.
    #[must_use]
    pub fn url(&self, pull_request: &PullRequest, kind: UrlKind) -> Option<String> {
        match kind {
            UrlKind::PullRequest => Some(format!(
                "{}/pull/{}",
                self.repository_base, pull_request.id
            )),
            UrlKind::Commit => pull_request
                .tracking_commit()
                .map(|sha| format!("{}/commit/{sha}", self.repository_base)),
            UrlKind::HudDashboard => Some(format!("{}/pr/{}", self.hud_base, pull_request.id)),
            UrlKind::RefTree => Some(format!(
                "{}/tree/{}",
                self.repository_base,
                strip_remote(&pull_request.git_ref)
            )),
        }
    }
}

/// Returns the remote tracking ref of `pull_request`.
#[must_use]
pub fn get_ref(pull_request: &PullRequest) -> &str {
    &pull_request.git_ref
}

fn strip_remote(git_ref: &str) -> &str {
    git_ref
        .split_once('/')
        .map_or(git_ref, |(_remote, branch)| branch)
}
