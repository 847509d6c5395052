//! GitHub coordinates parsed from git remote URLs.

/// Owner and repository named by a GitHub remote URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubRemote {
    /// Host serving the repository, e.g. `github.com`.
    pub host: String,
    /// Repository owner (user or organisation).
    pub owner: String,
    /// Repository name without any `.git` suffix.
    pub repository: String,
}

/// Parses a git remote URL into GitHub coordinates.
///
/// Accepts SCP-style SSH (`git@github.com:owner/repo.git`) and URL-style
/// remotes (`https://`, `ssh://`, `git://`). Returns `None` for anything
/// that does not name exactly `owner/repo`.
#[must_use]
pub fn parse_github_remote(url: &str) -> Option<GitHubRemote> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return None;
    }
    parse_scp_style(trimmed).or_else(|| parse_url_style(trimmed))
}

fn parse_scp_style(url: &str) -> Option<GitHubRemote> {
    if url.contains("://") {
        return None;
    }
    let (user_host, path) = url.split_once(':')?;
    let (_, host) = user_host.split_once('@')?;
    coordinates(host, path)
}

fn parse_url_style(url: &str) -> Option<GitHubRemote> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    coordinates(host, parsed.path())
}

fn coordinates(host: &str, path: &str) -> Option<GitHubRemote> {
    let mut segments = path.trim_matches('/').split('/');
    let owner = segments.next().filter(|owner| !owner.is_empty())?;
    let raw_repository = segments.next()?;
    if segments.next().is_some() {
        return None;
    }
    let repository = raw_repository
        .strip_suffix(".git")
        .unwrap_or(raw_repository);
    if host.is_empty() || repository.is_empty() {
        return None;
    }
    Some(GitHubRemote {
        host: host.to_owned(),
        owner: owner.to_owned(),
        repository: repository.to_owned(),
    })
}
