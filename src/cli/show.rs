//! URL and ref commands for a single resolved pull request.

use std::io::Write;

use pullman::github::PullRequestGateway;
use pullman::local::LocalRepository;
use pullman::persistence::PullRequestStore;
use pullman::{PullRequest, PullRequestIndex, PullmanError, Resolver, UrlBuilder, UrlKind, get_ref};

use super::output::write_line;

/// What to print for the resolved pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shown {
    /// A browser URL.
    Url(UrlKind),
    /// The remote tracking ref.
    Ref,
}

/// Resolves `token` and prints the requested URL or ref.
///
/// # Errors
///
/// Propagates resolution errors and returns [`PullmanError::NoCommits`]
/// when a commit URL is requested for a pull request without commits.
pub async fn run<G, S, L, W>(
    index: &mut PullRequestIndex<'_, G, S>,
    local: &L,
    urls: &UrlBuilder,
    token: &str,
    shown: Shown,
    writer: &mut W,
) -> Result<(), PullmanError>
where
    G: PullRequestGateway + ?Sized,
    S: PullRequestStore + ?Sized,
    L: LocalRepository + ?Sized,
    W: Write,
{
    let pull_request = Resolver::new(index, local).resolve(token).await?;
    let line = render(&pull_request, urls, shown)?;
    write_line(writer, &line)
}

fn render(
    pull_request: &PullRequest,
    urls: &UrlBuilder,
    shown: Shown,
) -> Result<String, PullmanError> {
    match shown {
        Shown::Ref => Ok(get_ref(pull_request).to_owned()),
        Shown::Url(kind) => urls
            .url(pull_request, kind)
            .ok_or(PullmanError::NoCommits {
                pull_request: pull_request.id,
            }),
    }
}
