//! Pull request listing command.

use std::io::Write;

use pullman::github::PullRequestGateway;
use pullman::persistence::PullRequestStore;
use pullman::resolve::FORCE_SEARCH_PREFIX;
use pullman::{PullRequest, PullRequestIndex, PullmanConfig, PullmanError};

use super::output::write_rows;

/// Ordering switches for `list`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Sort by title instead of number.
    pub sort_by_title: bool,
    /// Reverse the order.
    pub reverse: bool,
}

impl From<&PullmanConfig> for ListOptions {
    fn from(config: &PullmanConfig) -> Self {
        Self {
            sort_by_title: config.sort_by_title,
            reverse: config.reverse,
        }
    }
}

/// Lists open pull requests, or those whose title contains `search`.
///
/// Rows that loaded are written before a degraded population is reported.
///
/// # Errors
///
/// Returns [`PullmanError::Degraded`] when some pull requests could not be
/// loaded, or the listing error itself.
pub async fn run<G, S, W>(
    index: &mut PullRequestIndex<'_, G, S>,
    search: &str,
    options: ListOptions,
    writer: &mut W,
) -> Result<(), PullmanError>
where
    G: PullRequestGateway + ?Sized,
    S: PullRequestStore + ?Sized,
    W: Write,
{
    let text = search.trim();
    let text = text.strip_prefix(FORCE_SEARCH_PREFIX).unwrap_or(text);
    let mut pull_requests = if text.is_empty() {
        index.all().await?.pull_requests
    } else {
        index.search(text).await?
    };

    order(&mut pull_requests, options);
    write_rows(writer, &pull_requests)?;

    let failed = index.failed();
    if failed.is_empty() {
        Ok(())
    } else {
        Err(PullmanError::Degraded { failed })
    }
}

fn order(pull_requests: &mut [PullRequest], options: ListOptions) {
    if options.sort_by_title {
        pull_requests.sort_by(|left, right| {
            left.title
                .cmp(&right.title)
                .then(left.id.cmp(&right.id))
        });
    } else {
        pull_requests.sort_by_key(|pull_request| pull_request.id);
    }
    if options.reverse {
        pull_requests.reverse();
    }
}
