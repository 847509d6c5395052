//! Commit-message trailers left behind by ghstack.
//!
//! A submitted stack entry carries a `Pull Request resolved: <url>` trailer
//! naming its pull request. An entry without one may still carry
//! `ghstack-source-id: <sha>`, naming the commit it was pushed from.

use tracing::warn;

use super::types::{CommitSha, EmbeddedReference};
use crate::resolve::is_commit_shaped;

const PULL_REQUEST_RESOLVED: &str = "Pull Request resolved:";
const GHSTACK_SOURCE: &str = "ghstack-source-id:";
const PULL_PATH_MARKER: &str = "/pull/";

/// Extracts the stacking reference from `message`, the message of `commit`.
///
/// More than one resolved trailer, or one without a pull request number, is
/// malformed and yields `None`.
#[must_use]
pub fn parse_embedded_reference(message: &str, commit: &CommitSha) -> Option<EmbeddedReference> {
    let resolved: Vec<&str> = message
        .lines()
        .filter_map(|line| line.split_once(PULL_REQUEST_RESOLVED))
        .map(|(_, url)| url.trim())
        .filter(|url| !url.is_empty())
        .collect();

    match resolved.as_slice() {
        [] => source_commit(message).map(EmbeddedReference::Commit),
        [url] => {
            let number = pull_number_from_url(url);
            if number.is_none() {
                warn!(commit = %commit, url, "pull request trailer has no pull number");
            }
            number.map(EmbeddedReference::PullRequest)
        }
        _ => {
            warn!(
                commit = %commit,
                count = resolved.len(),
                "commit has more than one pull request trailer"
            );
            None
        }
    }
}

fn source_commit(message: &str) -> Option<CommitSha> {
    message
        .lines()
        .filter_map(|line| line.trim_start().strip_prefix(GHSTACK_SOURCE))
        .map(str::trim)
        .find(|value| is_commit_shaped(value))
        .map(|value| CommitSha::new(value.to_ascii_lowercase()))
}

fn pull_number_from_url(url: &str) -> Option<u64> {
    let (_, tail) = url.rsplit_once(PULL_PATH_MARKER)?;
    let digits: String = tail.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok().filter(|number| *number > 0)
}
