//! Commit identifiers and stacking-tool references read from commits.

use std::fmt;

/// A hexadecimal Git commit SHA, full or abbreviated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitSha(String);

impl CommitSha {
    /// Creates a new `CommitSha` from a string.
    #[must_use]
    pub const fn new(sha: String) -> Self {
        Self(sha)
    }

    /// Returns the SHA as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitSha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommitSha {
    fn from(sha: &str) -> Self {
        Self(sha.to_owned())
    }
}

/// Pull request metadata a stacking tool embedded in a commit message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddedReference {
    /// The commit names its pull request directly.
    PullRequest(u64),
    /// The commit was pushed from another commit, named by its hash.
    Commit(CommitSha),
}
