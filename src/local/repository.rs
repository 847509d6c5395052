//! Git2-backed access to the local checkout.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use git2::Repository;

use super::error::LocalRepositoryError;
use super::remote::{GitHubRemote, parse_github_remote};
use super::trailer::parse_embedded_reference;
use super::types::{CommitSha, EmbeddedReference};

/// Read-only view of the local git checkout used during resolution.
#[cfg_attr(test, mockall::automock)]
pub trait LocalRepository: Send + Sync {
    /// Resolves a revision expression (`HEAD~2`, a branch, a short SHA) to a
    /// commit. Returns `None` when git cannot resolve it.
    ///
    /// # Errors
    ///
    /// Returns [`LocalRepositoryError`] when the repository cannot be read.
    fn resolve_revision(&self, token: &str) -> Result<Option<CommitSha>, LocalRepositoryError>;

    /// Returns the commit `HEAD` points at.
    ///
    /// # Errors
    ///
    /// Returns [`LocalRepositoryError`] when `HEAD` is unborn or unreadable.
    fn current_head_commit(&self) -> Result<CommitSha, LocalRepositoryError>;

    /// Reads the stacking-tool reference embedded in `commit`'s message.
    ///
    /// # Errors
    ///
    /// Returns [`LocalRepositoryError`] when the commit cannot be read.
    fn extract_embedded_pr_reference(
        &self,
        commit: &CommitSha,
    ) -> Result<Option<EmbeddedReference>, LocalRepositoryError>;
}

/// Git2-based implementation of [`LocalRepository`].
///
/// `git2::Repository` is not `Sync`, so the handle sits behind a `Mutex`.
pub struct Git2Repository {
    repo: Mutex<Repository>,
}

impl std::fmt::Debug for Git2Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git2Repository")
            .field("repo", &"<git2::Repository>")
            .finish()
    }
}

impl Git2Repository {
    /// Discovers and opens the repository containing `start_path`.
    ///
    /// # Errors
    ///
    /// Returns [`LocalRepositoryError::NotARepository`] when no repository is
    /// found.
    pub fn discover(start_path: &Path) -> Result<Self, LocalRepositoryError> {
        let repo = Repository::discover(start_path).map_err(|error| {
            if error.code() == git2::ErrorCode::NotFound {
                LocalRepositoryError::NotARepository
            } else {
                LocalRepositoryError::from(error)
            }
        })?;
        Ok(Self::from_repository(repo))
    }

    /// Wraps an already-open repository.
    #[must_use]
    #[expect(
        clippy::missing_const_for_fn,
        reason = "Mutex::new is not const-stable"
    )]
    pub fn from_repository(repo: Repository) -> Self {
        Self {
            repo: Mutex::new(repo),
        }
    }

    /// Parses the URL of remote `name` as a GitHub repository.
    ///
    /// # Errors
    ///
    /// Returns [`LocalRepositoryError::RemoteNotFound`] when the remote is
    /// missing and [`LocalRepositoryError::InvalidRemoteUrl`] when its URL
    /// does not name a GitHub repository.
    pub fn github_remote(&self, name: &str) -> Result<GitHubRemote, LocalRepositoryError> {
        let repo = self.lock()?;
        let remote = repo.find_remote(name).map_err(|error| {
            if error.code() == git2::ErrorCode::NotFound {
                LocalRepositoryError::RemoteNotFound {
                    name: name.to_owned(),
                }
            } else {
                LocalRepositoryError::from(error)
            }
        })?;
        let url = remote.url().unwrap_or_default();
        parse_github_remote(url).ok_or_else(|| LocalRepositoryError::InvalidRemoteUrl {
            name: name.to_owned(),
            url: url.to_owned(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Repository>, LocalRepositoryError> {
        self.repo
            .lock()
            .map_err(|_| LocalRepositoryError::Unavailable)
    }
}

impl LocalRepository for Git2Repository {
    fn resolve_revision(&self, token: &str) -> Result<Option<CommitSha>, LocalRepositoryError> {
        let repo = self.lock()?;
        let Ok(object) = repo.revparse_single(token) else {
            return Ok(None);
        };
        Ok(object
            .peel_to_commit()
            .ok()
            .map(|commit| CommitSha::new(commit.id().to_string())))
    }

    fn current_head_commit(&self) -> Result<CommitSha, LocalRepositoryError> {
        let repo = self.lock()?;
        let commit = repo.head()?.peel_to_commit()?;
        Ok(CommitSha::new(commit.id().to_string()))
    }

    fn extract_embedded_pr_reference(
        &self,
        commit: &CommitSha,
    ) -> Result<Option<EmbeddedReference>, LocalRepositoryError> {
        let repo = self.lock()?;
        let oid = git2::Oid::from_str(commit.as_str())?;
        let found = repo.find_commit(oid)?;
        let message = String::from_utf8_lossy(found.message_bytes());
        Ok(parse_embedded_reference(&message, commit))
    }
}

/// Stand-in used outside a git checkout: no revision resolves and there is
/// no `HEAD` to read context from.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRepository;

impl LocalRepository for NoRepository {
    fn resolve_revision(&self, _token: &str) -> Result<Option<CommitSha>, LocalRepositoryError> {
        Ok(None)
    }

    fn current_head_commit(&self) -> Result<CommitSha, LocalRepositoryError> {
        Err(LocalRepositoryError::NotARepository)
    }

    fn extract_embedded_pr_reference(
        &self,
        _commit: &CommitSha,
    ) -> Result<Option<EmbeddedReference>, LocalRepositoryError> {
        Ok(None)
    }
}
