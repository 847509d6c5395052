//! Error types for local repository access.

use thiserror::Error;

use crate::error::PullmanError;

/// Errors raised while inspecting the local git checkout.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocalRepositoryError {
    /// Current directory is not within a Git repository.
    #[error("not inside a Git repository")]
    NotARepository,

    /// The specified remote does not exist.
    #[error("remote '{name}' not found")]
    RemoteNotFound {
        /// Name of the missing remote.
        name: String,
    },

    /// The remote URL could not be parsed as a GitHub repository.
    #[error("remote '{name}' does not point at a GitHub repository: {url}")]
    InvalidRemoteUrl {
        /// Name of the remote.
        name: String,
        /// The unparseable URL string.
        url: String,
    },

    /// The repository handle could not be locked.
    #[error("repository handle is unavailable")]
    Unavailable,

    /// Git operation failed.
    #[error("git error: {message}")]
    Git {
        /// Error detail from the git2 library.
        message: String,
    },
}

impl From<git2::Error> for LocalRepositoryError {
    fn from(error: git2::Error) -> Self {
        Self::Git {
            message: error.message().to_owned(),
        }
    }
}

impl From<LocalRepositoryError> for PullmanError {
    fn from(error: LocalRepositoryError) -> Self {
        Self::LocalRepository {
            message: error.to_string(),
        }
    }
}
