//! Local git checkout access.
//!
//! Resolution consults the checkout for three things: revision expressions
//! typed by the user, the commit at `HEAD`, and the trailers ghstack leaves
//! in commit messages. Remote URLs are also parsed here so the repository
//! and user can be inferred when they are not configured.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use pullman::local::{Git2Repository, LocalRepository};
//!
//! let repo = Git2Repository::discover(Path::new(".")).expect("inside a checkout");
//! let head = repo.current_head_commit().expect("HEAD should resolve");
//! let reference = repo.extract_embedded_pr_reference(&head).expect("commit readable");
//! println!("{head}: {reference:?}");
//! ```

mod error;
mod remote;
mod repository;
mod trailer;
mod types;

pub use error::LocalRepositoryError;
pub use remote::{GitHubRemote, parse_github_remote};
pub use repository::{Git2Repository, LocalRepository, NoRepository};
pub use trailer::parse_embedded_reference;
pub use types::{CommitSha, EmbeddedReference};

#[cfg(test)]
pub use repository::MockLocalRepository;
