//! Pullman library crate: find and inspect your own stacked pull requests.
//!
//! A loose token (a pull request number, a commit, a branch, or a few words
//! of a title) is resolved to exactly one open pull request. Pull request
//! metadata is fetched from GitHub once and kept in a local `SQLite` cache,
//! so later lookups skip the network. Resolved pull requests can be turned
//! into URLs, tracking refs, or a script reproducing their failed CI tests.

pub mod ci;
pub mod config;
pub mod error;
pub mod fs;
pub mod github;
pub mod local;
pub mod persistence;
pub mod pulls;
pub mod resolve;
pub mod telemetry;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use ci::{ExtractionReport, FailedJob, FailureExtractor, Reproduction};
pub use config::PullmanConfig;
pub use error::{MatchSummary, PullmanError};
pub use github::{
    OctocrabPullRequestGateway, OctocrabWorkflowGateway, PersonalAccessToken, RepositoryLocator,
    UrlBuilder, UrlKind, get_ref,
};
pub use pulls::{IndexPopulation, PullRequest, PullRequestIndex};
pub use resolve::Resolver;
