//! GitHub access for pull request listings, stack metadata, and CI jobs.
//!
//! This module wraps Octocrab behind the [`PullRequestGateway`] and
//! [`WorkflowGateway`] traits and maps transport failures into
//! [`crate::PullmanError`] variants so callers never see Octocrab internals.

pub mod gateway;
pub mod locator;
pub mod models;
pub mod urls;

pub use gateway::{
    DEFAULT_WORKFLOWS, OctocrabPullRequestGateway, OctocrabWorkflowGateway, PullRequestGateway,
    WorkflowGateway,
};
pub use locator::{PersonalAccessToken, RepositoryLocator, RepositoryName, RepositoryOwner};
pub use models::CiJob;
pub use urls::{UrlBuilder, UrlKind, get_ref};

#[cfg(test)]
pub use gateway::{MockPullRequestGateway, MockWorkflowGateway};
