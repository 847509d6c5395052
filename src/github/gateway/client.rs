//! Octocrab client construction helpers for gateway implementations.

use http::Uri;
use octocrab::Octocrab;

use crate::error::PullmanError;
use crate::github::locator::PersonalAccessToken;

use super::error_mapping::map_octocrab_error;

/// Builds an Octocrab client for the API base URL, authenticated with
/// `token` when one is given.
///
/// # Errors
///
/// Returns [`PullmanError::Configuration`] when the base URI cannot be parsed
/// or [`PullmanError::RemoteUnavailable`] when Octocrab fails to construct a
/// client.
pub(crate) fn build_octocrab_client(
    token: Option<&PersonalAccessToken>,
    api_base: &str,
) -> Result<Octocrab, PullmanError> {
    let base_uri: Uri = api_base
        .parse::<Uri>()
        .map_err(|error| PullmanError::Configuration {
            message: format!("invalid API base '{api_base}': {error}"),
        })?;

    let mut builder = Octocrab::builder();
    if let Some(token) = token {
        builder = builder.personal_token(token.as_ref());
    }
    builder
        .base_uri(base_uri)
        .map_err(|error| PullmanError::Configuration {
            message: format!("build client failed: {error}"),
        })?
        .build()
        .map_err(|error| map_octocrab_error("build client", &error))
}
