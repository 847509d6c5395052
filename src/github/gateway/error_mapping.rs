//! Error mapping helpers for the Octocrab gateway implementations.

use http::StatusCode;

use crate::error::PullmanError;

/// Checks if a GitHub error status indicates an authentication failure.
pub(super) const fn is_auth_failure(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

/// Checks if an octocrab error represents a network/transport issue.
pub(super) const fn is_network_error(error: &octocrab::Error) -> bool {
    matches!(
        error,
        octocrab::Error::Http { .. }
            | octocrab::Error::Hyper { .. }
            | octocrab::Error::Service { .. }
    )
}

pub(super) fn map_octocrab_error(operation: &str, error: &octocrab::Error) -> PullmanError {
    if let octocrab::Error::GitHub { source, .. } = error {
        return map_http_error(operation, source.status_code, Some(source.message.clone()));
    }

    if is_network_error(error) {
        return PullmanError::RemoteUnavailable {
            operation: operation.to_owned(),
            message: format!("network error: {error}"),
        };
    }

    PullmanError::RemoteUnavailable {
        operation: operation.to_owned(),
        message: error.to_string(),
    }
}

pub(super) fn map_http_error(
    operation: &str,
    status: StatusCode,
    maybe_message: Option<String>,
) -> PullmanError {
    let message = maybe_message.unwrap_or_else(|| "unknown error".to_owned());
    if is_auth_failure(status) {
        PullmanError::Authentication {
            message: format!("{operation}: GitHub returned {status} {message}"),
        }
    } else {
        PullmanError::RemoteUnavailable {
            operation: operation.to_owned(),
            message: format!("status {status}: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use rstest::rstest;

    use super::map_http_error;
    use crate::error::PullmanError;

    #[rstest]
    #[case::unauthorised(StatusCode::UNAUTHORIZED)]
    #[case::forbidden(StatusCode::FORBIDDEN)]
    fn auth_statuses_map_to_authentication(#[case] status: StatusCode) {
        let error = map_http_error("list pulls", status, Some("Bad credentials".to_owned()));
        assert!(matches!(error, PullmanError::Authentication { .. }));
    }

    #[rstest]
    fn other_statuses_name_the_operation() {
        let error = map_http_error("stack metadata for #136", StatusCode::BAD_GATEWAY, None);

        assert_eq!(
            error.to_string(),
            "stack metadata for #136 failed: status 502 Bad Gateway: unknown error"
        );
    }
}
