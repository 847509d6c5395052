//! Output formatting utilities for CLI operations.

use std::io::Write;

use pullman::{PullRequest, PullmanError};

/// Writes one `#<id>: <title>` row per pull request.
///
/// # Errors
///
/// Returns [`PullmanError::Io`] when writing fails.
pub fn write_rows<W: Write>(
    writer: &mut W,
    pull_requests: &[PullRequest],
) -> Result<(), PullmanError> {
    for pull_request in pull_requests {
        writeln!(writer, "#{}: {}", pull_request.id, pull_request.title).map_err(|e| io_error(&e))?;
    }
    Ok(())
}

/// Writes a single line.
///
/// # Errors
///
/// Returns [`PullmanError::Io`] when writing fails.
pub fn write_line<W: Write>(writer: &mut W, line: &str) -> Result<(), PullmanError> {
    writeln!(writer, "{line}").map_err(|e| io_error(&e))
}

/// Maps an I/O error to a [`PullmanError`].
#[must_use]
pub fn io_error(error: &std::io::Error) -> PullmanError {
    PullmanError::Io {
        message: error.to_string(),
    }
}
