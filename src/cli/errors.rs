//! Failed-test reproduction command.

use std::io::Write;
use std::time::Duration;

use camino::Utf8PathBuf;
use pullman::ci::{DEFAULT_SCRIPT_PATH, ScriptOptions, python_dir, render_script, write_script};
use pullman::github::WorkflowGateway;
use pullman::{FailureExtractor, PullRequest, PullmanConfig, PullmanError, UrlBuilder, UrlKind};
use tracing::{info, warn};

use super::output::io_error;

/// Settings for `errors`, taken from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorsOptions {
    /// Print commands instead of writing a script.
    pub to_terminal: bool,
    /// Script destination.
    pub output: Utf8PathBuf,
    /// Text inserted before the commands.
    pub before: Option<String>,
    /// Interpreter or bin directory prepended to `PATH`.
    pub python: Option<Utf8PathBuf>,
    /// Keep every environment variant.
    pub all_env_combos: bool,
    /// Sort commands alphabetically.
    pub sort: bool,
    /// Delay between polls of unfinished runs.
    pub poll_interval: Option<Duration>,
}

impl From<&PullmanConfig> for ErrorsOptions {
    fn from(config: &PullmanConfig) -> Self {
        Self {
            to_terminal: config.output_to_terminal,
            output: Utf8PathBuf::from(config.output.as_deref().unwrap_or(DEFAULT_SCRIPT_PATH)),
            before: config.before.clone().filter(|text| !text.trim().is_empty()),
            python: config.python.as_deref().map(Utf8PathBuf::from),
            all_env_combos: config.all_env_combos,
            sort: config.sort_errors,
            poll_interval: config
                .wait_seconds
                .filter(|seconds| *seconds > 0)
                .map(Duration::from_secs),
        }
    }
}

/// Extracts failed tests of `pull_request` and emits the reproduction.
///
/// The script goes to `options.output` with a status line on `status`, or
/// straight to `stdout` when printing to the terminal.
///
/// # Errors
///
/// Returns extraction errors such as [`PullmanError::NoRuns`], rendering
/// errors, and I/O failures.
pub async fn run<W, O, E>(
    pull_request: &PullRequest,
    workflows: &W,
    urls: &UrlBuilder,
    options: &ErrorsOptions,
    stdout: &mut O,
    status: &mut E,
) -> Result<(), PullmanError>
where
    W: WorkflowGateway + ?Sized,
    O: Write,
    E: Write,
{
    let mut extractor = FailureExtractor::new(workflows);
    if let Some(interval) = options.poll_interval {
        extractor = extractor.with_poll_interval(interval);
    }
    let report = extractor.extract(pull_request).await?;

    for job in &report.pending {
        warn!(job = %job.job_name, run = job.run_id, "job has not finished");
    }
    if !report.unreachable_runs.is_empty() {
        warn!(runs = ?report.unreachable_runs, "some CI runs could not be read");
    }
    if report.skipped > 0 {
        info!(skipped = report.skipped, "skipped malformed job records");
    }

    let pull_request_url = urls
        .url(pull_request, UrlKind::PullRequest)
        .unwrap_or_default();
    let script_options = ScriptOptions {
        pull_request_url: pull_request_url.clone(),
        header: !options.to_terminal,
        before: options.before.clone(),
        python_dir: options.python.as_deref().map(python_dir),
        all_env_combos: options.all_env_combos,
        sort: options.sort,
    };
    let script = render_script(&report.failed, &script_options)?;

    if options.to_terminal {
        return stdout
            .write_all(script.as_bytes())
            .map_err(|error| io_error(&error));
    }
    write_script(&options.output, &script)?;
    writeln!(status, "Writing {} for {pull_request_url}", options.output)
        .map_err(|error| io_error(&error))
}
