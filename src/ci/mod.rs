//! CI failure extraction and reproduction scripts.
//!
//! [`FailureExtractor`] walks a pull request's CI runs newest first, keeps
//! the jobs that failed, and reconstructs the test command each one printed
//! in its log. [`render_script`] and [`write_script`] turn the result into an
//! executable shell script.

mod extractor;
mod job_name;
mod log_scrape;
mod script;

pub use extractor::{ExtractionReport, FailedJob, FailureExtractor, PendingJob, Reproduction};
pub use job_name::{JobName, JobNameError, TestShard, environment_markers, parse_job_name};
pub use log_scrape::{REPRODUCTION_MARKER, apply_markers, is_env_assignment, scrape_commands};
pub use script::{
    DEFAULT_SCRIPT_PATH, ScriptLine, ScriptOptions, python_dir, render_script, script_lines,
    write_script,
};
