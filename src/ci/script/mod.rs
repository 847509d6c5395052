//! Reproduction script rendering and writing.
//!
//! Failed jobs become one shell line per command, `<command>  # <job id>`.
//! Jobs without a command are kept as comment lines so nothing silently
//! disappears from the report.

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use minijinja::{Environment, context};
use serde::Serialize;

use crate::error::PullmanError;

use super::extractor::{FailedJob, Reproduction};

/// Default file written by `pullman errors`.
pub const DEFAULT_SCRIPT_PATH: &str = "unit-test-failures.sh";

const SCRIPT_TEMPLATE: &str = r"{% if header %}#!/bin/bash

# Failed tests for {{ pull_request_url }}

{% if before %}{{ before }}

{% endif %}{% if python_dir %}export PATH={{ python_dir }}:$PATH

{% endif %}{% endif %}{% for line in commands %}{{ line.command }}  # {{ line.job_id }}
{% endfor %}{% for job in placeholders %}# {{ job.job_name }}: {{ job.reason }}  # {{ job.job_id }}
{% endfor %}";

/// Rendering switches for the reproduction script.
#[derive(Debug, Clone, Default)]
pub struct ScriptOptions {
    /// URL of the pull request, shown in the header.
    pub pull_request_url: String,
    /// Emit the shebang, header and environment preamble.
    pub header: bool,
    /// Text inserted before the commands.
    pub before: Option<String>,
    /// Directory prepended to `PATH`.
    pub python_dir: Option<Utf8PathBuf>,
    /// Keep every environment variant of the same test invocation.
    pub all_env_combos: bool,
    /// Sort commands alphabetically.
    pub sort: bool,
}

/// One runnable line of the script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptLine {
    /// Shell command.
    pub command: String,
    /// Job the command was scraped from.
    pub job_id: u64,
}

#[derive(Debug, Serialize)]
struct Placeholder<'a> {
    job_name: &'a str,
    job_id: u64,
    reason: &'a str,
}

/// Returns the directory to prepend to `PATH` for `python`.
///
/// A path to an interpreter contributes its parent directory.
#[must_use]
pub fn python_dir(python: &Utf8Path) -> Utf8PathBuf {
    if python.is_dir() {
        return python.to_path_buf();
    }
    python
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .map_or_else(|| Utf8PathBuf::from("."), Utf8Path::to_path_buf)
}

/// Collects, filters, and orders the runnable lines for `failed`.
///
/// Unless `all_env_combos` is set, commands that run the same invocation
/// (text after `python `) keep only the variant with the shortest
/// environment prefix. Consecutive duplicates are dropped.
#[must_use]
pub fn script_lines(failed: &[FailedJob], options: &ScriptOptions) -> Vec<ScriptLine> {
    let scraped = failed.iter().flat_map(|job| match &job.reproduction {
        Reproduction::Commands(commands) => commands
            .iter()
            .map(|command| ScriptLine {
                command: command.clone(),
                job_id: job.job_id,
            })
            .collect(),
        Reproduction::NotAutoReproducible { .. } => Vec::new(),
    });

    let mut lines: Vec<ScriptLine> = if options.all_env_combos {
        scraped.collect()
    } else {
        shortest_variants(scraped)
    };
    if options.sort {
        lines.sort_by(|left, right| {
            left.command
                .cmp(&right.command)
                .then(left.job_id.cmp(&right.job_id))
        });
    }
    lines.dedup_by(|current, previous| current.command == previous.command);
    lines
}

fn shortest_variants(lines: impl Iterator<Item = ScriptLine>) -> Vec<ScriptLine> {
    let mut kept: Vec<ScriptLine> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for line in lines {
        let (prefix, invocation) = line
            .command
            .split_once("python ")
            .unwrap_or(("", line.command.as_str()));
        let invocation_key = invocation.to_owned();
        let existing = positions
            .get(&invocation_key)
            .and_then(|position| kept.get(*position).map(|found| (*position, found)));
        match existing {
            Some((_, found))
                if !prefix.is_empty() && line.command.len() >= found.command.len() => {}
            Some((position, _)) => {
                if let Some(slot) = kept.get_mut(position) {
                    *slot = line;
                }
            }
            None => {
                positions.insert(invocation_key, kept.len());
                kept.push(line);
            }
        }
    }
    kept
}

/// Renders the reproduction script for `failed`.
///
/// # Errors
///
/// Returns [`PullmanError::Configuration`] if the script template fails to
/// render.
pub fn render_script(
    failed: &[FailedJob],
    options: &ScriptOptions,
) -> Result<String, PullmanError> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| minijinja::AutoEscape::None);
    env.set_keep_trailing_newline(true);
    env.add_template("script", SCRIPT_TEMPLATE)
        .map_err(|error| PullmanError::Configuration {
            message: format!("invalid script template: {error}"),
        })?;

    let placeholders: Vec<Placeholder<'_>> = failed
        .iter()
        .filter_map(|job| match &job.reproduction {
            Reproduction::NotAutoReproducible { reason } => Some(Placeholder {
                job_name: &job.job_name,
                job_id: job.job_id,
                reason,
            }),
            Reproduction::Commands(_) => None,
        })
        .collect();

    let ctx = context! {
        header => options.header,
        pull_request_url => &options.pull_request_url,
        before => options.before.as_deref().filter(|text| !text.is_empty()),
        python_dir => options.python_dir.as_deref().map(Utf8Path::as_str),
        commands => script_lines(failed, options),
        placeholders => placeholders,
    };

    let template = env
        .get_template("script")
        .map_err(|error| PullmanError::Configuration {
            message: format!("failed to retrieve script template: {error}"),
        })?;
    template.render(ctx).map_err(|error| PullmanError::Configuration {
        message: format!("script rendering failed: {error}"),
    })
}

/// Writes `contents` to `path` and marks it executable.
///
/// # Errors
///
/// Returns [`PullmanError::Io`] when the file cannot be written.
pub fn write_script(path: &Utf8Path, contents: &str) -> Result<(), PullmanError> {
    let io_error = |action: &str, error: std::io::Error| PullmanError::Io {
        message: format!("failed to {action} '{path}': {error}"),
    };
    let (dir, name) =
        crate::fs::parent_dir_and_name(path).map_err(|error| io_error("open", error))?;
    dir.write(name, contents)
        .map_err(|error| io_error("write", error))?;

    #[cfg(unix)]
    {
        use cap_std::fs::PermissionsExt;

        let metadata = dir.metadata(name).map_err(|error| io_error("stat", error))?;
        let mut permissions = metadata.permissions();
        permissions.set_mode(permissions.mode() | 0o755);
        dir.set_permissions(name, permissions)
            .map_err(|error| io_error("chmod", error))?;
    }

    Ok(())
}
