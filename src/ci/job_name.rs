//! Parsing of CI job display names.
//!
//! Job names follow `<build> / <step> (<config>, <shard>, <num_shards>, <runner>)`,
//! e.g. `linux-jammy-py3.10-gcc11 / test (dynamo, 2, 3, linux.2xlarge)`.
//! Build steps usually carry no parenthesised arguments.

use thiserror::Error;

/// Reasons a job name does not follow the naming convention.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobNameError {
    /// The name lacks the ` / ` separating build and step.
    #[error("job name has no ' / ' separator")]
    MissingSeparator,
    /// Parentheses do not open and close exactly once, at the end.
    #[error("job name has unbalanced parentheses")]
    UnbalancedParentheses,
    /// The build, step, or an argument is empty.
    #[error("job name has an empty segment")]
    EmptySegment,
    /// A test step does not carry `config, shard, num_shards, runner`.
    #[error("test job arguments are not 'config, shard, num_shards, runner'")]
    BadTestArguments,
}

/// Shard coordinates of a test job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestShard {
    /// Test configuration, e.g. `default`, `dynamo`, `inductor`.
    pub config: String,
    /// One-based shard index.
    pub shard: u32,
    /// Total number of shards.
    pub num_shards: u32,
    /// Runner label.
    pub runner: String,
}

/// A parsed job name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobName {
    /// Build environment, left of ` / `.
    pub build: String,
    /// Step name such as `test` or `build`.
    pub step: String,
    /// Parenthesised arguments, split on commas.
    pub arguments: Vec<String>,
}

impl JobName {
    /// Returns the shard coordinates when this is a test job.
    ///
    /// # Errors
    ///
    /// Returns [`JobNameError::BadTestArguments`] for a `test` step whose
    /// arguments do not fit the convention.
    pub fn test_shard(&self) -> Result<Option<TestShard>, JobNameError> {
        if self.step != "test" {
            return Ok(None);
        }
        let [config, shard, num_shards, runner] = self.arguments.as_slice() else {
            return Err(JobNameError::BadTestArguments);
        };
        let shard_number = shard
            .parse()
            .map_err(|_| JobNameError::BadTestArguments)?;
        let shard_count = num_shards
            .parse()
            .map_err(|_| JobNameError::BadTestArguments)?;
        Ok(Some(TestShard {
            config: config.clone(),
            shard: shard_number,
            num_shards: shard_count,
            runner: runner.clone(),
        }))
    }
}

/// Parses a job display name.
///
/// # Errors
///
/// Returns [`JobNameError`] when the name does not follow the convention.
pub fn parse_job_name(name: &str) -> Result<JobName, JobNameError> {
    let (build, rest) = name
        .split_once(" / ")
        .ok_or(JobNameError::MissingSeparator)?;
    let (step, arguments) = split_arguments(rest.trim())?;

    if build.trim().is_empty() || step.is_empty() {
        return Err(JobNameError::EmptySegment);
    }
    if arguments.iter().any(String::is_empty) {
        return Err(JobNameError::EmptySegment);
    }

    Ok(JobName {
        build: build.trim().to_owned(),
        step: step.to_owned(),
        arguments,
    })
}

fn split_arguments(rest: &str) -> Result<(&str, Vec<String>), JobNameError> {
    let opens = rest.matches('(').count();
    let closes = rest.matches(')').count();
    if opens == 0 && closes == 0 {
        return Ok((rest, Vec::new()));
    }
    if opens != 1 || closes != 1 || !rest.ends_with(')') {
        return Err(JobNameError::UnbalancedParentheses);
    }
    let (step, inner) = rest
        .strip_suffix(')')
        .and_then(|body| body.split_once('('))
        .ok_or(JobNameError::UnbalancedParentheses)?;
    let arguments = inner
        .split(',')
        .map(|argument| argument.trim().to_owned())
        .collect();
    Ok((step.trim(), arguments))
}

/// Environment assignments implied by a test configuration.
#[must_use]
pub fn environment_markers(config: &str) -> Vec<&'static str> {
    const MARKERS: [(&str, &[&str]); 4] = [
        ("dynamo", &["PYTORCH_TEST_WITH_DYNAMO=1"]),
        ("inductor", &["PYTORCH_TEST_WITH_INDUCTOR=1"]),
        ("crossref", &["PYTORCH_TEST_WITH_CROSSREF=1"]),
        ("slow", &["PYTORCH_TEST_WITH_SLOW=1", "PYTORCH_TEST_SKIP_FAST=1"]),
    ];

    MARKERS
        .iter()
        .filter(|(needle, _)| config.contains(needle))
        .flat_map(|(_, assignments)| assignments.iter().copied())
        .collect()
}
