//! Pullman CLI entrypoint.
//!
//! Usage: `pullman [COMMAND] [TOKEN...] [FLAGS]`. When the first positional
//! word is not a command the invocation is a `list` and every positional
//! word is part of the title search.

mod cli;

use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;

use ortho_config::OrthoConfig;
use pullman::config::VALUE_FLAGS;
use pullman::{PullmanConfig, PullmanError};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if writeln!(io::stderr().lock(), "{error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), PullmanError> {
    let (positionals, flags) = split_arguments(std::env::args_os().collect());
    let config = load_config(flags)?;
    init_tracing(config.verbose);

    let (command, token) = cli::command_and_token(&positionals);
    cli::session::run(&config, command, &token).await
}

/// Loads configuration from flags, environment, and files.
///
/// # Errors
///
/// Returns [`PullmanError::Configuration`] when ortho-config fails to parse
/// arguments or load configuration files.
fn load_config(flags: Vec<OsString>) -> Result<PullmanConfig, PullmanError> {
    PullmanConfig::load_from_iter(flags).map_err(|error| PullmanError::Configuration {
        message: error.to_string(),
    })
}

/// Logs go to stderr; `RUST_LOG` overrides the level chosen by `--verbose`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "warn,pullman=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ignored = fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Separates positional words from flags.
///
/// The program name stays first among the flags so the result can be handed
/// to the configuration loader. Flags listed in [`VALUE_FLAGS`] take the
/// following argument as their value unless written as `--flag=value`.
/// Everything after `--` is positional.
fn split_arguments(arguments: Vec<OsString>) -> (Vec<String>, Vec<OsString>) {
    let mut positionals = Vec::new();
    let mut flags = Vec::new();
    let mut iter = arguments.into_iter();
    if let Some(program) = iter.next() {
        flags.push(program);
    }

    while let Some(argument) = iter.next() {
        let text = argument.to_string_lossy().into_owned();
        if text == "--" {
            positionals.extend(iter.by_ref().map(|rest| rest.to_string_lossy().into_owned()));
            break;
        }
        if !text.starts_with('-') || text == "-" {
            positionals.push(text);
            continue;
        }
        let takes_value = VALUE_FLAGS.contains(&text.as_str());
        flags.push(argument);
        if takes_value && let Some(value) = iter.next() {
            flags.push(value);
        }
    }

    (positionals, flags)
}
