//! CLI command handlers.
//!
//! - [`list`]: list open pull requests, optionally filtered by title
//! - [`show`]: print a URL or tracking ref for a resolved pull request
//! - [`errors`]: write a script reproducing a pull request's failed tests
//!
//! [`session`] wires configuration, the local checkout, GitHub gateways, and
//! the cache store together. Output formatting lives in [`output`].

pub mod errors;
pub mod list;
pub mod output;
pub mod session;
pub mod show;

use pullman::UrlKind;

/// A `pullman` subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// List open pull requests.
    List,
    /// Print a browser URL for the resolved pull request.
    Url(UrlKind),
    /// Print the tracking ref of the resolved pull request.
    Ref,
    /// Write the failed-test reproduction script.
    Errors,
}

impl Command {
    /// Parses a command word.
    #[must_use]
    pub fn parse(word: &str) -> Option<Self> {
        match word {
            "list" => Some(Self::List),
            "url" => Some(Self::Url(UrlKind::PullRequest)),
            "commit_url" => Some(Self::Url(UrlKind::Commit)),
            "hud_url" => Some(Self::Url(UrlKind::HudDashboard)),
            "ref_url" => Some(Self::Url(UrlKind::RefTree)),
            "ref" => Some(Self::Ref),
            "errors" => Some(Self::Errors),
            _ => None,
        }
    }
}

/// Splits positional words into a command and its token.
///
/// The command defaults to `list` when the first word is not a command, in
/// which case every word belongs to the token.
#[must_use]
pub fn command_and_token(positionals: &[String]) -> (Command, String) {
    match positionals.split_first() {
        Some((first, rest)) => Command::parse(first).map_or_else(
            || (Command::List, positionals.join(" ")),
            |command| (command, rest.join(" ")),
        ),
        None => (Command::List, String::new()),
    }
}
