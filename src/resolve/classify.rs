//! Token classification into an ordered lookup plan.

use std::fmt;

use crate::pulls::MIN_COMMIT_PREFIX_LEN;

/// Prefix that routes a token straight to title search.
pub const FORCE_SEARCH_PREFIX: &str = ":/";

/// One way of turning a token into a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Read the stacking metadata embedded in the commit at `HEAD`.
    ByContext,
    /// Look the token up as a pull request number.
    ById(u64),
    /// Resolve the token as a git revision and look up its commit.
    ByCommit(String),
    /// Case-insensitive substring search over titles.
    BySearch(String),
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByContext => f.write_str("current commit"),
            Self::ById(id) => write!(f, "pull request #{id}"),
            Self::ByCommit(revision) => write!(f, "commit '{revision}'"),
            Self::BySearch(text) => write!(f, "title search for '{text}'"),
        }
    }
}

struct Rule {
    classify: fn(&str) -> Option<Strategy>,
    /// When the rule matches, no later rule is consulted.
    exclusive: bool,
}

/// Priority order. Evaluation stops at the first exclusive match.
const RULES: [Rule; 5] = [
    Rule {
        classify: context,
        exclusive: true,
    },
    Rule {
        classify: forced_search,
        exclusive: true,
    },
    Rule {
        classify: pull_request_number,
        exclusive: false,
    },
    Rule {
        classify: revision,
        exclusive: false,
    },
    Rule {
        classify: search,
        exclusive: false,
    },
];

/// Classifies `token` into the strategies to try, highest priority first.
///
/// The plan is never empty: any non-empty token at least ends in a title
/// search.
#[must_use]
pub fn classify(token: &str) -> Vec<Strategy> {
    let trimmed = token.trim();
    let mut plan = Vec::new();
    for rule in &RULES {
        let Some(strategy) = (rule.classify)(trimmed) else {
            continue;
        };
        if rule.exclusive {
            return vec![strategy];
        }
        plan.push(strategy);
    }
    plan
}

fn context(token: &str) -> Option<Strategy> {
    token.is_empty().then_some(Strategy::ByContext)
}

fn forced_search(token: &str) -> Option<Strategy> {
    token
        .strip_prefix(FORCE_SEARCH_PREFIX)
        .map(|text| Strategy::BySearch(text.trim().to_owned()))
}

fn pull_request_number(token: &str) -> Option<Strategy> {
    let digits = token.strip_prefix('#').unwrap_or(token);
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|id| *id > 0).map(Strategy::ById)
}

fn revision(token: &str) -> Option<Strategy> {
    // Revision expressions never contain whitespace; `#` ids are not refs.
    let is_revision = !token.starts_with('#') && !token.chars().any(char::is_whitespace);
    is_revision.then(|| Strategy::ByCommit(token.to_owned()))
}

fn search(token: &str) -> Option<Strategy> {
    Some(Strategy::BySearch(token.to_owned()))
}

/// Returns true when `token` could be an abbreviated or full commit SHA.
#[must_use]
pub fn is_commit_shaped(token: &str) -> bool {
    (MIN_COMMIT_PREFIX_LEN..=40).contains(&token.len())
        && token.bytes().all(|byte| byte.is_ascii_hexdigit())
}
