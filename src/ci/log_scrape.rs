//! Reproduction command scraping from CI job logs.

/// Line the test harness prints right before the reproduction command.
pub const REPRODUCTION_MARKER: &str =
    "To execute this test, run the following from the base repo dir";

/// Returns every reproduction command found in `log`, in log order.
///
/// Each command is the line following a [`REPRODUCTION_MARKER`] line, with
/// leading words (timestamps, log prefixes) dropped until one is an
/// environment assignment or starts with `python`. A marker whose next line
/// holds no such word contributes nothing.
#[must_use]
pub fn scrape_commands(log: &str) -> Vec<String> {
    let mut lines = log.lines();
    let mut commands = Vec::new();
    while let Some(line) = lines.next() {
        if !line.contains(REPRODUCTION_MARKER) {
            continue;
        }
        let Some(next) = lines.next() else {
            break;
        };
        let words: Vec<&str> = next
            .split_whitespace()
            .skip_while(|word| !starts_command(word))
            .collect();
        if !words.is_empty() {
            commands.push(words.join(" "));
        }
    }
    commands
}

/// Prefixes the assignments in `markers` that `command` does not already set.
#[must_use]
pub fn apply_markers(command: &str, markers: &[&str]) -> String {
    let missing: Vec<&str> = markers
        .iter()
        .copied()
        .filter(|marker| !command.split_whitespace().any(|word| word == *marker))
        .collect();
    if missing.is_empty() {
        return command.to_owned();
    }
    format!("{} {command}", missing.join(" "))
}

/// Returns true for `NAME=value` words where `NAME` is `[A-Z_]+`.
#[must_use]
pub fn is_env_assignment(word: &str) -> bool {
    word.split_once('=').is_some_and(|(name, _)| {
        !name.is_empty() && name.bytes().all(|byte| byte.is_ascii_uppercase() || byte == b'_')
    })
}

fn starts_command(word: &str) -> bool {
    is_env_assignment(word) || word.starts_with("python")
}
