//! Local persistence and database migrations.
//!
//! Hydrated pull request records are cached in a local `SQLite` database so
//! later sessions can skip the GitHub round trips. The schema is managed with
//! Diesel migrations embedded in the binary.

mod error;
mod migrator;
mod pull_request_cache;

pub use error::PersistenceError;
pub use migrator::{CURRENT_SCHEMA_VERSION, SchemaVersion, migrate_database};
pub use pull_request_cache::{
    CachedPullRequest, DisabledStore, PullRequestStore, SqlitePullRequestStore,
};

#[cfg(test)]
pub use pull_request_cache::MockPullRequestStore;
