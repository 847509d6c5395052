//! Schema migrations for the pull request cache.
//!
//! The cache file is migrated every time it is opened; already-applied
//! migrations are skipped, so opening an up-to-date cache costs one query.

use diesel::Connection;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::telemetry::{TelemetryEvent, TelemetrySink};

use super::PersistenceError;

/// Cache migrations compiled into the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Version of the newest cache migration.
pub const CURRENT_SCHEMA_VERSION: &str = "20261019000000";

/// Version of the newest migration applied to a cache file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaVersion(String);

impl SchemaVersion {
    /// Returns the version string, e.g. `20261019000000`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Brings the cache at `database_url` up to [`CURRENT_SCHEMA_VERSION`].
///
/// The applied version is reported as `SchemaVersionRecorded` telemetry.
///
/// # Errors
///
/// Returns [`PersistenceError`] when the file cannot be opened, a migration
/// fails, or no applied migration can be found afterwards.
pub fn migrate_database(
    database_url: &str,
    telemetry: &dyn TelemetrySink,
) -> Result<SchemaVersion, PersistenceError> {
    let url = database_url.trim();
    if url.is_empty() {
        return Err(PersistenceError::BlankDatabaseUrl);
    }

    let mut connection =
        SqliteConnection::establish(url).map_err(|error| PersistenceError::ConnectionFailed {
            message: error.to_string(),
        })?;
    connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(|error| PersistenceError::MigrationFailed {
            message: error.to_string(),
        })?;

    let applied = connection.applied_migrations().map_err(|error| {
        PersistenceError::SchemaVersionQueryFailed {
            message: error.to_string(),
        }
    })?;
    let newest = applied
        .iter()
        .max()
        .ok_or(PersistenceError::MissingSchemaVersion)?;
    let schema_version = SchemaVersion(newest.to_string());

    telemetry.record(TelemetryEvent::SchemaVersionRecorded {
        schema_version: schema_version.as_str().to_owned(),
    });
    Ok(schema_version)
}
