//! Error types for the local pull request cache.

use thiserror::Error;

/// Errors returned while opening, migrating, or querying the cache database.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    /// The database URL/path was present but blank.
    #[error("cache path must not be blank")]
    BlankDatabaseUrl,

    /// The directory holding the cache database could not be created.
    #[error("failed to create cache directory '{path}': {message}")]
    DirectoryCreationFailed {
        /// Directory that could not be created.
        path: String,
        /// Error detail from the filesystem.
        message: String,
    },

    /// Establishing a `SQLite` connection failed.
    #[error("failed to connect to SQLite database: {message}")]
    ConnectionFailed {
        /// Error detail from Diesel.
        message: String,
    },

    /// Running pending migrations failed.
    #[error("failed to run database migrations: {message}")]
    MigrationFailed {
        /// Error detail from Diesel migrations.
        message: String,
    },

    /// Reading the schema version from the migration table failed.
    #[error("failed to read schema version after migrations: {message}")]
    SchemaVersionQueryFailed {
        /// Error detail from Diesel query execution.
        message: String,
    },

    /// The migrations completed but no schema version could be found.
    #[error("no schema version recorded after migrations ran")]
    MissingSchemaVersion,

    /// The cache table does not exist yet.
    #[error("cache schema is not initialised")]
    SchemaNotInitialised,

    /// A read query failed.
    #[error("cache query failed: {message}")]
    QueryFailed {
        /// Error detail from Diesel.
        message: String,
    },

    /// A write or delete failed.
    #[error("cache write failed: {message}")]
    WriteFailed {
        /// Error detail from Diesel.
        message: String,
    },

    /// A stored record could not be decoded or belongs to another entry.
    #[error("cached record for #{pr_number} is unreadable: {message}")]
    CorruptRecord {
        /// Pull request number the record was stored under.
        pr_number: u64,
        /// Decoding failure detail.
        message: String,
    },
}
