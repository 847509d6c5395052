//! Pull request cache backed by `SQLite`.
//!
//! Each row holds one hydrated [`PullRequest`] encoded as a versioned JSON
//! record, keyed by repository slug and pull request number. Records are
//! written atomically with a single upsert so a crash mid-write never leaves a
//! partial entry behind. Rows that fail to decode (unknown schema version or
//! malformed JSON) surface as [`PersistenceError::CorruptRecord`], which
//! callers treat as a cache miss.

use camino::Utf8Path;
use chrono::Utc;
use diesel::Connection;
use diesel::OptionalExtension;
use diesel::QueryableByName;
use diesel::RunQueryDsl;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Text};
use diesel::sqlite::SqliteConnection;
use serde::{Deserialize, Serialize};

use crate::pulls::PullRequest;
use crate::telemetry::TelemetrySink;

use super::{PersistenceError, migrate_database};

const PULL_REQUEST_CACHE_TABLE: &str = "pull_request_cache";

/// A cached pull request along with when it was fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPullRequest {
    /// The cached record.
    pub pull_request: PullRequest,
    /// Unix timestamp when the record was fetched from GitHub.
    pub fetched_at_unix: i64,
}

/// Durable storage for hydrated pull request records.
///
/// Implementations must never return a record for a different pull request
/// than the one requested.
#[cfg_attr(test, mockall::automock)]
pub trait PullRequestStore: Send + Sync {
    /// Looks up the record for `pr_number`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when storage is unreadable or the stored
    /// record cannot be decoded.
    fn get(&self, pr_number: u64) -> Result<Option<CachedPullRequest>, PersistenceError>;

    /// Inserts or replaces the record for `pull_request.id`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the write fails.
    fn put(&self, pull_request: &PullRequest) -> Result<(), PersistenceError>;

    /// Removes the record for `pr_number` if present.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the delete fails.
    fn invalidate(&self, pr_number: u64) -> Result<(), PersistenceError>;

    /// Removes every stored record.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the delete fails.
    fn invalidate_all(&self) -> Result<(), PersistenceError>;
}

/// Store used when caching is disabled: nothing is ever found or kept.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledStore;

impl PullRequestStore for DisabledStore {
    fn get(&self, _pr_number: u64) -> Result<Option<CachedPullRequest>, PersistenceError> {
        Ok(None)
    }

    fn put(&self, _pull_request: &PullRequest) -> Result<(), PersistenceError> {
        Ok(())
    }

    fn invalidate(&self, _pr_number: u64) -> Result<(), PersistenceError> {
        Ok(())
    }

    fn invalidate_all(&self) -> Result<(), PersistenceError> {
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "schema_version")]
enum CacheRecord {
    #[serde(rename = "v1")]
    V1(RecordV1),
}

#[derive(Debug, Serialize, Deserialize)]
struct RecordV1 {
    id: u64,
    title: String,
    git_ref: String,
    #[serde(default)]
    commit_hashes: Vec<String>,
    #[serde(default)]
    ci_run_ids: Vec<u64>,
}

impl From<&PullRequest> for CacheRecord {
    fn from(pull_request: &PullRequest) -> Self {
        Self::V1(RecordV1 {
            id: pull_request.id,
            title: pull_request.title.clone(),
            git_ref: pull_request.git_ref.clone(),
            commit_hashes: pull_request.commit_hashes.clone(),
            ci_run_ids: pull_request.ci_run_ids.clone(),
        })
    }
}

impl From<CacheRecord> for PullRequest {
    fn from(record: CacheRecord) -> Self {
        match record {
            CacheRecord::V1(v1) => Self {
                id: v1.id,
                title: v1.title,
                commit_hashes: v1.commit_hashes,
                git_ref: v1.git_ref,
                ci_run_ids: v1.ci_run_ids,
            },
        }
    }
}

/// SQLite-backed [`PullRequestStore`] scoped to one repository.
#[derive(Debug, Clone)]
pub struct SqlitePullRequestStore {
    database_url: String,
    repository: String,
}

impl SqlitePullRequestStore {
    /// Create a store targeting an already-migrated database.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::BlankDatabaseUrl`] when the URL is blank.
    pub fn new(
        database_url: impl Into<String>,
        repository: impl Into<String>,
    ) -> Result<Self, PersistenceError> {
        let database_url_string = database_url.into();
        if database_url_string.trim().is_empty() {
            return Err(PersistenceError::BlankDatabaseUrl);
        }
        Ok(Self {
            database_url: database_url_string,
            repository: repository.into(),
        })
    }

    /// Opens the cache file at `path`, creating its directory and applying
    /// pending migrations first.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the directory cannot be created or
    /// migrations fail.
    pub fn open(
        path: &Utf8Path,
        repository: impl Into<String>,
        telemetry: &dyn TelemetrySink,
    ) -> Result<Self, PersistenceError> {
        if path.as_str().trim().is_empty() {
            return Err(PersistenceError::BlankDatabaseUrl);
        }
        if let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) {
            create_cache_dir(parent)?;
        }
        migrate_database(path.as_str(), telemetry)?;
        Self::new(path.as_str(), repository)
    }

    /// Returns the repository slug rows are scoped to.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Inserts or replaces a record with an explicit fetch timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the schema is missing or the write
    /// fails.
    pub fn put_at(
        &self,
        pull_request: &PullRequest,
        fetched_at_unix: i64,
    ) -> Result<(), PersistenceError> {
        let record = serde_json::to_string(&CacheRecord::from(pull_request)).map_err(|error| {
            PersistenceError::WriteFailed {
                message: error.to_string(),
            }
        })?;

        let mut connection = self.establish_connection()?;

        sql_query(
            "INSERT INTO pull_request_cache (repository, pr_number, record, fetched_at_unix) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(repository, pr_number) DO UPDATE SET \
               record = excluded.record, \
               fetched_at_unix = excluded.fetched_at_unix, \
               updated_at = CURRENT_TIMESTAMP;",
        )
        .bind::<Text, _>(self.repository.as_str())
        .bind::<BigInt, _>(pr_number_to_i64(pull_request.id))
        .bind::<Text, _>(record)
        .bind::<BigInt, _>(fetched_at_unix)
        .execute(&mut connection)
        .map(drop)
        .map_err(|error| Self::map_write_error(&mut connection, &error))
    }

    /// Returns the current unix timestamp in seconds.
    #[must_use]
    pub fn now_unix_seconds() -> i64 {
        Utc::now().timestamp()
    }

    fn establish_connection(&self) -> Result<SqliteConnection, PersistenceError> {
        SqliteConnection::establish(&self.database_url).map_err(|error| {
            PersistenceError::ConnectionFailed {
                message: error.to_string(),
            }
        })
    }

    fn cache_table_exists(
        connection: &mut SqliteConnection,
    ) -> Result<bool, diesel::result::Error> {
        #[derive(Debug, QueryableByName)]
        struct Row {
            #[diesel(sql_type = BigInt)]
            count: i64,
        }

        let row: Row = sql_query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = ?;",
        )
        .bind::<Text, _>(PULL_REQUEST_CACHE_TABLE)
        .get_result(connection)?;

        Ok(row.count > 0)
    }

    fn map_error_with_schema_check<F>(
        connection: &mut SqliteConnection,
        error: &diesel::result::Error,
        create_error: F,
    ) -> PersistenceError
    where
        F: Fn(String) -> PersistenceError,
    {
        match Self::cache_table_exists(connection) {
            Ok(false) => PersistenceError::SchemaNotInitialised,
            Ok(true) => create_error(error.to_string()),
            Err(check_error) => create_error(format!(
                "schema presence check failed: {check_error}; original error: {error}"
            )),
        }
    }

    fn map_query_error(
        connection: &mut SqliteConnection,
        error: &diesel::result::Error,
    ) -> PersistenceError {
        Self::map_error_with_schema_check(connection, error, |message| {
            PersistenceError::QueryFailed { message }
        })
    }

    fn map_write_error(
        connection: &mut SqliteConnection,
        error: &diesel::result::Error,
    ) -> PersistenceError {
        Self::map_error_with_schema_check(connection, error, |message| {
            PersistenceError::WriteFailed { message }
        })
    }
}

impl PullRequestStore for SqlitePullRequestStore {
    fn get(&self, pr_number: u64) -> Result<Option<CachedPullRequest>, PersistenceError> {
        #[derive(Debug, QueryableByName)]
        struct Row {
            #[diesel(sql_type = Text)]
            record: String,
            #[diesel(sql_type = BigInt)]
            fetched_at_unix: i64,
        }

        let mut connection = self.establish_connection()?;

        let result: Option<Row> = sql_query(
            "SELECT record, fetched_at_unix FROM pull_request_cache \
             WHERE repository = ? AND pr_number = ? \
             LIMIT 1;",
        )
        .bind::<Text, _>(self.repository.as_str())
        .bind::<BigInt, _>(pr_number_to_i64(pr_number))
        .get_result(&mut connection)
        .optional()
        .map_err(|error| Self::map_query_error(&mut connection, &error))?;

        let Some(row) = result else {
            return Ok(None);
        };

        let pull_request = decode_record(pr_number, &row.record)?;
        Ok(Some(CachedPullRequest {
            pull_request,
            fetched_at_unix: row.fetched_at_unix,
        }))
    }

    fn put(&self, pull_request: &PullRequest) -> Result<(), PersistenceError> {
        self.put_at(pull_request, Self::now_unix_seconds())
    }

    fn invalidate(&self, pr_number: u64) -> Result<(), PersistenceError> {
        let mut connection = self.establish_connection()?;

        sql_query("DELETE FROM pull_request_cache WHERE repository = ? AND pr_number = ?;")
            .bind::<Text, _>(self.repository.as_str())
            .bind::<BigInt, _>(pr_number_to_i64(pr_number))
            .execute(&mut connection)
            .map(drop)
            .map_err(|error| Self::map_write_error(&mut connection, &error))
    }

    fn invalidate_all(&self) -> Result<(), PersistenceError> {
        let mut connection = self.establish_connection()?;

        sql_query("DELETE FROM pull_request_cache;")
            .execute(&mut connection)
            .map(drop)
            .map_err(|error| Self::map_write_error(&mut connection, &error))
    }
}

fn decode_record(pr_number: u64, raw: &str) -> Result<PullRequest, PersistenceError> {
    let record: CacheRecord =
        serde_json::from_str(raw).map_err(|error| PersistenceError::CorruptRecord {
            pr_number,
            message: error.to_string(),
        })?;
    let pull_request = PullRequest::from(record);
    if pull_request.id != pr_number {
        return Err(PersistenceError::CorruptRecord {
            pr_number,
            message: format!("record belongs to #{}", pull_request.id),
        });
    }
    Ok(pull_request)
}

fn create_cache_dir(directory: &Utf8Path) -> Result<(), PersistenceError> {
    crate::fs::ensure_dir(directory)
        .map(drop)
        .map_err(|error| PersistenceError::DirectoryCreationFailed {
            path: directory.to_string(),
            message: error.to_string(),
        })
}

fn pr_number_to_i64(pr_number: u64) -> i64 {
    // Diesel's `BigInt` binding uses `i64`; saturate.
    i64::try_from(pr_number).unwrap_or(i64::MAX)
}
