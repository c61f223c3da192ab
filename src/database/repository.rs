/*!
 * Repository for job and credential persistence.
 *
 * All queries go through `DatabaseConnection::execute_async` so the async
 * runtime never blocks on SQLite. Jobs are upserted whole; pending jobs
 * come back in discovery order (rowid), which is the order the scheduler
 * honors.
 */

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{OptionalExtension, params};
use uuid::Uuid;

use super::connection::DatabaseConnection;
use super::models::JobRecord;
use crate::jobs::models::Job;

/// One stored credential
#[derive(Debug, Clone)]
pub struct StoredKey {
    /// Stable identifier for management commands
    pub id: String,
    /// The opaque key string
    pub key: String,
}

/// Repository for database operations
#[derive(Debug, Clone)]
pub struct Repository {
    db: DatabaseConnection,
}

impl Repository {
    /// Create a repository over an existing connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository over the default database
    pub fn new_default() -> Result<Self> {
        Ok(Self::new(DatabaseConnection::new_default()?))
    }

    /// Create a repository over an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        Ok(Self::new(DatabaseConnection::new_in_memory()?))
    }

    /// The underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // =========================================================================
    // Jobs
    // =========================================================================

    /// Insert or update a job
    pub async fn save_job(&self, job: &Job) -> Result<()> {
        let record = JobRecord::from_job(job)?;

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO jobs (
                        id, style, raw_input, input_hash, status, current_step,
                        segments, stage_flags, character_bible, snippets, scenes,
                        log, error_message, created_at, updated_at
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                    ON CONFLICT(id) DO UPDATE SET
                        status = excluded.status,
                        current_step = excluded.current_step,
                        stage_flags = excluded.stage_flags,
                        character_bible = excluded.character_bible,
                        snippets = excluded.snippets,
                        scenes = excluded.scenes,
                        log = excluded.log,
                        error_message = excluded.error_message,
                        updated_at = excluded.updated_at
                    "#,
                    params![
                        record.id,
                        record.style,
                        record.raw_input,
                        record.input_hash,
                        record.status,
                        record.current_step,
                        record.segments_json,
                        record.stage_flags_json,
                        record.character_bible_json,
                        record.snippets_json,
                        record.scenes_json,
                        record.log_json,
                        record.error_message,
                        record.created_at,
                        Utc::now().to_rfc3339(),
                    ],
                )
                .context("Failed to save job")?;
                Ok(())
            })
            .await
    }

    /// Load a single job by id
    pub async fn load_job(&self, id: &str) -> Result<Option<Job>> {
        let id = id.to_string();

        let record = self
            .db
            .execute_async(move |conn| {
                conn.query_row(
                    &format!("{} WHERE id = ?1", SELECT_JOBS),
                    params![id],
                    row_to_record,
                )
                .optional()
                .context("Failed to load job")
            })
            .await?;

        record.map(JobRecord::into_job).transpose()
    }

    /// Load all jobs still waiting to run, in discovery order
    pub async fn load_pending_jobs(&self) -> Result<Vec<Job>> {
        self.load_jobs_where("WHERE status IN ('idle', 'queued', 'processing') ORDER BY rowid")
            .await
    }

    /// Load every job, in discovery order
    pub async fn load_all_jobs(&self) -> Result<Vec<Job>> {
        self.load_jobs_where("ORDER BY rowid").await
    }

    /// Find a non-terminal job with the same input fingerprint, if any
    pub async fn find_unfinished_by_hash(&self, input_hash: &str) -> Result<Option<Job>> {
        let hash = input_hash.to_string();

        let record = self
            .db
            .execute_async(move |conn| {
                conn.query_row(
                    &format!(
                        "{} WHERE input_hash = ?1 AND status NOT IN ('completed', 'error') \
                         ORDER BY rowid LIMIT 1",
                        SELECT_JOBS
                    ),
                    params![hash],
                    row_to_record,
                )
                .optional()
                .context("Failed to look up job by input hash")
            })
            .await?;

        record.map(JobRecord::into_job).transpose()
    }

    async fn load_jobs_where(&self, clause: &str) -> Result<Vec<Job>> {
        let sql = format!("{} {}", SELECT_JOBS, clause);

        let records = self
            .db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(&sql).context("Failed to prepare job query")?;
                let rows = stmt
                    .query_map([], row_to_record)
                    .context("Failed to query jobs")?;

                let mut records = Vec::new();
                for row in rows {
                    records.push(row.context("Failed to read job row")?);
                }
                Ok(records)
            })
            .await?;

        records.into_iter().map(JobRecord::into_job).collect()
    }

    // =========================================================================
    // API keys
    // =========================================================================

    /// Store a credential, returning its id.
    ///
    /// Storing a key that already exists returns the existing id.
    pub async fn add_key(&self, key: &str) -> Result<String> {
        let key = key.to_string();

        self.db
            .execute_async(move |conn| {
                if let Some(existing) = conn
                    .query_row(
                        "SELECT id FROM api_keys WHERE key_value = ?1",
                        params![key],
                        |row| row.get::<_, String>(0),
                    )
                    .optional()
                    .context("Failed to look up existing key")?
                {
                    return Ok(existing);
                }

                let id = Uuid::new_v4().to_string();
                conn.execute(
                    "INSERT INTO api_keys (id, key_value, created_at) VALUES (?1, ?2, ?3)",
                    params![id, key, Utc::now().to_rfc3339()],
                )
                .context("Failed to store API key")?;
                Ok(id)
            })
            .await
    }

    /// Load every stored credential in insertion order
    pub async fn load_keys(&self) -> Result<Vec<StoredKey>> {
        self.db
            .execute_async(|conn| {
                let mut stmt = conn
                    .prepare("SELECT id, key_value FROM api_keys ORDER BY rowid")
                    .context("Failed to prepare key query")?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok(StoredKey {
                            id: row.get(0)?,
                            key: row.get(1)?,
                        })
                    })
                    .context("Failed to query keys")?;

                let mut keys = Vec::new();
                for row in rows {
                    keys.push(row.context("Failed to read key row")?);
                }
                Ok(keys)
            })
            .await
    }

    /// Remove a stored credential by id. Returns true if a row was removed.
    pub async fn remove_key(&self, id: &str) -> Result<bool> {
        let id = id.to_string();

        self.db
            .execute_async(move |conn| {
                let removed = conn
                    .execute("DELETE FROM api_keys WHERE id = ?1", params![id])
                    .context("Failed to remove API key")?;
                Ok(removed > 0)
            })
            .await
    }
}

const SELECT_JOBS: &str = r#"
    SELECT id, style, raw_input, input_hash, status, current_step,
           segments, stage_flags, character_bible, snippets, scenes,
           log, error_message, created_at
    FROM jobs
"#;

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<JobRecord> {
    Ok(JobRecord {
        id: row.get(0)?,
        style: row.get(1)?,
        raw_input: row.get(2)?,
        input_hash: row.get(3)?,
        status: row.get(4)?,
        current_step: row.get(5)?,
        segments_json: row.get(6)?,
        stage_flags_json: row.get(7)?,
        character_bible_json: row.get(8)?,
        snippets_json: row.get(9)?,
        scenes_json: row.get(10)?,
        log_json: row.get(11)?,
        error_message: row.get(12)?,
        created_at: row.get(13)?,
    })
}
