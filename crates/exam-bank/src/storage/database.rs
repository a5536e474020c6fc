//! SQLite problem bank
//!
//! Each ingested file gets its own connection and a single transaction,
//! committed once its chunk loop finishes.

use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::question::split_choices;
use crate::types::{ParsedQuestion, StoredProblem};

const INSERT_PROBLEM: &str = r#"
    INSERT INTO problems (subject, question, choices, answer, explanation, source)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#;

/// SQLite-backed question store
#[derive(Debug, Clone)]
pub struct ProblemStore {
    path: PathBuf,
}

impl ProblemStore {
    /// Open (creating if needed) the database at `path` and make sure the schema exists
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::storage(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let store = Self { path };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Open an existing database without creating anything.
    ///
    /// Returns `None` when no database file exists at `path` yet.
    pub fn open_existing<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.is_file() {
            return Ok(None);
        }
        Self::open(path).map(Some)
    }

    /// Database file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.path).map_err(|e| {
            Error::storage(format!("Failed to open database {}: {}", self.path.display(), e))
        })
    }

    /// Create the `problems` table if it does not exist. Never alters existing data.
    pub fn ensure_schema(&self) -> Result<()> {
        let conn = self.connect()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS problems (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subject TEXT,
                question TEXT NOT NULL,
                choices TEXT,
                answer TEXT NOT NULL,
                explanation TEXT,
                wrong_count INTEGER NOT NULL DEFAULT 0,
                source TEXT
            );
            "#,
        )
        .map_err(|e| Error::storage(format!("Failed to create schema: {}", e)))?;

        tracing::debug!("Schema ready at {}", self.path.display());
        Ok(())
    }

    /// Insert a single question on a fresh connection.
    ///
    /// Returns `Ok(false)` without writing when the question has no stem or answer.
    pub fn insert(&self, question: &ParsedQuestion) -> Result<bool> {
        if !question.is_valid() {
            return Ok(false);
        }
        let conn = self.connect()?;
        insert_row(&conn, question)?;
        Ok(true)
    }

    /// Start the per-file write transaction
    pub fn begin_file(&self) -> Result<ProblemWriter> {
        let conn = self.connect()?;
        conn.execute_batch("BEGIN")
            .map_err(|e| Error::storage(format!("Failed to begin transaction: {}", e)))?;

        Ok(ProblemWriter {
            conn,
            inserted: 0,
            finished: false,
        })
    }

    /// Total stored problems
    pub fn count(&self) -> Result<usize> {
        let conn = self.connect()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM problems", [], |row| row.get(0))
            .map_err(|e| Error::storage(format!("Failed to count problems: {}", e)))?;
        Ok(count as usize)
    }

    /// Problems stored from one source file
    pub fn count_by_source(&self, source: &str) -> Result<usize> {
        let conn = self.connect()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM problems WHERE source = ?1",
                params![source],
                |row| row.get(0),
            )
            .map_err(|e| Error::storage(format!("Failed to count problems: {}", e)))?;
        Ok(count as usize)
    }

    /// First `limit` problems in insertion order
    pub fn list_problems(&self, limit: usize) -> Result<Vec<StoredProblem>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(
                r#"
                SELECT id, subject, question, choices, answer, explanation, wrong_count, source
                FROM problems
                ORDER BY id
                LIMIT ?1
                "#,
            )
            .map_err(|e| Error::storage(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(StoredProblem {
                    id: row.get(0)?,
                    subject: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    question: row.get(2)?,
                    choices: split_choices(&row.get::<_, Option<String>>(3)?.unwrap_or_default()),
                    answer: row.get(4)?,
                    explanation: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                    wrong_count: row.get(6)?,
                    source: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
                })
            })
            .map_err(|e| Error::storage(format!("Failed to query problems: {}", e)))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::storage(format!("Failed to read problem row: {}", e)))
    }
}

fn insert_row(conn: &Connection, question: &ParsedQuestion) -> Result<()> {
    conn.execute(
        INSERT_PROBLEM,
        params![
            question.subject,
            question.question,
            question.choices_text(),
            question.answer,
            question.explanation,
            question.source,
        ],
    )
    .map_err(|e| Error::storage(format!("Failed to insert problem: {}", e)))?;
    Ok(())
}

/// Open transaction for one file's questions.
///
/// Dropping the writer without calling [`ProblemWriter::commit`] rolls back
/// everything it inserted.
pub struct ProblemWriter {
    conn: Connection,
    inserted: usize,
    finished: bool,
}

impl ProblemWriter {
    /// Insert within the file transaction; invalid questions are skipped with `Ok(false)`
    pub fn insert(&mut self, question: &ParsedQuestion) -> Result<bool> {
        if !question.is_valid() {
            return Ok(false);
        }
        insert_row(&self.conn, question)?;
        self.inserted += 1;
        Ok(true)
    }

    /// Commit and close; returns the number of rows written
    pub fn commit(mut self) -> Result<usize> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| Error::storage(format!("Failed to commit: {}", e)))?;
        self.finished = true;
        Ok(self.inserted)
    }
}

impl Drop for ProblemWriter {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.conn.execute_batch("ROLLBACK") {
            tracing::warn!("Rollback failed: {}", e);
        } else if self.inserted > 0 {
            tracing::warn!("Rolled back {} uncommitted problems", self.inserted);
        }
    }
}
