/*!
SQLite checkpoint backend.

Durable implementation of the [`Checkpointer`] trait on top of `sqlx`.
Each save writes one row keyed by `(thread_id, step)` with the serialized
persisted-checkpoint payload; `INSERT OR REPLACE` gives last-write-wins
per step. The full step history is retained, and [`load_step`] /
[`list_steps`] expose it for inspection and time-travel tooling; the
runner itself only consumes [`load_latest`].

The schema is created on connect:

```sql
CREATE TABLE IF NOT EXISTS checkpoints (
    thread_id  TEXT    NOT NULL,
    step       INTEGER NOT NULL,
    payload    TEXT    NOT NULL,
    created_at TEXT    NOT NULL,
    PRIMARY KEY (thread_id, step)
);
```

[`load_step`]: SqliteCheckpointer::load_step
[`list_steps`]: SqliteCheckpointer::list_steps
*/

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::instrument;

use super::checkpointer::{Checkpoint, Checkpointer, CheckpointerError, Result};
use super::persistence::PersistedCheckpoint;
use crate::utils::json_ext::JsonSerializable;

/// Durable checkpoint storage backed by SQLite.
#[derive(Clone, Debug)]
pub struct SqliteCheckpointer {
    pool: SqlitePool,
}

fn backend(error: sqlx::Error) -> CheckpointerError {
    CheckpointerError::Backend(error.to_string())
}

impl SqliteCheckpointer {
    /// Connect to a SQLite database URL (e.g. `sqlite://workflows.db`),
    /// creating the file and schema as needed.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(backend)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(backend)?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS checkpoints (
                thread_id  TEXT    NOT NULL,
                step       INTEGER NOT NULL,
                payload    TEXT    NOT NULL,
                created_at TEXT    NOT NULL,
                PRIMARY KEY (thread_id, step)
            )",
        )
        .execute(&pool)
        .await
        .map_err(backend)?;
        Ok(Self { pool })
    }

    /// Connect using `GRAPHLOOM_SQLITE_URL`, falling back to
    /// `SQLITE_DB_NAME` (default `graphloom.db`) in the working
    /// directory. Reads `.env` via dotenvy first.
    pub async fn connect_default() -> Result<Self> {
        dotenvy::dotenv().ok();
        let url = std::env::var("GRAPHLOOM_SQLITE_URL").unwrap_or_else(|_| {
            let name =
                std::env::var("SQLITE_DB_NAME").unwrap_or_else(|_| "graphloom.db".to_string());
            format!("sqlite://{name}")
        });
        Self::connect(&url).await
    }

    /// Fetch one specific step of a thread's history.
    #[instrument(skip(self), err)]
    pub async fn load_step(&self, thread_id: &str, step: u64) -> Result<Option<Checkpoint>> {
        let row = sqlx::query(
            "SELECT payload FROM checkpoints WHERE thread_id = ?1 AND step = ?2",
        )
        .bind(thread_id)
        .bind(step as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        row.map(|row| Self::decode_row(&row)).transpose()
    }

    /// All stored step numbers for a thread, ascending.
    #[instrument(skip(self), err)]
    pub async fn list_steps(&self, thread_id: &str) -> Result<Vec<u64>> {
        let rows = sqlx::query(
            "SELECT step FROM checkpoints WHERE thread_id = ?1 ORDER BY step ASC",
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        Ok(rows
            .into_iter()
            .map(|row| row.get::<i64, _>("step") as u64)
            .collect())
    }

    fn decode_row(row: &sqlx::sqlite::SqliteRow) -> Result<Checkpoint> {
        let payload: String = row.get("payload");
        let persisted = PersistedCheckpoint::from_json_str(&payload)?;
        Ok(Checkpoint::try_from(persisted)?)
    }
}

#[async_trait]
impl Checkpointer for SqliteCheckpointer {
    #[instrument(skip(self, checkpoint), fields(thread_id = %checkpoint.thread_id, step = checkpoint.step), err)]
    async fn save(&self, checkpoint: Checkpoint) -> Result<()> {
        let persisted = PersistedCheckpoint::from(&checkpoint);
        let payload = persisted.to_json_string()?;
        sqlx::query(
            "INSERT OR REPLACE INTO checkpoints (thread_id, step, payload, created_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&checkpoint.thread_id)
        .bind(checkpoint.step as i64)
        .bind(payload)
        .bind(checkpoint.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let row = sqlx::query(
            "SELECT payload FROM checkpoints
             WHERE thread_id = ?1 ORDER BY step DESC LIMIT 1",
        )
        .bind(thread_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        row.map(|row| Self::decode_row(&row)).transpose()
    }
}
