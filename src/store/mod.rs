// SQLite persistence for sampling markers and captured statistics.
// One versioned row per (network, snapshot) holds both markers and the explicit state;
// every transition is a compare-and-swap on `version`.

mod blob;

use crate::error::{ConductorError, Result};
use crate::models::{
    SamplingAction, SamplingRecord, SamplingState, StatisticsTree, rows_to_tree, tree_to_rows,
};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

/// Current time truncated to whole epoch seconds.
pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

pub struct SamplingRepo {
    pool: SqlitePool,
}

impl SamplingRepo {
    pub async fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self { pool })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sampling_interval (
                network TEXT NOT NULL,
                snapshot TEXT NOT NULL,
                state TEXT NOT NULL,
                begin_at INTEGER,
                end_at INTEGER,
                version INTEGER NOT NULL,
                PRIMARY KEY (network, snapshot)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS snapshot_statistics (
                network TEXT NOT NULL,
                snapshot TEXT NOT NULL,
                captured_at INTEGER NOT NULL,
                data BLOB NOT NULL,
                PRIMARY KEY (network, snapshot)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Current record for the key; an idle record (version 0) when never sampled.
    pub async fn load_record(&self, network: &str, snapshot: &str) -> Result<SamplingRecord> {
        let row = sqlx::query(
            "SELECT state, begin_at, end_at, version FROM sampling_interval WHERE network = $1 AND snapshot = $2",
        )
        .bind(network)
        .bind(snapshot)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(SamplingRecord::idle(network, snapshot));
        };
        let state: String = row.try_get("state")?;
        let state = SamplingState::from_db(&state).ok_or_else(|| {
            ConductorError::Storage(format!(
                "invalid sampling state {:?} for {}/{}",
                state, network, snapshot
            ))
        })?;
        Ok(SamplingRecord {
            network: network.to_string(),
            snapshot: snapshot.to_string(),
            state,
            begin: row.try_get("begin_at")?,
            end: row.try_get("end_at")?,
            version: row.try_get("version")?,
        })
    }

    /// Writes the current time as the marker for `action` and returns it.
    pub async fn record_action(
        &self,
        network: &str,
        snapshot: &str,
        action: SamplingAction,
    ) -> Result<i64> {
        let current = self.load_record(network, snapshot).await?;
        let ts = now_secs();
        self.record_action_at(&current, action, ts).await?;
        Ok(ts)
    }

    /// Overwrites the marker for `action` with `ts` on top of `current`.
    /// Begin moves the record to `open`, end to `closed`.
    #[instrument(skip(self, current), fields(repo = "sampling", operation = "record_action", network = %current.network, snapshot = %current.snapshot))]
    pub async fn record_action_at(
        &self,
        current: &SamplingRecord,
        action: SamplingAction,
        ts: i64,
    ) -> Result<SamplingRecord> {
        let next = next_record(current, action, ts);
        let mut conn = self.pool.acquire().await?;
        write_record(&mut conn, current, &next).await?;
        Ok(next)
    }

    pub async fn read_action(
        &self,
        network: &str,
        snapshot: &str,
        action: SamplingAction,
    ) -> Result<i64> {
        self.load_record(network, snapshot)
            .await?
            .marker(action)
            .ok_or_else(|| {
                ConductorError::NotFound(format!(
                    "no {} marker for {}/{}",
                    action, network, snapshot
                ))
            })
    }

    pub async fn has_action(
        &self,
        network: &str,
        snapshot: &str,
        action: SamplingAction,
    ) -> Result<bool> {
        Ok(self
            .load_record(network, snapshot)
            .await?
            .marker(action)
            .is_some())
    }

    /// Writes the end marker, the closed state and the statistics tree in one transaction.
    #[instrument(skip(self, current, tree), fields(repo = "sampling", operation = "close_interval", network = %current.network, snapshot = %current.snapshot, devices = tree.len()))]
    pub async fn close_interval(
        &self,
        current: &SamplingRecord,
        end_ts: i64,
        tree: &StatisticsTree,
    ) -> Result<SamplingRecord> {
        let next = next_record(current, SamplingAction::End, end_ts);
        let data = blob::encode_rows(tree_to_rows(tree))?;

        let mut tx = self.pool.begin().await?;
        write_record(&mut tx, current, &next).await?;
        upsert_statistics(&mut tx, &current.network, &current.snapshot, end_ts, &data).await?;
        tx.commit().await?;
        Ok(next)
    }

    /// Stores `tree` for the key, replacing any earlier capture.
    #[instrument(skip(self, tree), fields(repo = "sampling", operation = "save_statistics"))]
    pub async fn save_statistics(
        &self,
        network: &str,
        snapshot: &str,
        captured_at: i64,
        tree: &StatisticsTree,
    ) -> Result<()> {
        let data = blob::encode_rows(tree_to_rows(tree))?;
        let mut conn = self.pool.acquire().await?;
        upsert_statistics(&mut conn, network, snapshot, captured_at, &data).await
    }

    /// NotFound means "not sampled yet".
    pub async fn load_statistics(&self, network: &str, snapshot: &str) -> Result<StatisticsTree> {
        let row = sqlx::query(
            "SELECT data FROM snapshot_statistics WHERE network = $1 AND snapshot = $2",
        )
        .bind(network)
        .bind(snapshot)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Err(ConductorError::NotFound(format!(
                "snapshot {}/{} has not been sampled",
                network, snapshot
            )));
        };
        let data: Vec<u8> = row.try_get("data")?;
        Ok(rows_to_tree(blob::decode_rows(&data)?))
    }

    /// Snapshots of `network` that have captured statistics, by name.
    pub async fn list_snapshots(&self, network: &str) -> Result<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT snapshot FROM snapshot_statistics WHERE network = $1 ORDER BY snapshot ASC",
        )
        .bind(network)
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }
}

fn next_record(current: &SamplingRecord, action: SamplingAction, ts: i64) -> SamplingRecord {
    let mut next = current.clone();
    match action {
        SamplingAction::Begin => {
            next.state = SamplingState::Open;
            next.begin = Some(ts);
        }
        SamplingAction::End => {
            next.state = SamplingState::Closed;
            next.end = Some(ts);
        }
    }
    next.version = current.version + 1;
    next
}

async fn write_record(
    conn: &mut SqliteConnection,
    current: &SamplingRecord,
    next: &SamplingRecord,
) -> Result<()> {
    let result = if current.version == 0 {
        sqlx::query(
            "INSERT INTO sampling_interval (network, snapshot, state, begin_at, end_at, version)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (network, snapshot) DO NOTHING",
        )
        .bind(&next.network)
        .bind(&next.snapshot)
        .bind(next.state.as_str())
        .bind(next.begin)
        .bind(next.end)
        .bind(next.version)
        .execute(&mut *conn)
        .await?
    } else {
        sqlx::query(
            "UPDATE sampling_interval SET state = $1, begin_at = $2, end_at = $3, version = $4
             WHERE network = $5 AND snapshot = $6 AND version = $7",
        )
        .bind(next.state.as_str())
        .bind(next.begin)
        .bind(next.end)
        .bind(next.version)
        .bind(&next.network)
        .bind(&next.snapshot)
        .bind(current.version)
        .execute(&mut *conn)
        .await?
    };
    if result.rows_affected() == 0 {
        return Err(ConductorError::conflict(
            &current.network,
            &current.snapshot,
            if next.state == SamplingState::Open { "begin" } else { "end" },
            "sampling record was modified concurrently",
        ));
    }
    Ok(())
}

async fn upsert_statistics(
    conn: &mut SqliteConnection,
    network: &str,
    snapshot: &str,
    captured_at: i64,
    data: &[u8],
) -> Result<()> {
    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT captured_at FROM snapshot_statistics WHERE network = $1 AND snapshot = $2",
    )
    .bind(network)
    .bind(snapshot)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(previous) = existing {
        tracing::debug!(
            network,
            snapshot,
            previous_captured_at = previous,
            "overwriting captured statistics"
        );
    }
    sqlx::query(
        "INSERT OR REPLACE INTO snapshot_statistics (network, snapshot, captured_at, data) VALUES ($1, $2, $3, $4)",
    )
    .bind(network)
    .bind(snapshot)
    .bind(captured_at)
    .bind(data)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
