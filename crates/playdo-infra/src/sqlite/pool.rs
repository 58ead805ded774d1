//! SQLite connection pools for the conversation store.
//!
//! Writes go through a single connection so that sequence-number inserts are
//! serialized; reads use a separate read-only pool. The schema lives in
//! `migrations/` and is applied before the read pool opens.

use std::str::FromStr;
use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

const READER_CONNECTIONS: u32 = 8;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Read and write pools over one SQLite database in WAL mode.
#[derive(Clone)]
pub struct DatabasePool {
    /// Read-only connections.
    pub reader: SqlitePool,
    /// The single write connection.
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open (creating if needed) the database at `database_url` and migrate it.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = connect_options(database_url)?;

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await?;
        MIGRATOR.run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(READER_CONNECTIONS)
            .connect_with(options.read_only(true))
            .await?;

        tracing::debug!(
            database_url,
            migrations = MIGRATOR.iter().count(),
            "Conversation store ready"
        );

        Ok(Self { reader, writer })
    }

    /// Close both pools, waiting for in-flight queries to finish.
    pub async fn close(&self) {
        self.writer.close().await;
        self.reader.close().await;
    }
}

fn connect_options(database_url: &str) -> Result<SqliteConnectOptions, sqlx::Error> {
    Ok(SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT))
}
