use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tgstat_core::domain::ChannelRecord;
use tgstat_core::ports::{ChannelRepository, Result};
use tgstat_core::CoreError;

const SCHEMA_VERSION: i32 = 1;

const SELECT_COLUMNS: &str = "SELECT telegram_link, channel_url, title, subscribers, \
     average_posts_per_7_days, last_updated FROM channels";

/// SQLite implementation of the ChannelRepository trait
pub struct SqliteChannelRepository {
    conn: Connection,
}

impl SqliteChannelRepository {
    /// Opens (or creates) the database file and brings the schema up to date
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref()).map_err(CoreError::storage)?;
        tracing::debug!(path = %db_path.as_ref().display(), "opened channel database");
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(CoreError::storage)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrate(&conn).map_err(CoreError::storage)?;
        Ok(Self { conn })
    }
}

fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version >= SCHEMA_VERSION {
        return Ok(());
    }

    tracing::info!(from = version, to = SCHEMA_VERSION, "upgrading channel database");
    conn.execute_batch(
        r#"
        BEGIN;
        CREATE TABLE IF NOT EXISTS channels (
            telegram_link TEXT PRIMARY KEY NOT NULL,
            channel_url TEXT NOT NULL,
            title TEXT NOT NULL,
            subscribers TEXT NOT NULL,
            average_posts_per_7_days TEXT NOT NULL,
            last_updated TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_channels_title ON channels(title);
        PRAGMA user_version = 1;
        COMMIT;
        "#,
    )
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CoreError::storage(format!("bad last_updated {:?}: {}", raw, e)))
}

/// Row as read from the table, before the timestamp is checked
struct StoredRow {
    telegram_link: String,
    channel_url: String,
    title: String,
    subscribers: String,
    average_posts_per_7_days: String,
    last_updated: String,
}

impl StoredRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            telegram_link: row.get(0)?,
            channel_url: row.get(1)?,
            title: row.get(2)?,
            subscribers: row.get(3)?,
            average_posts_per_7_days: row.get(4)?,
            last_updated: row.get(5)?,
        })
    }

    fn into_record(self) -> Result<ChannelRecord> {
        Ok(ChannelRecord {
            last_updated: parse_timestamp(&self.last_updated)?,
            telegram_link: self.telegram_link,
            channel_url: self.channel_url,
            title: self.title,
            subscribers: self.subscribers,
            average_posts_per_7_days: self.average_posts_per_7_days,
        })
    }
}

impl ChannelRepository for SqliteChannelRepository {
    fn find(&self, telegram_link: &str) -> Result<Option<ChannelRecord>> {
        let row = self
            .conn
            .query_row(
                &format!("{} WHERE telegram_link = ?1", SELECT_COLUMNS),
                params![telegram_link],
                StoredRow::from_row,
            )
            .optional()
            .map_err(CoreError::storage)?;

        row.map(StoredRow::into_record).transpose()
    }

    fn save(&self, record: &ChannelRecord) -> Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO channels (
                    telegram_link, channel_url, title, subscribers,
                    average_posts_per_7_days, last_updated
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(telegram_link) DO UPDATE SET
                    channel_url = excluded.channel_url,
                    title = excluded.title,
                    subscribers = excluded.subscribers,
                    average_posts_per_7_days = excluded.average_posts_per_7_days,
                    last_updated = excluded.last_updated
                "#,
                params![
                    record.telegram_link,
                    record.channel_url,
                    record.title,
                    record.subscribers,
                    record.average_posts_per_7_days,
                    format_timestamp(&record.last_updated),
                ],
            )
            .map_err(CoreError::storage)?;
        Ok(())
    }

    fn delete_all(&self) -> Result<usize> {
        self.conn
            .execute("DELETE FROM channels", [])
            .map_err(CoreError::storage)
    }

    fn fetch_all(&self) -> Result<Vec<ChannelRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY telegram_link ASC", SELECT_COLUMNS))
            .map_err(CoreError::storage)?;

        let rows = stmt
            .query_map([], StoredRow::from_row)
            .map_err(CoreError::storage)?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
            .map_err(CoreError::storage)?;

        rows.into_iter().map(StoredRow::into_record).collect()
    }

    fn in_transaction(&self, work: &mut dyn FnMut() -> Result<()>) -> Result<()> {
        // IMMEDIATE takes the write lock up front, so the read inside `work`
        // still holds when its write happens.
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(CoreError::storage)?;

        match work() {
            Ok(()) => self.conn.execute_batch("COMMIT").map_err(CoreError::storage),
            Err(e) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }
}
