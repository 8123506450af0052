use std::num::NonZeroUsize;
use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::record::{RawRecord, Record, Row};

/// List of database migrations, to seamlessly update the database without losing data.
const MIGRATIONS: &[&str] = &[include_str!("migration-000-init.sql")];

const INSERT: &str = "INSERT INTO
    google_responses (time, latitude_from, longitude_from, latitude_to, longitude_to, transit_response, driving_response)
    VALUES           (?   , ?            , ?             , ?          , ?           , ?               , ?               )";

const SELECT: &str = "SELECT time, latitude_from, longitude_from, latitude_to, longitude_to, transit_response, driving_response
    FROM google_responses
    ORDER BY rowid";

/// Initialize, or update the database's schema to the latest version.
fn upgrade_schema(database: &mut Connection) -> Result<()> {
    let tx = database.transaction().map_err(Error::StorageOpen)?;

    let my_version = MIGRATIONS.len();
    let db_version: usize = tx
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(Error::StorageOpen)?;

    if my_version == db_version {
        // Already at the latest version.
        return Ok(());
    }
    if my_version < db_version {
        return Err(Error::SchemaTooNew {
            found: db_version,
            supported: my_version,
        });
    }

    info!(from = db_version, to = my_version, "upgrading database schema");
    for migration in &MIGRATIONS[db_version..] {
        tx.execute_batch(migration).map_err(Error::StorageOpen)?;
    }

    // PRAGMA user_version does not support prepared statements.
    tx.execute_batch(&format!("PRAGMA user_version = {my_version}"))
        .map_err(Error::StorageOpen)?;
    tx.commit().map_err(Error::StorageOpen)?;

    Ok(())
}

fn write_batch(database: &mut Connection, rows: &[Row]) -> rusqlite::Result<()> {
    let tx = database.transaction()?;
    {
        let mut insert = tx.prepare_cached(INSERT)?;
        for row in rows {
            insert.execute(rusqlite::params![
                row.time,
                row.latitude_from,
                row.longitude_from,
                row.latitude_to,
                row.longitude_to,
                row.transit_response,
                row.driving_response,
            ])?;
        }
    }
    tx.commit()
}

/// Buffered writer for sampled directions.
///
/// Records are validated and encoded as they come in, kept in memory, and
/// written in a single transaction once `buffer_size` of them are waiting.
/// The buffer is only cleared after the transaction commits, so a failed
/// write loses nothing: the rows stay buffered and the next flush retries.
///
/// Appending and flushing both take `&mut self`. To feed one database from
/// several threads, put it behind a `Mutex`.
pub struct Database {
    conn: Connection,
    buffer_size: NonZeroUsize,
    buffer: Vec<Row>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>, buffer_size: NonZeroUsize) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening database");
        let conn = Connection::open(path).map_err(Error::StorageOpen)?;
        Self::with_connection(conn, buffer_size)
    }

    /// Like [`Database::open`], but fails with [`Error::StorageOpen`] instead
    /// of creating the file when `path` does not exist.
    pub fn open_existing(path: impl AsRef<Path>, buffer_size: NonZeroUsize) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening existing database");
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(Error::StorageOpen)?;
        Self::with_connection(conn, buffer_size)
    }

    pub fn with_connection(mut conn: Connection, buffer_size: NonZeroUsize) -> Result<Self> {
        upgrade_schema(&mut conn)?;
        Ok(Self {
            conn,
            buffer_size,
            buffer: Vec::with_capacity(buffer_size.get()),
        })
    }

    /// Validates and buffers a raw record.
    ///
    /// An invalid record is logged and rejected with
    /// [`Error::RecordValidation`]; the buffer is left as it was.
    pub fn record(&mut self, raw: RawRecord) -> Result<()> {
        let record = Record::try_from(raw).map_err(|err| {
            warn!(%err, "dropping invalid record");
            Error::RecordValidation(err)
        })?;
        self.push(record)
    }

    pub fn push(&mut self, record: Record) -> Result<()> {
        let row = record.to_row()?;
        self.buffer.push(row);
        if self.buffer.len() >= self.buffer_size.get() {
            self.flush()?;
        }
        Ok(())
    }

    /// Writes every buffered row in one transaction and returns how many were
    /// written.
    pub fn flush(&mut self) -> Result<usize> {
        if self.buffer.is_empty() {
            return Ok(0);
        }

        write_batch(&mut self.conn, &self.buffer).map_err(|err| {
            error!(%err, buffered = self.buffer.len(), "batch write failed");
            Error::StorageWrite(err)
        })?;

        let written = self.buffer.len();
        self.buffer.clear();
        info!(rows = written, "flushed batch");
        Ok(written)
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn buffer_size(&self) -> NonZeroUsize {
        self.buffer_size
    }

    pub fn row_count(&self) -> Result<usize> {
        self.conn
            .query_row("SELECT COUNT(*) FROM google_responses", [], |row| row.get(0))
            .map_err(Error::StorageRead)
    }

    /// Every stored row, oldest first.
    pub fn rows(&self) -> Result<Vec<Row>> {
        let mut select = self.conn.prepare(SELECT).map_err(Error::StorageRead)?;
        let rows = select
            .query_map([], |row| {
                Ok(Row {
                    time: row.get(0)?,
                    latitude_from: row.get(1)?,
                    longitude_from: row.get(2)?,
                    latitude_to: row.get(3)?,
                    longitude_to: row.get(4)?,
                    transit_response: row.get(5)?,
                    driving_response: row.get(6)?,
                })
            })
            .map_err(Error::StorageRead)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Error::StorageRead)
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        if let Err(err) = self.flush() {
            error!(%err, lost = self.buffer.len(), "unflushed records dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Field;
    use geo::Point;
    use serde_json::json;
    use std::time::{Duration, UNIX_EPOCH};

    fn memory(buffer_size: usize) -> Database {
        let conn = Connection::open_in_memory().unwrap();
        Database::with_connection(conn, NonZeroUsize::new(buffer_size).unwrap()).unwrap()
    }

    fn raw(i: u64) -> RawRecord {
        RawRecord::new(
            UNIX_EPOCH + Duration::from_secs(1_451_530_000 + i),
            Point::new(37.7, -122.4),
            Point::new(37.8, -122.5),
            json!([{"summary": "transit", "i": i}]),
            json!([{"summary": "driving", "i": i}]),
        )
    }

    #[test]
    fn flushes_when_full() {
        let mut db = memory(3);
        db.record(raw(0)).unwrap();
        db.record(raw(1)).unwrap();
        assert_eq!(db.buffered(), 2);
        assert_eq!(db.row_count().unwrap(), 0);

        db.record(raw(2)).unwrap();
        assert_eq!(db.buffered(), 0);
        assert_eq!(db.row_count().unwrap(), 3);
    }

    #[test]
    fn explicit_flush() {
        let mut db = memory(10);
        db.record(raw(0)).unwrap();
        db.record(raw(1)).unwrap();
        assert_eq!(db.flush().unwrap(), 2);
        assert_eq!(db.buffered(), 0);
        assert_eq!(db.row_count().unwrap(), 2);
        assert_eq!(db.flush().unwrap(), 0);
    }

    #[test]
    fn invalid_record_leaves_buffer_alone() {
        let mut db = memory(2);
        db.record(raw(0)).unwrap();

        let mut bad = raw(1);
        bad.0[0] = Field::Text("2015-12-30T19:05:40".to_string());
        let err = db.record(bad).unwrap_err();
        assert!(matches!(err, Error::RecordValidation(_)));
        assert_eq!(db.buffered(), 1);
        assert_eq!(db.row_count().unwrap(), 0);
    }

    #[test]
    fn rows_are_stored_in_order() {
        let mut db = memory(2);
        db.record(raw(0)).unwrap();
        db.record(raw(1)).unwrap();

        let rows = db.rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].time, 1_451_530_000.0);
        assert_eq!(rows[1].time, 1_451_530_001.0);
        assert_eq!(rows[0].latitude_from, 37.7);
        assert_eq!(rows[0].longitude_to, -122.5);
        assert_eq!(rows[1].transit_response, r#"[{"i":1,"summary":"transit"}]"#);
    }

    #[test]
    fn failed_write_keeps_buffer() {
        let mut db = memory(2);
        db.record(raw(0)).unwrap();
        db.conn.execute_batch("DROP TABLE google_responses").unwrap();

        assert!(matches!(db.flush(), Err(Error::StorageWrite(_))));
        assert_eq!(db.buffered(), 1);

        // Reaching the threshold tries again, fails again, and still keeps
        // both records.
        assert!(matches!(db.record(raw(1)), Err(Error::StorageWrite(_))));
        assert_eq!(db.buffered(), 2);

        db.conn.execute_batch(MIGRATIONS[0]).unwrap();
        assert_eq!(db.flush().unwrap(), 2);
        assert_eq!(db.row_count().unwrap(), 2);
    }

    #[test]
    fn reuses_existing_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "create table google_responses (time real, latitude_from real, longitude_from real,
                latitude_to real, longitude_to real, transit_response text, driving_response text);
            insert into google_responses values (0, 1, 2, 3, 4, '[]', '[]');",
        )
        .unwrap();

        let db = Database::with_connection(conn, NonZeroUsize::new(5).unwrap()).unwrap();
        assert_eq!(db.row_count().unwrap(), 1);
    }

    #[test]
    fn newer_schema_is_refused() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA user_version = 42").unwrap();
        let err = Database::with_connection(conn, NonZeroUsize::new(5).unwrap())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            Error::SchemaTooNew {
                found: 42,
                supported: 1
            }
        ));
    }

    #[test]
    fn drop_flushes_and_reopen_keeps_rows() {
        let path = std::env::temp_dir().join(format!(
            "transit_sampler_drop_{}.sqlite",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        {
            let mut db = Database::open(&path, NonZeroUsize::new(100).unwrap()).unwrap();
            db.record(raw(0)).unwrap();
            db.record(raw(1)).unwrap();
        }

        let db = Database::open_existing(&path, NonZeroUsize::new(100).unwrap()).unwrap();
        assert_eq!(db.row_count().unwrap(), 2);
        drop(db);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn open_existing_does_not_create() {
        let path = std::env::temp_dir().join(format!(
            "transit_sampler_missing_{}.sqlite",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let err = Database::open_existing(&path, NonZeroUsize::MIN).err().unwrap();
        assert!(matches!(err, Error::StorageOpen(_)));
        assert!(!path.exists());
    }

    #[test]
    fn database_can_move_between_threads() {
        fn assert_send<T: Send>() {}
        assert_send::<Database>();
    }
}
