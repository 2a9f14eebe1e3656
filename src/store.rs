use crate::media::MediaRecord;
use crate::Result;
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension};
use std::path::Path;
use std::time::Duration;

const SCHEMA_VERSION: i64 = 1;

/// Append-only table of every media identity seen so far.
///
/// The handle owns its connection; dropping it releases the file on any exit
/// path, `close` does the same but reports errors.
pub struct MediaStore {
    conn: Connection,
}

impl MediaStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;
        conn.busy_timeout(Duration::from_secs(10))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        migrate(&conn)?;
        tracing::debug!(path = %path.display(), "media store opened");
        Ok(Self { conn })
    }

    /// Insert unless the media id is already known. A UNIQUE violation is the
    /// only duplicate check, so the first record for an id always wins.
    pub fn insert_if_new(&self, record: &MediaRecord) -> Result<bool> {
        let outcome = self.conn.execute(
            "INSERT INTO media (user_name, post_id, photo_index, media_id, download_time)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.user_name,
                record.post_id,
                record.photo_index,
                record.media_id,
                record.download_time,
            ],
        );

        match outcome {
            Ok(_) => Ok(true),
            Err(err) if is_unique_violation(&err) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    pub fn get(&self, media_id: &str) -> Result<Option<MediaRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT user_name, post_id, photo_index, media_id, download_time
                 FROM media WHERE media_id = ?1",
                [media_id],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    pub fn count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM media", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    /// Most recently inserted records first.
    pub fn recent(&self, limit: usize) -> Result<Vec<MediaRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_name, post_id, photo_index, media_id, download_time
             FROM media ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([limit as i64], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, err)| err)?;
        tracing::debug!("media store closed");
        Ok(())
    }
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS media (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  user_name TEXT NOT NULL,
  post_id TEXT NOT NULL,
  photo_index TEXT NOT NULL,
  media_id TEXT NOT NULL UNIQUE,
  download_time DATETIME
);
"#,
    )?;

    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version != SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }
    Ok(())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(inner, _) => {
            inner.code == ErrorCode::ConstraintViolation
                && inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<MediaRecord> {
    Ok(MediaRecord {
        user_name: row.get(0)?,
        post_id: row.get(1)?,
        photo_index: row.get(2)?,
        media_id: row.get(3)?,
        download_time: row.get(4)?,
    })
}
