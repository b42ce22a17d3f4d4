use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;

use crate::category::Category;
use crate::entry::Entry;
use crate::persistence::Persistence;

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Entries Table
    // position keeps the newest-first collection order across restarts
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS entries (
            id INTEGER PRIMARY KEY,
            position INTEGER NOT NULL,
            text TEXT NOT NULL,
            category TEXT NOT NULL,
            created_at TEXT NOT NULL,
            completed INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_entries_position ON entries(position)",
        [],
    )?;

    Ok(())
}

/// SQLite-backed persistence. Each save rewrites the table inside one
/// transaction, so a crash mid-save leaves the previous collection intact.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("Failed to open database: {:?}", path.as_ref()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(SqliteStorage { conn })
    }

    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl Persistence for SqliteStorage {
    fn load(&self) -> Result<Vec<Entry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, text, category, created_at, completed
             FROM entries
             ORDER BY position ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, bool>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut entries = Vec::with_capacity(rows.len());
        for (id, text, category, created_at, completed) in rows {
            let category: Category = category
                .parse()
                .map_err(|bad| anyhow::anyhow!("Unknown category {:?} for entry {}", bad, id))?;
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .with_context(|| format!("Bad timestamp for entry {}", id))?
                .with_timezone(&Utc);

            entries.push(Entry {
                id,
                text,
                category,
                created_at,
                completed,
            });
        }

        Ok(entries)
    }

    fn save(&mut self, entries: &[Entry]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM entries", [])?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO entries (id, position, text, category, created_at, completed)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;

            for (position, entry) in entries.iter().enumerate() {
                stmt.execute(params![
                    entry.id,
                    position as i64,
                    entry.text,
                    entry.category.as_str(),
                    entry.created_at.to_rfc3339(),
                    entry.completed,
                ])?;
            }
        }

        tx.commit().context("Failed to commit entries")?;
        log::debug!("saved {} entries to sqlite", entries.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn create_test_entry(id: i64, text: &str, category: Category, completed: bool) -> Entry {
        Entry {
            id,
            text: text.to_string(),
            category,
            created_at: Utc.timestamp_millis_opt(id).unwrap(),
            completed,
        }
    }

    #[test]
    fn test_round_trip_preserves_order_and_fields() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();

        let entries = vec![
            create_test_entry(1_700_000_300_123, "Купить молоко", Category::Purchase, false),
            create_test_entry(1_700_000_200_456, "Позвонить маме", Category::Task, true),
            create_test_entry(1_700_000_100_789, "Хорошая погода", Category::Idea, false),
        ];

        storage.save(&entries).unwrap();
        let loaded = storage.load().unwrap();

        assert_eq!(loaded, entries);
    }

    #[test]
    fn test_save_replaces_previous_contents() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();

        storage
            .save(&[
                create_test_entry(2, "a", Category::Thought, false),
                create_test_entry(1, "b", Category::Thought, false),
            ])
            .unwrap();
        assert_eq!(storage.count().unwrap(), 2);

        storage.save(&[]).unwrap();
        assert_eq!(storage.count().unwrap(), 0);
        assert!(storage.load().unwrap().is_empty());
    }

    #[test]
    fn test_file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("thoughts.db");

        let entries = vec![create_test_entry(42, "Идея проекта", Category::Idea, true)];
        {
            let mut storage = SqliteStorage::open(&path).unwrap();
            storage.save(&entries).unwrap();
        }

        let reopened = SqliteStorage::open(&path).unwrap();
        assert_eq!(reopened.load().unwrap(), entries);
    }

    #[test]
    fn test_unknown_category_is_an_error() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage
            .conn
            .execute(
                "INSERT INTO entries (id, position, text, category, created_at, completed)
                 VALUES (1, 0, 'x', 'bogus', '2024-01-01T00:00:00+00:00', 0)",
                [],
            )
            .unwrap();

        assert!(storage.load().is_err());
    }
}
