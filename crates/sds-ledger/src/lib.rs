//! The durable deletion ledger: a SQLite-backed set of filenames pending
//! deletion, grounded on `core/database.py::DeletionDatabase`.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::Connection;
use sds_collab::{CollabError, DeletionLedger};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("failed to open deletion ledger at '{path}': {source}")]
    Open { path: String, source: rusqlite::Error },
    #[error("deletion ledger query failed: {0}")]
    Query(#[from] rusqlite::Error),
}

/// A process-wide handle to the deletion ledger database.
pub struct Ledger {
    conn: Mutex<Connection>,
}

impl Ledger {
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let conn = Connection::open(path).map_err(|source| LedgerError::Open {
            path: path.display().to_string(),
            source,
        })?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS deletion (
                id INTEGER PRIMARY KEY,
                file TEXT UNIQUE,
                created TEXT
            )",
            [],
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// In-memory ledger, for tests.
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory().map_err(|source| LedgerError::Open {
            path: ":memory:".to_string(),
            source,
        })?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS deletion (
                id INTEGER PRIMARY KEY,
                file TEXT UNIQUE,
                created TEXT
            )",
            [],
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Insert `filename`, ignoring the insert if it is already present.
    pub fn add(&self, filename: &str) -> Result<(), LedgerError> {
        self.conn.lock().unwrap().execute(
            "INSERT OR IGNORE INTO deletion (file, created) VALUES (?1, ?2)",
            rusqlite::params![filename, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn add_many(&self, filenames: &[String]) -> Result<(), LedgerError> {
        for filename in filenames {
            self.add(filename)?;
        }
        Ok(())
    }

    pub fn remove(&self, filename: &str) -> Result<(), LedgerError> {
        self.conn
            .lock()
            .unwrap()
            .execute("DELETE FROM deletion WHERE file = ?1", rusqlite::params![filename])?;
        Ok(())
    }

    /// All ledger entries, in insertion (`id` ascending) order.
    pub fn list(&self) -> Result<Vec<String>, LedgerError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT file FROM deletion ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(LedgerError::from)
    }

    pub fn count(&self) -> Result<i64, LedgerError> {
        Ok(self
            .conn
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM deletion", [], |row| row.get(0))?)
    }
}

impl DeletionLedger for Ledger {
    fn remove(&self, filename: &str) -> Result<(), CollabError> {
        Ledger::remove(self, filename).map_err(|e| CollabError::Ledger(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_idempotent() {
        let ledger = Ledger::open_in_memory().unwrap();
        ledger.add("NL.HGN.02.BHZ.D.1970.001").unwrap();
        ledger.add("NL.HGN.02.BHZ.D.1970.001").unwrap();
        assert_eq!(ledger.count().unwrap(), 1);
    }

    #[test]
    fn add_many_then_list_preserves_insertion_order() {
        let ledger = Ledger::open_in_memory().unwrap();
        ledger
            .add_many(&[
                "NL.HGN.02.BHZ.D.1970.001".to_string(),
                "NL.HGN.02.BHZ.D.1970.002".to_string(),
                "NL.HGN.02.BHZ.D.1970.003".to_string(),
            ])
            .unwrap();
        assert_eq!(
            ledger.list().unwrap(),
            vec![
                "NL.HGN.02.BHZ.D.1970.001".to_string(),
                "NL.HGN.02.BHZ.D.1970.002".to_string(),
                "NL.HGN.02.BHZ.D.1970.003".to_string(),
            ]
        );
    }

    #[test]
    fn remove_drops_the_entry() {
        let ledger = Ledger::open_in_memory().unwrap();
        ledger.add("NL.HGN.02.BHZ.D.1970.001").unwrap();
        DeletionLedger::remove(&ledger, "NL.HGN.02.BHZ.D.1970.001").unwrap();
        assert_eq!(ledger.count().unwrap(), 0);
    }

    #[test]
    fn ledger_persists_across_handles_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deletion.sqlite3");
        {
            let ledger = Ledger::open(&path).unwrap();
            ledger.add("NL.HGN.02.BHZ.D.1970.001").unwrap();
        }
        let reopened = Ledger::open(&path).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
    }
}
