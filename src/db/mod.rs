pub mod schema;
pub mod migrations;
pub mod organization_repo;
pub mod form_repo;
pub mod submission_repo;
pub mod tree_repo;
pub mod connection_repo;
pub mod challenge_repo;

use anyhow::{anyhow, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub use organization_repo::OrganizationRepository;
pub use form_repo::FormRepository;
pub use submission_repo::SubmissionRepository;
pub use tree_repo::TreeRepository;
pub use connection_repo::ConnectionRepository;
pub use challenge_repo::ChallengeRepository;

/// Huvuddatabas-wrapper med thread-safe access
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Öppna eller skapa databas
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            "
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Öppna in-memory databas (för tester)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Kör databasmigrationer
    pub fn migrate(&self) -> Result<()> {
        let conn = lock(&self.conn)?;
        migrations::run_migrations(&conn)
    }

    pub fn organizations(&self) -> OrganizationRepository {
        OrganizationRepository::new(Arc::clone(&self.conn))
    }

    pub fn forms(&self) -> FormRepository {
        FormRepository::new(Arc::clone(&self.conn))
    }

    pub fn submissions(&self) -> SubmissionRepository {
        SubmissionRepository::new(Arc::clone(&self.conn))
    }

    pub fn trees(&self) -> TreeRepository {
        TreeRepository::new(Arc::clone(&self.conn))
    }

    pub fn connections(&self) -> ConnectionRepository {
        ConnectionRepository::new(Arc::clone(&self.conn))
    }

    pub fn challenges(&self) -> ChallengeRepository {
        ChallengeRepository::new(Arc::clone(&self.conn))
    }

    /// Direkt tillgång till connection (för avancerade operationer)
    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = lock(&self.conn)?;
        f(&conn)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

/// Lås anslutningen; ett förgiftat lås blir ett vanligt fel
pub(crate) fn lock(conn: &Arc<Mutex<Connection>>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|_| anyhow!("Databasanslutningen är låst av en krashad tråd"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_on_disk_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("biglittle.db");

        let db = Database::open(&path).unwrap();
        db.migrate().unwrap();

        assert!(path.exists());
        assert_eq!(db.forms().count().unwrap(), 0);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let db = Database::open_in_memory().unwrap();
        let enabled: bool = db
            .with_connection(|conn| Ok(conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?))
            .unwrap();
        assert!(enabled);
    }
}
