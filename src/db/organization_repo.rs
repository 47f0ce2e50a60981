use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

use super::lock;
use crate::models::Organization;

pub struct OrganizationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrganizationRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Hämta den lokala organisationen (den först skapade)
    pub fn get_default(&self) -> Result<Option<Organization>> {
        let conn = lock(&self.conn)?;
        let org = conn
            .query_row(
                "SELECT id, name, created_at FROM organization ORDER BY id LIMIT 1",
                [],
                Self::row_to_organization,
            )
            .optional()?;
        Ok(org)
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<Organization>> {
        let conn = lock(&self.conn)?;
        let org = conn
            .query_row(
                "SELECT id, name, created_at FROM organization WHERE id = ?",
                [id],
                Self::row_to_organization,
            )
            .optional()?;
        Ok(org)
    }

    /// Är första-start-guiden genomförd?
    pub fn is_setup_complete(&self) -> Result<bool> {
        Ok(self.get_default()?.is_some())
    }

    pub fn create(&self, org: &mut Organization) -> Result<i64> {
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO organization (name) VALUES (?)",
            [org.name.trim()],
        )?;

        let id = conn.last_insert_rowid();
        org.id = Some(id);
        Ok(id)
    }

    pub fn rename(&self, id: i64, name: &str) -> Result<()> {
        let conn = lock(&self.conn)?;
        conn.execute(
            "UPDATE organization SET name = ?1 WHERE id = ?2",
            params![name.trim(), id],
        )?;
        Ok(())
    }

    fn row_to_organization(row: &Row) -> rusqlite::Result<Organization> {
        Ok(Organization {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: row.get(2)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;
    use crate::models::Organization;

    #[test]
    fn test_setup_complete_after_create() {
        let db = Database::open_in_memory().unwrap();
        assert!(!db.organizations().is_setup_complete().unwrap());

        let mut org = Organization::new("  Sigma Delta  ");
        db.organizations().create(&mut org).unwrap();

        assert!(db.organizations().is_setup_complete().unwrap());
        let loaded = db.organizations().get_default().unwrap().unwrap();
        assert_eq!(loaded.name, "Sigma Delta");
        assert_eq!(loaded.id, org.id);
    }

    #[test]
    fn test_rename() {
        let db = Database::open_in_memory().unwrap();
        let mut org = Organization::new("Gamla namnet");
        let id = db.organizations().create(&mut org).unwrap();

        db.organizations().rename(id, "Nya namnet").unwrap();

        let loaded = db.organizations().find_by_id(id).unwrap().unwrap();
        assert_eq!(loaded.name, "Nya namnet");
    }
}
