use anyhow::Result;
use rusqlite::{params, Connection as SqlConnection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

use super::lock;
use crate::models::{Connection, ConnectionView};
use crate::utils::AppError;

pub struct ConnectionRepository {
    conn: Arc<Mutex<SqlConnection>>,
}

impl ConnectionRepository {
    pub fn new(conn: Arc<Mutex<SqlConnection>>) -> Self {
        Self { conn }
    }

    pub fn find_by_tree(&self, tree_id: i64) -> Result<Vec<Connection>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, family_tree_id, big_id, little_id, points
             FROM connections WHERE family_tree_id = ? ORDER BY id",
        )?;

        let connections = stmt
            .query_map([tree_id], Self::row_to_connection)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(connections)
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<Connection>> {
        let conn = lock(&self.conn)?;
        let connection = conn
            .query_row(
                "SELECT id, family_tree_id, big_id, little_id, points FROM connections WHERE id = ?",
                [id],
                Self::row_to_connection,
            )
            .optional()?;
        Ok(connection)
    }

    /// Kopplingar med namn, sorterade efter poäng (topplista)
    pub fn find_views_by_tree(&self, tree_id: i64) -> Result<Vec<ConnectionView>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.big_id, b.identifier, c.little_id, l.identifier, c.points
             FROM connections c
             JOIN tree_member b ON b.id = c.big_id
             JOIN tree_member l ON l.id = c.little_id
             WHERE c.family_tree_id = ?
             ORDER BY c.points DESC, b.identifier COLLATE NOCASE, l.identifier COLLATE NOCASE",
        )?;

        let views = stmt
            .query_map([tree_id], |row| {
                Ok(ConnectionView {
                    connection_id: row.get(0)?,
                    big_id: row.get(1)?,
                    big_name: row.get(2)?,
                    little_id: row.get(3)?,
                    little_name: row.get(4)?,
                    points: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(views)
    }

    /// Skapa koppling big -> little.
    ///
    /// Avvisas innan något skrivs: självkopplingar, dubbletter, en little som
    /// redan har en big och medlemmar från ett annat träd.
    pub fn create(&self, connection: &mut Connection) -> Result<i64> {
        if connection.big_id == connection.little_id {
            return Err(AppError::validation("En medlem kan inte kopplas till sig själv").into());
        }

        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;

        let trees: Vec<i64> = {
            let mut stmt =
                tx.prepare("SELECT family_tree_id FROM tree_member WHERE id IN (?1, ?2)")?;
            let rows = stmt
                .query_map(params![connection.big_id, connection.little_id], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            rows
        };
        if trees.len() != 2 {
            return Err(AppError::not_found("medlem i kopplingen").into());
        }
        if trees.iter().any(|&t| t != connection.family_tree_id) {
            return Err(AppError::validation("Medlemmarna tillhör inte samma träd").into());
        }

        let duplicate: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM connections WHERE big_id = ?1 AND little_id = ?2)",
            params![connection.big_id, connection.little_id],
            |row| row.get(0),
        )?;
        if duplicate {
            return Err(AppError::already_exists("Kopplingen finns redan").into());
        }

        let has_big: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM connections WHERE little_id = ?)",
            [connection.little_id],
            |row| row.get(0),
        )?;
        if has_big {
            return Err(AppError::validation("Medlemmen har redan en big").into());
        }

        tx.execute(
            "INSERT INTO connections (family_tree_id, big_id, little_id, points) VALUES (?1, ?2, ?3, 0)",
            params![connection.family_tree_id, connection.big_id, connection.little_id],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        connection.id = Some(id);
        connection.points = 0;
        Ok(id)
    }

    /// Radera koppling; poängposterna följer med via CASCADE
    pub fn delete(&self, id: i64) -> Result<()> {
        let conn = lock(&self.conn)?;
        let rows = conn.execute("DELETE FROM connections WHERE id = ?", [id])?;
        if rows == 0 {
            return Err(AppError::not_found(format!("koppling {}", id)).into());
        }
        Ok(())
    }

    pub fn count_by_tree(&self, tree_id: i64) -> Result<i64> {
        let conn = lock(&self.conn)?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM connections WHERE family_tree_id = ?",
            [tree_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn row_to_connection(row: &Row) -> rusqlite::Result<Connection> {
        Ok(Connection {
            id: row.get(0)?,
            family_tree_id: row.get(1)?,
            big_id: row.get(2)?,
            little_id: row.get(3)?,
            points: row.get(4)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{FamilyTree, Form, Organization, Question, QuestionType, TreeMember};

    fn add_tree(db: &Database, org_id: i64, title: &str) -> i64 {
        let mut form = Form::new(org_id, title);
        let form_id = db.forms().create(&mut form).unwrap();
        let mut q = Question::new(form_id, "Namn", QuestionType::FreeResponse);
        let question_id = db.forms().add_question(&mut q).unwrap();
        let mut tree = FamilyTree::new(form_id, question_id, title);
        db.trees().create(&mut tree).unwrap()
    }

    fn add_member(db: &Database, tree_id: i64, name: &str) -> i64 {
        let mut m = TreeMember::new(tree_id, name);
        db.trees().create_member(&mut m).unwrap()
    }

    fn setup() -> (Database, i64, i64) {
        let db = Database::open_in_memory().unwrap();
        let mut org = Organization::new("Org");
        let org_id = db.organizations().create(&mut org).unwrap();
        let tree_id = add_tree(&db, org_id, "Träd");
        (db, org_id, tree_id)
    }

    #[test]
    fn test_create_and_list_views() {
        let (db, _, tree_id) = setup();
        let anna = add_member(&db, tree_id, "Anna");
        let bo = add_member(&db, tree_id, "Bo");

        let mut c = Connection::new(tree_id, anna, bo);
        db.connections().create(&mut c).unwrap();

        let stored = db.connections().find_by_tree(tree_id).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!((stored[0].big_id, stored[0].little_id), (anna, bo));

        let views = db.connections().find_views_by_tree(tree_id).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].pair_label(), "Anna → Bo");
    }

    #[test]
    fn test_rejected_connections_write_nothing() {
        let (db, org_id, tree_id) = setup();
        let anna = add_member(&db, tree_id, "Anna");
        let bo = add_member(&db, tree_id, "Bo");
        let cia = add_member(&db, tree_id, "Cia");
        let other_tree = add_tree(&db, org_id, "Annat träd");
        let stranger = add_member(&db, other_tree, "Dan");

        db.connections().create(&mut Connection::new(tree_id, anna, bo)).unwrap();

        let self_edge = db.connections().create(&mut Connection::new(tree_id, anna, anna));
        let duplicate = db.connections().create(&mut Connection::new(tree_id, anna, bo));
        let second_big = db.connections().create(&mut Connection::new(tree_id, cia, bo));
        let cross_tree = db.connections().create(&mut Connection::new(tree_id, anna, stranger));

        assert!(matches!(
            AppError::find(&self_edge.unwrap_err()),
            Some(AppError::Validation(_))
        ));
        assert!(matches!(
            AppError::find(&duplicate.unwrap_err()),
            Some(AppError::AlreadyExists(_))
        ));
        assert!(matches!(
            AppError::find(&second_big.unwrap_err()),
            Some(AppError::Validation(_))
        ));
        assert!(cross_tree.is_err());
        assert_eq!(db.connections().count_by_tree(tree_id).unwrap(), 1);
    }

    #[test]
    fn test_deleting_member_cascades_connections() {
        let (db, _, tree_id) = setup();
        let anna = add_member(&db, tree_id, "Anna");
        let bo = add_member(&db, tree_id, "Bo");
        let cia = add_member(&db, tree_id, "Cia");
        db.connections().create(&mut Connection::new(tree_id, anna, bo)).unwrap();
        db.connections().create(&mut Connection::new(tree_id, bo, cia)).unwrap();

        db.trees().delete_member(bo).unwrap();

        assert!(db.connections().find_by_tree(tree_id).unwrap().is_empty());
    }

    #[test]
    fn test_storage_rejects_second_big() {
        let (db, _, tree_id) = setup();
        let anna = add_member(&db, tree_id, "Anna");
        let bo = add_member(&db, tree_id, "Bo");
        let cia = add_member(&db, tree_id, "Cia");
        db.connections().create(&mut Connection::new(tree_id, anna, bo)).unwrap();

        let raw = db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO connections (family_tree_id, big_id, little_id) VALUES (?1, ?2, ?3)",
                params![tree_id, cia, bo],
            )?;
            Ok(())
        });

        assert!(raw.is_err());
        assert_eq!(db.connections().count_by_tree(tree_id).unwrap(), 1);
    }
}
