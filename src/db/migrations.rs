use anyhow::Result;
use rusqlite::Connection;
use tracing::{info, warn};

use super::schema::{CREATE_TABLES, SCHEMA_VERSION};

/// Kör alla nödvändiga migrationer
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_current_version(conn)?;

    if current_version == 0 {
        info!("Skapar ny databas med schema version {}", SCHEMA_VERSION);
        initial_setup(conn)?;
    } else if current_version < SCHEMA_VERSION {
        info!(
            "Migrerar databas från version {} till {}",
            current_version, SCHEMA_VERSION
        );
        migrate_from(conn, current_version)?;
    } else {
        info!("Databas är uppdaterad (version {})", current_version);
    }

    Ok(())
}

fn get_current_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_migrations')",
        [],
        |row| row.get(0),
    )?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| row.get(0))?;

    Ok(version.unwrap_or(0))
}

fn initial_setup(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_TABLES)?;

    conn.execute(
        "INSERT INTO schema_migrations (version) VALUES (?)",
        [SCHEMA_VERSION],
    )?;

    info!("Initial setup klar");
    Ok(())
}

fn migrate_from(conn: &Connection, from_version: i32) -> Result<()> {
    for version in (from_version + 1)..=SCHEMA_VERSION {
        match version {
            2 => migrate_v1_to_v2(conn)?,
            3 => migrate_v2_to_v3(conn)?,
            _ => {}
        }

        conn.execute(
            "INSERT INTO schema_migrations (version) VALUES (?)",
            [version],
        )?;

        info!("Migrerade till version {}", version);
    }

    Ok(())
}

/// Migration v1 -> v2: Ta bort tree_member.big
///
/// Version 1 lagrade en big-referens både i tree_member.big och i
/// connections. Kopplingar som bara fanns i tree_member.big flyttas till
/// connections innan kolumnen tas bort.
fn migrate_v1_to_v2(conn: &Connection) -> Result<()> {
    info!("Migration v2: Flyttar tree_member.big till connections");

    let has_big_column: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM pragma_table_info('tree_member') WHERE name = 'big')",
        [],
        |row| row.get(0),
    )?;

    if !has_big_column {
        return Ok(());
    }

    let moved = conn.execute(
        "INSERT OR IGNORE INTO connections (family_tree_id, big_id, little_id, points)
         SELECT m.family_tree_id, m.big, m.id, 0
         FROM tree_member m
         WHERE m.big IS NOT NULL
           AND m.big <> m.id
           AND NOT EXISTS (SELECT 1 FROM connections c WHERE c.little_id = m.id)",
        [],
    )?;

    conn.execute_batch("ALTER TABLE tree_member DROP COLUMN big;")?;

    info!("Flyttade {} kopplingar", moved);
    Ok(())
}

/// Migration v2 -> v3: Högst en big per little i lagringen
///
/// Om en little ändå fått flera big behålls den äldsta kopplingen.
fn migrate_v2_to_v3(conn: &Connection) -> Result<()> {
    info!("Migration v3: Unikt index på connections.little_id");

    let removed = conn.execute(
        "DELETE FROM connections
         WHERE id NOT IN (SELECT MIN(id) FROM connections GROUP BY little_id)",
        [],
    )?;
    if removed > 0 {
        warn!("Tog bort {} kopplingar till en little som redan hade en big", removed);
    }

    conn.execute_batch(
        "DROP INDEX IF EXISTS idx_connections_little;
         CREATE UNIQUE INDEX idx_connections_little ON connections(little_id);",
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn table_names(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_initial_migration() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let tables = table_names(&conn);
        for expected in [
            "form",
            "question",
            "question_option",
            "form_submission",
            "question_response",
            "response_option_selection",
            "family_tree",
            "tree_member",
            "connections",
            "challenges",
            "point_submission",
            "organization",
        ] {
            assert!(tables.contains(&expected.to_string()), "saknar {}", expected);
        }
    }

    #[test]
    fn test_idempotent_migration() {
        let conn = Connection::open_in_memory().unwrap();

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        assert_eq!(get_current_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_v1_big_column_moves_to_connections() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(CREATE_TABLES).unwrap();
        conn.execute_batch(
            "ALTER TABLE tree_member ADD COLUMN big INTEGER;
             INSERT INTO schema_migrations (version) VALUES (1);
             INSERT INTO organization (name) VALUES ('Org');
             INSERT INTO form (organization_id, title, code) VALUES (1, 'F', 'ABC123');
             INSERT INTO question (form_id, prompt, type) VALUES (1, 'Namn', 'FREE_RESPONSE');
             INSERT INTO family_tree (form_id, question_id, title, code, author_id)
                 VALUES (1, 1, 'T', 'ABC123', 'a');
             INSERT INTO tree_member (family_tree_id, identifier, is_big) VALUES (1, 'Anna', 1);
             INSERT INTO tree_member (family_tree_id, identifier, big) VALUES (1, 'Bo', 1);",
        )
        .unwrap();

        run_migrations(&conn).unwrap();

        let (big, little): (i64, i64) = conn
            .query_row("SELECT big_id, little_id FROM connections", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!((big, little), (1, 2));

        let still_has_column: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM pragma_table_info('tree_member') WHERE name = 'big')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(!still_has_column);
    }

    #[test]
    fn test_v2_keeps_oldest_big_and_adds_unique_index() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(CREATE_TABLES).unwrap();
        conn.execute_batch(
            "DROP INDEX idx_connections_little;
             CREATE INDEX idx_connections_little ON connections(little_id);
             INSERT INTO schema_migrations (version) VALUES (2);
             INSERT INTO organization (name) VALUES ('Org');
             INSERT INTO form (organization_id, title, code) VALUES (1, 'F', 'ABC123');
             INSERT INTO question (form_id, prompt, type) VALUES (1, 'Namn', 'FREE_RESPONSE');
             INSERT INTO family_tree (form_id, question_id, title, code, author_id)
                 VALUES (1, 1, 'T', 'ABC123', 'a');
             INSERT INTO tree_member (family_tree_id, identifier, is_big) VALUES (1, 'Anna', 1);
             INSERT INTO tree_member (family_tree_id, identifier, is_big) VALUES (1, 'Bo', 1);
             INSERT INTO tree_member (family_tree_id, identifier) VALUES (1, 'Cia');
             INSERT INTO connections (family_tree_id, big_id, little_id) VALUES (1, 1, 3);
             INSERT INTO connections (family_tree_id, big_id, little_id) VALUES (1, 2, 3);",
        )
        .unwrap();

        run_migrations(&conn).unwrap();

        let bigs: Vec<i64> = conn
            .prepare("SELECT big_id FROM connections WHERE little_id = 3")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();
        assert_eq!(bigs, vec![1]);

        let second_big = conn.execute(
            "INSERT INTO connections (family_tree_id, big_id, little_id) VALUES (1, 2, 3)",
            [],
        );
        assert!(second_big.is_err());
        assert_eq!(get_current_version(&conn).unwrap(), SCHEMA_VERSION);
    }
}
