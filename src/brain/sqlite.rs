use std::path::Path;

use rusqlite::{params, Connection};

use super::BrainError;
use crate::models::{DatumRule, GdtCharacteristic};

/// Open a SQLite connection to the given path and run migrations
pub fn open_database(path: &Path) -> Result<Connection, BrainError> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, BrainError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), BrainError> {
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), BrainError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> =
        vec![(1, include_str!("../../resources/migrations/001_initial.sql"))];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql)
                .map_err(|e| BrainError::MigrationFailed {
                    version,
                    reason: e.to_string(),
                })?;
        }
    }

    Ok(())
}

/// Current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, Option<i64>>(0)
    })
    .ok()
    .flatten()
    .unwrap_or(0)
}

fn when_to_use(c: GdtCharacteristic) -> &'static str {
    use GdtCharacteristic::*;
    match c {
        Straightness => "Line elements or the axis of a cylindrical feature must be straight, such as shafts and pins.",
        Flatness => "A single surface must be flat on its own, such as a sealing or mounting face.",
        Circularity => "Cross sections of a round feature must be round, such as bearing journals.",
        Cylindricity => "A whole cylinder must be round and straight together, such as press-fit bores.",
        ProfileOfALine => "Cross sections of a curved or irregular surface must follow a true profile.",
        ProfileOfASurface => "A complex or freeform surface must lie within a uniform zone, such as molded or cast parts.",
        Angularity => "A feature must hold a basic angle other than 90 degrees to a datum.",
        Parallelism => "A surface or axis must stay parallel to a datum, such as opposing faces of a slot.",
        Perpendicularity => "A surface or axis must stand square to a datum, such as a boss or bore on a mounting face.",
        Position => "Holes, bosses and patterns that locate or mate with other parts, typically with MMC for fasteners.",
        Concentricity => "Median points of a revolved feature must share a datum axis; prefer runout or position.",
        Symmetry => "Median points of a feature must be centered on a datum plane; prefer position or profile.",
        CircularRunout => "Each circular element of a rotating part must run true to a datum axis.",
        TotalRunout => "The whole surface of a rotating part must run true to a datum axis, such as shaft seats.",
    }
}

/// Insert the 14 ASME Y14.5 characteristics plus typical process capability
/// and material reference rows. Existing rows are left alone.
///
/// Returns the number of characteristic rows inserted.
pub fn seed_defaults(conn: &Connection) -> Result<usize, BrainError> {
    let mut inserted = 0;
    {
        let mut stmt = conn.prepare(
            "INSERT OR IGNORE INTO geometric_characteristics
             (id, symbol, name, category, asme_section, datum_required, datum_optional, when_to_use)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for c in GdtCharacteristic::ALL {
            let rule = c.category().datum_rule();
            inserted += stmt.execute(params![
                c.as_str(),
                c.symbol(),
                c.display_name(),
                c.category().as_str(),
                c.asme_section(),
                (rule == DatumRule::Required) as i32,
                (rule == DatumRule::Optional) as i32,
                when_to_use(c),
            ])?;
        }
    }

    conn.execute_batch(include_str!("../../resources/seed/reference_data.sql"))?;
    tracing::info!(characteristics = inserted, "Seeded brain reference data");
    Ok(inserted)
}

/// Count tables in the database (for verification)
#[cfg(test)]
fn count_tables(conn: &Connection) -> Result<i64, BrainError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_initializes_all_tables() {
        let conn = open_memory_database().unwrap();
        // schema_version + 3 reference tables
        assert_eq!(count_tables(&conn).unwrap(), 4);
    }

    #[test]
    fn schema_version_is_current() {
        let conn = open_memory_database().unwrap();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn migration_idempotent() {
        let conn = open_memory_database().unwrap();
        assert!(run_migrations(&conn).is_ok());
    }

    #[test]
    fn seed_inserts_fourteen_characteristics_once() {
        let conn = open_memory_database().unwrap();
        assert_eq!(seed_defaults(&conn).unwrap(), 14);
        assert_eq!(seed_defaults(&conn).unwrap(), 0);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM geometric_characteristics", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 14);
    }

    #[test]
    fn seeded_datum_flags_follow_category() {
        let conn = open_memory_database().unwrap();
        seed_defaults(&conn).unwrap();
        let flags = |id: &str| -> (i64, i64) {
            conn.query_row(
                "SELECT datum_required, datum_optional FROM geometric_characteristics WHERE id = ?1",
                [id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap()
        };
        assert_eq!(flags("flatness"), (0, 0));
        assert_eq!(flags("profile_of_a_surface"), (0, 1));
        assert_eq!(flags("position"), (1, 0));
    }

    #[test]
    fn seed_adds_reference_rows() {
        let conn = open_memory_database().unwrap();
        seed_defaults(&conn).unwrap();
        let tolerances: i64 = conn
            .query_row("SELECT COUNT(*) FROM tolerance_tables", [], |r| r.get(0))
            .unwrap();
        let materials: i64 = conn
            .query_row("SELECT COUNT(*) FROM material_properties", [], |r| r.get(0))
            .unwrap();
        assert!(tolerances > 0);
        assert!(materials > 0);
    }

    #[test]
    fn file_database_persists_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brain.db");
        {
            let conn = open_database(&path).unwrap();
            seed_defaults(&conn).unwrap();
        }
        let conn = open_database(&path).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM geometric_characteristics", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 14);
    }
}
