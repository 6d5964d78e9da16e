use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::{with_connection, BrainError, SharedConnection};

/// One ASME Y14.5 geometric characteristic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacteristicRecord {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub category: String,
    pub asme_section: Option<String>,
    pub datum_required: bool,
    pub datum_optional: bool,
    pub when_to_use: Option<String>,
}

const CHARACTERISTIC_COLUMNS: &str =
    "id, symbol, name, category, asme_section, datum_required, datum_optional, when_to_use";

fn characteristic_from_row(row: &Row<'_>) -> rusqlite::Result<CharacteristicRecord> {
    Ok(CharacteristicRecord {
        id: row.get(0)?,
        symbol: row.get(1)?,
        name: row.get(2)?,
        category: row.get(3)?,
        asme_section: row.get(4)?,
        datum_required: row.get::<_, i32>(5)? != 0,
        datum_optional: row.get::<_, i32>(6)? != 0,
        when_to_use: row.get(7)?,
    })
}

/// Fetch a characteristic by symbol, id or display name (case-insensitive).
pub fn get_characteristic(
    conn: &Connection,
    code: &str,
) -> Result<Option<CharacteristicRecord>, BrainError> {
    let sql = format!(
        "SELECT {CHARACTERISTIC_COLUMNS} FROM geometric_characteristics
         WHERE symbol = ?1 OR id = LOWER(?1) OR name = ?1 COLLATE NOCASE
         LIMIT 1"
    );
    let record = conn
        .query_row(&sql, params![code.trim()], characteristic_from_row)
        .optional()?;
    Ok(record)
}

/// All characteristics in insertion order.
pub fn list_characteristics(conn: &Connection) -> Result<Vec<CharacteristicRecord>, BrainError> {
    let sql = format!("SELECT {CHARACTERISTIC_COLUMNS} FROM geometric_characteristics ORDER BY rowid");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], characteristic_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Substring search over name and usage guidance.
pub fn search_characteristics(
    conn: &Connection,
    query: &str,
) -> Result<Vec<CharacteristicRecord>, BrainError> {
    let pattern = format!("%{}%", query.trim());
    let sql = format!(
        "SELECT {CHARACTERISTIC_COLUMNS} FROM geometric_characteristics
         WHERE LOWER(name) LIKE LOWER(?1) OR LOWER(when_to_use) LIKE LOWER(?1)
         ORDER BY rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![pattern], characteristic_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Async access to the characteristics table.
#[derive(Clone)]
pub struct BrainLookup {
    conn: SharedConnection,
}

impl BrainLookup {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    pub async fn lookup_standard(&self, code: &str) -> Result<Option<CharacteristicRecord>, BrainError> {
        let code = code.to_string();
        with_connection(&self.conn, move |conn| get_characteristic(conn, &code)).await
    }

    pub async fn search_standards(&self, query: &str) -> Result<Vec<CharacteristicRecord>, BrainError> {
        let query = query.to_string();
        with_connection(&self.conn, move |conn| search_characteristics(conn, &query)).await
    }

    pub async fn characteristics(&self) -> Result<Vec<CharacteristicRecord>, BrainError> {
        with_connection(&self.conn, list_characteristics).await
    }
}
