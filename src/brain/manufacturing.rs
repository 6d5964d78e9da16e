use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{with_connection, BrainError, SharedConnection};
use crate::models::FeatureType;
use crate::pipeline::{CollaboratorError, MaterialProperties, ToleranceLookup, ToleranceRange};

fn tolerance_from_row(row: &Row<'_>) -> rusqlite::Result<ToleranceRange> {
    Ok(ToleranceRange {
        process: row.get(0)?,
        material: row.get(1)?,
        feature_type: row.get(2)?,
        min_mm: row.get(3)?,
        max_mm: row.get(4)?,
        achievable_best_mm: row.get(5)?,
        notes: row.get(6)?,
    })
}

/// Normalise free text like "AL6061-T6" or "Cnc Milling" to the table key
/// form (`al6061_t6`, `cnc_milling`).
fn normalize_key(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Resolve a material to its `material_properties.id`, by id or by name.
fn resolve_material_id(conn: &Connection, material: &str) -> Result<Option<String>, BrainError> {
    let key = normalize_key(material);
    if key.is_empty() {
        return Ok(None);
    }
    let id = conn
        .query_row(
            "SELECT id FROM material_properties
             WHERE id = ?1 OR LOWER(name) = LOWER(?2) OR LOWER(name) LIKE LOWER(?3)
             ORDER BY CASE WHEN id = ?1 THEN 0 WHEN LOWER(name) = LOWER(?2) THEN 1 ELSE 2 END
             LIMIT 1",
            params![key, material.trim(), format!("%{}%", material.trim())],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(id)
}

pub fn get_tolerance_range(
    conn: &Connection,
    process: &str,
    material: &str,
    feature_type: &str,
) -> Result<Option<ToleranceRange>, BrainError> {
    let material_id = resolve_material_id(conn, material)?.unwrap_or_else(|| normalize_key(material));
    let range = conn
        .query_row(
            "SELECT process, material, feature_type, min_mm, max_mm, achievable_best_mm, notes
             FROM tolerance_tables
             WHERE process = ?1 AND material = ?2 AND feature_type = ?3",
            params![normalize_key(process), material_id, feature_type],
            tolerance_from_row,
        )
        .optional()?;
    Ok(range)
}

/// Capability rows for a process, optionally narrowed to one material.
pub fn get_process_capability(
    conn: &Connection,
    process: &str,
    material: Option<&str>,
) -> Result<Vec<ToleranceRange>, BrainError> {
    let material_id = match material.filter(|m| !m.trim().is_empty()) {
        Some(m) => Some(resolve_material_id(conn, m)?.unwrap_or_else(|| normalize_key(m))),
        None => None,
    };
    let mut stmt = conn.prepare(
        "SELECT process, material, feature_type, min_mm, max_mm, achievable_best_mm, notes
         FROM tolerance_tables
         WHERE process = ?1 AND (?2 IS NULL OR material = ?2)
         ORDER BY material, feature_type",
    )?;
    let rows = stmt.query_map(params![normalize_key(process), material_id], tolerance_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn get_material_properties(
    conn: &Connection,
    material: &str,
) -> Result<Option<MaterialProperties>, BrainError> {
    let Some(id) = resolve_material_id(conn, material)? else {
        return Ok(None);
    };

    let row = conn.query_row(
        "SELECT id, name, category, common_processes, machinability, thermal_expansion_ppm_c,
                density_g_cm3, yield_strength_mpa, hardness, notes
         FROM material_properties WHERE id = ?1",
        params![id],
        |row| {
            Ok((
                row.get::<_, String>(3)?,
                MaterialProperties {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    category: row.get(2)?,
                    common_processes: Vec::new(),
                    machinability: row.get(4)?,
                    thermal_expansion_ppm_c: row.get(5)?,
                    density_g_cm3: row.get(6)?,
                    yield_strength_mpa: row.get(7)?,
                    hardness: row.get(8)?,
                    notes: row.get(9)?,
                },
            ))
        },
    )?;

    let (processes, mut props) = row;
    props.common_processes =
        serde_json::from_str(&processes).map_err(|e| BrainError::InvalidJson {
            column: "common_processes".into(),
            reason: e.to_string(),
        })?;
    Ok(Some(props))
}

/// Process capability and material data, backed by the brain database.
#[derive(Clone)]
pub struct ManufacturingLookup {
    conn: SharedConnection,
}

impl ManufacturingLookup {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    pub async fn process_capability(
        &self,
        process: &str,
        material: Option<&str>,
    ) -> Result<Vec<ToleranceRange>, BrainError> {
        let process = process.to_string();
        let material = material.map(str::to_string);
        with_connection(&self.conn, move |conn| {
            get_process_capability(conn, &process, material.as_deref())
        })
        .await
    }
}

#[async_trait]
impl ToleranceLookup for ManufacturingLookup {
    async fn get_range(
        &self,
        process: &str,
        material: &str,
        feature_type: FeatureType,
    ) -> Result<Option<ToleranceRange>, CollaboratorError> {
        let (process, material) = (process.to_string(), material.to_string());
        let range = with_connection(&self.conn, move |conn| {
            get_tolerance_range(conn, &process, &material, feature_type.as_str())
        })
        .await?;
        Ok(range)
    }

    async fn get_material_properties(
        &self,
        material: &str,
    ) -> Result<Option<MaterialProperties>, CollaboratorError> {
        let material = material.to_string();
        let props =
            with_connection(&self.conn, move |conn| get_material_properties(conn, &material))
                .await?;
        Ok(props)
    }
}
