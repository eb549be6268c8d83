use rusqlite::{Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

use super::lock;
use crate::models::Office;
use crate::utils::error::{AppError, AppResult};

pub struct OfficeRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OfficeRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Hämta alla kontor
    pub fn find_all(&self) -> AppResult<Vec<Office>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare("SELECT id, name FROM offices ORDER BY name")?;

        let offices = stmt
            .query_map([], Self::row_to_office)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(offices)
    }

    /// Hämta kontor via ID
    pub fn find_by_id(&self, id: i64) -> AppResult<Option<Office>> {
        let conn = lock(&self.conn)?;
        let office = conn
            .query_row(
                "SELECT id, name FROM offices WHERE id = ?",
                [id],
                Self::row_to_office,
            )
            .optional()?;

        Ok(office)
    }

    /// Hämta kontor via namn
    pub fn find_by_name(&self, name: &str) -> AppResult<Option<Office>> {
        let conn = lock(&self.conn)?;
        let office = conn
            .query_row(
                "SELECT id, name FROM offices WHERE name = ?",
                [name.trim()],
                Self::row_to_office,
            )
            .optional()?;

        Ok(office)
    }

    /// Lägg till ett kontor utöver standardkontoren
    pub fn create(&self, office: &mut Office) -> AppResult<i64> {
        let name = office.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("Kontorsnamn krävs"));
        }

        let conn = lock(&self.conn)?;
        conn.execute("INSERT INTO offices (name) VALUES (?)", [&name])
            .map_err(|e| AppError::from_unique_violation(e, format!("Kontor '{}'", name)))?;

        let id = conn.last_insert_rowid();
        office.id = Some(id);
        office.name = name;
        Ok(id)
    }

    fn row_to_office(row: &Row) -> rusqlite::Result<Office> {
        Ok(Office {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    }
}
