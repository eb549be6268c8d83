use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use tracing::info;

use super::lock;
use crate::models::Staff;
use crate::utils::error::{AppError, AppResult};

const STAFF_COLUMNS: &str = "id, name, is_active, created_at, updated_at";

pub struct StaffRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StaffRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Hämta handläggare, sorterat på namn
    pub fn find_all(&self, active_only: bool) -> AppResult<Vec<Staff>> {
        let conn = lock(&self.conn)?;

        let mut sql = format!("SELECT {} FROM staff", STAFF_COLUMNS);
        if active_only {
            sql.push_str(" WHERE is_active = 1");
        }
        sql.push_str(" ORDER BY name");

        let mut stmt = conn.prepare(&sql)?;
        let staff = stmt
            .query_map([], Self::row_to_staff)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(staff)
    }

    /// Hämta handläggare via ID
    pub fn find_by_id(&self, id: i64) -> AppResult<Option<Staff>> {
        let conn = lock(&self.conn)?;
        let staff = conn
            .query_row(
                &format!("SELECT {} FROM staff WHERE id = ?", STAFF_COLUMNS),
                [id],
                Self::row_to_staff,
            )
            .optional()?;

        Ok(staff)
    }

    /// Hämta handläggare via namn (exakt matchning efter trimning)
    pub fn find_by_name(&self, name: &str) -> AppResult<Option<Staff>> {
        let conn = lock(&self.conn)?;
        let staff = conn
            .query_row(
                &format!("SELECT {} FROM staff WHERE name = ?", STAFF_COLUMNS),
                [name.trim()],
                Self::row_to_staff,
            )
            .optional()?;

        Ok(staff)
    }

    /// Registrera ny handläggare
    pub fn create(&self, staff: &mut Staff) -> AppResult<i64> {
        let name = Staff::normalize_name(&staff.name)
            .map_err(|e| AppError::validation(e.to_string()))?;

        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO staff (name, is_active) VALUES (?1, ?2)",
            params![name, staff.is_active],
        )
        .map_err(|e| AppError::from_unique_violation(e, format!("Handläggare '{}'", name)))?;

        let id = conn.last_insert_rowid();
        staff.id = Some(id);
        staff.name = name;

        info!("Registrerade handläggare {} ({})", staff.name, id);
        Ok(id)
    }

    /// Byt namn på handläggare
    pub fn rename(&self, id: i64, new_name: &str) -> AppResult<()> {
        let name = Staff::normalize_name(new_name)
            .map_err(|e| AppError::validation(e.to_string()))?;

        let conn = lock(&self.conn)?;
        let rows = conn
            .execute(
                "UPDATE staff SET name = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![name, id],
            )
            .map_err(|e| AppError::from_unique_violation(e, format!("Handläggare '{}'", name)))?;

        if rows == 0 {
            return Err(AppError::not_found(format!("Handläggare med ID {}", id)));
        }

        Ok(())
    }

    /// Aktivera eller inaktivera handläggare (raden finns kvar)
    pub fn set_active(&self, id: i64, is_active: bool) -> AppResult<()> {
        let conn = lock(&self.conn)?;
        let rows = conn.execute(
            "UPDATE staff SET is_active = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![is_active, id],
        )?;

        if rows == 0 {
            return Err(AppError::not_found(format!("Handläggare med ID {}", id)));
        }

        info!(
            "Handläggare {} {}",
            id,
            if is_active { "aktiverad" } else { "inaktiverad" }
        );
        Ok(())
    }

    /// Räkna handläggare
    pub fn count(&self, active_only: bool) -> AppResult<i64> {
        let conn = lock(&self.conn)?;
        let sql = if active_only {
            "SELECT COUNT(*) FROM staff WHERE is_active = 1"
        } else {
            "SELECT COUNT(*) FROM staff"
        };
        let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count)
    }

    fn row_to_staff(row: &Row) -> rusqlite::Result<Staff> {
        Ok(Staff {
            id: row.get(0)?,
            name: row.get(1)?,
            is_active: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}
