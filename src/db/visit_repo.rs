use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use tracing::info;

use super::lock;
use crate::models::{Visit, VisitType, VisitView};
use crate::utils::date::format_date_display;
use crate::utils::error::{AppError, AppResult};

const VIEW_SELECT: &str =
    "SELECT v.id, v.assignment_id, v.visit_date, v.type, v.notes,
            a.staff_id, s.name, s.is_active, a.office_id, o.name
     FROM visits v
     JOIN assignments a ON v.assignment_id = a.id
     JOIN staff s ON a.staff_id = s.id
     JOIN offices o ON a.office_id = o.id";

pub struct VisitRepository {
    conn: Arc<Mutex<Connection>>,
}

impl VisitRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Registrera besök. Besöksdatumet måste ligga inom uppdragets period.
    pub fn create(&self, visit: &mut Visit) -> AppResult<i64> {
        let conn = lock(&self.conn)?;

        let period: Option<(NaiveDate, Option<NaiveDate>)> = conn
            .query_row(
                "SELECT start_date, end_date FROM assignments WHERE id = ?",
                [visit.assignment_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((start, end)) = period else {
            return Err(AppError::not_found(format!(
                "Uppdrag med ID {}",
                visit.assignment_id
            )));
        };

        let within = start <= visit.visit_date && end.map_or(true, |e| visit.visit_date <= e);
        if !within {
            let end_display = end
                .map(format_date_display)
                .unwrap_or_else(|| "現在".to_string());
            return Err(AppError::validation(format!(
                "Besöksdatum måste ligga inom uppdragsperioden ({} 〜 {})",
                format_date_display(start),
                end_display
            )));
        }

        conn.execute(
            "INSERT INTO visits (assignment_id, visit_date, type, notes) VALUES (?1, ?2, ?3, ?4)",
            params![
                visit.assignment_id,
                visit.visit_date,
                visit.visit_type.to_string(),
                visit.notes,
            ],
        )?;

        let id = conn.last_insert_rowid();
        visit.id = Some(id);

        info!(
            "Besök {} registrerat ({}, {})",
            id,
            visit.visit_date,
            visit.visit_type.label()
        );
        Ok(id)
    }

    /// Besök för ett uppdrag, nyaste först
    pub fn find_by_assignment(&self, assignment_id: i64) -> AppResult<Vec<VisitView>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE v.assignment_id = ? ORDER BY v.visit_date DESC, v.id DESC",
            VIEW_SELECT
        ))?;

        let visits = stmt
            .query_map([assignment_id], Self::row_to_view)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(visits)
    }

    /// Besök för ett kontor, sorterat på handläggare och datum
    pub fn find_by_office(&self, office_id: i64, include_inactive_staff: bool) -> AppResult<Vec<VisitView>> {
        let conn = lock(&self.conn)?;

        let mut sql = format!("{} WHERE a.office_id = ?", VIEW_SELECT);
        if !include_inactive_staff {
            sql.push_str(" AND s.is_active = 1");
        }
        sql.push_str(" ORDER BY s.name, v.visit_date DESC, v.id DESC");

        let mut stmt = conn.prepare(&sql)?;
        let visits = stmt
            .query_map([office_id], Self::row_to_view)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(visits)
    }

    /// Senaste genomförda besök på ett kontor, bland aktiva handläggares uppdrag
    /// som inte har avslutats före `on`
    pub fn latest_actual_for_office(&self, office_id: i64, on: NaiveDate) -> AppResult<Option<VisitView>> {
        let conn = lock(&self.conn)?;
        let visit = conn
            .query_row(
                &format!(
                    "{} WHERE a.office_id = ?1 AND s.is_active = 1 AND v.type = ?2
                       AND (a.end_date IS NULL OR a.end_date >= ?3)
                     ORDER BY v.visit_date DESC, v.id DESC LIMIT 1",
                    VIEW_SELECT
                ),
                params![office_id, VisitType::Actual.to_string(), on],
                Self::row_to_view,
            )
            .optional()?;

        Ok(visit)
    }

    /// Alla besök (för export)
    pub fn find_all(&self) -> AppResult<Vec<VisitView>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY o.name, v.visit_date DESC, v.id DESC",
            VIEW_SELECT
        ))?;

        let visits = stmt
            .query_map([], Self::row_to_view)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(visits)
    }

    fn row_to_view(row: &Row) -> rusqlite::Result<VisitView> {
        let type_str: String = row.get(3)?;
        let visit_type = VisitType::from_db_str(&type_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("okänd besökstyp: {}", type_str).into(),
            )
        })?;

        Ok(VisitView {
            id: row.get(0)?,
            assignment_id: row.get(1)?,
            visit_date: row.get(2)?,
            visit_type,
            notes: row.get(4)?,
            staff_id: row.get(5)?,
            staff_name: row.get(6)?,
            staff_is_active: row.get(7)?,
            office_id: row.get(8)?,
            office_name: row.get(9)?,
        })
    }
}
