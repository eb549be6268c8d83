use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use tracing::info;

use super::lock;
use crate::models::{Assignment, AssignmentView};
use crate::utils::error::{AppError, AppResult};

const VIEW_SELECT: &str =
    "SELECT a.id, a.office_id, o.name, a.staff_id, s.name, s.is_active, a.start_date, a.end_date
     FROM assignments a
     JOIN offices o ON a.office_id = o.id
     JOIN staff s ON a.staff_id = s.id";

/// Perioden [?3, ?4] överlappar raden `a`. NULL som slut betyder tillsvidare.
const OVERLAPS: &str = "a.start_date <= COALESCE(?4, '9999-12-31')
     AND (a.end_date IS NULL OR a.end_date >= ?3)";

pub struct AssignmentRepository {
    conn: Arc<Mutex<Connection>>,
    max_staff_per_office: usize,
}

impl AssignmentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>, max_staff_per_office: usize) -> Self {
        Self {
            conn,
            max_staff_per_office,
        }
    }

    /// Skapa uppdrag.
    ///
    /// Avvisas (utan att något skrivs) om handläggaren redan har ett uppdrag på samma
    /// kontor vars period överlappar den nya, eller om kontoret redan har maxantalet
    /// aktiva handläggare under någon del av perioden. Öppet slut räknas som tillsvidare.
    pub fn create(&self, assignment: &mut Assignment) -> AppResult<i64> {
        assignment
            .validate()
            .map_err(|e| AppError::validation(e.to_string()))?;

        let conn = lock(&self.conn)?;

        let office_exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM offices WHERE id = ?)",
            [assignment.office_id],
            |row| row.get(0),
        )?;
        if !office_exists {
            return Err(AppError::not_found(format!("Kontor med ID {}", assignment.office_id)));
        }

        let staff_active: Option<bool> = conn
            .query_row(
                "SELECT is_active FROM staff WHERE id = ?",
                [assignment.staff_id],
                |row| row.get(0),
            )
            .optional()?;
        match staff_active {
            None => {
                return Err(AppError::not_found(format!(
                    "Handläggare med ID {}",
                    assignment.staff_id
                )))
            }
            Some(false) => {
                return Err(AppError::validation("Handläggaren är inaktiverad"));
            }
            Some(true) => {}
        }

        let overlapping: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM assignments a
                 WHERE a.office_id = ?1 AND a.staff_id = ?2 AND {}",
                OVERLAPS
            ),
            params![
                assignment.office_id,
                assignment.staff_id,
                assignment.start_date,
                assignment.end_date
            ],
            |row| row.get(0),
        )?;
        if overlapping > 0 {
            return Err(AppError::validation(
                "Handläggaren har redan ett aktivt uppdrag på detta kontor",
            ));
        }

        let running: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM assignments a
                 JOIN staff s ON a.staff_id = s.id
                 WHERE a.office_id = ?1 AND a.staff_id <> ?2 AND s.is_active = 1 AND {}",
                OVERLAPS
            ),
            params![
                assignment.office_id,
                assignment.staff_id,
                assignment.start_date,
                assignment.end_date
            ],
            |row| row.get(0),
        )?;
        if usize::try_from(running).unwrap_or(usize::MAX) >= self.max_staff_per_office {
            return Err(AppError::validation(format!(
                "Kontoret har redan {} handläggare",
                self.max_staff_per_office
            )));
        }

        conn.execute(
            "INSERT INTO assignments (office_id, staff_id, start_date, end_date)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                assignment.office_id,
                assignment.staff_id,
                assignment.start_date,
                assignment.end_date,
            ],
        )?;

        let id = conn.last_insert_rowid();
        assignment.id = Some(id);

        info!(
            "Uppdrag {} skapat: handläggare {} på kontor {} från {}",
            id, assignment.staff_id, assignment.office_id, assignment.start_date
        );
        Ok(id)
    }

    /// Avsluta uppdrag. Raden och dess besök finns kvar.
    pub fn end(&self, id: i64, end_date: NaiveDate) -> AppResult<()> {
        let conn = lock(&self.conn)?;

        let period: Option<(NaiveDate, Option<NaiveDate>)> = conn
            .query_row(
                "SELECT start_date, end_date FROM assignments WHERE id = ?",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((start_date, current_end)) = period else {
            return Err(AppError::not_found(format!("Uppdrag med ID {}", id)));
        };

        if current_end.is_some() {
            return Err(AppError::validation("Uppdraget är redan avslutat"));
        }
        if end_date < start_date {
            return Err(AppError::validation("Slutdatum kan inte vara före startdatum"));
        }

        conn.execute(
            "UPDATE assignments SET end_date = ?1 WHERE id = ?2",
            params![end_date, id],
        )?;

        info!("Uppdrag {} avslutat {}", id, end_date);
        Ok(())
    }

    /// Hämta uppdrag via ID
    pub fn find_by_id(&self, id: i64) -> AppResult<Option<AssignmentView>> {
        let conn = lock(&self.conn)?;
        let view = conn
            .query_row(
                &format!("{} WHERE a.id = ?", VIEW_SELECT),
                [id],
                Self::row_to_view,
            )
            .optional()?;

        Ok(view)
    }

    /// Pågående uppdrag för ett kontor ett visst datum (endast aktiva handläggare)
    pub fn find_current_for_office(&self, office_id: i64, on: NaiveDate) -> AppResult<Vec<AssignmentView>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE a.office_id = ?1 AND s.is_active = 1
                AND a.start_date <= ?2 AND (a.end_date IS NULL OR a.end_date >= ?2)
             ORDER BY s.name",
            VIEW_SELECT
        ))?;

        let views = stmt
            .query_map(params![office_id, on], Self::row_to_view)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(views)
    }

    /// Hela uppdragshistoriken för ett kontor, även avslutade uppdrag och inaktiva handläggare
    pub fn find_history_for_office(&self, office_id: i64) -> AppResult<Vec<AssignmentView>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE a.office_id = ? ORDER BY a.start_date DESC, s.name",
            VIEW_SELECT
        ))?;

        let views = stmt
            .query_map([office_id], Self::row_to_view)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(views)
    }

    /// Alla uppdrag för en handläggare
    pub fn find_by_staff(&self, staff_id: i64) -> AppResult<Vec<AssignmentView>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE a.staff_id = ? ORDER BY a.start_date DESC, o.name",
            VIEW_SELECT
        ))?;

        let views = stmt
            .query_map([staff_id], Self::row_to_view)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(views)
    }

    /// Alla uppdrag (för export)
    pub fn find_all(&self) -> AppResult<Vec<AssignmentView>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY o.name, a.start_date DESC, s.name",
            VIEW_SELECT
        ))?;

        let views = stmt
            .query_map([], Self::row_to_view)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(views)
    }

    fn row_to_view(row: &Row) -> rusqlite::Result<AssignmentView> {
        Ok(AssignmentView {
            id: row.get(0)?,
            office_id: row.get(1)?,
            office_name: row.get(2)?,
            staff_id: row.get(3)?,
            staff_name: row.get(4)?,
            staff_is_active: row.get(5)?,
            start_date: row.get(6)?,
            end_date: row.get(7)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::Staff;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn office_id(db: &Database, name: &str) -> i64 {
        db.offices().find_by_name(name).unwrap().unwrap().id.unwrap()
    }

    fn staff_id(db: &Database, name: &str) -> i64 {
        db.staff().create(&mut Staff::new(name)).unwrap()
    }

    #[test]
    fn test_reassign_after_end_date() {
        let db = setup_db();
        let repo = db.assignments();
        let a = staff_id(&db, "A");
        let x = office_id(&db, "X");

        let first = repo.create(&mut Assignment::new(x, a, d(2024, 4, 1))).unwrap();

        let duplicate = repo.create(&mut Assignment::new(x, a, d(2024, 5, 1)));
        assert!(matches!(duplicate, Err(AppError::Validation(_))));

        repo.end(first, d(2024, 6, 30)).unwrap();

        let second = repo.create(&mut Assignment::new(x, a, d(2024, 7, 1)));
        assert!(second.is_ok());

        let history = repo.find_history_for_office(x).unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_disjoint_earlier_period_accepted() {
        let db = setup_db();
        let repo = db.assignments();
        let a = staff_id(&db, "A");
        let x = office_id(&db, "X");

        repo.create(&mut Assignment::new(x, a, d(2024, 4, 1))).unwrap();

        let mut earlier = Assignment::new(x, a, d(2023, 4, 1));
        earlier.end_date = Some(d(2023, 9, 30));
        assert!(repo.create(&mut earlier).is_ok());

        let mut touching = Assignment::new(x, a, d(2023, 10, 1));
        touching.end_date = Some(d(2024, 4, 1));
        assert!(matches!(repo.create(&mut touching), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_capacity_counts_only_overlapping_periods() {
        let db = setup_db().with_max_staff_per_office(1);
        let repo = db.assignments();
        let x = office_id(&db, "X");
        let a = staff_id(&db, "A");
        let b = staff_id(&db, "B");

        repo.create(&mut Assignment::new(x, a, d(2024, 4, 1))).unwrap();

        let mut before = Assignment::new(x, b, d(2023, 4, 1));
        before.end_date = Some(d(2024, 3, 31));
        assert!(repo.create(&mut before).is_ok());

        let mut during = Assignment::new(x, b, d(2024, 5, 1));
        during.end_date = Some(d(2024, 5, 31));
        assert!(matches!(repo.create(&mut during), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_overlapping_start_rejected() {
        let db = setup_db();
        let repo = db.assignments();
        let a = staff_id(&db, "A");
        let x = office_id(&db, "X");

        let first = repo.create(&mut Assignment::new(x, a, d(2024, 4, 1))).unwrap();
        repo.end(first, d(2024, 6, 30)).unwrap();

        let overlapping = repo.create(&mut Assignment::new(x, a, d(2024, 6, 30)));
        assert!(matches!(overlapping, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_max_staff_per_office() {
        let db = setup_db();
        let repo = db.assignments();
        let x = office_id(&db, "X");

        for name in ["S1", "S2", "S3", "S4"] {
            let s = staff_id(&db, name);
            repo.create(&mut Assignment::new(x, s, d(2024, 4, 1))).unwrap();
        }

        let fifth = staff_id(&db, "S5");
        let result = repo.create(&mut Assignment::new(x, fifth, d(2024, 4, 1)));
        assert!(matches!(result, Err(AppError::Validation(_))));

        // Ett annat kontor påverkas inte
        let y = office_id(&db, "Y");
        assert!(repo.create(&mut Assignment::new(y, fifth, d(2024, 4, 1))).is_ok());
    }

    #[test]
    fn test_inactive_staff_frees_slot_and_cannot_be_assigned() {
        let db = setup_db().with_max_staff_per_office(1);
        let repo = db.assignments();
        let x = office_id(&db, "X");
        let a = staff_id(&db, "A");
        let b = staff_id(&db, "B");

        repo.create(&mut Assignment::new(x, a, d(2024, 4, 1))).unwrap();
        assert!(repo.create(&mut Assignment::new(x, b, d(2024, 4, 1))).is_err());

        db.staff().set_active(a, false).unwrap();
        assert!(repo.create(&mut Assignment::new(x, b, d(2024, 4, 1))).is_ok());

        let y = office_id(&db, "Y");
        let result = repo.create(&mut Assignment::new(y, a, d(2024, 4, 1)));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_current_vs_history() {
        let db = setup_db();
        let repo = db.assignments();
        let x = office_id(&db, "X");
        let a = staff_id(&db, "A");
        let b = staff_id(&db, "B");

        let ended = repo.create(&mut Assignment::new(x, a, d(2024, 4, 1))).unwrap();
        repo.end(ended, d(2024, 6, 30)).unwrap();
        repo.create(&mut Assignment::new(x, b, d(2024, 5, 1))).unwrap();

        let current = repo.find_current_for_office(x, d(2024, 8, 1)).unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].staff_name, "B");

        let earlier = repo.find_current_for_office(x, d(2024, 5, 15)).unwrap();
        assert_eq!(earlier.len(), 2);

        db.staff().set_active(b, false).unwrap();
        assert!(repo.find_current_for_office(x, d(2024, 8, 1)).unwrap().is_empty());

        let history = repo.find_history_for_office(x).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].staff_name, "B");
        assert!(!history[0].staff_is_active);
        assert_eq!(history[1].end_date, Some(d(2024, 6, 30)));
    }

    #[test]
    fn test_end_validation() {
        let db = setup_db();
        let repo = db.assignments();
        let x = office_id(&db, "X");
        let a = staff_id(&db, "A");

        let id = repo.create(&mut Assignment::new(x, a, d(2024, 4, 1))).unwrap();

        assert!(matches!(repo.end(id, d(2024, 3, 31)), Err(AppError::Validation(_))));
        repo.end(id, d(2024, 4, 1)).unwrap();
        assert!(matches!(repo.end(id, d(2024, 5, 1)), Err(AppError::Validation(_))));
        assert!(matches!(repo.end(999, d(2024, 5, 1)), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_unknown_references() {
        let db = setup_db();
        let repo = db.assignments();
        let a = staff_id(&db, "A");
        let x = office_id(&db, "X");

        assert!(matches!(
            repo.create(&mut Assignment::new(999, a, d(2024, 4, 1))),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            repo.create(&mut Assignment::new(x, 999, d(2024, 4, 1))),
            Err(AppError::NotFound(_))
        ));
    }
}
