use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use tracing::info;

use super::lock;
use crate::models::{VehicleApplication, VehicleApplicationRevision, VehicleKey};
use crate::upsert::{next_in_scope, upsert, NaturalKeyStore, UpsertOutcome};
use crate::utils::error::{AppError, AppResult};

const APPLICATION_COLUMNS: &str =
    "id, staff_id, fiscal_year, vehicle_seq, vehicle_number, maker_model, insurance_company,
     insurance_expiry, commute_distance_km, notes, created_at, updated_at";

/// Repository för pendlingsfordon
pub struct VehicleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl VehicleRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Lämna in en ansökan. Samma handläggare, räkenskapsår och registreringsnummer
    /// uppdaterar den befintliga ansökan.
    pub fn submit(&self, application: &VehicleApplication) -> AppResult<UpsertOutcome> {
        let key = application.key();
        let outcome = upsert(self, &key, application)?;

        match &outcome {
            UpsertOutcome::Created { id, sequence } => info!(
                "Fordonsansökan {} skapad (handläggare {}, år {}, nr {:?})",
                id, key.staff_id, key.fiscal_year, sequence
            ),
            UpsertOutcome::Updated { id } => info!("Fordonsansökan {} uppdaterad", id),
            UpsertOutcome::Rejected(reason) => info!("Fordonsansökan avvisad: {}", reason),
        }

        Ok(outcome)
    }

    /// Hämta ansökan via naturlig nyckel
    pub fn find_application(&self, key: &VehicleKey) -> AppResult<Option<VehicleApplication>> {
        let conn = lock(&self.conn)?;
        let app = conn
            .query_row(
                &format!(
                    "SELECT {} FROM vehicle_applications
                     WHERE staff_id = ?1 AND fiscal_year = ?2 AND vehicle_number = ?3",
                    APPLICATION_COLUMNS
                ),
                params![key.staff_id, key.fiscal_year, key.vehicle_number],
                Self::row_to_application,
            )
            .optional()?;

        Ok(app)
    }

    /// Hämta ansökan via ID
    pub fn find_by_id(&self, id: i64) -> AppResult<Option<VehicleApplication>> {
        let conn = lock(&self.conn)?;
        let app = conn
            .query_row(
                &format!("SELECT {} FROM vehicle_applications WHERE id = ?", APPLICATION_COLUMNS),
                [id],
                Self::row_to_application,
            )
            .optional()?;

        Ok(app)
    }

    /// Alla ansökningar för en handläggare
    pub fn find_by_staff(&self, staff_id: i64) -> AppResult<Vec<VehicleApplication>> {
        self.query_list(
            "WHERE staff_id = ? ORDER BY fiscal_year DESC, vehicle_seq",
            staff_id,
        )
    }

    /// Alla ansökningar för ett räkenskapsår
    pub fn find_by_fiscal_year(&self, fiscal_year: i32) -> AppResult<Vec<VehicleApplication>> {
        self.query_list(
            "WHERE fiscal_year = ? ORDER BY staff_id, vehicle_seq",
            i64::from(fiscal_year),
        )
    }

    /// Alla ansökningar (för export)
    pub fn find_all(&self) -> AppResult<Vec<VehicleApplication>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM vehicle_applications ORDER BY fiscal_year DESC, staff_id, vehicle_seq",
            APPLICATION_COLUMNS
        ))?;

        let apps = stmt
            .query_map([], Self::row_to_application)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(apps)
    }

    /// Tidigare versioner av en ansökan, äldsta först
    pub fn history(&self, application_id: i64) -> AppResult<Vec<VehicleApplicationRevision>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, application_id, vehicle_number, maker_model, insurance_company,
                    insurance_expiry, commute_distance_km, notes, superseded_at
             FROM vehicle_application_history
             WHERE application_id = ?
             ORDER BY id",
        )?;

        let revisions = stmt
            .query_map([application_id], |row| {
                Ok(VehicleApplicationRevision {
                    id: row.get(0)?,
                    application_id: row.get(1)?,
                    vehicle_number: row.get(2)?,
                    maker_model: row.get(3)?,
                    insurance_company: row.get(4)?,
                    insurance_expiry: row.get(5)?,
                    commute_distance_km: row.get(6)?,
                    notes: row.get(7)?,
                    superseded_at: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(revisions)
    }

    fn query_list(&self, clause: &str, param: i64) -> AppResult<Vec<VehicleApplication>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM vehicle_applications {}",
            APPLICATION_COLUMNS, clause
        ))?;

        let apps = stmt
            .query_map([param], Self::row_to_application)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(apps)
    }

    fn row_to_application(row: &Row) -> rusqlite::Result<VehicleApplication> {
        Ok(VehicleApplication {
            id: row.get(0)?,
            staff_id: row.get(1)?,
            fiscal_year: row.get(2)?,
            vehicle_seq: row.get(3)?,
            vehicle_number: row.get(4)?,
            maker_model: row.get(5)?,
            insurance_company: row.get(6)?,
            insurance_expiry: row.get(7)?,
            commute_distance_km: row.get(8)?,
            notes: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

impl NaturalKeyStore for VehicleRepository {
    type Key = VehicleKey;
    type Fields = VehicleApplication;

    fn validate(&self, key: &VehicleKey, fields: &VehicleApplication, _existing: Option<i64>) -> AppResult<()> {
        fields
            .validate()
            .map_err(|e| AppError::validation(e.to_string()))?;

        let conn = lock(&self.conn)?;
        let staff_active: Option<bool> = conn
            .query_row(
                "SELECT is_active FROM staff WHERE id = ?",
                [key.staff_id],
                |row| row.get(0),
            )
            .optional()?;

        match staff_active {
            None => Err(AppError::validation(format!(
                "Handläggare med ID {} finns inte",
                key.staff_id
            ))),
            Some(false) => Err(AppError::validation("Handläggaren är inaktiverad")),
            Some(true) => Ok(()),
        }
    }

    fn find_by_key(&self, key: &VehicleKey) -> AppResult<Option<i64>> {
        let conn = lock(&self.conn)?;
        let id = conn
            .query_row(
                "SELECT id FROM vehicle_applications
                 WHERE staff_id = ?1 AND fiscal_year = ?2 AND vehicle_number = ?3",
                params![key.staff_id, key.fiscal_year, key.vehicle_number],
                |row| row.get(0),
            )
            .optional()?;

        Ok(id)
    }

    fn next_sequence(&self, key: &VehicleKey) -> AppResult<Option<i64>> {
        let conn = lock(&self.conn)?;
        let max: Option<i64> = conn.query_row(
            "SELECT MAX(vehicle_seq) FROM vehicle_applications WHERE staff_id = ?1 AND fiscal_year = ?2",
            params![key.staff_id, key.fiscal_year],
            |row| row.get(0),
        )?;

        Ok(Some(next_in_scope(max)))
    }

    fn insert(&self, key: &VehicleKey, sequence: Option<i64>, fields: &VehicleApplication) -> AppResult<i64> {
        let seq = sequence.ok_or_else(|| AppError::other("Löpnummer saknas för fordonsansökan"))?;

        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO vehicle_applications
                (staff_id, fiscal_year, vehicle_seq, vehicle_number, maker_model,
                 insurance_company, insurance_expiry, commute_distance_km, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                key.staff_id,
                key.fiscal_year,
                seq,
                key.vehicle_number,
                fields.maker_model,
                fields.insurance_company,
                fields.insurance_expiry,
                fields.commute_distance_km,
                fields.notes,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn update(&self, id: i64, fields: &VehicleApplication) -> AppResult<()> {
        let conn = lock(&self.conn)?;

        conn.execute(
            "INSERT INTO vehicle_application_history
                (application_id, vehicle_number, maker_model, insurance_company,
                 insurance_expiry, commute_distance_km, notes)
             SELECT id, vehicle_number, maker_model, insurance_company,
                    insurance_expiry, commute_distance_km, notes
             FROM vehicle_applications WHERE id = ?",
            [id],
        )?;

        let rows = conn.execute(
            "UPDATE vehicle_applications SET
                maker_model = ?1, insurance_company = ?2, insurance_expiry = ?3,
                commute_distance_km = ?4, notes = ?5, updated_at = datetime('now')
             WHERE id = ?6",
            params![
                fields.maker_model,
                fields.insurance_company,
                fields.insurance_expiry,
                fields.commute_distance_km,
                fields.notes,
                id,
            ],
        )?;

        if rows == 0 {
            return Err(AppError::not_found(format!("Fordonsansökan med ID {}", id)));
        }

        Ok(())
    }
}
