use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use tracing::info;

use super::lock;
use crate::models::{PurchaseKey, PurchaseRequest, PurchaseRequestRevision, PurchaseStatus};
use crate::upsert::{next_in_scope, upsert, NaturalKeyStore, UpsertOutcome};
use crate::utils::error::{AppError, AppResult};

const REQUEST_COLUMNS: &str =
    "id, document_id, fiscal_year, request_seq, requester_staff_id, item_name, quantity,
     unit_price, vendor, requested_on, status, notes, created_at, updated_at";

/// Repository för inköpsärenden
pub struct PurchaseRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PurchaseRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Lämna in ett ärende. Utan dokument-ID skapas ett nytt ärende med genererat ID;
    /// med ett befintligt dokument-ID uppdateras ärendet.
    pub fn submit(&self, request: &PurchaseRequest) -> AppResult<UpsertOutcome> {
        let key = request.key();
        let outcome = upsert(self, &key, request)?;

        match &outcome {
            UpsertOutcome::Created { id, sequence } => info!(
                "Inköpsärende {} skapat (år {}, nr {:?})",
                id, key.fiscal_year, sequence
            ),
            UpsertOutcome::Updated { id } => info!(
                "Inköpsärende {} uppdaterat, status {}",
                id,
                request.status.label()
            ),
            UpsertOutcome::Rejected(reason) => info!("Inköpsärende avvisat: {}", reason),
        }

        Ok(outcome)
    }

    /// Byt status på ett befintligt ärende
    pub fn set_status(&self, id: i64, status: PurchaseStatus) -> AppResult<UpsertOutcome> {
        let mut request = self
            .find_by_id(id)?
            .ok_or_else(|| AppError::not_found(format!("Inköpsärende med ID {}", id)))?;

        request.status = status;
        self.submit(&request)
    }

    /// Hämta ärende via ID
    pub fn find_by_id(&self, id: i64) -> AppResult<Option<PurchaseRequest>> {
        let conn = lock(&self.conn)?;
        let request = conn
            .query_row(
                &format!("SELECT {} FROM purchase_requests WHERE id = ?", REQUEST_COLUMNS),
                [id],
                Self::row_to_request,
            )
            .optional()?;

        Ok(request)
    }

    /// Hämta ärende via räkenskapsår och dokument-ID
    pub fn find_request(&self, fiscal_year: i32, document_id: &str) -> AppResult<Option<PurchaseRequest>> {
        let conn = lock(&self.conn)?;
        let request = conn
            .query_row(
                &format!(
                    "SELECT {} FROM purchase_requests WHERE fiscal_year = ?1 AND document_id = ?2",
                    REQUEST_COLUMNS
                ),
                params![fiscal_year, document_id.trim()],
                Self::row_to_request,
            )
            .optional()?;

        Ok(request)
    }

    /// Alla ärenden för ett räkenskapsår, i löpnummerordning
    pub fn find_by_fiscal_year(&self, fiscal_year: i32) -> AppResult<Vec<PurchaseRequest>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM purchase_requests WHERE fiscal_year = ? ORDER BY request_seq",
            REQUEST_COLUMNS
        ))?;

        let requests = stmt
            .query_map([fiscal_year], Self::row_to_request)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(requests)
    }

    /// Ärenden med en viss status
    pub fn find_by_status(&self, status: PurchaseStatus) -> AppResult<Vec<PurchaseRequest>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM purchase_requests WHERE status = ?
             ORDER BY fiscal_year DESC, request_seq",
            REQUEST_COLUMNS
        ))?;

        let requests = stmt
            .query_map([status.to_string()], Self::row_to_request)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(requests)
    }

    /// Alla ärenden (för export)
    pub fn find_all(&self) -> AppResult<Vec<PurchaseRequest>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM purchase_requests ORDER BY fiscal_year DESC, request_seq",
            REQUEST_COLUMNS
        ))?;

        let requests = stmt
            .query_map([], Self::row_to_request)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(requests)
    }

    /// Tidigare versioner av ett ärende, äldsta först
    pub fn history(&self, request_id: i64) -> AppResult<Vec<PurchaseRequestRevision>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, request_id, requester_staff_id, item_name, requested_on,
                    status, quantity, unit_price, vendor, notes, superseded_at
             FROM purchase_request_history
             WHERE request_id = ?
             ORDER BY id",
        )?;

        let revisions = stmt
            .query_map([request_id], |row| {
                Ok(PurchaseRequestRevision {
                    id: row.get(0)?,
                    request_id: row.get(1)?,
                    requester_staff_id: row.get(2)?,
                    item_name: row.get(3)?,
                    requested_on: row.get(4)?,
                    status: Self::status_column(row, 5)?,
                    quantity: row.get(6)?,
                    unit_price: row.get(7)?,
                    vendor: row.get(8)?,
                    notes: row.get(9)?,
                    superseded_at: row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(revisions)
    }

    /// Nuvarande status och beställare
    fn current_state(&self, id: i64) -> AppResult<Option<(PurchaseStatus, i64)>> {
        let conn = lock(&self.conn)?;
        let state = conn
            .query_row(
                "SELECT status, requester_staff_id FROM purchase_requests WHERE id = ?",
                [id],
                |row| Ok((Self::status_column(row, 0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(state)
    }

    fn check_requester(&self, staff_id: i64) -> AppResult<()> {
        let conn = lock(&self.conn)?;
        let active: Option<bool> = conn
            .query_row(
                "SELECT is_active FROM staff WHERE id = ?",
                [staff_id],
                |row| row.get(0),
            )
            .optional()?;

        if active != Some(true) {
            return Err(AppError::validation(
                "Beställaren finns inte eller är inaktiverad",
            ));
        }
        Ok(())
    }

    fn status_column(row: &Row, idx: usize) -> rusqlite::Result<PurchaseStatus> {
        let s: String = row.get(idx)?;
        PurchaseStatus::from_db_str(&s).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                format!("okänd status: {}", s).into(),
            )
        })
    }

    fn row_to_request(row: &Row) -> rusqlite::Result<PurchaseRequest> {
        Ok(PurchaseRequest {
            id: row.get(0)?,
            document_id: row.get(1)?,
            fiscal_year: row.get(2)?,
            request_seq: row.get(3)?,
            requester_staff_id: row.get(4)?,
            item_name: row.get(5)?,
            quantity: row.get(6)?,
            unit_price: row.get(7)?,
            vendor: row.get(8)?,
            requested_on: row.get(9)?,
            status: Self::status_column(row, 10)?,
            notes: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }
}

impl NaturalKeyStore for PurchaseRepository {
    type Key = PurchaseKey;
    type Fields = PurchaseRequest;

    fn validate(&self, key: &PurchaseKey, fields: &PurchaseRequest, existing: Option<i64>) -> AppResult<()> {
        fields
            .validate()
            .map_err(|e| AppError::validation(e.to_string()))?;

        match existing {
            Some(id) => {
                let (current, requester) = self
                    .current_state(id)?
                    .ok_or_else(|| AppError::not_found(format!("Inköpsärende med ID {}", id)))?;
                if !current.can_transition_to(fields.status) {
                    return Err(AppError::validation(format!(
                        "Statusbyte {} → {} är inte tillåtet",
                        current.label(),
                        fields.status.label()
                    )));
                }
                // Befintlig beställare får vara inaktiverad, en ny måste vara aktiv
                if requester != fields.requester_staff_id {
                    self.check_requester(fields.requester_staff_id)?;
                }
            }
            None => {
                if !fields.status.is_initial() {
                    return Err(AppError::validation(format!(
                        "Ett nytt ärende kan inte börja som {}",
                        fields.status.label()
                    )));
                }

                // Genererade ID:n är reserverade, annars kan löpnumret krocka senare
                if let Some(document_id) = key.document_id.as_deref() {
                    if PurchaseRequest::is_generated_document_id(key.fiscal_year, document_id) {
                        return Err(AppError::validation(format!(
                            "Dokument-ID {} är reserverat för automatisk numrering",
                            document_id
                        )));
                    }
                }

                self.check_requester(fields.requester_staff_id)?;
            }
        }

        Ok(())
    }

    fn find_by_key(&self, key: &PurchaseKey) -> AppResult<Option<i64>> {
        let Some(document_id) = key.document_id.as_deref() else {
            return Ok(None);
        };

        let conn = lock(&self.conn)?;
        let id = conn
            .query_row(
                "SELECT id FROM purchase_requests WHERE fiscal_year = ?1 AND document_id = ?2",
                params![key.fiscal_year, document_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(id)
    }

    fn next_sequence(&self, key: &PurchaseKey) -> AppResult<Option<i64>> {
        let conn = lock(&self.conn)?;
        let max: Option<i64> = conn.query_row(
            "SELECT MAX(request_seq) FROM purchase_requests WHERE fiscal_year = ?",
            [key.fiscal_year],
            |row| row.get(0),
        )?;

        Ok(Some(next_in_scope(max)))
    }

    fn insert(&self, key: &PurchaseKey, sequence: Option<i64>, fields: &PurchaseRequest) -> AppResult<i64> {
        let seq = sequence.ok_or_else(|| AppError::other("Löpnummer saknas för inköpsärende"))?;
        let document_id = key
            .document_id
            .clone()
            .unwrap_or_else(|| PurchaseRequest::generate_document_id(key.fiscal_year, seq));

        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO purchase_requests
                (document_id, fiscal_year, request_seq, requester_staff_id, item_name,
                 quantity, unit_price, vendor, requested_on, status, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                document_id,
                key.fiscal_year,
                seq,
                fields.requester_staff_id,
                fields.item_name.trim(),
                fields.quantity,
                fields.unit_price,
                fields.vendor,
                fields.requested_on,
                fields.status.to_string(),
                fields.notes,
            ],
        )
        .map_err(|e| AppError::from_unique_violation(e, format!("Dokument-ID {}", document_id)))?;

        Ok(conn.last_insert_rowid())
    }

    fn update(&self, id: i64, fields: &PurchaseRequest) -> AppResult<()> {
        let conn = lock(&self.conn)?;

        conn.execute(
            "INSERT INTO purchase_request_history
                (request_id, requester_staff_id, item_name, requested_on,
                 status, quantity, unit_price, vendor, notes)
             SELECT id, requester_staff_id, item_name, requested_on,
                    status, quantity, unit_price, vendor, notes
             FROM purchase_requests WHERE id = ?",
            [id],
        )?;

        let rows = conn.execute(
            "UPDATE purchase_requests SET
                requester_staff_id = ?1, item_name = ?2, quantity = ?3, unit_price = ?4,
                vendor = ?5, requested_on = ?6, status = ?7, notes = ?8,
                updated_at = datetime('now')
             WHERE id = ?9",
            params![
                fields.requester_staff_id,
                fields.item_name.trim(),
                fields.quantity,
                fields.unit_price,
                fields.vendor,
                fields.requested_on,
                fields.status.to_string(),
                fields.notes,
                id,
            ],
        )?;

        if rows == 0 {
            return Err(AppError::not_found(format!("Inköpsärende med ID {}", id)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::Staff;
    use chrono::NaiveDate;

    fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let staff_id = db.staff().create(&mut Staff::new("Ito")).unwrap();
        (db, staff_id)
    }

    fn request(staff_id: i64) -> PurchaseRequest {
        let mut req = PurchaseRequest::new(
            staff_id,
            2024,
            "Kopieringspapper A4",
            10,
            580,
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        );
        req.vendor = Some("Askul".into());
        req
    }

    #[test]
    fn test_new_requests_get_generated_document_ids() {
        let (db, staff) = setup();
        let repo = db.purchases();

        let first = repo.submit(&request(staff)).unwrap();
        let second = repo.submit(&request(staff)).unwrap();

        assert!(matches!(first, UpsertOutcome::Created { sequence: Some(1), .. }));
        assert!(matches!(second, UpsertOutcome::Created { sequence: Some(2), .. }));

        let listed = repo.find_by_fiscal_year(2024).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].document_id.as_deref(), Some("PR2024-0001"));
        assert_eq!(listed[1].document_id.as_deref(), Some("PR2024-0002"));
    }

    #[test]
    fn test_resubmission_with_document_id_updates() {
        let (db, staff) = setup();
        let repo = db.purchases();

        let id = repo.submit(&request(staff)).unwrap().id().unwrap();

        let mut edited = repo.find_by_id(id).unwrap().unwrap();
        edited.quantity = 20;
        edited.notes = Some("Dubbel beställning inför kvartalsskiftet".into());

        assert_eq!(repo.submit(&edited).unwrap(), UpsertOutcome::Updated { id });
        assert_eq!(repo.submit(&edited).unwrap(), UpsertOutcome::Updated { id });

        let stored = repo.find_request(2024, "PR2024-0001").unwrap().unwrap();
        assert_eq!(stored.quantity, 20);
        assert_eq!(stored.total(), Some(11_600));
        assert_eq!(repo.find_by_fiscal_year(2024).unwrap().len(), 1);

        let history = repo.history(id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].quantity, 10);
        assert_eq!(history[1].quantity, 20);
    }

    #[test]
    fn test_user_supplied_document_id() {
        let (db, staff) = setup();
        let repo = db.purchases();

        let mut req = request(staff);
        req.document_id = Some("KAIKEI-77".into());
        let outcome = repo.submit(&req).unwrap();
        assert!(matches!(outcome, UpsertOutcome::Created { sequence: Some(1), .. }));

        // Samma dokument-ID ett annat år är ett annat ärende
        req.fiscal_year = 2025;
        req.requested_on = NaiveDate::from_ymd_opt(2025, 4, 7).unwrap();
        let other_year = repo.submit(&req).unwrap();
        assert!(matches!(other_year, UpsertOutcome::Created { sequence: Some(1), .. }));
    }

    #[test]
    fn test_status_workflow() {
        let (db, staff) = setup();
        let repo = db.purchases();

        let id = repo.submit(&request(staff)).unwrap().id().unwrap();

        assert!(repo.set_status(id, PurchaseStatus::Approved).unwrap().is_rejected());
        assert_eq!(
            repo.find_by_id(id).unwrap().unwrap().status,
            PurchaseStatus::Draft
        );

        for status in [
            PurchaseStatus::Submitted,
            PurchaseStatus::Approved,
            PurchaseStatus::Ordered,
            PurchaseStatus::Delivered,
        ] {
            assert_eq!(repo.set_status(id, status).unwrap(), UpsertOutcome::Updated { id });
        }

        assert_eq!(repo.find_by_status(PurchaseStatus::Delivered).unwrap().len(), 1);
        assert!(repo.set_status(id, PurchaseStatus::Draft).unwrap().is_rejected());
        assert!(matches!(
            repo.set_status(999, PurchaseStatus::Draft),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_new_request_validation() {
        let (db, staff) = setup();
        let repo = db.purchases();

        let mut approved = request(staff);
        approved.status = PurchaseStatus::Approved;
        assert!(repo.submit(&approved).unwrap().is_rejected());

        let mut empty = request(staff);
        empty.item_name = " ".into();
        assert!(repo.submit(&empty).unwrap().is_rejected());

        assert!(repo.submit(&request(999)).unwrap().is_rejected());
        assert!(repo.find_by_fiscal_year(2024).unwrap().is_empty());
    }

    #[test]
    fn test_manual_id_in_generated_format_is_rejected() {
        let (db, staff) = setup();
        let repo = db.purchases();

        let mut manual = request(staff);
        manual.document_id = Some("PR2024-0002".into());
        assert!(repo.submit(&manual).unwrap().is_rejected());

        // Ett annat års format krockar inte med årets numrering
        manual.document_id = Some("PR2023-0002".into());
        assert!(matches!(
            repo.submit(&manual).unwrap(),
            UpsertOutcome::Created { sequence: Some(1), .. }
        ));

        let first = repo.submit(&request(staff)).unwrap();
        let second = repo.submit(&request(staff)).unwrap();
        assert!(matches!(first, UpsertOutcome::Created { sequence: Some(2), .. }));
        assert!(matches!(second, UpsertOutcome::Created { sequence: Some(3), .. }));

        let ids: Vec<String> = repo
            .find_by_fiscal_year(2024)
            .unwrap()
            .into_iter()
            .filter_map(|r| r.document_id)
            .collect();
        assert_eq!(ids, ["PR2023-0002", "PR2024-0002", "PR2024-0003"]);

        // Ett genererat ID kan fortfarande användas för att uppdatera ärendet
        let mut edited = repo.find_request(2024, "PR2024-0002").unwrap().unwrap();
        edited.quantity = 5;
        assert!(matches!(repo.submit(&edited).unwrap(), UpsertOutcome::Updated { .. }));
    }

    #[test]
    fn test_unknown_requester_on_update_is_rejected_without_history() {
        let (db, staff) = setup();
        let repo = db.purchases();

        let id = repo.submit(&request(staff)).unwrap().id().unwrap();

        let mut edited = repo.find_by_id(id).unwrap().unwrap();
        edited.requester_staff_id = 999;
        assert!(repo.submit(&edited).unwrap().is_rejected());

        let inactive = db.staff().create(&mut Staff::new("Kato")).unwrap();
        db.staff().set_active(inactive, false).unwrap();
        edited.requester_staff_id = inactive;
        assert!(repo.submit(&edited).unwrap().is_rejected());

        assert!(repo.history(id).unwrap().is_empty());
        assert_eq!(repo.find_by_id(id).unwrap().unwrap().requester_staff_id, staff);
    }

    #[test]
    fn test_deactivated_requester_keeps_existing_request_editable() {
        let (db, staff) = setup();
        let repo = db.purchases();

        let id = repo.submit(&request(staff)).unwrap().id().unwrap();
        db.staff().set_active(staff, false).unwrap();

        assert_eq!(
            repo.set_status(id, PurchaseStatus::Submitted).unwrap(),
            UpsertOutcome::Updated { id }
        );
    }

    #[test]
    fn test_history_keeps_every_updated_field() {
        let (db, staff) = setup();
        let repo = db.purchases();
        let other = db.staff().create(&mut Staff::new("Yamada")).unwrap();

        let id = repo.submit(&request(staff)).unwrap().id().unwrap();

        let mut edited = repo.find_by_id(id).unwrap().unwrap();
        edited.item_name = "Bärbar dator".into();
        edited.requester_staff_id = other;
        edited.requested_on = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        assert_eq!(repo.submit(&edited).unwrap(), UpsertOutcome::Updated { id });

        let history = repo.history(id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].item_name.as_deref(), Some("Kopieringspapper A4"));
        assert_eq!(history[0].requester_staff_id, Some(staff));
        assert_eq!(history[0].requested_on, NaiveDate::from_ymd_opt(2024, 6, 3));
        assert_eq!(history[0].vendor.as_deref(), Some("Askul"));
    }
}
