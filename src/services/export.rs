//! Export-tjänst för att exportera register till JSON och CSV

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::db::Database;
use crate::models::{AssignmentView, PurchaseRequest, Staff, VehicleApplication, VisitView};
use crate::utils::date::format_date;
use crate::utils::path::sanitize_filename;

/// Exportformat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

/// Vilket register som exporteras
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    Staff,
    Assignments,
    Visits,
    VehicleApplications,
    PurchaseRequests,
}

impl ReportType {
    pub fn filename_prefix(&self) -> &'static str {
        match self {
            ReportType::Staff => "staff",
            ReportType::Assignments => "assignments",
            ReportType::Visits => "visits",
            ReportType::VehicleApplications => "vehicles",
            ReportType::PurchaseRequests => "purchases",
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            Self::Staff,
            Self::Assignments,
            Self::Visits,
            Self::VehicleApplications,
            Self::PurchaseRequests,
        ]
    }
}

/// Resultat av en export
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub report_type: ReportType,
    pub format: ExportFormat,
    pub path: PathBuf,
    pub row_count: usize,
    pub file_size: usize,
}

#[derive(Debug, Serialize)]
struct StaffExport {
    id: i64,
    name: String,
    is_active: bool,
}

impl From<&Staff> for StaffExport {
    fn from(s: &Staff) -> Self {
        Self {
            id: s.id.unwrap_or(0),
            name: s.name.clone(),
            is_active: s.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
struct AssignmentExport {
    id: i64,
    office: String,
    staff: String,
    staff_is_active: bool,
    start_date: String,
    end_date: Option<String>,
}

impl From<&AssignmentView> for AssignmentExport {
    fn from(a: &AssignmentView) -> Self {
        Self {
            id: a.id,
            office: a.office_name.clone(),
            staff: a.staff_name.clone(),
            staff_is_active: a.staff_is_active,
            start_date: format_date(a.start_date),
            end_date: a.end_date.map(format_date),
        }
    }
}

#[derive(Debug, Serialize)]
struct VisitExport {
    id: i64,
    visit_date: String,
    visit_type: String,
    office: String,
    staff: String,
    notes: Option<String>,
}

impl From<&VisitView> for VisitExport {
    fn from(v: &VisitView) -> Self {
        Self {
            id: v.id,
            visit_date: format_date(v.visit_date),
            visit_type: v.visit_type.label().to_string(),
            office: v.office_name.clone(),
            staff: v.staff_name.clone(),
            notes: v.notes.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct VehicleExport {
    id: i64,
    staff_id: i64,
    fiscal_year: i32,
    vehicle_seq: i64,
    vehicle_number: String,
    maker_model: Option<String>,
    insurance_company: Option<String>,
    insurance_expiry: Option<String>,
    commute_distance_km: Option<f64>,
}

impl From<&VehicleApplication> for VehicleExport {
    fn from(v: &VehicleApplication) -> Self {
        Self {
            id: v.id.unwrap_or(0),
            staff_id: v.staff_id,
            fiscal_year: v.fiscal_year,
            vehicle_seq: v.vehicle_seq.unwrap_or(0),
            vehicle_number: v.vehicle_number.clone(),
            maker_model: v.maker_model.clone(),
            insurance_company: v.insurance_company.clone(),
            insurance_expiry: v.insurance_expiry.map(format_date),
            commute_distance_km: v.commute_distance_km,
        }
    }
}

#[derive(Debug, Serialize)]
struct PurchaseExport {
    id: i64,
    document_id: String,
    fiscal_year: i32,
    request_seq: i64,
    requester_staff_id: i64,
    item_name: String,
    quantity: i64,
    unit_price: i64,
    total: Option<i64>,
    vendor: Option<String>,
    requested_on: String,
    status: String,
}

impl From<&PurchaseRequest> for PurchaseExport {
    fn from(p: &PurchaseRequest) -> Self {
        Self {
            id: p.id.unwrap_or(0),
            document_id: p.document_id.clone().unwrap_or_default(),
            fiscal_year: p.fiscal_year,
            request_seq: p.request_seq.unwrap_or(0),
            requester_staff_id: p.requester_staff_id,
            item_name: p.item_name.clone(),
            quantity: p.quantity,
            unit_price: p.unit_price,
            total: p.total(),
            vendor: p.vendor.clone(),
            requested_on: format_date(p.requested_on),
            status: p.status.to_string(),
        }
    }
}

/// Export-tjänst
pub struct ExportService<'a> {
    db: &'a Database,
}

impl<'a> ExportService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Generera filnamn för export
    pub fn generate_filename(report_type: ReportType, format: ExportFormat) -> String {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        sanitize_filename(&format!(
            "officedesk_{}_{}.{}",
            report_type.filename_prefix(),
            timestamp,
            format.extension()
        ))
    }

    /// Exportera till en katalog med genererat filnamn
    pub fn export_to_directory(
        &self,
        report_type: ReportType,
        format: ExportFormat,
        dir: &Path,
    ) -> Result<ExportResult> {
        std::fs::create_dir_all(dir).context("Kunde inte skapa exportkatalog")?;
        let path = dir.join(Self::generate_filename(report_type, format));
        self.export_to_file(report_type, format, &path)
    }

    /// Exportera register till fil
    pub fn export_to_file(
        &self,
        report_type: ReportType,
        format: ExportFormat,
        path: &Path,
    ) -> Result<ExportResult> {
        let (content, row_count) = self.render(report_type, format)?;

        std::fs::write(path, &content).context("Kunde inte skriva fil")?;
        tracing::info!("Exporterade {} rader till {:?}", row_count, path);

        Ok(ExportResult {
            report_type,
            format,
            path: path.to_path_buf(),
            row_count,
            file_size: content.len(),
        })
    }

    /// Rendera registret som text
    pub fn render(&self, report_type: ReportType, format: ExportFormat) -> Result<(String, usize)> {
        match report_type {
            ReportType::Staff => {
                let rows: Vec<StaffExport> =
                    self.db.staff().find_all(false)?.iter().map(Into::into).collect();
                Ok((Self::encode(&rows, format, Self::staff_to_csv)?, rows.len()))
            }
            ReportType::Assignments => {
                let rows: Vec<AssignmentExport> =
                    self.db.assignments().find_all()?.iter().map(Into::into).collect();
                Ok((Self::encode(&rows, format, Self::assignments_to_csv)?, rows.len()))
            }
            ReportType::Visits => {
                let rows: Vec<VisitExport> =
                    self.db.visits().find_all()?.iter().map(Into::into).collect();
                Ok((Self::encode(&rows, format, Self::visits_to_csv)?, rows.len()))
            }
            ReportType::VehicleApplications => {
                let rows: Vec<VehicleExport> =
                    self.db.vehicles().find_all()?.iter().map(Into::into).collect();
                Ok((Self::encode(&rows, format, Self::vehicles_to_csv)?, rows.len()))
            }
            ReportType::PurchaseRequests => {
                let rows: Vec<PurchaseExport> =
                    self.db.purchases().find_all()?.iter().map(Into::into).collect();
                Ok((Self::encode(&rows, format, Self::purchases_to_csv)?, rows.len()))
            }
        }
    }

    fn encode<T: Serialize>(rows: &[T], format: ExportFormat, to_csv: fn(&[T]) -> String) -> Result<String> {
        match format {
            ExportFormat::Json => {
                serde_json::to_string_pretty(rows).context("JSON serialisering misslyckades")
            }
            ExportFormat::Csv => Ok(to_csv(rows)),
        }
    }

    fn staff_to_csv(rows: &[StaffExport]) -> String {
        let mut csv = String::from("id,name,is_active\n");
        for s in rows {
            csv.push_str(&format!("{},{},{}\n", s.id, Self::csv_escape(&s.name), s.is_active));
        }
        csv
    }

    fn assignments_to_csv(rows: &[AssignmentExport]) -> String {
        let mut csv = String::from("id,office,staff,staff_is_active,start_date,end_date\n");
        for a in rows {
            csv.push_str(&format!(
                "{},{},{},{},{},{}\n",
                a.id,
                Self::csv_escape(&a.office),
                Self::csv_escape(&a.staff),
                a.staff_is_active,
                a.start_date,
                a.end_date.as_deref().unwrap_or(""),
            ));
        }
        csv
    }

    fn visits_to_csv(rows: &[VisitExport]) -> String {
        let mut csv = String::from("id,visit_date,visit_type,office,staff,notes\n");
        for v in rows {
            csv.push_str(&format!(
                "{},{},{},{},{},{}\n",
                v.id,
                v.visit_date,
                Self::csv_escape(&v.visit_type),
                Self::csv_escape(&v.office),
                Self::csv_escape(&v.staff),
                Self::csv_escape(v.notes.as_deref().unwrap_or("")),
            ));
        }
        csv
    }

    fn vehicles_to_csv(rows: &[VehicleExport]) -> String {
        let mut csv = String::from(
            "id,staff_id,fiscal_year,vehicle_seq,vehicle_number,maker_model,insurance_company,insurance_expiry,commute_distance_km\n",
        );
        for v in rows {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{}\n",
                v.id,
                v.staff_id,
                v.fiscal_year,
                v.vehicle_seq,
                Self::csv_escape(&v.vehicle_number),
                Self::csv_escape(v.maker_model.as_deref().unwrap_or("")),
                Self::csv_escape(v.insurance_company.as_deref().unwrap_or("")),
                v.insurance_expiry.as_deref().unwrap_or(""),
                v.commute_distance_km.map(|km| km.to_string()).unwrap_or_default(),
            ));
        }
        csv
    }

    fn purchases_to_csv(rows: &[PurchaseExport]) -> String {
        let mut csv = String::from(
            "id,document_id,fiscal_year,request_seq,requester_staff_id,item_name,quantity,unit_price,total,vendor,requested_on,status\n",
        );
        for p in rows {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},{},{},{}\n",
                p.id,
                Self::csv_escape(&p.document_id),
                p.fiscal_year,
                p.request_seq,
                p.requester_staff_id,
                Self::csv_escape(&p.item_name),
                p.quantity,
                p.unit_price,
                p.total.map(|t| t.to_string()).unwrap_or_default(),
                Self::csv_escape(p.vendor.as_deref().unwrap_or("")),
                p.requested_on,
                p.status,
            ));
        }
        csv
    }

    /// Escapa värde för CSV
    pub fn csv_escape(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Assignment, Staff, Visit, VisitType};
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn seeded_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        let office = db.offices().find_by_name("B").unwrap().unwrap().id.unwrap();
        let staff = db.staff().create(&mut Staff::new("Mori, Ken")).unwrap();
        let assignment = db
            .assignments()
            .create(&mut Assignment::new(office, staff, d(2024, 4, 1)))
            .unwrap();
        db.visits()
            .create(&mut Visit::new(assignment, d(2024, 4, 2), VisitType::Actual).with_notes("Sa \"hej\""))
            .unwrap();
        db
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(ExportService::csv_escape("enkel"), "enkel");
        assert_eq!(ExportService::csv_escape("a,b"), "\"a,b\"");
        assert_eq!(ExportService::csv_escape("sa \"hej\""), "\"sa \"\"hej\"\"\"");
    }

    #[test]
    fn test_render_visits_csv() {
        let db = seeded_db();
        let service = ExportService::new(&db);

        let (csv, rows) = service.render(ReportType::Visits, ExportFormat::Csv).unwrap();
        assert_eq!(rows, 1);

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "id,visit_date,visit_type,office,staff,notes");
        assert!(lines[1].starts_with("1,2024-04-02,実績,B,\"Mori, Ken\","));
        assert!(lines[1].ends_with("\"Sa \"\"hej\"\"\""));
    }

    #[test]
    fn test_render_assignments_json() {
        let db = seeded_db();
        let service = ExportService::new(&db);

        let (json, rows) = service.render(ReportType::Assignments, ExportFormat::Json).unwrap();
        assert_eq!(rows, 1);

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["office"], "B");
        assert_eq!(parsed[0]["start_date"], "2024-04-01");
        assert!(parsed[0]["end_date"].is_null());
    }

    #[test]
    fn test_export_to_directory() {
        let db = seeded_db();
        let dir = tempfile::tempdir().unwrap();

        for report in ReportType::all() {
            let result = ExportService::new(&db)
                .export_to_directory(*report, ExportFormat::Csv, dir.path())
                .unwrap();
            assert!(result.path.exists());
            assert_eq!(
                std::fs::metadata(&result.path).unwrap().len() as usize,
                result.file_size
            );
        }
    }

    #[test]
    fn test_generate_filename() {
        let name = ExportService::generate_filename(ReportType::Staff, ExportFormat::Json);
        assert!(name.starts_with("officedesk_staff_"));
        assert!(name.ends_with(".json"));
    }
}
