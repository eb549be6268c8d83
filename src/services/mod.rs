//! Tjänster för Officedesk
//!
//! Innehåller affärslogik som spänner över flera repositories eller filsystemet.

pub mod backup;
pub mod dashboard;
pub mod export;
pub mod import;

pub use backup::{BackupInfo, BackupResult, BackupService};
pub use dashboard::{DashboardService, OfficeSummary};
pub use export::{ExportFormat, ExportResult, ExportService, ReportType};
pub use import::{ImportResult, ImportService};
