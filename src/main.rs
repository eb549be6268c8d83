//! Officedesk - Entry Point
//!
//! Öppnar databasen enligt inställningarna och skriver ut dagens kontorsöversikt.

use anyhow::{Context, Result};

use officedesk::models::AppSettings;
use officedesk::services::DashboardService;
use officedesk::utils::date::{fiscal_year_of, format_date_display, today};
use officedesk::Database;

fn main() -> Result<()> {
    // Initiera logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    tracing::info!("Startar Officedesk v{}", env!("CARGO_PKG_VERSION"));

    let settings = AppSettings::load();
    settings
        .ensure_directories()
        .context("Kunde inte skapa datakataloger")?;

    let db = Database::open(&settings.database_path)
        .with_context(|| format!("Kunde inte öppna databasen {:?}", settings.database_path))?
        .with_max_staff_per_office(settings.max_staff_per_office);
    db.migrate().context("Databasmigrering misslyckades")?;

    let on = today();
    println!("事業所一覧 {}", format_date_display(on));

    for office in DashboardService::new(&db).summary(on)? {
        let full = if office.has_capacity() { "" } else { " (満員)" };
        println!(
            "{:<8} {:<16}{} {}  最新訪問: {}",
            format!("{}事業所", office.office_name),
            office.capacity_display(),
            full,
            office.staff_display(),
            office.latest_visit_display()
        );
    }

    let fiscal_year = fiscal_year_of(on);
    println!(
        "{}年度: 通勤車両申請 {}件, 購入依頼 {}件",
        fiscal_year,
        db.vehicles().find_by_fiscal_year(fiscal_year)?.len(),
        db.purchases().find_by_fiscal_year(fiscal_year)?.len()
    );

    Ok(())
}
