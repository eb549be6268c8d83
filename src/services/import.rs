//! Import av handläggare från CSV-text

use anyhow::Result;

use crate::db::Database;
use crate::models::Staff;
use crate::utils::error::AppError;

/// Resultat av en import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportResult {
    pub created: usize,
    /// Namn som redan fanns
    pub skipped: usize,
    /// (radnummer, felmeddelande), radnummer räknas från 1
    pub errors: Vec<(usize, String)>,
}

impl ImportResult {
    pub fn summary(&self) -> String {
        format!(
            "{} registrerade, {} fanns redan, {} fel",
            self.created,
            self.skipped,
            self.errors.len()
        )
    }
}

pub struct ImportService<'a> {
    db: &'a Database,
}

impl<'a> ImportService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Importera handläggare. Första kolumnen är namnet, en rubrikrad `name` hoppas över.
    pub fn import_staff_csv(&self, text: &str) -> Result<ImportResult> {
        let staff = self.db.staff();
        let mut result = ImportResult::default();

        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = line.trim_start_matches('\u{feff}');
            if line.trim().is_empty() {
                continue;
            }

            let name = first_field(line);
            if line_no == 1 && name.trim().eq_ignore_ascii_case("name") {
                continue;
            }

            match staff.create(&mut Staff::new(name)) {
                Ok(_) => result.created += 1,
                Err(AppError::AlreadyExists(_)) => result.skipped += 1,
                Err(e @ AppError::Validation(_)) => result.errors.push((line_no, e.to_string())),
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!("Import av handläggare: {}", result.summary());
        Ok(result)
    }
}

/// Första fältet i en CSV-rad, med stöd för citattecken och `""`
fn first_field(line: &str) -> String {
    let trimmed = line.trim_start();
    let Some(rest) = trimmed.strip_prefix('"') else {
        return line.split(',').next().unwrap_or_default().to_string();
    };

    let mut field = String::new();
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => break,
            c => field.push(c),
        }
    }
    field
}
