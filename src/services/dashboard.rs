//! Översikt per kontor: nuvarande handläggare och senaste genomförda besök

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;

use crate::db::Database;
use crate::models::VisitView;
use crate::utils::date::format_date_display;

#[derive(Debug, Clone, Serialize)]
pub struct OfficeSummary {
    pub office_id: i64,
    pub office_name: String,
    pub current_staff: Vec<String>,
    pub max_staff: usize,
    pub latest_actual_visit: Option<VisitView>,
}

impl OfficeSummary {
    pub fn staff_display(&self) -> String {
        if self.current_staff.is_empty() {
            "なし".to_string()
        } else {
            self.current_staff.join(", ")
        }
    }

    pub fn capacity_display(&self) -> String {
        format!("現在 {}名 / 最大 {}名", self.current_staff.len(), self.max_staff)
    }

    pub fn has_capacity(&self) -> bool {
        self.current_staff.len() < self.max_staff
    }

    pub fn latest_visit_display(&self) -> String {
        match &self.latest_actual_visit {
            Some(v) => format!(
                "{} by {} ({})",
                format_date_display(v.visit_date),
                v.staff_name,
                v.notes.as_deref().unwrap_or("詳細なし")
            ),
            None => "なし".to_string(),
        }
    }
}

pub struct DashboardService<'a> {
    db: &'a Database,
}

impl<'a> DashboardService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Sammanställning för alla kontor per datum
    pub fn summary(&self, on: NaiveDate) -> Result<Vec<OfficeSummary>> {
        let offices = self.db.offices().find_all()?;
        let assignments = self.db.assignments();
        let visits = self.db.visits();

        let mut summaries = Vec::with_capacity(offices.len());
        for office in offices {
            let Some(office_id) = office.id else {
                continue;
            };

            let current_staff = assignments
                .find_current_for_office(office_id, on)?
                .into_iter()
                .map(|a| a.staff_name)
                .collect();

            summaries.push(OfficeSummary {
                office_id,
                office_name: office.name,
                current_staff,
                max_staff: self.db.max_staff_per_office(),
                latest_actual_visit: visits.latest_actual_for_office(office_id, on)?,
            });
        }

        Ok(summaries)
    }

    /// Endast kontor som har minst en handläggare
    pub fn staffed_offices(&self, on: NaiveDate) -> Result<Vec<OfficeSummary>> {
        Ok(self
            .summary(on)?
            .into_iter()
            .filter(|s| !s.current_staff.is_empty())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Assignment, Staff, Visit, VisitType};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_summary() {
        let db = Database::open_in_memory().unwrap();
        let a = db.offices().find_by_name("A").unwrap().unwrap().id.unwrap();
        let sato = db.staff().create(&mut Staff::new("Sato")).unwrap();
        let suzuki = db.staff().create(&mut Staff::new("Suzuki")).unwrap();

        let sato_a = db
            .assignments()
            .create(&mut Assignment::new(a, sato, d(2024, 4, 1)))
            .unwrap();
        db.assignments()
            .create(&mut Assignment::new(a, suzuki, d(2024, 4, 1)))
            .unwrap();
        db.visits()
            .create(&mut Visit::new(sato_a, d(2024, 5, 20), VisitType::Actual).with_notes("Genomgång"))
            .unwrap();

        let service = DashboardService::new(&db);
        let summary = service.summary(d(2024, 6, 1)).unwrap();
        assert_eq!(summary.len(), 26);

        let office_a = &summary[0];
        assert_eq!(office_a.office_name, "A");
        assert_eq!(office_a.staff_display(), "Sato, Suzuki");
        assert_eq!(office_a.capacity_display(), "現在 2名 / 最大 4名");
        assert!(office_a.has_capacity());
        assert_eq!(
            office_a.latest_visit_display(),
            "2024年05月20日 by Sato (Genomgång)"
        );

        assert_eq!(summary[1].staff_display(), "なし");
        assert_eq!(summary[1].latest_visit_display(), "なし");

        let staffed = service.staffed_offices(d(2024, 6, 1)).unwrap();
        assert_eq!(staffed.len(), 1);
        assert!(service.staffed_offices(d(2024, 3, 1)).unwrap().is_empty());
    }
}
