use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::utils::date::format_date_display;

/// Standardvärde för hur många handläggare ett kontor får ha samtidigt
pub const DEFAULT_MAX_STAFF_PER_OFFICE: usize = 4;

/// Uppdrag: en handläggare ansvarar för ett kontor under en period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Option<i64>,
    pub office_id: i64,
    pub staff_id: i64,
    pub start_date: NaiveDate,
    /// None = pågående
    pub end_date: Option<NaiveDate>,
}

impl Assignment {
    pub fn new(office_id: i64, staff_id: i64, start_date: NaiveDate) -> Self {
        Self {
            id: None,
            office_id,
            staff_id,
            start_date,
            end_date: None,
        }
    }

    pub fn validate(&self) -> Result<(), AssignmentValidationError> {
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(AssignmentValidationError::EndBeforeStart);
            }
        }
        Ok(())
    }
}

/// Uppdrag med kontors- och handläggarnamn (för visning)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentView {
    pub id: i64,
    pub office_id: i64,
    pub office_name: String,
    pub staff_id: i64,
    pub staff_name: String,
    pub staff_is_active: bool,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl AssignmentView {
    /// Ligger datumet inom uppdragsperioden (inklusive båda ändar)?
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && self.end_date.map_or(true, |end| date <= end)
    }

    /// Räknas uppdraget som aktivt detta datum (perioden täcker datumet och handläggaren är aktiv)
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.staff_is_active && self.covers(date)
    }

    /// "2024年04月01日 〜 現在担当中"
    pub fn period_display(&self) -> String {
        let end = self
            .end_date
            .map(format_date_display)
            .unwrap_or_else(|| "現在担当中".to_string());
        format!("{} 〜 {}", format_date_display(self.start_date), end)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssignmentValidationError {
    #[error("Slutdatum kan inte vara före startdatum")]
    EndBeforeStart,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn view(start: NaiveDate, end: Option<NaiveDate>) -> AssignmentView {
        AssignmentView {
            id: 1,
            office_id: 1,
            office_name: "A".into(),
            staff_id: 1,
            staff_name: "Sato".into(),
            staff_is_active: true,
            start_date: start,
            end_date: end,
        }
    }

    #[test]
    fn test_covers_is_inclusive() {
        let v = view(d(2024, 4, 1), Some(d(2024, 6, 30)));
        assert!(v.covers(d(2024, 4, 1)));
        assert!(v.covers(d(2024, 6, 30)));
        assert!(!v.covers(d(2024, 3, 31)));
        assert!(!v.covers(d(2024, 7, 1)));

        let open = view(d(2024, 4, 1), None);
        assert!(open.covers(d(2099, 1, 1)));
    }

    #[test]
    fn test_inactive_staff_not_active() {
        let mut v = view(d(2024, 4, 1), None);
        v.staff_is_active = false;
        assert!(v.covers(d(2024, 5, 1)));
        assert!(!v.is_active_on(d(2024, 5, 1)));
    }

    #[test]
    fn test_period_display() {
        let v = view(d(2024, 4, 1), None);
        assert_eq!(v.period_display(), "2024年04月01日 〜 現在担当中");
    }

    #[test]
    fn test_validate_end_before_start() {
        let mut a = Assignment::new(1, 1, d(2024, 4, 1));
        assert!(a.validate().is_ok());
        a.end_date = Some(d(2024, 3, 1));
        assert!(matches!(
            a.validate(),
            Err(AssignmentValidationError::EndBeforeStart)
        ));
    }
}
