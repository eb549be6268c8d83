use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Besökstyp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VisitType {
    /// 予定
    #[default]
    Planned,
    /// 実績
    Actual,
}

impl VisitType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Planned => "予定",
            Self::Actual => "実績",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "planned" | "予定" => Some(Self::Planned),
            "actual" | "実績" => Some(Self::Actual),
            _ => None,
        }
    }

    pub fn all() -> &'static [Self] {
        &[Self::Planned, Self::Actual]
    }
}

impl fmt::Display for VisitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planned => write!(f, "planned"),
            Self::Actual => write!(f, "actual"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub id: Option<i64>,
    pub assignment_id: i64,
    pub visit_date: NaiveDate,
    pub visit_type: VisitType,
    pub notes: Option<String>,
    pub created_at: Option<String>,
}

impl Visit {
    pub fn new(assignment_id: i64, visit_date: NaiveDate, visit_type: VisitType) -> Self {
        Self {
            id: None,
            assignment_id,
            visit_date,
            visit_type,
            notes: None,
            created_at: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        let notes = notes.into();
        self.notes = if notes.trim().is_empty() {
            None
        } else {
            Some(notes)
        };
        self
    }
}

/// Besök med handläggare och kontor (för listor och dashboard)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitView {
    pub id: i64,
    pub assignment_id: i64,
    pub visit_date: NaiveDate,
    pub visit_type: VisitType,
    pub notes: Option<String>,
    pub staff_id: i64,
    pub staff_name: String,
    pub staff_is_active: bool,
    pub office_id: i64,
    pub office_name: String,
}

impl VisitView {
    pub fn notes_display(&self) -> &str {
        self.notes.as_deref().unwrap_or("(記載なし)")
    }
}
