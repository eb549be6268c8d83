use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::date::fiscal_year_of;

/// Status för ett inköpsärende
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PurchaseStatus {
    #[default]
    Draft,
    Submitted,
    Approved,
    Rejected,
    Ordered,
    Delivered,
}

impl PurchaseStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Draft => "下書き",
            Self::Submitted => "申請中",
            Self::Approved => "承認済",
            Self::Rejected => "却下",
            Self::Ordered => "発注済",
            Self::Delivered => "納品済",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "submitted" => Some(Self::Submitted),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "ordered" => Some(Self::Ordered),
            "delivered" => Some(Self::Delivered),
            _ => None,
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            Self::Draft,
            Self::Submitted,
            Self::Approved,
            Self::Rejected,
            Self::Ordered,
            Self::Delivered,
        ]
    }

    /// Status som ett nytt ärende får börja i
    pub fn is_initial(&self) -> bool {
        matches!(self, Self::Draft | Self::Submitted)
    }

    /// Tillåtna övergångar. Att stå kvar i samma status är alltid tillåtet.
    pub fn can_transition_to(&self, next: Self) -> bool {
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (Self::Draft, Self::Submitted)
                | (Self::Submitted, Self::Approved)
                | (Self::Submitted, Self::Rejected)
                | (Self::Submitted, Self::Draft)
                | (Self::Rejected, Self::Draft)
                | (Self::Approved, Self::Ordered)
                | (Self::Ordered, Self::Delivered)
        )
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Ordered => "ordered",
            Self::Delivered => "delivered",
        };
        write!(f, "{}", s)
    }
}

/// Naturlig nyckel för inköpsärenden. Saknas dokument-ID är ärendet nytt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PurchaseKey {
    pub fiscal_year: i32,
    pub document_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub id: Option<i64>,
    pub document_id: Option<String>,
    pub fiscal_year: i32,
    /// Löpnummer inom räkenskapsåret
    pub request_seq: Option<i64>,
    pub requester_staff_id: i64,
    pub item_name: String,
    pub quantity: i64,
    /// Styckpris i hela yen
    pub unit_price: i64,
    pub vendor: Option<String>,
    pub requested_on: NaiveDate,
    pub status: PurchaseStatus,
    pub notes: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl PurchaseRequest {
    pub fn new(
        requester_staff_id: i64,
        fiscal_year: i32,
        item_name: impl Into<String>,
        quantity: i64,
        unit_price: i64,
        requested_on: NaiveDate,
    ) -> Self {
        Self {
            id: None,
            document_id: None,
            fiscal_year,
            request_seq: None,
            requester_staff_id,
            item_name: item_name.into(),
            quantity,
            unit_price,
            vendor: None,
            requested_on,
            status: PurchaseStatus::default(),
            notes: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn key(&self) -> PurchaseKey {
        PurchaseKey {
            fiscal_year: self.fiscal_year,
            document_id: self
                .document_id
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }

    /// Dokument-ID för ett nytt ärende, t.ex. "PR2024-0007"
    pub fn generate_document_id(fiscal_year: i32, seq: i64) -> String {
        format!("PR{}-{:04}", fiscal_year, seq)
    }

    /// Har ID:t samma form som `generate_document_id` för räkenskapsåret?
    pub fn is_generated_document_id(fiscal_year: i32, document_id: &str) -> bool {
        document_id
            .strip_prefix(&format!("PR{}-", fiscal_year))
            .is_some_and(|seq| !seq.is_empty() && seq.bytes().all(|b| b.is_ascii_digit()))
    }

    /// Totalbelopp, None vid overflow
    pub fn total(&self) -> Option<i64> {
        self.quantity.checked_mul(self.unit_price)
    }

    pub fn validate(&self) -> Result<(), PurchaseValidationError> {
        if self.item_name.trim().is_empty() {
            return Err(PurchaseValidationError::MissingItemName);
        }
        if self.quantity <= 0 {
            return Err(PurchaseValidationError::InvalidQuantity);
        }
        if self.unit_price < 0 {
            return Err(PurchaseValidationError::NegativePrice);
        }
        if self.total().is_none() {
            return Err(PurchaseValidationError::AmountOverflow);
        }
        if !(2000..=2100).contains(&self.fiscal_year) {
            return Err(PurchaseValidationError::FiscalYearOutOfRange(self.fiscal_year));
        }
        if fiscal_year_of(self.requested_on) != self.fiscal_year {
            return Err(PurchaseValidationError::RequestedOutsideFiscalYear(self.fiscal_year));
        }
        Ok(())
    }
}

/// Tidigare version av ett inköpsärende
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRequestRevision {
    pub id: i64,
    pub request_id: i64,
    /// Saknas för versioner sparade före schema v3
    pub requester_staff_id: Option<i64>,
    pub item_name: Option<String>,
    pub requested_on: Option<NaiveDate>,
    pub status: PurchaseStatus,
    pub quantity: i64,
    pub unit_price: i64,
    pub vendor: Option<String>,
    pub notes: Option<String>,
    pub superseded_at: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PurchaseValidationError {
    #[error("Artikelnamn krävs")]
    MissingItemName,
    #[error("Antal måste vara minst 1")]
    InvalidQuantity,
    #[error("Pris kan inte vara negativt")]
    NegativePrice,
    #[error("Beloppet är för stort")]
    AmountOverflow,
    #[error("Räkenskapsår {0} är utanför giltigt intervall")]
    FiscalYearOutOfRange(i32),
    #[error("Beställningsdatum ligger utanför räkenskapsår {0}")]
    RequestedOutsideFiscalYear(i32),
}
