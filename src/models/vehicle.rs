use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::utils::date::fiscal_year_start;

/// Naturlig nyckel för en fordonsansökan: samma handläggare, räkenskapsår och registreringsnummer
/// räknas som samma ansökan vid ny inlämning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VehicleKey {
    pub staff_id: i64,
    pub fiscal_year: i32,
    pub vehicle_number: String,
}

/// Ansökan om pendling med egen bil
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleApplication {
    pub id: Option<i64>,
    pub staff_id: i64,
    pub fiscal_year: i32,
    /// Löpnummer per handläggare och räkenskapsår (1, 2, ...)
    pub vehicle_seq: Option<i64>,
    /// Registreringsnummer
    pub vehicle_number: String,
    pub maker_model: Option<String>,
    pub insurance_company: Option<String>,
    pub insurance_expiry: Option<NaiveDate>,
    pub commute_distance_km: Option<f64>,
    pub notes: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl VehicleApplication {
    pub fn new(staff_id: i64, fiscal_year: i32, vehicle_number: impl Into<String>) -> Self {
        Self {
            id: None,
            staff_id,
            fiscal_year,
            vehicle_seq: None,
            vehicle_number: vehicle_number.into(),
            maker_model: None,
            insurance_company: None,
            insurance_expiry: None,
            commute_distance_km: None,
            notes: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn key(&self) -> VehicleKey {
        VehicleKey {
            staff_id: self.staff_id,
            fiscal_year: self.fiscal_year,
            vehicle_number: Self::normalize_vehicle_number(&self.vehicle_number),
        }
    }

    /// Registreringsnummer jämförs utan blanksteg i kanterna och utan dubbla mellanslag
    pub fn normalize_vehicle_number(number: &str) -> String {
        number.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    pub fn validate(&self) -> Result<(), VehicleValidationError> {
        if Self::normalize_vehicle_number(&self.vehicle_number).is_empty() {
            return Err(VehicleValidationError::MissingVehicleNumber);
        }

        if !(2000..=2100).contains(&self.fiscal_year) {
            return Err(VehicleValidationError::FiscalYearOutOfRange(self.fiscal_year));
        }

        if let Some(km) = self.commute_distance_km {
            if !km.is_finite() || km < 0.0 {
                return Err(VehicleValidationError::NegativeDistance);
            }
        }

        if let (Some(expiry), Some(start)) = (self.insurance_expiry, fiscal_year_start(self.fiscal_year)) {
            if expiry < start {
                return Err(VehicleValidationError::InsuranceExpired);
            }
        }

        Ok(())
    }
}

/// Tidigare version av en ansökan, sparad innan den skrevs över
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleApplicationRevision {
    pub id: i64,
    pub application_id: i64,
    pub vehicle_number: String,
    pub maker_model: Option<String>,
    pub insurance_company: Option<String>,
    pub insurance_expiry: Option<NaiveDate>,
    pub commute_distance_km: Option<f64>,
    pub notes: Option<String>,
    pub superseded_at: String,
}

#[derive(Debug, thiserror::Error)]
pub enum VehicleValidationError {
    #[error("Registreringsnummer krävs")]
    MissingVehicleNumber,
    #[error("Räkenskapsår {0} är utanför giltigt intervall")]
    FiscalYearOutOfRange(i32),
    #[error("Pendlingsavstånd kan inte vara negativt")]
    NegativeDistance,
    #[error("Försäkringen går ut före räkenskapsårets början")]
    InsuranceExpired,
}
