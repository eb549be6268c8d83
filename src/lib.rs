//! Officedesk - register för handläggare, kontor, besök och ärenden
//!
//! Bibliotek med datalager och tjänster. Gränssnittet ligger utanför denna crate.

pub mod db;
pub mod models;
pub mod services;
pub mod upsert;
pub mod utils;

// Re-exports
pub use db::Database;
pub use models::*;
pub use upsert::{upsert, NaturalKeyStore, UpsertOutcome};
pub use utils::{AppError, AppResult};
