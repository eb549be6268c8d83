use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Staff {
    pub id: Option<i64>,
    pub name: String,
    pub is_active: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Default for Staff {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            is_active: true,
            created_at: None,
            updated_at: None,
        }
    }
}

impl Staff {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Namn med status, t.ex. "Yamada (有効)"
    pub fn display_with_status(&self) -> String {
        let status = if self.is_active { "有効" } else { "無効" };
        format!("{} ({})", self.name, status)
    }

    /// Trimma och kontrollera ett namn från formuläret
    pub fn normalize_name(name: &str) -> Result<String, StaffValidationError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(StaffValidationError::EmptyName);
        }
        if trimmed.chars().count() > 100 {
            return Err(StaffValidationError::NameTooLong);
        }
        Ok(trimmed.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StaffValidationError {
    #[error("Namn krävs")]
    EmptyName,
    #[error("Namnet får vara högst 100 tecken")]
    NameTooLong,
}
