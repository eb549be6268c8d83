use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Office {
    pub id: Option<i64>,
    pub name: String,
}

impl Office {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    /// Visningsnamn, t.ex. "A事業所"
    pub fn display_name(&self) -> String {
        format!("{}事業所", self.name)
    }

    /// Kontor som skapas vid första start (A-Z)
    pub fn default_names() -> Vec<String> {
        ('A'..='Z').map(|c| c.to_string()).collect()
    }
}
