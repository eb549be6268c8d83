use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::DEFAULT_MAX_STAFF_PER_OFFICE;
use crate::utils::path::{get_config_path, get_data_dir, get_database_path};

/// Applikationsinställningar (settings.toml i konfigurationskatalogen).
///
/// Fält som saknas i filen får sina standardvärden, så äldre filer fortsätter att fungera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub database_path: PathBuf,
    pub backup_directory_path: PathBuf,
    pub export_directory_path: PathBuf,
    /// Max antal samtidiga handläggare per kontor
    pub max_staff_per_office: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        let data_dir = get_data_dir();

        Self {
            database_path: get_database_path(),
            backup_directory_path: data_dir.join("backups"),
            export_directory_path: data_dir.join("exports"),
            max_staff_per_office: DEFAULT_MAX_STAFF_PER_OFFICE,
        }
    }
}

impl AppSettings {
    /// Ladda från standardsökvägen, eller standardvärden om filen saknas eller är trasig
    pub fn load() -> Self {
        Self::load_from(&get_config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };

        match toml::from_str::<Self>(&content) {
            Ok(settings) => settings.sanitized(),
            Err(e) => {
                tracing::warn!("Kunde inte läsa {:?}, använder standardvärden: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&get_config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.backup_directory_path)?;
        std::fs::create_dir_all(&self.export_directory_path)?;
        Ok(())
    }

    fn sanitized(mut self) -> Self {
        if self.max_staff_per_office == 0 {
            self.max_staff_per_office = DEFAULT_MAX_STAFF_PER_OFFICE;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let mut settings = AppSettings::default();
        settings.max_staff_per_office = 6;
        settings.database_path = PathBuf::from("/srv/officedesk/data.db");
        settings.save_to(&path).unwrap();

        let loaded = AppSettings::load_from(&path);
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "max_staff_per_office = 3\n").unwrap();

        let loaded = AppSettings::load_from(&path);
        assert_eq!(loaded.max_staff_per_office, 3);
        assert_eq!(loaded.database_path, AppSettings::default().database_path);
    }

    #[test]
    fn test_missing_or_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = AppSettings::load_from(&dir.path().join("nope.toml"));
        assert_eq!(missing, AppSettings::default());

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "max_staff_per_office = [").unwrap();
        assert_eq!(AppSettings::load_from(&broken), AppSettings::default());

        let zero = dir.path().join("zero.toml");
        std::fs::write(&zero, "max_staff_per_office = 0").unwrap();
        assert_eq!(
            AppSettings::load_from(&zero).max_staff_per_office,
            DEFAULT_MAX_STAFF_PER_OFFICE
        );
    }
}
