//! Backup-service för att skapa och hantera backuper

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::db::Database;
use crate::models::AppSettings;
use crate::utils::path::get_extension;

const BACKUP_PREFIX: &str = "officedesk_backup_";
const ARCHIVE_DB_NAME: &str = "officedesk.db";

/// Formatera storlek för visning
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    match size {
        b if b >= GB => format!("{:.1} GB", b as f64 / GB as f64),
        b if b >= MB => format!("{:.1} MB", b as f64 / MB as f64),
        b if b >= KB => format!("{:.1} KB", b as f64 / KB as f64),
        b => format!("{} B", b),
    }
}

/// Resultat av en backup-operation
#[derive(Debug, Clone)]
pub struct BackupResult {
    pub path: PathBuf,
    /// Storlek i bytes
    pub size: u64,
    pub created_at: String,
}

impl BackupResult {
    pub fn size_display(&self) -> String {
        format_size(self.size)
    }
}

/// Information om en befintlig backup
#[derive(Debug, Clone)]
pub struct BackupInfo {
    pub path: PathBuf,
    pub filename: String,
    pub size: u64,
    /// Datum (extraherat från filnamn)
    pub date: Option<String>,
}

impl BackupInfo {
    pub fn size_display(&self) -> String {
        format_size(self.size)
    }
}

/// Backup-service
pub struct BackupService<'a> {
    db: &'a Database,
    database_path: PathBuf,
    backup_dir: PathBuf,
}

impl<'a> BackupService<'a> {
    pub fn new(db: &'a Database, settings: &AppSettings) -> Self {
        Self {
            db,
            database_path: settings.database_path.clone(),
            backup_dir: settings.backup_directory_path.clone(),
        }
    }

    /// Skapa en backup av databasfilen
    pub fn create_backup(&self) -> Result<BackupResult> {
        if !self.database_path.exists() {
            anyhow::bail!("Databasfilen saknas: {:?}", self.database_path);
        }

        // Skriv WAL till huvudfilen så att kopian blir komplett
        self.db.with_connection(|conn| {
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
            Ok(())
        })?;

        fs::create_dir_all(&self.backup_dir).context("Kunde inte skapa backup-katalog")?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let filename = format!("{}{}.zip", BACKUP_PREFIX, timestamp);
        let backup_path = self.backup_dir.join(&filename);

        let file = File::create(&backup_path).context("Kunde inte skapa backup-fil")?;
        let mut zip = ZipWriter::new(file);

        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .compression_level(Some(6));

        zip.start_file(ARCHIVE_DB_NAME, options)?;
        let mut buffer = Vec::new();
        File::open(&self.database_path)
            .context("Kunde inte läsa databasfilen")?
            .read_to_end(&mut buffer)?;
        zip.write_all(&buffer)?;

        zip.finish().context("Kunde inte avsluta ZIP-fil")?;

        let metadata = fs::metadata(&backup_path)?;
        tracing::info!("Backup skapad: {:?} ({} bytes)", backup_path, metadata.len());

        Ok(BackupResult {
            path: backup_path,
            size: metadata.len(),
            created_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        })
    }

    /// Lista befintliga backuper, nyaste först
    pub fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();

        for entry in fs::read_dir(&self.backup_dir)? {
            let path = entry?.path();

            if get_extension(&path).as_deref() != Some("zip") {
                continue;
            }

            let filename = path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            let size = fs::metadata(&path)?.len();
            let date = Self::extract_date_from_filename(&filename);

            backups.push(BackupInfo {
                path,
                filename,
                size,
                date,
            });
        }

        backups.sort_by(|a, b| b.filename.cmp(&a.filename));

        Ok(backups)
    }

    /// Ta bort en backup
    pub fn delete_backup(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).context("Kunde inte ta bort backup-fil")?;
        tracing::info!("Backup borttagen: {:?}", path);
        Ok(())
    }

    fn extract_date_from_filename(filename: &str) -> Option<String> {
        // Format: officedesk_backup_YYYYMMDD_HHMMSS.zip
        let stamp = filename.strip_prefix(BACKUP_PREFIX)?.strip_suffix(".zip")?;
        if stamp.len() < 15 || !stamp.is_ascii() {
            return None;
        }

        Some(format!(
            "{}-{}-{} {}:{}:{}",
            &stamp[0..4],
            &stamp[4..6],
            &stamp[6..8],
            &stamp[9..11],
            &stamp[11..13],
            &stamp[13..15]
        ))
    }
}
