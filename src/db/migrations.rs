use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

use super::schema::{
    ADD_PURCHASE_HISTORY_COLUMNS, CREATE_HISTORY_TABLES, CREATE_TABLES, SCHEMA_VERSION,
};
use crate::models::Office;

/// Kör alla nödvändiga migrationer
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_current_version(conn)?;

    if current_version == 0 {
        // Ny databas - skapa allt
        info!("Skapar ny databas med schema version {}", SCHEMA_VERSION);
        initial_setup(conn)?;
    } else if current_version < SCHEMA_VERSION {
        info!(
            "Migrerar databas från version {} till {}",
            current_version, SCHEMA_VERSION
        );
        migrate_from(conn, current_version)?;
    } else {
        info!("Databas är uppdaterad (version {})", current_version);
    }

    // Kontor kan ha tagits bort manuellt, fyll alltid på
    insert_default_offices(conn)?;

    Ok(())
}

fn get_current_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_migrations')",
        [],
        |row| row.get(0),
    )?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> = conn.query_row(
        "SELECT MAX(version) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    Ok(version.unwrap_or(0))
}

fn initial_setup(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_TABLES)?;
    conn.execute_batch(CREATE_HISTORY_TABLES)?;
    conn.execute_batch(ADD_PURCHASE_HISTORY_COLUMNS)?;

    conn.execute(
        "INSERT INTO schema_migrations (version) VALUES (?)",
        [SCHEMA_VERSION],
    )?;

    info!("Initial setup klar");
    Ok(())
}

fn insert_default_offices(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare("INSERT OR IGNORE INTO offices (name) VALUES (?)")?;

    let mut added = 0;
    for name in Office::default_names() {
        added += stmt.execute([&name])?;
    }

    if added > 0 {
        info!("Lade till {} standardkontor", added);
    }
    Ok(())
}

fn migrate_from(conn: &Connection, from_version: i32) -> Result<()> {
    for version in (from_version + 1)..=SCHEMA_VERSION {
        match version {
            2 => migrate_v1_to_v2(conn)?,
            3 => migrate_v2_to_v3(conn)?,
            _ => {}
        }

        conn.execute(
            "INSERT INTO schema_migrations (version) VALUES (?)",
            [version],
        )?;

        info!("Migrerade till version {}", version);
    }

    Ok(())
}

/// Migration v1 -> v2: historiktabeller för fordonsansökningar och inköpsärenden
fn migrate_v1_to_v2(conn: &Connection) -> Result<()> {
    info!("Migration v2: Lägger till historiktabeller");
    conn.execute_batch(CREATE_HISTORY_TABLES)?;
    Ok(())
}

/// Migration v2 -> v3: fler fält i historiken för inköpsärenden
fn migrate_v2_to_v3(conn: &Connection) -> Result<()> {
    info!("Migration v3: Utökar purchase_request_history");
    conn.execute_batch(ADD_PURCHASE_HISTORY_COLUMNS)?;
    Ok(())
}
