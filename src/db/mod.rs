pub mod schema;
pub mod migrations;
pub mod staff_repo;
pub mod office_repo;
pub mod assignment_repo;
pub mod visit_repo;
pub mod vehicle_repo;
pub mod purchase_repo;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::DEFAULT_MAX_STAFF_PER_OFFICE;
use crate::utils::error::{AppError, AppResult};

pub use staff_repo::StaffRepository;
pub use office_repo::OfficeRepository;
pub use assignment_repo::AssignmentRepository;
pub use visit_repo::VisitRepository;
pub use vehicle_repo::VehicleRepository;
pub use purchase_repo::PurchaseRepository;

/// Huvuddatabas-wrapper med thread-safe access
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    max_staff_per_office: usize,
}

impl Database {
    /// Öppna eller skapa databas
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            "
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            max_staff_per_office: DEFAULT_MAX_STAFF_PER_OFFICE,
        })
    }

    /// Öppna in-memory databas (för tester)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            max_staff_per_office: DEFAULT_MAX_STAFF_PER_OFFICE,
        };
        db.migrate()?;
        Ok(db)
    }

    /// Sätt max antal samtidiga handläggare per kontor
    pub fn with_max_staff_per_office(mut self, max: usize) -> Self {
        self.max_staff_per_office = max.max(1);
        self
    }

    pub fn max_staff_per_office(&self) -> usize {
        self.max_staff_per_office
    }

    /// Kör databasmigrationer
    pub fn migrate(&self) -> Result<()> {
        let conn = lock(&self.conn)?;
        migrations::run_migrations(&conn)
    }

    /// Hämta handläggar-repository
    pub fn staff(&self) -> StaffRepository {
        StaffRepository::new(Arc::clone(&self.conn))
    }

    /// Hämta kontors-repository
    pub fn offices(&self) -> OfficeRepository {
        OfficeRepository::new(Arc::clone(&self.conn))
    }

    /// Hämta uppdrags-repository
    pub fn assignments(&self) -> AssignmentRepository {
        AssignmentRepository::new(Arc::clone(&self.conn), self.max_staff_per_office)
    }

    /// Hämta besöks-repository
    pub fn visits(&self) -> VisitRepository {
        VisitRepository::new(Arc::clone(&self.conn))
    }

    /// Hämta repository för pendlingsfordon
    pub fn vehicles(&self) -> VehicleRepository {
        VehicleRepository::new(Arc::clone(&self.conn))
    }

    /// Hämta repository för inköpsärenden
    pub fn purchases(&self) -> PurchaseRepository {
        PurchaseRepository::new(Arc::clone(&self.conn))
    }

    /// Direkt tillgång till connection (för avancerade operationer)
    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = lock(&self.conn)?;
        f(&conn)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            max_staff_per_office: self.max_staff_per_office,
        }
    }
}

/// Lås connection; ett förgiftat lås blir ett fel istället för panik
pub(crate) fn lock(conn: &Arc<Mutex<Connection>>) -> AppResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| AppError::other("Databaslåset är förgiftat"))
}
