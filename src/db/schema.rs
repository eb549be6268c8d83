/// SQL-schema för Officedesk

pub const SCHEMA_VERSION: i32 = 3;

/// Grundtabeller (schema version 1)
pub const CREATE_TABLES: &str = r#"
-- Kontor
CREATE TABLE IF NOT EXISTS offices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

-- Handläggare (is_active = 0 istället för radering)
CREATE TABLE IF NOT EXISTS staff (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Uppdrag: handläggare per kontor. end_date NULL = pågående.
-- Max antal samtidiga handläggare kontrolleras i applikationen.
CREATE TABLE IF NOT EXISTS assignments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    office_id INTEGER NOT NULL,
    staff_id INTEGER NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (office_id) REFERENCES offices(id),
    FOREIGN KEY (staff_id) REFERENCES staff(id)
);

CREATE INDEX IF NOT EXISTS idx_assignments_office ON assignments(office_id);
CREATE INDEX IF NOT EXISTS idx_assignments_staff ON assignments(staff_id);

-- Besök
CREATE TABLE IF NOT EXISTS visits (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    assignment_id INTEGER NOT NULL,
    visit_date TEXT NOT NULL,
    type TEXT NOT NULL,
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (assignment_id) REFERENCES assignments(id)
);

CREATE INDEX IF NOT EXISTS idx_visits_assignment ON visits(assignment_id);

-- Pendlingsfordon
CREATE TABLE IF NOT EXISTS vehicle_applications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    staff_id INTEGER NOT NULL,
    fiscal_year INTEGER NOT NULL,
    vehicle_seq INTEGER NOT NULL,
    vehicle_number TEXT NOT NULL,
    maker_model TEXT,
    insurance_company TEXT,
    insurance_expiry TEXT,
    commute_distance_km REAL,
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (staff_id) REFERENCES staff(id),
    UNIQUE (staff_id, fiscal_year, vehicle_number),
    UNIQUE (staff_id, fiscal_year, vehicle_seq)
);

-- Inköpsärenden
CREATE TABLE IF NOT EXISTS purchase_requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id TEXT NOT NULL,
    fiscal_year INTEGER NOT NULL,
    request_seq INTEGER NOT NULL,
    requester_staff_id INTEGER NOT NULL,
    item_name TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    unit_price INTEGER NOT NULL,
    vendor TEXT,
    requested_on TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'draft',
    notes TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (requester_staff_id) REFERENCES staff(id),
    UNIQUE (fiscal_year, document_id),
    UNIQUE (fiscal_year, request_seq)
);

CREATE INDEX IF NOT EXISTS idx_purchase_status ON purchase_requests(status);

-- Migrationshistorik
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// Historiktabeller (schema version 2)
pub const CREATE_HISTORY_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS vehicle_application_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    application_id INTEGER NOT NULL,
    vehicle_number TEXT NOT NULL,
    maker_model TEXT,
    insurance_company TEXT,
    insurance_expiry TEXT,
    commute_distance_km REAL,
    notes TEXT,
    superseded_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (application_id) REFERENCES vehicle_applications(id)
);

CREATE INDEX IF NOT EXISTS idx_vehicle_history_app ON vehicle_application_history(application_id);

CREATE TABLE IF NOT EXISTS purchase_request_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    request_id INTEGER NOT NULL,
    status TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    unit_price INTEGER NOT NULL,
    vendor TEXT,
    notes TEXT,
    superseded_at TEXT NOT NULL DEFAULT (datetime('now')),
    FOREIGN KEY (request_id) REFERENCES purchase_requests(id)
);

CREATE INDEX IF NOT EXISTS idx_purchase_history_req ON purchase_request_history(request_id);
"#;

/// v3: ögonblicksbilden av ett inköpsärende omfattar alla fält som en uppdatering kan ändra
pub const ADD_PURCHASE_HISTORY_COLUMNS: &str = r#"
ALTER TABLE purchase_request_history ADD COLUMN requester_staff_id INTEGER;
ALTER TABLE purchase_request_history ADD COLUMN item_name TEXT;
ALTER TABLE purchase_request_history ADD COLUMN requested_on TEXT;
"#;
