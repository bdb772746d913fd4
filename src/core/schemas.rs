//! Centralized database schema definitions for gridplan's stores.
//!
//! Two SQLite databases hold all persisted state:
//! 1. catalog.db: Subscenario entries and the temporal data arena.
//! 2. scenarios.db: Resolved scenarios, their bindings, the validation audit log,
//!    and lifecycle transition events.

pub const META_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
";

// --- 1. Catalog ---
pub const CATALOG_DB_NAME: &str = "catalog.db";
pub const CATALOG_SCHEMA_VERSION: u32 = 2;

pub const CATALOG_DB_SCHEMA_SUBSCENARIOS: &str = "
    CREATE TABLE IF NOT EXISTS subscenarios (
        category TEXT NOT NULL,
        subscenario_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        payload TEXT NOT NULL DEFAULT '{}', -- JSON: members, references, attributes
        created_at TEXT NOT NULL,
        PRIMARY KEY (category, subscenario_id)
    )
";
pub const CATALOG_DB_SCHEMA_INDEX_CATEGORY: &str =
    "CREATE INDEX IF NOT EXISTS idx_subscenarios_category ON subscenarios(category)";

pub const CATALOG_DB_SCHEMA_TEMPORAL: &str = "
    CREATE TABLE IF NOT EXISTS temporal_data (
        temporal_scenario_id INTEGER PRIMARY KEY,
        data TEXT NOT NULL, -- JSON: periods, horizons, timepoints
        created_at TEXT NOT NULL
    )
";

// --- 2. Scenarios ---
pub const SCENARIOS_DB_NAME: &str = "scenarios.db";
pub const SCENARIOS_SCHEMA_VERSION: u32 = 3;

pub const SCENARIOS_DB_SCHEMA_SCENARIOS: &str = "
    CREATE TABLE IF NOT EXISTS scenarios (
        scenario_id INTEGER PRIMARY KEY AUTOINCREMENT,
        scenario_name TEXT NOT NULL UNIQUE,
        fingerprint TEXT NOT NULL,
        request TEXT NOT NULL, -- JSON ScenarioRequest
        resolved TEXT NOT NULL, -- JSON feature flags + bound axis refs
        validation_status TEXT NOT NULL DEFAULT 'pending',
        run_status TEXT NOT NULL DEFAULT 'created',
        queue_order_id INTEGER,
        queue_claim_token TEXT,
        run_process_id TEXT,
        run_start_time TEXT,
        run_end_time TEXT,
        version INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
";
pub const SCENARIOS_DB_SCHEMA_INDEX_RUN_STATUS: &str =
    "CREATE INDEX IF NOT EXISTS idx_scenarios_run_status ON scenarios(run_status, queue_order_id)";

pub const SCENARIOS_DB_SCHEMA_BINDINGS: &str = "
    CREATE TABLE IF NOT EXISTS scenario_bindings (
        scenario_id INTEGER NOT NULL,
        axis_name TEXT NOT NULL,
        category TEXT NOT NULL,
        subscenario_id INTEGER NOT NULL,
        PRIMARY KEY (scenario_id, axis_name, subscenario_id),
        FOREIGN KEY(scenario_id) REFERENCES scenarios(scenario_id)
    )
";
pub const SCENARIOS_DB_SCHEMA_INDEX_BINDINGS_ENTRY: &str =
    "CREATE INDEX IF NOT EXISTS idx_bindings_entry ON scenario_bindings(category, subscenario_id)";

pub const SCENARIOS_DB_SCHEMA_VALIDATION_ISSUES: &str = "
    CREATE TABLE IF NOT EXISTS validation_issues (
        event_id TEXT PRIMARY KEY,
        scenario_id INTEGER NOT NULL,
        validation_run_id TEXT NOT NULL,
        ts TEXT NOT NULL,
        severity TEXT NOT NULL,
        kind TEXT NOT NULL,
        axis_or_module TEXT NOT NULL,
        description TEXT NOT NULL,
        FOREIGN KEY(scenario_id) REFERENCES scenarios(scenario_id)
    )
";
pub const SCENARIOS_DB_SCHEMA_INDEX_ISSUES_SCENARIO: &str =
    "CREATE INDEX IF NOT EXISTS idx_issues_scenario_ts ON validation_issues(scenario_id, ts)";

pub const SCENARIOS_DB_SCHEMA_EVENTS: &str = "
    CREATE TABLE IF NOT EXISTS scenario_events (
        event_id TEXT PRIMARY KEY,
        scenario_id INTEGER NOT NULL,
        ts TEXT NOT NULL,
        from_status TEXT,
        to_status TEXT NOT NULL,
        actor TEXT NOT NULL,
        payload TEXT NOT NULL DEFAULT '{}',
        FOREIGN KEY(scenario_id) REFERENCES scenarios(scenario_id)
    )
";
pub const SCENARIOS_DB_SCHEMA_INDEX_EVENTS_SCENARIO: &str =
    "CREATE INDEX IF NOT EXISTS idx_events_scenario ON scenario_events(scenario_id, ts)";

/// Machine-readable description of the persisted layout.
pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "stores": [
            {
                "db": CATALOG_DB_NAME,
                "version": CATALOG_SCHEMA_VERSION,
                "tables": ["subscenarios", "temporal_data"]
            },
            {
                "db": SCENARIOS_DB_NAME,
                "version": SCENARIOS_SCHEMA_VERSION,
                "tables": ["scenarios", "scenario_bindings", "validation_issues", "scenario_events"]
            }
        ],
        "audit_log": crate::core::broker::AUDIT_LOG_NAME
    })
}
