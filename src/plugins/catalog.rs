//! Subscenario catalog: the registry of versioned datasets per axis category.
//!
//! The catalog is populated by the data loader and read by every composition.
//! Entries are never mutated once registered; they can be removed only while no
//! persisted scenario binds them. Temporal subscenarios additionally carry their
//! period/horizon/timepoint data in an arena keyed by `temporal_scenario_id`.

use crate::core::broker::DbBroker;
use crate::core::error::{self, GridplanError};
use crate::core::output::{self, OutputFormat};
use crate::core::store::Store;
use crate::core::{db, schemas, time};
use crate::plugins::lifecycle;
use crate::plugins::temporal::TemporalSubscenario;
use clap::{Parser, Subcommand};
use regex::Regex;
use rusqlite::{OptionalExtension, params};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

pub const TEMPORAL_CATEGORY: &str = "temporal";

static CATEGORY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]{0,63}$").unwrap());

/// Data the engine's rules read from a subscenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscenarioPayload {
    /// Ids this subscenario defines (projects of a portfolio, fuels of a fuel set).
    #[serde(default)]
    pub members: BTreeSet<String>,
    /// Reference kind → ids this subscenario mentions.
    #[serde(default)]
    pub references: BTreeMap<String, BTreeSet<String>>,
    /// Member id → field values.
    #[serde(default)]
    pub attributes: BTreeMap<String, BTreeMap<String, JsonValue>>,
}

impl SubscenarioPayload {
    pub fn references(&self, kind: &str) -> impl Iterator<Item = &str> {
        self.references
            .get(kind)
            .into_iter()
            .flat_map(|ids| ids.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscenarioEntry {
    pub category: String,
    pub subscenario_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub payload: SubscenarioPayload,
}

impl SubscenarioEntry {
    pub fn new(category: &str, subscenario_id: i64, name: &str, description: &str) -> Self {
        Self {
            category: category.to_string(),
            subscenario_id,
            name: name.to_string(),
            description: description.to_string(),
            payload: SubscenarioPayload::default(),
        }
    }

    pub fn with_members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.payload.members.extend(members.into_iter().map(Into::into));
        self
    }

    pub fn with_references<I, S>(mut self, kind: &str, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.payload
            .references
            .entry(kind.to_string())
            .or_default()
            .extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_attributes(mut self, member: &str, attrs: JsonValue) -> Self {
        if let JsonValue::Object(map) = attrs {
            self.payload
                .attributes
                .entry(member.to_string())
                .or_default()
                .extend(map);
        }
        self
    }

    pub fn key(&self) -> (String, i64) {
        (self.category.clone(), self.subscenario_id)
    }

    fn check_shape(&self) -> Result<(), GridplanError> {
        if !CATEGORY_PATTERN.is_match(&self.category) {
            return Err(GridplanError::ValidationError(format!(
                "invalid category '{}': expected lowercase snake_case",
                self.category
            )));
        }
        if self.name.trim().is_empty() {
            return Err(GridplanError::ValidationError(format!(
                "{} subscenario {} needs a name",
                self.category, self.subscenario_id
            )));
        }
        Ok(())
    }
}

/// In-memory catalog. Built once by the loader and shared read-only (`Arc`) by
/// every composition.
#[derive(Debug, Default)]
pub struct SubscenarioCatalog {
    entries: FxHashMap<(String, i64), Arc<SubscenarioEntry>>,
    temporal: FxHashMap<i64, Arc<TemporalSubscenario>>,
}

impl SubscenarioCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: SubscenarioEntry) -> Result<Arc<SubscenarioEntry>, GridplanError> {
        entry.check_shape()?;
        let key = entry.key();
        if self.entries.contains_key(&key) {
            return Err(GridplanError::DuplicateEntry(format!(
                "{} subscenario {} already registered",
                key.0, key.1
            )));
        }
        let entry = Arc::new(entry);
        self.entries.insert(key, Arc::clone(&entry));
        Ok(entry)
    }

    /// Registers the `temporal` entry together with its period/horizon data.
    pub fn register_temporal(
        &mut self,
        entry: SubscenarioEntry,
        data: TemporalSubscenario,
    ) -> Result<Arc<SubscenarioEntry>, GridplanError> {
        if entry.category != TEMPORAL_CATEGORY {
            return Err(GridplanError::ValidationError(format!(
                "temporal data must be registered under category '{}', not '{}'",
                TEMPORAL_CATEGORY, entry.category
            )));
        }
        let id = entry.subscenario_id;
        let entry = self.register(entry)?;
        self.temporal.insert(id, Arc::new(data));
        Ok(entry)
    }

    pub fn lookup(&self, category: &str, subscenario_id: i64) -> Result<Arc<SubscenarioEntry>, GridplanError> {
        self.entries
            .get(&(category.to_string(), subscenario_id))
            .cloned()
            .ok_or_else(|| {
                GridplanError::NotFound(format!(
                    "{} subscenario {} is not registered",
                    category, subscenario_id
                ))
            })
    }

    pub fn contains(&self, category: &str, subscenario_id: i64) -> bool {
        self.entries
            .contains_key(&(category.to_string(), subscenario_id))
    }

    pub fn temporal(&self, temporal_scenario_id: i64) -> Result<Arc<TemporalSubscenario>, GridplanError> {
        self.temporal
            .get(&temporal_scenario_id)
            .cloned()
            .ok_or_else(|| {
                GridplanError::NotFound(format!(
                    "temporal subscenario {} has no period/horizon data",
                    temporal_scenario_id
                ))
            })
    }

    /// Entries sorted by (category, id), optionally restricted to one category.
    pub fn list(&self, category: Option<&str>) -> Vec<Arc<SubscenarioEntry>> {
        let mut out: Vec<Arc<SubscenarioEntry>> = self
            .entries
            .values()
            .filter(|e| category.is_none_or(|c| e.category == c))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.key().cmp(&b.key()));
        out
    }

    pub fn categories(&self) -> BTreeSet<&str> {
        self.entries.keys().map(|(c, _)| c.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes an entry unless a persisted scenario binds it.
    pub fn remove(
        &mut self,
        category: &str,
        subscenario_id: i64,
        referenced: bool,
    ) -> Result<Arc<SubscenarioEntry>, GridplanError> {
        let key = (category.to_string(), subscenario_id);
        if !self.entries.contains_key(&key) {
            return Err(GridplanError::NotFound(format!(
                "{} subscenario {} is not registered",
                category, subscenario_id
            )));
        }
        if referenced {
            return Err(GridplanError::EntryReferenced(format!(
                "{} subscenario {} is bound by a resolved scenario",
                category, subscenario_id
            )));
        }
        if category == TEMPORAL_CATEGORY {
            self.temporal.remove(&subscenario_id);
        }
        self.entries.remove(&key).ok_or_else(|| {
            GridplanError::NotFound(format!("{} subscenario {}", category, subscenario_id))
        })
    }
}

// --- Persistence ---

pub fn catalog_db_path(root: &Path) -> PathBuf {
    root.join(schemas::CATALOG_DB_NAME)
}

fn ensure_schema(conn: &rusqlite::Connection) -> Result<(), GridplanError> {
    conn.execute(schemas::META_SCHEMA, [])?;
    let current_version = db::schema_version(conn)?;
    if current_version >= schemas::CATALOG_SCHEMA_VERSION {
        return Ok(());
    }

    if current_version < 1 {
        conn.execute(schemas::CATALOG_DB_SCHEMA_SUBSCENARIOS, [])?;
        conn.execute(schemas::CATALOG_DB_SCHEMA_INDEX_CATEGORY, [])?;
    }

    if current_version < 2 {
        conn.execute(schemas::CATALOG_DB_SCHEMA_TEMPORAL, [])?;
    }

    db::write_schema_version(conn, schemas::CATALOG_SCHEMA_VERSION)
}

pub fn initialize_catalog_db(root: &Path) -> Result<(), GridplanError> {
    fs::create_dir_all(root).map_err(GridplanError::IoError)?;
    let broker = DbBroker::new(root);
    broker.with_conn(&catalog_db_path(root), "gridplan", None, "catalog.init", |conn| {
        ensure_schema(conn)
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<String, GridplanError> {
    serde_json::to_string(value).map_err(|e| GridplanError::ValidationError(e.to_string()))
}

fn insert_entry(conn: &rusqlite::Connection, entry: &SubscenarioEntry) -> Result<(), GridplanError> {
    let exists: Option<i64> = conn
        .query_row(
            "SELECT subscenario_id FROM subscenarios WHERE category = ?1 AND subscenario_id = ?2",
            params![entry.category, entry.subscenario_id],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_some() {
        return Err(GridplanError::DuplicateEntry(format!(
            "{} subscenario {} already registered",
            entry.category, entry.subscenario_id
        )));
    }
    conn.execute(
        "INSERT INTO subscenarios(category, subscenario_id, name, description, payload, created_at)
         VALUES(?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.category,
            entry.subscenario_id,
            entry.name,
            entry.description,
            to_json(&entry.payload)?,
            time::now_epoch_z()
        ],
    )?;
    Ok(())
}

pub fn save_entry(root: &Path, actor: &str, entry: &SubscenarioEntry) -> Result<(), GridplanError> {
    entry.check_shape()?;
    let broker = DbBroker::new(root);
    broker.with_conn(&catalog_db_path(root), actor, None, "catalog.register", |conn| {
        ensure_schema(conn)?;
        insert_entry(conn, entry)
    })
}

pub fn save_temporal(
    root: &Path,
    actor: &str,
    entry: &SubscenarioEntry,
    data: &TemporalSubscenario,
) -> Result<(), GridplanError> {
    entry.check_shape()?;
    if entry.category != TEMPORAL_CATEGORY {
        return Err(GridplanError::ValidationError(format!(
            "temporal data must be registered under category '{}'",
            TEMPORAL_CATEGORY
        )));
    }
    let broker = DbBroker::new(root);
    broker.with_conn(&catalog_db_path(root), actor, None, "catalog.register_temporal", |conn| {
        ensure_schema(conn)?;
        let tx = conn.unchecked_transaction()?;
        insert_entry(&tx, entry)?;
        tx.execute(
            "INSERT INTO temporal_data(temporal_scenario_id, data, created_at) VALUES(?1, ?2, ?3)",
            params![entry.subscenario_id, to_json(data)?, time::now_epoch_z()],
        )?;
        tx.commit()?;
        Ok(())
    })
}

/// Build the in-memory catalog from `catalog.db`.
pub fn load_catalog(root: &Path) -> Result<SubscenarioCatalog, GridplanError> {
    let broker = DbBroker::new(root);
    let (entries, temporal) =
        broker.with_conn(&catalog_db_path(root), "gridplan", None, "catalog.load", |conn| {
            ensure_schema(conn)?;
            let mut stmt = conn.prepare(
                "SELECT category, subscenario_id, name, description, payload
                 FROM subscenarios ORDER BY category, subscenario_id",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?;
            let mut entries = Vec::new();
            for row in rows {
                let (category, subscenario_id, name, description, payload) = row?;
                let payload: SubscenarioPayload = serde_json::from_str(&payload).map_err(|e| {
                    GridplanError::ValidationError(format!(
                        "corrupt payload for {} subscenario {}: {}",
                        category, subscenario_id, e
                    ))
                })?;
                entries.push(SubscenarioEntry {
                    category,
                    subscenario_id,
                    name,
                    description,
                    payload,
                });
            }

            let mut stmt = conn.prepare("SELECT temporal_scenario_id, data FROM temporal_data")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?;
            let mut temporal = FxHashMap::default();
            for row in rows {
                let (id, data) = row?;
                let data: TemporalSubscenario = serde_json::from_str(&data).map_err(|e| {
                    GridplanError::ValidationError(format!(
                        "corrupt temporal data for subscenario {}: {}",
                        id, e
                    ))
                })?;
                temporal.insert(id, data);
            }
            Ok((entries, temporal))
        })?;

    let mut catalog = SubscenarioCatalog::new();
    let mut temporal = temporal;
    for entry in entries {
        if entry.category == TEMPORAL_CATEGORY
            && let Some(data) = temporal.remove(&entry.subscenario_id)
        {
            catalog.register_temporal(entry, data)?;
            continue;
        }
        catalog.register(entry)?;
    }
    Ok(catalog)
}

/// Delete an entry from `catalog.db` unless a persisted scenario binds it.
pub fn remove_entry(
    root: &Path,
    actor: &str,
    category: &str,
    subscenario_id: i64,
) -> Result<(), GridplanError> {
    if lifecycle::is_entry_bound(root, category, subscenario_id)? {
        return Err(GridplanError::EntryReferenced(format!(
            "{} subscenario {} is bound by a resolved scenario",
            category, subscenario_id
        )));
    }
    let broker = DbBroker::new(root);
    broker.with_conn(&catalog_db_path(root), actor, None, "catalog.remove", |conn| {
        ensure_schema(conn)?;
        let tx = conn.unchecked_transaction()?;
        let deleted = tx.execute(
            "DELETE FROM subscenarios WHERE category = ?1 AND subscenario_id = ?2",
            params![category, subscenario_id],
        )?;
        if deleted == 0 {
            return Err(GridplanError::NotFound(format!(
                "{} subscenario {} is not registered",
                category, subscenario_id
            )));
        }
        if category == TEMPORAL_CATEGORY {
            tx.execute(
                "DELETE FROM temporal_data WHERE temporal_scenario_id = ?1",
                [subscenario_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    })
}

// --- CLI ---

#[derive(Parser, Debug)]
#[clap(name = "catalog", about = "Register and inspect subscenarios.")]
pub struct CatalogCli {
    /// Output format for this command group.
    #[clap(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    #[clap(subcommand)]
    command: CatalogCommand,
}

#[derive(Subcommand, Debug)]
pub enum CatalogCommand {
    /// Register a subscenario for an axis category.
    Register {
        #[clap(long)]
        category: String,
        #[clap(long)]
        id: i64,
        #[clap(long)]
        name: String,
        #[clap(long, default_value = "")]
        description: String,
        /// JSON file with members, references and attributes.
        #[clap(long)]
        payload: Option<PathBuf>,
        /// JSON file with periods, horizons and timepoints (category `temporal` only).
        #[clap(long)]
        temporal: Option<PathBuf>,
    },
    /// Look up one subscenario.
    Lookup {
        #[clap(long)]
        category: String,
        #[clap(long)]
        id: i64,
    },
    /// List subscenarios.
    List {
        #[clap(long)]
        category: Option<String>,
    },
    /// Remove an unreferenced subscenario.
    Remove {
        #[clap(long)]
        category: String,
        #[clap(long)]
        id: i64,
    },
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, GridplanError> {
    let content = fs::read_to_string(path).map_err(GridplanError::IoError)?;
    serde_json::from_str(&content)
        .map_err(|e| GridplanError::ValidationError(format!("{}: {}", path.display(), e)))
}

pub fn run_catalog_cli(store: &Store, actor: &str, cli: CatalogCli) -> Result<(), error::GridplanError> {
    let root = &store.root;
    let out = match cli.command {
        CatalogCommand::Register {
            category,
            id,
            name,
            description,
            payload,
            temporal,
        } => {
            let mut entry = SubscenarioEntry::new(&category, id, &name, &description);
            if let Some(path) = payload {
                entry.payload = read_json_file(&path)?;
            }
            match (category.as_str(), temporal) {
                (TEMPORAL_CATEGORY, Some(path)) => {
                    let data: TemporalSubscenario = read_json_file(&path)?;
                    save_temporal(root, actor, &entry, &data)?;
                }
                (TEMPORAL_CATEGORY, None) => {
                    return Err(GridplanError::ValidationError(
                        "temporal subscenarios need --temporal <file>".to_string(),
                    ));
                }
                (_, Some(_)) => {
                    return Err(GridplanError::ValidationError(format!(
                        "--temporal only applies to category '{}'",
                        TEMPORAL_CATEGORY
                    )));
                }
                (_, None) => save_entry(root, actor, &entry)?,
            }
            time::command_envelope(
                "catalog.register",
                "ok",
                serde_json::json!({ "category": category, "subscenario_id": id }),
            )
        }
        CatalogCommand::Lookup { category, id } => {
            let catalog = load_catalog(root)?;
            let entry = catalog.lookup(&category, id)?;
            time::command_envelope("catalog.lookup", "ok", serde_json::json!({ "entry": entry }))
        }
        CatalogCommand::List { category } => {
            let catalog = load_catalog(root)?;
            let entries = catalog.list(category.as_deref());
            time::command_envelope(
                "catalog.list",
                "ok",
                serde_json::json!({ "count": entries.len(), "entries": entries }),
            )
        }
        CatalogCommand::Remove { category, id } => {
            remove_entry(root, actor, &category, id)?;
            time::command_envelope(
                "catalog.remove",
                "ok",
                serde_json::json!({ "category": category, "subscenario_id": id }),
            )
        }
    };

    match cli.format {
        OutputFormat::Json => output::print_json(&out)?,
        OutputFormat::Text => {
            if let Some(entries) = out.get("entries").and_then(JsonValue::as_array) {
                for e in entries {
                    println!(
                        "{:<32} {:>6}  {}",
                        e["category"].as_str().unwrap_or(""),
                        e["subscenario_id"],
                        e["name"].as_str().unwrap_or("")
                    );
                }
            } else if let Some(entry) = out.get("entry") {
                println!(
                    "{} {}: {}\n  {}\n  members: {}",
                    entry["category"].as_str().unwrap_or(""),
                    entry["subscenario_id"],
                    entry["name"].as_str().unwrap_or(""),
                    entry["description"].as_str().unwrap_or(""),
                    entry["payload"]["members"]
                        .as_array()
                        .map(|m| m.len())
                        .unwrap_or(0)
                );
            } else {
                println!(
                    "{} {}",
                    out["cmd"].as_str().unwrap_or(""),
                    out["status"].as_str().unwrap_or("")
                );
            }
        }
    }
    Ok(())
}
