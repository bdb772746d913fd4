//! Scenario store and run lifecycle.
//!
//! `created → validating → {valid, invalid} → queued → running → {complete, error}`.
//! The only shared-mutable state is a scenario's lifecycle columns. Every update
//! is a conditional `UPDATE ... WHERE version = ?`; losing that race on a claim
//! surfaces as `ConcurrentClaim`. Each transition appends a `scenario_events` row.

use crate::core::broker::DbBroker;
use crate::core::error::GridplanError;
use crate::core::report::{IssueKind, Severity, ValidationIssue, ValidationReport, ValidationStatus};
use crate::core::{db, schemas, time};
use crate::plugins::composer::ResolvedScenario;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Created,
    Validating,
    Valid,
    Invalid,
    Queued,
    Running,
    Complete,
    Error,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Created => "created",
            RunStatus::Validating => "validating",
            RunStatus::Valid => "valid",
            RunStatus::Invalid => "invalid",
            RunStatus::Queued => "queued",
            RunStatus::Running => "running",
            RunStatus::Complete => "complete",
            RunStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(RunStatus::Created),
            "validating" => Some(RunStatus::Validating),
            "valid" => Some(RunStatus::Valid),
            "invalid" => Some(RunStatus::Invalid),
            "queued" => Some(RunStatus::Queued),
            "running" => Some(RunStatus::Running),
            "complete" => Some(RunStatus::Complete),
            "error" => Some(RunStatus::Error),
            _ => None,
        }
    }

    /// Re-resolution is refused while a scenario waits in or runs from the queue.
    pub fn can_resolve(self) -> bool {
        !matches!(
            self,
            RunStatus::Validating | RunStatus::Queued | RunStatus::Running
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks one edge of the lifecycle graph.
pub fn transition(from: RunStatus, to: RunStatus) -> Result<(), GridplanError> {
    use RunStatus::*;
    let allowed = match (from, to) {
        (Created, Validating) => true,
        (Validating, Valid | Invalid) => true,
        (Valid | Invalid | Complete | Error, Validating) => true,
        (Valid, Queued) => true,
        (Queued, Running) => true,
        (Running, Complete | Error) => true,
        _ => false,
    };
    if allowed {
        Ok(())
    } else {
        Err(GridplanError::InvalidTransition(format!(
            "{} -> {} is not a lifecycle transition",
            from, to
        )))
    }
}

impl ToSql for RunStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for RunStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        RunStatus::parse(s).ok_or_else(|| FromSqlError::Other(format!("unknown run status '{}'", s).into()))
    }
}

impl ToSql for ValidationStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for ValidationStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        ValidationStatus::parse(s)
            .ok_or_else(|| FromSqlError::Other(format!("unknown validation status '{}'", s).into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Complete,
    Error,
}

impl RunOutcome {
    pub fn status(self) -> RunStatus {
        match self {
            RunOutcome::Complete => RunStatus::Complete,
            RunOutcome::Error => RunStatus::Error,
        }
    }
}

/// Proof that the holder won the claim on a queued scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimToken {
    pub scenario_id: i64,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioRecord {
    pub scenario_id: i64,
    pub scenario_name: String,
    pub fingerprint: String,
    pub validation_status: ValidationStatus,
    pub run_status: RunStatus,
    pub queue_order_id: Option<i64>,
    pub queue_claim_token: Option<String>,
    pub run_process_id: Option<String>,
    pub run_start_time: Option<String>,
    pub run_end_time: Option<String>,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueRecord {
    pub event_id: String,
    pub validation_run_id: String,
    #[serde(flatten)]
    pub issue: ValidationIssue,
}

#[derive(Debug, Clone, Serialize)]
pub struct LifecycleEvent {
    pub event_id: String,
    pub scenario_id: i64,
    pub ts: String,
    pub from_status: Option<RunStatus>,
    pub to_status: RunStatus,
    pub actor: String,
    pub payload: serde_json::Value,
}

// --- Schema ---

pub fn scenarios_db_path(root: &Path) -> PathBuf {
    root.join(schemas::SCENARIOS_DB_NAME)
}

fn ensure_schema(conn: &Connection) -> Result<(), GridplanError> {
    conn.execute(schemas::META_SCHEMA, [])?;
    let current_version = db::schema_version(conn)?;
    if current_version >= schemas::SCENARIOS_SCHEMA_VERSION {
        return Ok(());
    }

    if current_version < 1 {
        conn.execute(schemas::SCENARIOS_DB_SCHEMA_SCENARIOS, [])?;
        conn.execute(schemas::SCENARIOS_DB_SCHEMA_INDEX_RUN_STATUS, [])?;
        conn.execute(schemas::SCENARIOS_DB_SCHEMA_BINDINGS, [])?;
        conn.execute(schemas::SCENARIOS_DB_SCHEMA_INDEX_BINDINGS_ENTRY, [])?;
    }

    if current_version < 2 {
        conn.execute(schemas::SCENARIOS_DB_SCHEMA_VALIDATION_ISSUES, [])?;
        conn.execute(schemas::SCENARIOS_DB_SCHEMA_INDEX_ISSUES_SCENARIO, [])?;
    }

    if current_version < 3 {
        conn.execute(schemas::SCENARIOS_DB_SCHEMA_EVENTS, [])?;
        conn.execute(schemas::SCENARIOS_DB_SCHEMA_INDEX_EVENTS_SCENARIO, [])?;
    }

    db::write_schema_version(conn, schemas::SCENARIOS_SCHEMA_VERSION)
}

pub fn initialize_scenarios_db(root: &Path) -> Result<(), GridplanError> {
    fs::create_dir_all(root).map_err(GridplanError::IoError)?;
    let broker = DbBroker::new(root);
    broker.with_conn(&scenarios_db_path(root), "gridplan", None, "scenarios.init", |conn| {
        ensure_schema(conn)
    })
}

// --- Row helpers ---

const SCENARIO_COLUMNS: &str = "scenario_id, scenario_name, fingerprint, validation_status, run_status,
     queue_order_id, queue_claim_token, run_process_id, run_start_time, run_end_time,
     version, created_at, updated_at";

fn scenario_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScenarioRecord> {
    Ok(ScenarioRecord {
        scenario_id: row.get(0)?,
        scenario_name: row.get(1)?,
        fingerprint: row.get(2)?,
        validation_status: row.get(3)?,
        run_status: row.get(4)?,
        queue_order_id: row.get(5)?,
        queue_claim_token: row.get(6)?,
        run_process_id: row.get(7)?,
        run_start_time: row.get(8)?,
        run_end_time: row.get(9)?,
        version: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn fetch_scenario(conn: &Connection, scenario_id: i64) -> Result<ScenarioRecord, GridplanError> {
    conn.query_row(
        &format!("SELECT {} FROM scenarios WHERE scenario_id = ?1", SCENARIO_COLUMNS),
        [scenario_id],
        scenario_from_row,
    )
    .optional()?
    .ok_or_else(|| GridplanError::NotFound(format!("scenario {} does not exist", scenario_id)))
}

fn write_event(
    conn: &Connection,
    scenario_id: i64,
    from: Option<RunStatus>,
    to: RunStatus,
    actor: &str,
    payload: serde_json::Value,
) -> Result<(), GridplanError> {
    conn.execute(
        "INSERT INTO scenario_events(event_id, scenario_id, ts, from_status, to_status, actor, payload)
         VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            time::new_event_id(),
            scenario_id,
            time::now_epoch_z(),
            from,
            to,
            actor,
            payload.to_string()
        ],
    )?;
    Ok(())
}

/// Conditional lifecycle update. Zero rows changed means someone else moved first.
fn guarded_update(
    conn: &Connection,
    record: &ScenarioRecord,
    set_clause: &str,
    extra: &[&dyn ToSql],
) -> Result<(), GridplanError> {
    let sql = format!(
        "UPDATE scenarios SET {}, version = version + 1, updated_at = ?1
         WHERE scenario_id = ?2 AND version = ?3 AND run_status = ?4",
        set_clause
    );
    let ts = time::now_epoch_z();
    let mut bound: Vec<&dyn ToSql> = Vec::with_capacity(4 + extra.len());
    bound.push(&ts);
    bound.push(&record.scenario_id);
    bound.push(&record.version);
    bound.push(&record.run_status);
    bound.extend_from_slice(extra);
    let changed = conn.execute(&sql, bound.as_slice())?;
    if changed == 0 {
        return Err(GridplanError::ConcurrentClaim(format!(
            "scenario {} changed concurrently (expected version {})",
            record.scenario_id, record.version
        )));
    }
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, GridplanError> {
    serde_json::to_string(value).map_err(|e| GridplanError::ValidationError(e.to_string()))
}

fn check_token(record: &ScenarioRecord, claim: &ClaimToken) -> Result<(), GridplanError> {
    if record.run_status != RunStatus::Running {
        return Err(GridplanError::InvalidTransition(format!(
            "scenario {} is {}, not running",
            record.scenario_id, record.run_status
        )));
    }
    if record.queue_claim_token.as_deref() != Some(claim.token.as_str()) {
        return Err(GridplanError::ConcurrentClaim(format!(
            "claim token does not match the holder of scenario {}",
            record.scenario_id
        )));
    }
    Ok(())
}

// --- Operations ---

/// Persist a resolution and its validation report in one transaction.
///
/// New names get a fresh `scenario_id`; an existing name keeps its id and is
/// re-resolved in place if its state allows it. Sets `scenario_id` and the
/// lifecycle fields on `resolved`.
pub fn record_resolution(
    root: &Path,
    actor: &str,
    resolved: &mut ResolvedScenario,
    report: &ValidationReport,
) -> Result<ScenarioRecord, GridplanError> {
    let final_status = match report.status() {
        ValidationStatus::Invalid => RunStatus::Invalid,
        _ => RunStatus::Valid,
    };
    let validation_status = report.status();
    resolved.validation_status = validation_status;
    resolved.run_status = final_status;
    resolved.queue_claim_token = None;
    resolved.run_process_id = None;
    resolved.run_start_time = None;
    resolved.run_end_time = None;

    let request_json = to_json(&resolved.request)?;
    let scenario_name = resolved.scenario_name.clone();
    let broker = DbBroker::new(root);
    let record = broker.with_conn(
        &scenarios_db_path(root),
        actor,
        Some(&scenario_name),
        "scenario.resolve",
        |conn| {
            ensure_schema(conn)?;
            let tx = conn.unchecked_transaction()?;
            let ts = time::now_epoch_z();

            let existing: Option<ScenarioRecord> = tx
                .query_row(
                    &format!("SELECT {} FROM scenarios WHERE scenario_name = ?1", SCENARIO_COLUMNS),
                    [&scenario_name],
                    scenario_from_row,
                )
                .optional()?;

            let (scenario_id, from) = match existing {
                Some(rec) => {
                    if !rec.run_status.can_resolve() {
                        return Err(GridplanError::InvalidTransition(format!(
                            "scenario '{}' is {} and cannot be re-resolved",
                            rec.scenario_name, rec.run_status
                        )));
                    }
                    transition(rec.run_status, RunStatus::Validating)?;
                    resolved.scenario_id = Some(rec.scenario_id);
                    guarded_update(
                        &tx,
                        &rec,
                        "fingerprint = ?5, request = ?6, resolved = ?7, validation_status = ?8,
                         run_status = ?9, queue_order_id = NULL, queue_claim_token = NULL,
                         run_process_id = NULL, run_start_time = NULL, run_end_time = NULL",
                        &[
                            &resolved.fingerprint,
                            &request_json,
                            &to_json(resolved)?,
                            &validation_status,
                            &final_status,
                        ],
                    )?;
                    tx.execute(
                        "DELETE FROM scenario_bindings WHERE scenario_id = ?1",
                        [rec.scenario_id],
                    )?;
                    (rec.scenario_id, rec.run_status)
                }
                None => {
                    tx.execute(
                        "INSERT INTO scenarios(scenario_name, fingerprint, request, resolved,
                             validation_status, run_status, created_at, updated_at)
                         VALUES(?1, ?2, ?3, '{}', ?4, ?5, ?6, ?6)",
                        params![
                            resolved.scenario_name,
                            resolved.fingerprint,
                            request_json,
                            validation_status,
                            final_status,
                            ts
                        ],
                    )?;
                    let scenario_id = tx.last_insert_rowid();
                    resolved.scenario_id = Some(scenario_id);
                    tx.execute(
                        "UPDATE scenarios SET resolved = ?1 WHERE scenario_id = ?2",
                        params![to_json(resolved)?, scenario_id],
                    )?;
                    write_event(&tx, scenario_id, None, RunStatus::Created, actor, serde_json::json!({}))?;
                    (scenario_id, RunStatus::Created)
                }
            };

            for (axis, category, subscenario_id) in resolved.bindings() {
                tx.execute(
                    "INSERT OR IGNORE INTO scenario_bindings(scenario_id, axis_name, category, subscenario_id)
                     VALUES(?1, ?2, ?3, ?4)",
                    params![scenario_id, axis, category, subscenario_id],
                )?;
            }

            let validation_run_id = time::new_event_id();
            for issue in report.issues() {
                tx.execute(
                    "INSERT INTO validation_issues(event_id, scenario_id, validation_run_id, ts,
                         severity, kind, axis_or_module, description)
                     VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        time::new_event_id(),
                        scenario_id,
                        validation_run_id,
                        issue.timestamp,
                        issue.severity.as_str(),
                        issue.kind.as_str(),
                        issue.axis_or_module,
                        issue.description
                    ],
                )?;
            }

            write_event(&tx, scenario_id, Some(from), RunStatus::Validating, actor, serde_json::json!({}))?;
            write_event(
                &tx,
                scenario_id,
                Some(RunStatus::Validating),
                final_status,
                actor,
                serde_json::json!({
                    "validation_run_id": validation_run_id,
                    "fatal": report.count(Severity::Fatal),
                    "warnings": report.count(Severity::Warning),
                    "report_fingerprint": report.fingerprint(),
                }),
            )?;

            let record = fetch_scenario(&tx, scenario_id)?;
            tx.commit()?;
            Ok(record)
        },
    )?;
    Ok(record)
}

/// valid → queued, appending the scenario to the end of the queue.
pub fn enqueue(root: &Path, actor: &str, scenario_id: i64) -> Result<ScenarioRecord, GridplanError> {
    let broker = DbBroker::new(root);
    broker.with_conn(&scenarios_db_path(root), actor, None, "scenario.enqueue", |conn| {
        ensure_schema(conn)?;
        let tx = conn.unchecked_transaction()?;
        let rec = fetch_scenario(&tx, scenario_id)?;
        if rec.validation_status != ValidationStatus::Valid {
            return Err(GridplanError::InvalidTransition(format!(
                "scenario {} is {} and cannot be queued",
                scenario_id,
                rec.validation_status.as_str()
            )));
        }
        transition(rec.run_status, RunStatus::Queued)?;
        let next_order: i64 = tx.query_row(
            "SELECT COALESCE(MAX(queue_order_id), 0) + 1 FROM scenarios",
            [],
            |row| row.get(0),
        )?;
        guarded_update(
            &tx,
            &rec,
            "run_status = ?5, queue_order_id = ?6",
            &[&RunStatus::Queued, &next_order],
        )?;
        write_event(
            &tx,
            scenario_id,
            Some(rec.run_status),
            RunStatus::Queued,
            actor,
            serde_json::json!({ "queue_order_id": next_order }),
        )?;
        let rec = fetch_scenario(&tx, scenario_id)?;
        tx.commit()?;
        Ok(rec)
    })
}

fn claim_in(conn: &Connection, actor: &str, scenario_id: i64) -> Result<ClaimToken, GridplanError> {
    let rec = fetch_scenario(conn, scenario_id)?;
    match rec.run_status {
        RunStatus::Queued if rec.queue_claim_token.is_none() => {}
        RunStatus::Queued | RunStatus::Running => {
            return Err(GridplanError::ConcurrentClaim(format!(
                "scenario {} is already claimed",
                scenario_id
            )));
        }
        other => {
            return Err(GridplanError::InvalidTransition(format!(
                "scenario {} is {}, only queued scenarios can be claimed",
                scenario_id, other
            )));
        }
    }

    claim_record(conn, actor, &rec)
}

/// Conditional queued → running update against the `rec` snapshot. A version or
/// token change since the snapshot was read loses the claim.
fn claim_record(conn: &Connection, actor: &str, rec: &ScenarioRecord) -> Result<ClaimToken, GridplanError> {
    let scenario_id = rec.scenario_id;
    let token = time::new_claim_token();
    let changed = conn.execute(
        "UPDATE scenarios
         SET run_status = ?1, queue_claim_token = ?2, version = version + 1, updated_at = ?3
         WHERE scenario_id = ?4 AND run_status = ?5 AND queue_claim_token IS NULL AND version = ?6",
        params![
            RunStatus::Running,
            token,
            time::now_epoch_z(),
            scenario_id,
            RunStatus::Queued,
            rec.version
        ],
    )?;
    if changed == 0 {
        return Err(GridplanError::ConcurrentClaim(format!(
            "lost the claim race for scenario {}",
            scenario_id
        )));
    }
    write_event(
        conn,
        scenario_id,
        Some(RunStatus::Queued),
        RunStatus::Running,
        actor,
        serde_json::json!({ "claim_token": token }),
    )?;
    Ok(ClaimToken { scenario_id, token })
}

/// queued → running. Exactly one of any number of concurrent claimers wins.
pub fn claim(root: &Path, actor: &str, scenario_id: i64) -> Result<ClaimToken, GridplanError> {
    let broker = DbBroker::new(root);
    broker.with_conn(&scenarios_db_path(root), actor, None, "scenario.claim", |conn| {
        ensure_schema(conn)?;
        claim_in(conn, actor, scenario_id)
    })
}

/// Claim the oldest queued scenario, if any.
pub fn claim_next(root: &Path, actor: &str) -> Result<Option<ClaimToken>, GridplanError> {
    let broker = DbBroker::new(root);
    broker.with_conn(&scenarios_db_path(root), actor, None, "scenario.claim_next", |conn| {
        ensure_schema(conn)?;
        let next: Option<i64> = conn
            .query_row(
                "SELECT scenario_id FROM scenarios
                 WHERE run_status = ?1 AND queue_claim_token IS NULL
                 ORDER BY queue_order_id ASC LIMIT 1",
                [RunStatus::Queued],
                |row| row.get(0),
            )
            .optional()?;
        match next {
            Some(id) => claim_in(conn, actor, id).map(Some),
            None => Ok(None),
        }
    })
}

/// Record the solver process for a claimed scenario.
pub fn start_run(
    root: &Path,
    actor: &str,
    claim: &ClaimToken,
    process_id: &str,
) -> Result<ScenarioRecord, GridplanError> {
    let broker = DbBroker::new(root);
    broker.with_conn(&scenarios_db_path(root), actor, None, "scenario.start", |conn| {
        ensure_schema(conn)?;
        let rec = fetch_scenario(conn, claim.scenario_id)?;
        check_token(&rec, claim)?;
        if rec.run_process_id.is_some() {
            return Err(GridplanError::InvalidTransition(format!(
                "scenario {} already started",
                claim.scenario_id
            )));
        }
        let ts = time::now_epoch_z();
        let process_id = process_id.to_string();
        guarded_update(
            conn,
            &rec,
            "run_process_id = ?5, run_start_time = ?6",
            &[&process_id, &ts],
        )?;
        write_event(
            conn,
            claim.scenario_id,
            Some(RunStatus::Running),
            RunStatus::Running,
            actor,
            serde_json::json!({ "run_process_id": process_id }),
        )?;
        fetch_scenario(conn, claim.scenario_id)
    })
}

/// running → complete | error.
pub fn finish_run(
    root: &Path,
    actor: &str,
    claim: &ClaimToken,
    outcome: RunOutcome,
) -> Result<ScenarioRecord, GridplanError> {
    let broker = DbBroker::new(root);
    broker.with_conn(&scenarios_db_path(root), actor, None, "scenario.finish", |conn| {
        ensure_schema(conn)?;
        let rec = fetch_scenario(conn, claim.scenario_id)?;
        check_token(&rec, claim)?;
        let to = outcome.status();
        transition(rec.run_status, to)?;
        let ts = time::now_epoch_z();
        guarded_update(conn, &rec, "run_status = ?5, run_end_time = ?6", &[&to, &ts])?;
        write_event(
            conn,
            claim.scenario_id,
            Some(RunStatus::Running),
            to,
            actor,
            serde_json::json!({}),
        )?;
        fetch_scenario(conn, claim.scenario_id)
    })
}

// --- Queries ---

pub fn get_scenario(root: &Path, scenario_id: i64) -> Result<ScenarioRecord, GridplanError> {
    let broker = DbBroker::new(root);
    broker.with_conn(&scenarios_db_path(root), "gridplan", None, "scenario.get", |conn| {
        ensure_schema(conn)?;
        fetch_scenario(conn, scenario_id)
    })
}

pub fn find_scenario_id(root: &Path, scenario_name: &str) -> Result<i64, GridplanError> {
    let broker = DbBroker::new(root);
    broker.with_conn(&scenarios_db_path(root), "gridplan", None, "scenario.find", |conn| {
        ensure_schema(conn)?;
        conn.query_row(
            "SELECT scenario_id FROM scenarios WHERE scenario_name = ?1",
            [scenario_name],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| GridplanError::NotFound(format!("scenario '{}' does not exist", scenario_name)))
    })
}

/// The stored resolution with current lifecycle fields applied.
pub fn load_resolved(root: &Path, scenario_id: i64) -> Result<ResolvedScenario, GridplanError> {
    let broker = DbBroker::new(root);
    broker.with_conn(&scenarios_db_path(root), "gridplan", None, "scenario.load", |conn| {
        ensure_schema(conn)?;
        let rec = fetch_scenario(conn, scenario_id)?;
        let json: String = conn.query_row(
            "SELECT resolved FROM scenarios WHERE scenario_id = ?1",
            [scenario_id],
            |row| row.get(0),
        )?;
        let mut resolved: ResolvedScenario = serde_json::from_str(&json).map_err(|e| {
            GridplanError::ValidationError(format!("corrupt resolution for scenario {}: {}", scenario_id, e))
        })?;
        resolved.scenario_id = Some(rec.scenario_id);
        resolved.validation_status = rec.validation_status;
        resolved.run_status = rec.run_status;
        resolved.queue_claim_token = rec.queue_claim_token;
        resolved.run_process_id = rec.run_process_id;
        resolved.run_start_time = rec.run_start_time;
        resolved.run_end_time = rec.run_end_time;
        Ok(resolved)
    })
}

pub fn list_scenarios(root: &Path, status: Option<RunStatus>) -> Result<Vec<ScenarioRecord>, GridplanError> {
    let broker = DbBroker::new(root);
    broker.with_conn(&scenarios_db_path(root), "gridplan", None, "scenario.list", |conn| {
        ensure_schema(conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM scenarios WHERE (?1 IS NULL OR run_status = ?1) ORDER BY scenario_id",
            SCENARIO_COLUMNS
        ))?;
        let rows = stmt.query_map([status], scenario_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    })
}

/// Every persisted issue for a scenario, oldest validation run first.
pub fn list_issues(root: &Path, scenario_id: i64) -> Result<Vec<IssueRecord>, GridplanError> {
    let broker = DbBroker::new(root);
    broker.with_conn(&scenarios_db_path(root), "gridplan", None, "scenario.issues", |conn| {
        ensure_schema(conn)?;
        fetch_scenario(conn, scenario_id)?;
        let mut stmt = conn.prepare(
            "SELECT event_id, validation_run_id, ts, severity, kind, axis_or_module, description
             FROM validation_issues WHERE scenario_id = ?1 ORDER BY validation_run_id, rowid",
        )?;
        let rows = stmt.query_map([scenario_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (event_id, validation_run_id, ts, severity, kind, axis_or_module, description) = row?;
            let severity = Severity::parse(&severity)
                .ok_or_else(|| GridplanError::ValidationError(format!("unknown severity '{}'", severity)))?;
            let kind = IssueKind::parse(&kind)
                .ok_or_else(|| GridplanError::ValidationError(format!("unknown issue kind '{}'", kind)))?;
            out.push(IssueRecord {
                event_id,
                validation_run_id,
                issue: ValidationIssue {
                    severity,
                    kind,
                    axis_or_module,
                    description,
                    timestamp: ts,
                },
            });
        }
        Ok(out)
    })
}

pub fn list_events(root: &Path, scenario_id: i64) -> Result<Vec<LifecycleEvent>, GridplanError> {
    let broker = DbBroker::new(root);
    broker.with_conn(&scenarios_db_path(root), "gridplan", None, "scenario.events", |conn| {
        ensure_schema(conn)?;
        let mut stmt = conn.prepare(
            "SELECT event_id, scenario_id, ts, from_status, to_status, actor, payload
             FROM scenario_events WHERE scenario_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map([scenario_id], |row| {
            Ok((
                LifecycleEvent {
                    event_id: row.get(0)?,
                    scenario_id: row.get(1)?,
                    ts: row.get(2)?,
                    from_status: row.get(3)?,
                    to_status: row.get(4)?,
                    actor: row.get(5)?,
                    payload: serde_json::Value::Null,
                },
                row.get::<_, String>(6)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (mut event, payload) = row?;
            event.payload = serde_json::from_str(&payload).map_err(|e| {
                GridplanError::ValidationError(format!(
                    "corrupt payload for event {}: {}",
                    event.event_id, e
                ))
            })?;
            out.push(event);
        }
        Ok(out)
    })
}

/// Whether any persisted scenario binds the catalog entry.
pub fn is_entry_bound(root: &Path, category: &str, subscenario_id: i64) -> Result<bool, GridplanError> {
    let broker = DbBroker::new(root);
    broker.with_conn(&scenarios_db_path(root), "gridplan", None, "scenario.bindings", |conn| {
        ensure_schema(conn)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM scenario_bindings WHERE category = ?1 AND subscenario_id = ?2",
            params![category, subscenario_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    })
}
