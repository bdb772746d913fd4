use crate::core::db;
use crate::core::error;
use crate::core::time;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const AUDIT_LOG_NAME: &str = "broker.events.jsonl";

/// The DB Broker is the single entry point for store access.
/// Requests are serialized in-process and every operation is appended to the audit log.
pub struct DbBroker {
    audit_log_path: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BrokerEvent {
    pub ts: String,
    pub event_id: String,
    pub actor: String,
    pub intent_ref: Option<String>,
    pub op: String,
    pub db_id: String,
    pub status: String,
}

impl DbBroker {
    pub fn new(root: &Path) -> Self {
        Self {
            audit_log_path: root.join(AUDIT_LOG_NAME),
        }
    }

    /// Execute a closure with a serialized connection to the specified DB.
    ///
    /// Closures must not call back into the broker: the lock is not reentrant.
    pub fn with_conn<F, R>(
        &self,
        db_path: &Path,
        actor: &str,
        intent_ref: Option<&str>,
        op_name: &str,
        f: F,
    ) -> Result<R, error::GridplanError>
    where
        F: FnOnce(&Connection) -> Result<R, error::GridplanError>,
    {
        static DB_LOCK: Mutex<()> = Mutex::new(());
        let _lock = DB_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let db_id = db_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let conn = db::db_connect(&db_path.to_string_lossy())?;

        let result = f(&conn);

        let status = match &result {
            Ok(_) => "success",
            Err(error::GridplanError::ConcurrentClaim(_)) => "conflict",
            Err(_) => "error",
        };
        self.log_event(actor, intent_ref, op_name, &db_id, status)?;

        result
    }

    fn log_event(
        &self,
        actor: &str,
        intent_ref: Option<&str>,
        op: &str,
        db_id: &str,
        status: &str,
    ) -> Result<(), error::GridplanError> {
        use std::fs::OpenOptions;
        use std::io::Write;

        let ev = BrokerEvent {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            actor: actor.to_string(),
            intent_ref: intent_ref.map(|s| s.to_string()),
            op: op.to_string(),
            db_id: db_id.to_string(),
            status: status.to_string(),
        };
        let line = serde_json::to_string(&ev)
            .map_err(|e| error::GridplanError::ValidationError(e.to_string()))?;

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_log_path)
            .map_err(error::GridplanError::IoError)?;

        writeln!(f, "{}", line).map_err(error::GridplanError::IoError)?;
        Ok(())
    }

    /// Returns the last `n` audit events, oldest first. Unparseable lines are skipped.
    pub fn recent_events(&self, n: usize) -> Result<Vec<BrokerEvent>, error::GridplanError> {
        if !self.audit_log_path.exists() {
            return Ok(vec![]);
        }
        let content =
            std::fs::read_to_string(&self.audit_log_path).map_err(error::GridplanError::IoError)?;
        let events: Vec<BrokerEvent> = content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        let start = events.len().saturating_sub(n);
        Ok(events[start..].to_vec())
    }
}
