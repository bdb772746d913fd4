//! Store registration. Centralizes every database initializer.
//!
//! Adding a new store: append one entry to `SUBSYSTEMS`.

use crate::core::error;
use crate::plugins::{catalog, lifecycle};
use std::path::Path;

pub(crate) struct SubsystemInit {
    pub name: &'static str,
    pub initialize_db: fn(&Path) -> Result<(), error::GridplanError>,
}

/// Initialized sequentially to avoid SQLite contention on first start.
pub(crate) const SUBSYSTEMS: &[SubsystemInit] = &[
    SubsystemInit { name: "catalog", initialize_db: catalog::initialize_catalog_db },
    SubsystemInit { name: "scenarios", initialize_db: lifecycle::initialize_scenarios_db },
];

/// Initialize all store databases, returning the names initialized.
pub(crate) fn initialize_all_dbs(data_root: &Path) -> Result<Vec<&'static str>, error::GridplanError> {
    let mut done = Vec::with_capacity(SUBSYSTEMS.len());
    for sub in SUBSYSTEMS {
        (sub.initialize_db)(data_root)?;
        done.push(sub.name);
    }
    Ok(done)
}
