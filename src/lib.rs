//! gridplan: scenario composition and temporal resolution for capacity-expansion runs.
//!
//! A scenario selects one subscenario (a versioned dataset) for each of many
//! orthogonal modeling axes, under feature flags that make axes conditionally
//! required. gridplan resolves those selections into one consistent
//! configuration, validates what plain relational constraints cannot express,
//! derives every asset's operating periods and horizon memberships, and tracks
//! each scenario through a claimable run queue.
//!
//! # Architecture
//!
//! ## Store
//!
//! State lives under `<project>/.gridplan/`: `config.toml` at the top and the
//! SQLite stores (`catalog.db`, `scenarios.db`) plus `broker.events.jsonl`
//! under `data/`.
//!
//! ## The Thin Waist
//!
//! All store access routes through `DbBroker` for:
//! - Serialization (in-process lock)
//! - Audit logging (`broker.events.jsonl`)
//!
//! ## Components
//!
//! - `catalog`: subscenario registry and the temporal data arena
//! - `flags`, `axes`: static flag, axis and cross-axis rule tables
//! - `composer`: request resolution into a `ResolvedScenario`
//! - `temporal`: operational periods, horizon partitions, boundary semantics
//! - `validation`, `domain`: full validation report
//! - `lifecycle`: scenario store, run state machine and claim queue
//!
//! # Examples
//!
//! ```bash
//! gridplan init
//! gridplan catalog register --category temporal --id 1 --name base --temporal periods.json
//! gridplan scenario resolve --request base_case.json
//! gridplan scenario enqueue --name base_case
//! gridplan scenario claim
//! ```

pub mod core;
pub mod plugins;
mod subsystems;

use crate::core::{
    broker::DbBroker,
    config,
    error,
    output::{self, OutputFormat},
    schemas,
    store::{self, Store},
};
use crate::plugins::{axes, catalog, flags, scenario};

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "gridplan",
    version = env!("CARGO_PKG_VERSION"),
    about = "Scenario composition and temporal resolution engine"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct InitCli {
    /// Directory to initialize (defaults to current working directory).
    #[clap(short, long)]
    dir: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct TableCli {
    #[clap(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(clap::Args, Debug)]
struct AuditCli {
    /// Number of most recent broker events to show.
    #[clap(long, default_value = "20")]
    last: usize,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create `.gridplan/` with a default config and empty stores.
    Init(InitCli),
    /// Subscenario catalog
    Catalog(catalog::CatalogCli),
    /// Print the axis rule table
    Axes(TableCli),
    /// Print feature flags and their implications
    Flags(TableCli),
    /// Scenario resolution and run lifecycle
    Scenario(scenario::ScenarioCli),
    /// Show recent broker audit events
    Audit(AuditCli),
    /// Print the persisted store layout
    Schema,
    /// Print the effective configuration
    Config,
}

fn print_axes(format: OutputFormat) -> Result<(), error::GridplanError> {
    match format {
        OutputFormat::Json => output::print_json(&serde_json::json!({
            "axes": axes::axis_rules(),
            "cross_axis_rules": axes::cross_axis_rules(),
        })),
        OutputFormat::Text => {
            for rule in axes::axis_rules() {
                println!(
                    "{:<58} {:<28} {:<7} {}",
                    rule.axis_name.bright_cyan(),
                    rule.catalog_category,
                    match rule.cardinality {
                        axes::Cardinality::Single => "single",
                        axes::Cardinality::Multi => "multi",
                    },
                    rule.gating_flag.unwrap_or("(always)")
                );
            }
            Ok(())
        }
    }
}

fn print_flags(format: OutputFormat) -> Result<(), error::GridplanError> {
    match format {
        OutputFormat::Json => output::print_json(&serde_json::json!({
            "flags": flags::FLAG_DEFINITIONS,
            "implications": flags::FLAG_IMPLICATIONS,
        })),
        OutputFormat::Text => {
            for def in flags::FLAG_DEFINITIONS {
                let requires: Vec<&str> = flags::FLAG_IMPLICATIONS
                    .iter()
                    .filter(|(flag, _)| *flag == def.name)
                    .map(|(_, required)| *required)
                    .collect();
                println!(
                    "{:<30} {}{}",
                    def.name.bright_cyan(),
                    def.description,
                    if requires.is_empty() {
                        String::new()
                    } else {
                        format!(" (requires {})", requires.join(", ")).bright_yellow().to_string()
                    }
                );
            }
            Ok(())
        }
    }
}

pub fn run() -> Result<(), error::GridplanError> {
    let cli = Cli::parse();
    let current_dir = std::env::current_dir()?;

    match cli.command {
        Command::Init(init) => {
            let project_root = init.dir.unwrap_or(current_dir);
            let wrote_config = config::write_default_config(&project_root)?;
            let store = Store::for_project(&project_root);
            let initialized = subsystems::initialize_all_dbs(&store.root)?;
            println!(
                "{} {}",
                "initialized".bright_green().bold(),
                project_root.join(store::PROJECT_DIR_NAME).display()
            );
            if wrote_config {
                println!("  wrote {}", config::CONFIG_FILE_NAME);
            }
            println!("  stores: {}", initialized.join(", "));
            return Ok(());
        }
        Command::Axes(table) => return print_axes(table.format),
        Command::Flags(table) => return print_flags(table.format),
        Command::Schema => return output::print_json(&schemas::schema()),
        _ => {}
    }

    let project_root = store::find_project_root(&current_dir)?;
    let engine_config = config::load_config(&project_root)?;
    let store = Store::for_project(&project_root);

    match cli.command {
        Command::Catalog(catalog_cli) => {
            catalog::run_catalog_cli(&store, &engine_config.engine.actor, catalog_cli)
        }
        Command::Scenario(scenario_cli) => {
            scenario::run_scenario_cli(&store, &engine_config, scenario_cli)
        }
        Command::Audit(audit) => {
            let events = DbBroker::new(&store.root).recent_events(audit.last)?;
            for ev in events {
                let status = match ev.status.as_str() {
                    "success" => ev.status.as_str().bright_green(),
                    "conflict" => ev.status.as_str().bright_yellow(),
                    _ => ev.status.as_str().bright_red(),
                };
                println!(
                    "{} {:<26} {:<14} {:<12} {}",
                    ev.ts,
                    ev.op,
                    ev.db_id,
                    ev.actor,
                    status
                );
            }
            Ok(())
        }
        Command::Config => {
            print!("{}", engine_config.to_toml()?);
            Ok(())
        }
        Command::Init(_) | Command::Axes(_) | Command::Flags(_) | Command::Schema => Ok(()),
    }
}
