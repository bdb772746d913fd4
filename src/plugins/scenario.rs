//! `gridplan scenario`: resolve requests and drive the run lifecycle.

use crate::core::config::EngineConfig;
use crate::core::error::GridplanError;
use crate::core::output::{self, OutputFormat};
use crate::core::report::{Severity, ValidationReport};
use crate::core::store::Store;
use crate::core::time;
use crate::plugins::catalog;
use crate::plugins::composer::ScenarioRequest;
use crate::plugins::lifecycle::{self, ClaimToken, RunOutcome, RunStatus, ScenarioRecord};
use crate::plugins::validation::ValidationEngine;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const MAX_ISSUE_CHARS: usize = 160;

#[derive(Parser, Debug)]
#[clap(name = "scenario", about = "Resolve, validate and run scenarios.")]
pub struct ScenarioCli {
    #[clap(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    #[clap(subcommand)]
    command: ScenarioCommand,
}

#[derive(Args, Debug, Clone)]
pub struct ScenarioSelector {
    /// Scenario id.
    #[clap(long, conflicts_with = "name")]
    id: Option<i64>,
    /// Scenario name.
    #[clap(long)]
    name: Option<String>,
}

impl ScenarioSelector {
    fn scenario_id(&self, root: &Path) -> Result<i64, GridplanError> {
        match (&self.id, &self.name) {
            (Some(id), _) => Ok(*id),
            (None, Some(name)) => lifecycle::find_scenario_id(root, name),
            (None, None) => Err(GridplanError::ValidationError(
                "select a scenario with --id or --name".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutcomeArg {
    Complete,
    Error,
}

impl From<OutcomeArg> for RunOutcome {
    fn from(arg: OutcomeArg) -> Self {
        match arg {
            OutcomeArg::Complete => RunOutcome::Complete,
            OutcomeArg::Error => RunOutcome::Error,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ScenarioCommand {
    /// Resolve and validate a request (JSON file), persisting the result.
    Resolve {
        #[clap(long)]
        request: PathBuf,
    },
    /// Re-validate a stored scenario against the current catalog.
    Validate {
        #[clap(flatten)]
        select: ScenarioSelector,
    },
    /// Queue a valid scenario for execution.
    Enqueue {
        #[clap(flatten)]
        select: ScenarioSelector,
    },
    /// Claim a queued scenario (the oldest one when none is selected).
    Claim {
        #[clap(flatten)]
        select: ScenarioSelector,
    },
    /// Record the solver process for a claimed scenario.
    Start {
        #[clap(long)]
        id: i64,
        #[clap(long)]
        token: String,
        #[clap(long)]
        process_id: String,
    },
    /// Finish a claimed scenario.
    Finish {
        #[clap(long)]
        id: i64,
        #[clap(long)]
        token: String,
        #[clap(long, value_enum)]
        outcome: OutcomeArg,
    },
    /// Show a scenario's lifecycle record and event history.
    Show {
        #[clap(flatten)]
        select: ScenarioSelector,
    },
    /// List the persisted validation issues of a scenario.
    Issues {
        #[clap(flatten)]
        select: ScenarioSelector,
    },
    /// List scenarios, optionally by run status.
    List {
        #[clap(long)]
        status: Option<String>,
    },
    /// Print the temporal plan (operational periods, horizon assignments).
    Plan {
        #[clap(flatten)]
        select: ScenarioSelector,
    },
}

fn engine(store: &Store, config: &EngineConfig) -> Result<ValidationEngine, GridplanError> {
    let catalog = catalog::load_catalog(&store.root)?;
    Ok(ValidationEngine::new(Arc::new(catalog), config))
}

fn print_resolution(record: &ScenarioRecord, report: &ValidationReport) {
    let status = match record.run_status {
        RunStatus::Valid => record.run_status.as_str().bright_green().bold(),
        _ => record.run_status.as_str().bright_red().bold(),
    };
    println!(
        "{} {} (#{}): {}  [{} fatal, {} warning]",
        "scenario".bright_white(),
        record.scenario_name.bright_cyan(),
        record.scenario_id,
        status,
        report.count(Severity::Fatal),
        report.count(Severity::Warning)
    );
    for line in output::render_report(report, MAX_ISSUE_CHARS) {
        println!("{}", line);
    }
}

fn print_record(record: &ScenarioRecord) {
    println!(
        "#{:<5} {:<32} {:<10} {:<8} {}",
        record.scenario_id,
        record.scenario_name,
        record.run_status.as_str(),
        record.validation_status.as_str(),
        record.queue_order_id.map(|q| q.to_string()).unwrap_or_default()
    );
}

pub fn run_scenario_cli(store: &Store, config: &EngineConfig, cli: ScenarioCli) -> Result<(), GridplanError> {
    let root = &store.root;
    let actor = config.engine.actor.as_str();
    let json = cli.format == OutputFormat::Json;

    match cli.command {
        ScenarioCommand::Resolve { request } => {
            let content = fs::read_to_string(&request).map_err(GridplanError::IoError)?;
            let request: ScenarioRequest = serde_json::from_str(&content)
                .map_err(|e| GridplanError::ValidationError(format!("{}: {}", request.display(), e)))?;
            let engine = engine(store, config)?;
            let (mut resolved, report) = engine.resolve_and_validate(&request);
            let record = lifecycle::record_resolution(root, actor, &mut resolved, &report)?;
            if json {
                output::print_json(&time::command_envelope(
                    "scenario.resolve",
                    "ok",
                    serde_json::json!({ "scenario": record, "issues": report.issues() }),
                ))?;
            } else {
                print_resolution(&record, &report);
            }
        }
        ScenarioCommand::Validate { select } => {
            let scenario_id = select.scenario_id(root)?;
            let mut resolved = lifecycle::load_resolved(root, scenario_id)?;
            let engine = engine(store, config)?;
            let (mut fresh, report) = engine.resolve_and_validate(&resolved.request);
            fresh.scenario_id = resolved.scenario_id.take();
            let record = lifecycle::record_resolution(root, actor, &mut fresh, &report)?;
            if json {
                output::print_json(&time::command_envelope(
                    "scenario.validate",
                    "ok",
                    serde_json::json!({ "scenario": record, "issues": report.issues() }),
                ))?;
            } else {
                print_resolution(&record, &report);
            }
        }
        ScenarioCommand::Enqueue { select } => {
            let record = lifecycle::enqueue(root, actor, select.scenario_id(root)?)?;
            if json {
                output::print_json(&time::command_envelope(
                    "scenario.enqueue",
                    "ok",
                    serde_json::json!({ "scenario": record }),
                ))?;
            } else {
                print_record(&record);
            }
        }
        ScenarioCommand::Claim { select } => {
            let claim = match (&select.id, &select.name) {
                (None, None) => lifecycle::claim_next(root, actor)?,
                _ => Some(lifecycle::claim(root, actor, select.scenario_id(root)?)?),
            };
            if json {
                output::print_json(&time::command_envelope(
                    "scenario.claim",
                    if claim.is_some() { "ok" } else { "empty" },
                    serde_json::json!({ "claim": claim }),
                ))?;
            } else {
                match claim {
                    Some(c) => println!("claimed #{} token {}", c.scenario_id, c.token.bright_yellow()),
                    None => println!("queue is empty"),
                }
            }
        }
        ScenarioCommand::Start { id, token, process_id } => {
            let claim = ClaimToken { scenario_id: id, token };
            let record = lifecycle::start_run(root, actor, &claim, &process_id)?;
            if json {
                output::print_json(&time::command_envelope(
                    "scenario.start",
                    "ok",
                    serde_json::json!({ "scenario": record }),
                ))?;
            } else {
                print_record(&record);
            }
        }
        ScenarioCommand::Finish { id, token, outcome } => {
            let claim = ClaimToken { scenario_id: id, token };
            let record = lifecycle::finish_run(root, actor, &claim, outcome.into())?;
            if json {
                output::print_json(&time::command_envelope(
                    "scenario.finish",
                    "ok",
                    serde_json::json!({ "scenario": record }),
                ))?;
            } else {
                print_record(&record);
            }
        }
        ScenarioCommand::Show { select } => {
            let scenario_id = select.scenario_id(root)?;
            let record = lifecycle::get_scenario(root, scenario_id)?;
            let events = lifecycle::list_events(root, scenario_id)?;
            if json {
                output::print_json(&time::command_envelope(
                    "scenario.show",
                    "ok",
                    serde_json::json!({ "scenario": record, "events": events }),
                ))?;
            } else {
                print_record(&record);
                for ev in events {
                    println!(
                        "  {} {} -> {} by {}",
                        ev.ts,
                        ev.from_status.map(|s| s.as_str()).unwrap_or("-"),
                        ev.to_status.as_str().bright_white(),
                        ev.actor
                    );
                }
            }
        }
        ScenarioCommand::Issues { select } => {
            let issues = lifecycle::list_issues(root, select.scenario_id(root)?)?;
            if json {
                output::print_json(&time::command_envelope(
                    "scenario.issues",
                    "ok",
                    serde_json::json!({ "count": issues.len(), "issues": issues }),
                ))?;
            } else {
                let mut current_run = "";
                for rec in &issues {
                    if rec.validation_run_id != current_run {
                        current_run = &rec.validation_run_id;
                        println!("{} {}", "run".bright_white(), current_run);
                    }
                    let report = ValidationReport::from(vec![rec.issue.clone()]);
                    for line in output::render_report(&report, MAX_ISSUE_CHARS) {
                        println!("{}", line);
                    }
                }
            }
        }
        ScenarioCommand::List { status } => {
            let status = match status.as_deref() {
                Some(s) => Some(RunStatus::parse(s).ok_or_else(|| {
                    GridplanError::ValidationError(format!("unknown run status '{}'", s))
                })?),
                None => None,
            };
            let records = lifecycle::list_scenarios(root, status)?;
            if json {
                output::print_json(&time::command_envelope(
                    "scenario.list",
                    "ok",
                    serde_json::json!({ "count": records.len(), "scenarios": records }),
                ))?;
            } else {
                for record in &records {
                    print_record(record);
                }
            }
        }
        ScenarioCommand::Plan { select } => {
            let resolved = lifecycle::load_resolved(root, select.scenario_id(root)?)?;
            let engine = engine(store, config)?;
            let plan = engine.expander().plan(&resolved, engine.composer().catalog())?;
            output::print_json(&plan)?;
        }
    }
    Ok(())
}
