#[path = "../fixtures/mod.rs"]
mod fixtures;

use gridplan::core::broker::DbBroker;
use gridplan::core::config::EngineConfig;
use gridplan::core::error::GridplanError;
use gridplan::core::report::ValidationStatus;
use gridplan::plugins::axes::LOAD_AXIS;
use gridplan::plugins::composer::{ResolvedScenario, ScenarioRequest};
use gridplan::plugins::lifecycle::{
    self, ClaimToken, RunOutcome, RunStatus, ScenarioRecord, claim, claim_next, enqueue,
    finish_run, record_resolution, start_run,
};
use gridplan::plugins::validation::ValidationEngine;
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::tempdir;

fn engine() -> ValidationEngine {
    ValidationEngine::new(Arc::new(fixtures::catalog()), &EngineConfig::default())
}

fn persist(root: &Path, request: &ScenarioRequest) -> (ResolvedScenario, ScenarioRecord) {
    let (mut resolved, report) = engine().resolve_and_validate(request);
    let record = record_resolution(root, "tester", &mut resolved, &report).unwrap();
    (resolved, record)
}

fn queued(root: &Path, name: &str) -> i64 {
    let (_, record) = persist(root, &fixtures::base_request(name));
    enqueue(root, "tester", record.scenario_id).unwrap();
    record.scenario_id
}

#[test]
fn resolution_assigns_id_and_records_transitions() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    lifecycle::initialize_scenarios_db(root).unwrap();

    let (resolved, record) = persist(root, &fixtures::base_request("first"));
    assert_eq!(resolved.scenario_id, Some(record.scenario_id));
    assert_eq!(record.run_status, RunStatus::Valid);
    assert_eq!(record.validation_status, ValidationStatus::Valid);
    assert_eq!(record.fingerprint, resolved.fingerprint);

    let statuses: Vec<(Option<RunStatus>, RunStatus)> = lifecycle::list_events(root, record.scenario_id)
        .unwrap()
        .iter()
        .map(|e| (e.from_status, e.to_status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            (None, RunStatus::Created),
            (Some(RunStatus::Created), RunStatus::Validating),
            (Some(RunStatus::Validating), RunStatus::Valid),
        ]
    );

    let loaded = lifecycle::load_resolved(root, record.scenario_id).unwrap();
    assert_eq!(loaded, resolved);
}

#[test]
fn reresolution_keeps_id_and_appends_issues() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();

    let (_, first) = persist(root, &fixtures::base_request("evolving").with_ref(LOAD_AXIS, 77));
    assert_eq!(first.run_status, RunStatus::Invalid);
    let first_issues = lifecycle::list_issues(root, first.scenario_id).unwrap();
    assert_eq!(first_issues.len(), 1);

    let (_, second) = persist(root, &fixtures::base_request("evolving").with_ref("weather_scenario_id", 1));
    assert_eq!(second.scenario_id, first.scenario_id);
    assert_eq!(second.run_status, RunStatus::Valid);
    assert!(second.version > first.version);

    let issues = lifecycle::list_issues(root, first.scenario_id).unwrap();
    assert_eq!(issues.len(), 2);
    assert_ne!(issues[0].validation_run_id, issues[1].validation_run_id);
}

#[test]
fn invalid_scenarios_cannot_be_queued() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let (_, record) = persist(root, &ScenarioRequest::new("empty"));
    assert_eq!(record.run_status, RunStatus::Invalid);
    let err = enqueue(root, "tester", record.scenario_id).unwrap_err();
    assert!(matches!(err, GridplanError::InvalidTransition(_)));
}

#[test]
fn queue_order_follows_enqueue_order() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let a = queued(root, "a");
    let b = queued(root, "b");
    let ra = lifecycle::get_scenario(root, a).unwrap();
    let rb = lifecycle::get_scenario(root, b).unwrap();
    assert_eq!(ra.run_status, RunStatus::Queued);
    assert!(ra.queue_order_id < rb.queue_order_id);

    let next = claim_next(root, "runner").unwrap().unwrap();
    assert_eq!(next.scenario_id, a);
    let next = claim_next(root, "runner").unwrap().unwrap();
    assert_eq!(next.scenario_id, b);
    assert!(claim_next(root, "runner").unwrap().is_none());

    let queued_now = lifecycle::list_scenarios(root, Some(RunStatus::Queued)).unwrap();
    assert!(queued_now.is_empty());
    assert_eq!(lifecycle::list_scenarios(root, Some(RunStatus::Running)).unwrap().len(), 2);
}

#[test]
fn reresolution_is_refused_while_queued() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    queued(root, "busy");
    let (mut resolved, report) = engine().resolve_and_validate(&fixtures::base_request("busy"));
    let err = record_resolution(root, "tester", &mut resolved, &report).unwrap_err();
    assert!(matches!(err, GridplanError::InvalidTransition(_)));
}

#[test]
fn concurrent_claims_have_one_winner() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().to_path_buf();
    let id = queued(&root, "race");

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|n| {
            let barrier = Arc::clone(&barrier);
            let root = root.clone();
            thread::spawn(move || {
                barrier.wait();
                claim(&root, &format!("runner-{n}"), id)
            })
        })
        .collect();
    let results: Vec<Result<ClaimToken, GridplanError>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(GridplanError::ConcurrentClaim(_))))
        .count();
    assert_eq!((winners, conflicts), (1, 1));

    let third = claim(&root, "runner-late", id);
    assert!(matches!(third, Err(GridplanError::ConcurrentClaim(_))));

    let record = lifecycle::get_scenario(&root, id).unwrap();
    let winner = results.into_iter().find_map(Result::ok).unwrap();
    assert_eq!(record.run_status, RunStatus::Running);
    assert_eq!(record.queue_claim_token.as_deref(), Some(winner.token.as_str()));

    let conflicts_logged = DbBroker::new(&root)
        .recent_events(50)
        .unwrap()
        .iter()
        .filter(|e| e.op == "scenario.claim" && e.status == "conflict")
        .count();
    assert_eq!(conflicts_logged, 2);
}

#[test]
fn claiming_a_non_queued_scenario_is_an_invalid_transition() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let (_, record) = persist(root, &fixtures::base_request("idle"));
    let err = claim(root, "runner", record.scenario_id).unwrap_err();
    assert!(matches!(err, GridplanError::InvalidTransition(_)));
    assert!(matches!(claim(root, "runner", 999), Err(GridplanError::NotFound(_))));
}

#[test]
fn start_and_finish_require_the_claim_token() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let id = queued(root, "solve");
    let token = claim(root, "runner", id).unwrap();

    let forged = ClaimToken {
        scenario_id: id,
        token: "01J0000000000000000000000".to_string(),
    };
    assert!(matches!(
        start_run(root, "runner", &forged, "pid-1"),
        Err(GridplanError::ConcurrentClaim(_))
    ));

    let started = start_run(root, "runner", &token, "pid-1").unwrap();
    assert_eq!(started.run_process_id.as_deref(), Some("pid-1"));
    assert!(started.run_start_time.is_some());
    assert!(matches!(
        start_run(root, "runner", &token, "pid-2"),
        Err(GridplanError::InvalidTransition(_))
    ));

    assert!(matches!(
        finish_run(root, "runner", &forged, RunOutcome::Complete),
        Err(GridplanError::ConcurrentClaim(_))
    ));
    let finished = finish_run(root, "runner", &token, RunOutcome::Error).unwrap();
    assert_eq!(finished.run_status, RunStatus::Error);
    assert!(finished.run_end_time.is_some());

    assert!(matches!(
        finish_run(root, "runner", &token, RunOutcome::Complete),
        Err(GridplanError::InvalidTransition(_))
    ));
}

#[test]
fn finished_scenarios_can_be_resolved_again() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    let id = queued(root, "rerun");
    let token = claim(root, "runner", id).unwrap();
    finish_run(root, "runner", &token, RunOutcome::Complete).unwrap();

    let (resolved, record) = persist(root, &fixtures::base_request("rerun"));
    assert_eq!(record.scenario_id, id);
    assert_eq!(record.run_status, RunStatus::Valid);
    assert_eq!(record.queue_claim_token, None);
    assert_eq!(record.run_end_time, None);
    assert_eq!(resolved.queue_claim_token, None);

    // The cleared claim lets the scenario go through the queue again.
    enqueue(root, "tester", id).unwrap();
    assert_eq!(claim(root, "runner", id).unwrap().scenario_id, id);
}

#[test]
fn bindings_are_persisted() {
    let tmp = tempdir().unwrap();
    let root = tmp.path();
    persist(root, &fixtures::base_request("bound"));
    assert!(lifecycle::is_entry_bound(root, "load", 1).unwrap());
    assert!(!lifecycle::is_entry_bound(root, "market", 1).unwrap());
}
