//! Snapshots exported from one session replayed into another

mod common;

use common::{registry, Workspace, JOB_SCRIPT};
use setpoint::analysis::{Number, RunParameters};
use setpoint::snapshot::{self, export_path, SNAPSHOT_FILE};
use setpoint::Session;

#[test]
fn snapshot_restores_earlier_values() {
    let ws = Workspace::new();
    let reg = registry();

    let mut tuned = Session::new();
    tuned.read_all(&reg);
    tuned.set(&reg, "n", "256").unwrap();
    tuned.set(&reg, "zab", "175").unwrap();
    let outcome = tuned.process(&ws.script).unwrap();
    let tuned_text = ws.script_text();

    let path = export_path(ws.path(), "DIANA_a", SNAPSHOT_FILE);
    snapshot::export(&outcome, &path, false).unwrap();

    // move the script somewhere else entirely
    let mut drift = Session::new();
    drift.set(&reg, "n", "32").unwrap();
    drift.set(&reg, "zab", "90").unwrap();
    drift.set(&reg, "NPY", "1").unwrap();
    drift.process(&ws.script).unwrap();
    assert_ne!(ws.script_text(), tuned_text);

    let mut replay = Session::new();
    replay.extend(snapshot::import(&ws.path().join("DIANA_a"), &reg).unwrap());
    replay.process(&ws.script).unwrap();
    assert_eq!(ws.script_text(), tuned_text);
}

#[test]
fn snapshot_of_untouched_script_is_a_no_op() {
    let ws = Workspace::new();
    let reg = registry();
    let mut session = Session::new();
    session.read_all(&reg);
    let outcome = session.inspect(&ws.script).unwrap();

    let path = ws.path().join("baseline.csv");
    snapshot::export(&outcome, &path, false).unwrap();

    let mut replay = Session::new();
    replay.extend(snapshot::import(&path, &reg).unwrap());
    assert!(!replay.to_modify().is_empty());
    assert_eq!(replay.process(&ws.script).unwrap().lines_changed, 0);
    assert_eq!(ws.script_text(), JOB_SCRIPT);
}

#[test]
fn run_parameters_evaluate_exported_snapshot() {
    let ws = Workspace::new();
    let reg = registry();
    let mut session = Session::new();
    session.read_all(&reg);
    session.set(&reg, "nt", "40*200").unwrap();
    let outcome = session.process(&ws.script).unwrap();

    let path = export_path(ws.path(), "DIANA_b", SNAPSHOT_FILE);
    snapshot::export(&outcome, &path, false).unwrap();

    let params = RunParameters::load(&ws.path().join("DIANA_b")).unwrap();
    assert_eq!(params.get("nt").unwrap(), Number::Int(8000));
    assert_eq!(params.get("zab").unwrap(), Number::Float(150.0));
    assert_eq!(params.total_timesteps().unwrap(), Number::Int(8));
    let sizes = params.domain_sizes().unwrap();
    assert_eq!(
        (sizes.x, sizes.y, sizes.z),
        (Number::Int(128), Number::Int(64), Number::Int(51))
    );
}
