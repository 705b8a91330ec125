//! End-to-end CLI tests: each test drives the `rungs` binary against an
//! isolated temp directory.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

/// Build a Command targeting the rungs binary, rooted in `dir`.
fn rungs_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("rungs"));
    cmd.current_dir(dir);
    cmd.env_remove("RUNGS_ROOT");
    cmd.env_remove("FORMAT");
    // Keep the developer's own output preference out of the picture.
    cmd.env("XDG_CONFIG_HOME", dir.join(".config"));
    cmd.env("RUNGS_LOG", "error");
    cmd
}

fn init_rep(dir: &Path, user: &str) {
    rungs_cmd(dir)
        .args(["init", user, "--name", "Casey Park"])
        .assert()
        .success();
}

/// Run a command with `--json` and parse its stdout.
fn run_json(dir: &Path, args: &[&str]) -> Value {
    let output = rungs_cmd(dir)
        .args(args)
        .arg("--json")
        .output()
        .expect("command should not crash");
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("--json should produce valid JSON")
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn init_creates_store_and_first_rank() {
    let dir = TempDir::new().expect("tempdir");
    let json = run_json(dir.path(), &["init", "rep-1", "--name", "Casey Park"]);

    assert!(dir.path().join(".rungs/rungs.db").exists());
    assert_eq!(json["progression"]["user_id"], "rep-1");
    assert_eq!(json["progression"]["rank"], "sdr_1");
    assert_eq!(json["progression"]["total_xp"], 0);
    assert_eq!(json["progression"]["current_level"], 1);
    assert_eq!(json["rank_name"], "SDR I");
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().expect("tempdir");
    init_rep(dir.path(), "rep-1");
    let json = run_json(dir.path(), &["init", "rep-1", "--name", "Someone Else"]);
    assert_eq!(json["progression"]["display_name"], "Casey Park");

    let users = run_json(dir.path(), &["users"]);
    assert_eq!(users, serde_json::json!(["rep-1"]));
}

#[test]
fn commands_before_init_report_not_initialized() {
    let dir = TempDir::new().expect("tempdir");
    rungs_cmd(dir.path())
        .args(["show", "rep-1", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E1001"));
    assert!(!dir.path().join(".rungs").exists());
}

#[test]
fn unknown_rep_reports_not_initialized() {
    let dir = TempDir::new().expect("tempdir");
    init_rep(dir.path(), "rep-1");
    rungs_cmd(dir.path())
        .args(["event", "ghost", "dial"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E1001]"))
        .stderr(predicate::str::contains("rungs init"));
}

// ---------------------------------------------------------------------------
// XP and activity
// ---------------------------------------------------------------------------

#[test]
fn events_and_deals_accumulate_xp() {
    let dir = TempDir::new().expect("tempdir");
    init_rep(dir.path(), "rep-1");

    let appointment = run_json(dir.path(), &["event", "rep-1", "appointment"]);
    assert_eq!(appointment["event_type"], "appointment");
    assert_eq!(appointment["xp_earned"], 100);
    assert_eq!(appointment["total_xp"], 100);
    assert_eq!(appointment["new_level"], 2);
    assert_eq!(appointment["leveled_up"], true);
    assert_eq!(appointment["streak_days"], 1);

    let deal = run_json(dir.path(), &["deal", "rep-1"]);
    assert_eq!(deal["xp_earned"], 300);
    assert_eq!(deal["total_xp"], 400);
    assert_eq!(deal["new_level"], 3);
    assert_eq!(deal["closed_deals"], 1);

    let show = run_json(dir.path(), &["show", "rep-1"]);
    assert_eq!(show["progression"]["total_xp"], 400);
    assert_eq!(show["progression"]["closed_deals"], 1);
    assert_eq!(show["level_progress"]["level"], 3);
}

#[test]
fn explicit_amount_and_multipliers_apply() {
    let dir = TempDir::new().expect("tempdir");
    init_rep(dir.path(), "rep-1");

    let json = run_json(
        dir.path(),
        &[
            "event", "rep-1", "backfill", "--amount", "10", "-m", "double_xp=1.5", "-m",
            "weekend=1.2",
        ],
    );
    assert_eq!(json["xp_earned"], 18);

    let log = run_json(dir.path(), &["log", "rep-1", "--kind", "xp"]);
    let rows = log.as_array().expect("xp log is an array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["event_type"], "backfill");
    assert_eq!(rows[0]["xp_amount"], 18);
}

#[test]
fn reserved_or_repeated_multipliers_are_rejected() {
    let dir = TempDir::new().expect("tempdir");
    init_rep(dir.path(), "rep-1");

    for factors in [
        ["-m", "specialization=3", "-m", "weekend=1.2"],
        ["-m", "weekend=1.5", "-m", "weekend=1.2"],
    ] {
        let mut args = vec!["event", "rep-1", "dial"];
        args.extend(factors);
        rungs_cmd(dir.path())
            .args(&args)
            .assert()
            .failure()
            .stderr(predicate::str::contains("E2007"));
    }

    let log = run_json(dir.path(), &["log", "rep-1", "--kind", "xp"]);
    assert_eq!(log, serde_json::json!([]));
}

#[test]
fn maximal_amount_saturates_total_xp() {
    let dir = TempDir::new().expect("tempdir");
    init_rep(dir.path(), "rep-1");

    let max = i64::MAX.to_string();
    let json = run_json(dir.path(), &["event", "rep-1", "backfill", "--amount", &max]);
    assert_eq!(json["total_xp"], i64::MAX);

    let json = run_json(dir.path(), &["event", "rep-1", "dial"]);
    assert_eq!(json["total_xp"], i64::MAX);
}

#[test]
fn unknown_event_without_amount_earns_nothing() {
    let dir = TempDir::new().expect("tempdir");
    init_rep(dir.path(), "rep-1");

    let json = run_json(dir.path(), &["event", "rep-1", "carrier_pigeon"]);
    assert_eq!(json["xp_earned"], 0);
    assert_eq!(json["total_xp"], 0);

    let log = run_json(dir.path(), &["log", "rep-1", "--kind", "xp"]);
    assert_eq!(log, serde_json::json!([]));
}

#[test]
fn calls_feed_efficiency() {
    let dir = TempDir::new().expect("tempdir");
    init_rep(dir.path(), "rep-1");

    for _ in 0..4 {
        run_json(dir.path(), &["event", "rep-1", "connect"]);
    }
    let short = run_json(dir.path(), &["call", "rep-1", "--seconds", "12"]);
    assert_eq!(short["bucket"], "calls_under_30s");
    let mid = run_json(dir.path(), &["call", "rep-1", "--seconds", "60"]);
    assert_eq!(mid["bucket"], Value::Null);

    let report = run_json(dir.path(), &["efficiency", "rep-1"]);
    assert_eq!(report["totals"]["connects"], 4);
    assert_eq!(report["totals"]["calls_under_30s"], 1);
    assert_eq!(report["rates"]["sub_30s_drop_rate"], 0.25);
    assert_eq!(report["is_ramp_period"], true);
}

// ---------------------------------------------------------------------------
// Progression
// ---------------------------------------------------------------------------

#[test]
fn rank_check_lists_missing_requirements() {
    let dir = TempDir::new().expect("tempdir");
    init_rep(dir.path(), "rep-1");

    let json = run_json(dir.path(), &["rank", "check", "rep-1"]);
    assert_eq!(json["eligible"], false);
    assert_eq!(json["next_rank"], "sdr_2");
    let missing: Vec<&str> = json["missing"]
        .as_array()
        .expect("missing is an array")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(missing.contains(&"Reach Level 3 (currently 1)"));

    let promote = run_json(dir.path(), &["rank", "promote", "rep-1"]);
    assert_eq!(promote["promoted"], false);
    assert_eq!(promote["rank"], "sdr_1");
}

#[test]
fn rank_promotion_end_to_end() {
    let dir = TempDir::new().expect("tempdir");
    init_rep(dir.path(), "rep-1");

    run_json(dir.path(), &["deal", "rep-1"]);
    run_json(dir.path(), &["deal", "rep-1"]);
    run_json(dir.path(), &["badge", "add", "rep-1", "opener_elite.bronze"]);
    run_json(dir.path(), &["profile", "module", "rep-1", "module_0"]);
    run_json(dir.path(), &["profile", "module", "rep-1", "module_1"]);

    let wrong = run_json(dir.path(), &["rank", "promote", "rep-1", "--to", "sdr_3"]);
    assert_eq!(wrong["promoted"], false);

    let json = run_json(dir.path(), &["rank", "promote", "rep-1", "--to", "sdr_2"]);
    assert_eq!(json["promoted"], true);
    assert_eq!(json["rank"], "sdr_2");

    let activity = run_json(dir.path(), &["log", "rep-1", "-n", "1"]);
    assert_eq!(activity[0]["action"], "rank_promoted");
    assert_eq!(activity[0]["details"], "Promoted to SDR II");
}

#[test]
fn boss_rewards_are_issued_once() {
    let dir = TempDir::new().expect("tempdir");
    init_rep(dir.path(), "rep-1");

    let status = run_json(dir.path(), &["boss", "status", "rep-1", "redhawk"]);
    assert_eq!(status["unlocked"], false);
    assert_eq!(status["unlock_level"], 12);

    let attempt = run_json(dir.path(), &["boss", "attempt", "rep-1", "redhawk"]);
    assert_eq!(attempt["attempts"], 1);

    let first = run_json(dir.path(), &["boss", "defeat", "rep-1", "redhawk"]);
    assert_eq!(first["outcome"], "rewarded");
    assert_eq!(first["rewards"]["xp"], 1000);
    assert_eq!(first["rewards"]["badge"], "redhawk_slayer.gold");

    let second = run_json(dir.path(), &["boss", "defeat", "rep-1", "redhawk"]);
    assert_eq!(second["outcome"], "already_defeated");

    let show = run_json(dir.path(), &["show", "rep-1"]);
    assert_eq!(show["progression"]["total_xp"], 1000);

    let history = run_json(dir.path(), &["log", "rep-1", "--kind", "boss"]);
    let results: Vec<&str> = history
        .as_array()
        .expect("boss log is an array")
        .iter()
        .filter_map(|row| row["result"].as_str())
        .collect();
    assert_eq!(results, vec!["victory", "defeat"]);
}

#[test]
fn unknown_boss_is_an_error() {
    let dir = TempDir::new().expect("tempdir");
    init_rep(dir.path(), "rep-1");
    rungs_cmd(dir.path())
        .args(["boss", "defeat", "rep-1", "kraken"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2003"));
}

#[test]
fn titles_must_be_earned() {
    let dir = TempDir::new().expect("tempdir");
    init_rep(dir.path(), "rep-1");

    rungs_cmd(dir.path())
        .args(["profile", "title", "rep-1", "RedHawk Conqueror"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2005"));

    run_json(dir.path(), &["boss", "defeat", "rep-1", "redhawk"]);
    let json = run_json(dir.path(), &["profile", "title", "rep-1", "RedHawk Conqueror"]);
    assert_eq!(json["changed"], true);

    let show = run_json(dir.path(), &["show", "rep-1"]);
    assert_eq!(show["progression"]["active_title"], "RedHawk Conqueror");
}

#[test]
fn specialization_requires_unlock_level() {
    let dir = TempDir::new().expect("tempdir");
    init_rep(dir.path(), "rep-1");

    let locked = run_json(dir.path(), &["profile", "spec", "rep-1", "closer"]);
    assert_eq!(locked["changed"], false);
    assert_eq!(locked["reason"], "level too low");

    rungs_cmd(dir.path())
        .args(["profile", "spec", "rep-1", "astrologer"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2004"));
}

#[test]
fn exams_and_modules_are_idempotent() {
    let dir = TempDir::new().expect("tempdir");
    init_rep(dir.path(), "rep-1");

    let first = run_json(dir.path(), &["profile", "exam", "rep-1", "operative_certification"]);
    assert_eq!(first["changed"], true);
    let again = run_json(dir.path(), &["profile", "exam", "rep-1", "operative_certification"]);
    assert_eq!(again["changed"], false);

    let mentee = run_json(dir.path(), &["profile", "mentee", "rep-1"]);
    assert_eq!(mentee["value"], "1");
}

#[test]
fn badge_grant_is_append_only() {
    let dir = TempDir::new().expect("tempdir");
    init_rep(dir.path(), "rep-1");

    let added = run_json(dir.path(), &["badge", "add", "rep-1", "opener_elite.silver"]);
    assert_eq!(added["awarded"], serde_json::json!(["opener_elite.silver"]));
    let repeat = run_json(dir.path(), &["badge", "add", "rep-1", "opener_elite.silver"]);
    assert_eq!(repeat["awarded"], serde_json::json!([]));

    rungs_cmd(dir.path())
        .args(["badge", "add", "rep-1", "opener_elite.diamond"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2006"));
}

// ---------------------------------------------------------------------------
// Output and auxiliary commands
// ---------------------------------------------------------------------------

#[test]
fn text_format_is_key_value() {
    let dir = TempDir::new().expect("tempdir");
    init_rep(dir.path(), "rep-1");
    rungs_cmd(dir.path())
        .args(["show", "rep-1", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("user=rep-1"))
        .stdout(predicate::str::contains("xp=0"));
}

#[test]
fn root_flag_selects_project() {
    let dir = TempDir::new().expect("tempdir");
    let elsewhere = TempDir::new().expect("tempdir");
    rungs_cmd(elsewhere.path())
        .args(["--root"])
        .arg(dir.path())
        .args(["init", "rep-1"])
        .assert()
        .success();
    assert!(dir.path().join(".rungs/rungs.db").exists());
    assert!(!elsewhere.path().join(".rungs").exists());
}

#[test]
fn catalog_lists_without_a_store() {
    let dir = TempDir::new().expect("tempdir");
    let ranks = run_json(dir.path(), &["catalog", "ranks"]);
    assert_eq!(ranks[0]["id"], "sdr_1");

    let levels = run_json(dir.path(), &["catalog", "levels"]);
    assert_eq!(levels[0], 0);
    assert_eq!(levels[2], 250);
    assert!(!dir.path().join(".rungs").exists());
}

#[test]
fn completions_generate_for_bash() {
    let dir = TempDir::new().expect("tempdir");
    rungs_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rungs"));
}
