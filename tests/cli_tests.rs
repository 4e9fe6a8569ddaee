mod common;
use common::{ROSTER_YAML, TestEnv};

use predicates::prelude::*;
use predicates::str::contains;
use rattendance::scanner::payload::encode;
use std::fs;

fn seeded_env() -> TestEnv {
    let env = TestEnv::new();
    env.init();
    let roster = env.home().join("roster.yaml");
    fs::write(&roster, ROSTER_YAML).expect("write roster");
    env.cmd()
        .args(["roster", "import", roster.to_str().expect("utf8 path")])
        .assert()
        .success()
        .stdout(contains("Imported 2 students, 1 events, 2 activities"));
    env
}

/// Point the HTTP client at a port nobody listens on.
fn write_unreachable_config(env: &TestEnv) {
    let port = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        l.local_addr().expect("addr").port()
    };
    let conf = format!(
        "database: {db}\nqueue_database: {queue}\nactor: tester\nserver:\n  endpoint: http://127.0.0.1:{port}\n  timeout_secs: 2\n",
        db = env.db,
        queue = env.queue,
        port = port
    );
    fs::write(env.home().join("rattendance.conf"), conf).expect("write config");
}

#[test]
fn test_init_creates_database() {
    let env = TestEnv::new();
    env.cmd()
        .args(["--test", "init"])
        .assert()
        .success()
        .stdout(contains("Database initialized"));
    assert!(std::path::Path::new(&env.db).exists());
    assert!(std::path::Path::new(&env.queue).exists());
}

#[test]
fn test_roster_list_after_import() {
    let env = seeded_env();
    env.cmd()
        .args(["roster", "list"])
        .assert()
        .success()
        .stdout(contains("Ada Lovelace"))
        .stdout(contains("food-drive"))
        .stdout(contains("packing"));
}

#[test]
fn test_roster_activity_needs_event() {
    let env = TestEnv::new();
    env.init();
    env.cmd()
        .args([
            "roster", "activity", "missing", "a1", "Setup", "--start", "08:00", "--end", "09:00",
        ])
        .assert()
        .failure()
        .stderr(contains("event not found"));
}

#[test]
fn test_qr_encode_then_decode() {
    let env = TestEnv::new();
    let payload = encode("s1", "food-drive").expect("encode");

    env.cmd()
        .args(["qr", "encode", "s1", "food-drive"])
        .assert()
        .success()
        .stdout(contains(payload.as_str()));

    env.cmd()
        .args(["qr", "decode", &payload])
        .assert()
        .success()
        .stdout(contains("Valid badge: student s1 / event food-drive"));

    env.cmd()
        .args(["qr", "decode", "s1|food-drive|00000000"])
        .assert()
        .failure()
        .stderr(contains("checksum mismatch"));
}

#[test]
fn test_check_in_duplicate_and_check_out() {
    let env = seeded_env();

    env.cmd()
        .args(["check-in", "s1", "food-drive", "sorting", "--scanned-by", "op-1"])
        .assert()
        .success()
        .stdout(contains("Ada Lovelace checked in"));

    env.cmd()
        .args(["check-in", "s1", "food-drive", "sorting", "--scanned-by", "op-1"])
        .assert()
        .success()
        .stdout(contains("Already checked in"));

    env.cmd()
        .args(["check-out", "s1", "food-drive", "--scanned-by", "op-1"])
        .assert()
        .success()
        .stdout(contains("Ada Lovelace checked out"));

    env.cmd()
        .args(["check-out", "s1", "food-drive", "--scanned-by", "op-1"])
        .assert()
        .success()
        .stdout(contains("Not checked in"));
}

#[test]
fn test_check_in_unknown_student_fails() {
    let env = seeded_env();
    env.cmd()
        .args(["check-in", "nobody", "food-drive", "sorting"])
        .assert()
        .failure()
        .stderr(contains("student not found: nobody"));
}

#[test]
fn test_summary_and_entries() {
    let env = seeded_env();
    env.cmd()
        .args(["check-in", "s2", "food-drive", "packing"])
        .assert()
        .success();

    env.cmd()
        .args(["summary", "food-drive"])
        .assert()
        .success()
        .stdout(contains("Total       : 1"))
        .stdout(contains("No checkout : 1"));

    env.cmd()
        .args(["entries", "food-drive", "--json"])
        .assert()
        .success()
        .stdout(contains("\"studentId\": \"s2\""));
}

#[test]
fn test_force_checkout_and_change_log() {
    let env = seeded_env();
    env.cmd()
        .args(["check-in", "s1", "food-drive", "sorting"])
        .assert()
        .success()
        .stdout(contains("(entry 1)"));

    let today = chrono::Local::now().date_naive().format("%Y-%m-%d").to_string();
    let at = format!("{} 23:59", today);
    env.cmd()
        .args(["force-checkout", "1", "--at", &at, "--reason", "left without scanning"])
        .assert()
        .success()
        .stdout(contains("Ada Lovelace checked out"));

    env.cmd()
        .args(["force-checkout", "1", "--at", &at, "--reason", "again"])
        .assert()
        .success()
        .stdout(contains("left unchanged: Already checked out"));

    env.cmd()
        .args(["entries", "--changes", "1"])
        .assert()
        .success()
        .stdout(contains("force_checkout"))
        .stdout(contains("left without scanning"))
        .stdout(contains("again").not());
}

#[test]
fn test_force_all_without_reason() {
    let env = seeded_env();
    env.cmd()
        .args(["check-in", "s2", "food-drive", "packing"])
        .assert()
        .success();

    env.cmd()
        .args(["force-all", "food-drive"])
        .assert()
        .success()
        .stdout(contains("1 open entries closed for food-drive"));

    env.cmd()
        .args(["entries", "--changes", "1"])
        .assert()
        .success()
        .stdout(contains("end of day"));
}

#[test]
fn test_scan_reads_badges_from_stdin() {
    let env = seeded_env();
    let badge = encode("s2", "food-drive").expect("encode");
    let input = format!("\n{}\nnot-a-badge\n", badge);

    env.cmd()
        .args(["scan", "--mode", "in", "--activity", "sorting"])
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("Grace Hopper checked in"))
        .stdout(contains("invalid QR code"));
}

#[test]
fn test_remote_check_in_is_queued_when_unreachable() {
    let env = seeded_env();
    write_unreachable_config(&env);

    env.cmd()
        .args(["check-in", "s1", "food-drive", "sorting", "--remote"])
        .assert()
        .success()
        .stdout(contains("saved offline"));

    env.cmd()
        .args(["queue", "--list"])
        .assert()
        .success()
        .stdout(contains("1 check-ins, 0 check-outs (1 total)"))
        .stdout(contains("s1"));

    env.cmd()
        .args(["sync"])
        .assert()
        .success()
        .stdout(contains("unreachable"));

    env.cmd()
        .args(["queue", "--clear", "all"])
        .assert()
        .success()
        .stdout(contains("(0 total)"));
}

#[test]
fn test_sync_with_empty_queue() {
    let env = TestEnv::new();
    env.init();
    env.cmd()
        .args(["sync"])
        .assert()
        .success()
        .stdout(contains("Nothing to sync"));
}

#[test]
fn test_db_info_and_log() {
    let env = seeded_env();
    env.cmd().args(["db", "--info"]).assert().success();
    env.cmd()
        .args(["log", "--print"])
        .assert()
        .success()
        .stdout(contains("roster"));
}
