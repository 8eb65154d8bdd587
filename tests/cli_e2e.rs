use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn notes(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("servicenotes").unwrap();
    cmd.env("SERVICENOTES_HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("SERVICENOTES_DROPBOX_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

fn add(home: &Path, date: &str, theme: &str, passage: &str) {
    notes(home)
        .args([
            "add",
            "--date",
            date,
            "--theme",
            theme,
            "--passage",
            passage,
            "--notes",
            "Good sermon",
            "--devotional",
            "Reflect daily",
        ])
        .assert()
        .success();
}

fn backup_count(home: &Path) -> usize {
    fs::read_dir(home)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_string_lossy()
                .starts_with("service_notes_backup_")
        })
        .count()
}

#[test]
fn test_add_then_list() {
    let home = tempfile::tempdir().unwrap();
    add(home.path(), "01/01/2024", "Faith", "John 3:16");
    add(home.path(), "07/01/2024", "Hope", "Psalm 23");

    notes(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. 01/01/2024  Faith"))
        .stdout(predicate::str::contains("2. 07/01/2024  Hope"));

    let stored = fs::read_to_string(home.path().join("service_notes.json")).unwrap();
    let records: serde_json::Value = serde_json::from_str(&stored).unwrap();
    assert_eq!(records[1]["serviceNotes"], "Good sermon");
}

#[test]
fn test_empty_store_lists_nothing() {
    let home = tempfile::tempdir().unwrap();
    notes(home.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No records found."));
}

#[test]
fn test_invalid_date_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    notes(home.path())
        .args([
            "add",
            "--date",
            "2024-01-01",
            "--theme",
            "Faith",
            "--passage",
            "John 3:16",
            "--notes",
            "n",
            "--devotional",
            "d",
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: Invalid date format"));

    assert!(!home.path().join("service_notes.json").exists());
}

#[test]
fn test_blank_field_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    notes(home.path())
        .args([
            "add",
            "--theme",
            "   ",
            "--passage",
            "John 3:16",
            "--notes",
            "n",
            "--devotional",
            "d",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("All fields are required"));
}

#[test]
fn test_view_edit_and_delete() {
    let home = tempfile::tempdir().unwrap();
    add(home.path(), "01/01/2024", "Faith", "John 3:16");
    add(home.path(), "07/01/2024", "Hope", "Psalm 23");

    notes(home.path())
        .args(["edit", "2", "--theme", "Grace"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated 2. Grace"));

    notes(home.path())
        .args(["view", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Grace"))
        .stdout(predicate::str::contains("Psalm 23"));

    notes(home.path())
        .args(["rm", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 1. Faith"));

    notes(home.path())
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. 07/01/2024  Grace"))
        .stdout(predicate::str::contains("Faith").not());
}

#[test]
fn test_missing_record_exits_with_error() {
    let home = tempfile::tempdir().unwrap();
    add(home.path(), "01/01/2024", "Faith", "John 3:16");

    notes(home.path())
        .args(["delete", "3"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No record 3 (there is 1 record)"));

    notes(home.path())
        .args(["view", "0"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Record numbers start at 1"));
}

#[test]
fn test_summary() {
    let home = tempfile::tempdir().unwrap();
    add(home.path(), "07/01/2024", "Faith", "John 3:16");
    add(home.path(), "31/12/2023", "Faith", "John 1:1");

    notes(home.path())
        .arg("summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("  John\n    John 3:16\n    John 1:1\n"))
        .stdout(predicate::str::contains("  31/12/2023\n  07/01/2024\n"));
}

#[test]
fn test_every_run_leaves_a_backup() {
    let home = tempfile::tempdir().unwrap();
    add(home.path(), "01/01/2024", "Faith", "John 3:16");
    assert!(backup_count(home.path()) >= 1);

    notes(home.path())
        .arg("backups")
        .assert()
        .success()
        .stdout(predicate::str::contains("service_notes_backup_"));
}

#[test]
fn test_no_backup_before_first_record() {
    let home = tempfile::tempdir().unwrap();
    notes(home.path()).arg("list").assert().success();
    assert_eq!(backup_count(home.path()), 0);
}

#[test]
fn test_restore_from_backup() {
    let home = tempfile::tempdir().unwrap();
    add(home.path(), "01/01/2024", "Faith", "John 3:16");

    let backup = home.path().join("saved.json");
    fs::copy(home.path().join("service_notes.json"), &backup).unwrap();

    add(home.path(), "07/01/2024", "Hope", "Psalm 23");

    notes(home.path())
        .args(["restore", backup.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored 1 records"));

    notes(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Hope").not());

    notes(home.path())
        .args(["restore", "no_such_backup.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Backup not found"));
}

#[test]
fn test_directory_remote_round_trip() {
    let home = tempfile::tempdir().unwrap();
    let cloud = tempfile::tempdir().unwrap();
    fs::write(
        home.path().join("config.json"),
        serde_json::json!({
            "remote": {
                "kind": "directory",
                "root": cloud.path(),
                "path": "/anotacoes.json"
            }
        })
        .to_string(),
    )
    .unwrap();

    add(home.path(), "01/01/2024", "Faith", "John 3:16");
    assert!(cloud.path().join("anotacoes.json").exists());

    // A fresh machine with no local file pulls the remote copy.
    fs::remove_file(home.path().join("service_notes.json")).unwrap();
    notes(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Faith"));

    notes(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("directory:/anotacoes.json"))
        .stdout(predicate::str::contains("synced"));
}

#[test]
fn test_config_shows_defaults() {
    let home = tempfile::tempdir().unwrap();
    notes(home.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("service_notes.json"))
        .stdout(predicate::str::contains("remote              none"));
}

#[cfg(unix)]
#[test]
fn test_terminated_server_leaves_backup_of_last_save() {
    use std::process::{Command as StdCommand, Stdio};
    use std::time::{Duration, Instant};

    let home = tempfile::tempdir().unwrap();
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let mut server = StdCommand::new(assert_cmd::cargo::cargo_bin("servicenotes"))
        .args(["serve", "--bind", &format!("127.0.0.1:{}", port)])
        .env("SERVICENOTES_HOME", home.path())
        .env_remove("SERVICENOTES_DROPBOX_TOKEN")
        .env_remove("RUST_LOG")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let client = reqwest::blocking::Client::new();
    let url = format!("http://127.0.0.1:{}/records", port);
    let body = serde_json::json!({
        "date": "01/01/2024",
        "theme": "Faith",
        "passage": "John 3:16",
        "serviceNotes": "Good sermon",
        "devotional": "Reflect daily"
    });

    let deadline = Instant::now() + Duration::from_secs(20);
    let status = loop {
        match client.post(&url).json(&body).send() {
            Ok(response) => break response.status(),
            Err(_) if Instant::now() < deadline => std::thread::sleep(Duration::from_millis(100)),
            Err(e) => {
                let _ = server.kill();
                panic!("server never answered: {}", e);
            }
        }
    };
    assert_eq!(status.as_u16(), 201);

    let killed = StdCommand::new("kill")
        .args(["-TERM", &server.id().to_string()])
        .status()
        .unwrap();
    assert!(killed.success());

    let deadline = Instant::now() + Duration::from_secs(20);
    let exit = loop {
        if let Some(exit) = server.try_wait().unwrap() {
            break exit;
        }
        if Instant::now() > deadline {
            let _ = server.kill();
            panic!("server did not stop after SIGTERM");
        }
        std::thread::sleep(Duration::from_millis(50));
    };
    assert!(exit.success());

    let backups: Vec<_> = fs::read_dir(home.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("service_notes_backup_")
        })
        .collect();
    assert_eq!(backups.len(), 1);
    assert_eq!(
        fs::read(&backups[0]).unwrap(),
        fs::read(home.path().join("service_notes.json")).unwrap()
    );
}
