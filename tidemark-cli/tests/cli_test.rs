//! Command-line behaviour against a SQLite sandbox

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn tidemark(cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("tidemark").unwrap();
    cmd.current_dir(cwd)
        .env_remove("TIDEMARK_DIRECTORY")
        .env_remove("TIDEMARK_TABLE_NAME")
        .env_remove("TIDEMARK_DRIVER")
        .env_remove("TIDEMARK_DATABASE_URL")
        .env_remove("DATABASE_URL")
        .env_remove("RUST_LOG");
    cmd
}

/// A project using a SQLite file inside the sandbox
fn sqlite_project() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let database = temp_dir.path().join("db.sqlite3");
    fs::create_dir_all(temp_dir.path().join("migrations")).unwrap();
    fs::write(
        temp_dir.path().join("tidemark.toml"),
        format!(
            "directory = \"migrations\"\ndriver = \"sqlite3\"\n\n[connection]\npath = '{}'\n",
            database.display()
        ),
    )
    .unwrap();
    temp_dir
}

fn write_step(root: &Path, migration: &str, direction: &str, file: &str, sql: &str) {
    let dir = root.join("migrations").join(migration).join(direction);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(file), sql).unwrap();
}

fn table_migration(root: &Path, migration: &str, table: &str) {
    write_step(
        root,
        migration,
        "up",
        "01_table.sql",
        &format!("CREATE TABLE {} (id INTEGER PRIMARY KEY);", table),
    );
    write_step(
        root,
        migration,
        "down",
        "01_table.sql",
        &format!("DROP TABLE {};", table),
    );
}

#[test]
fn test_init_writes_config_once() {
    let temp_dir = TempDir::new().unwrap();

    tidemark(temp_dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("INFO: Created tidemark.toml"));
    assert!(temp_dir.path().join("tidemark.toml").is_file());

    tidemark(temp_dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_missing_config_is_an_error() {
    let temp_dir = TempDir::new().unwrap();

    tidemark(temp_dir.path())
        .arg("up")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("ERRO:"))
        .stderr(predicate::str::contains("tidemark.toml"));
}

#[test]
fn test_broken_config_prints_error_causes() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("tidemark.toml"), "driver = ").unwrap();

    tidemark(temp_dir.path())
        .arg("current")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ERRO: Cannot load configuration"))
        .stderr(predicate::str::contains("Caused by:"))
        .stderr(predicate::str::contains("1. Invalid configuration"));
}

#[test]
fn test_unknown_driver_exits_with_error() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("tidemark.toml"),
        "driver = \"oracle\"\n\n[connection]\nurl = \"oracle://localhost\"\n",
    )
    .unwrap();

    tidemark(temp_dir.path())
        .arg("update")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown driver \"oracle\""));
}

#[test]
fn test_create_then_step() {
    let project = sqlite_project();

    tidemark(project.path())
        .args(["create", "users"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"INFO: Created \d{8}_\d{6}_users").unwrap());

    tidemark(project.path())
        .args(["step", "users", "table", "index"])
        .assert()
        .success()
        .stdout(predicate::str::contains("01_table.sql"))
        .stdout(predicate::str::contains("02_index.sql"));

    let migration = fs::read_dir(project.path().join("migrations"))
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    assert!(migration.join("up/01_table.sql").is_file());
    assert!(migration.join("down/02_index.sql").is_file());

    // The new migration is pending, so a second one is refused
    tidemark(project.path())
        .args(["create", "posts"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("one new migration at a time"));
}

#[test]
fn test_update_and_rollback_cycle() {
    let project = sqlite_project();
    table_migration(project.path(), "20150101_000000_a", "a");
    table_migration(project.path(), "20150102_000000_b", "b");

    tidemark(project.path())
        .args(["--verbose", "up"])
        .assert()
        .success()
        .stdout(predicate::str::contains("INFO: Applying \"20150101_000000_a\""))
        .stdout(predicate::str::contains("INFO: Applying \"20150102_000000_b\""))
        .stdout(predicate::str::contains(
            "VERB: Running \"20150101_000000_a/up/01_table.sql\"",
        ));

    tidemark(project.path())
        .arg("update")
        .assert()
        .success()
        .stdout(predicate::str::contains("INFO: Everything already up to date"));

    tidemark(project.path())
        .arg("cur")
        .assert()
        .success()
        .stdout(predicate::str::contains("* 20150102_000000_b"))
        .stdout(predicate::str::contains("  Initial state"));

    tidemark(project.path())
        .arg("down")
        .assert()
        .success()
        .stdout(predicate::str::contains("INFO: Rolling back \"20150102_000000_b\""))
        .stdout(predicate::str::contains("20150101_000000_a\"").not());

    tidemark(project.path())
        .args(["rollback", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("INFO: Rolling back \"20150101_000000_a\""));

    tidemark(project.path())
        .arg("down")
        .assert()
        .success()
        .stdout(predicate::str::contains("INFO: Already at the earliest revision"));

    tidemark(project.path())
        .arg("current")
        .assert()
        .success()
        .stdout(predicate::str::contains("* Initial state"));
}

#[test]
fn test_failing_migration_exits_with_error() {
    let project = sqlite_project();
    write_step(
        project.path(),
        "20150101_000000_broken",
        "up",
        "01_broken.sql",
        "INSERT INTO missing_table VALUES (1);",
    );
    write_step(
        project.path(),
        "20150101_000000_broken",
        "down",
        "01_broken.sql",
        "SELECT 1;",
    );

    tidemark(project.path())
        .arg("up")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "ERRO: Query \"20150101_000000_broken/up/01_broken.sql\" failed",
        ));
}

#[test]
fn test_compile_dumps_both_directions() {
    let project = sqlite_project();
    write_step(project.path(), "20150101_000000_users", "up", "01_table.sql", "CREATE TABLE users (id INTEGER);");
    write_step(project.path(), "20150101_000000_users", "up", "02_index.sql", "CREATE INDEX users_id ON users (id);");
    write_step(project.path(), "20150101_000000_users", "down", "01_table.sql", "DROP TABLE users;");
    write_step(project.path(), "20150101_000000_users", "down", "02_index.sql", "DROP INDEX users_id;");

    tidemark(project.path())
        .args(["compile", "users", "--dir", "dist"])
        .assert()
        .success()
        .stdout(predicate::str::contains("INFO: Dumped \"up\""))
        .stdout(predicate::str::contains("INFO: Dumped \"down\""));

    let target = project.path().join("dist/20150101_000000_users");
    let up = fs::read_to_string(target.join("up.sql")).unwrap();
    let down = fs::read_to_string(target.join("down.sql")).unwrap();

    assert!(up.find("CREATE TABLE").unwrap() < up.find("CREATE INDEX").unwrap());
    assert!(down.find("DROP INDEX").unwrap() < down.find("DROP TABLE").unwrap());

    tidemark(project.path())
        .args(["compile", "nothing"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Migration not found"));
}
