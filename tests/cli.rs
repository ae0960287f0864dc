use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

fn riptide() -> Command {
    let mut cmd = Command::cargo_bin("riptide").unwrap();
    // keep a developer's own config file out of the tests
    cmd.env_remove("RIPTIDE_CONFIG")
        .env("XDG_CONFIG_HOME", "/nonexistent/riptide-tests");
    cmd
}

#[test]
fn dockerfile_from_directives() {
    let temp = assert_fs::TempDir::new().unwrap();

    riptide()
        .args(["dockerfile", "-o"])
        .arg(temp.path())
        .args([
            "-d", "CMD=npm start",
            "-d", "FROM=node:20",
            "-d", "ENV=NODE_ENV=production",
            "-d", "ENV=PORT=8080",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dockerfile"));

    temp.child("Dockerfile").assert(predicate::str::ends_with(
        "FROM node:20\n\nENV NODE_ENV=production\nENV PORT=8080\n\nCMD [\"npm\", \"start\"]\n\n",
    ));
}

#[test]
fn dockerfile_from_json_on_stdin() {
    riptide()
        .args(["dockerfile", "--dry-run", "--from", "-"])
        .write_stdin(r#"{ "EXPOSE": "8080\n\n9090", "FROM": "nginx", "USER": "" }"#)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("# Generated by Riptide"))
        .stdout(predicate::str::contains("FROM nginx\n\nEXPOSE 8080\nEXPOSE 9090\n\n"))
        .stdout(predicate::str::contains("USER").not());
}

#[test]
fn dockerfile_to_missing_directory_fails() {
    let temp = assert_fs::TempDir::new().unwrap();
    let missing = temp.child("missing");

    riptide()
        .args(["dockerfile", "-d", "FROM=alpine", "-o"])
        .arg(missing.path())
        .assert()
        .failure();

    missing.assert(predicate::path::missing());
}

#[test]
fn dockerfile_rejects_unknown_directive() {
    riptide()
        .args(["dockerfile", "--dry-run", "-d", "MAINTAINER=me"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown directive"));
}

#[test]
fn stackfile_from_yaml_definition() {
    let temp = assert_fs::TempDir::new().unwrap();
    let definition = temp.child("stack.yml");
    definition
        .write_str(
            "services:\n  - name: web\n    image: nginx\nnetworks:\n  - name: frontend\n",
        )
        .unwrap();

    riptide()
        .arg("stackfile")
        .arg(definition.path())
        .args(["--name", "prod.yml", "-o"])
        .arg(temp.path())
        .assert()
        .success();

    temp.child("prod.yml")
        .assert(predicate::str::contains("version: \"3\"\n\nnetworks:\n  frontend:\n\nvolumes:\n\nservices:\n  web:\n    image: nginx\n\n"));
}

#[test]
fn import_stack_prints_entities() {
    let temp = assert_fs::TempDir::new().unwrap();
    let stackfile = temp.child("docker-stack.yml");
    stackfile
        .write_str("version: \"3\"\nvolumes:\n  data:\nservices:\n  db:\n    image: postgres\n")
        .unwrap();

    riptide()
        .arg("import-stack")
        .arg(stackfile.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"data\""))
        .stdout(predicate::str::contains("\"image\": \"postgres\""));
}

#[test]
fn serve_answers_requests() {
    let temp = assert_fs::TempDir::new().unwrap();
    let request = serde_json::json!({
        "channel": "build",
        "data": {
            "type": "dockerfile",
            "destination": temp.path(),
            "payload": { "FROM": "alpine" }
        }
    });

    riptide()
        .arg("serve")
        .write_stdin(format!("{}\n{{\"channel\":\"build\",\"data\":{{\"type\":\"zip\"}}}}\n", request))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"channel\":\"build:rs\""))
        .stdout(predicate::str::contains("\"fileName\":\"Dockerfile\""))
        .stdout(predicate::str::is_match("^[^\n]*\n$").unwrap());

    temp.child("Dockerfile").assert(predicate::str::contains("FROM alpine"));
}

#[test]
fn vagrant_status_without_vagrantfile() {
    let temp = assert_fs::TempDir::new().unwrap();

    riptide()
        .args(["vagrant", "--dir"])
        .arg(temp.path())
        .arg("status")
        .assert()
        .success()
        .stdout("stopped\n");
}

#[test]
fn config_file_changes_output() {
    let temp = assert_fs::TempDir::new().unwrap();
    let config = temp.child("riptide.toml");
    config
        .write_str("[generation]\ndocker_keywords = true\nheader = \"# custom\"\n")
        .unwrap();

    riptide()
        .arg("--config")
        .arg(config.path())
        .args(["dockerfile", "--dry-run", "-d", "ENTRYPOINT=/entry.sh"])
        .assert()
        .success()
        .stdout("# custom\nENTRYPOINT /entry.sh\n\n");
}

#[test]
fn quiet_prints_nothing_on_success() {
    let temp = assert_fs::TempDir::new().unwrap();

    riptide()
        .args(["--quiet", "dockerfile", "-d", "FROM=alpine", "-o"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout("")
        .stderr("");

    temp.child("Dockerfile").assert(predicate::str::contains("FROM alpine"));
}

#[test]
fn quiet_still_reports_failures() {
    let temp = assert_fs::TempDir::new().unwrap();

    riptide()
        .args(["-q", "dockerfile", "-d", "FROM=alpine", "-o"])
        .arg(temp.child("missing").path())
        .assert()
        .failure()
        .stdout("")
        .stderr(predicate::str::contains("Nothing written"));
}
