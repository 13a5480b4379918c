use std::fs;
use std::process::Command;

const SPEC: &str = r#"
name: Task Tracker
entities:
  - name: Task
    fields:
      - { name: title, type: string, required: true }
      - { name: completed, type: boolean, default: false }
workers:
  - name: digest
    queue: digests
    entity: Task
"#;

fn worldbuilder_gen() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_worldbuilder-gen"));
    command
        .env_remove("WORLDBUILDER_OUTPUT_DIR")
        .env_remove("WORLDBUILDER_PARALLEL")
        .env("WORLDBUILDER_LOG_LEVEL", "error");
    command
}

#[test]
fn test_cli_generate_creates_project_under_slug() {
    let dir = tempfile::tempdir().unwrap();
    let spec = dir.path().join("tracker.yaml");
    fs::write(&spec, SPEC).unwrap();

    let status = worldbuilder_gen()
        .current_dir(dir.path())
        .arg("generate")
        .arg("--spec")
        .arg(&spec)
        .status()
        .expect("run cli");
    assert!(status.success());

    let project = dir.path().join("generated").join("task_tracker");
    assert!(project.join("entities/task.entity.ts").is_file());
    assert!(project.join("workers/digest.worker.ts").is_file());
    assert!(project.join("app.module.ts").is_file());

    let again = worldbuilder_gen()
        .current_dir(dir.path())
        .arg("generate")
        .arg("--spec")
        .arg(&spec)
        .status()
        .expect("run cli");
    assert!(!again.success());
}

#[test]
fn test_cli_dry_run_lists_files() {
    let dir = tempfile::tempdir().unwrap();
    let spec = dir.path().join("tracker.yaml");
    fs::write(&spec, SPEC).unwrap();
    let out = dir.path().join("out");

    let output = worldbuilder_gen()
        .arg("generate")
        .arg("--spec")
        .arg(&spec)
        .arg("--output")
        .arg(&out)
        .arg("--dry-run")
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("services/task.service.ts"));
    assert!(stdout.contains("worldbuilder.manifest.json"));
    assert!(!out.exists());
}

#[test]
fn test_cli_validate_reports_issues() {
    let dir = tempfile::tempdir().unwrap();
    let spec = dir.path().join("broken.yaml");
    fs::write(
        &spec,
        r#"
name: Broken
entities:
  - name: Task
    fields:
      - { name: title, type: text }
    relations:
      - { name: project, target: Project }
"#,
    )
    .unwrap();

    let output = worldbuilder_gen()
        .arg("validate")
        .arg("--spec")
        .arg(&spec)
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("UndefinedRelationTarget"));
    assert!(stderr.contains("UnknownDomainType"));
}
