use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn run_metasync<I, S>(repo: &Path, args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_metasync");
    Command::new(bin)
        .arg("--repo-root")
        .arg(repo)
        .args(args)
        .output()
        .expect("metasync command should execute")
}

fn assert_exit(output: &Output, expected: i32) {
    if output.status.code() != Some(expected) {
        panic!(
            "expected exit {expected}, got {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice::<Value>(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "expected valid JSON stdout, got error: {e}\nstdout:\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("path has a parent")).expect("dirs should be created");
    fs::write(path, text).expect("file should be written");
}

fn write_gappy_repo(root: &Path) {
    write(
        root,
        "docs/guide.meta.yaml",
        "type: doc-spec\ntarget: GUIDE.md\nrequired_sections: [Install]\n",
    );
    write(root, "docs/GUIDE.md", "# Guide\n\n## Install\n");
    write(
        root,
        "core/readme.meta.yaml",
        "type: component-readme\ncomponent: core\nrequired_sections: [Overview]\n",
    );
    write(
        root,
        "core/unit.meta.yaml",
        "type: unit-test-spec\ntarget: tests/core_test.rs\nrequired_behaviors: [loads config]\n",
    );
}

fn write_cyclic_repo(root: &Path) {
    for (id, dep) in [("a", "b"), ("b", "c"), ("c", "a")] {
        write(
            root,
            &format!("{id}/module.meta.yaml"),
            &format!("type: module-meta\nid: {id}\ndepends_on:\n  hard: [{dep}]\n"),
        );
    }
}

#[test]
fn check_reports_gaps_with_exit_one() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_gappy_repo(dir.path());

    let output = run_metasync(dir.path(), ["check", "--json"]);
    assert_exit(&output, 1);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["gap_count"], 2);
    assert_eq!(payload["gaps"][0]["kind"], "missing_doc");
    assert_eq!(payload["gaps"][1]["kind"], "missing_test_file");
    assert!(dir.path().join("meta-gaps.yaml").is_file());
}

#[test]
fn check_on_compliant_repo_exits_zero() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(
        dir.path(),
        "docs/guide.meta.yaml",
        "type: doc-spec\ntarget: GUIDE.md\n",
    );
    write(dir.path(), "docs/GUIDE.md", "# Guide\n");

    let output = run_metasync(dir.path(), ["check"]);
    assert_exit(&output, 0);
    assert!(String::from_utf8_lossy(&output.stdout).contains("Gaps: 0"));
}

#[test]
fn cycle_is_fatal_and_writes_nothing() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_cyclic_repo(dir.path());

    let output = run_metasync(dir.path(), ["check"]);
    assert_exit(&output, 2);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: dependency cycle detected"), "{stderr}");
    assert!(!dir.path().join("meta-gaps.yaml").exists());

    assert_exit(&run_metasync(dir.path(), ["graph"]), 2);
}

#[test]
fn invalid_config_is_fatal() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(dir.path(), "metasync.toml", "[codegen]\nworkers = 0\n");

    let output = run_metasync(dir.path(), ["check"]);
    assert_exit(&output, 2);
    assert!(String::from_utf8_lossy(&output.stderr).contains("codegen.workers"));
}

#[test]
fn generate_then_check_is_clean() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_gappy_repo(dir.path());

    let output = run_metasync(dir.path(), ["generate", "--json"]);
    assert_exit(&output, 0);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["counts_by_state"]["resolved"], 2);
    assert!(dir.path().join("meta-codegen.json").is_file());

    assert_exit(&run_metasync(dir.path(), ["check"]), 0);
}

#[test]
fn dry_run_leaves_the_tree_untouched() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_gappy_repo(dir.path());

    let output = run_metasync(dir.path(), ["generate", "--dry-run"]);
    assert_exit(&output, 1);
    assert!(!dir.path().join("core/README.md").exists());
    assert!(!dir.path().join("meta-codegen.json").exists());
}

#[cfg(unix)]
#[test]
fn ci_propagates_test_runner_exit_code() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(
        dir.path(),
        "docs/guide.meta.yaml",
        "type: doc-spec\ntarget: GUIDE.md\n",
    );
    write(dir.path(), "docs/GUIDE.md", "# Guide\n");

    let output = run_metasync(dir.path(), ["ci", "--", "sh", "-c", "exit 7"]);
    assert_exit(&output, 7);
}

#[test]
fn ci_reports_missing_runner_distinctly() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(
        dir.path(),
        "docs/guide.meta.yaml",
        "type: doc-spec\ntarget: GUIDE.md\n",
    );
    write(dir.path(), "docs/GUIDE.md", "# Guide\n");

    let output = run_metasync(dir.path(), ["ci", "--", "metasync-no-such-runner"]);
    assert_exit(&output, 127);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to start test runner"), "{stderr}");
}

#[cfg(unix)]
#[test]
fn ci_does_not_start_tests_when_gaps_exist() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_gappy_repo(dir.path());

    let output = run_metasync(dir.path(), ["ci", "--", "sh", "-c", "touch ran"]);
    assert_exit(&output, 1);
    assert!(!dir.path().join("ran").exists());
}

#[test]
fn generate_refresh_reports_the_region_merge() {
    let dir = tempfile::tempdir().expect("temp dir");
    write_gappy_repo(dir.path());
    assert_exit(&run_metasync(dir.path(), ["generate"]), 0);

    let output = run_metasync(dir.path(), ["generate", "--refresh", "--json"]);
    assert_exit(&output, 0);
    let payload = parse_json_stdout(&output);
    let outcomes = payload["outcomes"].as_array().expect("outcomes array");
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0]["target_file"], "core/README.md");
    assert_eq!(outcomes[0]["action"], "merge");
    assert_eq!(outcomes[0]["state"], "resolved");
}

#[test]
fn graph_json_lists_batches() {
    let dir = tempfile::tempdir().expect("temp dir");
    write(
        dir.path(),
        "app/module.meta.yaml",
        "type: module-meta\nid: app\ndepends_on:\n  hard: [core]\n",
    );
    write(dir.path(), "core/module.meta.yaml", "type: module-meta\nid: core\n");

    let output = run_metasync(dir.path(), ["graph", "--json"]);
    assert_exit(&output, 0);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["order"], serde_json::json!(["core", "app"]));
    assert_eq!(payload["batches"], serde_json::json!([["core"], ["app"]]));
}

#[test]
fn contracts_json_marks_graph_kinds() {
    let dir = tempfile::tempdir().expect("temp dir");
    let output = run_metasync(dir.path(), ["contracts", "--json"]);
    assert_exit(&output, 0);
    let payload = parse_json_stdout(&output);
    let module = payload
        .as_array()
        .expect("contracts array")
        .iter()
        .find(|row| row["kind"] == "module-meta")
        .expect("module-meta is registered");
    assert_eq!(module["declaresDependencies"], true);
}

#[test]
fn init_writes_default_config_once() {
    let dir = tempfile::tempdir().expect("temp dir");
    assert_exit(&run_metasync(dir.path(), ["init"]), 0);
    let text = fs::read_to_string(dir.path().join("metasync.toml")).expect("config written");
    assert!(text.contains("[codegen]"));
    let refused = run_metasync(dir.path(), ["init"]);
    assert_exit(&refused, 2);
    assert!(String::from_utf8_lossy(&refused.stderr).contains("--force"));
    assert_exit(&run_metasync(dir.path(), ["check"]), 0);
}
