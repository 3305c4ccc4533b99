use metasync_kernel::{Config, GapKind, RunContext};
use metasync_scan::{GapReport, ScanError, analyze, run_check};
use std::fs;
use std::path::Path;

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn three_contract_repo(root: &Path) {
    write(
        root,
        "docs/guide.meta.yaml",
        "type: doc-spec\ntarget: GUIDE.md\nrequired_sections: [Install]\n",
    );
    write(root, "docs/GUIDE.md", "# Guide\n\n## Install\n\nrun it\n");
    write(
        root,
        "core/readme.meta.yaml",
        "type: component-readme\ncomponent: core\nrequired_sections: [Overview, Key components]\n",
    );
    write(
        root,
        "core/unit.meta.yaml",
        "type: unit-test-spec\ntarget: tests/core_test.rs\nrequired_behaviors: [loads config]\n",
    );
}

#[test]
fn compliant_and_missing_contracts_yield_two_gaps() {
    let dir = tempfile::tempdir().unwrap();
    three_contract_repo(dir.path());
    let ctx = RunContext::new(dir.path(), Config::default());

    let outcome = run_check(&ctx).unwrap();
    let gaps = &outcome.report.gaps;
    assert_eq!(gaps.len(), 2);
    assert_eq!(gaps[0].kind, GapKind::MissingDoc);
    assert_eq!(gaps[0].meta_type, "component-readme");
    assert_eq!(gaps[0].target_file, "core/README.md");
    assert_eq!(gaps[1].kind, GapKind::MissingTestFile);
    assert_eq!(gaps[1].meta_type, "unit-test-spec");
    assert_eq!(gaps[1].target_file, "core/tests/core_test.rs");

    let written = GapReport::load(&dir.path().join("meta-gaps.yaml")).unwrap();
    assert_eq!(written, outcome.report);
}

#[test]
fn repeated_checks_write_identical_reports() {
    let dir = tempfile::tempdir().unwrap();
    three_contract_repo(dir.path());
    let ctx = RunContext::new(dir.path(), Config::default());
    let report_path = dir.path().join("meta-gaps.yaml");

    run_check(&ctx).unwrap();
    let first = fs::read(&report_path).unwrap();
    run_check(&ctx).unwrap();
    let second = fs::read(&report_path).unwrap();
    assert_eq!(first, second);
}

#[test]
fn worker_count_never_changes_the_report() {
    let dir = tempfile::tempdir().unwrap();
    three_contract_repo(dir.path());
    for i in 0..12 {
        write(
            dir.path(),
            &format!("mods/m{i:02}/module.meta.yaml"),
            &format!("type: module-meta\nid: m{i:02}\ndocs:\n  readme: README.md\n"),
        );
    }
    let mut serial = Config::default();
    serial.discovery.scan_workers = 1;
    let mut wide = Config::default();
    wide.discovery.scan_workers = 8;

    let a = analyze(&RunContext::new(dir.path(), serial)).unwrap();
    let b = analyze(&RunContext::new(dir.path(), wide)).unwrap();
    assert_eq!(a.report.render().unwrap(), b.report.render().unwrap());
    assert_eq!(a.report.gaps.len(), 14);
}

#[test]
fn module_cycle_is_fatal_and_leaves_report_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "a/module.meta.yaml", "type: module-meta\nid: A\ndepends_on:\n  hard: [B]\n");
    write(root, "b/module.meta.yaml", "type: module-meta\nid: B\ndepends_on:\n  hard: [C]\n");
    write(root, "c/module.meta.yaml", "type: module-meta\nid: C\ndepends_on:\n  hard: [A]\n");
    let ctx = RunContext::new(root, Config::default());

    let err = run_check(&ctx).unwrap_err();
    let ScanError::Cycle(cycle) = &err else {
        panic!("expected cycle, got {err}");
    };
    assert_eq!(cycle.cycle, vec!["A", "B", "C"]);
    assert!(err.is_fatal_graph_error());
    assert!(!root.join("meta-gaps.yaml").exists());

    write(root, "meta-gaps.yaml", "previous\n");
    assert!(run_check(&ctx).is_err());
    assert_eq!(fs::read_to_string(root.join("meta-gaps.yaml")).unwrap(), "previous\n");
}

#[test]
fn graph_problems_join_the_report() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "api/module.meta.yaml",
        "type: module-meta\nid: api\ndepends_on:\n  hard: [store, ghost]\n  soft: [phantom]\n",
    );
    write(root, "store/module.meta.yaml", "type: module-meta\nid: store\n");
    write(root, "copy/module.meta.yaml", "type: module-meta\nid: store\n");
    let ctx = RunContext::new(root, Config::default());

    let outcome = analyze(&ctx).unwrap();
    assert_eq!(outcome.resolution.order, vec!["store", "api"]);
    let problems: Vec<(&str, &str)> = outcome
        .report
        .gaps
        .iter()
        .map(|g| (g.meta_file.as_str(), g.context.problem.as_deref().unwrap_or("")))
        .collect();
    assert_eq!(problems.len(), 2);
    assert_eq!(problems[0].0, "api/module.meta.yaml");
    assert!(problems[0].1.contains("`ghost`"));
    assert_eq!(problems[1].0, "store/module.meta.yaml");
    assert!(problems[1].1.contains("duplicate"));
}

#[test]
fn blank_module_id_is_a_schema_violation() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "blank/module.meta.yaml", "type: module-meta\nid: \"\"\n");
    write(
        root,
        "app/module.meta.yaml",
        "type: module-meta\nid: app\ndepends_on:\n  hard: [\"\"]\n",
    );
    let ctx = RunContext::new(root, Config::default());

    let outcome = analyze(&ctx).unwrap();
    assert_eq!(outcome.resolution.order, vec!["app"]);
    assert_eq!(outcome.report.gaps.len(), 1);
    let gap = &outcome.report.gaps[0];
    assert_eq!(gap.kind, GapKind::SchemaViolation);
    assert_eq!(gap.meta_file, "blank/module.meta.yaml");
    assert!(gap.context.problem.as_deref().unwrap().contains("must not be empty"));
}

#[test]
fn wiring_contract_is_checked_against_catalogs() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "registry/capabilities.yaml", "- fs.read\n");
    write(root, "registry/agents.yaml", "entries:\n  - id: planner\n");
    write(
        root,
        "svc/wiring.meta.yaml",
        "type: wiring-contract\nmodule: svc\ncapabilities: [fs.read, shell.exec]\n\
         agents: [planner]\nrequires_approval: true\napproval_adapter: human\n\
         negative_tests: [tests/deny_test.rs]\n",
    );
    write(root, "svc/tests/deny_test.rs", "#[test]\nfn denies() {}\n");
    let ctx = RunContext::new(root, Config::default());

    let outcome = analyze(&ctx).unwrap();
    assert_eq!(outcome.report.gaps.len(), 1);
    let gap = &outcome.report.gaps[0];
    assert_eq!(gap.kind, GapKind::SchemaViolation);
    assert_eq!(gap.target_file, "registry/capabilities.yaml");
    assert!(gap.context.problem.as_deref().unwrap().contains("shell.exec"));
}

#[test]
fn broken_meta_file_does_not_stop_the_scan() {
    let dir = tempfile::tempdir().unwrap();
    three_contract_repo(dir.path());
    write(dir.path(), "broken/x.meta.yaml", "type: doc-spec\n  bad: [indent\n");
    let ctx = RunContext::new(dir.path(), Config::default());

    let outcome = analyze(&ctx).unwrap();
    assert_eq!(outcome.report.gaps.len(), 3);
    let broken = &outcome.report.gaps[0];
    assert_eq!(broken.meta_file, "broken/x.meta.yaml");
    assert_eq!(broken.kind, GapKind::InvalidMeta);
    assert!(broken.context.error.is_some());
}
