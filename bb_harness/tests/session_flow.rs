//! Sweeps and analyze-only sessions, including the rendered reports.

use bb_buffer::StrategyRegistry;
use bb_common::config::{OooTarget, RunConfig, parse_grade_configs};
use bb_harness::report::{SampleScore, StatsReport};
use bb_harness::session::{self, SweepOptions};
use bb_harness::{HarnessError, RunOrchestrator, pattern};
use std::fs;
use std::path::Path;
use std::time::Duration;

fn orchestrator() -> RunOrchestrator {
    let registry = StrategyRegistry::with_builtin();
    RunOrchestrator::new(
        registry.create("yield").unwrap(),
        registry.create("yield").unwrap(),
    )
}

fn options(root: &Path, runs: u32) -> SweepOptions {
    SweepOptions {
        runs,
        input_dir: root.join("input"),
        output_dir: root.join("output"),
        target: OooTarget::new(5.0).unwrap(),
    }
}

#[test]
fn sweep_runs_every_config_and_reports() {
    let dir = tempfile::tempdir().unwrap();
    let configs = parse_grade_configs(
        "# two small configs\nSmall 2 1 4 40 30\n\nWide  1 3 8 60 30\n",
    )
    .unwrap();

    let mut out = Vec::new();
    let registry =
        session::run_configs(&orchestrator(), configs, &options(dir.path(), 2), &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert_eq!(registry.len(), 2);
    for group in registry.groups() {
        assert_eq!(group.runs().len(), 2);
        assert_eq!(group.total().missing.count, 0);
        assert_eq!(group.total().duplicates.count, 0);
        assert_eq!(group.total().killed.count, 0);
    }
    assert_eq!(registry.overall().runs, 4);

    assert!(text.contains("> Small <   (run 1)"));
    assert!(text.contains("> Wide <   (run 2)"));
    assert!(text.contains("Config 'Small' Summary:"));
    assert!(dir.path().join("input/Small_p2_c1_s4_i40.txt").is_file());
    assert!(dir.path().join("output/Wide_p1_c3_s8_i60_r2.txt").is_file());

    let report = session::final_report(&registry, OooTarget::new(5.0).unwrap(), true, "lab");
    assert!(report.contains("Overall Results"));
    assert!(report.contains("Grade of the analyzed test runs in lab"));
    assert!(report.contains("Used Target OOO =  5.00%."));
    assert!(!report.contains("override this target"));

    let score = SampleScore::from_stats(&registry.overall(), 5.0).unwrap();
    assert_eq!(score.available(), 100);
    assert!(score.total() >= 70.0);
}

#[test]
fn duplicate_config_aborts_before_any_run() {
    let dir = tempfile::tempdir().unwrap();
    let timeout = Duration::from_secs(1);
    let configs = vec![
        RunConfig::new("First", 1, 1, 4, 10, timeout),
        RunConfig::new("Second", 1, 1, 4, 10, timeout),
    ];

    let mut out = Vec::new();
    let err = session::run_configs(&orchestrator(), configs, &options(dir.path(), 1), &mut out)
        .unwrap_err();
    assert!(matches!(err, HarnessError::Config(_)));
    assert!(out.is_empty());
    assert!(!dir.path().join("input").exists());
    assert!(!dir.path().join("output").exists());
}

#[test]
fn pending_interrupt_skips_remaining_runs() {
    let dir = tempfile::tempdir().unwrap();
    let configs = vec![RunConfig::new("Skip", 1, 1, 4, 10, Duration::from_secs(5))];
    let orch = orchestrator();
    orch.interrupt_flag()
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let mut out = Vec::new();
    let registry = session::run_configs(&orch, configs, &options(dir.path(), 3), &mut out).unwrap();
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.overall().runs, 0);
}

#[test]
fn analyze_only_groups_logs_by_filename() {
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("output");
    fs::create_dir(&out_dir).unwrap();
    fs::write(out_dir.join("A_p2_c1_s5_i3_r1.txt"), "1\t1\t1\n3\t2\t1\n2\t1\t1\n").unwrap();
    fs::write(out_dir.join("A_p2_c1_s5_i3_r2.txt"), "1\t1\t1\n2\t2\t1\n-1\t-1\t-1\n").unwrap();
    fs::write(out_dir.join("B_p1_c1_s5_i2_r1.txt"), "2\t1\t1\n1\t1\t1\n").unwrap();

    let files = pattern::expand(&format!("{}/*", out_dir.display())).unwrap();
    assert_eq!(files.len(), 3);

    let mut out = Vec::new();
    let target = OooTarget::new(10.0).unwrap();
    let registry =
        session::analyze_files(files, Duration::from_secs(2), target, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert_eq!(registry.len(), 2);
    let names: Vec<_> = registry.groups().map(|g| g.config().name.clone()).collect();
    assert!(names.contains(&"CONFIG-1".to_string()));
    assert!(names.contains(&"CONFIG-2".to_string()));

    let overall = registry.overall();
    assert_eq!(overall.runs, 3);
    assert_eq!(overall.killed.count, 1);
    assert_eq!(overall.missing.count, 1);
    assert!(text.contains("Partial data, run terminated."));

    let json = StatsReport::new(&registry, target.percent()).to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["configs"].as_array().unwrap().len(), 2);
    assert_eq!(value["overall"]["runs"], 3);
}

#[test]
fn unreadable_log_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let present = dir.path().join("C_p1_c1_s2_i1_r1.txt");
    fs::write(&present, "1\t1\t1\n").unwrap();
    let files = vec![present, dir.path().join("C_p1_c1_s2_i1_r2.txt")];

    let mut out = Vec::new();
    let registry = session::analyze_files(
        files,
        Duration::from_secs(2),
        OooTarget::default(),
        &mut out,
    )
    .unwrap();
    assert_eq!(registry.overall().runs, 1);
}

#[test]
fn failed_run_is_skipped_and_sweep_continues() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path(), 2);
    // A directory where the first log should go makes that run fail to start.
    fs::create_dir_all(opts.output_dir.join("Bad_p1_c1_s4_i10_r1.txt")).unwrap();

    let timeout = Duration::from_secs(5);
    let configs = vec![
        RunConfig::new("Bad", 1, 1, 4, 10, timeout),
        RunConfig::new("Good", 2, 1, 4, 20, timeout),
    ];

    let mut out = Vec::new();
    let registry = session::run_configs(&orchestrator(), configs, &opts, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    let runs: Vec<(String, usize)> = registry
        .groups()
        .map(|g| (g.config().name.clone(), g.runs().len()))
        .collect();
    assert!(runs.contains(&("Bad".to_string(), 1)));
    assert!(runs.contains(&("Good".to_string(), 2)));
    assert_eq!(registry.overall().runs, 3);
    assert!(text.contains("Config 'Good' Summary:"));
    assert!(dir.path().join("output/Bad_p1_c1_s4_i10_r2.txt").is_file());
}
