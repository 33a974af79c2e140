use std::process::{Command, Output};

#[derive(Debug)]
struct Summary {
    peak_q_pu: f64,
    q_at_t_ref_pu: Option<f64>,
    final_v_ref_pu: f64,
}

#[test]
fn scenario_files_run_via_cli_and_produce_distinct_dynamics() {
    let step = run_and_parse_summary(&["--scenario", "scenarios/step.toml"]);
    let deadband = run_and_parse_summary(&["--scenario", "scenarios/step_deadband.toml"]);
    let ramp = run_and_parse_summary(&["--scenario", "scenarios/power_ramp.toml"]);
    let fluct = run_and_parse_summary(&["--scenario", "scenarios/vsrc_fluctuation.toml"]);

    assert!(
        (step.peak_q_pu - 0.1174).abs() < 1e-3,
        "unexpected step peak: {step:?}"
    );
    assert!(
        (deadband.peak_q_pu - 0.2083).abs() < 1e-3,
        "unexpected deadband peak: {deadband:?}"
    );
    assert!(deadband.q_at_t_ref_pu.is_some_and(|q| q.abs() < 1e-3));
    assert!(
        ramp.final_v_ref_pu > 1.03,
        "expected the reference to follow the raised POC voltage: {ramp:?}"
    );
    assert!(
        (fluct.peak_q_pu - step.peak_q_pu).abs() > 0.01,
        "expected fluctuation and step peaks to differ: {fluct:?} {step:?}"
    );
}

#[test]
fn presets_match_scenario_files() {
    let from_file = run_and_parse_summary(&["--scenario", "scenarios/step.toml"]);
    let from_preset = run_and_parse_summary(&["--preset", "step"]);
    assert_eq!(from_file.peak_q_pu, from_preset.peak_q_pu);
    assert_eq!(from_file.q_at_t_ref_pu, from_preset.q_at_t_ref_pu);
}

#[test]
fn policy_override_does_not_change_the_result() {
    let offset = run_and_parse_summary(&["--preset", "power_ramp", "--policy", "offset"]);
    let shift = run_and_parse_summary(&["--preset", "power_ramp", "--policy", "table-shift"]);
    assert_eq!(offset.peak_q_pu, shift.peak_q_pu);
    assert_eq!(offset.final_v_ref_pu, shift.final_v_ref_pu);
}

#[test]
fn deadband_file_reports_conformance() {
    let output = run_cli(&["--scenario", "scenarios/step_deadband.toml", "--quiet"]);
    let stdout = String::from_utf8(output.stdout).expect("stdout should be valid UTF-8");
    assert!(stdout.contains("Conformance:           pass"), "{stdout}");
    assert!(stdout.contains("V1"), "breakpoint table missing: {stdout}");
}

#[test]
fn unknown_preset_fails() {
    let output = run_cli(&["--preset", "nonexistent"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown preset"));
}

#[test]
fn scenario_and_preset_are_mutually_exclusive() {
    let output = run_cli(&["--scenario", "scenarios/step.toml", "--preset", "step"]);
    assert!(!output.status.success());
}

#[test]
fn corrections_are_printed() {
    let path = std::env::temp_dir().join(format!("aarv-sim-cli-{}.toml", std::process::id()));
    std::fs::write(&path, "[volt_var]\nv_ref = 1.2\n\n[simulation]\nperiods = 0.1\n").unwrap();
    let output = run_cli(&["--scenario", path.to_str().unwrap(), "--quiet"]);
    std::fs::remove_file(&path).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout should be valid UTF-8");
    assert!(
        stdout.contains("Correction: volt_var.v_ref corrected from 1.2 to 1.05"),
        "{stdout}"
    );
}

fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_aarv-sim"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("aarv-sim process should run")
}

fn run_and_parse_summary(args: &[&str]) -> Summary {
    let mut all = args.to_vec();
    all.push("--quiet");
    let output = run_cli(&all);

    assert!(
        output.status.success(),
        "run failed for {args:?}: stderr={} ",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout).expect("stdout should be valid UTF-8");
    Summary {
        peak_q_pu: parse_metric(&stdout, "Peak Q:").unwrap_or_else(|| panic!("{stdout}")),
        q_at_t_ref_pu: parse_metric(&stdout, "Q(Tref):"),
        final_v_ref_pu: parse_metric(&stdout, "Final Vref:").unwrap_or_else(|| panic!("{stdout}")),
    }
}

/// First number after `label` on its summary line.
fn parse_metric(stdout: &str, label: &str) -> Option<f64> {
    let line = stdout
        .lines()
        .find(|line| line.trim_start().starts_with(label))?;

    let raw = line
        .split_once(':')
        .map(|(_, right)| right.trim())
        .unwrap_or_else(|| panic!("invalid summary format for line `{line}`"));

    let numeric = raw.split_whitespace().next().unwrap_or(raw);
    Some(
        numeric
            .parse::<f64>()
            .unwrap_or_else(|_| panic!("failed parsing `{numeric}` from summary line `{line}`")),
    )
}
