//! AARV simulator entry point: CLI wiring and config-driven scenario runs.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use aarv_sim::config::ScenarioConfig;
use aarv_sim::io::export::export_csv;
use aarv_sim::scenario::run_scenario;
use aarv_sim::sim::types::TargetPolicy;

/// IEEE 1547 volt-var simulator with autonomously adjusting reference voltage.
#[derive(Parser, Debug)]
#[command(name = "aarv-sim", version, about)]
struct Cli {
    /// Load scenario from TOML config file
    #[arg(long, value_name = "PATH", conflicts_with = "preset")]
    scenario: Option<PathBuf>,

    /// Use a built-in preset (step, step_deadband, power_ramp, vsrc_fluctuation)
    #[arg(long, value_name = "NAME")]
    preset: Option<String>,

    /// Override the target policy from the scenario
    #[arg(long, value_enum)]
    policy: Option<TargetPolicy>,

    /// Export step results to CSV
    #[arg(long, value_name = "PATH")]
    telemetry_out: Option<PathBuf>,

    /// Do not print a line per step
    #[arg(long, short)]
    quiet: bool,

    /// Start REST API server after simulation
    #[cfg(feature = "api")]
    #[arg(long)]
    serve: bool,

    /// API server port
    #[cfg(feature = "api")]
    #[arg(long, default_value_t = 3000)]
    port: u16,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    // Load config: --scenario takes priority, then --preset, then the step preset
    let loaded = match (&cli.scenario, &cli.preset) {
        (Some(path), _) => ScenarioConfig::from_toml_file(path),
        (None, Some(name)) => ScenarioConfig::from_preset(name),
        (None, None) => Ok(ScenarioConfig::step()),
    };
    let mut scenario = loaded.unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    if let Some(policy) = cli.policy {
        scenario.simulation.policy = policy;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let run = run_scenario(&scenario).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });

    println!("Scenario: {} (policy {})", run.kind, run.policy);
    println!("{}", run.characteristic);
    for c in &run.corrections {
        println!("Correction: {c}");
    }

    if !cli.quiet {
        for r in &run.results {
            println!("{r}");
        }
    }

    println!("\n{}", run.summary);
    match run.conformance {
        Some(true) => println!("Conformance:           pass"),
        Some(false) => println!("Conformance:           fail"),
        None => {}
    }

    if let Some(ref path) = cli.telemetry_out {
        if let Err(e) = export_csv(&run.results, path) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Telemetry written to {}", path.display());
    }

    #[cfg(feature = "api")]
    if cli.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let state = Arc::new(aarv_sim::api::AppState::from_run(scenario, run));
        let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
        let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });
        if let Err(e) = rt.block_on(aarv_sim::api::serve(state, addr)) {
            eprintln!("error: API server failed: {e}");
            process::exit(1);
        }
    }
}
