//! CLI command implementations

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;
use dutycycle_core::{DeviceConfig, Scenario, SimulationConfig, Tick};
use dutycycle_sim::{
    DEFAULT_LOG_CAPACITY, Population, Scheduler, SimulationReport, TransitionEvent, TransitionLog,
};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Simulate a generated population
    Run {
        /// Number of devices
        #[arg(short, long, default_value = "2")]
        devices: u32,
        /// Timeslots per supercycle for every device
        #[arg(long, default_value = "5")]
        tx_freq: u64,
        /// Power-on tick shared by every device but device 0
        #[arg(long, default_value = "500000")]
        late_start: Tick,
        /// Draw power-on ticks at random from this seed instead of staggering
        #[arg(long, requires = "jitter_window")]
        jitter_seed: Option<u64>,
        /// Upper bound of the random power-on window
        #[arg(long, requires = "jitter_seed")]
        jitter_window: Option<Tick>,
        /// Supercycles to run (defaults to DUTYCYCLE_SUPERCYCLES or 1)
        #[arg(short, long)]
        supercycles: Option<u32>,
        /// Ticks a transmission lasts (defaults to DUTYCYCLE_TX_TIME or 2000)
        #[arg(long)]
        tx_time: Option<Tick>,
        /// Disable busy-channel backoff during carrier sense
        #[arg(long)]
        no_backoff: bool,
        #[command(flatten)]
        output: OutputOptions,
    },
    /// Simulate a scenario described in a JSON file
    Scenario {
        /// Path to the scenario file
        path: PathBuf,
        #[command(flatten)]
        output: OutputOptions,
    },
}

/// Report options shared by both commands.
#[derive(clap::Args, Debug, Clone, Copy)]
pub struct OutputOptions {
    /// Print a report after every supercycle
    #[arg(long)]
    pub per_cycle: bool,
    /// Reset device statistics between supercycles
    #[arg(long)]
    pub reset_each_cycle: bool,
    /// Print reports as JSON
    #[arg(long)]
    pub json: bool,
    /// Print every state transition after each report
    #[arg(long)]
    pub trace_transitions: bool,
    /// Most recent transitions kept between reports
    #[arg(long, default_value_t = DEFAULT_LOG_CAPACITY, requires = "trace_transitions")]
    pub trace_capacity: usize,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            per_cycle: false,
            reset_each_cycle: false,
            json: false,
            trace_transitions: false,
            trace_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

/// One printed unit: a report plus the transitions since the previous one.
#[derive(Debug)]
struct RunOutput {
    report: SimulationReport,
    transitions: Option<Vec<TransitionEvent>>,
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run {
            devices,
            tx_freq,
            late_start,
            jitter_seed,
            jitter_window,
            supercycles,
            tx_time,
            no_backoff,
            output,
        } => {
            let mut config = SimulationConfig::from_env();
            if let Some(tx_time) = tx_time {
                config.protocol.tx_time = tx_time;
            }
            if no_backoff {
                config.protocol.busy_channel_backoff = false;
            }
            if let Some(supercycles) = supercycles {
                config.supercycles = supercycles;
            }

            let population = match (jitter_seed, jitter_window) {
                (Some(seed), Some(window)) => Population::jittered(devices, tx_freq, window, seed),
                _ => Population::staggered(devices, tx_freq, late_start),
            };
            run_simulation(config, population.configs(), output)
        }
        Commands::Scenario { path, output } => {
            let (config, devices) = load_scenario(&path)?.into_parts();
            run_simulation(config, &devices, output)
        }
    }
}

/// Reads and validates a JSON scenario file.
///
/// # Errors
/// - File cannot be read
/// - File is not a valid scenario document
/// - Scenario fails validation
pub fn load_scenario(path: &Path) -> anyhow::Result<Scenario> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
    let scenario: Scenario = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse scenario file {}", path.display()))?;
    scenario
        .validate()
        .with_context(|| format!("Invalid scenario {}", path.display()))?;

    tracing::info!(
        path = %path.display(),
        devices = scenario.devices.len(),
        supercycles = scenario.supercycles,
        "Scenario loaded"
    );
    Ok(scenario)
}

/// Runs the configured supercycles and prints reports.
///
/// # Errors
/// - Invalid configuration
/// - Simulation aborted
pub fn run_simulation(
    config: SimulationConfig,
    devices: &[DeviceConfig],
    output: OutputOptions,
) -> anyhow::Result<()> {
    for run in simulate(config, devices, output)? {
        print_report(&run.report, output.json)?;
        if let Some(transitions) = &run.transitions {
            print_transitions(transitions, output.json)?;
        }
    }
    Ok(())
}

/// Runs the simulation and collects the reports to print.
///
/// With `per_cycle` there is one report per supercycle, otherwise a single
/// final report.
fn simulate(
    config: SimulationConfig,
    devices: &[DeviceConfig],
    output: OutputOptions,
) -> anyhow::Result<Vec<RunOutput>> {
    let mut scheduler =
        Scheduler::new(config.protocol, devices).context("Failed to build simulation")?;
    let log = output
        .trace_transitions
        .then(|| TransitionLog::with_capacity(output.trace_capacity));
    if let Some(log) = &log {
        scheduler.add_sink(Box::new(log.clone()));
    }

    let collect = |scheduler: &Scheduler| RunOutput {
        report: scheduler.report(),
        transitions: log.as_ref().map(TransitionLog::drain),
    };
    let mut reports = Vec::new();

    for cycle in 0..config.supercycles {
        if output.reset_each_cycle && cycle > 0 {
            scheduler.reset_statistics();
        }
        scheduler
            .super_cycle()
            .with_context(|| format!("Simulation failed during supercycle {}", cycle + 1))?;

        if output.per_cycle {
            reports.push(collect(&scheduler));
        }
    }

    if !output.per_cycle {
        reports.push(collect(&scheduler));
    }
    Ok(reports)
}

fn print_report(report: &SimulationReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{}", report.summary());
    }
    Ok(())
}

fn print_transitions(transitions: &[TransitionEvent], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(transitions)?);
        return Ok(());
    }

    println!("Transitions ({}):", transitions.len());
    for event in transitions {
        println!("  {:>9} [{}] {} -> {}", event.at, event.device, event.from, event.to);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use dutycycle_core::{DeviceId, ProtocolConfig, SUPERCYCLE_LENGTH};
    use dutycycle_sim::StateKind;
    use tempfile::NamedTempFile;

    use super::*;

    fn scenario_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_scenario_applies_defaults() {
        let file = scenario_file(
            r#"{
                "devices": [
                    { "id": 0, "turn_on_at": 1, "tx_freq": 5 },
                    { "id": 1, "turn_on_at": 500000, "tx_freq": 5 }
                ]
            }"#,
        );

        let scenario = load_scenario(file.path()).unwrap();
        assert_eq!(scenario.protocol, ProtocolConfig::default());
        assert_eq!(scenario.supercycles, 1);
        assert_eq!(scenario.devices[1].id, DeviceId(1));
    }

    #[test]
    fn test_load_scenario_reads_protocol_overrides() {
        let file = scenario_file(
            r#"{
                "protocol": { "tx_time": 1, "busy_channel_backoff": false },
                "supercycles": 3,
                "devices": [{ "id": 4, "turn_on_at": 10, "tx_freq": 7 }]
            }"#,
        );

        let scenario = load_scenario(file.path()).unwrap();
        assert_eq!(scenario.protocol, ProtocolConfig::single_tick());
        assert_eq!(scenario.supercycles, 3);
    }

    #[test]
    fn test_load_scenario_rejects_invalid_documents() {
        let duplicate = scenario_file(
            r#"{ "devices": [
                { "id": 0, "turn_on_at": 1, "tx_freq": 5 },
                { "id": 0, "turn_on_at": 2, "tx_freq": 5 }
            ] }"#,
        );
        let malformed = scenario_file("{ devices: ");
        let empty = scenario_file(r#"{ "devices": [] }"#);

        assert!(load_scenario(duplicate.path()).is_err());
        assert!(load_scenario(malformed.path()).is_err());
        assert!(load_scenario(empty.path()).is_err());
        assert!(load_scenario(Path::new("/nonexistent/scenario.json")).is_err());
    }

    #[test]
    fn test_per_cycle_collects_one_report_per_supercycle() {
        let config = SimulationConfig {
            protocol: ProtocolConfig::single_tick(),
            supercycles: 2,
        };
        let devices = [DeviceConfig::new(0, 1, 5), DeviceConfig::new(1, 500_000, 5)];
        let output = OutputOptions {
            per_cycle: true,
            ..OutputOptions::default()
        };

        let reports = simulate(config, &devices, output).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].report.supercycles, 1);
        assert_eq!(reports[1].report.supercycles, 2);
    }

    #[test]
    fn test_reset_each_cycle_clears_previous_receptions() {
        let config = SimulationConfig {
            protocol: ProtocolConfig::single_tick(),
            supercycles: 2,
        };
        let devices = [DeviceConfig::new(0, 1, 5), DeviceConfig::new(1, 500_000, 5)];
        let kept = simulate(config, &devices, OutputOptions::default()).unwrap();
        let reset = simulate(
            config,
            &devices,
            OutputOptions {
                reset_each_cycle: true,
                ..OutputOptions::default()
            },
        )
        .unwrap();

        let kept_tx = kept[0].report.device(DeviceId(0)).unwrap().statistics.transmitted_ticks;
        let reset_tx = reset[0].report.device(DeviceId(0)).unwrap().statistics.transmitted_ticks;
        assert_eq!(kept_tx, 8);
        assert!(reset_tx < kept_tx);
    }

    #[test]
    fn test_trace_transitions_collects_events_per_report() {
        let config = SimulationConfig {
            protocol: ProtocolConfig::single_tick(),
            supercycles: 2,
        };
        let devices = [DeviceConfig::new(0, 1, 5), DeviceConfig::new(1, 500_000, 5)];
        let output = OutputOptions {
            per_cycle: true,
            trace_transitions: true,
            ..OutputOptions::default()
        };

        let runs = simulate(config, &devices, output).unwrap();
        let first = runs[0].transitions.as_ref().unwrap();
        let second = runs[1].transitions.as_ref().unwrap();

        assert_eq!(first[0].device, DeviceId(0));
        assert_eq!((first[0].from, first[0].to, first[0].at), (StateKind::Off, StateKind::WakingUp, 1));
        assert!(second.iter().all(|event| event.at > SUPERCYCLE_LENGTH));

        let total = runs[1].report.devices.iter().map(|d| d.statistics.transitions).sum::<u64>();
        assert_eq!((first.len() + second.len()) as u64, total);
    }

    #[test]
    fn test_trace_capacity_keeps_latest_events() {
        let config = SimulationConfig {
            protocol: ProtocolConfig::single_tick(),
            supercycles: 1,
        };
        let devices = [DeviceConfig::new(0, 1, 5)];
        let output = OutputOptions {
            trace_transitions: true,
            trace_capacity: 3,
            ..OutputOptions::default()
        };

        let runs = simulate(config, &devices, output).unwrap();
        let transitions = runs[0].transitions.as_ref().unwrap();
        assert_eq!(transitions.len(), 3);
        assert!(transitions.windows(2).all(|pair| pair[0].at <= pair[1].at));
        assert!(transitions[0].at > 1);
    }

    #[test]
    fn test_transitions_absent_unless_requested() {
        let runs = simulate(
            SimulationConfig::default(),
            &[DeviceConfig::new(0, 1, 5)],
            OutputOptions::default(),
        )
        .unwrap();

        assert!(runs[0].transitions.is_none());
    }

    #[test]
    fn test_invalid_population_is_reported() {
        let devices = [DeviceConfig::new(0, 1, 0)];
        let result = simulate(SimulationConfig::default(), &devices, OutputOptions::default());

        assert!(result.is_err());
    }
}
