use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use dmeson_pid_syst::config::load_config;
use dmeson_pid_syst::data::loader::load_events;
use dmeson_pid_syst::output::EventCategory;
use dmeson_pid_syst::PidSystTask;

/// Propagate single-track PID systematics to D-meson candidates.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Task configuration (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Event records to process (JSON)
    #[arg(short, long)]
    events: PathBuf,

    /// Output histogram file (JSON)
    #[arg(short, long, default_value = "pid_syst_output.json")]
    output: PathBuf,

    /// Override the calibration file named in the configuration
    #[arg(long)]
    calibration: Option<PathBuf>,
}

fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args.config)?;
    if let Some(path) = args.calibration {
        config.calibration_file = path;
    }

    let mut task = PidSystTask::from_config(config)?;
    let events = load_events(&args.events)?;
    task.process_events(&events);

    let output = task.into_output();
    log::info!(
        "Analysed {} of {} events, {} candidates after PID cuts",
        output.events.get(EventCategory::PassingEventSelection),
        output.events.get(EventCategory::EventsRead),
        output.events.get(EventCategory::AfterPidCuts)
    );
    output.write_json(&args.output)
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
