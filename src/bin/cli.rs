use std::path::PathBuf;
use std::process;
use std::rc::Rc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use xavier::error::AppError;
use xavier::listener::DetectorProcess;
use xavier::paths;
use xavier::plugins::home::register_home_commands;
use xavier::plugins::joke::JokePlugin;
use xavier::plugins::weather::WeatherPlugin;
use xavier::runtime::{Runtime, StartMode};
use xavier::settings::{self, Settings};

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(name = "xavier", about = "Voice-activated home automation", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file
    #[arg(long, global = true, default_value = paths::SETTINGS_FILE)]
    settings: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Start listening for commands
    Run {
        /// Read typed commands from the console instead of a hotword detector
        #[arg(long)]
        console: bool,

        /// Hotword detector program; prints one detected model per line
        #[arg(long, default_value = "xavier-detector")]
        detector: PathBuf,

        /// Extra arguments for the detector (after `--`)
        #[arg(last = true)]
        detector_args: Vec<String>,
    },
    /// Print every registered command with its model and sensitivity
    List,
}

// ── Setup ────────────────────────────────────────────────────────

fn build_runtime(settings: &Settings) -> Result<Runtime, AppError> {
    let mut runtime = Runtime::from_settings(settings)?;
    runtime.register_plugin(Rc::new(WeatherPlugin::new(settings.location())?))?;
    runtime.register_plugin(Rc::new(JokePlugin::new()?))?;
    register_home_commands(&mut runtime)?;
    Ok(runtime)
}

fn print_commands(runtime: &Runtime, settings: &Settings) {
    let models_dir = settings.models_dir();
    for entry in runtime.registry().entries() {
        let d = entry.descriptor;
        println!(
            "{:<24} {:<8} {:.2}  {}",
            d.name(),
            format!("{:?}", d.binding_kind()),
            d.sensitivity(),
            paths::model_path(&models_dir, d.name()).display()
        );
    }
}

/// Ctrl-C stops the runtime; its trigger loop then returns and the
/// runtime tears down on drop.
fn install_interrupt_handler(runtime: &Runtime) -> Result<(), AppError> {
    let handle = runtime.stop_handle();
    ctrlc::set_handler(move || handle.stop())
        .map_err(|e| AppError::config(format!("Failed to install interrupt handler: {e}")))
}

fn run(cli: Cli) -> Result<(), AppError> {
    let settings = settings::load_settings(&cli.settings)?;
    let mut runtime = build_runtime(&settings)?;

    match cli.command {
        Commands::List => {
            print_commands(&runtime, &settings);
            Ok(())
        }
        Commands::Run {
            console,
            detector,
            detector_args,
        } => {
            install_interrupt_handler(&runtime)?;
            if console {
                return runtime.start(StartMode::Console);
            }
            let factory = DetectorProcess::new(detector, detector_args);
            runtime.start(StartMode::Listener(&factory))
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
