mod align;
mod config;
mod logbook;
mod position;
mod session;
mod telemetry;
mod web;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use crate::config::Config;
use crate::logbook::{FileExporter, FileStore, InstallerLog};

#[derive(Parser)]
#[command(name = "satalign")]
#[command(about = "Satellite dish alignment assistant")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    Validate { config: String },
    /// Run the alignment daemon
    Serve { config: String },
    /// Inspect or manage the persisted installer log
    Log {
        #[command(subcommand)]
        command: LogCommands,
    },
}

#[derive(Subcommand)]
enum LogCommands {
    /// Print the persisted entries
    Show { config: String },
    /// Export the log as a JSON document for hand-off
    Export { config: String },
    /// Clear the persisted log
    Reset { config: String },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => validate(&config),
        Commands::Serve { config } => serve(&config),
        Commands::Log { command } => match command {
            LogCommands::Show { config } => log_show(&config),
            LogCommands::Export { config } => log_export(&config),
            LogCommands::Reset { config } => log_reset(&config),
        },
    }
}

fn load_config(path: &str) -> Option<Config> {
    match Config::from_file(path) {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            None
        }
    }
}

fn validate(path: &str) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };

    println!("Configuration is valid");
    println!("  telemetry: {}", config.telemetry.url);
    println!(
        "  poll interval: {}",
        humantime::format_duration(config.telemetry.poll_interval)
    );
    println!(
        "  tolerances: azimuth ±{}°, elevation {}° ±{}°",
        config.tolerances.azimuth_deg,
        config.tolerances.elevation_target_deg,
        config.tolerances.elevation_deg
    );
    match config.station.position() {
        Some(position) => println!(
            "  station: {}, {}",
            position.latitude, position.longitude
        ),
        None => println!("  station: position pushed at runtime"),
    }
    println!("  log storage: {}", config.logbook.storage_file.display());
    println!("  api keys: {}", config.api_keys.len());
    ExitCode::SUCCESS
}

fn serve(path: &str) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(web::run_server(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn open_log(config: &Config) -> InstallerLog {
    let store = FileStore::new(config.logbook.storage_file.clone());
    InstallerLog::load(Box::new(store))
}

fn log_show(path: &str) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };

    let log = open_log(&config);
    println!("{} entries", log.len());
    for (i, entry) in log.entries().iter().enumerate() {
        println!(
            "  {}: {} | {}, {} | heading {}° -> azimuth {}° | {}",
            i + 1,
            entry.timestamp.to_rfc3339(),
            entry.location.latitude,
            entry.location.longitude,
            entry.heading_deg,
            entry.azimuth_deg,
            entry.satellite
        );
    }
    ExitCode::SUCCESS
}

fn log_export(path: &str) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };

    let log = open_log(&config);
    let serialized = match log.export_serialized() {
        Ok(serialized) => serialized,
        Err(e) => {
            eprintln!("Serialization error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let exporter = FileExporter::new(config.logbook.export_folder.clone());
    match exporter.export(&serialized) {
        Ok(exported) => {
            println!("Exported {} entries to {}", log.len(), exported.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Export error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn log_reset(path: &str) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };

    let mut log = open_log(&config);
    let previous = log.len();
    log.reset();
    println!("Cleared {} entries", previous);
    ExitCode::SUCCESS
}
