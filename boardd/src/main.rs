/*!
# Board Host

Headless host for the whiteboard and tablet drivers. Loads a TOML
configuration, starts the listed devices and writes every event to stdout as
one JSON object per line. Logging goes to stderr.

## Usage

### Run from a configuration file
```bash
boardd run --config boardd.toml
```

### List driver families, devices and parameters
```bash
boardd devices
```

### Generate a starting configuration
```bash
boardd config --output boardd.toml
```
*/

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use drivers::DriverKind;
use tracing::{info, Level};

mod config;
mod host;

use config::AppConfig;
use host::BoardHost;

#[derive(Parser)]
#[command(name = "boardd")]
#[command(about = "Interactive whiteboard and pen tablet event host")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "boardd.toml")]
    config: PathBuf,

    /// Override the configured log level
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the configured devices and stream events (default)
    Run,

    /// List driver families with their devices and parameters
    Devices,

    /// Generate configuration file
    Config {
        /// Output path for configuration file
        #[arg(short, long, default_value = "boardd.toml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let config = AppConfig::load_from_file(&cli.config).with_context(|| {
                format!(
                    "No usable configuration; create one with `boardd config --output {}`",
                    cli.config.display()
                )
            })?;
            init_logging(cli.log_level.as_deref().unwrap_or(&config.host.log_level));
            run_host(config)
        }

        Commands::Devices => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"));
            list_devices();
            Ok(())
        }

        Commands::Config { output } => {
            init_logging(cli.log_level.as_deref().unwrap_or("info"));
            generate_config_file(output)
        }
    }
}

/// Initialize logging to stderr to keep stdout clean for events
fn init_logging(level: &str) {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
}

fn run_host(config: AppConfig) -> Result<()> {
    info!(
        "Starting {} device(s) across {} driver(s)",
        config.devices.len(),
        config.driver_kinds().len()
    );

    let mut host = BoardHost::new(config);

    // Set up Ctrl+C handler
    let running = host.get_running_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nReceived Ctrl+C, shutting down...");
        running.store(false, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl+C handler")?;

    host.run()?;

    info!("Host stopped");
    Ok(())
}

fn list_devices() {
    for kind in DriverKind::ALL {
        println!("{} ({}) v{}", kind.name(), kind.tag(), kind.version());
        for device in kind.supported_devices() {
            println!("  {}  {}", device.id, device.name);
        }
        println!("  parameters:");
        println!("    {} = 0", shared::protocol::COMMON_DEBUG);
        for param in kind.parameters() {
            println!("    {} = {}", param.key, param.default);
        }
    }
}

/// Generate a default configuration file
fn generate_config_file(output_path: PathBuf) -> Result<()> {
    let config = AppConfig::new();
    config.save_to_file(&output_path)?;

    println!("Generated configuration file: {}", output_path.display());
    println!("Edit the file to list your devices, then run:");
    println!("   boardd run --config {}", output_path.display());

    Ok(())
}
