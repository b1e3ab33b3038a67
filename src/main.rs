//! Binary entrypoint for the Waypoint config tool.
//!
//! Commands:
//! - `init` - write a starter `waypoint.toml`
//! - `check` - validate a config file and print the effective teleport settings
//!
//! The teleport engine itself is a library embedded by the host plugin; see
//! `waypoint::teleport`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{error, info};

use waypoint::config::Config;

#[derive(Parser)]
#[command(name = "waypoint")]
#[command(about = "Configuration tool for the Waypoint teleport engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "waypoint.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the configuration file and show effective settings
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => {
            init_logging(&None, cli.verbose);
            if !force && tokio::fs::try_exists(&cli.config).await.unwrap_or(false) {
                error!("{} already exists (use --force to overwrite)", cli.config);
                std::process::exit(1);
            }
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Check => {
            let config = Config::load(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            if let Err(e) = config.validate() {
                error!("{}: {}", cli.config, e);
                std::process::exit(1);
            }
            let tp = &config.teleport;
            println!("request timeout : {}s", tp.request_timeout_secs);
            println!("warmup          : {}s", tp.warmup_secs);
            println!("cooldown        : {}s", tp.cooldown_secs);
            println!("cancel on move  : {}", tp.cancel_on_move);
            println!("safe teleport   : {}", tp.safe_teleport);
            println!("maintenance     : every {}s", tp.maintenance_interval_secs);
            let mut costs: Vec<_> = tp.costs.iter().collect();
            costs.sort();
            for (command, cost) in costs {
                println!("cost {:<10} : {}", command, cost);
            }
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity wins over the configured level
    let configured = config
        .as_ref()
        .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    let level = match verbosity {
        0 => configured,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(level);

    let log_file = config
        .as_ref()
        .and_then(|c| c.logging.file.clone())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    match log_file {
        Some(f) => {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // Mirror to the console only when someone is watching it
            let is_tty = atty::is(atty::Stream::Stdout);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}
