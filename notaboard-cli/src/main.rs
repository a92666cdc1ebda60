/// Notaboard CLI: config loading, logger setup, store init, subcommand dispatch.
mod commands;
mod config;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};

use crate::commands::{Command, Context};

#[derive(Parser)]
#[command(name = "notaboard")]
#[command(about = "Kanban project board with markdown notes")]
#[command(version)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding the workspace store, overrides the config
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

fn init_logger(default_level: &str, verbose: u8) {
    let level = match verbose {
        0 => default_level,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let config = config::load_config(&config_path);
    init_logger(&config.log_level, cli.verbose);

    let data_dir = cli.data_dir.clone().unwrap_or_else(|| config.data_dir());
    let ctx = Context {
        export_dir: config.export_dir(),
    };

    let result = commands::open_store(&data_dir).and_then(|mut store| {
        let mut stdout = io::stdout().lock();
        commands::run(cli.command, &mut store, &ctx, &mut stdout)
    });
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
