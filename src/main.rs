// Entrypoint for the lnkshrt CLI.
// - Parses the command line, sets up logging and picks the real settings
//   store and HTTP transport.
// - The flows themselves live in `commands`; failures are rendered here.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lnkshrt_cli::api::{Dispatcher, DEFAULT_TIMEOUT_SECS};
use lnkshrt_cli::commands::{self, Command};
use lnkshrt_cli::config::TomlFileStore;
use lnkshrt_cli::error::ApiError;
use lnkshrt_cli::ui;

#[derive(Parser)]
#[command(name = "lnkshrt", version, about = "Shorten links from the command line", arg_required_else_help = true)]
struct Cli {
    /// Path to the settings file
    #[arg(long, global = true, env = "LNKSHRT_CONFIG")]
    config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "LNKSHRT_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let store = TomlFileStore::new(cli.config.unwrap_or_else(TomlFileStore::default_path));
    let result = Dispatcher::http(Duration::from_secs(cli.timeout))
        .and_then(|dispatcher| commands::execute(cli.command, &store, dispatcher));

    match result {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            match err.downcast_ref::<ApiError>() {
                Some(api_err) => ui::print_error(api_err),
                None => eprintln!("Error: {err:#}"),
            }
            ExitCode::from(commands::exit_code(&err))
        }
    }
}
