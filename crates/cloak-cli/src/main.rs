//! `cloak-demo`: walks through the library's cloaking variables.
//!
//! Each subcommand binds a wrapper in a fresh module namespace and then
//! LOADs and STOREs the name the way a program would:
//! - `history` - a variable that remembers and rolls back its values
//! - `file` - a variable mirrored to a JSON file
//! - `context` - context variables isolated per context
//! - `constant` - a name that refuses reassignment
//! - `property` - clamped fields behind computed properties
//! - `lazy` - array additions deferred until the sum is read
//! - `all` - every demo in order

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use cloak::Config;
use cloak_log::{error, Level};

#[derive(Parser)]
#[command(name = "cloak-demo")]
#[command(about = "Demonstrations of namespace binding interception")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace); overrides CLOAK_LOG
    #[arg(long, global = true)]
    log_level: Option<Level>,

    /// Disable the reentrancy guard on hooks
    #[arg(long, global = true)]
    no_guard: bool,

    /// Backing file of the file demo (defaults to a file in the temp directory)
    #[arg(long, global = true)]
    file_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// A variable with history
    History,

    /// A variable that syncs to disk
    File,

    /// Context variables
    Context,

    /// Constants
    Constant,

    /// Instance properties that clamp their fields
    Property,

    /// Deferred array additions
    Lazy {
        /// Number of arrays to add
        #[arg(long, default_value = "6")]
        arrays: usize,

        /// Elements per array
        #[arg(long, default_value = "201")]
        length: usize,
    },

    /// Every demo in order
    All,
}

fn config(cli: &Cli) -> cloak::Result<Config> {
    let mut config = Config::from_env()?;
    if let Some(level) = cli.log_level {
        config = config.with_log_level(level);
    }
    if cli.no_guard {
        config = config.with_reentrancy_guard(false);
    }
    Ok(config)
}

fn run(cli: &Cli) -> cloak::Result<()> {
    let config = config(cli)?;
    config.apply_logging();

    match &cli.command {
        Commands::History => commands::history(&config),
        Commands::File => commands::file(&config, cli.file_path.clone()),
        Commands::Context => commands::context(&config),
        Commands::Constant => commands::constant(&config),
        Commands::Property => commands::property(&config),
        Commands::Lazy { arrays, length } => commands::lazy(&config, *arrays, *length),
        Commands::All => {
            commands::history(&config)?;
            commands::file(&config, cli.file_path.clone())?;
            commands::context(&config)?;
            commands::constant(&config)?;
            commands::property(&config)?;
            commands::lazy(&config, 6, 201)
        }
    }
}

fn main() -> ExitCode {
    if let Err(err) = cloak_log::init_from_env(cloak::config::ENV_LOG) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
