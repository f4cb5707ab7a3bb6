use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod loader;

/// Cairn pack resolver.
///
/// Discovers content and resource packs, checks their dependencies and
/// asset references, and compiles every pack that resolves.
///
/// EXAMPLES:
///     cairn resolve                          Resolve packs below the current directory
///     cairn resolve packs/ --lock cairn.lock Resolve and write a lockfile
///     cairn inspect --pack core:base@1.0.0   Show one compiled pack
///     cairn verify --lock cairn.lock         Check a lockfile is current
///
/// ENVIRONMENT VARIABLES:
///     CAIRN_ROOTS       Pack roots, separated like PATH
///     CAIRN_LOCKFILE    Default lockfile for 'verify'
///     CAIRN_JSON        Set to '1' for JSON output by default
///     CAIRN_LOG         Log filter (e.g. 'debug', 'cairn_pack=debug')
///     NO_COLOR          Set to disable colored output
#[derive(Parser)]
#[command(name = "cairn")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Log resolution progress to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and compile every pack
    ///
    /// Each root may contain `resources/` and `content/` directories with
    /// one subdirectory per pack.
    ///
    /// EXAMPLES:
    ///     cairn resolve                      Use configured roots
    ///     cairn resolve packs/ mods/         Resolve two roots together
    ///     cairn resolve --strict             Fail on any problem
    ///     cairn resolve --json               Machine-readable summary
    #[command(visible_alias = "r")]
    Resolve {
        /// Pack roots (default: configured roots, or '.')
        roots: Vec<PathBuf>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
        /// Write a lockfile for the compiled packs
        #[arg(long, value_name = "FILE")]
        lock: Option<PathBuf>,
        /// Exit with an error if anything failed to load or resolve
        #[arg(long)]
        strict: bool,
    },

    /// Show a compiled pack
    ///
    /// EXAMPLES:
    ///     cairn inspect --pack core:base@1.0.0
    ///     cairn inspect packs/ --pack mod:extra@1.2.0 --json
    #[command(visible_alias = "i")]
    Inspect {
        /// Pack roots (default: configured roots, or '.')
        roots: Vec<PathBuf>,
        /// Versioned pack identifier
        #[arg(long, value_name = "ID")]
        pack: String,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Check whether chosen packs provide a pack's missing assets
    ///
    /// Exits with an error while any missing asset is left unprovided.
    ///
    /// EXAMPLES:
    ///     cairn missing --pack mod:extra@1.0.0 --with core:base@1.0.0
    Missing {
        /// Pack roots (default: configured roots, or '.')
        roots: Vec<PathBuf>,
        /// Versioned pack identifier
        #[arg(long, value_name = "ID")]
        pack: String,
        /// Packs expected to provide the missing assets
        #[arg(long, value_name = "ID", required = true)]
        with: Vec<String>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Compare a lockfile with a fresh resolution
    ///
    /// Exits with an error when any pack was added, removed or changed.
    ///
    /// EXAMPLES:
    ///     cairn verify --lock cairn.lock
    Verify {
        /// Pack roots (default: configured roots, or '.')
        roots: Vec<PathBuf>,
        /// Lockfile to check (default: CAIRN_LOCKFILE or the configured lockfile)
        #[arg(long, value_name = "FILE")]
        lock: Option<PathBuf>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("CAIRN_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let config = config::Config::load(&cwd)?;
    if !config.color {
        colored::control::set_override(false);
    }

    match cli.command {
        Commands::Resolve {
            roots,
            json,
            lock,
            strict,
        } => {
            let config = config.with_flags(roots, json);
            commands::resolve::run(commands::resolve::ResolveArgs {
                roots: config.roots,
                json: config.json,
                lock,
                strict,
            })?;
        }
        Commands::Inspect { roots, pack, json } => {
            let config = config.with_flags(roots, json);
            commands::inspect::run(&config.roots, &pack, config.json)?;
        }
        Commands::Missing {
            roots,
            pack,
            with,
            json,
        } => {
            let config = config.with_flags(roots, json);
            commands::missing::run(&config.roots, &pack, &with, config.json)?;
        }
        Commands::Verify { roots, lock, json } => {
            let config = config.with_flags(roots, json);
            let Some(lockfile) = lock.or(config.lockfile) else {
                bail!("No lockfile given; pass --lock or set CAIRN_LOCKFILE");
            };
            commands::verify::run(&config.roots, &lockfile, config.json)?;
        }
    }

    Ok(())
}
