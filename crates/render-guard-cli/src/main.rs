use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

use commands::check::OperationKind;

/// Render sandbox policy tool.
///
/// Evaluates operations against the render security policy a project's configuration
/// produces, and prints the effective configuration.
///
/// EXAMPLES:
///     render-guard check write /tmp/cache.bin       Is this write allowed?
///     render-guard check exec /bin/ls --json        Machine-readable verdict
///     render-guard check read ~/.ssh/id_rsa --restrict-reads
///     render-guard config                           Show merged configuration
///
/// ENVIRONMENT VARIABLES:
///     ANDROID_RENDER_SANDBOX        Set to 'false' to disable enforcement
///     RENDER_GUARD_RESTRICT_READS   Set to 'true' to check reads
///     RENDER_GUARD_SDK_PATH         Absolute SDK root
///     RENDER_GUARD_JSON             Set to 'true' for JSON output by default
///     RUST_LOG                      Log filter (default: warn)
#[derive(Parser)]
#[command(name = "render-guard")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one operation on the render thread
    ///
    /// Builds the policy from configuration, activates it and checks the operation as if
    /// rendering code had requested it. Exits with status 1 when the operation is denied.
    ///
    /// EXAMPLES:
    ///     render-guard check write /tmp/out.png
    ///     render-guard check connect example.com:443
    ///     render-guard check property-write user.timezone
    Check {
        /// Kind of operation
        #[arg(value_enum)]
        kind: OperationKind,
        /// Path, command, host:port, exit status, library or property name
        target: String,
        /// Project config file (default: render-guard.toml found from the current directory)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
        /// Check reads even if the configuration leaves them unrestricted
        #[arg(long)]
        restrict_reads: bool,
        /// Output the verdict as JSON
        #[arg(long, env = "RENDER_GUARD_JSON")]
        json: bool,
    },

    /// Print the effective merged configuration
    Config {
        /// Project config file (default: render-guard.toml found from the current directory)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
        /// Output as JSON
        #[arg(long, env = "RENDER_GUARD_JSON")]
        json: bool,
    },
}

fn init_tracing() {
    // Diagnostics go to stderr; stdout carries the verdict
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            kind,
            target,
            config,
            restrict_reads,
            json,
        } => {
            let args = commands::check::CheckArgs {
                kind,
                target,
                config,
                restrict_reads,
                json,
            };
            if !commands::check::run(args)? {
                std::process::exit(1);
            }
        }
        Commands::Config { config, json } => {
            commands::config::run(config.as_deref(), json)?;
        }
    }

    Ok(())
}
