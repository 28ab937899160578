//! sitefix CLI - runtime error remediation for PHP sites

use anyhow::Result;
use clap::Parser;
use sitefix_cli::{commands, Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Fix {
            ref checks,
            ref path,
            ai,
            fail_on_error,
        } => commands::fix::run(checks, path.as_deref(), ai, fail_on_error, cli.format)?,
        Commands::Scan {
            ref checks,
            ref path,
        } => commands::scan::run(checks, path.as_deref(), cli.format)?,
        Commands::Rules { ref path } => commands::rules::run(path.as_deref(), cli.format)?,
        Commands::Init { ref path } => commands::init::run(path.as_deref())?,
        Commands::Restore {
            ref session,
            ref path,
        } => commands::restore::run(session, path.as_deref())?,
        Commands::AiHealth { ref path } => {
            commands::ai_health::run(path.as_deref(), cli.format)?
        }
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
