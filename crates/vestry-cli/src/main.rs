//! Vestry CLI - Command-line interface for the audit service
//!
//! Provides commands for:
//! - Listing and inspecting audit log entries
//! - Actor and target history
//! - Security events, alerts, and statistics
//! - Flagging and reviewing entries
//! - Exports, compliance reports, and retention cleanup

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    cleanup::CleanupCommand,
    export::ExportCommand,
    history::{ActorCommand, TargetCommand},
    logs::{LogsCommand, ShowCommand},
    review::{FlagCommand, ReviewCommand},
    security::{AlertsCommand, SecurityCommand},
    stats::{ReportCommand, StatsCommand},
};
use output::{get_formatter, OutputFormat, OutputFormatter};

#[derive(Debug, Parser)]
#[command(
    name = "vestry",
    version,
    about = "Audit log toolkit for the Vestry admin backend"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List audit log entries
    Logs(LogsCommand),
    /// Show one audit log entry in full
    Show(ShowCommand),
    /// Show one actor's audit history
    Actor(ActorCommand),
    /// Show the audit history of one target
    Target(TargetCommand),
    /// List elevated-risk security events
    Security(SecurityCommand),
    /// List recent security alerts
    Alerts(AlertsCommand),
    /// Flag an audit log entry for review
    Flag(FlagCommand),
    /// Mark an audit log entry as reviewed
    Review(ReviewCommand),
    /// Show audit activity statistics
    Stats(StatsCommand),
    /// Generate a compliance report
    Report(ReportCommand),
    /// Export audit log entries to JSON or CSV
    Export(ExportCommand),
    /// Archive or delete old audit log entries
    Cleanup(CleanupCommand),
}

/// Per-invocation context handed to every command
pub struct CliContext {
    pub format: OutputFormat,
    pub quiet: bool,
    pub config: Option<PathBuf>,
}

impl CliContext {
    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(matches!(self.format, OutputFormat::Json), self.quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    let ctx = CliContext {
        format,
        quiet: cli.quiet,
        config: cli.config,
    };

    match cli.command {
        Commands::Logs(cmd) => cmd.execute(&ctx).await,
        Commands::Show(cmd) => cmd.execute(&ctx).await,
        Commands::Actor(cmd) => cmd.execute(&ctx).await,
        Commands::Target(cmd) => cmd.execute(&ctx).await,
        Commands::Security(cmd) => cmd.execute(&ctx).await,
        Commands::Alerts(cmd) => cmd.execute(&ctx).await,
        Commands::Flag(cmd) => cmd.execute(&ctx).await,
        Commands::Review(cmd) => cmd.execute(&ctx).await,
        Commands::Stats(cmd) => cmd.execute(&ctx).await,
        Commands::Report(cmd) => cmd.execute(&ctx).await,
        Commands::Export(cmd) => cmd.execute(&ctx).await,
        Commands::Cleanup(cmd) => cmd.execute(&ctx).await,
    }
}
