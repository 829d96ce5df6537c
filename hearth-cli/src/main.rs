//! Hearth CLI tool

use clap::{Parser, Subcommand};

mod commands;
mod context;
mod polling;

#[derive(Parser)]
#[command(name = "hearth")]
#[command(author, version, about = "Hearth server lifecycle CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,

    /// Provision a server
    Provision {
        /// Target server to provision
        target_id: String,

        /// Server software version to deploy
        #[arg(long)]
        version: Option<String>,

        /// Instance size override
        #[arg(long)]
        instance_type: Option<String>,

        /// Backup artifact reference to restore from
        #[arg(long)]
        from_backup: Option<String>,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Deprovision a server, snapshotting world data first
    Deprovision {
        /// Target server to tear down
        target_id: String,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Show the latest execution for a server
    Status {
        /// Target server to query
        target_id: String,
    },
}

#[derive(clap::Args)]
struct WaitArgs {
    /// Wait for the execution to reach a terminal status
    #[arg(long)]
    wait: bool,

    /// Timeout in seconds when using --wait (default: 1800)
    #[arg(long, default_value = "1800")]
    timeout: u64,

    /// Poll interval in seconds when using --wait (default: 5)
    #[arg(long, default_value = "5")]
    poll_interval: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .init();

    match cli.command {
        Commands::Migrate => commands::migrate::execute(&cli.database_url).await,
        Commands::Provision {
            target_id,
            version,
            instance_type,
            from_backup,
            wait,
        } => {
            let input = serde_json::json!({
                "version": version,
                "instance_type": instance_type,
                "restore_from": from_backup,
            });
            commands::trigger::execute(
                hearth_runtime::WorkflowKind::Provision,
                &target_id,
                input,
                &cli.database_url,
                wait.into(),
            )
            .await
        }
        Commands::Deprovision { target_id, wait } => {
            commands::trigger::execute(
                hearth_runtime::WorkflowKind::Deprovision,
                &target_id,
                serde_json::json!({}),
                &cli.database_url,
                wait.into(),
            )
            .await
        }
        Commands::Status { target_id } => {
            commands::status::execute(&target_id, &cli.database_url).await
        }
    }
}

impl From<WaitArgs> for commands::trigger::WaitOptions {
    fn from(args: WaitArgs) -> Self {
        Self {
            wait: args.wait,
            timeout: std::time::Duration::from_secs(args.timeout),
            poll_interval: std::time::Duration::from_secs(args.poll_interval),
        }
    }
}
