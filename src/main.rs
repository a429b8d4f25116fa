use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cmd;

#[derive(Parser)]
#[command(name = "riptide")]
#[command(version, about = "Development environment orchestrator")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project file to use instead of searching for riptide.yml upwards from the current directory
    #[arg(long, global = true)]
    pub project_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Trigger an event and run its hooks
    HookTrigger {
        /// Event key, e.g. pre-start, git-pre-commit or custom-<name>
        event: String,
        /// Arguments passed on to the hooks
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Enable or disable hooks and set the countdown before they run
    HookConfigure {
        /// Change the configuration of all projects instead of the current one
        #[arg(short = 'g', long)]
        global: bool,
        /// Whether hooks run
        #[arg(long)]
        enable: Option<bool>,
        /// Seconds to wait before hooks run
        #[arg(long)]
        wait_time: Option<u32>,
        /// Event to configure. All events if omitted
        event: Option<String>,
    },
    /// Show the hook configuration and the hooks defined for every event
    HookList,
    /// Create hook configuration files and install git hooks
    HookSetup,
    /// Start services
    Start {
        /// Comma-separated services to start. All services if omitted
        #[arg(short, long, value_delimiter = ',')]
        services: Vec<String>,
    },
    /// Stop services
    Stop {
        /// Comma-separated services to stop. All services if omitted
        #[arg(short, long, value_delimiter = ',')]
        services: Vec<String>,
    },
    /// Show which services are running
    Status,
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "riptide=debug" } else { "riptide=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("RIPTIDE_LOG")
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let project_file = cli.project_file.as_deref();

    match &cli.command {
        Commands::HookTrigger { event, args } => {
            let code = cmd::cmd_hook_trigger(project_file, event, args).await?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::HookConfigure {
            global,
            enable,
            wait_time,
            event,
        } => cmd::cmd_hook_configure(project_file, *global, *enable, *wait_time, event.as_deref())?,
        Commands::HookList => cmd::cmd_hook_list(project_file)?,
        Commands::HookSetup => cmd::cmd_hook_setup(project_file)?,
        Commands::Start { services } => {
            if !cmd::cmd_start(project_file, services).await? {
                std::process::exit(1);
            }
        }
        Commands::Stop { services } => {
            if !cmd::cmd_stop(project_file, services).await? {
                std::process::exit(1);
            }
        }
        Commands::Status => cmd::cmd_status(project_file).await?,
    }

    Ok(())
}
