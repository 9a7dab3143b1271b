use anyhow::Result;
use clap::{CommandFactory, Parser};
use color_eyre::config::HookBuilder;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod handlers;
mod report;

/// sitepush - deploy a built site to S3-compatible storage
#[derive(Parser, Debug)]
#[command(name = "sitepush")]
#[command(version)]
#[command(about = "Upload a built site directory to an S3-compatible bucket", long_about = None)]
struct Cli {
    /// Configuration file (default: ./sitepush.toml, then ~/.config/sitepush/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Sub-command to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Upload every file of the source directory
    Deploy(DeployArgs),

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Shell completion
    Completion {
        /// Shell type (bash, zsh, fish, elvish, powershell)
        shell: String,
    },
}

/// Where to deploy from and to; overrides the config file and environment
#[derive(clap::Args, Debug, Clone, Default)]
struct TargetArgs {
    /// Local directory to upload (default: dist)
    #[arg(short, long)]
    source: Option<PathBuf>,
    /// Target bucket (or SITEPUSH_BUCKET)
    #[arg(short, long)]
    bucket: Option<String>,
    /// Bucket region (or AWS_REGION, default: us-east-1)
    #[arg(long)]
    region: Option<String>,
    /// Custom S3-compatible endpoint (or AWS_ENDPOINT_URL)
    #[arg(long)]
    endpoint: Option<String>,
    /// Use path-style bucket addressing
    #[arg(long, overrides_with = "no_path_style")]
    path_style: bool,
    /// Use virtual-hosted addressing even if the config file enables path style
    #[arg(long, overrides_with = "path_style")]
    no_path_style: bool,
    /// Public URL printed after a successful deployment
    #[arg(long)]
    site_url: Option<String>,
}

#[derive(clap::Args, Debug)]
struct DeployArgs {
    #[command(flatten)]
    target: TargetArgs,
    /// Log what would be uploaded without contacting the bucket
    #[arg(long)]
    dry_run: bool,
    /// Show a progress bar
    #[arg(short, long)]
    progress: bool,
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
    /// Exit with an error if any file failed to upload
    #[arg(long)]
    strict: bool,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Show the effective configuration
    Show {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Validate the configuration and build the storage client
    Validate {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Write a starter configuration file
    Init {
        /// Bucket to deploy to
        #[arg(short, long)]
        bucket: String,
        /// Destination (default: ./sitepush.toml)
        #[arg(long)]
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("warn,sitepush={level},sitepush_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup error handling
    if let Err(e) = HookBuilder::default().install() {
        eprintln!("Warning: Failed to install error handler: {}", e);
    }

    // Parse CLI arguments
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Execute command
    match cli.command {
        Commands::Deploy(args) => handlers::handle_deploy(cli.config.as_deref(), args).await,
        Commands::Config { action } => handlers::handle_config(cli.config.as_deref(), action).await,
        Commands::Completion { shell } => handlers::handle_completion(&shell, &mut Cli::command()),
    }
}
