mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::jenkins::JenkinsSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ff",
    about = "Frontend developer workflow CLI",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config directory (default: ~/.config/ff-cli)
    #[arg(long, global = true, env = "FF_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Jenkins integration: webhook listener, config and build status
    Jenkins {
        #[command(subcommand)]
        subcommand: JenkinsSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Jenkins {
            subcommand: JenkinsSubcommand::Listen(args),
        } if args.debug => tracing::Level::DEBUG,
        Commands::Jenkins {
            subcommand: JenkinsSubcommand::Listen(_),
        } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let config_dir = cli.config_dir.as_deref();

    let result = match cli.command {
        Commands::Jenkins { subcommand } => cmd::jenkins::run(config_dir, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
