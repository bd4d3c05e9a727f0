use crate::cmd::config::ConfigSubcommand;
use crate::cmd::listen::ListenArgs;
use crate::cmd::status::StatusArgs;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum JenkinsSubcommand {
    /// Start the webhook listener for Jenkins build events
    Listen(ListenArgs),

    /// Show or edit the persisted listener configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Show the status of a job's build via the Jenkins API
    Status(StatusArgs),
}

pub fn run(config_dir: Option<&Path>, subcmd: JenkinsSubcommand, json: bool) -> anyhow::Result<()> {
    let dir = ff_core::paths::resolve_config_dir(config_dir)?;
    match subcmd {
        JenkinsSubcommand::Listen(args) => crate::cmd::listen::run(&dir, args),
        JenkinsSubcommand::Config { subcommand } => crate::cmd::config::run(&dir, subcommand, json),
        JenkinsSubcommand::Status(args) => crate::cmd::status::run(&dir, args, json),
    }
}
