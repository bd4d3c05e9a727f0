use crate::output::{print_fields, print_json};
use anyhow::Context;
use clap::Subcommand;
use ff_core::jenkins_config::{ListenerConfig, WarnLevel};
use ff_core::paths;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the persisted listener configuration
    Show,

    /// Update persisted settings; unspecified fields are left unchanged
    Set {
        #[arg(long)]
        port: Option<u16>,
        /// Shared secret (pass "" to disable token auth)
        #[arg(long)]
        secret: Option<String>,
        /// Allowed client address fragment; replaces the list, repeat for several
        #[arg(long = "allow-ip", value_name = "IP")]
        allow_ips: Vec<String>,
        /// Remove all allowed address fragments
        #[arg(long, conflicts_with = "allow_ips")]
        clear_allow_ips: bool,
        #[arg(long)]
        auto_test: Option<bool>,
        #[arg(long)]
        test_command: Option<String>,
        /// Jenkins base URL for `ff jenkins status`
        #[arg(long)]
        jenkins_url: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        api_token: Option<String>,
        /// Milliseconds between polls when waiting for a build
        #[arg(long)]
        polling_interval: Option<u64>,
    },

    /// Print the config file path
    Path,

    /// Validate the config for common mistakes
    Validate,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(config_dir: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(config_dir, json),
        ConfigSubcommand::Set {
            port,
            secret,
            allow_ips,
            clear_allow_ips,
            auto_test,
            test_command,
            jenkins_url,
            username,
            api_token,
            polling_interval,
        } => {
            let mut config = ListenerConfig::load_or_default(config_dir)
                .context("failed to load jenkins config")?;
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(secret) = secret {
                config.secret = (!secret.is_empty()).then_some(secret);
            }
            if clear_allow_ips {
                config.allowed_ips.clear();
            } else if !allow_ips.is_empty() {
                config.allowed_ips = allow_ips;
            }
            if let Some(auto_test) = auto_test {
                config.auto_test = auto_test;
            }
            if let Some(cmd) = test_command {
                config.test_command = Some(cmd);
            }
            if let Some(url) = jenkins_url {
                config.jenkins_url = Some(url);
            }
            if let Some(user) = username {
                config.username = Some(user);
            }
            if let Some(token) = api_token {
                config.api_token = Some(token);
            }
            if let Some(ms) = polling_interval {
                config.polling_interval = Some(ms);
            }
            config
                .save(config_dir)
                .context("failed to save jenkins config")?;
            if json {
                print_json(&redacted(config))?;
            } else {
                println!("Saved {}", paths::jenkins_config_path(config_dir).display());
            }
            Ok(())
        }
        ConfigSubcommand::Path => {
            let path = paths::jenkins_config_path(config_dir);
            if json {
                print_json(&serde_json::json!({ "path": path }))?;
            } else {
                println!("{}", path.display());
            }
            Ok(())
        }
        ConfigSubcommand::Validate => validate(config_dir, json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

const REDACTED: &str = "(set)";

/// Mask credentials before the config is printed.
fn redacted(mut config: ListenerConfig) -> ListenerConfig {
    if config.secret().is_some() {
        config.secret = Some(REDACTED.to_string());
    }
    if config.api_token.is_some() {
        config.api_token = Some(REDACTED.to_string());
    }
    config
}

fn show(config_dir: &Path, json: bool) -> anyhow::Result<()> {
    let config = ListenerConfig::load(config_dir)?;

    if json {
        return print_json(&redacted(config));
    }

    let or_none = |v: Option<&str>| v.unwrap_or("(none)").to_string();
    let allowed = if config.allowed_ips.is_empty() {
        "(any)".to_string()
    } else {
        config.allowed_ips.join(", ")
    };

    print_fields(&[
        ("port", config.port.to_string()),
        (
            "secret",
            if config.secret().is_some() { REDACTED } else { "(none)" }.to_string(),
        ),
        ("allowedIPs", allowed),
        ("autoTest", config.auto_test.to_string()),
        ("testCommand", or_none(config.test_command.as_deref())),
        ("jenkinsUrl", or_none(config.jenkins_url.as_deref())),
        ("username", or_none(config.username.as_deref())),
    ]);
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(config_dir: &Path, json: bool) -> anyhow::Result<()> {
    let config = ListenerConfig::load(config_dir).context("failed to load config")?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}
