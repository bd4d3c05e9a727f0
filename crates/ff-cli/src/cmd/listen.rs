use anyhow::Context;
use clap::Args;
use ff_core::build_event::BuildResult;
use ff_core::jenkins_config::{ListenerConfig, ListenerOverrides, WarnLevel};
use ff_server::{EventKind, WebhookServer};
use std::path::Path;

#[derive(Args)]
pub struct ListenArgs {
    /// Webhook server port (default: saved config, else 9000)
    #[arg(long, short = 'p')]
    pub port: Option<u16>,

    /// Shared secret Jenkins must send in X-Jenkins-Token or Authorization
    #[arg(long, short = 's')]
    pub secret: Option<String>,

    /// Run the test command after every successful build
    #[arg(long)]
    pub auto_test: bool,

    /// Command to run for auto-test (e.g. "npm test")
    #[arg(long)]
    pub test_command: Option<String>,

    /// Allowed client address fragment; repeat for several
    #[arg(long = "allow-ip", value_name = "IP")]
    pub allow_ips: Vec<String>,

    /// Persist the effective configuration before starting
    #[arg(long)]
    pub save: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl ListenArgs {
    fn overrides(&self) -> ListenerOverrides {
        ListenerOverrides {
            port: self.port,
            secret: self.secret.clone(),
            allowed_ips: (!self.allow_ips.is_empty()).then(|| self.allow_ips.clone()),
            auto_test: self.auto_test.then_some(true),
            test_command: self.test_command.clone(),
        }
    }
}

pub fn run(config_dir: &Path, args: ListenArgs) -> anyhow::Result<()> {
    let persisted = ListenerConfig::load_or_default(config_dir)
        .context("failed to load jenkins config")?;
    let config = args.overrides().apply(persisted);

    if args.save {
        config
            .save(config_dir)
            .context("failed to save jenkins config")?;
        println!("Configuration saved");
    }

    for w in config.validate() {
        match w.level {
            WarnLevel::Warning => tracing::warn!("{}", w.message),
            WarnLevel::Error => tracing::error!("{}", w.message),
        }
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let server = WebhookServer::new(config);
        register_console_handlers(&server);

        server
            .start()
            .await
            .context("Failed to start Jenkins listener")?;

        shutdown_signal().await;
        println!("\nShutting down Jenkins listener...");
        server.stop().await;
        Ok(())
    })
}

fn register_console_handlers(server: &WebhookServer) {
    server.on(EventKind::Success, |result: BuildResult| async move {
        println!("\nBuild succeeded: {}", result.label());
        println!("URL: {}", result.build.full_url);
        if let Some(ms) = result.build.duration.filter(|ms| *ms > 0) {
            println!("Duration: {}s", (ms as f64 / 1000.0).round());
        }
        Ok(())
    });

    server.on(EventKind::Failure, |result: BuildResult| async move {
        eprintln!("\nBuild failed: {}", result.label());
        println!("URL: {}", result.build.full_url);
        Ok(())
    });

    server.on(EventKind::Unstable, |result: BuildResult| async move {
        println!("\nBuild unstable: {}", result.label());
        println!("URL: {}", result.build.full_url);
        Ok(())
    });
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
