use crate::output::{print_fields, print_json};
use anyhow::Context;
use clap::Args;
use ff_core::jenkins_api::{JenkinsBuild, JenkinsClient, DEFAULT_POLL_TIMEOUT};
use ff_core::jenkins_config::ListenerConfig;
use ff_core::FfError;
use std::path::Path;
use std::time::Duration;

#[derive(Args)]
pub struct StatusArgs {
    /// Jenkins job name
    pub job: String,

    /// Build number (default: the job's last build)
    #[arg(long)]
    pub build: Option<u64>,

    /// Block until the build finishes
    #[arg(long)]
    pub wait: bool,

    /// Give up waiting after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Jenkins base URL (overrides jenkinsUrl from config)
    #[arg(long)]
    pub url: Option<String>,
}

pub fn run(config_dir: &Path, args: StatusArgs, json: bool) -> anyhow::Result<()> {
    let mut config = ListenerConfig::load_or_default(config_dir)
        .context("failed to load jenkins config")?;
    if let Some(url) = args.url {
        config.jenkins_url = Some(url);
    }
    let client = JenkinsClient::from_config(&config)?;

    let mut build = match args.build {
        Some(number) => client.get_build(&args.job, number)?,
        None => client
            .get_last_build(&args.job)?
            .ok_or_else(|| FfError::NoBuilds(args.job.clone()))?,
    };

    if args.wait && build.building {
        let interval = config.poll_interval();
        let timeout = args
            .timeout
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_TIMEOUT);
        if !json {
            println!("Waiting for {} #{}...", args.job, build.number);
        }
        client.poll_until_complete(&args.job, build.number, interval, timeout)?;
        build = client.get_build(&args.job, build.number)?;
    }

    report(&args.job, &build, json)
}

fn result_label(build: &JenkinsBuild) -> String {
    if build.building {
        return "BUILDING".to_string();
    }
    build
        .result
        .map(|r| r.as_str().to_string())
        .unwrap_or_else(|| "PENDING".to_string())
}

fn report(job: &str, build: &JenkinsBuild, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&serde_json::json!({
            "job": job,
            "number": build.number,
            "result": build.result,
            "building": build.building,
            "url": build.url,
            "timestamp": build.timestamp,
            "duration": build.duration,
        }));
    }

    let started = chrono::DateTime::from_timestamp_millis(build.timestamp)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "-".to_string());

    print_fields(&[
        ("job", job.to_string()),
        ("build", format!("#{}", build.number)),
        ("result", result_label(build)),
        ("started", started),
        ("duration", format!("{}s", build.duration / 1000)),
        ("url", build.url.clone()),
    ]);
    Ok(())
}
