use crate::build_event::BuildStatus;
use crate::error::{FfError, Result};
use crate::jenkins_config::ListenerConfig;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(300);

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BuildRef {
    pub number: u64,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    #[serde(rename = "_class", default)]
    pub class: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub buildable: bool,
    #[serde(default)]
    pub builds: Vec<BuildRef>,
    #[serde(default)]
    pub last_build: Option<BuildRef>,
    #[serde(default)]
    pub last_completed_build: Option<BuildRef>,
    #[serde(default)]
    pub last_successful_build: Option<BuildRef>,
}

/// `GET /job/<name>/<number>/api/json`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JenkinsBuild {
    pub number: u64,
    #[serde(default)]
    pub url: String,
    /// Null while the build is running.
    #[serde(default)]
    pub result: Option<BuildStatus>,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub building: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub full_display_name: String,
}

// ---------------------------------------------------------------------------
// JenkinsClient
// ---------------------------------------------------------------------------

/// Thin blocking client for the Jenkins JSON API.
pub struct JenkinsClient {
    base_url: String,
    auth: Option<(String, String)>,
    http: reqwest::blocking::Client,
}

impl JenkinsClient {
    /// Basic auth is only sent when both `username` and `api_token` are given.
    pub fn new(jenkins_url: &str, username: Option<&str>, api_token: Option<&str>) -> Result<Self> {
        let base_url = jenkins_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(FfError::MissingJenkinsUrl);
        }
        let auth = match (username, api_token) {
            (Some(u), Some(t)) => Some((u.to_string(), t.to_string())),
            _ => None,
        };
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            base_url,
            auth,
            http,
        })
    }

    pub fn from_config(config: &ListenerConfig) -> Result<Self> {
        let url = config
            .jenkins_url
            .as_deref()
            .ok_or(FfError::MissingJenkinsUrl)?;
        Self::new(url, config.username.as_deref(), config.api_token.as_deref())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self
            .http
            .get(&url)
            .header("Content-Type", "application/json");
        if let Some((user, token)) = &self.auth {
            req = req.basic_auth(user, Some(token));
        }
        let resp = req.send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FfError::JenkinsApi(format!("GET {url} returned {status}")));
        }
        Ok(resp.json()?)
    }

    pub fn get_job(&self, job: &str) -> Result<JobInfo> {
        self.get_json(&format!("/job/{job}/api/json"))
    }

    pub fn get_build(&self, job: &str, number: u64) -> Result<JenkinsBuild> {
        self.get_json(&format!("/job/{job}/{number}/api/json"))
    }

    /// The most recent build of `job`, or `None` if it has never run.
    pub fn get_last_build(&self, job: &str) -> Result<Option<JenkinsBuild>> {
        let info = self.get_job(job)?;
        match info.last_build {
            Some(last) => self.get_build(job, last.number).map(Some),
            None => Ok(None),
        }
    }

    /// Poll a build until Jenkins reports it finished with a result.
    pub fn poll_until_complete(
        &self,
        job: &str,
        number: u64,
        interval: Duration,
        timeout: Duration,
    ) -> Result<BuildStatus> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            let build = self.get_build(job, number)?;
            if !build.building {
                if let Some(result) = build.result {
                    return Ok(result);
                }
            }
            tracing::debug!("{job} #{number} still running, retrying in {interval:?}");
            std::thread::sleep(interval);
        }
        Err(FfError::PollTimeout(timeout.as_millis() as u64))
    }
}
