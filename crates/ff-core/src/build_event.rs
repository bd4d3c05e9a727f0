use crate::error::{FfError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

pub const PHASE_COMPLETED: &str = "COMPLETED";

// ---------------------------------------------------------------------------
// BuildStatus
// ---------------------------------------------------------------------------

/// Terminal outcome Jenkins reports for a build.
///
/// Anything Jenkins sends outside the known set deserializes as `Unknown`,
/// which is a valid terminal state with no dedicated handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildStatus {
    Success,
    Failure,
    Unstable,
    Aborted,
    NotBuilt,
    #[serde(other)]
    Unknown,
}

impl BuildStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildStatus::Success => "SUCCESS",
            BuildStatus::Failure => "FAILURE",
            BuildStatus::Unstable => "UNSTABLE",
            BuildStatus::Aborted => "ABORTED",
            BuildStatus::NotBuilt => "NOT_BUILT",
            BuildStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Wire payload (Jenkins Notification plugin format)
// ---------------------------------------------------------------------------

/// Inbound webhook body as Jenkins sends it.
///
/// `build.log` and `build.artifacts` are accepted on the wire but not read.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub build: Option<WebhookBuild>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WebhookBuild {
    pub number: u64,
    pub phase: String,
    /// Null while the build is still running.
    #[serde(default)]
    pub status: Option<BuildStatus>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub full_url: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub parameters: Option<Map<String, Value>>,
}

impl WebhookPayload {
    /// Parse a raw request body. Invalid JSON and missing required build
    /// fields both surface as `MalformedPayload`.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| FfError::MalformedPayload(e.to_string()))
    }

    pub fn phase(&self) -> Option<&str> {
        self.build.as_ref().map(|b| b.phase.as_str())
    }

    pub fn is_completed(&self) -> bool {
        self.phase() == Some(PHASE_COMPLETED)
    }
}

// ---------------------------------------------------------------------------
// Canonical build result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub number: u64,
    pub phase: String,
    pub status: Option<BuildStatus>,
    pub url: String,
    pub full_url: String,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildResult {
    pub name: String,
    pub url: String,
    pub build: BuildInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<BTreeMap<String, String>>,
}

impl BuildResult {
    /// `job #number`, used in log lines.
    pub fn label(&self) -> String {
        format!("{} #{}", self.name, self.build.number)
    }

    pub fn status_str(&self) -> &'static str {
        self.build.status.map(|s| s.as_str()).unwrap_or("null")
    }
}

/// Reshape a wire payload into a `BuildResult`.
///
/// Pure field renaming: `full_url` becomes `fullUrl` and `build.parameters`
/// moves to the top level. Non-string parameter values are rendered as JSON.
pub fn normalize(payload: &WebhookPayload) -> Result<BuildResult> {
    let build = payload
        .build
        .as_ref()
        .ok_or_else(|| FfError::MalformedPayload("missing 'build' object".into()))?;

    let parameters = build.parameters.as_ref().map(|params| {
        params
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect()
    });

    Ok(BuildResult {
        name: payload.name.clone(),
        url: payload.url.clone(),
        build: BuildInfo {
            number: build.number,
            phase: build.phase.clone(),
            status: build.status,
            url: build.url.clone(),
            full_url: build.full_url.clone(),
            timestamp: build.timestamp,
            duration: build.duration,
        },
        parameters,
    })
}
