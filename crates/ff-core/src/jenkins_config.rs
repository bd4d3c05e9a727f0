use crate::error::{FfError, Result};
use crate::jenkins_api::DEFAULT_POLL_INTERVAL;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 9000;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ListenerConfig
// ---------------------------------------------------------------------------

/// Jenkins listener settings, persisted as `jenkins.json`.
///
/// Field names follow the on-disk camelCase format. The API fields
/// (`jenkinsUrl`, `username`, `apiToken`, `pollingInterval`, `jobs`) are
/// only read by `ff jenkins status`; the webhook listener ignores them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(
        default,
        rename = "allowedIPs",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub allowed_ips: Vec<String>,
    #[serde(default)]
    pub auto_test: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jenkins_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling_interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub jobs: Vec<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            secret: None,
            allowed_ips: Vec::new(),
            auto_test: false,
            test_command: None,
            jenkins_url: None,
            username: None,
            api_token: None,
            polling_interval: None,
            jobs: Vec::new(),
        }
    }
}

impl ListenerConfig {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    /// The shared secret, treating an empty string as unset.
    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref().filter(|s| !s.is_empty())
    }

    /// `pollingInterval` (milliseconds) as a duration, defaulting to
    /// `DEFAULT_POLL_INTERVAL`.
    pub fn poll_interval(&self) -> Duration {
        self.polling_interval
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_POLL_INTERVAL)
    }

    /// The test command to run after a successful build, if auto-test is on
    /// and the command is not blank.
    pub fn auto_test_command(&self) -> Option<&str> {
        if !self.auto_test {
            return None;
        }
        self.test_command
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    pub fn load(config_dir: &Path) -> Result<Self> {
        let path = paths::jenkins_config_path(config_dir);
        if !path.exists() {
            return Err(FfError::NotConfigured);
        }
        let data = std::fs::read_to_string(&path)?;
        let config: ListenerConfig = serde_json::from_str(&data)
            .map_err(|e| FfError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Ok(config)
    }

    /// Load the persisted config, falling back to defaults when none exists.
    pub fn load_or_default(config_dir: &Path) -> Result<Self> {
        match Self::load(config_dir) {
            Ok(config) => Ok(config),
            Err(FfError::NotConfigured) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    pub fn save(&self, config_dir: &Path) -> Result<()> {
        let path = paths::jenkins_config_path(config_dir);
        let data = serde_json::to_string_pretty(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// Check the config for settings that will not behave as the user expects.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.auto_test && self.auto_test_command().is_none() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "autoTest is enabled but testCommand is empty; no tests will run"
                    .to_string(),
            });
        }

        if !self.auto_test && self.test_command.is_some() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "testCommand is set but autoTest is disabled".to_string(),
            });
        }

        if self.secret.as_deref() == Some("") {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "secret is empty; token authentication is disabled".to_string(),
            });
        }

        if self.allowed_ips.iter().any(|ip| ip.trim().is_empty()) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "allowedIPs contains an empty entry, which matches every address"
                    .to_string(),
            });
        }

        if self.secret().is_none() && self.allowed_ips.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "neither secret nor allowedIPs is set; the webhook accepts any caller"
                    .to_string(),
            });
        }

        if self.username.is_some() != self.api_token.is_some() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "username and apiToken must both be set for Jenkins API auth"
                    .to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// ListenerOverrides
// ---------------------------------------------------------------------------

/// Values supplied on the command line. Each `Some` wins over the persisted
/// config.
#[derive(Debug, Clone, Default)]
pub struct ListenerOverrides {
    pub port: Option<u16>,
    pub secret: Option<String>,
    pub allowed_ips: Option<Vec<String>>,
    pub auto_test: Option<bool>,
    pub test_command: Option<String>,
}

impl ListenerOverrides {
    pub fn apply(self, mut config: ListenerConfig) -> ListenerConfig {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(secret) = self.secret {
            config.secret = Some(secret);
        }
        if let Some(ips) = self.allowed_ips {
            config.allowed_ips = ips;
        }
        if let Some(auto_test) = self.auto_test {
            config.auto_test = auto_test;
        }
        if let Some(cmd) = self.test_command {
            config.test_command = Some(cmd);
        }
        config
    }
}
