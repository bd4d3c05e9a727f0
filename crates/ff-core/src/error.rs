use thiserror::Error;

#[derive(Debug, Error)]
pub enum FfError {
    #[error("jenkins listener not configured: run 'ff jenkins config set'")]
    NotConfigured,

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("malformed webhook payload: {0}")]
    MalformedPayload(String),

    #[error("jenkins url not configured: pass --url or set jenkinsUrl")]
    MissingJenkinsUrl,

    #[error("jenkins request failed: {0}")]
    JenkinsApi(String),

    #[error("job '{0}' has no builds")]
    NoBuilds(String),

    #[error("polling timeout after {0}ms")]
    PollTimeout(u64),

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, FfError>;
