use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipeScanError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Credential exchange failed: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Job scan aborted: {0}")]
    ScanAborted(String),
}

pub type Result<T> = std::result::Result<T, PipeScanError>;
