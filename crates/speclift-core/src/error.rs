use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecliftError {
    #[error("not initialized: run 'speclift init'")]
    NotInitialized,

    #[error("malformed state document: {0}")]
    Malformed(String),

    #[error("invalid state document: {0}")]
    InvalidState(String),

    #[error("stage not found: {0}")]
    NotFound(String),

    #[error("invalid stage name '{0}': expected NN[a|b]-slug, e.g. 03a-full-app")]
    InvalidStageName(String),

    #[error("invalid chain id '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidChainId(String),

    #[error("invalid pipeline: {0}")]
    InvalidPipeline(String),

    #[error("chain mismatch: store belongs to chain '{expected}', document has '{found}'")]
    ChainMismatch { expected: String, found: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SpecliftError {
    /// True when the error only means "nothing saved yet".
    pub fn is_not_found(&self) -> bool {
        matches!(self, SpecliftError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, SpecliftError>;
