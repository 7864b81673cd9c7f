use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("malformed asset: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid value for `{tag}`: {reason}")]
    InvalidValue { tag: &'static str, reason: String },
}
