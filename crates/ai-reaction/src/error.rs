use ai_perception::AssetError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReactionError {
    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("malformed asset: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown reaction rule `{0}`")]
    UnknownRule(String),

    #[error("unknown reaction `{0}`")]
    UnknownReaction(String),

    #[error("invalid properties for `{name}`: {reason}")]
    InvalidProperties { name: String, reason: String },

    #[error("state snapshot does not match: {0}")]
    StateMismatch(String),
}
