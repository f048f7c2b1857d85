/// Corruption found while reading a persisted transition model.
#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error("line {line}: malformed entry {content:?}")]
    MalformedLine { line: usize, content: String },

    #[error("line {line}: follower entry outside of a number block")]
    OrphanEntry { line: usize },

    #[error("number {number} appears twice")]
    DuplicateKey { number: u8 },

    #[error("invalid entry for number {number}: {reason}")]
    InvalidEntry { number: u8, reason: String },

    #[error("unsupported model version {0}")]
    UnsupportedVersion(u32),

    #[error("model record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
