//! Error types
//!
//! Nothing here is fatal: a failure means "this level did not start" or
//! "this settings file was not used".

/// Source image could not be fetched or decoded
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read image {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("failed to decode image {url}: {reason}")]
    Decode { url: String, reason: String },
    #[error("image bank is empty")]
    EmptyBank,
}

/// Filter round trip (rasterize, mutate, encode, decode) failed
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("filter encode failed: {0}")]
    Encode(String),
    #[error("filter decode failed: {0}")]
    Decode(String),
    #[error("filtered image has wrong dimensions: expected {expected:?}, got {actual:?}")]
    Dimensions {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

/// Settings could not be used
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("settings io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("difficulty must be at least 1")]
    ZeroDifficulty,
    #[error("canvas size must be at least 1 pixel")]
    ZeroCanvas,
    #[error("difficulty {difficulty} leaves cells under 1 pixel on a {canvas_size}px canvas")]
    CellTooSmall { difficulty: u32, canvas_size: u32 },
    #[error("image bank is empty")]
    EmptyImageBank,
}

/// Any failure surfaced by the session API
#[derive(Debug, thiserror::Error)]
pub enum BlockaError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
