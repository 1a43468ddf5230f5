use std::path::PathBuf;

/// Central error type for sliderd.
#[derive(Debug, thiserror::Error)]
pub enum SliderError {
    #[error("config error: {0}")]
    Config(String),

    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("key broker error: {0}")]
    Broker(String),

    #[error("key handler registration rejected: {0}")]
    Registration(String),

    #[error("zen commit not observed within {timeout_ms} ms")]
    ZenCommitTimeout { timeout_ms: u64 },

    #[error("action error: {0}")]
    Action(String),

    #[error("watcher error: {0}")]
    Watcher(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SliderError>;
