use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed parse error: {0}")]
    FeedParse(#[from] feed_rs::parser::ParseFeedError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Raw record with no usable url or title. Dropped before storage and
    /// counted separately in scan diagnostics.
    #[error("malformed record from {feed}: {reason}")]
    MalformedRecord { feed: String, reason: String },

    /// Telegram refused or never acknowledged the message. The whole batch
    /// stays unstamped so the next run retries it wholesale.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// Page-summary fetch exceeded its deadline. Never fatal to the pipeline.
    #[error("summary fetch timed out for {0}")]
    SummaryTimeout(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
