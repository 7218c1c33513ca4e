use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx reply from an external service. Not retried here; the caller
    /// decides whether the operation is worth repeating.
    #[error("{service} returned HTTP {status}: {body}")]
    ExternalService {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Chat completion response is missing choices[0].message.content")]
    MalformedResponse,

    #[error("Could not extract JSON from model output: {0}")]
    UnparsableContent(String),

    /// Nothing to deliver for this user this cycle. A skip signal, not a fault.
    #[error("No summaries available for the subscribed tags")]
    NoContent,

    #[error("Summary generation failed for tag {tag}: {source}")]
    TagSummary {
        tag: String,
        #[source]
        source: Box<AppError>,
    },

    #[error("Subscriber not found: {0}")]
    UnknownSubscriber(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Wrap an error with the tag whose summary generation it aborted.
    pub fn for_tag(self, tag: &str) -> Self {
        AppError::TagSummary {
            tag: tag.to_string(),
            source: Box::new(self),
        }
    }
}
