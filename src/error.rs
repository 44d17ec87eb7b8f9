/// All errors that can occur while caching, resolving or playing tour content.
#[derive(Debug, thiserror::Error)]
pub enum TourError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP {status} from {url}")]
    Http { url: String, status: u16 },

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("{0}")]
    Custom(String),
}

pub type Result<T> = std::result::Result<T, TourError>;
