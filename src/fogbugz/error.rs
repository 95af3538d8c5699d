use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Tracker request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Tracker API error {code}: {message}")]
    Api { code: String, message: String },

    #[error("Malformed tracker response: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
