use thiserror::Error;

#[derive(Error, Debug)]
pub enum RibbonError {
    #[error("Sign-in/out request failed: {0}")]
    AuthInitiation(String),

    #[error("Remote fetch failed: {0}")]
    RemoteFetch(String),

    #[error("Remote write failed: {0}")]
    RemoteWrite(String),

    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, RibbonError>;
