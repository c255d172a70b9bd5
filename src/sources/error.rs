use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    #[error("rate limited by weather provider")]
    RateLimited,

    #[error("weather API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode weather response: {0}")]
    Decode(String),

    #[error("OpenWeather API key is not configured")]
    MissingApiKey,
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SourceError::Decode(e.to_string())
        } else {
            SourceError::Transport(e.to_string())
        }
    }
}

impl From<reqwest_middleware::Error> for SourceError {
    fn from(e: reqwest_middleware::Error) -> Self {
        match e {
            reqwest_middleware::Error::Reqwest(e) => e.into(),
            reqwest_middleware::Error::Middleware(e) => SourceError::Transport(format!("{e:#}")),
        }
    }
}
