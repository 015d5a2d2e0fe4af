use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlertingError {
    #[error("Alert publish failed: {0}")]
    PublishFailed(String),

    #[error("De-dup store unavailable: {0}")]
    DedupStore(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl From<reqwest::Error> for AlertingError {
    fn from(err: reqwest::Error) -> Self {
        AlertingError::PublishFailed(err.to_string())
    }
}
