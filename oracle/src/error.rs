use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("upstream returned HTTP {0}")]
    Http(u16),

    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),
}
