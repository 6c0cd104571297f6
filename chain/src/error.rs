use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum ChainError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("RPC node returned HTTP {0}")]
    Http(u16),

    #[error("{message}")]
    Rpc { code: i64, message: String },

    #[error("invalid RPC response: {0}")]
    InvalidResponse(String),
}

impl ChainError {
    /// The text a user should see for this failure.
    pub fn detail(&self) -> String {
        self.to_string()
    }
}
