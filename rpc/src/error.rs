//! RPC-layer errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response from the node. The body is kept for the log.
    #[error("node returned {status} for {path}: {body}")]
    Status {
        status: u16,
        path: String,
        body: String,
    },

    #[error("malformed response for {path}: {reason}")]
    BadResponse { path: String, reason: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The signer endpoint could not be reached or refused the request.
    /// Treated as a configuration problem by the daemon.
    #[error("signer unreachable or refused: {0}")]
    SignerUnreachable(String),

    #[error("signature '{0}' is not in a recognized base58check format")]
    BadSignature(String),

    /// Reward-data provider failure; transient unless stated otherwise.
    #[error("reward provider error: {0}")]
    Provider(String),
}

pub type Result<T> = std::result::Result<T, RpcError>;
