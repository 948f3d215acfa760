use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtectorError {
    #[error("swarm key must be {expected} bytes, found {found}")]
    InvalidLength { expected: usize, found: usize },

    #[error("swarm key has an unsupported header")]
    InvalidHeader,

    #[error("swarm key is not valid base16: {0}")]
    InvalidKey(#[from] hex::FromHexError),

    #[error("private network is enforced, but no swarm key was provided")]
    Enforced,

    #[error("failed to build transport: {0}")]
    Transport(String),
}
