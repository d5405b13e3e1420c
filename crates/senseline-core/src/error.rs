use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open transport {port}: {source}")]
    TransportOpen {
        port: String,
        #[source]
        source: std::io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
