use std::{io, net::SocketAddr, result::Result as StdResult};

/// Failures while sending a single datagram.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The payload exceeds what the transport accepts as one datagram.
    #[error("datagram of {size} bytes exceeds the transport limit")]
    MessageTooLarge { size: usize },
    /// Halving the chunk size reached zero without a datagram getting through.
    #[error("chunk size shrank to zero at offset {offset}")]
    ChunkSizeExhausted { offset: usize },
    #[error("transport error: {0}")]
    Other(#[source] io::Error),
}

/// Malformed invocation payloads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("payload is not wrapped in {function}(\"...\")")]
    MissingWrapper { function: String },
    #[error("dangling backslash at end of input")]
    DanglingEscape,
    #[error("unknown escape sequence \\{0}")]
    UnknownEscape(char),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot reach command endpoint {endpoint}: {source}")]
    Connection {
        endpoint: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("cannot bind stream endpoint {endpoint}: {source}")]
    Bind {
        endpoint: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

pub type Result<T> = StdResult<T, Error>;
