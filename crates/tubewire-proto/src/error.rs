/// Errors that can occur while encoding commands or decoding responses.
#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    /// The daemon sent a line that is not a known response.
    #[error("invalid response line: {0:?}")]
    InvalidResponse(String),

    /// A job body exceeds the configured maximum size.
    #[error("job body too large ({size} bytes, max {max})")]
    BodyTooLarge { size: usize, max: usize },

    /// A response line grew past the configured limit without a terminator.
    #[error("response line exceeds {max} bytes")]
    LineTooLong { max: usize },

    /// A job body was not followed by CRLF.
    #[error("job body not terminated by CRLF")]
    MissingCrlf,

    /// The tube name is rejected by the protocol.
    #[error("invalid tube name {name:?}: {reason}")]
    InvalidTubeName { name: String, reason: &'static str },

    /// An I/O error occurred while reading or writing.
    #[error("protocol I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete response was received.
    #[error("connection closed (incomplete response)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, ProtoError>;
