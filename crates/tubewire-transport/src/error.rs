use tubewire_proto::ProtoError;

/// Errors that can occur in queue-daemon transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to connect to the endpoint.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// The endpoint address could not be parsed.
    #[error("invalid endpoint address {0:?}")]
    InvalidEndpoint(String),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The daemon sent something the protocol layer could not accept.
    #[error("protocol error: {0}")]
    Proto(#[from] ProtoError),

    /// No job became ready before the reserve timeout expired.
    #[error("timed out waiting for a job")]
    TimedOut,

    /// A reserved job's time-to-run is about to expire.
    #[error("deadline soon for a reserved job")]
    DeadlineSoon,

    /// The daemon rejected the job body as too large.
    #[error("job too big for the daemon")]
    JobTooBig,

    /// The daemon is draining and accepts no new jobs.
    #[error("daemon is draining")]
    Draining,

    /// The daemon accepted the job but buried it (it ran out of memory).
    #[error("job {0} was buried by the daemon")]
    Buried(u64),

    /// The daemon refused to ignore the last watched tube.
    #[error("daemon refused to ignore tube {tube:?} (last watched tube)")]
    NotIgnored { tube: String },

    /// The job does not exist or is not reserved by this session.
    #[error("job {0} not found")]
    JobNotFound(u64),

    /// The daemon answered a command with an unexpected response.
    #[error("unexpected response to {command}: {response}")]
    Unexpected {
        command: &'static str,
        response: String,
    },

    /// The connection has been closed.
    #[error("connection closed")]
    Closed,
}

impl TransportError {
    /// True when the physical link can no longer be trusted.
    ///
    /// Timeouts, daemon-level refusals and names rejected before sending leave
    /// the link usable. I/O failures and broken replies do not.
    pub fn is_link_failure(&self) -> bool {
        match self {
            TransportError::Proto(ProtoError::InvalidTubeName { .. }) => false,
            TransportError::Io(_)
            | TransportError::Proto(_)
            | TransportError::Unexpected { .. }
            | TransportError::Connect { .. } => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
