use std::backtrace::Backtrace;
use std::time::Duration;

use tubewire_transport::TransportError;

/// Errors that can occur in channel operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// No message arrived before the timeout expired.
    #[error("no messages waiting in {tube:?} after {timeout:?}")]
    Timeout { tube: String, timeout: Duration },

    /// The operation is not allowed in this channel's direction.
    #[error("direction error: {0}")]
    Direction(String),

    /// The link to the transport failed. The channel is no longer connected.
    #[error("communication error: {0}")]
    Communication(TransportError),

    /// The transport refused this request but the link stays usable.
    #[error("request rejected: {0}")]
    Rejected(TransportError),

    /// The channel variant does not provide this operation.
    #[error("{variant} channel does not implement {method}\n{trace}")]
    Unimplemented {
        variant: &'static str,
        method: &'static str,
        trace: String,
    },

    /// An identifier was asked to resolve within a context.
    #[error("resolving an identifier within a context is not supported")]
    UnsupportedContext,

    /// The channel has been closed.
    #[error("channel on tube {tube:?} is closed")]
    Closed { tube: String },

    /// A message could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl ChannelError {
    /// Build a [`ChannelError::Unimplemented`] carrying the caller's backtrace.
    pub fn unimplemented(variant: &'static str, method: &'static str) -> Self {
        Self::Unimplemented {
            variant,
            method,
            trace: caller_trace(),
        }
    }

    /// True if no message arrived in time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ChannelError::Timeout { .. })
    }
}

impl From<TransportError> for ChannelError {
    fn from(err: TransportError) -> Self {
        if err.is_link_failure() || matches!(err, TransportError::Closed) {
            ChannelError::Communication(err)
        } else {
            ChannelError::Rejected(err)
        }
    }
}

/// Frames of the capture machinery and of the trait's fallback bodies.
const INTERNAL_FRAMES: [&str; 3] = [
    "std::backtrace",
    "tubewire_channel::error::",
    "tubewire_channel::channel::Channel::",
];

/// The `Box<C>` forwarding impl, matched on both halves of its symbol.
const BOX_FORWARDING: (&str, &str) = ("Box<", "as tubewire_channel::channel::Channel>::");

fn is_internal(frame: &str) -> bool {
    INTERNAL_FRAMES.iter().any(|pattern| frame.contains(pattern))
        || (frame.contains(BOX_FORWARDING.0) && frame.contains(BOX_FORWARDING.1))
}

/// The current backtrace, rendered without its internal frames.
fn caller_trace() -> String {
    let rendered = Backtrace::force_capture().to_string();
    let mut trace = String::with_capacity(rendered.len());
    let mut keep = true;
    for line in rendered.lines() {
        let trimmed = line.trim_start();
        let starts_frame = trimmed
            .split_once(':')
            .is_some_and(|(n, _)| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
        if starts_frame {
            keep = !is_internal(trimmed);
        }
        if keep {
            trace.push_str(line);
            trace.push('\n');
        }
    }
    trace
}

/// Errors raised while turning messages into bytes and back.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The value has no representation in the target form.
    #[error("unrepresentable value: {0}")]
    Unrepresentable(String),

    /// An identifier names a codec this process has not registered.
    #[error("unknown codec {0:?}")]
    UnknownCodec(String),
}

pub type Result<T> = std::result::Result<T, ChannelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unimplemented_names_variant_and_method() {
        let err = ChannelError::unimplemented("pipe", "identifier");
        let rendered = err.to_string();
        assert!(rendered.starts_with("pipe channel does not implement identifier"));
        match err {
            ChannelError::Unimplemented { trace, .. } => assert!(!trace.is_empty()),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn forwarding_frames_are_filtered() {
        assert!(is_internal(
            "4: <alloc::boxed::Box<C> as tubewire_channel::channel::Channel>::is_waiting"
        ));
        assert!(!is_internal(
            "4: <my_app::Pipe as tubewire_channel::channel::Channel>::identifier"
        ));
        assert!(!is_internal("9: my_app::main"));
    }

    #[test]
    fn link_failures_and_refusals_are_told_apart() {
        let io = TransportError::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(matches!(ChannelError::from(io), ChannelError::Communication(_)));
        assert!(matches!(
            ChannelError::from(TransportError::Closed),
            ChannelError::Communication(TransportError::Closed)
        ));
        assert!(matches!(
            ChannelError::from(TransportError::JobTooBig),
            ChannelError::Rejected(TransportError::JobTooBig)
        ));
        assert!(matches!(
            ChannelError::from(TransportError::InvalidEndpoint("x".into())),
            ChannelError::Rejected(_)
        ));
    }

    #[test]
    fn timeout_names_tube() {
        let err = ChannelError::Timeout {
            tube: "jobs".into(),
            timeout: Duration::from_millis(50),
        };
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "no messages waiting in \"jobs\" after 50ms");
    }
}
