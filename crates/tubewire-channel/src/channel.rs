use std::fmt;
use std::time::Duration;

use crate::error::{ChannelError, Result};
use crate::identifier::Identifier;
use crate::message::Message;

/// Options for [`Channel::get`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// How long to wait for a message. `None` blocks until one arrives.
    pub timeout: Option<Duration>,
}

impl GetOptions {
    /// Block until a message arrives.
    pub fn blocking() -> Self {
        Self::default()
    }

    /// Wait at most `timeout` for a message.
    pub fn timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// A uniform put/get endpoint over some message transport.
///
/// Messages are delivered in FIFO order per destination. A channel handle
/// can itself travel inside a [`Message`]: codecs replace it with its
/// [`Identifier`] on the way out and resolve the identifier into a fresh
/// handle to the same destination on the way in.
///
/// `is_waiting` and `identifier` have fallback bodies that fail with
/// [`ChannelError::Unimplemented`], for variants where the operation has no
/// meaning. Everything else must be provided.
pub trait Channel: Send + fmt::Debug {
    /// Enqueue a message.
    fn put(&mut self, message: &Message) -> Result<()>;

    /// Dequeue the next message, waiting as `options` allow.
    fn get(&mut self, options: GetOptions) -> Result<Message>;

    /// True if a message is ready to be read. Never blocks.
    fn is_waiting(&mut self) -> Result<bool> {
        Err(ChannelError::unimplemented(self.kind(), "is_waiting"))
    }

    /// True while the channel can still reach its transport.
    fn is_connected(&self) -> bool;

    /// Release the channel's hold on its transport. Idempotent.
    ///
    /// After closing, `put` and `get` fail with [`ChannelError::Closed`].
    fn close(&mut self) -> Result<()>;

    /// A serializable description that resolves back to this destination.
    fn identifier(&self) -> Result<Identifier> {
        Err(ChannelError::unimplemented(self.kind(), "identifier"))
    }

    /// Variant name used in diagnostics.
    fn kind(&self) -> &'static str;

    /// A second handle to the same destination.
    fn try_clone(&self) -> Result<Box<dyn Channel>>;
}

impl<C: Channel + ?Sized> Channel for Box<C> {
    fn put(&mut self, message: &Message) -> Result<()> {
        (**self).put(message)
    }

    fn get(&mut self, options: GetOptions) -> Result<Message> {
        (**self).get(options)
    }

    fn is_waiting(&mut self) -> Result<bool> {
        (**self).is_waiting()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn identifier(&self) -> Result<Identifier> {
        (**self).identifier()
    }

    fn kind(&self) -> &'static str {
        (**self).kind()
    }

    fn try_clone(&self) -> Result<Box<dyn Channel>> {
        (**self).try_clone()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    /// A variant that only provides the required operations.
    #[derive(Debug, Default, Clone)]
    struct Loopback {
        queue: VecDeque<i64>,
        closed: bool,
    }

    impl Channel for Loopback {
        fn put(&mut self, message: &Message) -> Result<()> {
            let value = message
                .as_i64()
                .ok_or_else(|| ChannelError::Direction("loopback carries integers only".into()))?;
            self.queue.push_back(value);
            Ok(())
        }

        fn get(&mut self, options: GetOptions) -> Result<Message> {
            self.queue
                .pop_front()
                .map(Message::Int)
                .ok_or_else(|| ChannelError::Timeout {
                    tube: "loopback".into(),
                    timeout: options.timeout.unwrap_or_default(),
                })
        }

        fn is_connected(&self) -> bool {
            !self.closed
        }

        fn close(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }

        fn kind(&self) -> &'static str {
            "loopback"
        }

        fn try_clone(&self) -> Result<Box<dyn Channel>> {
            Ok(Box::new(self.clone()))
        }
    }

    #[test]
    fn fallback_operations_name_the_variant() {
        let mut channel = Loopback::default();

        match channel.is_waiting() {
            Err(ChannelError::Unimplemented {
                variant, method, ..
            }) => {
                assert_eq!(variant, "loopback");
                assert_eq!(method, "is_waiting");
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert!(matches!(
            channel.identifier(),
            Err(ChannelError::Unimplemented {
                method: "identifier",
                ..
            })
        ));
    }

    #[test]
    fn boxed_channels_delegate() {
        let mut boxed: Box<dyn Channel> = Box::new(Loopback::default());
        boxed.put(&Message::Int(7)).unwrap();
        assert_eq!(boxed.get(GetOptions::blocking()).unwrap(), Message::Int(7));
        assert!(boxed.put(&Message::from("text")).is_err());

        boxed.close().unwrap();
        assert!(!boxed.is_connected());
        assert_eq!(boxed.kind(), "loopback");
    }

    #[test]
    fn boxed_fallback_trace_skips_the_forwarding_frame() {
        let mut boxed: Box<dyn Channel> = Box::new(Loopback::default());
        match boxed.is_waiting() {
            Err(ChannelError::Unimplemented { trace, .. }) => {
                assert!(!trace.lines().any(|line| line.contains("Box<")
                    && line.contains("as tubewire_channel::channel::Channel>::")));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn get_options_constructors() {
        assert_eq!(GetOptions::blocking().timeout, None);
        assert_eq!(
            GetOptions::timeout(Duration::from_secs(1)).timeout,
            Some(Duration::from_secs(1))
        );
    }
}
