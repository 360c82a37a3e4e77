//! Transport-agnostic message channels over queue-daemon tubes.
//!
//! tubewire lets application code put and get structured messages, channel
//! handles included, without depending on the transport underneath.
//!
//! # Crate Structure
//!
//! - [`proto`]: beanstalk text protocol (commands, responses, blocking reader/writer)
//! - [`transport`]: daemon sessions (TCP and in-process) and the tube-multiplexing connection
//! - [`channel`]: the channel contract, messages, identifiers and codecs
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use tubewire::{beanstalk, Channel, GetOptions, Message};
//!
//! let mut outbox = beanstalk("memory://doc-example", Some("greetings"))?;
//! let mut inbox = beanstalk("memory://doc-example", Some("greetings"))?;
//!
//! outbox.put(&Message::from("hello"))?;
//! let message = inbox.get(GetOptions::timeout(Duration::from_millis(100)))?;
//! assert_eq!(message.as_str(), Some("hello"));
//! # Ok::<(), tubewire::ChannelError>(())
//! ```

/// Re-export protocol types.
pub mod proto {
    pub use tubewire_proto::*;
}

/// Re-export transport types.
pub mod transport {
    pub use tubewire_transport::*;
}

/// Re-export channel types.
pub mod channel {
    pub use tubewire_channel::*;
}

pub use tubewire_channel::{
    beanstalk, beanstalk_with_config, BeanstalkChannel, Channel, ChannelError, GetOptions,
    Identifier, Message,
};
