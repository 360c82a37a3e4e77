//! Transport-agnostic message channels.
//!
//! A [`Channel`] puts and gets dynamically typed [`Message`]s without the
//! caller knowing which transport sits underneath. Channels travel inside
//! messages too: they go out as an [`Identifier`] and come back as a fresh
//! handle onto the same destination.
//!
//! [`BeanstalkChannel`] is the queue-daemon variant, one tube per channel,
//! with many channels sharing a single multiplexed connection.

pub mod beanstalk;
pub mod channel;
pub mod codec;
pub mod error;
pub mod identifier;
pub mod message;
pub mod names;
pub mod wire;

pub use beanstalk::{beanstalk, beanstalk_with_config, BeanstalkChannel, ANONYMOUS_BASE};
pub use channel::{Channel, GetOptions};
pub use codec::{codec_by_name, register_codec, JsonCodec, MessageCodec, DEFAULT_CODEC};
pub use error::{ChannelError, CodecError, Result};
pub use identifier::{BeanstalkIdentifier, Identifier, ResolveContext};
pub use message::Message;
pub use names::{NameSource, SequentialNames};
pub use wire::{FromWireData, ToWireData, WireData, WireValue};
