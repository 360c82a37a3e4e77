//! Queue-daemon transport for tubewire.
//!
//! Two daemon backends sit behind the [`Daemon`] trait:
//! - [`BeanstalkClient`]: a beanstalkd-compatible daemon over TCP
//! - [`MemoryDaemon`]: an in-process broker, reachable as `memory://<name>`
//!
//! [`Connection`] multiplexes many logical tubes over one daemon session and
//! is the layer channels are built on.

pub mod beanstalk;
pub mod connection;
pub mod daemon;
pub mod endpoint;
pub mod error;
pub mod memory;

pub use beanstalk::BeanstalkClient;
pub use connection::{Connection, ConnectionConfig, SharedConnection, DEFAULT_POLL_INTERVAL};
pub use daemon::Daemon;
pub use endpoint::{Endpoint, BEANSTALK_SCHEME, MEMORY_SCHEME};
pub use error::{Result, TransportError};
pub use memory::{MemoryBroker, MemoryDaemon};
