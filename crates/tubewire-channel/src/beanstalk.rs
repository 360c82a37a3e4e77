use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;
use tubewire_proto::validate_tube_name;
use tubewire_transport::{Connection, ConnectionConfig, Endpoint, SharedConnection, TransportError};

use crate::channel::{Channel, GetOptions};
use crate::codec::{register_codec, JsonCodec, MessageCodec};
use crate::error::{ChannelError, Result};
use crate::identifier::Identifier;
use crate::message::Message;
use crate::names::{NameSource, SequentialNames};

/// Base of generated tube names: `beanstalk.anonymous.<suffix>`.
pub const ANONYMOUS_BASE: &str = "beanstalk";

/// A channel bound to one tube of a queue daemon.
///
/// Clones share the connection and the tube. The connection itself closes
/// once the last channel holding it is closed or dropped.
#[derive(Clone)]
pub struct BeanstalkChannel {
    connection: Option<SharedConnection>,
    url: String,
    tube: String,
    codec: Arc<dyn MessageCodec>,
}

impl BeanstalkChannel {
    /// Bind `tube` on an existing connection.
    pub fn new(connection: SharedConnection, tube: impl Into<String>) -> Result<Self> {
        let tube = tube.into();
        validate_tube_name(&tube).map_err(TransportError::from)?;
        let url = connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .url();
        debug!(%url, %tube, "channel opened");
        Ok(Self {
            connection: Some(connection),
            url,
            tube,
            codec: Arc::new(JsonCodec),
        })
    }

    /// Bind a freshly named tube on an existing connection.
    pub fn anonymous(connection: SharedConnection, names: &mut impl NameSource) -> Result<Self> {
        let tube = format!("{ANONYMOUS_BASE}.anonymous.{}", names.next_suffix());
        Self::new(connection, tube)
    }

    /// Use `codec` instead of JSON for this handle.
    ///
    /// The codec is registered process-wide under its name so identifiers
    /// of this channel resolve to handles that speak it too.
    pub fn with_codec(mut self, codec: Arc<dyn MessageCodec>) -> Self {
        register_codec(Arc::clone(&codec));
        self.codec = codec;
        self
    }

    pub fn tube(&self) -> &str {
        &self.tube
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn codec(&self) -> &dyn MessageCodec {
        self.codec.as_ref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        let connection = self.connection.as_ref().ok_or_else(|| ChannelError::Closed {
            tube: self.tube.clone(),
        })?;
        Ok(connection.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Channel for BeanstalkChannel {
    fn put(&mut self, message: &Message) -> Result<()> {
        let body = self.codec.encode(message)?;
        self.lock()?.put(&self.tube, &body)?;
        Ok(())
    }

    fn get(&mut self, options: GetOptions) -> Result<Message> {
        let body = self
            .lock()?
            .get(&self.tube, options.timeout)
            .map_err(|err| match err {
                TransportError::TimedOut => ChannelError::Timeout {
                    tube: self.tube.clone(),
                    timeout: options.timeout.unwrap_or_default(),
                },
                other => other.into(),
            })?;
        // Decoding may open connections for embedded channels; the lock is
        // already released here.
        self.codec.decode(&body)
    }

    fn is_waiting(&mut self) -> Result<bool> {
        Ok(self.lock()?.waiting(&self.tube)?)
    }

    fn is_connected(&self) -> bool {
        self.lock().is_ok_and(|connection| connection.is_open())
    }

    fn close(&mut self) -> Result<()> {
        let Some(connection) = self.connection.take() else {
            return Ok(());
        };
        debug!(url = %self.url, tube = %self.tube, "channel closed");
        if let Ok(last) = Arc::try_unwrap(connection) {
            last.into_inner()
                .unwrap_or_else(PoisonError::into_inner)
                .close();
        }
        Ok(())
    }

    fn identifier(&self) -> Result<Identifier> {
        Ok(Identifier::beanstalk_with_codec(
            &self.url,
            &self.tube,
            self.codec.name(),
        ))
    }

    fn kind(&self) -> &'static str {
        "beanstalk"
    }

    fn try_clone(&self) -> Result<Box<dyn Channel>> {
        Ok(Box::new(self.clone()))
    }
}

impl fmt::Debug for BeanstalkChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanstalkChannel")
            .field("url", &self.url)
            .field("tube", &self.tube)
            .field("codec", &self.codec.name())
            .field("open", &self.connection.is_some())
            .finish()
    }
}

impl From<BeanstalkChannel> for Message {
    fn from(channel: BeanstalkChannel) -> Self {
        Message::Channel(Box::new(channel))
    }
}

/// Open a channel on `tube` at `url` over a new connection.
///
/// Without a tube, the channel gets a generated anonymous name.
pub fn beanstalk(url: &str, tube: Option<&str>) -> Result<BeanstalkChannel> {
    beanstalk_with_config(url, tube, &ConnectionConfig::default())
}

/// [`beanstalk`] with explicit connection configuration.
pub fn beanstalk_with_config(
    url: &str,
    tube: Option<&str>,
    config: &ConnectionConfig,
) -> Result<BeanstalkChannel> {
    let endpoint: Endpoint = url.parse()?;
    let connection = Connection::open_with_config(&endpoint, config)?.into_shared();
    match tube {
        Some(tube) => BeanstalkChannel::new(connection, tube),
        None => BeanstalkChannel::anonymous(connection, &mut SequentialNames::unique()),
    }
}
