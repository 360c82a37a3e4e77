use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, warn};
use tubewire_proto::{ProtoConfig, DEFAULT_PRIORITY, DEFAULT_TTR, DEFAULT_TUBE};

use crate::beanstalk::BeanstalkClient;
use crate::daemon::Daemon;
use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::memory::MemoryBroker;

/// Default interval between zero-timeout reserves for sub-second waits.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Configuration for opening a [`Connection`].
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Timeout for establishing the TCP link. Default: 5s.
    pub connect_timeout: Option<Duration>,
    /// Write timeout on the TCP link. Default: none.
    pub write_timeout: Option<Duration>,
    /// Poll interval for the fractional part of reserve timeouts. Default: 10ms.
    pub poll_interval: Duration,
    /// Priority given to every put job. Default: 65536.
    pub priority: u32,
    /// Time-to-run given to every put job, in seconds. Default: 120.
    pub ttr: u32,
    /// Protocol limits.
    pub proto: ProtoConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(5)),
            write_timeout: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            priority: DEFAULT_PRIORITY,
            ttr: DEFAULT_TTR,
            proto: ProtoConfig::default(),
        }
    }
}

/// A connection shared between channel handles.
///
/// The mutex is the external synchronisation a [`Connection`] requires; the
/// link closes when the last holder drops its `Arc`.
pub type SharedConnection<D = Box<dyn Daemon>> = Arc<Mutex<Connection<D>>>;

/// One physical link to a queue daemon, multiplexed across tubes.
///
/// Writes select their tube on every call. Reads keep exactly one tube
/// watched and only talk to the daemon about watching when the requested
/// tube changes.
///
/// Not safe for concurrent use: every operation takes `&mut self`, and
/// callers sharing one connection must serialise access themselves (see
/// [`SharedConnection`]).
pub struct Connection<D = Box<dyn Daemon>> {
    endpoint: Endpoint,
    daemon: Option<D>,
    watching: Option<String>,
}

impl Connection {
    /// Open a connection to `endpoint` with default configuration.
    pub fn open(endpoint: &Endpoint) -> Result<Self> {
        Self::open_with_config(endpoint, &ConnectionConfig::default())
    }

    /// Open a connection to `endpoint` with explicit configuration.
    pub fn open_with_config(endpoint: &Endpoint, config: &ConnectionConfig) -> Result<Self> {
        let daemon: Box<dyn Daemon> = match endpoint {
            Endpoint::Tcp { host, port } => Box::new(BeanstalkClient::connect(host, *port, config)?),
            Endpoint::Memory(name) => Box::new(
                MemoryBroker::named(name)
                    .session()
                    .with_max_body_size(config.proto.max_body_size),
            ),
        };
        Ok(Self::from_daemon(endpoint.clone(), daemon))
    }

    /// Parse `url` and open a connection to it.
    pub fn open_url(url: &str) -> Result<Self> {
        Self::open(&url.parse()?)
    }
}

impl<D: Daemon> Connection<D> {
    /// Wrap an already established daemon session.
    pub fn from_daemon(endpoint: Endpoint, daemon: D) -> Self {
        debug!(%endpoint, transport = daemon.transport_name(), "connection opened");
        Self {
            endpoint,
            daemon: Some(daemon),
            watching: None,
        }
    }

    /// Move this connection behind a shared handle.
    pub fn into_shared(self) -> SharedConnection<D> {
        Arc::new(Mutex::new(self))
    }

    /// The endpoint this connection was opened against.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Canonical URL of the endpoint.
    pub fn url(&self) -> String {
        self.endpoint.to_string()
    }

    /// The tube reads are currently watching, if one was selected.
    pub fn watching(&self) -> Option<&str> {
        self.watching.as_deref()
    }

    /// True until the connection is closed or its link breaks.
    pub fn is_open(&self) -> bool {
        self.daemon.is_some()
    }

    /// Write `body` as a job into `tube`. Returns the job id.
    pub fn put(&mut self, tube: &str, body: &[u8]) -> Result<u64> {
        self.with_daemon(|daemon| {
            daemon.use_tube(tube)?;
            daemon.put(body)
        })
        .inspect(|id| debug!(tube, id, size = body.len(), "job put"))
    }

    /// True if a job is ready in `tube` (non-blocking).
    ///
    /// Switches the watched tube like [`Connection::get`] does, so a
    /// following `get` on the same tube needs no watch traffic.
    pub fn waiting(&mut self, tube: &str) -> Result<bool> {
        self.switch_watch(tube)?;
        self.with_daemon(|daemon| {
            daemon.use_tube(tube)?;
            Ok(daemon.peek_ready()?.is_some())
        })
    }

    /// Remove and return the next job body from `tube`.
    ///
    /// The job is deleted at the daemon before its body is returned, so it is
    /// never redelivered, even if the caller fails to process it. A timed-out
    /// call keeps the watch switch it made.
    pub fn get(&mut self, tube: &str, timeout: Option<Duration>) -> Result<Bytes> {
        self.switch_watch(tube)?;
        let job = self.with_daemon(|daemon| daemon.reserve(timeout))?;
        self.with_daemon(|daemon| daemon.delete(job.id))?;
        debug!(tube, id = job.id, size = job.body.len(), "job taken");
        Ok(job.body)
    }

    /// Drop the daemon session. Idempotent.
    pub fn close(&mut self) {
        if self.daemon.take().is_some() {
            debug!(endpoint = %self.endpoint, "connection closed");
        }
        self.watching = None;
    }

    fn switch_watch(&mut self, tube: &str) -> Result<()> {
        if self.watching.as_deref() == Some(tube) {
            return Ok(());
        }
        // Watch first: the daemon refuses to ignore its last watched tube.
        let previous = self.watching.as_deref().unwrap_or(DEFAULT_TUBE).to_string();
        self.with_daemon(|daemon| {
            daemon.watch(tube)?;
            if previous != tube {
                daemon.ignore(&previous)?;
            }
            Ok(())
        })?;
        debug!(from = %previous, to = tube, "watch switched");
        self.watching = Some(tube.to_string());
        Ok(())
    }

    fn with_daemon<T>(&mut self, op: impl FnOnce(&mut D) -> Result<T>) -> Result<T> {
        let daemon = self.daemon.as_mut().ok_or(TransportError::Closed)?;
        let result = op(daemon);
        if let Err(err) = &result {
            if err.is_link_failure() {
                warn!(endpoint = %self.endpoint, error = %err, "link failed; closing connection");
                self.close();
            }
        }
        result
    }
}

impl<D> std::fmt::Debug for Connection<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint.to_string())
            .field("open", &self.daemon.is_some())
            .field("watching", &self.watching)
            .finish()
    }
}
