use std::net::{TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;
use tubewire_proto::{Command, CommandWriter, Job, ProtoError, Response, ResponseReader};

use crate::connection::ConnectionConfig;
use crate::daemon::Daemon;
use crate::error::{Result, TransportError};

/// A session with a beanstalkd-compatible daemon over TCP.
///
/// The protocol only counts whole seconds. The whole-second part of a
/// reserve timeout is delegated to the daemon (`reserve-with-timeout`); any
/// fractional remainder is served by polling with a zero daemon timeout
/// every [`ConnectionConfig::poll_interval`].
pub struct BeanstalkClient {
    reader: ResponseReader<TcpStream>,
    writer: CommandWriter<TcpStream>,
    addr: String,
    config: ConnectionConfig,
}

impl BeanstalkClient {
    /// Connect to a daemon (blocking).
    pub fn connect(host: &str, port: u16, config: &ConnectionConfig) -> Result<Self> {
        let addr = format!("{host}:{port}");
        let connect_err = |source| TransportError::Connect {
            addr: addr.clone(),
            source,
        };

        let mut last_err = None;
        let mut stream = None;
        for candidate in (host, port).to_socket_addrs().map_err(connect_err)? {
            let attempt = match config.connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(&candidate, timeout),
                None => TcpStream::connect(candidate),
            };
            match attempt {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(err) => last_err = Some(err),
            }
        }
        let stream = stream.ok_or_else(|| {
            connect_err(last_err.unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses resolved")
            }))
        })?;

        stream.set_nodelay(true)?;
        stream.set_write_timeout(config.write_timeout)?;
        let reader_stream = stream.try_clone()?;

        debug!(%addr, "connected to beanstalk daemon");
        Ok(Self {
            reader: ResponseReader::with_config(reader_stream, config.proto.clone()),
            writer: CommandWriter::with_config(stream, config.proto.clone()),
            addr,
            config: config.clone(),
        })
    }

    /// The `host:port` this client connected to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn roundtrip(&mut self, command: &Command<'_>) -> Result<Response> {
        self.writer.send(command)?;
        let response = self.reader.read_response()?;
        if response.is_server_error() {
            return Err(unexpected(command, &response));
        }
        Ok(response)
    }

    fn reserve_once(&mut self, command: &Command<'_>) -> Result<Job> {
        match self.roundtrip(command)? {
            Response::Reserved(job) => Ok(job),
            Response::TimedOut => Err(TransportError::TimedOut),
            Response::DeadlineSoon => Err(TransportError::DeadlineSoon),
            other => Err(unexpected(command, &other)),
        }
    }

    fn reserve_polling(&mut self, deadline: Instant) -> Result<Job> {
        loop {
            match self.reserve_once(&Command::ReserveWithTimeout(0)) {
                Err(TransportError::TimedOut) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(TransportError::TimedOut);
                    }
                    thread::sleep(self.config.poll_interval.min(deadline - now));
                }
                other => return other,
            }
        }
    }
}

impl Daemon for BeanstalkClient {
    fn use_tube(&mut self, tube: &str) -> Result<()> {
        let command = Command::Use(tube);
        match self.roundtrip(&command)? {
            Response::Using(used) if used == tube => Ok(()),
            other => Err(unexpected(&command, &other)),
        }
    }

    fn watch(&mut self, tube: &str) -> Result<u32> {
        let command = Command::Watch(tube);
        match self.roundtrip(&command)? {
            Response::Watching(count) => Ok(count),
            other => Err(unexpected(&command, &other)),
        }
    }

    fn ignore(&mut self, tube: &str) -> Result<u32> {
        let command = Command::Ignore(tube);
        match self.roundtrip(&command)? {
            Response::Watching(count) => Ok(count),
            Response::NotIgnored => Err(TransportError::NotIgnored {
                tube: tube.to_string(),
            }),
            other => Err(unexpected(&command, &other)),
        }
    }

    fn put(&mut self, body: &[u8]) -> Result<u64> {
        let command = Command::Put {
            priority: self.config.priority,
            delay: 0,
            ttr: self.config.ttr,
            body,
        };
        let response = match self.roundtrip(&command) {
            Err(TransportError::Proto(ProtoError::BodyTooLarge { .. })) => {
                return Err(TransportError::JobTooBig)
            }
            other => other?,
        };
        match response {
            Response::Inserted(id) => Ok(id),
            Response::Buried(id) => Err(TransportError::Buried(id)),
            Response::JobTooBig => Err(TransportError::JobTooBig),
            Response::Draining => Err(TransportError::Draining),
            other => Err(unexpected(&command, &other)),
        }
    }

    fn reserve(&mut self, timeout: Option<Duration>) -> Result<Job> {
        match timeout {
            None => self.reserve_once(&Command::Reserve),
            Some(t) => {
                let deadline = Instant::now() + t;
                let whole = u32::try_from(t.as_secs()).unwrap_or(u32::MAX);
                if whole > 0 {
                    match self.reserve_once(&Command::ReserveWithTimeout(whole)) {
                        Err(TransportError::TimedOut) if t.subsec_nanos() > 0 => {}
                        other => return other,
                    }
                }
                self.reserve_polling(deadline)
            }
        }
    }

    fn delete(&mut self, id: u64) -> Result<()> {
        let command = Command::Delete(id);
        match self.roundtrip(&command)? {
            Response::Deleted => Ok(()),
            Response::NotFound => Err(TransportError::JobNotFound(id)),
            other => Err(unexpected(&command, &other)),
        }
    }

    fn peek_ready(&mut self) -> Result<Option<Job>> {
        let command = Command::PeekReady;
        match self.roundtrip(&command)? {
            Response::Found(job) => Ok(Some(job)),
            Response::NotFound => Ok(None),
            other => Err(unexpected(&command, &other)),
        }
    }

    fn transport_name(&self) -> &'static str {
        "beanstalk-tcp"
    }
}

impl Drop for BeanstalkClient {
    fn drop(&mut self) {
        // Best effort; the daemon also cleans up on EOF.
        let _ = self.writer.send(&Command::Quit);
        debug!(addr = %self.addr, "closed beanstalk session");
    }
}

fn unexpected(command: &Command<'_>, response: &Response) -> TransportError {
    TransportError::Unexpected {
        command: command.verb(),
        response: format!("{response:?}"),
    }
}
