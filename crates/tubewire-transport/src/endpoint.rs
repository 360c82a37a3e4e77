use std::fmt;
use std::str::FromStr;

use tubewire_proto::DEFAULT_PORT;

use crate::error::TransportError;

/// URL scheme for TCP daemons.
pub const BEANSTALK_SCHEME: &str = "beanstalk://";

/// URL scheme for in-process brokers.
pub const MEMORY_SCHEME: &str = "memory://";

/// Where a queue daemon lives.
///
/// Accepted forms:
/// - `beanstalk://host[:port]` or bare `host[:port]`: TCP daemon, port 11300 by default
/// - `memory://<name>`: named in-process broker
///
/// `Display` renders the canonical URL, which round-trips through `FromStr`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    Memory(String),
}

impl Endpoint {
    /// TCP endpoint on the default port.
    pub fn tcp(host: impl Into<String>) -> Self {
        Self::Tcp {
            host: host.into(),
            port: DEFAULT_PORT,
        }
    }

    /// Named in-process endpoint.
    pub fn memory(name: impl Into<String>) -> Self {
        Self::Memory(name.into())
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match self {
            Endpoint::Tcp { .. } => "beanstalk-tcp",
            Endpoint::Memory(_) => "memory",
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = || TransportError::InvalidEndpoint(input.to_string());
        let trimmed = input.trim();

        if let Some(name) = trimmed.strip_prefix(MEMORY_SCHEME) {
            if name.is_empty() {
                return Err(invalid());
            }
            return Ok(Self::Memory(name.to_string()));
        }

        let authority = trimmed.strip_prefix(BEANSTALK_SCHEME).unwrap_or(trimmed);
        let authority = authority.strip_suffix('/').unwrap_or(authority);
        if authority.is_empty()
            || authority.contains("://")
            || authority.contains(['/', ' ', '\t'])
        {
            return Err(invalid());
        }

        let (host, port) = if let Some(rest) = authority.strip_prefix('[') {
            // [v6-address]:port
            let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
            let port = match tail {
                "" => DEFAULT_PORT,
                _ => tail
                    .strip_prefix(':')
                    .and_then(|p| p.parse().ok())
                    .ok_or_else(invalid)?,
            };
            (host, port)
        } else {
            match authority.rsplit_once(':') {
                Some((host, port)) if !host.contains(':') => {
                    (host, port.parse().map_err(|_| invalid())?)
                }
                Some(_) => return Err(invalid()),
                None => (authority, DEFAULT_PORT),
            }
        };

        if host.is_empty() {
            return Err(invalid());
        }
        Ok(Self::Tcp {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp { host, port } if host.contains(':') => {
                write!(f, "{BEANSTALK_SCHEME}[{host}]:{port}")
            }
            Endpoint::Tcp { host, port } => write!(f, "{BEANSTALK_SCHEME}{host}:{port}"),
            Endpoint::Memory(name) => write!(f, "{MEMORY_SCHEME}{name}"),
        }
    }
}
