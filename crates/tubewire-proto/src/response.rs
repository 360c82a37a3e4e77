use bytes::{Buf, Bytes, BytesMut};

use crate::command::CRLF;
use crate::error::{ProtoError, Result};

/// Default maximum job body size: 65535 bytes, the daemon's default `-z`.
pub const DEFAULT_MAX_BODY: usize = 65_535;

/// Default maximum length of a response line (without body).
pub const DEFAULT_MAX_LINE: usize = 1024;

/// A job handed out by `reserve` or `peek-ready`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Daemon-assigned job id.
    pub id: u64,
    /// Job body.
    pub body: Bytes,
}

/// A daemon response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Using(String),
    Inserted(u64),
    Buried(u64),
    Watching(u32),
    Reserved(Job),
    Found(Job),
    Deleted,
    NotFound,
    NotIgnored,
    TimedOut,
    DeadlineSoon,
    ExpectedCrlf,
    JobTooBig,
    Draining,
    OutOfMemory,
    InternalError,
    BadFormat,
    UnknownCommand,
}

impl Response {
    /// True for the generic error replies any command may receive.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Response::OutOfMemory
                | Response::InternalError
                | Response::BadFormat
                | Response::UnknownCommand
        )
    }
}

/// Configuration for response decoding.
#[derive(Debug, Clone)]
pub struct ProtoConfig {
    /// Maximum job body size in bytes. Default: 65535.
    pub max_body_size: usize,
    /// Maximum response line length in bytes. Default: 1024.
    pub max_line_len: usize,
}

impl Default for ProtoConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY,
            max_line_len: DEFAULT_MAX_LINE,
        }
    }
}

/// Decode one response from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete response yet.
/// On success, consumes the response bytes (line and body) from the buffer.
pub fn decode_response(src: &mut BytesMut, config: &ProtoConfig) -> Result<Option<Response>> {
    let Some(line_end) = find_crlf(src) else {
        if src.len() > config.max_line_len {
            return Err(ProtoError::LineTooLong {
                max: config.max_line_len,
            });
        }
        return Ok(None);
    };

    let line = std::str::from_utf8(&src[..line_end])
        .map_err(|_| {
            ProtoError::InvalidResponse(String::from_utf8_lossy(&src[..line_end]).into_owned())
        })?
        .to_string();
    let mut parts = line.split(' ');
    let word = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();
    let invalid = || ProtoError::InvalidResponse(line.clone());

    let simple = match (word, args.as_slice()) {
        ("USING", [tube]) => Some(Response::Using((*tube).to_string())),
        ("INSERTED", [id]) => Some(Response::Inserted(id.parse().map_err(|_| invalid())?)),
        ("BURIED", [id]) => Some(Response::Buried(id.parse().map_err(|_| invalid())?)),
        ("WATCHING", [count]) => Some(Response::Watching(
            count.parse().map_err(|_| invalid())?,
        )),
        ("DELETED", []) => Some(Response::Deleted),
        ("NOT_FOUND", []) => Some(Response::NotFound),
        ("NOT_IGNORED", []) => Some(Response::NotIgnored),
        ("TIMED_OUT", []) => Some(Response::TimedOut),
        ("DEADLINE_SOON", []) => Some(Response::DeadlineSoon),
        ("EXPECTED_CRLF", []) => Some(Response::ExpectedCrlf),
        ("JOB_TOO_BIG", []) => Some(Response::JobTooBig),
        ("DRAINING", []) => Some(Response::Draining),
        ("OUT_OF_MEMORY", []) => Some(Response::OutOfMemory),
        ("INTERNAL_ERROR", []) => Some(Response::InternalError),
        ("BAD_FORMAT", []) => Some(Response::BadFormat),
        ("UNKNOWN_COMMAND", []) => Some(Response::UnknownCommand),
        ("RESERVED" | "FOUND", [_, _]) => None,
        _ => return Err(invalid()),
    };

    if let Some(response) = simple {
        src.advance(line_end + CRLF.len());
        return Ok(Some(response));
    }

    // RESERVED <id> <bytes> / FOUND <id> <bytes>, followed by the body.
    let id: u64 = args[0].parse().map_err(|_| invalid())?;
    let size: usize = args[1].parse().map_err(|_| invalid())?;
    if size > config.max_body_size {
        return Err(ProtoError::BodyTooLarge {
            size,
            max: config.max_body_size,
        });
    }

    let body_start = line_end + CRLF.len();
    let total = body_start + size + CRLF.len();
    if src.len() < total {
        return Ok(None); // Need more data
    }
    if &src[body_start + size..total] != CRLF {
        return Err(ProtoError::MissingCrlf);
    }

    src.advance(body_start);
    let body = src.split_to(size).freeze();
    src.advance(CRLF.len());

    let job = Job { id, body };
    Ok(Some(if word == "RESERVED" {
        Response::Reserved(job)
    } else {
        Response::Found(job)
    }))
}

fn find_crlf(src: &[u8]) -> Option<usize> {
    src.windows(CRLF.len()).position(|w| w == CRLF)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Result<Option<Response>> {
        let mut buf = BytesMut::from(bytes);
        decode_response(&mut buf, &ProtoConfig::default())
    }

    #[test]
    fn decodes_simple_responses() {
        assert_eq!(
            decode(b"USING jobs\r\n").unwrap(),
            Some(Response::Using("jobs".into()))
        );
        assert_eq!(
            decode(b"INSERTED 17\r\n").unwrap(),
            Some(Response::Inserted(17))
        );
        assert_eq!(
            decode(b"WATCHING 2\r\n").unwrap(),
            Some(Response::Watching(2))
        );
        assert_eq!(decode(b"TIMED_OUT\r\n").unwrap(), Some(Response::TimedOut));
        assert_eq!(
            decode(b"NOT_IGNORED\r\n").unwrap(),
            Some(Response::NotIgnored)
        );
        assert_eq!(decode(b"DELETED\r\n").unwrap(), Some(Response::Deleted));
    }

    #[test]
    fn decodes_reserved_job_with_body() {
        let mut buf = BytesMut::from(&b"RESERVED 5 5\r\nhello\r\n"[..]);
        let response = decode_response(&mut buf, &ProtoConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(
            response,
            Response::Reserved(Job {
                id: 5,
                body: Bytes::from_static(b"hello"),
            })
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn body_may_contain_crlf() {
        let response = decode(b"FOUND 1 4\r\na\r\nb\r\n").unwrap().unwrap();
        assert_eq!(
            response,
            Response::Found(Job {
                id: 1,
                body: Bytes::from_static(b"a\r\nb"),
            })
        );
    }

    #[test]
    fn incomplete_line_needs_more_data() {
        assert_eq!(decode(b"INSERT").unwrap(), None);
        assert_eq!(decode(b"").unwrap(), None);
    }

    #[test]
    fn incomplete_body_leaves_buffer_untouched() {
        let mut buf = BytesMut::from(&b"RESERVED 5 10\r\nhel"[..]);
        let result = decode_response(&mut buf, &ProtoConfig::default()).unwrap();
        assert!(result.is_none());
        assert_eq!(buf.len(), 18);
    }

    #[test]
    fn missing_body_terminator() {
        let err = decode(b"RESERVED 5 2\r\nhiXX").unwrap_err();
        assert!(matches!(err, ProtoError::MissingCrlf));
    }

    #[test]
    fn oversized_body_rejected_before_buffering() {
        let cfg = ProtoConfig {
            max_body_size: 4,
            ..ProtoConfig::default()
        };
        let mut buf = BytesMut::from(&b"RESERVED 1 1024\r\n"[..]);
        let err = decode_response(&mut buf, &cfg).unwrap_err();
        assert!(matches!(err, ProtoError::BodyTooLarge { size: 1024, max: 4 }));
    }

    #[test]
    fn unknown_response_is_invalid() {
        assert!(matches!(
            decode(b"HELLO there\r\n"),
            Err(ProtoError::InvalidResponse(_))
        ));
        assert!(matches!(
            decode(b"INSERTED abc\r\n"),
            Err(ProtoError::InvalidResponse(_))
        ));
    }

    #[test]
    fn runaway_line_rejected() {
        let cfg = ProtoConfig {
            max_line_len: 8,
            ..ProtoConfig::default()
        };
        let mut buf = BytesMut::from(&b"WATCHING 123456789"[..]);
        let err = decode_response(&mut buf, &cfg).unwrap_err();
        assert!(matches!(err, ProtoError::LineTooLong { max: 8 }));
    }

    #[test]
    fn multiple_responses_in_buffer() {
        let mut buf = BytesMut::from(&b"WATCHING 2\r\nWATCHING 1\r\n"[..]);
        let cfg = ProtoConfig::default();
        assert_eq!(
            decode_response(&mut buf, &cfg).unwrap(),
            Some(Response::Watching(2))
        );
        assert_eq!(
            decode_response(&mut buf, &cfg).unwrap(),
            Some(Response::Watching(1))
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn server_errors_classified() {
        assert!(Response::BadFormat.is_server_error());
        assert!(Response::UnknownCommand.is_server_error());
        assert!(!Response::TimedOut.is_server_error());
    }
}
