use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tracing::trace;

use crate::error::{ProtoError, Result};
use crate::response::{decode_response, ProtoConfig, Response};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete responses from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete responses,
/// job bodies included.
pub struct ResponseReader<T> {
    inner: T,
    buf: BytesMut,
    config: ProtoConfig,
}

impl<T: Read> ResponseReader<T> {
    /// Create a new response reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, ProtoConfig::default())
    }

    /// Create a new response reader with explicit configuration.
    pub fn with_config(inner: T, config: ProtoConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete response (blocking).
    ///
    /// Returns `Err(ProtoError::ConnectionClosed)` when EOF is reached.
    pub fn read_response(&mut self) -> Result<Response> {
        loop {
            if let Some(response) = decode_response(&mut self.buf, &self.config)? {
                trace!(?response, "response decoded");
                return Ok(response);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(ProtoError::Io(err)),
            };

            if read == 0 {
                return Err(ProtoError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current response reader configuration.
    pub fn config(&self) -> &ProtoConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::Bytes;

    use super::*;
    use crate::response::Job;

    #[test]
    fn read_single_response() {
        let mut reader = ResponseReader::new(Cursor::new(b"INSERTED 3\r\n".to_vec()));
        assert_eq!(reader.read_response().unwrap(), Response::Inserted(3));
    }

    #[test]
    fn read_multiple_responses() {
        let wire = b"USING jobs\r\nINSERTED 1\r\nRESERVED 1 2\r\nhi\r\nDELETED\r\n".to_vec();
        let mut reader = ResponseReader::new(Cursor::new(wire));

        assert_eq!(
            reader.read_response().unwrap(),
            Response::Using("jobs".into())
        );
        assert_eq!(reader.read_response().unwrap(), Response::Inserted(1));
        assert_eq!(
            reader.read_response().unwrap(),
            Response::Reserved(Job {
                id: 1,
                body: Bytes::from_static(b"hi"),
            })
        );
        assert_eq!(reader.read_response().unwrap(), Response::Deleted);
    }

    #[test]
    fn read_large_body() {
        let body = vec![b'x'; 60 * 1024];
        let mut wire = format!("RESERVED 9 {}\r\n", body.len()).into_bytes();
        wire.extend_from_slice(&body);
        wire.extend_from_slice(b"\r\n");

        let mut reader = ResponseReader::new(Cursor::new(wire));
        match reader.read_response().unwrap() {
            Response::Reserved(job) => {
                assert_eq!(job.id, 9);
                assert_eq!(job.body.as_ref(), body.as_slice());
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn partial_read_handling() {
        let reader = ByteByByteReader {
            bytes: b"FOUND 4 4\r\nslow\r\n".to_vec(),
            pos: 0,
        };
        let mut reader = ResponseReader::new(reader);

        let response = reader.read_response().unwrap();
        assert_eq!(
            response,
            Response::Found(Job {
                id: 4,
                body: Bytes::from_static(b"slow"),
            })
        );
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = ResponseReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_response().unwrap_err();
        assert!(matches!(err, ProtoError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_body() {
        let mut reader = ResponseReader::new(Cursor::new(b"RESERVED 1 16\r\nonly-part".to_vec()));
        let err = reader.read_response().unwrap_err();
        assert!(matches!(err, ProtoError::ConnectionClosed));
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            interrupted: false,
            inner: Cursor::new(b"TIMED_OUT\r\n".to_vec()),
        };
        let mut reader = ResponseReader::new(reader);
        assert_eq!(reader.read_response().unwrap(), Response::TimedOut);
    }

    #[test]
    fn would_block_propagates_io_error() {
        let mut reader = ResponseReader::new(AlwaysWouldBlock);
        let err = reader.read_response().unwrap_err();
        assert!(matches!(err, ProtoError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::CommandWriter::new(left);
        let mut raw = right.try_clone().unwrap();

        writer.send(&crate::command::Command::PeekReady).unwrap();
        let mut line = [0u8; 12];
        raw.read_exact(&mut line).unwrap();
        assert_eq!(&line, b"peek-ready\r\n");

        std::io::Write::write_all(&mut raw, b"NOT_FOUND\r\n").unwrap();
        let mut reader = ResponseReader::new(writer.into_inner());
        assert_eq!(reader.read_response().unwrap(), Response::NotFound);
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }

    struct AlwaysWouldBlock;

    impl Read for AlwaysWouldBlock {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::WouldBlock))
        }
    }
}
