use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tracing::trace;

use crate::command::{encode_command, Command};
use crate::error::{ProtoError, Result};
use crate::response::ProtoConfig;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete commands to any `Write` stream.
pub struct CommandWriter<T> {
    inner: T,
    buf: BytesMut,
    config: ProtoConfig,
}

impl<T: Write> CommandWriter<T> {
    /// Create a new command writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, ProtoConfig::default())
    }

    /// Create a new command writer with explicit configuration.
    pub fn with_config(inner: T, config: ProtoConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Encode and send a command (blocking).
    pub fn send(&mut self, command: &Command<'_>) -> Result<()> {
        if let Command::Put { body, .. } = command {
            if body.len() > self.config.max_body_size {
                return Err(ProtoError::BodyTooLarge {
                    size: body.len(),
                    max: self.config.max_body_size,
                });
            }
        }

        self.buf.clear();
        encode_command(command, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(ProtoError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(ProtoError::Io(err)),
            }
        }

        trace!(verb = command.verb(), size = self.buf.len(), "command sent");
        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(ProtoError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current command writer configuration.
    pub fn config(&self) -> &ProtoConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;

    fn written(writer: CommandWriter<Cursor<Vec<u8>>>) -> Vec<u8> {
        writer.into_inner().into_inner()
    }

    #[test]
    fn write_single_command() {
        let mut writer = CommandWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(&Command::Watch("jobs")).unwrap();
        assert_eq!(written(writer), b"watch jobs\r\n");
    }

    #[test]
    fn write_command_sequence() {
        let mut writer = CommandWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(&Command::Use("jobs")).unwrap();
        writer
            .send(&Command::Put {
                priority: 10,
                delay: 0,
                ttr: 60,
                body: b"{}",
            })
            .unwrap();
        writer.send(&Command::Quit).unwrap();

        assert_eq!(
            written(writer),
            b"use jobs\r\nput 10 0 60 2\r\n{}\r\nquit\r\n"
        );
    }

    #[test]
    fn body_too_large_rejected() {
        let cfg = ProtoConfig {
            max_body_size: 4,
            ..ProtoConfig::default()
        };
        let mut writer = CommandWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);

        let err = writer
            .send(&Command::Put {
                priority: 0,
                delay: 0,
                ttr: 1,
                body: b"oversized",
            })
            .unwrap_err();
        assert!(matches!(err, ProtoError::BodyTooLarge { size: 9, max: 4 }));
        assert!(written(writer).is_empty());
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = CommandWriter::new(sink);

        writer.send(&Command::PeekReady).unwrap();

        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let mut writer = CommandWriter::new(InterruptedOnce::default());
        writer.send(&Command::Reserve).unwrap();
        assert_eq!(writer.into_inner().data, b"reserve\r\n");
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = CommandWriter::new(ZeroWriter);
        let err = writer.send(&Command::Reserve).unwrap_err();
        assert!(matches!(err, ProtoError::ConnectionClosed));
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct InterruptedOnce {
        wrote_once: bool,
        flushed_once: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedOnce {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flushed_once {
                self.flushed_once = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
