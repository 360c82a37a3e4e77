use bytes::{BufMut, BytesMut};

use crate::error::{ProtoError, Result};
use crate::tube::validate_tube_name;

/// Line terminator for commands, responses and job bodies.
pub const CRLF: &[u8] = b"\r\n";

/// A client command understood by the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// Select the tube subsequent `put`s go to.
    Use(&'a str),
    /// Insert a job into the used tube.
    Put {
        priority: u32,
        delay: u32,
        ttr: u32,
        body: &'a [u8],
    },
    /// Add a tube to the watch list.
    Watch(&'a str),
    /// Remove a tube from the watch list.
    Ignore(&'a str),
    /// Reserve a job from the watched tubes, blocking indefinitely.
    Reserve,
    /// Reserve a job, giving up after the given number of seconds.
    ReserveWithTimeout(u32),
    /// Delete a job by id.
    Delete(u64),
    /// Peek at the next ready job in the used tube.
    PeekReady,
    /// Close the connection.
    Quit,
}

impl Command<'_> {
    /// Protocol verb, used for diagnostics.
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Use(_) => "use",
            Command::Put { .. } => "put",
            Command::Watch(_) => "watch",
            Command::Ignore(_) => "ignore",
            Command::Reserve => "reserve",
            Command::ReserveWithTimeout(_) => "reserve-with-timeout",
            Command::Delete(_) => "delete",
            Command::PeekReady => "peek-ready",
            Command::Quit => "quit",
        }
    }
}

/// Encode a command into the wire format.
///
/// Wire format:
/// ```text
/// <verb> [<arg> ...]\r\n
/// put <pri> <delay> <ttr> <bytes>\r\n<body>\r\n
/// ```
pub fn encode_command(command: &Command<'_>, dst: &mut BytesMut) -> Result<()> {
    match command {
        Command::Use(tube) | Command::Watch(tube) | Command::Ignore(tube) => {
            validate_tube_name(tube)?;
            put_line(dst, format_args!("{} {tube}", command.verb()));
        }
        Command::Put {
            priority,
            delay,
            ttr,
            body,
        } => {
            if body.len() > u32::MAX as usize {
                return Err(ProtoError::BodyTooLarge {
                    size: body.len(),
                    max: u32::MAX as usize,
                });
            }
            dst.reserve(body.len() + 2 * CRLF.len() + 32);
            put_line(
                dst,
                format_args!("put {priority} {delay} {ttr} {}", body.len()),
            );
            dst.put_slice(body);
            dst.put_slice(CRLF);
        }
        Command::ReserveWithTimeout(seconds) => {
            put_line(dst, format_args!("reserve-with-timeout {seconds}"));
        }
        Command::Delete(id) => put_line(dst, format_args!("delete {id}")),
        Command::Reserve | Command::PeekReady | Command::Quit => {
            put_line(dst, format_args!("{}", command.verb()));
        }
    }
    Ok(())
}

fn put_line(dst: &mut BytesMut, line: std::fmt::Arguments<'_>) {
    dst.put_slice(line.to_string().as_bytes());
    dst.put_slice(CRLF);
}
