//! Beanstalk text protocol for tubewire.
//!
//! Commands and responses are CRLF-terminated lines; job bodies follow
//! their header line as a length-counted byte block plus CRLF:
//!
//! ```text
//! put <pri> <delay> <ttr> <bytes>\r\n<body>\r\n   ->  INSERTED <id>\r\n
//! reserve-with-timeout <secs>\r\n                 ->  RESERVED <id> <bytes>\r\n<body>\r\n
//! ```
//!
//! No partial reads, no buffer management in user code.

pub mod command;
pub mod error;
pub mod reader;
pub mod response;
pub mod tube;
pub mod writer;

pub use command::{encode_command, Command, CRLF};
pub use error::{ProtoError, Result};
pub use reader::ResponseReader;
pub use response::{decode_response, Job, ProtoConfig, Response, DEFAULT_MAX_BODY};
pub use tube::{
    validate_tube_name, DEFAULT_PORT, DEFAULT_PRIORITY, DEFAULT_TTR, DEFAULT_TUBE,
    MAX_TUBE_NAME_LEN,
};
pub use writer::CommandWriter;
