//! Tube naming rules and protocol-wide defaults.
//!
//! Tube names are at most 200 bytes, drawn from `A-Z a-z 0-9 - + / ; . $ _ ( )`,
//! and may not start with a hyphen.

use crate::error::{ProtoError, Result};

/// Tube every new daemon connection uses and watches.
pub const DEFAULT_TUBE: &str = "default";

/// Default TCP port of a beanstalk daemon.
pub const DEFAULT_PORT: u16 = 11300;

/// Default job priority (lower is more urgent).
pub const DEFAULT_PRIORITY: u32 = 65536;

/// Default time-to-run in seconds for a reserved job.
pub const DEFAULT_TTR: u32 = 120;

/// Maximum tube name length in bytes.
pub const MAX_TUBE_NAME_LEN: usize = 200;

/// Check a tube name against the protocol's naming rules.
pub fn validate_tube_name(name: &str) -> Result<()> {
    let invalid = |reason| {
        Err(ProtoError::InvalidTubeName {
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return invalid("empty");
    }
    if name.len() > MAX_TUBE_NAME_LEN {
        return invalid("longer than 200 bytes");
    }
    if name.starts_with('-') {
        return invalid("starts with a hyphen");
    }
    if !name.bytes().all(is_name_byte) {
        return invalid("contains a character outside the allowed set");
    }
    Ok(())
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'-' | b'+' | b'/' | b';' | b'.' | b'$' | b'_' | b'(' | b')'
        )
}
