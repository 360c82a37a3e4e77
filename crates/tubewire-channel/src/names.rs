use std::time::{SystemTime, UNIX_EPOCH};

/// Supplies suffixes for anonymous channel names.
pub trait NameSource {
    fn next_suffix(&mut self) -> String;
}

/// Suffixes of the form `<pid>.<counter>`.
///
/// Unique within one source; give each process a single source, or use
/// [`SequentialNames::with_prefix`] to keep several apart.
#[derive(Debug, Clone)]
pub struct SequentialNames {
    prefix: String,
    counter: u64,
}

impl SequentialNames {
    pub fn new() -> Self {
        Self::with_prefix(std::process::id().to_string())
    }

    /// A source whose prefix also carries the creation time, so independent
    /// sources in one process do not collide.
    pub fn unique() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        Self::with_prefix(format!("{}.{nanos:x}", std::process::id()))
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: 0,
        }
    }
}

impl Default for SequentialNames {
    fn default() -> Self {
        Self::new()
    }
}

impl NameSource for SequentialNames {
    fn next_suffix(&mut self) -> String {
        let n = self.counter;
        self.counter += 1;
        format!("{}.{n}", self.prefix)
    }
}

impl<F: FnMut() -> String> NameSource for F {
    fn next_suffix(&mut self) -> String {
        self()
    }
}
