use std::time::Duration;

use tubewire_proto::Job;

use crate::error::Result;

/// Raw tube operations of a queue daemon session.
///
/// One value is one session: it has a single *used* tube (target of `put`
/// and `peek_ready`) and a *watch list* (sources for `reserve`). A fresh
/// session uses and watches [`tubewire_proto::DEFAULT_TUBE`].
///
/// Implementations are blocking and not internally synchronised; callers
/// hold `&mut self` for the duration of every call.
pub trait Daemon: Send {
    /// Select the tube that `put` and `peek_ready` operate on.
    fn use_tube(&mut self, tube: &str) -> Result<()>;

    /// Add a tube to the watch list. Returns the number of watched tubes.
    fn watch(&mut self, tube: &str) -> Result<u32>;

    /// Remove a tube from the watch list. Returns the number of watched tubes.
    ///
    /// Removing the last watched tube is refused by the daemon.
    fn ignore(&mut self, tube: &str) -> Result<u32>;

    /// Insert a job into the used tube. Returns the job id.
    fn put(&mut self, body: &[u8]) -> Result<u64>;

    /// Reserve the next ready job from any watched tube.
    ///
    /// `None` blocks until a job arrives; `Some(timeout)` fails with
    /// [`crate::TransportError::TimedOut`] once it expires.
    fn reserve(&mut self, timeout: Option<Duration>) -> Result<Job>;

    /// Delete a job, so it is never handed out again.
    fn delete(&mut self, id: u64) -> Result<()>;

    /// The next ready job in the used tube, without reserving it.
    fn peek_ready(&mut self) -> Result<Option<Job>>;

    /// Transport name for diagnostics.
    fn transport_name(&self) -> &'static str;
}

impl<D: Daemon + ?Sized> Daemon for Box<D> {
    fn use_tube(&mut self, tube: &str) -> Result<()> {
        (**self).use_tube(tube)
    }

    fn watch(&mut self, tube: &str) -> Result<u32> {
        (**self).watch(tube)
    }

    fn ignore(&mut self, tube: &str) -> Result<u32> {
        (**self).ignore(tube)
    }

    fn put(&mut self, body: &[u8]) -> Result<u64> {
        (**self).put(body)
    }

    fn reserve(&mut self, timeout: Option<Duration>) -> Result<Job> {
        (**self).reserve(timeout)
    }

    fn delete(&mut self, id: u64) -> Result<()> {
        (**self).delete(id)
    }

    fn peek_ready(&mut self) -> Result<Option<Job>> {
        (**self).peek_ready()
    }

    fn transport_name(&self) -> &'static str {
        (**self).transport_name()
    }
}
