//! In-process queue daemon.
//!
//! [`MemoryBroker`] holds the tubes; every [`MemoryDaemon`] is one session
//! against a broker with its own used tube, watch list and reserved jobs,
//! mirroring what a TCP session sees. Brokers registered by name are
//! reachable through `memory://<name>` endpoints from anywhere in the
//! process.
//!
//! Named brokers are never unregistered. Once created, a broker and every
//! job left in its tubes live until the process exits, so long-running
//! processes should reuse a bounded set of names. Use [`MemoryBroker::new`]
//! for storage that is freed with its last session.
//!
//! Jobs all carry the same priority, so reserve hands out the oldest ready
//! job across the watched tubes.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::debug;
use tubewire_proto::{validate_tube_name, Job, DEFAULT_MAX_BODY, DEFAULT_TUBE};

use crate::daemon::Daemon;
use crate::error::{Result, TransportError};

/// Named brokers. Entries are only ever added.
static REGISTRY: OnceLock<Mutex<HashMap<String, MemoryBroker>>> = OnceLock::new();

/// Shared tube storage for in-process sessions.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<BrokerInner>,
}

#[derive(Default)]
struct BrokerInner {
    state: Mutex<BrokerState>,
    ready: Condvar,
}

#[derive(Default)]
struct BrokerState {
    tubes: HashMap<String, VecDeque<Job>>,
    next_id: u64,
}

impl MemoryBroker {
    /// Create an unregistered broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// The broker registered under `name`, created on first use.
    ///
    /// The registration lasts for the rest of the process.
    pub fn named(name: &str) -> Self {
        let registry = REGISTRY.get_or_init(Default::default);
        let mut brokers = registry.lock().unwrap_or_else(PoisonError::into_inner);
        brokers
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(name, "created in-process broker");
                MemoryBroker::new()
            })
            .clone()
    }

    /// Open a new session against this broker.
    pub fn session(&self) -> MemoryDaemon {
        MemoryDaemon::new(self.clone())
    }

    /// Number of ready jobs in a tube.
    pub fn ready_count(&self, tube: &str) -> usize {
        self.lock().tubes.get(tube).map_or(0, VecDeque::len)
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl BrokerState {
    /// Remove the oldest ready job across `tubes`.
    fn take_oldest(&mut self, tubes: &[String]) -> Option<(String, Job)> {
        let tube = tubes
            .iter()
            .filter_map(|t| self.tubes.get(t).and_then(|q| q.front()).map(|j| (t, j.id)))
            .min_by_key(|(_, id)| *id)
            .map(|(t, _)| t.clone())?;
        let job = self.tubes.get_mut(&tube)?.pop_front()?;
        Some((tube, job))
    }
}

/// One session against a [`MemoryBroker`].
pub struct MemoryDaemon {
    broker: MemoryBroker,
    used: String,
    watched: Vec<String>,
    reserved: HashMap<u64, (String, Job)>,
    max_body_size: usize,
}

impl MemoryDaemon {
    /// Open a session that uses and watches the default tube.
    pub fn new(broker: MemoryBroker) -> Self {
        Self {
            broker,
            used: DEFAULT_TUBE.to_string(),
            watched: vec![DEFAULT_TUBE.to_string()],
            reserved: HashMap::new(),
            max_body_size: DEFAULT_MAX_BODY,
        }
    }

    /// Limit accepted job bodies to `max_body_size` bytes.
    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// Tubes currently watched by this session.
    pub fn watched(&self) -> &[String] {
        &self.watched
    }

    /// Tube currently used by this session.
    pub fn used(&self) -> &str {
        &self.used
    }
}

impl Daemon for MemoryDaemon {
    fn use_tube(&mut self, tube: &str) -> Result<()> {
        validate_tube_name(tube)?;
        self.used = tube.to_string();
        Ok(())
    }

    fn watch(&mut self, tube: &str) -> Result<u32> {
        validate_tube_name(tube)?;
        if !self.watched.iter().any(|t| t == tube) {
            self.watched.push(tube.to_string());
        }
        Ok(self.watched.len() as u32)
    }

    fn ignore(&mut self, tube: &str) -> Result<u32> {
        validate_tube_name(tube)?;
        if self.watched.len() == 1 && self.watched[0] == tube {
            return Err(TransportError::NotIgnored {
                tube: tube.to_string(),
            });
        }
        self.watched.retain(|t| t != tube);
        Ok(self.watched.len() as u32)
    }

    fn put(&mut self, body: &[u8]) -> Result<u64> {
        if body.len() > self.max_body_size {
            return Err(TransportError::JobTooBig);
        }
        let mut state = self.broker.lock();
        state.next_id += 1;
        let job = Job {
            id: state.next_id,
            body: Bytes::copy_from_slice(body),
        };
        let id = job.id;
        state
            .tubes
            .entry(self.used.clone())
            .or_default()
            .push_back(job);
        drop(state);
        self.broker.inner.ready.notify_all();
        Ok(id)
    }

    fn reserve(&mut self, timeout: Option<Duration>) -> Result<Job> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.broker.lock();
        loop {
            if let Some((tube, job)) = state.take_oldest(&self.watched) {
                self.reserved.insert(job.id, (tube, job.clone()));
                return Ok(job);
            }
            state = match deadline {
                None => self
                    .broker
                    .inner
                    .ready
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(TransportError::TimedOut);
                    }
                    self.broker
                        .inner
                        .ready
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    fn delete(&mut self, id: u64) -> Result<()> {
        if self.reserved.remove(&id).is_some() {
            return Ok(());
        }
        let mut state = self.broker.lock();
        for queue in state.tubes.values_mut() {
            if let Some(pos) = queue.iter().position(|job| job.id == id) {
                queue.remove(pos);
                return Ok(());
            }
        }
        Err(TransportError::JobNotFound(id))
    }

    fn peek_ready(&mut self) -> Result<Option<Job>> {
        let state = self.broker.lock();
        Ok(state
            .tubes
            .get(&self.used)
            .and_then(|queue| queue.front())
            .cloned())
    }

    fn transport_name(&self) -> &'static str {
        "memory"
    }
}

impl Drop for MemoryDaemon {
    fn drop(&mut self) {
        if self.reserved.is_empty() {
            return;
        }
        // Jobs reserved but never deleted go back to the front of their tube.
        let mut state = self.broker.lock();
        let mut released: Vec<_> = self.reserved.drain().map(|(_, entry)| entry).collect();
        released.sort_by_key(|(_, job)| std::cmp::Reverse(job.id));
        for (tube, job) in released {
            state.tubes.entry(tube).or_default().push_front(job);
        }
        drop(state);
        self.broker.inner.ready.notify_all();
    }
}
