//! Debounced recomputation passes.
//!
//! Each registered pass owns one deadline. `trigger` (re)arms it, so a burst
//! of edits collapses into a single execution once the pass has been quiet for
//! its delay. The host event loop calls [`DebouncedPassManager::poll`] to run
//! every pass whose deadline has elapsed; [`DebouncedPassManager::next_deadline`]
//! tells it how long it may sleep.

use std::cell::Cell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::time::{Duration, Instant};

pub type PassError = Box<dyn std::error::Error + Send + Sync>;
pub type PassResult = Result<(), PassError>;

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// A named unit of deferred work.
pub struct DebouncedPass {
    pub id: String,
    pub delay: Duration,
    /// Higher runs first when several passes are flushed together.
    pub priority: i32,
    execute: Box<dyn FnMut() -> PassResult>,
}

impl DebouncedPass {
    pub fn new(
        id: impl Into<String>,
        delay: Duration,
        priority: i32,
        execute: impl FnMut() -> PassResult + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            delay,
            priority,
            execute: Box::new(execute),
        }
    }

    /// Build a pass from a signed millisecond delay. Negative delays are a
    /// misconfiguration and yield `None`.
    pub fn from_millis(
        id: impl Into<String>,
        delay_ms: i64,
        priority: i32,
        execute: impl FnMut() -> PassResult + 'static,
    ) -> Option<Self> {
        let delay_ms = u64::try_from(delay_ms).ok()?;
        Some(Self::new(id, Duration::from_millis(delay_ms), priority, execute))
    }
}

impl std::fmt::Debug for DebouncedPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebouncedPass")
            .field("id", &self.id)
            .field("delay", &self.delay)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Registration details of a pass, without its callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassInfo {
    pub id: String,
    pub delay: Duration,
    pub priority: i32,
}

struct Registration {
    pass: DebouncedPass,
    seq: u64,
    deadline: Option<Instant>,
}

impl Registration {
    fn info(&self) -> PassInfo {
        PassInfo {
            id: self.pass.id.clone(),
            delay: self.pass.delay,
            priority: self.pass.priority,
        }
    }

    /// Run to completion. Errors and panics are logged and discarded.
    fn run(&mut self) {
        self.deadline = None;
        let id = &self.pass.id;
        let execute = &mut *self.pass.execute;
        match panic::catch_unwind(AssertUnwindSafe(|| execute())) {
            Ok(Ok(())) => log::debug!("pass '{id}' executed"),
            Ok(Err(e)) => log::warn!("pass '{id}' failed: {e}"),
            Err(_) => log::warn!("pass '{id}' panicked"),
        }
    }
}

pub struct DebouncedPassManager<C: Clock = SystemClock> {
    clock: C,
    registrations: HashMap<String, Registration>,
    next_seq: u64,
}

impl DebouncedPassManager<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for DebouncedPassManager<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> DebouncedPassManager<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            registrations: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Register a pass, replacing (and disarming) any pass with the same id.
    /// Passes with an empty id are ignored.
    pub fn register(&mut self, pass: DebouncedPass) {
        if pass.id.is_empty() {
            log::warn!("ignoring pass registration with an empty id");
            return;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        let id = pass.id.clone();
        let registration = Registration {
            pass,
            seq,
            deadline: None,
        };
        if let Some(old) = self.registrations.insert(id.clone(), registration)
            && old.deadline.is_some()
        {
            log::debug!("pass '{id}' replaced while pending; its timer was dropped");
        }
    }

    /// Arm (or re-arm) the pass timer. Unknown ids are ignored.
    pub fn trigger(&mut self, id: &str) {
        let now = self.clock.now();
        if let Some(reg) = self.registrations.get_mut(id) {
            reg.deadline = Some(now + reg.pass.delay);
        }
    }

    pub fn cancel(&mut self, id: &str) {
        if let Some(reg) = self.registrations.get_mut(id) {
            reg.deadline = None;
        }
    }

    pub fn cancel_all(&mut self) {
        for reg in self.registrations.values_mut() {
            reg.deadline = None;
        }
    }

    /// Remove a pass without running it. Returns whether it was registered.
    pub fn unregister(&mut self, id: &str) -> bool {
        self.registrations.remove(id).is_some()
    }

    /// Run a pending pass now. No-op when the pass is not pending.
    pub fn flush(&mut self, id: &str) {
        if let Some(reg) = self.registrations.get_mut(id)
            && reg.deadline.is_some()
        {
            reg.run();
        }
    }

    /// Run every pending pass, highest priority first, ties in registration order.
    pub fn flush_all(&mut self) {
        let mut pending: Vec<(i32, u64, String)> = self
            .registrations
            .values()
            .filter(|r| r.deadline.is_some())
            .map(|r| (r.pass.priority, r.seq, r.pass.id.clone()))
            .collect();
        pending.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        for (_, _, id) in pending {
            if let Some(reg) = self.registrations.get_mut(&id) {
                reg.run();
            }
        }
    }

    /// Run every pass whose quiet period has elapsed. Returns how many ran.
    pub fn poll(&mut self) -> usize {
        let now = self.clock.now();
        let mut due: Vec<(Instant, i32, u64, String)> = self
            .registrations
            .values()
            .filter_map(|r| {
                r.deadline
                    .filter(|d| *d <= now)
                    .map(|d| (d, r.pass.priority, r.seq, r.pass.id.clone()))
            })
            .collect();
        due.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)).then(a.2.cmp(&b.2)));
        let count = due.len();
        for (_, _, _, id) in due {
            if let Some(reg) = self.registrations.get_mut(&id) {
                reg.run();
            }
        }
        count
    }

    /// Earliest pending deadline, for the host loop to sleep until.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.registrations.values().filter_map(|r| r.deadline).min()
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.registrations
            .get(id)
            .is_some_and(|r| r.deadline.is_some())
    }

    pub fn pending_count(&self) -> usize {
        self.registrations
            .values()
            .filter(|r| r.deadline.is_some())
            .count()
    }

    /// Registered passes in registration order.
    pub fn registered_passes(&self) -> Vec<PassInfo> {
        let mut regs: Vec<&Registration> = self.registrations.values().collect();
        regs.sort_by_key(|r| r.seq);
        regs.into_iter().map(Registration::info).collect()
    }

    pub fn get_pass(&self, id: &str) -> Option<PassInfo> {
        self.registrations.get(id).map(Registration::info)
    }

    /// Disarm every timer and drop every registration.
    pub fn clear(&mut self) {
        self.registrations.clear();
    }
}
