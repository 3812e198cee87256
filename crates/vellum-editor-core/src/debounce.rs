//! Named-key trailing-edge debounce scheduler.
//!
//! Rapid-fire calls under one key coalesce into a single invocation of the
//! most recently supplied callback, fired once the key has been quiet for
//! its delay. The scheduler never spawns threads or timers: the host
//! drives it from its event loop with [`Debouncer::fire_due`], using
//! [`Debouncer::next_deadline`] to decide when to wake. Within one key the
//! contract is last-write-wins, fire-once; across keys no ordering is
//! promised beyond deadline order within a single `fire_due` pass.

use std::collections::HashMap;
use std::time::Duration;

use smol_str::SmolStr;
use web_time::Instant;

struct PendingCall {
    deadline: Instant,
    callback: Box<dyn FnOnce() + 'static>,
}

impl std::fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCall")
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

/// Per-editor debounce scheduler.
///
/// Construct one per editor instance and call [`Debouncer::clear_all`] on
/// teardown so no callback fires against a destroyed surface.
#[derive(Debug, Default)]
pub struct Debouncer {
    pending: HashMap<SmolStr, PendingCall>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) `key` to run `callback` once `delay` has elapsed
    /// without another `schedule` for the same key.
    ///
    /// A pending callback under the same key is replaced and will never
    /// run: N schedules within the delay yield exactly one invocation of
    /// the last callback.
    pub fn schedule(
        &mut self,
        key: impl Into<SmolStr>,
        delay: Duration,
        callback: impl FnOnce() + 'static,
    ) {
        self.schedule_at(key, Instant::now() + delay, callback);
    }

    /// Like [`Debouncer::schedule`] with an explicit deadline. Useful for
    /// hosts that already computed the wake-up instant, and for tests.
    pub fn schedule_at(
        &mut self,
        key: impl Into<SmolStr>,
        deadline: Instant,
        callback: impl FnOnce() + 'static,
    ) {
        let key = key.into();
        tracing::trace!(target: "vellum::debounce", %key, "schedule");
        self.pending.insert(
            key,
            PendingCall {
                deadline,
                callback: Box::new(callback),
            },
        );
    }

    /// Drop the pending callback for `key` without firing it.
    /// Returns whether one was pending.
    pub fn cancel(&mut self, key: &str) -> bool {
        self.pending.remove(key).is_some()
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// The earliest pending deadline, if any. Hosts use this to sleep
    /// precisely instead of polling.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Fire every callback whose deadline is at or before `now`, in
    /// deadline order. Returns the number fired.
    pub fn fire_due(&mut self, now: Instant) -> usize {
        let mut due: Vec<SmolStr> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(k, _)| k.clone())
            .collect();
        due.sort_by_key(|k| self.pending[k].deadline);

        let fired = due.len();
        for key in due {
            if let Some(call) = self.pending.remove(&key) {
                tracing::trace!(target: "vellum::debounce", %key, "fire");
                (call.callback)();
            }
        }
        fired
    }

    /// Cancel every pending callback. Call on editor teardown.
    pub fn clear_all(&mut self) {
        let dropped = self.pending.len();
        if dropped > 0 {
            tracing::debug!(target: "vellum::debounce", dropped, "clear_all");
        }
        self.pending.clear();
    }
}
