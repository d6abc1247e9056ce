use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crate::timer::{precise_sleep, Clock};

/// Identifies which trial of which session a timer was armed for.
///
/// `generation` changes on every session start, so a timer that outlives
/// its session can never be mistaken for one armed by the next session,
/// even when the trial slots coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken {
    pub generation: u64,
    pub slot: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

/// Deferred-callback port: deliver `token` once `after` has elapsed
pub trait Scheduler {
    fn schedule(&mut self, after: Duration, token: TimerToken) -> TimerHandle;
    fn cancel(&mut self, handle: TimerHandle);
}

#[derive(Debug)]
struct PendingTimer {
    handle: TimerHandle,
    due_ms: u64,
    token: TimerToken,
}

#[derive(Debug, Default)]
struct ManualState {
    now_ms: u64,
    next_handle: u64,
    pending: Vec<PendingTimer>,
}

/// Simulated clock and scheduler; time only moves when told to.
///
/// Clones share the same timeline, so a test can keep one copy while the
/// state machine owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    state: Arc<Mutex<ManualState>>,
}

impl ManualTimer {
    pub fn new(start_ms: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualState {
                now_ms: start_ms,
                ..ManualState::default()
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves time forward and returns every token that fell due, earliest first.
    pub fn advance_by(&self, d: Duration) -> Vec<TimerToken> {
        let mut state = self.state();
        state.now_ms += d.as_millis() as u64;
        let now = state.now_ms;

        let mut due: Vec<PendingTimer> = Vec::new();
        let mut i = 0;
        while i < state.pending.len() {
            if state.pending[i].due_ms <= now {
                due.push(state.pending.swap_remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by_key(|p| (p.due_ms, p.handle));
        due.into_iter().map(|p| p.token).collect()
    }

    /// Jumps straight to the earliest pending timer and fires it.
    pub fn fire_next(&self) -> Option<TimerToken> {
        let mut state = self.state();
        let idx = state
            .pending
            .iter()
            .enumerate()
            .min_by_key(|(_, p)| (p.due_ms, p.handle))
            .map(|(i, _)| i)?;
        let fired = state.pending.swap_remove(idx);
        state.now_ms = state.now_ms.max(fired.due_ms);
        Some(fired.token)
    }

    pub fn pending(&self) -> usize {
        self.state().pending.len()
    }

    pub fn next_due(&self) -> Option<u64> {
        self.state().pending.iter().map(|p| p.due_ms).min()
    }
}

impl Clock for ManualTimer {
    fn now(&self) -> u64 {
        self.state().now_ms
    }
}

impl Scheduler for ManualTimer {
    fn schedule(&mut self, after: Duration, token: TimerToken) -> TimerHandle {
        let mut state = self.state();
        let handle = TimerHandle(state.next_handle);
        state.next_handle += 1;
        let due_ms = state.now_ms + after.as_millis() as u64;
        state.pending.push(PendingTimer {
            handle,
            due_ms,
            token,
        });
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.state().pending.retain(|p| p.handle != handle);
    }
}

/// Real-time scheduler that posts fired tokens into an event queue.
///
/// Each timer sleeps on its own thread. Cancellation is best effort: a
/// timer that already woke up may still deliver, so consumers must treat
/// stale tokens as no-ops.
pub struct ChannelScheduler<E> {
    sender: Sender<E>,
    next_handle: u64,
    cancelled: HashMap<TimerHandle, Arc<AtomicBool>>,
}

impl<E> ChannelScheduler<E>
where
    E: From<TimerToken> + Send + 'static,
{
    pub fn new(sender: Sender<E>) -> Self {
        Self {
            sender,
            next_handle: 0,
            cancelled: HashMap::new(),
        }
    }
}

impl<E> Scheduler for ChannelScheduler<E>
where
    E: From<TimerToken> + Send + 'static,
{
    fn schedule(&mut self, after: Duration, token: TimerToken) -> TimerHandle {
        // Finished threads have dropped their clone of the flag.
        self.cancelled.retain(|_, flag| Arc::strong_count(flag) > 1);

        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;

        let flag = Arc::new(AtomicBool::new(false));
        self.cancelled.insert(handle, Arc::clone(&flag));
        let sender = self.sender.clone();

        thread::spawn(move || {
            precise_sleep(after);
            if !flag.load(Ordering::Acquire) {
                // Receiver gone means the driver shut down.
                let _ = sender.send(E::from(token));
            }
        });

        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(flag) = self.cancelled.remove(&handle) {
            flag.store(true, Ordering::Release);
        }
    }
}
