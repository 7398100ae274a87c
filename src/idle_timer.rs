//! Debounced "no input" countdown.
//!
//! The timer is armed once, fires at most once per generation, and is
//! disarmed by any activity. Each `start` or `cancel` bumps the generation
//! under the state lock. A cancel also wakes the pending sleeper so it exits
//! at once; a sleeper that still wakes up with an outdated generation drops
//! its expiry silently. Fire events carry their generation so the
//! consumer can also discard an expiry that a later cancel raced.

use crate::pipeline::messages::IdleFired;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug)]
struct TimerState {
    armed: bool,
    deadline: Option<Instant>,
    generation: u64,
    /// Wakes the sleeper of the armed generation.
    sleeper: Option<CancellationToken>,
}

struct Inner {
    timeout: Duration,
    state: Mutex<TimerState>,
    fire_tx: mpsc::UnboundedSender<IdleFired>,
    shutdown: CancellationToken,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn expire(&self, generation: u64) {
        {
            let mut state = self.lock();
            if !state.armed || state.generation != generation {
                debug!(
                    generation,
                    current = state.generation,
                    "stale idle expiry ignored"
                );
                return;
            }
            state.armed = false;
            state.deadline = None;
            state.sleeper = None;
        }
        if self.fire_tx.send(IdleFired { generation }).is_err() {
            debug!(generation, "idle fired with no listener");
        }
    }
}

/// Cloneable handle to a single idle countdown.
#[derive(Clone)]
pub struct IdleTimer {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for IdleTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("IdleTimer")
            .field("timeout", &self.inner.timeout)
            .field("armed", &state.armed)
            .field("generation", &state.generation)
            .finish()
    }
}

impl IdleTimer {
    /// Create a disarmed timer. Expiries are delivered on `fire_tx`.
    ///
    /// A zero `timeout` disables the timer: `start` never arms it.
    pub fn new(timeout: Duration, fire_tx: mpsc::UnboundedSender<IdleFired>) -> Self {
        Self {
            inner: Arc::new(Inner {
                timeout,
                state: Mutex::new(TimerState {
                    armed: false,
                    deadline: None,
                    generation: 0,
                    sleeper: None,
                }),
                fire_tx,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Arm the countdown. No-op if already armed, disabled, or shut down.
    ///
    /// Returns `true` when this call armed the timer. Must be called from
    /// within a tokio runtime.
    pub fn start(&self) -> bool {
        if self.inner.timeout.is_zero() || self.inner.shutdown.is_cancelled() {
            return false;
        }

        let (generation, deadline, wake) = {
            let mut state = self.inner.lock();
            if state.armed {
                return false;
            }
            state.generation = state.generation.wrapping_add(1);
            state.armed = true;
            let deadline = Instant::now() + self.inner.timeout;
            state.deadline = Some(deadline);
            let wake = self.inner.shutdown.child_token();
            state.sleeper = Some(wake.clone());
            (state.generation, deadline, wake)
        };

        debug!(generation, "idle timer armed");
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::select! {
                () = wake.cancelled() => {}
                () = tokio::time::sleep_until(deadline) => inner.expire(generation),
            }
        });
        true
    }

    /// Disarm the countdown. Idempotent.
    pub fn cancel(&self) {
        let mut state = self.inner.lock();
        if state.armed {
            debug!(generation = state.generation, "idle timer cancelled");
        }
        state.armed = false;
        state.deadline = None;
        state.generation = state.generation.wrapping_add(1);
        if let Some(wake) = state.sleeper.take() {
            wake.cancel();
        }
    }

    /// Disarm and stop all pending sleepers. The timer cannot be restarted.
    pub fn shutdown(&self) {
        self.cancel();
        self.inner.shutdown.cancel();
    }

    pub fn is_armed(&self) -> bool {
        self.inner.lock().armed
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.lock().deadline
    }

    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Whether no start or cancel happened since `generation` was issued.
    pub fn is_current(&self, generation: u64) -> bool {
        self.inner.lock().generation == generation
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }
}
