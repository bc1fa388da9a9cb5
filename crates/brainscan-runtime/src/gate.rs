// Copyright © 2026, Brainscan contributors.
// Created: 19 October 2026

/*!
The re-entrancy gate for inference rounds.

At most one round runs at a time. A request arriving while a round is
running is parked in a single pending slot (latest wins) and the
displaced request is handed back to the caller. The holder of the
running permit drains that slot before handing the gate back; checking
the slot and returning to idle happen under one lock.

A permit dropped without draining also discards the pending request,
so a later round never picks up a request parked behind an older one.
 */

use parking_lot::Mutex;
use std::sync::Arc;

/// Whether an inference round is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    Idle,
    Running,
}

struct Inner<T> {
    state: RoundState,
    pending: Option<T>,
}

/// Serializes rounds and holds at most one pending request of type `T`.
pub struct RoundGate<T> {
    inner: Mutex<Inner<T>>,
}

/// Proof of holding the running state. Dropping it returns the gate to idle.
pub struct RoundPermit<T> {
    gate: Arc<RoundGate<T>>,
    released: bool,
}

/// The result of offering a request to the gate.
pub enum Admission<T> {
    /// The gate was idle; the caller now runs `T` under the permit.
    Begin(RoundPermit<T>, T),
    /// A round is running; the request was parked. Carries the older
    /// request it replaced, if any.
    Queued(Option<T>),
}

impl<T> Default for RoundGate<T> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: RoundState::Idle,
                pending: None,
            }),
        }
    }
}

impl<T> RoundGate<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RoundState {
        self.inner.lock().state
    }

    pub fn has_pending(&self) -> bool {
        self.inner.lock().pending.is_some()
    }

    /// Begin a round if idle, without touching the pending slot.
    pub fn try_begin(self: &Arc<Self>) -> Option<RoundPermit<T>> {
        let mut inner = self.inner.lock();
        if inner.state == RoundState::Running {
            return None;
        }

        inner.state = RoundState::Running;
        Some(RoundPermit {
            gate: self.clone(),
            released: false,
        })
    }

    /// Begin a round for `request` if idle, otherwise park it.
    pub fn admit(self: &Arc<Self>, request: T) -> Admission<T> {
        let mut inner = self.inner.lock();
        match inner.state {
            RoundState::Idle => {
                inner.state = RoundState::Running;
                Admission::Begin(
                    RoundPermit {
                        gate: self.clone(),
                        released: false,
                    },
                    request,
                )
            }
            RoundState::Running => Admission::Queued(inner.pending.replace(request)),
        }
    }

    /// Park `request` regardless of state, returning the older one it replaced.
    pub fn park(&self, request: T) -> Option<T> {
        self.inner.lock().pending.replace(request)
    }

    /// Begin a round for the parked request, if idle and one is parked.
    pub fn try_begin_pending(self: &Arc<Self>) -> Option<(RoundPermit<T>, T)> {
        let mut inner = self.inner.lock();
        if inner.state == RoundState::Running {
            return None;
        }

        let request = inner.pending.take()?;
        inner.state = RoundState::Running;
        Some((
            RoundPermit {
                gate: self.clone(),
                released: false,
            },
            request,
        ))
    }
}

impl<T> RoundPermit<T> {
    /// Take the parked request to run next, or release the gate if there is none.
    ///
    /// Once this returns `None` the permit no longer holds the gate.
    pub fn next_pending(&mut self) -> Option<T> {
        if self.released {
            return None;
        }

        let mut inner = self.gate.inner.lock();
        match inner.pending.take() {
            Some(request) => Some(request),
            None => {
                inner.state = RoundState::Idle;
                self.released = true;
                None
            }
        }
    }
}

impl<T> Drop for RoundPermit<T> {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let stale = {
            let mut inner = self.gate.inner.lock();
            inner.state = RoundState::Idle;
            inner.pending.take()
        };
        drop(stale);
    }
}
