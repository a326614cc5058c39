//! Single-value channel between a task and whoever joins it.
//!
//! The sender is consumed by [`OneshotSender::send`]; dropping it unsent closes the
//! channel so the receiver does not block forever.

use std::sync::{Arc, Condvar, Mutex};

pub fn channel<T>() -> (OneshotSender<T>, OneshotReceiver<T>) {
    let slot = Arc::new(Slot::new(State::Pending));
    (OneshotSender(Some(slot.clone())), OneshotReceiver(slot))
}

/// A receiver already holding `value`.
pub fn ready<T>(value: T) -> OneshotReceiver<T> {
    OneshotReceiver(Arc::new(Slot::new(State::Ready(value))))
}

pub struct OneshotSender<T>(Option<Arc<Slot<T>>>);

impl<T> OneshotSender<T> {
    /// Delivers `value`; returns it back if the receiver side already closed.
    pub fn send(mut self, value: T) -> Result<(), T> {
        match self.0.take() {
            Some(slot) => slot.fill(value),
            None => Err(value),
        }
    }
}

impl<T> Drop for OneshotSender<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.0.take() {
            slot.close();
        }
    }
}

pub struct OneshotReceiver<T>(Arc<Slot<T>>);

impl<T> OneshotReceiver<T> {
    /// Blocks until the value arrives. `None` if the sender was dropped unsent.
    pub fn recv(self) -> Option<T> {
        self.0.take()
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.0.lock(), State::Pending)
    }
}

enum State<T> {
    Pending,
    Ready(T),
    Closed,
}

struct Slot<T> {
    state: Mutex<State<T>>,
    signal: Condvar,
}

impl<T> Slot<T> {
    fn new(state: State<T>) -> Slot<T> {
        Slot {
            state: Mutex::new(state),
            signal: Condvar::new(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn fill(&self, value: T) -> Result<(), T> {
        let mut state = self.lock();
        if !matches!(*state, State::Pending) {
            return Err(value);
        }
        *state = State::Ready(value);
        self.signal.notify_all();
        Ok(())
    }

    fn close(&self) {
        let mut state = self.lock();
        if matches!(*state, State::Pending) {
            *state = State::Closed;
            self.signal.notify_all();
        }
    }

    fn take(&self) -> Option<T> {
        let mut state = self.lock();
        while matches!(*state, State::Pending) {
            state = self.signal.wait(state).unwrap_or_else(|e| e.into_inner());
        }
        match std::mem::replace(&mut *state, State::Closed) {
            State::Ready(value) => Some(value),
            _ => None,
        }
    }
}
