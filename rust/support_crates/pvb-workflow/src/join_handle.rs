//! Handles for waiting on task results.
//!
//! Results travel as `std::thread::Result<R>`: a task that panicked on a worker
//! re-raises its panic in the joining thread.

use std::{marker::PhantomData, thread};

use crate::oneshot::{self, OneshotReceiver};

/// Result of a `'static` task spawned on an [`EagerPool`](crate::eager_pool::EagerPool).
pub struct JoinHandle<R>(OneshotReceiver<thread::Result<R>>);

impl<R> JoinHandle<R> {
    pub(crate) fn new(rx: OneshotReceiver<thread::Result<R>>) -> JoinHandle<R> {
        JoinHandle(rx)
    }

    /// A handle that is already complete.
    pub fn ready(res: R) -> JoinHandle<R> {
        JoinHandle(oneshot::ready(Ok(res)))
    }

    pub fn is_ready(&self) -> bool {
        !self.0.is_pending()
    }

    /// Waits for the task and returns its result, resuming its panic if it had one.
    pub fn join(self) -> R {
        unwrap_outcome(self.0.recv())
    }

    pub fn join_all(handles: impl IntoIterator<Item = JoinHandle<R>>) -> Vec<R> {
        handles.into_iter().map(JoinHandle::join).collect()
    }
}

/// Like [`JoinHandle`], but tied to the scope that spawned the task.
pub struct ScopedJoinHandle<'scope, R>(
    OneshotReceiver<thread::Result<R>>,
    PhantomData<&'scope ()>,
);

impl<'scope, R> ScopedJoinHandle<'scope, R> {
    pub(crate) fn new(rx: OneshotReceiver<thread::Result<R>>) -> ScopedJoinHandle<'scope, R> {
        ScopedJoinHandle(rx, PhantomData)
    }

    pub fn ready(res: R) -> Self {
        ScopedJoinHandle(oneshot::ready(Ok(res)), PhantomData)
    }

    pub fn is_ready(&self) -> bool {
        !self.0.is_pending()
    }

    pub fn join(self) -> R {
        unwrap_outcome(self.0.recv())
    }
}

fn unwrap_outcome<R>(outcome: Option<thread::Result<R>>) -> R {
    match outcome {
        Some(Ok(res)) => res,
        Some(Err(payload)) => std::panic::resume_unwind(payload),
        None => panic!("task was dropped before producing a result"),
    }
}
