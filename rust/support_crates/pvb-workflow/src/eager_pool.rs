//! Eager worker pool with synchronous fallback.
//!
//! A task goes to an idle worker if there is one and otherwise runs right away on
//! the caller's thread. Nothing is ever queued, so a task that spawns and waits on
//! nested tasks cannot starve the pool.

use std::{
    marker::PhantomData,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc, Condvar, Mutex, OnceLock,
        atomic::{AtomicUsize, Ordering},
        mpsc::{Receiver, SyncSender},
    },
};

use crate::{
    join_handle::{JoinHandle, ScopedJoinHandle},
    oneshot,
};

/// Runs two closures concurrently on the global pool and returns both results.
pub fn join<A, B, RA, RB>(fn_a: A, fn_b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    EagerPool::global().join(fn_a, fn_b)
}

/// Worker pool handle. Clones share the same workers; the workers stop when the
/// last clone is dropped.
#[derive(Clone)]
pub struct EagerPool(Arc<Workers>);

impl EagerPool {
    /// Starts a pool with `num_threads` workers (at least one).
    pub fn new(num_threads: usize) -> EagerPool {
        EagerPool(Workers::new(num_threads.max(1)))
    }

    /// Lazily created process-wide pool, sized to the available parallelism.
    /// Callers bound their own degree of parallelism through
    /// [`restricted_scope`](Self::restricted_scope).
    pub fn global() -> &'static EagerPool {
        static POOL: OnceLock<EagerPool> = OnceLock::new();
        POOL.get_or_init(|| {
            let size = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(8);
            EagerPool::new(size)
        })
    }

    pub fn num_threads(&self) -> usize {
        self.0.senders.len()
    }

    /// Runs `f` on an idle worker, or inline when every worker is busy.
    pub fn spawn<F, R>(&self, f: F) -> JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        match self.0.try_reserve() {
            Some(index) => {
                let (tx, rx) = oneshot::channel();
                self.0.dispatch(
                    index,
                    Box::new(move || {
                        let _ = tx.send(catch_unwind(AssertUnwindSafe(f)));
                    }),
                );
                JoinHandle::new(rx)
            }
            None => JoinHandle::ready(f()),
        }
    }

    /// Runs `f` with a [`Scope`] whose tasks may borrow from the caller's stack.
    /// Every task spawned in the scope finishes before this returns.
    pub fn scope<'env, F, R>(&self, f: F) -> R
    where
        F: for<'scope> FnOnce(&'scope Scope<'scope, 'env>) -> R,
    {
        self.restricted_scope(usize::MAX, f)
    }

    /// Like [`scope`](Self::scope), with at most `max_parallel_tasks` tasks running
    /// at once, the caller's thread included.
    pub fn restricted_scope<'env, F, R>(&self, max_parallel_tasks: usize, f: F) -> R
    where
        F: for<'scope> FnOnce(&'scope Scope<'scope, 'env>) -> R,
    {
        let scope = Scope {
            workers: self.0.clone(),
            tracker: Arc::new(ScopeTracker::new(max_parallel_tasks.max(1) - 1)),
            scope: PhantomData,
            env: PhantomData,
        };
        let _wait = WaitOnDrop(&scope.tracker);
        f(&scope)
    }

    pub fn join<A, B, RA, RB>(&self, fn_a: A, fn_b: B) -> (RA, RB)
    where
        A: FnOnce() -> RA + Send,
        B: FnOnce() -> RB + Send,
        RA: Send,
        RB: Send,
    {
        self.scope(|scope| {
            let a = scope.spawn(fn_a);
            let b = fn_b();
            (a.join(), b)
        })
    }

    /// Number of tasks that actually ran on a worker thread.
    pub fn spawn_counter(&self) -> usize {
        self.0.spawned.load(Ordering::Relaxed)
    }
}

/// Spawning context created by [`EagerPool::scope`].
pub struct Scope<'scope, 'env: 'scope> {
    workers: Arc<Workers>,
    tracker: Arc<ScopeTracker>,
    scope: PhantomData<&'scope mut &'scope ()>,
    env: PhantomData<&'env mut &'env ()>,
}

impl<'scope, 'env> Scope<'scope, 'env> {
    pub fn spawn<F, R>(&'scope self, f: F) -> ScopedJoinHandle<'scope, R>
    where
        F: FnOnce() -> R + Send + 'scope,
        R: Send + 'scope,
    {
        if self.tracker.try_reserve() {
            if let Some(index) = self.workers.try_reserve() {
                let tracker = self.tracker.clone();
                let (tx, rx) = oneshot::channel();
                let work = move || {
                    let _ = tx.send(catch_unwind(AssertUnwindSafe(f)));
                    tracker.task_completed();
                };
                let work = Box::new(work) as Box<dyn FnOnce() + Send + 'scope>;
                // The scope waits for every task before 'scope ends, so the task may be
                // treated as 'static by the worker.
                let work = unsafe {
                    std::mem::transmute::<
                        Box<dyn FnOnce() + Send + 'scope>,
                        Box<dyn FnOnce() + Send + 'static>,
                    >(work)
                };
                self.workers.dispatch(index, work);
                return ScopedJoinHandle::new(rx);
            }
            self.tracker.release();
        }
        ScopedJoinHandle::ready(f())
    }
}

type WorkItem = Box<dyn FnOnce() + Send + 'static>;

/// Worker threads exit once their sender is dropped together with `Workers`.
struct Workers {
    senders: Vec<SyncSender<WorkItem>>,
    idle: Mutex<Vec<usize>>,
    spawned: AtomicUsize,
}

impl Workers {
    fn new(num_threads: usize) -> Arc<Workers> {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..num_threads)
            .map(|_| std::sync::mpsc::sync_channel::<WorkItem>(1))
            .unzip();
        let workers = Arc::new(Workers {
            senders,
            idle: Mutex::new((0..num_threads).rev().collect()),
            spawned: AtomicUsize::new(0),
        });
        for (index, rx) in receivers.into_iter().enumerate() {
            let weak = Arc::downgrade(&workers);
            std::thread::Builder::new()
                .name(format!("pvb-worker-{index}"))
                .spawn(move || Self::run(weak, index, rx))
                .map_err(|e| log::warn!("failed to start worker {index}: {e}"))
                .ok();
        }
        workers
    }

    fn try_reserve(&self) -> Option<usize> {
        self.idle.lock().unwrap_or_else(|e| e.into_inner()).pop()
    }

    fn release(&self, index: usize) {
        self.idle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(index);
    }

    fn dispatch(&self, index: usize, work: WorkItem) {
        self.spawned.fetch_add(1, Ordering::Relaxed);
        if let Err(err) = self.senders[index].send(work) {
            // The worker is gone; run the task here instead of losing it.
            (err.0)();
        }
    }

    fn run(workers: std::sync::Weak<Workers>, index: usize, rx: Receiver<WorkItem>) {
        while let Ok(work) = rx.recv() {
            work();
            match workers.upgrade() {
                Some(workers) => workers.release(index),
                None => return,
            }
        }
    }
}

/// Tracks the tasks a scope dispatched to workers.
struct ScopeTracker {
    running: Mutex<usize>,
    done: Condvar,
    reserved: AtomicUsize,
    max_tasks: usize,
}

impl ScopeTracker {
    fn new(max_tasks: usize) -> ScopeTracker {
        ScopeTracker {
            running: Mutex::new(0),
            done: Condvar::new(),
            reserved: AtomicUsize::new(0),
            max_tasks,
        }
    }

    fn try_reserve(&self) -> bool {
        if self.reserved.fetch_add(1, Ordering::Relaxed) + 1 > self.max_tasks {
            self.reserved.fetch_sub(1, Ordering::Relaxed);
            return false;
        }
        *self.running.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        true
    }

    fn release(&self) {
        self.reserved.fetch_sub(1, Ordering::Relaxed);
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        *running -= 1;
        if *running == 0 {
            self.done.notify_all();
        }
    }

    fn task_completed(&self) {
        self.release();
    }

    fn wait(&self) {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        while *running > 0 {
            running = self.done.wait(running).unwrap_or_else(|e| e.into_inner());
        }
    }
}

struct WaitOnDrop<'a>(&'a ScopeTracker);

impl Drop for WaitOnDrop<'_> {
    fn drop(&mut self) {
        self.0.wait();
    }
}
