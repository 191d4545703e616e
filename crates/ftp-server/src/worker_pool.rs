//! [`WorkerPool`]: a fixed-size pool of OS threads draining a shared task FIFO.
//!
//! A mutex-guarded queue, a condition variable workers wait on, and a stop
//! flag checked after each wake. No work-stealing, no priorities, no
//! backpressure — submission never blocks.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

/// A unit of work queued onto a [`WorkerPool`].
///
/// Boxed so the queue can hold heterogeneous closures; each task runs to
/// completion on whichever worker pops it, even if shutdown has already
/// been requested.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    queue: Mutex<VecDeque<Task>>,
    condvar: Condvar,
    stopping: Mutex<bool>,
}

/// A fixed number of worker threads servicing a shared task queue.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `size` worker threads, each looping: wait while the queue is
    /// empty, pop front, run the task, repeat.
    #[must_use]
    pub fn new(size: u16) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
            stopping: Mutex::new(false),
        });

        let workers = (0..size)
            .map(|worker_id| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("ftpd-worker-{worker_id}"))
                    .spawn(move || worker_loop(&shared))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self { shared, workers }
    }

    /// Enqueues `task`. Never blocks; bounded only by available memory.
    pub fn submit(&self, task: Task) {
        let mut queue = self
            .shared
            .queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        queue.push_back(task);
        self.shared.condvar.notify_one();
    }

    /// Returns the number of tasks currently queued, awaiting a free worker.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared
            .queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Signals every worker to stop once its current (and any already
    /// queued) task completes, then joins all of them.
    pub fn shutdown(mut self) {
        {
            let mut stopping = self
                .shared
                .stopping
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *stopping = true;
        }
        self.shared.condvar.notify_all();

        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let task = {
            let mut queue = shared.queue.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            loop {
                if let Some(task) = queue.pop_front() {
                    break Some(task);
                }
                let stopping = *shared
                    .stopping
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                if stopping {
                    break None;
                }
                queue = shared
                    .condvar
                    .wait(queue)
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
            }
        };

        match task {
            Some(task) => task(),
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn submitted_tasks_all_run() {
        let pool = WorkerPool::new(4);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..50 {
            let counter = Arc::clone(&counter);
            pool.submit(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }

        // give workers a chance to drain before shutdown joins them anyway
        thread::sleep(Duration::from_millis(50));
        pool.shutdown();
        assert_eq!(counter.load(Ordering::SeqCst), 50);
    }

    #[test]
    fn shutdown_waits_for_already_queued_tasks() {
        let pool = WorkerPool::new(1);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            pool.submit(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }
        pool.shutdown();
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn pending_reflects_queue_depth_before_workers_drain_it() {
        let pool = WorkerPool::new(0);
        pool.submit(Box::new(|| {}));
        pool.submit(Box::new(|| {}));
        assert_eq!(pool.pending(), 2);
        pool.shutdown();
    }
}
