use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex as StdMutex,
    },
    time::Duration,
};

use tokio::{
    sync::{mpsc, Mutex, Notify},
    time::interval,
};

use crate::error::ServiceError;

type BoxedJob = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Bounded concurrent task executor dispatching bus-publish tasks.
///
/// Mirrors the shape of a production thread pool: a bounded FIFO queue in front of a
/// worker count that floats between `min` and `max`, an idle reaper that lets burst
/// capacity above `min` shrink back down, and an `abort` rejection policy — `submit`
/// fails immediately rather than blocking when the queue is full.
pub struct WorkerPool {
    sender: mpsc::Sender<BoxedJob>,
    receiver: Arc<Mutex<mpsc::Receiver<BoxedJob>>>,
    worker_count: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
    queued: Arc<AtomicUsize>,
    completed: Arc<AtomicU64>,
    min: usize,
    max: usize,
    idle: Duration,
    shutdown: Arc<Notify>,
    shutting_down: Arc<std::sync::atomic::AtomicBool>,
    worker_handles: Arc<StdMutex<Vec<tokio::task::JoinHandle<()>>>>,
}

#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    pub min: usize,
    pub max: usize,
    pub queue_capacity: usize,
    pub idle_seconds: u64,
    pub monitor_interval_seconds: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            min: 5,
            max: 20,
            queue_capacity: 500,
            idle_seconds: 60,
            monitor_interval_seconds: 30,
        }
    }
}

impl WorkerPool {
    pub fn start(settings: PoolSettings) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(settings.queue_capacity);
        let pool = Arc::new(Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            worker_count: Arc::new(AtomicUsize::new(0)),
            active: Arc::new(AtomicUsize::new(0)),
            queued: Arc::new(AtomicUsize::new(0)),
            completed: Arc::new(AtomicU64::new(0)),
            min: settings.min,
            max: settings.max,
            idle: Duration::from_secs(settings.idle_seconds),
            shutdown: Arc::new(Notify::new()),
            shutting_down: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            worker_handles: Arc::new(StdMutex::new(Vec::new())),
        });

        for _ in 0..settings.min {
            pool.worker_count.fetch_add(1, Ordering::SeqCst);
            pool.clone().spawn_worker(true);
        }

        pool.clone().spawn_monitor(settings.monitor_interval_seconds);

        pool
    }

    /// Enqueues a unit of work. Fails immediately with [`ServiceError::Overloaded`]
    /// when the queue is at capacity — callers MUST log the rejection and complete the
    /// corresponding pending slot exceptionally rather than retry synchronously.
    pub fn submit<F>(&self, job: F) -> Result<(), ServiceError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(ServiceError::Overloaded("pool is shutting down".to_string()));
        }

        match self.sender.try_send(Box::pin(job)) {
            Ok(()) => {
                self.queued.fetch_add(1, Ordering::SeqCst);
                self.maybe_grow();
                Ok(())
            }
            Err(_) => Err(ServiceError::Overloaded(
                "work queue is full (rejection policy: abort)".to_string(),
            )),
        }
    }

    /// Reserves a worker slot with a CAS loop before spawning, so a burst of concurrent
    /// `submit` calls can't all observe `worker_count < max` and overshoot the cap.
    fn maybe_grow(self: &Arc<Self>) {
        if self.queued.load(Ordering::SeqCst) == 0 {
            return;
        }

        let mut current = self.worker_count.load(Ordering::SeqCst);
        loop {
            if current >= self.max {
                return;
            }
            match self.worker_count.compare_exchange(
                current,
                current + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        self.clone().spawn_worker(false);
    }

    fn spawn_worker(self: Arc<Self>, permanent: bool) {
        let receiver = self.receiver.clone();
        let active = self.active.clone();
        let queued = self.queued.clone();
        let completed = self.completed.clone();
        let worker_count = self.worker_count.clone();
        let min = self.min;
        let idle = self.idle;

        let handle = tokio::spawn(async move {
            loop {
                let job = {
                    let mut rx = receiver.lock().await;
                    if permanent {
                        rx.recv().await
                    } else {
                        tokio::select! {
                            job = rx.recv() => job,
                            _ = tokio::time::sleep(idle) => {
                                if worker_count.load(Ordering::SeqCst) > min {
                                    worker_count.fetch_sub(1, Ordering::SeqCst);
                                    return;
                                }
                                continue;
                            }
                        }
                    }
                };

                let Some(job) = job else {
                    worker_count.fetch_sub(1, Ordering::SeqCst);
                    return;
                };

                queued.fetch_sub(1, Ordering::SeqCst);
                active.fetch_add(1, Ordering::SeqCst);
                job.await;
                active.fetch_sub(1, Ordering::SeqCst);
                completed.fetch_add(1, Ordering::SeqCst);
            }
        });

        let mut handles = self.worker_handles.lock().unwrap();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    fn spawn_monitor(self: Arc<Self>, interval_seconds: u64) {
        let active = self.active.clone();
        let queued = self.queued.clone();
        let completed = self.completed.clone();
        let worker_count = self.worker_count.clone();
        let shutdown = self.shutdown.clone();
        let worker_handles = self.worker_handles.clone();

        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(interval_seconds));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        worker_handles.lock().unwrap().retain(|h| !h.is_finished());
                        tracing::info!(
                            active = active.load(Ordering::SeqCst),
                            queued = queued.load(Ordering::SeqCst),
                            completed = completed.load(Ordering::SeqCst),
                            workers = worker_count.load(Ordering::SeqCst),
                            "worker pool status",
                        );
                    }
                    _ = shutdown.notified() => return,
                }
            }
        });
    }

    /// Stops intake, drains for up to `timeout`, then force-cancels whatever remains.
    pub async fn shutdown(&self, timeout: Duration) {
        self.shutting_down.store(true, Ordering::SeqCst);
        self.shutdown.notify_waiters();

        let deadline = tokio::time::Instant::now() + timeout;
        let mut drained = true;
        while self.active.load(Ordering::SeqCst) > 0 || self.queued.load(Ordering::SeqCst) > 0 {
            if tokio::time::Instant::now() >= deadline {
                drained = false;
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        if !drained {
            let handles = std::mem::take(&mut *self.worker_handles.lock().unwrap());
            tracing::warn!(
                workers = handles.len(),
                "worker pool drain timed out, force-cancelling remaining tasks",
            );
            for handle in handles {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;

    #[tokio::test]
    async fn submit_runs_job() {
        let pool = WorkerPool::start(PoolSettings {
            min: 1,
            max: 2,
            queue_capacity: 4,
            idle_seconds: 60,
            monitor_interval_seconds: 30,
        });

        let ran = Arc::new(StdAtomicUsize::new(0));
        let ran_clone = ran.clone();
        pool.submit(async move {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn submit_rejects_when_queue_full() {
        let pool = WorkerPool::start(PoolSettings {
            min: 0,
            max: 0,
            queue_capacity: 1,
            idle_seconds: 60,
            monitor_interval_seconds: 30,
        });

        pool.submit(async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
        })
        .unwrap();

        let err = pool.submit(async move {}).unwrap_err();
        assert!(matches!(err, ServiceError::Overloaded(_)));
    }
}
