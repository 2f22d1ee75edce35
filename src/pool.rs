use super::{
    errors::{ConfigError, PoolError},
    model::PoolMetrics,
};
use std::{
    any::Any,
    future::Future,
    panic::AssertUnwindSafe,
    pin::Pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};
use crossbeam::deque::{Injector, Steal};
use tokio::{
    sync::Notify,
    task::JoinHandle,
    time::Duration,
};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};


pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(5);

/// Конфигурация пула воркеров
#[derive(Debug, Clone)]
pub struct Config {
    pub core_workers: usize,
    pub max_workers: usize,
    pub keep_alive: Duration,
    pub init_core: bool,
}

impl Default for Config {
    fn default() -> Self {
        let num_cpus = num_cpus::get();
        Self {
            core_workers: num_cpus,
            max_workers: num_cpus * 2,
            keep_alive: DEFAULT_KEEP_ALIVE,
            init_core: true,
        }
    }
}

impl Config {
    pub fn with_core(core_workers: usize) -> Self {
        Self {
            core_workers,
            max_workers: core_workers * 2,
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.core_workers == 0 {
            return Err(ConfigError::CoreWorkers);
        }
        if self.max_workers < self.core_workers {
            return Err(ConfigError::MaxWorkers);
        }
        Ok(())
    }
}


pub type Pool = Arc<PoolInner>;

pub type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Наблюдатель паник в задачах; по умолчанию паники глотаются молча
pub type FaultHook = Arc<dyn Fn(Box<dyn Any + Send>) + Send + Sync>;

enum QueueEntry {
    Task(Job),
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Live,
    Draining,
    Dead,
}

struct PoolState {
    lifecycle: Lifecycle,
    worker_count: usize,
    idle_count: usize,
    workers: Vec<JoinHandle<()>>,
    reaper: Option<JoinHandle<()>>,
}

#[inline(always)]
fn unlikely(b: bool) -> bool {
    #[cold]
    fn cold() {}
    if !b { cold() }
    b
}

/// Саморегулирующийся пул воркеров: растет до max_workers под нагрузкой,
/// реапер возвращает его к core_workers после keep_alive простоя
pub struct PoolInner {
    queue: Injector<QueueEntry>,
    queue_notify: Notify,
    shutdown_token: CancellationToken,
    state: Mutex<PoolState>,
    executed_jobs: AtomicUsize,
    faulted_jobs: AtomicUsize,
    on_fault: Option<FaultHook>,
    config: Config,
}

impl PoolInner {
    pub fn new(core_workers: usize, max_workers: usize) -> Result<Pool, ConfigError> {
        let config = Config {
            core_workers,
            max_workers,
            ..Default::default()
        };
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Result<Pool, ConfigError> {
        Self::build(config, None)
    }

    pub fn with_fault_observer(config: Config, on_fault: FaultHook) -> Result<Pool, ConfigError> {
        Self::build(config, Some(on_fault))
    }

    fn build(config: Config, on_fault: Option<FaultHook>) -> Result<Pool, ConfigError> {
        config.validate()?;

        let pool = Arc::new(PoolInner {
            queue: Injector::new(),
            queue_notify: Notify::new(),
            shutdown_token: CancellationToken::new(),
            state: Mutex::new(PoolState {
                lifecycle: Lifecycle::Live,
                worker_count: 0,
                idle_count: 0,
                workers: Vec::new(),
                reaper: None,
            }),
            executed_jobs: AtomicUsize::new(0),
            faulted_jobs: AtomicUsize::new(0),
            on_fault,
            config,
        });

        // Запускаем реапер и базовых воркеров
        let mut state = pool.state.lock().unwrap();
        state.reaper = Some({
            let pool = pool.clone();
            tokio::spawn(async move { pool.reaper_loop().await })
        });
        if pool.config.init_core {
            for _ in 0..pool.config.core_workers {
                Self::spawn_worker(&pool, &mut state);
            }
        }
        drop(state);

        Ok(pool)
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Запустить задачу асинхронно. Нет идл-воркеров - пул растет,
    /// достигнут max_workers - задача ждет в очереди
    pub fn run<F>(self: &Arc<Self>, job: F) -> Result<(), PoolError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.submit(Box::pin(job), true)
    }

    /// Как run, но при насыщенном пуле возвращает Rejected вместо очереди
    pub fn try_run<F>(self: &Arc<Self>, job: F) -> Result<(), PoolError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.submit(Box::pin(job), false)
    }

    fn submit(self: &Arc<Self>, job: Job, must_enqueue: bool) -> Result<(), PoolError> {
        let mut state = self.state.lock().unwrap();
        if state.lifecycle != Lifecycle::Live {
            return Err(PoolError::Closed);
        }
        if state.idle_count == 0 {
            if state.worker_count < self.config.max_workers {
                Self::spawn_worker(self, &mut state);
            } else if !must_enqueue {
                return Err(PoolError::Rejected);
            }
        }
        self.push_entry(QueueEntry::Task(job));
        Ok(())
    }

    fn spawn_worker(pool: &Pool, state: &mut PoolState) {
        state.workers.retain(|worker| !worker.is_finished());
        state.workers.push({
            let pool = pool.clone();
            tokio::spawn(async move { pool.worker_loop().await })
        });
        state.worker_count += 1;
        debug!(workers = state.worker_count, "spawned worker");
    }

    #[inline(always)]
    fn push_entry(&self, entry: QueueEntry) {
        self.queue.push(entry);
        self.queue_notify.notify_one();
    }

    fn try_pop(&self) -> Option<QueueEntry> {
        loop {
            match self.queue.steal() {
                Steal::Success(entry) => return Some(entry),
                Steal::Empty => return None,
                Steal::Retry => continue,
            }
        }
    }

    async fn next_entry(&self) -> QueueEntry {
        loop {
            if let Some(entry) = self.try_pop() {
                // notify_one хранит максимум один пермит, будим следующего
                if unlikely(!self.queue.is_empty()) {
                    self.queue_notify.notify_one();
                }
                return entry;
            }
            self.state.lock().unwrap().idle_count += 1;
            self.queue_notify.notified().await;
            let mut state = self.state.lock().unwrap();
            state.idle_count = state.idle_count.saturating_sub(1);
        }
    }

    async fn worker_loop(&self) {
        loop {
            match self.next_entry().await {
                QueueEntry::Task(job) => {
                    match AssertUnwindSafe(job).catch_unwind().await {
                        Ok(()) => {
                            self.executed_jobs.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(panic) => {
                            self.faulted_jobs.fetch_add(1, Ordering::Relaxed);
                            warn!("job panicked, worker continues");
                            if let Some(hook) = &self.on_fault {
                                hook(panic);
                            }
                        }
                    }
                }
                QueueEntry::Stop => {
                    let mut state = self.state.lock().unwrap();
                    state.worker_count = state.worker_count.saturating_sub(1);
                    debug!(workers = state.worker_count, "worker retired");
                    return;
                }
            }
        }
    }

    async fn reaper_loop(&self) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.config.keep_alive) => {}
                _ = self.shutdown_token.cancelled() => return,
            }
            let state = self.state.lock().unwrap();
            if state.lifecycle != Lifecycle::Live {
                return;
            }
            // Убираем половину лишних идл-воркеров, минимум одного
            let excess = state.idle_count.saturating_sub(self.config.core_workers);
            if excess > 0 {
                let stops = (excess / 2).max(1);
                debug!(excess, stops, "retiring idle workers");
                for _ in 0..stops {
                    self.push_entry(QueueEntry::Stop);
                }
            }
        }
    }

    /// Мягкое закрытие: дорабатывает очередь и ждет завершения всех
    /// воркеров и реапера
    pub async fn close(self: &Arc<Self>) -> Result<(), PoolError> {
        let (workers, reaper) = {
            let mut state = self.state.lock().unwrap();
            if state.lifecycle != Lifecycle::Live {
                return Err(PoolError::Closed);
            }
            state.lifecycle = Lifecycle::Draining;
            debug!(workers = state.worker_count, "draining pool");
            // Стоп-маркер на каждого воркера, очередь FIFO - задачи доработаются
            for _ in 0..state.worker_count {
                self.push_entry(QueueEntry::Stop);
            }
            self.shutdown_token.cancel();
            (std::mem::take(&mut state.workers), state.reaper.take())
        };

        for worker in workers {
            let _ = worker.await;
        }
        if let Some(reaper) = reaper {
            let _ = reaper.await;
        }

        self.state.lock().unwrap().lifecycle = Lifecycle::Dead;
        Ok(())
    }

    /// Жесткое закрытие: мгновенно снимает воркеров, хвост очереди пропадает
    pub fn close_now(self: &Arc<Self>) -> Result<(), PoolError> {
        let mut state = self.state.lock().unwrap();
        if state.lifecycle != Lifecycle::Live {
            return Err(PoolError::Closed);
        }
        state.lifecycle = Lifecycle::Dead;
        debug!(
            workers = state.worker_count,
            queued = self.queue.len(),
            "force closing pool"
        );
        self.shutdown_token.cancel();
        for worker in state.workers.drain(..) {
            worker.abort();
        }
        state.reaper.take();
        state.worker_count = 0;
        state.idle_count = 0;
        Ok(())
    }

    pub async fn close_timeout(self: &Arc<Self>, timeout: Duration) -> Result<(), PoolError> {
        match tokio::time::timeout(timeout, self.close()).await {
            Ok(result) => result,
            Err(_) => {
                let mut state = self.state.lock().unwrap();
                state.lifecycle = Lifecycle::Dead;
                state.worker_count = 0;
                state.idle_count = 0;
                Err(PoolError::ShutdownTimeout)
            }
        }
    }

    pub fn is_live(&self) -> bool {
        self.state.lock().unwrap().lifecycle == Lifecycle::Live
    }

    #[inline]
    pub fn metrics(&self) -> PoolMetrics {
        let state = self.state.lock().unwrap();
        PoolMetrics {
            worker_count: state.worker_count,
            idle_workers: state.idle_count,
            queued_jobs: self.queue.len(),
            executed_jobs: self.executed_jobs.load(Ordering::Relaxed),
            faulted_jobs: self.faulted_jobs.load(Ordering::Relaxed),
        }
    }

    /// Создать пул, отдать его замыканию и мягко закрыть на выходе
    pub async fn scoped<T, F, Fut>(config: Config, f: F) -> Result<T, ConfigError>
    where
        F: FnOnce(Pool) -> Fut,
        Fut: Future<Output = T>,
    {
        let pool = Self::with_config(config)?;
        let out = f(pool.clone()).await;
        let _ = pool.close().await;
        Ok(out)
    }
}
