#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub worker_count: usize,
    pub idle_workers: usize,
    pub queued_jobs: usize,
    pub executed_jobs: usize,
    pub faulted_jobs: usize,
}

impl PoolMetrics {
    pub fn busy_workers(&self) -> usize {
        self.worker_count.saturating_sub(self.idle_workers)
    }

    pub fn utilization(&self) -> f64 {
        if self.worker_count == 0 {
            return 0.0;
        }
        self.busy_workers() as f64 / self.worker_count as f64
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.executed_jobs + self.faulted_jobs;
        if total == 0 {
            return 1.0;
        }
        self.executed_jobs as f64 / total as f64
    }
}
