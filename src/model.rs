#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolMetrics {
    pub workers: usize,
    pub live_workers: usize,
    pub in_flight: usize,
    pub submitted: usize,
    /// Задачи, вернувшиеся без паники
    pub completed: usize,
    pub panicked: usize,
}

impl PoolMetrics {
    pub fn idle_workers(&self) -> usize {
        self.live_workers.saturating_sub(self.in_flight)
    }

    /// Доля занятых живых воркеров, не больше 1.0: ждущие отправители тоже
    /// считаются задачами в работе
    pub fn utilization(&self) -> f64 {
        if self.live_workers == 0 {
            return 0.0;
        }
        (self.in_flight as f64 / self.live_workers as f64).min(1.0)
    }

    pub fn pending(&self) -> usize {
        self.submitted
            .saturating_sub(self.completed)
            .saturating_sub(self.panicked)
    }
}
