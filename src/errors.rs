use thiserror::Error;


#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PoolError {
    #[error("failed to spawn thread: {0}")]
    Spawn(String),
    /// Принимающих воркеров не осталось, передача не завершится никогда
    #[error("no worker is left to accept the task")]
    Disconnected,
    #[error("{0} worker(s) terminated by a panicking task")]
    WorkerPanicked(usize),
    /// Отправляющую сторону дропнули до срабатывания
    #[error("completion signal dropped before firing")]
    SignalLost,
    #[error("completion signal already observed")]
    SignalConsumed,
    #[error("timed out waiting for completion")]
    Timeout,
}

pub type PoolResult<T> = Result<T, PoolError>;
