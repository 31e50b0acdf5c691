use super::{
    errors::{PoolError, PoolResult},
    handle::{signal, Completion},
};
use std::thread;
use tracing::trace;


/// Запускает `task` в отдельном потоке вне любого пула.
///
/// Возвращается сразу; [`Completion`] срабатывает после возврата `task`. При панике
/// сигнал дропается без срабатывания, и ожидание вернет [`PoolError::SignalLost`].
pub fn run_in_background<F>(task: F) -> PoolResult<Completion>
where
    F: FnOnce() + Send + 'static,
{
    let (finished, completion) = signal();
    thread::Builder::new()
        .name("background-task".to_owned())
        .spawn(move || {
            trace!("background task started");
            task();
            finished.fire(());
            trace!("background task finished");
        })
        .map_err(|e| PoolError::Spawn(e.to_string()))?;
    Ok(completion)
}
