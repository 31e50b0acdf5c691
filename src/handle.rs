use super::errors::{PoolError, PoolResult};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use futures::future::FusedFuture;
use tokio::{
    sync::oneshot::{self, error::TryRecvError},
    time::Duration,
};


pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Отправляющая половина одноразового сигнала завершения
pub(crate) struct Signal<T = ()> {
    sender: oneshot::Sender<T>,
}

impl<T> Signal<T> {
    #[inline]
    pub(crate) fn fire(self, value: T) {
        // Completion уже дропнут, слушать некому
        let _ = self.sender.send(value);
    }
}

pub(crate) fn signal<T>() -> (Signal<T>, Completion<T>) {
    let (sender, receiver) = oneshot::channel();
    (Signal { sender }, Completion::new(receiver))
}


/// Срабатывает ровно один раз, когда связанная работа закончена.
///
/// Из блокирующего кода ждем через [`Completion::wait`], из async кода делаем `.await`.
#[must_use = "a Completion does nothing unless waited on or awaited"]
#[derive(Debug)]
pub struct Completion<T = ()> {
    receiver: Option<oneshot::Receiver<T>>,
}

impl<T> Completion<T> {

    fn new(receiver: oneshot::Receiver<T>) -> Self {
        Self {
            receiver: Some(receiver),
        }
    }

    /// Блокирует текущий поток до срабатывания сигнала. Значение забирается один раз,
    /// повторные вызовы возвращают [`PoolError::SignalConsumed`].
    ///
    /// # Panics
    ///
    /// Паникует внутри async runtime; там нужно `.await`.
    pub fn wait(&mut self) -> PoolResult<T> {
        match self.receiver.take() {
            Some(receiver) => receiver.blocking_recv().map_err(|_| PoolError::SignalLost),
            None => Err(PoolError::SignalConsumed),
        }
    }

    /// Проверка без блокировки. `Ok(None)` - сигнал еще не сработал
    pub fn try_wait(&mut self) -> PoolResult<Option<T>> {
        let receiver = self.receiver.as_mut().ok_or(PoolError::SignalConsumed)?;
        match receiver.try_recv() {
            Ok(value) => {
                self.receiver = None;
                Ok(Some(value))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Closed) => {
                self.receiver = None;
                Err(PoolError::SignalLost)
            }
        }
    }

    pub async fn await_timeout(self, timeout: Duration) -> PoolResult<T> {
        match tokio::time::timeout(timeout, self).await {
            Ok(result) => result,
            Err(_) => Err(PoolError::Timeout),
        }
    }
}

impl<T> Future for Completion<T> {
    type Output = PoolResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let Some(receiver) = this.receiver.as_mut() else {
            return Poll::Ready(Err(PoolError::SignalConsumed));
        };
        match Pin::new(receiver).poll(cx) {
            Poll::Ready(res) => {
                this.receiver = None;
                Poll::Ready(res.map_err(|_| PoolError::SignalLost))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> FusedFuture for Completion<T> {
    #[inline]
    fn is_terminated(&self) -> bool {
        self.receiver.is_none()
    }
}
