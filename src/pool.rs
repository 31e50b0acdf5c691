use super::{
    errors::{PoolError, PoolResult},
    handle::{signal, Completion, Signal, Task},
    model::PoolMetrics,
};
use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    task::{Context, Poll},
    thread::{self, JoinHandle},
};
use crossbeam::channel::{self, Receiver, Sender};
use futures::future::FusedFuture;
use tracing::{debug, trace, warn};


/// Конфигурация пула воркеров
#[derive(Debug, Clone)]
pub struct Config {
    pub num_workers: usize,
    /// Вести счетчик задач в работе и останавливать fill, когда все воркеры заняты
    pub track_in_flight: bool,
    pub thread_name: String,
    pub stack_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_workers: num_cpus::get(),
            track_in_flight: true,
            thread_name: "pool-worker".to_owned(),
            stack_size: None,
        }
    }
}

impl Config {
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers,
            ..Default::default()
        }
    }

    pub fn cpu_bound() -> Self {
        Self::new(num_cpus::get())
    }

    /// Воркеры в основном ждут I/O, поэтому берем с запасом
    pub fn io_bound() -> Self {
        Self::new(num_cpus::get() * 2)
    }

    pub fn untracked(mut self) -> Self {
        self.track_in_flight = false;
        self
    }

    fn worker_builder(&self, index: usize) -> thread::Builder {
        let builder = thread::Builder::new().name(format!("{}-{}", self.thread_name, index));
        match self.stack_size {
            Some(size) => builder.stack_size(size),
            None => builder,
        }
    }
}


#[derive(Debug)]
struct Counters {
    alive: AtomicUsize,
    in_flight: AtomicUsize,
    submitted: AtomicUsize,
    completed: AtomicUsize,
    panicked: AtomicUsize,
}

impl Counters {
    fn new(workers: usize) -> Self {
        Self {
            alive: AtomicUsize::new(workers),
            in_flight: AtomicUsize::new(0),
            submitted: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            panicked: AtomicUsize::new(0),
        }
    }

    /// Каждый живой воркер уже держит задачу (или ждущего отправителя)
    #[inline]
    fn is_saturated(&self) -> bool {
        // in_flight читаем первым: воркер с паникой уменьшает alive раньше, чем освобождает слот
        let in_flight = self.in_flight.load(Ordering::Acquire);
        in_flight >= self.alive.load(Ordering::Acquire)
    }

    fn snapshot(&self, workers: usize) -> PoolMetrics {
        PoolMetrics {
            workers,
            live_workers: self.alive.load(Ordering::Acquire),
            in_flight: self.in_flight.load(Ordering::Acquire),
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
        }
    }
}

/// Освобождает слот in-flight после задачи, в том числе при раскрутке паники
struct InFlightGuard<'a>(&'a Counters);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            // Воркер умирает вместе с задачей
            self.0.alive.fetch_sub(1, Ordering::Release);
            self.0.panicked.fetch_add(1, Ordering::Relaxed);
        } else {
            self.0.completed.fetch_add(1, Ordering::Relaxed);
        }
        self.0.in_flight.fetch_sub(1, Ordering::Release);
    }
}


/// Фиксированный набор потоков-воркеров, задачи передаются через rendezvous-канал.
///
/// Каждая отправка блокируется, пока свободный воркер не примет задачу: занятый пул
/// тормозит отправителей, а не копит очередь. [`Pool::close`] и [`Pool::wait_and_close`]
/// забирают пул по значению, поэтому отправка после закрытия и двойное закрытие
/// не компилируются. Drop открытого пула закрывает канал без ожидания.
///
/// Паника в задаче убивает только ее воркер. Остальные продолжают работу,
/// [`Pool::call_workers_until_fill`] ограничивается живыми воркерами (при включенном
/// счетчике), а закрытие возвращает [`PoolError::WorkerPanicked`].
pub struct Pool {
    size: usize,
    dispatch: Sender<Task>,
    termination: Termination,
    counters: Option<Arc<Counters>>,
}

impl Pool {
    pub fn new(num_workers: usize) -> PoolResult<Self> {
        Self::with_config(Config::new(num_workers))
    }

    pub fn with_config(config: Config) -> PoolResult<Self> {
        let (dispatch, tasks) = channel::bounded::<Task>(0);
        let counters = config
            .track_in_flight
            .then(|| Arc::new(Counters::new(config.num_workers)));

        let mut workers = Vec::with_capacity(config.num_workers);
        for index in 0..config.num_workers {
            let tasks = tasks.clone();
            let counters = counters.clone();
            let handle = config
                .worker_builder(index)
                .spawn(move || worker_loop(index, tasks, counters))
                .map_err(|e| PoolError::Spawn(e.to_string()))?;
            workers.push(handle);
        }
        // Receiver держат только воркеры, иначе пул без воркеров блокировал бы
        // отправителей навсегда вместо Disconnected
        drop(tasks);

        let (finished, completion) = signal();
        thread::Builder::new()
            .name(format!("{}-supervisor", config.thread_name))
            .spawn(move || supervise(workers, finished))
            .map_err(|e| PoolError::Spawn(e.to_string()))?;

        debug!(
            workers = config.num_workers,
            track_in_flight = config.track_in_flight,
            "pool started"
        );

        Ok(Self {
            size: config.num_workers,
            dispatch,
            termination: Termination {
                completion,
                counters: counters.clone(),
                size: config.num_workers,
            },
            counters,
        })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Передает `task` первому свободному воркеру, блокируясь до момента приема.
    pub fn call_worker<F>(&self, task: F) -> PoolResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.dispatch(Box::new(task))
    }

    /// Отправляет `task` по разу на каждого воркера, для долгих циклов вроде
    /// потребителей канала. Возвращает число переданных копий.
    ///
    /// Со счетчиком fill останавливается, как только задач в работе не меньше,
    /// чем живых воркеров. Проверка гоняется с другими отправителями, так что это
    /// ограничение best-effort. Без счетчика отправляется ровно `size` копий, и вызов
    /// блокируется, пока воркеры заняты.
    pub fn call_workers_until_fill<F>(&self, task: F) -> PoolResult<usize>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let task = Arc::new(task);
        let mut submitted = 0;
        for _ in 0..self.size {
            if self.counters.as_deref().is_some_and(Counters::is_saturated) {
                break;
            }
            let task = Arc::clone(&task);
            self.dispatch(Box::new(move || task()))?;
            submitted += 1;
        }
        debug!(submitted, workers = self.size, "fill finished");
        Ok(submitted)
    }

    /// Снимок числа задач, переданных и еще не завершенных; `None` без счетчика.
    /// Отправитель, ждущий приема, уже учтен.
    #[inline]
    pub fn in_flight(&self) -> Option<usize> {
        self.counters
            .as_ref()
            .map(|c| c.in_flight.load(Ordering::Acquire))
    }

    #[inline]
    pub fn metrics(&self) -> Option<PoolMetrics> {
        self.counters.as_ref().map(|c| c.snapshot(self.size))
    }

    /// Закрывает канал без ожидания. Воркеры доделывают текущую задачу и выходят,
    /// возвращенный [`Termination`] срабатывает, когда выйдут все.
    pub fn close(self) -> Termination {
        let Pool {
            dispatch,
            termination,
            ..
        } = self;
        drop(dispatch);
        debug!("dispatch channel closed");
        termination
    }

    /// Закрывает пул и ждет выхода всех воркеров. После возврата видны побочные
    /// эффекты всех задач.
    ///
    /// # Panics
    ///
    /// Паникует внутри async runtime; там нужно `.await` на [`Pool::close`].
    pub fn wait_and_close(self) -> PoolResult<()> {
        self.close().wait()
    }

    fn dispatch(&self, task: Task) -> PoolResult<()> {
        // Учитываем до передачи, чтобы воркер не мог освободить еще не занятый слот
        if let Some(counters) = &self.counters {
            counters.in_flight.fetch_add(1, Ordering::AcqRel);
            counters.submitted.fetch_add(1, Ordering::Relaxed);
        }
        if self.dispatch.send(task).is_err() {
            if let Some(counters) = &self.counters {
                counters.submitted.fetch_sub(1, Ordering::Relaxed);
                counters.in_flight.fetch_sub(1, Ordering::AcqRel);
            }
            warn!(workers = self.size, "handoff failed, no worker left");
            return Err(PoolError::Disconnected);
        }
        Ok(())
    }
}


fn worker_loop(index: usize, tasks: Receiver<Task>, counters: Option<Arc<Counters>>) {
    trace!(worker = index, "worker started");
    for task in tasks.iter() {
        let _guard = counters.as_deref().map(InFlightGuard);
        task();
    }
    if let Some(counters) = &counters {
        counters.alive.fetch_sub(1, Ordering::Release);
    }
    trace!(worker = index, "worker exited");
}

fn supervise(workers: Vec<JoinHandle<()>>, finished: Signal<usize>) {
    let mut panicked = 0;
    for (index, worker) in workers.into_iter().enumerate() {
        if worker.join().is_err() {
            warn!(worker = index, "worker terminated by a panicking task");
            panicked += 1;
        }
    }
    debug!(panicked, "all workers exited");
    finished.fire(panicked);
}


/// Срабатывает, когда все воркеры закрытого пула вышли.
///
/// Сохраняет доступ к счетчикам пула, так что итог можно посмотреть после
/// остановки. Повторное ожидание возвращает [`PoolError::SignalConsumed`].
#[must_use = "a Termination does nothing unless waited on or awaited"]
pub struct Termination {
    completion: Completion<usize>,
    counters: Option<Arc<Counters>>,
    size: usize,
}

impl Termination {
    /// # Panics
    ///
    /// Паникует при вызове внутри async runtime.
    pub fn wait(&mut self) -> PoolResult<()> {
        self.completion.wait().and_then(check_panicked)
    }

    pub fn in_flight(&self) -> Option<usize> {
        self.counters
            .as_ref()
            .map(|c| c.in_flight.load(Ordering::Acquire))
    }

    pub fn metrics(&self) -> Option<PoolMetrics> {
        self.counters.as_ref().map(|c| c.snapshot(self.size))
    }
}

fn check_panicked(panicked: usize) -> PoolResult<()> {
    if panicked == 0 {
        Ok(())
    } else {
        Err(PoolError::WorkerPanicked(panicked))
    }
}

impl Future for Termination {
    type Output = PoolResult<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().completion)
            .poll(cx)
            .map(|res| res.and_then(check_panicked))
    }
}

impl FusedFuture for Termination {
    #[inline]
    fn is_terminated(&self) -> bool {
        self.completion.is_terminated()
    }
}
