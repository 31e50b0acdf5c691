//! Пул воркеров фиксированного размера с rendezvous-передачей задач
//!
//! # Features
//! - Фиксированное число потоков-воркеров, каждый выполняет одну задачу за раз
//! - Прямая передача: отправка блокируется до приема воркером, без очереди
//! - Опциональный счетчик задач в работе и заполнение всех свободных воркеров
//! - Закрытие с ожиданием, которое сообщает о воркерах, убитых паникой
//! - Отдельный фоновый запуск с сигналом завершения, который можно ждать или await
//!
//! ```no_run
//! use handoff_pool::Pool;
//!
//! let pool = Pool::new(4).unwrap();
//! for i in 0..10 {
//!     pool.call_worker(move || println!("task {i}")).unwrap();
//! }
//! pool.wait_and_close().unwrap();
//! ```

pub mod background;
pub mod errors;
pub mod handle;
pub mod model;
pub mod pool;

pub use background::run_in_background;
pub use errors::{PoolError, PoolResult};
pub use handle::Completion;
pub use pool::{Config, Pool, Termination};
