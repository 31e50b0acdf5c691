#![allow(dead_code)]

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

/// Запоминает обработанные значения, чтобы поймать повторную обработку.
/// Создается заново в каждом тесте, параллельные тесты состояние не делят
#[derive(Clone, Default)]
pub struct ProcessedSet {
    seen: Arc<Mutex<HashSet<i64>>>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// false, если `value` уже был записан
    pub fn record(&self, value: i64) -> bool {
        self.seen.lock().unwrap().insert(value)
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn contains_range(&self, range: std::ops::Range<i64>) -> bool {
        let seen = self.seen.lock().unwrap();
        range.into_iter().all(|v| seen.contains(&v))
    }
}


pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
