mod common;

#[cfg(test)]
mod tests {
    use super::common::ProcessedSet;
    use handoff_pool::pool::{Config, Pool};
    use crossbeam::channel;
    use std::{
        sync::{
            atomic::{AtomicI64, AtomicUsize, Ordering},
            Arc,
        },
        thread,
        time::Instant,
    };

    fn measure<F, T>(name: &str, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let start = Instant::now();
        let result = f();
        println!("✓ {}: {:?}", name, start.elapsed());
        result
    }

    #[test]
    fn load_test_1_tasks_from_loop() {
        println!("\n=== LOAD TEST 1: 100k задач из цикла ===");
        const EXPECTED: i64 = 100_000;
        let processed = ProcessedSet::new();
        let count = Arc::new(AtomicI64::new(0));
        let duplicates = Arc::new(AtomicUsize::new(0));

        let pool = Pool::new(4).unwrap();
        measure("100k задач, 4 воркера", || {
            for i in 0..EXPECTED {
                let processed = processed.clone();
                let count = count.clone();
                let duplicates = duplicates.clone();
                pool.call_worker(move || {
                    if !processed.record(i) {
                        duplicates.fetch_add(1, Ordering::Relaxed);
                    }
                    count.fetch_add(1, Ordering::Relaxed);
                })
                .unwrap();
            }
        });
        pool.wait_and_close().unwrap();

        assert_eq!(count.load(Ordering::SeqCst), EXPECTED);
        assert_eq!(duplicates.load(Ordering::SeqCst), 0);
        assert_eq!(processed.len(), EXPECTED as usize);
        assert!(processed.contains_range(0..EXPECTED));
    }

    #[test]
    fn load_test_2_tasks_from_channel() {
        println!("\n=== LOAD TEST 2: 100k задач через канал ===");
        const EXPECTED: i64 = 100_000;
        let processed = ProcessedSet::new();
        let count = Arc::new(AtomicI64::new(0));
        let duplicates = Arc::new(AtomicUsize::new(0));

        let (values_tx, values_rx) = channel::bounded::<i64>(0);
        let producer = thread::spawn(move || {
            for i in 0..EXPECTED {
                values_tx.send(i).unwrap();
            }
        });

        let pool = Pool::new(4).unwrap();
        measure("100k задач из канала", || {
            for value in values_rx.iter() {
                let processed = processed.clone();
                let count = count.clone();
                let duplicates = duplicates.clone();
                pool.call_worker(move || {
                    if !processed.record(value) {
                        duplicates.fetch_add(1, Ordering::Relaxed);
                    }
                    count.fetch_add(1, Ordering::Relaxed);
                })
                .unwrap();
            }
        });
        pool.wait_and_close().unwrap();
        producer.join().unwrap();

        assert_eq!(count.load(Ordering::SeqCst), EXPECTED);
        assert_eq!(duplicates.load(Ordering::SeqCst), 0);
        assert!(processed.contains_range(0..EXPECTED));
    }

    #[test]
    fn load_test_3_coupled_pools_cancel_out() {
        println!("\n=== LOAD TEST 3: пулы производителя и потребителя ===");
        const INCREMENT_UNTIL: i64 = 100_000;
        let processed = ProcessedSet::new();
        let count = Arc::new(AtomicI64::new(0));
        let duplicates = Arc::new(AtomicUsize::new(0));
        let (between_tx, between_rx) = channel::bounded::<i64>(0);

        let pool_decrement = Pool::new(4).unwrap();
        let pool_increment = Pool::new(4).unwrap();

        let consumers = {
            let processed = processed.clone();
            let count = count.clone();
            let duplicates = duplicates.clone();
            pool_decrement
                .call_workers_until_fill(move || {
                    for value in between_rx.iter() {
                        if !processed.record(value) {
                            duplicates.fetch_add(1, Ordering::Relaxed);
                        }
                        count.fetch_add(value, Ordering::Relaxed);
                    }
                })
                .unwrap()
        };
        assert_eq!(consumers, 4);

        measure("100k пересланных значений", || {
            for i in 1..=INCREMENT_UNTIL {
                let processed = processed.clone();
                let count = count.clone();
                let duplicates = duplicates.clone();
                let between_tx = between_tx.clone();
                pool_increment
                    .call_worker(move || {
                        if !processed.record(i) {
                            duplicates.fetch_add(1, Ordering::Relaxed);
                        }
                        count.fetch_add(i, Ordering::Relaxed);
                        between_tx.send(-i).unwrap();
                    })
                    .unwrap();
            }
        });
        pool_increment.wait_and_close().unwrap();
        drop(between_tx);
        pool_decrement.wait_and_close().unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(duplicates.load(Ordering::SeqCst), 0);
        assert_eq!(processed.len(), 2 * INCREMENT_UNTIL as usize);
    }

    #[test]
    fn load_test_4_untracked_pool() {
        println!("\n=== LOAD TEST 4: пул без счетчика, несколько отправителей ===");
        const PER_SUBMITTER: usize = 10_000;
        let pool = Pool::with_config(Config::io_bound().untracked()).unwrap();
        let count = Arc::new(AtomicUsize::new(0));

        measure("4 отправителя x 10k", || {
            thread::scope(|s| {
                for _ in 0..4 {
                    let pool = &pool;
                    let count = count.clone();
                    s.spawn(move || {
                        for _ in 0..PER_SUBMITTER {
                            let count = count.clone();
                            pool.call_worker(move || {
                                count.fetch_add(1, Ordering::Relaxed);
                            })
                            .unwrap();
                        }
                    });
                }
            });
        });
        pool.wait_and_close().unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 4 * PER_SUBMITTER);
    }

    #[test]
    fn load_test_5_in_flight_stays_bounded() {
        println!("\n=== LOAD TEST 5: счетчик задач в работе под нагрузкой ===");
        let pool = Pool::new(4).unwrap();
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..2_000 {
            pool.call_worker(|| std::hint::spin_loop()).unwrap();
            // Читаем между отправками, ждущих отправителей нет
            let in_flight = pool.in_flight().unwrap();
            peak.fetch_max(in_flight, Ordering::Relaxed);
        }
        let mut termination = pool.close();
        termination.wait().unwrap();

        let peak = peak.load(Ordering::Relaxed);
        println!("  Пик задач в работе: {}", peak);
        assert!(peak <= 4, "Пик {} больше размера пула", peak);
        assert_eq!(termination.in_flight(), Some(0));
        assert_eq!(termination.metrics().unwrap().completed, 2_000);
    }
}
