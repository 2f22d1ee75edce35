#[cfg(test)]
mod tests {
    use elastic_pool::{
    errors::PoolError,
    pool::{
        Config,
        PoolInner,
        },
    };
    use std::{
        future::Future,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::{Duration, Instant},
    };

    async fn measure<F, Fut, T>(name: &str, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let start = Instant::now();
        let result = f().await;
        let elapsed = start.elapsed();
        println!("✓ {}: {:?}", name, elapsed);
        result
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn load_test_1_small_fast_jobs() {
        println!("\n=== LOAD TEST 1: 10k быстрых задач ===");
        let pool = PoolInner::new(4, 16).unwrap();
        let acc = Arc::new(AtomicUsize::new(0));

        measure("10k fire-and-forget", || async {
            for i in 0..10_000 {
                let acc = acc.clone();
                pool.run(async move {
                    acc.fetch_add(i, Ordering::Relaxed);
                })
                .unwrap();
            }
            pool.close().await.unwrap();
        })
        .await;

        assert_eq!(acc.load(Ordering::Relaxed), 10_000 * 9_999 / 2);
        let metrics = pool.metrics();
        assert_eq!(metrics.executed_jobs, 10_000);
        println!("  Выполнено: {}", metrics.executed_jobs);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn load_test_2_slow_jobs_drain() {
        println!("\n=== LOAD TEST 2: 2k задач с ожиданием ===");
        let config = Config {
            core_workers: 4,
            max_workers: 32,
            keep_alive: Duration::from_secs(1),
            init_core: true,
        };
        let pool = PoolInner::with_config(config).unwrap();
        let done = Arc::new(AtomicUsize::new(0));

        measure("2k tasks @ 1ms", || async {
            for _ in 0..2_000 {
                let done = done.clone();
                pool.run(async move {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    done.fetch_add(1, Ordering::Relaxed);
                })
                .unwrap();
            }
            pool.close().await.unwrap();
        })
        .await;

        assert_eq!(done.load(Ordering::Relaxed), 2_000, "close дорабатывает всю очередь");
        assert!(!pool.is_live());
        let metrics = pool.metrics();
        println!("  Success rate: {:.1}%", metrics.success_rate() * 100.0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn load_test_3_panic_mix() {
        println!("\n=== LOAD TEST 3: 1k задач, каждая десятая падает ===");

        // Подавляем вывод паник
        let _guard = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));

        let pool = PoolInner::new(4, 8).unwrap();
        for i in 0..1_000 {
            pool.run(async move {
                if i % 10 == 0 {
                    panic!("test panic");
                }
            })
            .unwrap();
        }
        pool.close().await.unwrap();

        let metrics = pool.metrics();
        println!("  Выполнено: {}", metrics.executed_jobs);
        println!("  Упало: {}", metrics.faulted_jobs);
        println!("  Success rate: {:.1}%", metrics.success_rate() * 100.0);

        assert_eq!(metrics.executed_jobs, 900);
        assert_eq!(metrics.faulted_jobs, 100);

        drop(_guard);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn load_test_4_try_run_flood() {
        println!("\n=== LOAD TEST 4: try_run под потоком ===");
        let pool = PoolInner::new(1, 2).unwrap();
        let done = Arc::new(AtomicUsize::new(0));

        let mut accepted = 0usize;
        let mut rejected = 0usize;
        for _ in 0..10_000 {
            let done = done.clone();
            match pool.try_run(async move {
                done.fetch_add(1, Ordering::Relaxed);
            }) {
                Ok(()) => accepted += 1,
                Err(PoolError::Rejected) => rejected += 1,
                Err(other) => panic!("неожиданная ошибка: {other}"),
            }
        }
        pool.close().await.unwrap();

        println!("  Принято: {}, отклонено: {}", accepted, rejected);
        assert_eq!(accepted + rejected, 10_000);
        assert_eq!(done.load(Ordering::Relaxed), accepted, "каждая принятая задача выполнена");
        assert_eq!(pool.metrics().executed_jobs, accepted);
        assert!(pool.metrics().worker_count <= 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn load_test_5_burst_cycles() {
        println!("\n=== LOAD TEST 5: Волны нагрузки ===");
        let config = Config {
            core_workers: 2,
            max_workers: 16,
            keep_alive: Duration::from_millis(50),
            init_core: true,
        };
        let pool = PoolInner::with_config(config).unwrap();
        let done = Arc::new(AtomicUsize::new(0));

        for wave in 0..3 {
            for _ in 0..200 {
                let done = done.clone();
                pool.run(async move {
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    done.fetch_add(1, Ordering::Relaxed);
                })
                .unwrap();
            }
            // Пауза между волнами - реапер успевает срезать часть пула
            tokio::time::sleep(Duration::from_millis(150)).await;
            let metrics = pool.metrics();
            println!(
                "  Волна {}: воркеров {}, идл {}",
                wave, metrics.worker_count, metrics.idle_workers
            );
            assert!(metrics.worker_count <= 16, "max_workers не превышается");
            assert!(metrics.worker_count >= 2, "ниже core пул не падает");
        }

        pool.close().await.unwrap();
        assert_eq!(done.load(Ordering::Relaxed), 600);
    }
}
