use elastic_pool::{Config, PoolInner};
use tokio::runtime::Builder;
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};


fn main(){
    let rt = Builder::new_multi_thread()
    .enable_all()
    .build()
    .unwrap();

    rt.block_on(async{
        let now = Instant::now();
        let pool = PoolInner::with_config(Config::with_core(4)).unwrap();
        let total = Arc::new(AtomicU64::new(0));
        for i in 0..1_000_000u64 {
            let total = total.clone();
            pool.run(async move {
                total.fetch_add(i, Ordering::Relaxed);
            }).unwrap();
        }
        let metrics = pool.metrics();
        pool.close().await.unwrap();
        println!("sum: {}", total.load(Ordering::Relaxed));
        println!("workers at peak: {}", metrics.worker_count);
        println!("elapsed: {:?}", now.elapsed());
    });


}
