//! Саморегулирующийся пул воркеров поверх tokio runtime
//!
//! # Features
//! - Fire-and-forget запуск задач без владения их жизненным циклом
//! - Эластичный размер: от core_workers до max_workers по нагрузке
//! - Реапер возвращает простаивающий пул к core-размеру
//! - Изоляция паник: упавшая задача не роняет воркера и пул
//! - Graceful close с дорабатыванием очереди и вариант с таймаутом
//! - Метрики пула

pub mod errors;
pub mod model;
pub mod pool;

pub use pool::{Config, Pool, PoolInner};
