pub mod app_config;
pub mod database;
pub mod memory;
pub mod redis_repo;
#[cfg(feature = "kafka")]
pub mod events;

pub use app_config::{BusinessRules, Config};
pub use database::PgStore;
#[cfg(feature = "kafka")]
pub use events::{NotificationProducer, ProduceError};
pub use memory::MemoryStore;
pub use redis_repo::RedisClient;
