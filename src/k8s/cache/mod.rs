pub mod cached_data;
pub mod config;
pub mod errors;
pub mod key;
pub mod memory;
pub mod read_through;
pub mod redis_backend;
pub mod store;

pub use config::ResourceKind;
pub use errors::CacheError;
pub use key::CacheKey;
pub use memory::MemoryBackend;
pub use read_through::{Lookup, ResourceCache};
pub use redis_backend::RedisBackend;
pub use store::{CacheBackend, CacheStore};
