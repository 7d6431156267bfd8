pub mod base;
pub mod file_store;
pub mod memory_store;
pub mod no_store;

// Re-export the primary storage items so code outside can do
// "use crate::store::{SessionPersistence, create_persistence};"
pub use base::{PersistenceError, SessionPersistence, create_persistence};
pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use no_store::NoStore;
