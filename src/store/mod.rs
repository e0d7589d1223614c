pub mod base;
pub mod file_store;
pub mod memory_store;
pub mod records;

// Re-export the primary Store items so code outside can do
// "use crate::store::{Store, create_store};"
pub use base::{create_store, Store};
pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use records::{TokenRecordStore, PROFILE_KEY, TOKEN_KEY};
