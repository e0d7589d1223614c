// This module re-exports important pieces for convenience,
// so we can "use crate::config::*" easily.
pub mod logging;
pub mod provider;
pub mod store;
pub mod types;

pub use logging::*;
pub use provider::*;
pub use store::*;
pub use types::*;
