//! Library exports for sessiontron, shared between the binary and tests.

pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod pkce;
pub mod prompt;
pub mod session;
pub mod store;
pub mod utils;

pub use error::{GatewayError, SessionError};
pub use models::{Profile, Session, SessionStatus};
pub use session::AuthSession;
