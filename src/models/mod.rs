pub mod profile;
pub mod session;
pub mod token;

pub use profile::Profile;
pub use session::{Session, SessionStatus};
pub use token::{TokenRecord, TokenSet};
