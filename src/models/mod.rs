pub mod session;
pub mod user;

pub use session::{PersistedSession, SessionSnapshot};
pub use user::{Role, User};
