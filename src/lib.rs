//! GrantEzy session lifecycle.
//!
//! The library holds the client-side session: store, hydration guard,
//! background refresh and the context that owns them. The binary runs the
//! edge gate in front of the page shell.

pub mod backend;
pub mod config;
pub mod context;
pub mod gate;
pub mod guard;
pub mod models;
pub mod navigation;
pub mod refresh;
pub mod routes;
pub mod session;
pub mod startup;
pub mod state;
pub mod store;
pub mod utils;

pub use context::SessionContext;
pub use session::{AuthError, SessionStore};
