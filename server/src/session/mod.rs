//! Session engine: per-round state and the registry that owns it.

pub mod registry;
pub mod state;

pub use registry::SessionRegistry;
pub use state::{PlayerId, Session, SessionError, SessionId};
