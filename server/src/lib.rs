//! ScrumPoker Server Library
//!
//! This module exports the server components for use in integration tests
//! and external tooling.

pub mod config;
pub mod protocol;
pub mod publish;
pub mod server;
pub mod session;

// Re-export commonly used types
pub use protocol::{Choice, ClientMessage, ServerMessage};
pub use publish::{EventBus, Publisher};
pub use server::AppState;
pub use session::registry::SessionRegistry;
pub use session::state::{Session, SessionError};
