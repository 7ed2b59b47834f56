//! WebSocket endpoint layer
//!
//! Translates client commands into engine calls and forwards session events
//! back to connected clients.

pub mod websocket;

pub use websocket::{AppState, ws_handler};
