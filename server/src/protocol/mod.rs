//! Wire and data types shared between the engine and the transport layer.

pub mod choice;
pub mod messages;

pub use choice::Choice;
pub use messages::{
    ChoiceTally, ClientMessage, ErrorCode, LiveStats, PlayerVote, ServerMessage, SessionEvent,
    Tally, VoteSummary,
};
