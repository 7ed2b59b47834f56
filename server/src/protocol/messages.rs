use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Choice;

/// One roster entry in a live snapshot: who is in the round and whether they
/// have voted. The choice itself stays hidden until the tally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerVote {
    pub player_id: Uuid,
    pub name: String,
    pub voted: bool,
}

/// Live, pre-reveal view of a round. Recomputed on every request, never
/// cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveStats {
    /// Roster sorted by display name.
    pub players: Vec<PlayerVote>,
    pub vote_count: usize,
    pub reset_requested: bool,
}

/// Count and voters for a single card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceTally {
    pub choice: Choice,
    pub count: usize,
    /// Display names of the voters, lexicographically sorted.
    pub voters: Vec<String>,
}

/// Aggregate statistics over the numeric votes of a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteSummary {
    pub average: f64,
    pub min: u32,
    pub max: u32,
    pub median: f64,
}

/// Revealed result of a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    /// `None` when no vote carries a numeric magnitude.
    pub summary: Option<VoteSummary>,
    /// One entry per card in deck order, including zero-count cards.
    pub choices: Vec<ChoiceTally>,
}

/// Payloads pushed through the notification sink after state changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Live snapshot, published after every roster or vote change.
    Stats { stats: LiveStats },
    /// Revealed tally.
    Result { result: Tally },
    /// The round was reset; votes are gone, the roster stands.
    Reset,
}

/// Client to Server messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a fresh session
    CreateSession,
    /// Join a session under a display name
    Join { session_id: String, name: String },
    /// Cast or change a vote
    Vote {
        session_id: String,
        player_id: Uuid,
        choice: Choice,
    },
    /// Remove a player from the round
    Kick { session_id: String, player_id: Uuid },
    /// Signal that a re-vote is wanted
    RequestReset { session_id: String },
    /// Clear all votes and start a new round
    Reset { session_id: String },
    /// Reveal the result
    Tally { session_id: String },
    /// Poll the live snapshot without side effects
    Stats { session_id: String },
}

/// Server to Client messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Session was created successfully
    SessionCreated { session_id: String },
    /// Successfully joined a session
    Joined { session_id: String, player_id: Uuid },
    /// Polled live snapshot (reply to a `Stats` request)
    Stats { stats: LiveStats },
    /// Event forwarded from one of the session topics this connection follows
    Event { topic: String, event: SessionEvent },
    /// Request was rejected
    Error { code: ErrorCode, message: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    SessionNotFound,
    DuplicateName,
    UnknownPlayer,
    InvalidMessage,
}
