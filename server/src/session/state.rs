use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use metrics::counter;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::protocol::{
    Choice, ChoiceTally, LiveStats, PlayerVote, SessionEvent, Tally, VoteSummary,
};
use crate::publish::{self, Publisher};

/// Session ID: 10-character base32 string (lowercase, a-z + 2-7)
pub type SessionId = String;

/// Player ID: opaque random identifier, never reused
pub type PlayerId = Uuid;

/// Charset for session IDs: lowercase base32 (a-z, 2-7) to avoid 0/1 confusion
const SESSION_ID_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz234567";
const SESSION_ID_LENGTH: usize = 10;

/// Generate a random session ID from UUID entropy, 5 bits per character.
pub fn generate_session_id() -> SessionId {
    let raw = Uuid::new_v4().as_u128();
    let mut id = String::with_capacity(SESSION_ID_LENGTH);
    for i in 0..SESSION_ID_LENGTH {
        let idx = ((raw >> (5 * i)) & 0x1f) as usize;
        id.push(SESSION_ID_CHARSET[idx] as char);
    }
    id
}

/// Get current timestamp in milliseconds
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("display name already taken: {0}")]
    DuplicateName(String),

    #[error("unknown player: {0}")]
    UnknownPlayer(PlayerId),

    #[error("session not found: {0}")]
    NotFound(SessionId),
}

/// Roster and votes live under one lock so no caller can observe a vote
/// without its player, or a player surviving a kick.
#[derive(Debug, Default)]
struct RoundState {
    players: HashMap<PlayerId, String>,
    votes: HashMap<PlayerId, Choice>,
}

/// One round of estimation for one group.
///
/// Every operation is safe under arbitrary concurrent invocation. Mutations
/// advance the activity clock and push a notification through the publisher;
/// [`Session::stats`] is the only read path with no side effects.
pub struct Session {
    id: SessionId,
    created_at: u64,
    last_activity: AtomicU64,
    reset_requested: AtomicBool,
    round: RwLock<RoundState>,
    publisher: Arc<dyn Publisher>,
}

impl Session {
    pub fn new(id: SessionId, publisher: Arc<dyn Publisher>) -> Self {
        let now = now_millis();
        Self {
            id,
            created_at: now,
            last_activity: AtomicU64::new(now),
            reset_requested: AtomicBool::new(false),
            round: RwLock::new(RoundState::default()),
            publisher,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Creation timestamp in epoch milliseconds
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Timestamp of the most recent mutating operation, epoch milliseconds
    pub fn last_activity(&self) -> u64 {
        self.last_activity.load(Ordering::Acquire)
    }

    /// Register a player under a display name.
    ///
    /// The duplicate check and the insert happen under one write-lock
    /// acquisition, so of two concurrent joins with the same name at most one
    /// wins.
    pub async fn join(&self, name: &str) -> Result<PlayerId, SessionError> {
        let (player_id, stats) = {
            let mut round = self.round.write().await;
            if round.players.values().any(|existing| existing == name) {
                return Err(SessionError::DuplicateName(name.to_string()));
            }
            let player_id = Uuid::new_v4();
            round.players.insert(player_id, name.to_string());
            (player_id, self.snapshot(&round))
        };
        self.touch();
        debug!("Player {} joined session {}", player_id, self.id);
        self.publish_stats(stats);
        Ok(player_id)
    }

    /// Cast or overwrite a vote. Unknown players are rejected before any
    /// state is written. Re-voting the same card still notifies.
    pub async fn vote(&self, player_id: PlayerId, choice: Choice) -> Result<(), SessionError> {
        let stats = {
            let mut round = self.round.write().await;
            if !round.players.contains_key(&player_id) {
                return Err(SessionError::UnknownPlayer(player_id));
            }
            round.votes.insert(player_id, choice);
            self.snapshot(&round)
        };
        self.touch();
        counter!("scrumpoker_votes_cast_total").increment(1);
        self.publish_stats(stats);
        Ok(())
    }

    /// Remove a player and their vote. Absent ids are a no-op, not an error.
    pub async fn kick(&self, player_id: PlayerId) {
        let stats = {
            let mut round = self.round.write().await;
            round.players.remove(&player_id);
            round.votes.remove(&player_id);
            self.snapshot(&round)
        };
        self.touch();
        debug!("Player {} kicked from session {}", player_id, self.id);
        self.publish_stats(stats);
    }

    /// Signal that some participant wants a re-vote. Only the call that flips
    /// the flag notifies; later calls while it is set are silent.
    pub async fn request_reset(&self) {
        if self
            .reset_requested
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let stats = self.snapshot(&*self.round.read().await);
            self.touch();
            self.publish_stats(stats);
        }
    }

    /// Start a new round: votes and the reset flag are cleared, the roster
    /// stays. Always emits a reset event, whether or not one was requested.
    pub async fn reset(&self) {
        self.reset_requested.store(false, Ordering::Release);
        {
            let mut round = self.round.write().await;
            round.votes.clear();
        }
        self.touch();
        self.publisher
            .publish(&publish::reset_topic(&self.id), SessionEvent::Reset);
    }

    /// Reveal the round. Tallying counts as activity and extends the
    /// session's life.
    pub async fn tally(&self) -> Tally {
        let tally = {
            let round = self.round.read().await;

            let choices = Choice::ALL
                .iter()
                .map(|&choice| {
                    let mut voters: Vec<String> = round
                        .votes
                        .iter()
                        .filter(|(_, vote)| **vote == choice)
                        .filter_map(|(id, _)| round.players.get(id).cloned())
                        .collect();
                    voters.sort();
                    ChoiceTally {
                        choice,
                        count: voters.len(),
                        voters,
                    }
                })
                .collect();

            let mut numeric: Vec<u32> = round
                .votes
                .values()
                .filter_map(|vote| vote.magnitude())
                .collect();
            numeric.sort_unstable();

            Tally {
                summary: summarize(&numeric),
                choices,
            }
        };
        self.touch();
        self.publisher.publish(
            &publish::result_topic(&self.id),
            SessionEvent::Result {
                result: tally.clone(),
            },
        );
        tally
    }

    /// Live snapshot with no side effects: nothing is published and the
    /// activity clock does not move.
    pub async fn stats(&self) -> LiveStats {
        self.snapshot(&*self.round.read().await)
    }

    /// Current vote of a roster member; `None` if they have not voted yet.
    pub async fn vote_of(&self, player_id: PlayerId) -> Result<Option<Choice>, SessionError> {
        let round = self.round.read().await;
        if !round.players.contains_key(&player_id) {
            return Err(SessionError::UnknownPlayer(player_id));
        }
        Ok(round.votes.get(&player_id).copied())
    }

    /// Display name of a roster member.
    pub async fn player_name(&self, player_id: PlayerId) -> Result<String, SessionError> {
        let round = self.round.read().await;
        round
            .players
            .get(&player_id)
            .cloned()
            .ok_or(SessionError::UnknownPlayer(player_id))
    }

    fn snapshot(&self, round: &RoundState) -> LiveStats {
        let mut players: Vec<PlayerVote> = round
            .players
            .iter()
            .map(|(id, name)| PlayerVote {
                player_id: *id,
                name: name.clone(),
                voted: round.votes.contains_key(id),
            })
            .collect();
        players.sort_by(|a, b| a.name.cmp(&b.name));
        LiveStats {
            players,
            vote_count: round.votes.len(),
            reset_requested: self.reset_requested.load(Ordering::Acquire),
        }
    }

    // fetch_max keeps the clock monotonic even if the wall clock steps back
    fn touch(&self) {
        self.last_activity.fetch_max(now_millis(), Ordering::AcqRel);
    }

    fn publish_stats(&self, stats: LiveStats) {
        self.publisher
            .publish(&publish::stats_topic(&self.id), SessionEvent::Stats { stats });
    }
}

/// Aggregate statistics over the sorted numeric magnitudes of a round. An
/// empty slice yields no summary rather than degenerate values.
fn summarize(sorted: &[u32]) -> Option<VoteSummary> {
    let (&min, &max) = match (sorted.first(), sorted.last()) {
        (Some(min), Some(max)) => (min, max),
        _ => return None,
    };
    let sum: u64 = sorted.iter().map(|&v| u64::from(v)).sum();
    let average = sum as f64 / sorted.len() as f64;
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 1 {
        f64::from(sorted[mid])
    } else {
        f64::from(sorted[mid - 1] + sorted[mid]) / 2.0
    };
    Some(VoteSummary {
        average,
        min,
        max,
        median,
    })
}
