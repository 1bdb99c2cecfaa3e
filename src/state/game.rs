use time::OffsetDateTime;

use crate::{
    dao::models::{
        GameDetailResponse, GameDetailRound, LobbyDetail, RoundDetailResponse, VoteReceipt,
    },
    request::AsyncRequest,
    state::submission::RoundSubmission,
};

/// Snapshot of a game as seen by the current user.
#[derive(Debug, Clone)]
pub struct GameState {
    pub lobby: LobbyDetail,
    pub game: GameDetailResponse,
    /// Round the user should interact with, if any.
    pub cursor: Option<RoundCursor>,
}

impl GameState {
    /// Id of the cursor's round, or `""` when no round is actionable.
    pub fn cursor_round_id(&self) -> &str {
        self.cursor
            .as_ref()
            .map(|cursor| cursor.round().id.as_str())
            .unwrap_or("")
    }

    /// Phase of the cursor's round, if any round is actionable.
    pub fn cursor_phase(&self) -> Option<RoundPhase> {
        self.cursor.as_ref().map(RoundCursor::phase)
    }

    /// Ended games show placements and are never polled.
    pub fn is_ended(&self) -> bool {
        self.game.ended
    }
}

/// Round the current user should currently interact with.
#[derive(Debug, Clone)]
pub enum RoundCursor {
    /// Entry collection phase.
    Active(ActiveRound),
    /// Voting phase.
    Voting(VotingRound),
}

impl RoundCursor {
    pub fn round(&self) -> &RoundDetailResponse {
        match self {
            RoundCursor::Active(active) => &active.round,
            RoundCursor::Voting(voting) => &voting.round,
        }
    }

    pub fn phase(&self) -> RoundPhase {
        match self {
            RoundCursor::Active(_) => RoundPhase::Entries,
            RoundCursor::Voting(_) => RoundPhase::Voting,
        }
    }
}

/// What the player is asked to do in the cursor's round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Entries,
    Voting,
}

#[derive(Debug, Clone)]
pub struct ActiveRound {
    pub round: RoundDetailResponse,
    pub submission: RoundSubmission,
}

#[derive(Debug, Clone)]
pub struct VotingRound {
    pub round: RoundDetailResponse,
    pub options: Vec<VoteOption>,
    pub vote: AsyncRequest<VoteReceipt>,
}

impl VotingRound {
    /// Voting is open until a vote is in flight or recorded.
    pub fn can_vote(&self) -> bool {
        can_vote(&self.vote)
    }
}

/// Entry the user can vote for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteOption {
    pub id: String,
    pub value: String,
}

/// Vote buttons are enabled only before a vote is sent or after it failed.
pub fn can_vote(vote: &AsyncRequest<VoteReceipt>) -> bool {
    matches!(vote, AsyncRequest::NotAsked | AsyncRequest::Failed(_))
}

/// Progress marker shown next to each round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStatus {
    Completed,
    InProgress,
    Pending,
}

/// Classify a round for the round list.
pub fn round_status(round: &GameDetailRound, now: i64) -> RoundStatus {
    if round.completed.is_some() {
        return RoundStatus::Completed;
    }

    match round.started {
        Some(started) if started <= now => RoundStatus::InProgress,
        _ => RoundStatus::Pending,
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    i64::try_from(nanos / 1_000_000).unwrap_or(i64::MAX)
}

/// A round accepts entries once started and until its entries are all in.
fn is_active(round: &GameDetailRound, now: i64) -> bool {
    let Some(started) = round.started else {
        return false;
    };

    round.fulfilled.is_none() && round.completed.is_none() && started <= now
}

/// Earliest round, by position, that is open for entries.
pub fn find_active_round(rounds: &[GameDetailRound], now: i64) -> Option<&GameDetailRound> {
    rounds
        .iter()
        .filter(|round| is_active(round, now))
        .min_by_key(|round| round.position)
}

/// Earliest fulfilled but incomplete round, by position.
///
/// Rounds fulfil in order: the first round that is neither fulfilled nor
/// completed ends the search, even if a later round is fulfilled.
pub fn find_voting_round(rounds: &[GameDetailRound]) -> Option<&GameDetailRound> {
    let mut ordered: Vec<&GameDetailRound> = rounds.iter().collect();
    ordered.sort_by_key(|round| round.position);

    for round in ordered {
        match (round.fulfilled, round.completed) {
            (_, Some(_)) => continue,
            (Some(_), None) => return Some(round),
            (None, None) => return None,
        }
    }

    None
}
