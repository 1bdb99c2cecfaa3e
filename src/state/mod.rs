pub mod game;
pub mod lobby;
pub mod session;
pub mod submission;

use crate::{
    dao::models::{EntryReceipt, VoteReceipt},
    request::{AsyncRequest, Outcome},
};

use self::{
    game::{ActiveRound, GameState, RoundCursor, VotingRound},
    session::Session,
    submission::RoundSubmission,
};

/// Application-wide state: the session being resolved at bootstrap.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub session: AsyncRequest<Session>,
}

/// Which game a view is looking at, and for whom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameTarget {
    pub user_id: String,
    pub lobby_id: String,
    pub game_id: String,
}

/// State owned by the view of a single game.
#[derive(Debug, Clone)]
pub struct GameView {
    pub target: GameTarget,
    pub game_state: AsyncRequest<GameState>,
}

impl GameView {
    pub fn init(session: &Session, lobby_id: impl Into<String>, game_id: impl Into<String>) -> Self {
        Self {
            target: GameTarget {
                user_id: session.user_id(),
                lobby_id: lobby_id.into(),
                game_id: game_id.into(),
            },
            game_state: AsyncRequest::NotAsked,
        }
    }

    /// Same target with a replaced game state.
    pub fn with_state(&self, game_state: AsyncRequest<GameState>) -> Self {
        Self {
            target: self.target.clone(),
            game_state,
        }
    }

    /// Loaded games that have not ended keep being polled.
    pub fn should_poll(&self) -> bool {
        self.game_state
            .data()
            .is_some_and(|state| !state.is_ended())
    }

    pub fn cursor(&self) -> Option<&RoundCursor> {
        self.game_state.data().and_then(|state| state.cursor.as_ref())
    }

    fn cursor_mut(&mut self) -> Option<&mut RoundCursor> {
        match &mut self.game_state {
            AsyncRequest::Loaded(state) => state.cursor.as_mut(),
            _ => None,
        }
    }

    pub fn active_round_mut(&mut self) -> Option<&mut ActiveRound> {
        match self.cursor_mut() {
            Some(RoundCursor::Active(active)) => Some(active),
            _ => None,
        }
    }

    pub fn voting_round_mut(&mut self) -> Option<&mut VotingRound> {
        match self.cursor_mut() {
            Some(RoundCursor::Voting(voting)) => Some(voting),
            _ => None,
        }
    }

    /// Replace the draft entry text; returns whether a draft was being edited.
    pub fn update_submission(&mut self, text: impl Into<String>) -> bool {
        match self.active_round_mut() {
            Some(ActiveRound {
                submission: submission @ RoundSubmission::NotSubmitted { .. },
                ..
            }) => {
                *submission = RoundSubmission::empty(Some(text.into()));
                true
            }
            _ => false,
        }
    }

    /// Apply the outcome of a submission made for `round_id`.
    ///
    /// Outcomes for a round that is no longer the cursor are dropped.
    pub fn settle_submission(&mut self, round_id: &str, outcome: Outcome<EntryReceipt>) -> bool {
        match self.active_round_mut() {
            Some(active) if active.round.id == round_id => {
                active.submission = RoundSubmission::settled(outcome);
                true
            }
            _ => false,
        }
    }

    /// Apply the outcome of a vote cast in `round_id`.
    pub fn settle_vote(&mut self, round_id: &str, outcome: Outcome<VoteReceipt>) -> bool {
        match self.voting_round_mut() {
            Some(voting) if voting.round.id == round_id => {
                voting.vote = outcome.into();
                true
            }
            _ => false,
        }
    }

    /// Dismiss a failed vote so the user can try again.
    pub fn clear_vote_warning(&mut self) -> bool {
        match self.voting_round_mut() {
            Some(voting) if voting.vote.errors().is_some() => {
                voting.vote = AsyncRequest::NotAsked;
                true
            }
            _ => false,
        }
    }
}

/// Whether the cursor's round differs between two loaded views.
///
/// Views that are not loaded never count as changed; "no round" compares as `""`.
pub fn changed_active_round(prev: &GameView, next: &GameView) -> bool {
    match (prev.game_state.data(), next.game_state.data()) {
        (Some(current), Some(next)) => current.cursor_round_id() != next.cursor_round_id(),
        _ => false,
    }
}

/// Whether the cursor switched between entry collection and voting.
///
/// A round that becomes fulfilled keeps its id but moves to voting; views that
/// are not loaded never count as changed.
pub fn changed_round_phase(prev: &GameView, next: &GameView) -> bool {
    match (prev.game_state.data(), next.game_state.data()) {
        (Some(current), Some(next)) => current.cursor_phase() != next.cursor_phase(),
        _ => false,
    }
}
