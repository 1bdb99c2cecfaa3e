use std::sync::Arc;

use futures::future::try_join;
use tracing::{debug, info};

use crate::{
    dao::{
        krumnet::{ApiResult, KrumnetApi},
        models::VoteReceipt,
    },
    request::{AsyncRequest, Outcome, option::try_map_async},
    state::{
        GameTarget, GameView,
        game::{
            ActiveRound, GameState, RoundCursor, VoteOption, VotingRound, find_active_round,
            find_voting_round, now_millis,
        },
        submission::RoundSubmission,
    },
};

/// Fetch everything the game view needs and derive the round cursor.
pub async fn load_game(api: Arc<dyn KrumnetApi>, target: GameTarget) -> Outcome<GameState> {
    debug!(
        lobby_id = %target.lobby_id,
        game_id = %target.game_id,
        "loading game state"
    );

    let (lobby, game) = try_join(
        api.fetch_lobby(&target.lobby_id),
        api.fetch_game(&target.game_id),
    )
    .await?;

    let now = now_millis();
    let active_id = find_active_round(&game.rounds, now).map(|round| round.id.clone());
    let voting_id = find_voting_round(&game.rounds).map(|round| round.id.clone());

    let user_id = target.user_id.as_str();
    let active = try_map_async(active_id, |round_id| {
        load_active_round(api.as_ref(), round_id, user_id)
    })
    .await?;
    let voting = try_map_async(voting_id, |round_id| {
        load_voting_round(api.as_ref(), round_id, user_id)
    })
    .await?;

    let cursor = active
        .map(RoundCursor::Active)
        .or(voting.map(RoundCursor::Voting));

    let state = GameState {
        lobby,
        game,
        cursor,
    };
    info!(
        game_id = %state.game.id,
        round_id = state.cursor_round_id(),
        ended = state.is_ended(),
        "game state loaded"
    );
    Ok(state)
}

/// Dispatch the initial load for a view that has not asked yet.
///
/// Any other state is returned untouched; a view never loads twice on its own.
pub fn start(api: Arc<dyn KrumnetApi>, view: &GameView) -> GameView {
    match view.game_state {
        AsyncRequest::NotAsked => {
            let pending = load_game(api, view.target.clone());
            view.with_state(AsyncRequest::loading(pending))
        }
        _ => view.clone(),
    }
}

async fn load_active_round(
    api: &dyn KrumnetApi,
    round_id: String,
    user_id: &str,
) -> ApiResult<ActiveRound> {
    let round = api.fetch_round(&round_id).await?;
    let submission = round
        .entries
        .iter()
        .find(|entry| entry.user_id == user_id)
        .map(|entry| RoundSubmission::done(entry.entry.clone()))
        .unwrap_or_default();

    Ok(ActiveRound { round, submission })
}

async fn load_voting_round(
    api: &dyn KrumnetApi,
    round_id: String,
    user_id: &str,
) -> ApiResult<VotingRound> {
    let round = api.fetch_round(&round_id).await?;
    let options = round
        .entries
        .iter()
        .map(|entry| VoteOption {
            id: entry.id.clone(),
            value: entry.entry.clone(),
        })
        .collect();
    let vote = round
        .votes
        .iter()
        .find(|vote| vote.user_id == user_id)
        .map(|vote| AsyncRequest::Loaded(VoteReceipt { id: vote.id.clone() }))
        .unwrap_or_default();

    Ok(VotingRound {
        round,
        options,
        vote,
    })
}
