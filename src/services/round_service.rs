use std::sync::Arc;

use futures::FutureExt;
use tracing::info;
use validator::Validate;

use crate::{
    dao::{
        krumnet::KrumnetApi,
        models::{EntryReceipt, VoteReceipt},
    },
    dto::payloads::{RoundEntryPayload, VotePayload},
    error::ClientError,
    request::{AsyncRequest, Errors, Pending},
    state::{GameView, submission::RoundSubmission},
};

/// Send the current user's entry for the active round.
///
/// The submission flips to in-flight immediately; feed the returned handle's
/// outcome to [`GameView::settle_submission`] once it resolves.
pub fn submit_entry(
    api: &Arc<dyn KrumnetApi>,
    view: &mut GameView,
    text: impl Into<String>,
) -> Result<Pending<EntryReceipt>, ClientError> {
    let active = view
        .active_round_mut()
        .ok_or_else(|| ClientError::InvalidState("no round is open for entries".into()))?;

    let editable = matches!(active.submission, RoundSubmission::NotSubmitted { .. });
    if !editable && !active.submission.can_retry() {
        return Err(ClientError::InvalidState(
            "an entry is already on record for this round".into(),
        ));
    }

    let payload = RoundEntryPayload {
        round_id: active.round.id.clone(),
        entry: text.into(),
    };
    payload.validate()?;

    info!(round_id = %payload.round_id, "submitting round entry");
    let request = api.create_entry(payload);
    let pending = async move { request.await.map_err(Errors::from) }
        .boxed()
        .shared();
    active.submission = RoundSubmission::Submitted {
        submission: AsyncRequest::Loading(pending.clone()),
    };

    Ok(pending)
}

/// Vote for `entry_id` in the voting round.
///
/// Allowed before any vote and after a failed one; the vote is in flight
/// as soon as this returns.
pub fn cast_vote(
    api: &Arc<dyn KrumnetApi>,
    view: &mut GameView,
    entry_id: impl Into<String>,
) -> Result<Pending<VoteReceipt>, ClientError> {
    let voting = view
        .voting_round_mut()
        .ok_or_else(|| ClientError::InvalidState("no round is open for voting".into()))?;

    if !voting.can_vote() {
        return Err(ClientError::InvalidState(
            "a vote is already in flight or recorded".into(),
        ));
    }

    let entry_id = entry_id.into();
    if !voting.options.iter().any(|option| option.id == entry_id) {
        return Err(ClientError::InvalidInput(format!(
            "`{entry_id}` is not an entry of this round"
        )));
    }

    let payload = VotePayload {
        entry_id,
        round_id: voting.round.id.clone(),
    };
    payload.validate()?;

    info!(
        round_id = %payload.round_id,
        entry_id = %payload.entry_id,
        "casting vote"
    );
    let request = api.create_vote(payload);
    let pending = async move { request.await.map_err(Errors::from) }
        .boxed()
        .shared();
    voting.vote = AsyncRequest::Loading(pending.clone());

    Ok(pending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::models::GameDetailResponse,
        error::{ApiError, extract_server_error},
        request::RequestKind,
        state::{
            GameTarget,
            game::{ActiveRound, GameState, RoundCursor, VoteOption, VotingRound},
        },
        testing::{FakeKrumnet, game, lobby, round_detail},
    };

    fn view_with(cursor: RoundCursor, game: GameDetailResponse) -> GameView {
        GameView {
            target: GameTarget {
                user_id: "u1".into(),
                lobby_id: "l1".into(),
                game_id: game.id.clone(),
            },
            game_state: AsyncRequest::Loaded(GameState {
                lobby: lobby("l1"),
                game,
                cursor: Some(cursor),
            }),
        }
    }

    fn active_view() -> GameView {
        view_with(
            RoundCursor::Active(ActiveRound {
                round: round_detail("r1", Vec::new(), Vec::new()),
                submission: RoundSubmission::empty(None),
            }),
            game("g1", Vec::new()),
        )
    }

    fn voting_view(vote: AsyncRequest<VoteReceipt>) -> GameView {
        view_with(
            RoundCursor::Voting(VotingRound {
                round: round_detail("r1", Vec::new(), Vec::new()),
                options: vec![VoteOption {
                    id: "e7".into(),
                    value: "banana".into(),
                }],
                vote,
            }),
            game("g1", Vec::new()),
        )
    }

    fn submission(view: &mut GameView) -> &RoundSubmission {
        &view.active_round_mut().unwrap().submission
    }

    #[tokio::test]
    async fn banana_entry_goes_from_draft_to_loaded() {
        let fake = FakeKrumnet::new();
        let api: Arc<dyn KrumnetApi> = Arc::new(fake.clone());
        let mut view = active_view();

        assert!(view.update_submission("banana"));
        assert!(submission(&mut view).can_submit());

        let pending = submit_entry(&api, &mut view, "banana").unwrap();
        match submission(&mut view) {
            RoundSubmission::Submitted { submission } => {
                assert_eq!(submission.kind(), RequestKind::Loading)
            }
            other => panic!("unexpected submission: {other:?}"),
        }

        assert!(view.settle_submission("r1", pending.await));
        assert_eq!(submission(&mut view).entry(), Some("banana"));
        assert_eq!(fake.script().entries[0].round_id, "r1");
    }

    #[test]
    fn invalid_entry_text_is_not_sent() {
        let fake = FakeKrumnet::new();
        let api: Arc<dyn KrumnetApi> = Arc::new(fake.clone());
        let mut view = active_view();

        let err = submit_entry(&api, &mut view, "").unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput(_)));
        let err = submit_entry(&api, &mut view, "x".repeat(255)).unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput(_)));

        assert_eq!(fake.count_calls("create_entry"), 0);
        assert!(matches!(
            submission(&mut view),
            RoundSubmission::NotSubmitted { .. }
        ));
    }

    #[tokio::test]
    async fn second_submission_is_refused_until_failure() {
        let fake = FakeKrumnet::new();
        fake.script()
            .rejections
            .insert("create_entry", "errors.round_entries.duplicate".into());
        let api: Arc<dyn KrumnetApi> = Arc::new(fake.clone());
        let mut view = active_view();

        let pending = submit_entry(&api, &mut view, "banana").unwrap();
        assert!(submit_entry(&api, &mut view, "banana").is_err());

        view.settle_submission("r1", pending.await);
        assert!(submission(&mut view).can_retry());

        fake.script().rejections.clear();
        let pending = submit_entry(&api, &mut view, "cherry").unwrap();
        view.settle_submission("r1", pending.await);
        assert_eq!(submission(&mut view).entry(), Some("cherry"));
    }

    #[tokio::test]
    async fn vote_after_failure_is_enabled_and_goes_loading() {
        let fake = FakeKrumnet::new();
        let api: Arc<dyn KrumnetApi> = Arc::new(fake.clone());
        let failed = Errors::single(ApiError::Rejected {
            path: "create_vote".into(),
            message: "errors.vote_for_self".into(),
        });
        let mut view = voting_view(AsyncRequest::Failed(failed));
        assert!(view.voting_round_mut().unwrap().can_vote());

        let pending = cast_vote(&api, &mut view, "e7").unwrap();
        assert!(view.voting_round_mut().unwrap().vote.is_loading());
        assert!(cast_vote(&api, &mut view, "e7").is_err());

        assert!(view.settle_vote("r1", pending.await));
        let voting = view.voting_round_mut().unwrap();
        assert_eq!(voting.vote.data().map(|v| v.id.as_str()), Some("vote-1"));
        assert!(!voting.can_vote());
        assert_eq!(fake.script().votes[0].entry_id, "e7");
    }

    #[tokio::test]
    async fn rejected_vote_is_humanized_and_clearable() {
        let fake = FakeKrumnet::new();
        fake.script()
            .rejections
            .insert("create_vote", "errors.vote_for_self".into());
        let api: Arc<dyn KrumnetApi> = Arc::new(fake);
        let mut view = voting_view(AsyncRequest::NotAsked);

        let pending = cast_vote(&api, &mut view, "e7").unwrap();
        view.settle_vote("r1", pending.await);

        let errors = view.voting_round_mut().unwrap().vote.errors().cloned().unwrap();
        let server = extract_server_error(errors.first()).unwrap();
        assert_eq!(server.humanized.as_deref(), Some("Unable to vote for yourself"));

        assert!(view.clear_vote_warning());
        assert_eq!(
            view.voting_round_mut().unwrap().vote.kind(),
            RequestKind::NotAsked
        );
    }

    #[test]
    fn vote_for_unknown_entry_is_refused() {
        let api: Arc<dyn KrumnetApi> = Arc::new(FakeKrumnet::new());
        let mut view = voting_view(AsyncRequest::NotAsked);

        let err = cast_vote(&api, &mut view, "e99").unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput(_)));
        assert!(submit_entry(&api, &mut view, "banana").is_err());
    }
}
