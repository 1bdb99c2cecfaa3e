use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    dao::{
        krumnet::KrumnetApi,
        models::{EntryReceipt, VoteReceipt},
    },
    error::ClientError,
    request::Outcome,
    services::{
        game_service,
        poller::{PollHandle, start_polling},
        round_service,
    },
    state::{GameView, session::Session},
};

/// Something that happened off the driver's task and must be folded into the view.
#[derive(Debug)]
enum GameEvent {
    Polled { generation: u64, view: GameView },
    EntrySettled {
        round_id: String,
        outcome: Outcome<EntryReceipt>,
    },
    VoteSettled {
        round_id: String,
        outcome: Outcome<VoteReceipt>,
    },
}

/// Owns one game view and keeps it in sync with the server.
///
/// Every change to the view re-evaluates polling: a loaded game that has not
/// ended is polled, anything else is not. Restarting the poll invalidates
/// updates still queued from the previous loop.
pub struct GameDriver {
    api: Arc<dyn KrumnetApi>,
    interval: Duration,
    view: GameView,
    poll: Option<PollHandle>,
    generation: u64,
    sender: mpsc::UnboundedSender<GameEvent>,
    events: mpsc::UnboundedReceiver<GameEvent>,
}

impl GameDriver {
    pub fn new(
        session: &Session,
        lobby_id: impl Into<String>,
        game_id: impl Into<String>,
        interval: Duration,
    ) -> Self {
        let (sender, events) = mpsc::unbounded_channel();
        Self {
            api: session.api(),
            interval,
            view: GameView::init(session, lobby_id, game_id),
            poll: None,
            generation: 0,
            sender,
            events,
        }
    }

    pub fn view(&self) -> &GameView {
        &self.view
    }

    pub fn is_polling(&self) -> bool {
        self.poll.as_ref().is_some_and(|poll| !poll.is_finished())
    }

    /// Perform the initial load and start polling when appropriate.
    pub async fn load(&mut self) -> &GameView {
        self.view = game_service::start(self.api.clone(), &self.view);

        if self.view.game_state.is_loading() {
            let settled = self.view.game_state.clone().settle().await;
            if let Some(errors) = settled.errors() {
                warn!(game_id = %self.view.target.game_id, error = %errors, "game failed to load");
            }
            self.view = self.view.with_state(settled);
        }

        self.reconcile();
        &self.view
    }

    /// Edit the draft entry of the active round.
    pub fn update_submission(&mut self, text: impl Into<String>) -> bool {
        self.view.update_submission(text)
    }

    /// Submit an entry; the outcome arrives through [`GameDriver::next_update`].
    pub fn submit_entry(&mut self, text: impl Into<String>) -> Result<(), ClientError> {
        let pending = round_service::submit_entry(&self.api, &mut self.view, text)?;
        let round_id = self.cursor_round_id();
        let sender = self.sender.clone();

        tokio::spawn(async move {
            let outcome = pending.await;
            let _ = sender.send(GameEvent::EntrySettled { round_id, outcome });
        });
        Ok(())
    }

    /// Vote for `entry_id`; the outcome arrives through [`GameDriver::next_update`].
    pub fn cast_vote(&mut self, entry_id: impl Into<String>) -> Result<(), ClientError> {
        let pending = round_service::cast_vote(&self.api, &mut self.view, entry_id)?;
        let round_id = self.cursor_round_id();
        let sender = self.sender.clone();

        tokio::spawn(async move {
            let outcome = pending.await;
            let _ = sender.send(GameEvent::VoteSettled { round_id, outcome });
        });
        Ok(())
    }

    pub fn clear_vote_warning(&mut self) -> bool {
        self.view.clear_vote_warning()
    }

    /// Wait for the next change to the view and apply it.
    pub async fn next_update(&mut self) -> &GameView {
        loop {
            // The driver keeps a sender alive, so the channel never closes.
            let Some(event) = self.events.recv().await else {
                return &self.view;
            };

            if self.apply(event) {
                self.reconcile();
                return &self.view;
            }
        }
    }

    fn apply(&mut self, event: GameEvent) -> bool {
        match event {
            GameEvent::Polled { generation, view } if generation == self.generation => {
                self.view = view;
                true
            }
            GameEvent::Polled { generation, .. } => {
                debug!(generation, current = self.generation, "dropping stale poll update");
                false
            }
            GameEvent::EntrySettled { round_id, outcome } => {
                self.view.settle_submission(&round_id, outcome)
            }
            GameEvent::VoteSettled { round_id, outcome } => {
                self.view.settle_vote(&round_id, outcome)
            }
        }
    }

    /// Stop the current poll loop and start a fresh one if the view warrants it.
    fn reconcile(&mut self) {
        self.poll = None;
        self.generation += 1;

        if !self.view.should_poll() {
            debug!(game_id = %self.view.target.game_id, "game not pollable");
            return;
        }

        let generation = self.generation;
        let sender = self.sender.clone();
        self.poll = Some(start_polling(
            self.api.clone(),
            self.view.clone(),
            self.interval,
            move |view| {
                let _ = sender.send(GameEvent::Polled { generation, view });
            },
        ));
    }

    fn cursor_round_id(&self) -> String {
        self.view
            .cursor()
            .map(|cursor| cursor.round().id.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::models::GamePlacement,
        request::RequestKind,
        state::game::RoundCursor,
        testing::{FakeKrumnet, entry, game, lobby, round_detail, summary, user},
    };

    const INTERVAL: Duration = Duration::from_millis(1_000);

    fn fake() -> FakeKrumnet {
        let api = FakeKrumnet::new();
        api.script().lobbies.insert("l1".into(), lobby("l1"));
        api
    }

    fn driver(api: &FakeKrumnet) -> GameDriver {
        let session = Session::authenticated(user("u1"), "tok".into(), Arc::new(api.clone()));
        GameDriver::new(&session, "l1", "g1", INTERVAL)
    }

    #[tokio::test(start_paused = true)]
    async fn ended_game_never_polls() {
        let api = fake();
        let mut finished = game("g1", vec![summary("r1", 0, Some(1), Some(2), Some(3))]);
        finished.ended = true;
        finished.placements = vec![GamePlacement {
            id: "p1".into(),
            user_id: "u1".into(),
            user_name: "u1-name".into(),
            place: 1,
            vote_count: 3,
        }];
        api.push_game(finished);
        let mut driver = driver(&api);

        let view = driver.load().await;
        assert_eq!(view.game_state.kind(), RequestKind::Loaded);
        assert!(view.cursor().is_none());
        assert!(!driver.is_polling());

        tokio::time::sleep(INTERVAL * 10).await;
        assert_eq!(api.count_calls("fetch_game"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_load_does_not_poll() {
        let api = FakeKrumnet::new();
        let mut driver = driver(&api);

        let view = driver.load().await;
        assert_eq!(view.game_state.kind(), RequestKind::Failed);
        assert!(!driver.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn poll_update_replaces_view() {
        let api = fake();
        api.push_game(game("g1", Vec::new()));
        api.push_game(game("g1", vec![summary("r1", 0, Some(1), None, None)]));
        api.script()
            .rounds
            .insert("r1".into(), round_detail("r1", Vec::new(), Vec::new()));
        let mut driver = driver(&api);

        assert!(driver.load().await.cursor().is_none());
        assert!(driver.is_polling());

        let view = driver.next_update().await;
        assert!(matches!(view.cursor(), Some(RoundCursor::Active(_))));
        assert!(driver.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn submitted_entry_settles_into_view() {
        let api = fake();
        api.push_game(game("g1", vec![summary("r1", 0, Some(1), None, None)]));
        api.script().rounds.insert(
            "r1".into(),
            round_detail("r1", vec![entry("e1", "r1", "u2", "apple")], Vec::new()),
        );
        let mut driver = driver(&api);
        driver.load().await;

        assert!(driver.update_submission("banana"));
        driver.submit_entry("banana").unwrap();

        let view = driver.next_update().await;
        let Some(RoundCursor::Active(active)) = view.cursor() else {
            panic!("expected an active round");
        };
        assert_eq!(active.submission.entry(), Some("banana"));
        assert!(driver.submit_entry("again").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn fulfilled_round_moves_view_to_voting() {
        let api = fake();
        api.push_game(game("g1", vec![summary("r1", 0, Some(1), None, None)]));
        api.push_game(game("g1", vec![summary("r1", 0, Some(1), Some(2), None)]));
        api.script().rounds.insert(
            "r1".into(),
            round_detail(
                "r1",
                vec![
                    entry("e1", "r1", "u1", "banana"),
                    entry("e2", "r1", "u2", "apple"),
                ],
                Vec::new(),
            ),
        );
        let mut driver = driver(&api);

        let Some(RoundCursor::Active(active)) = driver.load().await.cursor() else {
            panic!("expected an active round");
        };
        assert_eq!(active.submission.entry(), Some("banana"));

        let view = tokio::time::timeout(INTERVAL * 5, driver.next_update())
            .await
            .expect("voting phase was never pushed");
        let Some(RoundCursor::Voting(voting)) = view.cursor() else {
            panic!("expected the round to move to voting");
        };
        assert_eq!(voting.round.id, "r1");
        assert_eq!(voting.options.len(), 2);
        assert!(driver.is_polling());
    }
}
