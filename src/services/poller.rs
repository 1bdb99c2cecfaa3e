use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, trace, warn};

use crate::{
    dao::krumnet::KrumnetApi,
    request::AsyncRequest,
    services::game_service::load_game,
    state::{GameView, changed_active_round, changed_round_phase},
};

/// Handle to a running poll loop. Dropping it stops the loop.
pub struct PollHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Request cancellation. Nothing is delivered to the callback afterwards.
    pub fn stop(&self) {
        // The receiver is gone once the loop has already exited on its own.
        let _ = self.cancel.send(true);
    }

    /// Whether the loop has exited, either stopped or after a failed load.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Reload `view`'s game every `interval` until stopped.
///
/// `on_update` only sees a new view when the round cursor moved to another
/// round or phase, or the game just ended. A failed reload stops the loop.
pub fn start_polling<F>(
    api: Arc<dyn KrumnetApi>,
    view: GameView,
    interval: Duration,
    mut on_update: F,
) -> PollHandle
where
    F: FnMut(GameView) + Send + 'static,
{
    let (cancel, mut signal) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut current = view;
        debug!(game_id = %current.target.game_id, ?interval, "game poll started");

        loop {
            tokio::select! {
                biased;
                _ = cancelled(&mut signal) => {
                    debug!(game_id = %current.target.game_id, "game poll stopped while idle");
                    return;
                }
                _ = tokio::time::sleep(interval) => {}
            }

            let outcome = tokio::select! {
                biased;
                _ = cancelled(&mut signal) => {
                    debug!(
                        game_id = %current.target.game_id,
                        "game poll stopped during reload; discarding result"
                    );
                    return;
                }
                outcome = load_game(api.clone(), current.target.clone()) => outcome,
            };

            let state = match outcome {
                Ok(state) => state,
                Err(errors) => {
                    warn!(
                        game_id = %current.target.game_id,
                        error = %errors,
                        "game reload failed; stopping poll"
                    );
                    return;
                }
            };

            let next = current.with_state(AsyncRequest::Loaded(state));
            let ended = is_ended(&next) && !is_ended(&current);
            let phase_changed = changed_round_phase(&current, &next);
            if changed_active_round(&current, &next) || phase_changed || ended {
                if *signal.borrow() {
                    debug!(
                        game_id = %current.target.game_id,
                        "game poll stopped before delivery; discarding result"
                    );
                    return;
                }
                debug!(
                    game_id = %next.target.game_id,
                    phase_changed,
                    ended,
                    "game cursor changed; pushing update"
                );
                on_update(next.clone());
                current = next;
            } else {
                trace!(game_id = %current.target.game_id, "game poll tick without changes");
            }

            if ended {
                debug!(game_id = %current.target.game_id, "game ended; stopping poll");
                return;
            }
        }
    });

    PollHandle { cancel, task }
}

fn is_ended(view: &GameView) -> bool {
    view.game_state.data().is_some_and(|state| state.is_ended())
}

/// Resolves once a stop was requested or the handle is gone.
async fn cancelled(signal: &mut watch::Receiver<bool>) {
    let _ = signal.wait_for(|stop| *stop).await;
}
