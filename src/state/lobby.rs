use std::future::Future;

use crate::{
    dao::models::LobbySummary,
    request::{AsyncRequest, Outcome},
};

/// Lobby listing row with its own pending leave action.
#[derive(Debug, Clone)]
pub struct LobbyRow {
    pub lobby: LobbySummary,
    /// Resolves to the id of the lobby that was left.
    pub action: AsyncRequest<String>,
}

impl LobbyRow {
    pub fn initial(lobby: LobbySummary) -> Self {
        Self {
            lobby,
            action: AsyncRequest::NotAsked,
        }
    }

    pub fn leaving<Fut>(lobby: LobbySummary, operation: Fut) -> Self
    where
        Fut: Future<Output = Outcome<String>> + Send + 'static,
    {
        Self {
            lobby,
            action: AsyncRequest::loading(operation),
        }
    }

    /// A row can be left once; a failed attempt may be retried.
    pub fn can_leave(&self) -> bool {
        matches!(
            self.action,
            AsyncRequest::NotAsked | AsyncRequest::Failed(_)
        )
    }
}
