use std::sync::Arc;

use tracing::{debug, info};
use validator::Validate;

use crate::{
    dao::{krumnet::KrumnetApi, models::LobbyDetail},
    dto::payloads::LobbyMembershipPayload,
    error::ClientError,
    request::{Errors, Outcome},
    state::lobby::LobbyRow,
};

/// Lobbies the current user belongs to, each with an idle leave action.
pub async fn list_lobbies(api: &dyn KrumnetApi) -> Outcome<Vec<LobbyRow>> {
    let lobbies = api.fetch_lobbies().await?;
    debug!(count = lobbies.len(), "lobbies loaded");
    Ok(lobbies.into_iter().map(LobbyRow::initial).collect())
}

pub async fn lobby_detail(api: &dyn KrumnetApi, lobby_id: &str) -> Outcome<LobbyDetail> {
    Ok(api.fetch_lobby(lobby_id).await?)
}

/// Join `lobby_id`, returning the id of the lobby joined.
pub async fn join_lobby(api: &dyn KrumnetApi, lobby_id: impl Into<String>) -> Outcome<String> {
    let payload = LobbyMembershipPayload {
        lobby_id: lobby_id.into(),
    };
    payload.validate().map_err(ClientError::from)?;

    info!(lobby_id = %payload.lobby_id, "joining lobby");
    Ok(api.join_lobby(payload).await?)
}

/// Start leaving the lobby shown by `row`.
///
/// Returns the row with its leave action in flight, or `None` when a leave
/// is already pending or done.
pub fn leave_lobby(api: &Arc<dyn KrumnetApi>, row: &LobbyRow) -> Option<LobbyRow> {
    if !row.can_leave() {
        return None;
    }

    let lobby_id = row.lobby.id.clone();
    info!(lobby_id = %lobby_id, "leaving lobby");
    let request = api.leave_lobby(LobbyMembershipPayload {
        lobby_id: lobby_id.clone(),
    });

    Some(LobbyRow::leaving(row.lobby.clone(), async move {
        request.await.map_err(Errors::from)?;
        Ok(lobby_id)
    }))
}
