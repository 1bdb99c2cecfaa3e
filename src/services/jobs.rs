use std::time::Duration;

use tracing::{debug, info};
use validator::Validate;

use crate::{
    dao::krumnet::KrumnetApi,
    dto::payloads::{CreateGamePayload, CreateLobbyPayload},
    error::{ApiError, ClientError},
    request::{Errors, Outcome},
    state::game::now_millis,
};

const BASE_DELAY: Duration = Duration::from_millis(1_000);
const DELAY_STEP: Duration = Duration::from_millis(100);

/// Server-side resource to provision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobRequest {
    /// A fresh lobby owned by the current user.
    Lobby,
    /// A new game in the given lobby.
    Game { lobby_id: String },
}

/// Queue a provisioning job and poll it until it yields the new resource id.
///
/// Polls back off linearly; after `limit` unfinished polls the job is
/// reported as incomplete.
pub async fn create_and_poll(
    api: &dyn KrumnetApi,
    request: JobRequest,
    limit: u32,
) -> Outcome<String> {
    let job = match request {
        JobRequest::Lobby => {
            let payload = CreateLobbyPayload {
                kind: now_millis().to_string(),
            };
            api.create_lobby(payload).await?
        }
        JobRequest::Game { lobby_id } => {
            let payload = CreateGamePayload { lobby_id };
            payload.validate().map_err(ClientError::from)?;
            api.create_game(payload).await?
        }
    };
    info!(job_id = %job.id, "provisioning job queued");

    for attempt in 1..=limit {
        let queued = api.fetch_job(&job.id).await?;

        if let Some(resource_id) = queued.resource_id() {
            info!(job_id = %job.id, resource_id, attempt, "provisioning job finished");
            return Ok(resource_id.to_string());
        }

        debug!(job_id = %job.id, attempt, "job still provisioning");
        if attempt < limit {
            tokio::time::sleep(BASE_DELAY + DELAY_STEP * attempt).await;
        }
    }

    Err(Errors::from(ApiError::JobIncomplete {
        id: job.id,
        attempts: limit,
    }))
}
