use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, header::AUTHORIZATION};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
    dao::models::{
        CurrentUser, EntryReceipt, GameDetailResponse, IdentifyResponse, JobHandle, LobbyDetail,
        LobbyListResponse, LobbySummary, MembershipResponse, QueuedJob, RoundDetailResponse,
        VoteReceipt,
    },
    dto::payloads::{
        CreateGamePayload, CreateLobbyPayload, LobbyMembershipPayload, RoundEntryPayload,
        VotePayload,
    },
    error::ApiError,
};

use super::{ApiResult, KrumnetApi};

/// reqwest-backed krumnet client.
///
/// Cloning is cheap; the connection pool is shared between clones.
#[derive(Clone)]
pub struct HttpKrumnet {
    client: Client,
    base_url: Arc<str>,
    token: Option<Arc<str>>,
}

impl HttpKrumnet {
    /// Build an anonymous client targeting `base_url`.
    pub fn new(base_url: &str) -> ApiResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| ApiError::ClientBuilder { source })?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            token: None,
        })
    }

    /// Handle sharing this client's pool but authorizing with `token`.
    pub fn with_token(&self, token: Option<&str>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: token.map(Arc::from),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match self.token {
            Some(ref token) => builder.header(AUTHORIZATION, token.as_ref()),
            None => builder,
        }
    }

    async fn get_json<T>(&self, path: &str, query: &[(&str, &str)]) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        debug!(path, "fetching");
        let response = self
            .request(Method::GET, path)
            .query(query)
            .send()
            .await
            .map_err(|source| ApiError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        decode(path, response).await
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> ApiResult<T>
    where
        B: ?Sized + Serialize,
        T: DeserializeOwned,
    {
        debug!(path, method = method.as_str(), "sending");
        let response = self
            .request(method, path)
            .json(body)
            .send()
            .await
            .map_err(|source| ApiError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        decode(path, response).await
    }

    async fn send_empty<B>(&self, method: Method, path: &str, body: &B) -> ApiResult<()>
    where
        B: ?Sized + Serialize,
    {
        let response = self
            .request(method, path)
            .json(body)
            .send()
            .await
            .map_err(|source| ApiError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        check_status(path, response).await.map(|_| ())
    }
}

/// Map non-success responses onto [`ApiError`]; a 400 with a message body is a rejection.
async fn check_status(path: &str, response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::BAD_REQUEST {
        let body = response.text().await.unwrap_or_default();
        if let Some(message) = rejection_message(&body) {
            return Err(ApiError::Rejected {
                path: path.to_string(),
                message,
            });
        }
    }

    Err(ApiError::RequestStatus {
        path: path.to_string(),
        status,
    })
}

async fn decode<T>(path: &str, response: Response) -> ApiResult<T>
where
    T: DeserializeOwned,
{
    check_status(path, response)
        .await?
        .json::<T>()
        .await
        .map_err(|source| ApiError::DecodeResponse {
            path: path.to_string(),
            source,
        })
}

/// Extract the server message from a rejection body: either a JSON string or bare text.
fn rejection_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::String(message)) => Some(message),
        Ok(_) => None,
        Err(_) => Some(trimmed.to_string()),
    }
}

impl KrumnetApi for HttpKrumnet {
    fn authorized(&self, token: Option<&str>) -> Arc<dyn KrumnetApi> {
        Arc::new(self.with_token(token))
    }

    fn identify(&self) -> BoxFuture<'static, ApiResult<CurrentUser>> {
        let api = self.clone();
        Box::pin(async move {
            let payload: IdentifyResponse = api.get_json("/auth/identify", &[]).await?;
            Ok(payload.user)
        })
    }

    fn fetch_lobbies(&self) -> BoxFuture<'static, ApiResult<Vec<LobbySummary>>> {
        let api = self.clone();
        Box::pin(async move {
            let payload: LobbyListResponse = api.get_json("/lobbies", &[]).await?;
            Ok(payload.lobbies)
        })
    }

    fn fetch_lobby(&self, lobby_id: &str) -> BoxFuture<'static, ApiResult<LobbyDetail>> {
        let api = self.clone();
        let lobby_id = lobby_id.to_string();
        Box::pin(async move { api.get_json("/lobbies", &[("ids[]", lobby_id.as_str())]).await })
    }

    fn fetch_game(&self, game_id: &str) -> BoxFuture<'static, ApiResult<GameDetailResponse>> {
        let api = self.clone();
        let game_id = game_id.to_string();
        Box::pin(async move { api.get_json("/games", &[("ids[]", game_id.as_str())]).await })
    }

    fn fetch_round(&self, round_id: &str) -> BoxFuture<'static, ApiResult<RoundDetailResponse>> {
        let api = self.clone();
        let round_id = round_id.to_string();
        Box::pin(async move { api.get_json("/rounds", &[("ids[]", round_id.as_str())]).await })
    }

    fn fetch_job(&self, job_id: &str) -> BoxFuture<'static, ApiResult<QueuedJob>> {
        let api = self.clone();
        let job_id = job_id.to_string();
        Box::pin(async move { api.get_json("/jobs", &[("id", job_id.as_str())]).await })
    }

    fn create_entry(
        &self,
        payload: RoundEntryPayload,
    ) -> BoxFuture<'static, ApiResult<EntryReceipt>> {
        let api = self.clone();
        Box::pin(async move {
            let _: serde_json::Value = api
                .send_json(Method::POST, "/round-entries", &payload)
                .await?;
            Ok(EntryReceipt {
                entry: payload.entry,
            })
        })
    }

    fn create_vote(&self, payload: VotePayload) -> BoxFuture<'static, ApiResult<VoteReceipt>> {
        let api = self.clone();
        Box::pin(async move {
            api.send_json(Method::POST, "/round-entry-votes", &payload)
                .await
        })
    }

    fn create_lobby(
        &self,
        payload: CreateLobbyPayload,
    ) -> BoxFuture<'static, ApiResult<JobHandle>> {
        let api = self.clone();
        Box::pin(async move { api.send_json(Method::POST, "/lobbies", &payload).await })
    }

    fn create_game(&self, payload: CreateGamePayload) -> BoxFuture<'static, ApiResult<JobHandle>> {
        let api = self.clone();
        Box::pin(async move { api.send_json(Method::POST, "/games", &payload).await })
    }

    fn join_lobby(&self, payload: LobbyMembershipPayload) -> BoxFuture<'static, ApiResult<String>> {
        let api = self.clone();
        Box::pin(async move {
            let membership: MembershipResponse = api
                .send_json(Method::POST, "/lobby-memberships", &payload)
                .await?;
            Ok(membership.lobby_id)
        })
    }

    fn leave_lobby(&self, payload: LobbyMembershipPayload) -> BoxFuture<'static, ApiResult<()>> {
        let api = self.clone();
        Box::pin(async move {
            api.send_empty(Method::DELETE, "/lobby-memberships", &payload)
                .await
        })
    }
}
