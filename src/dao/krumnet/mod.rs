mod http;

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::{
    dao::models::{
        CurrentUser, EntryReceipt, GameDetailResponse, JobHandle, LobbyDetail, LobbySummary,
        QueuedJob, RoundDetailResponse, VoteReceipt,
    },
    dto::payloads::{
        CreateGamePayload, CreateLobbyPayload, LobbyMembershipPayload, RoundEntryPayload,
        VotePayload,
    },
    error::ApiError,
};

pub use self::http::HttpKrumnet;

/// Result alias for krumnet calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Abstraction over the krumnet HTTP surface.
///
/// Implementations carry their own credential; every call made through one
/// handle shares a single identity.
pub trait KrumnetApi: Send + Sync {
    /// Handle to the same server authorizing with `token` (anonymous when `None`).
    fn authorized(&self, token: Option<&str>) -> Arc<dyn KrumnetApi>;
    fn identify(&self) -> BoxFuture<'static, ApiResult<CurrentUser>>;
    fn fetch_lobbies(&self) -> BoxFuture<'static, ApiResult<Vec<LobbySummary>>>;
    fn fetch_lobby(&self, lobby_id: &str) -> BoxFuture<'static, ApiResult<LobbyDetail>>;
    fn fetch_game(&self, game_id: &str) -> BoxFuture<'static, ApiResult<GameDetailResponse>>;
    fn fetch_round(&self, round_id: &str) -> BoxFuture<'static, ApiResult<RoundDetailResponse>>;
    fn fetch_job(&self, job_id: &str) -> BoxFuture<'static, ApiResult<QueuedJob>>;
    fn create_entry(&self, payload: RoundEntryPayload)
    -> BoxFuture<'static, ApiResult<EntryReceipt>>;
    fn create_vote(&self, payload: VotePayload) -> BoxFuture<'static, ApiResult<VoteReceipt>>;
    fn create_lobby(&self, payload: CreateLobbyPayload)
    -> BoxFuture<'static, ApiResult<JobHandle>>;
    fn create_game(&self, payload: CreateGamePayload) -> BoxFuture<'static, ApiResult<JobHandle>>;
    fn join_lobby(&self, payload: LobbyMembershipPayload) -> BoxFuture<'static, ApiResult<String>>;
    fn leave_lobby(&self, payload: LobbyMembershipPayload) -> BoxFuture<'static, ApiResult<()>>;
}
