//! Scripted in-memory krumnet used by unit tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use futures::future::BoxFuture;

use crate::{
    dao::{
        krumnet::{ApiResult, KrumnetApi},
        models::{
            CurrentUser, EntryReceipt, GameDetailResponse, GameDetailRound, JobHandle,
            JobResult, JobResultData, LobbyDetail, LobbySummary, QueuedJob, RoundDetailResponse,
            RoundEntry, RoundEntryVote, VoteReceipt,
        },
    },
    dto::payloads::{
        CreateGamePayload, CreateLobbyPayload, LobbyMembershipPayload, RoundEntryPayload,
        VotePayload,
    },
    error::ApiError,
};

#[derive(Default)]
pub struct Script {
    pub users: HashMap<String, CurrentUser>,
    pub lobby_list: Vec<LobbySummary>,
    pub lobbies: HashMap<String, LobbyDetail>,
    /// Successive responses per game; the last one repeats.
    pub games: HashMap<String, VecDeque<GameDetailResponse>>,
    pub rounds: HashMap<String, RoundDetailResponse>,
    /// Successive poll responses per job; the last one repeats.
    pub jobs: HashMap<String, VecDeque<QueuedJob>>,
    /// Endpoint name → server rejection message.
    pub rejections: HashMap<&'static str, String>,
    /// Artificial latency applied to `fetch_game`.
    pub game_delay: Option<Duration>,
    /// Runs on every `fetch_game`, outside the script lock.
    pub on_fetch_game: Option<Arc<dyn Fn() + Send + Sync>>,
    pub calls: Vec<String>,
    pub entries: Vec<RoundEntryPayload>,
    pub votes: Vec<VotePayload>,
}

#[derive(Clone, Default)]
pub struct FakeKrumnet {
    token: Option<String>,
    script: Arc<Mutex<Script>>,
}

impl FakeKrumnet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self) -> MutexGuard<'_, Script> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn count_calls(&self, name: &str) -> usize {
        self.script().calls.iter().filter(|call| *call == name).count()
    }

    pub fn push_game(&self, game: GameDetailResponse) {
        self.script()
            .games
            .entry(game.id.clone())
            .or_default()
            .push_back(game);
    }

    fn record(&self, name: &'static str) -> Result<(), ApiError> {
        let mut script = self.script();
        script.calls.push(name.to_string());
        match script.rejections.get(name) {
            Some(message) => Err(ApiError::Rejected {
                path: name.to_string(),
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn missing(path: &str) -> ApiError {
    ApiError::RequestStatus {
        path: path.to_string(),
        status: reqwest::StatusCode::NOT_FOUND,
    }
}

fn next_in<T: Clone>(queue: Option<&mut VecDeque<T>>) -> Option<T> {
    let queue = queue?;
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

impl KrumnetApi for FakeKrumnet {
    fn authorized(&self, token: Option<&str>) -> Arc<dyn KrumnetApi> {
        Arc::new(Self {
            token: token.map(str::to_string),
            script: self.script.clone(),
        })
    }

    fn identify(&self) -> BoxFuture<'static, ApiResult<CurrentUser>> {
        let result = self.record("identify").and_then(|()| {
            let token = self.token.clone().unwrap_or_default();
            self.script()
                .users
                .get(&token)
                .cloned()
                .ok_or_else(|| ApiError::RequestStatus {
                    path: "/auth/identify".into(),
                    status: reqwest::StatusCode::UNAUTHORIZED,
                })
        });
        Box::pin(async move { result })
    }

    fn fetch_lobbies(&self) -> BoxFuture<'static, ApiResult<Vec<LobbySummary>>> {
        let result = self
            .record("fetch_lobbies")
            .map(|()| self.script().lobby_list.clone());
        Box::pin(async move { result })
    }

    fn fetch_lobby(&self, lobby_id: &str) -> BoxFuture<'static, ApiResult<LobbyDetail>> {
        let result = self.record("fetch_lobby").and_then(|()| {
            self.script()
                .lobbies
                .get(lobby_id)
                .cloned()
                .ok_or_else(|| missing("/lobbies"))
        });
        Box::pin(async move { result })
    }

    fn fetch_game(&self, game_id: &str) -> BoxFuture<'static, ApiResult<GameDetailResponse>> {
        let result = self.record("fetch_game").and_then(|()| {
            next_in(self.script().games.get_mut(game_id)).ok_or_else(|| missing("/games"))
        });
        let (delay, hook) = {
            let script = self.script();
            (script.game_delay, script.on_fetch_game.clone())
        };
        if let Some(hook) = hook {
            hook();
        }
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        })
    }

    fn fetch_round(&self, round_id: &str) -> BoxFuture<'static, ApiResult<RoundDetailResponse>> {
        let result = self.record("fetch_round").and_then(|()| {
            self.script()
                .rounds
                .get(round_id)
                .cloned()
                .ok_or_else(|| missing("/rounds"))
        });
        Box::pin(async move { result })
    }

    fn fetch_job(&self, job_id: &str) -> BoxFuture<'static, ApiResult<QueuedJob>> {
        let result = self.record("fetch_job").and_then(|()| {
            next_in(self.script().jobs.get_mut(job_id)).ok_or_else(|| missing("/jobs"))
        });
        Box::pin(async move { result })
    }

    fn create_entry(
        &self,
        payload: RoundEntryPayload,
    ) -> BoxFuture<'static, ApiResult<EntryReceipt>> {
        let result = self.record("create_entry").map(|()| {
            self.script().entries.push(payload.clone());
            EntryReceipt {
                entry: payload.entry,
            }
        });
        Box::pin(async move { result })
    }

    fn create_vote(&self, payload: VotePayload) -> BoxFuture<'static, ApiResult<VoteReceipt>> {
        let result = self.record("create_vote").map(|()| {
            let mut script = self.script();
            script.votes.push(payload);
            VoteReceipt {
                id: format!("vote-{}", script.votes.len()),
            }
        });
        Box::pin(async move { result })
    }

    fn create_lobby(
        &self,
        _payload: CreateLobbyPayload,
    ) -> BoxFuture<'static, ApiResult<JobHandle>> {
        let result = self.record("create_lobby").map(|()| JobHandle {
            id: "job-lobby".into(),
        });
        Box::pin(async move { result })
    }

    fn create_game(&self, _payload: CreateGamePayload) -> BoxFuture<'static, ApiResult<JobHandle>> {
        let result = self.record("create_game").map(|()| JobHandle {
            id: "job-game".into(),
        });
        Box::pin(async move { result })
    }

    fn join_lobby(&self, payload: LobbyMembershipPayload) -> BoxFuture<'static, ApiResult<String>> {
        let result = self.record("join_lobby").map(|()| payload.lobby_id);
        Box::pin(async move { result })
    }

    fn leave_lobby(&self, _payload: LobbyMembershipPayload) -> BoxFuture<'static, ApiResult<()>> {
        let result = self.record("leave_lobby");
        Box::pin(async move { result })
    }
}

pub fn user(id: &str) -> CurrentUser {
    CurrentUser {
        id: id.into(),
        name: format!("{id}-name"),
        email: format!("{id}@krumpled.test"),
    }
}

pub fn lobby(id: &str) -> LobbyDetail {
    LobbyDetail {
        id: id.into(),
        name: format!("lobby {id}"),
        games: Vec::new(),
        members: Vec::new(),
    }
}

pub fn game(id: &str, rounds: Vec<GameDetailRound>) -> GameDetailResponse {
    GameDetailResponse {
        id: id.into(),
        name: format!("game {id}"),
        created: 1,
        ended: false,
        members: Vec::new(),
        rounds,
        placements: Vec::new(),
    }
}

pub fn summary(
    id: &str,
    position: u32,
    started: Option<i64>,
    fulfilled: Option<i64>,
    completed: Option<i64>,
) -> GameDetailRound {
    GameDetailRound {
        id: id.into(),
        prompt: format!("prompt {id}"),
        position,
        started,
        fulfilled,
        completed,
    }
}

pub fn round_detail(
    id: &str,
    entries: Vec<RoundEntry>,
    votes: Vec<RoundEntryVote>,
) -> RoundDetailResponse {
    RoundDetailResponse {
        id: id.into(),
        prompt: format!("prompt {id}"),
        position: 0,
        created: Some(1),
        started: Some(1),
        fulfilled: None,
        completed: None,
        entries,
        votes,
    }
}

pub fn entry(id: &str, round_id: &str, user_id: &str, text: &str) -> RoundEntry {
    RoundEntry {
        id: id.into(),
        entry: text.into(),
        member_id: format!("member-{user_id}"),
        round_id: round_id.into(),
        user_id: user_id.into(),
        user_name: format!("{user_id}-name"),
    }
}

pub fn vote(id: &str, user_id: &str, entry_id: &str) -> RoundEntryVote {
    RoundEntryVote {
        id: id.into(),
        user_id: user_id.into(),
        round_entry_id: Some(entry_id.into()),
    }
}

pub fn pending_job(id: &str) -> QueuedJob {
    QueuedJob {
        id: id.into(),
        result: None,
    }
}

pub fn finished_job(id: &str, resource_id: &str) -> QueuedJob {
    QueuedJob {
        id: id.into(),
        result: Some(JobResult {
            kind: "ok".into(),
            data: JobResultData {
                kind: "resource".into(),
                data: JobHandle {
                    id: resource_id.into(),
                },
            },
        }),
    }
}
