//! Wire models exchanged with krumnet.
//!
//! Timestamps are milliseconds since the Unix epoch; absent or null
//! collections decode as empty.

use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnNull, serde_as};

/// Authenticated user as reported by `/auth/identify`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Envelope returned by `/auth/identify`.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentifyResponse {
    pub user: CurrentUser,
}

/// Row of the lobby listing.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LobbySummary {
    pub id: String,
    pub name: String,
    pub created: i64,
    #[serde(default)]
    pub member_count: u32,
    #[serde(default)]
    pub game_count: u32,
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct LobbyListResponse {
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub lobbies: Vec<LobbySummary>,
}

/// Game listed inside a lobby detail.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LobbyGame {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub rounds_remaining: u32,
    pub created: i64,
}

/// Membership listed inside a lobby detail.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LobbyMember {
    pub member_id: String,
    pub user_id: String,
    pub name: String,
    pub joined_at: Option<i64>,
    pub left_at: Option<i64>,
}

/// Lobby with its members and games.
#[serde_as]
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LobbyDetail {
    pub id: String,
    pub name: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub games: Vec<LobbyGame>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub members: Vec<LobbyMember>,
}

/// Member taking part in a game.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GameDetailMember {
    pub member_id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Round summary as listed in a game detail.
#[serde_as]
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GameDetailRound {
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub prompt: String,
    pub position: u32,
    #[serde(default)]
    pub started: Option<i64>,
    #[serde(default)]
    pub fulfilled: Option<i64>,
    #[serde(default)]
    pub completed: Option<i64>,
}

/// Final standing of a player once the game ended.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GamePlacement {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub place: u32,
    #[serde(default)]
    pub vote_count: u32,
}

/// Game detail served by `/games`.
#[serde_as]
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GameDetailResponse {
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub name: String,
    pub created: i64,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub ended: bool,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub members: Vec<GameDetailMember>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub rounds: Vec<GameDetailRound>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub placements: Vec<GamePlacement>,
}

/// Entry submitted for a round.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RoundEntry {
    pub id: String,
    pub entry: String,
    pub member_id: String,
    pub round_id: String,
    pub user_id: String,
    pub user_name: String,
}

/// Vote cast for a round entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RoundEntryVote {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub round_entry_id: Option<String>,
}

/// Round detail served by `/rounds`.
#[serde_as]
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RoundDetailResponse {
    pub id: String,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub prompt: String,
    pub position: u32,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub started: Option<i64>,
    #[serde(default)]
    pub fulfilled: Option<i64>,
    #[serde(default)]
    pub completed: Option<i64>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub entries: Vec<RoundEntry>,
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub votes: Vec<RoundEntryVote>,
}

/// Acknowledgement of a created round entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryReceipt {
    pub entry: String,
}

/// Acknowledgement of a cast vote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteReceipt {
    pub id: String,
}

/// Handle of a queued provisioning job.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct JobHandle {
    pub id: String,
}

/// Poll response for a provisioning job; `result` stays null until done.
#[derive(Debug, Clone, Deserialize)]
pub struct QueuedJob {
    pub id: String,
    pub result: Option<JobResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobResult {
    #[serde(default)]
    pub kind: String,
    pub data: JobResultData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobResultData {
    #[serde(default)]
    pub kind: String,
    pub data: JobHandle,
}

impl QueuedJob {
    /// Identifier of the provisioned resource, once the job finished.
    pub fn resource_id(&self) -> Option<&str> {
        self.result
            .as_ref()
            .map(|result| result.data.data.id.as_str())
    }
}

/// Response to joining a lobby.
#[derive(Debug, Clone, Deserialize)]
pub struct MembershipResponse {
    pub lobby_id: String,
}
