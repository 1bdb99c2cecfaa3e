use serde::Serialize;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::dto::validation::validate_entry_text;

/// Body of `POST /round-entries`.
#[derive(Debug, Clone, Serialize)]
pub struct RoundEntryPayload {
    pub round_id: String,
    pub entry: String,
}

impl Validate for RoundEntryPayload {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.round_id.is_empty() {
            errors.add("round_id", ValidationError::new("round_id_empty"));
        }

        if let Err(e) = validate_entry_text(&self.entry) {
            errors.add("entry", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Body of `POST /round-entry-votes`.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct VotePayload {
    #[validate(length(min = 1))]
    pub entry_id: String,
    #[validate(length(min = 1))]
    pub round_id: String,
}

/// Body of `POST /lobbies`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateLobbyPayload {
    pub kind: String,
}

/// Body of `POST /games`.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct CreateGamePayload {
    #[validate(length(min = 1))]
    pub lobby_id: String,
}

/// Body of `POST`/`DELETE /lobby-memberships`.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct LobbyMembershipPayload {
    #[validate(length(min = 1))]
    pub lobby_id: String,
}
