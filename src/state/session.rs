use std::{fmt, sync::Arc};

use crate::dao::{krumnet::KrumnetApi, models::CurrentUser};

/// Resolved identity of the person using the client.
///
/// The `api` handle carries the session credential; every request made on
/// behalf of this session goes through it.
#[derive(Clone)]
pub struct Session {
    pub user: Option<CurrentUser>,
    pub token: Option<String>,
    api: Arc<dyn KrumnetApi>,
}

impl Session {
    pub fn authenticated(user: CurrentUser, token: String, api: Arc<dyn KrumnetApi>) -> Self {
        Self {
            user: Some(user),
            token: Some(token),
            api,
        }
    }

    /// Session without a user; `api` must not carry a credential.
    pub fn anonymous(api: Arc<dyn KrumnetApi>) -> Self {
        Self {
            user: None,
            token: None,
            api,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Identifier of the current user, or an empty string when logged out.
    pub fn user_id(&self) -> String {
        self.user
            .as_ref()
            .map(|user| user.id.clone())
            .unwrap_or_default()
    }

    /// Client bound to this session's credential.
    pub fn api(&self) -> Arc<dyn KrumnetApi> {
        self.api.clone()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
