use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    dao::{krumnet::KrumnetApi, storage::TokenStore},
    state::session::Session,
};

/// Resolves the current session and owns the credential lifecycle.
pub struct SessionManager {
    api: Arc<dyn KrumnetApi>,
    store: Arc<dyn TokenStore>,
    key: String,
}

impl SessionManager {
    /// `api` is the anonymous client every authorized handle derives from.
    pub fn new(api: Arc<dyn KrumnetApi>, store: Arc<dyn TokenStore>, key: impl Into<String>) -> Self {
        Self {
            api,
            store,
            key: key.into(),
        }
    }

    /// Resolve a session from a freshly supplied token, or from the persisted one.
    ///
    /// Never fails: any problem resolves to the logged-out session.
    pub async fn load(&self, token: Option<String>) -> Session {
        debug!(provided = token.is_some(), "attempting to load session");

        match token {
            Some(token) => self.load_from_token(token).await,
            None => self.load_from_storage().await,
        }
    }

    /// Forget the persisted credential, returning the token that was in use, if any.
    pub async fn logout(&self) -> Option<String> {
        let session = self.load(None).await;
        let token = session.token.clone();
        self.reset().await;
        token
    }

    async fn load_from_storage(&self) -> Session {
        let stored = match self.store.get(&self.key).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(error = %err, "unable to read persisted token");
                None
            }
        };

        match stored {
            Some(token) => {
                debug!("loading session from persisted token");
                self.load_from_token(token).await
            }
            None => {
                debug!("no persisted token found");
                Session::anonymous(self.api.authorized(None))
            }
        }
    }

    async fn load_from_token(&self, token: String) -> Session {
        let api = self.api.authorized(Some(&token));

        match api.identify().await {
            Ok(user) => {
                if let Err(err) = self.store.set(&self.key, &token).await {
                    warn!(error = %err, "unable to persist session token");
                }
                info!(user_id = %user.id, "session resolved");
                Session::authenticated(user, token, api)
            }
            Err(err) => {
                warn!(error = %err, "unable to identify user with token");
                self.reset().await
            }
        }
    }

    /// Drop the credential and the persisted token.
    async fn reset(&self) -> Session {
        if let Err(err) = self.store.remove(&self.key).await {
            warn!(error = %err, "unable to clear persisted token");
        }
        Session::anonymous(self.api.authorized(None))
    }
}

/// Values of `key` in a query string such as `?token=abc&mode=users`.
pub fn find_query_value(key: &str, search: &str) -> Vec<String> {
    search
        .strip_prefix('?')
        .unwrap_or(search)
        .split('&')
        .filter_map(|part| part.split_once('='))
        .filter(|(name, value)| *name == key && !value.is_empty())
        .map(|(_, value)| value.to_string())
        .collect()
}

/// Token handed back by the auth callback redirect, if present.
pub fn token_from_callback(search: &str) -> Option<String> {
    find_query_value("token", search).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::storage::MemoryTokenStore,
        testing::{FakeKrumnet, user},
    };

    const KEY: &str = "krumi:session";

    fn manager(api: &FakeKrumnet, store: &MemoryTokenStore) -> SessionManager {
        SessionManager::new(Arc::new(api.clone()), Arc::new(store.clone()), KEY)
    }

    #[tokio::test]
    async fn fresh_token_is_identified_and_persisted() {
        let api = FakeKrumnet::new();
        api.script().users.insert("tok".into(), user("u1"));
        let store = MemoryTokenStore::new();

        let session = manager(&api, &store).load(Some("tok".into())).await;

        assert!(session.is_authenticated());
        assert_eq!(session.user_id(), "u1");
        assert_eq!(session.token.as_deref(), Some("tok"));
        assert_eq!(store.peek(KEY).as_deref(), Some("tok"));

        let again = session.api().identify().await.unwrap();
        assert_eq!(again.id, "u1");
        assert_eq!(api.count_calls("identify"), 2);
    }

    #[tokio::test]
    async fn rejected_token_clears_storage() {
        let api = FakeKrumnet::new();
        let store = MemoryTokenStore::new().with_token(KEY, "stale");

        let session = manager(&api, &store).load(Some("bad".into())).await;

        assert!(!session.is_authenticated());
        assert_eq!(session.token, None);
        assert_eq!(session.user_id(), "");
        assert_eq!(store.peek(KEY), None);
    }

    #[tokio::test]
    async fn missing_persisted_token_skips_identify() {
        let api = FakeKrumnet::new();
        let store = MemoryTokenStore::new();

        let session = manager(&api, &store).load(None).await;

        assert!(!session.is_authenticated());
        assert_eq!(api.count_calls("identify"), 0);
    }

    #[tokio::test]
    async fn persisted_token_is_reused() {
        let api = FakeKrumnet::new();
        api.script().users.insert("kept".into(), user("u2"));
        let store = MemoryTokenStore::new().with_token(KEY, "kept");

        let session = manager(&api, &store).load(None).await;

        assert_eq!(session.user_id(), "u2");
        assert_eq!(session.token.as_deref(), Some("kept"));
    }

    #[tokio::test]
    async fn persisted_token_that_fails_is_forgotten() {
        let api = FakeKrumnet::new();
        let store = MemoryTokenStore::new().with_token(KEY, "expired");

        let session = manager(&api, &store).load(None).await;

        assert!(!session.is_authenticated());
        assert_eq!(store.peek(KEY), None);
    }

    #[tokio::test]
    async fn logout_returns_token_and_clears_it() {
        let api = FakeKrumnet::new();
        api.script().users.insert("kept".into(), user("u2"));
        let store = MemoryTokenStore::new().with_token(KEY, "kept");

        let token = manager(&api, &store).logout().await;

        assert_eq!(token.as_deref(), Some("kept"));
        assert_eq!(store.peek(KEY), None);
    }

    #[test]
    fn callback_token_is_extracted_from_query() {
        assert_eq!(token_from_callback("?token=abc").as_deref(), Some("abc"));
        assert_eq!(
            token_from_callback("mode=users&token=xyz").as_deref(),
            Some("xyz")
        );
        assert_eq!(token_from_callback("?token="), None);
        assert_eq!(token_from_callback(""), None);
        assert_eq!(
            find_query_value("mode", "?mode=users&mode=games"),
            vec!["users".to_string(), "games".to_string()]
        );
    }
}
