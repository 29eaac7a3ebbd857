//! Placeholder authentication: a token in the store gates every route but `/login`.

use serde::{Deserialize, Serialize};

use crate::KeyValueStore;

pub const AUTH_TOKEN_KEY: &str = "authToken";
pub const USER_KEY: &str = "user";
pub const LOGIN_ROUTE: &str = "/login";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub email: String,
    pub name: String,
}

pub fn is_authenticated(store: &dyn KeyValueStore) -> bool {
    auth_token(store).is_some()
}

pub fn auth_token(store: &dyn KeyValueStore) -> Option<String> {
    store.get(AUTH_TOKEN_KEY).filter(|token| !token.is_empty())
}

/// Stored user object; a malformed entry reads as no user.
pub fn current_user(store: &dyn KeyValueStore) -> Option<SessionUser> {
    let raw = store.get(USER_KEY)?;
    serde_json::from_str(&raw).ok()
}

pub fn sign_in(store: &dyn KeyValueStore, token: &str, user: &SessionUser) {
    store.set(AUTH_TOKEN_KEY, token);
    if let Ok(json) = serde_json::to_string(user) {
        store.set(USER_KEY, &json);
    }
}

pub fn logout(store: &dyn KeyValueStore) {
    store.remove(AUTH_TOKEN_KEY);
    store.remove(USER_KEY);
}

/// Whether `path` may be shown with the current session.
pub fn route_allowed(path: &str, store: &dyn KeyValueStore) -> bool {
    let path = path.trim_end_matches('/');
    path == LOGIN_ROUTE || is_authenticated(store)
}
