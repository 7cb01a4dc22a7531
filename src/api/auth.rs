//! Purpose: Authentication operations and their session side effects.
//! Exports: `SignupVisibility`; login/signup/logout/profile methods on `Client`.
//! Role: The only module that mutates the session store.
//! Invariants: Auth state is anonymous -> authenticated -> anonymous; a failed
//! call leaves the state unchanged.
//! Invariants: Logout with no session rejects before any network call.
#![allow(clippy::result_large_err)]

use crate::api::client::Client;
use crate::core::error::{Error, ErrorKind};
use crate::core::session::Session;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default ACL flags for objects a new user creates, sent with signup.
#[derive(Clone, Copy, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupVisibility {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_by_anonymous_users: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_by_the_user: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_by_friends: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_by_registered_users: Option<bool>,
}

#[derive(Deserialize)]
struct AuthData {
    user: AuthUser,
    #[serde(rename = "X-BB-SESSION")]
    token: String,
    #[serde(default, rename = "visibleByAnonymousUsers")]
    visible_by_anonymous_users: Option<bool>,
    #[serde(default, rename = "visibleByTheUser")]
    visible_by_the_user: Option<bool>,
    #[serde(default, rename = "visibleByFriends")]
    visible_by_friends: Option<bool>,
    #[serde(default, rename = "visibleByRegisteredUsers")]
    visible_by_registered_users: Option<bool>,
}

#[derive(Deserialize)]
struct AuthUser {
    name: String,
    #[serde(default)]
    roles: Vec<RoleEntry>,
}

#[derive(Deserialize)]
struct RoleEntry {
    name: String,
}

#[derive(Serialize)]
struct SignupRequest<'a> {
    username: &'a str,
    password: &'a str,
    #[serde(flatten)]
    visibility: SignupVisibility,
}

#[derive(Serialize)]
struct ChangePasswordRequest<'a> {
    old: &'a str,
    new: &'a str,
}

impl Client {
    /// POST `/login` (form-encoded, the backend's login wire format).
    /// On success the issued session is written through to the store.
    pub fn login(&self, username: &str, password: &str) -> Result<Session, Error> {
        let url = self.url(&["login"])?;
        let data: AuthData = self.request_form(
            "POST",
            &url,
            &[
                ("username", username),
                ("password", password),
                ("appcode", self.config().appcode()),
            ],
        )?;
        let session = session_from_auth(data);
        self.sessions().set(session.clone())?;
        Ok(session)
    }

    /// POST `/user`. The backend issues a session for the new user, handled
    /// exactly like a login.
    pub fn signup(
        &self,
        username: &str,
        password: &str,
        visibility: Option<SignupVisibility>,
    ) -> Result<Session, Error> {
        let url = self.url(&["user"])?;
        let payload = SignupRequest {
            username,
            password,
            visibility: visibility.unwrap_or_default(),
        };
        let data: AuthData = self.request_json("POST", &url, Some(&payload))?;
        let session = session_from_auth(data);
        self.sessions().set(session.clone())?;
        Ok(session)
    }

    /// POST `/logout`, then clear the session store. With no active session
    /// this rejects immediately and issues no request.
    pub fn logout(&self) -> Result<(), Error> {
        if self.current_user().is_none() {
            return Err(Error::new(ErrorKind::Usage).with_message("user already logged out"));
        }
        let url = self.url(&["logout"])?;
        let _: Value = self.request_json::<(), Value>("POST", &url, None)?;
        self.sessions().clear()
    }

    /// GET `/me`: the server-side profile of the logged-in user.
    pub fn fetch_current_user(&self) -> Result<Value, Error> {
        let url = self.url(&["me"])?;
        self.request_json::<(), Value>("GET", &url, None)
    }

    /// PUT `/me` with profile fields to merge.
    pub fn update_profile(&self, params: &Value) -> Result<Value, Error> {
        let url = self.url(&["me"])?;
        self.request_json("PUT", &url, Some(params))
    }

    /// PUT `/me/password`.
    pub fn change_password(&self, old_password: &str, new_password: &str) -> Result<Value, Error> {
        let url = self.url(&["me", "password"])?;
        let payload = ChangePasswordRequest {
            old: old_password,
            new: new_password,
        };
        self.request_json("PUT", &url, Some(&payload))
    }

    /// GET `/user/{username}/password/reset` for the logged-in user.
    pub fn reset_password(&self) -> Result<(), Error> {
        let Some(session) = self.current_user() else {
            return Err(Error::new(ErrorKind::Usage).with_message("no user is logged in"));
        };
        let url = self.url(&["user", &session.username, "password", "reset"])?;
        let _: Value = self.request_json::<(), Value>("GET", &url, None)?;
        Ok(())
    }
}

/// Explicit mapping from the backend's role objects to role names; an empty
/// role array means zero roles.
fn session_from_auth(data: AuthData) -> Session {
    let roles = data
        .user
        .roles
        .into_iter()
        .map(|role| role.name)
        .collect::<Vec<_>>();
    Session {
        username: data.user.name,
        token: data.token,
        roles,
        visible_by_anonymous_users: data.visible_by_anonymous_users,
        visible_by_the_user: data.visible_by_the_user,
        visible_by_friends: data.visible_by_friends,
        visible_by_registered_users: data.visible_by_registered_users,
    }
}
