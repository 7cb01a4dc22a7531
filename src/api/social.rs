//! Purpose: User directory and follow-graph operations.
//! Exports: Profile, user listing, and follow/unfollow methods on `Client`.
//! Role: Thin resource surface; one method call is one request.
#![allow(clippy::result_large_err)]

use crate::api::client::{Client, ListOptions, apply_list_options};
use crate::core::error::Error;
use serde_json::Value;

impl Client {
    /// GET `/user/{username}`.
    pub fn fetch_user_profile(&self, username: &str) -> Result<Value, Error> {
        let url = self.url(&["user", username])?;
        self.request_json::<(), Value>("GET", &url, None)
    }

    /// GET `/users` with optional paging/filter options.
    pub fn fetch_users(&self, options: &ListOptions) -> Result<Vec<Value>, Error> {
        let mut url = self.url(&["users"])?;
        apply_list_options(&mut url, options);
        self.request_json::<(), Vec<Value>>("GET", &url, None)
    }

    /// POST `/follow/{username}`: start following as the logged-in user.
    pub fn follow(&self, username: &str) -> Result<Value, Error> {
        let url = self.url(&["follow", username])?;
        self.request_json::<(), Value>("POST", &url, None)
    }

    /// DELETE `/follow/{username}`.
    pub fn unfollow(&self, username: &str) -> Result<(), Error> {
        let url = self.url(&["follow", username])?;
        let _: Value = self.request_json::<(), Value>("DELETE", &url, None)?;
        Ok(())
    }

    /// GET `/followers/{username}`.
    pub fn fetch_followers(&self, username: &str) -> Result<Vec<Value>, Error> {
        let url = self.url(&["followers", username])?;
        self.request_json::<(), Vec<Value>>("GET", &url, None)
    }

    /// GET `/following/{username}`.
    pub fn fetch_following(&self, username: &str) -> Result<Vec<Value>, Error> {
        let url = self.url(&["following", username])?;
        self.request_json::<(), Vec<Value>>("GET", &url, None)
    }
}
