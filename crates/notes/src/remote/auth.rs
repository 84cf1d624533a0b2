//! Token management for the notes service
//!
//! The service issues a long-lived refresh token (stored in settings) that
//! is exchanged for a short-lived access token at the start of every run.
//! The access token is refreshed on demand when a request is rejected.

use log::info;
use std::cell::{Cell, RefCell};

use super::{ApiError, NotesClient};

/// Supplies the current access token and refreshes it on rejection
///
/// The executor and fetchers invoke this; the sync run owns it.
pub trait TokenProvider {
    /// Access token to put in the `Authorization` header
    fn access_token(&self) -> String;

    /// Obtain a new access token, replacing the current one
    fn refresh(&self) -> Result<String, ApiError>;
}

/// Per-run authenticated session
pub struct Session<'a> {
    client: &'a NotesClient,
    refresh_token: String,
    access_token: RefCell<String>,
    refreshes: Cell<u32>,
}

impl<'a> Session<'a> {
    /// Exchange the long-lived token for an access token
    ///
    /// Any failure here is fatal for the run.
    pub fn open(client: &'a NotesClient, refresh_token: &str) -> Result<Self, ApiError> {
        let access_token = client
            .exchange_token(refresh_token)
            .map_err(ApiError::into_auth_fatal)?;

        Ok(Self {
            client,
            refresh_token: refresh_token.to_string(),
            access_token: RefCell::new(access_token),
            refreshes: Cell::new(0),
        })
    }

    /// Number of mid-run refreshes performed
    pub fn refresh_count(&self) -> u32 {
        self.refreshes.get()
    }
}

impl TokenProvider for Session<'_> {
    fn access_token(&self) -> String {
        self.access_token.borrow().clone()
    }

    fn refresh(&self) -> Result<String, ApiError> {
        let token = self
            .client
            .exchange_token(&self.refresh_token)
            .map_err(ApiError::into_auth_fatal)?;

        self.refreshes.set(self.refreshes.get() + 1);
        info!("Access token refreshed ({} this run)", self.refreshes.get());
        *self.access_token.borrow_mut() = token.clone();
        Ok(token)
    }
}
