// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use log::debug;
use tokio_stream::wrappers::WatchStream;

use crate::{
    api::{Api, Coffee, LoginRequest, LoginResponse},
    error::{self, Error, Result},
    session::{self, Session},
};

/// Combines the session with the API. Holds no state of its own; clones
/// share the same API client and session store.
#[derive(Clone)]
pub(crate) struct Repository {
    api: Arc<dyn Api>,
    session: Arc<session::Store>,
}

impl Repository {
    pub(crate) fn new(api: Arc<dyn Api>, session: Arc<session::Store>) -> Self {
        Self { api, session }
    }

    pub(crate) fn api(&self) -> Arc<dyn Api> {
        Arc::clone(&self.api)
    }

    /// Logs in and, only if the server issued a token, saves the session
    /// under the name the user typed.
    pub(crate) async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        let response = self.api.login(request).await?;
        let token = response
            .token
            .clone()
            .ok_or_else(|| error::Auth::MissingToken(response.message.clone()))?;
        self.session.save(token, &request.user).await?;
        Ok(response)
    }

    pub(crate) async fn logout(&self) -> Result<()> {
        self.session.clear().await
    }

    pub(crate) async fn list_coffees(&self) -> Result<Vec<Coffee>> {
        let session = self.session.current();
        let token = session.token().ok_or(Error::NoToken)?;
        debug!(
            "Listing coffees for {}",
            session.username().unwrap_or("unknown user")
        );
        self.api.list_coffees(token).await
    }

    pub(crate) fn observe_session(&self) -> WatchStream<Session> {
        self.session.observe()
    }

    pub(crate) fn session(&self) -> Session {
        self.session.current()
    }
}
