// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{future::Future, sync::Arc};

use log::{error, info, warn};
use secrecy::SecretString;
use tokio::{sync::watch, task::JoinHandle};
use tokio_stream::wrappers::WatchStream;

use crate::{
    api::{LoginRequest, LoginResponse},
    error::{self, Error},
    repository::Repository,
    session::Session,
};

use super::scope::Scope;

#[derive(Clone, Debug)]
pub(crate) enum LoginState {
    Idle,
    Loading,
    Success(LoginResponse),
    Error(LoginFailure),
}

#[derive(Clone, Debug)]
pub(crate) struct LoginFailure {
    pub(crate) message: String,
    /// The server answered and turned the credentials down, so asking for
    /// them again can help.
    pub(crate) credentials_rejected: bool,
}

impl From<&Error> for LoginFailure {
    fn from(value: &Error) -> Self {
        Self {
            message: value.to_string(),
            credentials_rejected: matches!(value, Error::Auth(error::Auth::Rejected { .. })),
        }
    }
}

/// Drives a login form: `Idle -> Loading -> Success | Error`, and back to
/// `Idle` on logout.
#[derive(Clone)]
pub(crate) struct Controller {
    inner: Arc<Inner>,
}

struct Inner {
    repository: Repository,
    state: watch::Sender<LoginState>,
    scope: Scope,
}

impl Controller {
    pub(crate) fn new(repository: Repository) -> Self {
        let (state, _) = watch::channel(LoginState::Idle);
        Self {
            inner: Arc::new(Inner {
                repository,
                state,
                scope: Scope::default(),
            }),
        }
    }

    pub(crate) fn state(&self) -> watch::Receiver<LoginState> {
        self.inner.state.subscribe()
    }

    fn set(&self, state: LoginState) {
        _ = self.inner.state.send_replace(state);
    }

    pub(crate) async fn login(&self, user: &str, password: SecretString) {
        self.set(LoginState::Loading);

        let request = LoginRequest {
            user: user.to_owned(),
            password,
        };
        let next = match self.inner.repository.login(&request).await {
            Ok(response) => {
                info!("Logged in as {}", user);
                LoginState::Success(response)
            }
            Err(e) => {
                warn!("Could not log in as {}: {}", user, e);
                LoginState::Error(LoginFailure::from(&e))
            }
        };
        self.set(next);
    }

    pub(crate) async fn logout(&self) {
        if let Err(e) = self.inner.repository.logout().await {
            error!("Could not clear the stored session: {}", e);
        }
        self.set(LoginState::Idle);
    }

    /// The server no longer accepts our token.
    pub(crate) async fn expire_session(&self) {
        warn!("The session is no longer valid, so we are logging out");
        self.logout().await;
    }

    pub(crate) fn observe_session(&self) -> WatchStream<Session> {
        self.inner.repository.observe_session()
    }

    pub(crate) fn launch<F, Fut>(&self, action: F) -> JoinHandle<()>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.inner.scope.spawn(action(self.clone()))
    }

    pub(crate) fn close(&self) {
        self.inner.scope.close();
    }
}
