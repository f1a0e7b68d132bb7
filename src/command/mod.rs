// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::future::Future;

use async_trait::async_trait;
use log::warn;
use secrecy::SecretString;
use tokio::{select, signal, task::JoinHandle};

use crate::{
    connectivity::Connectivity,
    controller,
    error::{Error, Result},
    password::Prompt,
    repository::Repository,
};

pub(crate) mod comment;
pub(crate) mod comments;
pub(crate) mod list;
pub(crate) mod login;
pub(crate) mod logout;
pub(crate) mod session;
pub(crate) mod show;

/// Everything a command needs, built once per invocation.
pub(crate) struct Context {
    pub(crate) repository: Repository,
    pub(crate) login: controller::login::Controller,
    pub(crate) coffee: controller::coffee::Controller,
    pub(crate) connectivity: Box<dyn Connectivity>,
    pub(crate) prompt: Box<dyn Prompt>,
}

impl Context {
    pub(crate) fn new(
        repository: Repository,
        connectivity: Box<dyn Connectivity>,
        prompt: Box<dyn Prompt>,
    ) -> Self {
        let login = controller::login::Controller::new(repository.clone());
        let coffee = controller::coffee::Controller::new(repository.clone(), login.clone());
        Self {
            repository,
            login,
            coffee,
            connectivity,
            prompt,
        }
    }

    /// The token of the current session, for commands that cannot run
    /// without one.
    pub(crate) fn token(&self) -> Result<SecretString> {
        self.repository
            .session()
            .token()
            .cloned()
            .ok_or(Error::NoToken)
    }

    /// Fails if an action logged us out because the server rejected the
    /// token.
    pub(crate) fn ensure_session(&self) -> Result<()> {
        if self.repository.session().is_authenticated() {
            Ok(())
        } else {
            Err(Error::Unauthorized)
        }
    }

    pub(crate) async fn run_login<F, Fut>(&self, action: F) -> Result<()>
    where
        F: FnOnce(controller::login::Controller) -> Fut + Send,
        Fut: Future<Output = ()> + Send + 'static,
    {
        interruptible(self.login.launch(action), || self.login.close()).await
    }

    pub(crate) async fn run_coffee<F, Fut>(&self, action: F) -> Result<()>
    where
        F: FnOnce(controller::coffee::Controller) -> Fut + Send,
        Fut: Future<Output = ()> + Send + 'static,
    {
        interruptible(self.coffee.launch(action), || self.coffee.close()).await
    }

    /// Closes both controllers and waits for anything they still run.
    pub(crate) async fn shutdown(&self) {
        self.login.close();
        self.coffee.close();
        self.coffee.wait().await;
    }
}

/// Waits for a launched action, closing its controller if the user presses
/// Ctrl-C first.
async fn interruptible<C: FnOnce() + Send>(mut handle: JoinHandle<()>, close: C) -> Result<()> {
    select! {
        result = &mut handle => Ok(result?),
        interrupt = signal::ctrl_c() => {
            interrupt?;
            warn!("Interrupted, so we are abandoning the request");
            close();
            handle.await?;
            Err(Error::Cancelled)
        }
    }
}

#[cfg(test)]
pub(crate) async fn context_with(
    mock: crate::api::mock::Mock,
    prompt: Box<dyn Prompt>,
) -> Result<(Context, std::sync::Arc<crate::api::mock::Mock>)> {
    let fixture = controller::fixture_with(mock).await?;
    let ctx = Context::new(
        fixture.repository,
        Box::new(crate::connectivity::AssumeOnline),
        prompt,
    );
    Ok((ctx, fixture.mock))
}

#[async_trait]
pub(crate) trait Command {
    async fn execute(self, ctx: &Context) -> Result<()>;
}
