// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use log::error;

use crate::{
    controller::login::LoginState,
    error::{self, Result},
    password::RequestBuilder,
};

use super::Context;

/// Log in and remember the session for later commands.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// How many times to ask for the password before giving up.
    #[arg(long, default_value_t = 3)]
    attempts: u8,

    /// The user name to log in as.
    #[clap()]
    user: String,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: &Context) -> Result<()> {
        ctx.connectivity.require_online().await?;

        let mut last_error: Option<String> = None;
        for _ in 0..self.attempts.max(1) {
            let mut request = RequestBuilder::new(&self.user);
            if let Some(e) = &last_error {
                request = request.with_error(e);
            }
            let password = ctx
                .prompt
                .prompt(request.into_request())
                .await?
                .ok_or(error::Password::NoPrompt)?;

            let user = self.user.clone();
            ctx.run_login(|login| async move { login.login(&user, password).await })
                .await?;

            let state = ctx.login.state().borrow().clone();
            match state {
                LoginState::Success(response) => {
                    println!("Logged in as {}", response.username);
                    return Ok(());
                }
                LoginState::Error(failure) if failure.credentials_rejected => {
                    last_error = Some(failure.message);
                }
                LoginState::Error(failure) => {
                    error!("We could not log in as {}: {}", self.user, failure.message);
                    return Err(error::Error::Command);
                }
                LoginState::Idle | LoginState::Loading => return Err(error::Error::Cancelled),
            }
        }

        error!(
            "We could not log in as {}: {}",
            self.user,
            last_error.as_deref().unwrap_or("no attempts made")
        );
        Err(error::Error::Command)
    }
}
