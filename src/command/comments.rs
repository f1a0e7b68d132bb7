// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use log::error;
use tabled::{settings::Style, Table};

use crate::{
    api::Comment,
    error::{self, Result},
};

use super::Context;

/// List the comments on a coffee.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The ID of the coffee.
    #[clap()]
    id: i32,
}

pub(super) fn print_comments(comments: &[Comment]) {
    if comments.is_empty() {
        println!("No comments yet");
    } else {
        println!("{}", Table::new(comments).with(Style::rounded()));
    }
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: &Context) -> Result<()> {
        let token = ctx.token()?;
        ctx.connectivity.require_online().await?;

        let id = self.id;
        ctx.run_coffee(|coffee| async move { coffee.load_comments(&token, id).await })
            .await?;
        ctx.ensure_session()?;

        let failure = ctx.coffee.error_message().borrow().clone();
        if let Some(message) = failure {
            error!("We could not list the comments on coffee {}: {}", self.id, message);
            return Err(error::Error::Command);
        }

        print_comments(&ctx.coffee.comments().borrow());
        Ok(())
    }
}
