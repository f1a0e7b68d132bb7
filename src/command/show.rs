// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use log::{error, warn};

use crate::{
    error::{self, Result},
    render,
};

use super::{comments::print_comments, Context};

/// Show the description of a coffee and its comments.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// Print the description as the HTML the server sent.
    #[arg(long)]
    raw: bool,

    /// The ID of the coffee.
    #[clap()]
    id: i32,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: &Context) -> Result<()> {
        let token = ctx.token()?;
        ctx.connectivity.require_online().await?;

        let id = self.id;
        ctx.run_coffee(|coffee| async move { coffee.open_coffee(&token, id).await })
            .await?;
        ctx.ensure_session()?;

        let detail = ctx.coffee.coffee_detail().borrow().clone();
        let Some(detail) = detail else {
            error!("We could not load coffee {}", self.id);
            return Err(error::Error::Command);
        };

        println!("{}", detail.name);
        println!();
        if self.raw {
            println!("{}", detail.description_html);
        } else {
            println!("{}", render::html_to_text(&detail.description_html));
        }
        println!();

        let failure = ctx.coffee.error_message().borrow().clone();
        match failure {
            Some(message) => warn!("We could not load the comments: {}", message),
            None => print_comments(&ctx.coffee.comments().borrow()),
        }
        Ok(())
    }
}
