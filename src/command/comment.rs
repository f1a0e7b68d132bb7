// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;
use log::error;
use tokio::sync::mpsc;

use crate::{
    api::Comment,
    error::{self, Result},
};

use super::{comments::print_comments, Context};

/// Post a comment on a coffee as the logged-in user.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The ID of the coffee.
    #[clap()]
    id: i32,

    /// The text of the comment.
    #[clap()]
    text: String,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: &Context) -> Result<()> {
        let session = ctx.repository.session();
        let token = ctx.token()?;
        let user = session.username().ok_or(error::Error::NoToken)?;
        ctx.connectivity.require_online().await?;

        let draft = Comment::draft(self.id, user, &self.text);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let on_error = tx.clone();
        ctx.run_coffee(|coffee| async move {
            coffee
                .post_comment(
                    &token,
                    draft,
                    move |created| {
                        _ = tx.send(Ok(created));
                    },
                    move |message| {
                        _ = on_error.send(Err(message));
                    },
                )
                .await;
        })
        .await?;

        match rx.recv().await {
            Some(Ok(created)) => {
                println!("Posted comment {} on coffee {}", created.id, self.id);
                print_comments(&ctx.coffee.comments().borrow());
                Ok(())
            }
            Some(Err(message)) => {
                ctx.ensure_session()?;
                error!("{}", message);
                Err(error::Error::Command)
            }
            None => Err(error::Error::Cancelled),
        }
    }
}
