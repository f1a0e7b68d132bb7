// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use clap::Parser;

use crate::error::Result;

use super::Context;

/// Show who is logged in. Makes no network requests.
#[derive(Debug, Parser)]
pub(crate) struct Command {}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: &Context) -> Result<()> {
        let session = ctx.repository.session();
        match (session.is_authenticated(), session.username()) {
            (true, Some(username)) => println!("Logged in as {username}"),
            (true, None) => println!("Logged in"),
            (false, _) => println!("Not logged in"),
        }
        Ok(())
    }
}
