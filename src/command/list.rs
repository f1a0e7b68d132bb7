// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use core::num;

use async_trait::async_trait;
use clap::Parser;
use log::error;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table,
};

use crate::error::{self, Result};

use super::Context;

/// List the coffees in the catalog.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The number of coffees to show.
    #[arg(short, long)]
    count: Option<num::NonZeroUsize>,
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, ctx: &Context) -> Result<()> {
        ctx.connectivity.require_online().await?;
        ctx.run_coffee(|coffee| async move { coffee.fetch_coffees().await })
            .await?;

        let failure = ctx.coffee.error_message().borrow().clone();
        if let Some(message) = failure {
            error!("We could not list the coffees: {}", message);
            return Err(error::Error::Command);
        }

        let coffees = ctx.coffee.coffee_list().borrow().clone().unwrap_or_default();
        if coffees.is_empty() {
            println!("The catalog is empty");
        } else {
            println!(
                "{}",
                Table::new(
                    coffees
                        .iter()
                        .take(self.count.map_or(usize::MAX, num::NonZeroUsize::get))
                )
                .with(Style::rounded())
                .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
            );
        }
        Ok(())
    }
}
