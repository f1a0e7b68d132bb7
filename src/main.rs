// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
#![deny(elided_lifetimes_in_paths)]
#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused,
    unused_lifetimes,
    unused_qualifications,
    unused_results,
    anonymous_parameters,
    deprecated_in_future,
    elided_lifetimes_in_paths,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    missing_doc_code_examples,
    private_doc_tests,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::unseparated_literal_suffix,
    clippy::decimal_literal_representation,
    clippy::single_char_lifetime_names,
    clippy::fallible_impl_from,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::wildcard_enum_match_arm,
    clippy::deref_by_slicing,
    clippy::default_numeric_fallback,
    clippy::shadow_reuse,
    clippy::clone_on_ref_ptr,
    clippy::todo,
    clippy::string_add,
    clippy::use_debug,
    clippy::future_not_send
)]
#![cfg_attr(not(test), warn(clippy::panic_in_result_fn))]

mod api;
mod command;
mod connectivity;
mod controller;
mod error;
mod metadata;
mod password;
mod render;
mod repository;
mod session;
mod storage;

use std::{path::PathBuf, process, sync::Arc};

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use error::Result;
use log::{debug, error, warn};
use storage::IsPersistent as _;
use url::Url;

#[derive(Debug, Subcommand)]
enum Command {
    Login(command::login::Command),
    Logout(command::logout::Command),
    Session(command::session::Command),
    List(command::list::Command),
    Show(command::show::Command),
    Comments(command::comments::Command),
    Comment(command::comment::Command),
}

#[async_trait]
impl command::Command for Command {
    async fn execute(self, ctx: &command::Context) -> Result<()> {
        match self {
            Self::Login(cmd) => cmd.execute(ctx).await,
            Self::Logout(cmd) => cmd.execute(ctx).await,
            Self::Session(cmd) => cmd.execute(ctx).await,
            Self::List(cmd) => cmd.execute(ctx).await,
            Self::Show(cmd) => cmd.execute(ctx).await,
            Self::Comments(cmd) => cmd.execute(ctx).await,
            Self::Comment(cmd) => cmd.execute(ctx).await,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// The base URL of the coffee catalog API.
    #[arg(long, env = "CUPPA_URL", default_value = metadata::DEFAULT_BASE_URL, value_parser = Url::parse)]
    url: Url,

    /// Keep the session only for this invocation instead of storing it.
    #[arg(long)]
    no_persist_session: bool,

    /// The path to the Pinentry program to use when asking for the password
    /// to log in with.
    #[arg(long, value_hint = clap::ValueHint::ExecutablePath)]
    pinentry_program: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

async fn get_session_storage(args: &Args) -> Box<dyn storage::Storage<session::Data>> {
    if !args.no_persist_session {
        #[cfg(feature = "secret-service")]
        match storage::SecretService::new(&args.url).await {
            Ok(secret_service_storage) => return Box::new(secret_service_storage),
            Err(e) => {
                warn!("We need to fall back to unencrypted file storage because we can't connect to the secret service: {}", e);
            }
        }

        #[cfg(feature = "keychain")]
        match storage::Keychain::new(&args.url) {
            Ok(keychain_storage) => return Box::new(keychain_storage),
            Err(e) => {
                warn!("We need to fall back to unencrypted file storage because we can't connect to Keychain: {}", e);
            }
        }

        if let Some(file_storage) = storage::File::new("session.json") {
            return Box::new(file_storage);
        }
    }

    Box::new(storage::Memory::<session::Data>::new())
}

async fn run(args: Args) -> Result<()> {
    let prompt: Vec<Box<dyn password::Prompt>> = vec![
        Box::new(args.pinentry_program.clone().map_or_else(
            password::PinentryPrompt::new,
            password::PinentryPrompt::new_with_executable,
        )),
        Box::new(password::RpasswordPrompt),
    ];

    let connectivity: Box<dyn connectivity::Connectivity> =
        match connectivity::TcpCheck::new(&args.url) {
            Some(check) => Box::new(check),
            None => {
                warn!(
                    "The URL {} has no host to check, so we will assume we are online",
                    args.url
                );
                Box::new(connectivity::AssumeOnline)
            }
        };

    let storage = get_session_storage(&args).await;
    if !args.no_persist_session && !storage.is_persistent() {
        warn!("We can't find anywhere to store the session, so you will need to log in again next time");
    }
    let session = Arc::new(session::Store::load(storage).await?);
    let http = api::Http::new(args.url)?;
    debug!("Using the coffee catalog at {}", http.base());
    let api: Arc<dyn api::Api> = Arc::new(http);
    let repository = repository::Repository::new(api, session);

    let ctx = command::Context::new(repository, connectivity, Box::new(prompt));
    let result = command::Command::execute(args.command, &ctx).await;
    ctx.shutdown().await;

    result
}

#[tokio::main]
async fn main() {
    let logger_env = env_logger::Env::new()
        .filter_or("CUPPA_LOG", "warn")
        .write_style("CUPPA_LOG_STYLE");
    env_logger::Builder::from_env(logger_env).init();

    if let Err(e) = run(Args::parse()).await {
        error!("We encountered an error: {}", e);
        process::exit(1);
    };
}
