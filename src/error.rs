// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{io, result};

use thiserror::Error;

pub(crate) type Result<T, E = Error> = result::Result<T, E>;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("IO operation failed: {0}")]
    Io(#[from] io::Error),
    #[error("JSON format error: {0}")]
    Json(serde_json::Error),
    #[error("network error: {0}")]
    Network(reqwest::Error),
    #[error("could not decode server response: {0}")]
    Decode(reqwest::Error),
    #[error("no internet connection, check your network")]
    Offline,
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("login failed: {0}")]
    Auth(#[from] Auth),
    #[error("session expired or token is invalid, log in again")]
    Unauthorized,
    #[error("server returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("you are not logged in")]
    NoToken,
    #[error("storage error: {0}")]
    Storage(#[from] Storage),
    #[error("password retrieval error: {0}")]
    Password(#[from] Password),
    #[error("command execution failed")]
    Command,
    #[error("operation cancelled")]
    Cancelled,
}

impl From<pinentry::Error> for Error {
    fn from(value: pinentry::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(
            clippy::wildcard_enum_match_arm,
            clippy::match_wildcard_for_single_variants
        )]
        match value {
            pinentry::Error::Cancelled | pinentry::Error::Timeout => Self::Cancelled,
            pinentry::Error::Io(e) => Self::Io(e),
            _ => Self::Password(Password::Pinentry(value)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(clippy::wildcard_enum_match_arm)]
        match value.classify() {
            serde_json::error::Category::Io => Self::Io(value.into()),
            _ => Self::Json(value),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        match value.status() {
            Some(status) if status == reqwest::StatusCode::UNAUTHORIZED => Self::Unauthorized,
            Some(status) => Self::Status {
                status: status.as_u16(),
                message: value.to_string(),
            },
            None if value.is_decode() => Self::Decode(value),
            None => Self::Network(value),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Io(value.into())
    }
}

#[derive(Error, Debug)]
pub(crate) enum Auth {
    #[error("server rejected the credentials (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("server sent an empty response")]
    EmptyResponse,
    #[error("server accepted the login but did not issue a token: {}", .0.as_deref().unwrap_or("no message"))]
    MissingToken(Option<String>),
}

#[derive(Error, Debug)]
pub(crate) enum Storage {
    #[error("no platform data directory is available")]
    #[cfg_attr(not(feature = "keychain"), allow(dead_code))]
    NoProjectDirs,
    #[error("stored session is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("stored session has no token")]
    EmptyToken,
    #[cfg(feature = "secret-service")]
    #[error("secret service error: {0}")]
    SecretService(#[from] oo7::Error),
    #[cfg(feature = "keychain")]
    #[error("Keychain error: {0}")]
    Keychain(#[from] security_framework::base::Error),
}

#[derive(Error, Debug)]
pub(crate) enum Password {
    #[error("no password prompt available")]
    NoPrompt,
    #[error("Pinentry implementation error: {0}")]
    Pinentry(pinentry::Error),
}
