// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

//! The coffee catalog API: domain types and the operations the rest of the
//! client depends on.

mod http;
#[cfg(test)]
pub(crate) mod mock;
mod wire;

use async_trait::async_trait;
use secrecy::SecretString;
use tabled::Tabled;

use crate::error::Result;

pub(crate) use http::Http;

#[derive(Clone, Debug, PartialEq, Eq, Tabled)]
pub(crate) struct Coffee {
    #[tabled(rename = "ID")]
    pub(crate) id: i32,
    #[tabled(rename = "Name")]
    pub(crate) name: String,
    #[tabled(rename = "Comments")]
    pub(crate) comment_count: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct CoffeeDetail {
    pub(crate) id: i32,
    pub(crate) name: String,
    /// Raw HTML as served by the API.
    pub(crate) description_html: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Tabled)]
pub(crate) struct Comment {
    #[tabled(rename = "ID")]
    pub(crate) id: i32,
    #[tabled(skip)]
    pub(crate) coffee_id: i32,
    #[tabled(rename = "User")]
    pub(crate) user: String,
    #[tabled(rename = "Comment")]
    pub(crate) text: String,
}

impl Comment {
    /// A comment that has not been submitted yet. The server assigns the
    /// identifier.
    pub(crate) fn draft(coffee_id: i32, user: &str, text: &str) -> Self {
        Self {
            id: 0,
            coffee_id,
            user: user.to_owned(),
            text: text.to_owned(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct LoginRequest {
    pub(crate) user: String,
    pub(crate) password: SecretString,
}

#[derive(Clone, Debug)]
pub(crate) struct LoginResponse {
    pub(crate) ok: bool,
    pub(crate) token: Option<SecretString>,
    pub(crate) message: Option<String>,
    pub(crate) username: String,
}

/// Every operation is a single attempt. Authenticated operations fail with
/// [`crate::error::Error::Unauthorized`] when the server answers 401.
#[async_trait]
pub(crate) trait Api: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse>;

    async fn list_coffees(&self, token: &SecretString) -> Result<Vec<Coffee>>;

    async fn coffee_detail(&self, token: &SecretString, id: i32) -> Result<CoffeeDetail>;

    async fn list_comments(&self, token: &SecretString, coffee_id: i32) -> Result<Vec<Comment>>;

    async fn post_comment(&self, token: &SecretString, comment: &Comment) -> Result<Comment>;
}
