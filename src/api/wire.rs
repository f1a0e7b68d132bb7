// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use secrecy::{ExposeSecret as _, SecretString};
use serde::{de, Deserialize, Deserializer, Serialize};

use super::{Coffee, CoffeeDetail, Comment, LoginRequest, LoginResponse};

#[derive(Debug, Serialize, PartialEq)]
pub(super) struct Login<'request> {
    #[serde(rename = "usuario")]
    pub(super) user: &'request str,
    pub(super) password: &'request str,
}

impl<'request> From<&'request LoginRequest> for Login<'request> {
    fn from(value: &'request LoginRequest) -> Self {
        Self {
            user: &value.user,
            password: value.password.expose_secret(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct LoginReply {
    pub(super) ok: bool,
    pub(super) token: Option<SecretString>,
    pub(super) message: Option<String>,
    #[serde(default)]
    pub(super) username: String,
}

impl From<LoginReply> for LoginResponse {
    fn from(value: LoginReply) -> Self {
        Self {
            ok: value.ok,
            token: value.token,
            message: value.message,
            username: value.username,
        }
    }
}

/// The shape of error bodies, when the server bothers to send one.
#[derive(Debug, Deserialize)]
pub(super) struct ErrorBody {
    pub(super) message: Option<String>,
}

#[derive(Debug, Deserialize, PartialEq)]
pub(super) struct CoffeeEntry {
    pub(super) id: i32,
    pub(super) coffee_name: String,
    #[serde(deserialize_with = "string_or_number")]
    pub(super) comments: String,
}

impl From<CoffeeEntry> for Coffee {
    fn from(value: CoffeeEntry) -> Self {
        Self {
            id: value.id,
            name: value.coffee_name,
            comment_count: value.comments,
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
pub(super) struct CoffeeById {
    pub(super) id: i32,
    pub(super) coffee_name: String,
    pub(super) coffee_desc: String,
}

impl From<CoffeeById> for CoffeeDetail {
    fn from(value: CoffeeById) -> Self {
        Self {
            id: value.id,
            name: value.coffee_name,
            description_html: value.coffee_desc,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub(super) struct CoffeeComment {
    pub(super) id: i32,
    #[serde(rename = "idCoffee")]
    pub(super) id_coffee: i32,
    pub(super) user: String,
    pub(super) comment: String,
}

impl From<CoffeeComment> for Comment {
    fn from(value: CoffeeComment) -> Self {
        Self {
            id: value.id,
            coffee_id: value.id_coffee,
            user: value.user,
            text: value.comment,
        }
    }
}

impl From<&Comment> for CoffeeComment {
    fn from(value: &Comment) -> Self {
        Self {
            id: value.id,
            id_coffee: value.coffee_id,
            user: value.user.clone(),
            comment: value.text.clone(),
        }
    }
}

/// Comment counts arrive as strings, but a numeric count is accepted too.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::invalid_type(
            de::Unexpected::Other(&other.to_string()),
            &"a string or a number",
        )),
    }
}
