// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Response, StatusCode};
use secrecy::{ExposeSecret as _, SecretString};
use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    error::{self, Error, Result},
    metadata,
};

use super::{wire, Api, Coffee, CoffeeDetail, Comment, LoginRequest, LoginResponse};

/// The API over HTTPS. Holds one connection pool for the lifetime of the
/// client; clone the surrounding `Arc` rather than building another.
pub(crate) struct Http {
    client: reqwest::Client,
    base: Url,
}

impl Http {
    pub(crate) fn new(mut base: Url) -> Result<Self> {
        // Relative joins drop the last path segment unless it ends in a slash.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .user_agent(metadata::CLIENT_USER_AGENT.as_str())
            .build()
            .map_err(Error::Network)?;

        Ok(Self { client, base })
    }

    pub(crate) const fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    async fn get<T: DeserializeOwned>(&self, token: &SecretString, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::UNAUTHORIZED {
        warn!("The server did not accept our token for {}", response.url());
        return Err(Error::Unauthorized);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::Status {
        status: status.as_u16(),
        message: describe_failure(status, &body),
    })
}

/// Prefer the server's own message, then the raw body, then the status
/// reason phrase.
fn describe_failure(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<wire::ErrorBody>(body)
        .ok()
        .and_then(|body| body.message)
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_owned())
}

#[async_trait]
impl Api for Http {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        let url = self.endpoint("login")?;
        debug!("POST {} as {}", url, request.user);
        let response = self
            .client
            .post(url)
            .json(&wire::Login::from(request))
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let message = describe_failure(status, &String::from_utf8_lossy(&body));
            warn!("Login was rejected: {} {}", status, message);
            return Err(error::Auth::Rejected {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(error::Auth::EmptyResponse.into());
        }

        let reply: wire::LoginReply = serde_json::from_slice(&body)?;
        if !reply.ok {
            return Err(error::Auth::Rejected {
                status: status.as_u16(),
                message: reply
                    .message
                    .unwrap_or_else(|| "the credentials were not accepted".to_owned()),
            }
            .into());
        }

        Ok(reply.into())
    }

    async fn list_coffees(&self, token: &SecretString) -> Result<Vec<Coffee>> {
        let entries: Vec<wire::CoffeeEntry> = self.get(token, "coffee").await?;
        Ok(entries.into_iter().map(Into::into).collect())
    }

    async fn coffee_detail(&self, token: &SecretString, id: i32) -> Result<CoffeeDetail> {
        let detail: wire::CoffeeById = self.get(token, &format!("coffee/{id}")).await?;
        Ok(detail.into())
    }

    async fn list_comments(&self, token: &SecretString, coffee_id: i32) -> Result<Vec<Comment>> {
        let comments: Vec<wire::CoffeeComment> =
            self.get(token, &format!("comments/{coffee_id}")).await?;
        Ok(comments.into_iter().map(Into::into).collect())
    }

    async fn post_comment(&self, token: &SecretString, comment: &Comment) -> Result<Comment> {
        let url = self.endpoint("comments")?;
        debug!("POST {} for coffee {}", url, comment.coffee_id);
        let response = self
            .client
            .post(url)
            .bearer_auth(token.expose_secret())
            .json(&wire::CoffeeComment::from(comment))
            .send()
            .await?;

        let body = check_status(response).await?.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            // Nothing echoed back; the submission stands for the created comment.
            return Ok(comment.clone());
        }
        Ok(serde_json::from_slice::<wire::CoffeeComment>(&body)?.into())
    }
}
