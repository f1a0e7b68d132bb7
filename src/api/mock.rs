// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

//! An in-memory stand-in for the coffee catalog server.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::lock::Mutex;
use secrecy::{ExposeSecret as _, SecretString};
use tokio::sync::Semaphore;

use crate::error::{self, Error, Result};

use super::{Api, Coffee, CoffeeDetail, Comment, LoginRequest, LoginResponse};

pub(crate) const USER: &str = "ogalaktionov";
pub(crate) const PASSWORD: &str = "10755610";
pub(crate) const TOKEN: &str = "T";

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Call {
    Login(String),
    ListCoffees,
    CoffeeDetail(i32),
    ListComments(i32),
    PostComment(i32),
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum Failure {
    Unauthorized,
    Status(u16),
}

impl From<Failure> for Error {
    fn from(value: Failure) -> Self {
        match value {
            Failure::Unauthorized => Self::Unauthorized,
            Failure::Status(status) => Self::Status {
                status,
                message: "mock failure".to_owned(),
            },
        }
    }
}

pub(crate) struct Mock {
    coffees: Vec<Coffee>,
    details: Vec<CoffeeDetail>,
    comments: Mutex<Vec<Comment>>,
    failure: Mutex<Option<Failure>>,
    calls: Mutex<Vec<Call>>,
    gate: Option<Arc<Semaphore>>,
}

impl Mock {
    pub(crate) fn new() -> Self {
        Self {
            coffees: vec![
                Coffee {
                    id: 1,
                    name: "Espresso".to_owned(),
                    comment_count: "3".to_owned(),
                },
                Coffee {
                    id: 2,
                    name: "Cortado".to_owned(),
                    comment_count: "0".to_owned(),
                },
            ],
            details: vec![CoffeeDetail {
                id: 1,
                name: "Espresso".to_owned(),
                description_html: "<p>A <b>short</b>, intense coffee.<br>Served in a demitasse.</p>"
                    .to_owned(),
            }],
            comments: Mutex::new(vec![
                Comment {
                    id: 1,
                    coffee_id: 1,
                    user: "ana".to_owned(),
                    text: "Perfect after lunch".to_owned(),
                },
                Comment {
                    id: 2,
                    coffee_id: 5,
                    user: "luis".to_owned(),
                    text: "Too bitter".to_owned(),
                },
            ]),
            failure: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Holds every `list_comments` call until a permit is added to the
    /// returned semaphore.
    pub(crate) fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    /// Makes every call fail until cleared with `None`.
    pub(crate) async fn fail_with(&self, failure: Option<Failure>) {
        *self.failure.lock().await = failure;
    }

    pub(crate) async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    pub(crate) async fn count(&self, call: &Call) -> usize {
        self.calls.lock().await.iter().filter(|c| *c == call).count()
    }

    async fn authenticate(&self, call: Call, token: &SecretString) -> Result<()> {
        self.calls.lock().await.push(call);
        if let Some(failure) = *self.failure.lock().await {
            return Err(failure.into());
        }
        if token.expose_secret() != TOKEN {
            return Err(Error::Unauthorized);
        }
        Ok(())
    }
}

#[async_trait]
impl Api for Mock {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        self.calls.lock().await.push(Call::Login(request.user.clone()));
        if let Some(failure) = *self.failure.lock().await {
            return Err(failure.into());
        }
        if request.user == USER && request.password.expose_secret() == PASSWORD {
            Ok(LoginResponse {
                ok: true,
                token: Some(SecretString::new(TOKEN.to_owned())),
                message: None,
                username: request.user.clone(),
            })
        } else {
            Err(error::Auth::Rejected {
                status: 401,
                message: "Usuario o contraseña incorrectos".to_owned(),
            }
            .into())
        }
    }

    async fn list_coffees(&self, token: &SecretString) -> Result<Vec<Coffee>> {
        self.authenticate(Call::ListCoffees, token).await?;
        Ok(self.coffees.clone())
    }

    async fn coffee_detail(&self, token: &SecretString, id: i32) -> Result<CoffeeDetail> {
        self.authenticate(Call::CoffeeDetail(id), token).await?;
        self.details
            .iter()
            .find(|detail| detail.id == id)
            .cloned()
            .ok_or(Failure::Status(404).into())
    }

    async fn list_comments(&self, token: &SecretString, coffee_id: i32) -> Result<Vec<Comment>> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.map_err(|_| Error::Cancelled)?.forget();
        }
        self.authenticate(Call::ListComments(coffee_id), token).await?;
        Ok(self
            .comments
            .lock()
            .await
            .iter()
            .filter(|comment| comment.coffee_id == coffee_id)
            .cloned()
            .collect())
    }

    async fn post_comment(&self, token: &SecretString, comment: &Comment) -> Result<Comment> {
        self.authenticate(Call::PostComment(comment.coffee_id), token).await?;
        let mut comments = self.comments.lock().await;
        let created = Comment {
            id: comments.iter().map(|c| c.id).max().unwrap_or(0) + 1,
            ..comment.clone()
        };
        comments.push(created.clone());
        Ok(created)
    }
}
