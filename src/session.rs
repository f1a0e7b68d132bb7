// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use futures_util::lock::Mutex;
use log::{debug, info};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::{
    error::{self, Result},
    storage::Storage,
};

/// The persisted form of a session. A half-populated session cannot be
/// written: absence is "nothing stored".
#[derive(Serialize, Deserialize, Clone)]
pub(crate) struct Data {
    #[serde(serialize_with = "serialize_secret")]
    token: SecretString,
    username: String,
}

impl Data {
    pub(crate) fn new(token: SecretString, username: String) -> Self {
        Self { token, username }
    }

    /// Reassembles a session that a keyring stored as a secret token and a
    /// plain user name.
    #[cfg_attr(
        not(any(test, feature = "keychain", feature = "secret-service")),
        allow(dead_code)
    )]
    pub(crate) fn from_parts(token: Vec<u8>, username: Vec<u8>) -> Result<Self> {
        let token = String::from_utf8(token).map_err(error::Storage::from)?;
        let username = String::from_utf8(username).map_err(error::Storage::from)?;
        if token.is_empty() {
            return Err(error::Storage::EmptyToken.into());
        }
        Ok(Self::new(SecretString::new(token), username))
    }

    #[cfg_attr(
        not(any(test, feature = "keychain", feature = "secret-service")),
        allow(dead_code)
    )]
    pub(crate) const fn token(&self) -> &SecretString {
        &self.token
    }

    pub(crate) fn username(&self) -> &str {
        &self.username
    }
}

fn serialize_secret<S: Serializer>(
    value: &SecretString,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.expose_secret())
}

/// The observable `(token, username)` pair.
#[derive(Clone, Debug, Default)]
pub(crate) struct Session {
    token: Option<SecretString>,
    username: Option<String>,
}

impl Session {
    pub(crate) const fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    pub(crate) fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub(crate) const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

impl From<Option<Data>> for Session {
    fn from(value: Option<Data>) -> Self {
        value.map_or_else(Self::default, |data| Self {
            token: Some(data.token),
            username: Some(data.username),
        })
    }
}

/// The single source of truth for the current session. Writes go to the
/// storage backend first and are published to observers afterwards.
pub(crate) struct Store {
    storage: Mutex<Box<dyn Storage<Data>>>,
    tx: watch::Sender<Session>,
}

impl Store {
    pub(crate) async fn load(mut storage: Box<dyn Storage<Data>>) -> Result<Self> {
        let session = Session::from(storage.get().await?);
        if let Some(username) = session.username() {
            debug!("Restored session for {}", username);
        }

        let (tx, _) = watch::channel(session);
        Ok(Self {
            storage: Mutex::new(storage),
            tx,
        })
    }

    /// A receiver whose current value is the latest session.
    pub(crate) fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    /// A stream that yields the latest session immediately, then every
    /// subsequent change.
    pub(crate) fn observe(&self) -> WatchStream<Session> {
        WatchStream::new(self.subscribe())
    }

    pub(crate) fn current(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub(crate) async fn save(&self, token: SecretString, username: &str) -> Result<()> {
        let data = Data::new(token, username.to_owned());
        let mut storage = self.storage.lock().await;
        storage.update(&data).await?;
        _ = self.tx.send_replace(Some(data).into());
        info!("Saved session for {}", username);
        Ok(())
    }

    pub(crate) async fn clear(&self) -> Result<()> {
        let mut storage = self.storage.lock().await;
        storage.clear().await?;
        _ = self.tx.send_replace(Session::default());
        info!("Cleared session");
        Ok(())
    }
}
