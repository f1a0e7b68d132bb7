// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use async_trait::async_trait;
use log::{debug, warn};
use secrecy::ExposeSecret as _;

use crate::{
    error::{self, Result},
    metadata,
    session::Data,
};

use super::{IsPersistent, Storage};

/// One Secret Service item per API server. The token is the secret; the user
/// name travels as an attribute so it shows up in keyring managers.
pub(crate) struct SecretService {
    keyring: oo7::Keyring,
    url: String,
}

fn attribute(name: &str) -> String {
    format!("{}.{name}", *metadata::CLIENT_TYPE_ID)
}

/// The attributes that identify the session item of a server.
fn lookup_attributes(url: &str) -> HashMap<String, String> {
    HashMap::from([
        (attribute("kind"), "session".to_owned()),
        (attribute("url"), url.to_owned()),
    ])
}

fn item_attributes(url: &str, username: &str) -> HashMap<String, String> {
    let mut attributes = lookup_attributes(url);
    _ = attributes.insert(attribute("user"), username.to_owned());
    attributes
}

fn label(username: &str) -> String {
    format!("{} session for {username}", *metadata::CLIENT_DISPLAY_NAME)
}

fn borrowed(attributes: &HashMap<String, String>) -> HashMap<&str, &str> {
    attributes
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect()
}

impl SecretService {
    pub(crate) async fn new(url: &url::Url) -> Result<Self> {
        Ok(Self {
            keyring: oo7::Keyring::new().await.map_err(error::Storage::from)?,
            url: url.as_str().to_owned(),
        })
    }

    async fn items(&self) -> Result<Vec<oo7::Item>> {
        let attributes = lookup_attributes(&self.url);
        Ok(self
            .keyring
            .search_items(borrowed(&attributes))
            .await
            .map_err(error::Storage::from)?)
    }
}

impl IsPersistent for SecretService {
    fn is_persistent(&self) -> bool {
        true
    }
}

#[async_trait]
impl Storage<Data> for SecretService {
    async fn get(&mut self) -> Result<Option<Data>> {
        let Some(item) = self.items().await?.into_iter().next() else {
            return Ok(None);
        };

        let attributes = item.attributes().await.map_err(error::Storage::from)?;
        let Some(username) = attributes.get(&attribute("user")).cloned() else {
            warn!("Ignoring a stored session for {} with no user name", self.url);
            return Ok(None);
        };
        let secret = item.secret().await.map_err(error::Storage::from)?;
        Ok(Some(Data::from_parts(secret.to_vec(), username.into_bytes())?))
    }

    async fn update(&mut self, data: &Data) -> Result<()> {
        // Items for another user would survive a replace, since the user is
        // part of the attributes.
        self.clear().await?;

        let attributes = item_attributes(&self.url, data.username());
        self.keyring
            .create_item(
                &label(data.username()),
                borrowed(&attributes),
                data.token().expose_secret().as_bytes(),
                true,
            )
            .await
            .map_err(error::Storage::from)?;
        debug!("Stored the session for {} in the secret service", data.username());
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        for item in self.items().await? {
            item.delete().await.map_err(error::Storage::from)?;
        }
        Ok(())
    }
}
