// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use log::debug;
use secrecy::ExposeSecret as _;
use security_framework::os::macos::keychain::{SecKeychain, SecPreferencesDomain};

use crate::{
    error::{self, Result},
    metadata,
    session::Data,
};

use super::{IsPersistent, Storage};

const ITEM_NOT_FOUND: i32 = -25300_i32;

const TOKEN_ACCOUNT: &str = "token";
const USER_ACCOUNT: &str = "user";

/// Two generic password items in the user's login keychain per API server:
/// one for the token and one for the user name it belongs to.
pub(crate) struct Keychain {
    delegate: SecKeychain,
    service: String,
}

fn service_name(url: &url::Url) -> String {
    format!("{} session ({url})", *metadata::CLIENT_DISPLAY_NAME)
}

impl Keychain {
    pub(crate) fn new(url: &url::Url) -> Result<Self> {
        Ok(Self {
            delegate: SecKeychain::default_for_domain(SecPreferencesDomain::User)
                .map_err(error::Storage::from)?,
            service: service_name(url),
        })
    }

    fn find(&self, account: &str) -> Result<Option<Vec<u8>>> {
        match self.delegate.find_generic_password(&self.service, account) {
            Ok((password, _)) => Ok(Some(password.to_vec())),
            Err(err) if err.code() == ITEM_NOT_FOUND => Ok(None),
            Err(err) => Err(error::Storage::from(err).into()),
        }
    }

    fn remove(&self, account: &str) -> Result<()> {
        match self.delegate.find_generic_password(&self.service, account) {
            Ok((_, item)) => item.delete(),
            Err(err) if err.code() == ITEM_NOT_FOUND => {}
            Err(err) => return Err(error::Storage::from(err).into()),
        };
        Ok(())
    }
}

impl IsPersistent for Keychain {
    fn is_persistent(&self) -> bool {
        true
    }
}

#[async_trait]
impl Storage<Data> for Keychain {
    async fn get(&mut self) -> Result<Option<Data>> {
        // A token without its user name is a half-written session.
        match (self.find(TOKEN_ACCOUNT)?, self.find(USER_ACCOUNT)?) {
            (Some(token), Some(username)) => Ok(Some(Data::from_parts(token, username)?)),
            _ => Ok(None),
        }
    }

    async fn update(&mut self, data: &Data) -> Result<()> {
        self.delegate
            .set_generic_password(&self.service, USER_ACCOUNT, data.username().as_bytes())
            .map_err(error::Storage::from)?;
        self.delegate
            .set_generic_password(
                &self.service,
                TOKEN_ACCOUNT,
                data.token().expose_secret().as_bytes(),
            )
            .map_err(error::Storage::from)?;
        debug!("Stored the session for {} in Keychain", data.username());
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        self.remove(TOKEN_ACCOUNT)?;
        self.remove(USER_ACCOUNT)
    }
}
