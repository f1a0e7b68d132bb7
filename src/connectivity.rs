// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio::{net::TcpStream, time};
use url::Url;

use crate::error::{Error, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

#[async_trait]
pub(crate) trait Connectivity: Send + Sync {
    async fn is_online(&self) -> bool;

    /// Fails with [`Error::Offline`] instead of attempting a request that
    /// cannot succeed.
    async fn require_online(&self) -> Result<()> {
        if self.is_online().await {
            Ok(())
        } else {
            Err(Error::Offline)
        }
    }
}

/// Considers us online when a TCP connection to the API host can be opened.
pub(crate) struct TcpCheck {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpCheck {
    pub(crate) fn new(url: &Url) -> Option<Self> {
        Some(Self {
            host: url.host_str()?.to_owned(),
            port: url.port_or_known_default()?,
            timeout: CONNECT_TIMEOUT,
        })
    }
}

#[async_trait]
impl Connectivity for TcpCheck {
    async fn is_online(&self) -> bool {
        match time::timeout(
            self.timeout,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("Could not reach {}:{}: {}", self.host, self.port, e);
                false
            }
            Err(_) => {
                debug!("Timed out reaching {}:{}", self.host, self.port);
                false
            }
        }
    }
}

/// Used when the API URL has no host to connect to.
pub(crate) struct AssumeOnline;

#[async_trait]
impl Connectivity for AssumeOnline {
    async fn is_online(&self) -> bool {
        true
    }
}
