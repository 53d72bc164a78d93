// SPDX-License-Identifier: MIT

use chrono::{Duration, Utc};
use serde::Serialize;
use serde_json::Value;

use super::Windmill;
use crate::error::Result;
use crate::http::Endpoint;

#[derive(Debug, Serialize)]
struct NewToken {
    label: String,
    expiration: String,
}

impl NewToken {
    fn expiring_in(duration: Duration) -> Self {
        let now = Utc::now();
        Self {
            label: format!("refresh {}", now.timestamp()),
            expiration: (now + duration).format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        }
    }
}

impl Windmill {
    /// Identity behind the configured token
    pub async fn whoami(&self) -> Result<Value> {
        Ok(self.api.get(&Endpoint::route("users/whoami"), &[]).await?.json().await?)
    }

    /// Server version string
    pub async fn version(&self) -> Result<String> {
        Ok(self.api.get(&Endpoint::route("version"), &[]).await?.text().await?)
    }

    /// Mint a new token for the same user, valid for `duration`
    pub async fn create_token(&self, duration: Duration) -> Result<String> {
        let body = NewToken::expiring_in(duration);
        Ok(self
            .api
            .post(&Endpoint::route("users/tokens/create"), &body, &[])
            .await?
            .text()
            .await?)
    }
}
