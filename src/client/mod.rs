// SPDX-License-Identifier: MIT

//! Async client for the platform API
//!
//! [`Windmill`] holds one configured HTTP client for a single workspace. The
//! operations are split by area:
//!
//! - [`variables`]: read and update-or-create string variables
//! - [`resources`]: read and update-or-create JSON resources
//! - [`state`]: script state and flow user state
//! - [`jobs`]: start scripts and flows, wait for results, report progress
//! - [`users`]: identity and server version

pub mod jobs;
pub mod resources;
pub mod state;
pub mod users;
pub mod variables;

pub use jobs::{JobStatus, ResumeUrls, ScriptRef, WaitOptions};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::{ApiClient, Endpoint};

/// Workspace-scoped client
#[derive(Debug, Clone)]
pub struct Windmill {
    config: ClientConfig,
    api: ApiClient,
}

impl Windmill {
    /// Build a client from `WM_TOKEN`, `WM_WORKSPACE` and `BASE_INTERNAL_URL`
    pub fn from_env() -> Result<Self> {
        Self::with_config(ClientConfig::from_env()?)
    }

    /// Build a client with optional overrides; `None` falls back to the environment
    pub fn new(
        token: Option<String>,
        workspace: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self> {
        Self::with_config(ClientConfig::new(token, workspace, base_url)?)
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let api = ApiClient::new(&config)?;
        log::debug!(
            "wmill client for workspace {} at {}",
            config.workspace,
            config.base_url
        );
        Ok(Self { config, api })
    }

    pub fn workspace(&self) -> &str {
        &self.config.workspace
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Raw transport, for endpoints this client does not wrap
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Fixed route under `/w/{workspace}/`
    fn ws(&self, route: &str) -> Endpoint {
        Endpoint::route("w")
            .segment(&self.config.workspace)
            .then(route)
    }
}
