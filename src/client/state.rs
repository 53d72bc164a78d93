// SPDX-License-Identifier: MIT

//! Persistent script state and flow user state

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::Windmill;
use crate::error::Result;
use crate::http::ensure_success;

/// Resource type the platform uses for script state
pub const STATE_RESOURCE_TYPE: &str = "state";

impl Windmill {
    /// Resource path of the running script's state
    pub fn state_path(&self) -> Result<&str> {
        self.config.state_path()
    }

    /// Current state, `None` before the first `set_state`
    pub async fn get_state_any(&self) -> Result<Option<Value>> {
        let path = self.state_path()?.to_string();
        self.get_resource_opt(&path).await
    }

    /// Current state deserialized into `T`
    pub async fn get_state<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match self.get_state_any().await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Replace the state; `None` clears it
    pub async fn set_state(&self, value: Option<Value>) -> Result<()> {
        let path = self.state_path()?.to_string();
        self.set_resource(&path, value, STATE_RESOURCE_TYPE).await
    }

    /// Read `key` from the user state of the enclosing flow
    ///
    /// Returns `None` when the key is unset or the current job is not part of a flow.
    pub async fn get_flow_user_state(&self, key: &str) -> Result<Option<Value>> {
        let flow_id = self.get_root_job_id(None).await?;
        let resp = self
            .api
            .get_unchecked(
                &self
                    .ws("jobs/flow/user_states")
                    .segment(&flow_id)
                    .segment(key),
                &[],
            )
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            log::warn!("Job {} does not exist or is not a flow", flow_id);
            return Ok(None);
        }

        let value: Value = ensure_success(resp).await?.json().await?;
        Ok(match value {
            Value::Null => None,
            other => Some(other),
        })
    }

    /// Write `key` into the user state of the enclosing flow
    pub async fn set_flow_user_state(&self, key: &str, value: &Value) -> Result<()> {
        let flow_id = self.get_root_job_id(None).await?;
        let resp = self
            .api
            .post_unchecked(
                &self
                    .ws("jobs/flow/user_states")
                    .segment(&flow_id)
                    .segment(key),
                value,
                &[],
            )
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            log::warn!("Job {} does not exist or is not a flow", flow_id);
            return Ok(());
        }
        ensure_success(resp).await?;
        Ok(())
    }
}
