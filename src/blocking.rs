// SPDX-License-Identifier: MIT

//! Synchronous facade over [`crate::client::Windmill`]
//!
//! Owns a current-thread tokio runtime and blocks on each call. Must not be
//! used from inside another async runtime.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::runtime::{Builder, Runtime};
use uuid::Uuid;

use crate::client::{self, JobStatus, ResumeUrls, ScriptRef, WaitOptions};
use crate::config::ClientConfig;
use crate::error::Result;

pub struct Windmill {
    inner: client::Windmill,
    runtime: Runtime,
}

impl Windmill {
    pub fn from_env() -> Result<Self> {
        Self::with_config(ClientConfig::from_env()?)
    }

    pub fn new(
        token: Option<String>,
        workspace: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self> {
        Self::with_config(ClientConfig::new(token, workspace, base_url)?)
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            inner: client::Windmill::with_config(config)?,
            runtime,
        })
    }

    /// The async client this facade drives
    pub fn inner(&self) -> &client::Windmill {
        &self.inner
    }

    /// Block on any future, e.g. a call through [`client::Windmill::api`]
    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    pub fn get_variable(&self, path: &str) -> Result<Value> {
        self.block_on(self.inner.get_variable(path))
    }

    pub fn get_variable_raw(&self, path: &str) -> Result<String> {
        self.block_on(self.inner.get_variable_raw(path))
    }

    pub fn get_variable_with(&self, path: &str, decrypt_secret: bool) -> Result<String> {
        self.block_on(self.inner.get_variable_with(path, decrypt_secret))
    }

    pub fn set_variable(&self, path: &str, value: &str, is_secret: bool) -> Result<()> {
        self.block_on(self.inner.set_variable(path, value, is_secret))
    }

    pub fn get_resource<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.block_on(self.inner.get_resource(path))
    }

    pub fn get_resource_any(&self, path: &str) -> Result<Value> {
        self.block_on(self.inner.get_resource_any(path))
    }

    pub fn get_resource_raw(&self, path: &str) -> Result<Value> {
        self.block_on(self.inner.get_resource_raw(path))
    }

    pub fn get_resource_opt(&self, path: &str) -> Result<Option<Value>> {
        self.block_on(self.inner.get_resource_opt(path))
    }

    pub fn set_resource(
        &self,
        path: &str,
        value: Option<Value>,
        resource_type: &str,
    ) -> Result<()> {
        self.block_on(self.inner.set_resource(path, value, resource_type))
    }

    pub fn get_state<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.block_on(self.inner.get_state())
    }

    pub fn get_state_any(&self) -> Result<Option<Value>> {
        self.block_on(self.inner.get_state_any())
    }

    pub fn set_state(&self, value: Option<Value>) -> Result<()> {
        self.block_on(self.inner.set_state(value))
    }

    pub fn get_flow_user_state(&self, key: &str) -> Result<Option<Value>> {
        self.block_on(self.inner.get_flow_user_state(key))
    }

    pub fn set_flow_user_state(&self, key: &str, value: &Value) -> Result<()> {
        self.block_on(self.inner.set_flow_user_state(key, value))
    }

    pub fn run_script_async(
        &self,
        script: &ScriptRef,
        args: Value,
        scheduled_in_secs: Option<u32>,
    ) -> Result<Uuid> {
        self.block_on(self.inner.run_script_async(script, args, scheduled_in_secs))
    }

    pub fn run_flow_async(
        &self,
        path: &str,
        args: Value,
        scheduled_in_secs: Option<u32>,
    ) -> Result<Uuid> {
        self.block_on(self.inner.run_flow_async(path, args, scheduled_in_secs))
    }

    pub fn run_script(&self, script: &ScriptRef, args: Value, opts: &WaitOptions) -> Result<Value> {
        self.block_on(self.inner.run_script(script, args, opts))
    }

    pub fn wait_job(&self, job_id: &str, opts: &WaitOptions) -> Result<Value> {
        self.block_on(self.inner.wait_job(job_id, opts))
    }

    pub fn get_job(&self, job_id: &str) -> Result<Value> {
        self.block_on(self.inner.get_job(job_id))
    }

    pub fn get_job_status(&self, job_id: &str) -> Result<JobStatus> {
        self.block_on(self.inner.get_job_status(job_id))
    }

    pub fn get_result(&self, job_id: &str) -> Result<Value> {
        self.block_on(self.inner.get_result(job_id))
    }

    pub fn cancel_job(&self, job_id: &str, reason: &str) -> Result<()> {
        self.block_on(self.inner.cancel_job(job_id, reason))
    }

    pub fn cancel_running(&self) -> Result<Vec<String>> {
        self.block_on(self.inner.cancel_running())
    }

    pub fn get_root_job_id(&self, job_id: Option<&str>) -> Result<String> {
        self.block_on(self.inner.get_root_job_id(job_id))
    }

    pub fn set_progress(&self, percent: u32, job_id: Option<&str>) -> Result<()> {
        self.block_on(self.inner.set_progress(percent, job_id))
    }

    pub fn get_progress(&self, job_id: Option<&str>) -> Result<Option<u32>> {
        self.block_on(self.inner.get_progress(job_id))
    }

    pub fn get_id_token(&self, audience: &str) -> Result<String> {
        self.block_on(self.inner.get_id_token(audience))
    }

    pub fn get_resume_urls(&self, approver: Option<&str>) -> Result<ResumeUrls> {
        self.block_on(self.inner.get_resume_urls(approver))
    }

    pub fn create_token(&self, duration: chrono::Duration) -> Result<String> {
        self.block_on(self.inner.create_token(duration))
    }

    pub fn whoami(&self) -> Result<Value> {
        self.block_on(self.inner.whoami())
    }

    pub fn version(&self) -> Result<String> {
        self.block_on(self.inner.version())
    }
}
