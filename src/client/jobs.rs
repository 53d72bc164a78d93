// SPDX-License-Identifier: MIT

//! Starting scripts and flows and collecting their results

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::Windmill;
use crate::error::{Result, WmillError};
use crate::http::Endpoint;

/// How a script is addressed when starting it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptRef {
    Path(String),
    Hash(String),
}

impl ScriptRef {
    fn run_endpoint(&self, jobs_run: Endpoint) -> Endpoint {
        match self {
            ScriptRef::Path(path) => jobs_run.then("p").path(path),
            ScriptRef::Hash(hash) => jobs_run.then("h").segment(hash),
        }
    }
}

/// Polling behavior for [`Windmill::wait_job`]
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Cancel the job and fail once this much time has passed
    pub timeout: Option<Duration>,
    pub poll_interval: Duration,
    /// Fail when a successful job returns no result
    pub assert_result_is_not_none: bool,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            poll_interval: Duration::from_millis(500),
            assert_result_is_not_none: false,
        }
    }
}

impl WaitOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn require_result(mut self) -> Self {
        self.assert_result_is_not_none = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Waiting,
    Running,
    Completed,
}

#[derive(Debug, Deserialize)]
struct ResultMaybe {
    completed: bool,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    started: Option<bool>,
}

#[derive(Debug, Serialize)]
struct CancelRequest<'a> {
    reason: &'a str,
}

#[derive(Debug, Serialize)]
struct ProgressUpdate<'a> {
    percent: u32,
    flow_job_id: Option<&'a str>,
}

/// Links an approval step hands out to resume or cancel the suspended flow
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResumeUrls {
    #[serde(rename = "approvalPage")]
    pub approval_page: String,
    pub cancel: String,
    pub resume: String,
}

impl Windmill {
    /// Queue a script and return its job id without waiting
    ///
    /// `args` must be a JSON object. When called from inside a job, the
    /// current job is recorded as parent and the root flow is propagated.
    pub async fn run_script_async(
        &self,
        script: &ScriptRef,
        args: Value,
        scheduled_in_secs: Option<u32>,
    ) -> Result<Uuid> {
        let endpoint = script.run_endpoint(self.ws("jobs/run"));
        self.run_async(endpoint, args, scheduled_in_secs).await
    }

    /// Queue a flow by path and return its job id without waiting
    pub async fn run_flow_async(
        &self,
        path: &str,
        args: Value,
        scheduled_in_secs: Option<u32>,
    ) -> Result<Uuid> {
        let endpoint = self.ws("jobs/run/f").path(path);
        self.run_async(endpoint, args, scheduled_in_secs).await
    }

    async fn run_async(
        &self,
        endpoint: Endpoint,
        args: Value,
        scheduled_in_secs: Option<u32>,
    ) -> Result<Uuid> {
        let args = match args {
            Value::Null => json!({}),
            Value::Object(_) => args,
            other => {
                return Err(WmillError::bad_value(format!(
                    "Args should be Object, but it is: {}",
                    other
                )))
            }
        };

        let query = self.run_query(scheduled_in_secs);
        let text = self
            .api
            .post(&endpoint, &args, &query)
            .await?
            .text()
            .await?;

        let job_id = Uuid::parse_str(text.trim().trim_matches('"'))?;
        log::info!("queued job {} via {}", job_id, endpoint);
        Ok(job_id)
    }

    fn run_query(&self, scheduled_in_secs: Option<u32>) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(secs) = scheduled_in_secs {
            query.push(("scheduled_in_secs", secs.to_string()));
        }
        if let Some(parent) = &self.config.job.job_id {
            query.push(("parent_job", parent.clone()));
        }
        if let Some(root) = &self.config.job.root_flow_job_id {
            query.push(("root_job", root.clone()));
        }
        query
    }

    /// Run a script and wait for its result
    pub async fn run_script(
        &self,
        script: &ScriptRef,
        args: Value,
        opts: &WaitOptions,
    ) -> Result<Value> {
        let job_id = self.run_script_async(script, args, None).await?;
        self.wait_job(&job_id.to_string(), opts).await
    }

    /// Poll until the job completes, fails or times out
    pub async fn wait_job(&self, job_id: &str, opts: &WaitOptions) -> Result<Value> {
        let start = Instant::now();
        let endpoint = self
            .ws("jobs_u/completed/get_result_maybe")
            .segment(job_id);

        loop {
            let state: ResultMaybe = self
                .api
                .get(&endpoint, &[("get_started", "true".to_string())])
                .await?
                .json()
                .await?;

            if state.started == Some(false) {
                log::debug!("job {} has not started yet", job_id);
            }

            if state.completed {
                return completed_result(job_id, state, opts.assert_result_is_not_none);
            }

            if let Some(timeout) = opts.timeout {
                if start.elapsed() > timeout {
                    log::warn!("reached timeout for {}, cancelling the job", job_id);
                    if let Err(e) = self.cancel_job(job_id, "reached timeout").await {
                        log::warn!("failed to cancel job {}: {}", job_id, e);
                    }
                    return Err(WmillError::Timeout {
                        job_id: job_id.to_string(),
                        timeout,
                    });
                }
            }

            log::debug!("sleeping {:?} for {}", opts.poll_interval, job_id);
            tokio::time::sleep(opts.poll_interval).await;
        }
    }

    /// Job record as returned by the platform, without logs
    pub async fn get_job(&self, job_id: &str) -> Result<Value> {
        Ok(self
            .api
            .get(
                &self.ws("jobs_u/get").segment(job_id),
                &[("no_logs", "true".to_string())],
            )
            .await?
            .json()
            .await?)
    }

    /// Whether a job is queued, running or done
    pub async fn get_job_status(&self, job_id: &str) -> Result<JobStatus> {
        job_status(&self.get_job(job_id).await?)
    }

    /// Result of a job that already completed
    pub async fn get_result(&self, job_id: &str) -> Result<Value> {
        let text = self
            .api
            .get(
                &self.ws("jobs_u/completed/get_result").segment(job_id),
                &[],
            )
            .await?
            .text()
            .await?;
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    pub async fn cancel_job(&self, job_id: &str, reason: &str) -> Result<()> {
        self.api
            .post(
                &self.ws("jobs_u/queue/cancel").segment(job_id),
                &CancelRequest { reason },
                &[],
            )
            .await?;
        Ok(())
    }

    /// Cancel other running executions of the current script
    ///
    /// Uses `WM_JOB_PATH` to find them and never cancels `WM_JOB_ID` itself.
    /// Returns the ids that were cancelled.
    pub async fn cancel_running(&self) -> Result<Vec<String>> {
        let script_path = self
            .config
            .job
            .job_path
            .clone()
            .ok_or_else(|| WmillError::config("WM_JOB_PATH is not set"))?;

        let jobs: Vec<Value> = self
            .api
            .get(
                &self.ws("jobs/list"),
                &[
                    ("running", "true".to_string()),
                    ("script_path_exact", script_path),
                ],
            )
            .await?
            .json()
            .await?;

        let current = self.config.job.job_id.as_deref();
        let ids: Vec<String> = jobs
            .iter()
            .filter_map(|j| j.get("id").and_then(Value::as_str))
            .filter(|id| Some(*id) != current)
            .map(str::to_string)
            .collect();

        if ids.is_empty() {
            log::info!("no previous executions to cancel");
        }
        for id in &ids {
            log::info!("cancelling job {}", id);
            self.cancel_job(id, "killed by `cancel_running` method")
                .await?;
        }
        Ok(ids)
    }

    /// Root flow job of `job_id`, or of the current job when `None`
    pub async fn get_root_job_id(&self, job_id: Option<&str>) -> Result<String> {
        let job_id = self.current_job_id(job_id)?;
        let value: Value = self
            .api
            .get(&self.ws("jobs_u/get_root_job_id").segment(&job_id), &[])
            .await?
            .json()
            .await?;

        match value {
            Value::String(s) => Ok(s),
            other => Err(WmillError::bad_value(format!(
                "unexpected root job id: {}",
                other
            ))),
        }
    }

    /// Report progress (0-100) of `job_id`, or of the current job when `None`
    ///
    /// When the job is a flow step, the enclosing flow is updated as well.
    pub async fn set_progress(&self, percent: u32, job_id: Option<&str>) -> Result<()> {
        let job_id = self.current_job_id(job_id)?;
        let job = self.get_job(&job_id).await?;
        let body = ProgressUpdate {
            percent,
            flow_job_id: job.get("parent_job").and_then(Value::as_str),
        };

        self.api
            .post(
                &self.ws("job_metrics/set_progress").segment(&job_id),
                &body,
                &[],
            )
            .await?;
        log::debug!("progress of {} set to {}%", job_id, percent);
        Ok(())
    }

    /// Last reported progress, `None` when the job never reported any
    pub async fn get_progress(&self, job_id: Option<&str>) -> Result<Option<u32>> {
        let job_id = self.current_job_id(job_id)?;
        let value: Value = self
            .api
            .get(&self.ws("job_metrics/get_progress").segment(&job_id), &[])
            .await?
            .json()
            .await?;

        match value {
            Value::Null => Ok(None),
            other => other
                .as_u64()
                .and_then(|p| u32::try_from(p).ok())
                .map(Some)
                .ok_or_else(|| WmillError::bad_value(format!("unexpected progress: {}", other))),
        }
    }

    /// OIDC id token for `audience`, signed by the platform
    pub async fn get_id_token(&self, audience: &str) -> Result<String> {
        Ok(self
            .api
            .post_empty(&self.ws("oidc/token").segment(audience), &[])
            .await?
            .text()
            .await?)
    }

    /// Fresh resume, cancel and approval page links for the current job
    ///
    /// Outside a job the platform is asked for links of `NO_ID`.
    pub async fn get_resume_urls(&self, approver: Option<&str>) -> Result<ResumeUrls> {
        let job_id = self.config.job.job_id.as_deref().unwrap_or("NO_ID");
        let nonce = Uuid::new_v4().as_u128() % 1_000_000_000;
        let mut query = Vec::new();
        if let Some(approver) = approver {
            query.push(("approver", approver.to_string()));
        }

        Ok(self
            .api
            .get(
                &self
                    .ws("jobs/resume_urls")
                    .segment(job_id)
                    .segment(&nonce.to_string()),
                &query,
            )
            .await?
            .json()
            .await?)
    }

    fn current_job_id(&self, job_id: Option<&str>) -> Result<String> {
        match job_id {
            Some(id) => Ok(id.to_string()),
            None => self
                .config
                .job
                .job_id
                .clone()
                .ok_or_else(|| WmillError::config("WM_JOB_ID is not set")),
        }
    }
}

fn completed_result(job_id: &str, state: ResultMaybe, assert_not_none: bool) -> Result<Value> {
    if state.success == Some(true) {
        return match state.result {
            Some(Value::Null) | None if assert_not_none => {
                Err(WmillError::Execution("Result was None".to_string()))
            }
            result => Ok(result.unwrap_or(Value::Null)),
        };
    }

    let error = match &state.result {
        Some(result) => result.get("error").unwrap_or(result).to_string(),
        None => "no result".to_string(),
    };
    Err(WmillError::Execution(format!(
        "Job {} was not successful: {}",
        job_id, error
    )))
}

fn job_status(job: &Value) -> Result<JobStatus> {
    let job_type = job
        .get("type")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| WmillError::bad_value(format!("{} is not a valid job", job)))?;

    if job_type.eq_ignore_ascii_case("completedjob") {
        return Ok(JobStatus::Completed);
    }

    match job.get("running").and_then(Value::as_bool) {
        Some(true) => Ok(JobStatus::Running),
        Some(false) => Ok(JobStatus::Waiting),
        None => Err(WmillError::bad_value(format!(
            "job {} has no running flag",
            job.get("id").unwrap_or(&Value::Null)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn maybe(completed: bool, success: Option<bool>, result: Option<Value>) -> ResultMaybe {
        ResultMaybe {
            completed,
            success,
            result,
            started: Some(true),
        }
    }

    #[test]
    fn test_run_endpoint() {
        let base = || Endpoint::route("jobs/run");
        assert_eq!(
            ScriptRef::Path("u/admin/hello".into())
                .run_endpoint(base())
                .segments(),
            ["jobs", "run", "p", "u", "admin", "hello"]
        );
        assert_eq!(
            ScriptRef::Hash("abc123".into()).run_endpoint(base()).segments(),
            ["jobs", "run", "h", "abc123"]
        );
    }

    #[test]
    fn test_progress_body() {
        let body = ProgressUpdate {
            percent: 40,
            flow_job_id: None,
        };
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({"percent": 40, "flow_job_id": null})
        );
    }

    #[test]
    fn test_resume_urls_field_names() {
        let urls: ResumeUrls = serde_json::from_value(json!({
            "approvalPage": "https://wm/approve",
            "cancel": "https://wm/cancel",
            "resume": "https://wm/resume"
        }))
        .unwrap();
        assert_eq!(urls.approval_page, "https://wm/approve");
        assert_eq!(urls.resume, "https://wm/resume");
    }

    #[test]
    fn test_completed_success_returns_result() {
        let value = completed_result("j", maybe(true, Some(true), Some(json!(3))), true).unwrap();
        assert_eq!(value, json!(3));
    }

    #[test]
    fn test_completed_none_result() {
        assert_eq!(
            completed_result("j", maybe(true, Some(true), None), false).unwrap(),
            Value::Null
        );
        assert!(matches!(
            completed_result("j", maybe(true, Some(true), Some(Value::Null)), true),
            Err(WmillError::Execution(_))
        ));
    }

    #[test]
    fn test_completed_failure_uses_error_field() {
        let err = completed_result(
            "j1",
            maybe(true, Some(false), Some(json!({"error": {"message": "boom"}}))),
            false,
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Job j1 was not successful"));
        assert!(msg.contains("boom"));
    }

    #[test]
    fn test_job_status() {
        assert_eq!(
            job_status(&json!({"type": "CompletedJob"})).unwrap(),
            JobStatus::Completed
        );
        assert_eq!(
            job_status(&json!({"type": "QueuedJob", "running": true})).unwrap(),
            JobStatus::Running
        );
        assert_eq!(
            job_status(&json!({"type": "QueuedJob", "running": false})).unwrap(),
            JobStatus::Waiting
        );
        assert!(job_status(&json!({"type": "QueuedJob"})).is_err());
        assert!(job_status(&json!({})).is_err());
    }

    #[test]
    fn test_wait_options_builder() {
        let opts = WaitOptions::default()
            .with_timeout(Duration::from_secs(5))
            .require_result();
        assert_eq!(opts.timeout, Some(Duration::from_secs(5)));
        assert!(opts.assert_result_is_not_none);
        assert_eq!(opts.poll_interval, Duration::from_millis(500));
    }
}
