// SPDX-License-Identifier: MIT

//! Environment-driven client configuration
//!
//! The platform injects everything a script needs into its environment:
//!
//! - `BASE_INTERNAL_URL`: platform base URL (`/api` is appended)
//! - `WM_TOKEN`: bearer token
//! - `WM_WORKSPACE`: workspace id
//! - `WM_STATE_PATH_NEW` / `WM_STATE_PATH`: resource path of the script state
//! - `WM_JOB_ID`, `WM_ROOT_FLOW_JOB_ID`, `WM_JOB_PATH`: current job context

use std::env;
use std::fmt;

use url::Url;

use crate::error::{Result, WmillError};

pub const BASE_URL_ENV: &str = "BASE_INTERNAL_URL";
pub const TOKEN_ENV: &str = "WM_TOKEN";
pub const WORKSPACE_ENV: &str = "WM_WORKSPACE";
pub const STATE_PATH_ENV: &str = "WM_STATE_PATH_NEW";
pub const LEGACY_STATE_PATH_ENV: &str = "WM_STATE_PATH";
pub const JOB_ID_ENV: &str = "WM_JOB_ID";
pub const ROOT_FLOW_JOB_ID_ENV: &str = "WM_ROOT_FLOW_JOB_ID";
pub const JOB_PATH_ENV: &str = "WM_JOB_PATH";

/// Connection settings for one workspace
#[derive(Clone)]
pub struct ClientConfig {
    /// API root, always ending in `/api`
    pub base_url: String,
    pub workspace: String,
    token: String,
    pub job: JobContext,
}

/// Job-scoped values the platform sets for a running script
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobContext {
    pub state_path: Option<String>,
    pub job_id: Option<String>,
    pub root_flow_job_id: Option<String>,
    pub job_path: Option<String>,
}

impl ClientConfig {
    /// Build a config purely from the process environment
    pub fn from_env() -> Result<Self> {
        Self::new(None, None, None)
    }

    /// Build a config, falling back to the environment for any `None` argument
    ///
    /// `base_url` is the platform URL without the `/api` suffix; a value that
    /// already ends in `/api` is accepted as is.
    pub fn new(
        token: Option<String>,
        workspace: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self> {
        Self::from_lookup(token, workspace, base_url, |key| env::var(key).ok())
    }

    /// Same as [`ClientConfig::new`] with an explicit variable source
    pub fn from_lookup<F>(
        token: Option<String>,
        workspace: Option<String>,
        base_url: Option<String>,
        lookup: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |value: Option<String>, key: &str| -> Result<String> {
            value
                .or_else(|| lookup(key))
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| {
                    WmillError::config(format!(
                        "{} is not set nor was provided in constructor",
                        key
                    ))
                })
        };

        let token = require(token, TOKEN_ENV)?;
        let workspace = require(workspace, WORKSPACE_ENV)?;
        let base_url = normalize_base_url(&require(base_url, BASE_URL_ENV)?)?;

        Ok(Self {
            base_url,
            workspace,
            token,
            job: JobContext::from_lookup(&lookup),
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Resource path holding the state of the running script
    pub fn state_path(&self) -> Result<&str> {
        self.job
            .state_path
            .as_deref()
            .ok_or_else(|| WmillError::config("State path not found"))
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("workspace", &self.workspace)
            .field("token", &"<redacted>")
            .field("job", &self.job)
            .finish()
    }
}

impl JobContext {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            state_path: lookup(STATE_PATH_ENV).or_else(|| lookup(LEGACY_STATE_PATH_ENV)),
            job_id: lookup(JOB_ID_ENV),
            root_flow_job_id: lookup(ROOT_FLOW_JOB_ID_ENV),
            job_path: lookup(JOB_PATH_ENV),
        }
    }
}

/// Trim trailing slashes and append `/api` exactly once
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let base = if trimmed.ends_with("/api") {
        trimmed.to_string()
    } else {
        format!("{}/api", trimmed)
    };

    let parsed = Url::parse(&base)
        .map_err(|e| WmillError::config(format!("Invalid {} '{}': {}", BASE_URL_ENV, raw, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(base),
        other => Err(WmillError::config(format!(
            "{} must use http or https; got '{}://'",
            BASE_URL_ENV, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_reads_all_from_lookup() {
        let cfg = ClientConfig::from_lookup(
            None,
            None,
            None,
            lookup_from(&[
                (BASE_URL_ENV, "http://localhost:8000"),
                (TOKEN_ENV, "secret"),
                (WORKSPACE_ENV, "demo"),
                (JOB_ID_ENV, "job-1"),
            ]),
        )
        .unwrap();

        assert_eq!(cfg.base_url, "http://localhost:8000/api");
        assert_eq!(cfg.workspace, "demo");
        assert_eq!(cfg.token(), "secret");
        assert_eq!(cfg.job.job_id.as_deref(), Some("job-1"));
    }

    #[test]
    fn test_arguments_override_env() {
        let cfg = ClientConfig::from_lookup(
            Some("tok".into()),
            Some("other".into()),
            Some("https://wm.example.com/".into()),
            lookup_from(&[
                (BASE_URL_ENV, "http://localhost:8000"),
                (TOKEN_ENV, "secret"),
                (WORKSPACE_ENV, "demo"),
            ]),
        )
        .unwrap();

        assert_eq!(cfg.base_url, "https://wm.example.com/api");
        assert_eq!(cfg.workspace, "other");
        assert_eq!(cfg.token(), "tok");
    }

    #[test]
    fn test_missing_variable_is_named() {
        let err = ClientConfig::from_lookup(
            None,
            None,
            None,
            lookup_from(&[(BASE_URL_ENV, "http://localhost"), (TOKEN_ENV, "t")]),
        )
        .unwrap_err();

        assert!(matches!(err, WmillError::Config(ref m) if m.contains(WORKSPACE_ENV)));
    }

    #[test]
    fn test_empty_token_rejected() {
        let err = ClientConfig::from_lookup(
            Some("  ".into()),
            Some("demo".into()),
            Some("http://localhost".into()),
            lookup_from(&[]),
        )
        .unwrap_err();
        assert!(matches!(err, WmillError::Config(ref m) if m.contains(TOKEN_ENV)));
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("http://localhost:8000").unwrap(),
            "http://localhost:8000/api"
        );
        assert_eq!(
            normalize_base_url("http://localhost:8000/api/").unwrap(),
            "http://localhost:8000/api"
        );
        assert!(normalize_base_url("ftp://localhost").is_err());
        assert!(normalize_base_url("not a url").is_err());
    }

    #[test]
    fn test_state_path_prefers_new_variable() {
        let job = JobContext::from_lookup(lookup_from(&[
            (STATE_PATH_ENV, "u/admin/new_state"),
            (LEGACY_STATE_PATH_ENV, "u/admin/old_state"),
        ]));
        assert_eq!(job.state_path.as_deref(), Some("u/admin/new_state"));

        let job = JobContext::from_lookup(lookup_from(&[(
            LEGACY_STATE_PATH_ENV,
            "u/admin/old_state",
        )]));
        assert_eq!(job.state_path.as_deref(), Some("u/admin/old_state"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let cfg = ClientConfig::from_lookup(
            Some("very-secret".into()),
            Some("demo".into()),
            Some("http://localhost".into()),
            lookup_from(&[]),
        )
        .unwrap();
        let printed = format!("{:?}", cfg);
        assert!(!printed.contains("very-secret"));
        assert!(cfg.state_path().is_err());
    }
}
