// SPDX-License-Identifier: MIT

//! Client for scripts that read and write resources, variables and state on
//! a workflow-automation platform.
//!
//! ```no_run
//! # async fn example() -> wmill::Result<()> {
//! let wm = wmill::Windmill::from_env()?;
//! let db = wm.get_resource_any("u/admin/db").await?;
//! wm.set_variable("u/admin/last_host", db["host"].as_str().unwrap_or(""), false)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod blocking;
pub mod client;
pub mod config;
pub mod error;
pub mod http;

pub use client::{JobStatus, ResumeUrls, ScriptRef, WaitOptions, Windmill};
pub use config::ClientConfig;
pub use error::{Result, WmillError};
