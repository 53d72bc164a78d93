// SPDX-License-Identifier: MIT

//! Variable access: string values keyed by path

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use super::Windmill;
use crate::error::Result;
use crate::http::ensure_success;

#[derive(Debug, Serialize)]
struct CreateVariable<'a> {
    path: &'a str,
    value: &'a str,
    is_secret: bool,
    description: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateVariable<'a> {
    value: &'a str,
}

impl Windmill {
    /// Get a variable and parse it as JSON, then YAML, else keep it as a string
    pub async fn get_variable(&self, path: &str) -> Result<Value> {
        let raw = self.get_variable_raw(path).await?;
        Ok(parse_variable_value(&raw))
    }

    /// Get the variable value as stored, decrypting secrets
    pub async fn get_variable_raw(&self, path: &str) -> Result<String> {
        self.get_variable_with(path, true).await
    }

    /// Get the variable value; with `decrypt_secret = false` secrets stay encrypted
    pub async fn get_variable_with(&self, path: &str, decrypt_secret: bool) -> Result<String> {
        let query = [("decrypt_secret", decrypt_secret.to_string())];
        let value: Value = self
            .api
            .get(&self.ws("variables/get_value").path(path), &query)
            .await?
            .json()
            .await?;

        Ok(match value {
            Value::String(s) => s,
            other => other.to_string(),
        })
    }

    /// Update the variable if it exists, otherwise create it
    ///
    /// `is_secret` only applies on creation; updates keep the existing flag.
    pub async fn set_variable(&self, path: &str, value: &str, is_secret: bool) -> Result<()> {
        let existing = self
            .api
            .get_unchecked(&self.ws("variables/get").path(path), &[])
            .await?;

        if existing.status() == StatusCode::NOT_FOUND {
            log::debug!("variable {} not found, creating it", path);
            let body = CreateVariable {
                path,
                value,
                is_secret,
                description: "",
            };
            self.api
                .post(&self.ws("variables/create"), &body, &[])
                .await?;
        } else {
            ensure_success(existing).await?;
            self.api
                .post(
                    &self.ws("variables/update").path(path),
                    &UpdateVariable { value },
                    &[],
                )
                .await?;
        }
        Ok(())
    }
}

/// Best-effort structured view of a variable value
pub fn parse_variable_value(raw: &str) -> Value {
    serde_json::from_str(raw)
        .or_else(|_| serde_yaml::from_str(raw))
        .unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_json_value() {
        assert_eq!(
            parse_variable_value(r#"{"key": "value"}"#),
            json!({"key": "value"})
        );
        assert_eq!(parse_variable_value("42"), json!(42));
    }

    #[test]
    fn test_parse_yaml_value() {
        assert_eq!(
            parse_variable_value("host: localhost\nport: 5432"),
            json!({"host": "localhost", "port": 5432})
        );
    }

    #[test]
    fn test_parse_plain_text() {
        assert_eq!(parse_variable_value("just a note"), json!("just a note"));
    }

    #[test]
    fn test_parse_falls_back_to_raw_string() {
        // invalid as both JSON and YAML
        assert_eq!(parse_variable_value("key: [unclosed"), json!("key: [unclosed"));
    }

    #[test]
    fn test_create_body_shape() {
        let body = CreateVariable {
            path: "u/admin/x",
            value: "v",
            is_secret: true,
            description: "",
        };
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({"path": "u/admin/x", "value": "v", "is_secret": true, "description": ""})
        );
    }
}
