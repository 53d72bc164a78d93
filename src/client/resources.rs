// SPDX-License-Identifier: MIT

//! Resource access: typed JSON values keyed by path

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::Windmill;
use crate::error::Result;
use crate::http::ensure_success;

#[derive(Debug, Serialize)]
struct CreateResource<'a> {
    path: &'a str,
    value: &'a Value,
    resource_type: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateResourceValue<'a> {
    value: &'a Value,
}

impl Windmill {
    /// Fetch a resource and deserialize it into `T`
    pub async fn get_resource<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        Ok(serde_json::from_value(self.get_resource_any(path).await?)?)
    }

    /// Fetch a resource with `$var:` and `$res:` references resolved by the platform
    pub async fn get_resource_any(&self, path: &str) -> Result<Value> {
        Ok(self
            .api
            .get(
                &self.ws("resources/get_value_interpolated").path(path),
                &[],
            )
            .await?
            .json()
            .await?)
    }

    /// Fetch the stored resource value without interpolation
    pub async fn get_resource_raw(&self, path: &str) -> Result<Value> {
        Ok(self
            .api
            .get(&self.ws("resources/get_value").path(path), &[])
            .await?
            .json()
            .await?)
    }

    /// Like [`Windmill::get_resource_any`] but `None` when the resource is undefined
    pub async fn get_resource_opt(&self, path: &str) -> Result<Option<Value>> {
        let resp = self
            .api
            .get_unchecked(
                &self.ws("resources/get_value_interpolated").path(path),
                &[],
            )
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            log::debug!("resource {} is not defined", path);
            return Ok(None);
        }
        Ok(Some(ensure_success(resp).await?.json().await?))
    }

    /// Update the resource value if it exists, otherwise create it with `resource_type`
    ///
    /// `None` stores JSON `null`.
    pub async fn set_resource(
        &self,
        path: &str,
        value: Option<Value>,
        resource_type: &str,
    ) -> Result<()> {
        let value = value.unwrap_or(Value::Null);
        let existing = self
            .api
            .get_unchecked(&self.ws("resources/get").path(path), &[])
            .await?;

        if existing.status() == StatusCode::NOT_FOUND {
            log::debug!("resource {} not found, creating it as {}", path, resource_type);
            let body = CreateResource {
                path,
                value: &value,
                resource_type,
            };
            self.api
                .post(&self.ws("resources/create"), &body, &[])
                .await?;
        } else {
            ensure_success(existing).await?;
            self.api
                .post(
                    &self.ws("resources/update_value").path(path),
                    &UpdateResourceValue { value: &value },
                    &[],
                )
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_body_keeps_null_value() {
        let value = Value::Null;
        let body = CreateResource {
            path: "u/admin/state",
            value: &value,
            resource_type: "state",
        };
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({"path": "u/admin/state", "value": null, "resource_type": "state"})
        );
    }
}
