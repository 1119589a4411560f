//! HTTP client for the upstream e-MCF fiscal API.
//!
//! Calls are authorized with the bearer token of the provider resolved
//! for the current request, never a process-wide credential.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

/// Transport-level result of an upstream call. Mirrored back to the
/// caller as-is when the upstream was reached: `status_code` is the
/// upstream HTTP status, `values` the response body, `reason` the error
/// body when the upstream answered outside 2xx or was unreachable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiOutcome {
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Value>,
}

impl ApiOutcome {
    pub fn is_ok(&self) -> bool {
        self.status_code == StatusCode::OK.as_u16()
    }

    /// Field accessor into the response body.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.as_ref().and_then(|v| v.get(key))
    }
}

impl IntoResponse for ApiOutcome {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::UNPROCESSABLE_ENTITY);
        (status, Json(self)).into_response()
    }
}

#[derive(Debug, Clone)]
pub struct EmcfClient {
    client: Client,
    base_url: String,
}

impl EmcfClient {
    pub fn new(base_url: impl Into<String>, timeout_seconds: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build upstream HTTP client: {e}"))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// `GET /api/invoice` — upstream API liveness for the given token.
    pub async fn api_status(&self, token: &str) -> ApiOutcome {
        self.request(Method::GET, "/api/invoice", token, None).await
    }

    /// `GET /api/invoice/:uid` — amounts computed upstream for a
    /// still-pending declaration.
    pub async fn invoice_status(&self, token: &str, uid: &str) -> ApiOutcome {
        self.request(Method::GET, &format!("/api/invoice/{uid}"), token, None)
            .await
    }

    /// `POST /api/invoice` — declare. A business-level acceptance is
    /// signalled by a `uid` field in the body, not by the status code.
    pub async fn declare(&self, token: &str, payload: &Value) -> ApiOutcome {
        self.request(Method::POST, "/api/invoice", token, Some(payload))
            .await
    }

    /// `PUT /api/invoice/:uid/:action` — confirm or cancel.
    pub async fn complete(&self, token: &str, uid: &str, action: &str) -> ApiOutcome {
        self.request(
            Method::PUT,
            &format!("/api/invoice/{uid}/{action}"),
            token,
            None,
        )
        .await
    }

    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        token: &str,
        body: Option<&Value>,
    ) -> ApiOutcome {
        // A resolved identity without a token cannot reach upstream.
        if token.is_empty() {
            return ApiOutcome {
                status_code: StatusCode::PRECONDITION_FAILED.as_u16(),
                values: None,
                reason: Some(Value::String("USER_TOKEN_NOT_FOUND".into())),
            };
        }

        let url = format!("{}{}", self.base_url, endpoint);
        debug!(%method, %url, "emcf upstream request");

        let mut request = self.client.request(method, &url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                let body: Value = response.json().await.unwrap_or(Value::Null);

                if status.is_success() {
                    debug!(status = status.as_u16(), "emcf upstream response");
                    ApiOutcome {
                        status_code: status.as_u16(),
                        values: Some(body),
                        reason: None,
                    }
                } else {
                    error!(status = status.as_u16(), %url, "emcf upstream rejected request");
                    ApiOutcome {
                        status_code: status.as_u16(),
                        values: None,
                        reason: Some(body),
                    }
                }
            }
            Err(e) => {
                error!(error = %e, %url, "emcf upstream call failed");
                ApiOutcome {
                    status_code: StatusCode::UNPROCESSABLE_ENTITY.as_u16(),
                    values: None,
                    reason: Some(Value::String(e.to_string())),
                }
            }
        }
    }
}
