//! Thin JSON-over-HTTP client shared by every collaborator adapter
//!
//! Every external collaborator (core store, node agent, DNS backend,
//! Stalwart, the incident agent, and other external services) is reached
//! the same way: POST a JSON request body to `<base_url>/<method>` and
//! decode a JSON response. Retry policy lives on the `ActivityOptions` the
//! workflow schedules the call with, not here, so a single failed call is
//! just a failed call.

use hosting_core::error::CoreError;
use serde::{de::DeserializeOwned, Serialize};

#[derive(Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    base_url: String,
}

impl RpcClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub async fn call<Req: Serialize + ?Sized, Resp: DeserializeOwned>(
        &self,
        method: &str,
        request: &Req,
    ) -> Result<Resp, CoreError> {
        let url = format!("{}/{method}", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| CoreError::transient(format!("{method}: request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let kind = if status.is_client_error() {
                CoreError::permanent(format!("{method}: {status}: {body}"))
            } else {
                CoreError::transient(format!("{method}: {status}: {body}"))
            };
            return Err(kind);
        }

        response
            .json()
            .await
            .map_err(|e| CoreError::permanent(format!("{method}: response decode: {e}")))
    }

    /// Like `call`, but against a fully-formed URL rather than
    /// `<base_url>/<method>`. Used where the collaborator's address is a
    /// per-call argument instead of something fixed on the adapter, e.g. a
    /// Stalwart instance scoped to one FQDN.
    pub async fn call_url<Req: Serialize + ?Sized, Resp: DeserializeOwned>(
        &self,
        url: &str,
        request: &Req,
    ) -> Result<Resp, CoreError> {
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| CoreError::transient(format!("{url}: request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let kind = if status.is_client_error() {
                CoreError::permanent(format!("{url}: {status}: {body}"))
            } else {
                CoreError::transient(format!("{url}: {status}: {body}"))
            };
            return Err(kind);
        }

        response
            .json()
            .await
            .map_err(|e| CoreError::permanent(format!("{url}: response decode: {e}")))
    }
}
