// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A thin GET-only HTTP wrapper used by the downloader workers.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;

/// Classification of a failed GET, distinct from [`CloudFetchError`](crate::reader::error::CloudFetchError)
/// because the downloader decides retry/refresh behavior from this kind
/// before it ever becomes a pipeline-level error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpErrorKind {
    /// Timed out, connection reset, or 5xx — retried by the downloader.
    Transient,
    /// HTTP 403 — the cloud-storage forbidden status used for expired
    /// pre-signed URLs.
    Forbidden,
    /// HTTP 404.
    NotFound,
    /// Any other non-2xx status or transport error not covered above.
    Other,
}

#[derive(Debug, Clone)]
pub struct HttpError {
    pub kind: HttpErrorKind,
    pub message: String,
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for HttpError {}

/// Performs a single GET with headers and a per-request timeout, returning
/// body bytes or a classified error. Implemented against `reqwest` in
/// production; tests substitute a fake.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn get(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Bytes, HttpError>;
}

/// `reqwest`-backed implementation, sharing one client (and its connection
/// pool) across all downloader workers, per §5's "HTTP client is shared
/// read-only" policy.
#[derive(Debug, Clone)]
pub struct ReqwestHttpFetcher {
    client: reqwest::Client,
}

impl ReqwestHttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestHttpFetcher {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl HttpFetcher for ReqwestHttpFetcher {
    async fn get(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Bytes, HttpError> {
        let mut request = self.client.get(url).timeout(timeout);
        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request.send().await.map_err(|e| HttpError {
            kind: if e.is_timeout() || e.is_connect() {
                HttpErrorKind::Transient
            } else {
                HttpErrorKind::Other
            },
            message: e.to_string(),
        })?;

        let status = response.status();
        if status.as_u16() == 403 {
            return Err(HttpError {
                kind: HttpErrorKind::Forbidden,
                message: format!("HTTP {status}"),
            });
        }
        if status.as_u16() == 404 {
            return Err(HttpError {
                kind: HttpErrorKind::NotFound,
                message: format!("HTTP {status}"),
            });
        }
        if status.is_server_error() {
            return Err(HttpError {
                kind: HttpErrorKind::Transient,
                message: format!("HTTP {status}"),
            });
        }
        if !status.is_success() {
            return Err(HttpError {
                kind: HttpErrorKind::Other,
                message: format!("HTTP {status}"),
            });
        }

        response.bytes().await.map_err(|e| HttpError {
            kind: HttpErrorKind::Transient,
            message: e.to_string(),
        })
    }
}
