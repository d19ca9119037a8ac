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

//! Error model for the CloudFetch pipeline.
//!
//! The pipeline has richer failure modes (retry exhaustion, refresh
//! exhaustion, proactive vs. reactive expiry) than the generic ADBC error
//! model expresses, so it gets its own `thiserror` enum here and is only
//! converted to the top-level [`crate::error::Error`] where results cross
//! into a `RecordBatchReader`.

use crate::error::{DatabricksErrorHelper, Error as AdbcError};
use driverbase::error::ErrorHelper;
use thiserror::Error;

/// Errors produced anywhere in the CloudFetch pipeline.
#[derive(Error, Debug, Clone)]
pub enum CloudFetchError {
    /// Timeout, connection reset, or 5xx; retried up to `max_retries`
    /// attempts and surfaced only after exhaustion.
    #[error("transient network error after {attempts} attempt(s): {message}")]
    TransientNetwork { attempts: u32, message: String },

    /// HTTP 403 or proactive-expiry trigger; recovered locally by refresh
    /// unless `max_url_refresh_attempts` is exhausted.
    #[error("chunk {chunk_index} URL expired after {attempts} refresh attempt(s)")]
    UrlExpired { chunk_index: u64, attempts: u32 },

    /// The LinkFetcher's call into the upstream server failed terminally.
    #[error("upstream result-link fetch failed: {0}")]
    UpstreamFetchFailure(String),

    /// `stop()` was called while work was in flight. Not surfaced to the
    /// caller as an error — `next_downloaded` returns end-of-stream instead
    /// — but retained as a variant so internal plumbing can distinguish a
    /// cancelled exit from other terminal states.
    #[error("pipeline was cancelled")]
    Cancelled,

    /// LZ4 decompression of a chunk payload failed.
    #[error("LZ4 decompression failed for chunk {chunk_index}: {message}")]
    Decompression { chunk_index: u64, message: String },

    /// The columnar stream decoder rejected a chunk's bytes.
    #[error("decode failed for chunk {chunk_index} (lz4={lz4_enabled}): {message}")]
    Decode {
        chunk_index: u64,
        lz4_enabled: bool,
        message: String,
    },

    /// A single chunk's byte size exceeds the entire memory budget. Fatal at
    /// reservation time; indicates a configuration error.
    #[error(
        "chunk of {chunk_bytes} bytes exceeds the entire memory budget of {capacity_bytes} bytes"
    )]
    BudgetExhaustedConfiguration { chunk_bytes: u64, capacity_bytes: u64 },

    /// A `cloudfetch.*` configuration value was invalid at construction.
    #[error("invalid cloudfetch configuration: {0}")]
    InvalidConfiguration(String),

    /// `start()` was called on a component already started, or a
    /// [`DownloadManager`](crate::reader::manager::DownloadManager) method
    /// was invoked out of its documented lifecycle.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl CloudFetchError {
    /// True if this error was already recovered locally (or is cancellation)
    /// and therefore must never propagate as a caller-visible failure.
    pub fn is_locally_recovered(&self) -> bool {
        matches!(self, CloudFetchError::Cancelled)
    }
}

/// Converts a pipeline error into the driver's ADBC-facing error type at the
/// boundary where CloudFetch results are handed to a `RecordBatchReader`.
impl From<CloudFetchError> for AdbcError {
    fn from(err: CloudFetchError) -> Self {
        match err {
            CloudFetchError::Cancelled => {
                DatabricksErrorHelper::invalid_state().message("operation was cancelled")
            }
            CloudFetchError::BudgetExhaustedConfiguration { .. }
            | CloudFetchError::InvalidConfiguration(_) => {
                DatabricksErrorHelper::invalid_argument().message(err.to_string())
            }
            CloudFetchError::InvalidState(_) => {
                DatabricksErrorHelper::invalid_state().message(err.to_string())
            }
            other => DatabricksErrorHelper::io().message(other.to_string()),
        }
    }
}
