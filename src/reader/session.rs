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

//! The upstream SQL session/client collaborator (§6).
//!
//! This is the boundary the CloudFetch core is built against. The core
//! never negotiates the query, parses SQL, or speaks either wire protocol
//! itself; a production `SqlSession` implementation lives in the (currently
//! unbuilt) session layer described in §1 as out of scope. Only the
//! interface is specified here.

use crate::reader::error::CloudFetchError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Instant;

/// Opaque handle to a server-side operation, returned by `execute` and
/// threaded through every subsequent call for that query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationHandle(pub String);

/// One chunk descriptor as carried on the wire, before translation into a
/// [`DownloadDescriptor`](crate::reader::descriptor::DownloadDescriptor).
#[derive(Debug, Clone)]
pub struct LinkRecord {
    pub url: String,
    pub expiration: Option<Instant>,
    pub chunk_index: u64,
    pub row_offset: u64,
    pub row_count: u64,
    pub byte_count: u64,
    pub headers: Option<HashMap<String, String>>,
}

/// An inline record batch carried directly in a server response rather than
/// as an external link. Opaque to the core — the bytes are whatever the
/// columnar stream decoder collaborator (§6) expects.
#[derive(Debug, Clone)]
pub struct InlineBatch {
    pub bytes: bytes::Bytes,
}

/// Shape shared by `execute` and `fetch_next`/`refresh_urls` responses.
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub links: Vec<LinkRecord>,
    pub inline_batches: Vec<InlineBatch>,
    pub has_more_rows: bool,
    pub is_lz4_compressed: bool,
}

/// Response to `execute`, carrying the operation handle in addition to the
/// first page of results.
#[derive(Debug, Clone)]
pub struct InitialResponse {
    pub operation_handle: OperationHandle,
    pub fetch: FetchResponse,
}

impl InitialResponse {
    /// True if any rows of this result set are reachable only through
    /// external cloud-storage links. A purely inline result that simply has
    /// more pages coming (`has_more_rows` with no links yet) is not routed
    /// through CloudFetch; `InlineReader` paginates that case on its own.
    pub fn has_external_links(&self) -> bool {
        !self.fetch.links.is_empty()
    }
}

/// Status of a long-running operation, used by the heartbeat (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Running,
    Finished,
}

/// The upstream session/client collaborator (§6). A production
/// implementation executes SQL over one of the two wire protocols; the
/// CloudFetch core only calls these five operations.
#[async_trait]
pub trait SqlSession: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<InitialResponse, CloudFetchError>;

    async fn fetch_next(
        &self,
        operation_handle: &OperationHandle,
        max_rows: u64,
        max_bytes: u64,
    ) -> Result<FetchResponse, CloudFetchError>;

    /// `selector` is a row offset for the RPC-style variant's approximate
    /// refresh, or a chunk index for the REST-style variant's precise
    /// refresh; see `ResultLinkSource::refresh_by_index`.
    async fn refresh_urls(
        &self,
        operation_handle: &OperationHandle,
        selector: RefreshSelector,
    ) -> Result<FetchResponse, CloudFetchError>;

    async fn get_status(
        &self,
        operation_handle: &OperationHandle,
    ) -> Result<OperationStatus, CloudFetchError>;

    async fn close_operation(&self, operation_handle: &OperationHandle)
        -> Result<(), CloudFetchError>;
}

/// Distinguishes the two `refresh_urls` addressing modes (§4.1).
#[derive(Debug, Clone, Copy)]
pub enum RefreshSelector {
    StartRowOffset(u64),
    ChunkIndex(u64),
}
