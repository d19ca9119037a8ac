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

//! The descriptor that flows through every stage of the CloudFetch pipeline.

use bytes::Bytes;
use std::collections::HashMap;
use std::time::Instant;

/// Lifecycle state of a [`DownloadDescriptor`].
///
/// Advances `Pending -> Downloading -> Ready -> Consumed`. `Failed` is
/// terminal and can be reached from any non-`Consumed` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Pending,
    Downloading,
    Ready,
    Failed,
    Consumed,
}

/// Metadata and (once downloaded) payload for one result chunk.
///
/// `row_offset` values across descriptors in a result set are monotonically
/// increasing with `chunk_index`: `row_offset(i+1) == row_offset(i) +
/// row_count(i)`. Once `state == Ready`, `payload` is non-empty and its
/// length equals `compressed_byte_count`.
#[derive(Debug, Clone)]
pub struct DownloadDescriptor {
    pub chunk_index: u64,
    pub row_offset: u64,
    pub row_count: u64,
    pub compressed_byte_count: u64,
    pub url: String,
    pub headers: Option<HashMap<String, String>>,
    pub expires_at: Option<Instant>,
    pub payload: Option<Bytes>,
    pub state: ChunkState,
}

impl DownloadDescriptor {
    /// Creates a fresh, not-yet-downloaded descriptor as produced by a
    /// [`LinkFetcher`](crate::reader::link_fetcher::LinkFetcher).
    pub fn new(
        chunk_index: u64,
        row_offset: u64,
        row_count: u64,
        compressed_byte_count: u64,
        url: String,
        headers: Option<HashMap<String, String>>,
        expires_at: Option<Instant>,
    ) -> Self {
        Self {
            chunk_index,
            row_offset,
            row_count,
            compressed_byte_count,
            url,
            headers,
            expires_at,
            payload: None,
            state: ChunkState::Pending,
        }
    }

    /// True if `expires_at` is set and within `buffer` of the given instant.
    pub fn is_expiring_by(&self, now: Instant, buffer: std::time::Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => now + buffer >= expires_at,
            None => false,
        }
    }

    /// Replaces the URL and headers after a refresh, discarding any stale
    /// payload. Does not touch `state`.
    pub fn apply_refresh(&mut self, url: String, headers: Option<HashMap<String, String>>, expires_at: Option<Instant>) {
        self.url = url;
        self.headers = headers;
        self.expires_at = expires_at;
        self.payload = None;
    }
}
