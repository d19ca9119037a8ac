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

//! The REST-style [`ResultLinkSource`] (§4.1, REST variant).
//!
//! The initial response carries no URLs, only enough metadata to know more
//! chunks exist; URLs are obtained one `GetResultChunks(index)` call at a
//! time via `fetch_next`, and refreshed precisely by chunk index rather
//! than by row offset.

use crate::reader::descriptor::DownloadDescriptor;
use crate::reader::error::CloudFetchError;
use crate::reader::link_fetcher::{LinkBatch, ResultLinkSource};
use crate::reader::session::{FetchResponse, LinkRecord, OperationHandle, RefreshSelector, SqlSession};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

pub struct RestResultLinkSource<S: SqlSession> {
    session: Arc<S>,
    operation_handle: OperationHandle,
    initial: Option<FetchResponse>,
    max_bytes: u64,
}

impl<S: SqlSession> RestResultLinkSource<S> {
    pub fn new(
        session: Arc<S>,
        operation_handle: OperationHandle,
        initial: FetchResponse,
        max_bytes: u64,
    ) -> Self {
        Self {
            session,
            operation_handle,
            initial: Some(initial),
            max_bytes,
        }
    }

    fn to_descriptors(links: Vec<LinkRecord>) -> Vec<DownloadDescriptor> {
        links
            .into_iter()
            .map(|link| {
                DownloadDescriptor::new(
                    link.chunk_index,
                    link.row_offset,
                    link.row_count,
                    link.byte_count,
                    link.url,
                    link.headers,
                    link.expiration,
                )
            })
            .collect()
    }
}

#[async_trait]
impl<S: SqlSession + 'static> ResultLinkSource for RestResultLinkSource<S> {
    fn has_initial_results(&self) -> bool {
        self.initial.as_ref().is_some_and(|f| !f.links.is_empty())
    }

    async fn process_initial_results(&mut self) -> Result<Vec<DownloadDescriptor>, CloudFetchError> {
        let links = self.initial.take().map(|f| f.links).unwrap_or_default();
        Ok(Self::to_descriptors(links))
    }

    async fn fetch_next_batch(&mut self) -> Result<LinkBatch, CloudFetchError> {
        // The chunk index to request next is a count-based cursor on the
        // wire; the REST session implementation tracks it against the
        // operation handle, so the core only needs to keep calling until
        // `has_more_rows` goes false.
        let response = self
            .session
            .fetch_next(&self.operation_handle, 1, self.max_bytes)
            .await?;
        let has_more = response.has_more_rows;
        Ok(LinkBatch {
            descriptors: Self::to_descriptors(response.links),
            has_more,
        })
    }

    async fn refresh_by_index(
        &mut self,
        chunk_index: u64,
    ) -> Result<DownloadDescriptor, CloudFetchError> {
        let response = self
            .session
            .refresh_urls(&self.operation_handle, RefreshSelector::ChunkIndex(chunk_index))
            .await?;

        let link = response
            .links
            .into_iter()
            .find(|l| l.chunk_index == chunk_index)
            .ok_or_else(|| {
                CloudFetchError::UpstreamFetchFailure(format!(
                    "refresh for chunk {chunk_index} returned no matching link"
                ))
            })?;

        Ok(DownloadDescriptor::new(
            link.chunk_index,
            link.row_offset,
            link.row_count,
            link.byte_count,
            link.url,
            link.headers,
            link.expiration,
        ))
    }

    async fn close(&mut self) {
        if let Err(e) = self.session.close_operation(&self.operation_handle).await {
            warn!(error = %e, "failed to close REST operation handle");
        }
    }
}
