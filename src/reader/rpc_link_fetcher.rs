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

//! The RPC-style [`ResultLinkSource`] (§4.1, RPC variant).
//!
//! `fetch_next` returns metadata and URLs together in a single call, and the
//! production loop terminates on `has_more_rows == false`. Because this
//! protocol has no notion of "give me chunk N again", refresh is
//! approximate: it re-requests by the chunk's starting row offset and
//! accepts whatever link the server returns for that offset. A server that
//! answers with a link for a different chunk is treated as a terminal
//! failure (§9) rather than silently substituted.

use crate::reader::descriptor::DownloadDescriptor;
use crate::reader::error::CloudFetchError;
use crate::reader::link_fetcher::{LinkBatch, ResultLinkSource};
use crate::reader::session::{
    FetchResponse, LinkRecord, OperationHandle, RefreshSelector, SqlSession,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

pub struct RpcResultLinkSource<S: SqlSession> {
    session: Arc<S>,
    operation_handle: OperationHandle,
    initial: Option<FetchResponse>,
    max_rows: u64,
    max_bytes: u64,
    row_offsets: HashMap<u64, u64>,
}

impl<S: SqlSession> RpcResultLinkSource<S> {
    pub fn new(
        session: Arc<S>,
        operation_handle: OperationHandle,
        initial: FetchResponse,
        max_rows: u64,
        max_bytes: u64,
    ) -> Self {
        Self {
            session,
            operation_handle,
            initial: Some(initial),
            max_rows,
            max_bytes,
            row_offsets: HashMap::new(),
        }
    }

    fn to_descriptors(&mut self, links: Vec<LinkRecord>) -> Vec<DownloadDescriptor> {
        links
            .into_iter()
            .map(|link| {
                self.row_offsets.insert(link.chunk_index, link.row_offset);
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
impl<S: SqlSession + 'static> ResultLinkSource for RpcResultLinkSource<S> {
    fn has_initial_results(&self) -> bool {
        self.initial.as_ref().is_some_and(|f| !f.links.is_empty())
    }

    async fn process_initial_results(&mut self) -> Result<Vec<DownloadDescriptor>, CloudFetchError> {
        let links = self.initial.take().map(|f| f.links).unwrap_or_default();
        Ok(self.to_descriptors(links))
    }

    async fn fetch_next_batch(&mut self) -> Result<LinkBatch, CloudFetchError> {
        let response = self
            .session
            .fetch_next(&self.operation_handle, self.max_rows, self.max_bytes)
            .await?;
        let has_more = response.has_more_rows;
        let descriptors = self.to_descriptors(response.links);
        Ok(LinkBatch {
            descriptors,
            has_more,
        })
    }

    async fn refresh_by_index(
        &mut self,
        chunk_index: u64,
    ) -> Result<DownloadDescriptor, CloudFetchError> {
        let row_offset = *self.row_offsets.get(&chunk_index).ok_or_else(|| {
            CloudFetchError::UpstreamFetchFailure(format!(
                "no known row offset for chunk {chunk_index}, cannot refresh"
            ))
        })?;

        let response = self
            .session
            .refresh_urls(
                &self.operation_handle,
                RefreshSelector::StartRowOffset(row_offset),
            )
            .await?;

        let link = response
            .links
            .into_iter()
            .find(|l| l.row_offset == row_offset)
            .ok_or_else(|| {
                CloudFetchError::UpstreamFetchFailure(format!(
                    "refresh for row offset {row_offset} (chunk {chunk_index}) returned no matching link"
                ))
            })?;

        if link.chunk_index != chunk_index {
            return Err(CloudFetchError::UpstreamFetchFailure(format!(
                "refresh for chunk {chunk_index} returned link for mismatched chunk {}",
                link.chunk_index
            )));
        }

        self.row_offsets.insert(link.chunk_index, link.row_offset);
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
            warn!(error = %e, "failed to close RPC operation handle");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::session::{InitialResponse, OperationStatus};
    use std::sync::Mutex;
    use std::time::Instant;

    struct FakeSession {
        fetch_next_responses: Mutex<Vec<Result<FetchResponse, CloudFetchError>>>,
        refresh_responses: Mutex<Vec<Result<FetchResponse, CloudFetchError>>>,
    }

    #[async_trait]
    impl SqlSession for FakeSession {
        async fn execute(&self, _sql: &str) -> Result<InitialResponse, CloudFetchError> {
            unreachable!("not exercised by this collaborator's tests")
        }

        async fn fetch_next(
            &self,
            _h: &OperationHandle,
            _max_rows: u64,
            _max_bytes: u64,
        ) -> Result<FetchResponse, CloudFetchError> {
            self.fetch_next_responses.lock().unwrap().remove(0)
        }

        async fn refresh_urls(
            &self,
            _h: &OperationHandle,
            _selector: RefreshSelector,
        ) -> Result<FetchResponse, CloudFetchError> {
            self.refresh_responses.lock().unwrap().remove(0)
        }

        async fn get_status(&self, _h: &OperationHandle) -> Result<OperationStatus, CloudFetchError> {
            Ok(OperationStatus::Finished)
        }

        async fn close_operation(&self, _h: &OperationHandle) -> Result<(), CloudFetchError> {
            Ok(())
        }
    }

    fn link(chunk_index: u64, row_offset: u64) -> LinkRecord {
        LinkRecord {
            url: format!("u{chunk_index}"),
            expiration: Some(Instant::now() + std::time::Duration::from_secs(300)),
            chunk_index,
            row_offset,
            row_count: 10,
            byte_count: 1000,
            headers: None,
        }
    }

    #[tokio::test]
    async fn initial_links_convert_to_descriptors() {
        let session = Arc::new(FakeSession {
            fetch_next_responses: Mutex::new(vec![]),
            refresh_responses: Mutex::new(vec![]),
        });
        let mut source = RpcResultLinkSource::new(
            session,
            OperationHandle("op".into()),
            FetchResponse {
                links: vec![link(0, 0), link(1, 10)],
                ..Default::default()
            },
            1000,
            1_000_000,
        );
        assert!(source.has_initial_results());
        let descriptors = source.process_initial_results().await.unwrap();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[1].row_offset, 10);
    }

    #[tokio::test]
    async fn refresh_by_offset_returns_matching_link() {
        let session = Arc::new(FakeSession {
            fetch_next_responses: Mutex::new(vec![]),
            refresh_responses: Mutex::new(vec![Ok(FetchResponse {
                links: vec![link(3, 30)],
                ..Default::default()
            })]),
        });
        let mut source = RpcResultLinkSource::new(
            session,
            OperationHandle("op".into()),
            FetchResponse::default(),
            1000,
            1_000_000,
        );
        source.row_offsets.insert(3, 30);
        let refreshed = source.refresh_by_index(3).await.unwrap();
        assert_eq!(refreshed.chunk_index, 3);
    }

    #[tokio::test]
    async fn refresh_mismatch_is_upstream_failure() {
        let session = Arc::new(FakeSession {
            fetch_next_responses: Mutex::new(vec![]),
            refresh_responses: Mutex::new(vec![Ok(FetchResponse {
                links: vec![link(9, 30)],
                ..Default::default()
            })]),
        });
        let mut source = RpcResultLinkSource::new(
            session,
            OperationHandle("op".into()),
            FetchResponse::default(),
            1000,
            1_000_000,
        );
        source.row_offsets.insert(3, 30);
        let err = source.refresh_by_index(3).await.unwrap_err();
        assert!(matches!(err, CloudFetchError::UpstreamFetchFailure(_)));
    }

    #[tokio::test]
    async fn fetch_next_batch_tracks_has_more_rows() {
        let session = Arc::new(FakeSession {
            fetch_next_responses: Mutex::new(vec![Ok(FetchResponse {
                links: vec![link(2, 20)],
                has_more_rows: true,
                ..Default::default()
            })]),
            refresh_responses: Mutex::new(vec![]),
        });
        let mut source = RpcResultLinkSource::new(
            session,
            OperationHandle("op".into()),
            FetchResponse::default(),
            1000,
            1_000_000,
        );
        let batch = source.fetch_next_batch().await.unwrap();
        assert!(batch.has_more);
        assert_eq!(batch.descriptors[0].chunk_index, 2);
    }
}
