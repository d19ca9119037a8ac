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

//! The inline reader (§4.5) for result sets small enough that the server
//! sends record batches directly rather than as external links.
//!
//! Unlike [`CloudFetchReader`](crate::reader::cloudfetch::CloudFetchReader),
//! this never LZ4-decompresses: inline batches are never compressed on the
//! wire (§9).

use crate::reader::decode::BatchDecoder;
use crate::reader::error::CloudFetchError;
use crate::reader::session::{FetchResponse, InlineBatch, OperationHandle, SqlSession};
use arrow_array::RecordBatch;
use std::collections::VecDeque;
use std::sync::Arc;

pub struct InlineReader<S: SqlSession> {
    session: Arc<S>,
    operation_handle: OperationHandle,
    decoder: Arc<dyn BatchDecoder>,
    pending: VecDeque<InlineBatch>,
    has_more_rows: bool,
    max_rows: u64,
    max_bytes: u64,
    next_index: u64,
    finished: bool,
}

impl<S: SqlSession> InlineReader<S> {
    pub fn new(
        session: Arc<S>,
        operation_handle: OperationHandle,
        initial: FetchResponse,
        decoder: Arc<dyn BatchDecoder>,
        max_rows: u64,
        max_bytes: u64,
    ) -> Self {
        Self {
            session,
            operation_handle,
            decoder,
            pending: initial.inline_batches.into(),
            has_more_rows: initial.has_more_rows,
            max_rows,
            max_bytes,
            next_index: 0,
            finished: false,
        }
    }

    /// Returns the next inline batch's decoded record batches, fetching
    /// more from the server synchronously if the local buffer is empty and
    /// the server says more rows remain.
    pub async fn next_batches(&mut self) -> Result<Option<Vec<RecordBatch>>, CloudFetchError> {
        if self.finished {
            return Ok(None);
        }

        loop {
            if let Some(batch) = self.pending.pop_front() {
                let index = self.next_index;
                self.next_index += 1;
                let decoded = self.decoder.decode(&batch.bytes).map_err(|e| CloudFetchError::Decode {
                    chunk_index: index,
                    lz4_enabled: false,
                    message: e.to_string(),
                })?;
                return Ok(Some(decoded));
            }

            if !self.has_more_rows {
                self.finished = true;
                return Ok(None);
            }

            let response = self
                .session
                .fetch_next(&self.operation_handle, self.max_rows, self.max_bytes)
                .await?;
            self.has_more_rows = response.has_more_rows;
            self.pending.extend(response.inline_batches);
        }
    }

    pub async fn close(&mut self) {
        let _ = self.session.close_operation(&self.operation_handle).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::session::OperationStatus;
    use arrow_schema::ArrowError;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;

    struct FakeSession {
        fetch_next_responses: Mutex<Vec<FetchResponse>>,
    }

    #[async_trait]
    impl SqlSession for FakeSession {
        async fn execute(
            &self,
            _sql: &str,
        ) -> Result<crate::reader::session::InitialResponse, CloudFetchError> {
            unreachable!()
        }

        async fn fetch_next(
            &self,
            _h: &OperationHandle,
            _max_rows: u64,
            _max_bytes: u64,
        ) -> Result<FetchResponse, CloudFetchError> {
            Ok(self.fetch_next_responses.lock().unwrap().remove(0))
        }

        async fn refresh_urls(
            &self,
            _h: &OperationHandle,
            _selector: crate::reader::session::RefreshSelector,
        ) -> Result<FetchResponse, CloudFetchError> {
            unreachable!()
        }

        async fn get_status(&self, _h: &OperationHandle) -> Result<OperationStatus, CloudFetchError> {
            Ok(OperationStatus::Finished)
        }

        async fn close_operation(&self, _h: &OperationHandle) -> Result<(), CloudFetchError> {
            Ok(())
        }
    }

    struct EmptyDecoder;
    impl BatchDecoder for EmptyDecoder {
        fn decode(&self, _bytes: &[u8]) -> Result<Vec<RecordBatch>, ArrowError> {
            Ok(vec![])
        }
    }

    fn batch(tag: &str) -> InlineBatch {
        InlineBatch {
            bytes: Bytes::copy_from_slice(tag.as_bytes()),
        }
    }

    #[tokio::test]
    async fn drains_initial_batches_then_fetches_more() {
        let session = Arc::new(FakeSession {
            fetch_next_responses: Mutex::new(vec![FetchResponse {
                inline_batches: vec![batch("b")],
                has_more_rows: false,
                ..Default::default()
            }]),
        });
        let initial = FetchResponse {
            inline_batches: vec![batch("a")],
            has_more_rows: true,
            ..Default::default()
        };
        let mut reader = InlineReader::new(
            session,
            OperationHandle("op".into()),
            initial,
            Arc::new(EmptyDecoder),
            1000,
            1_000_000,
        );

        assert!(reader.next_batches().await.unwrap().is_some());
        assert!(reader.next_batches().await.unwrap().is_some());
        assert!(reader.next_batches().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn no_inline_batches_and_no_more_rows_ends_immediately() {
        let session = Arc::new(FakeSession {
            fetch_next_responses: Mutex::new(vec![]),
        });
        let mut reader = InlineReader::new(
            session,
            OperationHandle("op".into()),
            FetchResponse::default(),
            Arc::new(EmptyDecoder),
            1000,
            1_000_000,
        );
        assert!(reader.next_batches().await.unwrap().is_none());
    }
}
