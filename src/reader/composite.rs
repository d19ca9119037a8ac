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

//! The top-level result-set reader (§4.5): picks the CloudFetch path or the
//! inline path based on [`InitialResponse::has_external_links`], and runs a
//! background heartbeat against the server while a long-running query's
//! results are still being consumed.

use crate::reader::cancel::CancelSignal;
use crate::reader::cloudfetch::CloudFetchReader;
use crate::reader::config::CloudFetchConfig;
use crate::reader::decode::BatchDecoder;
use crate::reader::error::CloudFetchError;
use crate::reader::inline::InlineReader;
use crate::reader::link_fetcher::ResultLinkSource;
use crate::reader::manager::DownloadManager;
use crate::reader::session::{FetchResponse, InitialResponse, OperationHandle, OperationStatus, SqlSession};
use arrow_array::RecordBatch;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::warn;

enum ReaderInner<S: ResultLinkSource, Sess: SqlSession> {
    CloudFetch(CloudFetchReader<S>),
    Inline(InlineReader<Sess>),
}

/// Chooses and drives one of the two result-retrieval strategies for a
/// single query's results, keeping the server-side operation handle alive
/// with a heartbeat for as long as the caller is still consuming rows.
pub struct CompositeReader<S: ResultLinkSource, Sess: SqlSession + 'static> {
    inner: ReaderInner<S, Sess>,
    heartbeat: HeartbeatHandle<Sess>,
}

impl<S: ResultLinkSource, Sess: SqlSession + 'static> CompositeReader<S, Sess> {
    /// Picks the result-retrieval strategy for `initial` per the decision
    /// rule: any external link anywhere in the initial response routes the
    /// whole result set through CloudFetch; otherwise it is handled inline,
    /// including the case where more inline pages are still coming
    /// (`InlineReader` paginates that on its own).
    ///
    /// `manager` must already be wired up from `initial`'s link source (a
    /// caller builds it from the same initial response before calling this,
    /// e.g. via `RpcResultLinkSource::new`); it is simply dropped, unstarted,
    /// if the inline path is chosen instead.
    pub fn new(
        session: Arc<Sess>,
        initial: InitialResponse,
        manager: DownloadManager<S>,
        decoder: Arc<dyn BatchDecoder>,
        config: &CloudFetchConfig,
        max_rows: u64,
        max_bytes: u64,
    ) -> Self {
        let operation_handle = initial.operation_handle.clone();
        if initial.has_external_links() {
            let is_lz4_compressed = initial.fetch.is_lz4_compressed;
            Self::new_cloudfetch(session, operation_handle, manager, decoder, config, is_lz4_compressed)
        } else {
            drop(manager);
            Self::new_inline(session, operation_handle, initial.fetch, decoder, config, max_rows, max_bytes)
        }
    }

    fn new_cloudfetch(
        session: Arc<Sess>,
        operation_handle: OperationHandle,
        manager: DownloadManager<S>,
        decoder: Arc<dyn BatchDecoder>,
        config: &CloudFetchConfig,
        is_lz4_compressed: bool,
    ) -> Self {
        let reader = CloudFetchReader::new(manager, decoder, config, is_lz4_compressed);
        Self {
            inner: ReaderInner::CloudFetch(reader),
            heartbeat: HeartbeatHandle::new(session, operation_handle, config.heartbeat_interval),
        }
    }

    fn new_inline(
        session: Arc<Sess>,
        operation_handle: OperationHandle,
        initial: FetchResponse,
        decoder: Arc<dyn BatchDecoder>,
        config: &CloudFetchConfig,
        max_rows: u64,
        max_bytes: u64,
    ) -> Self {
        let reader = InlineReader::new(
            Arc::clone(&session),
            operation_handle.clone(),
            initial,
            decoder,
            max_rows,
            max_bytes,
        );
        Self {
            inner: ReaderInner::Inline(reader),
            heartbeat: HeartbeatHandle::new(session, operation_handle, config.heartbeat_interval),
        }
    }

    /// Starts the underlying pipeline (a no-op for the inline path, since it
    /// has nothing to spawn) and the heartbeat.
    pub fn start(&self) -> Result<(), CloudFetchError> {
        if let ReaderInner::CloudFetch(reader) = &self.inner {
            reader.start()?;
        }
        self.heartbeat.start();
        Ok(())
    }

    pub async fn next_batches(&mut self) -> Result<Option<Vec<RecordBatch>>, CloudFetchError> {
        let result = match &mut self.inner {
            ReaderInner::CloudFetch(reader) => reader.next_batches().await,
            ReaderInner::Inline(reader) => reader.next_batches().await,
        };
        if !matches!(result, Ok(Some(_))) {
            self.heartbeat.stop();
        }
        result
    }

    /// Releases every resource: stops the heartbeat, stops the CloudFetch
    /// pipeline if running, and closes the server-side operation handle for
    /// the inline path (the CloudFetch path's link source closes its own
    /// handle as part of `ResultLinkSource::close`).
    pub async fn close(&mut self) {
        self.heartbeat.stop();
        match &mut self.inner {
            ReaderInner::CloudFetch(reader) => reader.stop(),
            ReaderInner::Inline(reader) => reader.close().await,
        }
    }
}

struct HeartbeatHandle<Sess: SqlSession + 'static> {
    session: Arc<Sess>,
    operation_handle: OperationHandle,
    interval: Duration,
    cancel: Arc<CancelSignal>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<Sess: SqlSession + 'static> HeartbeatHandle<Sess> {
    fn new(session: Arc<Sess>, operation_handle: OperationHandle, interval: Duration) -> Self {
        Self {
            session,
            operation_handle,
            interval,
            cancel: Arc::new(CancelSignal::new()),
            task: Mutex::new(None),
        }
    }

    /// Spawns the background ping loop. Calling this more than once just
    /// replaces the handle the second call's task is tracked under; callers
    /// only ever call it once per reader, from `CompositeReader::start`.
    fn start(&self) {
        let session = Arc::clone(&self.session);
        let operation_handle = self.operation_handle.clone();
        let interval = self.interval;
        let cancel = Arc::clone(&self.cancel);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        match session.get_status(&operation_handle).await {
                            Ok(OperationStatus::Finished) => break,
                            Ok(OperationStatus::Running) => {}
                            Err(e) => warn!(error = %e, "heartbeat status check failed"),
                        }
                    }
                }
            }
        });
        *self.task.lock().unwrap() = Some(handle);
    }

    fn stop(&self) {
        self.cancel.cancel();
    }
}
