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

//! The downloader worker pool (§4.2).
//!
//! `parallel_downloads` workers pull [`DownloadDescriptor`]s off the pending
//! queue, reserve their byte count against the [`MemoryBudget`], fetch the
//! payload, and publish into a [`ChunkReorderBuffer`] that `next_ready`
//! drains in strict chunk-index order regardless of which worker finished
//! first.

use crate::reader::cancel::CancelSignal;
use crate::reader::config::CloudFetchConfig;
use crate::reader::descriptor::{ChunkState, DownloadDescriptor};
use crate::reader::error::CloudFetchError;
use crate::reader::http_fetcher::{HttpErrorKind, HttpFetcher};
use crate::reader::link_fetcher::{ChunkRefresher, PendingItem};
use crate::reader::memory_budget::{BudgetReservation, MemoryBudget};
use crate::reader::queue::QueueReceiver;
use crate::reader::reorder::ChunkReorderBuffer;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A fully downloaded chunk: its metadata and payload, plus the memory
/// reservation that must stay alive until the reader has decoded it.
pub struct DownloadedChunk {
    pub descriptor: DownloadDescriptor,
    _reservation: BudgetReservation,
}

impl DownloadedChunk {
    pub fn chunk_index(&self) -> u64 {
        self.descriptor.chunk_index
    }
}

struct WorkerContext {
    config: CloudFetchConfig,
    http: Arc<dyn HttpFetcher>,
    refresher: Arc<dyn ChunkRefresher>,
    memory_budget: MemoryBudget,
    pending_rx: Arc<AsyncMutex<QueueReceiver<PendingItem>>>,
    reorder: Mutex<ChunkReorderBuffer<DownloadedChunk>>,
    ready: Notify,
    cancel: Arc<CancelSignal>,
    active_workers: AtomicUsize,
    error: Mutex<Option<CloudFetchError>>,
}

impl WorkerContext {
    fn record_failure(&self, err: CloudFetchError) {
        let mut guard = self.error.lock().unwrap();
        if guard.is_none() {
            *guard = Some(err);
        }
        drop(guard);
        self.cancel.cancel();
        self.ready.notify_waiters();
    }
}

/// Owns the worker pool for one result set's downloads.
pub struct Downloader {
    ctx: Arc<WorkerContext>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Downloader {
    pub fn new(
        config: CloudFetchConfig,
        http: Arc<dyn HttpFetcher>,
        refresher: Arc<dyn ChunkRefresher>,
        memory_budget: MemoryBudget,
        pending_rx: QueueReceiver<PendingItem>,
    ) -> Self {
        let ctx = Arc::new(WorkerContext {
            config,
            http,
            refresher,
            memory_budget,
            pending_rx: Arc::new(AsyncMutex::new(pending_rx)),
            reorder: Mutex::new(ChunkReorderBuffer::new()),
            ready: Notify::new(),
            cancel: Arc::new(CancelSignal::new()),
            active_workers: AtomicUsize::new(0),
            error: Mutex::new(None),
        });
        Self {
            ctx,
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Spawns `parallel_downloads` worker tasks. Calling this twice fails
    /// with `InvalidState`.
    pub fn start(&self) -> Result<(), CloudFetchError> {
        let mut workers = self.workers.lock().unwrap();
        if !workers.is_empty() {
            return Err(CloudFetchError::InvalidState(
                "Downloader already started".to_string(),
            ));
        }
        let count = self.ctx.config.parallel_downloads.max(1);
        self.ctx.active_workers.store(count, Ordering::SeqCst);
        for worker_id in 0..count {
            let ctx = Arc::clone(&self.ctx);
            workers.push(tokio::spawn(worker_loop(ctx, worker_id)));
        }
        Ok(())
    }

    /// Cancels all workers. Safe to call in any state; workers observe the
    /// flag at their next suspension point and wind down.
    pub fn stop(&self) {
        self.ctx.cancel.cancel();
        self.ctx.ready.notify_waiters();
    }

    /// Returns the next chunk in chunk-index order, waiting for workers to
    /// fill the gap if necessary. Returns `None` once every worker has
    /// exited and no further chunk will ever arrive.
    pub async fn next_ready(&self) -> Option<DownloadedChunk> {
        loop {
            // Create the notification future before checking state, so a
            // publish or worker-exit that happens concurrently with the
            // check below is not missed.
            let notified = self.ctx.ready.notified();
            tokio::pin!(notified);

            {
                let mut buf = self.ctx.reorder.lock().unwrap();
                if let Some(chunk) = buf.pop_ready() {
                    return Some(chunk);
                }
            }
            if self.ctx.active_workers.load(Ordering::SeqCst) == 0 {
                // One last check: a worker may have published between the
                // pop above and the exit-count read here.
                let mut buf = self.ctx.reorder.lock().unwrap();
                return buf.pop_ready();
            }
            notified.await;
        }
    }

    /// The first terminal error recorded by any worker or the propagated
    /// sentinel from the result-link fetcher, if any.
    pub fn error(&self) -> Option<CloudFetchError> {
        self.ctx.error.lock().unwrap().clone()
    }
}

async fn worker_loop(ctx: Arc<WorkerContext>, worker_id: usize) {
    loop {
        if ctx.cancel.is_cancelled() {
            break;
        }

        let item = {
            let mut rx = ctx.pending_rx.lock().await;
            rx.take().await
        };

        let mut descriptor = match item {
            Some(PendingItem::Descriptor(d)) => d,
            Some(PendingItem::FetcherFailed(e)) => {
                warn!(worker = worker_id, error = %e, "result-link fetch failed terminally");
                ctx.record_failure(e);
                break;
            }
            None => break,
        };

        descriptor.state = ChunkState::Downloading;

        match download_one(&ctx, &mut descriptor).await {
            Ok(reservation) => {
                descriptor.state = ChunkState::Ready;
                debug!(
                    worker = worker_id,
                    chunk_index = descriptor.chunk_index,
                    "chunk downloaded"
                );
                let chunk_index = descriptor.chunk_index;
                let chunk = DownloadedChunk {
                    descriptor,
                    _reservation: reservation,
                };
                ctx.reorder.lock().unwrap().publish(chunk_index, chunk);
                ctx.ready.notify_waiters();
            }
            Err(CloudFetchError::Cancelled) => break,
            Err(e) => {
                warn!(
                    worker = worker_id,
                    chunk_index = descriptor.chunk_index,
                    error = %e,
                    "chunk download failed terminally"
                );
                ctx.record_failure(e);
                break;
            }
        }
    }

    if ctx.active_workers.fetch_sub(1, Ordering::SeqCst) == 1 {
        ctx.ready.notify_waiters();
    }
}

/// Downloads one descriptor's payload: proactive expiry refresh, the GET
/// itself with transient-error retry, and reactive (403) expiry refresh.
/// Returns the held memory reservation on success so the caller can attach
/// it to the published chunk.
async fn download_one(
    ctx: &WorkerContext,
    descriptor: &mut DownloadDescriptor,
) -> Result<BudgetReservation, CloudFetchError> {
    if ctx.cancel.is_cancelled() {
        return Err(CloudFetchError::Cancelled);
    }

    let reservation = ctx.memory_budget.reserve(descriptor.compressed_byte_count).await?;

    let mut refresh_attempts = 0u32;
    if descriptor.is_expiring_by(Instant::now(), ctx.config.url_expiration_buffer) {
        refresh_descriptor(ctx, descriptor, &mut refresh_attempts).await?;
    }

    let mut retry_attempt = 0u32;
    loop {
        if ctx.cancel.is_cancelled() {
            return Err(CloudFetchError::Cancelled);
        }

        let headers = descriptor.headers.clone().unwrap_or_default();
        match ctx
            .http
            .get(&descriptor.url, &headers, ctx.config.timeout)
            .await
        {
            Ok(bytes) => {
                descriptor.payload = Some(bytes);
                return Ok(reservation);
            }
            Err(e) => match e.kind {
                HttpErrorKind::Forbidden => {
                    refresh_descriptor(ctx, descriptor, &mut refresh_attempts).await?;
                }
                HttpErrorKind::Transient => {
                    retry_attempt += 1;
                    if retry_attempt > ctx.config.max_retries {
                        return Err(CloudFetchError::TransientNetwork {
                            attempts: retry_attempt,
                            message: e.message,
                        });
                    }
                    tokio::time::sleep(ctx.config.retry_delay * retry_attempt).await;
                }
                HttpErrorKind::NotFound | HttpErrorKind::Other => {
                    return Err(CloudFetchError::TransientNetwork {
                        attempts: retry_attempt + 1,
                        message: e.message,
                    });
                }
            },
        }
    }
}

/// Requests a fresh URL for `descriptor`'s chunk and applies it, counting
/// against `max_url_refresh_attempts` shared by both proactive and reactive
/// triggers (§7).
async fn refresh_descriptor(
    ctx: &WorkerContext,
    descriptor: &mut DownloadDescriptor,
    refresh_attempts: &mut u32,
) -> Result<(), CloudFetchError> {
    *refresh_attempts += 1;
    if *refresh_attempts > ctx.config.max_url_refresh_attempts {
        return Err(CloudFetchError::UrlExpired {
            chunk_index: descriptor.chunk_index,
            attempts: *refresh_attempts,
        });
    }
    let fresh = ctx.refresher.refresh(descriptor.chunk_index).await?;
    descriptor.apply_refresh(fresh.url, fresh.headers, fresh.expires_at);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::link_fetcher::{
        LinkBatch, LinkFetcher, PendingItem as LfPendingItem, ResultLinkSource,
    };
    use crate::reader::queue::bounded_queue;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    struct FakeHttp {
        responses: StdMutex<VecDeque<Result<Bytes, crate::reader::http_fetcher::HttpError>>>,
    }

    #[async_trait]
    impl HttpFetcher for FakeHttp {
        async fn get(
            &self,
            _url: &str,
            _headers: &HashMap<String, String>,
            _timeout: Duration,
        ) -> Result<Bytes, crate::reader::http_fetcher::HttpError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(Bytes::from_static(b"x")))
        }
    }

    struct FakeSource {
        batches: VecDeque<Result<LinkBatch, CloudFetchError>>,
    }

    #[async_trait]
    impl ResultLinkSource for FakeSource {
        fn has_initial_results(&self) -> bool {
            false
        }

        async fn process_initial_results(
            &mut self,
        ) -> Result<Vec<DownloadDescriptor>, CloudFetchError> {
            Ok(vec![])
        }

        async fn fetch_next_batch(&mut self) -> Result<LinkBatch, CloudFetchError> {
            self.batches
                .pop_front()
                .unwrap_or_else(|| Ok(LinkBatch::default()))
        }

        async fn refresh_by_index(
            &mut self,
            chunk_index: u64,
        ) -> Result<DownloadDescriptor, CloudFetchError> {
            Ok(descriptor(chunk_index))
        }
    }

    fn descriptor(idx: u64) -> DownloadDescriptor {
        DownloadDescriptor::new(idx, idx * 10, 10, 4, format!("u{idx}"), None, None)
    }

    fn test_config() -> CloudFetchConfig {
        let mut c = CloudFetchConfig::default();
        c.parallel_downloads = 2;
        c.retry_delay = Duration::from_millis(1);
        c.memory_buffer_size_bytes = 100;
        c
    }

    #[tokio::test]
    async fn downloads_and_reorders_out_of_order_completions() {
        let source = FakeSource {
            batches: VecDeque::from([Ok(LinkBatch {
                descriptors: vec![descriptor(0), descriptor(1), descriptor(2)],
                has_more: false,
            })]),
        };
        let (pending_tx, pending_rx) = bounded_queue::<LfPendingItem>(8);
        let fetcher = Arc::new(LinkFetcher::new(source, pending_tx));
        fetcher.start().unwrap();

        let http = Arc::new(FakeHttp {
            responses: StdMutex::new(VecDeque::new()),
        });
        let downloader = Downloader::new(
            test_config(),
            http,
            fetcher,
            MemoryBudget::new(100),
            pending_rx,
        );
        downloader.start().unwrap();

        let mut seen = vec![];
        for _ in 0..3 {
            let chunk = downloader.next_ready().await.unwrap();
            seen.push(chunk.chunk_index());
        }
        assert_eq!(seen, vec![0, 1, 2]);
        assert!(downloader.next_ready().await.is_none());
        assert!(downloader.error().is_none());
    }

    #[tokio::test]
    async fn budget_exhaustion_on_a_single_chunk_is_terminal() {
        let source = FakeSource {
            batches: VecDeque::from([Ok(LinkBatch {
                descriptors: vec![DownloadDescriptor::new(
                    0,
                    0,
                    10,
                    1000,
                    "u0".into(),
                    None,
                    None,
                )],
                has_more: false,
            })]),
        };
        let (pending_tx, pending_rx) = bounded_queue::<LfPendingItem>(8);
        let fetcher = Arc::new(LinkFetcher::new(source, pending_tx));
        fetcher.start().unwrap();

        let http = Arc::new(FakeHttp {
            responses: StdMutex::new(VecDeque::new()),
        });
        let downloader = Downloader::new(
            test_config(),
            http,
            fetcher,
            MemoryBudget::new(100),
            pending_rx,
        );
        downloader.start().unwrap();

        assert!(downloader.next_ready().await.is_none());
        assert!(matches!(
            downloader.error(),
            Some(CloudFetchError::BudgetExhaustedConfiguration { .. })
        ));
    }

    #[tokio::test]
    async fn double_start_is_invalid_state() {
        let source = FakeSource {
            batches: VecDeque::new(),
        };
        let (pending_tx, pending_rx) = bounded_queue::<LfPendingItem>(8);
        let fetcher = Arc::new(LinkFetcher::new(source, pending_tx));
        let http = Arc::new(FakeHttp {
            responses: StdMutex::new(VecDeque::new()),
        });
        let downloader = Downloader::new(
            test_config(),
            http,
            fetcher,
            MemoryBudget::new(100),
            pending_rx,
        );
        downloader.start().unwrap();
        assert!(matches!(
            downloader.start(),
            Err(CloudFetchError::InvalidState(_))
        ));
    }
}
