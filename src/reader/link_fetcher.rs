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

//! The protocol-agnostic result-link fetcher (§4.1).
//!
//! `LinkFetcher<S>` implements the driving algorithm once; `S:
//! ResultLinkSource` supplies the four protocol-specific hooks. Refreshes
//! are serialized onto the fetcher's own background task via an mpsc
//! channel, per §9, so a worker calling `refresh` never needs to lock the
//! fetcher or race the production loop.

use crate::reader::cancel::CancelSignal;
use crate::reader::descriptor::DownloadDescriptor;
use crate::reader::error::CloudFetchError;
use crate::reader::queue::QueueSender;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// One batch returned by `fetch_next_batch`.
#[derive(Debug, Default)]
pub struct LinkBatch {
    pub descriptors: Vec<DownloadDescriptor>,
    pub has_more: bool,
}

/// Item pushed onto the pending queue: either a freshly produced descriptor
/// or the terminal error sentinel described in §4.1 step 3.
#[derive(Debug)]
pub enum PendingItem {
    Descriptor(DownloadDescriptor),
    FetcherFailed(CloudFetchError),
}

/// The four protocol-specific hooks, plus an optional shutdown hook for
/// releasing server-side operation handles.
#[async_trait]
pub trait ResultLinkSource: Send + 'static {
    fn has_initial_results(&self) -> bool;

    async fn process_initial_results(&mut self) -> Result<Vec<DownloadDescriptor>, CloudFetchError>;

    async fn fetch_next_batch(&mut self) -> Result<LinkBatch, CloudFetchError>;

    async fn refresh_by_index(
        &mut self,
        chunk_index: u64,
    ) -> Result<DownloadDescriptor, CloudFetchError>;

    /// Releases server-side operation handles. Default is a no-op; the RPC
    /// and REST variants override it to call `close_operation`.
    async fn close(&mut self) {}
}

#[derive(Debug, Default)]
struct SharedState {
    has_more: bool,
    completed: bool,
    next_chunk_index: u64,
    error: Option<CloudFetchError>,
}

struct RefreshRequest {
    chunk_index: u64,
    reply: oneshot::Sender<Result<DownloadDescriptor, CloudFetchError>>,
}

/// Produces [`DownloadDescriptor`]s in chunk-index order onto a pending
/// queue, and serves URL refreshes, until the upstream server signals no
/// more rows remain.
pub struct LinkFetcher<S: ResultLinkSource> {
    source: Mutex<Option<S>>,
    pending_tx: QueueSender<PendingItem>,
    refresh_tx: mpsc::Sender<RefreshRequest>,
    refresh_rx: Mutex<Option<mpsc::Receiver<RefreshRequest>>>,
    cancel: Arc<CancelSignal>,
    state: Arc<Mutex<SharedState>>,
    task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl<S: ResultLinkSource> LinkFetcher<S> {
    pub fn new(source: S, pending_tx: QueueSender<PendingItem>) -> Self {
        let (refresh_tx, refresh_rx) = mpsc::channel(16);
        Self {
            source: Mutex::new(Some(source)),
            pending_tx,
            refresh_tx,
            refresh_rx: Mutex::new(Some(refresh_rx)),
            cancel: Arc::new(CancelSignal::new()),
            state: Arc::new(Mutex::new(SharedState {
                has_more: true,
                ..Default::default()
            })),
            task: Mutex::new(None),
        }
    }

    /// Begins background production. Calling this twice fails with
    /// `InvalidState`; the second call observes that the source was already
    /// taken by the first.
    pub fn start(&self) -> Result<(), CloudFetchError> {
        let source = self
            .source
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| CloudFetchError::InvalidState("LinkFetcher already started".into()))?;
        let refresh_rx = self
            .refresh_rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| CloudFetchError::InvalidState("LinkFetcher already started".into()))?;

        let pending_tx = self.pending_tx.clone();
        let cancel = Arc::clone(&self.cancel);
        let state = Arc::clone(&self.state);

        let handle = tokio::spawn(run(source, pending_tx, refresh_rx, cancel, state));
        *self.task.lock().unwrap() = Some(handle);
        Ok(())
    }

    /// Cancels production and stops serving refreshes. Safe to call in any
    /// state, including before `start()` or after a prior `stop()`.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Re-requests a fresh URL for `chunk_index`, serialized onto the
    /// fetcher's background task. Blocks until a reply arrives or the
    /// fetcher has already torn down.
    pub async fn refresh(&self, chunk_index: u64) -> Result<DownloadDescriptor, CloudFetchError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.refresh_tx
            .send(RefreshRequest {
                chunk_index,
                reply: reply_tx,
            })
            .await
            .map_err(|_| {
                CloudFetchError::InvalidState("LinkFetcher is not running".to_string())
            })?;
        reply_rx
            .await
            .map_err(|_| CloudFetchError::InvalidState("LinkFetcher dropped the refresh reply".to_string()))?
    }

    pub fn has_more(&self) -> bool {
        self.state.lock().unwrap().has_more
    }

    pub fn is_completed(&self) -> bool {
        self.state.lock().unwrap().completed
    }

    pub fn error(&self) -> Option<CloudFetchError> {
        self.state.lock().unwrap().error.clone()
    }
}

async fn run<S: ResultLinkSource>(
    mut source: S,
    pending_tx: QueueSender<PendingItem>,
    mut refresh_rx: mpsc::Receiver<RefreshRequest>,
    cancel: Arc<CancelSignal>,
    state: Arc<Mutex<SharedState>>,
) {
    if !cancel.is_cancelled() && source.has_initial_results() {
        match source.process_initial_results().await {
            Ok(descriptors) => {
                if !push_all(&pending_tx, &state, descriptors).await {
                    finish(&mut source, &state, None).await;
                    return;
                }
            }
            Err(e) => {
                let _ = pending_tx.put(PendingItem::FetcherFailed(e.clone())).await;
                finish(&mut source, &state, Some(e)).await;
                return;
            }
        }
    }

    loop {
        if cancel.is_cancelled() {
            break;
        }
        drain_refresh_requests(&mut source, &mut refresh_rx).await;
        if cancel.is_cancelled() {
            break;
        }
        if !state.lock().unwrap().has_more {
            break;
        }

        match source.fetch_next_batch().await {
            Ok(batch) => {
                let has_more = batch.has_more;
                if !push_all(&pending_tx, &state, batch.descriptors).await {
                    break;
                }
                state.lock().unwrap().has_more = has_more;
            }
            Err(e) => {
                warn!(error = %e, "result-link fetch failed terminally");
                let _ = pending_tx.put(PendingItem::FetcherFailed(e.clone())).await;
                finish(&mut source, &state, Some(e)).await;
                return;
            }
        }
    }

    {
        let mut st = state.lock().unwrap();
        st.has_more = false;
        st.completed = true;
    }

    // Refresh-only servicing: the production loop is done, but workers may
    // still need to refresh already-issued descriptors.
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            req = refresh_rx.recv() => {
                match req {
                    Some(req) => {
                        let result = source.refresh_by_index(req.chunk_index).await;
                        let _ = req.reply.send(result);
                    }
                    None => break,
                }
            }
        }
    }

    source.close().await;
}

async fn drain_refresh_requests<S: ResultLinkSource>(
    source: &mut S,
    refresh_rx: &mut mpsc::Receiver<RefreshRequest>,
) {
    while let Ok(req) = refresh_rx.try_recv() {
        let result = source.refresh_by_index(req.chunk_index).await;
        let _ = req.reply.send(result);
    }
}

/// Pushes descriptors to the pending queue, tracking `next_chunk_index`.
/// Returns `false` if the queue was closed (the downloader side has shut
/// down), signaling the caller to stop producing.
async fn push_all(
    pending_tx: &QueueSender<PendingItem>,
    state: &Arc<Mutex<SharedState>>,
    descriptors: Vec<DownloadDescriptor>,
) -> bool {
    for descriptor in descriptors {
        {
            let mut st = state.lock().unwrap();
            st.next_chunk_index = st.next_chunk_index.max(descriptor.chunk_index + 1);
        }
        debug!(chunk_index = descriptor.chunk_index, "link fetcher produced descriptor");
        if pending_tx
            .put(PendingItem::Descriptor(descriptor))
            .await
            .is_err()
        {
            return false;
        }
    }
    true
}

async fn finish<S: ResultLinkSource>(
    source: &mut S,
    state: &Arc<Mutex<SharedState>>,
    error: Option<CloudFetchError>,
) {
    {
        let mut st = state.lock().unwrap();
        st.has_more = false;
        st.completed = true;
        st.error = error;
    }
    source.close().await;
}

/// Object-safe view of [`LinkFetcher::refresh`], so the downloader workers
/// can hold an `Arc<dyn ChunkRefresher>` without being generic over `S`.
#[async_trait]
pub trait ChunkRefresher: Send + Sync {
    async fn refresh(&self, chunk_index: u64) -> Result<DownloadDescriptor, CloudFetchError>;
}

#[async_trait]
impl<S: ResultLinkSource> ChunkRefresher for LinkFetcher<S> {
    async fn refresh(&self, chunk_index: u64) -> Result<DownloadDescriptor, CloudFetchError> {
        LinkFetcher::refresh(self, chunk_index).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::queue::bounded_queue;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeSource {
        initial: Option<Vec<DownloadDescriptor>>,
        batches: VecDeque<Result<LinkBatch, CloudFetchError>>,
        refresh_responses: VecDeque<Result<DownloadDescriptor, CloudFetchError>>,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl ResultLinkSource for FakeSource {
        fn has_initial_results(&self) -> bool {
            self.initial.is_some()
        }

        async fn process_initial_results(
            &mut self,
        ) -> Result<Vec<DownloadDescriptor>, CloudFetchError> {
            Ok(self.initial.take().unwrap_or_default())
        }

        async fn fetch_next_batch(&mut self) -> Result<LinkBatch, CloudFetchError> {
            self.batches
                .pop_front()
                .unwrap_or_else(|| Ok(LinkBatch::default()))
        }

        async fn refresh_by_index(
            &mut self,
            _chunk_index: u64,
        ) -> Result<DownloadDescriptor, CloudFetchError> {
            self.refresh_responses
                .pop_front()
                .unwrap_or_else(|| Err(CloudFetchError::InvalidState("no canned response".into())))
        }

        async fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn descriptor(idx: u64) -> DownloadDescriptor {
        DownloadDescriptor::new(idx, idx * 100, 100, 1000, format!("u{idx}"), None, None)
    }

    #[tokio::test]
    async fn produces_initial_then_batches_in_order_and_completes() {
        let closed = Arc::new(AtomicBool::new(false));
        let source = FakeSource {
            initial: Some(vec![descriptor(0)]),
            batches: VecDeque::from([
                Ok(LinkBatch {
                    descriptors: vec![descriptor(1)],
                    has_more: true,
                }),
                Ok(LinkBatch {
                    descriptors: vec![],
                    has_more: false,
                }),
            ]),
            refresh_responses: VecDeque::new(),
            closed: closed.clone(),
        };
        let (tx, mut rx) = bounded_queue(8);
        let fetcher = LinkFetcher::new(source, tx);
        fetcher.start().unwrap();

        let first = rx.take().await.unwrap();
        let second = rx.take().await.unwrap();

        match (first, second) {
            (PendingItem::Descriptor(a), PendingItem::Descriptor(b)) => {
                assert_eq!(a.chunk_index, 0);
                assert_eq!(b.chunk_index, 1);
            }
            _ => panic!("expected descriptors"),
        }

        for _ in 0..50 {
            if fetcher.is_completed() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(fetcher.is_completed());
        assert!(!fetcher.has_more());
        assert!(fetcher.error().is_none());
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn double_start_is_invalid_state() {
        let source = FakeSource {
            initial: None,
            batches: VecDeque::from([Ok(LinkBatch {
                descriptors: vec![],
                has_more: false,
            })]),
            refresh_responses: VecDeque::new(),
            closed: Arc::new(AtomicBool::new(false)),
        };
        let (tx, _rx) = bounded_queue(8);
        let fetcher = LinkFetcher::new(source, tx);
        fetcher.start().unwrap();
        assert!(matches!(
            fetcher.start(),
            Err(CloudFetchError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn refresh_is_served_after_production_completes() {
        let source = FakeSource {
            initial: None,
            batches: VecDeque::from([Ok(LinkBatch {
                descriptors: vec![],
                has_more: false,
            })]),
            refresh_responses: VecDeque::from([Ok(descriptor(0))]),
            closed: Arc::new(AtomicBool::new(false)),
        };
        let (tx, _rx) = bounded_queue(8);
        let fetcher = LinkFetcher::new(source, tx);
        fetcher.start().unwrap();

        for _ in 0..50 {
            if fetcher.is_completed() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let refreshed = fetcher.refresh(0).await.unwrap();
        assert_eq!(refreshed.chunk_index, 0);
    }

    #[tokio::test]
    async fn terminal_error_is_recorded_and_sentinel_pushed() {
        let source = FakeSource {
            initial: None,
            batches: VecDeque::from([Err(CloudFetchError::UpstreamFetchFailure(
                "boom".to_string(),
            ))]),
            refresh_responses: VecDeque::new(),
            closed: Arc::new(AtomicBool::new(false)),
        };
        let (tx, mut rx) = bounded_queue(8);
        let fetcher = LinkFetcher::new(source, tx);
        fetcher.start().unwrap();

        let sentinel = rx.take().await.unwrap();
        assert!(matches!(sentinel, PendingItem::FetcherFailed(_)));

        for _ in 0..50 {
            if fetcher.is_completed() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(fetcher.error().is_some());
    }
}
