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

//! Owns one result set's full download pipeline: the [`LinkFetcher`], the
//! [`Downloader`] pool, and the queue and memory budget wiring between them
//! (§4.3).

use crate::reader::config::CloudFetchConfig;
use crate::reader::downloader::{Downloader, DownloadedChunk};
use crate::reader::error::CloudFetchError;
use crate::reader::http_fetcher::HttpFetcher;
use crate::reader::link_fetcher::{ChunkRefresher, LinkFetcher, ResultLinkSource};
use crate::reader::memory_budget::MemoryBudget;
use crate::reader::queue::bounded_queue;
use crate::reader::release_guard::ScopedRelease;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct DownloadManager<S: ResultLinkSource> {
    link_fetcher: Arc<LinkFetcher<S>>,
    downloader: Downloader,
    started: AtomicBool,
}

impl<S: ResultLinkSource> DownloadManager<S> {
    pub fn new(
        source: S,
        config: CloudFetchConfig,
        http: Arc<dyn HttpFetcher>,
        memory_budget: MemoryBudget,
    ) -> Self {
        let (pending_tx, pending_rx) = bounded_queue(config.queue_capacity());
        let link_fetcher = Arc::new(LinkFetcher::new(source, pending_tx));
        let refresher: Arc<dyn ChunkRefresher> = Arc::clone(&link_fetcher) as Arc<dyn ChunkRefresher>;
        let downloader = Downloader::new(config, http, refresher, memory_budget, pending_rx);
        Self {
            link_fetcher,
            downloader,
            started: AtomicBool::new(false),
        }
    }

    /// Starts both background components. Calling this twice fails with
    /// `InvalidState`; if the downloader fails to start after the link
    /// fetcher already did, the link fetcher is stopped before the error is
    /// returned, so a failed `start()` never leaves a dangling task behind.
    pub fn start(&self) -> Result<(), CloudFetchError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(CloudFetchError::InvalidState(
                "DownloadManager already started".to_string(),
            ));
        }
        self.link_fetcher.start()?;
        let link_fetcher = &self.link_fetcher;
        let guard = ScopedRelease::new(|| link_fetcher.stop());
        self.downloader.start()?;
        guard.disarm();
        Ok(())
    }

    /// Stops both components. Safe to call in any state, including before
    /// `start()` or more than once.
    pub fn stop(&self) {
        self.downloader.stop();
        self.link_fetcher.stop();
    }

    /// Returns the next downloaded chunk in chunk-index order, or `Ok(None)`
    /// at a clean end of stream. A terminal failure anywhere in the
    /// pipeline — the result-link fetch or a chunk download — surfaces here
    /// exactly once.
    pub async fn next_downloaded(&self) -> Result<Option<DownloadedChunk>, CloudFetchError> {
        match self.downloader.next_ready().await {
            Some(chunk) => Ok(Some(chunk)),
            None => match self.downloader.error().or_else(|| self.link_fetcher.error()) {
                Some(err) => Err(err),
                None => Ok(None),
            },
        }
    }
}

impl<S: ResultLinkSource> Drop for DownloadManager<S> {
    fn drop(&mut self) {
        self.stop();
    }
}
