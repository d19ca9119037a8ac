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

//! CloudFetch reader for downloading results from cloud storage (§4.4).
//!
//! Drives a [`DownloadManager`] to completion, LZ4-decompressing each
//! chunk's payload when the server marked the result set compressed and
//! `cloudfetch.lz4_enabled` is set, then hands the (possibly decompressed)
//! bytes to a [`BatchDecoder`] collaborator. A chunk's memory reservation is
//! released as soon as this reader is done with it, when the downloaded
//! chunk value is dropped at the end of `next_batches`.

use crate::reader::config::CloudFetchConfig;
use crate::reader::decode::BatchDecoder;
use crate::reader::error::CloudFetchError;
use crate::reader::link_fetcher::ResultLinkSource;
use crate::reader::manager::DownloadManager;
use arrow_array::RecordBatch;
use bytes::Bytes;
use lz4_flex::frame::FrameDecoder;
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

/// Streams record batches for a result set whose rows are stored as
/// external cloud-storage links.
pub struct CloudFetchReader<S: ResultLinkSource> {
    manager: DownloadManager<S>,
    decoder: Arc<dyn BatchDecoder>,
    lz4_enabled: bool,
    is_lz4_compressed: bool,
    finished: bool,
}

impl<S: ResultLinkSource> CloudFetchReader<S> {
    pub fn new(
        manager: DownloadManager<S>,
        decoder: Arc<dyn BatchDecoder>,
        config: &CloudFetchConfig,
        is_lz4_compressed: bool,
    ) -> Self {
        Self {
            manager,
            decoder,
            lz4_enabled: config.lz4_enabled,
            is_lz4_compressed,
            finished: false,
        }
    }

    pub fn start(&self) -> Result<(), CloudFetchError> {
        self.manager.start()
    }

    pub fn stop(&self) {
        self.manager.stop();
    }

    /// Returns the next chunk's decoded record batches, or `None` at end of
    /// stream. Once `None` or an error has been returned, every subsequent
    /// call returns `None` without touching the pipeline again.
    pub async fn next_batches(&mut self) -> Result<Option<Vec<RecordBatch>>, CloudFetchError> {
        if self.finished {
            return Ok(None);
        }

        let chunk = match self.manager.next_downloaded().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => {
                self.finished = true;
                return Ok(None);
            }
            Err(e) => {
                self.finished = true;
                return Err(e);
            }
        };

        let chunk_index = chunk.chunk_index();
        let raw = chunk.descriptor.payload.clone().ok_or_else(|| {
            CloudFetchError::Decode {
                chunk_index,
                lz4_enabled: self.effective_lz4(),
                message: "downloaded chunk has no payload".to_string(),
            }
        })?;

        let bytes = if self.effective_lz4() {
            decompress_lz4(&raw, chunk_index)?
        } else {
            raw
        };

        let batches = self.decoder.decode(&bytes).map_err(|e| CloudFetchError::Decode {
            chunk_index,
            lz4_enabled: self.effective_lz4(),
            message: e.to_string(),
        })?;

        debug!(chunk_index, batch_count = batches.len(), "chunk decoded");
        // `chunk` is dropped here, releasing its memory budget reservation.
        Ok(Some(batches))
    }

    fn effective_lz4(&self) -> bool {
        self.is_lz4_compressed && self.lz4_enabled
    }
}

fn decompress_lz4(payload: &Bytes, chunk_index: u64) -> Result<Bytes, CloudFetchError> {
    let mut decoder = FrameDecoder::new(payload.as_ref());
    let mut out = Vec::with_capacity(payload.len());
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CloudFetchError::Decompression {
            chunk_index,
            message: e.to_string(),
        })?;
    Ok(Bytes::from(out))
}
