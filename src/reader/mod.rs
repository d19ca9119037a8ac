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

//! The CloudFetch result-retrieval pipeline.
//!
//! [`CompositeReader`] is the entry point: it picks between the
//! [`CloudFetchReader`] path (results stored as external cloud-storage
//! links) and the [`InlineReader`] path (results sent directly in the
//! server response) based on the initial query response, and keeps the
//! server-side operation alive with a heartbeat while either is in use.
//!
//! The wire protocol and SQL execution themselves are out of scope here;
//! [`SqlSession`] is the seam a real client implementation plugs into, with
//! [`RpcResultLinkSource`] and [`RestResultLinkSource`] adapting its two
//! supported protocol flavors onto the shared [`LinkFetcher`] driving loop.

pub mod cancel;
pub mod cloudfetch;
pub mod composite;
pub mod config;
pub mod decode;
pub mod descriptor;
pub mod downloader;
pub mod error;
pub mod http_fetcher;
pub mod inline;
pub mod link_fetcher;
pub mod manager;
pub mod memory_budget;
pub mod queue;
pub mod release_guard;
pub mod reorder;
pub mod rest_link_fetcher;
pub mod rpc_link_fetcher;
pub mod session;

pub use cloudfetch::CloudFetchReader;
pub use composite::CompositeReader;
pub use config::CloudFetchConfig;
pub use decode::BatchDecoder;
pub use descriptor::{ChunkState, DownloadDescriptor};
pub use downloader::{Downloader, DownloadedChunk};
pub use error::CloudFetchError;
pub use http_fetcher::{HttpError, HttpErrorKind, HttpFetcher, ReqwestHttpFetcher};
pub use inline::InlineReader;
pub use link_fetcher::{ChunkRefresher, LinkBatch, LinkFetcher, PendingItem, ResultLinkSource};
pub use manager::DownloadManager;
pub use memory_budget::{BudgetReservation, MemoryBudget};
pub use queue::{bounded_queue, QueueReceiver, QueueSender};
pub use rest_link_fetcher::RestResultLinkSource;
pub use rpc_link_fetcher::RpcResultLinkSource;
pub use session::{
    FetchResponse, InitialResponse, InlineBatch, LinkRecord, OperationHandle, OperationStatus,
    RefreshSelector, SqlSession,
};
