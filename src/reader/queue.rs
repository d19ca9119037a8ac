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

//! A blocking, closable, fixed-capacity FIFO queue.
//!
//! Used for the pending-to-download transfer (fetcher -> downloader
//! workers). It is a thin wrapper over `tokio::sync::mpsc`: it does not
//! attempt to preserve cross-producer ordering on its own — per §9, ordering
//! across concurrent workers is the job of `ChunkReorderBuffer`, not the
//! queue.

use tokio::sync::mpsc;

/// Producer half. Cheaply cloneable; each downloader worker and the
/// LinkFetcher's error-sentinel path hold one.
#[derive(Debug, Clone)]
pub struct QueueSender<T> {
    inner: mpsc::Sender<T>,
}

/// Consumer half. Not cloneable — exactly one reader per queue, matching the
/// single-consumer-task invariant in §5.
#[derive(Debug)]
pub struct QueueReceiver<T> {
    inner: mpsc::Receiver<T>,
}

/// Returned when a `put` targets a queue whose receiver has been closed or
/// dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueClosed;

/// Creates a bounded queue with the given capacity, returning the producer
/// and consumer halves.
pub fn bounded_queue<T>(capacity: usize) -> (QueueSender<T>, QueueReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (QueueSender { inner: tx }, QueueReceiver { inner: rx })
}

impl<T> QueueSender<T> {
    /// Blocks until there is capacity, then enqueues `item`. Returns
    /// `QueueClosed` if the receiver has already been closed or dropped.
    pub async fn put(&self, item: T) -> Result<(), QueueClosed> {
        self.inner.send(item).await.map_err(|_| QueueClosed)
    }
}

impl<T> QueueReceiver<T> {
    /// Blocks until an item is available or the queue is closed and
    /// drained, in which case `None` is returned.
    pub async fn take(&mut self) -> Option<T> {
        self.inner.recv().await
    }

    /// Closes the queue: no further `put`s succeed, but items already
    /// enqueued are still delivered by subsequent `take` calls until
    /// drained.
    pub fn close(&mut self) {
        self.inner.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_take_round_trips() {
        let (tx, mut rx) = bounded_queue::<u32>(2);
        tx.put(7).await.unwrap();
        assert_eq!(rx.take().await, Some(7));
    }

    #[tokio::test]
    async fn closed_queue_drains_then_returns_none() {
        let (tx, mut rx) = bounded_queue::<u32>(4);
        tx.put(1).await.unwrap();
        tx.put(2).await.unwrap();
        rx.close();
        assert!(tx.put(3).await.is_err());
        assert_eq!(rx.take().await, Some(1));
        assert_eq!(rx.take().await, Some(2));
        assert_eq!(rx.take().await, None);
    }

    #[tokio::test]
    async fn dropping_all_senders_closes_the_queue() {
        let (tx, mut rx) = bounded_queue::<u32>(1);
        drop(tx);
        assert_eq!(rx.take().await, None);
    }

    #[tokio::test]
    async fn capacity_applies_back_pressure() {
        let (tx, mut rx) = bounded_queue::<u32>(1);
        tx.put(1).await.unwrap();
        let tx2 = tx.clone();
        let blocked = tokio::spawn(async move { tx2.put(2).await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!blocked.is_finished());
        assert_eq!(rx.take().await, Some(1));
        blocked.await.unwrap().unwrap();
        assert_eq!(rx.take().await, Some(2));
    }
}
