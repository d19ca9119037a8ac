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

//! A byte-counting semaphore bounding the total size of downloaded-but-unread
//! chunks in flight.

use crate::reader::error::CloudFetchError;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting semaphore measured in bytes rather than permits.
///
/// `0 <= available_bytes <= capacity_bytes` always holds; reservations are
/// exact, there is no over-commit. Built on `tokio::sync::Semaphore` per the
/// guidance to avoid a mutexed integer counter that would admit a race
/// between checking and reserving.
#[derive(Debug, Clone)]
pub struct MemoryBudget {
    capacity_bytes: u64,
    semaphore: Arc<Semaphore>,
}

/// RAII guard for a reservation. Releasing the budget is done by dropping
/// this guard, never by a separate explicit call, so every exit path —
/// normal or panicking — gives the bytes back. Owns its permit (rather than
/// borrowing the budget) so it can travel with a downloaded chunk through
/// the reorder buffer and into the reader, released only once the reader
/// drops the chunk after decoding it.
#[derive(Debug)]
pub struct BudgetReservation {
    _permit: OwnedSemaphorePermit,
    bytes: u64,
}

impl BudgetReservation {
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

const MAX_SINGLE_RESERVATION: u64 = u32::MAX as u64;

impl MemoryBudget {
    /// Creates a budget with the given byte capacity. `capacity_bytes` must
    /// fit in a `u32` because `tokio::sync::Semaphore` counts permits as
    /// `usize`/`u32`-sized; a multi-gigabyte-per-chunk budget is not a
    /// realistic CloudFetch configuration.
    pub fn new(capacity_bytes: u64) -> Self {
        let permits = capacity_bytes.min(MAX_SINGLE_RESERVATION) as usize;
        Self {
            capacity_bytes,
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    /// Bytes currently available to reserve.
    pub fn available_bytes(&self) -> u64 {
        self.semaphore.available_permits() as u64
    }

    /// Reserves `bytes` from the budget, blocking (asynchronously) until
    /// enough capacity is released by other holders.
    ///
    /// Returns `BudgetExhaustedConfiguration` immediately, without waiting,
    /// if `bytes` alone exceeds the entire budget capacity — this indicates
    /// a configuration error, not transient pressure.
    pub async fn reserve(&self, bytes: u64) -> Result<BudgetReservation, CloudFetchError> {
        if bytes > self.capacity_bytes {
            return Err(CloudFetchError::BudgetExhaustedConfiguration {
                chunk_bytes: bytes,
                capacity_bytes: self.capacity_bytes,
            });
        }
        // Capacity was already validated against u64 capacity_bytes above;
        // the cast to u32 here cannot overflow since bytes <= capacity_bytes
        // <= MAX_SINGLE_RESERVATION.
        let permits = bytes as u32;
        let acquired = Arc::clone(&self.semaphore)
            .acquire_many_owned(permits)
            .await
            .expect("MemoryBudget semaphore is never closed");
        Ok(BudgetReservation {
            _permit: acquired,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reserve_and_release_restores_availability() {
        let budget = MemoryBudget::new(1000);
        {
            let _r = budget.reserve(400).await.unwrap();
            assert_eq!(budget.available_bytes(), 600);
        }
        assert_eq!(budget.available_bytes(), 1000);
    }

    #[tokio::test]
    async fn oversized_reservation_is_fatal_configuration_error() {
        let budget = MemoryBudget::new(1000);
        let err = budget.reserve(1001).await.unwrap_err();
        assert!(matches!(
            err,
            CloudFetchError::BudgetExhaustedConfiguration { .. }
        ));
        // No I/O was attempted and no capacity was consumed.
        assert_eq!(budget.available_bytes(), 1000);
    }

    #[tokio::test]
    async fn concurrent_reservations_never_exceed_capacity() {
        let budget = MemoryBudget::new(100);
        let r1 = budget.reserve(40).await.unwrap();
        let r2 = budget.reserve(40).await.unwrap();
        assert_eq!(budget.available_bytes(), 20);
        // A third 40-byte reservation cannot be granted without a release;
        // prove it doesn't complete by racing it against a timeout.
        let third = tokio::time::timeout(std::time::Duration::from_millis(50), budget.reserve(40));
        assert!(third.await.is_err());
        drop(r1);
        drop(r2);
        assert_eq!(budget.available_bytes(), 100);
    }
}
