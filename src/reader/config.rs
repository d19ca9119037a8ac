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

//! Parses the `cloudfetch.*` configuration namespace from the flat
//! string-map configuration the driver is constructed with. Unknown keys
//! (including non-`cloudfetch.*` keys owned by other parts of the driver)
//! are ignored; a malformed recognized key fails fast at construction.

use crate::reader::error::CloudFetchError;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CloudFetchConfig {
    pub parallel_downloads: usize,
    pub prefetch_count: usize,
    pub memory_buffer_size_bytes: u64,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub max_url_refresh_attempts: u32,
    pub url_expiration_buffer: Duration,
    pub lz4_enabled: bool,
    pub heartbeat_interval: Duration,
}

impl Default for CloudFetchConfig {
    fn default() -> Self {
        Self {
            parallel_downloads: 3,
            prefetch_count: 2,
            memory_buffer_size_bytes: 200 * 1024 * 1024,
            timeout: Duration::from_secs(5 * 60),
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
            max_url_refresh_attempts: 3,
            url_expiration_buffer: Duration::from_secs(60),
            lz4_enabled: true,
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}

impl CloudFetchConfig {
    /// Bounded queue capacity, derived from `prefetch_count` per §6
    /// (`2 * prefetch_count`).
    pub fn queue_capacity(&self) -> usize {
        self.prefetch_count * 2
    }

    /// Parses the `cloudfetch.*` keys out of the driver's flat configuration
    /// map. Fails fast on a malformed recognized key or on `prefetch_count
    /// == 0`, which the source left undefined and this design rejects
    /// outright.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, CloudFetchError> {
        let mut config = Self::default();

        if let Some(v) = map.get("cloudfetch.parallel_downloads") {
            config.parallel_downloads = parse_positive_usize(v, "cloudfetch.parallel_downloads")?;
        }
        if let Some(v) = map.get("cloudfetch.prefetch_count") {
            config.prefetch_count = parse_positive_usize(v, "cloudfetch.prefetch_count")?;
        }
        if let Some(v) = map.get("cloudfetch.memory_buffer_size_mb") {
            let mb = parse_positive_u64(v, "cloudfetch.memory_buffer_size_mb")?;
            config.memory_buffer_size_bytes = mb * 1024 * 1024;
        }
        if let Some(v) = map.get("cloudfetch.timeout_minutes") {
            let minutes = parse_positive_u64(v, "cloudfetch.timeout_minutes")?;
            config.timeout = Duration::from_secs(minutes * 60);
        }
        if let Some(v) = map.get("cloudfetch.max_retries") {
            config.max_retries = parse_positive_u32(v, "cloudfetch.max_retries")?;
        }
        if let Some(v) = map.get("cloudfetch.retry_delay_ms") {
            let ms = parse_positive_u64(v, "cloudfetch.retry_delay_ms")?;
            config.retry_delay = Duration::from_millis(ms);
        }
        if let Some(v) = map.get("cloudfetch.max_url_refresh_attempts") {
            config.max_url_refresh_attempts =
                parse_positive_u32(v, "cloudfetch.max_url_refresh_attempts")?;
        }
        if let Some(v) = map.get("cloudfetch.url_expiration_buffer_seconds") {
            let secs = parse_positive_u64(v, "cloudfetch.url_expiration_buffer_seconds")?;
            config.url_expiration_buffer = Duration::from_secs(secs);
        }
        if let Some(v) = map.get("cloudfetch.heartbeat_interval_seconds") {
            let secs = parse_positive_u64(v, "cloudfetch.heartbeat_interval_seconds")?;
            config.heartbeat_interval = Duration::from_secs(secs);
        }
        if let Some(v) = map.get("cloudfetch.lz4_enabled") {
            config.lz4_enabled = v.parse::<bool>().map_err(|_| {
                CloudFetchError::InvalidConfiguration(format!(
                    "cloudfetch.lz4_enabled must be 'true' or 'false', got {v:?}"
                ))
            })?;
        }

        if config.prefetch_count == 0 {
            return Err(CloudFetchError::InvalidConfiguration(
                "cloudfetch.prefetch_count must be positive".to_string(),
            ));
        }

        Ok(config)
    }
}

fn parse_positive_usize(raw: &str, key: &str) -> Result<usize, CloudFetchError> {
    let v = parse_positive_u64(raw, key)?;
    usize::try_from(v)
        .map_err(|_| CloudFetchError::InvalidConfiguration(format!("{key} value {v} is too large")))
}

fn parse_positive_u32(raw: &str, key: &str) -> Result<u32, CloudFetchError> {
    let v = parse_positive_u64(raw, key)?;
    u32::try_from(v)
        .map_err(|_| CloudFetchError::InvalidConfiguration(format!("{key} value {v} is too large")))
}

fn parse_positive_u64(raw: &str, key: &str) -> Result<u64, CloudFetchError> {
    let value: i64 = raw.parse().map_err(|_| {
        CloudFetchError::InvalidConfiguration(format!("{key} must be an integer, got {raw:?}"))
    })?;
    if value <= 0 {
        return Err(CloudFetchError::InvalidConfiguration(format!(
            "{key} must be a positive integer, got {value}"
        )));
    }
    Ok(value as u64)
}
