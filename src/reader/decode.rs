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

//! The columnar stream decoder collaborator (§6).
//!
//! The core never inspects batch contents or makes framing decisions; it
//! hands a (possibly LZ4-decompressed) byte buffer to this collaborator and
//! forwards whatever record batches come back. No production implementation
//! — e.g. an Arrow IPC stream reader — is built here; that stays the
//! caller's responsibility, per the explicit Non-goal that the columnar
//! serialization format is an opaque byte stream.

use arrow_array::RecordBatch;
use arrow_schema::ArrowError;

/// Decodes one chunk's bytes into the record batches it contains, in order.
pub trait BatchDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<RecordBatch>, ArrowError>;
}
