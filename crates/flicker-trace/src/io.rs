// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JSON trace decoding with provenance.
//!
//! Trace documents have the shape `{"entries": [...]}`. Decoding validates
//! timestamp order and, when a path is known, attaches a [`TraceSource`]
//! carrying a BLAKE3 checksum of the exact bytes that were parsed.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::trace::{RawTrace, Trace, TraceEntry, TraceError, TraceSource};

/// Lowercase hex BLAKE3 digest of `bytes`.
#[must_use]
pub fn checksum_hex(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}

/// Decodes a trace document, attaching provenance when `path` is given.
pub fn decode_trace<E>(bytes: &[u8], path: Option<&Path>) -> Result<Trace<E>, TraceError>
where
    E: TraceEntry + DeserializeOwned,
{
    let raw: RawTrace<E> =
        serde_json::from_slice(bytes).map_err(|e| TraceError::Decode(e.to_string()))?;
    let trace = Trace::new(raw.entries)?;
    Ok(match path {
        Some(path) => trace.with_source(TraceSource {
            path: path.to_path_buf(),
            checksum: checksum_hex(bytes),
        }),
        None => trace,
    })
}

/// Reads and decodes the trace file at `path`.
pub fn read_trace<E>(path: &Path) -> Result<Trace<E>, TraceError>
where
    E: TraceEntry + DeserializeOwned,
{
    let bytes = std::fs::read(path).map_err(|e| TraceError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    decode_trace(&bytes, Some(path))
}
