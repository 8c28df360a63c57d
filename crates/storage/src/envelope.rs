//! Text encoding of the persisted progress entry.
//!
//! The entry is `{"state": {"courses": [...]}, "version": N}` so the layout
//! can evolve without guessing at old payloads.

use portal_core::model::ProgressState;
use serde::{Deserialize, Serialize};

use crate::repository::StorageError;

/// Layout version written by this build.
pub const STATE_VERSION: u32 = 0;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    state: &'a ProgressState,
    version: u32,
}

#[derive(Deserialize)]
struct Envelope {
    state: ProgressState,
    #[serde(default)]
    version: u32,
}

/// Serialize the state into its persisted text form.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if JSON encoding fails.
pub fn encode_state(state: &ProgressState) -> Result<String, StorageError> {
    serde_json::to_string(&EnvelopeRef {
        state,
        version: STATE_VERSION,
    })
    .map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Parse a persisted entry back into state.
///
/// # Errors
///
/// Returns `StorageError::Serialization` on malformed JSON, broken record
/// invariants, or an unknown layout version.
pub fn decode_state(raw: &str) -> Result<ProgressState, StorageError> {
    let envelope: Envelope =
        serde_json::from_str(raw).map_err(|e| StorageError::Serialization(e.to_string()))?;
    if envelope.version != STATE_VERSION {
        return Err(StorageError::Serialization(format!(
            "unsupported progress layout version {}",
            envelope.version
        )));
    }
    Ok(envelope.state)
}
