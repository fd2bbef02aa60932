//! Shared application state injected into every Axum handler.

use crate::crypto::Envelope;
use crate::store::RecordStore;

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable (`Arc`-backed) so that Axum can clone the
/// state for each request without copying expensive data.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Seal/open engine holding the master key provider.
    pub envelope: Envelope,
    /// Sealed records keyed by id.
    pub records: RecordStore,
}

impl AppState {
    /// Create a new [`AppState`] from an envelope engine and a record store.
    pub fn new(envelope: Envelope, records: RecordStore) -> Self {
        Self { envelope, records }
    }
}
