//! Storage for sealed records.
//!
//! The store only ever sees ciphertext: records arrive already sealed and
//! leave unopened. Nothing here touches `crate::crypto` or `crate::keys`.

pub mod records;

pub use records::{RecordStore, StoreError};
