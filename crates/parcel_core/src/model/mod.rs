//! Domain model for parcel tracking.
//!
//! # Responsibility
//! - Define canonical data structures shared by storage and callers.
//!
//! # Invariants
//! - Every parcel is identified by a storage-assigned `ParcelNumber`.
//! - Deletion is physical; there is no tombstone state.

pub mod parcel;
