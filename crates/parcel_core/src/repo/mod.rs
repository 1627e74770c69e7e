//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the parcel data access contract.
//! - Isolate SQLite statements from callers.
//!
//! # Invariants
//! - Repository writes call `Parcel::validate()` before persistence.
//! - `get` reports a semantic `NotFound` separately from storage errors.

pub mod parcel_repo;
