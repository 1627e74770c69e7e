//! Parcel tracking storage core.
//! Owns the `parcel` table and the guarded state transitions on it.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::parcel::{
    ClientId, Parcel, ParcelNumber, ParcelStatus, ParcelValidationError,
    PARCEL_STATUS_DELIVERED, PARCEL_STATUS_REGISTERED, PARCEL_STATUS_SENT,
};
pub use repo::parcel_repo::{ParcelRepository, RepoError, RepoResult, SqliteParcelRepository};
