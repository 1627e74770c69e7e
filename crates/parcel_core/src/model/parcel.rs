//! Parcel domain model.
//!
//! # Responsibility
//! - Define the shipment record persisted in the `parcel` table.
//! - Keep status values in their persisted string form at the boundary.
//!
//! # Invariants
//! - `number` is assigned by storage on insert and never reused.
//! - `client` and `created_at` never change after creation.
//! - `created_at` is an ISO-8601 timestamp (RFC3339, or without an offset).
//! - `address` may only change while `status == ParcelStatus::Registered`.
//!
//! # See also
//! - crate::repo::parcel_repo

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage-generated parcel identifier.
pub type ParcelNumber = i64;

/// Identifier of the external client owning a parcel.
pub type ClientId = i64;

/// Persisted string for [`ParcelStatus::Registered`].
pub const PARCEL_STATUS_REGISTERED: &str = "registered";
/// Persisted string for [`ParcelStatus::Sent`].
pub const PARCEL_STATUS_SENT: &str = "sent";
/// Persisted string for [`ParcelStatus::Delivered`].
pub const PARCEL_STATUS_DELIVERED: &str = "delivered";

/// Delivery lifecycle state of a parcel.
///
/// Storage accepts any status string, so values outside the known set are
/// kept verbatim in `Other` instead of being rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParcelStatus {
    /// Accepted but not yet handed to a carrier. Address changes and
    /// deletion are allowed only in this state.
    Registered,
    /// Handed to a carrier.
    Sent,
    /// Received by the addressee.
    Delivered,
    /// Any other status written by a calling layer.
    Other(String),
}

impl ParcelStatus {
    /// Stable string used in the `status` column.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Registered => PARCEL_STATUS_REGISTERED,
            Self::Sent => PARCEL_STATUS_SENT,
            Self::Delivered => PARCEL_STATUS_DELIVERED,
            Self::Other(value) => value.as_str(),
        }
    }
}

impl From<&str> for ParcelStatus {
    fn from(value: &str) -> Self {
        match value {
            PARCEL_STATUS_REGISTERED => Self::Registered,
            PARCEL_STATUS_SENT => Self::Sent,
            PARCEL_STATUS_DELIVERED => Self::Delivered,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ParcelStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            PARCEL_STATUS_REGISTERED => Self::Registered,
            PARCEL_STATUS_SENT => Self::Sent,
            PARCEL_STATUS_DELIVERED => Self::Delivered,
            _ => Self::Other(value),
        }
    }
}

impl From<ParcelStatus> for String {
    fn from(value: ParcelStatus) -> Self {
        match value {
            ParcelStatus::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl Display for ParcelStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shipment record tracked by the parcel store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    /// Assigned by storage; ignored when inserting.
    pub number: ParcelNumber,
    pub client: ClientId,
    pub status: ParcelStatus,
    /// Free-form delivery address.
    pub address: String,
    /// ISO-8601 creation timestamp, stored verbatim.
    pub created_at: String,
}

impl Parcel {
    /// Creates a registered parcel stamped with the current UTC time.
    ///
    /// `number` stays `0` until the parcel is stored.
    pub fn new(client: ClientId, address: impl Into<String>) -> Self {
        Self::with_created_at(client, address, now_rfc3339())
    }

    /// Creates a registered parcel with a caller-provided creation time.
    ///
    /// Used by import paths and tests that need a deterministic timestamp.
    pub fn with_created_at(
        client: ClientId,
        address: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            number: 0,
            client,
            status: ParcelStatus::Registered,
            address: address.into(),
            created_at: created_at.into(),
        }
    }

    /// Checks field invariants before the parcel is written.
    ///
    /// Accepts RFC3339 and offset-less ISO-8601 date-times with either a
    /// `T` or a space separator.
    ///
    /// # Errors
    /// - `InvalidCreatedAt` when `created_at` is not an ISO-8601 date-time.
    pub fn validate(&self) -> Result<(), ParcelValidationError> {
        if !is_iso8601_date_time(&self.created_at) {
            return Err(ParcelValidationError::InvalidCreatedAt(
                self.created_at.clone(),
            ));
        }
        Ok(())
    }
}

/// Invariant violations detected by [`Parcel::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParcelValidationError {
    InvalidCreatedAt(String),
}

impl Display for ParcelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCreatedAt(value) => {
                write!(f, "created_at `{value}` is not an ISO-8601 timestamp")
            }
        }
    }
}

impl Error for ParcelValidationError {}

const NAIVE_DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

fn is_iso8601_date_time(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
        || NAIVE_DATE_TIME_FORMATS
            .iter()
            .any(|format| NaiveDateTime::parse_from_str(value, format).is_ok())
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::{Parcel, ParcelStatus, ParcelValidationError};

    #[test]
    fn status_parses_known_and_unknown_values() {
        assert_eq!(ParcelStatus::from("registered"), ParcelStatus::Registered);
        assert_eq!(ParcelStatus::from("sent"), ParcelStatus::Sent);
        assert_eq!(ParcelStatus::from("delivered"), ParcelStatus::Delivered);
        assert_eq!(
            ParcelStatus::from("lost"),
            ParcelStatus::Other("lost".to_string())
        );
        assert_eq!(ParcelStatus::from("lost").as_str(), "lost");
    }

    #[test]
    fn status_comparison_is_case_sensitive() {
        assert_eq!(
            ParcelStatus::from("Registered"),
            ParcelStatus::Other("Registered".to_string())
        );
    }

    #[test]
    fn new_parcel_is_registered_with_valid_timestamp() {
        let parcel = Parcel::new(1000, "test");
        assert_eq!(parcel.number, 0);
        assert_eq!(parcel.status, ParcelStatus::Registered);
        assert!(parcel.created_at.ends_with('Z'));
        parcel.validate().unwrap();
    }

    #[test]
    fn validate_accepts_iso8601_without_offset() {
        for created_at in [
            "2024-01-01T00:00:00",
            "2024-01-01 00:00:00",
            "2024-01-01T00:00:00.250",
            "2024-01-01T03:00:00+03:00",
        ] {
            Parcel::with_created_at(1, "test", created_at)
                .validate()
                .unwrap_or_else(|err| panic!("{created_at}: {err}"));
        }
    }

    #[test]
    fn validate_rejects_non_iso8601_created_at() {
        let parcel = Parcel::with_created_at(1, "test", "yesterday");
        assert_eq!(
            parcel.validate(),
            Err(ParcelValidationError::InvalidCreatedAt(
                "yesterday".to_string()
            ))
        );
    }
}
