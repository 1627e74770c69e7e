//! Parcel repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Translate parcel CRUD use-cases into parameterized statements.
//! - Map `parcel` rows to and from [`Parcel`].
//!
//! # Invariants
//! - Address changes and deletes carry the `status = 'registered'` guard in
//!   the statement itself, so the check and the write are one atomic step.
//! - Guarded and unguarded writes that match zero rows still return `Ok(())`;
//!   callers re-read with `get` to confirm the effect.
//! - Rows are returned as stored; only driver type mismatches fail a read.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::parcel::{
    ClientId, Parcel, ParcelNumber, ParcelStatus, ParcelValidationError,
    PARCEL_STATUS_REGISTERED,
};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const PARCEL_TABLE: &str = "parcel";
const PARCEL_COLUMNS: [&str; 5] = ["number", "client", "status", "address", "created_at"];

const PARCEL_SELECT_SQL: &str = "SELECT
    number,
    client,
    status,
    address,
    created_at
FROM parcel";

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for parcel persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// No parcel row has the requested number. Only raised by `get`.
    NotFound(ParcelNumber),
    /// Driver or I/O failure, including constraint violations and column
    /// type mismatches while mapping a row.
    Db(DbError),
    /// Parcel rejected before reaching storage.
    Validation(ParcelValidationError),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(number) => write!(f, "parcel with number {number} not found"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "parcel repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "parcel repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::NotFound(_)
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ParcelValidationError> for RepoError {
    fn from(value: ParcelValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Repository interface for parcel CRUD operations.
pub trait ParcelRepository {
    /// Stores a new parcel and returns its generated number.
    ///
    /// `parcel.number` is ignored.
    fn add(&self, parcel: &Parcel) -> RepoResult<ParcelNumber>;
    /// Loads one parcel; `RepoError::NotFound` when the number is unknown.
    fn get(&self, number: ParcelNumber) -> RepoResult<Parcel>;
    /// Loads every parcel of a client, in no particular order.
    fn get_by_client(&self, client: ClientId) -> RepoResult<Vec<Parcel>>;
    /// Overwrites the status. Unknown numbers are a silent no-op.
    fn set_status(&self, number: ParcelNumber, status: &ParcelStatus) -> RepoResult<()>;
    /// Overwrites the address while the parcel is still registered.
    ///
    /// A non-registered or missing parcel is left untouched without error.
    fn set_address(&self, number: ParcelNumber, address: &str) -> RepoResult<()>;
    /// Removes the parcel while it is still registered.
    ///
    /// A non-registered or missing parcel is left untouched without error.
    fn delete(&self, number: ParcelNumber) -> RepoResult<()>;
}

/// SQLite-backed parcel repository.
pub struct SqliteParcelRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteParcelRepository<'conn> {
    /// Constructs a repository over a connection holding a `parcel` table.
    ///
    /// The table may come from `open_db*` or from any external schema
    /// tool; only its shape is checked.
    ///
    /// # Errors
    /// - `Db(UnsupportedSchemaVersion)` when the database was migrated by a
    ///   newer build.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the `parcel`
    ///   table does not have the expected shape.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_parcel_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ParcelRepository for SqliteParcelRepository<'_> {
    fn add(&self, parcel: &Parcel) -> RepoResult<ParcelNumber> {
        parcel.validate()?;

        self.conn.execute(
            "INSERT INTO parcel (client, status, address, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                parcel.client,
                parcel.status.as_str(),
                parcel.address.as_str(),
                parcel.created_at.as_str(),
            ],
        )?;
        let number = self.conn.last_insert_rowid();

        debug!(
            "event=parcel_add module=repo status=ok number={number} client={}",
            parcel.client
        );
        Ok(number)
    }

    fn get(&self, number: ParcelNumber) -> RepoResult<Parcel> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PARCEL_SELECT_SQL} WHERE number = ?1;"))?;

        let mut rows = stmt.query([number])?;
        match rows.next()? {
            Some(row) => parse_parcel_row(row),
            None => Err(RepoError::NotFound(number)),
        }
    }

    fn get_by_client(&self, client: ClientId) -> RepoResult<Vec<Parcel>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PARCEL_SELECT_SQL} WHERE client = ?1;"))?;

        let mut rows = stmt.query([client])?;
        let mut parcels = Vec::new();
        while let Some(row) = rows.next()? {
            parcels.push(parse_parcel_row(row)?);
        }

        Ok(parcels)
    }

    fn set_status(&self, number: ParcelNumber, status: &ParcelStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE parcel SET status = ?1 WHERE number = ?2;",
            params![status.as_str(), number],
        )?;

        log_write_outcome("parcel_set_status", number, changed);
        Ok(())
    }

    fn set_address(&self, number: ParcelNumber, address: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE parcel SET address = ?1 WHERE number = ?2 AND status = ?3;",
            params![address, number, PARCEL_STATUS_REGISTERED],
        )?;

        log_write_outcome("parcel_set_address", number, changed);
        Ok(())
    }

    fn delete(&self, number: ParcelNumber) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM parcel WHERE number = ?1 AND status = ?2;",
            params![number, PARCEL_STATUS_REGISTERED],
        )?;

        log_write_outcome("parcel_delete", number, changed);
        Ok(())
    }
}

fn log_write_outcome(event: &str, number: ParcelNumber, changed: usize) {
    if changed == 0 {
        debug!("event={event} module=repo status=skipped number={number} rows_affected=0");
    } else {
        debug!("event={event} module=repo status=ok number={number} rows_affected={changed}");
    }
}

fn parse_parcel_row(row: &Row<'_>) -> RepoResult<Parcel> {
    Ok(Parcel {
        number: row.get("number")?,
        client: row.get("client")?,
        status: ParcelStatus::from(row.get::<_, String>("status")?),
        address: row.get("address")?,
        created_at: row.get("created_at")?,
    })
}

fn ensure_parcel_connection_ready(conn: &Connection) -> RepoResult<()> {
    // Externally created schemas report version 0; only newer ones are refused.
    let latest_supported = latest_version();
    let db_version = current_user_version(conn)?;
    if db_version > latest_supported {
        return Err(RepoError::Db(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        }));
    }

    if !table_exists(conn, PARCEL_TABLE)? {
        return Err(RepoError::MissingRequiredTable(PARCEL_TABLE));
    }

    for column in PARCEL_COLUMNS {
        if !table_has_column(conn, PARCEL_TABLE, column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: PARCEL_TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1;",
            [table],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(exists.is_some())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get("name")?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
