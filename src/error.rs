use thiserror::Error;

use crate::columns::Role;

/// Errors raised by the dashboard core and its web surface
///
/// Every variant is recovered at the boundary of the view that triggered it;
/// none of them is meant to take the server down.
#[derive(Debug, Error)]
pub enum FleetError {
    /// The backing database could not be opened, read or written
    #[error("record store unavailable: {0}")]
    StoreUnavailable(String),

    /// A semantic column required by a computation is absent from the data
    #[error("'{}' column not found in data", .0.label())]
    ColumnUnresolved(Role),

    /// An uploaded file could not be parsed as tabular data
    #[error("import failed: {0}")]
    ImportParseFailure(String),

    /// Username/password pair did not match a configured account
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The signed-in role may not reach the requested page
    #[error("access denied: admin only")]
    AccessDenied,

    #[error("no record with id {0}")]
    RecordNotFound(i64),

    /// A submitted grid form could not be turned back into records
    #[error("invalid grid edit: {0}")]
    InvalidGridEdit(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("chart rendering failed: {0}")]
    Chart(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("credential setup failed: {0}")]
    CredentialSetup(String),
}

pub type Result<T> = std::result::Result<T, FleetError>;

impl From<rusqlite::Error> for FleetError {
    fn from(err: rusqlite::Error) -> Self {
        FleetError::StoreUnavailable(err.to_string())
    }
}

impl From<csv::Error> for FleetError {
    fn from(err: csv::Error) -> Self {
        FleetError::ImportParseFailure(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for FleetError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        FleetError::Export(err.to_string())
    }
}
