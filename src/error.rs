// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::ffi::ErrorCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Domain errors of the ledger core. SQLite errors fold into the nearest
/// domain kind where the mapping is unambiguous, `Db` otherwise.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("not owned by this user: {0}")]
    NotOwned(String),

    #[error("invalid amount '{0}'")]
    InvalidAmount(String),

    #[error("invalid date '{0}'")]
    InvalidDate(String),

    #[error("invalid IBAN '{0}'")]
    InvalidIban(String),

    #[error("insufficient funds on '{account}': balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: String,
        balance: String,
        requested: String,
    },

    #[error("edit would drive the balance to {balance} at row {row_id}")]
    WouldCauseNegativeBalance { row_id: i64, balance: String },

    #[error("sub-account transfers must stay within their principal account")]
    SubAccountScopeViolation,

    #[error("source and destination are the same account")]
    SameSourceAndDestination,

    #[error("linked entries {linked} + {entry} would exceed transaction amount {transaction}")]
    LinkWouldExceedTransaction {
        linked: String,
        entry: String,
        transaction: String,
    },

    #[error("already in final state '{0}'")]
    AlreadyFinal(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("timed out waiting for the store lock")]
    Timeout,

    #[error("row {row_index}: {message}")]
    ImportRowError { row_index: usize, message: String },

    #[error("database error: {0}")]
    Db(rusqlite::Error),
}

impl LedgerError {
    /// Stable machine-readable tag, used in import summaries and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::NotOwned(_) => "not_owned",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::InvalidDate(_) => "invalid_date",
            Self::InvalidIban(_) => "invalid_iban",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::WouldCauseNegativeBalance { .. } => "would_cause_negative_balance",
            Self::SubAccountScopeViolation => "sub_account_scope_violation",
            Self::SameSourceAndDestination => "same_source_and_destination",
            Self::LinkWouldExceedTransaction { .. } => "link_would_exceed_transaction",
            Self::AlreadyFinal(_) => "already_final",
            Self::Conflict(_) => "conflict",
            Self::Timeout => "timeout",
            Self::ImportRowError { .. } => "import_row_error",
            Self::Db(_) => "db",
        }
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::QueryReturnedNoRows => Self::NotFound("row".into()),
            rusqlite::Error::SqliteFailure(err, msg) => match err.code {
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => Self::Timeout,
                ErrorCode::ConstraintViolation => {
                    Self::Conflict(msg.clone().unwrap_or_else(|| "constraint violation".into()))
                }
                _ => Self::Db(e),
            },
            _ => Self::Db(e),
        }
    }
}
