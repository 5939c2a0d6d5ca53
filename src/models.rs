// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Ledger row kind. Signedness lives here: amounts are always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    Deposit,
    Withdrawal,
    TransferOut,
    TransferIn,
    TransferExternal,
    RecreditCancellation,
}

impl TxKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::TransferOut => "transfer_out",
            Self::TransferIn => "transfer_in",
            Self::TransferExternal => "transfer_external",
            Self::RecreditCancellation => "recredit_cancellation",
        }
    }

    /// Credit kinds add to the account balance, debit kinds subtract.
    pub fn is_credit(self) -> bool {
        matches!(
            self,
            Self::Deposit | Self::TransferIn | Self::RecreditCancellation
        )
    }

    /// Internal transfer legs are paired rows and managed by the coordinator.
    pub fn is_transfer_leg(self) -> bool {
        matches!(self, Self::TransferOut | Self::TransferIn)
    }
}

impl TryFrom<&str> for TxKind {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "deposit" => Ok(Self::Deposit),
            "withdrawal" => Ok(Self::Withdrawal),
            "transfer_out" => Ok(Self::TransferOut),
            "transfer_in" => Ok(Self::TransferIn),
            "transfer_external" => Ok(Self::TransferExternal),
            "recredit_cancellation" => Ok(Self::RecreditCancellation),
            other => Err(LedgerError::Conflict(format!(
                "unknown transaction kind '{}'",
                other
            ))),
        }
    }
}

/// Reference to the account a ledger row belongs to: a principal account or
/// one of its earmarked sub-accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AccountRef {
    Principal(i64),
    Sub(i64),
}

impl AccountRef {
    pub fn id(self) -> i64 {
        match self {
            Self::Principal(id) | Self::Sub(id) => id,
        }
    }

    pub fn kind_str(self) -> &'static str {
        match self {
            Self::Principal(_) => "principal",
            Self::Sub(_) => "sub",
        }
    }

    /// Composite key used by the import staging snapshot, `"<id>|<kind>"`.
    pub fn key(self) -> String {
        format!("{}|{}", self.id(), self.kind_str())
    }

    pub fn parse_key(key: &str) -> Result<Self, LedgerError> {
        let (id, kind) = key
            .split_once('|')
            .ok_or_else(|| LedgerError::NotFound(format!("bad account key '{}'", key)))?;
        let id: i64 = id
            .parse()
            .map_err(|_| LedgerError::NotFound(format!("bad account key '{}'", key)))?;
        match kind {
            "principal" => Ok(Self::Principal(id)),
            "sub" => Ok(Self::Sub(id)),
            _ => Err(LedgerError::NotFound(format!("bad account key '{}'", key))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    Pending,
    Cancelled,
    Settled,
}

impl IntentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Cancelled => "cancelled",
            Self::Settled => "settled",
        }
    }

    pub fn is_final(self) -> bool {
        matches!(self, Self::Cancelled | Self::Settled)
    }
}

impl TryFrom<&str> for IntentStatus {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "cancelled" => Ok(Self::Cancelled),
            "settled" => Ok(Self::Settled),
            other => Err(LedgerError::Conflict(format!(
                "unknown intent status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Pending,
    Validated,
    Rejected,
}

impl EntryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Validated => "validated",
            Self::Rejected => "rejected",
        }
    }

    /// Allowed moves: pending <-> validated, pending <-> rejected.
    /// Un-validating is the correction path; no state is terminal.
    pub fn can_become(self, next: EntryStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Validated)
                | (Self::Pending, Self::Rejected)
                | (Self::Validated, Self::Pending)
                | (Self::Rejected, Self::Pending)
        )
    }
}

impl TryFrom<&str> for EntryStatus {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "validated" => Ok(Self::Validated),
            "rejected" => Ok(Self::Rejected),
            other => Err(LedgerError::Conflict(format!(
                "unknown entry status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bank {
    pub id: i64,
    pub name: String,
    pub code: Option<String>,
    pub country: Option<String>,
    pub colour: Option<String>,
    pub website: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalAccount {
    pub id: i64,
    pub user_id: i64,
    pub bank_id: Option<i64>,
    pub name: String,
    pub account_number: Option<String>,
    pub iban: Option<String>,
    pub bic: Option<String>,
    pub kind: String,
    pub balance: Decimal,
    pub initial_balance: Decimal,
    pub currency: String,
    pub opening_date: Option<NaiveDate>,
    pub allow_overdraft: bool,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubAccount {
    pub id: i64,
    pub principal_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub target_amount: Option<Decimal>,
    pub balance: Decimal,
    pub colour: Option<String>,
    pub icon: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRow {
    pub id: i64,
    pub user_id: i64,
    pub kind: TxKind,
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    pub reference: Option<String>,
    pub external_reference: Option<String>,
    pub date: NaiveDateTime,
    pub account: AccountRef,
    pub dest: Option<AccountRef>,
    pub dest_label: Option<String>,
    pub balance_after: Decimal,
    pub accounting_status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalTransferIntent {
    pub id: i64,
    pub transaction_id: i64,
    pub dest_iban: String,
    pub dest_bic: Option<String>,
    pub dest_name: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: IntentStatus,
    pub requested_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalCategory {
    pub id: i64,
    pub number: i64,
    pub name: String,
    pub type_account: String,
    pub parent_id: Option<i64>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub principal_id: i64,
    pub category_id: i64,
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    pub reference: Option<String>,
    pub kind: String,
    pub tva_rate: Option<Decimal>,
    pub tva_amount: Option<Decimal>,
    pub attachment_name: Option<String>,
    pub attachment_mime: Option<String>,
    pub attachment_ref: Option<String>,
    pub status: EntryStatus,
    pub transaction_id: Option<i64>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub kind: String,
    pub colour: Option<String>,
    pub icon: Option<String>,
    pub monthly_budget: Option<Decimal>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub iban: Option<String>,
    pub note: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavouritePeriod {
    pub id: i64,
    pub user_id: i64,
    pub scope: String,
    pub account_id: i64,
    pub name: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub status: String,
}
