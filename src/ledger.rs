// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Ledger engine. Owns the transactions table and both balance caches.
//!
//! Every row stores `balance_after`, the account balance once the row is
//! applied in `(date, id)` order. Any structural change (insert in the past,
//! amount or date edit, delete) replays the tail of the account from the
//! *recompute anchor* — the earliest position whose `balance_after` the
//! change can invalidate — inside the same store transaction.

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use rust_decimal::Decimal;

use crate::error::{LedgerError, Result};
use crate::models::{AccountRef, LedgerRow, TxKind};
use crate::registry::{self, AccountSnapshot};
use crate::utils::{canon_amount, decimal_from_sql, fmt_datetime};

fn account_filter(account: AccountRef) -> (&'static str, i64) {
    match account {
        AccountRef::Principal(id) => ("principal_id", id),
        AccountRef::Sub(id) => ("sub_id", id),
    }
}

/// Current cached balance, read inside the caller's transaction.
pub(crate) fn cached_balance(conn: &Connection, account: AccountRef) -> Result<Decimal> {
    let sql = match account {
        AccountRef::Principal(_) => "SELECT balance FROM principal_accounts WHERE id=?1",
        AccountRef::Sub(_) => "SELECT balance FROM sub_accounts WHERE id=?1",
    };
    let s: String = conn.query_row(sql, params![account.id()], |r| r.get(0))?;
    decimal_from_sql(&s)
}

/// Insert one ledger row and replay the account tail from it. The shared
/// write path behind every primitive; runs inside an open store transaction.
#[allow(clippy::too_many_arguments)]
pub(crate) fn post(
    conn: &Connection,
    snap: &AccountSnapshot,
    kind: TxKind,
    amount: Decimal,
    description: &str,
    at: NaiveDateTime,
    reference: Option<&str>,
    external_reference: Option<&str>,
    dest: Option<AccountRef>,
    dest_label: Option<&str>,
) -> Result<i64> {
    let amount = canon_amount(amount);
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(amount.to_string()));
    }
    if !kind.is_credit() && !snap.allow_overdraft {
        let balance = cached_balance(conn, snap.account)?;
        if balance < amount {
            return Err(LedgerError::InsufficientFunds {
                account: snap.name.clone(),
                balance: balance.to_string(),
                requested: amount.to_string(),
            });
        }
    }
    let (principal_id, sub_id) = match snap.account {
        AccountRef::Principal(id) => (Some(id), None),
        AccountRef::Sub(id) => (None, Some(id)),
    };
    let (dest_principal_id, dest_sub_id) = match dest {
        Some(AccountRef::Principal(id)) => (Some(id), None),
        Some(AccountRef::Sub(id)) => (None, Some(id)),
        None => (None, None),
    };
    let date = fmt_datetime(at);
    conn.execute(
        "INSERT INTO transactions(
            user_id, kind, amount, currency, description, reference,
            external_reference, date, principal_id, sub_id,
            dest_principal_id, dest_sub_id, dest_label, balance_after)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,'0')",
        params![
            snap.user_id,
            kind.as_str(),
            amount.to_string(),
            snap.currency,
            description,
            reference,
            external_reference,
            date,
            principal_id,
            sub_id,
            dest_principal_id,
            dest_sub_id,
            dest_label,
        ],
    )?;
    let row_id = conn.last_insert_rowid();
    recompute_from(conn, snap, &date, row_id)?;
    Ok(row_id)
}

/// Replay `balance_after` for every row of the account at or after the
/// anchor, seed the running balance from the row just before it (or the
/// initial balance), and write the final value into the cache. Rejects the
/// whole edit if a no-overdraft account would go negative anywhere.
pub(crate) fn recompute_from(
    conn: &Connection,
    snap: &AccountSnapshot,
    anchor_date: &str,
    anchor_id: i64,
) -> Result<Decimal> {
    let (col, id) = account_filter(snap.account);
    let seed: Option<String> = conn
        .query_row(
            &format!(
                "SELECT balance_after FROM transactions
                 WHERE {col}=?1 AND (date < ?2 OR (date = ?2 AND id < ?3))
                 ORDER BY date DESC, id DESC LIMIT 1"
            ),
            params![id, anchor_date, anchor_id],
            |r| r.get(0),
        )
        .optional()?;
    let mut running = match seed {
        Some(s) => decimal_from_sql(&s)?,
        None => snap.initial_balance,
    };

    let mut stmt = conn.prepare(&format!(
        "SELECT id, kind, amount FROM transactions
         WHERE {col}=?1 AND (date > ?2 OR (date = ?2 AND id >= ?3))
         ORDER BY date ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![id, anchor_date, anchor_id], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
        ))
    })?;
    let mut tail = Vec::new();
    for row in rows {
        tail.push(row?);
    }
    drop(stmt);

    for (row_id, kind_s, amount_s) in tail {
        let kind = TxKind::try_from(kind_s.as_str())?;
        let amount = decimal_from_sql(&amount_s)?;
        if kind.is_credit() {
            running += amount;
        } else {
            running -= amount;
        }
        if running < Decimal::ZERO && !snap.allow_overdraft {
            return Err(LedgerError::WouldCauseNegativeBalance {
                row_id,
                balance: running.to_string(),
            });
        }
        conn.execute(
            "UPDATE transactions SET balance_after=?1 WHERE id=?2",
            params![canon_amount(running).to_string(), row_id],
        )?;
    }
    registry::write_balance(conn, snap.account, running)?;
    Ok(running)
}

// ---- primitives -----------------------------------------------------------

pub fn record_deposit(
    conn: &mut Connection,
    user_id: i64,
    account: AccountRef,
    amount: Decimal,
    description: &str,
    at: NaiveDateTime,
) -> Result<i64> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let snap = registry::load_account(&tx, user_id, account)?;
    let id = post(
        &tx,
        &snap,
        TxKind::Deposit,
        amount,
        description,
        at,
        None,
        None,
        None,
        None,
    )?;
    tx.commit()?;
    Ok(id)
}

pub fn record_withdrawal(
    conn: &mut Connection,
    user_id: i64,
    account: AccountRef,
    amount: Decimal,
    description: &str,
    at: NaiveDateTime,
) -> Result<i64> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let snap = registry::load_account(&tx, user_id, account)?;
    let id = post(
        &tx,
        &snap,
        TxKind::Withdrawal,
        amount,
        description,
        at,
        None,
        None,
        None,
        None,
    )?;
    tx.commit()?;
    Ok(id)
}

/// Credit leg of a transfer (`transfer_in`) or a cancellation recredit.
/// Runs inside the coordinator's open transaction.
#[allow(clippy::too_many_arguments)]
pub(crate) fn record_credit_leg(
    conn: &Connection,
    snap: &AccountSnapshot,
    kind: TxKind,
    amount: Decimal,
    description: &str,
    at: NaiveDateTime,
    reference: &str,
    counterpart: Option<AccountRef>,
) -> Result<i64> {
    debug_assert!(kind.is_credit());
    post(
        conn,
        snap,
        kind,
        amount,
        description,
        at,
        Some(reference),
        None,
        counterpart,
        None,
    )
}

/// Debit leg of a transfer (`transfer_out` / `transfer_external`).
#[allow(clippy::too_many_arguments)]
pub(crate) fn record_debit_leg(
    conn: &Connection,
    snap: &AccountSnapshot,
    kind: TxKind,
    amount: Decimal,
    description: &str,
    at: NaiveDateTime,
    reference: &str,
    counterpart: Option<AccountRef>,
    dest_label: Option<&str>,
) -> Result<i64> {
    debug_assert!(!kind.is_credit());
    post(
        conn,
        snap,
        kind,
        amount,
        description,
        at,
        Some(reference),
        None,
        counterpart,
        dest_label,
    )
}

// ---- reads ----------------------------------------------------------------

pub(crate) fn row_from_sql(r: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: r.get(0)?,
        user_id: r.get(1)?,
        kind: r.get(2)?,
        amount: r.get(3)?,
        currency: r.get(4)?,
        description: r.get(5)?,
        reference: r.get(6)?,
        external_reference: r.get(7)?,
        date: r.get(8)?,
        principal_id: r.get(9)?,
        sub_id: r.get(10)?,
        dest_principal_id: r.get(11)?,
        dest_sub_id: r.get(12)?,
        dest_label: r.get(13)?,
        balance_after: r.get(14)?,
        accounting_status: r.get(15)?,
    })
}

pub(crate) const ROW_COLUMNS: &str = "id, user_id, kind, amount, currency, description, reference, \
     external_reference, date, principal_id, sub_id, dest_principal_id, dest_sub_id, dest_label, \
     balance_after, accounting_status";

/// Raw SELECT image of a transactions row, before decoding.
pub(crate) struct RawRow {
    pub id: i64,
    pub user_id: i64,
    pub kind: String,
    pub amount: String,
    pub currency: String,
    pub description: String,
    pub reference: Option<String>,
    pub external_reference: Option<String>,
    pub date: String,
    pub principal_id: Option<i64>,
    pub sub_id: Option<i64>,
    pub dest_principal_id: Option<i64>,
    pub dest_sub_id: Option<i64>,
    pub dest_label: Option<String>,
    pub balance_after: String,
    pub accounting_status: Option<String>,
}

impl RawRow {
    pub fn decode(self) -> Result<LedgerRow> {
        let account = match (self.principal_id, self.sub_id) {
            (Some(id), None) => AccountRef::Principal(id),
            (None, Some(id)) => AccountRef::Sub(id),
            _ => {
                return Err(LedgerError::Conflict(format!(
                    "row {} has malformed account columns",
                    self.id
                )))
            }
        };
        let dest = match (self.dest_principal_id, self.dest_sub_id) {
            (Some(id), None) => Some(AccountRef::Principal(id)),
            (None, Some(id)) => Some(AccountRef::Sub(id)),
            _ => None,
        };
        Ok(LedgerRow {
            id: self.id,
            user_id: self.user_id,
            kind: TxKind::try_from(self.kind.as_str())?,
            amount: decimal_from_sql(&self.amount)?,
            currency: self.currency,
            description: self.description,
            reference: self.reference,
            external_reference: self.external_reference,
            date: NaiveDateTime::parse_from_str(&self.date, crate::utils::DATE_FMT)
                .map_err(|_| LedgerError::InvalidDate(self.date.clone()))?,
            account,
            dest,
            dest_label: self.dest_label,
            balance_after: decimal_from_sql(&self.balance_after)?,
            accounting_status: self.accounting_status,
        })
    }
}

pub fn get_row(conn: &Connection, user_id: i64, tx_id: i64) -> Result<LedgerRow> {
    let raw = conn
        .query_row(
            &format!("SELECT {ROW_COLUMNS} FROM transactions WHERE id=?1"),
            params![tx_id],
            row_from_sql,
        )
        .optional()?
        .ok_or_else(|| LedgerError::NotFound(format!("transaction {}", tx_id)))?;
    let row = raw.decode()?;
    if row.user_id != user_id {
        return Err(LedgerError::NotOwned(format!("transaction {}", tx_id)));
    }
    Ok(row)
}

/// Bookkeeping marker on a row (for example 'pending' or 'reconciled').
/// Orthogonal to the balance chain; the unlinked-transactions report can
/// filter on it.
pub fn set_accounting_status(
    conn: &Connection,
    user_id: i64,
    tx_id: i64,
    status: Option<&str>,
) -> Result<()> {
    get_row(conn, user_id, tx_id)?;
    conn.execute(
        "UPDATE transactions SET accounting_status=?1 WHERE id=?2",
        params![status, tx_id],
    )?;
    Ok(())
}

// ---- chronological edits --------------------------------------------------

/// Editable fields of a row. Kind and owning account are immutable; moving a
/// row between accounts is delete + recreate.
#[derive(Debug, Default, Clone)]
pub struct TxPatch {
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub reference: Option<String>,
    pub external_reference: Option<String>,
}

/// Modify a row in place and replay every `balance_after` the edit can have
/// invalidated. For internal transfer legs the amount/date/reference change
/// mirrors onto the companion leg so the pair invariant holds; for external
/// rows it mirrors onto a still-pending intent and is refused after that.
pub fn modify_transaction(
    conn: &mut Connection,
    user_id: i64,
    tx_id: i64,
    patch: &TxPatch,
) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let row = get_row(&tx, user_id, tx_id)?;
    let snap = registry::load_account(&tx, user_id, row.account)?;

    let new_amount = match patch.amount {
        Some(a) => {
            let a = canon_amount(a);
            if a <= Decimal::ZERO {
                return Err(LedgerError::InvalidAmount(a.to_string()));
            }
            a
        }
        None => row.amount,
    };
    let old_date = fmt_datetime(row.date);
    let new_date = patch.date.map(fmt_datetime).unwrap_or_else(|| old_date.clone());

    if row.kind.is_transfer_leg() {
        let reference = row.reference.clone().ok_or_else(|| {
            LedgerError::Conflict(format!("transfer leg {} has no reference", tx_id))
        })?;
        let companion = companion_leg(&tx, &reference, tx_id)?;
        let companion_snap = registry::load_account(&tx, user_id, companion.account)?;

        apply_patch(&tx, &row, patch, new_amount, &new_date)?;
        // Companion mirrors amount, date and reference; description stays its own.
        let mirror = TxPatch {
            amount: patch.amount,
            description: None,
            date: patch.date,
            reference: patch.reference.clone(),
            external_reference: None,
        };
        let companion_old_date = fmt_datetime(companion.date);
        apply_patch(&tx, &companion, &mirror, new_amount, &new_date)?;

        let (a_date, a_id) = earlier_anchor(&old_date, tx_id, &new_date, tx_id);
        recompute_from(&tx, &snap, a_date, a_id)?;
        let (b_date, b_id) =
            earlier_anchor(&companion_old_date, companion.id, &new_date, companion.id);
        recompute_from(&tx, &companion_snap, b_date, b_id)?;
    } else {
        if row.kind == TxKind::TransferExternal && (patch.amount.is_some() || patch.date.is_some())
        {
            sync_external_intent(&tx, tx_id, new_amount, &new_date)?;
        }
        apply_patch(&tx, &row, patch, new_amount, &new_date)?;
        let (a_date, a_id) = earlier_anchor(&old_date, tx_id, &new_date, tx_id);
        recompute_from(&tx, &snap, a_date, a_id)?;
    }
    tx.commit()?;
    Ok(())
}

// An external row and its intent must agree on amount: a cancellation
// recredits `intent.amount`, not the row's. While the intent is pending the
// edit carries over; once it is final the row is settled history and its
// amount and date are frozen.
fn sync_external_intent(conn: &Connection, tx_id: i64, amount: Decimal, date: &str) -> Result<()> {
    let status: Option<String> = conn
        .query_row(
            "SELECT status FROM external_transfer_intents WHERE transaction_id=?1",
            params![tx_id],
            |r| r.get(0),
        )
        .optional()?;
    match status.as_deref() {
        None => Ok(()),
        Some("pending") => {
            conn.execute(
                "UPDATE external_transfer_intents SET amount=?1, requested_at=?2
                 WHERE transaction_id=?3",
                params![amount.to_string(), date, tx_id],
            )?;
            Ok(())
        }
        Some(other) => Err(LedgerError::AlreadyFinal(other.to_string())),
    }
}

fn earlier_anchor<'a>(
    old_date: &'a str,
    old_id: i64,
    new_date: &'a str,
    new_id: i64,
) -> (&'a str, i64) {
    if (old_date, old_id) <= (new_date, new_id) {
        (old_date, old_id)
    } else {
        (new_date, new_id)
    }
}

fn apply_patch(
    conn: &Connection,
    row: &LedgerRow,
    patch: &TxPatch,
    new_amount: Decimal,
    new_date: &str,
) -> Result<()> {
    conn.execute(
        "UPDATE transactions SET amount=?1, description=?2, date=?3, reference=?4,
                external_reference=?5
         WHERE id=?6",
        params![
            new_amount.to_string(),
            patch.description.as_deref().unwrap_or(&row.description),
            new_date,
            patch
                .reference
                .as_deref()
                .or(row.reference.as_deref()),
            patch
                .external_reference
                .as_deref()
                .or(row.external_reference.as_deref()),
            row.id,
        ],
    )?;
    Ok(())
}

fn companion_leg(conn: &Connection, reference: &str, leg_id: i64) -> Result<LedgerRow> {
    let raw = conn
        .query_row(
            &format!(
                "SELECT {ROW_COLUMNS} FROM transactions
                 WHERE reference=?1 AND id != ?2
                   AND kind IN ('transfer_out','transfer_in')"
            ),
            params![reference, leg_id],
            row_from_sql,
        )
        .optional()?
        .ok_or_else(|| {
            LedgerError::Conflict(format!("transfer {} is missing its companion leg", reference))
        })?;
    raw.decode()
}

/// Delete a single row and replay the tail. Internal transfer legs are
/// refused here; the transfer coordinator removes pairs atomically.
pub fn delete_transaction(conn: &mut Connection, user_id: i64, tx_id: i64) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let row = get_row(&tx, user_id, tx_id)?;
    if row.kind.is_transfer_leg() {
        return Err(LedgerError::Conflict(format!(
            "transaction {} is an internal transfer leg; delete the transfer instead",
            tx_id
        )));
    }
    let snap = registry::load_account(&tx, user_id, row.account)?;
    let date = fmt_datetime(row.date);
    // Journal entries unlink (FK SET NULL); an external intent goes with its
    // row (FK CASCADE).
    tx.execute("DELETE FROM transactions WHERE id=?1", params![tx_id])?;
    recompute_from(&tx, &snap, &date, tx_id)?;
    tx.commit()?;
    Ok(())
}

/// Crate-internal variant used by the transfer coordinator inside its own
/// transaction: no pair policy, no commit.
pub(crate) fn delete_row_and_recompute(
    conn: &Connection,
    snap: &AccountSnapshot,
    row: &LedgerRow,
) -> Result<()> {
    let date = fmt_datetime(row.date);
    conn.execute("DELETE FROM transactions WHERE id=?1", params![row.id])?;
    recompute_from(conn, snap, &date, row.id)?;
    Ok(())
}
