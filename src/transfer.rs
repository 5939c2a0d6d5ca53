// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Transfer coordinator. Internal transfers are two paired ledger rows
//! sharing one opaque reference; external transfers are one debit row plus a
//! pending intent the user may still cancel.

use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use rust_decimal::Decimal;

use crate::error::{LedgerError, Result};
use crate::ledger;
use crate::models::{AccountRef, ExternalTransferIntent, IntentStatus, TxKind};
use crate::registry;
use crate::utils::{
    canon_amount, decimal_from_sql, fmt_datetime, new_reference, normalize_iban, DATE_FMT,
};

/// Outcome of an internal transfer: both leg ids and the shared reference.
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub reference: String,
    pub out_id: i64,
    pub in_id: i64,
}

/// Move funds between two of the caller's own accounts. A sub-account may
/// only face its parent principal; everything else is a scope violation.
pub fn transfer_internal(
    conn: &mut Connection,
    user_id: i64,
    source: AccountRef,
    dest: AccountRef,
    amount: Decimal,
    description: &str,
    at: NaiveDateTime,
) -> Result<TransferReceipt> {
    if source == dest {
        return Err(LedgerError::SameSourceAndDestination);
    }
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let src = registry::load_account(&tx, user_id, source)?;
    let dst = registry::load_account(&tx, user_id, dest)?;

    match (source, dest) {
        (AccountRef::Sub(_), AccountRef::Principal(pid)) if src.principal_id != pid => {
            return Err(LedgerError::SubAccountScopeViolation);
        }
        (AccountRef::Principal(pid), AccountRef::Sub(_)) if dst.principal_id != pid => {
            return Err(LedgerError::SubAccountScopeViolation);
        }
        (AccountRef::Sub(_), AccountRef::Sub(_)) => {
            return Err(LedgerError::SubAccountScopeViolation);
        }
        _ => {}
    }

    let reference = new_reference();
    let out_id = ledger::record_debit_leg(
        &tx,
        &src,
        TxKind::TransferOut,
        amount,
        description,
        at,
        &reference,
        Some(dest),
        None,
    )?;
    let in_id = ledger::record_credit_leg(
        &tx,
        &dst,
        TxKind::TransferIn,
        amount,
        description,
        at,
        &reference,
        Some(source),
    )?;
    tx.commit()?;
    Ok(TransferReceipt {
        reference,
        out_id,
        in_id,
    })
}

/// Debit the source and record a pending intent towards an IBAN, in one
/// commit. Settlement is out of scope; the intent stays pending until the
/// user cancels it.
#[allow(clippy::too_many_arguments)]
pub fn transfer_external(
    conn: &mut Connection,
    user_id: i64,
    source: AccountRef,
    iban: &str,
    bic: Option<&str>,
    dest_name: &str,
    amount: Decimal,
    description: &str,
    at: NaiveDateTime,
) -> Result<(i64, i64)> {
    let iban = normalize_iban(iban)?;
    let dest_name = dest_name.trim();
    if dest_name.is_empty() {
        return Err(LedgerError::Conflict("recipient name is required".into()));
    }
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let src = registry::load_account(&tx, user_id, source)?;
    let reference = new_reference();
    let row_id = ledger::record_debit_leg(
        &tx,
        &src,
        TxKind::TransferExternal,
        amount,
        description,
        at,
        &reference,
        None,
        Some(dest_name),
    )?;
    tx.execute(
        "INSERT INTO external_transfer_intents(
            transaction_id, dest_iban, dest_bic, dest_name, amount, currency, status, requested_at)
         VALUES (?1,?2,?3,?4,?5,?6,'pending',?7)",
        params![
            row_id,
            iban,
            bic,
            dest_name,
            canon_amount(amount).to_string(),
            src.currency,
            fmt_datetime(at),
        ],
    )?;
    let intent_id = tx.last_insert_rowid();
    tx.commit()?;
    Ok((row_id, intent_id))
}

/// Cancel a pending intent: status flips to cancelled and a
/// `recredit_cancellation` row credits the original account for the same
/// amount. Cancelling an intent already in a final state is a no-op error.
pub fn cancel_external_transfer(conn: &mut Connection, user_id: i64, intent_id: i64) -> Result<i64> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let intent = get_intent(&tx, user_id, intent_id)?;
    if intent.status.is_final() {
        return Err(LedgerError::AlreadyFinal(intent.status.as_str().to_string()));
    }
    let row = ledger::get_row(&tx, user_id, intent.transaction_id)?;
    let snap = registry::load_account(&tx, user_id, row.account)?;
    tx.execute(
        "UPDATE external_transfer_intents SET status='cancelled' WHERE id=?1",
        params![intent_id],
    )?;
    let now = Utc::now().naive_utc();
    let recredit_id = ledger::record_credit_leg(
        &tx,
        &snap,
        TxKind::RecreditCancellation,
        intent.amount,
        &format!("cancel external transfer to {}", intent.dest_name),
        now,
        row.reference.as_deref().unwrap_or(""),
        None,
    )?;
    tx.commit()?;
    Ok(recredit_id)
}

/// Delete an internal transfer given either leg: both rows go, both accounts
/// replay from their own anchors, linked journal entries unlink via FK.
pub fn delete_internal_transfer(conn: &mut Connection, user_id: i64, leg_id: i64) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let leg = ledger::get_row(&tx, user_id, leg_id)?;
    if !leg.kind.is_transfer_leg() {
        return Err(LedgerError::Conflict(format!(
            "transaction {} is not an internal transfer leg",
            leg_id
        )));
    }
    let reference = leg.reference.clone().ok_or_else(|| {
        LedgerError::Conflict(format!("transfer leg {} has no reference", leg_id))
    })?;
    let raw = tx
        .query_row(
            &format!(
                "SELECT {} FROM transactions
                 WHERE reference=?1 AND id != ?2 AND kind IN ('transfer_out','transfer_in')",
                ledger::ROW_COLUMNS
            ),
            params![reference, leg_id],
            ledger::row_from_sql,
        )
        .optional()?
        .ok_or_else(|| {
            LedgerError::Conflict(format!("transfer {} is missing its companion leg", reference))
        })?;
    let companion = raw.decode()?;

    let leg_snap = registry::load_account(&tx, user_id, leg.account)?;
    let companion_snap = registry::load_account(&tx, user_id, companion.account)?;
    ledger::delete_row_and_recompute(&tx, &leg_snap, &leg)?;
    ledger::delete_row_and_recompute(&tx, &companion_snap, &companion)?;
    tx.commit()?;
    Ok(())
}

pub fn get_intent(conn: &Connection, user_id: i64, intent_id: i64) -> Result<ExternalTransferIntent> {
    let row = conn
        .query_row(
            "SELECT i.id, i.transaction_id, i.dest_iban, i.dest_bic, i.dest_name,
                    i.amount, i.currency, i.status, i.requested_at, t.user_id
             FROM external_transfer_intents i JOIN transactions t ON i.transaction_id=t.id
             WHERE i.id=?1",
            params![intent_id],
            |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, i64>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, Option<String>>(3)?,
                    r.get::<_, String>(4)?,
                    r.get::<_, String>(5)?,
                    r.get::<_, String>(6)?,
                    r.get::<_, String>(7)?,
                    r.get::<_, String>(8)?,
                    r.get::<_, i64>(9)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| LedgerError::NotFound(format!("intent {}", intent_id)))?;
    let (id, tx_id, iban, bic, name, amount, ccy, status, requested, owner) = row;
    if owner != user_id {
        return Err(LedgerError::NotOwned(format!("intent {}", intent_id)));
    }
    Ok(ExternalTransferIntent {
        id,
        transaction_id: tx_id,
        dest_iban: iban,
        dest_bic: bic,
        dest_name: name,
        amount: decimal_from_sql(&amount)?,
        currency: ccy,
        status: IntentStatus::try_from(status.as_str())?,
        requested_at: NaiveDateTime::parse_from_str(&requested, DATE_FMT)
            .map_err(|_| LedgerError::InvalidDate(requested.clone()))?,
    })
}

pub fn list_intents(conn: &Connection, user_id: i64) -> Result<Vec<ExternalTransferIntent>> {
    let mut stmt = conn.prepare(
        "SELECT i.id FROM external_transfer_intents i
         JOIN transactions t ON i.transaction_id=t.id
         WHERE t.user_id=?1 ORDER BY i.requested_at DESC, i.id DESC",
    )?;
    let ids = stmt.query_map(params![user_id], |r| r.get::<_, i64>(0))?;
    let mut out = Vec::new();
    for id in ids {
        out.push(get_intent(conn, user_id, id?)?);
    }
    Ok(out)
}
