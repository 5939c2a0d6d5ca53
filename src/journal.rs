// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Accounting journal: a hierarchical category plan and single-sided entries
//! that may be linked to ledger rows. The link-sum invariant caps the total
//! of linked entry amounts at the transaction amount.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use rust_decimal::Decimal;

use crate::error::{LedgerError, Result};
use crate::ledger;
use crate::models::{AccountRef, EntryStatus, JournalCategory, JournalEntry};
use crate::registry;
use crate::utils::{canon_amount, decimal_from_sql};

// ---- category plan --------------------------------------------------------

pub fn create_category(
    conn: &Connection,
    number: i64,
    name: &str,
    type_account: &str,
    parent_id: Option<i64>,
) -> Result<i64> {
    if !matches!(type_account, "asset" | "liability" | "charge" | "revenue") {
        return Err(LedgerError::Conflict(format!(
            "unknown account type '{}'",
            type_account
        )));
    }
    if let Some(pid) = parent_id {
        get_category(conn, pid)?;
    }
    conn.execute(
        "INSERT INTO journal_categories(number, name, type_account, parent_id) VALUES (?1,?2,?3,?4)",
        params![number, name, type_account, parent_id],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_category(conn: &Connection, id: i64) -> Result<JournalCategory> {
    conn.query_row(
        "SELECT id, number, name, type_account, parent_id, active
         FROM journal_categories WHERE id=?1 AND active=1",
        params![id],
        |r| {
            Ok(JournalCategory {
                id: r.get(0)?,
                number: r.get(1)?,
                name: r.get(2)?,
                type_account: r.get(3)?,
                parent_id: r.get(4)?,
                active: r.get(5)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| LedgerError::NotFound(format!("journal category {}", id)))
}

pub fn deactivate_category(conn: &Connection, id: i64) -> Result<()> {
    let children: i64 = conn.query_row(
        "SELECT COUNT(*) FROM journal_categories WHERE parent_id=?1 AND active=1",
        params![id],
        |r| r.get(0),
    )?;
    if children > 0 {
        return Err(LedgerError::Conflict(format!(
            "category {} still has {} active child categories",
            id, children
        )));
    }
    let n = conn.execute(
        "UPDATE journal_categories SET active=0 WHERE id=?1 AND active=1",
        params![id],
    )?;
    if n == 0 {
        return Err(LedgerError::NotFound(format!("journal category {}", id)));
    }
    Ok(())
}

pub fn list_categories(conn: &Connection) -> Result<Vec<JournalCategory>> {
    let mut stmt = conn.prepare(
        "SELECT id, number, name, type_account, parent_id, active
         FROM journal_categories WHERE active=1 ORDER BY number",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(JournalCategory {
            id: r.get(0)?,
            number: r.get(1)?,
            name: r.get(2)?,
            type_account: r.get(3)?,
            parent_id: r.get(4)?,
            active: r.get(5)?,
        })
    })?;
    let mut out = Vec::new();
    for c in rows {
        out.push(c?);
    }
    Ok(out)
}

// ---- entries --------------------------------------------------------------

pub struct NewEntry<'a> {
    pub date: NaiveDate,
    pub principal_id: i64,
    pub category_id: i64,
    pub amount: Decimal,
    pub description: &'a str,
    pub reference: Option<&'a str>,
    pub kind: &'a str,
    pub tva_rate: Option<Decimal>,
    pub tva_amount: Option<Decimal>,
}

pub fn create_entry(conn: &Connection, user_id: i64, e: &NewEntry) -> Result<i64> {
    let amount = canon_amount(e.amount);
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(amount.to_string()));
    }
    if !matches!(e.kind, "expense" | "revenue") {
        return Err(LedgerError::Conflict(format!("unknown entry kind '{}'", e.kind)));
    }
    let snap = registry::load_account(conn, user_id, AccountRef::Principal(e.principal_id))?;
    get_category(conn, e.category_id)?;
    conn.execute(
        "INSERT INTO journal_entries(
            user_id, date, principal_id, category_id, amount, currency,
            description, reference, kind, tva_rate, tva_amount)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
        params![
            user_id,
            e.date.to_string(),
            e.principal_id,
            e.category_id,
            amount.to_string(),
            snap.currency,
            e.description,
            e.reference,
            e.kind,
            e.tva_rate.map(|d| d.to_string()),
            e.tva_amount.map(|d| canon_amount(d).to_string()),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_entry(conn: &Connection, user_id: i64, id: i64) -> Result<JournalEntry> {
    let row = conn
        .query_row(
            "SELECT id, user_id, date, principal_id, category_id, amount, currency,
                    description, reference, kind, tva_rate, tva_amount,
                    attachment_name, attachment_mime, attachment_ref,
                    status, transaction_id, active
             FROM journal_entries WHERE id=?1",
            params![id],
            |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, i64>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, i64>(3)?,
                    r.get::<_, i64>(4)?,
                    r.get::<_, String>(5)?,
                    r.get::<_, String>(6)?,
                    r.get::<_, String>(7)?,
                    r.get::<_, Option<String>>(8)?,
                    r.get::<_, String>(9)?,
                    r.get::<_, Option<String>>(10)?,
                    r.get::<_, Option<String>>(11)?,
                    r.get::<_, Option<String>>(12)?,
                    r.get::<_, Option<String>>(13)?,
                    r.get::<_, Option<String>>(14)?,
                    r.get::<_, String>(15)?,
                    r.get::<_, Option<i64>>(16)?,
                    r.get::<_, bool>(17)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| LedgerError::NotFound(format!("journal entry {}", id)))?;
    let (
        id,
        owner,
        date,
        principal_id,
        category_id,
        amount,
        currency,
        description,
        reference,
        kind,
        tva_rate,
        tva_amount,
        att_name,
        att_mime,
        att_ref,
        status,
        transaction_id,
        active,
    ) = row;
    if owner != user_id {
        return Err(LedgerError::NotOwned(format!("journal entry {}", id)));
    }
    Ok(JournalEntry {
        id,
        user_id: owner,
        date: date
            .parse()
            .map_err(|_| LedgerError::InvalidDate(date.clone()))?,
        principal_id,
        category_id,
        amount: decimal_from_sql(&amount)?,
        currency,
        description,
        reference,
        kind,
        tva_rate: match tva_rate {
            Some(s) => Some(decimal_from_sql(&s)?),
            None => None,
        },
        tva_amount: match tva_amount {
            Some(s) => Some(decimal_from_sql(&s)?),
            None => None,
        },
        attachment_name: att_name,
        attachment_mime: att_mime,
        attachment_ref: att_ref,
        status: EntryStatus::try_from(status.as_str())?,
        transaction_id,
        active,
    })
}

/// Patch of editable entry fields. Amount changes on a linked entry re-check
/// the link-sum invariant against the linked transaction.
#[derive(Debug, Default, Clone)]
pub struct EntryPatch {
    pub date: Option<NaiveDate>,
    pub category_id: Option<i64>,
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub reference: Option<String>,
    pub tva_rate: Option<Decimal>,
    pub tva_amount: Option<Decimal>,
}

pub fn update_entry(conn: &mut Connection, user_id: i64, id: i64, patch: &EntryPatch) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let entry = get_entry(&tx, user_id, id)?;
    let amount = match patch.amount {
        Some(a) => {
            let a = canon_amount(a);
            if a <= Decimal::ZERO {
                return Err(LedgerError::InvalidAmount(a.to_string()));
            }
            a
        }
        None => entry.amount,
    };
    if let Some(cat) = patch.category_id {
        get_category(&tx, cat)?;
    }
    if let Some(tx_id) = entry.transaction_id {
        if patch.amount.is_some() {
            check_link_capacity(&tx, user_id, tx_id, amount, Some(id))?;
        }
    }
    tx.execute(
        "UPDATE journal_entries SET date=?1, category_id=?2, amount=?3, description=?4,
                reference=?5, tva_rate=?6, tva_amount=?7
         WHERE id=?8",
        params![
            patch.date.unwrap_or(entry.date).to_string(),
            patch.category_id.unwrap_or(entry.category_id),
            amount.to_string(),
            patch.description.as_deref().unwrap_or(&entry.description),
            patch.reference.as_deref().or(entry.reference.as_deref()),
            patch
                .tva_rate
                .or(entry.tva_rate)
                .map(|d| d.to_string()),
            patch
                .tva_amount
                .or(entry.tva_amount)
                .map(|d| canon_amount(d).to_string()),
            id,
        ],
    )?;
    tx.commit()?;
    Ok(())
}

pub fn set_entry_status(conn: &Connection, user_id: i64, id: i64, next: EntryStatus) -> Result<()> {
    let entry = get_entry(conn, user_id, id)?;
    if !entry.status.can_become(next) {
        return Err(LedgerError::Conflict(format!(
            "entry status cannot move {} -> {}",
            entry.status.as_str(),
            next.as_str()
        )));
    }
    conn.execute(
        "UPDATE journal_entries SET status=?1 WHERE id=?2",
        params![next.as_str(), id],
    )?;
    Ok(())
}

/// Soft delete keeps the row for audit; hard delete removes it (and its
/// attachment reference, the blob being the attachment store's problem).
pub fn delete_entry(conn: &Connection, user_id: i64, id: i64, hard: bool) -> Result<()> {
    get_entry(conn, user_id, id)?;
    if hard {
        conn.execute("DELETE FROM journal_entries WHERE id=?1", params![id])?;
    } else {
        conn.execute(
            "UPDATE journal_entries SET active=0, transaction_id=NULL WHERE id=?1",
            params![id],
        )?;
    }
    Ok(())
}

// ---- attachments ----------------------------------------------------------

/// At most one attachment per entry; the ref keys into the external blob
/// store, we only own the metadata.
pub fn attach_file(
    conn: &Connection,
    user_id: i64,
    entry_id: i64,
    name: &str,
    mime: &str,
    blob_ref: &str,
) -> Result<()> {
    let entry = get_entry(conn, user_id, entry_id)?;
    if entry.attachment_ref.is_some() {
        return Err(LedgerError::Conflict(format!(
            "entry {} already has an attachment",
            entry_id
        )));
    }
    conn.execute(
        "UPDATE journal_entries SET attachment_name=?1, attachment_mime=?2, attachment_ref=?3
         WHERE id=?4",
        params![name, mime, blob_ref, entry_id],
    )?;
    Ok(())
}

pub fn detach_file(conn: &Connection, user_id: i64, entry_id: i64) -> Result<Option<String>> {
    let entry = get_entry(conn, user_id, entry_id)?;
    conn.execute(
        "UPDATE journal_entries SET attachment_name=NULL, attachment_mime=NULL, attachment_ref=NULL
         WHERE id=?1",
        params![entry_id],
    )?;
    Ok(entry.attachment_ref)
}

// ---- linking --------------------------------------------------------------

/// Sum of amounts of entries linked to a transaction, optionally ignoring
/// one entry (used when relinking or editing that entry's amount).
fn linked_sum(conn: &Connection, tx_id: i64, skip_entry: Option<i64>) -> Result<Decimal> {
    let mut stmt = conn.prepare(
        "SELECT id, amount FROM journal_entries WHERE transaction_id=?1 AND active=1",
    )?;
    let rows = stmt.query_map(params![tx_id], |r| {
        Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?))
    })?;
    let mut total = Decimal::ZERO;
    for row in rows {
        let (id, amount) = row?;
        if Some(id) == skip_entry {
            continue;
        }
        total += decimal_from_sql(&amount)?;
    }
    Ok(total)
}

fn check_link_capacity(
    conn: &Connection,
    user_id: i64,
    tx_id: i64,
    entry_amount: Decimal,
    skip_entry: Option<i64>,
) -> Result<()> {
    let row = ledger::get_row(conn, user_id, tx_id)?;
    let linked = linked_sum(conn, tx_id, skip_entry)?;
    if linked + entry_amount > row.amount {
        return Err(LedgerError::LinkWouldExceedTransaction {
            linked: linked.to_string(),
            entry: entry_amount.to_string(),
            transaction: row.amount.to_string(),
        });
    }
    Ok(())
}

/// Link an entry to a ledger row, enforcing the link-sum invariant.
pub fn link_entry(conn: &mut Connection, user_id: i64, entry_id: i64, tx_id: i64) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let entry = get_entry(&tx, user_id, entry_id)?;
    if entry.transaction_id == Some(tx_id) {
        tx.commit()?;
        return Ok(());
    }
    if entry.transaction_id.is_some() {
        return Err(LedgerError::Conflict(format!(
            "entry {} is already linked; relink instead",
            entry_id
        )));
    }
    check_link_capacity(&tx, user_id, tx_id, entry.amount, None)?;
    tx.execute(
        "UPDATE journal_entries SET transaction_id=?1 WHERE id=?2",
        params![tx_id, entry_id],
    )?;
    tx.commit()?;
    Ok(())
}

pub fn unlink_entry(conn: &Connection, user_id: i64, entry_id: i64) -> Result<()> {
    let entry = get_entry(conn, user_id, entry_id)?;
    if entry.transaction_id.is_none() {
        return Err(LedgerError::Conflict(format!("entry {} is not linked", entry_id)));
    }
    conn.execute(
        "UPDATE journal_entries SET transaction_id=NULL WHERE id=?1",
        params![entry_id],
    )?;
    Ok(())
}

/// Unlink + link in one store transaction; the new target gets the same
/// capacity check as a fresh link.
pub fn relink_entry(conn: &mut Connection, user_id: i64, entry_id: i64, new_tx_id: i64) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let entry = get_entry(&tx, user_id, entry_id)?;
    check_link_capacity(&tx, user_id, new_tx_id, entry.amount, Some(entry_id))?;
    tx.execute(
        "UPDATE journal_entries SET transaction_id=?1 WHERE id=?2",
        params![new_tx_id, entry_id],
    )?;
    tx.commit()?;
    Ok(())
}

pub fn list_entries(conn: &Connection, user_id: i64, status: Option<EntryStatus>) -> Result<Vec<JournalEntry>> {
    let mut ids: Vec<i64> = Vec::new();
    match status {
        Some(st) => {
            let mut stmt = conn.prepare(
                "SELECT id FROM journal_entries WHERE user_id=?1 AND active=1 AND status=?2
                 ORDER BY date DESC, id DESC",
            )?;
            let rows = stmt.query_map(params![user_id, st.as_str()], |r| r.get(0))?;
            for id in rows {
                ids.push(id?);
            }
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT id FROM journal_entries WHERE user_id=?1 AND active=1
                 ORDER BY date DESC, id DESC",
            )?;
            let rows = stmt.query_map(params![user_id], |r| r.get(0))?;
            for id in rows {
                ids.push(id?);
            }
        }
    }
    let mut out = Vec::new();
    for id in ids {
        out.push(get_entry(conn, user_id, id)?);
    }
    Ok(out)
}
