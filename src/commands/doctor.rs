// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::models::TxKind;
use crate::utils::{decimal_from_sql, pretty_table};

/// Offline audit of the ledger's bookkeeping invariants. Read-only; every
/// finding is one row in the report.
pub fn handle(conn: &Connection) -> Result<()> {
    let mut rows: Vec<Vec<String>> = Vec::new();

    check_balance_chains(conn, &mut rows, "principal_id", "principal_accounts")?;
    check_balance_chains(conn, &mut rows, "sub_id", "sub_accounts")?;

    // Internal transfer legs must come in out/in pairs on one reference.
    let mut stmt = conn.prepare(
        "SELECT reference,
                SUM(kind='transfer_out'), SUM(kind='transfer_in'),
                COUNT(DISTINCT amount)
         FROM transactions
         WHERE kind IN ('transfer_out','transfer_in')
         GROUP BY reference",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let reference: String = r.get(0)?;
        let outs: i64 = r.get(1)?;
        let ins: i64 = r.get(2)?;
        let amounts: i64 = r.get(3)?;
        if outs != 1 || ins != 1 {
            rows.push(vec![
                "unpaired_transfer_leg".into(),
                format!("{} ({} out, {} in)", reference, outs, ins),
            ]);
        } else if amounts != 1 {
            rows.push(vec!["transfer_amount_mismatch".into(), reference]);
        }
    }

    // Linked active journal entries must not exceed their transaction.
    let mut stmt = conn.prepare(
        "SELECT t.id, t.amount, SUM(CAST(e.amount AS REAL))
         FROM transactions t JOIN journal_entries e ON e.transaction_id=t.id
         WHERE e.active=1
         GROUP BY t.id",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let tx_id: i64 = r.get(0)?;
        let tx_amount = decimal_from_sql(&r.get::<_, String>(1)?)?;
        let linked: f64 = r.get(2)?;
        if Decimal::try_from(linked).unwrap_or(Decimal::ZERO) > tx_amount {
            rows.push(vec![
                "linked_entries_exceed_transaction".into(),
                format!("tx {}", tx_id),
            ]);
        }
    }

    // No-overdraft accounts must never go below zero anywhere in history.
    let mut stmt = conn.prepare(
        "SELECT t.id, t.balance_after FROM transactions t
         JOIN principal_accounts p ON t.principal_id=p.id
         WHERE p.allow_overdraft=0 AND CAST(t.balance_after AS REAL) < 0",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let bal: String = r.get(1)?;
        rows.push(vec!["negative_balance".into(), format!("tx {} ({})", id, bal)]);
    }

    // Stale import staging that the hourly sweep should have caught.
    let stale: i64 = conn.query_row(
        "SELECT COUNT(*) FROM csv_imports WHERE created_at < datetime('now','-1 hour')",
        [],
        |r| r.get(0),
    )?;
    if stale > 0 {
        rows.push(vec!["stale_import_staging".into(), format!("{} token(s)", stale)]);
    }

    if rows.is_empty() {
        println!("doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}

/// Replays each account's rows in ledger order and compares the running sum
/// against the stored `balance_after` chain and the cached account balance.
fn check_balance_chains(
    conn: &Connection,
    rows: &mut Vec<Vec<String>>,
    col: &str,
    table: &str,
) -> Result<()> {
    let mut accounts = conn.prepare(&format!(
        "SELECT id, balance, initial_balance FROM {table} WHERE active=1"
    ))?;
    let mut cur = accounts.query([])?;
    while let Some(acc) = cur.next()? {
        let id: i64 = acc.get(0)?;
        let cached = decimal_from_sql(&acc.get::<_, String>(1)?)?;
        let mut running = decimal_from_sql(&acc.get::<_, String>(2)?)?;

        let mut stmt = conn.prepare(&format!(
            "SELECT id, kind, amount, balance_after FROM transactions
             WHERE {col}=?1 ORDER BY date ASC, id ASC"
        ))?;
        let mut txs = stmt.query([id])?;
        while let Some(t) = txs.next()? {
            let tx_id: i64 = t.get(0)?;
            let kind = TxKind::try_from(t.get::<_, String>(1)?.as_str())?;
            let amount = decimal_from_sql(&t.get::<_, String>(2)?)?;
            let stored = decimal_from_sql(&t.get::<_, String>(3)?)?;
            if kind.is_credit() {
                running += amount;
            } else {
                running -= amount;
            }
            if stored != running {
                rows.push(vec![
                    "broken_balance_chain".into(),
                    format!("{} {} at tx {} (stored {}, replayed {})", table, id, tx_id, stored, running),
                ]);
                running = stored; // report once, resync
            }
        }
        if running != cached {
            rows.push(vec![
                "cached_balance_drift".into(),
                format!("{} {} (cached {}, replayed {})", table, id, cached, running),
            ]);
        }
    }
    Ok(())
}
