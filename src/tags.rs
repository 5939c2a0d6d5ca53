// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! User-defined transaction tags (distinct from the journal plan). Many tags
//! per transaction, many transactions per tag; budgets per tag per month.

use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{LedgerError, Result};
use crate::ledger;
use crate::models::Tag;
use crate::utils::{canon_amount, decimal_from_sql};

pub fn create_tag(
    conn: &Connection,
    user_id: i64,
    name: &str,
    kind: &str,
    colour: Option<&str>,
    icon: Option<&str>,
    monthly_budget: Option<Decimal>,
) -> Result<i64> {
    if !matches!(kind, "revenue" | "expense" | "transfer") {
        return Err(LedgerError::Conflict(format!("unknown tag kind '{}'", kind)));
    }
    conn.execute(
        "INSERT INTO tags(user_id, name, kind, colour, icon, monthly_budget)
         VALUES (?1,?2,?3,?4,?5,?6)",
        params![
            user_id,
            name,
            kind,
            colour,
            icon,
            monthly_budget.map(|d| canon_amount(d).to_string()),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_tag(conn: &Connection, user_id: i64, id: i64) -> Result<Tag> {
    let row = conn
        .query_row(
            "SELECT id, user_id, name, kind, colour, icon, monthly_budget, active
             FROM tags WHERE id=?1 AND active=1",
            params![id],
            |r| {
                Ok((
                    r.get::<_, i64>(0)?,
                    r.get::<_, i64>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, Option<String>>(4)?,
                    r.get::<_, Option<String>>(5)?,
                    r.get::<_, Option<String>>(6)?,
                    r.get::<_, bool>(7)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| LedgerError::NotFound(format!("tag {}", id)))?;
    let (id, owner, name, kind, colour, icon, budget, active) = row;
    if owner != user_id {
        return Err(LedgerError::NotOwned(format!("tag {}", id)));
    }
    Ok(Tag {
        id,
        user_id: owner,
        name,
        kind,
        colour,
        icon,
        monthly_budget: match budget {
            Some(s) => Some(decimal_from_sql(&s)?),
            None => None,
        },
        active,
    })
}

pub fn id_for_tag(conn: &Connection, user_id: i64, name: &str) -> Result<i64> {
    conn.query_row(
        "SELECT id FROM tags WHERE user_id=?1 AND name=?2 AND active=1",
        params![user_id, name],
        |r| r.get(0),
    )
    .optional()?
    .ok_or_else(|| LedgerError::NotFound(format!("tag '{}'", name)))
}

pub fn set_monthly_budget(
    conn: &Connection,
    user_id: i64,
    id: i64,
    budget: Option<Decimal>,
) -> Result<()> {
    get_tag(conn, user_id, id)?;
    conn.execute(
        "UPDATE tags SET monthly_budget=?1 WHERE id=?2",
        params![budget.map(|d| canon_amount(d).to_string()), id],
    )?;
    Ok(())
}

/// Soft delete; the link rows go immediately, referenced transactions are
/// untouched.
pub fn delete_tag(conn: &Connection, user_id: i64, id: i64) -> Result<()> {
    get_tag(conn, user_id, id)?;
    conn.execute("DELETE FROM transaction_tags WHERE tag_id=?1", params![id])?;
    conn.execute("UPDATE tags SET active=0 WHERE id=?1", params![id])?;
    Ok(())
}

pub fn list_tags(conn: &Connection, user_id: i64) -> Result<Vec<Tag>> {
    let mut stmt =
        conn.prepare("SELECT id FROM tags WHERE user_id=?1 AND active=1 ORDER BY name")?;
    let ids = stmt.query_map(params![user_id], |r| r.get::<_, i64>(0))?;
    let mut out = Vec::new();
    for id in ids {
        out.push(get_tag(conn, user_id, id?)?);
    }
    Ok(out)
}

pub fn apply_tag(conn: &Connection, user_id: i64, tx_id: i64, tag_id: i64) -> Result<()> {
    ledger::get_row(conn, user_id, tx_id)?;
    get_tag(conn, user_id, tag_id)?;
    conn.execute(
        "INSERT OR IGNORE INTO transaction_tags(transaction_id, tag_id) VALUES (?1,?2)",
        params![tx_id, tag_id],
    )?;
    Ok(())
}

pub fn remove_tag(conn: &Connection, user_id: i64, tx_id: i64, tag_id: i64) -> Result<()> {
    ledger::get_row(conn, user_id, tx_id)?;
    get_tag(conn, user_id, tag_id)?;
    conn.execute(
        "DELETE FROM transaction_tags WHERE transaction_id=?1 AND tag_id=?2",
        params![tx_id, tag_id],
    )?;
    Ok(())
}

pub fn tags_for_transaction(conn: &Connection, user_id: i64, tx_id: i64) -> Result<Vec<Tag>> {
    ledger::get_row(conn, user_id, tx_id)?;
    let mut stmt = conn.prepare(
        "SELECT t.id FROM tags t JOIN transaction_tags l ON l.tag_id=t.id
         WHERE l.transaction_id=?1 AND t.active=1 ORDER BY t.name",
    )?;
    let ids = stmt.query_map(params![tx_id], |r| r.get::<_, i64>(0))?;
    let mut out = Vec::new();
    for id in ids {
        out.push(get_tag(conn, user_id, id?)?);
    }
    Ok(out)
}

#[derive(Debug, Serialize)]
pub struct TagBudgetStatus {
    pub tag: String,
    pub month: String,
    pub budget: Option<Decimal>,
    pub spent: Decimal,
    pub remaining: Option<Decimal>,
}

/// Read-only monthly evaluation: sum of tagged transaction amounts in the
/// month against the tag's budget, if any.
pub fn budget_status(conn: &Connection, user_id: i64, tag_id: i64, month: &str) -> Result<TagBudgetStatus> {
    let tag = get_tag(conn, user_id, tag_id)?;
    let mut stmt = conn.prepare(
        "SELECT tr.amount FROM transactions tr
         JOIN transaction_tags l ON l.transaction_id=tr.id
         WHERE l.tag_id=?1 AND substr(tr.date,1,7)=?2",
    )?;
    let rows = stmt.query_map(params![tag_id, month], |r| r.get::<_, String>(0))?;
    let mut spent = Decimal::ZERO;
    for a in rows {
        spent += decimal_from_sql(&a?)?;
    }
    Ok(TagBudgetStatus {
        tag: tag.name,
        month: month.to_string(),
        budget: tag.monthly_budget,
        remaining: tag.monthly_budget.map(|b| b - spent),
        spent,
    })
}
