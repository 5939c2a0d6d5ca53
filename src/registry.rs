// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;

use crate::error::{LedgerError, Result};
use crate::models::{AccountRef, Bank, PrincipalAccount, SubAccount};
use crate::utils::{canon_amount, decimal_from_sql};

/// Resolved view of an account ref, as the ledger engine needs it: owner,
/// both balances, currency, and the overdraft flag. For a sub-account the
/// initial balance is zero and ownership walks to the parent principal.
#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    pub account: AccountRef,
    pub user_id: i64,
    /// Owning principal: itself for principals, the parent for subs.
    pub principal_id: i64,
    pub name: String,
    pub balance: Decimal,
    pub initial_balance: Decimal,
    pub currency: String,
    pub allow_overdraft: bool,
}

/// Load an account and enforce ownership. `NotFound` for missing or
/// soft-deleted rows, `NotOwned` when the lineage belongs to someone else.
pub fn load_account(conn: &Connection, user_id: i64, account: AccountRef) -> Result<AccountSnapshot> {
    match account {
        AccountRef::Principal(id) => {
            let row = conn
                .query_row(
                    "SELECT user_id, name, balance, initial_balance, currency, allow_overdraft
                     FROM principal_accounts WHERE id=?1 AND active=1",
                    params![id],
                    |r| {
                        Ok((
                            r.get::<_, i64>(0)?,
                            r.get::<_, String>(1)?,
                            r.get::<_, String>(2)?,
                            r.get::<_, String>(3)?,
                            r.get::<_, String>(4)?,
                            r.get::<_, bool>(5)?,
                        ))
                    },
                )
                .optional()?
                .ok_or_else(|| LedgerError::NotFound(format!("principal account {}", id)))?;
            let (owner, name, bal, init, ccy, overdraft) = row;
            if owner != user_id {
                return Err(LedgerError::NotOwned(format!("principal account {}", id)));
            }
            Ok(AccountSnapshot {
                account,
                user_id: owner,
                principal_id: id,
                name,
                balance: decimal_from_sql(&bal)?,
                initial_balance: decimal_from_sql(&init)?,
                currency: ccy,
                allow_overdraft: overdraft,
            })
        }
        AccountRef::Sub(id) => {
            let row = conn
                .query_row(
                    "SELECT s.principal_id, s.name, s.balance, p.user_id, p.currency, p.allow_overdraft
                     FROM sub_accounts s JOIN principal_accounts p ON s.principal_id=p.id
                     WHERE s.id=?1 AND s.active=1 AND p.active=1",
                    params![id],
                    |r| {
                        Ok((
                            r.get::<_, i64>(0)?,
                            r.get::<_, String>(1)?,
                            r.get::<_, String>(2)?,
                            r.get::<_, i64>(3)?,
                            r.get::<_, String>(4)?,
                            r.get::<_, bool>(5)?,
                        ))
                    },
                )
                .optional()?
                .ok_or_else(|| LedgerError::NotFound(format!("sub-account {}", id)))?;
            let (principal_id, name, bal, owner, ccy, overdraft) = row;
            if owner != user_id {
                return Err(LedgerError::NotOwned(format!("sub-account {}", id)));
            }
            Ok(AccountSnapshot {
                account,
                user_id: owner,
                principal_id,
                name,
                balance: decimal_from_sql(&bal)?,
                initial_balance: Decimal::ZERO,
                currency: ccy,
                allow_overdraft: overdraft,
            })
        }
    }
}

/// Write the cached balance back. Only the ledger engine calls this, inside
/// an open store transaction.
pub(crate) fn write_balance(conn: &Connection, account: AccountRef, balance: Decimal) -> Result<()> {
    let sql = match account {
        AccountRef::Principal(_) => "UPDATE principal_accounts SET balance=?1 WHERE id=?2",
        AccountRef::Sub(_) => "UPDATE sub_accounts SET balance=?1 WHERE id=?2",
    };
    conn.execute(sql, params![canon_amount(balance).to_string(), account.id()])?;
    Ok(())
}

// ---- banks ----------------------------------------------------------------

pub fn create_bank(
    conn: &Connection,
    name: &str,
    code: Option<&str>,
    country: Option<&str>,
    colour: Option<&str>,
    website: Option<&str>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO banks(name, code, country, colour, website) VALUES (?1,?2,?3,?4,?5)",
        params![name, code, country, colour, website],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn deactivate_bank(conn: &Connection, id: i64) -> Result<()> {
    let n = conn.execute("UPDATE banks SET active=0 WHERE id=?1 AND active=1", params![id])?;
    if n == 0 {
        return Err(LedgerError::NotFound(format!("bank {}", id)));
    }
    Ok(())
}

pub fn list_banks(conn: &Connection) -> Result<Vec<Bank>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, code, country, colour, website, active FROM banks WHERE active=1 ORDER BY name",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(Bank {
            id: r.get(0)?,
            name: r.get(1)?,
            code: r.get(2)?,
            country: r.get(3)?,
            colour: r.get(4)?,
            website: r.get(5)?,
            active: r.get(6)?,
        })
    })?;
    let mut out = Vec::new();
    for b in rows {
        out.push(b?);
    }
    Ok(out)
}

pub fn bank_id_for_name(conn: &Connection, name: &str) -> Result<i64> {
    conn.query_row(
        "SELECT id FROM banks WHERE name=?1 AND active=1",
        params![name],
        |r| r.get(0),
    )
    .optional()?
    .ok_or_else(|| LedgerError::NotFound(format!("bank '{}'", name)))
}

// ---- principal accounts ---------------------------------------------------

pub struct NewPrincipal<'a> {
    pub name: &'a str,
    pub bank_id: Option<i64>,
    pub account_number: Option<&'a str>,
    pub iban: Option<&'a str>,
    pub bic: Option<&'a str>,
    pub kind: &'a str,
    pub initial_balance: Decimal,
    pub currency: &'a str,
    pub opening_date: Option<NaiveDate>,
    pub allow_overdraft: bool,
}

pub fn create_principal(conn: &Connection, user_id: i64, p: &NewPrincipal) -> Result<i64> {
    let init = canon_amount(p.initial_balance).to_string();
    conn.execute(
        "INSERT INTO principal_accounts(
            user_id, bank_id, name, account_number, iban, bic, kind,
            balance, initial_balance, currency, opening_date, allow_overdraft)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?8,?9,?10,?11)",
        params![
            user_id,
            p.bank_id,
            p.name,
            p.account_number,
            p.iban,
            p.bic,
            p.kind,
            init,
            p.currency,
            p.opening_date.map(|d| d.to_string()),
            p.allow_overdraft,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn rename_principal(conn: &Connection, user_id: i64, id: i64, name: &str) -> Result<()> {
    load_account(conn, user_id, AccountRef::Principal(id))?;
    conn.execute(
        "UPDATE principal_accounts SET name=?1 WHERE id=?2",
        params![name, id],
    )?;
    Ok(())
}

pub fn set_principal_overdraft(conn: &Connection, user_id: i64, id: i64, allow: bool) -> Result<()> {
    load_account(conn, user_id, AccountRef::Principal(id))?;
    conn.execute(
        "UPDATE principal_accounts SET allow_overdraft=?1 WHERE id=?2",
        params![allow, id],
    )?;
    Ok(())
}

/// Soft delete. Refused while the account still has active sub-accounts or a
/// non-zero balance.
pub fn deactivate_principal(conn: &Connection, user_id: i64, id: i64) -> Result<()> {
    let snap = load_account(conn, user_id, AccountRef::Principal(id))?;
    let children: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sub_accounts WHERE principal_id=?1 AND active=1",
        params![id],
        |r| r.get(0),
    )?;
    if children > 0 {
        return Err(LedgerError::Conflict(format!(
            "principal account {} still has {} active sub-account(s)",
            id, children
        )));
    }
    if !snap.balance.is_zero() {
        return Err(LedgerError::Conflict(format!(
            "principal account {} balance is {}, not zero",
            id, snap.balance
        )));
    }
    conn.execute(
        "UPDATE principal_accounts SET active=0 WHERE id=?1",
        params![id],
    )?;
    Ok(())
}

pub fn list_principals(conn: &Connection, user_id: i64) -> Result<Vec<PrincipalAccount>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, bank_id, name, account_number, iban, bic, kind,
                balance, initial_balance, currency, opening_date, allow_overdraft, active
         FROM principal_accounts WHERE user_id=?1 AND active=1 ORDER BY name",
    )?;
    let rows = stmt.query_map(params![user_id], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, i64>(1)?,
            r.get::<_, Option<i64>>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, Option<String>>(4)?,
            r.get::<_, Option<String>>(5)?,
            r.get::<_, Option<String>>(6)?,
            r.get::<_, String>(7)?,
            r.get::<_, String>(8)?,
            r.get::<_, String>(9)?,
            r.get::<_, String>(10)?,
            r.get::<_, Option<String>>(11)?,
            r.get::<_, bool>(12)?,
            r.get::<_, bool>(13)?,
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (id, uid, bank_id, name, number, iban, bic, kind, bal, init, ccy, opened, od, active) =
            row?;
        out.push(PrincipalAccount {
            id,
            user_id: uid,
            bank_id,
            name,
            account_number: number,
            iban,
            bic,
            kind,
            balance: decimal_from_sql(&bal)?,
            initial_balance: decimal_from_sql(&init)?,
            currency: ccy,
            opening_date: opened.and_then(|s| s.parse().ok()),
            allow_overdraft: od,
            active,
        });
    }
    Ok(out)
}

pub fn id_for_principal(conn: &Connection, user_id: i64, name: &str) -> Result<i64> {
    conn.query_row(
        "SELECT id FROM principal_accounts WHERE user_id=?1 AND name=?2 AND active=1",
        params![user_id, name],
        |r| r.get(0),
    )
    .optional()?
    .ok_or_else(|| LedgerError::NotFound(format!("account '{}'", name)))
}

// ---- sub-accounts ---------------------------------------------------------

pub struct NewSubAccount<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub target_amount: Option<Decimal>,
    pub colour: Option<&'a str>,
    pub icon: Option<&'a str>,
    pub target_date: Option<NaiveDate>,
}

pub fn create_sub_account(
    conn: &Connection,
    user_id: i64,
    principal_id: i64,
    s: &NewSubAccount,
) -> Result<i64> {
    load_account(conn, user_id, AccountRef::Principal(principal_id))?;
    conn.execute(
        "INSERT INTO sub_accounts(principal_id, name, description, target_amount, colour, icon, target_date)
         VALUES (?1,?2,?3,?4,?5,?6,?7)",
        params![
            principal_id,
            s.name,
            s.description,
            s.target_amount.map(|d| canon_amount(d).to_string()),
            s.colour,
            s.icon,
            s.target_date.map(|d| d.to_string()),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn deactivate_sub_account(conn: &Connection, user_id: i64, id: i64) -> Result<()> {
    let snap = load_account(conn, user_id, AccountRef::Sub(id))?;
    if !snap.balance.is_zero() {
        return Err(LedgerError::Conflict(format!(
            "sub-account {} balance is {}, not zero",
            id, snap.balance
        )));
    }
    conn.execute("UPDATE sub_accounts SET active=0 WHERE id=?1", params![id])?;
    Ok(())
}

pub fn list_sub_accounts(conn: &Connection, user_id: i64, principal_id: i64) -> Result<Vec<SubAccount>> {
    load_account(conn, user_id, AccountRef::Principal(principal_id))?;
    let mut stmt = conn.prepare(
        "SELECT id, principal_id, name, description, target_amount, balance, colour, icon, target_date, active
         FROM sub_accounts WHERE principal_id=?1 AND active=1 ORDER BY name",
    )?;
    let rows = stmt.query_map(params![principal_id], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, i64>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, Option<String>>(3)?,
            r.get::<_, Option<String>>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, Option<String>>(6)?,
            r.get::<_, Option<String>>(7)?,
            r.get::<_, Option<String>>(8)?,
            r.get::<_, bool>(9)?,
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        let (id, pid, name, desc, target, bal, colour, icon, tdate, active) = row?;
        out.push(SubAccount {
            id,
            principal_id: pid,
            name,
            description: desc,
            target_amount: match target {
                Some(t) => Some(decimal_from_sql(&t)?),
                None => None,
            },
            balance: decimal_from_sql(&bal)?,
            colour,
            icon,
            target_date: tdate.and_then(|s| s.parse().ok()),
            active,
        });
    }
    Ok(out)
}

pub fn id_for_sub_account(
    conn: &Connection,
    user_id: i64,
    principal_id: i64,
    name: &str,
) -> Result<i64> {
    load_account(conn, user_id, AccountRef::Principal(principal_id))?;
    conn.query_row(
        "SELECT id FROM sub_accounts WHERE principal_id=?1 AND name=?2 AND active=1",
        params![principal_id, name],
        |r| r.get(0),
    )
    .optional()?
    .ok_or_else(|| LedgerError::NotFound(format!("sub-account '{}'", name)))
}

/// Snapshot of all account keys a user may import into: principals plus
/// their sub-accounts, with the composite `id|kind` key.
pub fn account_keys(conn: &Connection, user_id: i64) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    let mut stmt = conn.prepare(
        "SELECT id, name FROM principal_accounts WHERE user_id=?1 AND active=1 ORDER BY name",
    )?;
    let rows = stmt.query_map(params![user_id], |r| {
        Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (id, name) = row?;
        out.push((AccountRef::Principal(id).key(), name));
    }
    let mut stmt = conn.prepare(
        "SELECT s.id, p.name || ' / ' || s.name
         FROM sub_accounts s JOIN principal_accounts p ON s.principal_id=p.id
         WHERE p.user_id=?1 AND s.active=1 AND p.active=1 ORDER BY p.name, s.name",
    )?;
    let rows = stmt.query_map(params![user_id], |r| {
        Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (id, name) = row?;
        out.push((AccountRef::Sub(id).key(), name));
    }
    Ok(out)
}
