// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Read-only reporting over the ledger and the journal. Nothing in here
//! recomputes `balance_after`; the cached values are the fast path the
//! engine pays for.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::Result;
use crate::ledger::{self, ROW_COLUMNS};
use crate::models::{AccountRef, LedgerRow, TxKind};
use crate::registry;
use crate::utils::decimal_from_sql;

fn account_filter(account: AccountRef) -> (&'static str, i64) {
    match account {
        AccountRef::Principal(id) => ("principal_id", id),
        AccountRef::Sub(id) => ("sub_id", id),
    }
}

fn day_start(d: NaiveDate) -> String {
    format!("{} 00:00:00", d)
}

fn day_end(d: NaiveDate) -> String {
    format!("{} 23:59:59", d)
}

#[derive(Debug, Default, Clone)]
pub struct HistoryFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub kind: Option<TxKind>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub text: Option<String>,
    pub tag_id: Option<i64>,
    pub limit: Option<usize>,
}

/// Account history, newest first. Amount range filters compare the stored
/// positive amount; the text filter matches description and reference.
pub fn history(
    conn: &Connection,
    user_id: i64,
    account: AccountRef,
    filter: &HistoryFilter,
) -> Result<Vec<LedgerRow>> {
    registry::load_account(conn, user_id, account)?;
    let (col, id) = account_filter(account);
    let mut sql = format!("SELECT {ROW_COLUMNS} FROM transactions t WHERE t.{col}=?");
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(id)];
    if let Some(from) = filter.from {
        sql.push_str(" AND t.date >= ?");
        args.push(Box::new(day_start(from)));
    }
    if let Some(to) = filter.to {
        sql.push_str(" AND t.date <= ?");
        args.push(Box::new(day_end(to)));
    }
    if let Some(kind) = filter.kind {
        sql.push_str(" AND t.kind = ?");
        args.push(Box::new(kind.as_str()));
    }
    if let Some(min) = filter.min_amount {
        sql.push_str(" AND CAST(t.amount AS REAL) >= ?");
        args.push(Box::new(min.to_string().parse::<f64>().unwrap_or(0.0)));
    }
    if let Some(max) = filter.max_amount {
        sql.push_str(" AND CAST(t.amount AS REAL) <= ?");
        args.push(Box::new(max.to_string().parse::<f64>().unwrap_or(f64::MAX)));
    }
    if let Some(text) = &filter.text {
        sql.push_str(" AND (t.description LIKE ? OR t.reference LIKE ?)");
        let pat = format!("%{}%", text);
        args.push(Box::new(pat.clone()));
        args.push(Box::new(pat));
    }
    if let Some(tag_id) = filter.tag_id {
        sql.push_str(
            " AND EXISTS(SELECT 1 FROM transaction_tags l WHERE l.transaction_id=t.id AND l.tag_id=?)",
        );
        args.push(Box::new(tag_id));
    }
    sql.push_str(" ORDER BY t.date DESC, t.id DESC");
    if let Some(limit) = filter.limit {
        sql.push_str(" LIMIT ?");
        args.push(Box::new(limit as i64));
    }
    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::ToSql> = args.iter().map(|a| a.as_ref()).collect();
    let rows = stmt.query_map(rusqlite::params_from_iter(params), ledger::row_from_sql)?;
    let mut out = Vec::new();
    for raw in rows {
        out.push(raw?.decode()?);
    }
    Ok(out)
}

#[derive(Debug, Serialize)]
pub struct PeriodStats {
    pub credits: Decimal,
    pub debits: Decimal,
    pub count: usize,
    /// Net change divided by transaction count, 0 when the period is empty.
    pub average: Decimal,
}

pub fn period_stats(
    conn: &Connection,
    user_id: i64,
    account: AccountRef,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<PeriodStats> {
    registry::load_account(conn, user_id, account)?;
    let (col, id) = account_filter(account);
    let mut stmt = conn.prepare(&format!(
        "SELECT kind, amount FROM transactions
         WHERE {col}=?1 AND date >= ?2 AND date <= ?3"
    ))?;
    let rows = stmt.query_map(params![id, day_start(from), day_end(to)], |r| {
        Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
    })?;
    let mut credits = Decimal::ZERO;
    let mut debits = Decimal::ZERO;
    let mut count = 0usize;
    for row in rows {
        let (kind, amount) = row?;
        let kind = TxKind::try_from(kind.as_str())?;
        let amount = decimal_from_sql(&amount)?;
        if kind.is_credit() {
            credits += amount;
        } else {
            debits += amount;
        }
        count += 1;
    }
    let average = if count == 0 {
        Decimal::ZERO
    } else {
        ((credits - debits) / Decimal::from(count as i64)).round_dp(2)
    };
    Ok(PeriodStats {
        credits,
        debits,
        count,
        average,
    })
}

#[derive(Debug, Serialize)]
pub struct DailyBalance {
    pub date: NaiveDate,
    pub balance: Decimal,
}

/// End-of-day balances over `[from, to]`, one point per day, carrying the
/// previous day's balance over days without rows. The series is seeded from
/// the balance at midnight of `from`.
pub fn daily_balances(
    conn: &Connection,
    user_id: i64,
    account: AccountRef,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<DailyBalance>> {
    let snap = registry::load_account(conn, user_id, account)?;
    let (col, id) = account_filter(account);
    let opening: Option<String> = {
        let mut stmt = conn.prepare(&format!(
            "SELECT balance_after FROM transactions
             WHERE {col}=?1 AND date < ?2 ORDER BY date DESC, id DESC LIMIT 1"
        ))?;
        let mut rows = stmt.query(params![id, day_start(from)])?;
        match rows.next()? {
            Some(r) => Some(r.get(0)?),
            None => None,
        }
    };
    let mut running = match opening {
        Some(s) => decimal_from_sql(&s)?,
        None => snap.initial_balance,
    };

    // Last balance_after of each day inside the window.
    let mut per_day: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    let mut stmt = conn.prepare(&format!(
        "SELECT substr(date,1,10), balance_after FROM transactions
         WHERE {col}=?1 AND date >= ?2 AND date <= ?3
         ORDER BY date ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![id, day_start(from), day_end(to)], |r| {
        Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (day, bal) = row?;
        let day: NaiveDate = day
            .parse()
            .map_err(|_| crate::error::LedgerError::InvalidDate(day.clone()))?;
        per_day.insert(day, decimal_from_sql(&bal)?);
    }

    let mut out = Vec::new();
    let mut day = from;
    while day <= to {
        if let Some(b) = per_day.get(&day) {
            running = *b;
        }
        out.push(DailyBalance {
            date: day,
            balance: running,
        });
        day = match day.checked_add_days(Days::new(1)) {
            Some(d) => d,
            None => break,
        };
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Incoming,
    Outgoing,
    All,
}

impl Direction {
    fn admits(self, kind: TxKind) -> bool {
        match self {
            Self::Incoming => kind == TxKind::TransferIn,
            Self::Outgoing => matches!(kind, TxKind::TransferOut | TxKind::TransferExternal),
            Self::All => kind.is_transfer_leg() || kind == TxKind::TransferExternal,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CounterpartyTotal {
    pub counterparty: String,
    pub total: Decimal,
    pub count: usize,
}

/// Aggregate transfer volume per counterparty over a period. Internal legs
/// name the other account; external rows use the recorded recipient label.
pub fn top_counterparties(
    conn: &Connection,
    user_id: i64,
    account: AccountRef,
    from: NaiveDate,
    to: NaiveDate,
    direction: Direction,
) -> Result<Vec<CounterpartyTotal>> {
    registry::load_account(conn, user_id, account)?;
    let (col, id) = account_filter(account);
    let mut stmt = conn.prepare(&format!(
        "SELECT t.kind, t.amount, t.dest_label,
                p.name, s.name
         FROM transactions t
         LEFT JOIN principal_accounts p ON t.dest_principal_id=p.id
         LEFT JOIN sub_accounts s ON t.dest_sub_id=s.id
         WHERE t.{col}=?1 AND t.date >= ?2 AND t.date <= ?3"
    ))?;
    let rows = stmt.query_map(params![id, day_start(from), day_end(to)], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, Option<String>>(2)?,
            r.get::<_, Option<String>>(3)?,
            r.get::<_, Option<String>>(4)?,
        ))
    })?;
    let mut agg: BTreeMap<String, (Decimal, usize)> = BTreeMap::new();
    for row in rows {
        let (kind, amount, label, p_name, s_name) = row?;
        let kind = TxKind::try_from(kind.as_str())?;
        if !direction.admits(kind) {
            continue;
        }
        let who = p_name
            .or(s_name)
            .or(label)
            .unwrap_or_else(|| "(unknown)".to_string());
        let entry = agg.entry(who).or_insert((Decimal::ZERO, 0));
        entry.0 += decimal_from_sql(&amount)?;
        entry.1 += 1;
    }
    let mut out: Vec<CounterpartyTotal> = agg
        .into_iter()
        .map(|(counterparty, (total, count))| CounterpartyTotal {
            counterparty,
            total,
            count,
        })
        .collect();
    out.sort_by(|a, b| b.total.cmp(&a.total));
    Ok(out)
}

#[derive(Debug, Serialize)]
pub struct MonthlyPair {
    pub month: String,
    pub left: Decimal,
    pub right: Decimal,
}

/// Per-month totals for two (account, direction) tuples, bar-chart shaped.
pub fn compare_pair(
    conn: &Connection,
    user_id: i64,
    left: (AccountRef, Direction),
    right: (AccountRef, Direction),
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<MonthlyPair>> {
    let mut months: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();
    for (side, (account, direction)) in [(0usize, left), (1usize, right)] {
        registry::load_account(conn, user_id, account)?;
        let (col, id) = account_filter(account);
        let mut stmt = conn.prepare(&format!(
            "SELECT substr(date,1,7), kind, amount FROM transactions
             WHERE {col}=?1 AND date >= ?2 AND date <= ?3"
        ))?;
        let rows = stmt.query_map(params![id, day_start(from), day_end(to)], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
            ))
        })?;
        for row in rows {
            let (month, kind, amount) = row?;
            let kind = TxKind::try_from(kind.as_str())?;
            if !direction.admits(kind) {
                continue;
            }
            let amount = decimal_from_sql(&amount)?;
            let e = months.entry(month).or_insert((Decimal::ZERO, Decimal::ZERO));
            if side == 0 {
                e.0 += amount;
            } else {
                e.1 += amount;
            }
        }
    }
    Ok(months
        .into_iter()
        .map(|(month, (l, r))| MonthlyPair {
            month,
            left: l,
            right: r,
        })
        .collect())
}

#[derive(Debug, Serialize)]
pub struct PnlLine {
    pub type_account: String,
    pub category: String,
    pub total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct PnlReport {
    pub lines: Vec<PnlLine>,
    pub revenue: Decimal,
    pub charges: Decimal,
    pub net: Decimal,
}

/// Profit & loss over validated journal entries, grouped by plan category,
/// restricted to revenue and charge categories.
pub fn pnl(conn: &Connection, user_id: i64, from: NaiveDate, to: NaiveDate) -> Result<PnlReport> {
    let mut stmt = conn.prepare(
        "SELECT c.type_account, c.name, e.amount
         FROM journal_entries e JOIN journal_categories c ON e.category_id=c.id
         WHERE e.user_id=?1 AND e.active=1 AND e.status='validated'
           AND e.date >= ?2 AND e.date <= ?3
           AND c.type_account IN ('revenue','charge')",
    )?;
    let rows = stmt.query_map(params![user_id, from.to_string(), to.to_string()], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
        ))
    })?;
    let mut agg: BTreeMap<(String, String), Decimal> = BTreeMap::new();
    for row in rows {
        let (ty, cat, amount) = row?;
        *agg.entry((ty, cat)).or_insert(Decimal::ZERO) += decimal_from_sql(&amount)?;
    }
    let mut revenue = Decimal::ZERO;
    let mut charges = Decimal::ZERO;
    let mut lines = Vec::new();
    for ((ty, cat), total) in agg {
        if ty == "revenue" {
            revenue += total;
        } else {
            charges += total;
        }
        lines.push(PnlLine {
            type_account: ty,
            category: cat,
            total,
        });
    }
    Ok(PnlReport {
        lines,
        revenue,
        charges,
        net: revenue - charges,
    })
}

/// Ledger rows with no linked journal entry, optionally restricted to one
/// account and/or one accounting status.
pub fn unlinked_transactions(
    conn: &Connection,
    user_id: i64,
    account: Option<AccountRef>,
    accounting_status: Option<&str>,
) -> Result<Vec<LedgerRow>> {
    let mut sql = format!(
        "SELECT {ROW_COLUMNS} FROM transactions t
         WHERE t.user_id=?
           AND NOT EXISTS(SELECT 1 FROM journal_entries e
                          WHERE e.transaction_id=t.id AND e.active=1)"
    );
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id)];
    if let Some(account) = account {
        registry::load_account(conn, user_id, account)?;
        let (col, id) = account_filter(account);
        sql.push_str(&format!(" AND t.{col}=?"));
        args.push(Box::new(id));
    }
    if let Some(status) = accounting_status {
        sql.push_str(" AND t.accounting_status = ?");
        args.push(Box::new(status.to_string()));
    }
    sql.push_str(" ORDER BY t.date DESC, t.id DESC");
    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::ToSql> = args.iter().map(|a| a.as_ref()).collect();
    let rows = stmt.query_map(rusqlite::params_from_iter(params), ledger::row_from_sql)?;
    let mut out = Vec::new();
    for raw in rows {
        out.push(raw?.decode()?);
    }
    Ok(out)
}
