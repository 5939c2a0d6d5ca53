// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{NaiveDate, NaiveDateTime};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;

use crate::error::{LedgerError, Result};

/// Storage format for ledger timestamps; lexical order == chronological order.
pub const DATE_FMT: &str = "%Y-%m-%d %H:%M:%S";

pub fn fmt_datetime(dt: NaiveDateTime) -> String {
    dt.format(DATE_FMT).to_string()
}

/// Tolerant timestamp parser for CSV rows and CLI arguments. Accepted:
/// `YYYY-MM-DD HH:MM`, `YYYY-MM-DDTHH:MM`, `YYYY-MM-DD`, `DD.MM.YY HH:MM`.
pub fn parse_flex_datetime(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    for fmt in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%d.%m.%y %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(dt) = d.and_hms_opt(0, 0, 0) {
            return Ok(dt);
        }
    }
    Err(LedgerError::InvalidDate(s.to_string()))
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| LedgerError::InvalidDate(s.trim().to_string()))
}

/// Wire amounts accept a dot or comma radix, no thousands separator.
/// The canonical internal form carries at least two fractional digits.
pub fn parse_amount(s: &str) -> Result<Decimal> {
    let t = s.trim().replace(',', ".");
    let d = t
        .parse::<Decimal>()
        .map_err(|_| LedgerError::InvalidAmount(s.trim().to_string()))?;
    Ok(canon_amount(d))
}

/// A positive amount, the only thing the write primitives accept.
pub fn parse_positive_amount(s: &str) -> Result<Decimal> {
    let d = parse_amount(s)?;
    if d <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(s.trim().to_string()));
    }
    Ok(d)
}

pub fn canon_amount(d: Decimal) -> Decimal {
    let mut d = d.round_dp(2);
    if d.scale() < 2 {
        d.rescale(2);
    }
    d
}

pub fn fmt_money(d: &Decimal, ccy: &str) -> String {
    format!("{:.2} {}", d, ccy)
}

static IBAN_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2}[A-Z0-9]{13,32}$").unwrap());

/// Trim, uppercase, strip inner spaces, then require the minimal shape
/// (two-letter country code, >= 15 chars total).
pub fn normalize_iban(s: &str) -> Result<String> {
    let iban: String = s
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    if iban.len() < 15 || !IBAN_SHAPE.is_match(&iban) {
        return Err(LedgerError::InvalidIban(s.trim().to_string()));
    }
    Ok(iban)
}

/// Opaque per-transfer token; clients must not parse it.
pub fn new_reference() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub fn new_staging_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub fn default_currency(conn: &Connection) -> Result<String> {
    let v: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key='default_currency'",
            [],
            |r| r.get(0),
        )
        .optional()?;
    Ok(v.unwrap_or_else(|| "CHF".to_string()))
}

pub fn set_default_currency(conn: &Connection, ccy: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES('default_currency', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![ccy],
    )?;
    Ok(())
}

/// Resolve a user name to its id, creating the row on first use.
pub fn ensure_user(conn: &Connection, name: &str) -> Result<i64> {
    let existing: Option<i64> = conn
        .query_row("SELECT id FROM users WHERE name=?1", params![name], |r| {
            r.get(0)
        })
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    conn.execute("INSERT INTO users(name) VALUES (?1)", params![name])?;
    Ok(conn.last_insert_rowid())
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> anyhow::Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

/// Decimal columns are stored as TEXT; this is the single decode point.
pub fn decimal_from_sql(s: &str) -> Result<Decimal> {
    s.parse::<Decimal>()
        .map_err(|_| LedgerError::Conflict(format!("corrupt decimal '{}' in store", s)))
}
