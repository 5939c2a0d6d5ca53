// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! CSV import pipeline: upload (stage), map (preview), finalise (replay).
//!
//! Staged CSVs live server-side under a random token for at most one hour.
//! Finalisation replays every row through the regular deposit/withdrawal/
//! transfer primitives, one store transaction per row; a bad row yields a
//! diagnostic and never aborts the batch.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::ledger;
use crate::models::AccountRef;
use crate::transfer;
use crate::utils::{new_staging_token, parse_flex_datetime, parse_positive_amount};

pub const CANDIDATE_DELIMITERS: [u8; 4] = [b';', b',', b'|', b'\t'];

/// Pick the candidate delimiter that occurs most often in the header line;
/// fall back to `;`.
pub fn sniff_delimiter(sample: &str) -> u8 {
    let first_line = sample.lines().next().unwrap_or("");
    CANDIDATE_DELIMITERS
        .iter()
        .copied()
        .map(|d| (d, first_line.matches(d as char).count()))
        .filter(|(_, n)| *n > 0)
        .max_by_key(|(_, n)| *n)
        .map(|(d, _)| d)
        .unwrap_or(b';')
}

/// What phase U persists: raw rows, the header, and a snapshot of the
/// uploader's accounts so later phases work against a stable account list.
#[derive(Debug, Serialize, Deserialize)]
pub struct Staging {
    pub delimiter: u8,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub accounts: Vec<(String, String)>,
}

fn sweep_expired(conn: &Connection) -> Result<()> {
    conn.execute(
        "DELETE FROM csv_imports WHERE created_at < datetime('now','-1 hour')",
        [],
    )?;
    Ok(())
}

/// Phase U: parse and stage a CSV, returning the staging token.
pub fn upload(conn: &Connection, user_id: i64, csv_text: &str) -> Result<String> {
    sweep_expired(conn)?;
    let delimiter = sniff_delimiter(csv_text);
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_text.as_bytes());
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| LedgerError::Conflict(format!("unreadable CSV header: {}", e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let mut rows = Vec::new();
    for rec in rdr.records() {
        let rec = rec.map_err(|e| LedgerError::Conflict(format!("unreadable CSV row: {}", e)))?;
        rows.push(rec.iter().map(|f| f.trim().to_string()).collect());
    }
    let staging = Staging {
        delimiter,
        headers,
        rows,
        accounts: crate::registry::account_keys(conn, user_id)?,
    };
    let token = new_staging_token();
    conn.execute(
        "INSERT INTO csv_imports(token, user_id, payload) VALUES (?1,?2,?3)",
        params![
            token,
            user_id,
            serde_json::to_string(&staging)
                .map_err(|e| LedgerError::Conflict(format!("staging encode: {}", e)))?,
        ],
    )?;
    Ok(token)
}

pub fn load_staging(conn: &Connection, user_id: i64, token: &str) -> Result<Staging> {
    sweep_expired(conn)?;
    let row = conn
        .query_row(
            "SELECT user_id, payload FROM csv_imports WHERE token=?1",
            params![token],
            |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)),
        )
        .optional()?
        .ok_or_else(|| LedgerError::NotFound(format!("import staging '{}'", token)))?;
    let (owner, payload) = row;
    if owner != user_id {
        return Err(LedgerError::NotOwned(format!("import staging '{}'", token)));
    }
    serde_json::from_str(&payload)
        .map_err(|e| LedgerError::Conflict(format!("staging decode: {}", e)))
}

pub fn discard_staging(conn: &Connection, user_id: i64, token: &str) -> Result<()> {
    // Ownership check first; a foreign token must not be deletable.
    load_staging(conn, user_id, token)?;
    conn.execute("DELETE FROM csv_imports WHERE token=?1", params![token])?;
    Ok(())
}

/// Phase M input: which staged column feeds which field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub date: String,
    pub amount: String,
    pub kind: String,
    pub description: Option<String>,
    pub source: String,
    pub dest: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Deposit,
    Withdrawal,
    Transfer,
    Unknown,
}

impl RowKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Transfer => "transfer",
            Self::Unknown => "unknown",
        }
    }
}

/// Deterministic normalisation of the free-text type column.
pub fn normalize_kind(raw: &str) -> RowKind {
    match raw.trim().to_lowercase().as_str() {
        "deposit" | "credit" | "in" | "income" | "cr" => RowKind::Deposit,
        "withdrawal" | "debit" | "out" | "expense" | "payment" | "db" | "dr" => RowKind::Withdrawal,
        "transfer" | "virement" | "internal" => RowKind::Transfer,
        _ => RowKind::Unknown,
    }
}

/// One staged row after the mapping is applied. `error` carries the first
/// per-row problem (date or amount); such rows sort after the valid ones.
#[derive(Debug, Serialize)]
pub struct MappedRow {
    pub index: usize,
    pub date: Option<NaiveDateTime>,
    pub raw_date: String,
    pub amount: Option<Decimal>,
    pub raw_amount: String,
    pub kind: RowKind,
    pub description: String,
    pub source_name: String,
    pub dest_name: Option<String>,
    pub error: Option<String>,
}

fn column_index(headers: &[String], name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or_else(|| LedgerError::NotFound(format!("CSV column '{}'", name)))
}

/// Phase M: apply a column mapping to the staged rows. Nothing is persisted;
/// phase F re-derives the same rows from the raw staging plus the mapping.
pub fn map_rows(conn: &Connection, user_id: i64, token: &str, mapping: &ColumnMapping) -> Result<Vec<MappedRow>> {
    let staging = load_staging(conn, user_id, token)?;
    apply_mapping(&staging, mapping)
}

pub fn apply_mapping(staging: &Staging, mapping: &ColumnMapping) -> Result<Vec<MappedRow>> {
    let date_i = column_index(&staging.headers, &mapping.date)?;
    let amount_i = column_index(&staging.headers, &mapping.amount)?;
    let kind_i = column_index(&staging.headers, &mapping.kind)?;
    let desc_i = match &mapping.description {
        Some(c) => Some(column_index(&staging.headers, c)?),
        None => None,
    };
    let source_i = column_index(&staging.headers, &mapping.source)?;
    let dest_i = match &mapping.dest {
        Some(c) => Some(column_index(&staging.headers, c)?),
        None => None,
    };

    let cell = |row: &[String], i: usize| row.get(i).cloned().unwrap_or_default();

    let mut out = Vec::with_capacity(staging.rows.len());
    for (index, row) in staging.rows.iter().enumerate() {
        let raw_date = cell(row, date_i);
        let raw_amount = cell(row, amount_i);
        let mut error = None;
        let date = match parse_flex_datetime(&raw_date) {
            Ok(d) => Some(d),
            Err(e) => {
                error = Some(e.to_string());
                None
            }
        };
        let amount = match parse_positive_amount(&raw_amount) {
            Ok(a) => Some(a),
            Err(e) => {
                if error.is_none() {
                    error = Some(e.to_string());
                }
                None
            }
        };
        out.push(MappedRow {
            index,
            date,
            raw_date,
            amount,
            raw_amount,
            kind: normalize_kind(&cell(row, kind_i)),
            description: desc_i.map(|i| cell(row, i)).unwrap_or_default(),
            source_name: cell(row, source_i),
            dest_name: dest_i.map(|i| cell(row, i)).filter(|s| !s.is_empty()),
            error,
        });
    }
    // Valid rows ascending by date; broken rows keep their relative order at
    // the end so diagnostics stay addressable.
    out.sort_by(|a, b| match (a.date, b.date) {
        (Some(x), Some(y)) => x.cmp(&y).then(a.index.cmp(&b.index)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.index.cmp(&b.index),
    });
    Ok(out)
}

#[derive(Debug, Serialize)]
pub struct ImportFailure {
    pub row_index: usize,
    pub kind: &'static str,
    pub message: String,
}

impl ImportFailure {
    /// A row failure keeps the inner error's tag and renders through
    /// `ImportRowError` so the message carries the row index.
    fn record(row_index: usize, cause: LedgerError) -> Self {
        let kind = cause.kind();
        let wrapped = LedgerError::ImportRowError {
            row_index,
            message: cause.to_string(),
        };
        ImportFailure {
            row_index,
            kind,
            message: wrapped.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub succeeded: usize,
    pub failures: Vec<ImportFailure>,
}

/// Per-row account choice for the per-row strategy.
#[derive(Debug, Clone, Deserialize)]
pub struct RowSelection {
    pub source: String,
    pub dest: Option<String>,
}

fn replay_row(
    conn: &mut Connection,
    user_id: i64,
    row: &MappedRow,
    source_key: &str,
    dest_key: Option<&str>,
) -> std::result::Result<(), LedgerError> {
    let date = row.date.ok_or(LedgerError::InvalidDate(row.raw_date.clone()))?;
    let amount = row
        .amount
        .ok_or(LedgerError::InvalidAmount(row.raw_amount.clone()))?;
    let source = AccountRef::parse_key(source_key)?;
    match row.kind {
        RowKind::Deposit => {
            ledger::record_deposit(conn, user_id, source, amount, &row.description, date)?;
        }
        RowKind::Withdrawal => {
            ledger::record_withdrawal(conn, user_id, source, amount, &row.description, date)?;
        }
        RowKind::Transfer => {
            let dest_key = dest_key.ok_or_else(|| {
                LedgerError::NotFound("destination account for transfer row".into())
            })?;
            let dest = AccountRef::parse_key(dest_key)?;
            transfer::transfer_internal(conn, user_id, source, dest, amount, &row.description, date)?;
        }
        RowKind::Unknown => {
            return Err(LedgerError::Conflict(format!(
                "row type could not be normalised ('{}')",
                row.kind.as_str()
            )));
        }
    }
    Ok(())
}

fn summarize(
    conn: &mut Connection,
    user_id: i64,
    token: &str,
    rows: Vec<MappedRow>,
    pick: impl Fn(&MappedRow) -> std::result::Result<(String, Option<String>), LedgerError>,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary {
        succeeded: 0,
        failures: Vec::new(),
    };
    for row in &rows {
        let outcome = pick(row).and_then(|(source, dest)| {
            replay_row(conn, user_id, row, &source, dest.as_deref())
        });
        match outcome {
            Ok(()) => summary.succeeded += 1,
            Err(e) => summary.failures.push(ImportFailure::record(row.index, e)),
        }
    }
    discard_staging(conn, user_id, token)?;
    Ok(summary)
}

/// Phase F, per-row strategy: the caller chose an account for each row.
pub fn finalise_per_row(
    conn: &mut Connection,
    user_id: i64,
    token: &str,
    mapping: &ColumnMapping,
    selections: &HashMap<usize, RowSelection>,
) -> Result<ImportSummary> {
    let rows = map_rows(conn, user_id, token, mapping)?;
    summarize(conn, user_id, token, rows, |row| {
        let sel = selections.get(&row.index).ok_or_else(|| {
            LedgerError::NotFound(format!("no account selection for row {}", row.index))
        })?;
        Ok((sel.source.clone(), sel.dest.clone()))
    })
}

/// Phase F, distinct-names strategy: one global mapping from each distinct
/// counterparty name seen in the CSV to an account key.
pub fn finalise_by_names(
    conn: &mut Connection,
    user_id: i64,
    token: &str,
    mapping: &ColumnMapping,
    names: &HashMap<String, String>,
) -> Result<ImportSummary> {
    let rows = map_rows(conn, user_id, token, mapping)?;
    summarize(conn, user_id, token, rows, |row| {
        let source = names.get(&row.source_name).cloned().ok_or_else(|| {
            LedgerError::NotFound(format!("no account mapped for name '{}'", row.source_name))
        })?;
        let dest = match &row.dest_name {
            Some(n) => Some(names.get(n).cloned().ok_or_else(|| {
                LedgerError::NotFound(format!("no account mapped for name '{}'", n))
            })?),
            None => None,
        };
        Ok((source, dest))
    })
}

/// Distinct counterparty names across the source and dest columns, for the
/// distinct-names strategy prompt.
pub fn distinct_names(rows: &[MappedRow]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for row in rows {
        if !row.source_name.is_empty() && !names.contains(&row.source_name) {
            names.push(row.source_name.clone());
        }
        if let Some(d) = &row.dest_name {
            if !names.contains(d) {
                names.push(d.clone());
            }
        }
    }
    names.sort();
    names
}
