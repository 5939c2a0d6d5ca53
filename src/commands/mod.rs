// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod accounts;
pub mod contacts;
pub mod doctor;
pub mod exporter;
pub mod importer;
pub mod journal;
pub mod periods;
pub mod reports;
pub mod tags;
pub mod transactions;
pub mod transfers;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::models::AccountRef;
use crate::registry;
use crate::utils::{parse_amount, parse_date, parse_flex_datetime};

/// Resolve a CLI account spec: `"Name"` names a principal account,
/// `"Name/Sub"` one of its sub-accounts.
pub fn resolve_account(conn: &Connection, user_id: i64, spec: &str) -> Result<AccountRef> {
    match spec.split_once('/') {
        None => {
            let id = registry::id_for_principal(conn, user_id, spec.trim())?;
            Ok(AccountRef::Principal(id))
        }
        Some((principal, sub)) => {
            let pid = registry::id_for_principal(conn, user_id, principal.trim())?;
            let sid = registry::id_for_sub_account(conn, user_id, pid, sub.trim())?;
            Ok(AccountRef::Sub(sid))
        }
    }
}

pub fn req_str<'a>(m: &'a clap::ArgMatches, name: &str) -> &'a str {
    m.get_one::<String>(name).map(String::as_str).unwrap_or("")
}

pub fn opt_str<'a>(m: &'a clap::ArgMatches, name: &str) -> Option<&'a str> {
    m.get_one::<String>(name).map(String::as_str)
}

pub fn req_id(m: &clap::ArgMatches, name: &str) -> Result<i64> {
    req_str(m, name)
        .parse::<i64>()
        .with_context(|| format!("'{}' is not a numeric id", req_str(m, name)))
}

pub fn req_amount(m: &clap::ArgMatches, name: &str) -> Result<Decimal> {
    Ok(parse_amount(req_str(m, name))?)
}

pub fn opt_amount(m: &clap::ArgMatches, name: &str) -> Result<Option<Decimal>> {
    match opt_str(m, name) {
        Some(s) => Ok(Some(parse_amount(s)?)),
        None => Ok(None),
    }
}

/// `--date` value, or now when absent.
pub fn date_or_now(m: &clap::ArgMatches, name: &str) -> Result<NaiveDateTime> {
    match opt_str(m, name) {
        Some(s) => Ok(parse_flex_datetime(s)?),
        None => Ok(Utc::now().naive_utc()),
    }
}

pub fn req_day(m: &clap::ArgMatches, name: &str) -> Result<NaiveDate> {
    Ok(parse_date(req_str(m, name))?)
}

pub fn opt_day(m: &clap::ArgMatches, name: &str) -> Result<Option<NaiveDate>> {
    match opt_str(m, name) {
        Some(s) => Ok(Some(parse_date(s)?)),
        None => Ok(None),
    }
}

pub fn json_flags(m: &clap::ArgMatches) -> (bool, bool) {
    (m.get_flag("json"), m.get_flag("jsonl"))
}
