// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;
use serde_json::json;

use super::{opt_day, req_str, resolve_account};
use crate::report::{self, HistoryFilter};
use crate::utils::fmt_datetime;

pub fn handle(conn: &Connection, user_id: i64, m: &clap::ArgMatches) -> Result<()> {
    let account = resolve_account(conn, user_id, req_str(m, "account"))?;
    let filter = HistoryFilter {
        from: opt_day(m, "from")?,
        to: opt_day(m, "to")?,
        ..Default::default()
    };
    let mut rows = report::history(conn, user_id, account, &filter)?;
    // History is newest-first; exports read better oldest-first.
    rows.reverse();

    let out = req_str(m, "out");
    match req_str(m, "format") {
        "json" => {
            let vals: Vec<_> = rows
                .iter()
                .map(|r| {
                    json!({
                        "id": r.id,
                        "date": fmt_datetime(r.date),
                        "kind": r.kind.as_str(),
                        "amount": r.amount.to_string(),
                        "currency": r.currency,
                        "description": r.description,
                        "reference": r.reference,
                        "balance_after": r.balance_after.to_string(),
                    })
                })
                .collect();
            std::fs::write(out, serde_json::to_string_pretty(&vals)?)?;
        }
        _ => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "id",
                "date",
                "kind",
                "amount",
                "currency",
                "description",
                "reference",
                "balance_after",
            ])?;
            for r in &rows {
                wtr.write_record([
                    r.id.to_string(),
                    fmt_datetime(r.date),
                    r.kind.as_str().to_string(),
                    r.amount.to_string(),
                    r.currency.clone(),
                    r.description.clone(),
                    r.reference.clone().unwrap_or_default(),
                    r.balance_after.to_string(),
                ])?;
            }
            wtr.flush()?;
        }
    }
    println!("Exported {} row(s) to {}", rows.len(), out);
    Ok(())
}
