// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use super::{
    date_or_now, json_flags, opt_amount, opt_day, opt_str, req_amount, req_id, req_str,
    resolve_account,
};
use crate::ledger::{self, TxPatch};
use crate::models::TxKind;
use crate::report::{self, HistoryFilter};
use crate::tags;
use crate::utils::{fmt_datetime, maybe_print_json, parse_flex_datetime, pretty_table};

pub fn handle(conn: &mut Connection, user_id: i64, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("deposit", sub)) => {
            let account = resolve_account(conn, user_id, req_str(sub, "account"))?;
            let id = ledger::record_deposit(
                conn,
                user_id,
                account,
                req_amount(sub, "amount")?,
                req_str(sub, "desc"),
                date_or_now(sub, "date")?,
            )?;
            println!("Recorded deposit #{}", id);
        }
        Some(("withdraw", sub)) => {
            let account = resolve_account(conn, user_id, req_str(sub, "account"))?;
            let id = ledger::record_withdrawal(
                conn,
                user_id,
                account,
                req_amount(sub, "amount")?,
                req_str(sub, "desc"),
                date_or_now(sub, "date")?,
            )?;
            println!("Recorded withdrawal #{}", id);
        }
        Some(("modify", sub)) => {
            let id = req_id(sub, "id")?;
            let date = match opt_str(sub, "date") {
                Some(s) => Some(parse_flex_datetime(s)?),
                None => None,
            };
            let patch = TxPatch {
                amount: opt_amount(sub, "amount")?,
                description: opt_str(sub, "desc").map(str::to_string),
                date,
                reference: opt_str(sub, "reference").map(str::to_string),
                external_reference: None,
            };
            ledger::modify_transaction(conn, user_id, id, &patch)?;
            println!("Updated transaction #{}", id);
        }
        Some(("rm", sub)) => {
            let id = req_id(sub, "id")?;
            ledger::delete_transaction(conn, user_id, id)?;
            println!("Deleted transaction #{}", id);
        }
        Some(("mark", sub)) => {
            let id = req_id(sub, "id")?;
            let status = if sub.get_flag("clear") {
                None
            } else {
                Some(req_str(sub, "status"))
            };
            ledger::set_accounting_status(conn, user_id, id, status)?;
            match status {
                Some(s) => println!("Marked transaction #{} as {}", id, s),
                None => println!("Cleared status of transaction #{}", id),
            }
        }
        Some(("list", sub)) => list(conn, user_id, sub)?,
        _ => {}
    }
    Ok(())
}

fn list(conn: &Connection, user_id: i64, sub: &clap::ArgMatches) -> Result<()> {
    let account = resolve_account(conn, user_id, req_str(sub, "account"))?;
    let kind = match opt_str(sub, "kind") {
        Some(k) => Some(TxKind::try_from(k)?),
        None => None,
    };
    let tag_id = match opt_str(sub, "tag") {
        Some(name) => Some(tags::id_for_tag(conn, user_id, name)?),
        None => None,
    };
    let filter = HistoryFilter {
        from: opt_day(sub, "from")?,
        to: opt_day(sub, "to")?,
        kind,
        min_amount: opt_amount(sub, "min")?,
        max_amount: opt_amount(sub, "max")?,
        text: opt_str(sub, "text").map(str::to_string),
        tag_id,
        limit: sub.get_one::<usize>("limit").copied(),
    };
    let rows = report::history(conn, user_id, account, &filter)?;
    let (json, jsonl) = json_flags(sub);
    if maybe_print_json(json, jsonl, &rows)? {
        return Ok(());
    }
    let data = rows
        .into_iter()
        .map(|r| {
            vec![
                r.id.to_string(),
                fmt_datetime(r.date),
                r.kind.as_str().to_string(),
                r.amount.to_string(),
                r.balance_after.to_string(),
                r.description,
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Id", "Date", "Kind", "Amount", "Balance", "Description"], data)
    );
    Ok(())
}
