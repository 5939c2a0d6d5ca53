// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use super::{json_flags, opt_str, req_day, req_str, resolve_account};
use crate::report::{self, Direction};
use crate::utils::{fmt_datetime, maybe_print_json, pretty_table};

fn direction(s: &str) -> Direction {
    match s {
        "incoming" => Direction::Incoming,
        "outgoing" => Direction::Outgoing,
        _ => Direction::All,
    }
}

pub fn handle(conn: &Connection, user_id: i64, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("stats", sub)) => {
            let account = resolve_account(conn, user_id, req_str(sub, "account"))?;
            let stats = report::period_stats(
                conn,
                user_id,
                account,
                req_day(sub, "from")?,
                req_day(sub, "to")?,
            )?;
            let (json, jsonl) = json_flags(sub);
            if maybe_print_json(json, jsonl, &stats)? {
                return Ok(());
            }
            println!(
                "credits {}  debits {}  count {}  average {}",
                stats.credits, stats.debits, stats.count, stats.average
            );
        }
        Some(("daily", sub)) => {
            let account = resolve_account(conn, user_id, req_str(sub, "account"))?;
            let series = report::daily_balances(
                conn,
                user_id,
                account,
                req_day(sub, "from")?,
                req_day(sub, "to")?,
            )?;
            let (json, jsonl) = json_flags(sub);
            if maybe_print_json(json, jsonl, &series)? {
                return Ok(());
            }
            let data = series
                .into_iter()
                .map(|d| vec![d.date.to_string(), d.balance.to_string()])
                .collect();
            println!("{}", pretty_table(&["Date", "Balance"], data));
        }
        Some(("top", sub)) => {
            let account = resolve_account(conn, user_id, req_str(sub, "account"))?;
            let totals = report::top_counterparties(
                conn,
                user_id,
                account,
                req_day(sub, "from")?,
                req_day(sub, "to")?,
                direction(req_str(sub, "direction")),
            )?;
            let (json, jsonl) = json_flags(sub);
            if maybe_print_json(json, jsonl, &totals)? {
                return Ok(());
            }
            let data = totals
                .into_iter()
                .map(|t| vec![t.counterparty, t.total.to_string(), t.count.to_string()])
                .collect();
            println!("{}", pretty_table(&["Counterparty", "Total", "Count"], data));
        }
        Some(("compare", sub)) => {
            let left = resolve_account(conn, user_id, req_str(sub, "left"))?;
            let right = resolve_account(conn, user_id, req_str(sub, "right"))?;
            let months = report::compare_pair(
                conn,
                user_id,
                (left, direction(req_str(sub, "left-dir"))),
                (right, direction(req_str(sub, "right-dir"))),
                req_day(sub, "from")?,
                req_day(sub, "to")?,
            )?;
            let (json, jsonl) = json_flags(sub);
            if maybe_print_json(json, jsonl, &months)? {
                return Ok(());
            }
            let data = months
                .into_iter()
                .map(|p| vec![p.month, p.left.to_string(), p.right.to_string()])
                .collect();
            println!("{}", pretty_table(&["Month", "Left", "Right"], data));
        }
        Some(("pnl", sub)) => {
            let rpt = report::pnl(conn, user_id, req_day(sub, "from")?, req_day(sub, "to")?)?;
            let (json, jsonl) = json_flags(sub);
            if maybe_print_json(json, jsonl, &rpt)? {
                return Ok(());
            }
            let data = rpt
                .lines
                .iter()
                .map(|l| {
                    vec![
                        l.category.clone(),
                        l.type_account.clone(),
                        l.total.to_string(),
                    ]
                })
                .collect();
            println!("{}", pretty_table(&["Category", "Type", "Total"], data));
            println!(
                "revenue {}  charges {}  net {}",
                rpt.revenue, rpt.charges, rpt.net
            );
        }
        Some(("unlinked", sub)) => {
            let account = match opt_str(sub, "account") {
                Some(spec) => Some(resolve_account(conn, user_id, spec)?),
                None => None,
            };
            let rows =
                report::unlinked_transactions(conn, user_id, account, opt_str(sub, "status"))?;
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
                        r.description,
                    ]
                })
                .collect();
            println!(
                "{}",
                pretty_table(&["Id", "Date", "Kind", "Amount", "Description"], data)
            );
        }
        _ => {}
    }
    Ok(())
}
