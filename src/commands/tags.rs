// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;

use super::{json_flags, opt_amount, opt_str, req_id, req_str};
use crate::tags;
use crate::utils::{maybe_print_json, pretty_table};

pub fn handle(conn: &Connection, user_id: i64, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = req_str(sub, "name");
            let id = tags::create_tag(
                conn,
                user_id,
                name,
                req_str(sub, "kind"),
                opt_str(sub, "colour"),
                opt_str(sub, "icon"),
                opt_amount(sub, "budget")?,
            )?;
            println!("Added tag '{}' (#{})", name, id);
        }
        Some(("list", sub)) => {
            let all = tags::list_tags(conn, user_id)?;
            let (json, jsonl) = json_flags(sub);
            if maybe_print_json(json, jsonl, &all)? {
                return Ok(());
            }
            let data = all
                .into_iter()
                .map(|t| {
                    vec![
                        t.id.to_string(),
                        t.name,
                        t.kind,
                        t.monthly_budget
                            .as_ref()
                            .map(Decimal::to_string)
                            .unwrap_or_default(),
                    ]
                })
                .collect();
            println!("{}", pretty_table(&["Id", "Name", "Kind", "Budget"], data));
        }
        Some(("rm", sub)) => {
            let name = req_str(sub, "name");
            let id = tags::id_for_tag(conn, user_id, name)?;
            tags::delete_tag(conn, user_id, id)?;
            println!("Removed tag '{}'", name);
        }
        Some(("apply", sub)) => {
            let tx = req_id(sub, "tx")?;
            let id = tags::id_for_tag(conn, user_id, req_str(sub, "name"))?;
            tags::apply_tag(conn, user_id, tx, id)?;
            println!("Tagged transaction #{}", tx);
        }
        Some(("remove", sub)) => {
            let tx = req_id(sub, "tx")?;
            let id = tags::id_for_tag(conn, user_id, req_str(sub, "name"))?;
            tags::remove_tag(conn, user_id, tx, id)?;
            println!("Untagged transaction #{}", tx);
        }
        Some(("budget", sub)) => {
            let id = tags::id_for_tag(conn, user_id, req_str(sub, "name"))?;
            let status = tags::budget_status(conn, user_id, id, req_str(sub, "month"))?;
            let (json, jsonl) = json_flags(sub);
            if maybe_print_json(json, jsonl, &status)? {
                return Ok(());
            }
            println!(
                "{}: budget {} spent {} remaining {}",
                status.month,
                status
                    .budget
                    .as_ref()
                    .map(Decimal::to_string)
                    .unwrap_or_else(|| "-".into()),
                status.spent,
                status
                    .remaining
                    .as_ref()
                    .map(Decimal::to_string)
                    .unwrap_or_else(|| "-".into()),
            );
        }
        Some(("set-budget", sub)) => {
            let name = req_str(sub, "name");
            let id = tags::id_for_tag(conn, user_id, name)?;
            let budget = if sub.get_flag("clear") {
                None
            } else {
                opt_amount(sub, "amount")?
            };
            tags::set_monthly_budget(conn, user_id, id, budget)?;
            match budget {
                Some(b) => println!("Budget for '{}' set to {}", name, b),
                None => println!("Budget for '{}' cleared", name),
            }
        }
        Some(("of", sub)) => {
            let tx = req_id(sub, "tx")?;
            let all = tags::tags_for_transaction(conn, user_id, tx)?;
            let (json, jsonl) = json_flags(sub);
            if maybe_print_json(json, jsonl, &all)? {
                return Ok(());
            }
            let data = all
                .into_iter()
                .map(|t| vec![t.id.to_string(), t.name, t.kind])
                .collect();
            println!("{}", pretty_table(&["Id", "Name", "Kind"], data));
        }
        _ => {}
    }
    Ok(())
}
