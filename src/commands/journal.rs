// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use super::{json_flags, opt_amount, opt_str, req_amount, req_day, req_id, req_str};
use crate::journal::{self, EntryPatch, NewEntry};
use crate::models::EntryStatus;
use crate::registry;
use crate::utils::{maybe_print_json, parse_date, pretty_table};

pub fn handle_plan(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let number: i64 = req_id(sub, "number")?;
            let name = req_str(sub, "name");
            let parent_id = match opt_str(sub, "parent") {
                Some(p) => Some(p.parse::<i64>()?),
                None => None,
            };
            let id = journal::create_category(conn, number, name, req_str(sub, "type"), parent_id)?;
            println!("Added category {} '{}' (#{})", number, name, id);
        }
        Some(("list", sub)) => {
            let cats = journal::list_categories(conn)?;
            let (json, jsonl) = json_flags(sub);
            if maybe_print_json(json, jsonl, &cats)? {
                return Ok(());
            }
            let data = cats
                .into_iter()
                .map(|c| {
                    vec![
                        c.id.to_string(),
                        c.number.to_string(),
                        c.name,
                        c.type_account,
                        c.parent_id.map(|p| p.to_string()).unwrap_or_default(),
                    ]
                })
                .collect();
            println!(
                "{}",
                pretty_table(&["Id", "Number", "Name", "Type", "Parent"], data)
            );
        }
        Some(("rm", sub)) => {
            let id = req_id(sub, "id")?;
            journal::deactivate_category(conn, id)?;
            println!("Removed category #{}", id);
        }
        _ => {}
    }
    Ok(())
}

pub fn handle_entry(conn: &mut Connection, user_id: i64, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let principal = req_str(sub, "account");
            let principal_id = registry::id_for_principal(conn, user_id, principal)?;
            let id = journal::create_entry(
                conn,
                user_id,
                &NewEntry {
                    date: req_day(sub, "date")?,
                    principal_id,
                    category_id: req_id(sub, "category")?,
                    amount: req_amount(sub, "amount")?,
                    description: req_str(sub, "desc"),
                    reference: opt_str(sub, "reference"),
                    kind: req_str(sub, "kind"),
                    tva_rate: opt_amount(sub, "tva-rate")?,
                    tva_amount: opt_amount(sub, "tva-amount")?,
                },
            )?;
            println!("Added journal entry #{}", id);
        }
        Some(("set", sub)) => {
            let id = req_id(sub, "id")?;
            let date = match opt_str(sub, "date") {
                Some(d) => Some(parse_date(d)?),
                None => None,
            };
            let category_id = match opt_str(sub, "category") {
                Some(c) => Some(c.parse::<i64>()?),
                None => None,
            };
            let patch = EntryPatch {
                date,
                category_id,
                amount: opt_amount(sub, "amount")?,
                description: opt_str(sub, "desc").map(str::to_string),
                reference: opt_str(sub, "reference").map(str::to_string),
                tva_rate: None,
                tva_amount: None,
            };
            journal::update_entry(conn, user_id, id, &patch)?;
            println!("Updated entry #{}", id);
        }
        Some(("status", sub)) => {
            let id = req_id(sub, "id")?;
            let next = EntryStatus::try_from(req_str(sub, "status"))?;
            journal::set_entry_status(conn, user_id, id, next)?;
            println!("Entry #{} is now {}", id, next.as_str());
        }
        Some(("link", sub)) => {
            let id = req_id(sub, "id")?;
            let tx = req_id(sub, "tx")?;
            journal::link_entry(conn, user_id, id, tx)?;
            println!("Linked entry #{} to transaction #{}", id, tx);
        }
        Some(("unlink", sub)) => {
            let id = req_id(sub, "id")?;
            journal::unlink_entry(conn, user_id, id)?;
            println!("Unlinked entry #{}", id);
        }
        Some(("relink", sub)) => {
            let id = req_id(sub, "id")?;
            let tx = req_id(sub, "tx")?;
            journal::relink_entry(conn, user_id, id, tx)?;
            println!("Relinked entry #{} to transaction #{}", id, tx);
        }
        Some(("attach", sub)) => {
            let id = req_id(sub, "id")?;
            journal::attach_file(
                conn,
                user_id,
                id,
                req_str(sub, "name"),
                req_str(sub, "mime"),
                req_str(sub, "ref"),
            )?;
            println!("Attached file to entry #{}", id);
        }
        Some(("detach", sub)) => {
            let id = req_id(sub, "id")?;
            match journal::detach_file(conn, user_id, id)? {
                Some(old) => println!("Detached '{}' from entry #{}", old, id),
                None => println!("Entry #{} had no attachment", id),
            }
        }
        Some(("rm", sub)) => {
            let id = req_id(sub, "id")?;
            journal::delete_entry(conn, user_id, id, sub.get_flag("hard"))?;
            println!("Deleted entry #{}", id);
        }
        Some(("list", sub)) => {
            let status = match opt_str(sub, "status") {
                Some(s) => Some(EntryStatus::try_from(s)?),
                None => None,
            };
            let entries = journal::list_entries(conn, user_id, status)?;
            let (json, jsonl) = json_flags(sub);
            if maybe_print_json(json, jsonl, &entries)? {
                return Ok(());
            }
            let data = entries
                .into_iter()
                .map(|e| {
                    vec![
                        e.id.to_string(),
                        e.date.to_string(),
                        e.kind,
                        e.amount.to_string(),
                        e.status.as_str().to_string(),
                        e.transaction_id.map(|t| t.to_string()).unwrap_or_default(),
                        e.description,
                    ]
                })
                .collect();
            println!(
                "{}",
                pretty_table(
                    &["Id", "Date", "Kind", "Amount", "Status", "Tx", "Description"],
                    data
                )
            );
        }
        _ => {}
    }
    Ok(())
}
