// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;

use super::{json_flags, opt_amount, opt_str, req_amount, req_str};
use crate::registry::{self, NewPrincipal, NewSubAccount};
use crate::utils::{default_currency, fmt_money, maybe_print_json, parse_date, pretty_table};

pub fn handle_bank(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = req_str(sub, "name");
            let id = registry::create_bank(
                conn,
                name,
                opt_str(sub, "code"),
                opt_str(sub, "country"),
                opt_str(sub, "colour"),
                opt_str(sub, "website"),
            )?;
            println!("Added bank '{}' (#{})", name, id);
        }
        Some(("list", _)) => {
            let banks = registry::list_banks(conn)?;
            let data = banks
                .into_iter()
                .map(|b| {
                    vec![
                        b.id.to_string(),
                        b.name,
                        b.code.unwrap_or_default(),
                        b.country.unwrap_or_default(),
                    ]
                })
                .collect();
            println!("{}", pretty_table(&["Id", "Name", "Code", "Country"], data));
        }
        Some(("rm", sub)) => {
            let id = super::req_id(sub, "id")?;
            registry::deactivate_bank(conn, id)?;
            println!("Removed bank #{}", id);
        }
        _ => {}
    }
    Ok(())
}

pub fn handle(conn: &Connection, user_id: i64, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = req_str(sub, "name");
            let currency = match opt_str(sub, "currency") {
                Some(c) => c.to_uppercase(),
                None => default_currency(conn)?,
            };
            let bank_id = match opt_str(sub, "bank") {
                Some(b) => Some(registry::bank_id_for_name(conn, b)?),
                None => None,
            };
            let opening_date = match opt_str(sub, "opened") {
                Some(d) => Some(parse_date(d)?),
                None => None,
            };
            let id = registry::create_principal(
                conn,
                user_id,
                &NewPrincipal {
                    name,
                    bank_id,
                    account_number: opt_str(sub, "number"),
                    iban: opt_str(sub, "iban"),
                    bic: opt_str(sub, "bic"),
                    kind: req_str(sub, "type"),
                    initial_balance: req_amount(sub, "initial")?,
                    currency: &currency,
                    opening_date,
                    allow_overdraft: sub.get_flag("overdraft"),
                },
            )?;
            println!("Added account '{}' (#{}, {})", name, id, currency);
        }
        Some(("list", sub)) => {
            let accounts = registry::list_principals(conn, user_id)?;
            let (json, jsonl) = json_flags(sub);
            if maybe_print_json(json, jsonl, &accounts)? {
                return Ok(());
            }
            let data = accounts
                .into_iter()
                .map(|a| {
                    vec![
                        a.id.to_string(),
                        a.name,
                        a.kind,
                        fmt_money(&a.balance, &a.currency),
                        if a.allow_overdraft { "yes".into() } else { "no".into() },
                    ]
                })
                .collect();
            println!(
                "{}",
                pretty_table(&["Id", "Name", "Type", "Balance", "Overdraft"], data)
            );
        }
        Some(("rm", sub)) => {
            let name = req_str(sub, "name");
            let id = registry::id_for_principal(conn, user_id, name)?;
            registry::deactivate_principal(conn, user_id, id)?;
            println!("Closed account '{}'", name);
        }
        Some(("rename", sub)) => {
            let name = req_str(sub, "name");
            let new_name = req_str(sub, "new-name");
            let id = registry::id_for_principal(conn, user_id, name)?;
            registry::rename_principal(conn, user_id, id, new_name)?;
            println!("Renamed account '{}' to '{}'", name, new_name);
        }
        Some(("overdraft", sub)) => {
            let name = req_str(sub, "name");
            let allow = req_str(sub, "allow") == "on";
            let id = registry::id_for_principal(conn, user_id, name)?;
            registry::set_principal_overdraft(conn, user_id, id, allow)?;
            println!(
                "Overdraft {} for '{}'",
                if allow { "enabled" } else { "disabled" },
                name
            );
        }
        Some(("sub", sub)) => handle_sub(conn, user_id, sub)?,
        _ => {}
    }
    Ok(())
}

fn handle_sub(conn: &Connection, user_id: i64, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let principal = req_str(sub, "principal");
            let pid = registry::id_for_principal(conn, user_id, principal)?;
            let name = req_str(sub, "name");
            let target_date = match opt_str(sub, "target-date") {
                Some(d) => Some(parse_date(d)?),
                None => None,
            };
            let id = registry::create_sub_account(
                conn,
                user_id,
                pid,
                &NewSubAccount {
                    name,
                    description: opt_str(sub, "description"),
                    target_amount: opt_amount(sub, "target")?,
                    colour: opt_str(sub, "colour"),
                    icon: opt_str(sub, "icon"),
                    target_date,
                },
            )?;
            println!("Added sub-account '{}/{}' (#{})", principal, name, id);
        }
        Some(("list", sub)) => {
            let principal = req_str(sub, "principal");
            let pid = registry::id_for_principal(conn, user_id, principal)?;
            let subs = registry::list_sub_accounts(conn, user_id, pid)?;
            let (json, jsonl) = json_flags(sub);
            if maybe_print_json(json, jsonl, &subs)? {
                return Ok(());
            }
            let data = subs
                .into_iter()
                .map(|s| {
                    vec![
                        s.id.to_string(),
                        s.name,
                        s.balance.to_string(),
                        s.target_amount
                            .as_ref()
                            .map(Decimal::to_string)
                            .unwrap_or_default(),
                    ]
                })
                .collect();
            println!("{}", pretty_table(&["Id", "Name", "Balance", "Target"], data));
        }
        Some(("rm", sub)) => {
            let principal = req_str(sub, "principal");
            let pid = registry::id_for_principal(conn, user_id, principal)?;
            let name = req_str(sub, "name");
            let sid = registry::id_for_sub_account(conn, user_id, pid, name)?;
            registry::deactivate_sub_account(conn, user_id, sid)?;
            println!("Removed sub-account '{}/{}'", principal, name);
        }
        _ => {}
    }
    Ok(())
}
