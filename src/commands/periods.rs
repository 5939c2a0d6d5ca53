// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use super::{json_flags, req_day, req_id, req_str, resolve_account};
use crate::periods;
use crate::utils::{maybe_print_json, pretty_table};

pub fn handle(conn: &Connection, user_id: i64, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("save", sub)) => {
            let account = resolve_account(conn, user_id, req_str(sub, "account"))?;
            let name = req_str(sub, "name");
            let id = periods::save_period(
                conn,
                user_id,
                account,
                name,
                req_day(sub, "from")?,
                req_day(sub, "to")?,
            )?;
            println!("Saved period '{}' (#{})", name, id);
        }
        Some(("list", sub)) => {
            let all = periods::list_periods(conn, user_id)?;
            let (json, jsonl) = json_flags(sub);
            if maybe_print_json(json, jsonl, &all)? {
                return Ok(());
            }
            let data = all
                .into_iter()
                .map(|p| {
                    vec![
                        p.id.to_string(),
                        p.name,
                        format!("{} {}", p.scope, p.account_id),
                        p.date_from.to_string(),
                        p.date_to.to_string(),
                    ]
                })
                .collect();
            println!("{}", pretty_table(&["Id", "Name", "Account", "From", "To"], data));
        }
        Some(("rm", sub)) => {
            let id = req_id(sub, "id")?;
            periods::delete_period(conn, user_id, id)?;
            println!("Removed period #{}", id);
        }
        _ => {}
    }
    Ok(())
}
