// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use super::{json_flags, opt_str, req_id, req_str};
use crate::contacts;
use crate::registry;
use crate::utils::{maybe_print_json, normalize_iban, pretty_table};

pub fn handle(conn: &Connection, user_id: i64, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = req_str(sub, "name");
            let iban = match opt_str(sub, "iban") {
                Some(i) => Some(normalize_iban(i)?),
                None => None,
            };
            let id = contacts::create_contact(
                conn,
                user_id,
                name,
                opt_str(sub, "email"),
                opt_str(sub, "phone"),
                iban.as_deref(),
                opt_str(sub, "note"),
            )?;
            println!("Added contact '{}' (#{})", name, id);
        }
        Some(("list", sub)) => {
            let all = contacts::list_contacts(conn, user_id)?;
            let (json, jsonl) = json_flags(sub);
            if maybe_print_json(json, jsonl, &all)? {
                return Ok(());
            }
            let data = all
                .into_iter()
                .map(|c| {
                    vec![
                        c.id.to_string(),
                        c.name,
                        c.email.unwrap_or_default(),
                        c.iban.unwrap_or_default(),
                    ]
                })
                .collect();
            println!("{}", pretty_table(&["Id", "Name", "Email", "IBAN"], data));
        }
        Some(("rm", sub)) => {
            let id = req_id(sub, "id")?;
            contacts::deactivate_contact(conn, user_id, id)?;
            println!("Removed contact #{}", id);
        }
        Some(("link", sub)) => {
            let id = req_id(sub, "id")?;
            let pid = registry::id_for_principal(conn, user_id, req_str(sub, "account"))?;
            contacts::link_account(conn, user_id, id, pid)?;
            println!("Linked contact #{} to account '{}'", id, req_str(sub, "account"));
        }
        Some(("unlink", sub)) => {
            let id = req_id(sub, "id")?;
            let pid = registry::id_for_principal(conn, user_id, req_str(sub, "account"))?;
            contacts::unlink_account(conn, user_id, id, pid)?;
            println!("Unlinked contact #{} from account '{}'", id, req_str(sub, "account"));
        }
        _ => {}
    }
    Ok(())
}
