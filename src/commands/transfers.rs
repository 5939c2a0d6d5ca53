// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use super::{date_or_now, json_flags, opt_str, req_amount, req_id, req_str, resolve_account};
use crate::transfer;
use crate::utils::{fmt_datetime, maybe_print_json, pretty_table};

pub fn handle(conn: &mut Connection, user_id: i64, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("internal", sub)) => {
            let source = resolve_account(conn, user_id, req_str(sub, "from"))?;
            let dest = resolve_account(conn, user_id, req_str(sub, "to"))?;
            let receipt = transfer::transfer_internal(
                conn,
                user_id,
                source,
                dest,
                req_amount(sub, "amount")?,
                req_str(sub, "desc"),
                date_or_now(sub, "date")?,
            )?;
            println!(
                "Transfer {} recorded (out #{}, in #{})",
                receipt.reference, receipt.out_id, receipt.in_id
            );
        }
        Some(("external", sub)) => {
            let source = resolve_account(conn, user_id, req_str(sub, "from"))?;
            let (tx_id, intent_id) = transfer::transfer_external(
                conn,
                user_id,
                source,
                req_str(sub, "iban"),
                opt_str(sub, "bic"),
                req_str(sub, "name"),
                req_amount(sub, "amount")?,
                req_str(sub, "desc"),
                date_or_now(sub, "date")?,
            )?;
            println!("External transfer #{} queued (intent #{})", tx_id, intent_id);
        }
        Some(("cancel", sub)) => {
            let intent_id = req_id(sub, "intent")?;
            let recredit = transfer::cancel_external_transfer(conn, user_id, intent_id)?;
            println!("Cancelled intent #{}, recredited via #{}", intent_id, recredit);
        }
        Some(("rm", sub)) => {
            let leg_id = req_id(sub, "id")?;
            transfer::delete_internal_transfer(conn, user_id, leg_id)?;
            println!("Deleted both legs of transfer containing #{}", leg_id);
        }
        Some(("intents", sub)) => {
            let intents = transfer::list_intents(conn, user_id)?;
            let (json, jsonl) = json_flags(sub);
            if maybe_print_json(json, jsonl, &intents)? {
                return Ok(());
            }
            let data = intents
                .into_iter()
                .map(|i| {
                    vec![
                        i.id.to_string(),
                        i.transaction_id.to_string(),
                        i.dest_name,
                        i.dest_iban,
                        i.amount.to_string(),
                        i.status.as_str().to_string(),
                        fmt_datetime(i.requested_at),
                    ]
                })
                .collect();
            println!(
                "{}",
                pretty_table(
                    &["Id", "Tx", "Recipient", "IBAN", "Amount", "Status", "Requested"],
                    data
                )
            );
        }
        _ => {}
    }
    Ok(())
}
