// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;
use std::fs;

use anyhow::{Context, Result};
use rusqlite::Connection;

use super::{json_flags, opt_str, req_str};
use crate::import::{self, ColumnMapping, ImportSummary, RowSelection};
use crate::utils::{maybe_print_json, pretty_table};

fn mapping_from_args(sub: &clap::ArgMatches) -> ColumnMapping {
    ColumnMapping {
        date: req_str(sub, "date").to_string(),
        amount: req_str(sub, "amount").to_string(),
        kind: req_str(sub, "kind").to_string(),
        description: opt_str(sub, "desc").map(str::to_string),
        source: req_str(sub, "source").to_string(),
        dest: opt_str(sub, "dest").map(str::to_string),
    }
}

fn print_summary(summary: &ImportSummary, json: bool, jsonl: bool) -> Result<()> {
    if maybe_print_json(json, jsonl, summary)? {
        return Ok(());
    }
    println!("Imported {} row(s)", summary.succeeded);
    if !summary.failures.is_empty() {
        let data = summary
            .failures
            .iter()
            .map(|f| vec![f.row_index.to_string(), f.kind.to_string(), f.message.clone()])
            .collect();
        println!("{}", pretty_table(&["Row", "Kind", "Problem"], data));
    }
    Ok(())
}

pub fn handle(conn: &mut Connection, user_id: i64, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("upload", sub)) => {
            let path = req_str(sub, "path");
            let text = fs::read_to_string(path).with_context(|| format!("Read CSV {}", path))?;
            let token = import::upload(conn, user_id, &text)?;
            let staging = import::load_staging(conn, user_id, &token)?;
            println!("Staged {} row(s) under token {}", staging.rows.len(), token);
            println!("Delimiter: {:?}", staging.delimiter as char);
            println!("Columns:   {}", staging.headers.join(", "));
            if !staging.accounts.is_empty() {
                let data = staging
                    .accounts
                    .into_iter()
                    .map(|(key, name)| vec![key, name])
                    .collect();
                println!("{}", pretty_table(&["Key", "Account"], data));
            }
        }
        Some(("discard", sub)) => {
            let token = req_str(sub, "token");
            import::discard_staging(conn, user_id, token)?;
            println!("Discarded staging {}", token);
        }
        Some(("map", sub)) => {
            let token = req_str(sub, "token");
            let mapping = mapping_from_args(sub);
            let rows = import::map_rows(conn, user_id, token, &mapping)?;
            let (json, jsonl) = json_flags(sub);
            if maybe_print_json(json, jsonl, &rows)? {
                return Ok(());
            }
            let names = import::distinct_names(&rows);
            let data = rows
                .iter()
                .map(|r| {
                    vec![
                        r.index.to_string(),
                        r.raw_date.clone(),
                        r.raw_amount.clone(),
                        r.kind.as_str().to_string(),
                        r.source_name.clone(),
                        r.dest_name.clone().unwrap_or_default(),
                        r.error.clone().unwrap_or_default(),
                    ]
                })
                .collect();
            println!(
                "{}",
                pretty_table(
                    &["Row", "Date", "Amount", "Kind", "Source", "Dest", "Problem"],
                    data
                )
            );
            if !names.is_empty() {
                println!("Counterparty names: {}", names.join(", "));
            }
        }
        Some(("finalise", sub)) => {
            let token = req_str(sub, "token");
            let mapping = mapping_from_args(sub);
            let (json, jsonl) = json_flags(sub);
            let summary = match (opt_str(sub, "selections"), opt_str(sub, "names")) {
                (Some(raw), _) => {
                    let selections: HashMap<usize, RowSelection> =
                        serde_json::from_str(raw).context("Parse --selections JSON")?;
                    import::finalise_per_row(conn, user_id, token, &mapping, &selections)?
                }
                (None, Some(raw)) => {
                    let names: HashMap<String, String> =
                        serde_json::from_str(raw).context("Parse --names JSON")?;
                    import::finalise_by_names(conn, user_id, token, &mapping, &names)?
                }
                (None, None) => {
                    anyhow::bail!("one of --selections or --names is required");
                }
            };
            print_summary(&summary, json, jsonl)?;
        }
        _ => {}
    }
    Ok(())
}
