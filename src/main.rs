// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use ledgerclip::{cli, commands, db, utils};

fn main() -> Result<()> {
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let mut conn = db::open_or_init()?;
    let user = matches
        .get_one::<String>("user")
        .map(String::as_str)
        .unwrap_or("default");
    let user_id = utils::ensure_user(&conn, user)?;

    match matches.subcommand() {
        Some(("init", sub)) => {
            if let Some(ccy) = sub.get_one::<String>("currency") {
                utils::set_default_currency(&conn, &ccy.to_uppercase())?;
            }
            println!("Database initialized at {}", db::db_path()?.display());
        }
        Some(("bank", sub)) => commands::accounts::handle_bank(&conn, sub)?,
        Some(("account", sub)) => commands::accounts::handle(&conn, user_id, sub)?,
        Some(("tx", sub)) => commands::transactions::handle(&mut conn, user_id, sub)?,
        Some(("transfer", sub)) => commands::transfers::handle(&mut conn, user_id, sub)?,
        Some(("plan", sub)) => commands::journal::handle_plan(&conn, sub)?,
        Some(("entry", sub)) => commands::journal::handle_entry(&mut conn, user_id, sub)?,
        Some(("tag", sub)) => commands::tags::handle(&conn, user_id, sub)?,
        Some(("contact", sub)) => commands::contacts::handle(&conn, user_id, sub)?,
        Some(("period", sub)) => commands::periods::handle(&conn, user_id, sub)?,
        Some(("import", sub)) => commands::importer::handle(&mut conn, user_id, sub)?,
        Some(("report", sub)) => commands::reports::handle(&conn, user_id, sub)?,
        Some(("export", sub)) => commands::exporter::handle(&conn, user_id, sub)?,
        Some(("doctor", _)) => commands::doctor::handle(&conn)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
