// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command};

fn with_json(c: Command) -> Command {
    c.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print JSON lines"),
    )
}

fn account_spec_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).required(true).help(help)
}

pub fn build_cli() -> Command {
    Command::new("ledgerclip")
        .about("Personal-finance ledger: accounts, transfers, journal, CSV import")
        .version(clap::crate_version!())
        .arg(
            Arg::new("user")
                .long("user")
                .global(true)
                .default_value("default")
                .help("Acting user profile"),
        )
        .subcommand(
            Command::new("init")
                .about("Initialize the database")
                .arg(
                    Arg::new("currency")
                        .long("currency")
                        .help("Set the default account currency"),
                ),
        )
        .subcommand(
            Command::new("bank")
                .about("Manage banks")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").required(true))
                        .arg(Arg::new("code").long("code"))
                        .arg(Arg::new("country").long("country"))
                        .arg(Arg::new("colour").long("colour"))
                        .arg(Arg::new("website").long("website")),
                )
                .subcommand(Command::new("list"))
                .subcommand(Command::new("rm").arg(Arg::new("id").required(true))),
        )
        .subcommand(
            Command::new("account")
                .about("Manage principal accounts and sub-accounts")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").required(true))
                        .arg(Arg::new("currency").long("currency"))
                        .arg(Arg::new("type").long("type").default_value("checking"))
                        .arg(Arg::new("initial").long("initial").default_value("0"))
                        .arg(Arg::new("bank").long("bank"))
                        .arg(Arg::new("iban").long("iban"))
                        .arg(Arg::new("bic").long("bic"))
                        .arg(Arg::new("number").long("number"))
                        .arg(Arg::new("opened").long("opened"))
                        .arg(
                            Arg::new("overdraft")
                                .long("overdraft")
                                .action(ArgAction::SetTrue)
                                .help("Allow a negative balance"),
                        ),
                )
                .subcommand(with_json(Command::new("list")))
                .subcommand(Command::new("rm").arg(Arg::new("name").required(true)))
                .subcommand(
                    Command::new("rename")
                        .arg(Arg::new("name").required(true))
                        .arg(Arg::new("new-name").required(true)),
                )
                .subcommand(
                    Command::new("overdraft")
                        .arg(Arg::new("name").required(true))
                        .arg(Arg::new("allow").required(true).value_parser(["on", "off"])),
                )
                .subcommand(
                    Command::new("sub")
                        .subcommand(
                            Command::new("add")
                                .arg(Arg::new("principal").long("principal").required(true))
                                .arg(Arg::new("name").required(true))
                                .arg(Arg::new("description").long("description"))
                                .arg(Arg::new("target").long("target"))
                                .arg(Arg::new("colour").long("colour"))
                                .arg(Arg::new("icon").long("icon"))
                                .arg(Arg::new("target-date").long("target-date")),
                        )
                        .subcommand(with_json(
                            Command::new("list")
                                .arg(Arg::new("principal").long("principal").required(true)),
                        ))
                        .subcommand(
                            Command::new("rm")
                                .arg(Arg::new("principal").long("principal").required(true))
                                .arg(Arg::new("name").required(true)),
                        ),
                ),
        )
        .subcommand(
            Command::new("tx")
                .about("Ledger rows: deposits, withdrawals, edits")
                .subcommand(
                    Command::new("deposit")
                        .arg(account_spec_arg("account", "Account (Name or Name/Sub)"))
                        .arg(Arg::new("amount").required(true))
                        .arg(Arg::new("desc").long("desc").default_value(""))
                        .arg(Arg::new("date").long("date")),
                )
                .subcommand(
                    Command::new("withdraw")
                        .arg(account_spec_arg("account", "Account (Name or Name/Sub)"))
                        .arg(Arg::new("amount").required(true))
                        .arg(Arg::new("desc").long("desc").default_value(""))
                        .arg(Arg::new("date").long("date")),
                )
                .subcommand(
                    Command::new("modify")
                        .arg(Arg::new("id").required(true))
                        .arg(Arg::new("amount").long("amount"))
                        .arg(Arg::new("desc").long("desc"))
                        .arg(Arg::new("date").long("date"))
                        .arg(Arg::new("reference").long("reference")),
                )
                .subcommand(Command::new("rm").arg(Arg::new("id").required(true)))
                .subcommand(
                    Command::new("mark")
                        .about("Set or clear the bookkeeping status of a transaction")
                        .arg(Arg::new("id").required(true))
                        .arg(
                            Arg::new("status")
                                .long("status")
                                .required_unless_present("clear"),
                        )
                        .arg(
                            Arg::new("clear")
                                .long("clear")
                                .action(ArgAction::SetTrue)
                                .conflicts_with("status"),
                        ),
                )
                .subcommand(with_json(
                    Command::new("list")
                        .arg(account_spec_arg("account", "Account (Name or Name/Sub)"))
                        .arg(Arg::new("from").long("from"))
                        .arg(Arg::new("to").long("to"))
                        .arg(Arg::new("kind").long("kind"))
                        .arg(Arg::new("min").long("min"))
                        .arg(Arg::new("max").long("max"))
                        .arg(Arg::new("text").long("text"))
                        .arg(Arg::new("tag").long("tag"))
                        .arg(
                            Arg::new("limit")
                                .long("limit")
                                .value_parser(clap::value_parser!(usize)),
                        ),
                )),
        )
        .subcommand(
            Command::new("transfer")
                .about("Internal and external transfers")
                .subcommand(
                    Command::new("internal")
                        .arg(account_spec_arg("from", "Source (Name or Name/Sub)"))
                        .arg(account_spec_arg("to", "Destination (Name or Name/Sub)"))
                        .arg(Arg::new("amount").required(true))
                        .arg(Arg::new("desc").long("desc").default_value(""))
                        .arg(Arg::new("date").long("date")),
                )
                .subcommand(
                    Command::new("external")
                        .arg(account_spec_arg("from", "Source (Name or Name/Sub)"))
                        .arg(Arg::new("iban").long("iban").required(true))
                        .arg(Arg::new("bic").long("bic"))
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("amount").required(true))
                        .arg(Arg::new("desc").long("desc").default_value(""))
                        .arg(Arg::new("date").long("date")),
                )
                .subcommand(Command::new("cancel").arg(Arg::new("intent").required(true)))
                .subcommand(Command::new("rm").arg(Arg::new("id").required(true)))
                .subcommand(with_json(Command::new("intents"))),
        )
        .subcommand(
            Command::new("plan")
                .about("Journal category plan")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("number").required(true))
                        .arg(Arg::new("name").required(true))
                        .arg(
                            Arg::new("type")
                                .long("type")
                                .required(true)
                                .value_parser(["asset", "liability", "charge", "revenue"]),
                        )
                        .arg(Arg::new("parent").long("parent")),
                )
                .subcommand(with_json(Command::new("list")))
                .subcommand(Command::new("rm").arg(Arg::new("id").required(true))),
        )
        .subcommand(
            Command::new("entry")
                .about("Journal entries")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("account").long("account").required(true))
                        .arg(Arg::new("category").long("category").required(true))
                        .arg(Arg::new("amount").required(true))
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(
                            Arg::new("kind")
                                .long("kind")
                                .required(true)
                                .value_parser(["expense", "revenue"]),
                        )
                        .arg(Arg::new("desc").long("desc").default_value(""))
                        .arg(Arg::new("reference").long("reference"))
                        .arg(Arg::new("tva-rate").long("tva-rate"))
                        .arg(Arg::new("tva-amount").long("tva-amount")),
                )
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("id").required(true))
                        .arg(Arg::new("amount").long("amount"))
                        .arg(Arg::new("date").long("date"))
                        .arg(Arg::new("category").long("category"))
                        .arg(Arg::new("desc").long("desc"))
                        .arg(Arg::new("reference").long("reference")),
                )
                .subcommand(
                    Command::new("status")
                        .arg(Arg::new("id").required(true))
                        .arg(
                            Arg::new("status")
                                .required(true)
                                .value_parser(["pending", "validated", "rejected"]),
                        ),
                )
                .subcommand(
                    Command::new("link")
                        .arg(Arg::new("id").required(true))
                        .arg(Arg::new("tx").required(true)),
                )
                .subcommand(Command::new("unlink").arg(Arg::new("id").required(true)))
                .subcommand(
                    Command::new("relink")
                        .arg(Arg::new("id").required(true))
                        .arg(Arg::new("tx").required(true)),
                )
                .subcommand(
                    Command::new("attach")
                        .arg(Arg::new("id").required(true))
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("mime").long("mime").required(true))
                        .arg(Arg::new("ref").long("ref").required(true)),
                )
                .subcommand(Command::new("detach").arg(Arg::new("id").required(true)))
                .subcommand(
                    Command::new("rm").arg(Arg::new("id").required(true)).arg(
                        Arg::new("hard")
                            .long("hard")
                            .action(ArgAction::SetTrue)
                            .help("Hard-delete instead of soft-delete"),
                    ),
                )
                .subcommand(with_json(
                    Command::new("list").arg(Arg::new("status").long("status")),
                )),
        )
        .subcommand(
            Command::new("tag")
                .about("User-defined transaction tags")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").required(true))
                        .arg(
                            Arg::new("kind")
                                .long("kind")
                                .required(true)
                                .value_parser(["revenue", "expense", "transfer"]),
                        )
                        .arg(Arg::new("colour").long("colour"))
                        .arg(Arg::new("icon").long("icon"))
                        .arg(Arg::new("budget").long("budget")),
                )
                .subcommand(with_json(Command::new("list")))
                .subcommand(Command::new("rm").arg(Arg::new("name").required(true)))
                .subcommand(
                    Command::new("apply")
                        .arg(Arg::new("tx").required(true))
                        .arg(Arg::new("name").required(true)),
                )
                .subcommand(
                    Command::new("remove")
                        .arg(Arg::new("tx").required(true))
                        .arg(Arg::new("name").required(true)),
                )
                .subcommand(with_json(
                    Command::new("budget")
                        .arg(Arg::new("name").required(true))
                        .arg(Arg::new("month").long("month").required(true)),
                ))
                .subcommand(with_json(
                    Command::new("of").arg(Arg::new("tx").required(true)),
                ))
                .subcommand(
                    Command::new("set-budget")
                        .arg(Arg::new("name").required(true))
                        .arg(Arg::new("amount").long("amount").conflicts_with("clear"))
                        .arg(
                            Arg::new("clear")
                                .long("clear")
                                .action(ArgAction::SetTrue)
                                .help("Remove the monthly budget"),
                        ),
                ),
        )
        .subcommand(
            Command::new("contact")
                .about("Contacts and their accounts")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").required(true))
                        .arg(Arg::new("email").long("email"))
                        .arg(Arg::new("phone").long("phone"))
                        .arg(Arg::new("iban").long("iban"))
                        .arg(Arg::new("note").long("note")),
                )
                .subcommand(with_json(Command::new("list")))
                .subcommand(Command::new("rm").arg(Arg::new("id").required(true)))
                .subcommand(
                    Command::new("link")
                        .arg(Arg::new("id").required(true))
                        .arg(Arg::new("account").long("account").required(true)),
                )
                .subcommand(
                    Command::new("unlink")
                        .arg(Arg::new("id").required(true))
                        .arg(Arg::new("account").long("account").required(true)),
                ),
        )
        .subcommand(
            Command::new("period")
                .about("Favourite reporting periods")
                .subcommand(
                    Command::new("save")
                        .arg(account_spec_arg("account", "Account (Name or Name/Sub)"))
                        .arg(Arg::new("name").required(true))
                        .arg(Arg::new("from").long("from").required(true))
                        .arg(Arg::new("to").long("to").required(true)),
                )
                .subcommand(with_json(Command::new("list")))
                .subcommand(Command::new("rm").arg(Arg::new("id").required(true))),
        )
        .subcommand(
            Command::new("import")
                .about("Three-phase CSV import")
                .subcommand(
                    Command::new("upload").arg(Arg::new("path").long("path").required(true)),
                )
                .subcommand(
                    Command::new("discard").arg(Arg::new("token").long("token").required(true)),
                )
                .subcommand(with_json(
                    Command::new("map")
                        .arg(Arg::new("token").long("token").required(true))
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("kind").long("kind").required(true))
                        .arg(Arg::new("desc").long("desc"))
                        .arg(Arg::new("source").long("source").required(true))
                        .arg(Arg::new("dest").long("dest")),
                ))
                .subcommand(with_json(
                    Command::new("finalise")
                        .arg(Arg::new("token").long("token").required(true))
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("kind").long("kind").required(true))
                        .arg(Arg::new("desc").long("desc"))
                        .arg(Arg::new("source").long("source").required(true))
                        .arg(Arg::new("dest").long("dest"))
                        .arg(
                            Arg::new("selections")
                                .long("selections")
                                .help("JSON: {row_index: {source, dest?}}"),
                        )
                        .arg(
                            Arg::new("names")
                                .long("names")
                                .help("JSON: {counterparty name: account key}"),
                        ),
                )),
        )
        .subcommand(
            Command::new("report")
                .about("Read-only reports")
                .subcommand(with_json(
                    Command::new("stats")
                        .arg(account_spec_arg("account", "Account (Name or Name/Sub)"))
                        .arg(Arg::new("from").long("from").required(true))
                        .arg(Arg::new("to").long("to").required(true)),
                ))
                .subcommand(with_json(
                    Command::new("daily")
                        .arg(account_spec_arg("account", "Account (Name or Name/Sub)"))
                        .arg(Arg::new("from").long("from").required(true))
                        .arg(Arg::new("to").long("to").required(true)),
                ))
                .subcommand(with_json(
                    Command::new("top")
                        .arg(account_spec_arg("account", "Account (Name or Name/Sub)"))
                        .arg(Arg::new("from").long("from").required(true))
                        .arg(Arg::new("to").long("to").required(true))
                        .arg(
                            Arg::new("direction")
                                .long("direction")
                                .default_value("all")
                                .value_parser(["incoming", "outgoing", "all"]),
                        ),
                ))
                .subcommand(with_json(
                    Command::new("compare")
                        .arg(account_spec_arg("left", "Left account (Name or Name/Sub)"))
                        .arg(account_spec_arg("right", "Right account (Name or Name/Sub)"))
                        .arg(
                            Arg::new("left-dir")
                                .long("left-dir")
                                .default_value("all")
                                .value_parser(["incoming", "outgoing", "all"]),
                        )
                        .arg(
                            Arg::new("right-dir")
                                .long("right-dir")
                                .default_value("all")
                                .value_parser(["incoming", "outgoing", "all"]),
                        )
                        .arg(Arg::new("from").long("from").required(true))
                        .arg(Arg::new("to").long("to").required(true)),
                ))
                .subcommand(with_json(
                    Command::new("pnl")
                        .arg(Arg::new("from").long("from").required(true))
                        .arg(Arg::new("to").long("to").required(true)),
                ))
                .subcommand(with_json(
                    Command::new("unlinked")
                        .arg(Arg::new("account").long("account"))
                        .arg(Arg::new("status").long("status")),
                )),
        )
        .subcommand(
            Command::new("export")
                .about("Export history as CSV or JSON")
                .arg(account_spec_arg("account", "Account (Name or Name/Sub)"))
                .arg(Arg::new("from").long("from"))
                .arg(Arg::new("to").long("to"))
                .arg(
                    Arg::new("format")
                        .long("format")
                        .default_value("csv")
                        .value_parser(["csv", "json"]),
                )
                .arg(Arg::new("out").long("out").required(true).help("Output file")),
        )
        .subcommand(Command::new("doctor").about("Audit ledger invariants"))
}
