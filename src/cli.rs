// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn user_arg() -> Arg {
    Arg::new("user")
        .long("user")
        .required(true)
        .help("User id (verified externally)")
}

fn ledger_arg() -> Arg {
    Arg::new("ledger")
        .long("ledger")
        .default_value("expenses")
        .help("Ledger name (personal) or invite code (shared)")
}

fn kind_arg() -> Arg {
    Arg::new("kind")
        .long("kind")
        .default_value("personal")
        .value_parser(["personal", "shared"])
        .help("Ledger kind")
}

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print as JSON lines"),
    )
}

pub fn build_cli() -> Command {
    Command::new("ledgerclip")
        .about("Personal and shared expense ledgers, assets, and stock positions")
        .version(clap::crate_version!())
        .subcommand(Command::new("init").about("Create the database if missing"))
        .subcommand(
            Command::new("user")
                .about("User profiles")
                .subcommand(
                    Command::new("register")
                        .about("Create a profile with default options and relationship docs")
                        .arg(Arg::new("uid").long("uid").required(true))
                        .arg(Arg::new("email").long("email").required(true))
                        .arg(Arg::new("username").long("username")),
                )
                .subcommand(
                    Command::new("show")
                        .about("Show a user profile")
                        .arg(Arg::new("uid").long("uid").required(true)),
                )
                .subcommand(Command::new("list").about("List all user ids")),
        )
        .subcommand(
            Command::new("ledger")
                .about("Ledger lifecycle")
                .subcommand(
                    Command::new("create")
                        .about("Create a personal ledger")
                        .arg(user_arg())
                        .arg(Arg::new("name").long("name").required(true)),
                )
                .subcommand(
                    Command::new("create-shared")
                        .about("Create a shared ledger and return its invite code")
                        .arg(user_arg())
                        .arg(Arg::new("name").long("name").required(true)),
                )
                .subcommand(
                    Command::new("join")
                        .about("Join a shared ledger by invite code")
                        .arg(user_arg())
                        .arg(Arg::new("code").long("code").required(true))
                        .arg(Arg::new("password").long("password")),
                )
                .subcommand(
                    Command::new("leave")
                        .about("Detach a ledger from the user's list")
                        .arg(user_arg())
                        .arg(kind_arg())
                        .arg(Arg::new("ledger").long("ledger").required(true).help(
                            "Personal ledger name, or invite code for a shared ledger",
                        ))
                        .arg(
                            Arg::new("name")
                                .long("name")
                                .help("Shared ledger display name (required for shared)"),
                        ),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .about("List the user's ledgers")
                        .arg(user_arg()),
                ))
                .subcommand(
                    Command::new("members")
                        .about("Show a shared ledger's members")
                        .arg(Arg::new("code").long("code").required(true)),
                ),
        )
        .subcommand(
            Command::new("expense")
                .about("Expense records")
                .subcommand(
                    Command::new("add")
                        .arg(user_arg())
                        .arg(ledger_arg())
                        .arg(kind_arg())
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(Arg::new("item").long("item").required(true))
                        .arg(
                            Arg::new("amount")
                                .long("amount")
                                .required(true)
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(Arg::new("method").long("method").required(true))
                        .arg(Arg::new("category").long("category").required(true))
                        .arg(
                            Arg::new("type")
                                .long("type")
                                .default_value("支出")
                                .value_parser(["支出", "收入"]),
                        )
                        .arg(Arg::new("merchant").long("merchant"))
                        .arg(Arg::new("notes").long("notes"))
                        .arg(Arg::new("invoice").long("invoice"))
                        .arg(Arg::new("member").long("member")),
                )
                .subcommand(
                    Command::new("update")
                        .arg(user_arg())
                        .arg(ledger_arg())
                        .arg(kind_arg())
                        .arg(Arg::new("id").long("id").required(true))
                        .arg(Arg::new("date").long("date"))
                        .arg(Arg::new("item").long("item"))
                        .arg(Arg::new("amount").long("amount"))
                        .arg(Arg::new("method").long("method"))
                        .arg(Arg::new("category").long("category"))
                        .arg(Arg::new("notes").long("notes")),
                )
                .subcommand(
                    Command::new("rm")
                        .arg(user_arg())
                        .arg(ledger_arg())
                        .arg(kind_arg())
                        .arg(Arg::new("id").long("id").required(true)),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .arg(user_arg())
                        .arg(ledger_arg())
                        .arg(kind_arg())
                        .arg(
                            Arg::new("year")
                                .long("year")
                                .value_parser(value_parser!(i32)),
                        )
                        .arg(
                            Arg::new("month")
                                .long("month")
                                .value_parser(value_parser!(u32)),
                        )
                        .arg(Arg::new("from").long("from").help("Range start YYYY/MM/DD"))
                        .arg(Arg::new("to").long("to").help("Range end YYYY/MM/DD")),
                )),
        )
        .subcommand(
            Command::new("asset")
                .about("Asset holdings and stock positions")
                .subcommand(
                    Command::new("add")
                        .about("Add a holding; an existing item is treated as a buy")
                        .arg(user_arg())
                        .arg(Arg::new("item").long("item").required(true))
                        .arg(Arg::new("type").long("type").required(true))
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(Arg::new("value").long("value").required(true))
                        .arg(
                            Arg::new("quantity")
                                .long("quantity")
                                .default_value("-1")
                                .value_parser(value_parser!(i64))
                                .help("Share count; -1 for non-quantity holdings"),
                        )
                        .arg(Arg::new("notes").long("notes")),
                )
                .subcommand(
                    Command::new("buy")
                        .arg(user_arg())
                        .arg(Arg::new("item").long("item").required(true))
                        .arg(
                            Arg::new("shares")
                                .long("shares")
                                .required(true)
                                .value_parser(value_parser!(i64)),
                        ),
                )
                .subcommand(
                    Command::new("sell")
                        .arg(user_arg())
                        .arg(Arg::new("item").long("item").required(true))
                        .arg(
                            Arg::new("shares")
                                .long("shares")
                                .required(true)
                                .value_parser(value_parser!(i64)),
                        ),
                )
                .subcommand(
                    Command::new("update")
                        .arg(user_arg())
                        .arg(Arg::new("id").long("id").required(true))
                        .arg(Arg::new("item").long("item"))
                        .arg(Arg::new("type").long("type"))
                        .arg(Arg::new("date").long("date"))
                        .arg(Arg::new("value").long("value"))
                        .arg(Arg::new("quantity").long("quantity"))
                        .arg(Arg::new("notes").long("notes")),
                )
                .subcommand(
                    Command::new("rm")
                        .arg(user_arg())
                        .arg(Arg::new("id").long("id").required(true)),
                )
                .subcommand(json_flags(
                    Command::new("list")
                        .arg(user_arg())
                        .arg(
                            Arg::new("tradable")
                                .long("tradable")
                                .action(ArgAction::SetTrue)
                                .help("Only market-traded positions"),
                        )
                        .arg(
                            Arg::new("non-tradable")
                                .long("non-tradable")
                                .action(ArgAction::SetTrue)
                                .conflicts_with("tradable")
                                .help("Only holdings without market pricing"),
                        ),
                )),
        )
        .subcommand(
            Command::new("stock")
                .about("Shared stock catalog")
                .subcommand(
                    Command::new("register")
                        .about("Add a ticker to the catalog with a fresh price")
                        .arg(Arg::new("ticker").long("ticker").required(true)),
                )
                .subcommand(Command::new("list").about("List cached catalog prices"))
                .subcommand(
                    Command::new("refresh").about("Re-fetch every catalog price"),
                )
                .subcommand(
                    Command::new("sync")
                        .about("Recompute a user's position values from cached prices")
                        .arg(user_arg()),
                ),
        )
        .subcommand(
            Command::new("summary")
                .about("Derived aggregates")
                .subcommand(
                    Command::new("totals")
                        .about("Monthly expense/cash/liabilities totals for one ledger")
                        .arg(user_arg())
                        .arg(ledger_arg())
                        .arg(kind_arg())
                        .arg(
                            Arg::new("year")
                                .long("year")
                                .value_parser(value_parser!(i32)),
                        )
                        .arg(
                            Arg::new("month")
                                .long("month")
                                .value_parser(value_parser!(u32)),
                        ),
                )
                .subcommand(json_flags(
                    Command::new("ledgers")
                        .about("Monthly summary row per ledger")
                        .arg(user_arg())
                        .arg(
                            Arg::new("year")
                                .long("year")
                                .value_parser(value_parser!(i32)),
                        )
                        .arg(
                            Arg::new("month")
                                .long("month")
                                .value_parser(value_parser!(u32)),
                        ),
                ))
                .subcommand(json_flags(
                    Command::new("daily")
                        .about("Daily transactions plus month distributions")
                        .arg(user_arg())
                        .arg(ledger_arg())
                        .arg(kind_arg())
                        .arg(Arg::new("date").long("date").help("YYYY/MM/DD, default today")),
                )),
        )
        .subcommand(
            Command::new("import")
                .about("CSV import")
                .subcommand(
                    Command::new("expenses")
                        .arg(user_arg())
                        .arg(ledger_arg())
                        .arg(kind_arg())
                        .arg(Arg::new("path").long("path").required(true)),
                )
                .subcommand(
                    Command::new("assets")
                        .arg(user_arg())
                        .arg(Arg::new("path").long("path").required(true)),
                ),
        )
        .subcommand(
            Command::new("export")
                .about("CSV/JSON export")
                .subcommand(
                    Command::new("expenses")
                        .arg(user_arg())
                        .arg(ledger_arg())
                        .arg(kind_arg())
                        .arg(
                            Arg::new("format")
                                .long("format")
                                .default_value("csv")
                                .value_parser(["csv", "json"]),
                        )
                        .arg(Arg::new("out").long("out").required(true)),
                )
                .subcommand(
                    Command::new("assets")
                        .arg(user_arg())
                        .arg(
                            Arg::new("format")
                                .long("format")
                                .default_value("csv")
                                .value_parser(["csv", "json"]),
                        )
                        .arg(Arg::new("out").long("out").required(true)),
                ),
        )
        .subcommand(
            Command::new("doctor")
                .about("Integrity checks over a user's collections")
                .arg(user_arg()),
        )
}
