// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, arg, command, value_parser};

use crate::engine::recurring::MAX_UPCOMING;

fn tx_type_arg() -> Arg {
    arg!(--"type" <TYPE> "income | expense | transfer | investment")
        .required(true)
        .value_parser(["income", "expense", "transfer", "investment"])
}

fn tag_arg() -> Arg {
    arg!(--tag <TAG> "Tag (repeatable)").action(ArgAction::Append)
}

fn id_arg() -> Arg {
    arg!(--id <ID>).required(true).value_parser(value_parser!(i64))
}

pub fn build_cli() -> Command {
    command!()
        .name("ledgerline")
        .about(
            "Personal finance ledger with recurring schedules, audited edits, budgets, \
             and investments",
        )
        .arg(arg!(--db <PATH> "SQLite database path").env("LEDGERLINE_DB").global(true))
        .arg(
            arg!(--user <USER> "User whose ledger to operate on")
                .env("LEDGERLINE_USER")
                .default_value("default")
                .global(true),
        )
        .arg(
            arg!(--"log-level" <LEVEL> "error | warn | info | debug | trace (RUST_LOG overrides)")
                .env("LEDGERLINE_LOG")
                .default_value("warn")
                .value_parser(["off", "error", "warn", "info", "debug", "trace"])
                .global(true),
        )
        .arg(arg!(--json "Print JSON instead of tables").global(true))
        .subcommand(Command::new("init").about("Initialize the database"))
        .subcommand(
            Command::new("account")
                .about("Manage accounts")
                .subcommand(
                    Command::new("add")
                        .arg(arg!(--name <NAME>).required(true))
                        .arg(
                            arg!(--"type" <TYPE> "savings, current, credit_card, cash, wallet, \
                                investment, loan, other")
                            .required(true),
                        )
                        .arg(arg!(--currency <CODE> "ISO code, e.g. USD").required(true))
                        .arg(arg!(--symbol <SYMBOL>).default_value(""))
                        .arg(arg!(--"currency-name" <NAME>).default_value(""))
                        .arg(arg!(--locale <LOCALE>).default_value(""))
                        .arg(arg!(--balance <AMOUNT> "Opening balance").default_value("0")),
                )
                .subcommand(Command::new("list").arg(arg!(--all "Include soft-deleted accounts")))
                .subcommand(Command::new("rm").about("Soft-delete an account").arg(id_arg()))
                .subcommand(Command::new("restore").arg(id_arg()))
                .subcommand(Command::new("lock").arg(id_arg()))
                .subcommand(Command::new("unlock").arg(id_arg())),
        )
        .subcommand(
            Command::new("tx")
                .about("Ledger transactions")
                .subcommand(
                    Command::new("add")
                        .arg(tx_type_arg())
                        .arg(arg!(--from <ACCOUNT_ID>).value_parser(value_parser!(i64)))
                        .arg(arg!(--to <ACCOUNT_ID>).value_parser(value_parser!(i64)))
                        .arg(arg!(--amount <AMOUNT>).required(true))
                        .arg(arg!(--category <CATEGORY>).required(true))
                        .arg(arg!(--mode <MODE> "Payment mode").default_value("cash"))
                        .arg(arg!(--note <NOTE>))
                        .arg(arg!(--date <DATE> "YYYY-MM-DD, defaults to now"))
                        .arg(tag_arg())
                        .arg(arg!(--rate <RATE> "Conversion rate for cross-currency transfers"))
                        .arg(arg!(
                            --converted <AMOUNT> "Converted amount, defaults to amount * rate"
                        ))
                        .arg(arg!(--"from-currency" <CODE>))
                        .arg(arg!(--"to-currency" <CODE>)),
                )
                .subcommand(
                    Command::new("list")
                        .arg(
                            arg!(--"type" <TYPE>)
                                .value_parser(["income", "expense", "transfer", "investment"]),
                        )
                        .arg(arg!(--account <ACCOUNT_ID>).value_parser(value_parser!(i64)))
                        .arg(arg!(--category <CATEGORY>))
                        .arg(arg!(--from <DATE> "YYYY-MM-DD"))
                        .arg(arg!(--to <DATE> "YYYY-MM-DD"))
                        .arg(arg!(--limit <N>).value_parser(value_parser!(usize))),
                )
                .subcommand(
                    Command::new("amend")
                        .about("Correct a transaction; the reason is logged")
                        .arg(id_arg())
                        .arg(arg!(--reason <REASON>).required(true))
                        .arg(arg!(--amount <AMOUNT>))
                        .arg(arg!(--category <CATEGORY>))
                        .arg(arg!(--mode <MODE>))
                        .arg(arg!(--note <NOTE>))
                        .arg(arg!(--date <DATE> "YYYY-MM-DD"))
                        .arg(tag_arg()),
                )
                .subcommand(Command::new("log").about("Show the audit trail").arg(id_arg())),
        )
        .subcommand(
            Command::new("recurring")
                .about("Recurring transaction schedules")
                .subcommand(
                    Command::new("add")
                        .arg(arg!(--name <NAME>).required(true))
                        .arg(tx_type_arg())
                        .arg(arg!(--from <ACCOUNT_ID>).value_parser(value_parser!(i64)))
                        .arg(arg!(--to <ACCOUNT_ID>).value_parser(value_parser!(i64)))
                        .arg(arg!(--amount <AMOUNT>).required(true))
                        .arg(arg!(--category <CATEGORY>).required(true))
                        .arg(arg!(--mode <MODE> "Payment mode").default_value("bank"))
                        .arg(arg!(--note <NOTE>))
                        .arg(tag_arg())
                        .arg(
                            arg!(--frequency <FREQ>)
                                .required(true)
                                .value_parser([
                                    "daily",
                                    "weekly",
                                    "biweekly",
                                    "monthly",
                                    "quarterly",
                                    "yearly",
                                ]),
                        )
                        .arg(
                            arg!(--"day-of-month" <DAY>)
                                .value_parser(value_parser!(u32).range(1..=31)),
                        )
                        .arg(
                            arg!(--"day-of-week" <DAY> "0 = Sunday")
                                .value_parser(value_parser!(u32).range(0..=6)),
                        )
                        .arg(arg!(--start <DATE> "YYYY-MM-DD").required(true))
                        .arg(arg!(--end <DATE> "YYYY-MM-DD"))
                        .arg(
                            arg!(--max <N> "Maximum executions")
                                .value_parser(value_parser!(u32)),
                        ),
                )
                .subcommand(Command::new("list"))
                .subcommand(
                    Command::new("run")
                        .about("Execute one definition")
                        .arg(id_arg())
                        .arg(arg!(--manual "Execute now even if not yet due")),
                )
                .subcommand(Command::new("tick").about("Execute every due definition"))
                .subcommand(Command::new("pause").about("Toggle pause/resume").arg(id_arg()))
                .subcommand(
                    Command::new("upcoming")
                        .arg(id_arg())
                        .arg(
                            arg!(--count <N> "Number of dates to preview (1-366)")
                                .value_parser(value_parser!(u64).range(1..=MAX_UPCOMING as u64))
                                .default_value("5"),
                        ),
                ),
        )
        .subcommand(
            Command::new("budget")
                .about("Monthly category budgets")
                .subcommand(
                    Command::new("set")
                        .arg(arg!(--month <MONTH> "YYYY-MM").required(true))
                        .arg(arg!(--category <CATEGORY>).required(true))
                        .arg(arg!(--limit <AMOUNT>).required(true))
                        .arg(arg!(--alert <PCT> "Alert threshold percent")),
                )
                .subcommand(
                    Command::new("status").arg(arg!(--month <MONTH> "YYYY-MM").required(true)),
                ),
        )
        .subcommand(
            Command::new("portfolio")
                .about("Investments")
                .subcommand(
                    Command::new("add")
                        .arg(arg!(--name <NAME>).required(true))
                        .arg(arg!(--kind <KIND> "stock, mutual_fund, bond, ...").required(true))
                        .arg(arg!(--symbol <SYMBOL>))
                        .arg(arg!(--date <DATE> "Purchase date YYYY-MM-DD").required(true)),
                )
                .subcommand(
                    Command::new("txn")
                        .arg(id_arg())
                        .arg(
                            arg!(--kind <KIND>)
                                .required(true)
                                .value_parser(["buy", "sell", "dividend", "split", "bonus"]),
                        )
                        .arg(arg!(--date <DATE> "YYYY-MM-DD").required(true))
                        .arg(arg!(--amount <AMOUNT>).default_value("0"))
                        .arg(arg!(--units <UNITS>).default_value("0"))
                        .arg(arg!(--price <PRICE>).default_value("0"))
                        .arg(arg!(--note <NOTE>))
                        .arg(
                            arg!(--"fund-from" <ACCOUNT_ID> "Debit a buy from this account")
                                .value_parser(value_parser!(i64)),
                        ),
                )
                .subcommand(
                    Command::new("price")
                        .arg(id_arg())
                        .arg(arg!(--price <PRICE>).required(true))
                        .arg(arg!(--date <DATE> "YYYY-MM-DD, defaults to today")),
                )
                .subcommand(
                    Command::new("show").arg(arg!(--id <ID>).value_parser(value_parser!(i64))),
                )
                .subcommand(
                    Command::new("xirr")
                        .arg(id_arg())
                        .arg(arg!(--"as-of" <DATE> "Valuation date, defaults to today")),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("Analytics")
                .subcommand(
                    Command::new("summary")
                        .arg(arg!(--from <DATE> "YYYY-MM-DD"))
                        .arg(arg!(--to <DATE> "YYYY-MM-DD")),
                )
                .subcommand(
                    Command::new("categories")
                        .arg(arg!(--from <DATE> "YYYY-MM-DD"))
                        .arg(arg!(--to <DATE> "YYYY-MM-DD")),
                )
                .subcommand(
                    Command::new("trend").arg(
                        arg!(--months <N>)
                            .value_parser(value_parser!(u32))
                            .default_value("6"),
                    ),
                )
                .subcommand(Command::new("net-worth")),
        )
        .subcommand(
            Command::new("config")
                .about("Persistent settings")
                .subcommand(Command::new("show"))
                .subcommand(
                    Command::new("set").arg(
                        arg!(--"alert-threshold" <PCT> "Default budget alert percent")
                            .required(true),
                    ),
                ),
        )
}
