// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use crate::commands::{decimal_arg, required, required_id};
use crate::config::Config;
use crate::engine::accounts::{self, NewAccount};
use crate::models::{Account, AccountStatus, Currency};
use crate::utils::{fmt_money, maybe_print_json, pretty_table};

pub fn handle(conn: &Connection, cfg: &Config, m: &clap::ArgMatches) -> Result<()> {
    let user = cfg.user.as_str();
    match m.subcommand() {
        Some(("add", sub)) => {
            let new = NewAccount {
                name: required(sub, "name")?.to_string(),
                r#type: required(sub, "type")?.to_string(),
                currency: Currency {
                    code: required(sub, "currency")?.to_string(),
                    symbol: required(sub, "symbol")?.to_string(),
                    name: required(sub, "currency-name")?.to_string(),
                    locale: required(sub, "locale")?.to_string(),
                },
                opening_balance: decimal_arg(sub, "balance")?.unwrap_or_default(),
            };
            let acct = accounts::create_account(conn, user, &new)?;
            if !maybe_print_json(cfg.json, &acct)? {
                println!(
                    "Added account #{} '{}' ({}, {})",
                    acct.id, acct.name, acct.r#type, acct.currency.code
                );
            }
        }
        Some(("list", sub)) => {
            let list = accounts::list_accounts(conn, user, sub.get_flag("all"))?;
            if !maybe_print_json(cfg.json, &list)? {
                println!("{}", account_table(&list));
            }
        }
        Some(("rm", sub)) => {
            let acct = accounts::soft_delete_account(conn, user, required_id(sub)?)?;
            println!("Removed account #{} '{}' (restorable)", acct.id, acct.name);
        }
        Some(("restore", sub)) => {
            let acct = accounts::restore_account(conn, user, required_id(sub)?)?;
            println!("Restored account #{} '{}'", acct.id, acct.name);
        }
        Some(("lock", sub)) => {
            let acct = accounts::set_status(conn, user, required_id(sub)?, AccountStatus::Locked)?;
            println!("Locked account #{} '{}'", acct.id, acct.name);
        }
        Some(("unlock", sub)) => {
            let acct = accounts::set_status(conn, user, required_id(sub)?, AccountStatus::Active)?;
            println!("Unlocked account #{} '{}'", acct.id, acct.name);
        }
        _ => {}
    }
    Ok(())
}

fn account_table(list: &[Account]) -> comfy_table::Table {
    let rows = list
        .iter()
        .map(|a| {
            vec![
                a.id.to_string(),
                a.name.clone(),
                a.r#type.clone(),
                fmt_money(&a.balance, &a.currency.code),
                if a.is_deleted {
                    "deleted".to_string()
                } else {
                    a.status.to_string()
                },
            ]
        })
        .collect();
    pretty_table(&["ID", "Name", "Type", "Balance", "Status"], rows)
}
