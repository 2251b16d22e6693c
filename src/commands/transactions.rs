// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result, bail};
use rusqlite::Connection;

use crate::commands::{
    date_arg, decimal_arg, end_of_day, required, required_id, start_of_day, tags_arg,
};
use crate::config::Config;
use crate::engine::ledger::{self, TransactionFilter};
use crate::engine::transactions::{self, ConversionRequest, NewTransaction, TransactionChanges};
use crate::models::{Transaction, TransactionType};
use crate::utils::{maybe_print_json, pretty_table};

pub fn handle(conn: &mut Connection, cfg: &Config, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, cfg, sub)?,
        Some(("list", sub)) => list(conn, cfg, sub)?,
        Some(("amend", sub)) => amend(conn, cfg, sub)?,
        Some(("log", sub)) => log(conn, cfg, sub)?,
        _ => {}
    }
    Ok(())
}

fn tx_type(sub: &clap::ArgMatches) -> Result<Option<TransactionType>> {
    sub.get_one::<String>("type")
        .map(|s| s.parse::<TransactionType>())
        .transpose()
        .context("Invalid --type")
}

fn add(conn: &mut Connection, cfg: &Config, sub: &clap::ArgMatches) -> Result<()> {
    let r#type = tx_type(sub)?.context("Missing --type")?;
    let amount = decimal_arg(sub, "amount")?.context("Missing --amount")?;
    let conversion = match decimal_arg(sub, "rate")? {
        Some(rate) => Some(ConversionRequest {
            rate,
            converted_amount: decimal_arg(sub, "converted")?,
            from_currency: required(sub, "from-currency")
                .context("--rate needs --from-currency")?
                .to_string(),
            to_currency: required(sub, "to-currency")
                .context("--rate needs --to-currency")?
                .to_string(),
        }),
        None => None,
    };
    let new = NewTransaction {
        r#type,
        from_account: sub.get_one::<i64>("from").copied(),
        to_account: sub.get_one::<i64>("to").copied(),
        amount,
        category: required(sub, "category")?.to_string(),
        payment_mode: required(sub, "mode")?.to_string(),
        note: sub.get_one::<String>("note").cloned(),
        transaction_date: date_arg(sub, "date")?.map(start_of_day),
        conversion,
        tags: tags_arg(sub).unwrap_or_default(),
    };
    let txn = transactions::create_transaction(conn, &cfg.user, &new)?;
    if !maybe_print_json(cfg.json, &txn)? {
        println!(
            "Recorded {} #{}: {} ({})",
            txn.r#type, txn.id, txn.amount, txn.category
        );
    }
    Ok(())
}

fn list(conn: &Connection, cfg: &Config, sub: &clap::ArgMatches) -> Result<()> {
    let filter = TransactionFilter {
        r#type: tx_type(sub)?,
        account: sub.get_one::<i64>("account").copied(),
        category: sub.get_one::<String>("category").cloned(),
        from: date_arg(sub, "from")?.map(start_of_day),
        to: date_arg(sub, "to")?.map(end_of_day),
        limit: sub.get_one::<usize>("limit").copied(),
    };
    let list = ledger::list_transactions(conn, &cfg.user, &filter)?;
    if !maybe_print_json(cfg.json, &list)? {
        println!("{}", transaction_table(&list));
    }
    Ok(())
}

fn amend(conn: &mut Connection, cfg: &Config, sub: &clap::ArgMatches) -> Result<()> {
    let id = required_id(sub)?;
    let reason = required(sub, "reason")?;
    let changes = TransactionChanges {
        amount: decimal_arg(sub, "amount")?,
        category: sub.get_one::<String>("category").cloned(),
        payment_mode: sub.get_one::<String>("mode").cloned(),
        note: sub.get_one::<String>("note").cloned(),
        transaction_date: date_arg(sub, "date")?.map(start_of_day),
        tags: tags_arg(sub),
    };
    if changes.is_empty() {
        bail!(
            "Nothing to amend; pass at least one of \
             --amount, --category, --mode, --note, --date, --tag"
        );
    }
    let txn = transactions::amend_transaction(conn, &cfg.user, id, &changes, reason)?;
    if !maybe_print_json(cfg.json, &txn)? {
        println!("Amended transaction #{}: {} ({})", txn.id, txn.amount, txn.category);
    }
    Ok(())
}

fn log(conn: &Connection, cfg: &Config, sub: &clap::ArgMatches) -> Result<()> {
    let id = required_id(sub)?;
    let logs = ledger::list_logs(conn, &cfg.user, id)?;
    if maybe_print_json(cfg.json, &logs)? {
        return Ok(());
    }
    let rows = logs
        .iter()
        .map(|l| {
            vec![
                l.created_at.format("%Y-%m-%d %H:%M").to_string(),
                l.reason.clone(),
                l.old_data.amount.to_string(),
                l.new_data.amount.to_string(),
                format!("{} -> {}", l.old_data.category, l.new_data.category),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["When", "Reason", "Old amount", "New amount", "Category"], rows)
    );
    Ok(())
}

fn transaction_table(list: &[Transaction]) -> comfy_table::Table {
    let acct = |a: Option<i64>| a.map(|id| format!("#{}", id)).unwrap_or_default();
    let rows = list
        .iter()
        .map(|t| {
            vec![
                t.id.to_string(),
                t.transaction_date.format("%Y-%m-%d").to_string(),
                t.r#type.to_string(),
                acct(t.from_account),
                acct(t.to_account),
                t.amount.to_string(),
                t.category.clone(),
                t.note.clone().unwrap_or_default(),
                if t.was_edited { "edited".into() } else { String::new() },
            ]
        })
        .collect();
    pretty_table(
        &["ID", "Date", "Type", "From", "To", "Amount", "Category", "Note", ""],
        rows,
    )
}
