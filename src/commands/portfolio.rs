// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::commands::{date_arg, decimal_arg, required, required_id};
use crate::config::Config;
use crate::engine::investments::{self, InvestmentMetrics, NewInvestment};
use crate::models::{Investment, InvestmentTxn, InvestmentTxnKind};
use crate::utils::{maybe_print_json, pretty_table};

pub fn handle(conn: &mut Connection, cfg: &Config, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, cfg, sub)?,
        Some(("txn", sub)) => txn(conn, cfg, sub)?,
        Some(("price", sub)) => price(conn, cfg, sub)?,
        Some(("show", sub)) => show(conn, cfg, sub)?,
        Some(("xirr", sub)) => xirr(conn, cfg, sub)?,
        _ => {}
    }
    Ok(())
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn add(conn: &Connection, cfg: &Config, sub: &clap::ArgMatches) -> Result<()> {
    let new = NewInvestment {
        name: required(sub, "name")?.to_string(),
        kind: required(sub, "kind")?.to_string(),
        symbol: sub.get_one::<String>("symbol").cloned(),
        purchase_date: date_arg(sub, "date")?.context("Missing --date")?,
    };
    let inv = investments::create_investment(conn, &cfg.user, &new)?;
    if !maybe_print_json(cfg.json, &inv)? {
        println!("Added investment #{} '{}' ({})", inv.id, inv.name, inv.kind);
    }
    Ok(())
}

fn txn(conn: &mut Connection, cfg: &Config, sub: &clap::ArgMatches) -> Result<()> {
    let id = required_id(sub)?;
    let txn = InvestmentTxn {
        kind: required(sub, "kind")?
            .parse::<InvestmentTxnKind>()
            .context("Invalid --kind")?,
        date: date_arg(sub, "date")?.context("Missing --date")?,
        amount: decimal_arg(sub, "amount")?.unwrap_or_default(),
        units: decimal_arg(sub, "units")?.unwrap_or_default(),
        price: decimal_arg(sub, "price")?.unwrap_or_default(),
        note: sub.get_one::<String>("note").cloned(),
    };
    let funding = sub.get_one::<i64>("fund-from").copied();
    let kind = txn.kind;
    let inv = investments::record_investment_transaction(conn, &cfg.user, id, txn, funding)?;
    if !maybe_print_json(cfg.json, &inv)? {
        println!(
            "Recorded {} on '{}': units {}, invested {}, value {} ({})",
            kind, inv.name, inv.units, inv.invested_amount, inv.current_value, inv.status
        );
    }
    Ok(())
}

fn price(conn: &mut Connection, cfg: &Config, sub: &clap::ArgMatches) -> Result<()> {
    let id = required_id(sub)?;
    let price = decimal_arg(sub, "price")?.context("Missing --price")?;
    let date = date_arg(sub, "date")?.unwrap_or_else(today);
    let inv = investments::record_price(conn, &cfg.user, id, price, date)?;
    if !maybe_print_json(cfg.json, &inv)? {
        println!(
            "Priced '{}' at {} on {}: value {}",
            inv.name, inv.current_price, date, inv.current_value
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct InvestmentView {
    #[serde(flatten)]
    investment: Investment,
    metrics: InvestmentMetrics,
}

fn show(conn: &Connection, cfg: &Config, sub: &clap::ArgMatches) -> Result<()> {
    let list = match sub.get_one::<i64>("id") {
        Some(id) => vec![investments::get_investment(conn, &cfg.user, *id)?],
        None => investments::list_investments(conn, &cfg.user)?,
    };
    let today = today();
    let views: Vec<InvestmentView> = list
        .into_iter()
        .map(|inv| InvestmentView {
            metrics: investments::metrics(&inv, today),
            investment: inv,
        })
        .collect();
    if maybe_print_json(cfg.json, &views)? {
        return Ok(());
    }
    let rows = views
        .iter()
        .map(|v| {
            let i = &v.investment;
            vec![
                i.id.to_string(),
                i.name.clone(),
                i.kind.clone(),
                i.units.to_string(),
                i.invested_amount.to_string(),
                i.current_value.to_string(),
                format!("{} ({}%)", v.metrics.profit_loss, v.metrics.profit_loss_percent),
                v.metrics
                    .cagr
                    .map(|c| format!("{:.2}%", c))
                    .unwrap_or_else(|| "-".into()),
                i.status.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["ID", "Name", "Kind", "Units", "Invested", "Value", "P/L", "CAGR", "Status"],
            rows
        )
    );
    Ok(())
}

fn xirr(conn: &Connection, cfg: &Config, sub: &clap::ArgMatches) -> Result<()> {
    let id = required_id(sub)?;
    let as_of = date_arg(sub, "as-of")?.unwrap_or_else(today);
    let estimate = investments::compute_xirr(conn, &cfg.user, id, as_of)?;
    if maybe_print_json(cfg.json, &estimate)? {
        return Ok(());
    }
    match estimate {
        Some(e) if e.converged => println!("XIRR: {:.2}%", e.rate_percent),
        Some(e) => println!(
            "XIRR: ~{:.2}% (did not converge after {} iterations)",
            e.rate_percent, e.iterations
        ),
        None => println!("XIRR: not enough cash flows"),
    }
    Ok(())
}
