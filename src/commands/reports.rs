// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::commands::{date_arg, end_of_day, start_of_day};
use crate::config::Config;
use crate::engine::analytics;
use crate::utils::{maybe_print_json, pretty_table};

pub fn handle(conn: &Connection, cfg: &Config, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("summary", sub)) => summary(conn, cfg, sub)?,
        Some(("categories", sub)) => categories(conn, cfg, sub)?,
        Some(("trend", sub)) => trend(conn, cfg, sub)?,
        Some(("net-worth", _)) => net_worth(conn, cfg)?,
        _ => {}
    }
    Ok(())
}

fn range(sub: &clap::ArgMatches) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
    Ok((
        date_arg(sub, "from")?.map(start_of_day),
        date_arg(sub, "to")?.map(end_of_day),
    ))
}

fn summary(conn: &Connection, cfg: &Config, sub: &clap::ArgMatches) -> Result<()> {
    let (from, to) = range(sub)?;
    let s = analytics::summary(conn, &cfg.user, from, to)?;
    if maybe_print_json(cfg.json, &s)? {
        return Ok(());
    }
    let rows = vec![
        vec!["Income".to_string(), s.income.to_string()],
        vec!["Expense".to_string(), s.expense.to_string()],
        vec!["Transfers".to_string(), s.transfer.to_string()],
        vec!["Investments".to_string(), s.investment.to_string()],
        vec!["Net".to_string(), s.net.to_string()],
        vec!["Transactions".to_string(), s.count.to_string()],
    ];
    println!("{}", pretty_table(&["", "Total"], rows));
    Ok(())
}

fn categories(conn: &Connection, cfg: &Config, sub: &clap::ArgMatches) -> Result<()> {
    let (from, to) = range(sub)?;
    let list = analytics::category_breakdown(conn, &cfg.user, from, to)?;
    if maybe_print_json(cfg.json, &list)? {
        return Ok(());
    }
    let rows = list
        .iter()
        .map(|c| {
            vec![
                c.category.clone(),
                c.total.to_string(),
                format!("{}%", c.percent),
                c.count.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Category", "Spent", "Share", "Count"], rows)
    );
    Ok(())
}

fn trend(conn: &Connection, cfg: &Config, sub: &clap::ArgMatches) -> Result<()> {
    let months = sub.get_one::<u32>("months").copied().unwrap_or(6);
    let list = analytics::monthly_trend(conn, &cfg.user, months, Utc::now().date_naive())?;
    if maybe_print_json(cfg.json, &list)? {
        return Ok(());
    }
    let rows = list
        .iter()
        .map(|t| {
            vec![
                t.month.clone(),
                t.income.to_string(),
                t.expense.to_string(),
                t.net.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Month", "Income", "Expense", "Net"], rows)
    );
    Ok(())
}

fn net_worth(conn: &Connection, cfg: &Config) -> Result<()> {
    let nw = analytics::net_worth(conn, &cfg.user)?;
    if !maybe_print_json(cfg.json, &nw)? {
        let rows = vec![
            vec!["Accounts".to_string(), nw.accounts_total.to_string()],
            vec!["Investments".to_string(), nw.investments_value.to_string()],
            vec!["Net worth".to_string(), nw.net_worth.to_string()],
        ];
        println!("{}", pretty_table(&["", "Value"], rows));
    }
    Ok(())
}
