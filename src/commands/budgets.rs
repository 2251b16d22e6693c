// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::commands::{decimal_arg, required};
use crate::config::Config;
use crate::engine::analytics;
use crate::engine::budgets;
use crate::utils::{get_alert_threshold, maybe_print_json, parse_month, pretty_table};

pub fn handle(conn: &Connection, cfg: &Config, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => set(conn, cfg, sub)?,
        Some(("status", sub)) => status(conn, cfg, sub)?,
        _ => {}
    }
    Ok(())
}

fn set(conn: &Connection, cfg: &Config, sub: &clap::ArgMatches) -> Result<()> {
    let (year, month) = parse_month(required(sub, "month")?)?;
    let category = required(sub, "category")?;
    let limit = decimal_arg(sub, "limit")?.context("Missing --limit")?;
    let alert = match decimal_arg(sub, "alert")? {
        Some(a) => a,
        None => get_alert_threshold(conn)?,
    };
    let b = budgets::set_budget(conn, &cfg.user, category, month, year, limit, alert)?;
    if !maybe_print_json(cfg.json, &b)? {
        println!(
            "Budget set for {}-{:02} / {} = {} (alert at {}%)",
            b.year, b.month, b.category, b.monthly_limit, b.alert_threshold
        );
    }
    Ok(())
}

fn status(conn: &Connection, cfg: &Config, sub: &clap::ArgMatches) -> Result<()> {
    let (year, month) = parse_month(required(sub, "month")?)?;
    let list = analytics::budget_overview(conn, &cfg.user, month, year)?;
    if maybe_print_json(cfg.json, &list)? {
        return Ok(());
    }
    let rows = list
        .iter()
        .map(|s| {
            let flag = if s.is_over_budget {
                "OVER"
            } else if s.is_near_limit {
                "near limit"
            } else {
                ""
            };
            vec![
                s.budget.category.clone(),
                s.budget.monthly_limit.to_string(),
                s.budget.current_spent.to_string(),
                s.remaining.to_string(),
                format!("{}%", s.spent_percent),
                flag.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Category", "Limit", "Spent", "Remaining", "Used", ""], rows)
    );
    Ok(())
}
