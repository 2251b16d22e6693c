// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::Connection;

use crate::commands::{date_arg, decimal_arg, required, required_id, tags_arg};
use crate::config::Config;
use crate::engine::recurring::{self, ExecutionMode, ExecutionOutcome, NewRecurring};
use crate::models::{Frequency, RecurringTransaction, TransactionType};
use crate::utils::{maybe_print_json, pretty_table};

pub fn handle(conn: &mut Connection, cfg: &Config, m: &clap::ArgMatches) -> Result<()> {
    let user = cfg.user.as_str();
    match m.subcommand() {
        Some(("add", sub)) => {
            let new = NewRecurring {
                name: required(sub, "name")?.to_string(),
                r#type: required(sub, "type")?
                    .parse::<TransactionType>()
                    .context("Invalid --type")?,
                from_account: sub.get_one::<i64>("from").copied(),
                to_account: sub.get_one::<i64>("to").copied(),
                amount: decimal_arg(sub, "amount")?.context("Missing --amount")?,
                category: required(sub, "category")?.to_string(),
                payment_mode: required(sub, "mode")?.to_string(),
                note: sub.get_one::<String>("note").cloned(),
                tags: tags_arg(sub).unwrap_or_default(),
                frequency: required(sub, "frequency")?
                    .parse::<Frequency>()
                    .context("Invalid --frequency")?,
                day_of_month: sub.get_one::<u32>("day-of-month").copied(),
                day_of_week: sub.get_one::<u32>("day-of-week").copied(),
                start_date: date_arg(sub, "start")?.context("Missing --start")?,
                end_date: date_arg(sub, "end")?,
                max_executions: sub.get_one::<u32>("max").copied(),
            };
            let def = recurring::create_recurring(conn, user, &new)?;
            if !maybe_print_json(cfg.json, &def)? {
                println!(
                    "Added recurring #{} '{}' ({}), first run {}",
                    def.id, def.name, def.frequency, def.next_run_date
                );
            }
        }
        Some(("list", _)) => {
            let list = recurring::list_recurring(conn, user)?;
            if !maybe_print_json(cfg.json, &list)? {
                println!("{}", recurring_table(&list));
            }
        }
        Some(("run", sub)) => {
            let mode = if sub.get_flag("manual") {
                ExecutionMode::Manual
            } else {
                ExecutionMode::Scheduled
            };
            let outcome = recurring::execute_recurring(conn, user, required_id(sub)?, mode)?;
            if !maybe_print_json(cfg.json, &outcome)? {
                print_outcome(&outcome);
            }
        }
        Some(("tick", _)) => {
            let results = recurring::run_due(conn, user, Utc::now())?;
            if results.is_empty() {
                println!("Nothing due");
            }
            let mut failed = 0usize;
            for (id, res) in &results {
                match res {
                    Ok(outcome) => print_outcome(outcome),
                    Err(e) => {
                        failed += 1;
                        eprintln!("Recurring #{} failed: {}", id, e);
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("{} of {} due executions failed", failed, results.len());
            }
        }
        Some(("pause", sub)) => {
            let def = recurring::toggle_pause(conn, user, required_id(sub)?)?;
            let state = if def.is_paused { "paused" } else { "resumed" };
            println!("Recurring #{} '{}' {}", def.id, def.name, state);
        }
        Some(("upcoming", sub)) => {
            let def = recurring::get_recurring(conn, user, required_id(sub)?)?;
            let count = sub.get_one::<u64>("count").copied().unwrap_or(5);
            let dates = recurring::upcoming(&def, count as usize);
            if !maybe_print_json(cfg.json, &dates)? {
                for d in dates {
                    println!("{}", d);
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn print_outcome(outcome: &ExecutionOutcome) {
    match outcome {
        ExecutionOutcome::Executed {
            transaction,
            definition,
        } => println!(
            "Executed '{}' -> transaction #{} ({}); next run {}",
            definition.name, transaction.id, transaction.amount, definition.next_run_date
        ),
        ExecutionOutcome::Skipped {
            definition_id,
            reason,
        } => println!("Skipped #{}: {:?}", definition_id, reason),
    }
}

fn recurring_table(list: &[RecurringTransaction]) -> comfy_table::Table {
    let rows = list
        .iter()
        .map(|d| {
            let state = if !d.is_active {
                "inactive"
            } else if d.is_paused {
                "paused"
            } else {
                "active"
            };
            let runs = match d.max_executions {
                Some(max) => format!("{}/{}", d.total_executions, max),
                None => d.total_executions.to_string(),
            };
            vec![
                d.id.to_string(),
                d.name.clone(),
                d.r#type.to_string(),
                d.amount.to_string(),
                d.frequency.to_string(),
                d.next_run_date.to_string(),
                runs,
                state.to_string(),
            ]
        })
        .collect();
    pretty_table(
        &["ID", "Name", "Type", "Amount", "Frequency", "Next run", "Runs", "State"],
        rows,
    )
}
