// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

use crate::commands::decimal_arg;
use crate::config::Config;
use crate::utils::{
    get_alert_threshold, list_settings, maybe_print_json, pretty_table, set_alert_threshold,
};

#[derive(Serialize)]
struct Effective {
    db_path: String,
    user: String,
    log_level: String,
    budget_alert_threshold: String,
    stored: Vec<(String, String)>,
}

pub fn handle(conn: &Connection, cfg: &Config, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("show", _)) => {
            let eff = Effective {
                db_path: cfg.db_path.display().to_string(),
                user: cfg.user.clone(),
                log_level: cfg.log_level.clone(),
                budget_alert_threshold: get_alert_threshold(conn)?.to_string(),
                stored: list_settings(conn)?,
            };
            if !maybe_print_json(cfg.json, &eff)? {
                let mut rows = vec![
                    vec!["db".to_string(), eff.db_path],
                    vec!["user".to_string(), eff.user],
                    vec!["log-level".to_string(), eff.log_level],
                    vec!["budget_alert_threshold".to_string(), eff.budget_alert_threshold],
                ];
                rows.extend(
                    eff.stored
                        .into_iter()
                        .filter(|(k, _)| k != "budget_alert_threshold")
                        .map(|(k, v)| vec![k, v]),
                );
                println!("{}", pretty_table(&["Setting", "Value"], rows));
            }
        }
        Some(("set", sub)) => {
            if let Some(pct) = decimal_arg(sub, "alert-threshold")? {
                set_alert_threshold(conn, pct)?;
                tracing::info!(%pct, "default budget alert threshold updated");
                println!("Default budget alert threshold set to {}%", pct);
            }
        }
        _ => {}
    }
    Ok(())
}
