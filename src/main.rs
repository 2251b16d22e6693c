// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use ledgerline::config::Config;
use ledgerline::{cli, commands};

fn init_logger(cfg: &Config) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => EnvFilter::from_default_env(),
        None => EnvFilter::new(cfg.log_directive()),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let matches = cli::build_cli().get_matches();
    let cfg = Config::from_matches(&matches)?;
    init_logger(&cfg);

    let mut conn = cfg.open_db()?;

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", cfg.db_path.display());
        }
        Some(("account", sub)) => commands::accounts::handle(&conn, &cfg, sub)?,
        Some(("tx", sub)) => commands::transactions::handle(&mut conn, &cfg, sub)?,
        Some(("recurring", sub)) => commands::recurring::handle(&mut conn, &cfg, sub)?,
        Some(("budget", sub)) => commands::budgets::handle(&conn, &cfg, sub)?,
        Some(("portfolio", sub)) => commands::portfolio::handle(&mut conn, &cfg, sub)?,
        Some(("report", sub)) => commands::reports::handle(&conn, &cfg, sub)?,
        Some(("config", sub)) => commands::settings::handle(&conn, &cfg, sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
