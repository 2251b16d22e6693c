// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Runtime configuration resolved from flags and environment. Persistent
//! preferences live in the `settings` table instead (see `utils`).

use anyhow::{Result, bail};
use clap::ArgMatches;
use rusqlite::Connection;
use std::path::PathBuf;

use crate::db;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub user: String,
    pub log_level: String,
    pub json: bool,
}

impl Config {
    pub fn from_matches(m: &ArgMatches) -> Result<Self> {
        let db_path = match m.get_one::<String>("db") {
            Some(p) if !p.trim().is_empty() => PathBuf::from(p.trim()),
            _ => db::default_db_path()?,
        };
        let user = m
            .get_one::<String>("user")
            .map(|u| u.trim().to_string())
            .unwrap_or_default();
        if user.is_empty() {
            bail!("--user cannot be empty");
        }
        let log_level = m
            .get_one::<String>("log-level")
            .cloned()
            .unwrap_or_else(|| "warn".to_string());
        Ok(Self {
            db_path,
            user,
            log_level,
            json: m.get_flag("json"),
        })
    }

    /// Directive used when `RUST_LOG` is not set.
    pub fn log_directive(&self) -> String {
        format!("{}={}", env!("CARGO_CRATE_NAME"), self.log_level)
    }

    pub fn open_db(&self) -> Result<Connection> {
        db::open_at(&self.db_path)
    }
}
