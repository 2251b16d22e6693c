// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::{Connection, TransactionBehavior};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::LedgerResult;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Ledgerline", "ledgerline"));

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn default_db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("ledgerline.sqlite"))
}

pub fn open_at(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Create DB dir {}", parent.display()))?;
    }
    let mut conn =
        Connection::open(path).with_context(|| format!("Open DB at {}", path.display()))?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    init_schema(&mut conn)?;
    tracing::debug!(path = %path.display(), "database ready");
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory()?;
    init_schema(&mut conn)?;
    Ok(conn)
}

/// Runs `f` inside an IMMEDIATE transaction. The write lock is held before the
/// first read, so check-then-mutate sequences cannot interleave across
/// connections. Any error rolls the whole unit back.
pub fn with_write_tx<T>(
    conn: &mut Connection,
    f: impl FnOnce(&rusqlite::Transaction<'_>) -> LedgerResult<T>,
) -> LedgerResult<T> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let out = f(&tx)?;
    tx.commit()?;
    Ok(out)
}

pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS accounts(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        name TEXT NOT NULL,
        type TEXT NOT NULL,
        currency_code TEXT NOT NULL,
        currency_symbol TEXT NOT NULL,
        currency_name TEXT NOT NULL,
        currency_locale TEXT NOT NULL,
        balance TEXT NOT NULL DEFAULT '0',
        status TEXT NOT NULL DEFAULT 'active' CHECK(status IN ('active','locked')),
        is_deleted INTEGER NOT NULL DEFAULT 0,
        deleted_at TEXT,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_accounts_user ON accounts(user_id);

    -- Append-only: no code path deletes from this table.
    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        type TEXT NOT NULL CHECK(type IN ('income','expense','transfer','investment')),
        from_account INTEGER,
        to_account INTEGER,
        amount TEXT NOT NULL,
        category TEXT NOT NULL,
        payment_mode TEXT NOT NULL,
        note TEXT,
        transaction_date TEXT NOT NULL,
        conversion_rate TEXT,
        converted_amount TEXT,
        from_currency TEXT,
        to_currency TEXT,
        tags TEXT NOT NULL DEFAULT '[]',
        recurring_id INTEGER,
        was_edited INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        FOREIGN KEY(from_account) REFERENCES accounts(id),
        FOREIGN KEY(to_account) REFERENCES accounts(id)
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_user_date
        ON transactions(user_id, transaction_date);

    CREATE TABLE IF NOT EXISTS transaction_logs(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        transaction_id INTEGER NOT NULL,
        user_id TEXT NOT NULL,
        old_data TEXT NOT NULL,
        new_data TEXT NOT NULL,
        reason TEXT NOT NULL CHECK(length(trim(reason)) > 0),
        created_at TEXT NOT NULL,
        FOREIGN KEY(transaction_id) REFERENCES transactions(id)
    );
    CREATE INDEX IF NOT EXISTS idx_transaction_logs_txn ON transaction_logs(transaction_id);

    CREATE TABLE IF NOT EXISTS recurring_transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        name TEXT NOT NULL,
        type TEXT NOT NULL,
        from_account INTEGER,
        to_account INTEGER,
        amount TEXT NOT NULL,
        category TEXT NOT NULL,
        payment_mode TEXT NOT NULL,
        note TEXT,
        tags TEXT NOT NULL DEFAULT '[]',
        frequency TEXT NOT NULL,
        day_of_month INTEGER CHECK(day_of_month BETWEEN 1 AND 31),
        day_of_week INTEGER CHECK(day_of_week BETWEEN 0 AND 6),
        start_date TEXT NOT NULL,
        end_date TEXT,
        next_run_date TEXT NOT NULL,
        last_run_date TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        is_paused INTEGER NOT NULL DEFAULT 0,
        total_executions INTEGER NOT NULL DEFAULT 0,
        max_executions INTEGER,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_recurring_due ON recurring_transactions(user_id, next_run_date);

    CREATE TABLE IF NOT EXISTS budgets(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        category TEXT NOT NULL,
        month INTEGER NOT NULL CHECK(month BETWEEN 1 AND 12),
        year INTEGER NOT NULL,
        monthly_limit TEXT NOT NULL,
        current_spent TEXT NOT NULL DEFAULT '0',
        alert_threshold TEXT NOT NULL DEFAULT '80',
        UNIQUE(user_id, category, month, year)
    );

    -- transactions and value_history are JSON arrays owned by the row.
    CREATE TABLE IF NOT EXISTS investments(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        name TEXT NOT NULL,
        kind TEXT NOT NULL,
        symbol TEXT,
        invested_amount TEXT NOT NULL DEFAULT '0',
        current_value TEXT NOT NULL DEFAULT '0',
        units TEXT NOT NULL DEFAULT '0',
        buy_price TEXT NOT NULL DEFAULT '0',
        current_price TEXT NOT NULL DEFAULT '0',
        purchase_date TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'active',
        sold_date TEXT,
        sold_amount TEXT,
        total_dividends_received TEXT NOT NULL DEFAULT '0',
        last_dividend_date TEXT,
        last_dividend_amount TEXT,
        dividend_enabled INTEGER NOT NULL DEFAULT 0,
        transactions TEXT NOT NULL DEFAULT '[]',
        value_history TEXT NOT NULL DEFAULT '[]',
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_investments_user ON investments(user_id);
    "#,
    )?;
    Ok(())
}
