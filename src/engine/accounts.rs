// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Account balance store. Balances only move through [`adjust_balance`],
//! which applies a signed delta and refuses to go below zero.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Account, AccountStatus, Currency};
use crate::utils::parsed_at;

/// Recognised account types. The column stays a free-form string so new kinds
/// can be added here without a schema change.
pub const ACCOUNT_TYPES: &[&str] = &[
    "savings",
    "current",
    "credit_card",
    "cash",
    "wallet",
    "investment",
    "loan",
    "other",
];

const ACCOUNT_COLUMNS: &str = "id, user_id, name, type, currency_code, currency_symbol, \
     currency_name, currency_locale, balance, status, is_deleted, deleted_at, created_at";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub r#type: String,
    pub currency: Currency,
    pub opening_balance: Decimal,
}

pub fn normalize_account_type(raw: &str) -> LedgerResult<String> {
    let t = raw.trim().to_lowercase();
    if ACCOUNT_TYPES.contains(&t.as_str()) {
        Ok(t)
    } else {
        Err(LedgerError::validation(format!(
            "unknown account type '{}', expected one of: {}",
            raw,
            ACCOUNT_TYPES.join(", ")
        )))
    }
}

fn validate_currency(c: &Currency) -> LedgerResult<Currency> {
    let code = c.code.trim().to_uppercase();
    if code.len() != 3 || !code.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(LedgerError::validation(format!(
            "currency code '{}' must be three letters",
            c.code
        )));
    }
    Ok(Currency {
        code,
        symbol: c.symbol.trim().to_string(),
        name: c.name.trim().to_string(),
        locale: c.locale.trim().to_string(),
    })
}

fn account_from_row(r: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: r.get(0)?,
        user_id: r.get(1)?,
        name: r.get(2)?,
        r#type: r.get(3)?,
        currency: Currency {
            code: r.get(4)?,
            symbol: r.get(5)?,
            name: r.get(6)?,
            locale: r.get(7)?,
        },
        balance: parsed_at(r, 8)?,
        status: parsed_at(r, 9)?,
        is_deleted: r.get(10)?,
        deleted_at: r.get(11)?,
        created_at: r.get(12)?,
    })
}

pub fn create_account(conn: &Connection, user: &str, new: &NewAccount) -> LedgerResult<Account> {
    let name = new.name.trim();
    if name.is_empty() {
        return Err(LedgerError::validation("account name is required"));
    }
    if new.opening_balance < Decimal::ZERO {
        return Err(LedgerError::validation("opening balance cannot be negative"));
    }
    let kind = normalize_account_type(&new.r#type)?;
    let currency = validate_currency(&new.currency)?;
    conn.execute(
        "INSERT INTO accounts(user_id, name, type, currency_code, currency_symbol, currency_name,
                              currency_locale, balance, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            user,
            name,
            kind,
            currency.code,
            currency.symbol,
            currency.name,
            currency.locale,
            new.opening_balance.to_string(),
            Utc::now(),
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(account_id = id, user, kind = %kind, "account created");
    get_account(conn, user, id)
}

/// Loads an account owned by `user`. Soft-deleted accounts are still returned.
pub fn get_account(conn: &Connection, user: &str, id: i64) -> LedgerResult<Account> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id=?1 AND user_id=?2");
    conn.query_row(&sql, params![id, user], account_from_row)
        .optional()?
        .ok_or_else(|| LedgerError::not_found("account", id))
}

pub fn list_accounts(
    conn: &Connection,
    user: &str,
    include_deleted: bool,
) -> LedgerResult<Vec<Account>> {
    let mut sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id=?1");
    if !include_deleted {
        sql.push_str(" AND is_deleted=0");
    }
    sql.push_str(" ORDER BY name, id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user], account_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn soft_delete_account(conn: &Connection, user: &str, id: i64) -> LedgerResult<Account> {
    get_account(conn, user, id)?;
    conn.execute(
        "UPDATE accounts SET is_deleted=1, deleted_at=?1 WHERE id=?2 AND user_id=?3",
        params![Utc::now(), id, user],
    )?;
    tracing::info!(account_id = id, "account soft-deleted");
    get_account(conn, user, id)
}

pub fn restore_account(conn: &Connection, user: &str, id: i64) -> LedgerResult<Account> {
    get_account(conn, user, id)?;
    conn.execute(
        "UPDATE accounts SET is_deleted=0, deleted_at=NULL WHERE id=?1 AND user_id=?2",
        params![id, user],
    )?;
    get_account(conn, user, id)
}

pub fn set_status(
    conn: &Connection,
    user: &str,
    id: i64,
    status: AccountStatus,
) -> LedgerResult<Account> {
    get_account(conn, user, id)?;
    conn.execute(
        "UPDATE accounts SET status=?1 WHERE id=?2 AND user_id=?3",
        params![status.to_string(), id, user],
    )?;
    tracing::info!(account_id = id, %status, "account status changed");
    get_account(conn, user, id)
}

/// Applies a signed delta to an account balance and returns the new balance.
///
/// Must run inside the caller's write transaction. The update is conditional on
/// the balance read here, so a writer that slipped in between surfaces as
/// [`LedgerError::Conflict`] instead of being overwritten.
pub fn adjust_balance(
    conn: &Connection,
    user: &str,
    id: i64,
    delta: Decimal,
) -> LedgerResult<Decimal> {
    let account = get_account(conn, user, id)?;
    if account.status == AccountStatus::Locked {
        return Err(LedgerError::validation(format!(
            "account {} is locked",
            account.id
        )));
    }
    let next = account.balance + delta;
    if next < Decimal::ZERO {
        return Err(LedgerError::InsufficientFunds {
            account_id: id,
            balance: account.balance,
            requested: -delta,
        });
    }
    let changed = conn.execute(
        "UPDATE accounts SET balance=?1 WHERE id=?2 AND user_id=?3 AND balance=?4",
        params![next.to_string(), id, user, account.balance.to_string()],
    )?;
    if changed == 0 {
        return Err(LedgerError::Conflict {
            entity: "account",
            id,
        });
    }
    tracing::debug!(account_id = id, %delta, balance = %next, "balance adjusted");
    Ok(next)
}

/// Sum of balances across live (non-deleted) accounts.
pub fn total_balance(conn: &Connection, user: &str) -> LedgerResult<Decimal> {
    Ok(list_accounts(conn, user, false)?
        .iter()
        .map(|a| a.balance)
        .sum())
}
