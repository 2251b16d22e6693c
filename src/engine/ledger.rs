// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Append-only storage for ledger entries and their audit logs.
//!
//! There is deliberately no delete here. The only in-place write is
//! [`store_amended`], reachable solely through the audited amend path.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, ToSql, params};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Conversion, Transaction, TransactionLog, TransactionType};
use crate::utils::{json_at, opt_parsed_at, parsed_at};

const TRANSACTION_COLUMNS: &str = "id, user_id, type, from_account, to_account, amount, category, \
     payment_mode, note, transaction_date, conversion_rate, converted_amount, from_currency, \
     to_currency, tags, recurring_id, was_edited, created_at";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub r#type: Option<TransactionType>,
    /// Matches either leg.
    pub account: Option<i64>,
    pub category: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

fn transaction_from_row(r: &Row<'_>) -> rusqlite::Result<Transaction> {
    let rate = opt_parsed_at(r, 10)?;
    let converted = opt_parsed_at(r, 11)?;
    let from_ccy: Option<String> = r.get(12)?;
    let to_ccy: Option<String> = r.get(13)?;
    let conversion = match (rate, converted) {
        (Some(rate), Some(converted_amount)) => Some(Conversion {
            rate,
            converted_amount,
            from_currency: from_ccy.unwrap_or_default(),
            to_currency: to_ccy.unwrap_or_default(),
        }),
        _ => None,
    };
    Ok(Transaction {
        id: r.get(0)?,
        user_id: r.get(1)?,
        r#type: parsed_at(r, 2)?,
        from_account: r.get(3)?,
        to_account: r.get(4)?,
        amount: parsed_at(r, 5)?,
        category: r.get(6)?,
        payment_mode: r.get(7)?,
        note: r.get(8)?,
        transaction_date: r.get(9)?,
        conversion,
        tags: json_at(r, 14)?,
        recurring_id: r.get(15)?,
        was_edited: r.get(16)?,
        created_at: r.get(17)?,
    })
}

/// Appends `txn` to the ledger. The `id` on the input is ignored; the stored
/// record is returned.
pub fn insert_transaction(conn: &Connection, txn: &Transaction) -> LedgerResult<Transaction> {
    let conv = txn.conversion.as_ref();
    conn.execute(
        "INSERT INTO transactions(user_id, type, from_account, to_account, amount, category,
             payment_mode, note, transaction_date, conversion_rate, converted_amount,
             from_currency, to_currency, tags, recurring_id, was_edited, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, 0, ?16)",
        params![
            txn.user_id,
            txn.r#type.to_string(),
            txn.from_account,
            txn.to_account,
            txn.amount.to_string(),
            txn.category,
            txn.payment_mode,
            txn.note,
            txn.transaction_date,
            conv.map(|c| c.rate.to_string()),
            conv.map(|c| c.converted_amount.to_string()),
            conv.map(|c| c.from_currency.clone()),
            conv.map(|c| c.to_currency.clone()),
            serde_json::to_string(&txn.tags)?,
            txn.recurring_id,
            txn.created_at,
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_transaction(conn, &txn.user_id, id)
}

pub fn get_transaction(conn: &Connection, user: &str, id: i64) -> LedgerResult<Transaction> {
    let sql =
        format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id=?1 AND user_id=?2");
    conn.query_row(&sql, params![id, user], transaction_from_row)
        .optional()?
        .ok_or_else(|| LedgerError::not_found("transaction", id))
}

/// Newest first by transaction date.
pub fn list_transactions(
    conn: &Connection,
    user: &str,
    filter: &TransactionFilter,
) -> LedgerResult<Vec<Transaction>> {
    let mut sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE user_id=?");
    let mut args: Vec<Box<dyn ToSql>> = vec![Box::new(user.to_string())];

    if let Some(t) = filter.r#type {
        sql.push_str(" AND type=?");
        args.push(Box::new(t.to_string()));
    }
    if let Some(acct) = filter.account {
        sql.push_str(" AND (from_account=? OR to_account=?)");
        args.push(Box::new(acct));
        args.push(Box::new(acct));
    }
    if let Some(cat) = &filter.category {
        sql.push_str(" AND category=?");
        args.push(Box::new(cat.clone()));
    }
    if let Some(from) = filter.from {
        sql.push_str(" AND transaction_date>=?");
        args.push(Box::new(from));
    }
    if let Some(to) = filter.to {
        sql.push_str(" AND transaction_date<=?");
        args.push(Box::new(to));
    }
    sql.push_str(" ORDER BY transaction_date DESC, id DESC");
    if let Some(limit) = filter.limit {
        sql.push_str(" LIMIT ?");
        args.push(Box::new(limit as i64));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
        transaction_from_row,
    )?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Persists the mutable fields of an amended entry and marks it edited.
pub(crate) fn store_amended(conn: &Connection, txn: &Transaction) -> LedgerResult<()> {
    let changed = conn.execute(
        "UPDATE transactions
         SET amount=?1, category=?2, payment_mode=?3, note=?4, transaction_date=?5,
             converted_amount=?6, tags=?7, was_edited=1
         WHERE id=?8 AND user_id=?9",
        params![
            txn.amount.to_string(),
            txn.category,
            txn.payment_mode,
            txn.note,
            txn.transaction_date,
            txn.conversion.as_ref().map(|c| c.converted_amount.to_string()),
            serde_json::to_string(&txn.tags)?,
            txn.id,
            txn.user_id,
        ],
    )?;
    if changed == 0 {
        return Err(LedgerError::not_found("transaction", txn.id));
    }
    Ok(())
}

fn log_from_row(r: &Row<'_>) -> rusqlite::Result<TransactionLog> {
    Ok(TransactionLog {
        id: r.get(0)?,
        transaction_id: r.get(1)?,
        user_id: r.get(2)?,
        old_data: json_at(r, 3)?,
        new_data: json_at(r, 4)?,
        reason: r.get(5)?,
        created_at: r.get(6)?,
    })
}

pub(crate) fn insert_log(
    conn: &Connection,
    old: &Transaction,
    new: &Transaction,
    reason: &str,
) -> LedgerResult<TransactionLog> {
    conn.execute(
        "INSERT INTO transaction_logs(transaction_id, user_id, old_data, new_data, reason,
             created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            old.id,
            old.user_id,
            serde_json::to_string(old)?,
            serde_json::to_string(new)?,
            reason,
            Utc::now(),
        ],
    )?;
    let id = conn.last_insert_rowid();
    Ok(conn.query_row(
        "SELECT id, transaction_id, user_id, old_data, new_data, reason, created_at
         FROM transaction_logs WHERE id=?1",
        params![id],
        log_from_row,
    )?)
}

/// Audit trail for one entry, oldest first.
pub fn list_logs(
    conn: &Connection,
    user: &str,
    transaction_id: i64,
) -> LedgerResult<Vec<TransactionLog>> {
    get_transaction(conn, user, transaction_id)?;
    let mut stmt = conn.prepare(
        "SELECT id, transaction_id, user_id, old_data, new_data, reason, created_at
         FROM transaction_logs WHERE transaction_id=?1 AND user_id=?2 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![transaction_id, user], log_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
