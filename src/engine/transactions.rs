// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Creating ledger entries and the audited amend path. Entries are never
//! deleted; corrections go through [`amend_transaction`] with a reason.

use chrono::{DateTime, Datelike, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::with_write_tx;
use crate::engine::mutator::{self, BalanceEffect};
use crate::engine::{accounts, budgets, ledger};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Conversion, Transaction, TransactionType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub rate: Decimal,
    /// Defaults to `amount * rate`.
    pub converted_amount: Option<Decimal>,
    pub from_currency: String,
    pub to_currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub r#type: TransactionType,
    pub from_account: Option<i64>,
    pub to_account: Option<i64>,
    pub amount: Decimal,
    pub category: String,
    pub payment_mode: String,
    pub note: Option<String>,
    /// Defaults to the time of creation.
    pub transaction_date: Option<DateTime<Utc>>,
    pub conversion: Option<ConversionRequest>,
    pub tags: Vec<String>,
}

/// Fields an amendment may touch. Type and accounts are fixed at creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionChanges {
    pub amount: Option<Decimal>,
    pub category: Option<String>,
    pub payment_mode: Option<String>,
    pub note: Option<String>,
    pub transaction_date: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
}

impl TransactionChanges {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.category.is_none()
            && self.payment_mode.is_none()
            && self.note.is_none()
            && self.transaction_date.is_none()
            && self.tags.is_none()
    }
}

/// Checks which account legs a type needs. Returns the reason on failure so
/// callers can pick the error kind (validation for direct entries,
/// configuration for recurring templates).
pub fn check_account_legs(
    t: TransactionType,
    from: Option<i64>,
    to: Option<i64>,
) -> Result<(), String> {
    match (t, from, to) {
        (TransactionType::Income, None, Some(_)) => Ok(()),
        (TransactionType::Income, Some(_), _) => Err("income cannot have a from_account".into()),
        (TransactionType::Income, None, None) => Err("income requires to_account".into()),
        (TransactionType::Expense, Some(_), None) => Ok(()),
        (TransactionType::Expense, _, Some(_)) => Err("expense cannot have a to_account".into()),
        (TransactionType::Expense, None, None) => Err("expense requires from_account".into()),
        (TransactionType::Transfer, Some(f), Some(to_id)) if f == to_id => {
            Err("transfer needs two different accounts".into())
        }
        (TransactionType::Transfer, Some(_), Some(_)) => Ok(()),
        (TransactionType::Transfer, _, _) => {
            Err("transfer requires from_account and to_account".into())
        }
        (TransactionType::Investment, Some(_), None) => Ok(()),
        (TransactionType::Investment, _, Some(_)) => {
            Err("investment cannot have a to_account".into())
        }
        (TransactionType::Investment, None, None) => {
            Err("investment requires from_account".into())
        }
    }
}

fn clean_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for t in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}

fn resolve_conversion(
    t: TransactionType,
    amount: Decimal,
    req: Option<&ConversionRequest>,
) -> LedgerResult<Option<Conversion>> {
    let Some(req) = req else {
        return Ok(None);
    };
    if t != TransactionType::Transfer {
        return Err(LedgerError::validation(
            "currency conversion only applies to transfers",
        ));
    }
    if req.rate <= Decimal::ZERO {
        return Err(LedgerError::validation("conversion rate must be positive"));
    }
    let converted_amount = req
        .converted_amount
        .unwrap_or_else(|| (amount * req.rate).round_dp(2));
    if converted_amount <= Decimal::ZERO {
        return Err(LedgerError::validation(
            "converted amount must be positive",
        ));
    }
    Ok(Some(Conversion {
        rate: req.rate,
        converted_amount,
        from_currency: req.from_currency.trim().to_uppercase(),
        to_currency: req.to_currency.trim().to_uppercase(),
    }))
}

/// Validates and shapes a payload into an unsaved ledger entry.
pub(crate) fn draft(
    user: &str,
    new: &NewTransaction,
    now: DateTime<Utc>,
) -> LedgerResult<Transaction> {
    if new.amount <= Decimal::ZERO {
        return Err(LedgerError::validation("amount must be positive"));
    }
    check_account_legs(new.r#type, new.from_account, new.to_account)
        .map_err(LedgerError::Validation)?;
    let category = new.category.trim();
    if category.is_empty() {
        return Err(LedgerError::validation("category is required"));
    }
    Ok(Transaction {
        id: 0,
        user_id: user.to_string(),
        r#type: new.r#type,
        from_account: new.from_account,
        to_account: new.to_account,
        amount: new.amount,
        category: category.to_string(),
        payment_mode: new.payment_mode.trim().to_string(),
        note: new.note.clone().filter(|n| !n.trim().is_empty()),
        transaction_date: new.transaction_date.unwrap_or(now),
        conversion: resolve_conversion(new.r#type, new.amount, new.conversion.as_ref())?,
        tags: clean_tags(&new.tags),
        recurring_id: None,
        was_edited: false,
        created_at: now,
    })
}

/// Persists `txn` and applies its balance effect. Runs inside the caller's
/// write transaction so a rejected debit leaves no orphan entry behind.
pub(crate) fn record(
    conn: &Connection,
    txn: &Transaction,
    now: DateTime<Utc>,
) -> LedgerResult<Transaction> {
    for id in [txn.from_account, txn.to_account].into_iter().flatten() {
        accounts::get_account(conn, &txn.user_id, id)?;
    }
    let stored = ledger::insert_transaction(conn, txn)?;
    mutator::apply_transaction_effect(conn, &stored.user_id, &BalanceEffect::of(&stored), now)?;
    tracing::info!(
        transaction_id = stored.id,
        kind = %stored.r#type,
        amount = %stored.amount,
        "transaction recorded"
    );
    Ok(stored)
}

pub fn create_transaction(
    conn: &mut Connection,
    user: &str,
    new: &NewTransaction,
) -> LedgerResult<Transaction> {
    create_transaction_at(conn, user, new, Utc::now())
}

pub fn create_transaction_at(
    conn: &mut Connection,
    user: &str,
    new: &NewTransaction,
    now: DateTime<Utc>,
) -> LedgerResult<Transaction> {
    let txn = draft(user, new, now)?;
    with_write_tx(conn, |tx| record(tx, &txn, now))
}

/// Moves an amended expense's budget spend. Spend is booked against the month
/// the entry was recorded in, matching [`mutator::apply_transaction_effect`].
fn rebook_budget_spend(
    conn: &Connection,
    user: &str,
    old: &Transaction,
    new: &Transaction,
) -> LedgerResult<()> {
    let (month, year) = (old.created_at.month(), old.created_at.year());
    if old.category != new.category {
        budgets::increment_spent(conn, user, &old.category, month, year, -old.amount)?;
        budgets::increment_spent(conn, user, &new.category, month, year, new.amount)?;
    } else if old.amount != new.amount {
        let delta = new.amount - old.amount;
        budgets::increment_spent(conn, user, &new.category, month, year, delta)?;
    }
    Ok(())
}

/// Amends an existing entry. The reason is mandatory; the before/after
/// snapshots are logged in the same unit of work as the update.
pub fn amend_transaction(
    conn: &mut Connection,
    user: &str,
    id: i64,
    changes: &TransactionChanges,
    reason: &str,
) -> LedgerResult<Transaction> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(LedgerError::validation("a reason is required to amend a transaction"));
    }
    if changes.is_empty() {
        return Err(LedgerError::validation("no fields to amend"));
    }
    if let Some(amount) = changes.amount {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::validation("amount must be positive"));
        }
    }
    if let Some(cat) = &changes.category {
        if cat.trim().is_empty() {
            return Err(LedgerError::validation("category cannot be empty"));
        }
    }

    with_write_tx(conn, |tx| {
        let old = ledger::get_transaction(tx, user, id)?;
        let mut new = old.clone();

        if let Some(amount) = changes.amount {
            new.amount = amount;
            let delta = amount - old.amount;
            let mut credit_delta = delta;
            if let Some(conv) = new.conversion.as_mut() {
                let scaled = (conv.converted_amount * amount / old.amount)
                    .round_dp(2)
                    .normalize();
                credit_delta = scaled - conv.converted_amount;
                conv.converted_amount = scaled;
            }
            mutator::apply_legs(
                tx,
                user,
                old.r#type,
                old.from_account,
                old.to_account,
                delta,
                credit_delta,
            )?;
        }
        if let Some(cat) = &changes.category {
            new.category = cat.trim().to_string();
        }
        if let Some(mode) = &changes.payment_mode {
            new.payment_mode = mode.trim().to_string();
        }
        if let Some(note) = &changes.note {
            new.note = Some(note.clone()).filter(|n| !n.trim().is_empty());
        }
        if let Some(date) = changes.transaction_date {
            new.transaction_date = date;
        }
        if let Some(tags) = &changes.tags {
            new.tags = clean_tags(tags);
        }
        new.was_edited = true;

        if old.r#type == TransactionType::Expense {
            rebook_budget_spend(tx, user, &old, &new)?;
        }
        ledger::store_amended(tx, &new)?;
        let stored = ledger::get_transaction(tx, user, id)?;
        ledger::insert_log(tx, &old, &stored, reason)?;
        tracing::info!(transaction_id = id, reason, "transaction amended");
        Ok(stored)
    })
}
