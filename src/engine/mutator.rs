// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Balance and budget side effects of ledger entries.

use chrono::{DateTime, Datelike, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::engine::{accounts, budgets};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Budget, Transaction, TransactionType};

/// What a ledger entry does to balances.
#[derive(Debug, Clone)]
pub struct BalanceEffect<'a> {
    pub r#type: TransactionType,
    pub from_account: Option<i64>,
    pub to_account: Option<i64>,
    pub amount: Decimal,
    /// Amount credited on the destination leg when it differs from `amount`
    /// (cross-currency transfers).
    pub credit_amount: Option<Decimal>,
    pub category: &'a str,
}

impl<'a> BalanceEffect<'a> {
    pub fn of(txn: &'a Transaction) -> Self {
        BalanceEffect {
            r#type: txn.r#type,
            from_account: txn.from_account,
            to_account: txn.to_account,
            amount: txn.amount,
            credit_amount: txn.conversion.as_ref().map(|c| c.converted_amount),
            category: &txn.category,
        }
    }
}

fn required(account: Option<i64>, t: TransactionType, leg: &str) -> LedgerResult<i64> {
    account.ok_or_else(|| LedgerError::validation(format!("{} requires {}", t, leg)))
}

/// Moves `debit` out of the source and `credit` into the destination, as the
/// type dictates. Values are signed deltas; a negative debit refunds.
pub(crate) fn apply_legs(
    conn: &Connection,
    user: &str,
    t: TransactionType,
    from_account: Option<i64>,
    to_account: Option<i64>,
    debit: Decimal,
    credit: Decimal,
) -> LedgerResult<()> {
    if t.debits_source() && !debit.is_zero() {
        let from = required(from_account, t, "from_account")?;
        accounts::adjust_balance(conn, user, from, -debit)?;
    }
    if t.credits_destination() && !credit.is_zero() {
        let to = required(to_account, t, "to_account")?;
        accounts::adjust_balance(conn, user, to, credit)?;
    }
    Ok(())
}

/// Applies the balance side of a freshly persisted entry and, for expenses,
/// bumps the budget for the category in `now`'s month.
///
/// Must run in the same write transaction as the ledger insert; an
/// [`LedgerError::InsufficientFunds`] here rolls the insert back with it.
pub fn apply_transaction_effect(
    conn: &Connection,
    user: &str,
    effect: &BalanceEffect<'_>,
    now: DateTime<Utc>,
) -> LedgerResult<Option<Budget>> {
    if effect.amount <= Decimal::ZERO {
        return Err(LedgerError::validation("amount must be positive"));
    }
    let credit = effect.credit_amount.unwrap_or(effect.amount);
    apply_legs(
        conn,
        user,
        effect.r#type,
        effect.from_account,
        effect.to_account,
        effect.amount,
        credit,
    )?;
    if effect.r#type == TransactionType::Expense {
        return budgets::increment_spent(
            conn,
            user,
            effect.category,
            now.month(),
            now.year(),
            effect.amount,
        );
    }
    Ok(None)
}
