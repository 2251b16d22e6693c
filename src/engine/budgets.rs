// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{LedgerError, LedgerResult};
use crate::models::Budget;
use crate::utils::parsed_at;

const BUDGET_COLUMNS: &str =
    "id, user_id, category, month, year, monthly_limit, current_spent, alert_threshold";

/// Read-side view of a budget with its derived figures.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetStatus {
    #[serde(flatten)]
    pub budget: Budget,
    pub remaining: Decimal,
    pub spent_percent: Decimal,
    pub is_over_budget: bool,
    pub is_near_limit: bool,
}

impl From<Budget> for BudgetStatus {
    fn from(budget: Budget) -> Self {
        BudgetStatus {
            remaining: budget.remaining(),
            spent_percent: budget.spent_percent(),
            is_over_budget: budget.is_over_budget(),
            is_near_limit: budget.is_near_limit(),
            budget,
        }
    }
}

fn budget_from_row(r: &Row<'_>) -> rusqlite::Result<Budget> {
    Ok(Budget {
        id: r.get(0)?,
        user_id: r.get(1)?,
        category: r.get(2)?,
        month: r.get(3)?,
        year: r.get(4)?,
        monthly_limit: parsed_at(r, 5)?,
        current_spent: parsed_at(r, 6)?,
        alert_threshold: parsed_at(r, 7)?,
    })
}

/// Creates or updates the limit for a category/month. Spending already
/// recorded against the budget is preserved.
pub fn set_budget(
    conn: &Connection,
    user: &str,
    category: &str,
    month: u32,
    year: i32,
    limit: Decimal,
    alert_threshold: Decimal,
) -> LedgerResult<Budget> {
    let category = category.trim();
    if category.is_empty() {
        return Err(LedgerError::validation("budget category is required"));
    }
    if !(1..=12).contains(&month) {
        return Err(LedgerError::validation(format!("invalid month {}", month)));
    }
    if limit < Decimal::ZERO {
        return Err(LedgerError::validation("budget limit cannot be negative"));
    }
    if alert_threshold <= Decimal::ZERO || alert_threshold > Decimal::ONE_HUNDRED {
        return Err(LedgerError::validation(
            "alert threshold must be within (0, 100]",
        ));
    }
    conn.execute(
        "INSERT INTO budgets(user_id, category, month, year, monthly_limit, alert_threshold)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(user_id, category, month, year)
         DO UPDATE SET monthly_limit=excluded.monthly_limit,
                       alert_threshold=excluded.alert_threshold",
        params![
            user,
            category,
            month,
            year,
            limit.to_string(),
            alert_threshold.to_string()
        ],
    )?;
    get_budget(conn, user, category, month, year)?.ok_or_else(|| {
        LedgerError::Storage(rusqlite::Error::QueryReturnedNoRows)
    })
}

/// Absence of a budget is a normal outcome, hence `Option`.
pub fn get_budget(
    conn: &Connection,
    user: &str,
    category: &str,
    month: u32,
    year: i32,
) -> LedgerResult<Option<Budget>> {
    let sql = format!(
        "SELECT {BUDGET_COLUMNS} FROM budgets
         WHERE user_id=?1 AND category=?2 AND month=?3 AND year=?4"
    );
    Ok(conn
        .query_row(&sql, params![user, category, month, year], budget_from_row)
        .optional()?)
}

pub fn list_budgets(
    conn: &Connection,
    user: &str,
    month: u32,
    year: i32,
) -> LedgerResult<Vec<Budget>> {
    let sql = format!(
        "SELECT {BUDGET_COLUMNS} FROM budgets
         WHERE user_id=?1 AND month=?2 AND year=?3 ORDER BY category"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user, month, year], budget_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Adds `amount` to the matching budget's spend. A negative `amount` releases
/// spend; the total never drops below zero. Returns the updated budget, or
/// `None` when no budget is set for that category and month.
pub fn increment_spent(
    conn: &Connection,
    user: &str,
    category: &str,
    month: u32,
    year: i32,
    amount: Decimal,
) -> LedgerResult<Option<Budget>> {
    let Some(mut budget) = get_budget(conn, user, category, month, year)? else {
        tracing::debug!(user, category, month, year, "no budget for expense");
        return Ok(None);
    };
    let previous = budget.current_spent;
    budget.current_spent = (budget.current_spent + amount).max(Decimal::ZERO);
    let changed = conn.execute(
        "UPDATE budgets SET current_spent=?1 WHERE id=?2 AND current_spent=?3",
        params![
            budget.current_spent.to_string(),
            budget.id,
            previous.to_string()
        ],
    )?;
    if changed == 0 {
        return Err(LedgerError::Conflict {
            entity: "budget",
            id: budget.id,
        });
    }
    if budget.is_over_budget() {
        tracing::warn!(
            budget_id = budget.id,
            category,
            spent = %budget.current_spent,
            limit = %budget.monthly_limit,
            "budget exceeded"
        );
    } else if budget.is_near_limit() {
        tracing::info!(
            budget_id = budget.id,
            category,
            percent = %budget.spent_percent(),
            "budget near limit"
        );
    }
    Ok(Some(budget))
}
