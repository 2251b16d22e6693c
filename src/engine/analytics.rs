// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::engine::budgets::{self, BudgetStatus};
use crate::engine::ledger::{self, TransactionFilter};
use crate::engine::{accounts, investments};
use crate::error::LedgerResult;
use crate::models::{InvestmentStatus, TransactionType};

#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub income: Decimal,
    pub expense: Decimal,
    pub transfer: Decimal,
    pub investment: Decimal,
    /// income - expense
    pub net: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySpend {
    pub category: String,
    pub total: Decimal,
    pub percent: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthTrend {
    pub month: String, // YYYY-MM
    pub income: Decimal,
    pub expense: Decimal,
    pub net: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetWorth {
    pub accounts_total: Decimal,
    pub investments_value: Decimal,
    pub net_worth: Decimal,
}

fn range_filter(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> TransactionFilter {
    TransactionFilter {
        from,
        to,
        ..Default::default()
    }
}

pub fn summary(
    conn: &Connection,
    user: &str,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> LedgerResult<Summary> {
    let mut s = Summary::default();
    for t in ledger::list_transactions(conn, user, &range_filter(from, to))? {
        match t.r#type {
            TransactionType::Income => s.income += t.amount,
            TransactionType::Expense => s.expense += t.amount,
            TransactionType::Transfer => s.transfer += t.amount,
            TransactionType::Investment => s.investment += t.amount,
        }
        s.count += 1;
    }
    s.net = s.income - s.expense;
    Ok(s)
}

/// Expense totals per category, largest first.
pub fn category_breakdown(
    conn: &Connection,
    user: &str,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> LedgerResult<Vec<CategorySpend>> {
    let filter = TransactionFilter {
        r#type: Some(TransactionType::Expense),
        ..range_filter(from, to)
    };
    let mut agg: HashMap<String, (Decimal, usize)> = HashMap::new();
    let mut total = Decimal::ZERO;
    for t in ledger::list_transactions(conn, user, &filter)? {
        let entry = agg.entry(t.category).or_insert((Decimal::ZERO, 0));
        entry.0 += t.amount;
        entry.1 += 1;
        total += t.amount;
    }
    let mut items: Vec<CategorySpend> = agg
        .into_iter()
        .map(|(category, (sum, count))| CategorySpend {
            percent: if total.is_zero() {
                Decimal::ZERO
            } else {
                (sum / total * Decimal::ONE_HUNDRED).round_dp(2)
            },
            category,
            total: sum,
            count,
        })
        .collect();
    items.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
    Ok(items)
}

/// Income and expense for the `months` calendar months ending with `today`'s,
/// oldest first. Months without activity are reported as zero.
pub fn monthly_trend(
    conn: &Connection,
    user: &str,
    months: u32,
    today: NaiveDate,
) -> LedgerResult<Vec<MonthTrend>> {
    let months = months.max(1);
    let this_month = today.with_day(1).unwrap_or(today);
    let start = this_month
        .checked_sub_months(Months::new(months - 1))
        .unwrap_or(this_month);

    let mut map: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();
    let mut cursor = start;
    while cursor <= this_month {
        map.insert(cursor.format("%Y-%m").to_string(), (Decimal::ZERO, Decimal::ZERO));
        cursor = match cursor.checked_add_months(Months::new(1)) {
            Some(next) => next,
            None => break,
        };
    }

    let from = start.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    for t in ledger::list_transactions(conn, user, &range_filter(from, None))? {
        let key = t.transaction_date.format("%Y-%m").to_string();
        let Some(entry) = map.get_mut(&key) else {
            continue;
        };
        match t.r#type {
            TransactionType::Income => entry.0 += t.amount,
            TransactionType::Expense => entry.1 += t.amount,
            _ => {}
        }
    }
    Ok(map
        .into_iter()
        .map(|(month, (income, expense))| MonthTrend {
            month,
            income,
            expense,
            net: income - expense,
        })
        .collect())
}

pub fn budget_overview(
    conn: &Connection,
    user: &str,
    month: u32,
    year: i32,
) -> LedgerResult<Vec<BudgetStatus>> {
    Ok(budgets::list_budgets(conn, user, month, year)?
        .into_iter()
        .map(BudgetStatus::from)
        .collect())
}

pub fn net_worth(conn: &Connection, user: &str) -> LedgerResult<NetWorth> {
    let accounts_total = accounts::total_balance(conn, user)?;
    let investments_value: Decimal = investments::list_investments(conn, user)?
        .iter()
        .filter(|i| i.status != InvestmentStatus::Sold)
        .map(|i| i.current_value)
        .sum();
    Ok(NetWorth {
        accounts_total,
        investments_value,
        net_worth: accounts_total + investments_value,
    })
}
