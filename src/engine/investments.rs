// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Investments and their embedded transaction history.
//!
//! Each investment owns an append-only list of buys, sells, dividends, splits
//! and bonus issues, plus a list of valuation snapshots. Both are stored as
//! JSON on the investment row and have no life of their own.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::db::with_write_tx;
use crate::engine::transactions;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    Investment, InvestmentStatus, InvestmentTxn, InvestmentTxnKind, Transaction,
    TransactionType, ValueSnapshot,
};
use crate::utils::{json_at, opt_parsed_at, parsed_at};

const INVESTMENT_COLUMNS: &str = "id, user_id, name, kind, symbol, invested_amount, \
     current_value, units, buy_price, current_price, purchase_date, status, sold_date, \
     sold_amount, total_dividends_received, last_dividend_date, last_dividend_amount, \
     dividend_enabled, transactions, value_history, created_at";

const XIRR_GUESS: f64 = 0.1;
const XIRR_MAX_ITERATIONS: u32 = 100;
const XIRR_TOLERANCE: f64 = 1e-4;
const XIRR_MIN_RATE: f64 = -0.99;
const XIRR_MAX_RATE: f64 = 10.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvestment {
    pub name: String,
    pub kind: String,
    pub symbol: Option<String>,
    pub purchase_date: NaiveDate,
}

/// Figures derived on read; never stored.
#[derive(Debug, Clone, Serialize)]
pub struct InvestmentMetrics {
    pub profit_loss: Decimal,
    pub profit_loss_percent: Decimal,
    pub days_held: i64,
    pub cagr: Option<f64>,
    pub absolute_return: Decimal,
    pub dividend_yield: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CashFlow {
    pub date: NaiveDate,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct XirrEstimate {
    pub rate_percent: f64,
    /// `false` means the iteration budget ran out; the rate is the last guess.
    pub converged: bool,
    pub iterations: u32,
}

fn recompute_buy_price(inv: &mut Investment) {
    if !inv.units.is_zero() {
        inv.buy_price = inv.invested_amount / inv.units;
    }
}

/// Applies one transaction to the running totals and appends it to the
/// investment's history.
pub fn apply_investment_transaction(inv: &mut Investment, txn: InvestmentTxn) -> LedgerResult<()> {
    match txn.kind {
        InvestmentTxnKind::Buy | InvestmentTxnKind::Sell | InvestmentTxnKind::Dividend
            if txn.amount <= Decimal::ZERO =>
        {
            return Err(LedgerError::validation(format!(
                "{} amount must be positive",
                txn.kind
            )));
        }
        InvestmentTxnKind::Dividend => {}
        _ if txn.units <= Decimal::ZERO => {
            return Err(LedgerError::validation(format!(
                "{} units must be positive",
                txn.kind
            )));
        }
        _ => {}
    }
    if inv.status == InvestmentStatus::Sold && txn.kind != InvestmentTxnKind::Dividend {
        return Err(LedgerError::validation(format!(
            "investment {} is already sold",
            inv.id
        )));
    }

    match txn.kind {
        InvestmentTxnKind::Buy => {
            inv.invested_amount += txn.amount;
            inv.units += txn.units;
            recompute_buy_price(inv);
            if inv.current_price > Decimal::ZERO {
                inv.current_value = inv.units * inv.current_price;
            } else {
                inv.current_value += txn.amount;
            }
        }
        InvestmentTxnKind::Sell => {
            inv.units -= txn.units;
            if inv.units <= Decimal::ZERO {
                inv.units = Decimal::ZERO;
                inv.status = InvestmentStatus::Sold;
                inv.sold_date = Some(txn.date);
                inv.sold_amount = Some(inv.current_value + txn.amount);
            } else {
                inv.status = InvestmentStatus::PartialSold;
                if inv.current_price > Decimal::ZERO {
                    inv.current_value = inv.units * inv.current_price;
                }
            }
        }
        InvestmentTxnKind::Dividend => {
            inv.total_dividends_received += txn.amount;
            inv.last_dividend_date = Some(txn.date);
            inv.last_dividend_amount = Some(txn.amount);
            inv.dividend_enabled = true;
        }
        InvestmentTxnKind::Split | InvestmentTxnKind::Bonus => {
            inv.units += txn.units;
            recompute_buy_price(inv);
        }
    }
    inv.transactions.push(txn);
    Ok(())
}

/// Marks the investment to market and records a valuation snapshot.
pub fn update_price(inv: &mut Investment, price: Decimal, date: NaiveDate) -> LedgerResult<()> {
    if price <= Decimal::ZERO {
        return Err(LedgerError::validation("price must be positive"));
    }
    inv.current_price = price;
    if inv.status != InvestmentStatus::Sold {
        inv.current_value = inv.units * price;
    }
    inv.value_history.push(ValueSnapshot {
        date,
        value: inv.current_value,
        price,
    });
    Ok(())
}

pub fn metrics(inv: &Investment, today: NaiveDate) -> InvestmentMetrics {
    let hundred = Decimal::ONE_HUNDRED;
    let end_value = match (inv.status, inv.sold_amount) {
        (InvestmentStatus::Sold, Some(sold)) => sold,
        _ => inv.current_value,
    };
    let profit_loss = end_value - inv.invested_amount;
    let invested = inv.invested_amount;
    let pct = |v: Decimal| {
        if invested.is_zero() {
            Decimal::ZERO
        } else {
            (v / invested * hundred).round_dp(2)
        }
    };
    let end_date = inv.sold_date.unwrap_or(today);
    let days_held = (end_date - inv.purchase_date).num_days().max(0);

    let years = days_held as f64 / 365.0;
    let cagr = match (invested.to_f64(), end_value.to_f64()) {
        (Some(i), Some(e)) if years > 0.0 && i > 0.0 && e > 0.0 => {
            Some(((e / i).powf(1.0 / years) - 1.0) * 100.0)
        }
        _ => None,
    };

    InvestmentMetrics {
        profit_loss,
        profit_loss_percent: pct(profit_loss),
        days_held,
        cagr,
        absolute_return: pct(profit_loss + inv.total_dividends_received),
        dividend_yield: pct(inv.total_dividends_received),
    }
}

/// Buys are outflows, sells and dividends inflows. A still-held position
/// contributes its current value as a final inflow on `as_of`.
pub fn cash_flows(inv: &Investment, as_of: NaiveDate) -> Vec<CashFlow> {
    let mut flows: Vec<CashFlow> = inv
        .transactions
        .iter()
        .filter_map(|t| {
            let amount = t.amount.to_f64()?;
            match t.kind {
                InvestmentTxnKind::Buy => Some(-amount),
                InvestmentTxnKind::Sell | InvestmentTxnKind::Dividend => Some(amount),
                InvestmentTxnKind::Split | InvestmentTxnKind::Bonus => None,
            }
            .map(|amount| CashFlow { date: t.date, amount })
        })
        .collect();
    if inv.status != InvestmentStatus::Sold {
        if let Some(value) = inv.current_value.to_f64().filter(|v| *v > 0.0) {
            flows.push(CashFlow {
                date: as_of,
                amount: value,
            });
        }
    }
    flows.sort_by_key(|f| f.date);
    flows
}

/// Newton-Raphson solve for the rate that zeroes the NPV of `flows`.
///
/// Returns `None` when there is nothing to solve: fewer than two flows, or
/// flows that never change sign.
pub fn xirr(flows: &[CashFlow]) -> Option<XirrEstimate> {
    if flows.len() < 2
        || !flows.iter().any(|f| f.amount > 0.0)
        || !flows.iter().any(|f| f.amount < 0.0)
    {
        return None;
    }
    let first = flows.iter().map(|f| f.date).min()?;
    let timed: Vec<(f64, f64)> = flows
        .iter()
        .map(|f| ((f.date - first).num_days() as f64 / 365.0, f.amount))
        .collect();

    let mut rate = XIRR_GUESS;
    for iteration in 1..=XIRR_MAX_ITERATIONS {
        let (npv, d_npv) = timed.iter().fold((0.0, 0.0), |(v, dv), &(t, cf)| {
            let base = 1.0 + rate;
            (v + cf / base.powf(t), dv - t * cf / base.powf(t + 1.0))
        });
        if d_npv == 0.0 || !d_npv.is_finite() || !npv.is_finite() {
            return Some(XirrEstimate {
                rate_percent: rate * 100.0,
                converged: false,
                iterations: iteration,
            });
        }
        let next = (rate - npv / d_npv).clamp(XIRR_MIN_RATE, XIRR_MAX_RATE);
        if (next - rate).abs() < XIRR_TOLERANCE {
            return Some(XirrEstimate {
                rate_percent: next * 100.0,
                converged: true,
                iterations: iteration,
            });
        }
        rate = next;
    }
    Some(XirrEstimate {
        rate_percent: rate * 100.0,
        converged: false,
        iterations: XIRR_MAX_ITERATIONS,
    })
}

fn investment_from_row(r: &Row<'_>) -> rusqlite::Result<Investment> {
    Ok(Investment {
        id: r.get(0)?,
        user_id: r.get(1)?,
        name: r.get(2)?,
        kind: r.get(3)?,
        symbol: r.get(4)?,
        invested_amount: parsed_at(r, 5)?,
        current_value: parsed_at(r, 6)?,
        units: parsed_at(r, 7)?,
        buy_price: parsed_at(r, 8)?,
        current_price: parsed_at(r, 9)?,
        purchase_date: r.get(10)?,
        status: parsed_at(r, 11)?,
        sold_date: r.get(12)?,
        sold_amount: opt_parsed_at(r, 13)?,
        total_dividends_received: parsed_at(r, 14)?,
        last_dividend_date: r.get(15)?,
        last_dividend_amount: opt_parsed_at(r, 16)?,
        dividend_enabled: r.get(17)?,
        transactions: json_at(r, 18)?,
        value_history: json_at(r, 19)?,
        created_at: r.get(20)?,
    })
}

pub fn create_investment(
    conn: &Connection,
    user: &str,
    new: &NewInvestment,
) -> LedgerResult<Investment> {
    let name = new.name.trim();
    if name.is_empty() {
        return Err(LedgerError::validation("investment name is required"));
    }
    let kind = new.kind.trim().to_lowercase();
    if kind.is_empty() {
        return Err(LedgerError::validation("investment kind is required"));
    }
    conn.execute(
        "INSERT INTO investments(user_id, name, kind, symbol, purchase_date, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user,
            name,
            kind,
            new.symbol.as_deref().map(|s| s.trim().to_uppercase()),
            new.purchase_date,
            Utc::now()
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(investment_id = id, kind = %kind, "investment created");
    get_investment(conn, user, id)
}

pub fn get_investment(conn: &Connection, user: &str, id: i64) -> LedgerResult<Investment> {
    let sql = format!("SELECT {INVESTMENT_COLUMNS} FROM investments WHERE id=?1 AND user_id=?2");
    conn.query_row(&sql, params![id, user], investment_from_row)
        .optional()?
        .ok_or_else(|| LedgerError::not_found("investment", id))
}

pub fn list_investments(conn: &Connection, user: &str) -> LedgerResult<Vec<Investment>> {
    let sql =
        format!("SELECT {INVESTMENT_COLUMNS} FROM investments WHERE user_id=?1 ORDER BY name, id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user], investment_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn save_investment(conn: &Connection, inv: &Investment) -> LedgerResult<()> {
    conn.execute(
        "UPDATE investments SET invested_amount=?1, current_value=?2, units=?3, buy_price=?4,
             current_price=?5, status=?6, sold_date=?7, sold_amount=?8,
             total_dividends_received=?9, last_dividend_date=?10, last_dividend_amount=?11,
             dividend_enabled=?12, transactions=?13, value_history=?14
         WHERE id=?15 AND user_id=?16",
        params![
            inv.invested_amount.to_string(),
            inv.current_value.to_string(),
            inv.units.to_string(),
            inv.buy_price.to_string(),
            inv.current_price.to_string(),
            inv.status.to_string(),
            inv.sold_date,
            inv.sold_amount.map(|d| d.to_string()),
            inv.total_dividends_received.to_string(),
            inv.last_dividend_date,
            inv.last_dividend_amount.map(|d| d.to_string()),
            inv.dividend_enabled,
            serde_json::to_string(&inv.transactions)?,
            serde_json::to_string(&inv.value_history)?,
            inv.id,
            inv.user_id,
        ],
    )?;
    Ok(())
}

/// Records an investment transaction. When `funding_account` is given for a
/// buy, the cash leaves that account as an `investment` ledger entry in the
/// same unit of work.
pub fn record_investment_transaction(
    conn: &mut Connection,
    user: &str,
    id: i64,
    txn: InvestmentTxn,
    funding_account: Option<i64>,
) -> LedgerResult<Investment> {
    let now = Utc::now();
    with_write_tx(conn, |tx| {
        let mut inv = get_investment(tx, user, id)?;
        let amount = txn.amount;
        let kind = txn.kind;
        let date = txn.date;
        apply_investment_transaction(&mut inv, txn)?;
        save_investment(tx, &inv)?;

        if let Some(account) = funding_account {
            if kind != InvestmentTxnKind::Buy {
                return Err(LedgerError::validation(
                    "only buys can be funded from an account",
                ));
            }
            let entry = funding_entry(user, &inv, account, amount, date, now);
            transactions::record(tx, &entry, now)?;
        }
        tracing::info!(investment_id = id, %kind, %amount, "investment transaction recorded");
        Ok(inv)
    })
}

fn funding_entry(
    user: &str,
    inv: &Investment,
    account: i64,
    amount: Decimal,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Transaction {
    Transaction {
        id: 0,
        user_id: user.to_string(),
        r#type: TransactionType::Investment,
        from_account: Some(account),
        to_account: None,
        amount,
        category: "Investment".to_string(),
        payment_mode: "transfer".to_string(),
        note: Some(format!("Buy {}", inv.name)),
        transaction_date: date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or(now),
        conversion: None,
        tags: Vec::new(),
        recurring_id: None,
        was_edited: false,
        created_at: now,
    }
}

pub fn record_price(
    conn: &mut Connection,
    user: &str,
    id: i64,
    price: Decimal,
    date: NaiveDate,
) -> LedgerResult<Investment> {
    with_write_tx(conn, |tx| {
        let mut inv = get_investment(tx, user, id)?;
        update_price(&mut inv, price, date)?;
        save_investment(tx, &inv)?;
        Ok(inv)
    })
}

/// XIRR for a stored investment, valuing any open position on `as_of`.
pub fn compute_xirr(
    conn: &Connection,
    user: &str,
    id: i64,
    as_of: NaiveDate,
) -> LedgerResult<Option<XirrEstimate>> {
    let inv = get_investment(conn, user, id)?;
    let estimate = xirr(&cash_flows(&inv, as_of));
    if let Some(e) = estimate.filter(|e| !e.converged) {
        tracing::warn!(
            investment_id = id,
            rate_percent = e.rate_percent,
            "xirr did not converge, returning best estimate"
        );
    }
    Ok(estimate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn blank() -> Investment {
        Investment {
            id: 1,
            user_id: "u".into(),
            name: "Index Fund".into(),
            kind: "mutual_fund".into(),
            symbol: None,
            invested_amount: Decimal::ZERO,
            current_value: Decimal::ZERO,
            units: Decimal::ZERO,
            buy_price: Decimal::ZERO,
            current_price: Decimal::ZERO,
            purchase_date: d(2023, 1, 1),
            status: InvestmentStatus::Active,
            sold_date: None,
            sold_amount: None,
            total_dividends_received: Decimal::ZERO,
            last_dividend_date: None,
            last_dividend_amount: None,
            dividend_enabled: false,
            transactions: vec![],
            value_history: vec![],
            created_at: Utc::now(),
        }
    }

    fn txn(kind: InvestmentTxnKind, date: NaiveDate, amount: i64, units: i64) -> InvestmentTxn {
        InvestmentTxn {
            kind,
            date,
            amount: Decimal::from(amount),
            units: Decimal::from(units),
            price: Decimal::ZERO,
            note: None,
        }
    }

    #[test]
    fn buys_average_the_price() {
        let mut inv = blank();
        apply_investment_transaction(&mut inv, txn(InvestmentTxnKind::Buy, d(2023, 1, 1), 1000, 10))
            .unwrap();
        apply_investment_transaction(&mut inv, txn(InvestmentTxnKind::Buy, d(2023, 2, 1), 2000, 10))
            .unwrap();
        assert_eq!(inv.invested_amount, Decimal::from(3000));
        assert_eq!(inv.units, Decimal::from(20));
        assert_eq!(inv.buy_price, Decimal::from(150));
        assert_eq!(inv.transactions.len(), 2);
    }

    #[test]
    fn split_keeps_invested_and_lowers_buy_price() {
        let mut inv = blank();
        apply_investment_transaction(&mut inv, txn(InvestmentTxnKind::Buy, d(2023, 1, 1), 1000, 10))
            .unwrap();
        apply_investment_transaction(&mut inv, txn(InvestmentTxnKind::Split, d(2023, 6, 1), 0, 10))
            .unwrap();
        assert_eq!(inv.units, Decimal::from(20));
        assert_eq!(inv.buy_price, Decimal::from(50));
        assert_eq!(inv.invested_amount, Decimal::from(1000));
    }

    #[test]
    fn partial_then_full_sell() {
        let mut inv = blank();
        apply_investment_transaction(&mut inv, txn(InvestmentTxnKind::Buy, d(2023, 1, 1), 1000, 10))
            .unwrap();
        update_price(&mut inv, Decimal::from(120), d(2023, 6, 1)).unwrap();
        assert_eq!(inv.current_value, Decimal::from(1200));

        apply_investment_transaction(&mut inv, txn(InvestmentTxnKind::Sell, d(2023, 7, 1), 480, 4))
            .unwrap();
        assert_eq!(inv.status, InvestmentStatus::PartialSold);
        assert_eq!(inv.current_value, Decimal::from(720));

        apply_investment_transaction(&mut inv, txn(InvestmentTxnKind::Sell, d(2023, 8, 1), 720, 6))
            .unwrap();
        assert_eq!(inv.status, InvestmentStatus::Sold);
        assert_eq!(inv.sold_date, Some(d(2023, 8, 1)));
        assert_eq!(inv.sold_amount, Some(Decimal::from(1440)));
        assert_eq!(inv.units, Decimal::ZERO);

        let err = apply_investment_transaction(
            &mut inv,
            txn(InvestmentTxnKind::Buy, d(2023, 9, 1), 10, 1),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn dividends_accumulate() {
        let mut inv = blank();
        apply_investment_transaction(&mut inv, txn(InvestmentTxnKind::Buy, d(2023, 1, 1), 1000, 10))
            .unwrap();
        apply_investment_transaction(
            &mut inv,
            txn(InvestmentTxnKind::Dividend, d(2023, 3, 1), 20, 0),
        )
        .unwrap();
        apply_investment_transaction(
            &mut inv,
            txn(InvestmentTxnKind::Dividend, d(2023, 9, 1), 30, 0),
        )
        .unwrap();
        assert!(inv.dividend_enabled);
        assert_eq!(inv.total_dividends_received, Decimal::from(50));
        assert_eq!(inv.last_dividend_amount, Some(Decimal::from(30)));
        assert_eq!(inv.units, Decimal::from(10));

        let m = metrics(&inv, d(2024, 1, 1));
        assert_eq!(m.dividend_yield, Decimal::from(5));
        assert_eq!(m.absolute_return, Decimal::from(5));
        assert_eq!(m.days_held, 365);
    }

    #[test]
    fn invalid_amounts_are_rejected() {
        let mut inv = blank();
        assert!(
            apply_investment_transaction(&mut inv, txn(InvestmentTxnKind::Buy, d(2023, 1, 1), 0, 1))
                .is_err()
        );
        let empty_bonus = txn(InvestmentTxnKind::Bonus, d(2023, 1, 1), 0, 0);
        assert!(apply_investment_transaction(&mut inv, empty_bonus).is_err());
        assert!(inv.transactions.is_empty());
    }

    #[test]
    fn metrics_for_a_ten_percent_year() {
        let mut inv = blank();
        apply_investment_transaction(&mut inv, txn(InvestmentTxnKind::Buy, d(2023, 1, 1), 1000, 10))
            .unwrap();
        update_price(&mut inv, Decimal::from(110), d(2024, 1, 1)).unwrap();
        let m = metrics(&inv, d(2024, 1, 1));
        assert_eq!(m.profit_loss, Decimal::from(100));
        assert_eq!(m.profit_loss_percent, Decimal::from(10));
        let cagr = m.cagr.unwrap();
        assert!((cagr - 10.0).abs() < 1e-9, "cagr was {cagr}");
    }

    #[test]
    fn xirr_single_year_ten_percent() {
        let flows = [
            CashFlow {
                date: d(2023, 1, 1),
                amount: -1000.0,
            },
            CashFlow {
                date: d(2024, 1, 1),
                amount: 1100.0,
            },
        ];
        let est = xirr(&flows).unwrap();
        assert!(est.converged);
        assert!((est.rate_percent - 10.0).abs() < 0.1, "rate was {}", est.rate_percent);
    }

    #[test]
    fn xirr_two_year_doubling_converges() {
        let flows = [
            CashFlow {
                date: d(2022, 1, 1),
                amount: -1000.0,
            },
            CashFlow {
                date: d(2024, 1, 1),
                amount: 2000.0,
            },
        ];
        let est = xirr(&flows).unwrap();
        assert!(est.converged);
        // 730 days -> two years of 365; sqrt(2) - 1
        assert!((est.rate_percent - 41.42).abs() < 0.1, "rate was {}", est.rate_percent);
    }

    #[test]
    fn xirr_needs_both_signs() {
        assert!(xirr(&[]).is_none());
        let one_sided = [
            CashFlow {
                date: d(2023, 1, 1),
                amount: -10.0,
            },
            CashFlow {
                date: d(2023, 6, 1),
                amount: -10.0,
            },
        ];
        assert!(xirr(&one_sided).is_none());
    }

    #[test]
    fn cash_flows_append_open_value() {
        let mut inv = blank();
        apply_investment_transaction(&mut inv, txn(InvestmentTxnKind::Buy, d(2023, 1, 1), 1000, 10))
            .unwrap();
        apply_investment_transaction(&mut inv, txn(InvestmentTxnKind::Split, d(2023, 2, 1), 0, 10))
            .unwrap();
        update_price(&mut inv, Decimal::from(55), d(2024, 1, 1)).unwrap();
        let flows = cash_flows(&inv, d(2024, 1, 1));
        assert_eq!(flows.len(), 2);
        assert_eq!(flows[0].amount, -1000.0);
        assert_eq!(flows[1].amount, 1100.0);
    }
}
