// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

mod common;

use chrono::NaiveDate;
use common::{USER, account, at, dec, setup};
use ledgerline::engine::analytics;
use ledgerline::engine::budgets;
use ledgerline::engine::investments::{self, NewInvestment};
use ledgerline::engine::transactions::{NewTransaction, create_transaction};
use ledgerline::models::{InvestmentTxn, InvestmentTxnKind, TransactionType};
use rusqlite::Connection;

fn entry(
    r#type: TransactionType,
    from: Option<i64>,
    to: Option<i64>,
    amount: &str,
    category: &str,
    when: chrono::DateTime<chrono::Utc>,
) -> NewTransaction {
    NewTransaction {
        r#type,
        from_account: from,
        to_account: to,
        amount: dec(amount),
        category: category.into(),
        payment_mode: "card".into(),
        note: None,
        transaction_date: Some(when),
        conversion: None,
        tags: vec![],
    }
}

fn seed(conn: &mut Connection) -> i64 {
    let a = account(conn, "Checking", "0");
    let rows = [
        entry(TransactionType::Income, None, Some(a), "3000", "Salary", at(2025, 1, 1)),
        entry(TransactionType::Expense, Some(a), None, "200", "Food", at(2025, 1, 5)),
        entry(TransactionType::Expense, Some(a), None, "600", "Rent", at(2025, 1, 6)),
        entry(TransactionType::Expense, Some(a), None, "200", "Food", at(2025, 2, 3)),
        entry(TransactionType::Income, None, Some(a), "3000", "Salary", at(2025, 3, 1)),
    ];
    for r in &rows {
        create_transaction(conn, USER, r).unwrap();
    }
    a
}

#[test]
fn summary_over_a_range() {
    let mut conn = setup();
    seed(&mut conn);
    let s = analytics::summary(&conn, USER, Some(at(2025, 1, 1)), Some(at(2025, 1, 31))).unwrap();
    assert_eq!(s.income, dec("3000"));
    assert_eq!(s.expense, dec("800"));
    assert_eq!(s.net, dec("2200"));
    assert_eq!(s.count, 3);
}

#[test]
fn category_breakdown_is_sorted_with_shares() {
    let mut conn = setup();
    seed(&mut conn);
    let cats = analytics::category_breakdown(&conn, USER, None, None).unwrap();
    assert_eq!(cats.len(), 2);
    assert_eq!(cats[0].category, "Rent");
    assert_eq!(cats[0].percent, dec("60"));
    assert_eq!(cats[1].category, "Food");
    assert_eq!(cats[1].count, 2);
}

#[test]
fn monthly_trend_fills_empty_months() {
    let mut conn = setup();
    seed(&mut conn);
    let trend = analytics::monthly_trend(
        &conn,
        USER,
        4,
        NaiveDate::from_ymd_opt(2025, 4, 15).unwrap(),
    )
    .unwrap();
    let months: Vec<&str> = trend.iter().map(|t| t.month.as_str()).collect();
    assert_eq!(months, ["2025-01", "2025-02", "2025-03", "2025-04"]);
    assert_eq!(trend[0].net, dec("2200"));
    assert_eq!(trend[1].expense, dec("200"));
    assert_eq!(trend[3].income, dec("0"));
}

#[test]
fn budget_overview_reports_derived_figures() {
    let conn = setup();
    budgets::set_budget(&conn, USER, "Food", 1, 2025, dec("100"), dec("80")).unwrap();
    budgets::increment_spent(&conn, USER, "Food", 1, 2025, dec("120")).unwrap();
    let list = analytics::budget_overview(&conn, USER, 1, 2025).unwrap();
    assert_eq!(list.len(), 1);
    assert!(list[0].is_over_budget);
    assert_eq!(list[0].remaining, dec("0"));
    assert_eq!(list[0].spent_percent, dec("120"));
}

#[test]
fn net_worth_adds_open_investments() {
    let mut conn = setup();
    seed(&mut conn);
    let id = investments::create_investment(
        &conn,
        USER,
        &NewInvestment {
            name: "Gold".into(),
            kind: "gold".into(),
            symbol: None,
            purchase_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        },
    )
    .unwrap()
    .id;
    investments::record_investment_transaction(
        &mut conn,
        USER,
        id,
        InvestmentTxn {
            kind: InvestmentTxnKind::Buy,
            date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            amount: dec("500"),
            units: dec("5"),
            price: dec("100"),
            note: None,
        },
        None,
    )
    .unwrap();
    let nw = analytics::net_worth(&conn, USER).unwrap();
    assert_eq!(nw.accounts_total, dec("5000"));
    assert_eq!(nw.investments_value, dec("500"));
    assert_eq!(nw.net_worth, dec("5500"));
}
