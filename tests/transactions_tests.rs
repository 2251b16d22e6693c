// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

mod common;

use common::{USER, account, account_in, at, balance, dec, setup};
use ledgerline::{LedgerError, LedgerResult};
use ledgerline::engine::budgets;
use ledgerline::engine::ledger::{self, TransactionFilter};
use ledgerline::engine::transactions::{
    ConversionRequest, NewTransaction, TransactionChanges, amend_transaction,
    create_transaction_at,
};
use ledgerline::models::{Transaction, TransactionType};
use rusqlite::Connection;
use ledgerline::{cli, engine::accounts};

fn expense(from: i64, amount: &str, category: &str) -> NewTransaction {
    NewTransaction {
        r#type: TransactionType::Expense,
        from_account: Some(from),
        to_account: None,
        amount: dec(amount),
        category: category.into(),
        payment_mode: "card".into(),
        note: None,
        transaction_date: None,
        conversion: None,
        tags: vec![],
    }
}

#[test]
fn expense_debits_and_counts_against_budget() {
    let mut conn = setup();
    let a = account(&conn, "Checking", "500");
    budgets::set_budget(&conn, USER, "Food", 3, 2025, dec("100"), dec("80")).unwrap();

    create_transaction_at(&mut conn, USER, &expense(a, "85", "Food"), at(2025, 3, 10)).unwrap();

    assert_eq!(balance(&conn, a), dec("415"));
    let b = budgets::get_budget(&conn, USER, "Food", 3, 2025).unwrap().unwrap();
    assert_eq!(b.current_spent, dec("85"));
    assert!(b.is_near_limit());
    assert!(!b.is_over_budget());
}

#[test]
fn insufficient_funds_leaves_no_entry() {
    let mut conn = setup();
    let a = account(&conn, "Checking", "20");

    let err = create_transaction_at(&mut conn, USER, &expense(a, "50", "Rent"), at(2025, 1, 1))
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { account_id, .. } if account_id == a));

    assert_eq!(balance(&conn, a), dec("20"));
    let all = ledger::list_transactions(&conn, USER, &TransactionFilter::default()).unwrap();
    assert!(all.is_empty());
}

#[test]
fn transfer_with_conversion_credits_converted_amount() {
    let mut conn = setup();
    let usd = account_in(&conn, "USD", "USD", "100");
    let eur = account_in(&conn, "EUR", "EUR", "0");
    let new = NewTransaction {
        r#type: TransactionType::Transfer,
        from_account: Some(usd),
        to_account: Some(eur),
        amount: dec("50"),
        category: "Transfer".into(),
        payment_mode: "bank".into(),
        note: None,
        transaction_date: None,
        conversion: Some(ConversionRequest {
            rate: dec("0.9"),
            converted_amount: None,
            from_currency: "USD".into(),
            to_currency: "EUR".into(),
        }),
        tags: vec![],
    };
    create_transaction_at(&mut conn, USER, &new, at(2025, 2, 1)).unwrap();
    assert_eq!(balance(&conn, usd), dec("50"));
    assert_eq!(balance(&conn, eur), dec("45"));
}

#[test]
fn locked_account_refuses_mutation() {
    let mut conn = setup();
    let a = account(&conn, "Checking", "100");
    accounts::set_status(&conn, USER, a, ledgerline::models::AccountStatus::Locked).unwrap();
    let err = create_transaction_at(&mut conn, USER, &expense(a, "10", "Food"), at(2025, 1, 1))
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
    assert_eq!(balance(&conn, a), dec("100"));
}

#[test]
fn other_users_accounts_are_invisible() {
    let mut conn = setup();
    let a = account(&conn, "Checking", "100");
    let err = create_transaction_at(&mut conn, "mallory", &expense(a, "10", "Food"), at(2025, 1, 1))
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));
}

#[test]
fn amend_adjusts_balance_and_logs_snapshots() {
    let mut conn = setup();
    let a = account(&conn, "Checking", "200");
    let t = create_transaction_at(&mut conn, USER, &expense(a, "50", "Food"), at(2025, 4, 2))
        .unwrap();

    let changes = TransactionChanges {
        amount: Some(dec("80")),
        category: Some("Dining".into()),
        ..Default::default()
    };
    let amended = amend_transaction(&mut conn, USER, t.id, &changes, "receipt total was wrong")
        .unwrap();

    assert!(amended.was_edited);
    assert_eq!(amended.amount, dec("80"));
    assert_eq!(balance(&conn, a), dec("120"));

    let logs = ledger::list_logs(&conn, USER, t.id).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].reason, "receipt total was wrong");
    assert_eq!(logs[0].old_data, t);
    assert_eq!(logs[0].new_data, amended);
}

#[test]
fn amend_without_reason_is_rejected() {
    let mut conn = setup();
    let a = account(&conn, "Checking", "200");
    let t = create_transaction_at(&mut conn, USER, &expense(a, "50", "Food"), at(2025, 4, 2))
        .unwrap();
    let changes = TransactionChanges {
        amount: Some(dec("10")),
        ..Default::default()
    };
    let err = amend_transaction(&mut conn, USER, t.id, &changes, "   ").unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let stored = ledger::get_transaction(&conn, USER, t.id).unwrap();
    assert_eq!(stored.amount, dec("50"));
    assert!(!stored.was_edited);
    assert!(ledger::list_logs(&conn, USER, t.id).unwrap().is_empty());
    assert_eq!(balance(&conn, a), dec("150"));
}

#[test]
fn amend_that_would_overdraw_rolls_back() {
    let mut conn = setup();
    let a = account(&conn, "Checking", "60");
    let t = create_transaction_at(&mut conn, USER, &expense(a, "50", "Food"), at(2025, 4, 2))
        .unwrap();
    let changes = TransactionChanges {
        amount: Some(dec("100")),
        ..Default::default()
    };
    let err = amend_transaction(&mut conn, USER, t.id, &changes, "typo").unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    assert_eq!(balance(&conn, a), dec("10"));
    assert!(ledger::list_logs(&conn, USER, t.id).unwrap().is_empty());
}

#[test]
fn balance_equals_opening_plus_effects() {
    let mut conn = setup();
    let a = account(&conn, "Checking", "1000");
    let b = account(&conn, "Savings", "0");
    let mut income = expense(a, "300", "Salary");
    income.r#type = TransactionType::Income;
    income.from_account = None;
    income.to_account = Some(a);
    let transfer = NewTransaction {
        r#type: TransactionType::Transfer,
        from_account: Some(a),
        to_account: Some(b),
        ..expense(a, "250", "Savings")
    };
    for new in [&income, &expense(a, "75.25", "Food"), &transfer] {
        create_transaction_at(&mut conn, USER, new, at(2025, 5, 1)).unwrap();
    }
    assert_eq!(balance(&conn, a), dec("974.75"));
    assert_eq!(balance(&conn, b), dec("250"));

    let filter = TransactionFilter {
        account: Some(b),
        ..Default::default()
    };
    assert_eq!(ledger::list_transactions(&conn, USER, &filter).unwrap().len(), 1);
}

#[test]
fn cli_parses_amend_with_tags() {
    let m = cli::build_cli().get_matches_from([
        "ledgerline", "tx", "amend", "--id", "7", "--reason", "fix", "--tag", "a", "--tag", "b",
    ]);
    let (_, tx) = m.subcommand().unwrap();
    let (name, sub) = tx.subcommand().unwrap();
    assert_eq!(name, "amend");
    assert_eq!(sub.get_one::<i64>("id"), Some(&7));
    let tags: Vec<&String> = sub.get_many::<String>("tag").unwrap().collect();
    assert_eq!(tags, ["a", "b"]);
}

fn amend_amount(conn: &mut Connection, id: i64, amount: &str) -> LedgerResult<Transaction> {
    let changes = TransactionChanges {
        amount: Some(dec(amount)),
        ..Default::default()
    };
    amend_transaction(conn, USER, id, &changes, "corrected amount")
}

#[test]
fn amended_expense_moves_budget_spend() {
    let mut conn = setup();
    let a = account(&conn, "Checking", "200");
    budgets::set_budget(&conn, USER, "Food", 4, 2025, dec("100"), dec("80")).unwrap();
    let t = create_transaction_at(&mut conn, USER, &expense(a, "50", "Food"), at(2025, 4, 2))
        .unwrap();

    amend_amount(&mut conn, t.id, "150").unwrap();

    let b = budgets::get_budget(&conn, USER, "Food", 4, 2025).unwrap().unwrap();
    assert_eq!(b.current_spent, dec("150"));
    assert!(b.is_over_budget());
    assert_eq!(balance(&conn, a), dec("50"));

    amend_amount(&mut conn, t.id, "30").unwrap();
    let b = budgets::get_budget(&conn, USER, "Food", 4, 2025).unwrap().unwrap();
    assert_eq!(b.current_spent, dec("30"));
    assert!(!b.is_near_limit());
}

#[test]
fn recategorized_expense_moves_spend_between_budgets() {
    let mut conn = setup();
    let a = account(&conn, "Checking", "200");
    budgets::set_budget(&conn, USER, "Food", 4, 2025, dec("100"), dec("80")).unwrap();
    budgets::set_budget(&conn, USER, "Dining", 4, 2025, dec("100"), dec("80")).unwrap();
    let t = create_transaction_at(&mut conn, USER, &expense(a, "50", "Food"), at(2025, 4, 2))
        .unwrap();

    let changes = TransactionChanges {
        amount: Some(dec("60")),
        category: Some("Dining".into()),
        ..Default::default()
    };
    amend_transaction(&mut conn, USER, t.id, &changes, "it was a restaurant").unwrap();

    let food = budgets::get_budget(&conn, USER, "Food", 4, 2025).unwrap().unwrap();
    let dining = budgets::get_budget(&conn, USER, "Dining", 4, 2025).unwrap().unwrap();
    assert_eq!(food.current_spent, dec("0"));
    assert_eq!(dining.current_spent, dec("60"));
}

#[test]
fn lowering_spent_income_is_rejected() {
    let mut conn = setup();
    let a = account(&conn, "Checking", "0");
    let mut income = expense(a, "100", "Salary");
    income.r#type = TransactionType::Income;
    income.from_account = None;
    income.to_account = Some(a);
    let t = create_transaction_at(&mut conn, USER, &income, at(2025, 6, 1)).unwrap();
    create_transaction_at(&mut conn, USER, &expense(a, "90", "Rent"), at(2025, 6, 2)).unwrap();

    let err = amend_amount(&mut conn, t.id, "50").unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { account_id, .. } if account_id == a));

    assert_eq!(balance(&conn, a), dec("10"));
    let stored = ledger::get_transaction(&conn, USER, t.id).unwrap();
    assert_eq!(stored.amount, dec("100"));
    assert!(ledger::list_logs(&conn, USER, t.id).unwrap().is_empty());
}

#[test]
fn amended_transfer_moves_both_legs() {
    let mut conn = setup();
    let a = account(&conn, "Checking", "200");
    let b = account(&conn, "Savings", "0");
    let transfer = NewTransaction {
        r#type: TransactionType::Transfer,
        from_account: Some(a),
        to_account: Some(b),
        ..expense(a, "50", "Savings")
    };
    let t = create_transaction_at(&mut conn, USER, &transfer, at(2025, 6, 1)).unwrap();

    amend_amount(&mut conn, t.id, "80").unwrap();
    assert_eq!(balance(&conn, a), dec("120"));
    assert_eq!(balance(&conn, b), dec("80"));

    amend_amount(&mut conn, t.id, "20").unwrap();
    assert_eq!(balance(&conn, a), dec("180"));
    assert_eq!(balance(&conn, b), dec("20"));
}

#[test]
fn amended_conversion_rescales_credit_leg() {
    let mut conn = setup();
    let usd = account_in(&conn, "USD", "USD", "100");
    let eur = account_in(&conn, "EUR", "EUR", "0");
    let new = NewTransaction {
        r#type: TransactionType::Transfer,
        from_account: Some(usd),
        to_account: Some(eur),
        amount: dec("50"),
        category: "Transfer".into(),
        payment_mode: "bank".into(),
        note: None,
        transaction_date: None,
        conversion: Some(ConversionRequest {
            rate: dec("0.9"),
            converted_amount: None,
            from_currency: "USD".into(),
            to_currency: "EUR".into(),
        }),
        tags: vec![],
    };
    let t = create_transaction_at(&mut conn, USER, &new, at(2025, 2, 1)).unwrap();

    let amended = amend_amount(&mut conn, t.id, "100").unwrap();

    assert_eq!(balance(&conn, usd), dec("0"));
    assert_eq!(balance(&conn, eur), dec("90"));
    let conv = amended.conversion.unwrap();
    assert_eq!(conv.converted_amount.to_string(), "90");
    assert_eq!(conv.rate, dec("0.9"));
}
