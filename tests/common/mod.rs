// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use ledgerline::db;
use ledgerline::engine::accounts::{NewAccount, create_account};
use ledgerline::models::Currency;
use rusqlite::Connection;
use rust_decimal::Decimal;

pub const USER: &str = "alice";

pub fn setup() -> Connection {
    db::open_in_memory().unwrap()
}

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
}

pub fn account(conn: &Connection, name: &str, balance: &str) -> i64 {
    account_in(conn, name, "USD", balance)
}

pub fn account_in(conn: &Connection, name: &str, ccy: &str, balance: &str) -> i64 {
    create_account(
        conn,
        USER,
        &NewAccount {
            name: name.into(),
            r#type: "savings".into(),
            currency: Currency {
                code: ccy.into(),
                symbol: String::new(),
                name: String::new(),
                locale: String::new(),
            },
            opening_balance: dec(balance),
        },
    )
    .unwrap()
    .id
}

pub fn balance(conn: &Connection, id: i64) -> Decimal {
    ledgerline::engine::accounts::get_account(conn, USER, id)
        .unwrap()
        .balance
}
