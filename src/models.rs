// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Income,
    Expense,
    Transfer,
    Investment,
}

serde_plain::derive_display_from_serialize!(TransactionType);
serde_plain::derive_fromstr_from_deserialize!(TransactionType);

impl TransactionType {
    /// Whether this type moves money out of `from_account`.
    pub fn debits_source(self) -> bool {
        !matches!(self, TransactionType::Income)
    }

    /// Whether this type moves money into `to_account`.
    pub fn credits_destination(self) -> bool {
        matches!(self, TransactionType::Income | TransactionType::Transfer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Locked,
}

serde_plain::derive_display_from_serialize!(AccountStatus);
serde_plain::derive_fromstr_from_deserialize!(AccountStatus);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub code: String,
    pub symbol: String,
    pub name: String,
    pub locale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub r#type: String,
    pub currency: Currency,
    pub balance: Decimal,
    pub status: AccountStatus,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Cross-currency leg of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    pub rate: Decimal,
    pub converted_amount: Decimal,
    pub from_currency: String,
    pub to_currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: String,
    pub r#type: TransactionType,
    pub from_account: Option<i64>,
    pub to_account: Option<i64>,
    pub amount: Decimal,
    pub category: String,
    pub payment_mode: String,
    pub note: Option<String>,
    pub transaction_date: DateTime<Utc>,
    pub conversion: Option<Conversion>,
    pub tags: Vec<String>,
    pub recurring_id: Option<i64>,
    pub was_edited: bool,
    pub created_at: DateTime<Utc>,
}

/// One audited edit. Written once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionLog {
    pub id: i64,
    pub transaction_id: i64,
    pub user_id: String,
    pub old_data: Transaction,
    pub new_data: Transaction,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Yearly,
}

serde_plain::derive_display_from_serialize!(Frequency);
serde_plain::derive_fromstr_from_deserialize!(Frequency);

impl Frequency {
    /// Frequencies whose cursor is pinned to a day of the month.
    pub fn uses_day_of_month(self) -> bool {
        matches!(
            self,
            Frequency::Monthly | Frequency::Quarterly | Frequency::Yearly
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringTransaction {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub r#type: TransactionType,
    pub from_account: Option<i64>,
    pub to_account: Option<i64>,
    pub amount: Decimal,
    pub category: String,
    pub payment_mode: String,
    pub note: Option<String>,
    pub tags: Vec<String>,
    pub frequency: Frequency,
    pub day_of_month: Option<u32>, // 1-31
    pub day_of_week: Option<u32>,  // 0 = Sunday
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub next_run_date: NaiveDate,
    pub last_run_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub is_paused: bool,
    pub total_executions: u32,
    pub max_executions: Option<u32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub user_id: String,
    pub category: String,
    pub month: u32,
    pub year: i32,
    pub monthly_limit: Decimal,
    pub current_spent: Decimal,
    pub alert_threshold: Decimal, // percent
}

impl Budget {
    pub fn remaining(&self) -> Decimal {
        (self.monthly_limit - self.current_spent).max(Decimal::ZERO)
    }

    pub fn spent_percent(&self) -> Decimal {
        if self.monthly_limit.is_zero() {
            return Decimal::ZERO;
        }
        (self.current_spent / self.monthly_limit * Decimal::ONE_HUNDRED).round_dp(2)
    }

    pub fn is_over_budget(&self) -> bool {
        self.current_spent > self.monthly_limit
    }

    pub fn is_near_limit(&self) -> bool {
        self.spent_percent() >= self.alert_threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentStatus {
    Active,
    PartialSold,
    Sold,
}

serde_plain::derive_display_from_serialize!(InvestmentStatus);
serde_plain::derive_fromstr_from_deserialize!(InvestmentStatus);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentTxnKind {
    Buy,
    Sell,
    Dividend,
    Split,
    Bonus,
}

serde_plain::derive_display_from_serialize!(InvestmentTxnKind);
serde_plain::derive_fromstr_from_deserialize!(InvestmentTxnKind);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentTxn {
    pub kind: InvestmentTxnKind,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub units: Decimal,
    pub price: Decimal,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSnapshot {
    pub date: NaiveDate,
    pub value: Decimal,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investment {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub kind: String,
    pub symbol: Option<String>,
    pub invested_amount: Decimal,
    pub current_value: Decimal,
    pub units: Decimal,
    pub buy_price: Decimal,
    pub current_price: Decimal,
    pub purchase_date: NaiveDate,
    pub status: InvestmentStatus,
    pub sold_date: Option<NaiveDate>,
    pub sold_amount: Option<Decimal>,
    pub total_dividends_received: Decimal,
    pub last_dividend_date: Option<NaiveDate>,
    pub last_dividend_amount: Option<Decimal>,
    pub dividend_enabled: bool,
    pub transactions: Vec<InvestmentTxn>,
    pub value_history: Vec<ValueSnapshot>,
    pub created_at: DateTime<Utc>,
}
