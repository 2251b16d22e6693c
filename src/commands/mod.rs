// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod accounts;
pub mod budgets;
pub mod portfolio;
pub mod recurring;
pub mod reports;
pub mod settings;
pub mod transactions;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::ArgMatches;
use rust_decimal::Decimal;

use crate::utils::{parse_date, parse_decimal};

pub(crate) fn required<'a>(m: &'a ArgMatches, id: &str) -> Result<&'a str> {
    m.get_one::<String>(id)
        .map(String::as_str)
        .with_context(|| format!("Missing --{}", id))
}

pub(crate) fn required_id(m: &ArgMatches) -> Result<i64> {
    m.get_one::<i64>("id").copied().context("Missing --id")
}

pub(crate) fn decimal_arg(m: &ArgMatches, id: &str) -> Result<Option<Decimal>> {
    m.get_one::<String>(id).map(|s| parse_decimal(s)).transpose()
}

pub(crate) fn date_arg(m: &ArgMatches, id: &str) -> Result<Option<NaiveDate>> {
    m.get_one::<String>(id).map(|s| parse_date(s)).transpose()
}

/// Date flags are day-granular; they land at midnight UTC.
pub(crate) fn start_of_day(d: NaiveDate) -> DateTime<Utc> {
    d.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or_else(Utc::now)
}

/// Inclusive upper bound for a `--to DATE` filter.
pub(crate) fn end_of_day(d: NaiveDate) -> DateTime<Utc> {
    d.and_hms_opt(23, 59, 59)
        .map(|dt| dt.and_utc())
        .unwrap_or_else(Utc::now)
}

pub(crate) fn tags_arg(m: &ArgMatches) -> Option<Vec<String>> {
    m.get_many::<String>("tag").map(|v| v.cloned().collect())
}
