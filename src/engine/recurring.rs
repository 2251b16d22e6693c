// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Recurring schedules: cursor arithmetic, eligibility, and materializing
//! entries into the ledger.
//!
//! An execution is one write transaction covering the ledger insert, the
//! balance/budget effect and the cursor advance. The IMMEDIATE lock is taken
//! before the definition is read, so two callers racing on the same
//! definition see each other's advance and at most one materializes.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::with_write_tx;
use crate::engine::transactions::{self, check_account_legs};
use crate::engine::accounts;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Frequency, RecurringTransaction, Transaction, TransactionType};
use crate::utils::{json_at, last_day_of_month, parsed_at};

const RECURRING_COLUMNS: &str = "id, user_id, name, type, from_account, to_account, amount, \
     category, payment_mode, note, tags, frequency, day_of_month, day_of_week, start_date, \
     end_date, next_run_date, last_run_date, is_active, is_paused, total_executions, \
     max_executions, created_at";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecurring {
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
    pub day_of_month: Option<u32>,
    pub day_of_week: Option<u32>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub max_executions: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Scheduler tick: only runs when the cursor is due.
    Scheduled,
    /// User-triggered "execute now": skips the due-date check only.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    Inactive,
    Paused,
    Ended { end_date: NaiveDate },
    MaxExecutionsReached { max: u32 },
    NotDue { next_run_date: NaiveDate },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Executed {
        transaction: Transaction,
        definition: RecurringTransaction,
    },
    Skipped {
        definition_id: i64,
        reason: SkipReason,
    },
}

impl ExecutionOutcome {
    pub fn is_executed(&self) -> bool {
        matches!(self, ExecutionOutcome::Executed { .. })
    }
}

/// Longest preview `upcoming` will build.
pub const MAX_UPCOMING: usize = 366;

fn add_months_clamped(
    date: NaiveDate,
    months: u32,
    day_of_month: Option<u32>,
) -> Option<NaiveDate> {
    // chrono already clamps to the last valid day rather than rolling over.
    let moved = date.checked_add_months(Months::new(months))?;
    Some(match day_of_month {
        Some(dom) => {
            let day = dom.min(last_day_of_month(moved.year(), moved.month()));
            moved.with_day(day).unwrap_or(moved)
        }
        None => moved,
    })
}

/// Next cursor position after `from`, or `None` past the calendar's range.
pub fn checked_advance(
    from: NaiveDate,
    frequency: Frequency,
    day_of_month: Option<u32>,
) -> Option<NaiveDate> {
    match frequency {
        Frequency::Daily => from.checked_add_days(Days::new(1)),
        Frequency::Weekly => from.checked_add_days(Days::new(7)),
        Frequency::Biweekly => from.checked_add_days(Days::new(14)),
        Frequency::Monthly => add_months_clamped(from, 1, day_of_month),
        Frequency::Quarterly => add_months_clamped(from, 3, day_of_month),
        Frequency::Yearly => add_months_clamped(from, 12, day_of_month),
    }
}

/// Next cursor position after `from`. Saturates at [`NaiveDate::MAX`].
pub fn advance(from: NaiveDate, frequency: Frequency, day_of_month: Option<u32>) -> NaiveDate {
    checked_advance(from, frequency, day_of_month).unwrap_or(NaiveDate::MAX)
}

/// First eligible date on or after `start`, honouring the weekday anchor for
/// weekly schedules and the day-of-month anchor for month-based ones.
pub fn initial_run_date(
    start: NaiveDate,
    frequency: Frequency,
    day_of_month: Option<u32>,
    day_of_week: Option<u32>,
) -> NaiveDate {
    match (frequency, day_of_week, day_of_month) {
        (Frequency::Weekly, Some(dow), _) => {
            let current = start.weekday().num_days_from_sunday();
            let ahead = (dow + 7 - current) % 7;
            start.checked_add_days(Days::new(ahead as u64)).unwrap_or(start)
        }
        (f, _, Some(dom)) if f.uses_day_of_month() => {
            let day = dom.min(last_day_of_month(start.year(), start.month()));
            let candidate = start.with_day(day).unwrap_or(start);
            if candidate >= start {
                candidate
            } else {
                add_months_clamped(candidate, 1, Some(dom)).unwrap_or(start)
            }
        }
        _ => start,
    }
}

/// Checks every precondition except the due date for manual runs.
pub fn eligibility(
    def: &RecurringTransaction,
    today: NaiveDate,
    mode: ExecutionMode,
) -> Result<(), SkipReason> {
    if !def.is_active {
        return Err(SkipReason::Inactive);
    }
    if def.is_paused {
        return Err(SkipReason::Paused);
    }
    if let Some(end_date) = def.end_date {
        if today > end_date {
            return Err(SkipReason::Ended { end_date });
        }
    }
    if let Some(max) = def.max_executions {
        if def.total_executions >= max {
            return Err(SkipReason::MaxExecutionsReached { max });
        }
    }
    if mode == ExecutionMode::Scheduled && today < def.next_run_date {
        return Err(SkipReason::NotDue {
            next_run_date: def.next_run_date,
        });
    }
    Ok(())
}

pub fn should_execute(def: &RecurringTransaction, today: NaiveDate) -> bool {
    eligibility(def, today, ExecutionMode::Scheduled).is_ok()
}

/// Previews the next `count` run dates without touching stored state. At
/// most [`MAX_UPCOMING`] dates are returned.
pub fn upcoming(def: &RecurringTransaction, count: usize) -> Vec<NaiveDate> {
    let count = count.min(MAX_UPCOMING);
    let mut out = Vec::with_capacity(count);
    let mut cursor = Some(def.next_run_date);
    let mut remaining_runs = def
        .max_executions
        .map(|m| m.saturating_sub(def.total_executions) as usize);
    while let Some(date) = cursor {
        if out.len() >= count
            || def.end_date.is_some_and(|end| date > end)
            || remaining_runs == Some(0)
        {
            break;
        }
        out.push(date);
        remaining_runs = remaining_runs.map(|r| r - 1);
        cursor = checked_advance(date, def.frequency, def.day_of_month);
    }
    out
}

fn recurring_from_row(r: &Row<'_>) -> rusqlite::Result<RecurringTransaction> {
    Ok(RecurringTransaction {
        id: r.get(0)?,
        user_id: r.get(1)?,
        name: r.get(2)?,
        r#type: parsed_at(r, 3)?,
        from_account: r.get(4)?,
        to_account: r.get(5)?,
        amount: parsed_at(r, 6)?,
        category: r.get(7)?,
        payment_mode: r.get(8)?,
        note: r.get(9)?,
        tags: json_at(r, 10)?,
        frequency: parsed_at(r, 11)?,
        day_of_month: r.get(12)?,
        day_of_week: r.get(13)?,
        start_date: r.get(14)?,
        end_date: r.get(15)?,
        next_run_date: r.get(16)?,
        last_run_date: r.get(17)?,
        is_active: r.get(18)?,
        is_paused: r.get(19)?,
        total_executions: r.get(20)?,
        max_executions: r.get(21)?,
        created_at: r.get(22)?,
    })
}

pub fn create_recurring(
    conn: &Connection,
    user: &str,
    new: &NewRecurring,
) -> LedgerResult<RecurringTransaction> {
    let name = new.name.trim();
    if name.is_empty() {
        return Err(LedgerError::validation("recurring transaction needs a name"));
    }
    if new.amount <= Decimal::ZERO {
        return Err(LedgerError::validation("amount must be positive"));
    }
    if new.category.trim().is_empty() {
        return Err(LedgerError::validation("category is required"));
    }
    check_account_legs(new.r#type, new.from_account, new.to_account)
        .map_err(|reason| LedgerError::Configuration { id: None, reason })?;
    if new.day_of_month.is_some_and(|d| !(1..=31).contains(&d)) {
        return Err(LedgerError::validation("day_of_month must be within 1-31"));
    }
    if new.day_of_week.is_some_and(|d| d > 6) {
        return Err(LedgerError::validation("day_of_week must be within 0-6"));
    }
    if new.end_date.is_some_and(|end| end < new.start_date) {
        return Err(LedgerError::validation("end_date is before start_date"));
    }
    if new.max_executions == Some(0) {
        return Err(LedgerError::validation("max_executions must be at least 1"));
    }
    for id in [new.from_account, new.to_account].into_iter().flatten() {
        accounts::get_account(conn, user, id)?;
    }

    let next_run = initial_run_date(
        new.start_date,
        new.frequency,
        new.day_of_month,
        new.day_of_week,
    );
    conn.execute(
        "INSERT INTO recurring_transactions(user_id, name, type, from_account, to_account, amount,
             category, payment_mode, note, tags, frequency, day_of_month, day_of_week, start_date,
             end_date, next_run_date, max_executions, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            user,
            name,
            new.r#type.to_string(),
            new.from_account,
            new.to_account,
            new.amount.to_string(),
            new.category.trim(),
            new.payment_mode.trim(),
            new.note,
            serde_json::to_string(&new.tags)?,
            new.frequency.to_string(),
            new.day_of_month,
            new.day_of_week,
            new.start_date,
            new.end_date,
            next_run,
            new.max_executions,
            Utc::now(),
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(
        recurring_id = id,
        frequency = %new.frequency,
        %next_run,
        "recurring transaction created"
    );
    get_recurring(conn, user, id)
}

pub fn get_recurring(conn: &Connection, user: &str, id: i64) -> LedgerResult<RecurringTransaction> {
    let sql = format!(
        "SELECT {RECURRING_COLUMNS} FROM recurring_transactions WHERE id=?1 AND user_id=?2"
    );
    conn.query_row(&sql, params![id, user], recurring_from_row)
        .optional()?
        .ok_or_else(|| LedgerError::not_found("recurring transaction", id))
}

pub fn list_recurring(conn: &Connection, user: &str) -> LedgerResult<Vec<RecurringTransaction>> {
    let sql = format!(
        "SELECT {RECURRING_COLUMNS} FROM recurring_transactions WHERE user_id=?1
         ORDER BY next_run_date, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user], recurring_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Definitions a scheduler tick would execute on `today`.
pub fn due_definitions(
    conn: &Connection,
    user: &str,
    today: NaiveDate,
) -> LedgerResult<Vec<RecurringTransaction>> {
    Ok(list_recurring(conn, user)?
        .into_iter()
        .filter(|d| should_execute(d, today))
        .collect())
}

/// Flips the paused flag. The cursor is left alone, so a resumed definition
/// whose date has passed is due on the next tick.
pub fn toggle_pause(conn: &Connection, user: &str, id: i64) -> LedgerResult<RecurringTransaction> {
    let def = get_recurring(conn, user, id)?;
    conn.execute(
        "UPDATE recurring_transactions SET is_paused=?1 WHERE id=?2 AND user_id=?3",
        params![!def.is_paused, id, user],
    )?;
    tracing::info!(recurring_id = id, paused = !def.is_paused, "recurring pause toggled");
    get_recurring(conn, user, id)
}

pub fn set_active(
    conn: &Connection,
    user: &str,
    id: i64,
    active: bool,
) -> LedgerResult<RecurringTransaction> {
    get_recurring(conn, user, id)?;
    conn.execute(
        "UPDATE recurring_transactions SET is_active=?1 WHERE id=?2 AND user_id=?3",
        params![active, id, user],
    )?;
    get_recurring(conn, user, id)
}

fn materialize(def: &RecurringTransaction, now: DateTime<Utc>) -> Transaction {
    let marker = format!("[Recurring: {}]", def.name);
    let note = match def.note.as_deref().map(str::trim) {
        Some(n) if !n.is_empty() => format!("{} {}", marker, n),
        _ => marker,
    };
    Transaction {
        id: 0,
        user_id: def.user_id.clone(),
        r#type: def.r#type,
        from_account: def.from_account,
        to_account: def.to_account,
        amount: def.amount,
        category: def.category.clone(),
        payment_mode: def.payment_mode.clone(),
        note: Some(note),
        transaction_date: now,
        conversion: None,
        tags: def.tags.clone(),
        recurring_id: Some(def.id),
        was_edited: false,
        created_at: now,
    }
}

/// Executes a definition once, now.
pub fn execute_recurring(
    conn: &mut Connection,
    user: &str,
    id: i64,
    mode: ExecutionMode,
) -> LedgerResult<ExecutionOutcome> {
    execute_recurring_at(conn, user, id, mode, Utc::now())
}

pub fn execute_recurring_at(
    conn: &mut Connection,
    user: &str,
    id: i64,
    mode: ExecutionMode,
    now: DateTime<Utc>,
) -> LedgerResult<ExecutionOutcome> {
    with_write_tx(conn, |tx| {
        let def = get_recurring(tx, user, id)?;
        if let Err(reason) = eligibility(&def, now.date_naive(), mode) {
            tracing::debug!(recurring_id = id, ?reason, ?mode, "execution skipped");
            return Ok(ExecutionOutcome::Skipped {
                definition_id: id,
                reason,
            });
        }
        check_account_legs(def.r#type, def.from_account, def.to_account)
            .map_err(|reason| LedgerError::Configuration {
                id: Some(id),
                reason,
            })?;

        let txn = transactions::record(tx, &materialize(&def, now), now)?;

        let next_run = advance(def.next_run_date, def.frequency, def.day_of_month);
        let total = def.total_executions + 1;
        let still_active = def.max_executions.is_none_or(|max| total < max);
        let changed = tx.execute(
            "UPDATE recurring_transactions
             SET next_run_date=?1, last_run_date=?2, total_executions=?3, is_active=?4
             WHERE id=?5 AND user_id=?6 AND total_executions=?7 AND next_run_date=?8",
            params![
                next_run,
                now,
                total,
                still_active,
                id,
                user,
                def.total_executions,
                def.next_run_date
            ],
        )?;
        if changed == 0 {
            return Err(LedgerError::Conflict {
                entity: "recurring transaction",
                id,
            });
        }
        if !still_active {
            tracing::info!(
                recurring_id = id,
                total,
                "recurring transaction reached max executions"
            );
        }
        tracing::info!(
            recurring_id = id,
            transaction_id = txn.id,
            ?mode,
            %next_run,
            "recurring transaction executed"
        );
        let definition = get_recurring(tx, user, id)?;
        Ok(ExecutionOutcome::Executed {
            transaction: txn,
            definition,
        })
    })
}

/// Scheduler tick: executes every due definition once. A failure on one
/// definition is reported alongside the others rather than aborting the tick.
pub fn run_due(
    conn: &mut Connection,
    user: &str,
    now: DateTime<Utc>,
) -> LedgerResult<Vec<(i64, LedgerResult<ExecutionOutcome>)>> {
    let due = due_definitions(conn, user, now.date_naive())?;
    let mut results = Vec::with_capacity(due.len());
    for def in due {
        let res = execute_recurring_at(conn, user, def.id, ExecutionMode::Scheduled, now);
        if let Err(e) = &res {
            tracing::warn!(recurring_id = def.id, error = %e, "scheduled execution failed");
        }
        results.push((def.id, res));
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn def(next: NaiveDate) -> RecurringTransaction {
        RecurringTransaction {
            id: 1,
            user_id: "u".into(),
            name: "Rent".into(),
            r#type: TransactionType::Expense,
            from_account: Some(1),
            to_account: None,
            amount: Decimal::from(100),
            category: "Housing".into(),
            payment_mode: "bank".into(),
            note: None,
            tags: vec![],
            frequency: Frequency::Monthly,
            day_of_month: None,
            day_of_week: None,
            start_date: next,
            end_date: None,
            next_run_date: next,
            last_run_date: None,
            is_active: true,
            is_paused: false,
            total_executions: 0,
            max_executions: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn monthly_clamps_to_short_months() {
        assert_eq!(advance(d(2025, 1, 31), Frequency::Monthly, Some(31)), d(2025, 2, 28));
        assert_eq!(advance(d(2024, 1, 31), Frequency::Monthly, Some(31)), d(2024, 2, 29));
        // The anchor brings the cursor back up once the month allows it.
        assert_eq!(advance(d(2025, 2, 28), Frequency::Monthly, Some(31)), d(2025, 3, 31));
        assert_eq!(advance(d(2025, 3, 31), Frequency::Monthly, Some(31)), d(2025, 4, 30));
    }

    #[test]
    fn monthly_without_anchor_still_never_overflows() {
        assert_eq!(advance(d(2025, 1, 31), Frequency::Monthly, None), d(2025, 2, 28));
    }

    #[test]
    fn day_based_frequencies() {
        assert_eq!(advance(d(2025, 12, 31), Frequency::Daily, None), d(2026, 1, 1));
        assert_eq!(advance(d(2025, 2, 25), Frequency::Weekly, None), d(2025, 3, 4));
        assert_eq!(advance(d(2025, 2, 25), Frequency::Biweekly, None), d(2025, 3, 11));
    }

    #[test]
    fn quarterly_and_yearly() {
        assert_eq!(advance(d(2025, 11, 30), Frequency::Quarterly, Some(30)), d(2026, 2, 28));
        assert_eq!(advance(d(2024, 2, 29), Frequency::Yearly, Some(29)), d(2025, 2, 28));
        assert_eq!(advance(d(2027, 2, 28), Frequency::Yearly, Some(29)), d(2028, 2, 29));
    }

    #[test]
    fn initial_run_respects_anchors() {
        // 2025-03-05 is a Wednesday; 1 = Monday.
        assert_eq!(
            initial_run_date(d(2025, 3, 5), Frequency::Weekly, None, Some(1)),
            d(2025, 3, 10)
        );
        assert_eq!(
            initial_run_date(d(2025, 3, 5), Frequency::Weekly, None, Some(3)),
            d(2025, 3, 5)
        );
        assert_eq!(
            initial_run_date(d(2025, 3, 5), Frequency::Monthly, Some(1), None),
            d(2025, 4, 1)
        );
        assert_eq!(
            initial_run_date(d(2025, 2, 5), Frequency::Monthly, Some(31), None),
            d(2025, 2, 28)
        );
        assert_eq!(
            initial_run_date(d(2025, 2, 5), Frequency::Daily, Some(31), None),
            d(2025, 2, 5)
        );
    }

    #[test]
    fn eligibility_checks_in_order() {
        let today = d(2025, 3, 10);
        let mut r = def(d(2025, 3, 10));
        assert!(should_execute(&r, today));

        r.next_run_date = d(2025, 3, 11);
        assert_eq!(
            eligibility(&r, today, ExecutionMode::Scheduled),
            Err(SkipReason::NotDue {
                next_run_date: d(2025, 3, 11)
            })
        );
        assert!(eligibility(&r, today, ExecutionMode::Manual).is_ok());

        r.is_paused = true;
        assert_eq!(
            eligibility(&r, today, ExecutionMode::Manual),
            Err(SkipReason::Paused)
        );
        r.is_paused = false;

        r.end_date = Some(d(2025, 3, 9));
        assert!(matches!(
            eligibility(&r, today, ExecutionMode::Manual),
            Err(SkipReason::Ended { .. })
        ));
        r.end_date = Some(today);
        assert!(eligibility(&r, today, ExecutionMode::Manual).is_ok());

        r.max_executions = Some(2);
        r.total_executions = 2;
        assert!(matches!(
            eligibility(&r, today, ExecutionMode::Manual),
            Err(SkipReason::MaxExecutionsReached { max: 2 })
        ));

        r.is_active = false;
        assert_eq!(
            eligibility(&r, today, ExecutionMode::Manual),
            Err(SkipReason::Inactive)
        );
    }

    #[test]
    fn upcoming_stops_at_end_and_max() {
        let mut r = def(d(2025, 1, 31));
        r.day_of_month = Some(31);
        assert_eq!(
            upcoming(&r, 3),
            vec![d(2025, 1, 31), d(2025, 2, 28), d(2025, 3, 31)]
        );

        r.end_date = Some(d(2025, 2, 28));
        assert_eq!(upcoming(&r, 5), vec![d(2025, 1, 31), d(2025, 2, 28)]);

        r.end_date = None;
        r.max_executions = Some(3);
        r.total_executions = 2;
        assert_eq!(upcoming(&r, 5), vec![d(2025, 1, 31)]);
    }

    #[test]
    fn upcoming_caps_huge_counts() {
        let mut r = def(d(2025, 1, 1));
        r.frequency = Frequency::Daily;
        r.end_date = Some(d(2025, 1, 10));
        assert_eq!(upcoming(&r, usize::MAX).len(), 10);

        r.end_date = None;
        let dates = upcoming(&r, usize::MAX);
        assert_eq!(dates.len(), MAX_UPCOMING);
        assert_eq!(dates.last(), Some(&d(2026, 1, 1)));
    }

    #[test]
    fn advance_saturates_at_calendar_end() {
        let last = NaiveDate::MAX;
        assert_eq!(checked_advance(last, Frequency::Daily, None), None);
        assert_eq!(checked_advance(last, Frequency::Monthly, None), None);
        assert_eq!(advance(last, Frequency::Weekly, None), NaiveDate::MAX);

        let mut r = def(last.pred_opt().unwrap());
        r.frequency = Frequency::Daily;
        assert_eq!(upcoming(&r, 5), vec![last.pred_opt().unwrap(), last]);
    }

    #[test]
    fn materialized_note_carries_marker() {
        let mut r = def(d(2025, 1, 1));
        let t = materialize(&r, Utc::now());
        assert_eq!(t.note.as_deref(), Some("[Recurring: Rent]"));
        assert_eq!(t.recurring_id, Some(1));

        r.note = Some("flat 4B".into());
        let t = materialize(&r, Utc::now());
        assert_eq!(t.note.as_deref(), Some("[Recurring: Rent] flat 4B"));
    }
}
