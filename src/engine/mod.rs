// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Ledger core. Every function is scoped to a single user id; there is no
//! cross-user access path.

pub mod accounts;
pub mod analytics;
pub mod budgets;
pub mod investments;
pub mod ledger;
pub mod mutator;
pub mod recurring;
pub mod transactions;

pub use recurring::{ExecutionMode, ExecutionOutcome, SkipReason};
pub use transactions::{NewTransaction, TransactionChanges};
