// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;
use thiserror::Error;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors surfaced by ledger operations. None of them are retried internally.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("insufficient funds in account {account_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account_id: i64,
        balance: Decimal,
        requested: Decimal,
    },

    /// `id` is `None` when the definition is rejected before it is stored.
    #[error("recurring transaction is misconfigured: {reason}")]
    Configuration { id: Option<i64>, reason: String },

    #[error("{entity} {id} was modified concurrently")]
    Conflict { entity: &'static str, id: i64 },

    #[error(transparent)]
    Storage(#[from] rusqlite::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    /// True for conditions the caller can fix and then retry the whole operation.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientFunds { .. } | Self::Conflict { .. } | Self::Validation(_)
        )
    }
}
