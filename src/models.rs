// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Transaction-type labels as stored in the records.
pub const EXPENSE_TYPE: &str = "支出";
pub const INCOME_TYPE: &str = "收入";
/// Payment method counted as cash in the monthly totals.
pub const CASH_METHOD: &str = "現金";

/// Ledger every user starts with.
pub const DEFAULT_PERSONAL_LEDGER: &str = "expenses";

/// Sentinel quantity for holdings that are not tradable positions
/// (cash, deposits); anything >= 0 is a share count.
pub const NON_QUANTITY: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerKind {
    Personal,
    Shared,
}

impl LedgerKind {
    pub fn parse(s: &str) -> Option<LedgerKind> {
        match s {
            "personal" => Some(LedgerKind::Personal),
            "shared" => Some(LedgerKind::Shared),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerKind::Personal => "personal",
            LedgerKind::Shared => "shared",
        }
    }
}

impl fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    /// YYYY/MM/DD
    pub date: String,
    pub item: String,
    /// Minor currency units, no fractions.
    pub amount: i64,
    pub payment_method: String,
    pub category: String,
    #[serde(rename = "transactionType")]
    pub transaction_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    /// Only present on shared-ledger records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: i64,
    pub item: String,
    pub asset_type: String,
    pub acquisition_date: String,
    pub acquisition_value: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Decimal>,
    pub current_amount: Decimal,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Shared stock catalog entry, keyed by ticker across all users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockEntry {
    pub item: String,
    #[serde(default)]
    pub current_price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedLedgerRef {
    pub invite_code: String,
    pub name: String,
}

impl SharedLedgerRef {
    /// Membership entries come back as raw JSON; entries missing either
    /// field are malformed and skipped by callers.
    pub fn from_value(v: &Value) -> Option<SharedLedgerRef> {
        let invite_code = v.get("invite_code")?.as_str()?.to_string();
        let name = v.get("name")?.as_str()?.to_string();
        if invite_code.is_empty() || name.is_empty() {
            return None;
        }
        Some(SharedLedgerRef { invite_code, name })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledgers {
    #[serde(default)]
    pub personal: Vec<String>,
    /// Kept raw so one malformed entry cannot poison the whole list.
    #[serde(default)]
    pub shared: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    pub created_at: String,
    pub access: i64,
    #[serde(default)]
    pub ledgers: Ledgers,
}
