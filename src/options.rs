// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Per-user category taxonomies: expense categories, asset classes and
//! the liabilities payment methods. Seeded once at registration,
//! read-mostly afterwards.

use crate::store;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

pub const OPTIONS_DOC_ID: &str = "options";
pub const RELATIONSHIP_DOC_ID: &str = "relationship";

/// Asset-type labels that predate the options document; old records
/// still carry them, so distributions keep seeding them.
pub const LEGACY_ASSET_TYPES: [&str; 6] = ["美債", "ETF", "股票", "定存", "活存", "虛擬貨幣"];

/// Asset types treated as market-traded positions in addition to the
/// user's configured fixed assets.
pub const TRADABLE_EXTRAS: [&str; 4] = ["股票", "ETF", "金融股", "美債"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsDoc {
    #[serde(rename = "transactionType")]
    pub transaction_type: TransactionOptions,
    #[serde(rename = "assetType")]
    pub asset_type: AssetTypeOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionOptions {
    pub transactions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetTypeOptions {
    pub assets: AssetClasses,
    pub liabilities: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetClasses {
    pub current_assets: Vec<String>,
    pub fixed_assets: Vec<String>,
}

impl Default for OptionsDoc {
    fn default() -> Self {
        let s = |xs: &[&str]| xs.iter().map(|x| x.to_string()).collect();
        OptionsDoc {
            transaction_type: TransactionOptions {
                transactions: s(&["食", "衣", "住", "行", "娛樂", "醫療", "教育", "保險", "3C"]),
            },
            asset_type: AssetTypeOptions {
                assets: AssetClasses {
                    current_assets: s(&["活期存款", "定期存款", "現金", "虛擬貨幣"]),
                    fixed_assets: s(&["債券", "金融股", "股票", "市值ETF", "高股息ETF"]),
                },
                liabilities: s(&["信用卡", "借貸"]),
            },
        }
    }
}

impl OptionsDoc {
    pub fn expense_categories(&self) -> &[String] {
        &self.transaction_type.transactions
    }

    pub fn fixed_assets(&self) -> &[String] {
        &self.asset_type.assets.fixed_assets
    }

    pub fn liabilities(&self) -> &[String] {
        &self.asset_type.liabilities
    }

    /// Every asset-type label the distributions are seeded with:
    /// current + fixed classes plus the legacy labels, deduplicated in
    /// first-seen order.
    pub fn known_asset_types(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let all = self
            .asset_type
            .assets
            .current_assets
            .iter()
            .chain(self.asset_type.assets.fixed_assets.iter())
            .map(String::as_str)
            .chain(LEGACY_ASSET_TYPES.iter().copied());
        for t in all {
            if !out.iter().any(|x| x == t) {
                out.push(t.to_string());
            }
        }
        out
    }

    /// Asset types priced from the market rather than set by hand.
    pub fn tradable_types(&self) -> Vec<String> {
        let mut out: Vec<String> = self.fixed_assets().to_vec();
        for t in TRADABLE_EXTRAS {
            if !out.iter().any(|x| x == t) {
                out.push(t.to_string());
            }
        }
        out
    }
}

/// Lenient load: absent or malformed options degrade to `None` so the
/// summary distributions can fall back to empty rather than failing.
pub fn load(conn: &Connection, uid: &str) -> Option<OptionsDoc> {
    let doc = match store::get(conn, &store::paths::options(uid), OPTIONS_DOC_ID) {
        Ok(Some(doc)) => doc,
        Ok(None) => return None,
        Err(e) => {
            eprintln!("warning: could not read options for '{}': {}", uid, e);
            return None;
        }
    };
    match serde_json::from_value(doc.data) {
        Ok(opts) => Some(opts),
        Err(e) => {
            eprintln!("warning: options document for '{}' is malformed: {}", uid, e);
            None
        }
    }
}
