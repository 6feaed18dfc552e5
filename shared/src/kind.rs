//! Transaction kinds supported by the simulator

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::SharedError;

/// Category of financial operation sent to the simulator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    BalanceInquiry,
    CashAdvance,
    Purchase,
    Transfer,
    Authorization,
    Deposit,
    Cashback,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 7] = [
        TransactionKind::BalanceInquiry,
        TransactionKind::CashAdvance,
        TransactionKind::Purchase,
        TransactionKind::Transfer,
        TransactionKind::Authorization,
        TransactionKind::Deposit,
        TransactionKind::Cashback,
    ];

    /// Code used by the simulator and in coverage tallies
    pub fn code(&self) -> &'static str {
        match self {
            TransactionKind::BalanceInquiry => "BALANCE_INQUIRY",
            TransactionKind::CashAdvance => "CASH_ADVANCE",
            TransactionKind::Purchase => "PURCHASE",
            TransactionKind::Transfer => "TRANSFER",
            TransactionKind::Authorization => "AUTHORIZATION",
            TransactionKind::Deposit => "DEPOSIT",
            TransactionKind::Cashback => "CASHBACK",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TransactionKind::BalanceInquiry => "Balance inquiry",
            TransactionKind::CashAdvance => "Cash advance",
            TransactionKind::Purchase => "Purchase",
            TransactionKind::Transfer => "Transfer",
            TransactionKind::Authorization => "Authorization",
            TransactionKind::Deposit => "Deposit",
            TransactionKind::Cashback => "Purchase with cashback",
        }
    }

    /// ISO 8583 processing code (field 3) used when a scenario does not set one
    pub fn default_processing_code(&self) -> &'static str {
        match self {
            TransactionKind::BalanceInquiry => "300000",
            TransactionKind::CashAdvance => "010000",
            TransactionKind::Purchase => "000000",
            TransactionKind::Transfer => "400000",
            TransactionKind::Authorization => "000000",
            TransactionKind::Deposit => "210000",
            TransactionKind::Cashback => "090000",
        }
    }

    /// Message type indicator the simulator answers for this kind
    pub fn default_mti(&self) -> &'static str {
        match self {
            TransactionKind::Authorization => "0100",
            _ => "0200",
        }
    }

    /// Parse a kind from its code, ignoring case
    pub fn from_code(code: &str) -> Result<Self, SharedError> {
        let trimmed = code.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.code().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| SharedError::UnsupportedKind { code: code.to_string() })
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for TransactionKind {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}
