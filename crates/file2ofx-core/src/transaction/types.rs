//! Normalized transaction record and its type.

use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a transaction.
///
/// Comes from an explicit type column when its value is a known type word,
/// otherwise from the sign of the amount:
/// - [`Credit`][TransactionType::Credit]: money in (positive amount)
/// - [`Debit`][TransactionType::Debit]: money out (negative amount)
/// - [`Unknown`][TransactionType::Unknown]: zero amount without a type word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    /// Incoming funds.
    #[serde(rename = "CREDIT")]
    Credit,
    /// Outgoing funds.
    #[serde(rename = "DEBIT")]
    Debit,
    /// Direction could not be determined.
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

/// What a type word says about direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeHint {
    /// Word implies a credit.
    Credit,
    /// Word implies a debit.
    Debit,
    /// Word is a known type but direction follows the amount sign.
    BySign,
}

/// Type words recognized in type columns, with their direction.
pub const TYPE_VOCABULARY: &[(&str, TypeHint)] = &[
    ("credit", TypeHint::Credit),
    ("cr", TypeHint::Credit),
    ("deposit", TypeHint::Credit),
    ("refund", TypeHint::Credit),
    ("interest", TypeHint::Credit),
    ("debit", TypeHint::Debit),
    ("dr", TypeHint::Debit),
    ("withdrawal", TypeHint::Debit),
    ("payment", TypeHint::Debit),
    ("purchase", TypeHint::Debit),
    ("fee", TypeHint::Debit),
    ("atm", TypeHint::Debit),
    ("pos", TypeHint::Debit),
    ("check", TypeHint::Debit),
    ("transfer", TypeHint::BySign),
    ("xfer", TypeHint::BySign),
    ("ach", TypeHint::BySign),
    ("wire", TypeHint::BySign),
];

impl TransactionType {
    /// Returns the canonical upper-case name.
    ///
    /// # Example
    /// ```
    /// use file2ofx_core::transaction::TransactionType;
    /// assert_eq!(TransactionType::Debit.as_str(), "DEBIT");
    /// ```
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "CREDIT",
            Self::Debit => "DEBIT",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// OFX `TRNTYPE` code. OFX has no "unknown", so it maps to `OTHER`.
    #[must_use]
    pub const fn ofx_code(&self) -> &'static str {
        match self {
            Self::Credit => "CREDIT",
            Self::Debit => "DEBIT",
            Self::Unknown => "OTHER",
        }
    }

    /// Looks a type word up in [`TYPE_VOCABULARY`] (case-insensitive).
    #[must_use]
    pub fn hint(word: &str) -> Option<TypeHint> {
        let word = word.trim().to_lowercase();
        TYPE_VOCABULARY.iter().find(|(w, _)| *w == word).map(|(_, hint)| *hint)
    }

    /// Direction implied by the sign of an amount.
    #[must_use]
    pub fn from_sign(amount: &Decimal) -> Self {
        if amount.is_zero() {
            Self::Unknown
        } else if amount.is_sign_negative() {
            Self::Debit
        } else {
            Self::Credit
        }
    }

    /// Resolves the type from an optional type word and the amount.
    #[must_use]
    pub fn resolve(word: Option<&str>, amount: &Decimal) -> Self {
        match word.and_then(Self::hint) {
            Some(TypeHint::Credit) => Self::Credit,
            Some(TypeHint::Debit) => Self::Debit,
            Some(TypeHint::BySign) | None => Self::from_sign(amount),
        }
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREDIT" => Ok(Self::Credit),
            "DEBIT" => Ok(Self::Debit),
            "UNKNOWN" => Ok(Self::Unknown),
            other => Err(format!("expected CREDIT, DEBIT or UNKNOWN, got '{other}'")),
        }
    }
}

/// One parsed data row.
///
/// Created by the row parser for each valid row and never modified
/// afterwards; records keep the order of the source file.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use file2ofx_core::transaction::{TransactionRecord, TransactionType};
/// use rust_decimal::Decimal;
///
/// let record = TransactionRecord {
///     line: 2,
///     posted: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(0, 0, 0).unwrap(),
///     amount: Decimal::new(-450, 2),
///     description: "Coffee Shop".to_string(),
///     kind: TransactionType::Debit,
/// };
/// assert_eq!(record.kind, TransactionType::from_sign(&record.amount));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// 1-based line the row started on.
    pub line: u64,
    /// Posting date; midnight unless the source carried a time.
    pub posted: NaiveDateTime,
    /// Signed amount with the source's precision.
    pub amount: Decimal,
    /// Free text, possibly empty.
    pub description: String,
    /// Credit / debit direction.
    pub kind: TransactionType,
}
