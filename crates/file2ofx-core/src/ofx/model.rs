//! Institution settings and the assembled OFX document.

use std::{fmt, str::FromStr};

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::OfxVersion;

/// Currency used when none is configured.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Bank account type (`ACCTTYPE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AccountType {
    /// Checking account.
    #[default]
    #[serde(rename = "CHECKING", alias = "checking")]
    Checking,
    /// Savings account.
    #[serde(rename = "SAVINGS", alias = "savings")]
    Savings,
    /// Money market account.
    #[serde(rename = "MONEYMRKT", alias = "moneymrkt")]
    MoneyMarket,
    /// Line of credit.
    #[serde(rename = "CREDITLINE", alias = "creditline")]
    CreditLine,
}

impl AccountType {
    /// OFX code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Checking => "CHECKING",
            Self::Savings => "SAVINGS",
            Self::MoneyMarket => "MONEYMRKT",
            Self::CreditLine => "CREDITLINE",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CHECKING" => Ok(Self::Checking),
            "SAVINGS" => Ok(Self::Savings),
            "MONEYMRKT" | "MONEYMARKET" => Ok(Self::MoneyMarket),
            "CREDITLINE" => Ok(Self::CreditLine),
            _ => Err(format!(
                "unknown account type '{s}' (expected checking, savings, moneymrkt or creditline)"
            )),
        }
    }
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// Financial institution and account the statement belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionConfig {
    /// Institution name (`ORG`).
    #[serde(default)]
    pub org: Option<String>,
    /// Institution id (`FID`, also used as `BANKID`).
    #[serde(default)]
    pub fi_id: String,
    /// Account number (`ACCTID`).
    #[serde(default)]
    pub account_id: String,
    /// Account type.
    #[serde(default)]
    pub account_type: AccountType,
    /// ISO 4217 currency code.
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for InstitutionConfig {
    fn default() -> Self {
        Self {
            org: None,
            fi_id: String::new(),
            account_id: String::new(),
            account_type: AccountType::default(),
            currency: default_currency(),
        }
    }
}

impl InstitutionConfig {
    /// Config for an institution and account, other fields defaulted.
    pub fn new(fi_id: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self { fi_id: fi_id.into(), account_id: account_id.into(), ..Self::default() }
    }

    /// Sets the institution name.
    #[must_use]
    pub fn with_org(mut self, org: impl Into<String>) -> Self {
        self.org = Some(org.into());
        self
    }

    /// Sets the account type.
    #[must_use]
    pub fn with_account_type(mut self, account_type: AccountType) -> Self {
        self.account_type = account_type;
        self
    }

    /// Sets the currency.
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }
}

/// A balance figure with an optional as-of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balance {
    /// Balance amount.
    pub amount: Decimal,
    /// As-of time; generation time when absent.
    pub as_of: Option<NaiveDateTime>,
}

impl Balance {
    /// Balance as of generation time.
    #[must_use]
    pub fn new(amount: Decimal) -> Self {
        Self { amount, as_of: None }
    }
}

/// Optional closing balances. Absent balances are left out of the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalanceInfo {
    /// Ledger balance (`LEDGERBAL`).
    pub ledger: Option<Balance>,
    /// Available balance (`AVAILBAL`).
    pub available: Option<Balance>,
}

impl BalanceInfo {
    /// Whether neither balance is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ledger.is_none() && self.available.is_none()
    }
}

// ==================== Assembled document ====================
//
// Every value below is already in wire form: timestamps as YYYYMMDDHHMMSS,
// amounts with their final precision and sign.

/// Header block shared by both syntax families.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHeader {
    /// Target revision.
    pub version: OfxVersion,
    /// Always `NONE`.
    pub security: &'static str,
    /// Always `UTF-8`.
    pub encoding: &'static str,
    /// Legacy charset, `CSUNICODE`.
    pub charset: &'static str,
}

/// Sign-on response (`SONRS`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignOn {
    /// `DTSERVER`.
    pub server_time: String,
    /// `LANGUAGE`.
    pub language: &'static str,
    /// `DTPROFUP`.
    pub profile_updated: String,
    /// `DTACCTUP`.
    pub account_updated: String,
    /// `FI/ORG`.
    pub org: Option<String>,
    /// `FI/FID`.
    pub fi_id: String,
}

/// One `STMTTRN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementEntry {
    /// `TRNTYPE`.
    pub trntype: &'static str,
    /// `DTPOSTED`.
    pub posted: String,
    /// `DTUSER`; the source carries a single date, so it repeats `DTPOSTED`.
    pub user_date: String,
    /// `TRNAMT`.
    pub amount: String,
    /// `FITID`.
    pub fitid: String,
    /// `NAME`, absent for an empty description.
    pub name: Option<String>,
    /// `MEMO`, only for descriptions longer than `NAME` allows.
    pub memo: Option<String>,
}

/// `LEDGERBAL` / `AVAILBAL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceEntry {
    /// `BALAMT`.
    pub amount: String,
    /// `DTASOF`.
    pub as_of: String,
}

/// Statement response (`STMTTRNRS` / `STMTRS`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// `TRNUID`.
    pub trnuid: String,
    /// `CURDEF`.
    pub currency: String,
    /// `BANKID`.
    pub bank_id: String,
    /// `ACCTID`.
    pub account_id: String,
    /// `ACCTTYPE`.
    pub account_type: AccountType,
    /// `DTSTART`.
    pub start: String,
    /// `DTEND`.
    pub end: String,
    /// Transactions in input order.
    pub entries: Vec<StatementEntry>,
    /// Ledger balance.
    pub ledger: Option<BalanceEntry>,
    /// Available balance.
    pub available: Option<BalanceEntry>,
}

/// A complete document, ready to serialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDocument {
    /// Header metadata.
    pub header: DocumentHeader,
    /// Sign-on section.
    pub signon: SignOn,
    /// Bank statement.
    pub statement: Statement,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_type_parsing() {
        assert_eq!("savings".parse::<AccountType>().unwrap(), AccountType::Savings);
        assert_eq!("MoneyMarket".parse::<AccountType>().unwrap(), AccountType::MoneyMarket);
        assert_eq!(AccountType::MoneyMarket.as_str(), "MONEYMRKT");
        assert!("brokerage".parse::<AccountType>().is_err());
    }

    #[test]
    fn test_institution_defaults() {
        let config = InstitutionConfig::new("123", "456").with_org("Test Bank");
        assert_eq!(config.currency, "USD");
        assert_eq!(config.account_type, AccountType::Checking);
        assert_eq!(config.org.as_deref(), Some("Test Bank"));
    }

    #[test]
    fn test_balance_info_empty() {
        assert!(BalanceInfo::default().is_empty());
        let info = BalanceInfo { ledger: Some(Balance::new(Decimal::ONE)), available: None };
        assert!(!info.is_empty());
    }
}
