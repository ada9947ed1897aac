//! Builds an [`OutputDocument`] from parsed records.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use sha2::{Digest, Sha256};

use super::{
    OfxVersion,
    model::{
        Balance, BalanceEntry, BalanceInfo, DEFAULT_CURRENCY, DocumentHeader, InstitutionConfig,
        OutputDocument, SignOn, Statement, StatementEntry,
    },
};
use crate::{
    error::{ConvertError, ConvertResult},
    fields::format_amount,
    transaction::TransactionRecord,
};

/// OFX date-time format.
pub const OFX_DATETIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Characters of the description carried in `NAME`.
pub const NAME_MAX_CHARS: usize = 32;

/// Characters of the description carried in `MEMO`.
pub const MEMO_MAX_CHARS: usize = 255;

/// Formats a timestamp as `YYYYMMDDHHMMSS`.
#[must_use]
pub fn format_ofx_datetime(dt: &NaiveDateTime) -> String {
    dt.format(OFX_DATETIME_FORMAT).to_string()
}

/// Assembles a document.
///
/// Pure: the same inputs always give the same document. `generated_at`
/// supplies `DTSERVER`, default balance times and the transaction-set id.
///
/// # Errors
///
/// [`ConvertError::MissingField`] when the institution id or the account id
/// is blank.
pub fn assemble(
    records: &[TransactionRecord],
    institution: &InstitutionConfig,
    balance: Option<&BalanceInfo>,
    version: OfxVersion,
    generated_at: NaiveDateTime,
) -> ConvertResult<OutputDocument> {
    let fi_id = required(&institution.fi_id, "fi_id")?;
    let account_id = required(&institution.account_id, "account_id")?;
    let generated = format_ofx_datetime(&generated_at);

    let start = records.iter().map(|r| r.posted).min().unwrap_or(generated_at);
    let end = records.iter().map(|r| r.posted).max().unwrap_or(generated_at);

    let mut occurrences: HashMap<(NaiveDateTime, String, &str), u32> = HashMap::new();
    let entries = records
        .iter()
        .map(|record| {
            let amount = format_amount(&record.amount);
            let seen = occurrences
                .entry((record.posted, amount.clone(), record.description.as_str()))
                .or_insert(0);
            let occurrence = *seen;
            *seen += 1;
            entry(record, amount, occurrence)
        })
        .collect();

    let balance_entry = |b: Option<Balance>| {
        b.map(|b| BalanceEntry {
            amount: format_amount(&b.amount),
            as_of: format_ofx_datetime(&b.as_of.unwrap_or(generated_at)),
        })
    };
    let balance = balance.copied().unwrap_or_default();

    let currency = institution.currency.trim().to_ascii_uppercase();
    let org = institution.org.as_deref().map(str::trim).filter(|o| !o.is_empty());

    Ok(OutputDocument {
        header: DocumentHeader {
            version,
            security: "NONE",
            encoding: "UTF-8",
            charset: "CSUNICODE",
        },
        signon: SignOn {
            server_time: generated.clone(),
            language: "ENG",
            profile_updated: generated.clone(),
            account_updated: generated.clone(),
            org: org.map(str::to_string),
            fi_id: fi_id.to_string(),
        },
        statement: Statement {
            trnuid: transaction_uid(fi_id, account_id, &generated),
            currency: if currency.is_empty() { DEFAULT_CURRENCY.to_string() } else { currency },
            bank_id: fi_id.to_string(),
            account_id: account_id.to_string(),
            account_type: institution.account_type,
            start: format_ofx_datetime(&start),
            end: format_ofx_datetime(&end),
            entries,
            ledger: balance_entry(balance.ledger),
            available: balance_entry(balance.available),
        },
    })
}

fn required<'a>(value: &'a str, field: &'static str) -> ConvertResult<&'a str> {
    let value = value.trim();
    if value.is_empty() { Err(ConvertError::MissingField { field }) } else { Ok(value) }
}

fn entry(record: &TransactionRecord, amount: String, occurrence: u32) -> StatementEntry {
    let posted = format_ofx_datetime(&record.posted);
    let fitid = fit_id(&posted, &amount, &record.description, occurrence);

    let chars = record.description.chars().count();
    let name = (chars > 0).then(|| record.description.chars().take(NAME_MAX_CHARS).collect());
    let memo = (chars > NAME_MAX_CHARS)
        .then(|| record.description.chars().take(MEMO_MAX_CHARS).collect());

    StatementEntry {
        trntype: record.kind.ofx_code(),
        user_date: posted.clone(),
        posted,
        amount,
        fitid,
        name,
        memo,
    }
}

/// `TRNUID`: first 16 bytes of SHA-256 over institution, account and time.
fn transaction_uid(fi_id: &str, account_id: &str, generated: &str) -> String {
    let digest = Sha256::digest(format!("{fi_id}|{account_id}|{generated}").as_bytes());
    hex::encode(&digest[..16])
}

/// `FITID`: first 8 bytes of SHA-256 over the row's identity, upper-case
/// hex. `occurrence` numbers otherwise identical rows.
fn fit_id(posted: &str, amount: &str, description: &str, occurrence: u32) -> String {
    let digest =
        Sha256::digest(format!("{posted}|{amount}|{description}|{occurrence}").as_bytes());
    hex::encode_upper(&digest[..8])
}
