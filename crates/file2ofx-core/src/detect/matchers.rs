//! Signal matchers and the strategy table that drives column profiling.
//!
//! Each [`Strategy`] scores one role from one signal. Adding a signal means
//! adding a row to [`STRATEGIES`]; the profiler never special-cases roles.

use std::collections::HashSet;

use super::Role;
use crate::{
    fields::{parse_amount, parse_date},
    transaction::TransactionType,
};

/// Score for a label that equals a vocabulary phrase.
pub const EXACT_LABEL_SCORE: f64 = 1.0;
/// Score for a label that contains a vocabulary phrase as whole words.
pub const CONTAINED_LABEL_SCORE: f64 = 0.8;

/// At most this many distinct values for a column to read as a type column.
pub const MAX_TYPE_DISTINCT: usize = 12;

const DATE_LABELS: &[&str] = &[
    "date",
    "trans date",
    "transaction date",
    "posted",
    "post date",
    "posting date",
    "posted date",
    "value date",
    "booking date",
    "timestamp",
];

const AMOUNT_LABELS: &[&str] =
    &["amount", "amt", "transaction amount", "value", "sum", "total", "debit credit"];

const DEBIT_LABELS: &[&str] = &[
    "debit",
    "debits",
    "debit amount",
    "withdrawal",
    "withdrawals",
    "money out",
    "paid out",
    "outflow",
];

const CREDIT_LABELS: &[&str] = &[
    "credit",
    "credits",
    "credit amount",
    "deposit",
    "deposits",
    "money in",
    "paid in",
    "inflow",
];

const DESCRIPTION_LABELS: &[&str] = &[
    "description",
    "memo",
    "narrative",
    "details",
    "payee",
    "merchant",
    "note",
    "reference",
    "name",
];

const TYPE_LABELS: &[&str] =
    &["type", "txn type", "trans type", "transaction type", "dr cr", "classification"];

/// Which part of a column a strategy looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The header label.
    Label,
    /// The sampled values.
    Content,
}

/// What a matcher sees of a column.
#[derive(Debug, Clone, Copy)]
pub struct ColumnInput<'a> {
    /// Header label, if the input has a header row.
    pub label: Option<&'a str>,
    /// Non-empty sampled values.
    pub values: &'a [String],
}

/// One row of the strategy table.
#[derive(Clone, Copy)]
pub struct Strategy {
    /// Role being scored.
    pub role: Role,
    /// Signal the matcher reads.
    pub signal: Signal,
    /// Returns a raw score in `[0.0, 1.0]`.
    pub matcher: fn(&ColumnInput<'_>) -> f64,
    /// Raw scores below this floor count as zero.
    pub floor: f64,
}

impl Strategy {
    /// Applies the matcher and the floor.
    #[must_use]
    pub fn score(&self, input: &ColumnInput<'_>) -> f64 {
        let raw = (self.matcher)(input);
        if raw < self.floor { 0.0 } else { raw.clamp(0.0, 1.0) }
    }
}

/// Every signal, in evaluation order.
pub const STRATEGIES: &[Strategy] = &[
    Strategy { role: Role::Date, signal: Signal::Label, matcher: date_label, floor: 0.0 },
    Strategy { role: Role::Debit, signal: Signal::Label, matcher: debit_label, floor: 0.0 },
    Strategy { role: Role::Credit, signal: Signal::Label, matcher: credit_label, floor: 0.0 },
    Strategy { role: Role::Amount, signal: Signal::Label, matcher: amount_label, floor: 0.0 },
    Strategy {
        role: Role::Description,
        signal: Signal::Label,
        matcher: description_label,
        floor: 0.0,
    },
    Strategy { role: Role::Type, signal: Signal::Label, matcher: type_label, floor: 0.0 },
    Strategy { role: Role::Date, signal: Signal::Content, matcher: date_content, floor: 0.7 },
    Strategy { role: Role::Debit, signal: Signal::Content, matcher: amount_content, floor: 0.6 },
    Strategy { role: Role::Credit, signal: Signal::Content, matcher: amount_content, floor: 0.6 },
    Strategy { role: Role::Amount, signal: Signal::Content, matcher: amount_content, floor: 0.6 },
    Strategy { role: Role::Type, signal: Signal::Content, matcher: type_content, floor: 0.5 },
    Strategy {
        role: Role::Description,
        signal: Signal::Content,
        matcher: description_content,
        floor: 0.5,
    },
];

// ==================== Labels ====================

/// Lowercases and turns every run of non-alphanumeric characters into a
/// single space.
#[must_use]
pub fn normalize_label(label: &str) -> String {
    label
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn vocabulary(role: Role) -> &'static [&'static str] {
    match role {
        Role::Date => DATE_LABELS,
        Role::Debit => DEBIT_LABELS,
        Role::Credit => CREDIT_LABELS,
        Role::Amount => AMOUNT_LABELS,
        Role::Description => DESCRIPTION_LABELS,
        Role::Type => TYPE_LABELS,
    }
}

/// Scores a raw label against one role's vocabulary.
#[must_use]
pub fn label_score(label: &str, role: Role) -> f64 {
    let normalized = normalize_label(label);
    if normalized.is_empty() {
        return 0.0;
    }
    let words: Vec<&str> = normalized.split(' ').collect();

    vocabulary(role).iter().fold(0.0, |best: f64, phrase| {
        let score = if normalized == *phrase {
            EXACT_LABEL_SCORE
        } else if contains_words(&words, phrase) {
            CONTAINED_LABEL_SCORE
        } else {
            0.0
        };
        best.max(score)
    })
}

/// Label scores for every role, indexed like [`Role::ALL`].
#[must_use]
pub fn label_scores(label: &str) -> [f64; Role::COUNT] {
    Role::ALL.map(|role| label_score(label, role))
}

/// Best role for a column name; ties go to the higher-priority role.
#[must_use]
pub fn best_label_role(label: &str) -> Option<Role> {
    let scores = label_scores(label);
    let mut best: Option<(Role, f64)> = None;
    for role in Role::ALL {
        let score = scores[role.index()];
        if score > 0.0 && best.is_none_or(|(_, s)| score > s) {
            best = Some((role, score));
        }
    }
    best.map(|(role, _)| role)
}

fn contains_words(words: &[&str], phrase: &str) -> bool {
    let needle: Vec<&str> = phrase.split(' ').collect();
    words.windows(needle.len()).any(|window| window == needle.as_slice())
}

fn date_label(input: &ColumnInput<'_>) -> f64 {
    input.label.map_or(0.0, |l| label_score(l, Role::Date))
}

fn debit_label(input: &ColumnInput<'_>) -> f64 {
    input.label.map_or(0.0, |l| label_score(l, Role::Debit))
}

fn credit_label(input: &ColumnInput<'_>) -> f64 {
    input.label.map_or(0.0, |l| label_score(l, Role::Credit))
}

fn amount_label(input: &ColumnInput<'_>) -> f64 {
    input.label.map_or(0.0, |l| label_score(l, Role::Amount))
}

fn description_label(input: &ColumnInput<'_>) -> f64 {
    input.label.map_or(0.0, |l| label_score(l, Role::Description))
}

fn type_label(input: &ColumnInput<'_>) -> f64 {
    input.label.map_or(0.0, |l| label_score(l, Role::Type))
}

// ==================== Content ====================

/// Whether a cell parses as a date.
#[must_use]
pub fn looks_like_date(value: &str) -> bool {
    parse_date(value).is_ok()
}

/// Whether a cell parses as an amount.
#[must_use]
pub fn looks_like_amount(value: &str) -> bool {
    parse_amount(value).is_ok()
}

/// Whether a cell is a known type word.
#[must_use]
pub fn is_type_word(value: &str) -> bool {
    TransactionType::hint(value).is_some()
}

fn ratio(values: &[String], predicate: impl Fn(&str) -> bool) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let hits = values.iter().filter(|v| predicate(v.as_str())).count();
    hits as f64 / values.len() as f64
}

fn date_content(input: &ColumnInput<'_>) -> f64 {
    ratio(input.values, looks_like_date)
}

fn amount_content(input: &ColumnInput<'_>) -> f64 {
    ratio(input.values, looks_like_amount)
}

fn type_content(input: &ColumnInput<'_>) -> f64 {
    let distinct: HashSet<String> = input.values.iter().map(|v| v.trim().to_lowercase()).collect();
    if distinct.len() > MAX_TYPE_DISTINCT {
        return 0.0;
    }
    ratio(input.values, is_type_word)
}

fn description_content(input: &ColumnInput<'_>) -> f64 {
    if input.values.is_empty() {
        return 0.0;
    }
    let textual = ratio(input.values, |v| {
        v.chars().any(char::is_alphabetic)
            && !looks_like_date(v)
            && !looks_like_amount(v)
            && !is_type_word(v)
    });
    let tokens: usize = input.values.iter().map(|v| v.split_whitespace().count()).sum();
    let avg_tokens = tokens as f64 / input.values.len() as f64;
    textual * (avg_tokens / 2.0).min(1.0)
}
