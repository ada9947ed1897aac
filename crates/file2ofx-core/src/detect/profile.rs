//! Column profiling: header location and per-role scoring.

use tracing::debug;

use super::{
    Role,
    matchers::{ColumnInput, STRATEGIES, Signal, label_score, looks_like_amount, looks_like_date},
};

/// Header search window, in records from the top of the sample.
pub const HEADER_SEARCH_ROWS: usize = 10;

/// Non-empty values per column fed to the content matchers.
pub const MAX_PROFILE_VALUES: usize = 100;

/// Tunable weights for combining signals and accepting assignments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileWeights {
    /// Share of the label signal when the label points at a single role.
    /// Ambiguous labels get half of it.
    pub label_weight: f64,
    /// Multiplier on the content score of a column whose header label names
    /// no role. Keeps such a column (a running balance, say) below any
    /// labelled competitor while still letting it fill an otherwise empty
    /// role. Headerless input is scored on content alone.
    pub unmatched_label_factor: f64,
    /// Minimum combined score for a role to be assigned.
    pub acceptance_threshold: f64,
    /// Assigned roles below this score produce a low-confidence diagnostic.
    pub confidence_threshold: f64,
}

impl Default for ProfileWeights {
    fn default() -> Self {
        Self {
            label_weight: 0.75,
            unmatched_label_factor: 0.625,
            acceptance_threshold: 0.5,
            confidence_threshold: 0.75,
        }
    }
}

/// Scores of one input column for every role.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnProfile {
    pub(crate) index: usize,
    pub(crate) label: Option<String>,
    pub(crate) samples: Vec<String>,
    pub(crate) scores: [f64; Role::COUNT],
}

impl ColumnProfile {
    /// Zero-based column index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Header label, when the input has one.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Sampled non-empty values, in input order.
    #[must_use]
    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    /// Combined score for `role`.
    #[must_use]
    pub fn score(&self, role: Role) -> f64 {
        self.scores[role.index()]
    }
}

/// Finds the header row among the first [`HEADER_SEARCH_ROWS`] records.
///
/// The header is the first record where some cell names a mandatory role
/// (or one side of a debit/credit pair) and no cell parses as a date or an
/// amount. Anything above it is preamble.
#[must_use]
pub fn locate_header(records: &[Vec<String>]) -> Option<usize> {
    records.iter().take(HEADER_SEARCH_ROWS).position(|record| {
        let names_mandatory = record.iter().any(|cell| {
            Role::ALL
                .iter()
                .filter(|r| r.is_mandatory() || r.is_split_amount())
                .any(|r| label_score(cell, *r) > 0.0)
        });
        let has_values = record.iter().any(|cell| looks_like_date(cell) || looks_like_amount(cell));
        names_mandatory && !has_values
    })
}

/// Profiles every column seen in `labels` or `rows`.
///
/// `rows` are data records only (header and preamble already removed).
/// With `labels` present, a column whose label names no role (or is blank)
/// is scored at [`ProfileWeights::unmatched_label_factor`] of its content.
#[must_use]
pub fn profile_columns(
    labels: Option<&[String]>,
    rows: &[Vec<String>],
    weights: &ProfileWeights,
) -> Vec<ColumnProfile> {
    let width = rows
        .iter()
        .map(Vec::len)
        .chain(labels.map(<[String]>::len))
        .max()
        .unwrap_or(0);

    (0..width)
        .map(|index| {
            let label = labels
                .and_then(|l| l.get(index))
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty());
            let samples: Vec<String> = rows
                .iter()
                .filter_map(|row| row.get(index))
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .take(MAX_PROFILE_VALUES)
                .map(str::to_string)
                .collect();

            let scores = combine(labels.is_some(), label.as_deref(), &samples, weights);
            debug!(column = index, label = ?label, ?scores, "profiled column");
            ColumnProfile { index, label, samples, scores }
        })
        .collect()
}

fn combine(
    has_header: bool,
    label: Option<&str>,
    samples: &[String],
    weights: &ProfileWeights,
) -> [f64; Role::COUNT] {
    let input = ColumnInput { label, values: samples };
    let mut label_raw = [0.0_f64; Role::COUNT];
    let mut content_raw = [0.0_f64; Role::COUNT];
    for strategy in STRATEGIES {
        let slot = match strategy.signal {
            Signal::Label => &mut label_raw[strategy.role.index()],
            Signal::Content => &mut content_raw[strategy.role.index()],
        };
        *slot = slot.max(strategy.score(&input));
    }

    let mut combined = [0.0; Role::COUNT];
    let top = label_raw.iter().copied().fold(0.0, f64::max);

    if top == 0.0 {
        let factor = if has_header { weights.unmatched_label_factor } else { 1.0 };
        for role in Role::ALL.into_iter().filter(|r| !r.is_split_amount()) {
            combined[role.index()] = factor * content_raw[role.index()];
        }
        return combined;
    }

    let sharing_top = label_raw.iter().filter(|s| **s == top).count();
    let w = if sharing_top > 1 { weights.label_weight / 2.0 } else { weights.label_weight };
    for role in Role::ALL {
        let i = role.index();
        // a split role needs the label to point at it, not merely mention it
        if role.is_split_amount() && label_raw[i] < top {
            continue;
        }
        combined[i] = w * label_raw[i] + (1.0 - w) * content_raw[i];
    }
    combined
}
