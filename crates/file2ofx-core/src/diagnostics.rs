//! Non-fatal findings collected during a conversion.

use std::fmt;

use serde::Serialize;

use crate::detect::Role;

/// A data row that was dropped because a required field did not parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowSkipped {
    /// 1-based line number in the source file.
    pub line: u64,
    /// Why the row was rejected.
    pub reason: String,
}

impl fmt::Display for RowSkipped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

/// Warning emitted by a successful conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A row was skipped.
    RowSkipped(RowSkipped),
    /// A role was assigned with a weak score.
    LowConfidence {
        /// Role that was assigned.
        role: Role,
        /// Column index chosen.
        column: usize,
        /// Winning score.
        score: f64,
    },
    /// Input was not valid UTF-8 and was decoded with a fallback encoding.
    EncodingFallback {
        /// Name of the encoding used.
        encoding: &'static str,
    },
    /// No header row was found; roles were inferred from content only.
    HeaderlessInput,
}

impl Diagnostic {
    /// Returns `true` for skipped-row diagnostics.
    #[must_use]
    pub fn is_row_skipped(&self) -> bool {
        matches!(self, Self::RowSkipped(_))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RowSkipped(row) => write!(f, "skipped {row}"),
            Self::LowConfidence { role, column, score } => {
                write!(f, "low confidence ({score:.2}) assigning column {column} as {role}")
            }
            Self::EncodingFallback { encoding } => {
                write!(f, "input is not valid UTF-8, decoded as {encoding}")
            }
            Self::HeaderlessInput => write!(f, "no header row found, columns detected from content"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_row_skipped() {
        let diag = Diagnostic::RowSkipped(RowSkipped { line: 7, reason: "invalid amount 'x'".into() });
        assert_eq!(diag.to_string(), "skipped line 7: invalid amount 'x'");
        assert!(diag.is_row_skipped());
    }

    #[test]
    fn test_display_low_confidence() {
        let diag = Diagnostic::LowConfidence { role: Role::Description, column: 2, score: 0.5 };
        assert_eq!(diag.to_string(), "low confidence (0.50) assigning column 2 as description");
        assert!(!diag.is_row_skipped());
    }
}
