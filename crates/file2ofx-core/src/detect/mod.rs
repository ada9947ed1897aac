//! Column auto-detection.
//!
//! Detection runs in two stages:
//!
//! 1. [`profile`] scores every column for every [`Role`] using the signals in
//!    the [`matchers::STRATEGIES`] table (header label and sampled content).
//! 2. [`assign`] turns the profiles into a [`RoleAssignment`], giving each
//!    role at most one column and each column at most one role.
//!
//! Explicit mappings (a `.cols` companion file, column names or indices
//! supplied by the caller) skip both stages.

use std::fmt;

use serde::Serialize;

pub mod assign;
pub mod matchers;
pub mod profile;

pub use assign::{RoleAssignment, assign_roles};
pub use profile::{ColumnProfile, ProfileWeights, locate_header, profile_columns};

/// Semantic meaning of an input column.
///
/// Declaration order is assignment priority. `Debit` and `Credit` come
/// before `Amount` so a split pair is claimed before a stray numeric column
/// can take the amount slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Posting date (mandatory).
    Date,
    /// Outflow magnitude of a split debit/credit pair.
    Debit,
    /// Inflow magnitude of a split debit/credit pair.
    Credit,
    /// Signed amount (mandatory unless a debit or credit column is present).
    Amount,
    /// Free-text description.
    Description,
    /// Explicit credit/debit type.
    Type,
}

impl Role {
    /// Number of roles.
    pub const COUNT: usize = 6;

    /// All roles in assignment priority order.
    pub const ALL: [Role; Self::COUNT] =
        [Role::Date, Role::Debit, Role::Credit, Role::Amount, Role::Description, Role::Type];

    /// Lowercase role name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Debit => "debit",
            Self::Credit => "credit",
            Self::Amount => "amount",
            Self::Description => "description",
            Self::Type => "type",
        }
    }

    /// Position of the role in [`Role::ALL`].
    #[must_use]
    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// Whether a conversion fails without this role.
    ///
    /// A debit or credit column stands in for [`Role::Amount`].
    #[must_use]
    pub const fn is_mandatory(&self) -> bool {
        matches!(self, Self::Date | Self::Amount)
    }

    /// Whether the role is one half of a split debit/credit pair.
    ///
    /// These roles are only ever taken from a header label; their values
    /// look like any other amount.
    #[must_use]
    pub const fn is_split_amount(&self) -> bool {
        matches!(self, Self::Debit | Self::Credit)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
