//! Role assignment: one column per role, one role per column.

use tracing::debug;

use super::{ColumnProfile, ProfileWeights, Role, matchers::best_label_role};
use crate::{
    diagnostics::Diagnostic,
    error::{ConvertError, ConvertResult},
};

/// Score recorded for roles taken from an explicit mapping.
pub const EXPLICIT_SCORE: f64 = 1.0;

/// A column chosen for a role, with the score that won it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slot {
    /// Zero-based column index.
    pub column: usize,
    /// Winning score.
    pub score: f64,
}

/// Mapping from role to column.
///
/// A column index is held by at most one role; [`RoleAssignment::assign`]
/// refuses to break that.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleAssignment {
    slots: [Option<Slot>; Role::COUNT],
}

impl RoleAssignment {
    /// Empty assignment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an assignment from column names, in column order.
    ///
    /// Each name maps to its best label role; the first column to claim a
    /// role keeps it. Names that match nothing are ignored.
    ///
    /// ```
    /// use file2ofx_core::detect::{RoleAssignment, Role};
    ///
    /// let names = ["Date", "Amount"];
    /// let assignment = RoleAssignment::from_names(&names);
    /// assert_eq!(assignment.column(Role::Date), Some(0));
    /// assert_eq!(assignment.column(Role::Amount), Some(1));
    /// assert_eq!(assignment.column(Role::Description), None);
    /// ```
    #[must_use]
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut assignment = Self::new();
        for (column, name) in names.iter().enumerate() {
            if let Some(role) = best_label_role(name.as_ref())
                && assignment.column(role).is_none()
            {
                assignment.assign(role, column, EXPLICIT_SCORE);
            }
        }
        assignment
    }

    /// Builds an assignment from explicit `(role, column)` pairs.
    ///
    /// # Errors
    ///
    /// [`ConvertError::UnresolvedFormat`] when two roles share a column.
    pub fn from_indices(pairs: impl IntoIterator<Item = (Role, usize)>) -> ConvertResult<Self> {
        let mut assignment = Self::new();
        for (role, column) in pairs {
            if let Some(owner) = assignment.owner(column)
                && owner != role
            {
                return Err(ConvertError::unresolved(format!(
                    "column {column} is mapped to both {owner} and {role}"
                )));
            }
            assignment.assign(role, column, EXPLICIT_SCORE);
        }
        Ok(assignment)
    }

    /// Gives `column` to `role`, replacing the role's previous column.
    ///
    /// Returns `false` (and changes nothing) if another role holds `column`.
    pub fn assign(&mut self, role: Role, column: usize, score: f64) -> bool {
        if self.owner(column).is_some_and(|owner| owner != role) {
            return false;
        }
        self.slots[role.index()] = Some(Slot { column, score });
        true
    }

    /// Column assigned to `role`.
    #[must_use]
    pub fn column(&self, role: Role) -> Option<usize> {
        self.slot(role).map(|s| s.column)
    }

    /// Column and score assigned to `role`.
    #[must_use]
    pub fn slot(&self, role: Role) -> Option<Slot> {
        self.slots[role.index()]
    }

    /// Role holding `column`, if any.
    #[must_use]
    pub fn owner(&self, column: usize) -> Option<Role> {
        Role::ALL.into_iter().find(|role| self.column(*role) == Some(column))
    }

    /// Assigned roles in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (Role, Slot)> + '_ {
        Role::ALL.into_iter().filter_map(|role| self.slot(role).map(|slot| (role, slot)))
    }

    /// Whether a debit or a credit column carries the amount.
    #[must_use]
    pub fn has_split_amount(&self) -> bool {
        self.slot(Role::Debit).is_some() || self.slot(Role::Credit).is_some()
    }

    /// Roles with no column.
    #[must_use]
    pub fn unresolved(&self) -> Vec<Role> {
        Role::ALL.into_iter().filter(|role| self.slot(*role).is_none()).collect()
    }

    /// Fails unless every mandatory role is assigned.
    ///
    /// # Errors
    ///
    /// [`ConvertError::ColumnDetectionFailed`] listing each missing mandatory
    /// role. A debit or credit column satisfies [`Role::Amount`].
    pub fn require_mandatory(self) -> ConvertResult<Self> {
        let split = self.has_split_amount();
        let missing: Vec<Role> = self
            .unresolved()
            .into_iter()
            .filter(Role::is_mandatory)
            .filter(|role| !(split && *role == Role::Amount))
            .collect();
        if missing.is_empty() {
            Ok(self)
        } else {
            Err(ConvertError::ColumnDetectionFailed { missing })
        }
    }

    /// Low-confidence diagnostics for assigned roles scoring under `threshold`.
    #[must_use]
    pub fn low_confidence(&self, threshold: f64) -> Vec<Diagnostic> {
        self.iter()
            .filter(|(_, slot)| slot.score < threshold)
            .map(|(role, slot)| Diagnostic::LowConfidence {
                role,
                column: slot.column,
                score: slot.score,
            })
            .collect()
    }
}

/// Greedy assignment in role priority order.
///
/// For each role the free column with the highest score wins; ties go to
/// the lowest column index. Scores under the acceptance threshold leave the
/// role unresolved. Once a debit or credit column is assigned the amount
/// role is not looked for.
#[must_use]
pub fn assign_roles(profiles: &[ColumnProfile], weights: &ProfileWeights) -> RoleAssignment {
    let mut assignment = RoleAssignment::new();

    for role in Role::ALL {
        if role == Role::Amount && assignment.has_split_amount() {
            debug!("amount comes from debit/credit columns");
            continue;
        }
        let mut best: Option<(usize, f64)> = None;
        for profile in profiles {
            if assignment.owner(profile.index()).is_some() {
                continue;
            }
            let score = profile.score(role);
            if score < weights.acceptance_threshold {
                continue;
            }
            let better = match best {
                None => true,
                Some((column, s)) => score > s || (score == s && profile.index() < column),
            };
            if better {
                best = Some((profile.index(), score));
            }
        }

        match best {
            Some((column, score)) => {
                debug!(%role, column, score, "assigned role");
                assignment.assign(role, column, score);
            }
            None => debug!(%role, "role unresolved"),
        }
    }

    assignment
}
