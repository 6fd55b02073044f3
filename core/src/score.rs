//! Saturating placement score with an explicit "impossible" sentinel.

use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// Saturating integer score.
///
/// The lower bound doubles as the invalid sentinel: once a score has been
/// driven to it, every further arithmetic keeps it invalid. Comparisons treat
/// an invalid score as worse than any valid one in both directions, so the
/// type deliberately implements no `PartialOrd`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Score(i64);

impl Score {
    /// Smallest representable value, reserved for invalid scores.
    pub const LOWER_BOUND: i64 = -(1 << 24);
    /// Largest representable value.
    pub const UPPER_BOUND: i64 = 1 << 24;

    /// Score marking an impossible placement or path.
    pub const INVALID: Score = Score(Self::LOWER_BOUND);

    /// Score with value zero.
    pub const ZERO: Score = Score(0);

    /// Creates a score, clamping the value into range. Values at or below the
    /// lower bound become invalid.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        if value <= Self::LOWER_BOUND {
            Self::INVALID
        } else if value > Self::UPPER_BOUND {
            Self(Self::UPPER_BOUND)
        } else {
            Self(value)
        }
    }

    /// Reports whether the score still denotes a feasible option.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.0 != Self::LOWER_BOUND
    }

    /// Raw value including the sentinel.
    #[must_use]
    pub const fn get(&self) -> i64 {
        self.0
    }

    /// Value of a valid score.
    #[must_use]
    pub const fn value(&self) -> Option<i64> {
        if self.is_valid() {
            Some(self.0)
        } else {
            None
        }
    }

    /// Strict "less than" where an invalid left side is never less and an
    /// invalid right side is always greater.
    #[must_use]
    pub const fn less_than(&self, other: &Score) -> bool {
        if !self.is_valid() {
            return false;
        }
        if !other.is_valid() {
            return true;
        }
        self.0 < other.0
    }

    /// Strict "greater than" where an invalid left side is never greater and
    /// an invalid right side is always smaller.
    #[must_use]
    pub const fn greater_than(&self, other: &Score) -> bool {
        if !self.is_valid() {
            return false;
        }
        if !other.is_valid() {
            return true;
        }
        self.0 > other.0
    }

    /// Replaces a valid zero by one. Zero is used by callers as "not yet
    /// computed" and must not leak out of a finished computation.
    #[must_use]
    pub const fn nonzero(self) -> Self {
        if self.0 == 0 {
            Self(1)
        } else {
            self
        }
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<i64> for Score {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl AddAssign for Score {
    fn add_assign(&mut self, rhs: Score) {
        *self = *self + rhs;
    }
}

impl AddAssign<i64> for Score {
    fn add_assign(&mut self, rhs: i64) {
        *self = *self + Score::new(rhs);
    }
}

impl SubAssign for Score {
    fn sub_assign(&mut self, rhs: Score) {
        *self = *self - rhs;
    }
}

impl SubAssign<i64> for Score {
    fn sub_assign(&mut self, rhs: i64) {
        *self -= Score::new(rhs);
    }
}

impl Add for Score {
    type Output = Score;

    fn add(self, rhs: Score) -> Score {
        if !self.is_valid() || !rhs.is_valid() {
            return Score::INVALID;
        }
        Score::new(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Score {
    type Output = Score;

    fn sub(self, rhs: Score) -> Score {
        if !self.is_valid() || !rhs.is_valid() {
            return Score::INVALID;
        }
        Score::new(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for Score {
    type Output = Score;

    fn neg(self) -> Score {
        Score::ZERO - self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_is_sticky() {
        let mut score = Score::INVALID;
        score += 100;
        assert!(!score.is_valid());
        let mut valid = Score::new(5);
        valid -= Score::INVALID;
        assert!(!valid.is_valid(), "subtracting an invalid score invalidates");
    }

    #[test]
    fn clamping_to_lower_bound_invalidates() {
        let score = Score::new(-(1 << 23)) - Score::new(1 << 23);
        assert!(!score.is_valid());
        let high = Score::new(1 << 24) + Score::new(10);
        assert_eq!(high.get(), Score::UPPER_BOUND);
    }

    #[test]
    fn invalid_loses_both_comparisons() {
        let valid = Score::new(-1000);
        assert!(!Score::INVALID.less_than(&valid));
        assert!(valid.less_than(&Score::INVALID));
        assert!(!Score::INVALID.greater_than(&valid));
        assert!(valid.greater_than(&Score::INVALID));
        assert!(Score::new(1).less_than(&Score::new(2)));
    }

    #[test]
    fn nonzero_only_touches_zero() {
        assert_eq!(Score::ZERO.nonzero(), Score::new(1));
        assert_eq!(Score::new(-3).nonzero(), Score::new(-3));
        assert_eq!(Score::INVALID.nonzero(), Score::INVALID);
    }
}
