use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use noisy_float::types::{R64, r64};
use num_traits::{Bounded, Zero};

/// The score of an alignment.
///
/// Profile frequencies make alignment scores fractional, so the score is
/// real-valued. It is backed by a [`R64`](noisy_float::types::R64), which is
/// guaranteed finite and hence totally ordered, keeping score comparisons
/// reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Score(R64);

impl Score {
    pub fn new(value: f64) -> Self {
        Self(r64(value))
    }

    pub fn as_f64(&self) -> f64 {
        self.0.raw()
    }

    pub fn as_r64(&self) -> R64 {
        self.0
    }

    /// Scales the score by a non-negative factor, e.g. a column occupancy.
    pub fn scale(&self, factor: R64) -> Self {
        Self(self.0 * factor)
    }
}

impl From<R64> for Score {
    fn from(value: R64) -> Self {
        Self(value)
    }
}

impl Zero for Score {
    fn zero() -> Self {
        Self(R64::zero())
    }

    fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Bounded for Score {
    fn min_value() -> Self {
        Self(R64::min_value())
    }

    fn max_value() -> Self {
        Self(R64::max_value())
    }
}

impl Add for Score {
    type Output = Score;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Score {
    type Output = Score;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Neg for Score {
    type Output = Score;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl AddAssign for Score {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Score {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Sum for Score {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |accumulator, score| accumulator + score)
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
