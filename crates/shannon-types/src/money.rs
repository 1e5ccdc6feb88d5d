use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

/// Cost in USD, stored as integer micro-dollars so that summing many small
/// per-token costs across a long-running workflow never drifts the way a
/// running `f64` total would.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(into = "f64", try_from = "f64")]
pub struct Money {
    micros: i64,
}

impl Money {
    pub const ZERO: Money = Money { micros: 0 };

    pub fn from_usd(usd: f64) -> Self {
        Money {
            micros: (usd * 1_000_000.0).round() as i64,
        }
    }

    pub fn from_micros(micros: i64) -> Self {
        Money { micros }
    }

    pub fn as_usd(&self) -> f64 {
        self.micros as f64 / 1_000_000.0
    }

    pub fn micros(&self) -> i64 {
        self.micros
    }
}

impl From<Money> for f64 {
    fn from(m: Money) -> f64 {
        m.as_usd()
    }
}

impl TryFrom<f64> for Money {
    type Error = std::convert::Infallible;

    fn try_from(usd: f64) -> Result<Self, Self::Error> {
        Ok(Money::from_usd(usd))
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money::from_micros(self.micros + rhs.micros)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.micros += rhs.micros;
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money::from_micros(self.micros - rhs.micros)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.6}", self.as_usd())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_without_float_drift() {
        let a = Money::from_usd(0.000_123);
        let b = Money::from_usd(0.000_321);
        assert_eq!((a + b).micros(), 444);
    }

    #[test]
    fn round_trips_through_serde() {
        let m = Money::from_usd(1.234567);
        let json = serde_json::to_string(&m).unwrap();
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(m, back);
    }
}
