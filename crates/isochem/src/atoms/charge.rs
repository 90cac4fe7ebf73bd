use std::fmt::{self, Display, Formatter};

use crate::Charge;

impl Charge {
    pub(crate) const fn abs(self) -> u64 {
        self.0.unsigned_abs()
    }

    pub(crate) const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Converts a neutral mass into an m/z value, leaving the mass untouched for neutral molecules
    pub(crate) fn mz(self, mass: f64) -> f64 {
        if self.is_zero() {
            mass
        } else {
            mass / self.abs() as f64
        }
    }
}

// NOTE: The sign is written first so that the charge can't be mistaken for the count of a preceding element when a
// formula is displayed and then parsed again
impl Display for Charge {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { '-' } else { '+' };
        match self.abs() {
            0 => Ok(()),
            1 => write!(f, "{sign}"),
            n => write!(f, "{sign}{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charge_display() {
        assert_eq!(Charge(0).to_string(), "");
        assert_eq!(Charge(1).to_string(), "+");
        assert_eq!(Charge(-1).to_string(), "-");
        assert_eq!(Charge(3).to_string(), "+3");
        assert_eq!(Charge(-4).to_string(), "-4");
    }

    #[test]
    fn charge_mz() {
        assert_eq!(Charge(0).mz(100.0), 100.0);
        assert_eq!(Charge(1).mz(100.0), 100.0);
        assert_eq!(Charge(-2).mz(100.0), 50.0);
        assert_eq!(Charge(4).mz(100.0), 25.0);
    }
}
