use std::{fmt::Display, ops::Deref};

/// A signed percentage. Progress deltas are negative on bad days, so unlike a share of time this
/// can go below zero.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percentage(f64);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}%", self.0)
    }
}

impl Percentage {
    /// `0.0123` becomes `1.23%`.
    pub fn from_fraction(value: f64) -> Percentage {
        Percentage(value * 100.)
    }
}

impl Deref for Percentage {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Share of `part` in `whole`. An empty whole is reported as 0%.
pub fn ratio_percentage(part: i64, whole: usize) -> Percentage {
    if whole == 0 {
        return Percentage(0.);
    }
    Percentage(part as f64 / whole as f64 * 100.)
}
