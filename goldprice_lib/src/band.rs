//! Plausibility bands: the numeric range a candidate price must fall in
//! before a stage accepts it.

use serde::{Deserialize, Serialize};

/// Inclusive price range used to reject unrelated numerals on a page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlausibilityBand {
    pub min: f64,
    pub max: f64,
}

impl PlausibilityBand {
    /// Gold in USD per troy ounce. Shared by every built-in stage.
    pub const GOLD_USD: Self = Self {
        min: 1500.0,
        max: 6000.0,
    };

    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// True when `value` lies inside the band, bounds included.
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }

    /// A band is usable when both bounds are finite, positive, and ordered.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min > 0.0 && self.min < self.max
    }
}

impl Default for PlausibilityBand {
    fn default() -> Self {
        Self::GOLD_USD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_inclusive() {
        let band = PlausibilityBand::new(2000.0, 5000.0);
        assert!(band.contains(2000.0));
        assert!(band.contains(5000.0));
        assert!(band.contains(2345.67));
        assert!(!band.contains(1999.99));
        assert!(!band.contains(5000.01));
        assert!(!band.contains(f64::NAN));
    }

    #[test]
    fn default_is_gold_band() {
        let band = PlausibilityBand::default();
        assert!(band.contains(1500.0));
        assert!(band.contains(6000.0));
        assert!(!band.contains(187.5));
    }

    #[test]
    fn validity_requires_ordered_positive_bounds() {
        assert!(PlausibilityBand::new(1.0, 2.0).is_valid());
        assert!(!PlausibilityBand::new(2.0, 1.0).is_valid());
        assert!(!PlausibilityBand::new(0.0, 1.0).is_valid());
        assert!(!PlausibilityBand::new(1.0, f64::INFINITY).is_valid());
    }
}
