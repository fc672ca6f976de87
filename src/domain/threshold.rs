//! Regime-dependent probability thresholds.

use std::fmt;

use super::regime::Regime;

pub const REPAIR_GAP: f64 = 0.10;

/// Ordered `(strong, weak)` probability pair; `weak < strong`, both in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    strong: f64,
    weak: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            strong: 0.70,
            weak: 0.50,
        }
    }
}

impl Thresholds {
    /// Build a pair, repairing inversions with `weak = strong - 0.10` and
    /// falling back to the default for unusable values.
    pub fn new(strong: f64, weak: f64) -> Self {
        if !strong.is_finite() || !weak.is_finite() || !(REPAIR_GAP..=1.0).contains(&strong) {
            return Thresholds::default();
        }
        let weak = if weak >= strong { strong - REPAIR_GAP } else { weak };
        if weak < 0.0 {
            return Thresholds::default();
        }
        Thresholds { strong, weak }
    }

    pub fn strong(&self) -> f64 {
        self.strong
    }

    pub fn weak(&self) -> f64 {
        self.weak
    }

    pub fn as_pair(&self) -> (f64, f64) {
        (self.strong, self.weak)
    }

    pub fn grade(&self, probability: f64) -> Strength {
        if probability >= self.strong {
            Strength::Strong
        } else if probability >= self.weak {
            Strength::Weak
        } else {
            Strength::None
        }
    }
}

/// Thresholds for a regime; `None` (unknown) is treated like a chaotic market.
pub fn dynamic_threshold(regime: Option<Regime>) -> Thresholds {
    match regime {
        Some(Regime::Trending) => Thresholds::new(0.72, 0.53),
        Some(Regime::Ranging) => Thresholds::new(0.75, 0.58),
        Some(Regime::Chaotic) | None => Thresholds::new(0.78, 0.60),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strength {
    Strong,
    Weak,
    None,
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strength::Strong => "STRONG",
            Strength::Weak => "WEAK",
            Strength::None => "NONE",
        };
        f.write_str(name)
    }
}
