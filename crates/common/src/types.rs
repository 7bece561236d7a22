//! Core value types: layer identifiers, value ranges, and hide-band thresholds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of a degenerate range after widening (`min == max`).
pub const RANGE_EPSILON: f32 = 1e-6;

/// Threshold bounds closer than this are treated as inactive.
pub const THRESHOLD_EPSILON: f32 = 1e-9;

/// Straight (non-premultiplied) RGBA color, components in `[0, 1]`.
pub type Rgba = [f32; 4];

/// Unique layer identifier within a stack.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Value range used to normalize scalars into `[0, 1]`.
///
/// Serialized as a two-element array `[min, max]`. The stored bounds are
/// what the caller supplied; [`normalized`](Range::normalized) yields the
/// usable form.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct Range {
    pub min: f32,
    pub max: f32,
}

impl Range {
    pub const UNIT: Self = Self { min: 0.0, max: 1.0 };

    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn is_finite(self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Swap reversed bounds and widen a degenerate range so `max > min`.
    pub fn normalized(self) -> Self {
        let (mut min, mut max) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        if !min.is_finite() || !max.is_finite() {
            return Self::UNIT;
        }
        if max <= min {
            let mid = min;
            min = mid - RANGE_EPSILON * 0.5;
            max = mid + RANGE_EPSILON * 0.5;
            if max <= min {
                // Large magnitudes absorb the epsilon.
                let step = mid.abs() * f32::EPSILON * 4.0;
                min = mid - step;
                max = mid + step;
            }
        }
        Self { min, max }
    }

    /// Map `v` into `[0, 1]`, clamping outside the range.
    #[inline]
    pub fn normalize(self, v: f32) -> f32 {
        let r = self.normalized();
        ((v - r.min) / (r.max - r.min)).clamp(0.0, 1.0)
    }
}

impl Default for Range {
    fn default() -> Self {
        Self::UNIT
    }
}

impl From<[f32; 2]> for Range {
    fn from(v: [f32; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

impl From<Range> for [f32; 2] {
    fn from(r: Range) -> Self {
        [r.min, r.max]
    }
}

/// Hide-band threshold: values inside `[low, high]` (inclusive) are suppressed.
///
/// Bounds closer than [`THRESHOLD_EPSILON`] make the threshold inactive, so
/// `[0, 0]` shows everything. Reversed bounds are swapped, not rejected.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct Threshold {
    pub low: f32,
    pub high: f32,
}

impl Threshold {
    pub const NONE: Self = Self {
        low: 0.0,
        high: 0.0,
    };

    pub fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }

    pub fn is_finite(self) -> bool {
        self.low.is_finite() && self.high.is_finite()
    }

    /// Bounds in ascending order.
    pub fn ordered(self) -> (f32, f32) {
        if self.low <= self.high {
            (self.low, self.high)
        } else {
            (self.high, self.low)
        }
    }

    pub fn is_active(self) -> bool {
        (self.high - self.low).abs() > THRESHOLD_EPSILON
    }

    /// Whether `v` falls inside the hide band.
    #[inline]
    pub fn hides(self, v: f32) -> bool {
        if !self.is_active() {
            return false;
        }
        let (low, high) = self.ordered();
        low <= v && v <= high
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::NONE
    }
}

impl From<[f32; 2]> for Threshold {
    fn from(v: [f32; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

impl From<Threshold> for [f32; 2] {
    fn from(t: Threshold) -> Self {
        [t.low, t.high]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversed_range_is_swapped() {
        let r = Range::new(10.0, 0.0).normalized();
        assert_eq!(r.min, 0.0);
        assert_eq!(r.max, 10.0);
        assert!((Range::new(10.0, 0.0).normalize(2.5) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn degenerate_range_is_widened() {
        let r = Range::new(3.0, 3.0).normalized();
        assert!(r.max > r.min);
        let t = Range::new(3.0, 3.0).normalize(3.0);
        assert!(t.is_finite());
        assert_eq!(Range::new(3.0, 3.0).normalize(10.0), 1.0);
        assert_eq!(Range::new(3.0, 3.0).normalize(-10.0), 0.0);

        let big = Range::new(1.0e9, 1.0e9).normalized();
        assert!(big.max > big.min);
    }

    #[test]
    fn finiteness_checks_both_bounds() {
        assert!(Range::UNIT.is_finite());
        assert!(!Range::new(f32::NAN, 1.0).is_finite());
        assert!(!Range::new(0.0, f32::INFINITY).is_finite());
        assert!(Threshold::NONE.is_finite());
        assert!(!Threshold::new(f32::NEG_INFINITY, 0.0).is_finite());
    }

    #[test]
    fn zero_threshold_is_inactive() {
        let t = Threshold::new(0.0, 0.0);
        assert!(!t.is_active());
        assert!(!t.hides(0.0));
    }

    #[test]
    fn threshold_hides_inclusive_band() {
        let t = Threshold::new(4.0, 6.0);
        assert!(t.hides(4.0));
        assert!(t.hides(5.0));
        assert!(t.hides(6.0));
        assert!(!t.hides(3.999));
        assert!(!t.hides(6.001));
    }

    #[test]
    fn reversed_threshold_is_swapped() {
        let t = Threshold::new(6.0, 4.0);
        assert!(t.hides(5.0));
        assert_eq!(t.ordered(), (4.0, 6.0));
    }

    #[test]
    fn range_serializes_as_pair() {
        let json = serde_json::to_string(&Range::new(-2.0, 5.0)).unwrap();
        assert_eq!(json, "[-2.0,5.0]");
        let t: Threshold = serde_json::from_str("[1.0, 2.0]").unwrap();
        assert_eq!(t, Threshold::new(1.0, 2.0));
    }

    #[test]
    fn layer_id_is_transparent_string() {
        let id = LayerId::new("stat_1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"stat_1\"");
        assert_eq!(id.to_string(), "stat_1");
    }
}
