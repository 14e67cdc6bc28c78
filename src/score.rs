use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A signal score bounded to [0.0, 1.0] by construction.
///
/// Every extractor reports its output through this type, so the aggregator
/// never has to re-clamp or defend against out-of-range values.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Score(f64);

impl Score {
    pub const ZERO: Score = Score(0.0);
    pub const MAX: Score = Score(1.0);

    /// Build a score, clamping into [0, 1]. NaN collapses to 0.
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Score(0.0);
        }
        Score(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Pick the larger of two scores.
    pub fn max(self, other: Score) -> Score {
        if other.0 > self.0 {
            other
        } else {
            self
        }
    }

    /// True when the score meets or exceeds a raw threshold.
    pub fn breaches(self, threshold: f64) -> bool {
        self.0 >= threshold
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Ok(Score::clamped(value))
    }
}
