use std::fmt;

use serde::Serialize;

/// Categorical grade given to one diagnostics metric.
///
/// Ratings average through their ordinal values: `Unknown = 0`, then
/// `Excellent = 1` through `Poor = 4`. A larger ordinal is a worse grade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Rating {
    /// Not measured
    #[default]
    Unknown,
    /// Well within healthy bounds
    Excellent,
    /// Healthy
    Good,
    /// Degraded
    Fair,
    /// Likely to cause visible problems
    Poor,
}

impl Rating {
    /// Returns the ordinal used when averaging ratings.
    pub fn to_ordinal(self) -> u8 {
        match self {
            Rating::Unknown => 0,
            Rating::Excellent => 1,
            Rating::Good => 2,
            Rating::Fair => 3,
            Rating::Poor => 4,
        }
    }

    /// Maps an ordinal back to its rating.
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(Rating::Unknown),
            1 => Some(Rating::Excellent),
            2 => Some(Rating::Good),
            3 => Some(Rating::Fair),
            4 => Some(Rating::Poor),
            _ => None,
        }
    }

    /// Grades `value` against ascending upper bounds for Excellent, Good and Fair.
    /// Anything at or above the last bound is Poor.
    pub fn from_thresholds(value: f64, bounds: [f64; 3]) -> Self {
        let [excellent, good, fair] = bounds;
        if value < excellent {
            Rating::Excellent
        } else if value < good {
            Rating::Good
        } else if value < fair {
            Rating::Fair
        } else {
            Rating::Poor
        }
    }

    /// Combines ratings by truncating the average ordinal of the known ones.
    ///
    /// Returns `Unknown` when no rating is known.
    pub fn overall(ratings: &[Rating]) -> Self {
        let known: Vec<u32> = ratings
            .iter()
            .filter(|rating| **rating != Rating::Unknown)
            .map(|rating| rating.to_ordinal() as u32)
            .collect();
        if known.is_empty() {
            return Rating::Unknown;
        }
        let average = known.iter().sum::<u32>() / known.len() as u32;
        u8::try_from(average).ok().and_then(Rating::from_ordinal).unwrap_or_default()
    }

    /// Short report tag.
    pub fn tag(self) -> &'static str {
        match self {
            Rating::Excellent | Rating::Good => "[OK]",
            Rating::Fair => "[!!]",
            Rating::Poor => "[XX]",
            Rating::Unknown => "[??]",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rating::Unknown => "Unknown",
            Rating::Excellent => "Excellent",
            Rating::Good => "Good",
            Rating::Fair => "Fair",
            Rating::Poor => "Poor",
        };
        f.write_str(name)
    }
}
