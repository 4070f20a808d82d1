//! Unit conversions shared by every provider.

use serde::{Deserialize, Serialize};

/// 1 hPa expressed in millimetres of mercury.
pub const HPA_TO_MM_HG: f64 = 0.75006;

/// Rounds half-up: `0.5 -> 1`, `1.4 -> 1`, `9.5 -> 10`.
///
/// The small bias pushes values that sit exactly on `.5` but are stored
/// slightly below it in binary back over the edge.
pub fn math_round(value: f64) -> i64 {
    (value + 1e-9).round() as i64
}

/// Converts pressure in hPa to whole mmHg. Fractional hPa are dropped first.
pub fn hpa_to_mm_hg(pressure_hpa: f64) -> i64 {
    math_round(pressure_hpa.trunc() * HPA_TO_MM_HG)
}

/// Eight-point compass indicator for a wind bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WindDirection {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    #[default]
    Unknown,
}

impl WindDirection {
    /// Bucket a bearing in degrees.
    ///
    /// North spans `[338, 360]` and `[0, 23)`, every other bucket is 45° wide
    /// with an inclusive lower bound. Values outside `0..=360` are unknown.
    pub fn from_bearing(bearing: Option<f64>) -> Self {
        let Some(deg) = bearing else {
            return WindDirection::Unknown;
        };
        if !(0.0..=360.0).contains(&deg) {
            return WindDirection::Unknown;
        }

        match deg {
            d if d < 23.0 => WindDirection::North,
            d if d < 68.0 => WindDirection::NorthEast,
            d if d < 113.0 => WindDirection::East,
            d if d < 158.0 => WindDirection::SouthEast,
            d if d < 203.0 => WindDirection::South,
            d if d < 248.0 => WindDirection::SouthWest,
            d if d < 293.0 => WindDirection::West,
            d if d < 338.0 => WindDirection::NorthWest,
            _ => WindDirection::North,
        }
    }

    /// Arrow emoji pointing where the wind blows from.
    pub fn indicator(&self) -> &'static str {
        match self {
            WindDirection::North => "\u{2B06}",
            WindDirection::NorthEast => "\u{2197}",
            WindDirection::East => "\u{27A1}",
            WindDirection::SouthEast => "\u{2198}",
            WindDirection::South => "\u{2B07}",
            WindDirection::SouthWest => "\u{2199}",
            WindDirection::West => "\u{2B05}",
            WindDirection::NorthWest => "\u{2196}",
            WindDirection::Unknown => "\u{262F}",
        }
    }
}
