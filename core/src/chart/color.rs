use serde::Serialize;
use std::fmt;

const SATURATION: u8 = 70;
const LIGHTNESS: u8 = 50;

/// HSL line colour for a chart series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesColor {
    pub hue: f64,
    pub saturation: u8,
    pub lightness: u8,
}

impl SeriesColor {
    /// Hue `360 * position / count`. Stable for a fixed user count; every
    /// colour shifts when the count changes.
    pub fn evenly_spaced(position: usize, count: usize) -> Self {
        let hue = if count == 0 {
            0.0
        } else {
            360.0 * position as f64 / count as f64
        };
        Self {
            hue,
            saturation: SATURATION,
            lightness: LIGHTNESS,
        }
    }
}

impl fmt::Display for SeriesColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hsl({}, {}%, {}%)",
            self.hue, self.saturation, self.lightness
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_series_starts_at_red() {
        assert_eq!(SeriesColor::evenly_spaced(0, 1).to_string(), "hsl(0, 70%, 50%)");
    }

    #[test]
    fn hue_depends_on_user_count() {
        assert_eq!(SeriesColor::evenly_spaced(1, 2).hue, 180.0);
        assert_eq!(SeriesColor::evenly_spaced(1, 4).hue, 90.0);
    }
}
