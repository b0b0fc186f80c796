use std::ops::RangeInclusive;

/// Maps the coarse speed control onto a simulation-rate multiplier.
///
/// Levels are integers in `MIN_LEVEL..=MAX_LEVEL`. Level 8 runs at real time;
/// lower levels slow the animation down and higher levels speed it up along a
/// hand-tuned curve.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpeedMapper;

const MULTIPLIERS: [f32; 17] = [
    0.1, 0.25, 0.3, 0.5, 0.75, 0.8, 0.9, 1.0, 1.1, 1.25, 1.5, 1.75, 2.0, 3.0, 5.0, 8.0, 10.0,
];

impl SpeedMapper {
    pub const MIN_LEVEL: f32 = 1.0;
    pub const MAX_LEVEL: f32 = 17.0;
    pub const DEFAULT_LEVEL: f32 = 5.0;
    /// Multiplier used for any level outside the table.
    pub const FALLBACK_MULTIPLIER: f32 = 1.0;

    pub fn range() -> RangeInclusive<f32> {
        Self::MIN_LEVEL..=Self::MAX_LEVEL
    }

    /// Returns the multiplier for an exact integer level.
    ///
    /// Fractional, out-of-range and NaN inputs fall back to `1.0`.
    pub fn map_time(level: f32) -> f32 {
        MULTIPLIERS
            .iter()
            .enumerate()
            .find(|(index, _)| (*index + 1) as f32 == level)
            .map(|(_, multiplier)| *multiplier)
            .unwrap_or(Self::FALLBACK_MULTIPLIER)
    }

    /// Snaps a continuous control value onto the nearest level in range.
    pub fn quantize(level: f32) -> f32 {
        if level.is_nan() {
            return Self::DEFAULT_LEVEL;
        }
        level.round().clamp(Self::MIN_LEVEL, Self::MAX_LEVEL)
    }

    /// Moves `delta` whole levels away from `level`, staying in range.
    pub fn step(level: f32, delta: i32) -> f32 {
        Self::quantize(Self::quantize(level) + delta as f32)
    }
}
