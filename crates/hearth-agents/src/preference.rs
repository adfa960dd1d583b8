//! Provider preference multipliers.
//!
//! A provider scales how much it is willing to hand over by a multiplier
//! sampled from an authored affinity curve. The curve is sampled at the
//! normalized affinity of the pair, `t = (affinity + 1) / 2`, and the
//! result is clamped to the provider's configured multiplier range.

use serde::Deserialize;

use hearth_types::clamp_finite;

/// Piecewise-linear curve over `t` in [0, 1].
///
/// Points are `(t, multiplier)` pairs. Sampling outside the authored range
/// holds the first or last value; an empty curve is flat at 1.0.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct MultiplierCurve {
    /// Control points sorted by `t`.
    points: Vec<(f32, f32)>,
}

impl MultiplierCurve {
    /// Build a curve from control points. Non-finite points are dropped and
    /// the rest sorted by `t`.
    pub fn new(points: Vec<(f32, f32)>) -> Self {
        let mut points: Vec<(f32, f32)> = points
            .into_iter()
            .filter(|(t, m)| t.is_finite() && m.is_finite())
            .collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { points }
    }

    /// A curve that returns `value` everywhere.
    pub fn flat(value: f32) -> Self {
        Self::new(vec![(0.0, value), (1.0, value)])
    }

    /// Sample the curve at `t`.
    pub fn sample(&self, t: f32) -> f32 {
        let t = clamp_finite(t, 0.0, 1.0);
        let mut previous: Option<(f32, f32)> = None;
        for &(x, y) in &self.points {
            if t <= x {
                return match previous {
                    Some((px, py)) if x - px > f32::EPSILON => {
                        py + (y - py) * ((t - px) / (x - px))
                    }
                    _ => y,
                };
            }
            previous = Some((x, y));
        }
        previous.map_or(1.0, |(_, y)| y)
    }
}

/// Authored preference settings of a provider.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PreferenceProfile {
    /// Affinity-to-multiplier curve.
    pub curve: MultiplierCurve,
    /// Lowest multiplier the provider applies.
    pub min_multiplier: f32,
    /// Highest multiplier the provider applies.
    pub max_multiplier: f32,
}

impl Default for PreferenceProfile {
    fn default() -> Self {
        Self {
            curve: MultiplierCurve::flat(1.0),
            min_multiplier: 0.0,
            max_multiplier: 2.0,
        }
    }
}

impl PreferenceProfile {
    /// Multiplier applied toward a requester the provider holds `affinity`
    /// toward.
    pub fn multiplier(&self, affinity: f32) -> f32 {
        let t = (clamp_finite(affinity, -1.0, 1.0) + 1.0) * 0.5;
        clamp_finite(self.curve.sample(t), self.min_multiplier, self.max_multiplier)
    }
}
