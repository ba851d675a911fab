use serde::{Deserialize, Serialize};

use crate::errors::{EvalError, Result};

/// Tuning knobs for the numerical parts of the engine.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Samples per cubic segment when building arc-length tables.
    pub curve_segments: usize,
    /// Size of the `x(t)` lookup table of each easing solver.
    pub easing_samples: usize,
    /// Newton-Raphson refinement steps of the easing solver.
    pub newton_iterations: usize,
    /// Rotation keyframes take the shortest way around the ±180° seam.
    pub shortest_rotation: bool,
    /// Trim start/end are rounded to this step before use.
    pub trim_precision: f32,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            curve_segments: 150,
            easing_samples: 11,
            newton_iterations: 4,
            shortest_rotation: true,
            trim_precision: 1e-4,
        }
    }
}

impl EvalConfig {
    /// Parses a (possibly partial) JSON object; missing keys keep their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: EvalConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.curve_segments < 2 {
            return Err(EvalError::Config(format!(
                "curve_segments must be at least 2, got {}",
                self.curve_segments
            )));
        }
        if self.easing_samples < 2 {
            return Err(EvalError::Config(format!(
                "easing_samples must be at least 2, got {}",
                self.easing_samples
            )));
        }
        if !(self.trim_precision > 0.0) {
            return Err(EvalError::Config("trim_precision must be positive".into()));
        }
        Ok(())
    }
}
