use serde::{Deserialize, Serialize};

use crate::RenderError;

/// Narrowest jitter range accepted by [`RenderConfig::validate`].
pub const MIN_JITTER_SPAN: f32 = 1e-3;

/// Tunables for [`crate::FrameRenderer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Lower bound of the per-frame sub-pixel jitter, exclusive.
    pub jitter_min: f32,
    /// Upper bound of the per-frame sub-pixel jitter, exclusive.
    pub jitter_max: f32,
    /// Seeds the jitter generator for reproducible frames.
    pub seed: Option<u64>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            jitter_min: 0.1,
            jitter_max: 0.9,
            seed: None,
        }
    }
}

impl RenderConfig {
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// # Errors
    ///
    /// Returns `RenderError::Config` when the jitter range is narrower than
    /// [`MIN_JITTER_SPAN`] or leaves
    /// the unit pixel.
    pub fn validate(&self) -> Result<(), RenderError> {
        let in_pixel = (0.0..=1.0).contains(&self.jitter_min) && (0.0..=1.0).contains(&self.jitter_max);
        if !in_pixel || self.jitter_max - self.jitter_min < MIN_JITTER_SPAN {
            return Err(RenderError::Config(format!(
                "jitter range ({}, {}) must be a subrange of [0, 1] at least {MIN_JITTER_SPAN} wide",
                self.jitter_min, self.jitter_max
            )));
        }
        Ok(())
    }
}
