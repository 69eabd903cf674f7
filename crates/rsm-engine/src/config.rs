use crate::error::{EngineError, Result};
use crate::render::Extent;
use crate::shader::ShaderBudget;

/// Engine configuration, resolved once before any shader compiles.
///
/// Changing the light or VPL budget requires building a new engine: both are
/// baked into the shader text as compile-time constants.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// `NUM_LIGHTS` / `NUM_VPL` injected into shader sources.
    pub budget: ShaderBudget,

    /// Square resolution of every reflective shadow map.
    ///
    /// Independent of the viewport size.
    pub rsm_resolution: u32,

    /// Size used for the G-buffer until the first `reshape`.
    pub initial_extent: Extent,

    /// Quadratic distance attenuation `k` in `1 / (1 + k·d²)` for direct light.
    pub attenuation: f32,

    /// Lower bound on the VPL-to-receiver distance.
    pub min_vpl_distance: f32,

    /// Overall scale of the one-bounce contribution.
    pub vpl_intensity: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            budget: ShaderBudget::default(),
            rsm_resolution: 256,
            initial_extent: Extent::new(1600, 900),
            attenuation: 0.05,
            min_vpl_distance: 0.1,
            vpl_intensity: 1.0,
        }
    }
}

impl EngineConfig {
    /// Rejects configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.budget.num_lights == 0 {
            return Err(EngineError::mismatch("config", "NUM_LIGHTS >= 1", "0"));
        }
        if self.budget.num_vpl == 0 {
            return Err(EngineError::mismatch("config", "NUM_VPL >= 1", "0"));
        }
        if self.rsm_resolution == 0 {
            return Err(EngineError::mismatch("config", "RSM resolution >= 1", "0"));
        }
        if !(self.min_vpl_distance > 0.0) {
            return Err(EngineError::mismatch(
                "config",
                "a positive minimum VPL distance",
                self.min_vpl_distance.to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_light_budget_is_rejected() {
        let mut config = EngineConfig::default();
        config.budget.num_lights = 0;
        assert!(matches!(
            config.validate(),
            Err(EngineError::ConfigurationMismatch { .. })
        ));
    }

    #[test]
    fn non_positive_vpl_clamp_is_rejected() {
        let mut config = EngineConfig::default();
        config.min_vpl_distance = 0.0;
        assert!(config.validate().is_err());
        config.min_vpl_distance = f32::NAN;
        assert!(config.validate().is_err());
    }
}
