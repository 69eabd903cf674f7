/// Adapter, device and surface preferences for `Gpu::new`.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Prefer an sRGB surface so the present pass can write linear color.
    pub prefer_srgb: bool,

    pub present_mode: wgpu::PresentMode,

    /// Used only when the surface supports it.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub power_preference: wgpu::PowerPreference,

    /// Keep empty unless a feature is strictly required. Float32 G-buffer
    /// attachments are only read with `textureLoad`, which core WebGPU allows.
    pub required_features: wgpu::Features,

    pub required_limits: wgpu::Limits,

    /// Hint only; support depends on platform and backend.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            power_preference: wgpu::PowerPreference::HighPerformance,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}

impl GpuInit {
    /// `Fifo` when enabled, `AutoNoVsync` otherwise.
    pub fn with_vsync(mut self, enabled: bool) -> Self {
        self.present_mode = if enabled {
            wgpu::PresentMode::Fifo
        } else {
            wgpu::PresentMode::AutoNoVsync
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vsync_toggles_present_mode() {
        let init = GpuInit::default().with_vsync(false);
        assert_eq!(init.present_mode, wgpu::PresentMode::AutoNoVsync);
        assert_eq!(init.with_vsync(true).present_mode, wgpu::PresentMode::Fifo);
    }
}
