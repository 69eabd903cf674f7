use wgpu::SurfaceError;

use crate::render::Extent;

use super::SurfaceErrorAction;

/// Window surface plus the configuration last applied to it.
///
/// A zero extent (minimized window) is recorded but never configured.
pub(crate) struct PresentSurface {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    extent: Extent,
}

impl PresentSurface {
    pub(crate) fn new(
        surface: wgpu::Surface<'static>,
        device: &wgpu::Device,
        config: wgpu::SurfaceConfiguration,
    ) -> Self {
        let extent = Extent::new(config.width, config.height);
        let slot = Self {
            surface,
            config,
            extent,
        };
        slot.configure(device);
        slot
    }

    pub(crate) fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub(crate) fn extent(&self) -> Extent {
        self.extent
    }

    fn configure(&self, device: &wgpu::Device) {
        if !self.extent.is_empty() {
            self.surface.configure(device, &self.config);
        }
    }

    pub(crate) fn resize(&mut self, device: &wgpu::Device, extent: Extent) {
        if extent == self.extent {
            return;
        }
        self.extent = extent;
        if extent.is_empty() {
            return;
        }
        self.config.width = extent.width;
        self.config.height = extent.height;
        self.configure(device);
    }

    pub(crate) fn acquire(&self) -> Result<wgpu::SurfaceTexture, SurfaceError> {
        self.surface.get_current_texture()
    }

    pub(crate) fn recover(&self, device: &wgpu::Device, err: &SurfaceError) -> SurfaceErrorAction {
        let action = classify(err);
        if action == SurfaceErrorAction::Reconfigured {
            self.configure(device);
        }
        action
    }
}

fn classify(err: &SurfaceError) -> SurfaceErrorAction {
    match err {
        SurfaceError::Lost | SurfaceError::Outdated => SurfaceErrorAction::Reconfigured,
        SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        SurfaceError::Timeout | SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}

/// Ranks presentable formats: 8-bit formats matching `prefer_srgb` first,
/// then other 8-bit formats, float formats last.
pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    let rank = |f: &wgpu::TextureFormat| {
        let float = matches!(
            f,
            wgpu::TextureFormat::Rgba16Float | wgpu::TextureFormat::Rgba32Float
        );
        match (float, f.is_srgb() == prefer_srgb) {
            (false, true) => 0,
            (false, false) => 1,
            (true, _) => 2,
        }
    };
    caps.formats.iter().copied().min_by_key(rank)
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// `Fifo` is the only mode every surface must support. The `Auto*` modes are
/// resolved by wgpu itself and never appear in the capabilities.
pub(crate) fn choose_present_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: wgpu::PresentMode,
) -> wgpu::PresentMode {
    let automatic = matches!(
        requested,
        wgpu::PresentMode::AutoVsync | wgpu::PresentMode::AutoNoVsync
    );
    if automatic || caps.present_modes.contains(&requested) {
        requested
    } else {
        log::warn!("present mode {requested:?} unsupported, falling back to Fifo");
        wgpu::PresentMode::Fifo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::TextureFormat as F;

    fn caps(formats: &[F]) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities {
            formats: formats.to_vec(),
            present_modes: vec![wgpu::PresentMode::Fifo, wgpu::PresentMode::Mailbox],
            alpha_modes: vec![wgpu::CompositeAlphaMode::Opaque],
            ..Default::default()
        }
    }

    #[test]
    fn srgb_preferred_over_order_and_float() {
        let caps = caps(&[F::Rgba16Float, F::Bgra8Unorm, F::Bgra8UnormSrgb]);
        assert_eq!(choose_surface_format(&caps, true), Some(F::Bgra8UnormSrgb));
        assert_eq!(choose_surface_format(&caps, false), Some(F::Bgra8Unorm));
    }

    #[test]
    fn float_only_surface_still_works() {
        assert_eq!(
            choose_surface_format(&caps(&[F::Rgba16Float]), true),
            Some(F::Rgba16Float)
        );
        assert_eq!(choose_surface_format(&caps(&[]), true), None);
    }

    #[test]
    fn unsupported_modes_fall_back() {
        let caps = caps(&[F::Bgra8UnormSrgb]);
        assert_eq!(
            choose_present_mode(&caps, wgpu::PresentMode::Immediate),
            wgpu::PresentMode::Fifo
        );
        assert_eq!(
            choose_present_mode(&caps, wgpu::PresentMode::Mailbox),
            wgpu::PresentMode::Mailbox
        );
        assert_eq!(
            choose_present_mode(&caps, wgpu::PresentMode::AutoNoVsync),
            wgpu::PresentMode::AutoNoVsync
        );
        assert_eq!(
            choose_alpha_mode(&caps, Some(wgpu::CompositeAlphaMode::PreMultiplied)),
            wgpu::CompositeAlphaMode::Opaque
        );
    }

    #[test]
    fn lost_surfaces_are_reconfigured_and_oom_is_fatal() {
        assert_eq!(classify(&SurfaceError::Lost), SurfaceErrorAction::Reconfigured);
        assert_eq!(classify(&SurfaceError::Outdated), SurfaceErrorAction::Reconfigured);
        assert_eq!(classify(&SurfaceError::Timeout), SurfaceErrorAction::SkipFrame);
        assert_eq!(classify(&SurfaceError::OutOfMemory), SurfaceErrorAction::Fatal);
    }
}
