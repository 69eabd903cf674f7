use glam::Vec3;

use crate::config::EngineConfig;
use crate::device::RenderDevice;
use crate::error::{EngineError, Result};
use crate::resources::Resources;
use crate::scene::{Light, Scene};
use crate::shader::{ProgramInterface, ShaderBudget, StandardProgram};
use crate::time::FrameTime;

use super::{
    direct, gbuffer, indirect, linked, resolve_program, rsm, vpl, Extent, FramePhase,
    FrameSequencer, LightingHeader, RenderTarget, TargetLayout,
};

/// Scalar lighting parameters shared by both lighting programs.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LightingParams {
    pub attenuation: f32,
    pub min_vpl_distance: f32,
    pub vpl_intensity: f32,
}

impl LightingParams {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            attenuation: config.attenuation,
            min_vpl_distance: config.min_vpl_distance,
            vpl_intensity: config.vpl_intensity,
        }
    }

    pub fn header(&self, eye: Vec3) -> LightingHeader {
        LightingHeader {
            eye: eye.extend(1.0).to_array(),
            params: [self.attenuation, self.min_vpl_distance, self.vpl_intensity, 0.0],
            counts: [0; 4],
        }
    }
}

/// What one call to `render_frame` did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub frame_index: u64,
    pub dt: f32,
    pub presented: bool,
    pub draws: usize,
    pub rsm_passes: usize,
    pub indirect_passes: usize,
    /// Light slots whose indirect contribution was skipped.
    pub skipped_lights: Vec<usize>,
}

/// Owns the frame targets and runs the passes in order.
///
/// The G-buffer and accumulation buffer follow the viewport. One RSM per light
/// slot is allocated up front at the configured resolution.
pub struct DeferredRenderer<D: RenderDevice> {
    budget: ShaderBudget,
    params: LightingParams,
    gbuffer: RenderTarget<D::Target>,
    accumulation: RenderTarget<D::Target>,
    rsm: Vec<RenderTarget<D::Target>>,
    samples: Vec<[f32; 4]>,
    sequencer: FrameSequencer,
}

impl<D: RenderDevice> DeferredRenderer<D> {
    pub fn new(device: &mut D, config: &EngineConfig, extent: Extent) -> Self {
        let rsm_extent = Extent::square(config.rsm_resolution);
        let rsm = (0..config.budget.num_lights as usize)
            .map(|slot| {
                let label = format!("rsm[{slot}]");
                let raw = device.create_target(&label, TargetLayout::RSM, rsm_extent);
                RenderTarget::new(label, TargetLayout::RSM, rsm_extent, raw)
            })
            .collect();

        log::info!(
            "allocated {} reflective shadow maps at {rsm_extent}",
            config.budget.num_lights
        );

        Self {
            budget: config.budget,
            params: LightingParams::from_config(config),
            gbuffer: Self::viewport_target(device, "gbuffer", TargetLayout::GBUFFER, extent),
            accumulation: Self::viewport_target(
                device,
                "accumulation",
                TargetLayout::ACCUMULATION,
                extent,
            ),
            rsm,
            samples: vpl::hammersley(config.budget.num_vpl),
            sequencer: FrameSequencer::new(),
        }
    }

    fn viewport_target(
        device: &mut D,
        label: &str,
        layout: TargetLayout,
        extent: Extent,
    ) -> RenderTarget<D::Target> {
        let raw = device.create_target(label, layout, extent);
        RenderTarget::new(label, layout, extent, raw)
    }

    pub fn extent(&self) -> Extent {
        self.gbuffer.extent()
    }

    /// Reallocates the viewport-sized targets. Returns whether anything changed.
    ///
    /// Only valid between frames; the renderer must be idle.
    pub fn resize(&mut self, device: &mut D, extent: Extent) -> Result<bool> {
        if self.sequencer.phase() != FramePhase::Idle {
            return Err(EngineError::PassOrder {
                requested: FramePhase::Idle,
                current: self.sequencer.phase(),
            });
        }
        if extent.is_empty() || extent == self.extent() {
            return Ok(false);
        }

        self.gbuffer = Self::viewport_target(device, "gbuffer", TargetLayout::GBUFFER, extent);
        self.accumulation =
            Self::viewport_target(device, "accumulation", TargetLayout::ACCUMULATION, extent);
        Ok(true)
    }

    pub fn gbuffer(&self) -> &RenderTarget<D::Target> {
        &self.gbuffer
    }

    pub fn accumulation(&self) -> &RenderTarget<D::Target> {
        &self.accumulation
    }

    pub fn rsm(&self, slot: usize) -> Option<&RenderTarget<D::Target>> {
        self.rsm.get(slot)
    }

    pub fn samples(&self) -> &[[f32; 4]] {
        &self.samples
    }

    pub fn phase(&self) -> FramePhase {
        self.sequencer.phase()
    }

    pub fn params(&self) -> LightingParams {
        self.params
    }

    // ── individual passes ───────────────────────────────────────────────────

    pub fn begin_frame(&mut self, device: &mut D) -> Result<bool> {
        if self.sequencer.phase() != FramePhase::Idle {
            return Err(EngineError::PassOrder {
                requested: FramePhase::GBuffer,
                current: self.sequencer.phase(),
            });
        }
        device.begin_frame()
    }

    /// Returns the number of draws.
    pub fn gbuffer_pass(
        &mut self,
        device: &mut D,
        resources: &Resources<D>,
        scene: &Scene,
    ) -> Result<usize> {
        self.sequencer.enter(FramePhase::GBuffer)?;
        gbuffer::run(device, resources, scene, &self.gbuffer)
    }

    /// Renders the RSM of light `slot`. Returns `false` when the light has
    /// indirect lighting disabled and was skipped.
    pub fn rsm_pass(
        &mut self,
        device: &mut D,
        resources: &Resources<D>,
        scene: &Scene,
        slot: usize,
    ) -> Result<bool> {
        let light = light_at(scene, slot)?;
        if !light.indirect {
            log::debug!("light {slot}: indirect disabled, no RSM");
            return Ok(false);
        }
        let target = self.rsm.get(slot).ok_or(EngineError::Budget {
            what: "light slot",
            capacity: self.rsm.len(),
        })?;

        self.sequencer.enter(FramePhase::Rsm(slot))?;
        rsm::run(device, resources, scene, light, target)?;
        Ok(true)
    }

    pub fn direct_pass(
        &mut self,
        device: &mut D,
        resources: &Resources<D>,
        scene: &Scene,
    ) -> Result<()> {
        self.sequencer.enter(FramePhase::DirectLighting)?;
        direct::run(
            device,
            resources,
            scene,
            &self.params,
            self.budget,
            &self.gbuffer,
            &self.accumulation,
        )
    }

    /// Adds light `slot`'s one-bounce contribution. Returns `false` when the
    /// light has indirect lighting disabled.
    ///
    /// Running this twice for one light in a frame adds the contribution twice;
    /// a warning is logged when that happens.
    pub fn indirect_pass(
        &mut self,
        device: &mut D,
        resources: &Resources<D>,
        scene: &Scene,
        slot: usize,
    ) -> Result<bool> {
        let light = light_at(scene, slot)?;
        if !light.indirect {
            log::debug!("light {slot}: indirect disabled, no bounce");
            return Ok(false);
        }
        let rsm = self.rsm.get(slot).ok_or(EngineError::Budget {
            what: "light slot",
            capacity: self.rsm.len(),
        })?;

        let times = self.sequencer.indirect(slot)?;
        if times > 1 {
            log::warn!("light {slot}: indirect light added {times} times this frame");
        }

        indirect::run(
            device,
            resources,
            scene,
            &self.params,
            self.budget,
            &self.samples,
            &self.gbuffer,
            rsm,
            &self.accumulation,
        )?;
        Ok(true)
    }

    pub fn present(&mut self, device: &mut D, resources: &Resources<D>) -> Result<()> {
        self.sequencer.enter(FramePhase::Presented)?;
        let program = resolve_program(
            resources,
            StandardProgram::PRESENT,
            ProgramInterface::Present,
            TargetLayout::SURFACE,
            "present",
        )?;
        device.present(linked(program)?, self.accumulation.raw())?;
        self.sequencer.finish()
    }

    /// Abandons a partially recorded frame.
    pub fn abort_frame(&mut self, device: &mut D) {
        self.sequencer.reset();
        device.abort_frame();
    }

    // ── whole frame ─────────────────────────────────────────────────────────

    /// G-buffer, every RSM, direct light, every indirect bounce, present.
    ///
    /// On failure the frame is abandoned and the renderer returns to idle.
    pub fn render_frame(
        &mut self,
        device: &mut D,
        resources: &Resources<D>,
        scene: &Scene,
        time: FrameTime,
    ) -> Result<FrameReport> {
        let mut report = FrameReport {
            frame_index: time.frame_index,
            dt: time.dt,
            ..Default::default()
        };

        if !self.begin_frame(device)? {
            log::debug!("frame {} skipped by the device", time.frame_index);
            return Ok(report);
        }

        match self.record(device, resources, scene, &mut report) {
            Ok(()) => {
                report.presented = true;
                Ok(report)
            }
            Err(err) => {
                self.abort_frame(device);
                Err(err)
            }
        }
    }

    fn record(
        &mut self,
        device: &mut D,
        resources: &Resources<D>,
        scene: &Scene,
        report: &mut FrameReport,
    ) -> Result<()> {
        report.draws = self.gbuffer_pass(device, resources, scene)?;

        for slot in 0..scene.lights.len() {
            if self.rsm_pass(device, resources, scene, slot)? {
                report.rsm_passes += 1;
            } else {
                report.skipped_lights.push(slot);
            }
        }

        self.direct_pass(device, resources, scene)?;

        for slot in 0..scene.lights.len() {
            if self.indirect_pass(device, resources, scene, slot)? {
                report.indirect_passes += 1;
            }
        }

        self.present(device, resources)
    }
}

fn light_at(scene: &Scene, slot: usize) -> Result<&Light> {
    scene.lights.get(slot).ok_or(EngineError::Budget {
        what: "light slot",
        capacity: scene.lights.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::EmbeddedShaders;
    use crate::device::SoftwareDevice;
    use crate::scene::demo::cornell_box;
    use crate::shader::build_standard_programs;

    struct Fixture {
        device: SoftwareDevice,
        resources: Resources<SoftwareDevice>,
        scene: Scene,
        renderer: DeferredRenderer<SoftwareDevice>,
    }

    fn fixture() -> Fixture {
        let config = EngineConfig {
            budget: ShaderBudget {
                num_lights: 2,
                num_vpl: 16,
            },
            rsm_resolution: 16,
            initial_extent: Extent::new(16, 12),
            ..Default::default()
        };
        let mut device = SoftwareDevice::new();
        let mut resources = Resources::new();
        build_standard_programs(
            &mut device,
            &EmbeddedShaders,
            config.budget,
            &mut resources.shaders,
        )
        .unwrap();
        let scene = cornell_box(&mut device, &mut resources, 2).unwrap();
        let renderer = DeferredRenderer::new(&mut device, &config, config.initial_extent);
        Fixture {
            device,
            resources,
            scene,
            renderer,
        }
    }

    impl Fixture {
        fn begin(&mut self) {
            assert!(self.renderer.begin_frame(&mut self.device).unwrap());
        }

        fn gbuffer(&mut self) {
            self.renderer
                .gbuffer_pass(&mut self.device, &self.resources, &self.scene)
                .unwrap();
        }

        fn rsm(&mut self, slot: usize) {
            self.renderer
                .rsm_pass(&mut self.device, &self.resources, &self.scene, slot)
                .unwrap();
        }

        fn direct(&mut self) {
            self.renderer
                .direct_pass(&mut self.device, &self.resources, &self.scene)
                .unwrap();
        }

        fn indirect(&mut self, slot: usize) {
            self.renderer
                .indirect_pass(&mut self.device, &self.resources, &self.scene, slot)
                .unwrap();
        }

        fn accumulation(&self) -> Vec<[f32; 4]> {
            self.renderer.accumulation().raw().color(0)
        }
    }

    // ── ordering ────────────────────────────────────────────────────────────

    #[test]
    fn repeated_gbuffer_pass_is_idempotent() {
        let mut f = fixture();
        f.begin();
        f.gbuffer();
        let first: Vec<_> = (0..3).map(|i| f.renderer.gbuffer().raw().color(i)).collect();
        let depth = f.renderer.gbuffer().raw().depth();

        f.gbuffer();
        let second: Vec<_> = (0..3).map(|i| f.renderer.gbuffer().raw().color(i)).collect();
        assert_eq!(first, second);
        assert_eq!(depth, f.renderer.gbuffer().raw().depth());
        assert_eq!(f.renderer.phase(), FramePhase::GBuffer);
    }

    #[test]
    fn repeated_indirect_pass_adds_the_bounce_again() {
        let mut f = fixture();
        f.begin();
        f.gbuffer();
        f.rsm(0);
        f.direct();
        let direct = f.accumulation();
        f.indirect(0);
        let once = f.accumulation();
        f.indirect(0);
        let twice = f.accumulation();

        let mut total = 0.0;
        for ((d, a), b) in direct.iter().zip(&once).zip(&twice) {
            for c in 0..3 {
                let first = a[c] - d[c];
                let second = b[c] - a[c];
                assert!((second - first).abs() <= 1e-4 * first.abs().max(1.0));
                total += first;
            }
        }
        assert!(total > 0.0, "cornell box should receive some bounce light");
    }

    #[test]
    fn light_seeing_no_geometry_contributes_exactly_nothing() {
        let mut f = fixture();
        let light = f.scene.lights.get_mut(0).unwrap();
        light.position = Vec3::new(0.0, 3.0, 0.0);
        light.direction = Vec3::Y;

        f.begin();
        f.gbuffer();
        f.rsm(0);
        let rsm = f.renderer.rsm(0).unwrap().raw();
        for attachment in 0..3 {
            assert!(
                rsm.color(attachment).iter().flatten().all(|&c| c == 0.0),
                "RSM attachment {attachment} should hold the sentinel"
            );
        }

        f.direct();
        let direct = f.accumulation();
        f.indirect(0);
        let after = f.accumulation();

        assert_eq!(direct, after);
        assert!(after.iter().flatten().all(|c| !c.is_nan()));
    }

    #[test]
    fn indirect_without_this_frames_rsm_is_refused() {
        let mut f = fixture();
        let time = crate::time::FrameClock::new().tick();
        f.renderer
            .render_frame(&mut f.device, &f.resources, &f.scene, time)
            .unwrap();

        f.begin();
        f.gbuffer();
        f.direct();
        let direct = f.accumulation();
        let err = f
            .renderer
            .indirect_pass(&mut f.device, &f.resources, &f.scene, 0)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::PassOrder {
                requested: FramePhase::IndirectIllumination,
                current: FramePhase::DirectLighting
            }
        ));
        assert_eq!(f.accumulation(), direct);
        assert_eq!(f.renderer.phase(), FramePhase::DirectLighting);
    }

    #[test]
    fn lighting_before_gbuffer_is_a_pass_order_error() {
        let mut f = fixture();
        f.begin();
        let err = f
            .renderer
            .direct_pass(&mut f.device, &f.resources, &f.scene)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::PassOrder {
                requested: FramePhase::DirectLighting,
                current: FramePhase::Idle
            }
        ));

        f.gbuffer();
        let err = f.renderer.present(&mut f.device, &f.resources).unwrap_err();
        assert!(matches!(err, EngineError::PassOrder { .. }));

        f.renderer.abort_frame(&mut f.device);
        assert_eq!(f.renderer.phase(), FramePhase::Idle);
    }

    #[test]
    fn resize_mid_frame_is_refused() {
        let mut f = fixture();
        f.begin();
        f.gbuffer();
        let err = f
            .renderer
            .resize(&mut f.device, Extent::new(32, 32))
            .unwrap_err();
        assert!(matches!(err, EngineError::PassOrder { .. }));
        assert_eq!(f.renderer.extent(), Extent::new(16, 12));
    }

    #[test]
    fn resize_ignores_empty_and_unchanged_extents() {
        let mut f = fixture();
        assert!(!f.renderer.resize(&mut f.device, Extent::new(0, 12)).unwrap());
        assert!(!f.renderer.resize(&mut f.device, Extent::new(16, 12)).unwrap());
        assert!(f.renderer.resize(&mut f.device, Extent::new(8, 8)).unwrap());
        assert_eq!(f.renderer.gbuffer().extent(), Extent::new(8, 8));
    }

    #[test]
    fn full_frame_returns_to_idle() {
        let mut f = fixture();
        let time = crate::time::FrameClock::new().tick();
        let report = f
            .renderer
            .render_frame(&mut f.device, &f.resources, &f.scene, time)
            .unwrap();
        assert!(report.presented);
        assert_eq!(f.renderer.phase(), FramePhase::Idle);
        assert_eq!(f.device.stats().lighting_passes, 2);
    }
}
