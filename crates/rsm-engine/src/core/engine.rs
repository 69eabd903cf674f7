use std::sync::Arc;
use std::time::Instant;

use crate::assets::{self, AssetSource};
use crate::config::EngineConfig;
use crate::device::RenderDevice;
use crate::error::{EngineError, Result};
use crate::render::{DeferredRenderer, Extent, FrameReport};
use crate::resources::Resources;
use crate::scene::{ImageData, Mesh, MeshData, Model, Scene, Texture};
use crate::shader::build_standard_programs;
use crate::time::FrameClock;

use super::Lifecycle;

/// Platform-facing engine object.
///
/// Owns the device, the resource registry, the scene and the renderer. The
/// host calls `init` once, `reshape` whenever the viewport changes, `render`
/// once per frame and `cleanup` at the end. Calls out of that order fail with
/// `EngineError::Lifecycle` and change nothing.
pub struct Engine<D: RenderDevice> {
    device: D,
    config: EngineConfig,
    resources: Resources<D>,
    scene: Scene,
    renderer: Option<DeferredRenderer<D>>,
    clock: FrameClock,
    extent: Extent,
    lifecycle: Lifecycle,
}

impl<D: RenderDevice> Engine<D> {
    pub fn new(device: D, config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let extent = config.initial_extent;
        let mut scene = Scene::new(config.budget.num_lights as usize);
        scene.camera.set_aspect(extent.width, extent.height);

        log::info!(
            "engine created on {} ({extent}, NUM_LIGHTS={}, NUM_VPL={})",
            device.backend_name(),
            config.budget.num_lights,
            config.budget.num_vpl
        );

        Ok(Self {
            device,
            config,
            resources: Resources::new(),
            scene,
            renderer: None,
            clock: FrameClock::new(),
            extent,
            lifecycle: Lifecycle::Created,
        })
    }

    fn require(&self, operation: &'static str, state: Lifecycle) -> Result<()> {
        if self.lifecycle == state {
            Ok(())
        } else {
            Err(EngineError::Lifecycle {
                operation,
                state: self.lifecycle,
            })
        }
    }

    fn require_live(&self, operation: &'static str) -> Result<()> {
        if self.lifecycle == Lifecycle::CleanedUp {
            return Err(EngineError::Lifecycle {
                operation,
                state: self.lifecycle,
            });
        }
        Ok(())
    }

    // ── lifecycle ───────────────────────────────────────────────────────────

    /// Builds the standard shader programs and allocates every render target.
    ///
    /// Any failure is fatal: the engine stays `Created` and nothing is drawn
    /// with a placeholder.
    pub fn init(&mut self, assets: &dyn AssetSource) -> Result<()> {
        self.require("init", Lifecycle::Created)?;

        build_standard_programs(
            &mut self.device,
            assets,
            self.config.budget,
            &mut self.resources.shaders,
        )?;

        self.device.resize_surface(self.extent);
        self.renderer = Some(DeferredRenderer::new(
            &mut self.device,
            &self.config,
            self.extent,
        ));
        self.clock = FrameClock::new();
        self.lifecycle = Lifecycle::Ready;
        log::info!("engine ready at {}", self.extent);
        Ok(())
    }

    /// Resizes the viewport-sized targets and the surface.
    ///
    /// Zero sizes (minimized windows) and repeats of the current size are
    /// ignored, so spurious calls are harmless.
    pub fn reshape(&mut self, width: u32, height: u32) -> Result<()> {
        self.require("reshape", Lifecycle::Ready)?;

        let extent = Extent::new(width, height);
        if extent.is_empty() {
            log::debug!("ignoring reshape to {extent}");
            return Ok(());
        }
        if extent == self.extent {
            log::debug!("reshape to current size {extent}");
            return Ok(());
        }

        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize(&mut self.device, extent)?;
        }
        self.device.resize_surface(extent);
        self.scene.camera.set_aspect(width, height);
        self.extent = extent;
        log::info!("reshaped to {extent}");
        Ok(())
    }

    /// Advances the clock, updates the scene and renders one frame.
    pub fn render(&mut self) -> Result<FrameReport> {
        self.render_at(Instant::now())
    }

    /// `render` with an explicit timestamp.
    pub fn render_at(&mut self, now: Instant) -> Result<FrameReport> {
        self.require("render", Lifecycle::Ready)?;
        let Some(renderer) = self.renderer.as_mut() else {
            return Err(EngineError::Lifecycle {
                operation: "render",
                state: self.lifecycle,
            });
        };

        let time = self.clock.tick_at(now);
        self.scene.update(time.dt);
        renderer.render_frame(&mut self.device, &self.resources, &self.scene, time)
    }

    /// Releases every registered resource and the render targets.
    ///
    /// Calling it again, or before `init`, is allowed.
    pub fn cleanup(&mut self) {
        if self.lifecycle == Lifecycle::CleanedUp {
            log::debug!("cleanup: already cleaned up");
            return;
        }
        self.renderer = None;
        self.resources.cleanup();
        self.lifecycle = Lifecycle::CleanedUp;
        log::info!("engine cleaned up");
    }

    // ── resources ───────────────────────────────────────────────────────────

    /// Uploads a mesh and registers it under `name`, replacing any previous
    /// mesh of that name.
    pub fn add_mesh(&mut self, name: &str, data: MeshData) -> Result<Arc<Mesh<D>>> {
        self.require_live("add_mesh")?;
        let mesh = Arc::new(Mesh::upload(&mut self.device, name, data)?);
        self.resources.meshes.add(name, Arc::clone(&mesh));
        Ok(mesh)
    }

    pub fn create_texture(&mut self, name: &str, image: &ImageData) -> Result<Arc<Texture<D>>> {
        self.require_live("create_texture")?;
        let texture = Arc::new(Texture::upload(&mut self.device, name, image)?);
        self.resources.textures.add(name, Arc::clone(&texture));
        Ok(texture)
    }

    pub fn add_model(&mut self, name: &str, model: Model<D>) -> Result<Arc<Model<D>>> {
        self.require_live("add_model")?;
        let model = Arc::new(model);
        self.resources.models.add(name, Arc::clone(&model));
        Ok(model)
    }

    /// Loads an OBJ/MTL model and registers it with its meshes.
    pub fn load_obj_model(
        &mut self,
        assets: &dyn AssetSource,
        obj_path: &str,
        name: &str,
    ) -> Result<Arc<Model<D>>> {
        self.require_live("load_obj_model")?;
        assets::obj::load_model(&mut self.device, assets, obj_path, name, &mut self.resources)
    }

    /// Registers every `extension` image in `dir` as `prefix + file name`.
    pub fn load_textures(
        &mut self,
        assets: &dyn AssetSource,
        dir: &str,
        extension: &str,
        prefix: &str,
    ) -> Result<Vec<String>> {
        self.require_live("load_textures")?;
        assets::textures::load_textures(
            &mut self.device,
            assets,
            dir,
            extension,
            prefix,
            &mut self.resources.textures,
        )
    }

    // ── accessors ───────────────────────────────────────────────────────────

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn resources(&self) -> &Resources<D> {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut Resources<D> {
        &mut self.resources
    }

    /// Split borrow for loaders that upload and register in one go.
    pub fn device_and_resources(&mut self) -> (&mut D, &mut Resources<D>) {
        (&mut self.device, &mut self.resources)
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Replaces the scene, keeping the camera aspect in sync with the viewport.
    pub fn set_scene(&mut self, mut scene: Scene) {
        scene
            .camera
            .set_aspect(self.extent.width, self.extent.height);
        self.scene = scene;
    }

    /// `None` until `init` and after `cleanup`.
    pub fn renderer(&self) -> Option<&DeferredRenderer<D>> {
        self.renderer.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use glam::{Mat4, Vec3};

    use super::*;
    use crate::assets::EmbeddedShaders;
    use crate::device::SoftwareDevice;
    use crate::render::FramePhase;
    use crate::resources::Category;
    use crate::scene::demo::cornell_box;
    use crate::scene::Light;
    use crate::shader::ShaderBudget;

    fn small_config() -> EngineConfig {
        EngineConfig {
            budget: ShaderBudget {
                num_lights: 2,
                num_vpl: 16,
            },
            rsm_resolution: 16,
            initial_extent: Extent::new(16, 12),
            ..Default::default()
        }
    }

    fn ready_engine() -> Engine<SoftwareDevice> {
        let mut engine = Engine::new(SoftwareDevice::new(), small_config()).unwrap();
        let (device, resources) = engine.device_and_resources();
        let scene = cornell_box(device, resources, 2).unwrap();
        engine.set_scene(scene);
        engine.init(&EmbeddedShaders).unwrap();
        engine
    }

    fn lifecycle_error(result: Result<impl Sized>) -> (&'static str, Lifecycle) {
        match result {
            Err(EngineError::Lifecycle { operation, state }) => (operation, state),
            Err(other) => panic!("expected a lifecycle error, got {other}"),
            Ok(_) => panic!("expected a lifecycle error, got Ok"),
        }
    }

    // ── lifecycle ───────────────────────────────────────────────────────────

    #[test]
    fn calls_before_init_are_rejected() {
        let mut engine = Engine::new(SoftwareDevice::new(), small_config()).unwrap();
        assert_eq!(engine.lifecycle(), Lifecycle::Created);
        assert_eq!(
            lifecycle_error(engine.reshape(10, 10)),
            ("reshape", Lifecycle::Created)
        );
        assert_eq!(
            lifecycle_error(engine.render()),
            ("render", Lifecycle::Created)
        );
        assert!(engine.renderer().is_none());
    }

    #[test]
    fn init_runs_once() {
        let mut engine = ready_engine();
        assert_eq!(engine.lifecycle(), Lifecycle::Ready);
        assert_eq!(
            lifecycle_error(engine.init(&EmbeddedShaders)),
            ("init", Lifecycle::Ready)
        );
        assert_eq!(engine.resources().shaders.len(), 5);
    }

    #[test]
    fn cleanup_is_idempotent_and_terminal() {
        let mut engine = ready_engine();
        engine.cleanup();
        assert!(engine.resources().is_empty());
        assert!(engine.renderer().is_none());

        engine.cleanup();
        assert_eq!(engine.lifecycle(), Lifecycle::CleanedUp);
        assert_eq!(
            lifecycle_error(engine.render()),
            ("render", Lifecycle::CleanedUp)
        );
        assert_eq!(
            lifecycle_error(engine.init(&EmbeddedShaders)),
            ("init", Lifecycle::CleanedUp)
        );
        assert!(engine.add_mesh("late", crate::scene::primitives::quad()).is_err());
    }

    #[test]
    fn failed_init_leaves_engine_created() {
        let mut engine = Engine::new(SoftwareDevice::new(), small_config()).unwrap();
        let err = engine.init(&assets::MemoryAssetSource::new()).unwrap_err();
        assert!(matches!(err, EngineError::AssetNotFound { .. }));
        assert_eq!(engine.lifecycle(), Lifecycle::Created);
    }

    #[test]
    fn failed_init_registers_no_programs() {
        let mut assets = assets::MemoryAssetSource::new();
        for path in [
            "shaders/gbuffer.vs.wgsl",
            "shaders/gbuffer.fs.wgsl",
            "shaders/rsm.vs.wgsl",
            "shaders/rsm.fs.wgsl",
        ] {
            assets.insert(path, EmbeddedShaders.source(path).unwrap());
        }

        let mut engine = Engine::new(SoftwareDevice::new(), small_config()).unwrap();
        let err = engine.init(&assets).unwrap_err();
        assert!(matches!(err, EngineError::AssetNotFound { path } if path == "shaders/fullscreen.vs.wgsl"));
        assert_eq!(engine.lifecycle(), Lifecycle::Created);
        assert!(engine.resources().shaders.is_empty());

        engine.init(&EmbeddedShaders).unwrap();
        assert_eq!(engine.lifecycle(), Lifecycle::Ready);
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let mut config = small_config();
        config.rsm_resolution = 0;
        assert!(Engine::new(SoftwareDevice::new(), config).is_err());
    }

    // ── timing ──────────────────────────────────────────────────────────────

    #[test]
    fn long_stalls_advance_the_scene_by_a_quarter_second() {
        let mut engine = ready_engine();
        let t0 = Instant::now();
        engine.render_at(t0).unwrap();
        let before = engine.scene().elapsed();

        let report = engine.render_at(t0 + Duration::from_secs(1)).unwrap();
        assert_eq!(report.dt, 0.25);
        assert!((engine.scene().elapsed() - before - 0.25).abs() < 1e-6);
    }

    #[test]
    fn repeated_timestamps_use_the_minimum_step() {
        let mut engine = ready_engine();
        let t0 = Instant::now();
        engine.render_at(t0).unwrap();
        let report = engine.render_at(t0).unwrap();
        assert_eq!(report.dt, FrameClock::DEFAULT_DT_MIN.as_secs_f32());
        assert_eq!(report.frame_index, 1);
    }

    // ── reshape ─────────────────────────────────────────────────────────────

    #[test]
    fn reshape_between_renders_reallocates_targets() {
        let mut engine = ready_engine();
        engine.render().unwrap();

        engine.reshape(24, 18).unwrap();
        let renderer = engine.renderer().unwrap();
        assert_eq!(renderer.gbuffer().extent(), Extent::new(24, 18));
        assert_eq!(renderer.accumulation().extent(), Extent::new(24, 18));
        assert_eq!(engine.device().surface_extent(), Extent::new(24, 18));
        assert!((engine.scene().camera.aspect - 24.0 / 18.0).abs() < 1e-6);

        let report = engine.render().unwrap();
        assert!(report.presented);
        assert_eq!(engine.device().presented_extent(), Extent::new(24, 18));
    }

    #[test]
    fn zero_and_repeated_reshapes_change_nothing() {
        let mut engine = ready_engine();
        engine.reshape(0, 40).unwrap();
        engine.reshape(16, 12).unwrap();
        engine.reshape(16, 12).unwrap();
        assert_eq!(engine.extent(), Extent::new(16, 12));
        assert_eq!(
            engine.renderer().unwrap().gbuffer().extent(),
            Extent::new(16, 12)
        );
        assert!(engine.render().unwrap().presented);
    }

    // ── frames ──────────────────────────────────────────────────────────────

    #[test]
    fn cornell_box_frame_runs_every_pass() {
        let mut engine = ready_engine();
        let report = engine.render().unwrap();

        assert!(report.presented);
        assert_eq!(report.draws, 7);
        assert_eq!(report.rsm_passes, 1);
        assert_eq!(report.indirect_passes, 1);
        assert!(report.skipped_lights.is_empty());

        let image = engine.device().presented().unwrap();
        assert_eq!(image.len(), 16 * 12);
        assert!(image.iter().flatten().all(|c| c.is_finite()));
        assert!(image.iter().any(|c| c[0] + c[1] + c[2] > 0.0));
        assert_eq!(engine.device().stats().frames_presented, 1);
    }

    #[test]
    fn point_lights_get_no_bounce() {
        let mut engine = ready_engine();
        engine
            .scene_mut()
            .lights
            .push(Light::point(Vec3::new(0.0, 1.5, 0.5), Vec3::ONE, 0.5))
            .unwrap();

        let report = engine.render().unwrap();
        assert_eq!(report.rsm_passes, 1);
        assert_eq!(report.indirect_passes, 1);
        assert_eq!(report.skipped_lights, [1]);
    }

    #[test]
    fn unknown_model_fails_the_frame_and_recovers() {
        let mut engine = ready_engine();
        engine.scene_mut().add_instance("missing", Mat4::IDENTITY);

        let err = engine.render().unwrap_err();
        assert!(matches!(
            err,
            EngineError::ResourceNotFound { category: Category::Model, ref name } if name == "missing"
        ));
        assert_eq!(engine.renderer().unwrap().phase(), FramePhase::Idle);

        engine.scene_mut().instances.pop();
        assert!(engine.render().unwrap().presented);
    }

    #[test]
    fn registered_resources_are_shared_not_copied() {
        let mut engine = ready_engine();
        let mesh = engine
            .add_mesh("quad", crate::scene::primitives::quad())
            .unwrap();
        assert!(Arc::ptr_eq(
            engine.resources().meshes.get("quad").unwrap(),
            &mesh
        ));

        let model = engine
            .add_model("quad", Model::single(mesh, Default::default()))
            .unwrap();
        assert_eq!(Arc::strong_count(&model), 2);
        engine.cleanup();
        assert_eq!(Arc::strong_count(&model), 1);
    }
}
