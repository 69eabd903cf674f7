use std::process::ExitCode;

use anyhow::Context;
use glam::{Mat4, Vec3};
use rsm_engine::assets::{AssetSource, DirAssetSource, EmbeddedShaders, Layered};
use rsm_engine::core::{App, AppControl};
use rsm_engine::device::{GpuInit, WgpuDevice};
use rsm_engine::logging::{init_logging, LoggingConfig};
use rsm_engine::scene::demo;
use rsm_engine::window::{Runtime, RuntimeConfig};
use rsm_engine::{Engine, EngineConfig, EngineError, FrameReport};

/// Directory scanned for `.png` textures at startup.
const TEXTURE_DIR: &str = "textures";

/// Cornell box with an orbiting spot light, plus an optional OBJ model given
/// on the command line (`rsm-studio path/to/model.obj`).
struct Studio {
    model_path: Option<String>,
    frame_limit: Option<u64>,
}

impl App for Studio {
    fn setup(
        &mut self,
        engine: &mut Engine<WgpuDevice>,
        assets: &dyn AssetSource,
    ) -> anyhow::Result<()> {
        match engine.load_textures(assets, TEXTURE_DIR, "png", "") {
            Ok(names) => log::info!("loaded {} textures from {TEXTURE_DIR}/", names.len()),
            Err(EngineError::AssetNotFound { .. }) => {
                log::debug!("no {TEXTURE_DIR}/ directory, skipping textures")
            }
            Err(err) => return Err(err).context("loading textures"),
        }

        let light_capacity = engine.config().budget.num_lights as usize;
        let (device, resources) = engine.device_and_resources();
        let mut scene = demo::cornell_box(device, resources, light_capacity)
            .context("building the Cornell box")?;
        scene.orbits.push(demo::cornell_orbit(0));

        if let Some(path) = &self.model_path {
            engine
                .load_obj_model(assets, path, "user")
                .with_context(|| format!("loading {path}"))?;
            scene.add_instance(
                "user",
                Mat4::from_scale_rotation_translation(
                    Vec3::splat(0.3),
                    glam::Quat::IDENTITY,
                    Vec3::new(0.0, 0.0, 0.3),
                ),
            );
        }

        engine.set_scene(scene);
        Ok(())
    }

    fn on_frame(&mut self, _engine: &mut Engine<WgpuDevice>, report: &FrameReport) -> AppControl {
        if !report.skipped_lights.is_empty() && report.frame_index == 0 {
            log::info!("indirect light skipped for slots {:?}", report.skipped_lights);
        }
        match self.frame_limit {
            Some(limit) if report.frame_index + 1 >= limit => AppControl::Exit,
            _ => AppControl::Continue,
        }
    }
}

fn main() -> ExitCode {
    init_logging(LoggingConfig::default());

    let studio = Studio {
        model_path: std::env::args().nth(1),
        frame_limit: std::env::var("RSM_FRAME_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok()),
    };

    let assets = Layered::new()
        .with(DirAssetSource::new("assets"))
        .with(EmbeddedShaders);

    let result = Runtime::run(
        RuntimeConfig::default(),
        GpuInit::default().with_vsync(std::env::var_os("RSM_NO_VSYNC").is_none()),
        EngineConfig::default(),
        Box::new(assets),
        studio,
    );

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
