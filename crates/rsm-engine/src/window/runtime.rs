use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::assets::AssetSource;
use crate::config::EngineConfig;
use crate::core::{App, AppControl, Engine, Lifecycle};
use crate::device::{Gpu, GpuInit, WgpuDevice};
use crate::render::Extent;
use crate::time::{title_with_fps, FpsCounter};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "RSM".to_string(),
            initial_size: LogicalSize::new(1600.0, 900.0),
        }
    }
}

/// Entry point for the runtime.
///
/// Opens one window, drives `init`, `reshape`, `render` and `cleanup` from the
/// winit event loop and returns the first fatal error, if any.
pub struct Runtime;

impl Runtime {
    pub fn run<A>(
        config: RuntimeConfig,
        gpu_init: GpuInit,
        engine_config: EngineConfig,
        assets: Box<dyn AssetSource>,
        app: A,
    ) -> Result<()>
    where
        A: 'static + App,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState {
            config,
            gpu_init,
            engine_config,
            assets,
            app,
            live: None,
            error: None,
        };

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

struct Live {
    window: Arc<Window>,
    engine: Engine<WgpuDevice>,
    fps: FpsCounter,
}

struct AppState<A> {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    engine_config: EngineConfig,
    assets: Box<dyn AssetSource>,
    app: A,
    live: Option<Live>,
    error: Option<anyhow::Error>,
}

impl<A: App> AppState<A> {
    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<Live> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let gpu = pollster::block_on(Gpu::new(window.clone(), self.gpu_init.clone()))
            .context("failed to initialize GPU")?;
        let device = WgpuDevice::new(gpu);

        let mut engine_config = self.engine_config.clone();
        let extent = device.surface_extent();
        if !extent.is_empty() {
            engine_config.initial_extent = extent;
        }

        let mut engine = Engine::new(device, engine_config).context("invalid engine configuration")?;
        engine
            .init(self.assets.as_ref())
            .context("engine initialization failed")?;
        self.app
            .setup(&mut engine, self.assets.as_ref())
            .context("application setup failed")?;

        Ok(Live {
            window,
            engine,
            fps: FpsCounter::new(Instant::now()),
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
        self.shutdown(event_loop);
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(live) = self.live.as_mut() {
            live.engine.cleanup();
        }
        event_loop.exit();
    }

    fn reshape(&mut self, size: PhysicalSize<u32>) {
        let Some(live) = self.live.as_mut() else {
            return;
        };
        if let Err(err) = live.engine.reshape(size.width, size.height) {
            log::warn!("reshape to {}x{} failed: {err}", size.width, size.height);
        }
        live.window.request_redraw();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(live) = self.live.as_mut() else {
            return;
        };
        if live.engine.lifecycle() != Lifecycle::Ready {
            return;
        }

        let report = match live.engine.render() {
            Ok(report) => report,
            Err(err) => {
                let err = anyhow::Error::new(err).context("frame failed");
                self.fail(event_loop, err);
                return;
            }
        };

        if let Some(fps) = live.fps.frame(Instant::now()) {
            let Extent { width, height } = live.engine.extent();
            live.window
                .set_title(&title_with_fps(&self.config.title, fps, width, height));
        }

        if self.app.on_frame(&mut live.engine, &report) == AppControl::Exit {
            self.shutdown(event_loop);
        }
    }
}

impl<A: App> ApplicationHandler for AppState<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.live.is_some() {
            return;
        }

        match self.start(event_loop) {
            Ok(live) => {
                live.window.request_redraw();
                self.live = Some(live);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);
        if event_loop.exiting() {
            return;
        }
        if let Some(live) = &self.live {
            live.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.live.as_ref().map(|l| l.window.id()) != Some(window_id) {
            return;
        }

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => self.shutdown(event_loop),
            WindowEvent::Resized(size) => self.reshape(size),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.live.as_ref().map(|l| l.window.inner_size()) {
                    self.reshape(size);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(live) = self.live.as_mut() {
            live.engine.cleanup();
        }
    }
}
