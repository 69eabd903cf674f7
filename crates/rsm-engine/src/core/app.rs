use crate::assets::AssetSource;
use crate::device::WgpuDevice;
use crate::render::FrameReport;

use super::Engine;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by hosts of the windowed runtime.
pub trait App {
    /// Called once after the engine is initialized, before the first frame.
    ///
    /// Register meshes, models and textures and build the scene here.
    fn setup(&mut self, engine: &mut Engine<WgpuDevice>, assets: &dyn AssetSource)
        -> anyhow::Result<()>;

    /// Called after every rendered (or skipped) frame.
    fn on_frame(&mut self, engine: &mut Engine<WgpuDevice>, report: &FrameReport) -> AppControl {
        let _ = (engine, report);
        AppControl::Continue
    }
}
