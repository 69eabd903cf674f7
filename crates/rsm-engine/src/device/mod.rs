//! Render device seam.
//!
//! `RenderDevice` is the boundary between the pass logic and a graphics API.
//! Two implementations ship with the crate:
//! - `WgpuDevice`: wgpu on a winit surface
//! - `SoftwareDevice`: a CPU rasterizer producing the same attachments, used
//!   to run the pipeline deterministically in tests

mod error;
mod frame;
mod gpu;
mod gpu_device;
mod init;
mod raster;
mod software;
mod surface;

use crate::error::Result;
use crate::render::{DrawUniform, Extent, LightingUniforms, TargetLayout, ViewUniform};
use crate::scene::{ImageData, MeshData};
use crate::shader::{ProgramInterface, ShaderStage, StageInterface};

pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use gpu_device::{WgpuDevice, WgpuMesh, WgpuProgram, WgpuStage, WgpuTarget, WgpuTexture};
pub use init::GpuInit;
pub use software::{
    SoftMesh, SoftProgram, SoftStage, SoftTarget, SoftTexture, SoftwareDevice, SoftwareStats,
};

/// One mesh draw inside a geometry pass.
pub struct GeometryDraw<'a, D: RenderDevice + ?Sized> {
    pub mesh: &'a D::Mesh,
    pub texture: Option<&'a D::Texture>,
    pub uniform: DrawUniform,
}

/// Rasterizes meshes into a G-buffer or RSM target.
pub struct GeometryPass<'a, D: RenderDevice + ?Sized> {
    pub label: &'a str,
    pub program: &'a D::Program,
    pub target: &'a D::Target,
    /// Clear every attachment to zero and depth to 1.0 before drawing.
    pub clear: bool,
    pub view: ViewUniform,
    pub draws: &'a [GeometryDraw<'a, D>],
}

/// Fullscreen pass reading the G-buffer (and one RSM for indirect light).
///
/// Direct-lighting programs clear and replace the target; indirect programs
/// add into it.
pub struct LightingPass<'a, D: RenderDevice + ?Sized> {
    pub label: &'a str,
    pub program: &'a D::Program,
    pub target: &'a D::Target,
    pub gbuffer: &'a D::Target,
    pub rsm: Option<&'a D::Target>,
    pub uniforms: &'a LightingUniforms,
}

pub trait RenderDevice {
    type Stage;
    type Program;
    type Mesh;
    type Texture;
    type Target;

    fn backend_name(&self) -> &'static str;

    /// Turns validated WGSL into a device stage. Errors are diagnostics.
    fn compile_stage(
        &mut self,
        stage: ShaderStage,
        label: &str,
        source: &str,
        interface: &StageInterface,
    ) -> std::result::Result<Self::Stage, String>;

    fn link_program(
        &mut self,
        label: &str,
        interface: ProgramInterface,
        vertex: &Self::Stage,
        fragment: &Self::Stage,
    ) -> std::result::Result<Self::Program, String>;

    fn create_mesh(&mut self, label: &str, data: &MeshData) -> Self::Mesh;

    fn create_texture(&mut self, label: &str, image: &ImageData) -> Self::Texture;

    fn create_target(&mut self, label: &str, layout: TargetLayout, extent: Extent) -> Self::Target;

    fn resize_surface(&mut self, extent: Extent);

    /// Starts recording a frame. `Ok(false)` means skip this frame.
    fn begin_frame(&mut self) -> Result<bool>;

    fn geometry_pass(&mut self, pass: GeometryPass<'_, Self>) -> Result<()>;

    fn lighting_pass(&mut self, pass: LightingPass<'_, Self>) -> Result<()>;

    /// Writes `source` to the presentation surface and ends the frame.
    fn present(&mut self, program: &Self::Program, source: &Self::Target) -> Result<()>;

    /// Drops whatever the current frame recorded.
    fn abort_frame(&mut self) {}
}
