/// A surface texture acquired for one frame plus the encoder recording it.
///
/// Holding the surface texture blocks acquisition of the next one, so the frame
/// must be submitted or dropped before the next `begin_frame`.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}
