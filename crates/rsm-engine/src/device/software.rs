use std::cell::{Ref, RefCell};

use glam::{Vec2, Vec3, Vec4};

use crate::error::{EngineError, Result};
use crate::render::{
    attachment, shading, Extent, LightingUniforms, SurfaceSample, TargetLayout, VplSample,
};
use crate::scene::{ImageData, MeshData, Vertex};
use crate::shader::{ProgramInterface, ShaderStage, StageInterface};

use super::raster::{rasterize_triangle, ClipVertex, Fragment};
use super::{GeometryPass, LightingPass, RenderDevice};

#[derive(Debug, Clone)]
pub struct SoftStage {
    pub stage: ShaderStage,
    pub label: String,
    pub entry_point: String,
}

#[derive(Debug, Clone)]
pub struct SoftProgram {
    pub label: String,
    pub interface: ProgramInterface,
}

#[derive(Debug, Clone)]
pub struct SoftMesh {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct SoftTexture {
    image: ImageData,
}

impl SoftTexture {
    /// Nearest-texel lookup with repeat wrapping, returned in linear space.
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        let (w, h) = (self.image.width, self.image.height);
        let u = uv.x - uv.x.floor();
        let v = uv.y - uv.y.floor();
        let x = ((u * w as f32) as u32).min(w - 1);
        let y = ((v * h as f32) as u32).min(h - 1);
        let [r, g, b, a] = self.image.texel(x, y);
        Vec4::new(srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b), a as f32 / 255.0)
    }
}

fn srgb_to_linear(c: u8) -> f32 {
    let c = c as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// CPU render target. Every attachment is stored as `[f32; 4]` texels.
#[derive(Debug)]
pub struct SoftTarget {
    label: String,
    layout: TargetLayout,
    extent: Extent,
    colors: Vec<RefCell<Vec<[f32; 4]>>>,
    depth: Option<RefCell<Vec<f32>>>,
}

impl SoftTarget {
    fn new(label: &str, layout: TargetLayout, extent: Extent) -> Self {
        let n = extent.texel_count();
        Self {
            label: label.to_owned(),
            layout,
            extent,
            colors: layout
                .colors
                .iter()
                .map(|_| RefCell::new(vec![[0.0; 4]; n]))
                .collect(),
            depth: layout.depth.then(|| RefCell::new(vec![1.0; n])),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn layout(&self) -> TargetLayout {
        self.layout
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Copy of one color attachment, row-major from the top-left texel.
    pub fn color(&self, attachment: usize) -> Vec<[f32; 4]> {
        self.colors[attachment].borrow().clone()
    }

    pub fn texel(&self, attachment: usize, x: u32, y: u32) -> [f32; 4] {
        let i = y as usize * self.extent.width as usize + x as usize;
        self.colors[attachment].borrow()[i]
    }

    pub fn depth(&self) -> Option<Vec<f32>> {
        self.depth.as_ref().map(|d| d.borrow().clone())
    }

    fn attachment(&self, index: usize) -> Ref<'_, Vec<[f32; 4]>> {
        self.colors[index].borrow()
    }

    fn clear(&self) {
        for color in &self.colors {
            color.borrow_mut().fill([0.0; 4]);
        }
        if let Some(depth) = &self.depth {
            depth.borrow_mut().fill(1.0);
        }
    }
}

/// Counters for what the device has executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoftwareStats {
    pub frames_begun: u64,
    pub frames_presented: u64,
    pub geometry_passes: u64,
    pub lighting_passes: u64,
    pub triangles: u64,
}

/// Reference device that executes every pass on the CPU.
///
/// Shading follows `render::shading`, the Rust mirror of the WGSL lighting
/// programs. Output is deterministic, which makes it the device tests run on.
#[derive(Debug)]
pub struct SoftwareDevice {
    surface: Extent,
    frame_open: bool,
    presented: Option<Vec<[f32; 4]>>,
    presented_extent: Extent,
    stats: SoftwareStats,
}

impl SoftwareDevice {
    pub fn new() -> Self {
        Self::with_surface(Extent::new(1, 1))
    }

    pub fn with_surface(surface: Extent) -> Self {
        Self {
            surface,
            frame_open: false,
            presented: None,
            presented_extent: Extent::new(0, 0),
            stats: SoftwareStats::default(),
        }
    }

    pub fn surface_extent(&self) -> Extent {
        self.surface
    }

    /// Last image written by `present`, clamped to 0..1.
    pub fn presented(&self) -> Option<&[[f32; 4]]> {
        self.presented.as_deref()
    }

    pub fn presented_extent(&self) -> Extent {
        self.presented_extent
    }

    pub fn stats(&self) -> SoftwareStats {
        self.stats
    }

    fn require_open_frame(&self, pass: &'static str) -> Result<()> {
        if self.frame_open {
            Ok(())
        } else {
            Err(EngineError::mismatch(pass, "an open frame", "no frame"))
        }
    }
}

impl Default for SoftwareDevice {
    fn default() -> Self {
        Self::new()
    }
}

fn check_target(pass: &'static str, program: &SoftProgram, target: &SoftTarget) -> Result<()> {
    let expected = program.interface.target();
    if target.layout != expected {
        return Err(EngineError::mismatch(
            pass,
            expected.to_string(),
            target.layout.to_string(),
        ));
    }
    Ok(())
}

impl RenderDevice for SoftwareDevice {
    type Stage = SoftStage;
    type Program = SoftProgram;
    type Mesh = SoftMesh;
    type Texture = SoftTexture;
    type Target = SoftTarget;

    fn backend_name(&self) -> &'static str {
        "software"
    }

    fn compile_stage(
        &mut self,
        stage: ShaderStage,
        label: &str,
        _source: &str,
        interface: &StageInterface,
    ) -> std::result::Result<SoftStage, String> {
        Ok(SoftStage {
            stage,
            label: label.to_owned(),
            entry_point: interface.entry_point.clone(),
        })
    }

    fn link_program(
        &mut self,
        label: &str,
        interface: ProgramInterface,
        vertex: &SoftStage,
        fragment: &SoftStage,
    ) -> std::result::Result<SoftProgram, String> {
        if vertex.stage != ShaderStage::Vertex || fragment.stage != ShaderStage::Fragment {
            return Err(format!(
                "stages attached in the wrong slots ('{}', '{}')",
                vertex.label, fragment.label
            ));
        }
        Ok(SoftProgram {
            label: label.to_owned(),
            interface,
        })
    }

    fn create_mesh(&mut self, _label: &str, data: &MeshData) -> SoftMesh {
        SoftMesh {
            vertices: data.vertices.clone(),
            indices: data.indices.clone(),
        }
    }

    fn create_texture(&mut self, _label: &str, image: &ImageData) -> SoftTexture {
        SoftTexture {
            image: image.clone(),
        }
    }

    fn create_target(&mut self, label: &str, layout: TargetLayout, extent: Extent) -> SoftTarget {
        SoftTarget::new(label, layout, extent)
    }

    fn resize_surface(&mut self, extent: Extent) {
        self.surface = extent;
    }

    fn begin_frame(&mut self) -> Result<bool> {
        self.frame_open = true;
        self.stats.frames_begun += 1;
        Ok(true)
    }

    fn geometry_pass(&mut self, pass: GeometryPass<'_, Self>) -> Result<()> {
        const NAME: &str = "geometry pass";
        self.require_open_frame(NAME)?;

        let interface = pass.program.interface;
        if !interface.reads_vertex_buffers() {
            return Err(EngineError::mismatch(
                NAME,
                "a geometry or shadow-map program",
                format!("'{}' ({interface})", pass.program.label),
            ));
        }
        check_target(NAME, pass.program, pass.target)?;

        let target = pass.target;
        if pass.clear {
            target.clear();
        }

        let Some(depth_cell) = &target.depth else {
            return Err(EngineError::mismatch(NAME, "a depth attachment", "none"));
        };
        let mut depth = depth_cell.borrow_mut();
        let mut position = target.colors[attachment::POSITION].borrow_mut();
        let mut normal = target.colors[attachment::NORMAL].borrow_mut();
        let mut third = target.colors[attachment::ALBEDO].borrow_mut();

        let view_proj = pass.view.view_proj();
        let light_position = Vec4::from(pass.view.light_position).truncate();
        let light_direction = Vec4::from(pass.view.light_direction);
        let light_color = Vec4::from(pass.view.light_color).truncate();

        for draw in pass.draws {
            let model = draw.uniform.model();
            let normal_matrix = draw.uniform.normal_matrix();
            let diffuse = Vec4::from(draw.uniform.diffuse).truncate();
            let [specular, shininess, _, _] = draw.uniform.material;
            let texture = draw.texture.filter(|_| draw.uniform.textured());

            let transformed: Vec<ClipVertex> = draw
                .mesh
                .vertices
                .iter()
                .map(|v| {
                    let world = model.transform_point3(Vec3::from(v.position));
                    ClipVertex {
                        clip: view_proj * world.extend(1.0),
                        world,
                        normal: normal_matrix.transform_vector3(Vec3::from(v.normal)),
                        uv: Vec2::from(v.uv),
                    }
                })
                .collect();

            for tri in draw.mesh.indices.chunks_exact(3) {
                let tri = [
                    transformed[tri[0] as usize],
                    transformed[tri[1] as usize],
                    transformed[tri[2] as usize],
                ];
                self.stats.triangles += 1;

                rasterize_triangle(target.extent, &tri, &mut depth, |i, frag: Fragment| {
                    let albedo = match texture {
                        Some(t) => diffuse * t.sample(frag.uv).truncate(),
                        None => diffuse,
                    };
                    let n = frag.normal.normalize_or_zero();
                    position[i] = frag.world.extend(1.0).to_array();

                    match interface {
                        ProgramInterface::ShadowMap => {
                            let to_surface = (frag.world - light_position).normalize_or_zero();
                            let spot = shading::spot_factor(
                                light_direction.truncate(),
                                light_direction.w,
                                to_surface,
                            );
                            normal[i] = n.extend(0.0).to_array();
                            third[i] = (albedo * light_color * spot).extend(1.0).to_array();
                        }
                        _ => {
                            normal[i] = n.extend(specular).to_array();
                            third[i] = albedo.extend(shininess).to_array();
                        }
                    }
                });
            }
        }

        self.stats.geometry_passes += 1;
        Ok(())
    }

    fn lighting_pass(&mut self, pass: LightingPass<'_, Self>) -> Result<()> {
        const NAME: &str = "lighting pass";
        self.require_open_frame(NAME)?;
        check_target(NAME, pass.program, pass.target)?;

        if pass.gbuffer.layout != TargetLayout::GBUFFER {
            return Err(EngineError::mismatch(
                NAME,
                TargetLayout::GBUFFER.to_string(),
                pass.gbuffer.layout.to_string(),
            ));
        }
        if pass.gbuffer.extent != pass.target.extent {
            return Err(EngineError::mismatch(
                NAME,
                format!("g-buffer of {}", pass.target.extent),
                pass.gbuffer.extent.to_string(),
            ));
        }

        let g_position = pass.gbuffer.attachment(attachment::POSITION);
        let g_normal = pass.gbuffer.attachment(attachment::NORMAL);
        let g_albedo = pass.gbuffer.attachment(attachment::ALBEDO);
        let mut out = pass.target.colors[0].borrow_mut();

        match (pass.program.interface, pass.uniforms) {
            (ProgramInterface::DirectLighting, LightingUniforms::Direct { header, lights }) => {
                for i in 0..out.len() {
                    out[i] = match SurfaceSample::decode(g_position[i], g_normal[i], g_albedo[i]) {
                        Some(surface) => shading::direct_lighting(&surface, header, lights)
                            .extend(1.0)
                            .to_array(),
                        None => [0.0; 4],
                    };
                }
            }
            (
                ProgramInterface::IndirectIllumination,
                LightingUniforms::Indirect { header, samples },
            ) => {
                let Some(rsm) = pass.rsm else {
                    return Err(EngineError::mismatch(NAME, "an RSM input", "none"));
                };
                if rsm.layout != TargetLayout::RSM {
                    return Err(EngineError::mismatch(
                        NAME,
                        TargetLayout::RSM.to_string(),
                        rsm.layout.to_string(),
                    ));
                }
                let r_position = rsm.attachment(attachment::POSITION);
                let r_normal = rsm.attachment(attachment::NORMAL);
                let r_flux = rsm.attachment(attachment::FLUX);
                let width = rsm.extent.width;
                let size = (rsm.extent.width, rsm.extent.height);

                for i in 0..out.len() {
                    let Some(surface) =
                        SurfaceSample::decode(g_position[i], g_normal[i], g_albedo[i])
                    else {
                        continue;
                    };
                    let added = shading::indirect_lighting(&surface, header, samples, size, |x, y| {
                        let j = y as usize * width as usize + x as usize;
                        VplSample::decode(r_position[j], r_normal[j], r_flux[j])
                    });
                    let texel = &mut out[i];
                    texel[0] += added.x;
                    texel[1] += added.y;
                    texel[2] += added.z;
                }
            }
            (interface, _) => {
                return Err(EngineError::mismatch(
                    NAME,
                    "lighting program with matching uniforms",
                    format!("'{}' ({interface})", pass.program.label),
                ));
            }
        }

        self.stats.lighting_passes += 1;
        Ok(())
    }

    fn present(&mut self, program: &SoftProgram, source: &SoftTarget) -> Result<()> {
        const NAME: &str = "present";
        self.require_open_frame(NAME)?;
        if program.interface != ProgramInterface::Present {
            return Err(EngineError::mismatch(
                NAME,
                "a present program",
                format!("'{}' ({})", program.label, program.interface),
            ));
        }
        if source.layout != TargetLayout::ACCUMULATION {
            return Err(EngineError::mismatch(
                NAME,
                TargetLayout::ACCUMULATION.to_string(),
                source.layout.to_string(),
            ));
        }

        let image = source
            .attachment(0)
            .iter()
            .map(|c| [c[0].clamp(0.0, 1.0), c[1].clamp(0.0, 1.0), c[2].clamp(0.0, 1.0), 1.0])
            .collect();
        self.presented = Some(image);
        self.presented_extent = source.extent;
        self.frame_open = false;
        self.stats.frames_presented += 1;
        Ok(())
    }

    fn abort_frame(&mut self) {
        self.frame_open = false;
    }
}
