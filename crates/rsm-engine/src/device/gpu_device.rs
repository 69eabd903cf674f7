use std::num::NonZeroU64;

use wgpu::util::DeviceExt;

use crate::error::{EngineError, Result};
use crate::render::{
    AttachmentFormat, DrawUniform, Extent, LightingUniforms, TargetLayout, ViewUniform,
};
use crate::scene::{ImageData, MeshData, Vertex};
use crate::shader::{ProgramInterface, ShaderStage, StageInterface};

use super::{GeometryPass, Gpu, LightingPass, RenderDevice, SurfaceErrorAction};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub struct WgpuStage {
    stage: ShaderStage,
    label: String,
    module: wgpu::ShaderModule,
    entry_point: String,
}

pub struct WgpuProgram {
    label: String,
    interface: ProgramInterface,
    pipeline: wgpu::RenderPipeline,
}

pub struct WgpuMesh {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

pub struct WgpuTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

pub struct WgpuTarget {
    layout: TargetLayout,
    extent: Extent,
    colors: Vec<(wgpu::Texture, wgpu::TextureView)>,
    depth: Option<(wgpu::Texture, wgpu::TextureView)>,
}

impl WgpuTarget {
    fn color_view(&self, index: usize) -> &wgpu::TextureView {
        &self.colors[index].1
    }
}

/// Bind group layouts shared by every program of one interface.
struct Layouts {
    frame: wgpu::BindGroupLayout,
    item: wgpu::BindGroupLayout,
    direct: wgpu::BindGroupLayout,
    indirect: wgpu::BindGroupLayout,
    present: wgpu::BindGroupLayout,
}

impl Layouts {
    fn new(device: &wgpu::Device) -> Self {
        let frame = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("rsm frame layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                false,
                NonZeroU64::new(size_of::<ViewUniform>() as u64),
            )],
        });

        let item = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("rsm item layout"),
            entries: &[
                uniform_entry(
                    0,
                    wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    true,
                    NonZeroU64::new(size_of::<DrawUniform>() as u64),
                ),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let direct = lighting_layout(device, "rsm direct lighting layout", 3);
        let indirect = lighting_layout(device, "rsm indirect illumination layout", 6);

        let present = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("rsm present layout"),
            entries: &[gbuffer_entry(0)],
        });

        Self {
            frame,
            item,
            direct,
            indirect,
            present,
        }
    }

    fn for_interface(&self, interface: ProgramInterface) -> Vec<&wgpu::BindGroupLayout> {
        match interface {
            ProgramInterface::Geometry | ProgramInterface::ShadowMap => vec![&self.frame, &self.item],
            ProgramInterface::DirectLighting => vec![&self.direct],
            ProgramInterface::IndirectIllumination => vec![&self.indirect],
            ProgramInterface::Present => vec![&self.present],
        }
    }
}

fn uniform_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    has_dynamic_offset: bool,
    min_binding_size: Option<NonZeroU64>,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset,
            min_binding_size,
        },
        count: None,
    }
}

/// Attachments are read with `textureLoad`, so float32 formats need no
/// filtering support.
fn gbuffer_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn lighting_layout(device: &wgpu::Device, label: &str, textures: u32) -> wgpu::BindGroupLayout {
    let mut entries = vec![uniform_entry(0, wgpu::ShaderStages::FRAGMENT, false, None)];
    entries.extend((1..=textures).map(gbuffer_entry));
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &entries,
    })
}

fn align_to(size: u64, alignment: u64) -> u64 {
    size.div_ceil(alignment) * alignment
}

fn check_target(pass: &'static str, program: &WgpuProgram, target: &WgpuTarget) -> Result<()> {
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

fn no_frame(pass: &'static str) -> EngineError {
    EngineError::mismatch(pass, "an open frame", "no frame")
}

fn color_attachment(view: &wgpu::TextureView, clear: bool) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    let load = if clear {
        wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT)
    } else {
        wgpu::LoadOp::Load
    };
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load,
            store: wgpu::StoreOp::Store,
        },
        depth_slice: None,
    })
}

/// `RenderDevice` backed by wgpu and the window surface.
pub struct WgpuDevice {
    gpu: Gpu,
    layouts: Layouts,
    sampler: wgpu::Sampler,
    /// Bound for untextured draws so every item bind group has the same shape.
    white: WgpuTexture,
    frame: Option<super::GpuFrame>,
}

impl WgpuDevice {
    pub fn new(gpu: Gpu) -> Self {
        let device = gpu.device();
        let layouts = Layouts::new(device);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("rsm diffuse sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });
        let white = upload_texture(&gpu, "white", &ImageData::solid(1, 1, [255; 4]));

        Self {
            gpu,
            layouts,
            sampler,
            white,
            frame: None,
        }
    }

    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    pub fn surface_extent(&self) -> Extent {
        self.gpu.size()
    }

    fn texture_format(&self, format: AttachmentFormat) -> wgpu::TextureFormat {
        match format {
            AttachmentFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
            AttachmentFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
            AttachmentFormat::Surface => self.gpu.surface_format(),
        }
    }
}

fn upload_texture(gpu: &Gpu, label: &str, image: &ImageData) -> WgpuTexture {
    let size = wgpu::Extent3d {
        width: image.width,
        height: image.height,
        depth_or_array_layers: 1,
    };
    let texture = gpu.device().create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    gpu.queue().write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &image.pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * image.width),
            rows_per_image: Some(image.height),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    WgpuTexture {
        _texture: texture,
        view,
    }
}

impl RenderDevice for WgpuDevice {
    type Stage = WgpuStage;
    type Program = WgpuProgram;
    type Mesh = WgpuMesh;
    type Texture = WgpuTexture;
    type Target = WgpuTarget;

    fn backend_name(&self) -> &'static str {
        "wgpu"
    }

    fn compile_stage(
        &mut self,
        stage: ShaderStage,
        label: &str,
        source: &str,
        interface: &StageInterface,
    ) -> std::result::Result<WgpuStage, String> {
        let module = self
            .gpu
            .device()
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
        Ok(WgpuStage {
            stage,
            label: label.to_owned(),
            module,
            entry_point: interface.entry_point.clone(),
        })
    }

    fn link_program(
        &mut self,
        label: &str,
        interface: ProgramInterface,
        vertex: &WgpuStage,
        fragment: &WgpuStage,
    ) -> std::result::Result<WgpuProgram, String> {
        if vertex.stage != ShaderStage::Vertex || fragment.stage != ShaderStage::Fragment {
            return Err(format!(
                "stages attached in the wrong slots ('{}', '{}')",
                vertex.label, fragment.label
            ));
        }

        let device = self.gpu.device();
        let bind_group_layouts = self.layouts.for_interface(interface);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &bind_group_layouts,
            immediate_size: 0,
        });

        let layout = interface.target();
        let blend = match interface {
            ProgramInterface::IndirectIllumination => Some(wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            }),
            _ => None,
        };
        let targets: Vec<Option<wgpu::ColorTargetState>> = layout
            .colors
            .iter()
            .map(|&format| {
                Some(wgpu::ColorTargetState {
                    format: self.texture_format(format),
                    blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();

        let vertex_attributes =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];
        let vertex_buffers = [wgpu::VertexBufferLayout {
            array_stride: size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &vertex_attributes,
        }];
        let buffers: &[wgpu::VertexBufferLayout<'_>] = if interface.reads_vertex_buffers() {
            &vertex_buffers
        } else {
            &[]
        };

        let depth_stencil = layout.depth.then(|| wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex.module,
                entry_point: Some(vertex.entry_point.as_str()),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers,
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment.module,
                entry_point: Some(fragment.entry_point.as_str()),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &targets,
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("linked '{label}' ({interface}) for {layout}");
        Ok(WgpuProgram {
            label: label.to_owned(),
            interface,
            pipeline,
        })
    }

    fn create_mesh(&mut self, label: &str, data: &MeshData) -> WgpuMesh {
        let device = self.gpu.device();
        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        WgpuMesh {
            vertices,
            indices,
            index_count: data.indices.len() as u32,
        }
    }

    fn create_texture(&mut self, label: &str, image: &ImageData) -> WgpuTexture {
        upload_texture(&self.gpu, label, image)
    }

    fn create_target(&mut self, label: &str, layout: TargetLayout, extent: Extent) -> WgpuTarget {
        let size = wgpu::Extent3d {
            width: extent.width.max(1),
            height: extent.height.max(1),
            depth_or_array_layers: 1,
        };
        let device = self.gpu.device();
        let make = |format: wgpu::TextureFormat, usage: wgpu::TextureUsages| {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            (texture, view)
        };

        let colors = layout
            .colors
            .iter()
            .map(|&format| {
                make(
                    self.texture_format(format),
                    wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
                )
            })
            .collect();
        let depth = layout
            .depth
            .then(|| make(DEPTH_FORMAT, wgpu::TextureUsages::RENDER_ATTACHMENT));

        WgpuTarget {
            layout,
            extent,
            colors,
            depth,
        }
    }

    fn resize_surface(&mut self, extent: Extent) {
        self.gpu.resize(extent);
    }

    fn begin_frame(&mut self) -> Result<bool> {
        if self.frame.take().is_some() {
            log::warn!("previous frame was never presented; dropping it");
        }
        if self.gpu.size().is_empty() {
            return Ok(false);
        }

        match self.gpu.begin_frame() {
            Ok(frame) => {
                self.frame = Some(frame);
                Ok(true)
            }
            Err(err) => match self.gpu.handle_surface_error(&err) {
                SurfaceErrorAction::Fatal => Err(EngineError::Surface(err.to_string())),
                action => {
                    log::debug!("skipping frame after surface error ({err}): {action:?}");
                    Ok(false)
                }
            },
        }
    }

    fn geometry_pass(&mut self, pass: GeometryPass<'_, Self>) -> Result<()> {
        const NAME: &str = "geometry pass";
        let interface = pass.program.interface;
        if !interface.reads_vertex_buffers() {
            return Err(EngineError::mismatch(
                NAME,
                "a geometry or shadow-map program",
                format!("'{}' ({interface})", pass.program.label),
            ));
        }
        check_target(NAME, pass.program, pass.target)?;
        let Some((_, depth_view)) = &pass.target.depth else {
            return Err(EngineError::mismatch(NAME, "a depth attachment", "none"));
        };

        let device = self.gpu.device();
        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(pass.label),
            contents: bytemuck::bytes_of(&pass.view),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let frame_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(pass.label),
            layout: &self.layouts.frame,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let item_size = size_of::<DrawUniform>() as u64;
        let stride = align_to(
            item_size,
            u64::from(device.limits().min_uniform_buffer_offset_alignment),
        );
        let mut items = vec![0u8; (stride as usize) * pass.draws.len().max(1)];
        for (i, draw) in pass.draws.iter().enumerate() {
            let start = i * stride as usize;
            items[start..start + item_size as usize]
                .copy_from_slice(bytemuck::bytes_of(&draw.uniform));
        }
        let item_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(pass.label),
            contents: &items,
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let item_groups: Vec<wgpu::BindGroup> = pass
            .draws
            .iter()
            .map(|draw| {
                let texture = draw.texture.map_or(&self.white.view, |t| &t.view);
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(pass.label),
                    layout: &self.layouts.item,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                                buffer: &item_buffer,
                                offset: 0,
                                size: NonZeroU64::new(item_size),
                            }),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(texture),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::Sampler(&self.sampler),
                        },
                    ],
                })
            })
            .collect();

        let frame = self.frame.as_mut().ok_or_else(|| no_frame(NAME))?;
        let color_attachments: Vec<_> = pass
            .target
            .colors
            .iter()
            .map(|(_, view)| color_attachment(view, pass.clear))
            .collect();
        let depth_load = if pass.clear {
            wgpu::LoadOp::Clear(1.0)
        } else {
            wgpu::LoadOp::Load
        };

        let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(pass.label),
            color_attachments: &color_attachments,
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: depth_load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&pass.program.pipeline);
        rpass.set_bind_group(0, &frame_group, &[]);
        for (i, (draw, group)) in pass.draws.iter().zip(&item_groups).enumerate() {
            let offset = (i as u64 * stride) as wgpu::DynamicOffset;
            rpass.set_bind_group(1, group, &[offset]);
            rpass.set_vertex_buffer(0, draw.mesh.vertices.slice(..));
            rpass.set_index_buffer(draw.mesh.indices.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..draw.mesh.index_count, 0, 0..1);
        }
        Ok(())
    }

    fn lighting_pass(&mut self, pass: LightingPass<'_, Self>) -> Result<()> {
        const NAME: &str = "lighting pass";
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

        let (layout, rsm, clear) = match (pass.program.interface, pass.uniforms) {
            (ProgramInterface::DirectLighting, LightingUniforms::Direct { .. }) => {
                (&self.layouts.direct, None, true)
            }
            (ProgramInterface::IndirectIllumination, LightingUniforms::Indirect { .. }) => {
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
                (&self.layouts.indirect, Some(rsm), false)
            }
            (interface, _) => {
                return Err(EngineError::mismatch(
                    NAME,
                    "uniforms matching the program",
                    format!("'{}' ({interface})", pass.program.label),
                ));
            }
        };

        let device = self.gpu.device();
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(pass.label),
            contents: &pass.uniforms.to_bytes(),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }];
        let inputs = std::iter::repeat_n(pass.gbuffer, 3)
            .enumerate()
            .chain(rsm.into_iter().flat_map(|rsm| std::iter::repeat_n(rsm, 3).enumerate()));
        for (binding, (attachment, target)) in (1u32..).zip(inputs) {
            entries.push(wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::TextureView(target.color_view(attachment)),
            });
        }
        let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(pass.label),
            layout,
            entries: &entries,
        });

        let frame = self.frame.as_mut().ok_or_else(|| no_frame(NAME))?;
        let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(pass.label),
            color_attachments: &[color_attachment(pass.target.color_view(0), clear)],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        rpass.set_pipeline(&pass.program.pipeline);
        rpass.set_bind_group(0, &group, &[]);
        rpass.draw(0..3, 0..1);
        Ok(())
    }

    fn present(&mut self, program: &WgpuProgram, source: &WgpuTarget) -> Result<()> {
        const NAME: &str = "present";
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

        let mut frame = self.frame.take().ok_or_else(|| no_frame(NAME))?;
        let group = self
            .gpu
            .device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("rsm present"),
                layout: &self.layouts.present,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(source.color_view(0)),
                }],
            });

        {
            let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("rsm present"),
                color_attachments: &[color_attachment(&frame.view, true)],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            rpass.set_pipeline(&program.pipeline);
            rpass.set_bind_group(0, &group, &[]);
            rpass.draw(0..3, 0..1);
        }

        self.gpu.submit(frame);
        Ok(())
    }

    fn abort_frame(&mut self) {
        self.frame = None;
    }
}
