use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::*;
use wgpu::util::DeviceExt;

use crate::config::GlobeConfig;
use crate::controller::FrameStats;
use crate::error::GlobeError;
use crate::model::{Camera, SceneState};
use crate::ui;
use crate::utils::{create_sphere_mesh, upload_points, MeshBuffer, PointBuffer, PointVertex, Vertex};
use crate::view::{GlobeTexture, GpuContext, RenderBackend};

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
}

impl CameraUniform {
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            view_proj: camera.view_proj().to_cols_array_2d(),
            eye: camera.eye.extend(1.0).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightingUniform {
    pub sun_dir: [f32; 3],
    pub sun_intensity: f32,
    pub ambient: f32,
    pub _pad1: f32,
    pub _pad2: f32,
    pub _pad3: f32,
}

impl Default for LightingUniform {
    fn default() -> Self {
        Self {
            sun_dir: [-0.5, 0.6, 1.0],
            sun_intensity: 0.6,
            ambient: 0.55,
            _pad1: 0.0,
            _pad2: 0.0,
            _pad3: 0.0,
        }
    }
}

/// Per-mesh model matrix plus the matrix that carries normals into world space.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TransformUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
}

impl TransformUniform {
    pub fn from_model(model: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal: model.inverse().transpose().to_cols_array_2d(),
        }
    }
}

// Shared graphics setup used by native and web
pub struct FrameResources {
    pub camera_buffer: Buffer,
    pub lighting_buffer: Buffer,
    pub bind_group_layout: BindGroupLayout,
    pub bind_group: BindGroup,
}

pub struct TransformResources {
    pub buffer: Buffer,
    pub bind_group: BindGroup,
}

fn uniform_entry(binding: u32, visibility: ShaderStages) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub fn create_frame_resources(device: &Device) -> FrameResources {
    let camera_buffer = device.create_buffer(&BufferDescriptor {
        label: Some("camera_buffer"),
        size: std::mem::size_of::<CameraUniform>() as BufferAddress,
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let lighting_buffer = device.create_buffer_init(&util::BufferInitDescriptor {
        label: Some("lighting_buffer"),
        contents: bytemuck::bytes_of(&LightingUniform::default()),
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
    });

    let bind_group_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("frame_bind_group_layout"),
        entries: &[
            uniform_entry(0, ShaderStages::VERTEX | ShaderStages::FRAGMENT),
            uniform_entry(1, ShaderStages::FRAGMENT),
        ],
    });

    let bind_group = device.create_bind_group(&BindGroupDescriptor {
        label: Some("frame_bind_group"),
        layout: &bind_group_layout,
        entries: &[
            BindGroupEntry { binding: 0, resource: camera_buffer.as_entire_binding() },
            BindGroupEntry { binding: 1, resource: lighting_buffer.as_entire_binding() },
        ],
    });

    FrameResources { camera_buffer, lighting_buffer, bind_group_layout, bind_group }
}

pub fn create_transform_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("transform_bind_group_layout"),
        entries: &[uniform_entry(0, ShaderStages::VERTEX)],
    })
}

pub fn create_transform_resources(device: &Device, layout: &BindGroupLayout, label: &str, model: Mat4) -> TransformResources {
    let buffer = device.create_buffer_init(&util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::bytes_of(&TransformUniform::from_model(model)),
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
    });
    let bind_group = device.create_bind_group(&BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[BindGroupEntry { binding: 0, resource: buffer.as_entire_binding() }],
    });
    TransformResources { buffer, bind_group }
}

pub fn create_texture_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("texture_bind_group_layout"),
        entries: &[
            BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Texture {
                    sample_type: TextureSampleType::Float { filterable: true },
                    view_dimension: TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            BindGroupLayoutEntry {
                binding: 1,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Sampler(SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

pub fn create_texture_bind_group(device: &Device, layout: &BindGroupLayout, texture: &GlobeTexture) -> BindGroup {
    device.create_bind_group(&BindGroupDescriptor {
        label: Some("globe_texture_bind_group"),
        layout,
        entries: &[
            BindGroupEntry { binding: 0, resource: BindingResource::TextureView(&texture.view) },
            BindGroupEntry { binding: 1, resource: BindingResource::Sampler(&texture.sampler) },
        ],
    })
}

pub fn create_depth_texture(device: &Device, width: u32, height: u32, sample_count: u32) -> (Texture, TextureView) {
    let depth_texture = device.create_texture(&TextureDescriptor {
        label: Some("depth_texture"),
        size: Extent3d { width, height, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth_texture.create_view(&TextureViewDescriptor::default());
    (depth_texture, depth_view)
}

/// Multisampled color target resolved into the swapchain image. `None` without MSAA.
pub fn create_msaa_target(device: &Device, format: TextureFormat, width: u32, height: u32, sample_count: u32) -> Option<TextureView> {
    if sample_count <= 1 {
        return None;
    }
    let texture = device.create_texture(&TextureDescriptor {
        label: Some("msaa_color"),
        size: Extent3d { width, height, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count,
        dimension: TextureDimension::D2,
        format,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    Some(texture.create_view(&TextureViewDescriptor::default()))
}

/// Fixed-function knobs that differ between the three scene pipelines.
struct PipelineSpec<'a> {
    label: &'a str,
    shader: &'a ShaderModule,
    layout: &'a PipelineLayout,
    buffers: &'a [VertexBufferLayout<'a>],
    topology: PrimitiveTopology,
    cull_mode: Option<Face>,
    blend: BlendState,
    depth_write: bool,
}

fn create_pipeline(device: &Device, format: TextureFormat, sample_count: u32, spec: PipelineSpec<'_>) -> RenderPipeline {
    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(spec.label),
        layout: Some(spec.layout),
        vertex: VertexState {
            module: spec.shader,
            entry_point: Some("vs_main"),
            buffers: spec.buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(FragmentState {
            module: spec.shader,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState { format, blend: Some(spec.blend), write_mask: ColorWrites::ALL })],
            compilation_options: Default::default(),
        }),
        primitive: PrimitiveState {
            topology: spec.topology,
            strip_index_format: None,
            front_face: FrontFace::Ccw,
            cull_mode: spec.cull_mode,
            polygon_mode: PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: spec.depth_write,
            depth_compare: CompareFunction::Less,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: MultisampleState { count: sample_count, mask: !0, alpha_to_coverage_enabled: false },
        multiview: None,
        cache: None,
    })
}

/// `src * srcAlpha + dst`: the atmosphere only ever brightens what is behind it.
pub const ADDITIVE_BLENDING: BlendState = BlendState {
    color: BlendComponent {
        src_factor: BlendFactor::SrcAlpha,
        dst_factor: BlendFactor::One,
        operation: BlendOperation::Add,
    },
    alpha: BlendComponent {
        src_factor: BlendFactor::SrcAlpha,
        dst_factor: BlendFactor::One,
        operation: BlendOperation::Add,
    },
};

pub struct ScenePipelines {
    pub globe: RenderPipeline,
    pub atmosphere: RenderPipeline,
    pub stars: RenderPipeline,
}

pub fn create_scene_pipelines(
    device: &Device,
    format: TextureFormat,
    sample_count: u32,
    frame_layout: &BindGroupLayout,
    transform_layout: &BindGroupLayout,
    texture_layout: &BindGroupLayout,
) -> ScenePipelines {
    let globe_shader = device.create_shader_module(ShaderModuleDescriptor {
        label: Some("globe_shader"),
        source: ShaderSource::Wgsl(include_str!("shaders/globe.wgsl").into()),
    });
    let atmosphere_shader = device.create_shader_module(ShaderModuleDescriptor {
        label: Some("atmosphere_shader"),
        source: ShaderSource::Wgsl(include_str!("shaders/atmosphere.wgsl").into()),
    });
    let stars_shader = device.create_shader_module(ShaderModuleDescriptor {
        label: Some("stars_shader"),
        source: ShaderSource::Wgsl(include_str!("shaders/stars.wgsl").into()),
    });

    let globe_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("globe_pipeline_layout"),
        bind_group_layouts: &[frame_layout, transform_layout, texture_layout],
        push_constant_ranges: &[],
    });
    let atmosphere_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("atmosphere_pipeline_layout"),
        bind_group_layouts: &[frame_layout, transform_layout],
        push_constant_ranges: &[],
    });
    let stars_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("stars_pipeline_layout"),
        bind_group_layouts: &[frame_layout],
        push_constant_ranges: &[],
    });

    let mesh_buffers = [Vertex::layout()];
    let point_buffers = [PointVertex::layout()];

    let globe = create_pipeline(device, format, sample_count, PipelineSpec {
        label: "globe_pipeline",
        shader: &globe_shader,
        layout: &globe_layout,
        buffers: &mesh_buffers,
        topology: PrimitiveTopology::TriangleList,
        cull_mode: Some(Face::Back),
        blend: BlendState::REPLACE,
        depth_write: true,
    });

    // back faces only
    let atmosphere = create_pipeline(device, format, sample_count, PipelineSpec {
        label: "atmosphere_pipeline",
        shader: &atmosphere_shader,
        layout: &atmosphere_layout,
        buffers: &mesh_buffers,
        topology: PrimitiveTopology::TriangleList,
        cull_mode: Some(Face::Front),
        blend: ADDITIVE_BLENDING,
        depth_write: false,
    });

    let stars = create_pipeline(device, format, sample_count, PipelineSpec {
        label: "stars_pipeline",
        shader: &stars_shader,
        layout: &stars_layout,
        buffers: &point_buffers,
        topology: PrimitiveTopology::PointList,
        cull_mode: None,
        blend: BlendState::REPLACE,
        depth_write: true,
    });

    ScenePipelines { globe, atmosphere, stars }
}

/// Read-only egui overlay drawn on top of the resolved frame.
pub struct HudRenderer {
    pub ctx: egui::Context,
    pub renderer: egui_wgpu::Renderer,
    pub elapsed: f64,
}

///////////////////////////////////////////////////////////////////////////////

/// Consolidated render state to avoid parameter explosion
pub struct RenderState {
    // wgpu resources
    pub device: Arc<Device>,
    pub queue: Arc<Queue>,
    pub surface: Surface<'static>,
    pub config: SurfaceConfiguration,
    pub sample_count: u32,
    pub pixels_per_point: f32,

    // Attachments
    pub depth_view: TextureView,
    pub msaa_view: Option<TextureView>,

    // Pipelines & bindings
    pub pipelines: ScenePipelines,
    pub frame: FrameResources,
    pub globe_transform: TransformResources,
    pub atmosphere_transform: TransformResources,
    pub texture_layout: BindGroupLayout,
    pub texture: GlobeTexture,
    pub texture_bind_group: BindGroup,

    // Meshes
    pub sphere: MeshBuffer,
    pub stars: PointBuffer,

    // UI
    pub hud: Option<HudRenderer>,
}

impl RenderState {
    pub fn new(gpu: GpuContext, scene: &SceneState, config: &GlobeConfig) -> Self {
        let GpuContext { adapter, device, queue, surface, format, config: surface_config } = gpu;

        let sample_count = supported_sample_count(&adapter, format, config.render.msaa_samples);

        let frame = create_frame_resources(&device);
        let transform_layout = create_transform_layout(&device);
        let texture_layout = create_texture_layout(&device);
        let pipelines = create_scene_pipelines(
            &device,
            format,
            sample_count,
            &frame.bind_group_layout,
            &transform_layout,
            &texture_layout,
        );

        let globe_transform = create_transform_resources(&device, &transform_layout, "globe_transform", scene.globe_model());
        let atmosphere_transform =
            create_transform_resources(&device, &transform_layout, "atmosphere_transform", scene.atmosphere_model());

        let texture = GlobeTexture::placeholder(&device, &queue);
        let texture_bind_group = create_texture_bind_group(&device, &texture_layout, &texture);

        let globe = &config.globe;
        let sphere = create_sphere_mesh(scene.globe_radius(), globe.width_segments, globe.height_segments).upload(&device);
        let stars = upload_points(&device, scene.stars().positions());

        let (_, depth_view) = create_depth_texture(&device, surface_config.width, surface_config.height, sample_count);
        let msaa_view = create_msaa_target(&device, format, surface_config.width, surface_config.height, sample_count);

        let hud = config.render.show_hud.then(|| HudRenderer {
            ctx: egui::Context::default(),
            renderer: egui_wgpu::Renderer::new(&device, format, egui_wgpu::RendererOptions::default()),
            elapsed: 0.0,
        });

        Self {
            device,
            queue,
            surface,
            config: surface_config,
            sample_count,
            pixels_per_point: 1.0,
            depth_view,
            msaa_view,
            pipelines,
            frame,
            globe_transform,
            atmosphere_transform,
            texture_layout,
            texture,
            texture_bind_group,
            sphere,
            stars,
            hud,
        }
    }

    /// Swap in a decoded globe map. Takes effect on the next draw.
    pub fn set_texture(&mut self, rgba: &image::RgbaImage) {
        let texture = GlobeTexture::from_rgba(&self.device, &self.queue, rgba, "globe_texture");
        self.texture_bind_group = create_texture_bind_group(&self.device, &self.texture_layout, &texture);
        self.texture = texture;
        tracing::info!("globe texture {}x{} bound", self.texture.width, self.texture.height);
    }

    fn acquire_frame(&self) -> Result<SurfaceTexture, GlobeError> {
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(frame),
            Err(SurfaceError::Lost | SurfaceError::Outdated) => {
                tracing::debug!("surface lost, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                Ok(self.surface.get_current_texture()?)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write_uniforms(&self, scene: &SceneState, camera: &Camera) {
        self.queue.write_buffer(
            &self.frame.camera_buffer,
            0,
            bytemuck::bytes_of(&CameraUniform::from_camera(camera)),
        );
        self.queue.write_buffer(
            &self.globe_transform.buffer,
            0,
            bytemuck::bytes_of(&TransformUniform::from_model(scene.globe_model())),
        );
        self.queue.write_buffer(
            &self.atmosphere_transform.buffer,
            0,
            bytemuck::bytes_of(&TransformUniform::from_model(scene.atmosphere_model())),
        );
    }

    fn draw_hud(
        &mut self,
        encoder: &mut CommandEncoder,
        view: &TextureView,
        scene: &SceneState,
        stats: &FrameStats,
    ) -> Vec<CommandBuffer> {
        let Some(hud) = self.hud.as_mut() else {
            return Vec::new();
        };

        let ppp = self.pixels_per_point;
        let (width, height) = (self.config.width, self.config.height);
        hud.elapsed += stats.last_dt as f64;

        let full_output = ui::build_hud(&hud.ctx, scene, stats, width, height, ppp, hud.elapsed);
        let primitives = hud.ctx.tessellate(full_output.shapes, ppp);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [width, height],
            pixels_per_point: ppp,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            hud.renderer.update_texture(&self.device, &self.queue, *id, image_delta);
        }
        let extra = hud.renderer.update_buffers(&self.device, &self.queue, encoder, &primitives, &screen_descriptor);

        {
            let hud_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("hud_render_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Load,
                        store: StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            hud.renderer.render(&mut hud_pass.forget_lifetime(), &primitives, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            hud.renderer.free_texture(id);
        }
        extra
    }
}

/// Highest usable MSAA count not above `requested`, for both the color and
/// depth formats.
fn supported_sample_count(adapter: &Adapter, format: TextureFormat, requested: u32) -> u32 {
    if requested <= 1 {
        return 1;
    }
    let color = adapter.get_texture_format_features(format).flags;
    let depth = adapter.get_texture_format_features(DEPTH_FORMAT).flags;
    if color.sample_count_supported(requested) && depth.sample_count_supported(requested) {
        requested
    } else {
        tracing::warn!("{}x MSAA unsupported for {:?}, rendering without it", requested, format);
        1
    }
}

impl RenderBackend for RenderState {
    fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);

        let (_, depth_view) = create_depth_texture(&self.device, width, height, self.sample_count);
        self.depth_view = depth_view;
        self.msaa_view = create_msaa_target(&self.device, self.config.format, width, height, self.sample_count);
    }

    fn draw(&mut self, scene: &SceneState, camera: &Camera, stats: &FrameStats) -> Result<(), GlobeError> {
        self.write_uniforms(scene, camera);

        let frame = self.acquire_frame()?;
        let view = frame.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("encoder"),
        });

        {
            let (target, resolve_target, store) = match &self.msaa_view {
                Some(msaa) => (msaa, Some(&view), StoreOp::Discard),
                None => (&view, None, StoreOp::Store),
            };

            let mut rp = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("scene_render_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: target,
                    resolve_target,
                    ops: Operations {
                        load: LoadOp::Clear(Color::BLACK),
                        store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            rp.set_bind_group(0, &self.frame.bind_group, &[]);

            // STARS
            rp.set_pipeline(&self.pipelines.stars);
            rp.set_vertex_buffer(0, self.stars.vertex_buffer.slice(..));
            rp.draw(0..self.stars.count, 0..1);

            // GLOBE
            rp.set_pipeline(&self.pipelines.globe);
            rp.set_bind_group(1, &self.globe_transform.bind_group, &[]);
            rp.set_bind_group(2, &self.texture_bind_group, &[]);
            rp.set_vertex_buffer(0, self.sphere.vertex_buffer.slice(..));
            rp.set_index_buffer(self.sphere.index_buffer.slice(..), IndexFormat::Uint32);
            rp.draw_indexed(0..self.sphere.index_count, 0, 0..1);

            // ATMOSPHERE (same geometry, scaled shell)
            rp.set_pipeline(&self.pipelines.atmosphere);
            rp.set_bind_group(1, &self.atmosphere_transform.bind_group, &[]);
            rp.draw_indexed(0..self.sphere.index_count, 0, 0..1);
        }

        let hud_commands = self.draw_hud(&mut encoder, &view, scene, stats);

        self.queue.submit(hud_commands.into_iter().chain(std::iter::once(encoder.finish())));
        frame.present();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec3, Vec4};

    #[test]
    fn uniform_sizes_match_wgsl() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 80);
        assert_eq!(std::mem::size_of::<LightingUniform>(), 32);
        assert_eq!(std::mem::size_of::<TransformUniform>(), 128);
    }

    #[test]
    fn normal_matrix_keeps_normals_perpendicular_under_scale() {
        let model = Mat4::from_scale(Vec3::new(1.1, 1.1, 1.1)) * Mat4::from_rotation_y(0.7);
        let uniform = TransformUniform::from_model(model);
        let normal_m = Mat4::from_cols_array_2d(&uniform.normal);

        let n = (normal_m * Vec4::new(1.0, 0.0, 0.0, 0.0)).truncate().normalize();
        let expected = (model * Vec4::new(1.0, 0.0, 0.0, 0.0)).truncate().normalize();
        assert!(n.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn camera_uniform_carries_eye() {
        let cam = Camera::new(800, 600);
        let uniform = CameraUniform::from_camera(&cam);
        assert_eq!(uniform.eye, [0.0, 1.0, 18.0, 1.0]);
        assert_eq!(uniform.view_proj, cam.view_proj().to_cols_array_2d());
    }

    #[test]
    fn atmosphere_blend_is_additive() {
        assert_eq!(ADDITIVE_BLENDING.color.dst_factor, BlendFactor::One);
        assert_eq!(ADDITIVE_BLENDING.color.src_factor, BlendFactor::SrcAlpha);
    }
}
