//! Screen-space post-processing.
//!
//! The scene draws into an offscreen color+depth pair. From there two
//! independently toggleable fullscreen passes can run: a bokeh depth-of-field
//! pass driven by focus distance, aperture and maximum blur radius, and a
//! final color-output pass that encodes linear color to sRGB. With both off
//! the scene renders straight to the surface and none of this executes.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::gpu::DEPTH_FORMAT;

/// Runtime depth-of-field settings, owned by the application context.
#[derive(Debug, Clone, Copy)]
pub struct DofSettings {
    pub enabled: bool,
    /// Focus distance in world units.
    pub focus: f32,
    /// Aperture as shown in the panel; scaled by 1e-5 before upload.
    pub aperture: f32,
    /// Maximum blur radius in UV units.
    pub max_blur: f32,
    /// Final color-output pass toggle.
    pub output_enabled: bool,
}

impl Default for DofSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            focus: 54.0,
            aperture: 10.0,
            max_blur: 0.004,
            output_enabled: false,
        }
    }
}

impl DofSettings {
    /// Whether any post pass has to run this frame.
    pub fn any_pass(&self) -> bool {
        self.enabled || self.output_enabled
    }
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct BokehUniforms {
    focus: f32,
    aperture: f32,
    max_blur: f32,
    near: f32,
    far: f32,
    _padding: [f32; 3],
}

const BOKEH_SHADER: &str = r#"
struct BokehUniforms {
    focus: f32,
    aperture: f32,
    max_blur: f32,
    near: f32,
    far: f32,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@group(0) @binding(0)
var scene: texture_2d<f32>;
@group(0) @binding(1)
var scene_sampler: sampler;
@group(0) @binding(2)
var scene_depth: texture_depth_2d;
@group(0) @binding(3)
var<uniform> uniforms: BokehUniforms;

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> VertexOutput {
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(3.0, -1.0),
        vec2<f32>(-1.0, 3.0),
    );
    var uvs = array<vec2<f32>, 3>(
        vec2<f32>(0.0, 1.0),
        vec2<f32>(2.0, 1.0),
        vec2<f32>(0.0, -1.0),
    );

    var out: VertexOutput;
    out.clip_position = vec4<f32>(positions[vertex_index], 0.0, 1.0);
    out.uv = uvs[vertex_index];
    return out;
}

// Ring of sample offsets on the unit circle, walked twice at different
// radii for a cheap circle-of-confusion approximation.
const RING: array<vec2<f32>, 16> = array<vec2<f32>, 16>(
    vec2<f32>(0.0, 1.0),
    vec2<f32>(0.38, 0.92),
    vec2<f32>(0.71, 0.71),
    vec2<f32>(0.92, 0.38),
    vec2<f32>(1.0, 0.0),
    vec2<f32>(0.92, -0.38),
    vec2<f32>(0.71, -0.71),
    vec2<f32>(0.38, -0.92),
    vec2<f32>(0.0, -1.0),
    vec2<f32>(-0.38, -0.92),
    vec2<f32>(-0.71, -0.71),
    vec2<f32>(-0.92, -0.38),
    vec2<f32>(-1.0, 0.0),
    vec2<f32>(-0.92, 0.38),
    vec2<f32>(-0.71, 0.71),
    vec2<f32>(-0.38, 0.92),
);

// Perspective depth in [0, 1] back to view-space Z (negative ahead of the
// camera).
fn view_z(depth: f32) -> f32 {
    return (uniforms.near * uniforms.far)
        / ((uniforms.far - uniforms.near) * depth - uniforms.far);
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let dims = vec2<f32>(textureDimensions(scene));
    let texel = vec2<i32>(clamp(in.uv, vec2<f32>(0.0), vec2<f32>(0.9999)) * dims);
    let depth = textureLoad(scene_depth, texel, 0);

    let factor = uniforms.focus + view_z(depth);
    let blur = clamp(factor * uniforms.aperture, -uniforms.max_blur, uniforms.max_blur);
    let aspect_correct = vec2<f32>(1.0, dims.x / dims.y);

    var color = textureSample(scene, scene_sampler, in.uv).rgb;
    for (var i = 0u; i < 16u; i = i + 1u) {
        let offset = RING[i] * aspect_correct;
        color += textureSample(scene, scene_sampler, in.uv + offset * blur).rgb;
        color += textureSample(scene, scene_sampler, in.uv + offset * blur * 0.55).rgb;
    }
    return vec4<f32>(color / 33.0, 1.0);
}
"#;

const OUTPUT_SHADER: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@group(0) @binding(0)
var scene: texture_2d<f32>;
@group(0) @binding(1)
var scene_sampler: sampler;

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> VertexOutput {
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(3.0, -1.0),
        vec2<f32>(-1.0, 3.0),
    );
    var uvs = array<vec2<f32>, 3>(
        vec2<f32>(0.0, 1.0),
        vec2<f32>(2.0, 1.0),
        vec2<f32>(0.0, -1.0),
    );

    var out: VertexOutput;
    out.clip_position = vec4<f32>(positions[vertex_index], 0.0, 1.0);
    out.uv = uvs[vertex_index];
    return out;
}

fn linear_to_srgb(c: vec3<f32>) -> vec3<f32> {
    let lo = c * 12.92;
    let hi = 1.055 * pow(c, vec3<f32>(1.0 / 2.4)) - 0.055;
    return select(hi, lo, c <= vec3<f32>(0.0031308));
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let color = textureSample(scene, scene_sampler, in.uv).rgb;
    return vec4<f32>(linear_to_srgb(clamp(color, vec3<f32>(0.0), vec3<f32>(1.0))), 1.0);
}
"#;

/// Source texture for the output pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSource {
    /// Read the offscreen scene target (depth of field did not run).
    Scene,
    /// Read the intermediate target written by the bokeh pass.
    Intermediate,
}

/// Offscreen targets and the fullscreen pass pipelines.
pub struct PostProcessState {
    scene_texture: wgpu::Texture,
    scene_view: wgpu::TextureView,
    scene_depth_texture: wgpu::Texture,
    scene_depth_view: wgpu::TextureView,
    intermediate_texture: wgpu::Texture,
    intermediate_view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
    bokeh_pipeline: wgpu::RenderPipeline,
    bokeh_layout: wgpu::BindGroupLayout,
    bokeh_bind_group: wgpu::BindGroup,
    output_pipeline: wgpu::RenderPipeline,
    output_layout: wgpu::BindGroupLayout,
    output_from_scene: wgpu::BindGroup,
    output_from_intermediate: wgpu::BindGroup,
}

impl PostProcessState {
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let (scene_texture, scene_view) =
            create_color_target(device, "Scene Target", width, height, surface_format);
        let (scene_depth_texture, scene_depth_view) =
            create_depth_target(device, width, height);
        let (intermediate_texture, intermediate_view) =
            create_color_target(device, "Intermediate Target", width, height, surface_format);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Post-Process Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Bokeh Uniform Buffer"),
            contents: bytemuck::bytes_of(&BokehUniforms {
                focus: 0.0,
                aperture: 0.0,
                max_blur: 0.0,
                near: 0.1,
                far: 100.0,
                _padding: [0.0; 3],
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bokeh_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Bokeh Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let output_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Output Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let bokeh_pipeline = create_fullscreen_pipeline(
            device,
            "Bokeh",
            BOKEH_SHADER,
            &bokeh_layout,
            surface_format,
        );
        let output_pipeline = create_fullscreen_pipeline(
            device,
            "Output",
            OUTPUT_SHADER,
            &output_layout,
            surface_format,
        );

        let bokeh_bind_group = create_bokeh_bind_group(
            device,
            &bokeh_layout,
            &scene_view,
            &scene_depth_view,
            &sampler,
            &uniform_buffer,
        );
        let output_from_scene =
            create_output_bind_group(device, &output_layout, &scene_view, &sampler);
        let output_from_intermediate =
            create_output_bind_group(device, &output_layout, &intermediate_view, &sampler);

        Self {
            scene_texture,
            scene_view,
            scene_depth_texture,
            scene_depth_view,
            intermediate_texture,
            intermediate_view,
            sampler,
            uniform_buffer,
            bokeh_pipeline,
            bokeh_layout,
            bokeh_bind_group,
            output_pipeline,
            output_layout,
            output_from_scene,
            output_from_intermediate,
        }
    }

    /// Recreate the offscreen targets and bind groups after a window resize.
    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        width: u32,
        height: u32,
        surface_format: wgpu::TextureFormat,
    ) {
        self.scene_texture.destroy();
        self.scene_depth_texture.destroy();
        self.intermediate_texture.destroy();

        let (scene_texture, scene_view) =
            create_color_target(device, "Scene Target", width, height, surface_format);
        let (scene_depth_texture, scene_depth_view) =
            create_depth_target(device, width, height);
        let (intermediate_texture, intermediate_view) =
            create_color_target(device, "Intermediate Target", width, height, surface_format);

        self.bokeh_bind_group = create_bokeh_bind_group(
            device,
            &self.bokeh_layout,
            &scene_view,
            &scene_depth_view,
            &self.sampler,
            &self.uniform_buffer,
        );
        self.output_from_scene =
            create_output_bind_group(device, &self.output_layout, &scene_view, &self.sampler);
        self.output_from_intermediate = create_output_bind_group(
            device,
            &self.output_layout,
            &intermediate_view,
            &self.sampler,
        );

        self.scene_texture = scene_texture;
        self.scene_view = scene_view;
        self.scene_depth_texture = scene_depth_texture;
        self.scene_depth_view = scene_depth_view;
        self.intermediate_texture = intermediate_texture;
        self.intermediate_view = intermediate_view;
    }

    pub fn update_uniforms(
        &self,
        queue: &wgpu::Queue,
        settings: &DofSettings,
        near: f32,
        far: f32,
    ) {
        let uniforms = BokehUniforms {
            focus: settings.focus,
            aperture: settings.aperture * 1e-5,
            max_blur: settings.max_blur,
            near,
            far,
            _padding: [0.0; 3],
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    /// Color target for the scene pass when post-processing is active.
    pub fn scene_view(&self) -> &wgpu::TextureView {
        &self.scene_view
    }

    /// Depth target paired with [`Self::scene_view`].
    pub fn scene_depth_view(&self) -> &wgpu::TextureView {
        &self.scene_depth_view
    }

    /// Target for the bokeh pass when the output pass still has to run.
    pub fn intermediate_view(&self) -> &wgpu::TextureView {
        &self.intermediate_view
    }

    /// Apply depth of field from the scene target into `target`.
    pub fn run_bokeh(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Bokeh Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.bokeh_pipeline);
        pass.set_bind_group(0, &self.bokeh_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    /// Apply the final color transform from `source` into `target`.
    pub fn run_output(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        source: OutputSource,
        target: &wgpu::TextureView,
    ) {
        let bind_group = match source {
            OutputSource::Scene => &self.output_from_scene,
            OutputSource::Intermediate => &self.output_from_intermediate,
        };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Output Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.output_pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

fn create_color_target(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

fn create_depth_target(
    device: &wgpu::Device,
    width: u32,
    height: u32,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Scene Depth Target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

fn create_fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    shader_source: &str,
    layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(shader_source.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn create_bokeh_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    scene_view: &wgpu::TextureView,
    depth_view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
    uniform_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Bokeh Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(scene_view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(depth_view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: uniform_buffer.as_entire_binding(),
            },
        ],
    })
}

fn create_output_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    source_view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Output Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(source_view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate_wgsl(code: &str) {
        let module = naga::front::wgsl::parse_str(code)
            .unwrap_or_else(|e| panic!("WGSL parse error: {:?}", e));
        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .unwrap_or_else(|e| panic!("WGSL validation error: {:?}", e));
    }

    #[test]
    fn bokeh_shader_is_valid() {
        validate_wgsl(BOKEH_SHADER);
    }

    #[test]
    fn output_shader_is_valid() {
        validate_wgsl(OUTPUT_SHADER);
    }

    #[test]
    fn bokeh_uniforms_are_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<BokehUniforms>() % 16, 0);
    }

    #[test]
    fn defaults_match_the_panel() {
        let dof = DofSettings::default();
        assert!(dof.enabled);
        assert!(!dof.output_enabled);
        assert!(dof.any_pass());
        let off = DofSettings {
            enabled: false,
            output_enabled: false,
            ..dof
        };
        assert!(!off.any_pass());
    }
}
