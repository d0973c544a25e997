//! Galaxy point rendering.
//!
//! Points are expanded to camera-facing quads, one instance per point, and
//! blended additively with depth writes disabled so overlapping stars glow.
//! The vertex stage twists the base disk over time and adds the stored
//! jitter offset afterwards.

use crate::galaxy::PointCloud;
use crate::gpu::{SceneUniforms, DEPTH_FORMAT};
use wgpu::util::DeviceExt;

const SHADER_SOURCE: &str = r#"
struct SceneUniforms {
    view: mat4x4<f32>,
    proj: mat4x4<f32>,
    time: f32,
    point_size: f32,
};

@group(0) @binding(0)
var<uniform> uniforms: SceneUniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
    @location(1) uv: vec2<f32>,
};

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @location(0) position: vec3<f32>,
    @location(1) scale: f32,
    @location(2) jitter: vec3<f32>,
    @location(3) color: vec3<f32>,
) -> VertexOutput {
    var quad_vertices = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>(-1.0,  1.0),
        vec2<f32>(-1.0,  1.0),
        vec2<f32>( 1.0, -1.0),
        vec2<f32>( 1.0,  1.0),
    );
    let quad_pos = quad_vertices[vertex_index];

    // Twist the disk; inner points revolve faster than the rim.
    var p = position;
    let dist = length(p.xz);
    if dist > 0.0 {
        var angle = atan2(p.x, p.z);
        angle += (1.0 / dist) * uniforms.time * 0.2;
        p.x = cos(angle) * dist;
        p.z = sin(angle) * dist;
    }
    p += jitter;

    var view_pos = uniforms.view * vec4<f32>(p, 1.0);
    let half_size = uniforms.point_size * scale;
    view_pos.x += quad_pos.x * half_size;
    view_pos.y += quad_pos.y * half_size;

    var out: VertexOutput;
    out.clip_position = uniforms.proj * view_pos;
    out.color = color;
    out.uv = quad_pos;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    var strength = 1.0 - length(in.uv) * 0.5;
    strength = pow(max(strength, 0.0), 10.0);
    return vec4<f32>(in.color * strength, 1.0);
}
"#;

/// One point, interleaved for the instance buffer.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct GpuPoint {
    position: [f32; 3],
    scale: f32,
    jitter: [f32; 3],
    _pad0: f32,
    color: [f32; 3],
    _pad1: f32,
}

impl GpuPoint {
    fn interleave(cloud: &PointCloud) -> Vec<GpuPoint> {
        cloud
            .positions
            .iter()
            .zip(&cloud.jitter)
            .zip(&cloud.colors)
            .zip(&cloud.scales)
            .map(|(((position, jitter), color), scale)| GpuPoint {
                position: position.to_array(),
                scale: *scale,
                jitter: jitter.to_array(),
                _pad0: 0.0,
                color: color.to_array(),
                _pad1: 0.0,
            })
            .collect()
    }
}

/// Owning handle to the GPU-resident cloud. At most one is live; replacing
/// it goes through [`PointsRenderer::upload`], which destroys the previous
/// buffer before the new one is installed.
struct PointCloudGpu {
    buffer: wgpu::Buffer,
    count: u32,
}

pub struct PointsRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    cloud: Option<PointCloudGpu>,
}

impl PointsRenderer {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Points Shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER_SOURCE.into()),
        });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Points Uniform Buffer"),
            contents: bytemuck::bytes_of(&SceneUniforms {
                view: [[0.0; 4]; 4],
                proj: [[0.0; 4]; 4],
                time: 0.0,
                point_size: 0.0,
                _padding: [0.0; 2],
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Points Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Points Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Points Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let vertex_attributes = [
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3, // position
            },
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32, // scale
            },
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x3, // jitter
            },
            wgpu::VertexAttribute {
                offset: 32,
                shader_location: 3,
                format: wgpu::VertexFormat::Float32x3, // color
            },
        ];

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Points Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<GpuPoint>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &vertex_attributes,
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState {
                        color: wgpu::BlendComponent {
                            src_factor: wgpu::BlendFactor::SrcAlpha,
                            dst_factor: wgpu::BlendFactor::One,
                            operation: wgpu::BlendOperation::Add,
                        },
                        alpha: wgpu::BlendComponent {
                            src_factor: wgpu::BlendFactor::One,
                            dst_factor: wgpu::BlendFactor::One,
                            operation: wgpu::BlendOperation::Add,
                        },
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
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
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            uniform_buffer,
            bind_group,
            cloud: None,
        }
    }

    /// Replace the GPU-resident cloud with a freshly generated one.
    ///
    /// The previous vertex buffer is destroyed before the new one is
    /// created, so only one cloud holds GPU memory at a time.
    pub fn upload(&mut self, device: &wgpu::Device, cloud: &PointCloud) {
        if let Some(old) = self.cloud.take() {
            old.buffer.destroy();
        }

        let points = GpuPoint::interleave(cloud);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Galaxy Point Buffer"),
            contents: bytemuck::cast_slice(&points),
            usage: wgpu::BufferUsages::VERTEX,
        });

        self.cloud = Some(PointCloudGpu {
            buffer,
            count: cloud.len() as u32,
        });
    }

    pub fn update_uniforms(&self, queue: &wgpu::Queue, uniforms: &SceneUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    /// Number of points currently resident on the GPU.
    pub fn point_count(&self) -> u32 {
        self.cloud.as_ref().map_or(0, |c| c.count)
    }

    pub fn draw<'pass>(&'pass self, pass: &mut wgpu::RenderPass<'pass>) {
        let Some(cloud) = &self.cloud else {
            return;
        };
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, cloud.buffer.slice(..));
        pass.draw(0..6, 0..cloud.count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::galaxy::{generate_with, GalaxyParams};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

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
    fn points_shader_is_valid() {
        validate_wgsl(SHADER_SOURCE);
    }

    #[test]
    fn gpu_point_is_tightly_interleaved() {
        assert_eq!(std::mem::size_of::<GpuPoint>(), 48);
    }

    #[test]
    fn interleave_preserves_count_and_order() {
        let params = GalaxyParams {
            count: 64,
            ..GalaxyParams::default()
        };
        let mut rng = SmallRng::seed_from_u64(3);
        let cloud = generate_with(&params, &mut rng);
        let points = GpuPoint::interleave(&cloud);
        assert_eq!(points.len(), 64);
        assert_eq!(points[17].position, cloud.positions[17].to_array());
        assert_eq!(points[17].jitter, cloud.jitter[17].to_array());
        assert_eq!(points[17].color, cloud.colors[17].to_array());
        assert_eq!(points[17].scale, cloud.scales[17]);
    }
}
