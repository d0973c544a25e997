//! Application wiring: window, event loop and the per-frame tick.
//!
//! All mutable scene state lives in [`SceneContext`], passed explicitly to
//! the subsystems that read it, so nothing hides in module globals. The GPU
//! side comes up once the window exists and is rebuilt never; only targets
//! resize.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::camera::{OrbitCamera, FAR, NEAR};
use crate::error::AppError;
use crate::galaxy::{self, GalaxyParams};
use crate::gpu::{
    DofSettings, GpuContext, PointsRenderer, PostProcessState, SceneUniforms, SkyboxRenderer,
};
use crate::gpu::post_process::OutputSource;
use crate::textures::{BackgroundSettings, CubemapData};
use crate::time::FrameClock;
use crate::ui::EguiLayer;

/// Launch the renderer and block until the window closes.
pub fn run() -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    event_loop.run_app(&mut app)?;
    Ok(())
}

/// Everything the panel and the frame tick mutate.
struct SceneContext {
    params: GalaxyParams,
    dof: DofSettings,
    background: BackgroundSettings,
    camera: OrbitCamera,
    clock: FrameClock,
}

impl SceneContext {
    fn new() -> Self {
        Self {
            params: GalaxyParams::default(),
            dof: DofSettings::default(),
            background: BackgroundSettings::default(),
            camera: OrbitCamera::new(1.0),
            clock: FrameClock::new(),
        }
    }
}

/// GPU-side subsystems, created once the window exists.
struct GfxState {
    gpu: GpuContext,
    points: PointsRenderer,
    skybox: SkyboxRenderer,
    post: PostProcessState,
    egui: EguiLayer,
}

impl GfxState {
    fn new(window: Arc<Window>, scene: &mut SceneContext) -> Self {
        let gpu = pollster::block_on(GpuContext::new(window.clone()));
        scene.camera.aspect = gpu.config.width as f32 / gpu.config.height.max(1) as f32;

        let mut points = PointsRenderer::new(&gpu.device, gpu.config.format);
        let cloud = galaxy::generate(&scene.params);
        points.upload(&gpu.device, &cloud);

        let cubemap = load_cubemap_or_placeholder(&scene.background);
        let skybox = SkyboxRenderer::new(&gpu.device, &gpu.queue, gpu.config.format, &cubemap);

        let post = PostProcessState::new(
            &gpu.device,
            gpu.config.width,
            gpu.config.height,
            gpu.config.format,
        );

        let egui = EguiLayer::new(&gpu.device, gpu.config.format, &window);

        Self {
            gpu,
            points,
            skybox,
            post,
            egui,
        }
    }
}

fn load_cubemap_or_placeholder(background: &BackgroundSettings) -> CubemapData {
    match CubemapData::load(&background.preset.dir()) {
        Ok(cubemap) => cubemap,
        Err(err) => {
            log::warn!(
                "cubemap preset {} unavailable, using placeholder: {}",
                background.preset.label(),
                err
            );
            CubemapData::placeholder()
        }
    }
}

pub struct App {
    window: Option<Arc<Window>>,
    gfx: Option<GfxState>,
    scene: SceneContext,
    mouse_pressed: bool,
    last_mouse_pos: Option<(f64, f64)>,
}

impl App {
    pub fn new() -> Self {
        Self {
            window: None,
            gfx: None,
            scene: SceneContext::new(),
            mouse_pressed: false,
            last_mouse_pos: None,
        }
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        let Some(gfx) = &mut self.gfx else {
            return;
        };
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        gfx.gpu.resize(new_size);
        self.scene.camera.aspect = new_size.width as f32 / new_size.height as f32;
        gfx.post.resize(
            &gfx.gpu.device,
            new_size.width,
            new_size.height,
            gfx.gpu.config.format,
        );
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let (Some(gfx), Some(window)) = (&mut self.gfx, &self.window) else {
            return Ok(());
        };
        let scene = &mut self.scene;

        let (elapsed, delta) = scene.clock.tick();
        scene.camera.update(delta);

        // Panel first: it may change parameters the uniforms depend on.
        let (panel, egui_output) = gfx.egui.run(
            window,
            &mut scene.params,
            &mut scene.dof,
            &mut scene.background,
        );

        if panel.regenerate {
            scene.params = scene.params.clone().clamped();
            let cloud = galaxy::generate(&scene.params);
            gfx.points.upload(&gfx.gpu.device, &cloud);
            log::debug!("regenerated {} points", cloud.len());
        }

        if panel.reload_skybox {
            match CubemapData::load(&scene.background.preset.dir()) {
                Ok(cubemap) => gfx.skybox.set_cubemap(&gfx.gpu.device, &gfx.gpu.queue, &cubemap),
                Err(err) => log::warn!(
                    "cubemap preset {} failed to load, keeping previous: {}",
                    scene.background.preset.label(),
                    err
                ),
            }
        }

        gfx.points.update_uniforms(
            &gfx.gpu.queue,
            &SceneUniforms {
                view: scene.camera.view_matrix().to_cols_array_2d(),
                proj: scene.camera.projection_matrix().to_cols_array_2d(),
                time: elapsed,
                point_size: scene.params.size,
                _padding: [0.0; 2],
            },
        );
        gfx.skybox
            .update_uniforms(&gfx.gpu.queue, scene.camera.sky_matrix(), scene.background.blur);
        gfx.post
            .update_uniforms(&gfx.gpu.queue, &scene.dof, NEAR, FAR);

        let output = gfx.gpu.surface.get_current_texture()?;
        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gfx
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        // Scene pass: skybox then points, offscreen when any post pass runs.
        {
            let (color_view, depth_view) = if scene.dof.any_pass() {
                (gfx.post.scene_view(), gfx.post.scene_depth_view())
            } else {
                (&surface_view, &gfx.gpu.depth_view)
            };

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            gfx.skybox.draw(&mut pass);
            gfx.points.draw(&mut pass);
        }

        if scene.dof.enabled {
            let target = if scene.dof.output_enabled {
                gfx.post.intermediate_view()
            } else {
                &surface_view
            };
            gfx.post.run_bokeh(&mut encoder, target);
        }
        if scene.dof.output_enabled {
            let source = if scene.dof.enabled {
                OutputSource::Intermediate
            } else {
                OutputSource::Scene
            };
            gfx.post.run_output(&mut encoder, source, &surface_view);
        }

        gfx.egui.paint(
            &gfx.gpu.device,
            &gfx.gpu.queue,
            &mut encoder,
            egui_output,
            [gfx.gpu.config.width, gfx.gpu.config.height],
            &surface_view,
        );

        gfx.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        if scene.clock.frame() % 30 == 0 {
            window.set_title(&format!(
                "galaxite ({} points, {:.0} fps)",
                gfx.points.point_count(),
                scene.clock.fps()
            ));
        }

        Ok(())
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            let window_attrs = Window::default_attributes()
                .with_title("galaxite")
                .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

            let window = Arc::new(event_loop.create_window(window_attrs).unwrap());
            self.window = Some(window.clone());
            self.gfx = Some(GfxState::new(window, &mut self.scene));
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let consumed = match (&mut self.gfx, &self.window) {
            (Some(gfx), Some(window)) => gfx.egui.on_window_event(window, &event),
            _ => false,
        };

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                self.resize(physical_size);
            }
            WindowEvent::MouseInput { state, button, .. } if !consumed => {
                if button == MouseButton::Left {
                    self.mouse_pressed = state == ElementState::Pressed;
                    if !self.mouse_pressed {
                        self.last_mouse_pos = None;
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } if !consumed => {
                if self.mouse_pressed {
                    if let Some((last_x, last_y)) = self.last_mouse_pos {
                        let dx = (position.x - last_x) as f32;
                        let dy = (position.y - last_y) as f32;
                        self.scene.camera.orbit(dx, dy);
                    }
                    self.last_mouse_pos = Some((position.x, position.y));
                }
            }
            WindowEvent::MouseWheel { delta, .. } if !consumed => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.1,
                };
                self.scene.camera.zoom(scroll);
            }
            WindowEvent::RedrawRequested => {
                match self.render() {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => {
                        let size = self.gfx.as_ref().map(|g| {
                            winit::dpi::PhysicalSize::new(g.gpu.config.width, g.gpu.config.height)
                        });
                        if let Some(size) = size {
                            self.resize(size);
                        }
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => event_loop.exit(),
                    Err(e) => log::error!("render error: {:?}", e),
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}
