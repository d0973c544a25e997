//! Debug panel and egui plumbing.
//!
//! [`EguiLayer`] owns the egui context and its winit/wgpu glue. The panel
//! itself is a plain function over the mutable settings structs; it reports
//! which side effects the caller has to perform through [`PanelResponse`].
//!
//! Generation parameters commit when the slider interaction ends, so a drag
//! across the count slider does not regenerate a hundred thousand points per
//! frame. Uniform-backed settings apply immediately.

use std::sync::Arc;

use winit::window::Window;

use crate::galaxy::GalaxyParams;
use crate::gpu::DofSettings;
use crate::textures::{BackgroundSettings, SkyboxPreset};

/// Side effects requested by the panel this frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanelResponse {
    /// Regenerate the point cloud from the current parameters.
    pub regenerate: bool,
    /// Reload the skybox cubemap for the selected preset.
    pub reload_skybox: bool,
}

/// Egui context plus its winit and wgpu adapters.
pub struct EguiLayer {
    pub ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
}

impl EguiLayer {
    pub fn new(
        device: &wgpu::Device,
        output_format: wgpu::TextureFormat,
        window: &Arc<Window>,
    ) -> Self {
        let ctx = egui::Context::default();

        let mut style = egui::Style::default();
        style.visuals = egui::Visuals::dark();
        style.visuals.window_shadow = egui::Shadow::NONE;
        style.visuals.popup_shadow = egui::Shadow::NONE;
        ctx.set_style(style);

        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window.as_ref(),
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let renderer = egui_wgpu::Renderer::new(
            device,
            output_format,
            egui_wgpu::RendererOptions {
                depth_stencil_format: None, // depth format
                msaa_samples: 1,            // msaa samples
                dithering: false,           // dithering
                ..Default::default()
            },
        );

        Self {
            ctx,
            state,
            renderer,
        }
    }

    /// Feed a winit event to egui. Returns true if egui consumed it, in
    /// which case camera controls should not see it.
    pub fn on_window_event(&mut self, window: &Window, event: &winit::event::WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Run the panel for one frame and queue its paint data.
    pub fn run(
        &mut self,
        window: &Window,
        params: &mut GalaxyParams,
        dof: &mut DofSettings,
        background: &mut BackgroundSettings,
    ) -> (PanelResponse, egui::FullOutput) {
        let raw_input = self.state.take_egui_input(window);
        self.ctx.begin_frame(raw_input);

        let response = draw_panel(&self.ctx, params, dof, background);

        let full_output = self.ctx.end_frame();
        self.state
            .handle_platform_output(window, full_output.platform_output.clone());
        (response, full_output)
    }

    /// Tessellate and draw the queued frame onto `target`.
    pub fn paint(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        full_output: egui::FullOutput,
        size_in_pixels: [u32; 2],
        target: &wgpu::TextureView,
    ) {
        let pixels_per_point = full_output.pixels_per_point;
        let paint_jobs = self
            .ctx
            .tessellate(full_output.shapes, pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels,
            pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            self.renderer
                .update_texture(device, queue, *id, image_delta);
        }
        self.renderer
            .update_buffers(device, queue, encoder, &paint_jobs, &screen_descriptor);

        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Egui Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: target,
                        resolve_target: None,
                        depth_slice: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();
            self.renderer
                .render(&mut pass, &paint_jobs, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }
}

/// A slider interaction that just finished.
fn committed(response: &egui::Response) -> bool {
    response.drag_stopped() || response.lost_focus()
}

fn draw_panel(
    ctx: &egui::Context,
    params: &mut GalaxyParams,
    dof: &mut DofSettings,
    background: &mut BackgroundSettings,
) -> PanelResponse {
    let mut response = PanelResponse::default();

    egui::Window::new("Galaxy")
        .default_pos([10.0, 10.0])
        .default_open(false)
        .resizable(false)
        .show(ctx, |ui| {
            ui.heading("Generation");
            ui.separator();

            let mut commit = false;
            commit |= committed(&ui.add(
                egui::Slider::new(&mut params.count, 100..=1_000_000)
                    .step_by(100.0)
                    .text("count"),
            ));
            commit |= committed(&ui.add(
                egui::Slider::new(&mut params.radius, 0.01..=20.0).text("radius"),
            ));
            commit |= committed(&ui.add(
                egui::Slider::new(&mut params.branches, 2..=20).text("branches"),
            ));
            commit |= committed(&ui.add(
                egui::Slider::new(&mut params.randomness, 0.0..=2.0).text("randomness"),
            ));
            commit |= committed(&ui.add(
                egui::Slider::new(&mut params.randomness_power, 1.0..=10.0)
                    .text("randomness power"),
            ));
            commit |= committed(&ui.add(
                egui::Slider::new(&mut params.lerp_intensity, 1.0..=3.0).text("color mix"),
            ));

            ui.horizontal(|ui| {
                ui.label("inside:");
                let mut inside = params.inside_color.to_array();
                if ui.color_edit_button_rgb(&mut inside).changed() {
                    params.inside_color = inside.into();
                    commit = true;
                }
                ui.label("outside:");
                let mut outside = params.outside_color.to_array();
                if ui.color_edit_button_rgb(&mut outside).changed() {
                    params.outside_color = outside.into();
                    commit = true;
                }
            });
            response.regenerate = commit;

            ui.add(egui::Slider::new(&mut params.size, 0.001..=0.05).text("point size"));

            ui.separator();
            ui.heading("Depth of Field");
            ui.add(egui::Slider::new(&mut dof.focus, 1.0..=300.0).text("focus"));
            ui.add(egui::Slider::new(&mut dof.aperture, 0.0..=10.0).text("aperture"));
            ui.add(
                egui::Slider::new(&mut dof.max_blur, 0.0..=0.01)
                    .step_by(0.001)
                    .text("max blur"),
            );
            ui.checkbox(&mut dof.enabled, "depth of field");
            ui.checkbox(&mut dof.output_enabled, "output pass");

            ui.separator();
            ui.heading("Background");
            let before = background.preset;
            egui::ComboBox::from_label("cubemap")
                .selected_text(background.preset.label())
                .show_ui(ui, |ui| {
                    for preset in SkyboxPreset::ALL {
                        ui.selectable_value(&mut background.preset, preset, preset.label());
                    }
                });
            response.reload_skybox = background.preset != before;
            ui.add(egui::Slider::new(&mut background.blur, 0.0..=1.0).text("blur"));

            ui.separator();
            ui.label("Drag to orbit, scroll to zoom");
        });

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_response_is_inert() {
        let r = PanelResponse::default();
        assert!(!r.regenerate);
        assert!(!r.reload_skybox);
    }
}
