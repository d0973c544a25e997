//! # Galaxite
//!
//! Animated spiral galaxy renderer: a procedurally generated point cloud
//! twisting over a cubemap sky, with a bokeh depth-of-field pass and a live
//! debug panel.
//!
//! The interesting logic lives in [`galaxy`]: a closed-form point
//! distribution that places every star on one of a handful of evenly spaced
//! arms, jitters it toward the disk plane and colors it by distance from
//! the core. Everything else composes wgpu, winit and egui into the thin
//! pipeline that draws the result:
//!
//! - [`gpu::points`] renders the cloud as additively blended billboards and
//!   owns the GPU-side buffer lifecycle,
//! - [`gpu::skybox`] draws the background cube with a blur control,
//! - [`gpu::post_process`] holds the offscreen targets plus the bokeh and
//!   output passes,
//! - [`ui`] binds every tunable to the debug panel,
//! - [`app`] ties the pieces to a window and a frame clock.
//!
//! Run the binary and tweak away; generation parameters apply when a slider
//! is released, everything else updates live.

pub mod app;
pub mod camera;
pub mod error;
pub mod galaxy;
pub mod gpu;
pub mod textures;
pub mod time;
pub mod ui;

pub use galaxy::{generate, generate_with, GalaxyParams, PointCloud};
pub use glam::Vec3;
