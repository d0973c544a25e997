//! Cubemap loading for the sky background.
//!
//! Presets are fixed directories of six face images named after the axis
//! they cover (`px.png` .. `nz.png`). Faces load synchronously; a failed
//! load leaves the previous texture bound, so the caller decides how loud
//! to be about it.

use crate::error::TextureError;
use std::path::{Path, PathBuf};

/// Face stems in wgpu layer order (+X, -X, +Y, -Y, +Z, -Z).
pub const CUBE_FACES: [&str; 6] = ["px", "nx", "py", "ny", "pz", "nz"];

/// Texture sampling filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Smooth linear filtering.
    Linear,
    /// Sharp nearest-neighbor filtering (default, keeps starfields crisp).
    #[default]
    Nearest,
}

impl FilterMode {
    pub fn to_wgpu(self) -> wgpu::FilterMode {
        match self {
            FilterMode::Linear => wgpu::FilterMode::Linear,
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
        }
    }
}

/// The selectable sky backgrounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SkyboxPreset {
    A,
    #[default]
    B,
    C,
    D,
    E,
}

impl SkyboxPreset {
    pub const ALL: [SkyboxPreset; 5] = [
        SkyboxPreset::A,
        SkyboxPreset::B,
        SkyboxPreset::C,
        SkyboxPreset::D,
        SkyboxPreset::E,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SkyboxPreset::A => "A",
            SkyboxPreset::B => "B",
            SkyboxPreset::C => "C",
            SkyboxPreset::D => "D",
            SkyboxPreset::E => "E",
        }
    }

    pub fn dir(self) -> PathBuf {
        let leaf = match self {
            SkyboxPreset::A => "a",
            SkyboxPreset::B => "b",
            SkyboxPreset::C => "c",
            SkyboxPreset::D => "d",
            SkyboxPreset::E => "e",
        };
        Path::new("assets/cubemaps").join(leaf)
    }
}

/// Runtime background settings, owned by the application context.
#[derive(Debug, Clone, Copy)]
pub struct BackgroundSettings {
    pub preset: SkyboxPreset,
    /// Blur intensity in [0, 1].
    pub blur: f32,
}

impl Default for BackgroundSettings {
    fn default() -> Self {
        Self {
            preset: SkyboxPreset::default(),
            blur: 0.1,
        }
    }
}

/// Decoded cubemap pixels: six square RGBA faces, layer-major.
#[derive(Debug, Clone)]
pub struct CubemapData {
    /// Edge length of each face in pixels.
    pub size: u32,
    /// `size * size * 4 * 6` bytes.
    pub data: Vec<u8>,
    pub filter: FilterMode,
}

impl CubemapData {
    /// Load the six faces from `dir`.
    pub fn load(dir: &Path) -> Result<Self, TextureError> {
        let mut size = 0u32;
        let mut data = Vec::new();

        for face in CUBE_FACES {
            let path = dir.join(format!("{face}.png"));
            let image = image::open(&path).map_err(|source| TextureError::ImageLoad {
                path: path.clone(),
                source,
            })?;
            let rgba = image.into_rgba8();
            let (width, height) = rgba.dimensions();
            if width != height {
                return Err(TextureError::NotSquare {
                    path,
                    width,
                    height,
                });
            }
            if size == 0 {
                size = width;
                data.reserve((size as usize * size as usize * 4) * 6);
            } else if width != size {
                return Err(TextureError::SizeMismatch {
                    path,
                    expected: size,
                    actual: width,
                });
            }
            data.extend_from_slice(&rgba.into_raw());
        }

        Ok(Self {
            size,
            data,
            filter: FilterMode::default(),
        })
    }

    /// A 1x1 deep-space blue fallback, used until a preset loads.
    pub fn placeholder() -> Self {
        let face = [5u8, 5, 13, 255];
        let mut data = Vec::with_capacity(4 * 6);
        for _ in 0..6 {
            data.extend_from_slice(&face);
        }
        Self {
            size: 1,
            data,
            filter: FilterMode::Nearest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_a_unit_cubemap() {
        let cube = CubemapData::placeholder();
        assert_eq!(cube.size, 1);
        assert_eq!(cube.data.len(), 4 * 6);
    }

    #[test]
    fn preset_dirs_are_distinct() {
        let mut dirs: Vec<_> = SkyboxPreset::ALL.iter().map(|p| p.dir()).collect();
        dirs.dedup();
        assert_eq!(dirs.len(), 5);
        assert_eq!(SkyboxPreset::B.dir(), Path::new("assets/cubemaps/b"));
    }

    #[test]
    fn missing_dir_reports_image_load() {
        let err = CubemapData::load(Path::new("no/such/dir")).unwrap_err();
        assert!(matches!(err, TextureError::ImageLoad { .. }));
    }

    #[test]
    fn face_order_matches_wgpu_layers() {
        assert_eq!(CUBE_FACES, ["px", "nx", "py", "ny", "pz", "nz"]);
    }
}
