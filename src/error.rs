//! Error types for texture loading and application startup.

use std::fmt;
use std::path::PathBuf;

/// Errors that can occur while loading a cubemap from disk.
#[derive(Debug)]
pub enum TextureError {
    /// A face image failed to decode or read.
    ImageLoad {
        /// Path of the offending face.
        path: PathBuf,
        /// Underlying decoder error.
        source: image::ImageError,
    },
    /// A face image is not square.
    NotSquare {
        path: PathBuf,
        width: u32,
        height: u32,
    },
    /// A face image does not match the size of the first face.
    SizeMismatch {
        path: PathBuf,
        expected: u32,
        actual: u32,
    },
}

impl fmt::Display for TextureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureError::ImageLoad { path, source } => {
                write!(f, "failed to load cubemap face {}: {}", path.display(), source)
            }
            TextureError::NotSquare {
                path,
                width,
                height,
            } => write!(
                f,
                "cubemap face {} is not square ({}x{})",
                path.display(),
                width,
                height
            ),
            TextureError::SizeMismatch {
                path,
                expected,
                actual,
            } => write!(
                f,
                "cubemap face {} is {}px but the first face was {}px",
                path.display(),
                actual,
                expected
            ),
        }
    }
}

impl std::error::Error for TextureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TextureError::ImageLoad { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors that can occur when running the application.
#[derive(Debug)]
pub enum AppError {
    /// Failed to create or run the event loop.
    EventLoop(winit::error::EventLoopError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::EventLoop(e) => write!(f, "event loop error: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::EventLoop(e) => Some(e),
        }
    }
}

impl From<winit::error::EventLoopError> for AppError {
    fn from(e: winit::error::EventLoopError) -> Self {
        AppError::EventLoop(e)
    }
}
