// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the transform library, the renderer and the CLI

use std::fmt;

/// Result type alias for pixel transforms
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type alias for renderer operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Precondition violations raised by the pixel transform library
///
/// These are never recovered inside the library. Callers are expected to
/// discard the offending frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformError {
    /// Width or height is zero or odd (4:2:0 needs even dimensions)
    InvalidDimensions { width: u32, height: u32 },
    /// Buffer length does not match `width * height * 3 / 2`
    InvalidBufferSize { expected: usize, actual: usize },
}

/// Renderer errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Shader, pipeline or resource creation failed; fatal for the instance
    InitFailed(String),
    /// Per-frame GPU failure; the renderer stays usable
    Gpu(String),
    /// Call made before the surface was initialized
    SurfaceNotReady,
    /// Delivered frame failed validation
    Frame(TransformError),
}

/// Top-level error used by the command-line front end
#[derive(Debug)]
pub enum AppError {
    /// Transform precondition failure
    Transform(TransformError),
    /// Renderer failure
    Render(RenderError),
    /// Configuration errors
    Config(String),
    /// Filesystem errors
    Io(std::io::Error),
    /// Image encoding errors
    Image(String),
    /// Generic error with message
    Other(String),
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformError::InvalidDimensions { width, height } => write!(
                f,
                "Invalid dimensions {}x{}: width and height must be even and non-zero",
                width, height
            ),
            TransformError::InvalidBufferSize { expected, actual } => write!(
                f,
                "Invalid buffer size: {} bytes, expected {}",
                actual, expected
            ),
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::InitFailed(msg) => write!(f, "Renderer initialization failed: {}", msg),
            RenderError::Gpu(msg) => write!(f, "GPU error: {}", msg),
            RenderError::SurfaceNotReady => write!(f, "Render surface is not ready"),
            RenderError::Frame(e) => write!(f, "Rejected frame: {}", e),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Transform(e) => write!(f, "Transform error: {}", e),
            AppError::Render(e) => write!(f, "Render error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Io(e) => write!(f, "I/O error: {}", e),
            AppError::Image(msg) => write!(f, "Image error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for TransformError {}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Frame(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Transform(e) => Some(e),
            AppError::Render(e) => Some(e),
            AppError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransformError> for RenderError {
    fn from(err: TransformError) -> Self {
        RenderError::Frame(err)
    }
}

impl From<TransformError> for AppError {
    fn from(err: TransformError) -> Self {
        AppError::Transform(err)
    }
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        AppError::Render(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err)
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Image(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}
