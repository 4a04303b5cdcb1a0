//! Error types for the CAVE simulator
//!
//! Everything here is fatal: there is no degraded mode, a failing session or
//! render target ends the process from `main`.

use std::fmt;

/// Result type alias using CaveError
pub type CaveResult<T> = Result<T, CaveError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum CaveError {
    /// GPU device or render target errors
    Gpu(GpuError),
    /// Invalid or unreadable configuration
    Config(String),
    /// Window creation or event loop errors
    Window(String),
}

/// GPU-specific errors
#[derive(Debug, Clone)]
pub enum GpuError {
    /// No adapter compatible with the window surface
    NoAdapter,
    /// Device request rejected by the adapter
    RequestDevice(String),
    /// Surface creation or configuration failed
    Surface(String),
    /// A render target could not be built with the requested attachments
    IncompleteTarget { label: String, reason: String },
}

impl fmt::Display for CaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaveError::Gpu(e) => write!(f, "GPU error: {}", e),
            CaveError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CaveError::Window(msg) => write!(f, "Window error: {}", msg),
        }
    }
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::NoAdapter => write!(f, "no compatible GPU adapter found"),
            GpuError::RequestDevice(msg) => write!(f, "failed to create device: {}", msg),
            GpuError::Surface(msg) => write!(f, "surface error: {}", msg),
            GpuError::IncompleteTarget { label, reason } => {
                write!(f, "render target '{}' incomplete: {}", label, reason)
            }
        }
    }
}

impl std::error::Error for CaveError {}
impl std::error::Error for GpuError {}

impl From<GpuError> for CaveError {
    fn from(err: GpuError) -> Self {
        CaveError::Gpu(err)
    }
}

impl From<serde_json::Error> for CaveError {
    fn from(err: serde_json::Error) -> Self {
        CaveError::Config(err.to_string())
    }
}

impl From<std::io::Error> for CaveError {
    fn from(err: std::io::Error) -> Self {
        CaveError::Config(err.to_string())
    }
}

impl From<winit::error::EventLoopError> for CaveError {
    fn from(err: winit::error::EventLoopError) -> Self {
        CaveError::Window(err.to_string())
    }
}
