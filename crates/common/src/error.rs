//! GPU backend error type (thiserror-based).
//!
//! Each higher-level crate defines its own error enum and wraps this one.

use thiserror::Error;

/// GPU backend errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GpuError {
    #[error("GPU device initialization failed: {0}")]
    DeviceInit(String),

    #[error("GPU texture allocation failed: {width}x{height}")]
    AllocFailed { width: u32, height: u32 },

    #[error("Texture upload failed: expected {expected} floats, got {got}")]
    UploadSizeMismatch { expected: usize, got: usize },

    #[error("Unknown GPU handle {0}")]
    InvalidHandle(u64),

    #[error("Shader program compilation failed: {0}")]
    ShaderCompile(String),

    #[error("Composite dispatch failed: {0}")]
    DispatchFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = GpuError::UploadSizeMismatch {
            expected: 16,
            got: 12,
        };
        let msg = err.to_string();
        assert!(msg.contains("16") && msg.contains("12"));

        let err = GpuError::InvalidHandle(42);
        assert!(err.to_string().contains("42"));
    }
}
