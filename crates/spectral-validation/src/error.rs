//! Error types for the validation engine
//!
//! Accuracy failures are not represented here: a run whose statistics fall
//! outside the policy gates still produces a [`crate::ValidationReport`] with a
//! failed verdict. Everything in this module aborts the validation call that
//! raised it.

use thiserror::Error;

/// Errors raised while preparing or executing a validation run
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Reference and candidate images do not share the same dimensions
    #[error("image dimensions differ: reference {reference:?}, candidate {candidate:?}")]
    DimensionMismatch {
        /// Dimensions of the reference image
        reference: (u32, u32),
        /// Dimensions of the candidate image
        candidate: (u32, u32),
    },

    /// An image with zero width or height was supplied
    #[error("image has zero size ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    /// Pixel data does not match the declared geometry
    #[error("invalid image data: {0}")]
    InvalidImageData(String),

    /// Threshold or ratio configuration is inconsistent
    #[error("invalid thresholds: {0}")]
    InvalidThresholds(String),

    /// Tile dimensions cannot be dispatched
    #[error("invalid tile size {width}x{height}: {reason}")]
    InvalidTileSize { width: u32, height: u32, reason: &'static str },

    /// Scenario name is not one of the known validation scenarios
    #[error("unknown validation scenario '{0}' (expected ColorBarValidation or SpectralMixValidation)")]
    UnknownScenario(String),

    /// No compatible GPU adapter could be found
    #[error("failed to request GPU adapter: {0}")]
    AdapterRequest(#[from] wgpu::RequestAdapterError),

    /// The adapter refused to create a device
    #[error("failed to request GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    /// Waiting for the device to finish work failed
    #[error("failed to wait for GPU completion: {0}")]
    Poll(#[from] wgpu::PollError),

    /// The statistics readback buffer could not be mapped
    #[error("failed to map readback buffer: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),

    /// The device reported a validation or allocation error during dispatch
    #[error("GPU dispatch failed: {0}")]
    Device(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to parse configuration: {0}")]
    Config(#[from] serde_norway::Error),
}

impl ValidationError {
    /// Returns true for errors caused by the caller's inputs rather than the device
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ValidationError::DimensionMismatch { .. }
                | ValidationError::EmptyImage { .. }
                | ValidationError::InvalidImageData(_)
                | ValidationError::InvalidThresholds(_)
                | ValidationError::InvalidTileSize { .. }
                | ValidationError::UnknownScenario(_)
        )
    }
}

/// Result alias used throughout the crate
pub type Result<T, E = ValidationError> = std::result::Result<T, E>;
