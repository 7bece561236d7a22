//! Colormap error types.

use thiserror::Error;

/// Errors from colormap construction and preset lookup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ColorMapError {
    /// The requested preset is not in the registry.
    #[error("Unknown colormap preset: {name}")]
    UnknownPreset { name: String },

    /// The requested 2D palette name is not recognised.
    #[error("Unknown 2D palette: {name}")]
    UnknownPalette { name: String },

    /// A colormap needs at least one stop.
    #[error("Colormap has no color stops")]
    EmptyStops,

    /// A stop has a non-finite position or color component.
    #[error("Invalid color stop {index}: {reason}")]
    InvalidStop { index: usize, reason: String },

    /// A per-stop alpha array does not match the number of stops.
    #[error("Alpha override has {got} entries but the colormap has {expected} stops")]
    AlphaLengthMismatch { expected: usize, got: usize },

    /// An alpha override value is non-finite or outside `[0, 1]`.
    #[error("Invalid alpha override: {reason}")]
    InvalidAlpha { reason: String },

    /// A range or threshold bound is NaN or infinite.
    #[error("{field} bound {value} is not finite")]
    NonFiniteBound { field: &'static str, value: f32 },

    /// A preset with this name is already registered.
    #[error("Colormap preset already registered: {name}")]
    AlreadyRegistered { name: String },
}
