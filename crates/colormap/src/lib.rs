//! `sl-colormap` — Scalar and scalar-pair color mapping.
//!
//! This crate provides:
//! - [`ColorMap`]: piecewise-linear scalar → RGBA with range normalization,
//!   hide-band thresholding and optional alpha override
//! - [`ColorMapRegistry`]: an injectable table of named presets
//!   (`jet`, `hot`, `viridis`, `rdbu`, ...)
//! - [`ColorMap2D`]: scalar-pair → RGBA through a [`Palette2D`]
//!
//! Threshold semantics are "hide-inside": values in `[low, high]` get alpha 0.

pub mod colormap;
pub mod colormap2d;
pub mod error;
pub mod presets;

pub use colormap::{AlphaOverride, ColorMap, ColorStop};
pub use colormap2d::{ColorMap2D, Palette2D, PaletteTable, PALETTE_SIZE};
pub use error::ColorMapError;
pub use presets::{even_stops, ColorMapRegistry};
