//! `sl-gpu-hal` — GPU backends for surface compositing.
//!
//! Backends implement the `GpuBackend` trait defined in `sl-common`. The
//! software backend runs the composite program on the host with the same
//! texture layout and uniform data a device backend receives, which makes it
//! the reference for CPU/GPU conformance tests.

pub mod select;
pub mod software;

pub use select::{create_backend, describe_mode};
pub use software::SoftwareBackend;
