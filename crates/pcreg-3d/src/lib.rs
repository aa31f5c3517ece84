#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for the crate.
pub mod error;

/// Small fixed-size linear algebra helpers.
pub mod linalg;

/// Point cloud container.
pub mod pointcloud;

/// Rigid transform construction from pose parameters.
pub mod transforms;

pub use crate::error::Pcreg3dError;
