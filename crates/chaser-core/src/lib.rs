//! Mouse Chaser Core - Foundation types for landmark annotation
//!
//! This crate provides the fundamental types used throughout Mouse Chaser:
//! - Frame buffers holding decoded RGB video frames
//! - Integer pixel coordinates for marker positions
//! - The shared error type

pub mod error;
pub mod frame;
pub mod geometry;

pub use error::{ChaserError, Result};
pub use frame::{FrameBuffer, SharedFrame};
pub use geometry::Point;
