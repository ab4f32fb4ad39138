//! Mouse Chaser Media - FFmpeg integration for video I/O
//!
//! This crate handles:
//! - Video decoding into RGB frames (ffmpeg subprocess)
//! - Synthetic frame sources for demos and tests
//! - Discovery of annotatable videos in a directory
//! - Splitting long recordings into fixed-size clips

pub mod decoder;
pub mod discover;
pub mod source;
pub mod splitter;

pub use decoder::{FfmpegOpener, VideoDecoder};
pub use discover::{discover_videos, is_supported_video, VIDEO_EXTENSIONS};
pub use source::{FrameSource, SyntheticOpener, VideoOpener};
pub use splitter::{SplitJob, SplitProgress};
