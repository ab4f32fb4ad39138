//! Mouse Chaser Engine - Annotation engine and its worker loop
//!
//! The engine is the single owner of decoded frames and annotation records.
//! Peers (display, input, control panel) talk to it only through bounded
//! queues:
//! - Commands in: load a video, save, terminate
//! - Events in: marker placement, slot edits, frame navigation
//! - Status and render snapshots out

pub mod config;
pub mod engine;
pub mod frame_store;
pub mod protocol;
pub mod worker;

pub use config::EngineConfig;
pub use engine::Engine;
pub use frame_store::FrameStore;
pub use protocol::{keys, Binding, Command, Event, KeyMap, RawInput, RenderFrame, Status};
pub use worker::{EngineHandle, EngineWorker, TerminationSignal, TickOutcome, Ticker};
