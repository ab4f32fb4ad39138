//! Mouse Chaser Annotation - Landmark annotation data model
//!
//! Implements the per-frame annotation state:
//! - The closed set of marker kinds and their arity
//! - Per-frame records with carry-forward creation
//! - The append-only ledger of records
//! - Round-robin slot cycling for multi-instance markers
//! - Versioned save files and the numbered save folder

pub mod cycler;
pub mod ledger;
pub mod marker;
pub mod record;
pub mod save;

pub use cycler::MarkerCycler;
pub use ledger::AnnotationLedger;
pub use marker::{Arity, MarkerKind};
pub use record::{AnnotationRecord, MarkerSet, Slots};
pub use save::{SaveFile, SaveStore};
