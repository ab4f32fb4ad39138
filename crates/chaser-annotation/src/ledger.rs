//! The append-only ledger of annotation records.

use crate::record::AnnotationRecord;
use chaser_core::SharedFrame;

/// Records for every visited frame, index-aligned with the frame store.
///
/// Index 0 always exists. The ledger only grows during a load session:
/// records are appended when a frame is visited for the first time and are
/// never removed.
#[derive(Debug, Clone)]
pub struct AnnotationLedger {
    records: Vec<AnnotationRecord>,
}

impl AnnotationLedger {
    /// Start a ledger with the seed record for frame 0.
    pub fn new(first_frame: SharedFrame) -> Self {
        Self {
            records: vec![AnnotationRecord::seed(first_frame)],
        }
    }

    /// Number of records (visited frames).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Highest frame index with a record.
    pub fn annotated_through(&self) -> usize {
        self.records.len() - 1
    }

    /// Record for `index`, if visited.
    pub fn get(&self, index: usize) -> Option<&AnnotationRecord> {
        self.records.get(index)
    }

    /// Mutable record for `index`, if visited.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut AnnotationRecord> {
        self.records.get_mut(index)
    }

    /// All records in frame order.
    pub fn records(&self) -> &[AnnotationRecord] {
        &self.records
    }

    /// Make sure `index` has a record, creating it by carry-forward from the
    /// last record when `index` is the next unvisited frame.
    ///
    /// Returns true if a record was appended. Indices beyond the next
    /// unvisited frame are left alone; navigation only ever steps by one.
    pub fn ensure(&mut self, index: usize, image: SharedFrame) -> bool {
        if index != self.records.len() {
            return false;
        }
        let record = self.records[index - 1].carry_forward(index, image);
        self.records.push(record);
        true
    }
}
