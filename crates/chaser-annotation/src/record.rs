//! Per-frame annotation records.

use crate::marker::{Arity, MarkerKind};
use chaser_core::{Point, SharedFrame};
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

/// Positions of a multi-instance marker.
pub type Slots = SmallVec<[Point; 4]>;

/// Every marker position on one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerSet {
    pub nose: Point,
    pub head: Point,
    pub tail: Point,
    pub water: Point,
    pub block: Point,
    pub ear: Slots,
    pub food: Slots,
}

impl Default for MarkerSet {
    fn default() -> Self {
        Self {
            nose: Point::ZERO,
            head: Point::ZERO,
            tail: Point::ZERO,
            water: Point::ZERO,
            block: Point::ZERO,
            ear: smallvec![Point::ZERO; MarkerKind::Ear.seed_slots()],
            food: smallvec![Point::ZERO; MarkerKind::Food.seed_slots()],
        }
    }
}

impl MarkerSet {
    fn single_mut(&mut self, kind: MarkerKind) -> Option<&mut Point> {
        match kind {
            MarkerKind::Nose => Some(&mut self.nose),
            MarkerKind::Head => Some(&mut self.head),
            MarkerKind::Tail => Some(&mut self.tail),
            MarkerKind::Water => Some(&mut self.water),
            MarkerKind::Block => Some(&mut self.block),
            MarkerKind::Ear | MarkerKind::Food => None,
        }
    }

    /// Position of a single-instance marker.
    pub fn single(&self, kind: MarkerKind) -> Option<Point> {
        match kind {
            MarkerKind::Nose => Some(self.nose),
            MarkerKind::Head => Some(self.head),
            MarkerKind::Tail => Some(self.tail),
            MarkerKind::Water => Some(self.water),
            MarkerKind::Block => Some(self.block),
            MarkerKind::Ear | MarkerKind::Food => None,
        }
    }

    /// Slots of a multi-instance marker.
    pub fn slots(&self, kind: MarkerKind) -> Option<&Slots> {
        match kind {
            MarkerKind::Ear => Some(&self.ear),
            MarkerKind::Food => Some(&self.food),
            _ => None,
        }
    }

    /// Mutable slots of a multi-instance marker.
    pub fn slots_mut(&mut self, kind: MarkerKind) -> Option<&mut Slots> {
        match kind {
            MarkerKind::Ear => Some(&mut self.ear),
            MarkerKind::Food => Some(&mut self.food),
            _ => None,
        }
    }

    /// Overwrite a single-instance marker. Returns false for multi kinds.
    pub fn set_single(&mut self, kind: MarkerKind, point: Point) -> bool {
        match self.single_mut(kind) {
            Some(slot) => {
                *slot = point;
                true
            }
            None => false,
        }
    }

    /// Overwrite slot `index` of a multi-instance marker.
    pub fn set_slot(&mut self, kind: MarkerKind, index: usize, point: Point) -> bool {
        match self.slots_mut(kind).and_then(|s| s.get_mut(index)) {
            Some(slot) => {
                *slot = point;
                true
            }
            None => false,
        }
    }

    /// Append a slot to a multi-instance marker.
    pub fn push_slot(&mut self, kind: MarkerKind, point: Point) -> bool {
        match self.slots_mut(kind) {
            Some(slots) => {
                slots.push(point);
                true
            }
            None => false,
        }
    }

    /// Pop the last slot of a multi-instance marker. Empty lists are left
    /// alone and report `false`.
    pub fn pop_slot(&mut self, kind: MarkerKind) -> bool {
        self.slots_mut(kind).and_then(|s| s.pop()).is_some()
    }

    /// Number of positions currently held for `kind`.
    pub fn count(&self, kind: MarkerKind) -> usize {
        match kind.arity() {
            Arity::Single => 1,
            Arity::Multi => self.slots(kind).map_or(0, |s| s.len()),
        }
    }
}

/// Ground truth for one frame: the image plus all marker positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// Index of the frame within the loaded video.
    pub frame_index: usize,
    /// Decoded frame.
    pub image: SharedFrame,
    #[serde(flatten)]
    pub markers: MarkerSet,
}

impl AnnotationRecord {
    /// The record for frame 0 of a freshly loaded video.
    pub fn seed(image: SharedFrame) -> Self {
        Self {
            frame_index: 0,
            image,
            markers: MarkerSet::default(),
        }
    }

    /// A copy of this record for a later frame. Markers carry over; image
    /// and index are replaced.
    pub fn carry_forward(&self, frame_index: usize, image: SharedFrame) -> Self {
        Self {
            frame_index,
            image,
            markers: self.markers.clone(),
        }
    }

    /// One-line marker summary.
    pub fn summary(&self) -> String {
        let fmt_slots = |s: &Slots| {
            s.iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        };
        let m = &self.markers;
        format!(
            "frame {} | nose {} head {} tail {} water {} block {} | ear [{}] | food [{}]",
            self.frame_index,
            m.nose,
            m.head,
            m.tail,
            m.water,
            m.block,
            fmt_slots(&m.ear),
            fmt_slots(&m.food),
        )
    }
}
