use glam::DVec2;
use serde::Serialize;

use crate::map_data::ElementRef;
use crate::math::LineSegmentXZ;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OverlapKind {
    /// The elements have a boundary segment in common
    ShareSegment,
    /// `e1` lies within `e2`
    Contain,
    /// Outlines cross
    Intersect,
}

/// Detected relationship between two map elements
#[derive(Debug, Clone, PartialEq)]
pub struct Overlap {
    pub e1: ElementRef,
    pub e2: ElementRef,
    pub kind: OverlapKind,
    pub intersection_positions: Vec<DVec2>,
    /// Crossed area boundary segments and crossing points (segment/area overlaps only)
    pub intersecting_segments: Vec<(LineSegmentXZ, DVec2)>,
}

impl Overlap {
    pub fn new(e1: ElementRef, e2: ElementRef, kind: OverlapKind) -> Self {
        Self {
            e1,
            e2,
            kind,
            intersection_positions: Vec::new(),
            intersecting_segments: Vec::new(),
        }
    }

    pub fn involves(&self, element: ElementRef) -> bool {
        self.e1 == element || self.e2 == element
    }

    /// The participant that is not `element`
    pub fn other(&self, element: ElementRef) -> Option<ElementRef> {
        if self.e1 == element {
            Some(self.e2)
        } else if self.e2 == element {
            Some(self.e1)
        } else {
            None
        }
    }

    /// Whether `element` is the contained side of a `Contain` overlap
    pub fn is_contained(&self, element: ElementRef) -> bool {
        self.kind == OverlapKind::Contain && self.e1 == element
    }
}
