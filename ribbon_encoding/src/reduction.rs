// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use bytemuck::{Pod, Zeroable};

use super::{Monoid, Vec3};

/// The point survives minimum segment length filtering.
pub const POINT_FLAG_KEPT: u32 = 1;
/// The point is the first of its ribbon in sorted order.
pub const POINT_FLAG_RIBBON_START: u32 = 2;
/// The point is the last of its ribbon in sorted order.
pub const POINT_FLAG_RIBBON_END: u32 = 4;

/// Per sorted point scratch data written by `reduction_init`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
#[repr(C)]
pub struct RibbonPoint {
    pub tangent: Vec3,
    /// Index of the source particle.
    pub particle: u32,
    pub flags: u32,
    pub pad0: u32,
    pub pad1: u32,
    pub pad2: u32,
}

/// Sorted index range of one ribbon, written by `reduction_apply`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct RibbonRange {
    pub first: u32,
    pub last: u32,
}

/// Values contributed by a single sorted point to the ribbon scan.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointContribution {
    pub kept: bool,
    pub ribbon_start: bool,
    /// Distance to the previous kept point of the same ribbon, zero when not kept.
    pub distance: f32,
    pub length_sq: f32,
    pub angle: f32,
    pub twist: f32,
    pub width: f32,
}

/// Monoid scanned over all sorted points.
///
/// Besides plain sums it carries enough state to answer, for every point, how many
/// retained points precede it in its ribbon, how many ribbons contain a retained point,
/// and the arc length inside the current ribbon. A "piece" below is a run of points
/// between ribbon starts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
#[repr(C)]
pub struct RibbonAccumulation {
    /// Retained points.
    pub kept: u32,
    /// Ribbon starts.
    pub ribbons: u32,
    /// Retained points before the first ribbon start.
    pub head_kept: u32,
    /// Retained points since the last ribbon start.
    pub seg_kept: u32,
    /// Ribbons whose first retained point lies in the range.
    pub nonempty: u32,
    /// Arc length since the last ribbon start.
    pub seg_distance: f32,
    pub total_length: f32,
    pub length_sq: f32,
    pub angle: f32,
    pub twist: f32,
    pub width: f32,
    pub pad0: u32,
}

impl Monoid for RibbonAccumulation {
    type SourceValue = PointContribution;

    fn new(value: PointContribution) -> Self {
        let kept = u32::from(value.kept);
        let ribbons = u32::from(value.ribbon_start);
        Self {
            kept,
            ribbons,
            head_kept: if value.ribbon_start { 0 } else { kept },
            seg_kept: kept,
            nonempty: kept,
            seg_distance: value.distance,
            total_length: value.distance,
            length_sq: value.length_sq,
            angle: value.angle,
            twist: value.twist,
            width: value.width,
            pad0: 0,
        }
    }

    fn combine(&self, other: &Self) -> Self {
        let joined = u32::from(self.seg_kept > 0 && other.head_kept > 0);
        Self {
            kept: self.kept + other.kept,
            ribbons: self.ribbons + other.ribbons,
            head_kept: if self.ribbons == 0 {
                self.head_kept + other.head_kept
            } else {
                self.head_kept
            },
            seg_kept: if other.ribbons == 0 {
                self.seg_kept + other.seg_kept
            } else {
                other.seg_kept
            },
            nonempty: self.nonempty + other.nonempty - joined,
            seg_distance: if other.ribbons == 0 {
                self.seg_distance + other.seg_distance
            } else {
                other.seg_distance
            },
            total_length: self.total_length + other.total_length,
            length_sq: self.length_sq + other.length_sq,
            angle: self.angle + other.angle,
            twist: self.twist + other.twist,
            width: self.width + other.width,
            pad0: 0,
        }
    }
}

impl RibbonAccumulation {
    /// Segments fully contained in the scanned prefix.
    pub fn segments(&self) -> u32 {
        self.kept - self.nonempty
    }
}
