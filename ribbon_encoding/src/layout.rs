// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bit-field layout of composite vertex ids.

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

/// Number of bits needed to store every value in `0..range`.
pub const fn bits_for_range(range: u32) -> u32 {
    if range <= 1 {
        0
    } else {
        32 - (range - 1).leading_zeros()
    }
}

/// Mask with the low `bits` bits set.
pub const fn bit_mask(bits: u32) -> u32 {
    if bits >= 32 {
        u32::MAX
    } else {
        (1 << bits) - 1
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum LayoutError {
    /// The three fields together need more bits than a 32-bit index holds.
    #[error("composite vertex id needs {total_bits} bits, at most 32 are available")]
    TooManyBits { total_bits: u32 },
}

impl LayoutError {
    /// Bits the requested layout would have needed.
    pub fn total_bits(&self) -> u32 {
        match self {
            Self::TooManyBits { total_bits } => *total_bits,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IndexWidth {
    U16,
    #[default]
    U32,
}

impl IndexWidth {
    pub const fn size_in_bytes(self) -> u32 {
        match self {
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

/// A decoded composite vertex id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CompositeVertexIndex {
    pub segment: u32,
    pub sub_segment: u32,
    pub slice_vertex: u32,
}

/// Widths of the `(segment, sub_segment, slice_vertex)` fields, from most to least
/// significant.
///
/// The layout is shared with the vertex stage, which decodes ids with the same shifts
/// and masks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct CompositeIndexLayout {
    pub segment_bits: u32,
    pub sub_segment_bits: u32,
    pub shape_bits: u32,
    pub pad0: u32,
}

impl CompositeIndexLayout {
    /// Creates the layout for up to `max_segment_count` segment ids and
    /// `sub_segment_count` sub-segments per segment.
    pub fn new(
        max_segment_count: u32,
        sub_segment_count: u32,
        shape_bits: u32,
    ) -> Result<Self, LayoutError> {
        let layout = Self {
            segment_bits: bits_for_range(max_segment_count),
            sub_segment_bits: bits_for_range(sub_segment_count),
            shape_bits,
            pad0: 0,
        };
        let total_bits = layout.total_bits();
        if total_bits > 32 {
            return Err(LayoutError::TooManyBits { total_bits });
        }
        Ok(layout)
    }

    pub const fn total_bits(&self) -> u32 {
        self.segment_bits + self.sub_segment_bits + self.shape_bits
    }

    pub const fn segment_shift(&self) -> u32 {
        self.sub_segment_bits + self.shape_bits
    }

    pub const fn sub_segment_shift(&self) -> u32 {
        self.shape_bits
    }

    pub const fn segment_mask(&self) -> u32 {
        bit_mask(self.segment_bits)
    }

    pub const fn sub_segment_mask(&self) -> u32 {
        bit_mask(self.sub_segment_bits)
    }

    pub const fn shape_mask(&self) -> u32 {
        bit_mask(self.shape_bits)
    }

    /// 16-bit indices are only used when every id fits and 32-bit is not forced.
    pub const fn index_width(&self, force_index32: bool) -> IndexWidth {
        if self.total_bits() <= 16 && !force_index32 {
            IndexWidth::U16
        } else {
            IndexWidth::U32
        }
    }

    /// Packs `(segment, sub_segment)` without a slice vertex.
    ///
    /// Bits shifted past the top of the word are dropped, matching what the vertex stage
    /// sees on the GPU.
    pub fn segment_base(&self, segment: u32, sub_segment: u32) -> u32 {
        segment.checked_shl(self.segment_shift()).unwrap_or(0)
            | sub_segment.checked_shl(self.sub_segment_shift()).unwrap_or(0)
    }

    pub fn encode(&self, index: CompositeVertexIndex) -> u32 {
        debug_assert!(index.slice_vertex <= self.shape_mask());
        self.segment_base(index.segment, index.sub_segment) | index.slice_vertex
    }

    pub fn decode(&self, id: u32) -> CompositeVertexIndex {
        CompositeVertexIndex {
            segment: id.checked_shr(self.segment_shift()).unwrap_or(0) & self.segment_mask(),
            sub_segment: id.checked_shr(self.sub_segment_shift()).unwrap_or(0)
                & self.sub_segment_mask(),
            slice_vertex: id & self.shape_mask(),
        }
    }
}

/// Writes the `adjacency.len() * 3` indices of one sub-segment of `segment`.
///
/// `adjacency` holds pairs of slice vertex ids, one pair per shape edge. The edge list is
/// split at `flip_index`; edges before it and edges after it use opposite diagonals so
/// that front and back faces of the shape are built consistently. The final sub-segment
/// connects to sub-segment zero of the next segment.
pub fn write_sub_segment_indices(
    layout: &CompositeIndexLayout,
    adjacency: &[u32],
    flip_index: usize,
    segment: u32,
    sub_segment: u32,
    sub_segment_count: u32,
    out: &mut [u32],
) {
    let is_final = sub_segment + 1 >= sub_segment_count;
    let curr = layout.segment_base(segment, sub_segment);
    let next = if is_final {
        layout.segment_base(segment + 1, 0)
    } else {
        layout.segment_base(segment, sub_segment + 1)
    };
    for (edge, (pair, tri)) in adjacency
        .chunks_exact(2)
        .zip(out.chunks_exact_mut(6))
        .enumerate()
    {
        let (a, b) = (pair[0], pair[1]);
        if edge * 2 < flip_index {
            tri.copy_from_slice(&[
                curr | a,
                curr | b,
                next | a,
                curr | b,
                next | b,
                next | a,
            ]);
        } else {
            tri.copy_from_slice(&[
                curr | a,
                curr | b,
                next | b,
                curr | a,
                next | b,
                next | a,
            ]);
        }
    }
}
