// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Index synthesis for the sequential path.

use std::sync::atomic::{AtomicBool, Ordering};

use ribbon_encoding::{
    write_sub_segment_indices, CompositeIndexLayout, DrawDirection, IndexWidth, RibbonExtents,
    ShapeSlice, Vec3,
};

use crate::vertex::GeneratedVertexData;
use crate::{Error, Result};

static WARNED_FORCED_INDEX32: AtomicBool = AtomicBool::new(false);

/// Index data in the narrowest width the layout allows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexBuffer {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl Default for IndexBuffer {
    fn default() -> Self {
        Self::U16(Vec::new())
    }
}

impl IndexBuffer {
    fn with_width(width: IndexWidth, indices: Vec<u32>) -> Self {
        match width {
            // The layout guarantees every id fits in 16 bits.
            IndexWidth::U16 => Self::U16(indices.into_iter().map(|i| i as u16).collect()),
            IndexWidth::U32 => Self::U32(indices),
        }
    }

    pub fn width(&self) -> IndexWidth {
        match self {
            Self::U16(_) => IndexWidth::U16,
            Self::U32(_) => IndexWidth::U32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates the indices widened to `u32`.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        let (narrow, wide) = match self {
            Self::U16(v) => (Some(v.iter().map(|&i| u32::from(i))), None),
            Self::U32(v) => (None, Some(v.iter().copied())),
        };
        narrow.into_iter().flatten().chain(wide.into_iter().flatten())
    }

    /// Raw little-endian bytes, as they would be uploaded.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::U16(v) => bytemuck::cast_slice(v),
            Self::U32(v) => bytemuck::cast_slice(v),
        }
    }
}

/// Index buffer of one frame together with the layout its ids are packed with.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeneratedIndices {
    pub indices: IndexBuffer,
    pub layout: CompositeIndexLayout,
    pub sub_segment_count: u32,
    /// Capacity the layout was sized for: one entry per sorted point, every one of them
    /// a full segment.
    pub total_num_indices: u32,
}

/// Number of indices of `segments` segments with `sub_segments` sub-segments each.
///
/// Fails when the count does not fit in 32 bits, reporting an upper estimate of the
/// bits it would need.
pub(crate) fn index_capacity(
    segments: u32,
    sub_segments: u32,
    triangles_per_segment: u32,
) -> Result<u32> {
    segments
        .checked_mul(sub_segments)
        .and_then(|count| count.checked_mul(triangles_per_segment))
        .and_then(|count| count.checked_mul(3))
        .ok_or_else(|| Error::IndexBudgetExceeded {
            total_bits: [segments, sub_segments, triangles_per_segment, 3]
                .iter()
                .map(|value| u32::BITS - value.leading_zeros())
                .sum(),
        })
}

/// Whether a translucent ribbon must be emitted back to front by reversing its segments.
pub fn use_invert_order(
    direction: DrawDirection,
    extents: &RibbonExtents,
    view_direction: Vec3,
) -> bool {
    direction.inverts(extents, view_direction)
}

/// Inputs of [`generate_indices`] that come from the renderer configuration.
#[derive(Clone, Copy, Debug)]
pub struct IndexGenParams<'a> {
    pub shape: &'a ShapeSlice,
    pub sub_segment_count: u32,
    pub force_index32: bool,
    /// Draw direction and view direction, for translucent materials only.
    pub translucent: Option<(DrawDirection, Vec3)>,
}

/// Emits the triangles of every segment of `data`.
///
/// Segments are emitted ribbon by ribbon; for translucent materials a ribbon whose end
/// points the wrong way along the view is emitted in reverse.
pub fn generate_indices(
    data: &GeneratedVertexData,
    params: &IndexGenParams<'_>,
) -> Result<GeneratedIndices> {
    let shape = params.shape;
    let sub_segment_count = params.sub_segment_count.max(1);
    let max_segment_count = data.sorted_indices.len() as u32;
    let layout =
        CompositeIndexLayout::new(max_segment_count, sub_segment_count, shape.bits_for_shape)?;
    let total_num_indices =
        index_capacity(max_segment_count, sub_segment_count, shape.triangles_per_segment)?;
    let width = layout.index_width(params.force_index32);
    if params.force_index32
        && layout.index_width(false) == IndexWidth::U16
        && !WARNED_FORCED_INDEX32.swap(true, Ordering::Relaxed)
    {
        log::warn!("ribbon indices forced to 32 bits although 16 bits would fit");
    }

    let adjacency = &shape.triangle_to_vertex_ids[..];
    let flip_index = shape.flip_index();
    let per_sub_segment = adjacency.len() * 3;
    let mut indices = vec![0; data.num_segments() * sub_segment_count as usize * per_sub_segment];
    let mut chunks = indices.chunks_exact_mut(per_sub_segment.max(1));
    let mut emit = |segment: u32| {
        for sub_segment in 0..sub_segment_count {
            if let Some(out) = chunks.next() {
                write_sub_segment_indices(
                    &layout,
                    adjacency,
                    flip_index,
                    segment,
                    sub_segment,
                    sub_segment_count,
                    out,
                );
            }
        }
    };

    match params.translucent {
        Some((direction, view_direction)) if !data.ribbon_lookup.is_empty() => {
            for (entry, extents) in data.ribbon_lookup.iter().zip(&data.ribbon_extents) {
                let base = entry.base_segment_data_index as usize;
                let segments =
                    &data.segment_data[base..base + entry.num_segment_data_indices as usize];
                if use_invert_order(direction, extents, view_direction) {
                    segments.iter().rev().for_each(|&s| emit(s));
                } else {
                    segments.iter().for_each(|&s| emit(s));
                }
            }
        }
        _ => data.segment_data.iter().for_each(|&s| emit(s)),
    }

    log::debug!(
        "generated {} indices ({:?}) for {} segments x {} sub-segments",
        indices.len(),
        width,
        data.num_segments(),
        sub_segment_count
    );
    Ok(GeneratedIndices {
        indices: IndexBuffer::with_width(width, indices),
        layout,
        sub_segment_count,
        total_num_indices,
    })
}
