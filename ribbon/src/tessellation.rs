// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use ribbon_encoding::{
    tessellation_factor, TessellationKind, TessellationParams, TessellationSmoothingState, Vec3,
};

/// Per view inputs of the tessellation estimate and the translucent draw order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewParams {
    /// Squared distance from the view origin to the bounds of the particle system.
    pub view_distance: f32,
    pub lod_distance_factor: f32,
    /// Normalized direction the view is looking in.
    pub view_direction: Vec3,
}

impl Default for ViewParams {
    fn default() -> Self {
        Self {
            view_distance: 0.0,
            lod_distance_factor: 1.0,
            view_direction: Vec3::new(0.0, 0.0, 1.0),
        }
    }
}

/// Number of sub-segments the sequential path splits every segment into.
pub fn sub_segment_count(
    kind: TessellationKind,
    params: &TessellationParams,
    smoothing: &TessellationSmoothingState,
    view: &ViewParams,
) -> u32 {
    match kind {
        TessellationKind::Disabled => 1,
        TessellationKind::Automatic | TessellationKind::Constant => tessellation_factor(
            params,
            smoothing,
            view.view_distance,
            view.lod_distance_factor,
        ),
    }
}

/// Upper bound of the sub-segment count the compute path allocates for.
///
/// The factor is only known on the device, so index buffers are sized for the largest
/// factor the settings allow.
pub fn max_sub_segment_count(params: &TessellationParams) -> u32 {
    params.max_factor.max(1)
}
