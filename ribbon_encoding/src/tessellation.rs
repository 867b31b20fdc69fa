// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use bytemuck::{Pod, Zeroable};

use super::math::{acos_fast, lerp, SMALL_NUMBER};
use super::{RibbonTunables, TessellationMode, TessellationSettings};

/// Lower bound of the per-subdivision angle, keeps the curvature term finite for
/// nearly straight ribbons.
pub const MAX_CURVATURE_FACTOR: f32 = 0.002;

/// Length weighted averages of the current frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
#[repr(C)]
pub struct TessellationStats {
    pub total_segment_length: f32,
    pub average_segment_length: f32,
    pub average_segment_angle: f32,
    pub average_twist_angle: f32,
    pub average_width: f32,
}

impl TessellationStats {
    /// Averages raw sums weighted by segment length.
    ///
    /// `length_sq` is the sum of squared segment lengths, the other sums are already
    /// multiplied by the length of the segment they belong to.
    pub fn from_sums(total: f32, length_sq: f32, angle: f32, twist: f32, width: f32) -> Self {
        let one_over_total = 1.0 / total.max(1.0);
        Self {
            total_segment_length: total,
            average_segment_length: length_sq * one_over_total,
            average_segment_angle: angle * one_over_total,
            average_twist_angle: twist * one_over_total,
            average_width: width * one_over_total,
        }
    }
}

/// Moving average of the tessellation inputs, kept per renderer across frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
#[repr(C)]
pub struct TessellationSmoothingState {
    pub angle: f32,
    pub curvature: f32,
    pub twist_angle: f32,
    pub twist_curvature: f32,
    pub total_length: f32,
}

impl TessellationSmoothingState {
    /// Blends this frame's statistics into the state.
    ///
    /// The state only ever pulls the current values upwards, weighted by how much
    /// length the previous frame had. A frame without any segment length resets it.
    pub fn update(&mut self, stats: &TessellationStats, has_twist: bool) {
        let total = stats.total_segment_length;
        if total <= 0.0 {
            *self = Self::default();
            return;
        }
        let factor = self.total_length / (total + self.total_length);
        self.total_length = total;

        let angle = stats.average_segment_angle;
        let curvature =
            stats.average_segment_length / SMALL_NUMBER.max(angle.sin().abs());
        self.angle = lerp(angle, self.angle.max(angle), factor);
        self.curvature = lerp(curvature, self.curvature.max(curvature), factor);

        if has_twist {
            let twist = stats.average_twist_angle;
            let width = stats.average_width;
            self.twist_angle = lerp(twist, self.twist_angle.max(twist), factor);
            self.twist_curvature = lerp(width, self.twist_curvature.max(width), factor);
        }
    }
}

/// Tessellation inputs resolved from the renderer settings and the global tunables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
#[repr(C)]
pub struct TessellationParams {
    /// Upper bound of the factor, already capped by the tunables.
    pub max_factor: u32,
    pub use_constant: u32,
    pub enabled: u32,
    /// Minimum angle per subdivision in radians.
    pub min_angle: f32,
    pub screen_percentage: f32,
    pub min_displacement_error: f32,
}

impl TessellationParams {
    pub fn resolve(settings: &TessellationSettings, tunables: &RibbonTunables) -> Self {
        let mut params = Self {
            max_factor: tunables.max_tessellation,
            use_constant: 0,
            enabled: u32::from(tunables.tessellation_enabled),
            min_angle: tunables.tessellation_angle,
            screen_percentage: tunables.screen_percentage,
            min_displacement_error: tunables.min_displacement_error,
        };
        match settings.mode {
            TessellationMode::Automatic => {}
            TessellationMode::Custom => {
                params.max_factor = params.max_factor.min(settings.custom_factor);
                params.use_constant = u32::from(settings.use_constant_factor);
                params.min_angle = settings.min_angle_radians();
                params.screen_percentage =
                    if settings.use_screen_space && !settings.use_constant_factor {
                        tunables.screen_percentage
                    } else {
                        0.0
                    };
            }
            TessellationMode::Disabled => params.max_factor = 1,
        }
        params
    }
}

/// Picks the number of sub-segments per segment.
///
/// `view_distance` is the squared distance from the view origin to the ribbon bounds;
/// the screen space error budget grows with its square root.
pub fn tessellation_factor(
    params: &TessellationParams,
    smoothing: &TessellationSmoothingState,
    view_distance: f32,
    lod_distance_factor: f32,
) -> u32 {
    let factor = params.max_factor.max(1);
    if params.use_constant != 0 {
        return factor;
    }
    if params.enabled == 0 || factor <= 1 || smoothing.curvature <= SMALL_NUMBER {
        return 1;
    }
    let min_tessellation = if params.min_angle == 0.0 {
        1.0
    } else {
        1.0_f32.max(
            smoothing.twist_angle.max(smoothing.angle) / SMALL_NUMBER.max(params.min_angle),
        )
    };
    let max_error = params.min_displacement_error.max(
        params.screen_percentage * view_distance.max(0.0).sqrt()
            / lod_distance_factor.max(SMALL_NUMBER),
    );
    let subdivisions = |angle: f32, curvature: f32| {
        angle / MAX_CURVATURE_FACTOR.max(acos_fast(curvature / (curvature + max_error)))
    };
    let mut tessellation = subdivisions(smoothing.angle, smoothing.curvature);
    if smoothing.twist_angle > 0.0 && smoothing.twist_curvature > 0.0 {
        tessellation =
            tessellation.max(subdivisions(smoothing.twist_angle, smoothing.twist_curvature));
    }
    let lower = (min_tessellation.round() as u32).min(factor);
    (tessellation.round() as u32).clamp(lower, factor)
}
