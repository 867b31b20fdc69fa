// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-ribbon U coordinate parameters.

use bytemuck::{Pod, Zeroable};

use super::TangentAndDistance;

/// How the texture boundary behaves at a ribbon end.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UvEdgeMode {
    /// Offset the boundary by the fraction of the end segment that has already
    /// travelled, so the texture slides smoothly as particles are born and die.
    #[default]
    SmoothTransition,
    /// Pin the boundary to the ribbon end.
    Locked,
}

impl UvEdgeMode {
    const fn to_u32(self) -> u32 {
        match self {
            Self::SmoothTransition => 0,
            Self::Locked => 1,
        }
    }

    const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::SmoothTransition),
            1 => Some(Self::Locked),
            _ => None,
        }
    }
}

/// How U is distributed along a ribbon.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UvDistributionMode {
    /// One texture repeat spread evenly over the segments.
    #[default]
    ScaledUniformly,
    /// One texture repeat spread over the arc length.
    ScaledByRibbonLength,
    /// Repeats every tiling length, anchored at the smoothed leading edge.
    TiledOverLength,
    /// Repeats every tiling length, anchored at the first point.
    TiledFromStart,
}

impl UvDistributionMode {
    const fn to_u32(self) -> u32 {
        match self {
            Self::ScaledUniformly => 0,
            Self::ScaledByRibbonLength => 1,
            Self::TiledOverLength => 2,
            Self::TiledFromStart => 3,
        }
    }

    const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::ScaledUniformly),
            1 => Some(Self::ScaledByRibbonLength),
            2 => Some(Self::TiledOverLength),
            3 => Some(Self::TiledFromStart),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UvChannelSettings {
    pub leading_edge: UvEdgeMode,
    pub trailing_edge: UvEdgeMode,
    pub distribution: UvDistributionMode,
    /// World length of one repeat for the tiled modes.
    pub tiling_length: f32,
    pub scale: [f32; 2],
    pub offset: [f32; 2],
}

impl Default for UvChannelSettings {
    fn default() -> Self {
        Self {
            leading_edge: UvEdgeMode::SmoothTransition,
            trailing_edge: UvEdgeMode::SmoothTransition,
            distribution: UvDistributionMode::ScaledUniformly,
            tiling_length: 100.0,
            scale: [1.0, 1.0],
            offset: [0.0, 0.0],
        }
    }
}

/// GPU form of [`UvChannelSettings`]. Only the U components of scale and offset are
/// needed here; V is handled by the vertex stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
#[repr(C)]
pub struct UvChannelUniform {
    pub leading_edge: u32,
    pub trailing_edge: u32,
    pub distribution: u32,
    pub tiling_length: f32,
    pub scale: f32,
    pub offset: f32,
}

impl UvChannelUniform {
    /// Edge modes, leading then trailing. Unknown values read as the default.
    pub fn edge_modes(&self) -> (UvEdgeMode, UvEdgeMode) {
        let decode = |value| UvEdgeMode::from_u32(value).unwrap_or_default();
        (decode(self.leading_edge), decode(self.trailing_edge))
    }

    /// Unknown values read as the default mode.
    pub fn distribution_mode(&self) -> UvDistributionMode {
        UvDistributionMode::from_u32(self.distribution).unwrap_or_default()
    }
}

impl From<&UvChannelSettings> for UvChannelUniform {
    fn from(settings: &UvChannelSettings) -> Self {
        Self {
            leading_edge: settings.leading_edge.to_u32(),
            trailing_edge: settings.trailing_edge.to_u32(),
            distribution: settings.distribution.to_u32(),
            tiling_length: settings.tiling_length,
            scale: settings.scale[0],
            offset: settings.offset[0],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Zeroable, Pod)]
#[repr(C)]
pub struct UvParams {
    pub scale: f32,
    pub offset: f32,
    pub distribution_scaler: f32,
}

impl UvParams {
    /// Parameters for channels whose U comes straight from particle data.
    pub const CUSTOM: Self = Self {
        scale: 1.0,
        offset: 0.0,
        distribution_scaler: 1.0,
    };
}

/// The values of one ribbon the solver reads.
///
/// Ages are normalized particle ages of the first two and last two retained points,
/// distances are the cumulative arc lengths recorded at those points.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UvRibbonSpan {
    pub num_segments: u32,
    pub total_length: f32,
    pub first_age: f32,
    pub second_age: f32,
    pub second_to_last_age: f32,
    pub last_age: f32,
    pub second_distance: f32,
    pub second_to_last_distance: f32,
    pub last_distance: f32,
}

impl UvRibbonSpan {
    /// Gathers the span of one ribbon from its retained points.
    ///
    /// `age_of(k)` returns the normalized age of the `k`-th retained point. `tangents`
    /// must hold at least two points.
    pub fn new(tangents: &[TangentAndDistance], age_of: impl Fn(usize) -> f32) -> Self {
        let last = tangents.len() - 1;
        Self {
            num_segments: last as u32,
            total_length: tangents[last].distance,
            first_age: age_of(0),
            second_age: age_of(1),
            second_to_last_age: age_of(last - 1),
            last_age: age_of(last),
            second_distance: tangents[1].distance,
            second_to_last_distance: tangents[last - 1].distance,
            last_distance: tangents[last].distance,
        }
    }
}

fn leading_offset(mode: UvEdgeMode, span: &UvRibbonSpan) -> f32 {
    if mode == UvEdgeMode::Locked {
        return 0.0;
    }
    let step = span.second_age - span.first_age;
    let offset = if span.first_age < step {
        step - span.first_age
    } else {
        0.0
    };
    if step > 0.0 {
        offset / step
    } else {
        0.0
    }
}

fn trailing_offset(mode: UvEdgeMode, span: &UvRibbonSpan) -> f32 {
    if mode == UvEdgeMode::Locked {
        return 0.0;
    }
    let step = span.last_age - span.second_to_last_age;
    let remaining = 1.0 - span.last_age;
    let offset = if remaining < step { step - remaining } else { 0.0 };
    if step > 0.0 {
        offset / step
    } else {
        0.0
    }
}

/// Solves `(scale, offset, distribution_scaler)` for one channel of one ribbon.
///
/// For the non-tiled modes `scale * n + offset` maps the usable range, after removing
/// the partial end segments, onto exactly one repeat, where `n` is the segment count or
/// the total length.
pub fn solve_uv_params(channel: &UvChannelUniform, span: &UvRibbonSpan) -> UvParams {
    let (leading_edge, trailing_edge) = channel.edge_modes();
    let lead = leading_offset(leading_edge, span);
    let trail = trailing_offset(trailing_edge, span);
    let total = span.total_length;
    let lead_distance = span.second_distance * lead;

    let (scale, offset, distribution_scaler) = match channel.distribution_mode() {
        UvDistributionMode::ScaledUniformly => {
            let n = span.num_segments as f32;
            let scale = n / (n - (lead + trail));
            (scale, -((lead / n) * scale), 1.0 / n)
        }
        UvDistributionMode::ScaledByRibbonLength => {
            let trail_distance = (span.last_distance - span.second_to_last_distance) * trail;
            let scale = total / (total - (lead_distance + trail_distance));
            (scale, -((lead_distance / total) * scale), 1.0 / total)
        }
        UvDistributionMode::TiledOverLength => (
            total / channel.tiling_length,
            -(lead_distance / channel.tiling_length),
            1.0 / total,
        ),
        UvDistributionMode::TiledFromStart => (total / channel.tiling_length, 0.0, 1.0 / total),
    };

    UvParams {
        scale: scale * channel.scale,
        offset: offset * channel.scale + channel.offset,
        distribution_scaler,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> UvRibbonSpan {
        UvRibbonSpan {
            num_segments: 4,
            total_length: 8.0,
            first_age: 0.05,
            second_age: 0.25,
            second_to_last_age: 0.75,
            last_age: 0.95,
            second_distance: 2.0,
            second_to_last_distance: 6.0,
            last_distance: 8.0,
        }
    }

    fn channel(distribution: UvDistributionMode, edge: UvEdgeMode) -> UvChannelUniform {
        UvChannelUniform::from(&UvChannelSettings {
            leading_edge: edge,
            trailing_edge: edge,
            distribution,
            tiling_length: 4.0,
            ..Default::default()
        })
    }

    #[test]
    fn locked_uniform_covers_segments() {
        let p = solve_uv_params(
            &channel(UvDistributionMode::ScaledUniformly, UvEdgeMode::Locked),
            &span(),
        );
        assert_eq!(p.scale, 1.0);
        assert_eq!(p.offset, 0.0);
        assert_eq!(p.distribution_scaler, 0.25);
    }

    #[test]
    fn smooth_uniform_maps_usable_range_to_one_repeat() {
        let s = span();
        let p = solve_uv_params(
            &channel(UvDistributionMode::ScaledUniformly, UvEdgeMode::SmoothTransition),
            &s,
        );
        // Leading edge is 0.75 of a segment in, trailing edge 0.75 of a segment out.
        let lead = 0.75 / 4.0;
        let trail = 1.0 - 0.75 / 4.0;
        assert!((p.scale * lead + p.offset).abs() < 1e-5);
        assert!((p.scale * trail + p.offset - 1.0).abs() < 1e-5);
    }

    #[test]
    fn tiling_half_length_repeats_twice() {
        let p = solve_uv_params(
            &channel(UvDistributionMode::TiledFromStart, UvEdgeMode::Locked),
            &span(),
        );
        assert_eq!(p.scale, 2.0);
        assert_eq!(p.offset, 0.0);
    }

    #[test]
    fn tiled_over_length_shifts_by_leading_distance() {
        let p = solve_uv_params(
            &channel(UvDistributionMode::TiledOverLength, UvEdgeMode::SmoothTransition),
            &span(),
        );
        assert_eq!(p.scale, 2.0);
        assert!((p.offset + 2.0 * 0.75 / 4.0).abs() < 1e-6);
    }

    #[test]
    fn channel_scale_and_offset_apply_last() {
        let mut uniform = channel(UvDistributionMode::TiledFromStart, UvEdgeMode::Locked);
        uniform.scale = 3.0;
        uniform.offset = 0.5;
        let p = solve_uv_params(&uniform, &span());
        assert_eq!(p.scale, 6.0);
        assert_eq!(p.offset, 0.5);
    }

    #[test]
    fn unknown_uniform_modes_read_as_defaults() {
        let mut uniform = channel(UvDistributionMode::TiledFromStart, UvEdgeMode::Locked);
        assert_eq!(uniform.distribution_mode(), UvDistributionMode::TiledFromStart);
        assert_eq!(uniform.edge_modes(), (UvEdgeMode::Locked, UvEdgeMode::Locked));
        uniform.distribution = 9;
        uniform.leading_edge = 5;
        assert_eq!(uniform.distribution_mode(), UvDistributionMode::ScaledUniformly);
        assert_eq!(uniform.edge_modes().0, UvEdgeMode::SmoothTransition);
        let default = solve_uv_params(
            &channel(UvDistributionMode::ScaledUniformly, UvEdgeMode::SmoothTransition),
            &span(),
        );
        uniform.trailing_edge = UvEdgeMode::SmoothTransition.to_u32();
        uniform.tiling_length = 4.0;
        assert_eq!(solve_uv_params(&uniform, &span()), default);
    }
}
