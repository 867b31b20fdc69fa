// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::atomic::{AtomicBool, Ordering};

use ribbon_encoding::{
    IndirectDrawArgs, PipelineVariant, RibbonSettings, RibbonTunables, ShapeSlice,
    TessellationParams, TessellationSmoothingState, UvChannelUniform,
};

use crate::index::{generate_indices, GeneratedIndices, IndexGenParams};
use crate::particles::ParticleData;
use crate::partition::partition_ribbons;
use crate::sort::sort_ribbon;
use crate::tessellation::{sub_segment_count, ViewParams};
use crate::vertex::{GeneratedVertexData, SegmentParams, VertexDataBuilder};
use crate::Result;

static WARNED_SHAPE_FALLBACK: AtomicBool = AtomicBool::new(false);

/// Builds the cross section, warning once per process when the settings are invalid.
pub(crate) fn build_shape(settings: &RibbonSettings) -> ShapeSlice {
    let shape = ShapeSlice::new(&settings.shape, settings.use_material_backface_culling);
    if shape.fell_back() && !WARNED_SHAPE_FALLBACK.swap(true, Ordering::Relaxed) {
        log::warn!(
            "invalid {:?} ribbon shape settings, drawing a plane instead",
            shape.requested_kind
        );
    }
    shape
}

/// Resolves the variant table entry for one frame of particles.
pub(crate) fn resolve_variant(
    settings: &RibbonSettings,
    particles: &ParticleData<'_>,
) -> PipelineVariant {
    PipelineVariant {
        ribbon_ids: particles.ribbon_id_kind(),
        link_order: particles
            .link_order
            .as_ref()
            .map(|order| order.kind())
            .unwrap_or_default(),
        tessellation: settings.tessellation.kind(),
        has_twist: particles.has_twist(),
        custom_u: [
            particles.u0_override.is_some(),
            particles.u1_override.is_some(),
        ],
    }
}

/// Everything the sequential path produces for one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CpuRibbonFrame {
    pub variant: PipelineVariant,
    pub vertex_data: GeneratedVertexData,
    pub indices: GeneratedIndices,
    /// Draw arguments matching `indices`. The index generation dispatch is unused.
    pub draw_args: IndirectDrawArgs,
}

/// Generates ribbon geometry on the calling thread.
///
/// One renderer serves one particle system; it owns the tessellation smoothing state
/// that carries over from frame to frame, which is why [`RibbonRenderer::generate`]
/// takes `&mut self`.
#[derive(Clone, Debug)]
pub struct RibbonRenderer {
    settings: RibbonSettings,
    tunables: RibbonTunables,
    shape: ShapeSlice,
    tessellation: TessellationParams,
    smoothing: TessellationSmoothingState,
    translucent: bool,
}

impl RibbonRenderer {
    pub fn new(settings: RibbonSettings, tunables: RibbonTunables) -> Self {
        let shape = build_shape(&settings);
        let tessellation = TessellationParams::resolve(&settings.tessellation, &tunables);
        Self {
            settings,
            tunables,
            shape,
            tessellation,
            smoothing: TessellationSmoothingState::default(),
            translucent: false,
        }
    }

    /// Translucent materials emit multi-ribbons in the configured draw direction.
    pub fn set_translucent(&mut self, translucent: bool) {
        self.translucent = translucent;
    }

    pub fn settings(&self) -> &RibbonSettings {
        &self.settings
    }

    pub fn shape(&self) -> &ShapeSlice {
        &self.shape
    }

    pub fn smoothing(&self) -> &TessellationSmoothingState {
        &self.smoothing
    }

    /// Runs the whole sequential pipeline for one frame.
    ///
    /// Fewer than two particles, or missing positions or link order, give an empty
    /// frame and reset the smoothing state.
    pub fn generate(
        &mut self,
        particles: &ParticleData<'_>,
        view: &ViewParams,
    ) -> Result<CpuRibbonFrame> {
        particles.validate()?;
        let variant = resolve_variant(&self.settings, particles);
        let Some(link_order) = particles.link_order.filter(|_| particles.is_renderable()) else {
            self.smoothing = TessellationSmoothingState::default();
            return Ok(CpuRibbonFrame {
                variant,
                ..Default::default()
            });
        };

        let mut ribbons = partition_ribbons(particles);
        let params = SegmentParams {
            min_segment_length: self.tunables.min_segment_length,
            curve_tension: self.settings.curve_tension,
            variant,
            uv: [
                UvChannelUniform::from(&self.settings.uv0),
                UvChannelUniform::from(&self.settings.uv1),
            ],
        };
        let mut builder = VertexDataBuilder::new(particles, params);
        for (ribbon_index, ribbon) in ribbons.iter_mut().enumerate() {
            sort_ribbon(ribbon, &link_order);
            builder.add_ribbon(ribbon_index as u32, ribbon);
        }
        let vertex_data = builder.finish();
        self.smoothing.update(&vertex_data.stats, variant.has_twist);

        let sub_segments = sub_segment_count(
            variant.tessellation,
            &self.tessellation,
            &self.smoothing,
            view,
        );
        let index_params = IndexGenParams {
            shape: &self.shape,
            sub_segment_count: sub_segments,
            force_index32: self.tunables.force_index32,
            translucent: (self.translucent && variant.is_multi_ribbon())
                .then_some((self.settings.draw_direction, view.view_direction)),
        };
        let indices = generate_indices(&vertex_data, &index_params)?;
        let draw_args = IndirectDrawArgs::new(
            vertex_data.num_segments() as u32,
            indices.sub_segment_count,
            self.shape.triangles_per_segment,
            0,
        );
        log::debug!(
            "ribbons: {} particles, {} ribbons, {} segments, tessellation {}, {:?} indices",
            particles.len(),
            ribbons.len(),
            vertex_data.num_segments(),
            indices.sub_segment_count,
            indices.indices.width()
        );
        Ok(CpuRibbonFrame {
            variant,
            vertex_data,
            indices,
            draw_args,
        })
    }
}

#[cfg(test)]
mod tests {
    use ribbon_encoding::{ShapeSettings, TessellationMode, TessellationSettings, Vec3};

    use super::*;
    use crate::particles::{LinkOrder, RibbonIds};

    fn renderer() -> RibbonRenderer {
        let settings = RibbonSettings {
            tessellation: TessellationSettings {
                mode: TessellationMode::Disabled,
                ..Default::default()
            },
            ..Default::default()
        };
        RibbonRenderer::new(settings, RibbonTunables::default())
    }

    #[test]
    fn single_particle_gives_empty_frame() {
        let positions = [Vec3::ZERO];
        let order = [0.0];
        let frame = renderer()
            .generate(
                &ParticleData::new(&positions, LinkOrder::Float(&order)),
                &ViewParams::default(),
            )
            .unwrap();
        assert!(frame.indices.indices.is_empty());
        assert_eq!(frame.draw_args.draw.index_count, 0);
    }

    #[test]
    fn ribbons_are_sorted_before_building() {
        let positions: Vec<Vec3> = [3.0, 0.0, 2.0, 1.0]
            .iter()
            .map(|&x| Vec3::new(x * 2.0, 0.0, 0.0))
            .collect();
        let order = [3.0, 0.0, 2.0, 1.0];
        let ids = [4, 4, 4, 4];
        let particles = ParticleData {
            ribbon_ids: RibbonIds::Simple(&ids),
            ..ParticleData::new(&positions, LinkOrder::Float(&order))
        };
        let frame = renderer()
            .generate(&particles, &ViewParams::default())
            .unwrap();
        assert_eq!(frame.vertex_data.sorted_indices, vec![1, 3, 2, 0]);
        assert_eq!(frame.vertex_data.multi_ribbon_indices, vec![0; 4]);
        assert_eq!(frame.draw_args.draw.index_count, 3 * 2 * 3);
        assert!(frame.variant.is_multi_ribbon());
    }

    #[test]
    fn invalid_shape_falls_back_to_plane() {
        let settings = RibbonSettings {
            shape: ShapeSettings::Tube { subdivisions: 1 },
            ..Default::default()
        };
        let renderer = RibbonRenderer::new(settings, RibbonTunables::default());
        assert!(renderer.shape().fell_back());
        assert_eq!(renderer.shape().triangles_per_segment, 2);
    }
}
