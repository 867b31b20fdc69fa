// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sequential construction of the vertex support buffers.

use ribbon_encoding::math::{acos_fast, segment_direction};
use ribbon_encoding::{
    reflect_end_tangents, solve_uv_params, PipelineVariant, RibbonExtents, RibbonLookupEntry,
    TangentAndDistance, TessellationStats, UvChannelUniform, UvParams, UvRibbonSpan, Vec3,
};

use crate::particles::ParticleData;

/// Buffers consumed by the vertex stage, plus this frame's tessellation statistics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeneratedVertexData {
    /// Particle index of every retained point, ribbon after ribbon.
    pub sorted_indices: Vec<u32>,
    pub tangents_and_distances: Vec<TangentAndDistance>,
    /// Ribbon of every retained point. Empty for a single implicit ribbon.
    pub multi_ribbon_indices: Vec<u32>,
    /// Index into `sorted_indices` of the first point of every segment.
    pub segment_data: Vec<u32>,
    /// One entry per ribbon, in ascending id order.
    pub ribbon_lookup: Vec<RibbonLookupEntry>,
    pub ribbon_extents: Vec<RibbonExtents>,
    pub stats: TessellationStats,
}

impl GeneratedVertexData {
    pub fn num_segments(&self) -> usize {
        self.segment_data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segment_data.is_empty()
    }
}

/// Inputs of [`VertexDataBuilder`] that don't change between ribbons.
#[derive(Clone, Copy, Debug)]
pub struct SegmentParams {
    pub min_segment_length: f32,
    pub curve_tension: f32,
    pub variant: PipelineVariant,
    pub uv: [UvChannelUniform; 2],
}

#[derive(Default)]
struct StatSums {
    total: f32,
    length_sq: f32,
    angle: f32,
    twist: f32,
    width: f32,
}

/// Appends ribbons one at a time to a [`GeneratedVertexData`].
pub struct VertexDataBuilder<'a> {
    particles: &'a ParticleData<'a>,
    params: SegmentParams,
    data: GeneratedVertexData,
    sums: StatSums,
}

impl<'a> VertexDataBuilder<'a> {
    pub fn new(particles: &'a ParticleData<'a>, params: SegmentParams) -> Self {
        Self {
            particles,
            params,
            data: GeneratedVertexData::default(),
            sums: StatSums::default(),
        }
    }

    /// Adds one ribbon whose particle indices are already in link order.
    ///
    /// Points closer than the minimum segment length to the last retained point are
    /// skipped, except for the final point of the ribbon. A ribbon that keeps fewer than
    /// two points still gets a zeroed lookup entry.
    pub fn add_ribbon(&mut self, ribbon_index: u32, ribbon: &[u32]) {
        let start = self.data.sorted_indices.len();
        let total_distance = self.retain_points(ribbon_index, ribbon);
        let retained = self.data.sorted_indices.len() - start;
        if retained < 2 {
            self.data.ribbon_lookup.push(RibbonLookupEntry::default());
            self.data.ribbon_extents.push(RibbonExtents::default());
            return;
        }
        self.sums.total += total_distance;

        let end = start + retained - 1;
        let tangents = &mut self.data.tangents_and_distances[start..=end];
        reflect_end_tangents(tangents);

        let base_segment_data_index = self.data.segment_data.len() as u32;
        self.data.segment_data.extend(start as u32..end as u32);

        let sorted = &self.data.sorted_indices[start..=end];
        let span = UvRibbonSpan::new(tangents, |k| {
            self.particles.normalized_age(sorted[k] as usize)
        });
        let uv = |channel: usize| {
            if self.params.variant.custom_u[channel] {
                UvParams::CUSTOM
            } else {
                solve_uv_params(&self.params.uv[channel], &span)
            }
        };
        self.data.ribbon_lookup.push(RibbonLookupEntry {
            first_particle_id: start as u32,
            last_particle_id: end as u32,
            base_segment_data_index,
            num_segment_data_indices: (end - start) as u32,
            u0: uv(0),
            u1: uv(1),
        });
        let position = |i: u32| self.particles.position(i as usize);
        self.data.ribbon_extents.push(RibbonExtents {
            start: ribbon.first().map_or(Vec3::ZERO, |&i| position(i)),
            end: ribbon.last().map_or(Vec3::ZERO, |&i| position(i)),
        });
    }

    /// Pushes the retained points of one ribbon and returns its arc length.
    fn retain_points(&mut self, ribbon_index: u32, ribbon: &[u32]) -> f32 {
        let min_length = self.params.min_segment_length;
        let particles = self.particles;
        let position = |k: usize| particles.position(ribbon[k] as usize);
        let Some(&first) = ribbon.first() else {
            return 0.0;
        };
        let first_position = position(0);

        // The first point whose distance to the start exceeds the minimum defines the
        // start tangent.
        let found = (1..ribbon.len()).find_map(|k| {
            let delta = position(k) - first_position;
            let size = delta.length();
            (size > min_length).then(|| (k, segment_direction(delta, size, min_length), size))
        });
        let Some((mut current, mut last_to_curr, mut last_to_curr_size)) = found else {
            return 0.0;
        };
        self.push_point(ribbon_index, first, last_to_curr, 0.0);

        let wants_stats = self.params.variant.wants_tessellation_stats();
        let wants_twist = self.params.variant.wants_twist_stats();
        let tension = self.params.curve_tension;
        let last = ribbon.len() - 1;
        let mut total_distance = 0.0;
        for next in current + 1..=last {
            let delta = position(next) - position(current);
            let size = delta.length();
            if size <= min_length && next != last {
                continue;
            }
            let curr_to_next = segment_direction(delta, size, min_length);
            let tangent = (1.0 - tension) * (last_to_curr + curr_to_next).safe_normalize();
            total_distance += last_to_curr_size;
            self.push_point(ribbon_index, ribbon[current], tangent, total_distance);

            if wants_stats {
                self.sums.length_sq += size * size;
                self.sums.angle += size * acos_fast(last_to_curr.dot(curr_to_next));
                if wants_twist {
                    let here = ribbon[current] as usize;
                    let there = ribbon[next] as usize;
                    self.sums.twist +=
                        size * (particles.twist(there) - particles.twist(here)).abs();
                    self.sums.width += size * particles.width(here);
                }
            }
            current = next;
            last_to_curr = curr_to_next;
            last_to_curr_size = size;
        }

        if last_to_curr_size > 0.0 {
            total_distance += last_to_curr_size;
            self.push_point(ribbon_index, ribbon[current], last_to_curr, total_distance);
        }
        total_distance
    }

    fn push_point(&mut self, ribbon_index: u32, particle: u32, tangent: Vec3, distance: f32) {
        self.data.sorted_indices.push(particle);
        self.data
            .tangents_and_distances
            .push(TangentAndDistance { tangent, distance });
        if self.params.variant.is_multi_ribbon() {
            self.data.multi_ribbon_indices.push(ribbon_index);
        }
    }

    pub fn finish(mut self) -> GeneratedVertexData {
        let s = &self.sums;
        self.data.stats = if self.params.variant.wants_tessellation_stats() {
            TessellationStats::from_sums(s.total, s.length_sq, s.angle, s.twist, s.width)
        } else {
            TessellationStats::from_sums(s.total, 0.0, 0.0, 0.0, 0.0)
        };
        self.data
    }
}
