// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use ribbon_encoding::math::{acos_fast, segment_direction};
use ribbon_encoding::{
    ConfigUniform, GpuParticle, Monoid, PipelineVariant, PointContribution, RibbonAccumulation,
    RibbonPoint, Vec3, POINT_FLAG_KEPT, POINT_FLAG_RIBBON_END, POINT_FLAG_RIBBON_START,
    REDUCTION_WG,
};

use super::{
    util::{invocations, ribbon_key},
    CpuBinding,
};

fn reduction_init_main(
    n_wg: u32,
    config: &ConfigUniform,
    particles: &[GpuParticle],
    sorted_keys: &[u32],
    points: &mut [RibbonPoint],
    accumulation: &mut [RibbonAccumulation],
) {
    let n = config.num_particles as usize;
    let variant = PipelineVariant::from_flags(config.flags);
    let multi = variant.is_multi_ribbon();
    let key = |i: usize| ribbon_key(&particles[sorted_keys[i] as usize]);
    let same_ribbon = |a: usize, b: usize| key(a) == key(b);

    // Each invocation starting a ribbon walks it to the end. Ribbons run in parallel.
    for i in 0..invocations(n_wg, REDUCTION_WG, config.num_particles) {
        if i > 0 && (!multi || same_ribbon(i - 1, i)) {
            continue;
        }
        let mut end = i + 1;
        while end < n && (!multi || same_ribbon(i, end)) {
            end += 1;
        }
        cull_ribbon(
            config,
            variant,
            particles,
            &sorted_keys[i..end],
            &mut points[i..end],
            &mut accumulation[i..end],
        );
    }
}

/// Greedy retention over one ribbon in link order.
///
/// A point is kept when it is further than the minimum segment length from the last kept
/// point. The first point is kept only when some later point is far enough from it, and
/// the last point is always kept after a non-empty segment. Distances in the accumulation
/// are measured between kept points.
fn cull_ribbon(
    config: &ConfigUniform,
    variant: PipelineVariant,
    particles: &[GpuParticle],
    ribbon: &[u32],
    points: &mut [RibbonPoint],
    accumulation: &mut [RibbonAccumulation],
) {
    let last = ribbon.len() - 1;
    for (k, &particle) in ribbon.iter().enumerate() {
        let mut flags = 0;
        if k == 0 {
            flags |= POINT_FLAG_RIBBON_START;
        }
        if k == last {
            flags |= POINT_FLAG_RIBBON_END;
        }
        points[k] = RibbonPoint {
            particle,
            flags,
            ..Default::default()
        };
        accumulation[k] = RibbonAccumulation::new(PointContribution {
            ribbon_start: k == 0,
            ..Default::default()
        });
    }

    let mut keep = |k: usize, tangent: Vec3, contribution: PointContribution| {
        points[k].tangent = tangent;
        points[k].flags |= POINT_FLAG_KEPT;
        accumulation[k] = RibbonAccumulation::new(PointContribution {
            kept: true,
            ribbon_start: k == 0,
            ..contribution
        });
    };

    let min_length = config.min_segment_length;
    let particle = |k: usize| &particles[ribbon[k] as usize];
    let first_position = particle(0).position;
    let found = (1..ribbon.len()).find_map(|k| {
        let delta = particle(k).position - first_position;
        let size = delta.length();
        (size > min_length).then(|| (k, segment_direction(delta, size, min_length), size))
    });
    let Some((mut current, mut last_to_curr, mut last_to_curr_size)) = found else {
        return;
    };
    keep(0, last_to_curr, PointContribution::default());

    let wants_stats = variant.wants_tessellation_stats();
    let wants_twist = variant.wants_twist_stats();
    let tension = config.curve_tension;
    for next in current + 1..=last {
        let delta = particle(next).position - particle(current).position;
        let size = delta.length();
        if size <= min_length && next != last {
            continue;
        }
        let curr_to_next = segment_direction(delta, size, min_length);
        let tangent = (1.0 - tension) * (last_to_curr + curr_to_next).safe_normalize();
        let mut contribution = PointContribution {
            distance: last_to_curr_size,
            ..Default::default()
        };
        if wants_stats {
            contribution.length_sq = size * size;
            contribution.angle = size * acos_fast(last_to_curr.dot(curr_to_next));
            if wants_twist {
                let here = particle(current);
                contribution.twist = size * (particle(next).twist - here.twist).abs();
                contribution.width = size * here.width;
            }
        }
        keep(current, tangent, contribution);
        current = next;
        last_to_curr = curr_to_next;
        last_to_curr_size = size;
    }

    if last_to_curr_size > 0.0 {
        let contribution = PointContribution {
            distance: last_to_curr_size,
            ..Default::default()
        };
        keep(current, last_to_curr, contribution);
    }
}

pub fn reduction_init(n_wg: u32, resources: &[CpuBinding<'_>]) {
    let config = resources[0].as_typed();
    let particles = resources[1].as_slice();
    let sorted_keys = resources[2].as_slice();
    let mut points = resources[3].as_slice_mut();
    let mut accumulation = resources[4].as_slice_mut();
    reduction_init_main(
        n_wg,
        &config,
        &particles,
        &sorted_keys,
        &mut points,
        &mut accumulation,
    );
}
