// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Properties that hold for any input, checked over generated particles.

use ribbon::{
    sub_segment_count, GeneratedVertexData, GpuRibbonRenderer, RibbonRenderer, ViewParams,
};
use ribbon_encoding::{
    CompositeIndexLayout, CompositeVertexIndex, IndexWidth, RibbonLookupEntry, RibbonSettings,
    RibbonTunables, ShapeSettings, ShapeSlice, TessellationMode, TessellationParams,
    TessellationSettings, Vec3,
};
use ribbon_tests::{approx_eq, compare_frames, ParticleSet, XorShift};

fn shapes() -> [ShapeSettings; 4] {
    [
        ShapeSettings::Plane { width_segments: 1 },
        ShapeSettings::Plane { width_segments: 3 },
        ShapeSettings::Tube { subdivisions: 5 },
        ShapeSettings::MultiPlane {
            planes: 2,
            width_segments: 1,
            accurate_geometry: false,
        },
    ]
}

fn constant_tessellation(factor: u32) -> TessellationSettings {
    TessellationSettings {
        mode: TessellationMode::Custom,
        custom_factor: factor,
        use_constant_factor: true,
        ..Default::default()
    }
}

/// Every ribbon with segments covers one less segment than it has retained points.
fn assert_segments_follow_points(lookup: &[RibbonLookupEntry]) {
    for entry in lookup {
        if entry.num_segment_data_indices == 0 {
            assert_eq!(*entry, RibbonLookupEntry::default());
        } else {
            assert_eq!(
                entry.num_segment_data_indices,
                entry.last_particle_id - entry.first_particle_id
            );
        }
    }
}

#[test]
fn index_buffer_length_follows_shape_and_tessellation() {
    let mut rng = XorShift::new(42);
    for shape in shapes() {
        for (factor, per_ribbon) in [(1, 2), (2, 7), (4, 40)] {
            let particles = ParticleSet::random_walk(&mut rng, 2, per_ribbon, [0.3, 3.0]);
            let settings = RibbonSettings {
                shape: shape.clone(),
                tessellation: constant_tessellation(factor),
                ..Default::default()
            };
            let mut renderer = RibbonRenderer::new(settings, RibbonTunables::default());
            let frame = renderer
                .generate(&particles.particles(), &ViewParams::default())
                .unwrap();
            let data: &GeneratedVertexData = &frame.vertex_data;
            let per_segment = factor * renderer.shape().triangles_per_segment * 3;
            assert_eq!(frame.indices.sub_segment_count, factor);
            assert_eq!(
                frame.indices.total_num_indices,
                data.sorted_indices.len() as u32 * per_segment
            );
            assert_eq!(
                frame.indices.indices.len() as u32,
                data.num_segments() as u32 * per_segment
            );
            assert_segments_follow_points(&data.ribbon_lookup);
        }
    }
}

#[test]
fn composite_ids_round_trip() {
    for (segments, sub_segments, shape) in [
        (5, 3, ShapeSettings::Plane { width_segments: 1 }),
        (40, 16, ShapeSettings::Tube { subdivisions: 6 }),
        (1, 1, ShapeSettings::Plane { width_segments: 3 }),
        (1000, 1, ShapeSettings::Plane { width_segments: 1 }),
    ] {
        let slice = ShapeSlice::new(&shape, false);
        let layout = CompositeIndexLayout::new(segments, sub_segments, slice.bits_for_shape)
            .unwrap();
        for segment in 0..segments {
            for sub_segment in 0..sub_segments {
                for slice_vertex in 0..slice.num_vertices_in_slice {
                    let index = CompositeVertexIndex {
                        segment,
                        sub_segment,
                        slice_vertex,
                    };
                    assert_eq!(layout.decode(layout.encode(index)), index);
                }
            }
        }
        let expected = if layout.total_bits() <= 16 {
            IndexWidth::U16
        } else {
            IndexWidth::U32
        };
        assert_eq!(layout.index_width(false), expected);
        assert_eq!(layout.index_width(true), IndexWidth::U32);
    }
}

#[test]
fn tessellation_does_not_increase_with_distance() {
    let tunables = RibbonTunables::default();
    let settings = RibbonSettings::default();
    let params = TessellationParams::resolve(&settings.tessellation, &tunables);
    let mut varied = false;
    for (radius, step) in [(4.0, 0.8), (20.0, 0.2), (50.0, 1.0)] {
        let mut renderer = RibbonRenderer::new(settings.clone(), tunables);
        let particles = ParticleSet::arc(24, radius, step);
        renderer
            .generate(&particles.particles(), &ViewParams::default())
            .unwrap();
        let factors: Vec<u32> = [0.0, 1e2, 1e4, 1e6, 1e8, 1e10]
            .into_iter()
            .map(|view_distance| {
                let view = ViewParams {
                    view_distance,
                    ..Default::default()
                };
                sub_segment_count(
                    settings.tessellation.kind(),
                    &params,
                    renderer.smoothing(),
                    &view,
                )
            })
            .collect();
        assert!(factors.iter().all(|f| (1..=params.max_factor).contains(f)));
        assert!(
            factors.windows(2).all(|w| w[0] >= w[1]),
            "{factors:?} increases with distance"
        );
        varied |= factors[0] > factors[factors.len() - 1];
    }
    // Long segments bending sharply need fewer sub-segments far away.
    assert!(varied);
}

#[test]
fn scanned_distances_match_serial_sum() {
    let mut rng = XorShift::new(5);
    let particles = ParticleSet::random_walk(&mut rng, 3, 40, [1.5, 3.0]).shuffled(&mut rng);
    let mut renderer = GpuRibbonRenderer::new(RibbonSettings::default(), RibbonTunables::default());
    let frame = renderer
        .generate(&particles.particles(), &ViewParams::default())
        .unwrap();
    assert_eq!(frame.ribbon_lookup.len(), 3);
    for entry in &frame.ribbon_lookup {
        let first = entry.first_particle_id as usize;
        let last = entry.last_particle_id as usize;
        let position = |k: usize| particles.positions[frame.sorted_indices[k] as usize];
        let mut serial = 0.0;
        assert_eq!(frame.tangents_and_distances[first].distance, 0.0);
        for k in first + 1..=last {
            serial += (position(k) - position(k - 1)).length();
            let scanned = frame.tangents_and_distances[k].distance;
            assert!(approx_eq(scanned, serial, 1e-4), "{scanned} != {serial}");
        }
    }
    let total: f32 = frame
        .ribbon_lookup
        .iter()
        .map(|entry| frame.tangents_and_distances[entry.last_particle_id as usize].distance)
        .sum();
    assert!(approx_eq(frame.command.stats.total_segment_length, total, 1e-4));
}

#[test]
fn culled_points_keep_segment_counts_consistent() {
    let mut rng = XorShift::new(9);
    // Steps straddle the minimum segment length, so both paths cull points.
    let particles = ParticleSet::random_walk(&mut rng, 4, 30, [0.2, 2.0]).shuffled(&mut rng);
    let view = ViewParams::default();

    let mut cpu = RibbonRenderer::new(RibbonSettings::default(), RibbonTunables::default());
    let cpu_frame = cpu.generate(&particles.particles(), &view).unwrap();
    assert!(cpu_frame.vertex_data.sorted_indices.len() < particles.len());
    assert_segments_follow_points(&cpu_frame.vertex_data.ribbon_lookup);

    let mut gpu = GpuRibbonRenderer::new(RibbonSettings::default(), RibbonTunables::default());
    let frame = gpu.generate(&particles.particles(), &view).unwrap();
    assert_segments_follow_points(&frame.ribbon_lookup);
    // Both paths retain the same points.
    assert_eq!(frame.sorted_indices, cpu_frame.vertex_data.sorted_indices);
    assert_eq!(frame.segment_data.len() as u32, frame.command.num_segments);
    for segment in &frame.segment_data {
        // A segment never starts on the last point of its ribbon.
        let next = *segment as usize + 1;
        assert!(next < frame.sorted_indices.len());
    }
}

#[test]
fn buffers_follow_changing_particle_counts() {
    let mut rng = XorShift::new(13);
    let frames = [
        ParticleSet::line(10, 2.0),
        ParticleSet::ribbons(3, 70, 2.0).shuffled(&mut rng),
        ParticleSet::line(12, 2.0),
        ParticleSet::arc(30, 6.0, 0.4),
    ];
    let particles: Vec<_> = frames.iter().map(ParticleSet::particles).collect();
    let comparisons = compare_frames(
        "changing_particle_counts",
        &RibbonSettings::default(),
        &RibbonTunables::default(),
        &particles,
        &ViewParams::default(),
    )
    .unwrap();
    for comparison in &comparisons {
        comparison.assert_matches(1e-4).unwrap();
    }
    assert_eq!(comparisons[1].gpu.sorted_indices.len(), 210);
}

#[test]
fn extents_span_each_ribbon() {
    let particles = ParticleSet::ribbons(2, 4, 2.0);
    let mut renderer = RibbonRenderer::new(RibbonSettings::default(), RibbonTunables::default());
    let frame = renderer
        .generate(&particles.particles(), &ViewParams::default())
        .unwrap();
    // Ribbon ids descend with the ribbon index, so the second ribbon in memory comes
    // first.
    let extents = &frame.vertex_data.ribbon_extents;
    assert_eq!(extents[0].start, Vec3::new(0.0, 10.0, 0.0));
    assert_eq!(extents[0].end, Vec3::new(6.0, 10.0, 1.0));
    assert_eq!(extents[1].start, Vec3::ZERO);
}
