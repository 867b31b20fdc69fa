// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests which ensure that the sequential and compute paths give the same geometry.

use ribbon::ViewParams;
use ribbon_encoding::{
    DrawDirection, RibbonSettings, RibbonTunables, ShapeSettings, TessellationMode,
    TessellationSettings, UvChannelSettings, UvDistributionMode, UvEdgeMode, Vec3,
};
use ribbon_tests::{compare_frames, compare_gpu_cpu, compare_translucent, ParticleSet, XorShift};

const TOLERANCE: f32 = 1e-4;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn compare(name: &str, settings: &RibbonSettings, particles: &ParticleSet) {
    init();
    compare_gpu_cpu(
        name,
        settings,
        &RibbonTunables::default(),
        &particles.particles(),
        &ViewParams::default(),
    )
    .unwrap()
    .assert_matches(TOLERANCE)
    .unwrap();
}

#[test]
fn compare_straight_line() {
    compare(
        "straight_line",
        &RibbonSettings::default(),
        &ParticleSet::line(12, 2.0),
    );
}

#[test]
fn compare_culled_short_steps() {
    init();
    // Steps below the minimum segment length of one.
    let cases = [
        ("two_close_points", ParticleSet::line(2, 0.3), 0),
        ("short_steps", ParticleSet::line(5, 0.4), 2),
        ("steps_around_minimum", ParticleSet::line(9, 0.6), 4),
    ];
    for (name, particles, segments) in cases {
        let comparison = compare_gpu_cpu(
            name,
            &RibbonSettings::default(),
            &RibbonTunables::default(),
            &particles.particles(),
            &ViewParams::default(),
        )
        .unwrap();
        comparison.assert_matches(TOLERANCE).unwrap();
        assert_eq!(comparison.gpu.command.num_segments, segments, "{name}");
    }
}

#[test]
fn compare_culled_random_walk() {
    let mut rng = XorShift::new(19);
    let particles = ParticleSet::random_walk(&mut rng, 4, 40, [0.2, 2.0])
        .with_twist(0.3)
        .shuffled(&mut rng);
    compare("culled_random_walk", &RibbonSettings::default(), &particles);
}

#[test]
fn compare_negative_ribbon_ids() {
    init();
    let mut particles = ParticleSet::ribbons(3, 6, 2.0);
    // Particles are interleaved, so every third one belongs to the ribbon with id 0.
    for i in (2..particles.len()).step_by(3) {
        particles = particles.with_ribbon_id(i, -4);
    }
    let comparison = compare_gpu_cpu(
        "negative_ribbon_ids",
        &RibbonSettings::default(),
        &RibbonTunables::default(),
        &particles.particles(),
        &ViewParams::default(),
    )
    .unwrap();
    comparison.assert_matches(TOLERANCE).unwrap();
    // Ids order unsigned: 3, 6 and then -4.
    let sorted = &comparison.gpu.sorted_indices;
    assert_eq!(sorted[0] % 3, 1);
    assert_eq!(sorted[sorted.len() - 1] % 3, 2);
}

#[test]
fn compare_translucent_draw_directions() {
    init();
    let particles = ParticleSet::ribbons(3, 6, 2.0);
    // The ribbons run along +x.
    let view = ViewParams {
        view_direction: Vec3::new(1.0, 0.0, 0.0),
        ..Default::default()
    };
    for (direction, reversed) in [
        (DrawDirection::BackToFront, true),
        (DrawDirection::FrontToBack, false),
    ] {
        let settings = RibbonSettings {
            draw_direction: direction,
            ..Default::default()
        };
        let comparison = compare_translucent(
            "translucent",
            &settings,
            &RibbonTunables::default(),
            &particles.particles(),
            &view,
        )
        .unwrap();
        comparison.assert_matches(TOLERANCE).unwrap();
        let first = comparison.gpu.ribbon_lookup[0];
        let last_segment = first.base_segment_data_index + first.num_segment_data_indices - 1;
        let expected = if reversed {
            comparison.gpu.segment_data[last_segment as usize]
        } else {
            comparison.gpu.segment_data[first.base_segment_data_index as usize]
        };
        assert_eq!(comparison.gpu_triples()[0].segment, expected, "{direction:?}");
    }
}

#[test]
fn compare_arc_with_tension() {
    let settings = RibbonSettings {
        curve_tension: 0.5,
        ..Default::default()
    };
    compare("arc_with_tension", &settings, &ParticleSet::arc(20, 10.0, 0.3));
}

#[test]
fn compare_shuffled_ribbons() {
    let mut rng = XorShift::new(7);
    // More than two sort groups, so merge passes run.
    let particles = ParticleSet::ribbons(3, 50, 2.0).shuffled(&mut rng);
    compare("shuffled_ribbons", &RibbonSettings::default(), &particles);
}

#[test]
fn compare_int_link_order() {
    let mut rng = XorShift::new(11);
    let particles = ParticleSet::ribbons(2, 9, 3.0)
        .with_int_order()
        .shuffled(&mut rng);
    compare("int_link_order", &RibbonSettings::default(), &particles);
}

#[test]
fn compare_full_ids_with_twist() {
    let mut rng = XorShift::new(3);
    let particles = ParticleSet::random_walk(&mut rng, 3, 15, [1.5, 4.0])
        .with_full_ids()
        .with_twist(0.4)
        .shuffled(&mut rng);
    compare("full_ids_with_twist", &RibbonSettings::default(), &particles);
}

#[test]
fn compare_tube_with_constant_tessellation() {
    let settings = RibbonSettings {
        shape: ShapeSettings::Tube { subdivisions: 6 },
        tessellation: TessellationSettings {
            mode: TessellationMode::Custom,
            custom_factor: 3,
            use_constant_factor: true,
            ..Default::default()
        },
        ..Default::default()
    };
    compare(
        "tube_with_constant_tessellation",
        &settings,
        &ParticleSet::arc(10, 5.0, 0.5),
    );
}

#[test]
fn compare_multi_plane() {
    let settings = RibbonSettings {
        shape: ShapeSettings::MultiPlane {
            planes: 3,
            width_segments: 2,
            accurate_geometry: true,
        },
        ..Default::default()
    };
    compare("multi_plane", &settings, &ParticleSet::ribbons(2, 6, 2.0));
}

#[test]
fn compare_uv_modes() {
    let settings = RibbonSettings {
        uv0: UvChannelSettings {
            distribution: UvDistributionMode::TiledOverLength,
            tiling_length: 3.0,
            scale: [2.0, 1.0],
            ..Default::default()
        },
        uv1: UvChannelSettings {
            leading_edge: UvEdgeMode::Locked,
            trailing_edge: UvEdgeMode::SmoothTransition,
            distribution: UvDistributionMode::ScaledByRibbonLength,
            offset: [0.25, 0.0],
            ..Default::default()
        },
        ..Default::default()
    };
    compare("uv_modes", &settings, &ParticleSet::ribbons(2, 8, 2.0));
}

#[test]
fn compare_custom_u() {
    let particles = ParticleSet::arc(8, 6.0, 0.4).with_u0_override();
    compare("custom_u", &RibbonSettings::default(), &particles);
}

#[test]
fn compare_with_single_particle_ribbon() {
    let mut particles = ParticleSet::ribbons(3, 5, 2.0);
    // Moving one particle to a ribbon of its own leaves that ribbon without segments.
    let last = particles.len() - 1;
    particles = particles.with_ribbon_id(last, 100);
    let comparison = compare_gpu_cpu(
        "single_particle_ribbon",
        &RibbonSettings::default(),
        &RibbonTunables::default(),
        &particles.particles(),
        &ViewParams::default(),
    )
    .unwrap();
    comparison.assert_matches(TOLERANCE).unwrap();
    let lookup = &comparison.cpu.vertex_data.ribbon_lookup;
    assert_eq!(lookup.len(), 4);
    assert_eq!(lookup[3].num_segment_data_indices, 0);
}

#[test]
fn compare_smoothing_over_frames() {
    init();
    let frames = [
        ParticleSet::arc(16, 4.0, 0.8),
        ParticleSet::line(16, 2.0),
        ParticleSet::arc(16, 8.0, 0.2),
    ];
    let particles: Vec<_> = frames.iter().map(ParticleSet::particles).collect();
    let view = ViewParams {
        view_distance: 400.0,
        lod_distance_factor: 1.0,
        ..Default::default()
    };
    let comparisons = compare_frames(
        "smoothing_over_frames",
        &RibbonSettings::default(),
        &RibbonTunables::default(),
        &particles,
        &view,
    )
    .unwrap();
    for comparison in &comparisons {
        comparison.assert_matches(TOLERANCE).unwrap();
    }
    assert!(comparisons[0].gpu.draw_args.num_sub_segments > 1);
    // The straight frame keeps part of the bend before it.
    assert!(comparisons[1].gpu.command.smoothing.angle > 0.0);
}
