// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CPU stage regression tests.

use std::cell::RefCell;

use bytemuck::{bytes_of, cast_slice, Pod};
use ribbon_encoding::{
    order_key_from_f32, CommandBuffer, CompositeIndexLayout, ConfigUniform, DrawDirection,
    GpuParticle, IndexGenUniform, IndirectDrawArgs, Monoid, PointContribution,
    RibbonAccumulation, RibbonExtents, RibbonLookupEntry, RibbonPoint, RibbonRange, ScanUniform,
    SortUniform, TangentAndDistance, Vec3, WorkgroupCounts, RIBBON_FLAGS_MULTI_RIBBON,
    SORT_GROUP_WIDTH,
};
use ribbon_shaders::cpu::{
    index_gen, reduction_apply, reduction_finalize, reduction_init, reduction_step,
    sort_bubble, sort_merge, CpuBinding,
};

fn rw<T: Pod>(data: &[T]) -> RefCell<Vec<u8>> {
    RefCell::new(cast_slice(data).to_vec())
}

fn read<T: Pod>(buf: &RefCell<Vec<u8>>) -> Vec<T> {
    cast_slice(&buf.borrow()).to_vec()
}

fn particle(x: f32, order: f32, ribbon_id: i32) -> GpuParticle {
    GpuParticle {
        position: Vec3::new(x, 0.0, 0.0),
        normalized_age: order / 10.0,
        width: 1.0,
        ribbon_id,
        order: order_key_from_f32(order),
        ..Default::default()
    }
}

/// Runs both sort stages the way the recorder schedules them and returns slot zero.
fn sort(particles: &[GpuParticle], flags: u32) -> Vec<u32> {
    let n = particles.len() as u32;
    let config = ConfigUniform {
        num_particles: n,
        flags,
        ..Default::default()
    };
    let counts = WorkgroupCounts::new(n, flags & RIBBON_FLAGS_MULTI_RIBBON != 0);
    let slots = [rw(&vec![0_u32; n as usize]), rw(&vec![0_u32; n as usize])];
    let mut current = (counts.sort_merge_passes % 2) as usize;
    sort_bubble(
        counts.sort_bubble.0,
        &[
            CpuBinding::Buffer(bytes_of(&config)),
            CpuBinding::Buffer(cast_slice(particles)),
            CpuBinding::BufferRW(&slots[current]),
        ],
    );
    for pass in 0..counts.sort_merge_passes {
        let uniform = SortUniform {
            num_keys: n,
            flags,
            run_size: SORT_GROUP_WIDTH << pass,
            pad0: 0,
        };
        sort_merge(
            counts.sort_merge.0,
            &[
                CpuBinding::Buffer(bytes_of(&uniform)),
                CpuBinding::Buffer(cast_slice(particles)),
                CpuBinding::BufferRW(&slots[current]),
                CpuBinding::BufferRW(&slots[1 - current]),
            ],
        );
        current = 1 - current;
    }
    assert_eq!(current, 0, "final merge pass must land in slot zero");
    read(&slots[0])
}

#[test]
fn sort_reverses_descending_keys_across_groups() {
    let n = 200;
    let particles: Vec<_> = (0..n)
        .map(|i| particle(0.0, (n - i) as f32, 0))
        .collect();
    let keys = sort(&particles, 0);
    assert_eq!(keys, (0..n as u32).rev().collect::<Vec<_>>());
}

#[test]
fn sort_groups_ribbons_and_keeps_ties_stable() {
    // Three ribbons interleaved, with every link order key equal inside a ribbon.
    let n = 150;
    let particles: Vec<_> = (0..n).map(|i| particle(0.0, 1.0, 2 - (i % 3))).collect();
    let keys = sort(&particles, RIBBON_FLAGS_MULTI_RIBBON);
    let expected: Vec<u32> = [2, 1, 0]
        .into_iter()
        .flat_map(|r| (0..n as u32).filter(move |i| i % 3 == r))
        .collect();
    assert_eq!(keys, expected);
}

#[test]
fn log_step_scan_matches_serial_scan() {
    let n = 77_u32;
    let values: Vec<_> = (0..n)
        .map(|i| {
            RibbonAccumulation::new(PointContribution {
                kept: i % 4 != 1,
                ribbon_start: i % 9 == 0,
                distance: (i % 5) as f32,
                ..Default::default()
            })
        })
        .collect();
    let slots = [rw(&values), rw(&values)];
    let mut current = 0;
    let mut stride = 1;
    while stride < n {
        let uniform = ScanUniform {
            num_particles: n,
            stride,
            ..Default::default()
        };
        reduction_step(
            WorkgroupCounts::new(n, false).reduction.0,
            &[
                CpuBinding::Buffer(bytes_of(&uniform)),
                CpuBinding::BufferRW(&slots[current]),
                CpuBinding::BufferRW(&slots[1 - current]),
            ],
        );
        current = 1 - current;
        stride *= 2;
    }
    let scanned: Vec<RibbonAccumulation> = read(&slots[current]);
    assert_eq!(scanned, RibbonAccumulation::inclusive_scan(&values));
}

#[test]
fn collinear_ribbon_compacts_into_segments() {
    let particles: Vec<_> = (0..5).map(|i| particle(i as f32, i as f32, 0)).collect();
    let n = particles.len() as u32;
    let config = ConfigUniform {
        num_particles: n,
        min_segment_length: 0.5,
        ..Default::default()
    };
    let config_bytes = bytes_of(&config);
    let keys: Vec<u32> = (0..n).collect();
    let points = rw(&vec![RibbonPoint::default(); 5]);
    let accumulation = rw(&vec![RibbonAccumulation::default(); 5]);
    reduction_init(
        1,
        &[
            CpuBinding::Buffer(config_bytes),
            CpuBinding::Buffer(cast_slice(&particles)),
            CpuBinding::Buffer(cast_slice(&keys)),
            CpuBinding::BufferRW(&points),
            CpuBinding::BufferRW(&accumulation),
        ],
    );
    let scanned = RibbonAccumulation::inclusive_scan(&read::<RibbonAccumulation>(&accumulation));
    let scanned_bytes = cast_slice(&scanned);

    let sorted_indices = rw(&[0_u32; 5]);
    let tangents = rw(&[TangentAndDistance::default(); 5]);
    let multi_ribbon_indices = rw(&[0_u32; 5]);
    let segments = rw(&[0_u32; 5]);
    let ranges = rw(&[RibbonRange::default(); 5]);
    reduction_apply(
        1,
        &[
            CpuBinding::Buffer(config_bytes),
            CpuBinding::BufferRW(&points),
            CpuBinding::Buffer(scanned_bytes),
            CpuBinding::BufferRW(&sorted_indices),
            CpuBinding::BufferRW(&tangents),
            CpuBinding::BufferRW(&multi_ribbon_indices),
            CpuBinding::BufferRW(&segments),
            CpuBinding::BufferRW(&ranges),
        ],
    );
    assert_eq!(read::<u32>(&sorted_indices), vec![0, 1, 2, 3, 4]);
    assert_eq!(&read::<u32>(&segments)[..4], &[0, 1, 2, 3]);
    let distances: Vec<f32> = read::<TangentAndDistance>(&tangents)
        .iter()
        .map(|t| t.distance)
        .collect();
    assert_eq!(distances, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    assert_eq!(read::<RibbonRange>(&ranges)[0], RibbonRange { first: 0, last: 4 });

    let lookup = rw(&[RibbonLookupEntry::default(); 5]);
    let extents = rw(&[RibbonExtents::default(); 5]);
    let command = rw(&[CommandBuffer::default()]);
    reduction_finalize(
        1,
        &[
            CpuBinding::Buffer(config_bytes),
            CpuBinding::Buffer(cast_slice(&particles)),
            CpuBinding::Buffer(cast_slice(&keys)),
            CpuBinding::Buffer(scanned_bytes),
            CpuBinding::BufferRW(&ranges),
            CpuBinding::BufferRW(&lookup),
            CpuBinding::BufferRW(&extents),
            CpuBinding::BufferRW(&command),
        ],
    );
    let command: CommandBuffer = read(&command)[0];
    assert_eq!(command.num_segments, 4);
    assert_eq!(command.num_ribbons, 1);
    assert_eq!(command.uv_dispatch.count_x, 1);
    assert_eq!(command.stats.total_segment_length, 4.0);
    let entry = read::<RibbonLookupEntry>(&lookup)[0];
    assert_eq!(
        (
            entry.first_particle_id,
            entry.last_particle_id,
            entry.base_segment_data_index,
            entry.num_segment_data_indices
        ),
        (0, 4, 0, 4)
    );
    assert_eq!(read::<RibbonExtents>(&extents)[0].end, Vec3::new(4.0, 0.0, 0.0));
}

#[test]
fn short_steps_are_culled_against_the_last_kept_point() {
    // Steps of 0.3 under a 0.5 minimum: every other point survives because distances
    // are measured from the last kept point, not from the sorted neighbour.
    let xs = [0.0, 0.3, 0.6, 0.9, 1.2, 1.25];
    let particles: Vec<_> = xs
        .iter()
        .enumerate()
        .map(|(i, &x)| particle(x, i as f32, 0))
        .collect();
    let n = particles.len();
    let config = ConfigUniform {
        num_particles: n as u32,
        min_segment_length: 0.5,
        ..Default::default()
    };
    let config_bytes = bytes_of(&config);
    let keys: Vec<u32> = (0..n as u32).collect();
    let points = rw(&vec![RibbonPoint::default(); n]);
    let accumulation = rw(&vec![RibbonAccumulation::default(); n]);
    reduction_init(
        1,
        &[
            CpuBinding::Buffer(config_bytes),
            CpuBinding::Buffer(cast_slice(&particles)),
            CpuBinding::Buffer(cast_slice(&keys)),
            CpuBinding::BufferRW(&points),
            CpuBinding::BufferRW(&accumulation),
        ],
    );
    let scanned = RibbonAccumulation::inclusive_scan(&read::<RibbonAccumulation>(&accumulation));
    let total = scanned[n - 1];
    assert_eq!(total.kept, 4);
    assert_eq!(total.segments(), 3);

    let sorted_indices = rw(&vec![0_u32; n]);
    let tangents = rw(&vec![TangentAndDistance::default(); n]);
    let multi_ribbon_indices = rw(&vec![0_u32; n]);
    let segments = rw(&vec![0_u32; n]);
    let ranges = rw(&vec![RibbonRange::default(); n]);
    reduction_apply(
        1,
        &[
            CpuBinding::Buffer(config_bytes),
            CpuBinding::BufferRW(&points),
            CpuBinding::Buffer(cast_slice(&scanned)),
            CpuBinding::BufferRW(&sorted_indices),
            CpuBinding::BufferRW(&tangents),
            CpuBinding::BufferRW(&multi_ribbon_indices),
            CpuBinding::BufferRW(&segments),
            CpuBinding::BufferRW(&ranges),
        ],
    );
    assert_eq!(&read::<u32>(&sorted_indices)[..4], &[0, 2, 4, 5]);
    let distances: Vec<f32> = read::<TangentAndDistance>(&tangents)[..4]
        .iter()
        .map(|t| t.distance)
        .collect();
    for (got, want) in distances.iter().zip([0.0, 0.6, 1.2, 1.25]) {
        assert!((got - want).abs() < 1e-5, "{distances:?}");
    }
}

#[test]
fn index_gen_writes_one_block_per_sub_segment() {
    let layout = CompositeIndexLayout::new(8, 2, 1).unwrap();
    let uniform = IndexGenUniform {
        layout,
        triangles_per_segment: 2,
        adjacency_len: 2,
        flip_index: 2,
        sub_segment_cap: 2,
        ..Default::default()
    };
    let draw_args = IndirectDrawArgs::new(2, 2, 2, 1);
    let segments = [3_u32, 5];
    let adjacency = [0_u32, 1];
    let indices = rw(&[0_u32; 24]);
    index_gen(
        draw_args.index_gen_dispatch.count_x,
        &[
            CpuBinding::Buffer(bytes_of(&uniform)),
            CpuBinding::Buffer(bytes_of(&draw_args)),
            CpuBinding::Buffer(cast_slice(&segments)),
            CpuBinding::Buffer(cast_slice(&adjacency)),
            CpuBinding::Buffer(cast_slice(&[0_u32; 6])),
            CpuBinding::Buffer(cast_slice(&[RibbonLookupEntry::default()])),
            CpuBinding::Buffer(cast_slice(&[RibbonExtents::default()])),
            CpuBinding::BufferRW(&indices),
        ],
    );
    let indices: Vec<u32> = read(&indices);
    let decoded: Vec<_> = indices.iter().map(|&i| layout.decode(i)).collect();
    // Second sub-segment of segment 3 connects to segment 4.
    assert_eq!((decoded[6].segment, decoded[6].sub_segment), (3, 1));
    assert_eq!((decoded[8].segment, decoded[8].sub_segment), (4, 0));
    assert_eq!(decoded[12].segment, 5);
    assert_eq!(draw_args.draw.index_count, 24);
}

#[test]
fn index_gen_reverses_translucent_ribbons_facing_away() {
    let layout = CompositeIndexLayout::new(8, 1, 1).unwrap();
    let mut uniform = IndexGenUniform {
        layout,
        triangles_per_segment: 2,
        adjacency_len: 2,
        flip_index: 2,
        sub_segment_cap: 1,
        ..Default::default()
    };
    let view = Vec3::new(0.0, 0.0, 1.0);
    uniform.set_translucent(DrawDirection::BackToFront, view);
    let draw_args = IndirectDrawArgs::new(3, 1, 2, 1);
    // Two ribbons over sorted points 0..=2 and 3..=4.
    let segments = [0_u32, 1, 3];
    let multi_ribbon_indices = [0_u32, 0, 0, 1, 1];
    let lookup = [
        RibbonLookupEntry {
            first_particle_id: 0,
            last_particle_id: 2,
            base_segment_data_index: 0,
            num_segment_data_indices: 2,
            ..Default::default()
        },
        RibbonLookupEntry {
            first_particle_id: 3,
            last_particle_id: 4,
            base_segment_data_index: 2,
            num_segment_data_indices: 1,
            ..Default::default()
        },
    ];
    // The first ribbon runs along the view, so it is drawn from its far end.
    let extents = [
        RibbonExtents {
            start: Vec3::ZERO,
            end: Vec3::new(0.0, 0.0, 2.0),
        },
        RibbonExtents {
            start: Vec3::ZERO,
            end: Vec3::new(0.0, 0.0, -1.0),
        },
    ];
    let indices = rw(&[0_u32; 18]);
    index_gen(
        draw_args.index_gen_dispatch.count_x,
        &[
            CpuBinding::Buffer(bytes_of(&uniform)),
            CpuBinding::Buffer(bytes_of(&draw_args)),
            CpuBinding::Buffer(cast_slice(&segments)),
            CpuBinding::Buffer(cast_slice(&[0_u32, 1])),
            CpuBinding::Buffer(cast_slice(&multi_ribbon_indices)),
            CpuBinding::Buffer(cast_slice(&lookup)),
            CpuBinding::Buffer(cast_slice(&extents)),
            CpuBinding::BufferRW(&indices),
        ],
    );
    let first: Vec<u32> = read::<u32>(&indices)
        .chunks(6)
        .map(|chunk| layout.decode(chunk[0]).segment)
        .collect();
    assert_eq!(first, vec![1, 0, 3]);
}
