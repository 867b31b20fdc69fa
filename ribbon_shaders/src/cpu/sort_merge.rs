// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cmp::Ordering;

use ribbon_encoding::{GpuParticle, SortUniform, SORT_MERGE_WG};

use super::{
    util::{compare_particles, invocations},
    CpuBinding,
};

/// Merges pairs of sorted runs of `run_size` keys.
///
/// Every invocation places one key: its rank in its own run plus the number of keys of
/// the other run that must precede it. Ties go to the left run, which keeps the merge
/// stable.
fn sort_merge_main(
    n_wg: u32,
    uniform: &SortUniform,
    particles: &[GpuParticle],
    keys_in: &[u32],
    keys_out: &mut [u32],
) {
    let n = uniform.num_keys as usize;
    let run = uniform.run_size as usize;
    let cmp = |a: u32, b: u32| compare_particles(particles, uniform.flags, a, b);
    for i in 0..invocations(n_wg, SORT_MERGE_WG, uniform.num_keys) {
        let left_start = i / (2 * run) * (2 * run);
        let mid = (left_start + run).min(n);
        let right_end = (left_start + 2 * run).min(n);
        let key = keys_in[i];
        let dest = if i < mid {
            let preceding = keys_in[mid..right_end]
                .partition_point(|&other| cmp(other, key) == Ordering::Less);
            i + preceding
        } else {
            let preceding = keys_in[left_start..mid]
                .partition_point(|&other| cmp(other, key) != Ordering::Greater);
            left_start + (i - mid) + preceding
        };
        keys_out[dest] = key;
    }
}

pub fn sort_merge(n_wg: u32, resources: &[CpuBinding<'_>]) {
    let uniform = resources[0].as_typed();
    let particles = resources[1].as_slice();
    let keys_in = resources[2].as_slice();
    let mut keys_out = resources[3].as_slice_mut();
    sort_merge_main(n_wg, &uniform, &particles, &keys_in, &mut keys_out);
}
