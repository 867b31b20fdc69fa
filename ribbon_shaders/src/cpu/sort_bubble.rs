// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cmp::Ordering;

use ribbon_encoding::{ConfigUniform, GpuParticle, SORT_GROUP_WIDTH};

use super::{util::compare_particles, CpuBinding};

const WG_SIZE: usize = SORT_GROUP_WIDTH as usize;

fn sort_bubble_main(
    n_wg: u32,
    config: &ConfigUniform,
    particles: &[GpuParticle],
    keys: &mut [u32],
) {
    let n = config.num_particles as usize;
    for wg in 0..n_wg as usize {
        let start = wg * WG_SIZE;
        if start >= n {
            break;
        }
        let end = (start + WG_SIZE).min(n);
        for i in start..end {
            keys[i] = i as u32;
        }
        // Odd-even transposition: `end - start` alternating passes sort the group.
        for pass in 0..end - start {
            let mut j = start + pass % 2;
            while j + 1 < end {
                if compare_particles(particles, config.flags, keys[j + 1], keys[j])
                    == Ordering::Less
                {
                    keys.swap(j, j + 1);
                }
                j += 2;
            }
        }
    }
}

pub fn sort_bubble(n_wg: u32, resources: &[CpuBinding<'_>]) {
    let config = resources[0].as_typed();
    let particles = resources[1].as_slice();
    let mut keys = resources[2].as_slice_mut();
    sort_bubble_main(n_wg, &config, &particles, &mut keys);
}
