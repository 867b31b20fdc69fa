// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use ribbon_encoding::{Monoid, RibbonAccumulation, ScanUniform, REDUCTION_WG};

use super::{util::invocations, CpuBinding};

/// One Hillis-Steele step. Reads only from `input`, so the pass is free of
/// read-after-write hazards as long as the two slots differ.
fn reduction_step_main(
    n_wg: u32,
    uniform: &ScanUniform,
    input: &[RibbonAccumulation],
    output: &mut [RibbonAccumulation],
) {
    let stride = uniform.stride as usize;
    for i in 0..invocations(n_wg, REDUCTION_WG, uniform.num_particles) {
        output[i] = if i >= stride {
            input[i - stride].combine(&input[i])
        } else {
            input[i]
        };
    }
}

pub fn reduction_step(n_wg: u32, resources: &[CpuBinding<'_>]) {
    let uniform = resources[0].as_typed();
    let input = resources[1].as_slice();
    let mut output = resources[2].as_slice_mut();
    reduction_step_main(n_wg, &uniform, &input, &mut output);
}
