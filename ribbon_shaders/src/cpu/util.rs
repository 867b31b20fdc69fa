// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Utility functions shared by the stages.

use std::cmp::Ordering;

use ribbon_encoding::{
    ribbon_order_key, GpuParticle, LinkOrderKind, RIBBON_FLAGS_FULL_IDS,
    RIBBON_FLAGS_INT_LINK_ORDER, RIBBON_FLAGS_MULTI_RIBBON,
};

/// Total order of particle indices used by both sort stages.
///
/// Particles are grouped by ribbon id in [`ribbon_order_key`] order, then ordered by link
/// order inside a ribbon and finally by index, so equal keys keep their input order.
pub fn compare_particles(particles: &[GpuParticle], flags: u32, a: u32, b: u32) -> Ordering {
    let pa = &particles[a as usize];
    let pb = &particles[b as usize];
    let by_ribbon = if flags & RIBBON_FLAGS_MULTI_RIBBON != 0 {
        let full_ids = flags & RIBBON_FLAGS_FULL_IDS != 0;
        let key = |p: &GpuParticle| ribbon_order_key(full_ids, p.ribbon_id, p.acquire_tag);
        key(pa).cmp(&key(pb))
    } else {
        Ordering::Equal
    };
    let link_order = if flags & RIBBON_FLAGS_INT_LINK_ORDER != 0 {
        LinkOrderKind::Int
    } else {
        LinkOrderKind::Float
    };
    by_ribbon
        .then_with(|| link_order.compare(pa.order, pb.order))
        .then_with(|| a.cmp(&b))
}

pub(crate) fn ribbon_key(p: &GpuParticle) -> (i32, i32) {
    (p.ribbon_id, p.acquire_tag)
}

pub(crate) fn invocations(n_wg: u32, wg_size: u32, limit: u32) -> usize {
    (n_wg * wg_size).min(limit) as usize
}

pub(crate) const fn div_ceil(n: u32, d: u32) -> u32 {
    (n + d - 1) / d
}
