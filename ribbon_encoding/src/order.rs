// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cmp::Ordering;

/// Type of the per-particle key that orders points along a ribbon.
///
/// Float keys link ascending, integer keys link descending. Both paths compare the
/// encoded `u32` form produced by [`order_key_from_f32`] and [`order_key_from_i32`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinkOrderKind {
    #[default]
    Float,
    Int,
}

impl LinkOrderKind {
    pub fn compare(self, a: u32, b: u32) -> Ordering {
        match self {
            Self::Float => a.cmp(&b),
            Self::Int => b.cmp(&a),
        }
    }
}

/// Maps an `f32` onto a `u32` whose unsigned order matches the float total order.
pub fn order_key_from_f32(value: f32) -> u32 {
    let bits = value.to_bits();
    if bits & 0x8000_0000 != 0 {
        !bits
    } else {
        bits | 0x8000_0000
    }
}

/// Maps an `i32` onto a `u32` whose unsigned order matches the signed order.
pub fn order_key_from_i32(value: i32) -> u32 {
    (value as u32) ^ 0x8000_0000
}

/// Key whose unsigned order is the order ribbons are grouped and drawn in.
///
/// Simple ids compare as unsigned integers, so negative ids come after all others.
/// Full ids compare by signed index, then by signed acquire tag.
pub fn ribbon_order_key(full_ids: bool, index: i32, acquire_tag: i32) -> u64 {
    if full_ids {
        (u64::from(order_key_from_i32(index)) << 32) | u64::from(order_key_from_i32(acquire_tag))
    } else {
        u64::from(index as u32)
    }
}
