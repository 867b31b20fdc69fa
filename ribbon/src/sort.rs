// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::particles::LinkOrder;

/// Sorts the indices of one ribbon along its link order.
///
/// Float keys sort ascending and integer keys descending. The sort is stable, so
/// particles with equal keys stay in index order, the same tie break the compute sort
/// uses.
pub fn sort_ribbon(indices: &mut [u32], link_order: &LinkOrder<'_>) {
    let kind = link_order.kind();
    indices.sort_by(|&a, &b| {
        kind.compare(link_order.key(a as usize), link_order.key(b as usize))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_keys_ascend() {
        let order = [0.5, -2.0, 3.0, 0.5];
        let mut indices = vec![0, 1, 2, 3];
        sort_ribbon(&mut indices, &LinkOrder::Float(&order));
        assert_eq!(indices, vec![1, 0, 3, 2]);
    }

    #[test]
    fn int_keys_descend() {
        let order = [1, 5, -3];
        let mut indices = vec![0, 1, 2];
        sort_ribbon(&mut indices, &LinkOrder::Int(&order));
        assert_eq!(indices, vec![1, 0, 2]);
    }
}
