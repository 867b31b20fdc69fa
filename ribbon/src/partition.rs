// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::collections::BTreeMap;

use ribbon_encoding::ribbon_order_key;

use crate::particles::{ParticleData, RibbonIds};

/// Groups particle indices by ribbon id.
///
/// Ribbons come out in ascending id order so the draw order is stable from one frame
/// to the next. Simple ids compare unsigned, see [`ribbon_order_key`]. Indices inside
/// a ribbon keep their input order. Without ribbon ids all particles form one ribbon.
pub fn partition_ribbons(particles: &ParticleData<'_>) -> Vec<Vec<u32>> {
    let n = particles.len() as u32;
    if let RibbonIds::None = particles.ribbon_ids {
        return vec![(0..n).collect()];
    }
    let full_ids = matches!(particles.ribbon_ids, RibbonIds::Full(_));
    let mut ribbons: BTreeMap<u64, Vec<u32>> = BTreeMap::new();
    for i in 0..n {
        let id = particles.ribbon_id(i as usize);
        ribbons
            .entry(ribbon_order_key(full_ids, id.index, id.acquire_tag))
            .or_default()
            .push(i);
    }
    ribbons.into_values().collect()
}

#[cfg(test)]
mod tests {
    use ribbon_encoding::Vec3;

    use super::*;
    use crate::particles::{FullRibbonId, LinkOrder};

    #[test]
    fn groups_by_ascending_unsigned_id() {
        let positions = [Vec3::ZERO; 5];
        let order = [0.0; 5];
        let ids = [7, 3, 7, -1, 3];
        let data = ParticleData {
            ribbon_ids: RibbonIds::Simple(&ids),
            ..ParticleData::new(&positions, LinkOrder::Float(&order))
        };
        assert_eq!(partition_ribbons(&data), vec![vec![1, 4], vec![0, 2], vec![3]]);
    }

    #[test]
    fn full_ids_keep_signed_order() {
        let positions = [Vec3::ZERO; 3];
        let order = [0.0; 3];
        let id = |index, acquire_tag| FullRibbonId { index, acquire_tag };
        let ids = [id(2, 0), id(-1, 0), id(2, -1)];
        let data = ParticleData {
            ribbon_ids: RibbonIds::Full(&ids),
            ..ParticleData::new(&positions, LinkOrder::Float(&order))
        };
        assert_eq!(partition_ribbons(&data), vec![vec![1], vec![2], vec![0]]);
    }

    #[test]
    fn no_ids_is_one_ribbon() {
        let positions = [Vec3::ZERO; 3];
        let order = [0.0; 3];
        let data = ParticleData::new(&positions, LinkOrder::Float(&order));
        assert_eq!(partition_ribbons(&data), vec![vec![0, 1, 2]]);
    }
}
