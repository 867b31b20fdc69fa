// Copyright 2026 the Ribbon Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use ribbon::{FullRibbonId, LinkOrder, ParticleData, RibbonIds};
use ribbon_encoding::Vec3;

/// Small deterministic generator, so failures reproduce from the seed alone.
#[derive(Clone, Copy, Debug)]
pub struct XorShift(u64);

impl XorShift {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn next_u32(&mut self) -> u32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 >> 32) as u32
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1 << 24) as f32
    }

    pub fn range(&mut self, low: f32, high: f32) -> f32 {
        low + (high - low) * self.next_f32()
    }
}

#[derive(Clone, Debug)]
enum Order {
    Float(Vec<f32>),
    Int(Vec<i32>),
}

#[derive(Clone, Debug)]
enum Ids {
    None,
    Simple(Vec<i32>),
    Full(Vec<FullRibbonId>),
}

/// Owned particle attributes that [`ParticleSet::particles`] borrows from.
#[derive(Clone, Debug)]
pub struct ParticleSet {
    pub positions: Vec<Vec3>,
    pub ages: Vec<f32>,
    pub widths: Option<Vec<f32>>,
    pub twists: Option<Vec<f32>>,
    pub u0_override: Option<Vec<f32>>,
    order: Order,
    ids: Ids,
}

impl ParticleSet {
    /// Builds a set from `(ribbon, position, link order)` triples. A ribbon of `None`
    /// means the set has no ribbon ids.
    fn from_points(points: Vec<(Option<i32>, Vec3, f32)>) -> Self {
        let count = points.len().max(1) as f32;
        let ids = if points.iter().all(|p| p.0.is_none()) {
            Ids::None
        } else {
            Ids::Simple(points.iter().map(|p| p.0.unwrap_or_default()).collect())
        };
        Self {
            ages: points.iter().map(|p| (p.2 + 0.5) / count).collect(),
            positions: points.iter().map(|p| p.1).collect(),
            order: Order::Float(points.iter().map(|p| p.2).collect()),
            widths: None,
            twists: None,
            u0_override: None,
            ids,
        }
    }

    /// `count` particles along the x axis, `spacing` apart, in link order.
    pub fn line(count: usize, spacing: f32) -> Self {
        Self::from_points(
            (0..count)
                .map(|i| (None, Vec3::new(i as f32 * spacing, 0.0, 0.0), i as f32))
                .collect(),
        )
    }

    /// `count` particles on a circle of `radius` in the xy plane, `step` radians apart.
    pub fn arc(count: usize, radius: f32, step: f32) -> Self {
        Self::from_points(
            (0..count)
                .map(|i| {
                    let angle = i as f32 * step;
                    let position = Vec3::new(radius * angle.cos(), radius * angle.sin(), 0.0);
                    (None, position, i as f32)
                })
                .collect(),
        )
    }

    /// `ribbons` zig-zag ribbons of `per_ribbon` particles each, interleaved in memory.
    ///
    /// Ribbon ids descend with the ribbon index so that grouping has to reorder them.
    pub fn ribbons(ribbons: usize, per_ribbon: usize, spacing: f32) -> Self {
        let mut points = Vec::with_capacity(ribbons * per_ribbon);
        for j in 0..per_ribbon {
            for r in 0..ribbons {
                let position = Vec3::new(
                    j as f32 * spacing,
                    r as f32 * 10.0,
                    (j % 2) as f32 * spacing * 0.5,
                );
                let id = ((ribbons - 1 - r) * 3) as i32;
                points.push((Some(id), position, j as f32));
            }
        }
        Self::from_points(points)
    }

    /// A random walk per ribbon where consecutive points are `step[0]..step[1]` apart.
    pub fn random_walk(
        rng: &mut XorShift,
        ribbons: usize,
        per_ribbon: usize,
        step: [f32; 2],
    ) -> Self {
        let mut points = Vec::with_capacity(ribbons * per_ribbon);
        for r in 0..ribbons {
            let mut position = Vec3::new(0.0, r as f32 * 100.0, 0.0);
            for j in 0..per_ribbon {
                points.push((Some(r as i32), position, j as f32));
                let direction = Vec3::new(
                    rng.range(0.2, 1.0),
                    rng.range(-1.0, 1.0),
                    rng.range(-1.0, 1.0),
                )
                .safe_normalize();
                position = position + direction * rng.range(step[0], step[1]);
            }
        }
        Self::from_points(points)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Reorders the particles in memory without changing any ribbon.
    pub fn shuffled(mut self, rng: &mut XorShift) -> Self {
        let n = self.len();
        let mut permutation: Vec<usize> = (0..n).collect();
        for i in (1..n).rev() {
            let j = rng.next_u32() as usize % (i + 1);
            permutation.swap(i, j);
        }
        fn apply<T: Copy>(values: &mut Vec<T>, permutation: &[usize]) {
            *values = permutation.iter().map(|&i| values[i]).collect();
        }
        apply(&mut self.positions, &permutation);
        apply(&mut self.ages, &permutation);
        for values in [&mut self.widths, &mut self.twists, &mut self.u0_override] {
            if let Some(values) = values {
                apply(values, &permutation);
            }
        }
        match &mut self.order {
            Order::Float(order) => apply(order, &permutation),
            Order::Int(order) => apply(order, &permutation),
        }
        match &mut self.ids {
            Ids::None => {}
            Ids::Simple(ids) => apply(ids, &permutation),
            Ids::Full(ids) => apply(ids, &permutation),
        }
        self
    }

    /// Switches to an integer link order giving the same sequence, which means negating
    /// the keys since integer keys sort descending.
    pub fn with_int_order(mut self) -> Self {
        if let Order::Float(order) = &self.order {
            self.order = Order::Int(order.iter().map(|&key| -(key as i32)).collect());
        }
        self
    }

    /// Switches to `(index, acquire_tag)` ids. The tag alternates so that ids with the
    /// same index but a different tag still form separate ribbons.
    pub fn with_full_ids(mut self) -> Self {
        if let Ids::Simple(ids) = &self.ids {
            self.ids = Ids::Full(
                ids.iter()
                    .map(|&id| FullRibbonId {
                        index: id / 2,
                        acquire_tag: id % 2,
                    })
                    .collect(),
            );
        }
        self
    }

    /// Moves particle `index` to ribbon `id`.
    pub fn with_ribbon_id(mut self, index: usize, id: i32) -> Self {
        match &mut self.ids {
            Ids::None => {
                let mut ids = vec![0; self.positions.len()];
                ids[index] = id;
                self.ids = Ids::Simple(ids);
            }
            Ids::Simple(ids) => ids[index] = id,
            Ids::Full(ids) => ids[index] = FullRibbonId {
                index: id,
                acquire_tag: 0,
            },
        }
        self
    }

    pub fn with_twist(mut self, per_particle: f32) -> Self {
        let order = self.order_keys();
        self.twists = Some(order.iter().map(|&k| k * per_particle).collect());
        self.widths = Some(order.iter().map(|&k| 1.0 + 0.1 * k).collect());
        self
    }

    pub fn with_u0_override(mut self) -> Self {
        self.u0_override = Some(self.ages.clone());
        self
    }

    fn order_keys(&self) -> Vec<f32> {
        match &self.order {
            Order::Float(order) => order.clone(),
            Order::Int(order) => order.iter().map(|&k| -k as f32).collect(),
        }
    }

    /// Borrowed view handed to the renderers.
    pub fn particles(&self) -> ParticleData<'_> {
        ParticleData {
            positions: Some(&self.positions),
            normalized_ages: Some(&self.ages),
            widths: self.widths.as_deref(),
            twists: self.twists.as_deref(),
            ribbon_ids: match &self.ids {
                Ids::None => RibbonIds::None,
                Ids::Simple(ids) => RibbonIds::Simple(ids),
                Ids::Full(ids) => RibbonIds::Full(ids),
            },
            link_order: Some(match &self.order {
                Order::Float(order) => LinkOrder::Float(order),
                Order::Int(order) => LinkOrder::Int(order),
            }),
            u0_override: self.u0_override.as_deref(),
            u1_override: None,
        }
    }
}
